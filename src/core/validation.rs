//! Input validation helpers shared by the domain constructors and the CLI

use crate::error::{BiletoError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum length of names and titles
pub const MAX_NAME_LENGTH: usize = 255;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-']+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)+$")
        .expect("e-mail pattern is valid")
});

static DOMAIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([a-z0-9]([a-z0-9\-]*[a-z0-9])?\.)+[a-z]{2,}$")
        .expect("domain pattern is valid")
});

/// Validate a name or title: non blank, at most [`MAX_NAME_LENGTH`] characters
pub fn validate_name(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(BiletoError::Validation(format!("{field} cannot be empty")));
    }
    if value.chars().count() > MAX_NAME_LENGTH {
        return Err(BiletoError::Validation(format!(
            "{field} cannot exceed {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Normalize and validate an e-mail address
pub fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    if !EMAIL_RE.is_match(&email) {
        return Err(BiletoError::Validation(format!(
            "'{email}' is not a valid e-mail address"
        )));
    }
    Ok(email)
}

/// Normalize and validate an e-mail domain
pub fn normalize_domain(domain: &str) -> Result<String> {
    let domain = domain.trim().trim_start_matches('@').to_lowercase();
    if !DOMAIN_RE.is_match(&domain) {
        return Err(BiletoError::Validation(format!(
            "'{domain}' is not a valid domain"
        )));
    }
    Ok(domain)
}

/// Domain part of an e-mail address
pub fn email_domain(email: &str) -> Option<&str> {
    email.rsplit_once('@').map(|(_, domain)| domain)
}

/// Split a comma-separated list, dropping blank entries
pub fn parse_list(value: Option<&str>) -> Vec<String> {
    value
        .map(|s| {
            s.split(',')
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect()
        })
        .unwrap_or_default()
}
