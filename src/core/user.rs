use super::validation::normalize_email;
use super::{OrganizationId, UserId};
use crate::error::{BiletoError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Interface languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "en_GB")]
    EnGb,
    #[serde(rename = "fr_FR")]
    FrFr,
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EnGb => write!(f, "en_GB"),
            Self::FrFr => write!(f, "fr_FR"),
        }
    }
}

impl FromStr for Locale {
    type Err = BiletoError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "en_GB" | "en" => Ok(Self::EnGb),
            "fr_FR" | "fr" => Ok(Self::FrFr),
            _ => Err(BiletoError::InvalidInput(format!(
                "Invalid locale: {s}. Must be one of: en_GB, fr_FR"
            ))),
        }
    }
}

/// A person using Bileto, either a requester or an agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub locale: Locale,
    /// Default organization, used when the user opens tickets by e-mail
    pub organization_id: Option<OrganizationId>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a user with a normalized e-mail
    pub fn new(email: &str, name: impl Into<String>) -> Result<Self> {
        Ok(Self {
            id: UserId::new(),
            email: normalize_email(email)?,
            name: name.into().trim().to_string(),
            locale: Locale::default(),
            organization_id: None,
            created_at: Utc::now(),
        })
    }

    /// Name when known, otherwise the e-mail address
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.email
        } else {
            &self.name
        }
    }

    /// Case-insensitive e-mail comparison
    pub fn has_email(&self, email: &str) -> bool {
        self.email.eq_ignore_ascii_case(email.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_falls_back_to_email() {
        let mut user = User::new("Alix@Example.com", "").unwrap();
        assert_eq!(user.email, "alix@example.com");
        assert_eq!(user.display_name(), "alix@example.com");
        user.name = "Alix Hambourg".to_string();
        assert_eq!(user.display_name(), "Alix Hambourg");
    }

    #[test]
    fn test_has_email() {
        let user = User::new("alix@example.com", "Alix").unwrap();
        assert!(user.has_email("ALIX@example.com "));
        assert!(!user.has_email("benedict@example.com"));
    }

    #[test]
    fn test_locale_parsing() {
        assert_eq!("fr".parse::<Locale>().unwrap(), Locale::FrFr);
        assert_eq!("en_GB".parse::<Locale>().unwrap(), Locale::EnGb);
        assert!("de_DE".parse::<Locale>().is_err());
        assert_eq!(
            serde_yaml::to_string(&Locale::FrFr).unwrap().trim(),
            "fr_FR"
        );
    }
}
