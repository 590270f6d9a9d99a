use super::OrganizationId;
use super::validation::{normalize_domain, validate_name};
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A customer organization; tickets, contracts and scoped roles hang off it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    /// E-mail domains whose users belong to this organization
    #[serde(default)]
    pub domains: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Organization {
    /// Create a validated organization
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into().trim().to_string();
        validate_name("Organization name", &name)?;
        let now = Utc::now();
        Ok(Self {
            id: OrganizationId::new(),
            name,
            domains: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Replace the domains, normalizing and deduplicating them
    pub fn set_domains<I, S>(&mut self, domains: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized = Vec::new();
        for domain in domains {
            let domain = normalize_domain(domain.as_ref())?;
            if !normalized.contains(&domain) {
                normalized.push(domain);
            }
        }
        normalized.sort();
        self.domains = normalized;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Rename the organization
    pub fn rename(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into().trim().to_string();
        validate_name("Organization name", &name)?;
        self.name = name;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Whether the given e-mail domain belongs to this organization
    pub fn owns_domain(&self, domain: &str) -> bool {
        let domain = domain.to_lowercase();
        self.domains.iter().any(|d| *d == domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_organization_trims_name() {
        let orga = Organization::new("  Acme  ").unwrap();
        assert_eq!(orga.name, "Acme");
        assert!(orga.domains.is_empty());
        assert!(Organization::new(" ").is_err());
    }

    #[test]
    fn test_set_domains() {
        let mut orga = Organization::new("Acme").unwrap();
        orga.set_domains(["Acme.com", "@acme.org", "acme.com"]).unwrap();
        assert_eq!(orga.domains, vec!["acme.com", "acme.org"]);
        assert!(orga.owns_domain("ACME.org"));
        assert!(!orga.owns_domain("example.com"));
        assert!(orga.set_domains(["not a domain"]).is_err());
    }
}
