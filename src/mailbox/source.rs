use super::IncomingEmail;
use crate::error::{BiletoError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Where incoming e-mails come from
#[cfg_attr(test, mockall::automock)]
pub trait MailSource {
    /// Take the new e-mails out of the source
    fn fetch(&mut self) -> Result<Vec<IncomingEmail>>;
}

/// A spool directory of e-mails stored as YAML or JSON documents
///
/// Fetched documents are removed from the directory. Documents that cannot
/// be parsed are left in place.
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn parse(path: &Path) -> Result<IncomingEmail> {
        let content = fs::read_to_string(path)?;
        let is_json = path.extension().is_some_and(|ext| ext == "json");
        if is_json {
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(serde_yaml::from_str(&content)?)
        }
    }
}

impl MailSource for DirectorySource {
    fn fetch(&mut self) -> Result<Vec<IncomingEmail>> {
        if !self.dir.is_dir() {
            return Err(BiletoError::InvalidInput(format!(
                "Mail spool directory does not exist: {}",
                self.dir.display()
            )));
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .and_then(|ext| ext.to_str())
                        .is_some_and(|ext| matches!(ext, "yaml" | "yml" | "json"))
            })
            .collect();
        paths.sort();

        let mut emails = Vec::with_capacity(paths.len());
        for path in paths {
            match Self::parse(&path) {
                Ok(email) => {
                    emails.push(email);
                    fs::remove_file(&path)?;
                },
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable e-mail");
                },
            }
        }
        tracing::debug!(count = emails.len(), dir = %self.dir.display(), "fetched e-mails");
        Ok(emails)
    }
}
