//! Layered configuration
//!
//! Settings are read, lowest priority first, from built-in defaults, the
//! user configuration file, the project's `.bileto/config.yaml` and
//! `BILETO__*` environment variables (`BILETO__SESSION__USER`,
//! `BILETO__MAILBOX__MAX_ATTEMPTS`, ...).

use crate::core::TicketType;
use crate::error::Result;
use crate::notifications::NotificationSettings;
use crate::search::TicketSort;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the configuration file, in the user and project directories
pub const CONFIG_FILE: &str = "config.yaml";

const ENV_PREFIX: &str = "BILETO";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// E-mail of the user the CLI acts as
    #[serde(default)]
    pub user: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketsConfig {
    pub default_type: TicketType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    pub default_sort: TicketSort,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailboxConfig {
    /// Spool directory of incoming e-mails, relative to `.bileto/`
    pub spool_dir: PathBuf,
    /// Failed e-mails are no longer retried after this many attempts
    pub max_attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationsConfig {
    pub enabled: bool,
    pub from: String,
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
    pub tickets: TicketsConfig,
    pub search: SearchConfig,
    pub mailbox: MailboxConfig,
    pub notifications: NotificationsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            tickets: TicketsConfig {
                default_type: TicketType::Request,
            },
            search: SearchConfig {
                default_sort: TicketSort::CreatedDesc,
            },
            mailbox: MailboxConfig {
                spool_dir: PathBuf::from("spool"),
                max_attempts: 5,
            },
            notifications: NotificationsConfig {
                enabled: true,
                from: "support@localhost".to_string(),
            },
        }
    }
}

impl Config {
    /// Load the configuration of the project stored in `data_dir`
    ///
    /// Without a project, only the defaults, the user file and the
    /// environment are considered.
    pub fn load(data_dir: Option<&Path>) -> Result<Self> {
        let defaults = Self::default();
        let mut builder = config::Config::builder()
            .set_default("tickets.default_type", defaults.tickets.default_type.to_string())?
            .set_default("search.default_sort", defaults.search.default_sort.to_string())?
            .set_default(
                "mailbox.spool_dir",
                defaults.mailbox.spool_dir.to_string_lossy().to_string(),
            )?
            .set_default("mailbox.max_attempts", i64::from(defaults.mailbox.max_attempts))?
            .set_default("notifications.enabled", defaults.notifications.enabled)?
            .set_default("notifications.from", defaults.notifications.from)?;

        if let Some(path) = Self::user_config_path() {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        if let Some(data_dir) = data_dir {
            builder = builder.add_source(config::File::from(data_dir.join(CONFIG_FILE)).required(false));
        }

        let config: Self = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        tracing::debug!(?config, "configuration loaded");
        Ok(config)
    }

    /// Location of the user configuration file, if the platform has one
    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "Bileto", "bileto").map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    /// Write the configuration of a new project
    pub fn write_project(&self, data_dir: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        fs::write(data_dir.join(CONFIG_FILE), content)?;
        Ok(())
    }

    /// Absolute spool directory of the project in `data_dir`
    pub fn spool_dir(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.mailbox.spool_dir)
    }

    pub fn notification_settings(&self) -> NotificationSettings {
        NotificationSettings {
            enabled: self.notifications.enabled,
            from: self.notifications.from.clone(),
        }
    }
}
