use super::validation::validate_name;
use super::{LabelId, TeamId, UserId};
use crate::error::{BiletoError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A group of agents tickets can be assigned to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    #[serde(default)]
    pub agents: Vec<UserId>,
    /// Tickets assigned to the team are under its responsibility
    #[serde(default)]
    pub is_responsible: bool,
    pub created_at: DateTime<Utc>,
}

impl Team {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into().trim().to_string();
        validate_name("Team name", &name)?;
        Ok(Self {
            id: TeamId::new(),
            name,
            agents: Vec::new(),
            is_responsible: false,
            created_at: Utc::now(),
        })
    }

    /// Add an agent; returns false if already a member
    pub fn add_agent(&mut self, user_id: UserId) -> bool {
        if self.agents.contains(&user_id) {
            return false;
        }
        self.agents.push(user_id);
        true
    }

    pub fn has_agent(&self, user_id: &UserId) -> bool {
        self.agents.contains(user_id)
    }
}

/// Colors a label can be displayed with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelColor {
    #[default]
    Grey,
    Primary,
    Blue,
    Green,
    Orange,
    Red,
}

impl fmt::Display for LabelColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Grey => "grey",
            Self::Primary => "primary",
            Self::Blue => "blue",
            Self::Green => "green",
            Self::Orange => "orange",
            Self::Red => "red",
        };
        write!(f, "{s}")
    }
}

impl FromStr for LabelColor {
    type Err = BiletoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "grey" | "gray" => Ok(Self::Grey),
            "primary" => Ok(Self::Primary),
            "blue" => Ok(Self::Blue),
            "green" => Ok(Self::Green),
            "orange" => Ok(Self::Orange),
            "red" => Ok(Self::Red),
            _ => Err(BiletoError::InvalidInput(format!(
                "Invalid color: {s}. Must be one of: grey, primary, blue, green, orange, red"
            ))),
        }
    }
}

/// A tag agents put on tickets to classify them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub id: LabelId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub color: LabelColor,
}

impl Label {
    pub fn new(name: impl Into<String>, color: LabelColor) -> Result<Self> {
        let name = name.into().trim().to_string();
        validate_name("Label name", &name)?;
        Ok(Self {
            id: LabelId::new(),
            name,
            description: String::new(),
            color,
        })
    }
}
