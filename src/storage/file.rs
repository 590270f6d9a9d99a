use super::repository::{Entity, Repository};
use crate::error::{BiletoError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const STATE_FILE: &str = "state.yaml";

/// Project-wide state stored next to the collections
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectState {
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Last ticket number handed out
    #[serde(default)]
    pub ticket_counter: u64,
}

impl ProjectState {
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            description,
            created_at: now,
            updated_at: now,
            ticket_counter: 0,
        }
    }
}

/// YAML file storage: one document per record, one directory per collection
///
/// Writes go through a temporary file renamed over the target, so a reader
/// never observes a half-written document.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Create a storage rooted at the `.bileto` directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether `init` has been run for this directory
    pub fn is_initialized(&self) -> bool {
        self.root.join(STATE_FILE).exists()
    }

    /// Create the root directory
    pub fn ensure_directories(&self) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    pub fn load_state(&self) -> Result<ProjectState> {
        let path = self.root.join(STATE_FILE);
        if !path.exists() {
            return Err(BiletoError::ProjectNotInitialized);
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    pub fn save_state(&self, state: &ProjectState) -> Result<()> {
        let content = serde_yaml::to_string(state)?;
        write_atomically(&self.root.join(STATE_FILE), &content)
    }


    fn collection_dir<E: Entity>(&self) -> PathBuf {
        self.root.join(E::COLLECTION)
    }

    fn entity_path<E: Entity>(&self, id: &E::Id) -> PathBuf {
        self.collection_dir::<E>().join(format!("{id}.yaml"))
    }
}

impl Repository for FileStorage {
    fn next_ticket_number(&self) -> Result<u64> {
        let mut state = self.load_state()?;
        state.ticket_counter += 1;
        state.updated_at = Utc::now();
        self.save_state(&state)?;
        Ok(state.ticket_counter)
    }

    fn reserve_ticket_numbers(&self, number: u64) -> Result<()> {
        let mut state = self.load_state()?;
        if state.ticket_counter < number {
            state.ticket_counter = number;
            state.updated_at = Utc::now();
            self.save_state(&state)?;
        }
        Ok(())
    }

    fn save<E: Entity>(&self, entity: &E) -> Result<()> {
        fs::create_dir_all(self.collection_dir::<E>())?;
        let content = serde_yaml::to_string(entity)?;
        write_atomically(&self.entity_path::<E>(entity.id()), &content)?;
        tracing::debug!(kind = E::KIND, id = %entity.id(), "saved record");
        Ok(())
    }

    fn load<E: Entity>(&self, id: &E::Id) -> Result<E> {
        let path = self.entity_path::<E>(id);
        if !path.exists() {
            return Err(BiletoError::not_found(E::KIND, id));
        }
        let content = fs::read_to_string(&path)?;
        serde_yaml::from_str(&content).map_err(|e| {
            BiletoError::ParseError(format!("{} {id}: {e}", E::KIND))
        })
    }

    fn load_all<E: Entity>(&self) -> Result<Vec<E>> {
        let dir = self.collection_dir::<E>();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(&dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "yaml"))
            .collect();
        paths.sort();

        let mut entities = Vec::with_capacity(paths.len());
        for path in paths {
            let content = fs::read_to_string(&path)?;
            let entity = serde_yaml::from_str(&content).map_err(|e| {
                BiletoError::ParseError(format!("{}: {e}", path.display()))
            })?;
            entities.push(entity);
        }
        Ok(entities)
    }

    fn delete<E: Entity>(&self, id: &E::Id) -> Result<()> {
        let path = self.entity_path::<E>(id);
        if !path.exists() {
            return Err(BiletoError::not_found(E::KIND, id));
        }
        fs::remove_file(path)?;
        tracing::debug!(kind = E::KIND, id = %id, "deleted record");
        Ok(())
    }
}

/// Replace a file through a sibling temporary file and a rename
pub(crate) fn write_atomically(path: &Path, content: &str) -> Result<()> {
    let tmp = path.with_extension("yaml.tmp");
    fs::write(&tmp, content)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Organization, OrganizationId};
    use tempfile::TempDir;

    #[test]
    fn test_state_and_ticket_counter() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path().join(".bileto"));
        assert!(!storage.is_initialized());
        assert!(matches!(
            storage.load_state(),
            Err(BiletoError::ProjectNotInitialized)
        ));

        storage.ensure_directories().unwrap();
        storage.save_state(&ProjectState::new("Support", None)).unwrap();
        assert!(storage.is_initialized());
        assert_eq!(storage.next_ticket_number().unwrap(), 1);
        assert_eq!(storage.next_ticket_number().unwrap(), 2);
        storage.reserve_ticket_numbers(10).unwrap();
        storage.reserve_ticket_numbers(4).unwrap();
        assert_eq!(storage.next_ticket_number().unwrap(), 11);
        assert_eq!(storage.load_state().unwrap().ticket_counter, 11);
    }

    #[test]
    fn test_missing_record() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path().join(".bileto"));
        let err = storage.load::<Organization>(&OrganizationId::new()).unwrap_err();
        assert!(err.is_not_found());
        assert!(storage.load_all::<Organization>().unwrap().is_empty());
    }

    #[test]
    fn test_corrupted_record_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path().join(".bileto"));
        let orga = Organization::new("Acme").unwrap();
        storage.save(&orga).unwrap();
        let path = storage.root().join("organizations").join(format!("{}.yaml", orga.id));
        fs::write(path, "name: [unterminated").unwrap();
        assert!(matches!(
            storage.load::<Organization>(&orga.id),
            Err(BiletoError::ParseError(_))
        ));
    }
}
