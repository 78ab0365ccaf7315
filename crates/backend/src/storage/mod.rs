use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
};
use replaiced_shared::coords::clamp_position;
use replaiced_shared::models::{AiBox, MapConfiguration};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

const BOXES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("boxes");
const MAP_CONFIGS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("map_configs");

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] redb::Error),
    #[error("failed to encode or decode record: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("filesystem error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn db_err<E: Into<redb::Error>>(e: E) -> StoreError {
    StoreError::Db(e.into())
}

pub struct Storage {
    db: Database,
    path: PathBuf,
}

impl Storage {
    pub fn open(path: &Path) -> Result<Arc<Self>, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let db = Database::create(path).map_err(db_err)?;

        // Ensure tables exist so read transactions never hit a missing table
        let write_txn = db.begin_write().map_err(db_err)?;
        {
            write_txn.open_table(BOXES_TABLE).map_err(db_err)?;
            write_txn.open_table(MAP_CONFIGS_TABLE).map_err(db_err)?;
        }
        write_txn.commit().map_err(db_err)?;

        Ok(Arc::new(Storage {
            db,
            path: path.to_path_buf(),
        }))
    }

    #[cfg(test)]
    pub fn save_box(&self, record: &AiBox) -> Result<(), StoreError> {
        let json = serde_json::to_vec(record)?;
        let id_str = record.id.to_string();

        let write_txn = self.db.begin_write().map_err(db_err)?;
        {
            let mut table = write_txn.open_table(BOXES_TABLE).map_err(db_err)?;
            table
                .insert(id_str.as_str(), json.as_slice())
                .map_err(db_err)?;
        }
        write_txn.commit().map_err(db_err)?;
        Ok(())
    }

    /// Build a new box from the current box list and insert it in the same
    /// write transaction, so concurrent placements see each other.
    pub fn insert_box_with<F>(&self, build: F) -> Result<AiBox, StoreError>
    where
        F: FnOnce(&[AiBox]) -> AiBox,
    {
        let write_txn = self.db.begin_write().map_err(db_err)?;
        let record = {
            let mut table = write_txn.open_table(BOXES_TABLE).map_err(db_err)?;
            let mut existing = Vec::new();
            for entry in table.iter().map_err(db_err)? {
                let (_, value) = entry.map_err(db_err)?;
                existing.push(serde_json::from_slice::<AiBox>(value.value())?);
            }
            let record = build(&existing);
            let json = serde_json::to_vec(&record)?;
            let id_str = record.id.to_string();
            table
                .insert(id_str.as_str(), json.as_slice())
                .map_err(db_err)?;
            record
        };
        write_txn.commit().map_err(db_err)?;
        Ok(record)
    }

    /// Read, change and write one box inside a single write transaction.
    /// Returns `None` without writing when the box does not exist, so an edit
    /// racing a delete can never bring the box back.
    pub fn modify_box_with<F>(&self, id: &Uuid, change: F) -> Result<Option<AiBox>, StoreError>
    where
        F: FnOnce(&mut AiBox),
    {
        let id_str = id.to_string();
        let write_txn = self.db.begin_write().map_err(db_err)?;
        let record = {
            let mut table = write_txn.open_table(BOXES_TABLE).map_err(db_err)?;
            let current = match table.get(id_str.as_str()).map_err(db_err)? {
                Some(value) => Some(serde_json::from_slice::<AiBox>(value.value())?),
                None => None,
            };
            let Some(mut record) = current else {
                return Ok(None);
            };
            change(&mut record);
            let json = serde_json::to_vec(&record)?;
            table
                .insert(id_str.as_str(), json.as_slice())
                .map_err(db_err)?;
            record
        };
        write_txn.commit().map_err(db_err)?;
        Ok(Some(record))
    }

    /// Pull every box inside `[-world_size / 2, world_size / 2]` on both axes.
    /// Returns how many boxes moved.
    pub fn clamp_boxes_to_world(&self, world_size: f64, updated_at: &str) -> Result<u64, StoreError> {
        let write_txn = self.db.begin_write().map_err(db_err)?;
        let moved = {
            let mut table = write_txn.open_table(BOXES_TABLE).map_err(db_err)?;
            let mut outside = Vec::new();
            for entry in table.iter().map_err(db_err)? {
                let (_, value) = entry.map_err(db_err)?;
                let mut record = serde_json::from_slice::<AiBox>(value.value())?;
                let clamped = clamp_position(record.position, world_size);
                if clamped != record.position {
                    record.position = clamped;
                    record.updated_at = updated_at.to_string();
                    outside.push(record);
                }
            }
            for record in &outside {
                let json = serde_json::to_vec(record)?;
                let id_str = record.id.to_string();
                table
                    .insert(id_str.as_str(), json.as_slice())
                    .map_err(db_err)?;
            }
            outside.len() as u64
        };
        write_txn.commit().map_err(db_err)?;
        Ok(moved)
    }

    pub fn get_box(&self, id: &Uuid) -> Result<Option<AiBox>, StoreError> {
        let read_txn = self.db.begin_read().map_err(db_err)?;
        let table = read_txn.open_table(BOXES_TABLE).map_err(db_err)?;
        let id_str = id.to_string();

        match table.get(id_str.as_str()).map_err(db_err)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn list_boxes(&self) -> Result<Vec<AiBox>, StoreError> {
        let read_txn = self.db.begin_read().map_err(db_err)?;
        let table = read_txn.open_table(BOXES_TABLE).map_err(db_err)?;
        let mut boxes = Vec::new();
        for entry in table.iter().map_err(db_err)? {
            let (_, value) = entry.map_err(db_err)?;
            boxes.push(serde_json::from_slice::<AiBox>(value.value())?);
        }
        boxes.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(boxes)
    }

    #[cfg(test)]
    pub fn count_boxes(&self) -> Result<u64, StoreError> {
        let read_txn = self.db.begin_read().map_err(db_err)?;
        let table = read_txn.open_table(BOXES_TABLE).map_err(db_err)?;
        table.len().map_err(db_err)
    }

    pub fn delete_box(&self, id: &Uuid) -> Result<bool, StoreError> {
        let id_str = id.to_string();
        let write_txn = self.db.begin_write().map_err(db_err)?;
        let removed = {
            let mut table = write_txn.open_table(BOXES_TABLE).map_err(db_err)?;
            let result = table.remove(id_str.as_str()).map_err(db_err)?;
            result.is_some()
        };
        write_txn.commit().map_err(db_err)?;
        Ok(removed)
    }

    /// Remove every box. Returns how many were removed.
    pub fn clear_boxes(&self) -> Result<u64, StoreError> {
        let write_txn = self.db.begin_write().map_err(db_err)?;
        let removed = {
            let mut table = write_txn.open_table(BOXES_TABLE).map_err(db_err)?;
            let count = table.len().map_err(db_err)?;
            table.retain(|_, _| false).map_err(db_err)?;
            count
        };
        write_txn.commit().map_err(db_err)?;
        Ok(removed)
    }

    pub fn save_map_configuration(&self, saved: &MapConfiguration) -> Result<(), StoreError> {
        let json = serde_json::to_vec(saved)?;
        let write_txn = self.db.begin_write().map_err(db_err)?;
        {
            let mut table = write_txn.open_table(MAP_CONFIGS_TABLE).map_err(db_err)?;
            table
                .insert(saved.name.as_str(), json.as_slice())
                .map_err(db_err)?;
        }
        write_txn.commit().map_err(db_err)?;
        Ok(())
    }

    pub fn get_map_configuration(&self, name: &str) -> Result<Option<MapConfiguration>, StoreError> {
        let read_txn = self.db.begin_read().map_err(db_err)?;
        let table = read_txn.open_table(MAP_CONFIGS_TABLE).map_err(db_err)?;
        match table.get(name).map_err(db_err)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn map_configuration_names(&self) -> Result<Vec<String>, StoreError> {
        let read_txn = self.db.begin_read().map_err(db_err)?;
        let table = read_txn.open_table(MAP_CONFIGS_TABLE).map_err(db_err)?;
        let mut names = Vec::new();
        for entry in table.iter().map_err(db_err)? {
            let (key, _) = entry.map_err(db_err)?;
            names.push(key.value().to_string());
        }
        Ok(names)
    }

    pub fn db_size_bytes(&self) -> Result<u64, StoreError> {
        std::fs::metadata(&self.path)
            .map(|m| m.len())
            .map_err(|source| StoreError::Io {
                path: self.path.clone(),
                source,
            })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use replaiced_shared::config::MapConfig;
    use replaiced_shared::models::{BoxKind, Difficulty, Position};

    pub(crate) fn temp_storage() -> (tempfile::TempDir, Arc<Storage>) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(&dir.path().join("nested/boxes.redb")).unwrap();
        (dir, storage)
    }

    fn sample_box(name: &str, created_at: &str) -> AiBox {
        AiBox {
            id: Uuid::new_v4(),
            name: name.to_string(),
            position: Position::new(1.0, 2.0),
            kind: BoxKind::Gemini,
            difficulty: Difficulty::Medium,
            secret: "walrus".to_string(),
            system_prompt: "Guard the word.".to_string(),
            created_at: created_at.to_string(),
            updated_at: created_at.to_string(),
        }
    }

    #[test]
    fn test_open_creates_parent_directory() {
        let (dir, storage) = temp_storage();
        assert!(dir.path().join("nested").is_dir());
        assert_eq!(storage.count_boxes().unwrap(), 0);
        assert!(storage.db_size_bytes().unwrap() > 0);
    }

    #[test]
    fn test_save_and_get_box() {
        let (_dir, storage) = temp_storage();
        let b = sample_box("Sphinx", "2024-01-01T00:00:00Z");
        storage.save_box(&b).unwrap();

        let loaded = storage.get_box(&b.id).unwrap().unwrap();
        assert_eq!(loaded.name, "Sphinx");
        assert_eq!(loaded.secret, "walrus");
        assert_eq!(loaded.position, Position::new(1.0, 2.0));
        assert!(storage.get_box(&Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn test_list_sorted_by_creation() {
        let (_dir, storage) = temp_storage();
        storage
            .save_box(&sample_box("second", "2024-01-02T00:00:00Z"))
            .unwrap();
        storage
            .save_box(&sample_box("first", "2024-01-01T00:00:00Z"))
            .unwrap();
        let names: Vec<_> = storage
            .list_boxes()
            .unwrap()
            .into_iter()
            .map(|b| b.name)
            .collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn test_insert_with_sees_existing() {
        let (_dir, storage) = temp_storage();
        storage
            .save_box(&sample_box("a", "2024-01-01T00:00:00Z"))
            .unwrap();
        let created = storage
            .insert_box_with(|existing| {
                assert_eq!(existing.len(), 1);
                sample_box("b", "2024-01-02T00:00:00Z")
            })
            .unwrap();
        assert_eq!(storage.count_boxes().unwrap(), 2);
        assert!(storage.get_box(&created.id).unwrap().is_some());
    }

    #[test]
    fn test_modify_box_with_writes_change() {
        let (_dir, storage) = temp_storage();
        let b = sample_box("before", "2024-01-01T00:00:00Z");
        storage.save_box(&b).unwrap();

        let changed = storage
            .modify_box_with(&b.id, |record| record.name = "after".to_string())
            .unwrap()
            .unwrap();
        assert_eq!(changed.name, "after");
        assert_eq!(storage.get_box(&b.id).unwrap().unwrap().name, "after");
    }

    #[test]
    fn test_modify_deleted_box_stays_deleted() {
        let (_dir, storage) = temp_storage();
        let b = sample_box("gone", "2024-01-01T00:00:00Z");
        storage.save_box(&b).unwrap();
        assert!(storage.delete_box(&b.id).unwrap());

        let result = storage
            .modify_box_with(&b.id, |_| panic!("deleted box must not be edited"))
            .unwrap();
        assert!(result.is_none());
        assert!(storage.get_box(&b.id).unwrap().is_none());
        assert_eq!(storage.count_boxes().unwrap(), 0);
    }

    #[test]
    fn test_delete_during_edit_wins() {
        let (_dir, storage) = temp_storage();
        let b = sample_box("contested", "2024-01-01T00:00:00Z");
        storage.save_box(&b).unwrap();
        let (started_tx, started_rx) = std::sync::mpsc::channel();

        let id = b.id;
        let shared = &storage;
        std::thread::scope(|scope| {
            let editor = scope.spawn(move || {
                shared
                    .modify_box_with(&id, |record| {
                        started_tx.send(()).unwrap();
                        std::thread::sleep(std::time::Duration::from_millis(50));
                        record.position = Position::new(9.0, 9.0);
                    })
                    .unwrap()
            });
            started_rx.recv().unwrap();
            // blocks until the edit commits, then removes the edited record
            assert!(storage.delete_box(&b.id).unwrap());
            assert!(editor.join().unwrap().is_some());
        });

        assert!(storage.get_box(&b.id).unwrap().is_none());
        assert!(storage
            .modify_box_with(&b.id, |record| record.name = "revived".to_string())
            .unwrap()
            .is_none());
        assert!(storage.get_box(&b.id).unwrap().is_none());
    }

    #[test]
    fn test_clamp_boxes_to_world() {
        let (_dir, storage) = temp_storage();
        let mut far = sample_box("far", "2024-01-01T00:00:00Z");
        far.position = Position::new(20.0, -30.0);
        let near = sample_box("near", "2024-01-01T00:00:00Z");
        storage.save_box(&far).unwrap();
        storage.save_box(&near).unwrap();

        let moved = storage
            .clamp_boxes_to_world(10.0, "2024-02-01T00:00:00Z")
            .unwrap();
        assert_eq!(moved, 1);

        let far = storage.get_box(&far.id).unwrap().unwrap();
        assert_eq!(far.position, Position::new(5.0, -5.0));
        assert_eq!(far.updated_at, "2024-02-01T00:00:00Z");
        let near = storage.get_box(&near.id).unwrap().unwrap();
        assert_eq!(near.position, Position::new(1.0, 2.0));
        assert_eq!(near.updated_at, "2024-01-01T00:00:00Z");
    }

    #[test]
    fn test_delete_box() {
        let (_dir, storage) = temp_storage();
        let b = sample_box("gone", "2024-01-01T00:00:00Z");
        storage.save_box(&b).unwrap();
        assert!(storage.delete_box(&b.id).unwrap());
        assert!(!storage.delete_box(&b.id).unwrap());
        assert!(storage.get_box(&b.id).unwrap().is_none());
    }

    #[test]
    fn test_clear_boxes() {
        let (_dir, storage) = temp_storage();
        for i in 0..3 {
            storage
                .save_box(&sample_box(&format!("b{i}"), "2024-01-01T00:00:00Z"))
                .unwrap();
        }
        assert_eq!(storage.clear_boxes().unwrap(), 3);
        assert_eq!(storage.count_boxes().unwrap(), 0);
        assert_eq!(storage.clear_boxes().unwrap(), 0);
    }

    #[test]
    fn test_map_configuration_roundtrip() {
        let (_dir, storage) = temp_storage();
        let mut config = MapConfig::default();
        config.world_size = 120.0;
        storage
            .save_map_configuration(&MapConfiguration {
                name: "wide".to_string(),
                config,
                saved_at: "2024-01-01T00:00:00Z".to_string(),
            })
            .unwrap();

        let loaded = storage.get_map_configuration("wide").unwrap().unwrap();
        assert_eq!(loaded.config.world_size, 120.0);
        assert_eq!(storage.map_configuration_names().unwrap(), vec!["wide"]);
        assert!(storage.get_map_configuration("missing").unwrap().is_none());
    }
}
