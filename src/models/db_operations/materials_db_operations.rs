use crate::models::material_models::{Material, MaterialChange, MaterialPatch};
use super::{record_key, DbError};
use redb::{Database, ReadableTable, TableDefinition};
use std::sync::Arc;

pub const MATERIALS: TableDefinition<&[u8; 16], &str> = TableDefinition::new("materials");
/// (client_id, material key) -> (). Lets a client's materials be listed
/// without scanning every record.
pub const MATERIALS_BY_CLIENT: TableDefinition<(&str, &[u8; 16]), ()> = TableDefinition::new("materials_by_client");

/// Persistent collection of materials.
///
/// Every method that writes is a single atomic unit: a concurrent reader of
/// the same material sees the record either entirely before or entirely
/// after the call.
pub trait MaterialStore: Send + Sync {
    fn get(&self, id: &str) -> Result<Option<Material>, DbError>;

    /// All materials, or only those owned by `client_id`.
    fn list(&self, client_id: Option<&str>) -> Result<Vec<Material>, DbError>;

    fn insert(&self, material: &Material) -> Result<(), DbError>;

    /// Applies `change` (comment append, history append, status write) to the
    /// material in one step. With `owner` set, a material owned by anyone
    /// else is treated as absent. Returns the updated record, or `None` if
    /// nothing matched.
    fn append_and_set(
        &self,
        id: &str,
        owner: Option<&str>,
        change: &MaterialChange,
    ) -> Result<Option<Material>, DbError>;

    /// Overwrites plain fields. Leaves the embedded sequences untouched.
    fn patch(&self, id: &str, patch: &MaterialPatch) -> Result<Option<Material>, DbError>;
}

pub struct RedbMaterialStore {
    db: Arc<Database>,
}

impl RedbMaterialStore {
    pub fn new(db: Arc<Database>) -> Self {
        RedbMaterialStore { db }
    }

    /// Shared read-modify-write under one redb write transaction. redb admits
    /// a single writer at a time, so two updates to the same material can
    /// never interleave and lose each other's appends.
    fn modify<F>(&self, id: &str, owner: Option<&str>, mutate: F) -> Result<Option<Material>, DbError>
    where
        F: FnOnce(&mut Material),
    {
        let key = match record_key(id) {
            Some(k) => k,
            None => return Ok(None),
        };

        let write_txn = self.db.begin_write()?;
        let updated = {
            let mut table = write_txn.open_table(MATERIALS)?;
            let mut material: Material = {
                let guard = match table.get(&key)? {
                    Some(g) => g,
                    None => return Ok(None),
                };
                serde_json::from_str(guard.value())?
            };

            if let Some(owner_id) = owner {
                if material.client_id != owner_id {
                    return Ok(None);
                }
            }

            mutate(&mut material);
            let json = serde_json::to_string(&material)?;
            table.insert(&key, json.as_str())?;
            material
        };
        write_txn.commit()?;
        Ok(Some(updated))
    }
}

impl MaterialStore for RedbMaterialStore {
    fn get(&self, id: &str) -> Result<Option<Material>, DbError> {
        let key = match record_key(id) {
            Some(k) => k,
            None => return Ok(None),
        };
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(MATERIALS)?;
        let material = match table.get(&key)? {
            Some(guard) => Some(serde_json::from_str(guard.value())?),
            None => None,
        };
        Ok(material)
    }

    fn list(&self, client_id: Option<&str>) -> Result<Vec<Material>, DbError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(MATERIALS)?;

        let mut materials: Vec<Material> = match client_id {
            Some(client_id) => {
                let index = read_txn.open_table(MATERIALS_BY_CLIENT)?;
                let start_key = (client_id, &[0u8; 16]);
                let end_key = (client_id, &[255u8; 16]);
                let mut found = Vec::new();
                for entry in index.range(start_key..=end_key)? {
                    let (index_key, _) = entry?;
                    let material_key = index_key.value().1;
                    if let Some(guard) = table.get(material_key)? {
                        found.push(serde_json::from_str(guard.value())?);
                    }
                }
                found
            }
            None => {
                let mut found = Vec::new();
                for entry in table.iter()? {
                    let (_, value) = entry?;
                    found.push(serde_json::from_str(value.value())?);
                }
                found
            }
        };

        materials.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(materials)
    }

    fn insert(&self, material: &Material) -> Result<(), DbError> {
        let key = record_key(&material.id)
            .ok_or_else(|| DbError::InvalidKey(material.id.clone()))?;
        let json = serde_json::to_string(material)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(MATERIALS)?;
            let mut index = write_txn.open_table(MATERIALS_BY_CLIENT)?;
            table.insert(&key, json.as_str())?;
            index.insert((material.client_id.as_str(), &key), ())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn append_and_set(
        &self,
        id: &str,
        owner: Option<&str>,
        change: &MaterialChange,
    ) -> Result<Option<Material>, DbError> {
        self.modify(id, owner, |material| material.apply_change(change))
    }

    fn patch(&self, id: &str, patch: &MaterialPatch) -> Result<Option<Material>, DbError> {
        self.modify(id, None, |material| material.apply_patch(patch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::material_models::{MaterialStatus, MaterialType, NewMaterial};
    use crate::setup::db_setup;
    use chrono::Utc;
    use std::thread;
    use tempfile::TempDir;

    fn store() -> (TempDir, RedbMaterialStore) {
        let dir = TempDir::new().unwrap();
        let db = Database::create(dir.path().join("content.db")).unwrap();
        db_setup::setup_content_db(&db).unwrap();
        (dir, RedbMaterialStore::new(Arc::new(db)))
    }

    fn material_for(client_id: &str) -> Material {
        Material::new(
            client_id,
            NewMaterial {
                title: "Reel".into(),
                description: String::new(),
                material_type: MaterialType::Video,
                scheduled_date: Utc::now(),
                file_url: None,
                tags: Default::default(),
            },
            Some("admin-1"),
        )
    }

    #[test]
    fn list_is_scoped_by_owner() {
        let (_dir, store) = store();
        let a = material_for("client-a");
        let b = material_for("client-b");
        store.insert(&a).unwrap();
        store.insert(&b).unwrap();

        let owned: Vec<String> = store.list(Some("client-a")).unwrap().into_iter().map(|m| m.id).collect();
        assert_eq!(owned, vec![a.id.clone()]);
        assert_eq!(store.list(None).unwrap().len(), 2);
    }

    #[test]
    fn append_and_set_hides_foreign_and_malformed_ids() {
        let (_dir, store) = store();
        let m = material_for("client-a");
        store.insert(&m).unwrap();

        let change = MaterialChange::approve(Utc::now());
        assert!(store.append_and_set(&m.id, Some("client-b"), &change).unwrap().is_none());
        assert!(store.append_and_set("not-a-uuid", Some("client-a"), &change).unwrap().is_none());
        assert!(store.get("not-a-uuid").unwrap().is_none());

        // The foreign attempt left no trace.
        let stored = store.get(&m.id).unwrap().unwrap();
        assert_eq!(stored.status, MaterialStatus::Planned);
        assert!(stored.approval_history.is_empty());
    }

    #[test]
    fn concurrent_decisions_are_all_recorded_in_order() {
        let (_dir, store) = store();
        let store = Arc::new(store);
        let m = material_for("client-a");
        store.insert(&m).unwrap();

        let workers: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                let id = m.id.clone();
                thread::spawn(move || {
                    for _ in 0..5 {
                        let change = if i % 2 == 0 {
                            MaterialChange::approve(Utc::now())
                        } else {
                            MaterialChange::request_revision(Utc::now(), "tweak", "Acme")
                        };
                        store.append_and_set(&id, Some("client-a"), &change).unwrap().unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let stored = store.get(&m.id).unwrap().unwrap();
        assert_eq!(stored.approval_history.len(), 40);
        assert_eq!(stored.comments.len(), 20);
        assert!(stored
            .approval_history
            .windows(2)
            .all(|pair| pair[0].timestamp <= pair[1].timestamp));
    }

    #[test]
    fn patch_keeps_embedded_sequences() {
        let (_dir, store) = store();
        let m = material_for("client-a");
        store.insert(&m).unwrap();
        store
            .append_and_set(&m.id, Some("client-a"), &MaterialChange::request_revision(Utc::now(), "x", "Acme"))
            .unwrap();

        let patched = store
            .patch(&m.id, &MaterialPatch { status: Some(MaterialStatus::AwaitingApproval), ..Default::default() })
            .unwrap()
            .unwrap();
        assert_eq!(patched.status, MaterialStatus::AwaitingApproval);
        assert_eq!(patched.approval_history.len(), 1);
        assert_eq!(patched.comments.len(), 1);
    }
}
