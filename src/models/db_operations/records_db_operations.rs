use crate::models::record_models::{Campaign, CampaignPatch, Document, DocumentPatch};
use super::materials_db_operations::{MATERIALS, MATERIALS_BY_CLIENT};
use super::{record_key, DbError};
use redb::{Database, ReadableTable, TableDefinition, WriteTransaction};
use serde::de::DeserializeOwned;
use serde::Serialize;

type RecordTable = TableDefinition<'static, &'static [u8; 16], &'static str>;
type OwnerIndex = TableDefinition<'static, (&'static str, &'static [u8; 16]), ()>;

pub const CAMPAIGNS: RecordTable = TableDefinition::new("campaigns");
pub const CAMPAIGNS_BY_CLIENT: OwnerIndex = TableDefinition::new("campaigns_by_client");
pub const DOCUMENTS: RecordTable = TableDefinition::new("documents");
pub const DOCUMENTS_BY_CLIENT: OwnerIndex = TableDefinition::new("documents_by_client");

/// A JSON record that belongs to exactly one client.
trait OwnedRecord: Serialize + DeserializeOwned {
    fn id(&self) -> &str;
    fn client_id(&self) -> &str;
}

impl OwnedRecord for Campaign {
    fn id(&self) -> &str { &self.id }
    fn client_id(&self) -> &str { &self.client_id }
}

impl OwnedRecord for Document {
    fn id(&self) -> &str { &self.id }
    fn client_id(&self) -> &str { &self.client_id }
}

fn insert_record<T: OwnedRecord>(db: &Database, table_def: RecordTable, index_def: OwnerIndex, record: &T) -> Result<(), DbError> {
    let key = record_key(record.id())
        .ok_or_else(|| DbError::InvalidKey(record.id().to_string()))?;
    let json = serde_json::to_string(record)?;

    let write_txn = db.begin_write()?;
    {
        let mut table = write_txn.open_table(table_def)?;
        let mut index = write_txn.open_table(index_def)?;
        table.insert(&key, json.as_str())?;
        index.insert((record.client_id(), &key), ())?;
    }
    write_txn.commit()?;
    Ok(())
}

fn read_record<T: OwnedRecord>(db: &Database, table_def: RecordTable, id: &str) -> Result<Option<T>, DbError> {
    let key = match record_key(id) {
        Some(k) => k,
        None => return Ok(None),
    };
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(table_def)?;
    let record = match table.get(&key)? {
        Some(guard) => Some(serde_json::from_str(guard.value())?),
        None => None,
    };
    Ok(record)
}

fn list_records<T: OwnedRecord>(
    db: &Database,
    table_def: RecordTable,
    index_def: OwnerIndex,
    client_id: Option<&str>,
) -> Result<Vec<T>, DbError> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(table_def)?;
    let mut records = Vec::new();

    match client_id {
        Some(client_id) => {
            let index = read_txn.open_table(index_def)?;
            for entry in index.range((client_id, &[0u8; 16])..=(client_id, &[255u8; 16]))? {
                let (index_key, _) = entry?;
                if let Some(guard) = table.get(index_key.value().1)? {
                    records.push(serde_json::from_str(guard.value())?);
                }
            }
        }
        None => {
            for entry in table.iter()? {
                let (_, value) = entry?;
                records.push(serde_json::from_str(value.value())?);
            }
        }
    }
    Ok(records)
}

fn modify_record<T, F>(db: &Database, table_def: RecordTable, id: &str, mutate: F) -> Result<Option<T>, DbError>
where
    T: OwnedRecord,
    F: FnOnce(&mut T),
{
    let key = match record_key(id) {
        Some(k) => k,
        None => return Ok(None),
    };

    let write_txn = db.begin_write()?;
    let updated = {
        let mut table = write_txn.open_table(table_def)?;
        let mut record: T = {
            let guard = match table.get(&key)? {
                Some(g) => g,
                None => return Ok(None),
            };
            serde_json::from_str(guard.value())?
        };
        mutate(&mut record);
        let json = serde_json::to_string(&record)?;
        table.insert(&key, json.as_str())?;
        record
    };
    write_txn.commit()?;
    Ok(Some(updated))
}

fn remove_owned(write_txn: &WriteTransaction, table_def: RecordTable, index_def: OwnerIndex, client_id: &str) -> Result<usize, DbError> {
    let mut table = write_txn.open_table(table_def)?;
    let mut index = write_txn.open_table(index_def)?;

    let mut keys: Vec<[u8; 16]> = Vec::new();
    for entry in index.range((client_id, &[0u8; 16])..=(client_id, &[255u8; 16]))? {
        let (index_key, _) = entry?;
        keys.push(*index_key.value().1);
    }

    for key in &keys {
        table.remove(key)?;
        index.remove((client_id, key))?;
    }
    Ok(keys.len())
}

// ====================================================================
// =========================== CAMPAIGNS ==============================
// ====================================================================

pub fn create_campaign(db: &Database, campaign: &Campaign) -> Result<(), DbError> {
    insert_record(db, CAMPAIGNS, CAMPAIGNS_BY_CLIENT, campaign)
}

pub fn list_campaigns(db: &Database, client_id: Option<&str>) -> Result<Vec<Campaign>, DbError> {
    let mut campaigns: Vec<Campaign> = list_records(db, CAMPAIGNS, CAMPAIGNS_BY_CLIENT, client_id)?;
    campaigns.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    Ok(campaigns)
}

pub fn update_campaign(db: &Database, id: &str, patch: &CampaignPatch) -> Result<Option<Campaign>, DbError> {
    modify_record(db, CAMPAIGNS, id, |campaign: &mut Campaign| campaign.apply_patch(patch))
}

// ====================================================================
// =========================== DOCUMENTS ==============================
// ====================================================================

pub fn create_document(db: &Database, document: &Document) -> Result<(), DbError> {
    insert_record(db, DOCUMENTS, DOCUMENTS_BY_CLIENT, document)
}

pub fn read_document(db: &Database, id: &str) -> Result<Option<Document>, DbError> {
    read_record(db, DOCUMENTS, id)
}

pub fn list_documents(db: &Database, client_id: Option<&str>) -> Result<Vec<Document>, DbError> {
    let mut documents: Vec<Document> = list_records(db, DOCUMENTS, DOCUMENTS_BY_CLIENT, client_id)?;
    documents.sort_by(|a, b| b.upload_date.cmp(&a.upload_date).then_with(|| a.id.cmp(&b.id)));
    Ok(documents)
}

pub fn update_document(db: &Database, id: &str, patch: &DocumentPatch) -> Result<Option<Document>, DbError> {
    modify_record(db, DOCUMENTS, id, |document: &mut Document| document.apply_patch(patch))
}

// ====================================================================
// ============================ CASCADE ===============================
// ====================================================================

/// Removes every material, campaign and document owned by `client_id` in a
/// single write transaction. Returns how many records were removed.
pub fn delete_client_content(db: &Database, client_id: &str) -> Result<usize, DbError> {
    let write_txn = db.begin_write()?;
    let removed = remove_owned(&write_txn, MATERIALS, MATERIALS_BY_CLIENT, client_id)?
        + remove_owned(&write_txn, CAMPAIGNS, CAMPAIGNS_BY_CLIENT, client_id)?
        + remove_owned(&write_txn, DOCUMENTS, DOCUMENTS_BY_CLIENT, client_id)?;
    write_txn.commit()?;
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::db_operations::materials_db_operations::{MaterialStore, RedbMaterialStore};
    use crate::models::material_models::{Material, MaterialType, NewMaterial};
    use crate::models::record_models::{CampaignStatus, DocumentCategory, NewCampaign, NewDocument};
    use crate::setup::db_setup;
    use chrono::Utc;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn content_db() -> (TempDir, Arc<Database>) {
        let dir = TempDir::new().unwrap();
        let db = Database::create(dir.path().join("content.db")).unwrap();
        db_setup::setup_content_db(&db).unwrap();
        (dir, Arc::new(db))
    }

    fn document_for(client_id: &str, visible: bool) -> Document {
        Document::new(NewDocument {
            client_id: client_id.into(),
            name: "Brand book".into(),
            category: DocumentCategory::Guidelines,
            file_type: "pdf".into(),
            size: "5.7 MB".into(),
            file_url: "https://files.example.com/brand.pdf".into(),
            visible_to_client: visible,
        })
    }

    #[test]
    fn document_visibility_can_be_toggled() {
        let (_dir, db) = content_db();
        let doc = document_for("client-a", true);
        create_document(&db, &doc).unwrap();

        let patch = DocumentPatch { visible_to_client: Some(false), ..Default::default() };
        let updated = update_document(&db, &doc.id, &patch).unwrap().unwrap();
        assert!(!updated.visible_to_client);
        assert!(!read_document(&db, &doc.id).unwrap().unwrap().visible_to_client);
    }

    #[test]
    fn cascade_removes_only_the_deleted_clients_records() {
        let (_dir, db) = content_db();
        let materials = RedbMaterialStore::new(Arc::clone(&db));

        for owner in ["client-a", "client-b"] {
            materials
                .insert(&Material::new(
                    owner,
                    NewMaterial {
                        title: "Post".into(),
                        description: String::new(),
                        material_type: MaterialType::Story,
                        scheduled_date: Utc::now(),
                        file_url: None,
                        tags: Default::default(),
                    },
                    None,
                ))
                .unwrap();
            create_campaign(
                &db,
                &Campaign::new(NewCampaign {
                    client_id: owner.into(),
                    name: "Awareness".into(),
                    status: CampaignStatus::Active,
                    impressions: 100,
                    clicks: 5,
                    conversions: 1,
                    budget: 50.0,
                    spend: 10.0,
                }),
            )
            .unwrap();
            create_document(&db, &document_for(owner, true)).unwrap();
        }

        assert_eq!(delete_client_content(&db, "client-a").unwrap(), 3);
        assert!(materials.list(Some("client-a")).unwrap().is_empty());
        assert!(list_campaigns(&db, Some("client-a")).unwrap().is_empty());
        assert!(list_documents(&db, Some("client-a")).unwrap().is_empty());
        assert_eq!(materials.list(None).unwrap().len(), 1);
        assert_eq!(list_campaigns(&db, None).unwrap().len(), 1);
        assert_eq!(list_documents(&db, Some("client-b")).unwrap().len(), 1);
    }
}
