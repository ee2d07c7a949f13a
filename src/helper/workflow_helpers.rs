use super::sanitization_helpers::{clean_required_text, strip_all_html};
use super::PortalError;
use crate::models::db_operations::materials_db_operations::MaterialStore;
use crate::models::material_models::{Comment, Material, MaterialChange, MaterialPatch, NewMaterial};
use crate::models::{AdminUser, Client};
use chrono::Utc;
use std::sync::Arc;

/// The material approval state machine.
///
/// Client operations are scoped to materials the client owns; a material
/// owned by anyone else is reported exactly like one that does not exist.
/// Admin operations are unscoped and may set any status directly without
/// touching the audit trail.
#[derive(Clone)]
pub struct ApprovalWorkflow {
    store: Arc<dyn MaterialStore>,
}

impl ApprovalWorkflow {
    pub fn new(store: Arc<dyn MaterialStore>) -> Self {
        ApprovalWorkflow { store }
    }

    // --- Client side ---

    pub fn list_for_client(&self, client: &Client) -> Result<Vec<Material>, PortalError> {
        Ok(self.store.list(Some(&client.id))?)
    }

    pub fn get_for_client(&self, client: &Client, material_id: &str) -> Result<Material, PortalError> {
        self.store
            .get(material_id)?
            .filter(|m| m.client_id == client.id)
            .ok_or(PortalError::NotFound("Material"))
    }

    /// Self-service creation. Starts at `planned` with no `created_by`.
    pub fn create_for_client(&self, client: &Client, fields: NewMaterial) -> Result<Material, PortalError> {
        let material = Material::new(&client.id, clean_new_material(fields)?, None);
        self.store.insert(&material)?;
        log::info!("Client {} created material {}", client.id, material.id);
        Ok(material)
    }

    /// Lands on `approved` whatever the prior status, appending one history
    /// entry per call.
    pub fn approve(&self, client: &Client, material_id: &str) -> Result<Material, PortalError> {
        let change = MaterialChange::approve(Utc::now());
        let material = self.apply_owned(client, material_id, &change)?;
        log::info!("Material {} approved by client {}", material.id, client.id);
        Ok(material)
    }

    /// Comment, history entry and status land together or not at all.
    pub fn request_revision(&self, client: &Client, material_id: &str, text: &str) -> Result<Material, PortalError> {
        let text = require_comment_text(text)?;
        let change = MaterialChange::request_revision(Utc::now(), text, &client.name);
        let material = self.apply_owned(client, material_id, &change)?;
        log::info!("Revision requested on material {} by client {}", material.id, client.id);
        Ok(material)
    }

    /// Appends an unread comment. Status and history are left alone.
    pub fn add_comment(&self, client: &Client, material_id: &str, text: &str) -> Result<Comment, PortalError> {
        let text = require_comment_text(text)?;
        let change = MaterialChange::comment(Utc::now(), text, &client.name);
        let material = self.apply_owned(client, material_id, &change)?;
        log::debug!("Comment added to material {} by client {}", material.id, client.id);
        material
            .comments
            .last()
            .cloned()
            .ok_or_else(|| PortalError::Internal(format!("comment missing after append on {}", material.id)))
    }

    pub fn list_comments(&self, client: &Client, material_id: &str) -> Result<Vec<Comment>, PortalError> {
        Ok(self.get_for_client(client, material_id)?.comments)
    }

    fn apply_owned(&self, client: &Client, material_id: &str, change: &MaterialChange) -> Result<Material, PortalError> {
        self.store
            .append_and_set(material_id, Some(&client.id), change)?
            .ok_or(PortalError::NotFound("Material"))
    }

    // --- Admin side ---

    pub fn list_materials(&self, client_id: Option<&str>) -> Result<Vec<Material>, PortalError> {
        Ok(self.store.list(client_id)?)
    }

    pub fn get_material(&self, material_id: &str) -> Result<Material, PortalError> {
        self.store.get(material_id)?.ok_or(PortalError::NotFound("Material"))
    }

    /// Creates a material for `owner` with `created_by` set to the admin's id.
    pub fn create_material(&self, admin: &AdminUser, owner: &Client, fields: NewMaterial) -> Result<Material, PortalError> {
        let material = Material::new(&owner.id, clean_new_material(fields)?, Some(&admin.id));
        self.store.insert(&material)?;
        log::info!("Admin {} created material {} for client {}", admin.email, material.id, owner.id);
        Ok(material)
    }

    /// Blunt overwrite. Any status is accepted and no history is written.
    pub fn update_material(&self, admin: &AdminUser, material_id: &str, patch: MaterialPatch) -> Result<Material, PortalError> {
        let patch = clean_patch(patch)?;
        let material = self
            .store
            .patch(material_id, &patch)?
            .ok_or(PortalError::NotFound("Material"))?;
        match patch.status {
            Some(status) => log::info!(
                "Admin {} set material {} to {}", admin.email, material.id, status.as_str()
            ),
            None => log::info!("Admin {} updated material {}", admin.email, material.id),
        }
        Ok(material)
    }
}

fn require_comment_text(text: &str) -> Result<&str, PortalError> {
    if text.trim().is_empty() {
        return Err(PortalError::Validation("Comment text is required.".to_string()));
    }
    Ok(text)
}

fn clean_new_material(mut fields: NewMaterial) -> Result<NewMaterial, PortalError> {
    fields.title = clean_required_text(&fields.title)
        .ok_or_else(|| PortalError::Validation("Title is required.".to_string()))?;
    fields.description = strip_all_html(fields.description.trim());
    Ok(fields)
}

fn clean_patch(mut patch: MaterialPatch) -> Result<MaterialPatch, PortalError> {
    if let Some(title) = patch.title.take() {
        patch.title = Some(
            clean_required_text(&title)
                .ok_or_else(|| PortalError::Validation("Title cannot be empty.".to_string()))?,
        );
    }
    patch.description = patch.description.map(|d| strip_all_html(d.trim()));
    Ok(patch)
}
