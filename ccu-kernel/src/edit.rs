//! Mise à jour pure d'une ligne de la table.
//!
//! `apply_edit` ne touche ni au disque ni à la session : ancienne table + édition
//! → nouvelle table. La session décide ensuite quand persister et quand basculer.

use crate::models::{Answer, Table};
use serde::Deserialize;

/// Les quatre champs modifiables depuis le formulaire d'une CCU
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RecordEdit {
    pub ip_address: String,
    pub available: Answer,
    pub firmware_version: String,
    pub reset_firmware_requested: Answer,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EditError {
    #[error("No CCU at index {index} (table has {len} rows)")]
    UnknownRecord { index: usize, len: usize },
}

/// Applique `edit` à la ligne `index` et signe la modification avec `user`.
/// Les autres lignes sont recopiées telles quelles.
pub fn apply_edit(
    table: &Table,
    index: usize,
    edit: RecordEdit,
    user: &str,
) -> Result<Table, EditError> {
    if index >= table.len() {
        return Err(EditError::UnknownRecord { index, len: table.len() });
    }

    let mut next = table.clone();
    let record = &mut next[index];
    record.ip_address = edit.ip_address;
    record.available = edit.available;
    record.firmware_version = edit.firmware_version;
    record.reset_firmware_requested = edit.reset_firmware_requested;
    record.last_modified_by = user.to_string();
    Ok(next)
}
