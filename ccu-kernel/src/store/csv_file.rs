/**
 * STORE CSV - Fichier plat data.csv
 *
 * RÔLE :
 * Implémentation fichier du TableStore. Une ligne d'en-tête + une ligne par
 * CCU, valeurs en texte brut, "Si"/"No" pour les champs oui/non.
 *
 * FONCTIONNEMENT :
 * - Lecture via le mapping des en-têtes (colonnes retrouvées par leur nom)
 * - Écriture toujours dans l'ordre canonique des colonnes (CSV_HEADERS)
 * - Aucun cache : chaque load() relit le disque, chaque save() réécrit tout
 * - save() écrit un fichier temporaire voisin puis le renomme : un load()
 *   concurrent voit l'ancienne ou la nouvelle table, jamais un fichier partiel
 */

use super::{StoreError, TableStore};
use crate::models::{default_table, Answer, CcuRecord, Table, CSV_HEADERS};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Store adossé à un fichier CSV
#[derive(Debug, Clone)]
pub struct CsvTableStore {
    path: PathBuf,
}

impl CsvTableStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TableStore for CsvTableStore {
    fn load(&self) -> Result<Table, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // Premier démarrage : on persiste les valeurs par défaut avant tout rendu
                let table = default_table();
                self.save(&table)?;
                info!(path = ?self.path, rows = table.len(), "data file absent, seeded defaults");
                return Ok(table);
            }
            Err(e) => return Err(e.into()),
        };

        let table = decode_table(&bytes)?;
        debug!(path = ?self.path, rows = table.len(), "table loaded");
        Ok(table)
    }

    fn save(&self, table: &Table) -> Result<(), StoreError> {
        let bytes = encode_table(table)?;
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;
        debug!(path = ?self.path, rows = table.len(), "table saved");
        Ok(())
    }
}

/// Position de chaque colonne attendue dans l'en-tête du fichier
struct ColumnMap([usize; 7]);

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, StoreError> {
        let mut positions = [0usize; 7];
        for (slot, expected) in positions.iter_mut().zip(CSV_HEADERS) {
            *slot = headers
                .iter()
                .position(|h| h.trim() == expected)
                .ok_or_else(|| StoreError::Malformed {
                    line: 1,
                    reason: format!("missing column '{expected}'"),
                })?;
        }
        Ok(Self(positions))
    }

    fn field<'r>(
        &self,
        row: &'r csv::StringRecord,
        column: usize,
        line: u64,
    ) -> Result<&'r str, StoreError> {
        row.get(self.0[column]).ok_or_else(|| StoreError::Malformed {
            line,
            reason: format!("missing value for '{}'", CSV_HEADERS[column]),
        })
    }

    fn answer(
        &self,
        row: &csv::StringRecord,
        column: usize,
        line: u64,
    ) -> Result<Answer, StoreError> {
        let raw = self.field(row, column, line)?;
        Answer::parse(raw).ok_or_else(|| StoreError::Malformed {
            line,
            reason: format!("'{}' must be Si or No, got '{raw}'", CSV_HEADERS[column]),
        })
    }

    fn record(&self, row: &csv::StringRecord, line: u64) -> Result<CcuRecord, StoreError> {
        Ok(CcuRecord {
            unit_group: self.field(row, 0, line)?.to_string(),
            description: self.field(row, 1, line)?.to_string(),
            ip_address: self.field(row, 2, line)?.to_string(),
            available: self.answer(row, 3, line)?,
            firmware_version: self.field(row, 4, line)?.to_string(),
            reset_firmware_requested: self.answer(row, 5, line)?,
            last_modified_by: self.field(row, 6, line)?.to_string(),
        })
    }
}

fn decode_table(bytes: &[u8]) -> Result<Table, StoreError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let columns = ColumnMap::from_headers(reader.headers()?)?;

    let mut table = Vec::new();
    for row in reader.records() {
        let row = row?;
        let line = row.position().map(|p| p.line()).unwrap_or_default();
        table.push(columns.record(&row, line)?);
    }
    Ok(table)
}

fn encode_table(table: &Table) -> Result<Vec<u8>, StoreError> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADERS)?;
    for record in table {
        writer.write_record([
            record.unit_group.as_str(),
            record.description.as_str(),
            record.ip_address.as_str(),
            record.available.as_str(),
            record.firmware_version.as_str(),
            record.reset_firmware_requested.as_str(),
            record.last_modified_by.as_str(),
        ])?;
    }

    writer.into_inner().map_err(|e| StoreError::Io(e.into_error()))
}
