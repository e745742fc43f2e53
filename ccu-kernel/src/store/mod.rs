/**
 * STORE - Persistance de la table des CCUs
 *
 * RÔLE :
 * Interface unique de lecture/écriture de la table complète. Le kernel ne
 * connaît que le trait TableStore ; l'implémentation fichier (CSV) vit dans
 * csv_file.rs, les tests branchent leurs propres stores.
 *
 * CONTRAT :
 * - load() : fichier absent = table par défaut, écrite sur disque avant d'être
 *   retournée (ce n'est pas une erreur)
 * - save() : réécriture complète du fichier, pas de mise à jour partielle
 * - aucun verrou entre sessions : le dernier qui sauvegarde gagne
 */

mod csv_file;

pub use csv_file::CsvTableStore;

use crate::models::Table;

/// Erreurs possibles lors des opérations sur le store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Malformed data file at line {line}: {reason}")]
    Malformed { line: u64, reason: String },
}

/// Lecture/écriture de la table complète
pub trait TableStore: Send + Sync {
    /// Charge la table, ou initialise le fichier avec les valeurs par défaut
    fn load(&self) -> Result<Table, StoreError>;

    /// Écrase le contenu persistant avec `table`
    fn save(&self, table: &Table) -> Result<(), StoreError>;
}
