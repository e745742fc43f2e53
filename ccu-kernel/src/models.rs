/**
 * MODÈLES CCU - Enregistrements suivis par le kernel
 *
 * RÔLE :
 * Un CcuRecord = une unité de contrôle physique (IP, firmware, disponibilité,
 * demande de reset firmware, initiales du dernier éditeur).
 *
 * FORMAT CSV :
 * Les noms de colonnes sont ceux du fichier data.csv historique, dans cet ordre :
 * CCU, Descripción, Dirección IP, Disponible, FW, Restablecer FW, Última modificación
 * Les booléens sont sérialisés "Si" / "No".
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// En-têtes CSV, dans l'ordre du contrat de fichier
pub const CSV_HEADERS: [&str; 7] = [
    "CCU",
    "Descripción",
    "Dirección IP",
    "Disponible",
    "FW",
    "Restablecer FW",
    "Última modificación",
];

/// Initiales posées sur les enregistrements par défaut
pub const SEED_EDITOR: &str = "DAM";

/// Réponse oui/non telle qu'écrite dans le fichier ("Si" / "No")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Answer {
    #[serde(rename = "Si")]
    Yes,
    #[serde(rename = "No")]
    No,
}

impl Answer {
    /// Les deux valeurs proposées par les listes déroulantes, dans l'ordre d'affichage
    pub const ALL: [Answer; 2] = [Answer::Yes, Answer::No];

    pub fn as_str(self) -> &'static str {
        match self {
            Answer::Yes => "Si",
            Answer::No => "No",
        }
    }

    /// Parse strict : seules "Si" et "No" sont acceptées (espaces ignorés)
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "Si" => Some(Answer::Yes),
            "No" => Some(Answer::No),
            _ => None,
        }
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CcuRecord {
    /// Groupe d'équipement (ex: "BR Compacta")
    #[serde(rename = "CCU")]
    pub unit_group: String,
    /// Libellé affiché, sert aussi de titre d'onglet
    #[serde(rename = "Descripción")]
    pub description: String,
    #[serde(rename = "Dirección IP")]
    pub ip_address: String,
    #[serde(rename = "Disponible")]
    pub available: Answer,
    #[serde(rename = "FW")]
    pub firmware_version: String,
    #[serde(rename = "Restablecer FW")]
    pub reset_firmware_requested: Answer,
    #[serde(rename = "Última modificación")]
    pub last_modified_by: String,
}

/// Table complète, ordre des lignes conservé entre chargement et sauvegarde
pub type Table = Vec<CcuRecord>;

fn seed(unit_group: &str, description: &str, ip: &str, available: Answer, fw: &str) -> CcuRecord {
    CcuRecord {
        unit_group: unit_group.into(),
        description: description.into(),
        ip_address: ip.into(),
        available,
        firmware_version: fw.into(),
        reset_firmware_requested: Answer::No,
        last_modified_by: SEED_EDITOR.into(),
    }
}

/// Les cinq CCUs du premier démarrage (aucun fichier présent)
pub fn default_table() -> Table {
    vec![
        seed("BR Compacta", "BR OPAL", "172.19.1.141", Answer::No, "BZ0021(PT0110)"),
        seed("BR Compacta", "BR dSPACE", "172.19.1.139", Answer::No, "BZ0021(PT0110)"),
        seed("BR Distribuida", "BR Dist. OPAL", "172.19.1.142", Answer::Yes, "BZ0009(PT0159)"),
        seed("AR", "AR OPAL", "172.19.1.140", Answer::Yes, "AZ3985(PT0204)"),
        seed("AR", "AR oficina", "172.19.1.22", Answer::Yes, "AZ2004(PT0085)"),
    ]
}
