/*!
# CCU Kernel - Suivi des CCUs Sarriguren

Outil web interne :
- connexion par initiales (une fois par session)
- tableau de synthèse coloré selon la disponibilité
- édition d'une CCU à la fois, sauvegarde complète du fichier CSV
*/

pub mod config;
pub mod edit;
pub mod http;
pub mod models;
pub mod render;
pub mod session;
pub mod store;

#[cfg(test)]
pub mod test_utils;
