/**
 * SESSIONS - Contexte utilisateur côté serveur
 *
 * RÔLE :
 * Une Session = initiales de l'utilisateur + copie en mémoire de la table.
 * Créée à la première requête du navigateur (cookie). Pas de logout : une
 * session inactive plus longtemps que `session_idle_secs` est évincée par
 * la tâche de ménage du registre.
 *
 * MACHINE À ÉTATS :
 * - Unauthenticated : état initial, attend des initiales non vides
 * - Authenticated   : terminal ; la table est chargée une seule fois à l'entrée
 *
 * ÉDITION :
 * submit() calcule la nouvelle table (edit::apply_edit), la persiste, puis
 * seulement remplace la copie de session. Si l'écriture échoue la session
 * garde l'ancienne table.
 */

use crate::edit::{apply_edit, EditError, RecordEdit};
use crate::models::{CcuRecord, Table};
use crate::store::{StoreError, TableStore};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub type SessionId = Uuid;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session is not authenticated")]
    NotAuthenticated,
    #[error(transparent)]
    Edit(#[from] EditError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Initiales acceptées, table chargée
    Accepted,
    /// Initiales vides : on reste sur l'écran de connexion
    Rejected,
    /// Déjà connecté : rien n'est rechargé
    AlreadyAuthenticated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated { user_initials: String, table: Table },
}

#[derive(Debug)]
pub struct Session {
    state: SessionState,
    flash: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: SessionState::Unauthenticated,
            flash: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, SessionState::Authenticated { .. })
    }

    pub fn user_initials(&self) -> Option<&str> {
        match &self.state {
            SessionState::Authenticated { user_initials, .. } => Some(user_initials),
            SessionState::Unauthenticated => None,
        }
    }

    pub fn table(&self) -> Option<&Table> {
        match &self.state {
            SessionState::Authenticated { table, .. } => Some(table),
            SessionState::Unauthenticated => None,
        }
    }

    /// Étape de connexion unique. Le chargement de la table n'a lieu que sur
    /// des initiales non vides ; en cas d'échec du store on reste déconnecté.
    pub fn login(
        &mut self,
        initials: &str,
        store: &dyn TableStore,
    ) -> Result<LoginOutcome, SessionError> {
        if self.is_authenticated() {
            return Ok(LoginOutcome::AlreadyAuthenticated);
        }

        let initials = initials.trim();
        if initials.is_empty() {
            return Ok(LoginOutcome::Rejected);
        }

        let table = store.load()?;
        info!(user = initials, rows = table.len(), "user logged in");
        self.state = SessionState::Authenticated {
            user_initials: initials.to_string(),
            table,
        };
        Ok(LoginOutcome::Accepted)
    }

    /// Enregistre l'édition de la ligne `index` et persiste la table complète.
    /// Retourne la ligne telle qu'elle est maintenant en session.
    pub fn submit(
        &mut self,
        index: usize,
        edit: RecordEdit,
        store: &dyn TableStore,
    ) -> Result<&CcuRecord, SessionError> {
        let SessionState::Authenticated { user_initials, table } = &mut self.state else {
            return Err(SessionError::NotAuthenticated);
        };

        let next = apply_edit(table, index, edit, user_initials)?;
        if let Err(e) = store.save(&next) {
            warn!(user = %user_initials, index, error = %e, "save failed, session table kept");
            return Err(e.into());
        }
        *table = next;

        let record = &table[index];
        info!(user = %user_initials, ccu = %record.description, "CCU updated");
        self.flash = Some(format!("Cambios guardados para {}.", record.description));
        Ok(record)
    }

    /// Message de confirmation à afficher une seule fois
    pub fn take_flash(&mut self) -> Option<String> {
        self.flash.take()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Intervalle entre deux passes de ménage des sessions inactives
pub const SWEEP_EVERY: Duration = Duration::from_secs(60);

struct Entry {
    session: Arc<Mutex<Session>>,
    last_seen: Instant,
}

/// Registre des sessions actives, partagé par tous les handlers.
/// Les identifiants sont toujours émis par le serveur.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<SessionId, Entry>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ouvre une nouvelle session vierge sous un identifiant aléatoire
    pub fn create(&self) -> (SessionId, Arc<Mutex<Session>>) {
        let id = Uuid::new_v4();
        let session = Arc::new(Mutex::new(Session::new()));
        self.sessions.lock().insert(
            id,
            Entry {
                session: session.clone(),
                last_seen: Instant::now(),
            },
        );
        (id, session)
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.lock().contains_key(id)
    }

    /// Session associée à `id` si elle existe encore ; marque l'activité
    pub fn get(&self, id: &SessionId) -> Option<Arc<Mutex<Session>>> {
        let mut sessions = self.sessions.lock();
        let entry = sessions.get_mut(id)?;
        entry.last_seen = Instant::now();
        Some(entry.session.clone())
    }

    /// Retire les sessions sans activité depuis `max_idle`. Retourne le nombre évincé.
    pub fn sweep_idle(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.lock();
        let before = sessions.len();
        sessions.retain(|_, entry| now.duration_since(entry.last_seen) < max_idle);
        before - sessions.len()
    }

    /// Tâche de fond : ménage toutes les `every`
    pub fn spawn_idle_sweeper(&self, max_idle: Duration, every: Duration) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let evicted = registry.sweep_idle(max_idle);
                if evicted > 0 {
                    info!(evicted, remaining = registry.len(), "idle sessions evicted");
                } else {
                    debug!(remaining = registry.len(), "session sweep");
                }
            }
        })
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
