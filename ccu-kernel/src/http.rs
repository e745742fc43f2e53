/**
 * SERVEUR HTTP CCU - Interface web du kernel
 *
 * RÔLE :
 * Expose le tableau de bord CCU dans le navigateur : connexion par initiales,
 * tableau de synthèse, formulaires d'édition par onglet.
 *
 * FONCTIONNEMENT :
 * - Middleware session : cookie ccu_session (UUID émis par le serveur) posé à
 *   la première visite, ou à nouveau si l'identifiant reçu est inconnu/expiré
 * - GET  /                  : connexion ou tableau de bord selon la session
 * - POST /login             : initiales → chargement unique de la table
 * - POST /records/{index}   : édition d'une CCU, sauvegarde complète, redirection
 * - GET  /api/records       : table de la session en JSON (401 si non connecté)
 * - GET  /health            : "ok", hors session
 *
 * Chaque POST se termine par une redirection (303) : le navigateur recharge la
 * page, ce qui tient lieu de re-rendu après mutation.
 */

use crate::edit::RecordEdit;
use crate::models::Table;
use crate::render;
use crate::session::{Session, SessionError, SessionId, SessionRegistry, SessionState};
use crate::store::TableStore;
use axum::extract::{Path, Query, Request, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Extension, Form, Json, Router};
use parking_lot::Mutex;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, warn};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "ccu_session";

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TableStore>,
    pub sessions: SessionRegistry,
}

impl AppState {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self {
            store,
            sessions: SessionRegistry::new(),
        }
    }
}

/// Session de la requête courante, résolue par le middleware
type CurrentSession = Arc<Mutex<Session>>;

#[derive(Debug, Deserialize)]
struct DashboardParams {
    tab: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    #[serde(default)]
    initials: String,
}

pub fn build_router(app_state: AppState) -> Router {
    let pages = Router::new()
        .route("/", get(dashboard))
        .route("/login", post(login))
        .route("/records/{index}", post(update_record))
        .route("/api/records", get(api_records))
        .layer(middleware::from_fn_with_state(app_state.clone(), ensure_session));

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(pages)
        .with_state(app_state)
}

/// Lit l'identifiant de session dans l'en-tête Cookie
fn session_id_from_headers(headers: &HeaderMap) -> Option<SessionId> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

async fn ensure_session(State(app): State<AppState>, mut req: Request, next: Next) -> Response {
    let known = session_id_from_headers(req.headers())
        .and_then(|id| app.sessions.get(&id).map(|session| (id, session)));
    let (id, session, fresh) = match known {
        Some((id, session)) => (id, session, false),
        None => {
            let (id, session) = app.sessions.create();
            (id, session, true)
        }
    };
    req.extensions_mut().insert(id);
    req.extensions_mut().insert(session);

    let mut res = next.run(req).await;
    if fresh {
        debug!(session = %id, "new session");
        let cookie = format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax");
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                res.headers_mut().append(SET_COOKIE, value);
            }
            Err(e) => error!("invalid session cookie header: {e}"),
        }
    }
    res
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        let status = match &self {
            SessionError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            SessionError::Edit(_) => StatusCode::NOT_FOUND,
            SessionError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("request failed: {self}");
        } else {
            warn!("request rejected: {self}");
        }
        (status, Html(render::error_page(&self.to_string()))).into_response()
    }
}

// GET / (connexion ou tableau de bord)
async fn dashboard(
    Extension(session): Extension<CurrentSession>,
    Query(params): Query<DashboardParams>,
) -> Html<String> {
    let mut session = session.lock();
    let flash = session.take_flash();

    match session.state() {
        SessionState::Authenticated { user_initials, table } => {
            let selected = params.tab.and_then(|t| t.parse().ok()).unwrap_or(0);
            Html(render::dashboard_page(user_initials, table, selected, flash.as_deref()))
        }
        SessionState::Unauthenticated => Html(render::login_page()),
    }
}

// POST /login
async fn login(
    State(app): State<AppState>,
    Extension(id): Extension<SessionId>,
    Extension(session): Extension<CurrentSession>,
    Form(form): Form<LoginForm>,
) -> Result<Redirect, SessionError> {
    let outcome = session.lock().login(&form.initials, app.store.as_ref())?;
    debug!(session = %id, ?outcome, "login attempt");
    Ok(Redirect::to("/"))
}

// POST /records/{index}
async fn update_record(
    State(app): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Path(index): Path<usize>,
    Form(edit): Form<RecordEdit>,
) -> Result<Redirect, SessionError> {
    let mut session = session.lock();
    match session.submit(index, edit, app.store.as_ref()) {
        Ok(_) => Ok(Redirect::to(&format!("/?tab={index}"))),
        Err(SessionError::NotAuthenticated) => Ok(Redirect::to("/")),
        Err(e) => Err(e),
    }
}

// GET /api/records (table de la session)
async fn api_records(
    Extension(session): Extension<CurrentSession>,
) -> Result<Json<Table>, SessionError> {
    let session = session.lock();
    session.table().cloned().map(Json).ok_or(SessionError::NotAuthenticated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{default_table, Answer};
    use crate::test_utils::{ReadOnlyStore, TestHarness};
    use axum::body::{to_bytes, Body};
    use axum::http::header::{CONTENT_TYPE, LOCATION};
    use tower::ServiceExt;

    fn app_for(store: Arc<dyn TableStore>) -> Router {
        build_router(AppState::new(store))
    }

    async fn send(app: &Router, req: axum::http::Request<Body>) -> Response {
        app.clone().oneshot(req).await.unwrap()
    }

    fn get_req(uri: &str, cookie: Option<&str>) -> axum::http::Request<Body> {
        let mut builder = axum::http::Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn form_req(uri: &str, cookie: &str, body: &str) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(COOKIE, cookie)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_text(res: Response) -> String {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    /// Ouvre une session et renvoie la paire "ccu_session=<uuid>"
    async fn open_session(app: &Router) -> String {
        let res = send(app, get_req("/", None)).await;
        let set_cookie = res.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    async fn logged_in(app: &Router, initials: &str) -> String {
        let cookie = open_session(app).await;
        let res = send(app, form_req("/login", &cookie, &format!("initials={initials}"))).await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        cookie
    }

    #[test]
    fn session_cookie_is_found_among_others() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("theme=dark; {SESSION_COOKIE}={id}; lang=es")).unwrap(),
        );
        assert_eq!(session_id_from_headers(&headers), Some(id));

        let mut bad = HeaderMap::new();
        bad.insert(COOKIE, HeaderValue::from_static("ccu_session=not-a-uuid"));
        assert_eq!(session_id_from_headers(&bad), None);
    }

    #[tokio::test]
    async fn health_is_outside_sessions() {
        let harness = TestHarness::new();
        let app = app_for(harness.shared_store());

        let res = send(&app, get_req("/health", None)).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().get(SET_COOKIE).is_none());
        assert_eq!(body_text(res).await, "ok");
    }

    #[tokio::test]
    async fn first_visit_gets_login_page_and_cookie() {
        let harness = TestHarness::new();
        let app = app_for(harness.shared_store());

        let res = send(&app, get_req("/", None)).await;
        assert_eq!(res.status(), StatusCode::OK);
        let cookie = res.headers().get(SET_COOKIE).unwrap().to_str().unwrap().to_string();
        assert!(cookie.starts_with("ccu_session="));
        assert!(cookie.contains("HttpOnly"));
        assert!(body_text(res).await.contains("Introduce tus iniciales para continuar"));
    }

    #[tokio::test]
    async fn unknown_cookie_gets_a_fresh_session() {
        let harness = TestHarness::new();
        let state = AppState::new(harness.shared_store());
        let app = build_router(state.clone());

        let chosen = Uuid::new_v4();
        let res = send(&app, get_req("/", Some(&format!("{SESSION_COOKIE}={chosen}")))).await;
        assert_eq!(res.status(), StatusCode::OK);

        let set_cookie = res.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(!set_cookie.contains(&chosen.to_string()));
        assert!(!state.sessions.contains(&chosen));
        assert_eq!(state.sessions.len(), 1);
    }

    #[tokio::test]
    async fn known_cookie_is_not_reissued() {
        let harness = TestHarness::new();
        let app = app_for(harness.shared_store());
        let cookie = open_session(&app).await;

        let res = send(&app, get_req("/", Some(&cookie))).await;
        assert!(res.headers().get(SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn evicted_session_falls_back_to_login() {
        let harness = TestHarness::new();
        let state = AppState::new(harness.shared_store());
        let app = build_router(state.clone());
        let cookie = logged_in(&app, "AB").await;

        state.sessions.sweep_idle(std::time::Duration::ZERO);

        let res = send(&app, get_req("/", Some(&cookie))).await;
        assert!(res.headers().get(SET_COOKIE).is_some());
        assert!(body_text(res).await.contains("Introduce tus iniciales para continuar"));
    }

    #[tokio::test]
    async fn empty_initials_keep_login_page() {
        let harness = TestHarness::new();
        let app = app_for(harness.shared_store());
        let cookie = open_session(&app).await;

        let res = send(&app, form_req("/login", &cookie, "initials=")).await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);

        let page = body_text(send(&app, get_req("/", Some(&cookie))).await).await;
        assert!(page.contains("Introduce tus iniciales para continuar"));
        assert!(!harness.data_path().exists());
    }

    #[tokio::test]
    async fn login_renders_dashboard_and_seeds_file() {
        let harness = TestHarness::new();
        let app = app_for(harness.shared_store());
        let cookie = logged_in(&app, "AB").await;

        let page = body_text(send(&app, get_req("/", Some(&cookie))).await).await;
        assert!(page.contains("Usuario: AB"));
        assert!(page.contains("BR Dist. OPAL"));
        assert_eq!(harness.store().load().unwrap(), default_table());
    }

    #[tokio::test]
    async fn record_update_persists_and_redirects_to_tab() {
        let harness = TestHarness::new();
        let app = app_for(harness.shared_store());
        let cookie = logged_in(&app, "AB").await;

        let res = send(
            &app,
            form_req(
                "/records/1",
                &cookie,
                "ip_address=172.19.1.150&available=Si\
                 &firmware_version=BZ0022%28PT0111%29&reset_firmware_requested=Si",
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(res.headers().get(LOCATION).unwrap(), "/?tab=1");

        let on_disk = harness.store().load().unwrap();
        assert_eq!(on_disk[1].ip_address, "172.19.1.150");
        assert_eq!(on_disk[1].available, Answer::Yes);
        assert_eq!(on_disk[1].firmware_version, "BZ0022(PT0111)");
        assert_eq!(on_disk[1].reset_firmware_requested, Answer::Yes);
        assert_eq!(on_disk[1].last_modified_by, "AB");
        assert_eq!(on_disk[0], default_table()[0]);

        // Le message de confirmation n'apparaît qu'une fois
        let page = body_text(send(&app, get_req("/?tab=1", Some(&cookie))).await).await;
        assert!(page.contains("Cambios guardados para BR dSPACE."));
        let page = body_text(send(&app, get_req("/?tab=1", Some(&cookie))).await).await;
        assert!(!page.contains("Cambios guardados"));
    }

    #[tokio::test]
    async fn third_answer_value_is_rejected() {
        let harness = TestHarness::new();
        let app = app_for(harness.shared_store());
        let cookie = logged_in(&app, "AB").await;

        let res = send(
            &app,
            form_req(
                "/records/0",
                &cookie,
                "ip_address=1.1.1.1&available=Maybe&firmware_version=X&reset_firmware_requested=No",
            ),
        )
        .await;
        assert!(res.status().is_client_error());
        assert_eq!(harness.store().load().unwrap(), default_table());
    }

    #[tokio::test]
    async fn unknown_record_is_not_found() {
        let harness = TestHarness::new();
        let app = app_for(harness.shared_store());
        let cookie = logged_in(&app, "AB").await;

        let res = send(
            &app,
            form_req(
                "/records/7",
                &cookie,
                "ip_address=1.1.1.1&available=Si&firmware_version=X&reset_firmware_requested=No",
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn update_without_login_goes_back_to_login() {
        let harness = TestHarness::new();
        let app = app_for(harness.shared_store());
        let cookie = open_session(&app).await;

        let res = send(
            &app,
            form_req(
                "/records/0",
                &cookie,
                "ip_address=1.1.1.1&available=Si&firmware_version=X&reset_firmware_requested=No",
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(res.headers().get(LOCATION).unwrap(), "/");
        assert!(!harness.data_path().exists());
    }

    #[tokio::test]
    async fn api_records_requires_login() {
        let harness = TestHarness::new();
        let app = app_for(harness.shared_store());

        let cookie = open_session(&app).await;
        let res = send(&app, get_req("/api/records", Some(&cookie))).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let cookie = logged_in(&app, "AB").await;
        let res = send(&app, get_req("/api/records", Some(&cookie))).await;
        assert_eq!(res.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body_text(res).await).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 5);
        assert_eq!(json[2]["Descripción"], "BR Dist. OPAL");
        assert_eq!(json[2]["Disponible"], "Si");
    }

    #[tokio::test]
    async fn save_failure_is_server_error_and_keeps_session_table() {
        let app = app_for(Arc::new(ReadOnlyStore));
        let cookie = logged_in(&app, "AB").await;

        let res = send(
            &app,
            form_req(
                "/records/0",
                &cookie,
                "ip_address=9.9.9.9&available=Si&firmware_version=X&reset_firmware_requested=No",
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let res = send(&app, get_req("/api/records", Some(&cookie))).await;
        let table: Table = serde_json::from_str(&body_text(res).await).unwrap();
        assert_eq!(table, default_table());
    }

    #[tokio::test]
    async fn malformed_file_surfaces_on_login() {
        let harness = TestHarness::new();
        harness.write_data_file("CCU;Descripción\nAR;AR OPAL\n");
        let app = app_for(harness.shared_store());
        let cookie = open_session(&app).await;

        let res = send(&app, form_req("/login", &cookie, "initials=AB")).await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_text(res).await.contains("Malformed data file"));
        assert_eq!(harness.read_data_file(), "CCU;Descripción\nAR;AR OPAL\n");
    }
}
