use crate::auth::verify_hub_secret;
use crate::db::hub_repo;
use crate::error::AppError;
use crate::state::AppState;
use crate::websocket::broadcast::GetStats;
use crate::websocket::dashboard_session::DashboardSession;
use crate::websocket::hub_session::HubSession;
use actix_web::{get, web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use serde::Deserialize;
use std::time::Duration;
use uuid::Uuid;

const HUB_SECRET_HEADER: &str = "X-Hub-Secret";

/// Hub WebSocket endpoint. Identity checks happen before the upgrade so a
/// rejected hub gets a plain HTTP status, not a doomed socket. The online
/// transition itself belongs to the session actor: nothing is persisted
/// or registered until the handshake has succeeded and the actor started.
#[get("/ws/hub/{id}")]
pub async fn hub_socket(
    req: HttpRequest,
    stream: web::Payload,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let hub_id = path.into_inner();

    let hub = hub_repo::get(&state.db, &hub_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("hub {hub_id} not found")))?;
    if !hub.is_claimed() {
        return Err(AppError::Forbidden(format!("hub {hub_id} is unclaimed")).into());
    }

    if state.config.allow_unverified_hubs {
        tracing::warn!(%hub_id, "accepting hub without secret verification");
    } else {
        let presented = req
            .headers()
            .get(HUB_SECRET_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("missing hub secret".into()))?;
        if !verify_hub_secret(presented, &hub.secret_hash) {
            tracing::warn!(%hub_id, "hub presented an invalid secret");
            return Err(AppError::Unauthorized("invalid hub secret".into()).into());
        }
    }

    let session = HubSession::new(
        hub_id,
        hub.tenant_id,
        state.hubs.clone(),
        state.tenants.clone(),
        state.publisher.clone(),
        state.db.clone(),
        Duration::from_secs(state.config.hub_offline_debounce_secs),
    );
    ws::start(session, &req, stream)
}

#[derive(Debug, Deserialize)]
pub struct TenantQuery {
    pub tenant: Uuid,
}

/// Dashboard WebSocket endpoint. The upgrade itself is unauthenticated;
/// the session enforces the auth handshake deadline.
#[get("/ws/dashboard")]
pub async fn dashboard_socket(
    req: HttpRequest,
    stream: web::Payload,
    query: web::Query<TenantQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let broadcast = state
        .tenants
        .get_or_spawn(query.tenant, Some(state.db.clone()));

    let session = DashboardSession::new(
        query.tenant,
        broadcast,
        state.auth.clone(),
        Duration::from_secs(state.config.auth_timeout_secs),
    );
    ws::start(session, &req, stream)
}

/// Connection stats for one tenant's live broadcast actor. All-zero stats
/// when no dashboards are connected.
#[get("/ws/dashboard/status")]
pub async fn dashboard_status(
    query: web::Query<TenantQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let stats = match state.tenants.get(query.tenant) {
        Some(addr) => addr
            .send(GetStats)
            .await
            .map_err(|e| AppError::Internal(format!("broadcast actor unreachable: {e}")))?,
        None => Default::default(),
    };
    Ok(HttpResponse::Ok().json(stats))
}
