use crate::db::hub_repo;
use crate::queue::publisher::EventPublisher;
use crate::queue::PrintEventMessage;
use crate::websocket::broadcast::Publish;
use crate::websocket::message_types::{DashboardOutbound, TelemetryFrame};
use crate::websocket::{HubRegistry, TenantRegistry};
use actix::{Actor, ActorContext, AsyncContext, StreamHandler};
use actix_web_actors::ws;
use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const HUB_TIMEOUT: Duration = Duration::from_secs(30);

/// WebSocket session for one hub connection.
///
/// The route handler has already verified the hub identity before this
/// actor starts; the online/offline transitions are owned entirely by the
/// actor lifecycle, so a request that never completes the handshake
/// leaves no trace. Telemetry frames are processed strictly in arrival
/// order: each one is produced to the print-events queue (durable path,
/// keyed by hub id) and pushed fire-and-forget to the tenant broadcast
/// actor (latency path).
pub struct HubSession {
    hub_id: String,
    tenant_id: Uuid,
    epoch: u64,
    hubs: HubRegistry,
    tenants: TenantRegistry,
    publisher: Arc<EventPublisher>,
    db: PgPool,
    offline_debounce: Duration,
    hb: Instant,
}

impl HubSession {
    pub fn new(
        hub_id: String,
        tenant_id: Uuid,
        hubs: HubRegistry,
        tenants: TenantRegistry,
        publisher: Arc<EventPublisher>,
        db: PgPool,
        offline_debounce: Duration,
    ) -> Self {
        Self {
            hub_id,
            tenant_id,
            epoch: 0,
            hubs,
            tenants,
            publisher,
            db,
            offline_debounce,
            hb: Instant::now(),
        }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.hb) > HUB_TIMEOUT {
                tracing::warn!(hub_id = %act.hub_id, "hub heartbeat timed out");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    /// Connect transition: claim the current session epoch, announce the
    /// hub online, persist the flag. Runs only from `started`, after the
    /// handshake has succeeded.
    fn mark_connected(&mut self) {
        self.epoch = self.hubs.begin_session(&self.hub_id);

        if let Some(addr) = self.tenants.get(self.tenant_id) {
            addr.do_send(Publish(DashboardOutbound::HubStatus {
                hub_id: self.hub_id.clone(),
                is_online: true,
            }));
        }

        let db = self.db.clone();
        let hub_id = self.hub_id.clone();
        actix::spawn(async move {
            if let Err(e) = hub_repo::set_online(&db, &hub_id, true).await {
                tracing::error!(%hub_id, error = %e, "failed to mark hub online");
            }
        });
    }

    fn handle_telemetry(&self, frame: TelemetryFrame) {
        let event = frame.normalize();

        // Durable path: enqueue in arrival order, keyed by hub id so the
        // partition preserves per-hub ordering. The delivery ack is
        // awaited in the background.
        let msg = PrintEventMessage {
            hub_id: self.hub_id.clone(),
            tenant_id: self.tenant_id,
            event: event.clone(),
            enqueued_at: Utc::now(),
        };
        if let Err(e) = self.publisher.enqueue_print_event(&msg) {
            tracing::error!(hub_id = %self.hub_id, error = %e, "failed to enqueue print event");
        }

        // Latency path: best-effort push to the tenant's dashboards; a
        // miss here is fine, the queue path drives persisted state.
        if let Some(addr) = self.tenants.get(self.tenant_id) {
            addr.do_send(Publish(event));
        }
    }
}

impl Actor for HubSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(hub_id = %self.hub_id, tenant_id = %self.tenant_id, "hub session started");
        self.hb(ctx);
        self.mark_connected();
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!(hub_id = %self.hub_id, "hub session stopped");

        let hubs = self.hubs.clone();
        let tenants = self.tenants.clone();
        let db = self.db.clone();
        let hub_id = self.hub_id.clone();
        let tenant_id = self.tenant_id;
        let epoch = self.epoch;
        let debounce = self.offline_debounce;

        // Debounced offline transition: only the session that is still
        // current after the window marks the hub offline, so a quick
        // reconnect never flaps the flag.
        actix::spawn(async move {
            tokio::time::sleep(debounce).await;
            if !hubs.end_session(&hub_id, epoch) {
                tracing::debug!(%hub_id, "hub reconnected within debounce window");
                return;
            }
            if let Err(e) = hub_repo::set_online(&db, &hub_id, false).await {
                tracing::error!(%hub_id, error = %e, "failed to mark hub offline");
            }
            if let Some(addr) = tenants.get(tenant_id) {
                addr.do_send(Publish(DashboardOutbound::HubStatus {
                    hub_id: hub_id.clone(),
                    is_online: false,
                }));
            }
        });
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for HubSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(payload)) => {
                self.hb = Instant::now();
                ctx.pong(&payload);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(text)) => match serde_json::from_str::<TelemetryFrame>(&text) {
                Ok(frame) => self.handle_telemetry(frame),
                Err(e) => {
                    tracing::warn!(
                        hub_id = %self.hub_id,
                        error = %e,
                        "ignoring malformed telemetry frame"
                    );
                }
            },
            Ok(ws::Message::Binary(_)) => {
                tracing::warn!(hub_id = %self.hub_id, "binary telemetry not supported");
            }
            Ok(ws::Message::Close(reason)) => {
                tracing::debug!(hub_id = %self.hub_id, ?reason, "hub socket closed");
                ctx.stop();
            }
            _ => {}
        }
    }
}
