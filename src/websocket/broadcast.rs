use crate::db::printer_repo;
use crate::websocket::message_types::DashboardOutbound;
use crate::websocket::TenantRegistry;
use actix::prelude::*;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Pre-serialized frame delivered to a dashboard session.
#[derive(Message, Clone)]
#[rtype(result = "()")]
pub struct OutboundFrame(pub String);

#[derive(Message)]
#[rtype(result = "()")]
pub struct Connect {
    pub client_id: Uuid,
    pub recipient: Recipient<OutboundFrame>,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Disconnect {
    pub client_id: Uuid,
}

/// Sent by the session after it validated the client's token. Triggers
/// the catch-up replay of cached statuses to that client only.
#[derive(Message)]
#[rtype(result = "()")]
pub struct MarkAuthenticated {
    pub client_id: Uuid,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct UpdateSubscription {
    pub client_id: Uuid,
    pub printers: Vec<String>,
}

/// An event to fan out to this tenant's dashboards. Fire-and-forget from
/// the callers' perspective (hub sessions, queue consumers).
#[derive(Message)]
#[rtype(result = "()")]
pub struct Publish(pub DashboardOutbound);

#[derive(Message)]
#[rtype(result = "ConnectionStats")]
pub struct GetStats;

#[derive(Debug, Default, Serialize)]
pub struct ConnectionStats {
    pub connected: usize,
    pub authenticated: usize,
    pub last_event_at: HashMap<String, DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
enum Subscription {
    All,
    Printers(HashSet<String>),
}

impl Subscription {
    fn matches(&self, scope: Option<&str>) -> bool {
        match scope {
            // Scope-less events (inventory, orders) are tenant-wide.
            None => true,
            Some(id) => match self {
                Subscription::All => true,
                Subscription::Printers(set) => set.contains(id),
            },
        }
    }
}

struct ClientSession {
    recipient: Recipient<OutboundFrame>,
    authenticated: bool,
    subscription: Subscription,
}

/// Per-tenant fan-out actor.
///
/// All mutations - client add/remove, auth, subscription changes, cache
/// updates, fan-out - funnel through this actor's mailbox, so no locking
/// is needed and per-tenant event ordering is preserved. Fan-out is
/// O(clients) per event: the frame is serialized once and cloned per
/// matching client.
pub struct TenantBroadcastActor {
    tenant_id: Uuid,
    db: Option<PgPool>,
    registry: Option<TenantRegistry>,
    clients: HashMap<Uuid, ClientSession>,
    last_printers: HashMap<String, DashboardOutbound>,
    last_hubs: HashMap<String, DashboardOutbound>,
    last_event_at: HashMap<&'static str, DateTime<Utc>>,
}

impl TenantBroadcastActor {
    pub fn new(tenant_id: Uuid, db: Option<PgPool>) -> Self {
        Self {
            tenant_id,
            db,
            registry: None,
            clients: HashMap::new(),
            last_printers: HashMap::new(),
            last_hubs: HashMap::new(),
            last_event_at: HashMap::new(),
        }
    }

    pub fn start_for(tenant_id: Uuid, db: Option<PgPool>, registry: TenantRegistry) -> Addr<Self> {
        let mut actor = Self::new(tenant_id, db);
        actor.registry = Some(registry);
        actor.start()
    }

    fn replay_cache_to(&self, client_id: Uuid) {
        let Some(client) = self.clients.get(&client_id) else {
            return;
        };
        for frame in self.last_printers.values().chain(self.last_hubs.values()) {
            client.recipient.do_send(OutboundFrame(frame.to_json()));
        }
    }

    fn cache_event(&mut self, event: &DashboardOutbound) {
        // Replace, never merge; entries live until overwritten.
        match event {
            DashboardOutbound::PrinterStatus { printer_id, .. } => {
                self.last_printers.insert(printer_id.clone(), event.clone());
            }
            DashboardOutbound::HubStatus { hub_id, .. } => {
                self.last_hubs.insert(hub_id.clone(), event.clone());
            }
            _ => {}
        }
        self.last_event_at.insert(event.event_type(), Utc::now());
    }
}

impl Actor for TenantBroadcastActor {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(tenant_id = %self.tenant_id, "tenant broadcast actor started");

        // Warm the printer cache from the persisted current-status table so
        // a recreated actor can still fast-forward new dashboards. Blocks
        // the mailbox until done so an early connect cannot observe a cold
        // cache.
        if let Some(db) = self.db.clone() {
            let tenant_id = self.tenant_id;
            ctx.wait(
                async move { printer_repo::latest_statuses(&db, tenant_id).await }
                    .into_actor(self)
                    .map(|res, act, _ctx| match res {
                        Ok(rows) => {
                            for (printer_id, value) in rows {
                                match serde_json::from_value::<DashboardOutbound>(value) {
                                    Ok(frame) => {
                                        act.last_printers.insert(printer_id, frame);
                                    }
                                    Err(e) => {
                                        tracing::warn!(
                                            %printer_id,
                                            error = %e,
                                            "skipping undecodable cached printer status"
                                        );
                                    }
                                }
                            }
                        }
                        Err(e) => {
                            tracing::error!(
                                tenant_id = %act.tenant_id,
                                error = %e,
                                "failed to warm printer status cache"
                            );
                        }
                    }),
            );
        }
    }

    fn stopped(&mut self, ctx: &mut Self::Context) {
        tracing::info!(tenant_id = %self.tenant_id, "tenant broadcast actor stopped");
        if let Some(registry) = self.registry.take() {
            registry.deregister(self.tenant_id, &ctx.address());
        }
    }
}

impl Handler<Connect> for TenantBroadcastActor {
    type Result = ();

    fn handle(&mut self, msg: Connect, _ctx: &mut Self::Context) {
        self.clients.insert(
            msg.client_id,
            ClientSession {
                recipient: msg.recipient,
                authenticated: false,
                subscription: Subscription::All,
            },
        );
        tracing::debug!(
            tenant_id = %self.tenant_id,
            client_id = %msg.client_id,
            total = self.clients.len(),
            "dashboard client connected"
        );
    }
}

impl Handler<Disconnect> for TenantBroadcastActor {
    type Result = ();

    fn handle(&mut self, msg: Disconnect, ctx: &mut Self::Context) {
        self.clients.remove(&msg.client_id);
        tracing::debug!(
            tenant_id = %self.tenant_id,
            client_id = %msg.client_id,
            remaining = self.clients.len(),
            "dashboard client disconnected"
        );
        if self.clients.is_empty() {
            ctx.stop();
        }
    }
}

impl Handler<MarkAuthenticated> for TenantBroadcastActor {
    type Result = ();

    fn handle(&mut self, msg: MarkAuthenticated, _ctx: &mut Self::Context) {
        if let Some(client) = self.clients.get_mut(&msg.client_id) {
            client.authenticated = true;
        }
        self.replay_cache_to(msg.client_id);
    }
}

impl Handler<UpdateSubscription> for TenantBroadcastActor {
    type Result = ();

    fn handle(&mut self, msg: UpdateSubscription, _ctx: &mut Self::Context) {
        let Some(client) = self.clients.get_mut(&msg.client_id) else {
            return;
        };
        if !client.authenticated {
            tracing::warn!(
                client_id = %msg.client_id,
                "ignoring subscribe from unauthenticated client"
            );
            return;
        }
        // Each subscribe fully replaces the previous set; empty means all.
        client.subscription = if msg.printers.is_empty() {
            Subscription::All
        } else {
            Subscription::Printers(msg.printers.into_iter().collect())
        };
    }
}

impl Handler<Publish> for TenantBroadcastActor {
    type Result = ();

    fn handle(&mut self, msg: Publish, _ctx: &mut Self::Context) {
        let event = msg.0;
        self.cache_event(&event);

        let json = event.to_json();
        let scope = event.scope();
        for client in self.clients.values() {
            if client.authenticated && client.subscription.matches(scope) {
                client.recipient.do_send(OutboundFrame(json.clone()));
            }
        }
    }
}

impl Handler<GetStats> for TenantBroadcastActor {
    type Result = MessageResult<GetStats>;

    fn handle(&mut self, _msg: GetStats, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(ConnectionStats {
            connected: self.clients.len(),
            authenticated: self.clients.values().filter(|c| c.authenticated).count(),
            last_event_at: self
                .last_event_at
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
        })
    }
}
