use actix::Addr;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use uuid::Uuid;

pub mod broadcast;
pub mod dashboard_session;
pub mod hub_session;
pub mod message_types;

use broadcast::TenantBroadcastActor;

/// Registry of live tenant broadcast actors.
///
/// One actor per tenant, created on the first dashboard connection and
/// removed when the actor stops (last client gone). Lookups from queue
/// consumers are non-spawning: with no dashboards connected there is
/// nobody to fan out to.
#[derive(Default, Clone)]
pub struct TenantRegistry {
    inner: Arc<RwLock<HashMap<Uuid, Addr<TenantBroadcastActor>>>>,
}

impl TenantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, tenant_id: Uuid) -> Option<Addr<TenantBroadcastActor>> {
        let guard = self.inner.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        guard.get(&tenant_id).filter(|a| a.connected()).cloned()
    }

    /// Resolve the tenant's broadcast actor, spawning one if needed.
    /// Must be called from within the actix system (route handlers).
    pub fn get_or_spawn(&self, tenant_id: Uuid, db: Option<PgPool>) -> Addr<TenantBroadcastActor> {
        let mut guard = self.inner.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(addr) = guard.get(&tenant_id) {
            if addr.connected() {
                return addr.clone();
            }
        }
        let addr = TenantBroadcastActor::start_for(tenant_id, db, self.clone());
        guard.insert(tenant_id, addr.clone());
        tracing::debug!(%tenant_id, "spawned tenant broadcast actor");
        addr
    }

    /// Remove the registration, but only if it still points at `addr` -
    /// a newer actor for the same tenant must not be evicted by a stale
    /// shutdown.
    pub fn deregister(&self, tenant_id: Uuid, addr: &Addr<TenantBroadcastActor>) {
        let mut guard = self.inner.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        if guard.get(&tenant_id) == Some(addr) {
            guard.remove(&tenant_id);
            tracing::debug!(%tenant_id, "removed tenant broadcast actor");
        }
    }
}

/// Tracks which session is the current one for each hub identity.
///
/// Each connect gets a fresh epoch; the debounced offline path fires only
/// if its epoch is still current, so a quick reconnect silently cancels
/// the pending offline transition.
#[derive(Default, Clone)]
pub struct HubRegistry {
    epochs: Arc<RwLock<HashMap<String, u64>>>,
    counter: Arc<AtomicU64>,
}

impl HubRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_session(&self, hub_id: &str) -> u64 {
        let epoch = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        let mut guard = self.epochs.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        guard.insert(hub_id.to_string(), epoch);
        epoch
    }

    /// Ends the session if `epoch` is still current. Returns true when the
    /// caller owns the final disconnect and should mark the hub offline.
    pub fn end_session(&self, hub_id: &str, epoch: u64) -> bool {
        let mut guard = self.epochs.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        if guard.get(hub_id) == Some(&epoch) {
            guard.remove(hub_id);
            true
        } else {
            false
        }
    }

    pub fn is_connected(&self, hub_id: &str) -> bool {
        let guard = self.epochs.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        guard.contains_key(hub_id)
    }
}
