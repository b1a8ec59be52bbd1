use actix::prelude::*;
use fleet_events_service::websocket::broadcast::{
    Connect, GetStats, MarkAuthenticated, OutboundFrame, Publish, TenantBroadcastActor,
    UpdateSubscription,
};
use fleet_events_service::websocket::message_types::DashboardOutbound;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// Stand-in for a dashboard session: records every frame it receives.
struct Collector {
    frames: Arc<Mutex<Vec<String>>>,
}

impl Actor for Collector {
    type Context = Context<Self>;
}

impl Handler<OutboundFrame> for Collector {
    type Result = ();

    fn handle(&mut self, msg: OutboundFrame, _ctx: &mut Self::Context) {
        self.frames.lock().unwrap().push(msg.0);
    }
}

struct Client {
    id: Uuid,
    frames: Arc<Mutex<Vec<String>>>,
}

fn spawn_client(broadcast: &Addr<TenantBroadcastActor>) -> Client {
    let frames = Arc::new(Mutex::new(Vec::new()));
    let addr = Collector {
        frames: frames.clone(),
    }
    .start();
    let id = Uuid::new_v4();
    broadcast.do_send(Connect {
        client_id: id,
        recipient: addr.recipient(),
    });
    Client { id, frames }
}

fn printer_status(printer_id: &str, status: &str) -> DashboardOutbound {
    DashboardOutbound::PrinterStatus {
        printer_id: printer_id.into(),
        status: status.into(),
        progress_percentage: None,
        remaining_time_seconds: None,
        current_layer: None,
        total_layers: None,
        temperatures: None,
        error_message: None,
    }
}

async fn settle() {
    // Lets both the broadcast actor and the collectors drain their
    // mailboxes before assertions.
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[actix_rt::test]
async fn subscription_filters_by_printer_scope() {
    let broadcast = TenantBroadcastActor::new(Uuid::new_v4(), None).start();
    let subscribed = spawn_client(&broadcast);
    let other = spawn_client(&broadcast);
    broadcast.do_send(MarkAuthenticated {
        client_id: subscribed.id,
    });
    broadcast.do_send(MarkAuthenticated { client_id: other.id });
    broadcast.do_send(UpdateSubscription {
        client_id: subscribed.id,
        printers: vec!["p1".into()],
    });
    broadcast.do_send(UpdateSubscription {
        client_id: other.id,
        printers: vec!["p2".into()],
    });

    broadcast.do_send(Publish(printer_status("p1", "printing")));
    settle().await;

    assert_eq!(subscribed.frames.lock().unwrap().len(), 1);
    assert!(other.frames.lock().unwrap().is_empty());
}

#[actix_rt::test]
async fn scope_less_events_reach_every_authenticated_client() {
    let broadcast = TenantBroadcastActor::new(Uuid::new_v4(), None).start();
    let narrow = spawn_client(&broadcast);
    broadcast.do_send(MarkAuthenticated { client_id: narrow.id });
    broadcast.do_send(UpdateSubscription {
        client_id: narrow.id,
        printers: vec!["p1".into()],
    });

    broadcast.do_send(Publish(DashboardOutbound::NewOrder {
        order_id: "o1".into(),
        order_number: "1001".into(),
        platform: "shopify".into(),
        total_items: 2,
    }));
    settle().await;

    let frames = narrow.frames.lock().unwrap();
    assert_eq!(frames.len(), 1);
    assert!(frames[0].contains(r#""type":"new_order""#));
}

#[actix_rt::test]
async fn each_publish_is_delivered_exactly_once() {
    let broadcast = TenantBroadcastActor::new(Uuid::new_v4(), None).start();
    let client = spawn_client(&broadcast);
    broadcast.do_send(MarkAuthenticated { client_id: client.id });

    for i in 0..3 {
        broadcast.do_send(Publish(printer_status("p1", &format!("state-{i}"))));
    }
    settle().await;

    let frames = client.frames.lock().unwrap();
    assert_eq!(frames.len(), 3);
    assert!(frames[0].contains("state-0"));
    assert!(frames[2].contains("state-2"));
}

#[actix_rt::test]
async fn unauthenticated_clients_receive_nothing() {
    let broadcast = TenantBroadcastActor::new(Uuid::new_v4(), None).start();
    let client = spawn_client(&broadcast);

    broadcast.do_send(Publish(printer_status("p1", "printing")));
    settle().await;

    assert!(client.frames.lock().unwrap().is_empty());
}

#[actix_rt::test]
async fn late_client_catches_up_from_cache() {
    let broadcast = TenantBroadcastActor::new(Uuid::new_v4(), None).start();
    let early = spawn_client(&broadcast);
    broadcast.do_send(MarkAuthenticated { client_id: early.id });

    // Two updates for the same printer: the cache keeps only the latest.
    broadcast.do_send(Publish(printer_status("p1", "heating")));
    broadcast.do_send(Publish(printer_status("p1", "printing")));
    broadcast.do_send(Publish(DashboardOutbound::HubStatus {
        hub_id: "hub-1".into(),
        is_online: true,
    }));
    settle().await;

    let late = spawn_client(&broadcast);
    broadcast.do_send(MarkAuthenticated { client_id: late.id });
    settle().await;

    let frames = late.frames.lock().unwrap();
    assert_eq!(frames.len(), 2);
    assert!(frames.iter().any(|f| f.contains("printing")));
    assert!(!frames.iter().any(|f| f.contains("heating")));
    assert!(frames.iter().any(|f| f.contains(r#""type":"hub_status""#)));
}

#[actix_rt::test]
async fn empty_subscribe_restores_all_printers() {
    let broadcast = TenantBroadcastActor::new(Uuid::new_v4(), None).start();
    let client = spawn_client(&broadcast);
    broadcast.do_send(MarkAuthenticated { client_id: client.id });
    broadcast.do_send(UpdateSubscription {
        client_id: client.id,
        printers: vec!["p1".into()],
    });
    broadcast.do_send(Publish(printer_status("p2", "printing")));
    settle().await;
    assert!(client.frames.lock().unwrap().is_empty());

    broadcast.do_send(UpdateSubscription {
        client_id: client.id,
        printers: vec![],
    });
    broadcast.do_send(Publish(printer_status("p2", "printing")));
    settle().await;
    assert_eq!(client.frames.lock().unwrap().len(), 1);
}

#[actix_rt::test]
async fn stats_count_connections_and_auth_state() {
    let broadcast = TenantBroadcastActor::new(Uuid::new_v4(), None).start();
    let authed = spawn_client(&broadcast);
    let _pending = spawn_client(&broadcast);
    broadcast.do_send(MarkAuthenticated { client_id: authed.id });
    broadcast.do_send(Publish(printer_status("p1", "printing")));

    let stats = broadcast.send(GetStats).await.unwrap();
    assert_eq!(stats.connected, 2);
    assert_eq!(stats.authenticated, 1);
    assert!(stats.last_event_at.contains_key("printer_status"));
}
