use crate::auth::DashboardAuth;
use crate::websocket::broadcast::{
    Connect, Disconnect, MarkAuthenticated, OutboundFrame, TenantBroadcastActor,
    UpdateSubscription,
};
use crate::websocket::message_types::{DashboardInbound, DashboardOutbound};
use actix::{Actor, ActorContext, Addr, AsyncContext, Handler, StreamHandler};
use actix_web_actors::ws;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

/// The session's reaction to a client message or the auth deadline.
/// Computed without touching the socket so the state machine is testable
/// on its own; `apply` performs the socket/broadcast effects.
#[derive(Debug, PartialEq)]
enum Transition {
    Ignore,
    Accept(DashboardOutbound),
    Reject(DashboardOutbound),
    Subscribe(Vec<String>),
}

/// WebSocket session for one dashboard client.
///
/// Starts unauthenticated; the only honored message in that state is
/// `auth`. Past the auth deadline the socket is closed with an explicit
/// `auth_error` frame. Everything stateful (subscriptions, fan-out,
/// caches) lives in the tenant broadcast actor - this session only
/// validates tokens, forwards parsed messages, and writes frames.
pub struct DashboardSession {
    tenant_id: Uuid,
    client_id: Uuid,
    broadcast: Addr<TenantBroadcastActor>,
    auth: Arc<DashboardAuth>,
    auth_timeout: Duration,
    authenticated: bool,
    hb: Instant,
}

impl DashboardSession {
    pub fn new(
        tenant_id: Uuid,
        broadcast: Addr<TenantBroadcastActor>,
        auth: Arc<DashboardAuth>,
        auth_timeout: Duration,
    ) -> Self {
        Self {
            tenant_id,
            client_id: Uuid::new_v4(),
            broadcast,
            auth,
            auth_timeout,
            authenticated: false,
            hb: Instant::now(),
        }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.hb) > CLIENT_TIMEOUT {
                tracing::warn!(client_id = %act.client_id, "dashboard heartbeat timed out");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    fn on_client_message(&mut self, msg: DashboardInbound) -> Transition {
        match msg {
            DashboardInbound::Auth { token } => {
                if self.authenticated {
                    tracing::debug!(client_id = %self.client_id, "ignoring repeated auth");
                    return Transition::Ignore;
                }
                match self.auth.validate(&token, self.tenant_id) {
                    Ok(claims) => {
                        self.authenticated = true;
                        tracing::debug!(
                            client_id = %self.client_id,
                            user = %claims.sub,
                            "dashboard client authenticated"
                        );
                        Transition::Accept(DashboardOutbound::AuthSuccess)
                    }
                    Err(e) => {
                        tracing::warn!(client_id = %self.client_id, error = %e, "dashboard auth failed");
                        Transition::Reject(DashboardOutbound::AuthError {
                            error: e.to_string(),
                        })
                    }
                }
            }
            DashboardInbound::Subscribe { printers } => {
                if !self.authenticated {
                    tracing::warn!(
                        client_id = %self.client_id,
                        "ignoring subscribe before authentication"
                    );
                    return Transition::Ignore;
                }
                Transition::Subscribe(printers)
            }
        }
    }

    fn on_auth_deadline(&mut self) -> Transition {
        if self.authenticated {
            return Transition::Ignore;
        }
        tracing::info!(client_id = %self.client_id, "closing unauthenticated dashboard socket");
        Transition::Reject(DashboardOutbound::AuthError {
            error: "authentication timeout".into(),
        })
    }

    fn apply(&mut self, transition: Transition, ctx: &mut ws::WebsocketContext<Self>) {
        match transition {
            Transition::Ignore => {}
            Transition::Accept(frame) => {
                ctx.text(frame.to_json());
                // The broadcast actor replays cached statuses to this
                // client once it is marked authenticated.
                self.broadcast.do_send(MarkAuthenticated {
                    client_id: self.client_id,
                });
            }
            Transition::Reject(frame) => {
                let description = match &frame {
                    DashboardOutbound::AuthError { error } => error.clone(),
                    _ => String::new(),
                };
                ctx.text(frame.to_json());
                ctx.close(Some(ws::CloseReason {
                    code: ws::CloseCode::Policy,
                    description: Some(description),
                }));
                ctx.stop();
            }
            Transition::Subscribe(printers) => {
                self.broadcast.do_send(UpdateSubscription {
                    client_id: self.client_id,
                    printers,
                });
            }
        }
    }
}

impl Actor for DashboardSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.hb(ctx);

        self.broadcast.do_send(Connect {
            client_id: self.client_id,
            recipient: ctx.address().recipient(),
        });

        // Hard deadline for the auth handshake.
        ctx.run_later(self.auth_timeout, |act, ctx| {
            let transition = act.on_auth_deadline();
            act.apply(transition, ctx);
        });
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        self.broadcast.do_send(Disconnect {
            client_id: self.client_id,
        });
    }
}

impl Handler<OutboundFrame> for DashboardSession {
    type Result = ();

    fn handle(&mut self, msg: OutboundFrame, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for DashboardSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(payload)) => {
                self.hb = Instant::now();
                ctx.pong(&payload);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(text)) => match serde_json::from_str::<DashboardInbound>(&text) {
                Ok(parsed) => {
                    let transition = self.on_client_message(parsed);
                    self.apply(transition, ctx);
                }
                Err(e) => {
                    // A single bad frame must not end an otherwise healthy
                    // session.
                    tracing::warn!(
                        client_id = %self.client_id,
                        error = %e,
                        "ignoring malformed dashboard message"
                    );
                }
            },
            Ok(ws::Message::Binary(_)) => {
                tracing::warn!(client_id = %self.client_id, "binary frames not supported");
            }
            Ok(ws::Message::Close(reason)) => {
                tracing::debug!(client_id = %self.client_id, ?reason, "dashboard socket closed");
                ctx.stop();
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::DashboardClaims;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "dashboard-session-secret";

    fn token_for(tenant_id: Uuid) -> String {
        let claims = DashboardClaims {
            sub: "user-1".into(),
            tenant_id,
            exp: (chrono::Utc::now().timestamp() + 3600) as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn session(tenant_id: Uuid) -> DashboardSession {
        let broadcast = TenantBroadcastActor::new(tenant_id, None).start();
        DashboardSession::new(
            tenant_id,
            broadcast,
            Arc::new(DashboardAuth::new(SECRET)),
            Duration::from_secs(5),
        )
    }

    #[actix_rt::test]
    async fn deadline_without_auth_sends_auth_error_and_closes() {
        let mut session = session(Uuid::new_v4());
        match session.on_auth_deadline() {
            Transition::Reject(DashboardOutbound::AuthError { error }) => {
                assert!(error.contains("timeout"));
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[actix_rt::test]
    async fn auth_before_deadline_survives_the_deadline() {
        let tenant_id = Uuid::new_v4();
        let mut session = session(tenant_id);

        let transition = session.on_client_message(DashboardInbound::Auth {
            token: token_for(tenant_id),
        });
        assert_eq!(
            transition,
            Transition::Accept(DashboardOutbound::AuthSuccess)
        );
        assert_eq!(session.on_auth_deadline(), Transition::Ignore);
    }

    #[actix_rt::test]
    async fn bad_token_rejects_with_auth_error_before_close() {
        let mut session = session(Uuid::new_v4());
        let transition = session.on_client_message(DashboardInbound::Auth {
            token: token_for(Uuid::new_v4()),
        });
        assert!(matches!(
            transition,
            Transition::Reject(DashboardOutbound::AuthError { .. })
        ));
        assert!(!session.authenticated);
    }

    #[actix_rt::test]
    async fn subscribe_before_auth_is_ignored() {
        let mut session = session(Uuid::new_v4());
        let transition = session.on_client_message(DashboardInbound::Subscribe {
            printers: vec!["p1".into()],
        });
        assert_eq!(transition, Transition::Ignore);
    }

    #[actix_rt::test]
    async fn subscribe_after_auth_forwards_the_printer_set() {
        let tenant_id = Uuid::new_v4();
        let mut session = session(tenant_id);
        session.on_client_message(DashboardInbound::Auth {
            token: token_for(tenant_id),
        });

        let transition = session.on_client_message(DashboardInbound::Subscribe {
            printers: vec!["p1".into(), "p2".into()],
        });
        assert_eq!(
            transition,
            Transition::Subscribe(vec!["p1".into(), "p2".into()])
        );
    }
}
