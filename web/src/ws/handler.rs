use crate::AppState;
use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use log::*;
use realtime::lifecycle::Handshake;
use realtime::message::Frame;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, Instant, Interval, MissedTickBehavior};

/// GET /socket?userId=<id>
/// Upgrades to a WebSocket. The `userId` query parameter binds the connection
/// to a user; without it the client only listens to presence broadcasts.
/// A query string that cannot be decoded (a repeated `userId`, say) opens an
/// unbound connection instead of failing the upgrade.
pub(crate) async fn ws_handler(
    State(app_state): State<AppState>,
    query: Result<Query<Handshake>, QueryRejection>,
    ws: WebSocketUpgrade,
) -> Response {
    let handshake = handshake_from_query(query);
    debug!("Upgrading WebSocket connection for {:?}", handshake.user_id);

    ws.on_upgrade(move |socket| run_connection(socket, app_state, handshake))
}

fn handshake_from_query(query: Result<Query<Handshake>, QueryRejection>) -> Handshake {
    match query {
        Ok(Query(handshake)) => handshake,
        Err(e) => {
            debug!("Malformed handshake query, connecting unbound: {e}");
            Handshake::anonymous()
        }
    }
}

/// Liveness settings for one connection.
#[derive(Debug, Clone, Copy)]
struct Liveness {
    ping_interval: Option<Duration>,
    idle_timeout: Duration,
}

impl Liveness {
    fn from_state(app_state: &AppState) -> Self {
        Self {
            ping_interval: app_state.config().ws_ping_interval(),
            idle_timeout: app_state.config().ws_idle_timeout(),
        }
    }

    fn timer(&self) -> Option<Interval> {
        self.ping_interval.map(|period| {
            let mut timer = interval(period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            timer
        })
    }

    fn is_idle(&self, last_seen: Instant, now: Instant) -> bool {
        now.saturating_duration_since(last_seen) > self.idle_timeout
    }
}

/// Resolves on the next ping tick, or never when liveness checks are off.
async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Drive one WebSocket from open to close.
///
/// Outbound frames come from the session's channel, inbound frames only
/// refresh the last-seen time. The connection is torn down through the
/// lifecycle handler however the loop ends.
async fn run_connection(socket: WebSocket, app_state: AppState, handshake: Handshake) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Frame>();

    let manager = app_state.realtime.clone();
    let mut connection = manager.connect(&handshake, tx);

    let liveness = Liveness::from_state(&app_state);
    let mut ping_timer = liveness.timer();
    if let Some(timer) = ping_timer.as_mut() {
        // The first tick completes immediately
        timer.reset();
    }
    let mut last_seen = Instant::now();

    loop {
        tokio::select! {
            outbound = rx.recv() => {
                let Some(frame) = outbound else { break };
                if let Err(e) = ws_sender.send(Message::Text(frame.into_string())).await {
                    warn!("Failed to write to connection {}: {e}", connection.id());
                    break;
                }
            }
            inbound = ws_receiver.next() => match inbound {
                Some(Ok(Message::Close(frame))) => {
                    debug!("Connection {} closed by client: {frame:?}", connection.id());
                    break;
                }
                Some(Ok(_)) => last_seen = Instant::now(),
                Some(Err(e)) => {
                    warn!("WebSocket receive error on connection {}: {e}", connection.id());
                    break;
                }
                None => break,
            },
            _ = next_tick(&mut ping_timer) => {
                if liveness.is_idle(last_seen, Instant::now()) {
                    info!("Closing idle connection {}", connection.id());
                    let _ = ws_sender
                        .send(Message::Close(Some(CloseFrame {
                            code: close_code::AWAY,
                            reason: "idle timeout".into(),
                        })))
                        .await;
                    break;
                }
                if ws_sender.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
        }
    }

    manager.disconnect(&mut connection);
    debug!("Connection {} cleaned up", connection.id());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn liveness(idle_secs: u64) -> Liveness {
        Liveness {
            ping_interval: Some(Duration::from_secs(1)),
            idle_timeout: Duration::from_secs(idle_secs),
        }
    }

    #[test]
    fn connection_within_timeout_is_not_idle() {
        let now = Instant::now();
        assert!(!liveness(60).is_idle(now, now + Duration::from_secs(60)));
    }

    #[test]
    fn connection_past_timeout_is_idle() {
        let now = Instant::now();
        assert!(liveness(60).is_idle(now, now + Duration::from_secs(61)));
    }

    fn parse_query(uri: &str) -> Result<Query<Handshake>, QueryRejection> {
        Query::try_from_uri(&uri.parse().unwrap())
    }

    #[test]
    fn repeated_user_id_connects_unbound() {
        let handshake = handshake_from_query(parse_query("/socket?userId=a&userId=b"));
        assert_eq!(handshake.user_id(), None);
    }

    #[test]
    fn well_formed_query_keeps_user_id() {
        let handshake = handshake_from_query(parse_query("/socket?userId=alice&other=1"));
        assert_eq!(handshake.user_id(), Some("alice".to_string()));
    }

    #[test]
    fn disabled_liveness_has_no_timer() {
        let disabled = Liveness {
            ping_interval: None,
            idle_timeout: Duration::from_secs(60),
        };
        assert!(disabled.timer().is_none());
    }
}
