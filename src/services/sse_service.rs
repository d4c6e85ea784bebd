use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

use crate::{
    dto::{
        game::SessionSnapshot,
        sse::{Handshake, ServerEvent},
    },
    services::sse_events::EVENT_SESSION_UPDATED,
    state::SharedState,
};

const EVENT_HANDSHAKE: &str = "handshake";

/// Subscription to one user's event hub plus the events replayed on connect.
pub struct Subscription {
    /// Live events of the user's table.
    pub receiver: broadcast::Receiver<ServerEvent>,
    /// Handshake and current snapshot, sent before live events.
    pub initial: Vec<ServerEvent>,
}

/// Subscribe to the events of `user_id`, creating their table when needed.
pub async fn subscribe(state: &SharedState, user_id: &str) -> Subscription {
    let table = state.table(user_id);
    let receiver = table.hub().subscribe();

    let mut initial = Vec::with_capacity(2);
    let handshake = Handshake {
        message: "subscribed to session events".into(),
        degraded: state.is_degraded(),
    };
    push_json(&mut initial, EVENT_HANDSHAKE, &handshake);

    let snapshot = table
        .session()
        .read()
        .await
        .session()
        .map(SessionSnapshot::from);
    if let Some(snapshot) = snapshot {
        push_json(&mut initial, EVENT_SESSION_UPDATED, &snapshot);
    }

    debug!(user_id, subscribers = table.hub().subscribers(), "session stream opened");
    Subscription { receiver, initial }
}

fn push_json(events: &mut Vec<ServerEvent>, name: &str, payload: &impl serde::Serialize) {
    match ServerEvent::json(Some(name.to_string()), payload) {
        Ok(event) => events.push(event),
        Err(err) => warn!(event = name, error = %err, "failed to serialize SSE payload"),
    }
}

/// Convert a subscription into an SSE response, forwarding events until the
/// client disconnects. The user's table is released afterwards if it is idle.
pub fn to_sse_stream(
    state: SharedState,
    subscription: Subscription,
    user_id: String,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let Subscription {
        mut receiver,
        initial,
    } = subscription;
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        let mut open = true;
        for payload in initial {
            if tx.send(Ok(to_event(payload))).await.is_err() {
                open = false;
                break;
            }
        }

        while open {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            if tx.send(Ok(to_event(payload))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            debug!(user_id = %user_id, skipped, "session stream lagged");
                            continue;
                        }
                    }
                }
            }
        }

        drop(receiver);
        state.release_table(&user_id);
        tracing::info!(user_id = %user_id, "session SSE stream disconnected");
    });

    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn to_event(payload: ServerEvent) -> Event {
    let event = Event::default().data(payload.data);
    match payload.event {
        Some(name) => event.event(name),
        None => event,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dto::game::CreateGameRequest,
        services::game_service,
        test_support::{FakeProvider, USER, state_with},
    };

    #[tokio::test]
    async fn handshake_comes_first_then_snapshot() {
        let (state, _, _) = state_with(FakeProvider::default()).await;
        let empty = subscribe(&state, USER).await;
        assert_eq!(empty.initial.len(), 1);
        assert_eq!(empty.initial[0].event.as_deref(), Some(EVENT_HANDSHAKE));

        game_service::create_game(&state, USER, CreateGameRequest::default())
            .await
            .unwrap();
        let subscription = subscribe(&state, USER).await;
        let names: Vec<_> = subscription
            .initial
            .iter()
            .map(|event| event.event.clone().unwrap_or_default())
            .collect();
        assert_eq!(names, vec![EVENT_HANDSHAKE, EVENT_SESSION_UPDATED]);

        let handshake: serde_json::Value =
            serde_json::from_str(&subscription.initial[0].data).unwrap();
        assert_eq!(handshake["degraded"], false);
    }

    #[tokio::test]
    async fn live_events_reach_subscribers() {
        let (state, _, _) = state_with(FakeProvider::default()).await;
        let mut subscription = subscribe(&state, USER).await;

        game_service::create_game(&state, USER, CreateGameRequest::default())
            .await
            .unwrap();
        let event = subscription.receiver.recv().await.unwrap();
        assert_eq!(event.event.as_deref(), Some(EVENT_SESSION_UPDATED));
    }

    #[tokio::test]
    async fn closed_stream_releases_an_idle_table() {
        let (state, _, _) = state_with(FakeProvider::default()).await;
        let subscription = subscribe(&state, USER).await;
        let sse = to_sse_stream(state.clone(), subscription, USER.to_string());
        assert!(state.existing_table(USER).is_some());

        drop(sse);
        for _ in 0..50 {
            if state.existing_table(USER).is_none() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(state.existing_table(USER).is_none());
    }
}
