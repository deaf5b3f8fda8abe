use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::info;
use uuid::Uuid;

use crate::{
    dto::{
        session::SessionView,
        sse::{Handshake, ServerEvent},
    },
    error::ServiceError,
    services::{queue_service, scout_service, session_service, sse_events},
    state::{ScoutConnection, SharedState},
};

/// Names the stream a connection belongs to, so teardown can run the right
/// per-stream bookkeeping once the client goes away.
pub enum StreamKind {
    Board,
    /// Holds everything teardown needs after the request context is gone: the
    /// shared state (an `Arc` bump), the scout, and the pipe this stream
    /// registered, so cleanup leaves a reconnect's newer pipe alone.
    Scout {
        state: SharedState,
        user_id: Uuid,
        pipe: mpsc::UnboundedSender<ServerEvent>,
    },
}

/// Open the shared board stream: a handshake snapshot, then queue, match, and
/// roster events as they happen.
pub async fn board_stream(
    state: &SharedState,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>> + use<>>, ServiceError> {
    let receiver = state.board_sse().subscribe();
    let handshake = build_handshake(state, "board", None).await?;

    info!("new board SSE connection");
    Ok(to_sse_stream(receiver, None, handshake, StreamKind::Board))
}

/// Open a scout's personal stream: a resync handshake, their assignment and
/// session events, plus everything the board stream carries. Teardown of this
/// stream drives the best-effort presence cleanup.
pub async fn scout_stream(
    state: &SharedState,
    user_id: Uuid,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>> + use<>>, ServiceError> {
    scout_service::require_user(state, user_id).await?;

    let receiver = state.board_sse().subscribe();
    let handshake = build_handshake(state, "scout", Some(user_id)).await?;

    let (tx, personal) = mpsc::unbounded_channel();
    state.scout_connections().insert(
        user_id,
        ScoutConnection {
            user_id,
            tx: tx.clone(),
        },
    );

    info!(%user_id, "new scout SSE connection");
    scout_service::mark_presence(state, user_id, true).await;

    // A held assignment auto-starts now that the scout can see it.
    session_service::maybe_resume_assignment(state, user_id).await;

    Ok(to_sse_stream(
        receiver,
        Some(personal),
        handshake,
        StreamKind::Scout {
            state: Arc::clone(state),
            user_id,
            pipe: tx,
        },
    ))
}

/// Drive the subscribed channels as one SSE response: the handshake first,
/// then board and personal events interleaved until the client disconnects.
pub fn to_sse_stream(
    mut board: broadcast::Receiver<ServerEvent>,
    personal: Option<mpsc::UnboundedReceiver<ServerEvent>>,
    handshake: ServerEvent,
    kind: StreamKind,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // Bounded hop between the forwarder and the response body.
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    // The forwarder owns both receivers; the response side only polls rx.
    tokio::spawn(async move {
        let mut personal = personal;

        if tx.send(Ok(into_event(handshake))).await.is_err() {
            teardown(kind).await;
            return;
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = board.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            if tx.send(Ok(into_event(payload))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(_)) => {
                            // Dropped board events are snapshots superseded by
                            // later ones; keep the stream alive.
                            continue;
                        }
                    }
                }
                personal_event = recv_personal(&mut personal) => {
                    match personal_event {
                        Some(payload) => {
                            if tx.send(Ok(into_event(payload))).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
            }
        }

        teardown(kind).await;
    });

    // Axum drops the stream when the client disconnects, which closes rx.
    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Build the initial resync snapshot for a new subscriber.
async fn build_handshake(
    state: &SharedState,
    stream: &str,
    scout: Option<Uuid>,
) -> Result<ServerEvent, ServiceError> {
    let queue = state.store().queue_snapshot().await?;
    let active = state.store().active_match().await?;

    let (session, assignment) = match scout {
        Some(user_id) => {
            let session = state.peek_session(user_id).await.map(SessionView::from);
            let pointer = state.store().assignment(user_id).await?;
            (session, pointer.map(sse_events::assignment_view))
        }
        None => (None, None),
    };

    let payload = Handshake {
        stream: stream.to_string(),
        message: format!("subscribed to the {stream} stream"),
        queue: queue.into(),
        active_match: active.map(Into::into),
        session,
        assignment,
    };

    ServerEvent::json(Some("handshake".to_string()), &payload)
        .map_err(|err| ServiceError::InvalidState(format!("handshake did not serialize: {err}")))
}

async fn recv_personal(
    personal: &mut Option<mpsc::UnboundedReceiver<ServerEvent>>,
) -> Option<ServerEvent> {
    match personal {
        Some(receiver) => receiver.recv().await,
        None => std::future::pending().await,
    }
}

fn into_event(payload: ServerEvent) -> Event {
    let mut event = Event::default().data(payload.data);
    if let Some(name) = payload.event {
        event = event.event(name);
    }
    event
}

async fn teardown(kind: StreamKind) {
    match kind {
        StreamKind::Board => info!("board SSE stream disconnected"),
        StreamKind::Scout {
            state,
            user_id,
            pipe,
        } => {
            // Only the registration this stream created may be torn down.
            let removed = state
                .scout_connections()
                .remove_if(&user_id, |_, connection| connection.tx.same_channel(&pipe));

            if removed.is_some() {
                info!(%user_id, "scout SSE stream disconnected");
                queue_service::presence_teardown(&state, user_id).await;
            } else {
                // A reconnect already replaced this pipe; the newer stream owns cleanup.
                info!(%user_id, "stale scout SSE stream closed after reconnect");
            }
        }
    }
}
