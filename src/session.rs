//! Writer session over a WebSocket.
//!
//! Each connection gets its own [`WriterSession`], which owns the
//! [`WriterState`] and is the only code that mutates it. Background work
//! (debounced fetches, size resolution, notification timers, download
//! tracking) reports back through one `mpsc` channel of [`SessionEvent`]s,
//! and every applied change is answered with a fresh snapshot.

use crate::keywords::extract_keywords;
use crate::layout::calculate_layout;
use crate::models::{ImageRecord, Size};
use crate::reconciler::{FetchReconciler, ReconcileEvent, ReconcilerConfig};
use crate::sizes::SizeResolver;
use crate::state::{Action, Effect, WriterSnapshot, WriterState};
use crate::unsplash::{track_downloads, ImageSearch};
use crate::viewport::Viewport;
use crate::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// How long a notification stays up.
pub const NOTIFICATION_TTL: Duration = Duration::from_secs(3);

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

// ============================================================================
// Protocol
// ============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Text { text: String },
    /// Editor caret, as a character offset into the text.
    Caret { offset: usize },
    Select { index: usize },
    FocusKeyword { keyword: String },
    Next,
    Previous,
    Close,
    Viewport(Viewport),
    Wheel { delta_y: f64 },
    Pinch {
        initial_scale: f64,
        initial_distance: f64,
        distance: f64,
    },
    Pan { dx: f64, dy: f64 },
    /// Ping the download endpoint for every image in the gallery.
    Export,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Snapshot(WriterSnapshot),
    Exported { tracked: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Reconcile(ReconcileEvent),
    SizeResolved { id: String, size: Size },
    NotificationExpired(u64),
    Exported(usize),
}

impl From<ReconcileEvent> for SessionEvent {
    fn from(event: ReconcileEvent) -> Self {
        SessionEvent::Reconcile(event)
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub reconciler: ReconcilerConfig,
    pub notification_ttl: Duration,
    /// Fixed seed for layout placement; entropy when `None`.
    pub layout_seed: Option<u64>,
    pub viewport: Viewport,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconciler: ReconcilerConfig::default(),
            notification_ttl: NOTIFICATION_TTL,
            layout_seed: None,
            viewport: Viewport::default(),
        }
    }
}

// ============================================================================
// Session
// ============================================================================

pub struct WriterSession<S, Z> {
    state: WriterState,
    search: Arc<S>,
    sizes: Arc<Z>,
    reconciler: FetchReconciler<S, SessionEvent>,
    events: mpsc::UnboundedSender<SessionEvent>,
    rng: StdRng,
    notification_ttl: Duration,
}

impl<S: ImageSearch, Z: SizeResolver> WriterSession<S, Z> {
    pub fn new(
        search: Arc<S>,
        sizes: Arc<Z>,
        config: SessionConfig,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let reconciler = FetchReconciler::new(Arc::clone(&search), config.reconciler, tx.clone());
        let rng = match config.layout_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let session = Self {
            state: WriterState::new(config.viewport),
            search,
            sizes,
            reconciler,
            events: tx,
            rng,
            notification_ttl: config.notification_ttl,
        };
        (session, rx)
    }

    pub fn state(&self) -> &WriterState {
        &self.state
    }

    pub fn snapshot(&self) -> ServerMessage {
        ServerMessage::Snapshot(self.state.snapshot())
    }

    /// Apply a message from the page. Returns the reply to send, if any.
    pub fn handle_client(&mut self, message: ClientMessage) -> Option<ServerMessage> {
        let action = match message {
            ClientMessage::Text { text } => {
                let generation = self.reconciler.trigger(extract_keywords(&text));
                Action::TextChanged { text, generation }
            }
            ClientMessage::Caret { offset } => Action::CaretMoved(offset),
            ClientMessage::Select { index } => Action::Select(index),
            ClientMessage::FocusKeyword { keyword } => Action::FocusKeyword(keyword),
            ClientMessage::Next => Action::Next,
            ClientMessage::Previous => Action::Previous,
            ClientMessage::Close => Action::CloseViewer,
            ClientMessage::Viewport(viewport) => Action::ViewportResized(viewport),
            ClientMessage::Wheel { delta_y } => Action::Wheel { delta_y },
            ClientMessage::Pinch {
                initial_scale,
                initial_distance,
                distance,
            } => Action::Pinch {
                initial_scale,
                initial_distance,
                distance,
            },
            ClientMessage::Pan { dx, dy } => Action::Pan { dx, dy },
            ClientMessage::Export => {
                self.export();
                return None;
            }
        };
        self.apply(action);
        Some(self.snapshot())
    }

    /// Apply a background result. Returns the reply to send, if any.
    pub fn handle_event(&mut self, event: SessionEvent) -> Option<ServerMessage> {
        let action = match event {
            SessionEvent::Reconcile(ReconcileEvent::Started { generation }) => {
                Action::SearchStarted { generation }
            }
            SessionEvent::Reconcile(ReconcileEvent::Completed {
                generation,
                keywords,
                outcome,
            }) => Action::SearchCompleted {
                generation,
                keywords,
                outcome,
            },
            SessionEvent::SizeResolved { id, size } => Action::SizeResolved { id, size },
            SessionEvent::NotificationExpired(id) => Action::NotificationExpired(id),
            SessionEvent::Exported(tracked) => return Some(ServerMessage::Exported { tracked }),
        };
        self.apply(action);
        Some(self.snapshot())
    }

    fn apply(&mut self, action: Action) {
        let mut queue: VecDeque<Effect> = self.state.reduce(action).into();
        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::ResolveSizes(images) => self.resolve_sizes(images),
                Effect::RunLayout { sizes, config } => {
                    let layout = calculate_layout(&sizes, &config, &mut self.rng);
                    queue.extend(self.state.reduce(Action::LayoutComputed(layout)));
                }
                Effect::DismissNotification(id) => {
                    let events = self.events.clone();
                    let ttl = self.notification_ttl;
                    tokio::spawn(async move {
                        tokio::time::sleep(ttl).await;
                        events.send(SessionEvent::NotificationExpired(id)).ok();
                    });
                }
            }
        }
    }

    fn resolve_sizes(&self, images: Vec<ImageRecord>) {
        for image in images {
            let sizes = Arc::clone(&self.sizes);
            let events = self.events.clone();
            tokio::spawn(async move {
                let size = sizes.resolve(&image.url).await;
                events
                    .send(SessionEvent::SizeResolved { id: image.id, size })
                    .ok();
            });
        }
    }

    fn export(&self) {
        let images: Vec<ImageRecord> = self
            .state
            .gallery
            .iter()
            .map(|item| item.image.clone())
            .collect();
        let search = Arc::clone(&self.search);
        let events = self.events.clone();
        tokio::spawn(async move {
            let tracked = track_downloads(search.as_ref(), &images).await;
            events.send(SessionEvent::Exported(tracked)).ok();
        });
    }
}

// ============================================================================
// WebSocket Handler
// ============================================================================

/// GET /ws - writer session.
pub async fn ws_handler(State(state): State<Arc<AppState>>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

async fn send(ws_tx: &mut SplitSink<WebSocket, Message>, message: &ServerMessage) -> bool {
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            log::warn!("failed to encode session message: {}", e);
            return true;
        }
    };
    ws_tx.send(Message::Text(json.into())).await.is_ok()
}

async fn handle_ws(socket: WebSocket, state: Arc<AppState>) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let my_id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);

    let config = SessionConfig {
        reconciler: ReconcilerConfig {
            debounce: state.config.debounce,
            ..ReconcilerConfig::default()
        },
        ..SessionConfig::default()
    };
    let (mut session, mut events) =
        WriterSession::new(Arc::clone(&state.search), Arc::clone(&state.sizes), config);

    log::info!("session {} opened", my_id);
    if !send(&mut ws_tx, &session.snapshot()).await {
        return;
    }

    loop {
        let reply = tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(message) => session.handle_client(message),
                            Err(e) => {
                                log::debug!("session {}: ignoring message: {}", my_id, e);
                                None
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        log::debug!("session {}: socket error: {}", my_id, e);
                        break;
                    }
                    _ => None,
                }
            }
            Some(event) = events.recv() => session.handle_event(event),
        };

        if let Some(reply) = reply {
            if !send(&mut ws_tx, &reply).await {
                break;
            }
        }
    }

    log::info!("session {} closed", my_id);
}

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;
