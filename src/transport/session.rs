//! Duplex websocket session — connect, dispatch, send, teardown.
//!
//! [`TransportSession`] owns the socket lifecycle behind the state machine
//! `Idle → Connecting → Active → Closing → Idle`.  Once active, two tokio
//! tasks service the connection:
//!
//! * **writer** — drains the bounded outgoing frame queue into the socket
//!   and sends a Close frame when the queue is dropped;
//! * **reader** — routes incoming messages as [`TransportEvent`]s: binary
//!   payloads to the playback path, parsed annotations to the reconciler,
//!   close/error to the orchestrator.  Malformed text payloads are dropped
//!   with a log line, never surfaced.
//!
//! [`TransportSession::start`] does not claim `Active` without a confirmed
//! open: the connect is awaited under a bounded timeout and any failure
//! resets the state to `Idle` before returning.

use std::sync::{Arc, Mutex};

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;

use crate::transcript::Annotation;

/// Frames queued for transmission before the writer applies backpressure by
/// dropping.  At 20 ms per frame this is about 1.3 s of audio.
const OUTGOING_QUEUE_FRAMES: usize = 64;

// ---------------------------------------------------------------------------
// LinkState
// ---------------------------------------------------------------------------

/// Connection lifecycle of a [`TransportSession`].
///
/// ```text
/// Idle ──start──▶ Connecting ──open confirmed──▶ Active
///                     │                            │
///                     └──timeout / error──▶ Idle ◀─┴──stop / close / error
///                                            ▲
///                              Closing ──────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No socket; safe to start.
    Idle,
    /// Connect in flight, open not yet confirmed.
    Connecting,
    /// Open confirmed; frames flow both ways.
    Active,
    /// Teardown in progress.
    Closing,
}

impl LinkState {
    /// `true` only when frames may be transmitted.
    pub fn is_active(&self) -> bool {
        matches!(self, LinkState::Active)
    }
}

// ---------------------------------------------------------------------------
// TransportEvent
// ---------------------------------------------------------------------------

/// Messages emitted by the reader task toward the control domain.
#[derive(Debug)]
pub enum TransportEvent {
    /// A binary audio payload (little-endian PCM16 of arbitrary length).
    Binary(Vec<u8>),
    /// A parsed text annotation (possibly [`Annotation::Empty`]).
    Annotation(Annotation),
    /// The peer closed the connection.
    Closed,
    /// The connection failed mid-session.
    Error(String),
}

// ---------------------------------------------------------------------------
// TransportError
// ---------------------------------------------------------------------------

/// Errors that fail a transport start.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid endpoint url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("websocket open timed out after {0} s")]
    OpenTimeout(u64),

    #[error("websocket connect failed: {0}")]
    Connect(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("transport is already started")]
    AlreadyStarted,
}

// ---------------------------------------------------------------------------
// FrameSink
// ---------------------------------------------------------------------------

/// Outgoing frame interface handed to the capture session.
///
/// Object-safe and `Send + Sync` so it can be held behind an
/// `Arc<dyn FrameSink>` and called from the capture control task.
pub trait FrameSink: Send + Sync {
    /// Submit one wire frame for transmission.
    ///
    /// Never blocks.  Frames are dropped silently when the link is not
    /// active or the outgoing queue is full — for live audio, freshness
    /// beats completeness.
    fn send_frame(&self, frame: Vec<u8>);
}

// Compile-time assertion: Box<dyn FrameSink> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn FrameSink>) {}
};

// ---------------------------------------------------------------------------
// TransportHandle
// ---------------------------------------------------------------------------

/// Cheap cloneable sender half of a running [`TransportSession`].
#[derive(Clone)]
pub struct TransportHandle {
    state: Arc<Mutex<LinkState>>,
    outgoing: mpsc::Sender<Vec<u8>>,
}

impl FrameSink for TransportHandle {
    fn send_frame(&self, frame: Vec<u8>) {
        if !self.state.lock().unwrap().is_active() {
            return;
        }
        // try_send so the capture control task never stalls on a slow link;
        // a full queue drops the frame.
        if self.outgoing.try_send(frame).is_err() {
            log::debug!("transport: outgoing queue full, frame dropped");
        }
    }
}

// ---------------------------------------------------------------------------
// TransportSession
// ---------------------------------------------------------------------------

/// Owns the duplex websocket and its reader/writer tasks.
///
/// # Example
///
/// ```rust,no_run
/// use tokio::sync::mpsc;
/// use meeting_stream::transport::{TransportEvent, TransportSession};
///
/// # async fn example() -> Result<(), meeting_stream::transport::TransportError> {
/// let (event_tx, mut event_rx) = mpsc::channel::<TransportEvent>(64);
/// let mut transport = TransportSession::new(5);
/// transport.start("ws://localhost:8000/ws/meeting", event_tx).await?;
///
/// let sink = transport.sender().unwrap();
/// // hand `sink` to the capture session; consume `event_rx` in the
/// // orchestrator loop.
/// # Ok(())
/// # }
/// ```
pub struct TransportSession {
    state: Arc<Mutex<LinkState>>,
    outgoing_tx: Option<mpsc::Sender<Vec<u8>>>,
    writer: Option<JoinHandle<()>>,
    reader: Option<JoinHandle<()>>,
    open_timeout_secs: u64,
}

impl TransportSession {
    /// Create an idle session with the given open-wait timeout.
    pub fn new(open_timeout_secs: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(LinkState::Idle)),
            outgoing_tx: None,
            writer: None,
            reader: None,
            open_timeout_secs,
        }
    }

    /// Current link state.
    pub fn state(&self) -> LinkState {
        *self.state.lock().unwrap()
    }

    /// Connect to `url` and begin dispatching messages to `event_tx`.
    ///
    /// Waits for the open confirmation under the configured timeout; on
    /// timeout or connect error the state is back at [`LinkState::Idle`] and
    /// no tasks are left running — the start fails as a unit.
    ///
    /// # Errors
    ///
    /// - [`TransportError::AlreadyStarted`] — the session is not idle.
    /// - [`TransportError::InvalidUrl`] — `url` does not parse.
    /// - [`TransportError::OpenTimeout`] — no open within the timeout.
    /// - [`TransportError::Connect`] — the handshake failed.
    pub async fn start(
        &mut self,
        url: &str,
        event_tx: mpsc::Sender<TransportEvent>,
    ) -> Result<(), TransportError> {
        {
            let mut st = self.state.lock().unwrap();
            if *st != LinkState::Idle {
                return Err(TransportError::AlreadyStarted);
            }
            *st = LinkState::Connecting;
        }

        let parsed = match Url::parse(url) {
            Ok(u) => u,
            Err(e) => {
                *self.state.lock().unwrap() = LinkState::Idle;
                return Err(e.into());
            }
        };

        log::info!("transport: connecting to {parsed}");

        let connect = timeout(
            Duration::from_secs(self.open_timeout_secs),
            connect_async(parsed.as_str()),
        )
        .await;

        let ws = match connect {
            Err(_) => {
                *self.state.lock().unwrap() = LinkState::Idle;
                return Err(TransportError::OpenTimeout(self.open_timeout_secs));
            }
            Ok(Err(e)) => {
                *self.state.lock().unwrap() = LinkState::Idle;
                return Err(e.into());
            }
            Ok(Ok((ws, _response))) => ws,
        };

        let (mut write, mut read) = ws.split();

        // Active before the tasks exist: a peer that closes right after the
        // handshake would otherwise let the reader write Idle first, only to
        // be overwritten with Active below.
        *self.state.lock().unwrap() = LinkState::Active;

        // Writer: outgoing queue → socket, Close frame on queue drop.
        let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<Vec<u8>>(OUTGOING_QUEUE_FRAMES);
        let writer = tokio::spawn(async move {
            while let Some(frame) = outgoing_rx.recv().await {
                if let Err(e) = write.send(Message::Binary(frame)).await {
                    log::warn!("transport: send failed: {e}");
                    break;
                }
            }
            let _ = write.send(Message::Close(None)).await;
        });

        // Reader: socket → TransportEvents.
        let state = Arc::clone(&self.state);
        let reader = tokio::spawn(async move {
            while let Some(msg) = read.next().await {
                match msg {
                    Ok(Message::Binary(bytes)) => {
                        if event_tx.send(TransportEvent::Binary(bytes)).await.is_err() {
                            break; // orchestrator gone
                        }
                    }
                    Ok(Message::Text(text)) => match Annotation::parse(&text) {
                        Ok(annotation) => {
                            if event_tx
                                .send(TransportEvent::Annotation(annotation))
                                .await
                                .is_err()
                            {
                                break;
                            }
                        }
                        Err(e) => {
                            log::debug!("transport: dropping malformed annotation: {e}");
                        }
                    },
                    Ok(Message::Close(_)) => {
                        log::info!("transport: peer closed the connection");
                        let _ = event_tx.send(TransportEvent::Closed).await;
                        break;
                    }
                    Err(e) => {
                        log::warn!("transport: receive error: {e}");
                        let _ = event_tx.send(TransportEvent::Error(e.to_string())).await;
                        break;
                    }
                    _ => {} // Ping/Pong handled by tungstenite
                }
            }
            // Step down only from Active; a concurrent stop() owns the
            // Closing → Idle transition.
            let mut st = state.lock().unwrap();
            if *st == LinkState::Active {
                *st = LinkState::Idle;
            }
        });

        self.outgoing_tx = Some(outgoing_tx);
        self.writer = Some(writer);
        self.reader = Some(reader);
        log::info!("transport: active");
        Ok(())
    }

    /// A [`FrameSink`] handle for the capture path, or `None` when the
    /// session has never been started.
    pub fn sender(&self) -> Option<TransportHandle> {
        self.outgoing_tx.as_ref().map(|tx| TransportHandle {
            state: Arc::clone(&self.state),
            outgoing: tx.clone(),
        })
    }

    /// Close the socket and stop both tasks.  Safe to call from any state;
    /// repeated calls are no-ops.
    pub async fn stop(&mut self) {
        {
            let mut st = self.state.lock().unwrap();
            if *st == LinkState::Idle && self.outgoing_tx.is_none() {
                return;
            }
            *st = LinkState::Closing;
        }

        // Dropping the queue ends the writer, which sends the Close frame.
        self.outgoing_tx = None;
        if let Some(writer) = self.writer.take() {
            if timeout(Duration::from_secs(1), writer).await.is_err() {
                log::warn!("transport: writer did not finish in time");
            }
        }
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }

        *self.state.lock().unwrap() = LinkState::Idle;
        log::info!("transport: stopped");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
