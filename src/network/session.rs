//! Live metrics session for one device.
//!
//! A [`MetricsSession`] owns the bounded [`SessionStore`] and one background
//! driver task. The driver is the only writer of streamed data: it opens the
//! transport, sends the start command, decodes each inbound frame and appends
//! it to the store in arrival order. When the link drops it publishes
//! `Disconnected`, sleeps for the reconnect delay and tries again, forever,
//! until [`MetricsSession::stop`] is called.
//!
//! Cancellation goes through a oneshot channel raced against every await point
//! of the driver (connect, receive, reconnect delay), so a stopped session can
//! never be resurrected by a pending timer. Every driver also carries a
//! generation number; signals from a superseded driver are discarded.
//!
//! Consumers observe the session through `tokio::sync::watch` receivers
//! instead of polling buffer lengths.

use crate::config::{CorrelationConfig, SessionConfig};
use crate::correlate::{nearest_marker, nearest_screenshot};
use crate::data::{SessionStore, StoreSnapshot};
use crate::error::{AppResult, PerfError};
use crate::measurement_types::{Marker, Screenshot, TimestampMs};
use crate::network::protocol::{decode, InboundMessage, OutboundMessage};
use crate::network::state::SessionState;
use crate::network::transport::{Connection, Transport, WebSocketTransport};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

/// Upper bound on the stop-frame-and-close handshake during `stop()`.
const GRACEFUL_CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Handle to the running driver task.
struct Driver {
    cancel: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// State shared between the session handle and its driver task.
struct Shared {
    transport: Arc<dyn Transport>,
    reconnect_delay: Duration,
    store: RwLock<SessionStore>,
    generation: AtomicU64,
    state_tx: watch::Sender<SessionState>,
    connected_tx: watch::Sender<bool>,
    last_metric_tx: watch::Sender<Option<DateTime<Utc>>>,
    last_log_tx: watch::Sender<Option<DateTime<Utc>>>,
    last_screenshot_tx: watch::Sender<Option<DateTime<Utc>>>,
    package_tx: watch::Sender<Option<String>>,
}

/// How a connected link ended.
enum LinkEnd {
    Cancelled,
    Lost(PerfError),
}

/// One reconnecting metrics session.
pub struct MetricsSession {
    shared: Arc<Shared>,
    driver: Mutex<Option<Driver>>,
    correlation: CorrelationConfig,
}

impl MetricsSession {
    /// Create an idle session on top of `transport`.
    pub fn new(transport: Arc<dyn Transport>, config: &SessionConfig) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Idle);
        let (connected_tx, _) = watch::channel(false);
        let (last_metric_tx, _) = watch::channel(None);
        let (last_log_tx, _) = watch::channel(None);
        let (last_screenshot_tx, _) = watch::channel(None);
        let (package_tx, _) = watch::channel(None);

        Self {
            shared: Arc::new(Shared {
                transport,
                reconnect_delay: config.reconnect_delay(),
                store: RwLock::new(SessionStore::new(config.capacity())),
                generation: AtomicU64::new(0),
                state_tx,
                connected_tx,
                last_metric_tx,
                last_log_tx,
                last_screenshot_tx,
                package_tx,
            }),
            driver: Mutex::new(None),
            correlation: CorrelationConfig::default(),
        }
    }

    /// Use `config`'s match windows for [`Self::nearest_marker`] and
    /// [`Self::nearest_screenshot`] instead of the defaults.
    #[must_use]
    pub fn with_correlation(mut self, config: &CorrelationConfig) -> Self {
        self.correlation = config.clone();
        self
    }

    /// Create an idle session speaking WebSocket to `config.server_url`.
    pub fn websocket(config: &SessionConfig) -> AppResult<Self> {
        let transport = WebSocketTransport::new(&config.server_url)?;
        Ok(Self::new(Arc::new(transport), config))
    }

    /// Start streaming `device_id`, optionally pinned to one application.
    ///
    /// A running session is stopped first. Returns once the driver task has
    /// been spawned; connection progress is reported through [`Self::subscribe_state`].
    pub async fn start(&self, device_id: impl Into<String>, target: Option<String>) {
        self.stop().await;

        let device_id = device_id.into();
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.package_tx.send_replace(target.clone());
        info!(device = %device_id, target = ?target, "Starting metrics session");

        let (cancel, cancel_rx) = oneshot::channel();
        let task = tokio::spawn(run_driver(
            Arc::clone(&self.shared),
            generation,
            device_id,
            target,
            cancel_rx,
        ));

        if let Some(previous) = self.driver.lock().replace(Driver { cancel, task }) {
            // A concurrent start() won the race; retire its driver.
            let _ = previous.cancel.send(());
        }
    }

    /// Stop the session: cancel any pending reconnect, send the stop command,
    /// close the link and go `Idle`. Idempotent.
    pub async fn stop(&self) {
        let driver = self.driver.lock().take();
        if let Some(driver) = driver {
            // Invalidate the driver before it can publish anything else.
            self.shared.generation.fetch_add(1, Ordering::SeqCst);
            let _ = driver.cancel.send(());
            if let Err(e) = driver.task.await {
                warn!(error = %e, "Session driver ended abnormally");
            }
            info!("Metrics session stopped");
        }
        self.shared.set_state(SessionState::Idle);
    }

    /// Clear every buffer and all markers. The session keeps running.
    pub fn reset(&self) {
        self.shared.store.write().reset();
        debug!("Session buffers cleared");
    }

    /// Place a marker at the current wall-clock time.
    pub fn add_marker(&self, label: impl Into<String>) -> AppResult<Marker> {
        if !self.state().is_active() {
            return Err(PerfError::SessionInactive);
        }
        let marker = Marker::new(Utc::now().timestamp_millis(), label);
        self.shared.store.write().add_marker(marker.clone());
        debug!(label = %marker.label, t = marker.timestamp_ms, "Marker placed");
        Ok(marker)
    }

    /// Consistent copy of every buffer.
    #[must_use]
    pub fn snapshot(&self) -> StoreSnapshot {
        self.shared.store.read().snapshot()
    }

    /// Marker closest to `t` within the configured marker window.
    #[must_use]
    pub fn nearest_marker(&self, t: TimestampMs) -> Option<Marker> {
        let store = self.shared.store.read();
        nearest_marker(store.markers(), t, self.correlation.marker_tolerance_ms).cloned()
    }

    /// Retained screenshot closest to `t` within the configured screenshot window.
    #[must_use]
    pub fn nearest_screenshot(&self, t: TimestampMs) -> Option<Screenshot> {
        let store = self.shared.store.read();
        nearest_screenshot(
            store.screenshots().iter(),
            t,
            self.correlation.screenshot_tolerance_ms,
        )
        .cloned()
    }

    /// Run `f` against the live store under the read lock.
    pub fn with_store<R>(&self, f: impl FnOnce(&SessionStore) -> R) -> R {
        f(&self.shared.store.read())
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.shared.state_tx.borrow().clone()
    }

    /// Whether the link is currently up.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        *self.shared.connected_tx.borrow()
    }

    /// Observe lifecycle transitions.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.shared.state_tx.subscribe()
    }

    /// Observe link up/down.
    #[must_use]
    pub fn subscribe_connected(&self) -> watch::Receiver<bool> {
        self.shared.connected_tx.subscribe()
    }

    /// Wall-clock receipt time of the latest metrics tick.
    #[must_use]
    pub fn subscribe_metric_updates(&self) -> watch::Receiver<Option<DateTime<Utc>>> {
        self.shared.last_metric_tx.subscribe()
    }

    /// Wall-clock receipt time of the latest log line.
    #[must_use]
    pub fn subscribe_log_updates(&self) -> watch::Receiver<Option<DateTime<Utc>>> {
        self.shared.last_log_tx.subscribe()
    }

    /// Wall-clock receipt time of the latest screenshot.
    #[must_use]
    pub fn subscribe_screenshot_updates(&self) -> watch::Receiver<Option<DateTime<Utc>>> {
        self.shared.last_screenshot_tx.subscribe()
    }

    /// The application being monitored: the explicit target, or the package
    /// most recently reported by the producer when no target was given.
    #[must_use]
    pub fn subscribe_current_package(&self) -> watch::Receiver<Option<String>> {
        self.shared.package_tx.subscribe()
    }
}

impl Drop for MetricsSession {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.get_mut().take() {
            self.shared.generation.fetch_add(1, Ordering::SeqCst);
            let _ = driver.cancel.send(());
        }
    }
}

impl Shared {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn set_state(&self, state: SessionState) {
        let connected = state.is_connected();
        self.state_tx.send_replace(state);
        self.connected_tx.send_if_modified(|current| {
            let changed = *current != connected;
            *current = connected;
            changed
        });
    }

    fn publish(&self, generation: u64, state: SessionState) {
        if self.is_current(generation) {
            self.set_state(state);
        }
    }

    fn dispatch(&self, generation: u64, message: InboundMessage, track_package: bool) {
        if !self.is_current(generation) {
            return;
        }
        trace!(kind = message.kind(), "Frame received");
        let received_at = Utc::now();

        match message {
            InboundMessage::Metrics(sample) => {
                self.store.write().append(&sample);
                self.last_metric_tx.send_replace(Some(received_at));
                if let Some(package) = sample.package.filter(|_| track_package) {
                    self.package_tx.send_if_modified(|current| {
                        if current.as_deref() == Some(package.as_str()) {
                            false
                        } else {
                            *current = Some(package);
                            true
                        }
                    });
                }
            }
            InboundMessage::Log(entry) => {
                if entry.is_crash {
                    warn!(message = %entry.message, "Device reported a crash");
                }
                self.store.write().append_log(entry);
                self.last_log_tx.send_replace(Some(received_at));
            }
            InboundMessage::Screenshot(shot) => {
                debug!(url = %shot.url, "Screenshot received");
                self.store.write().append_screenshot(shot);
                self.last_screenshot_tx.send_replace(Some(received_at));
            }
        }
    }
}

/// Connect, stream, and reconnect until cancelled.
async fn run_driver(
    shared: Arc<Shared>,
    generation: u64,
    device_id: String,
    target: Option<String>,
    mut cancel_rx: oneshot::Receiver<()>,
) {
    let mut attempt: u32 = 1;
    loop {
        shared.publish(generation, SessionState::Connecting { attempt });

        let connected = tokio::select! {
            _ = &mut cancel_rx => return,
            result = shared.transport.connect(&device_id) => result,
        };

        let fault = match connected {
            Ok(mut conn) => {
                match serve(&shared, generation, conn.as_mut(), &target, &mut cancel_rx).await {
                    LinkEnd::Cancelled => {
                        close_gracefully(conn.as_mut()).await;
                        return;
                    }
                    LinkEnd::Lost(fault) => {
                        let _ = conn.close().await;
                        fault
                    }
                }
            }
            Err(e) => e,
        };

        if fault.is_link_fault() {
            warn!(device = %device_id, attempt, error = %fault, "Link lost");
        } else {
            error!(device = %device_id, attempt, error = %fault, "Session failed, retrying");
        }
        shared.publish(
            generation,
            SessionState::Disconnected {
                attempt,
                last_error: fault.to_string(),
            },
        );

        info!(
            device = %device_id,
            delay_ms = shared.reconnect_delay.as_millis() as u64,
            "Scheduling reconnect"
        );
        tokio::select! {
            _ = &mut cancel_rx => return,
            () = tokio::time::sleep(shared.reconnect_delay) => {}
        }
        attempt = attempt.saturating_add(1);
    }
}

/// Send the start command, then dispatch frames until the link ends.
async fn serve(
    shared: &Shared,
    generation: u64,
    conn: &mut dyn Connection,
    target: &Option<String>,
    cancel_rx: &mut oneshot::Receiver<()>,
) -> LinkEnd {
    let start = OutboundMessage::Start {
        target: target.clone(),
    };
    let sent = match start.encode() {
        Ok(frame) => tokio::select! {
            _ = &mut *cancel_rx => return LinkEnd::Cancelled,
            result = conn.send(frame) => result,
        },
        Err(e) => Err(e),
    };
    if let Err(e) = sent {
        return LinkEnd::Lost(e);
    }

    shared.publish(generation, SessionState::Connected { since: Utc::now() });
    info!("Link established");

    let track_package = target.is_none();
    loop {
        let next = tokio::select! {
            _ = &mut *cancel_rx => return LinkEnd::Cancelled,
            next = conn.recv() => next,
        };
        match next {
            Some(Ok(frame)) => {
                if let Some(message) = decode(&frame) {
                    shared.dispatch(generation, message, track_package);
                }
            }
            Some(Err(e)) => return LinkEnd::Lost(e),
            None => return LinkEnd::Lost(PerfError::ConnectionClosed),
        }
    }
}

/// Best-effort stop command and close; failures are only logged.
async fn close_gracefully(conn: &mut dyn Connection) {
    let handshake = async {
        let frame = OutboundMessage::Stop.encode()?;
        conn.send(frame).await?;
        conn.close().await
    };
    match tokio::time::timeout(GRACEFUL_CLOSE_TIMEOUT, handshake).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!(error = %e, "Stop handshake failed"),
        Err(_) => debug!("Stop handshake timed out"),
    }
}
