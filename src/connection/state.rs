use mongodb::Client;
use tokio::sync::watch;

/// Point-in-time view of the connection. Readers clone a whole snapshot out
/// of the watch channel, so a half-applied transition is never observable.
#[derive(Clone, Default)]
pub(crate) struct ConnectionSnapshot {
    /// Live handle, if one has been dialed. Owned here exclusively; callers
    /// re-fetch it for every operation.
    pub client: Option<Client>,
    /// True only while `client` is present and the latest probe succeeded.
    pub is_connected: bool,
    /// True while a teardown is in progress. Getters wait for this to clear.
    pub is_disconnecting: bool,
    /// Set by a caller's disconnect request, consumed by the monitor loop.
    pub should_disconnect: bool,
    /// Mutual-exclusion gate: true iff a monitor loop is running.
    pub is_monitoring: bool,
}

/// Single source of truth for connectivity status and the live handle.
///
/// State lives inside a `watch` channel: `send_modify` totally orders
/// transitions, and `Receiver::wait_for` gives the "wait for a transition
/// without missing it" semantics that the getters need while a teardown is
/// in flight.
pub(crate) struct ConnectionState {
    tx: watch::Sender<ConnectionSnapshot>,
}

impl ConnectionState {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(ConnectionSnapshot::default());
        Self { tx }
    }

    /// Snapshot of the state, taken only once no teardown is in progress.
    pub(crate) async fn settled(&self) -> ConnectionSnapshot {
        let mut rx = self.tx.subscribe();
        let snapshot =
            rx.wait_for(|s| !s.is_disconnecting).await.expect("connection state channel closed").clone();
        snapshot
    }

    pub(crate) async fn is_connected(&self) -> bool {
        self.settled().await.is_connected
    }

    pub(crate) async fn should_disconnect(&self) -> bool {
        self.settled().await.should_disconnect
    }

    pub(crate) async fn is_monitoring(&self) -> bool {
        self.settled().await.is_monitoring
    }

    pub(crate) async fn client(&self) -> Option<Client> {
        self.settled().await.client
    }

    pub(crate) async fn set_should_disconnect(&self, value: bool) {
        self.settled().await;
        self.tx.send_if_modified(|s| {
            if s.should_disconnect == value {
                return false;
            }
            s.should_disconnect = value;
            true
        });
    }

    /// Mark the connection live or dead. A connection can only be marked
    /// live while a handle is present; marking it live also clears any
    /// stale disconnecting flag.
    pub(crate) async fn set_connected(&self, value: bool) {
        self.settled().await;
        self.tx.send_if_modified(|s| {
            let connected = value && s.client.is_some();
            if s.is_connected == connected {
                return false;
            }
            s.is_connected = connected;
            if connected {
                s.is_disconnecting = false;
            }
            true
        });
    }

    pub(crate) async fn store_handle(&self, client: Client) {
        self.settled().await;
        self.tx.send_modify(|s| s.client = Some(client));
    }

    /// Atomic check-and-set of the monitoring gate. Returns true for exactly
    /// one caller until `stop_monitoring` is called.
    pub(crate) async fn try_start_monitoring(&self) -> bool {
        self.settled().await;
        let mut started = false;
        self.tx.send_if_modified(|s| {
            if s.is_monitoring {
                return false;
            }
            s.is_monitoring = true;
            started = true;
            true
        });
        started
    }

    pub(crate) fn stop_monitoring(&self) {
        self.tx.send_if_modified(|s| {
            if !s.is_monitoring {
                return false;
            }
            s.is_monitoring = false;
            true
        });
    }

    /// Enter teardown: takes the handle and blocks all getters until
    /// `finish_disconnect`. Clearing the handle and the connected flag in one
    /// transition is what keeps `is_connected && client.is_none()` unobservable.
    pub(crate) fn begin_disconnect(&self) -> Option<Client> {
        let mut handle = None;
        self.tx.send_modify(|s| {
            s.is_disconnecting = true;
            s.is_connected = false;
            handle = s.client.take();
        });
        handle
    }

    pub(crate) fn finish_disconnect(&self) {
        self.tx.send_if_modified(|s| {
            if !s.is_disconnecting {
                return false;
            }
            s.is_disconnecting = false;
            true
        });
    }

    /// Wait until either connectivity is established or the monitor loop has
    /// exited. Returns whether the connection is live.
    pub(crate) async fn wait_connected_or_monitor_exit(&self) -> bool {
        let mut rx = self.tx.subscribe();
        let is_connected = rx
            .wait_for(|s| s.is_connected || !s.is_monitoring)
            .await
            .expect("connection state channel closed")
            .is_connected;
        is_connected
    }
}
