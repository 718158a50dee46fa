//! Connection lifecycle management.
//!
//! [`MongoConnection`] owns the single shared handle. A background monitor
//! loop dials while disconnected, probes while connected, and tears the
//! handle down when a probe fails or a disconnect is requested. Callers
//! re-fetch the handle through [`MongoConnection::client`] for every
//! operation; it may change between calls.

mod connector;
mod monitor;
mod state;

pub use connector::{Connector, MongoConnector};

use crate::error::DatabaseError;
use mongodb::Client;
use monitor::Monitor;
use state::ConnectionState;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::warn;

/// Time bounds for dialing, probing and the monitor cycle.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub dial_timeout: Duration,
    pub ping_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            dial_timeout: Duration::from_secs(10),
            ping_timeout: Duration::from_secs(3),
            poll_interval: Duration::from_secs(5),
        }
    }
}

/// Owner of the shared mongo connection.
///
/// Explicitly constructed and shared via `Arc`; there is no process-wide
/// singleton, so independent instances can coexist (and be tested) freely.
pub struct MongoConnection {
    state: Arc<ConnectionState>,
    connector: Arc<dyn Connector>,
    config: ConnectionConfig,
}

impl Default for MongoConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl MongoConnection {
    pub fn new() -> Self {
        Self::with_config(ConnectionConfig::default())
    }

    pub fn with_config(config: ConnectionConfig) -> Self {
        let connector = Arc::new(MongoConnector::new(config.dial_timeout, config.ping_timeout));
        Self::with_connector(connector, config)
    }

    pub(crate) fn with_connector(connector: Arc<dyn Connector>, config: ConnectionConfig) -> Self {
        Self { state: Arc::new(ConnectionState::new()), connector, config }
    }

    /// Start or join connection monitoring.
    ///
    /// If no monitor loop is running, one is spawned and this returns
    /// immediately; connectivity is established asynchronously and `notify`
    /// is signaled once, the first time a probe succeeds. If a loop is
    /// already running, this waits for connectivity and then signals
    /// `notify` itself. The wait is unbounded but cancel-safe, so callers
    /// who want a limit can wrap the future in `tokio::time::timeout`.
    ///
    /// Dial failures are never surfaced here; the loop retries every cycle.
    pub async fn connect(&self, uri: &str, mut notify: Option<oneshot::Sender<()>>) -> Result<(), DatabaseError> {
        self.state.set_should_disconnect(false).await;
        loop {
            if self.state.try_start_monitoring().await {
                let monitor = Monitor {
                    state: Arc::clone(&self.state),
                    connector: Arc::clone(&self.connector),
                    config: self.config.clone(),
                };
                tokio::spawn(monitor.run(uri.to_string(), notify.take()));
                return Ok(());
            }
            // A monitor is already running: wait for it to connect. If it
            // exits instead (a disconnect raced us), start over and spawn a
            // fresh one rather than waiting forever.
            if self.state.wait_connected_or_monitor_exit().await {
                if let Some(tx) = notify.take() {
                    let _ = tx.send(());
                }
                return Ok(());
            }
        }
    }

    /// Request an asynchronous teardown. The monitor loop performs the
    /// actual disconnect on its next cycle.
    pub async fn disconnect(&self) -> Result<(), DatabaseError> {
        if !self.state.is_connected().await {
            return Err(DatabaseError::NotConnected);
        }
        self.state.set_should_disconnect(true).await;
        warn!("mongo connection marked for disconnection");
        Ok(())
    }

    /// Current live handle. Do not cache it across operations; it may be
    /// replaced whenever the monitor reconnects.
    pub async fn client(&self) -> Result<Client, DatabaseError> {
        if !self.state.is_connected().await {
            return Err(DatabaseError::NotConnected);
        }
        self.state.client().await.ok_or(DatabaseError::NotConnected)
    }

    pub async fn is_connected(&self) -> bool {
        self.state.is_connected().await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use mongodb::Client;

    /// Handle that never touches the network: the driver dials lazily, so
    /// construction succeeds without a reachable server.
    pub(crate) async fn offline_client() -> Client {
        Client::with_uri_str("mongodb://localhost:27017").await.expect("offline client")
    }
}
