use super::connector::Connector;
use super::state::ConnectionState;
use super::ConnectionConfig;
use mongodb::options::ClientOptions;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Background supervisor for the shared connection.
///
/// Each cycle dials while disconnected, probes while a handle exists, and
/// tears down on probe failure or once a disconnect has been requested.
/// Exactly one instance runs at a time; `ConnectionState::try_start_monitoring`
/// is the gate.
pub(crate) struct Monitor {
    pub(crate) state: Arc<ConnectionState>,
    pub(crate) connector: Arc<dyn Connector>,
    pub(crate) config: ConnectionConfig,
}

impl Monitor {
    pub(crate) async fn run(self, uri: String, mut notify: Option<oneshot::Sender<()>>) {
        while !self.state.should_disconnect().await {
            let was_connected = self.state.is_connected().await;

            if !was_connected {
                match self.connector.dial(&uri).await {
                    Ok(client) => self.state.store_handle(client).await,
                    Err(e) => debug!(error = %e, "dial attempt failed"),
                }
            }

            match self.state.client().await {
                Some(client) => match self.connector.ping(&client).await {
                    Ok(()) => {
                        self.state.set_connected(true).await;
                        if !was_connected {
                            let hosts = resolve_hosts(&uri).await;
                            info!(hosts = %hosts, "connected to mongo");
                            if let Some(tx) = notify.take() {
                                // One-shot hand-off: never blocks, and the
                                // consumed sender rules out a second signal
                                // for this connect cycle.
                                let _ = tx.send(());
                            }
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "ping failed");
                        self.teardown().await;
                        if was_connected {
                            // Log only on a connectivity change, not on
                            // every failed cycle of a sustained outage.
                            error!(error = %e, "lost mongo connection");
                        }
                    }
                },
                None => self.state.set_connected(false).await,
            }

            sleep(self.config.poll_interval).await;
        }

        self.teardown().await;
        self.state.stop_monitoring();
        debug!("connection monitor stopped");
    }

    async fn teardown(&self) {
        let handle = self.state.begin_disconnect();
        if let Some(client) = handle {
            client.shutdown().await;
            debug!("mongo client shut down");
        }
        self.state.finish_disconnect();
    }
}

/// Host list for the connected log line, resolved from the URI the same way
/// the driver does. Falls back to the raw URI when it does not parse.
async fn resolve_hosts(uri: &str) -> String {
    match ClientOptions::parse(uri).await {
        Ok(options) => options.hosts.iter().map(ToString::to_string).collect::<Vec<_>>().join(","),
        Err(_) => uri.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("mongodb://localhost:27017", "localhost:27017")]
    #[case("mongodb://db1:27017,db2:27018", "db1:27017,db2:27018")]
    #[tokio::test]
    async fn resolves_host_lists(#[case] uri: &str, #[case] expected: &str) {
        assert_eq!(resolve_hosts(uri).await, expected);
    }

    #[rstest]
    #[tokio::test]
    async fn falls_back_to_the_raw_uri() {
        assert_eq!(resolve_hosts("garbage").await, "garbage");
    }
}
