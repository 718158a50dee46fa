use crate::error::DatabaseError;
use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::options::ClientOptions;
use mongodb::Client;
use std::time::Duration;
use tokio::time::timeout;

/// Establishes and probes connection handles.
///
/// Split out of the monitor loop so the lifecycle machinery can be driven
/// against a mock in tests. Implementations own their own time bounds; the
/// monitor never waits on a dial or a probe longer than these.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Connector: Send + Sync {
    /// Establish a new handle from a connection URI.
    async fn dial(&self, uri: &str) -> Result<Client, DatabaseError>;

    /// Cheap liveness check against an existing handle.
    async fn ping(&self, client: &Client) -> Result<(), DatabaseError>;
}

/// Driver-backed connector. Dialing is lazy in the driver, so the dial
/// timeout is also pushed into the client options to bound the first real
/// server selection.
pub struct MongoConnector {
    dial_timeout: Duration,
    ping_timeout: Duration,
}

impl MongoConnector {
    pub fn new(dial_timeout: Duration, ping_timeout: Duration) -> Self {
        Self { dial_timeout, ping_timeout }
    }
}

#[async_trait]
impl Connector for MongoConnector {
    async fn dial(&self, uri: &str) -> Result<Client, DatabaseError> {
        let mut options =
            timeout(self.dial_timeout, ClientOptions::parse(uri)).await.map_err(|_| DatabaseError::Timeout("dial"))??;
        options.connect_timeout = Some(self.dial_timeout);
        options.server_selection_timeout = Some(self.dial_timeout);
        Ok(Client::with_options(options)?)
    }

    async fn ping(&self, client: &Client) -> Result<(), DatabaseError> {
        let database = client.database("admin");
        let command = database.run_command(doc! { "ping": 1 }, None);
        timeout(self.ping_timeout, command).await.map_err(|_| DatabaseError::Timeout("ping"))??;
        Ok(())
    }
}
