//! # The Redis Server

use crate::cli::Args;
use crate::conn::handle_connection;
use crate::constants::LOCAL_SOCKET_ADDR_STR;
use crate::constants::CONNECTION_PERMIT_TIMEOUT_MS;
use crate::errors::ServerError;
use crate::log_and_stderr;
use crate::storage::Store;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::timeout;

/// Redis server
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    max_conn: Arc<Semaphore>,
    store: Store,
}

impl Server {
    /// Create an instance of the Redis server, already bound to `args.port`.
    pub async fn new(args: &Args, store: Store) -> Result<Self, ServerError> {
        let listener =
            TcpListener::bind(format!("{LOCAL_SOCKET_ADDR_STR}:{}", args.port)).await?;
        let addr = listener.local_addr()?;
        log_and_stderr!(info, "Listening on", addr);

        Ok(Self {
            listener,
            max_conn: Arc::new(Semaphore::new(args.max_conn)),
            store,
        })
    }

    /// Start the server
    ///
    /// Starts the async core loop.
    pub async fn start(&self) -> Result<(), ServerError> {
        self.core_loop().await
    }

    /// Resolve Redis queries
    ///
    /// Supports multiple concurrent clients in addition to multiple pipelined requests from the
    /// same connection.
    async fn core_loop(&self) -> Result<(), ServerError> {
        debug!("Starting the core loop...");
        info!("Waiting for requests...");

        loop {
            let (socket, permit) = match self.acquire_socket_permit().await {
                Ok(pair) => pair,
                Err(e) => {
                    log_and_stderr!(warn, "WARN:", e);
                    continue;
                }
            };

            let store = self.store.clone();

            // A new task is spawned for each inbound socket, so one slow client never blocks
            // another.
            tokio::spawn(async move {
                if let Err(e) = handle_connection(socket, store).await {
                    log_and_stderr!(warn, "WARN:", e);
                }
                drop(permit);
            });
        }
    }

    /// Tries to acquire a permit for a connection socket
    ///
    /// # Errors
    /// - [`ServerError::IoError`] in case a new incoming connection from this listener could not be accepted
    /// - [`ServerError::ElapsedError`] in case a permit could not be obtained on time
    /// - [`ServerError::AcquireError`] in case a permit could not be obtained because the semaphore has been closed
    async fn acquire_socket_permit(
        &self,
    ) -> Result<(TcpStream, OwnedSemaphorePermit), ServerError> {
        let permit = timeout(
            Duration::from_millis(CONNECTION_PERMIT_TIMEOUT_MS),
            self.max_conn.clone().acquire_owned(),
        )
        .await
        .map_err(|e| {
            ServerError::ElapsedError(format!("{e} ({CONNECTION_PERMIT_TIMEOUT_MS} ms)"))
        })??;
        let (socket, _) = self.listener.accept().await?;
        Ok((socket, permit))
    }
}
