//! Polling client
//!
//! Glues the socket driver, the dispatcher and the state store together.
//! The caller drives it from its own loop by calling [`KismetClient::poll`];
//! nothing here blocks, sleeps or spawns threads.

use tracing::{debug, info};

use super::driver::Connection;
use crate::error::{ClientError, Result};
use crate::protocol::dispatch::DispatchStats;
use crate::protocol::{Dispatcher, Outcome};
use crate::state::{StateStore, StoreLimits};
use crate::types::{MacAddr, Network};

/// Non-fatal result of one poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollEvent {
    /// Nothing new this tick
    Idle,
    /// A record was applied to the store
    Applied,
    /// A status line arrived; consume it before the next poll clears it
    StatusChanged,
}

impl PollEvent {
    pub fn code(&self) -> i32 {
        match self {
            PollEvent::Idle => Outcome::Noop.code(),
            PollEvent::Applied => Outcome::Applied.code(),
            PollEvent::StatusChanged => Outcome::StatusChanged.code(),
        }
    }
}

pub struct KismetClient {
    conn: Connection,
    dispatcher: Dispatcher,
    store: StateStore,
}

impl KismetClient {
    pub fn connect(host: &str, port: u16, limits: StoreLimits) -> Result<Self> {
        let conn = Connection::connect(host, port)?;
        Ok(Self {
            conn,
            dispatcher: Dispatcher::new(),
            store: StateStore::new(limits),
        })
    }

    /// Advance the session by at most one line.
    ///
    /// Every `Err` means the connection is gone and this client must be
    /// discarded.
    pub fn poll(&mut self) -> Result<PollEvent> {
        self.conn.ensure_valid()?;
        self.store.clear_status();

        let Some(line) = self.conn.poll_line()? else {
            return Ok(PollEvent::Idle);
        };
        if line.len() < 2 {
            return Ok(PollEvent::Idle);
        }

        match self.dispatcher.dispatch(&line, &mut self.store) {
            Outcome::Noop => Ok(PollEvent::Idle),
            Outcome::Applied => Ok(PollEvent::Applied),
            Outcome::StatusChanged => {
                debug!(status = %self.store.status(), "status update");
                Ok(PollEvent::StatusChanged)
            }
            Outcome::Fatal => {
                info!("Server at {}:{} terminated the session", self.conn.hostname(), self.conn.port());
                Err(self.conn.invalidate(ClientError::Terminated))
            }
        }
    }

    /// Queue raw bytes; they are written by later polls
    pub fn send(&mut self, data: impl AsRef<[u8]>) -> Result<()> {
        self.conn.send(data.as_ref())
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn dispatch_stats(&self) -> &DispatchStats {
        self.dispatcher.stats()
    }

    pub fn is_valid(&self) -> bool {
        self.conn.is_valid()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.conn.last_error()
    }

    /// Delete a network immediately
    pub fn remove_network(&mut self, bssid: &MacAddr) -> Option<Network> {
        self.store.remove_network(bssid)
    }

    /// Delete networks the server flagged for removal
    pub fn reap_removed(&mut self) -> Vec<Network> {
        self.store.reap_removed()
    }

    pub fn close(&mut self) {
        self.conn.close();
    }
}

impl std::fmt::Debug for KismetClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KismetClient")
            .field("host", &self.conn.hostname())
            .field("port", &self.conn.port())
            .field("valid", &self.conn.is_valid())
            .field("networks", &self.store.network_count())
            .finish()
    }
}
