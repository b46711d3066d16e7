//! Client for the Kismet line-oriented telemetry protocol.
//!
//! [`KismetClient`] owns a non-blocking TCP connection to a Kismet server,
//! decodes each `*HEADER: payload` line into a typed record and keeps the
//! resulting view of the server's state in a [`StateStore`]. The caller
//! drives everything by calling [`KismetClient::poll`] from its own loop.

pub mod config;
pub mod connection;
pub mod error;
pub mod protocol;
pub mod state;
pub mod types;

pub use config::Config;
pub use connection::{Connection, KismetClient, PollEvent};
pub use error::ClientError;
pub use protocol::{Dispatcher, Outcome, ParseError, Record};
pub use state::{StateStore, StoreLimits, NO_CHANNEL_DATA};
pub use types::{MacAddr, Network};
