//! Connection to a Kismet server

pub mod client;
pub mod driver;

pub use client::{KismetClient, PollEvent};
pub use driver::{Connection, LineBuffer, MAX_LINE_LEN};
