//! Kismet wire protocol
//!
//! Lines have the form `*HEADER: payload`. Payload fields are positional and
//! space separated; free text is bracketed by `\x01` and a leading `\x02`
//! inside the brackets marks the value as absent.

pub mod dispatch;
pub mod parser;
pub mod scanner;

pub use dispatch::{Dispatcher, Outcome};
pub use parser::{decode, Record};
pub use scanner::Scanner;

use thiserror::Error;

/// Longest header token accepted before the `:`
pub const MAX_HEADER_LEN: usize = 64;

/// Delimiter around free-text fields
pub const FIELD_DELIM: char = '\x01';

/// First byte of a delimited field the server left empty
pub const FIELD_ABSENT: char = '\x02';

/// Why a record was rejected
///
/// These never leave the dispatcher: a rejected record is logged and
/// treated as a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("{header}: scanned {scanned} fields, need {required}")]
    TooFewFields {
        header: &'static str,
        scanned: usize,
        required: usize,
    },

    #[error("invalid hardware address: {0:?}")]
    InvalidMac(String),

    #[error("{header}: field exceeds its length bound")]
    FieldTooLong { header: &'static str },

    #[error("missing header separator")]
    MissingHeader,
}
