use thiserror::Error;

/// Connection failures
///
/// Resolution through `Connect` are raised only while establishing a
/// connection. Everything else comes out of `poll`/`send` and means the
/// connection is dead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("could not resolve host \"{host}\": {reason}")]
    Resolution { host: String, reason: String },

    #[error("socket() failed: {0}")]
    Socket(String),

    #[error("bind() failed: {0}")]
    Bind(String),

    #[error("connect() failed: {0}")]
    Connect(String),

    #[error("operation on an inactive connection")]
    NotConnected,

    #[error("read error: {0}")]
    Read(String),

    #[error("write error: {0}")]
    Write(String),

    #[error("server closed the connection")]
    EndOfStream,

    #[error("exceptional condition on socket: {0}")]
    ExceptionalCondition(String),

    #[error("server has terminated")]
    Terminated,
}

impl ClientError {
    /// Raised while establishing the connection
    pub fn is_connect_error(&self) -> bool {
        matches!(
            self,
            ClientError::Resolution { .. }
                | ClientError::Socket(_)
                | ClientError::Bind(_)
                | ClientError::Connect(_)
        )
    }

    /// The connection this came from can no longer be used
    pub fn is_fatal(&self) -> bool {
        !self.is_connect_error()
    }

    /// Shutdown initiated by the server side
    pub fn is_terminal(&self) -> bool {
        matches!(self, ClientError::EndOfStream | ClientError::Terminated)
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
