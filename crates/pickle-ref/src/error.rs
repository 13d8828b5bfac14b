//! Encoder errors.

use std::io;

/// Errors raised while encoding a value graph.
#[derive(Debug, thiserror::Error)]
pub enum PickleError {
    /// The requested protocol is above [`crate::HIGHEST_PROTOCOL`].
    #[error("unsupported pickle protocol {0}")]
    UnsupportedProtocol(u8),

    /// A node referenced an id that was never allocated in its graph.
    #[error("node #{0} does not exist in this graph")]
    DanglingNode(usize),

    /// An arbitrary-precision integer literal is not a decimal number.
    #[error("invalid integer literal {0:?}")]
    InvalidInteger(String),

    /// A decimal literal is not a finite decimal number.
    #[error("invalid decimal literal {0:?}")]
    InvalidDecimal(String),

    /// A time delta does not fit in a microsecond count.
    #[error("timedelta out of range")]
    TimeDeltaOutOfRange,

    #[error(transparent)]
    Io(#[from] io::Error),
}
