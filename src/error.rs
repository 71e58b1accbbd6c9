use thiserror::Error;

pub use color_eyre::eyre::eyre;

use crate::protocol::response::{ErrPayload, ErrPayloadBytes};

#[derive(Debug, Error)]
pub enum Error {
    #[error("Server Error: {0}")]
    ServerError(#[from] ErrPayload),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Bad config error: {0}")]
    BadConfigError(String),

    #[error("Bad usage error: {0}")]
    BadUsageError(String),

    #[error("Invalid packet")]
    InvalidPacket,

    #[error("Unexpected end of packet")]
    UnexpectedEof,

    #[error("Connection is broken by an earlier protocol error")]
    ConnectionBroken,

    #[error("Unsupported authentication plugin: {0}")]
    UnsupportedAuthPlugin(String),

    #[error("Library bug: {0}")]
    LibraryBug(color_eyre::Report),
}

impl Error {
    /// Wrap a non-`Error` failure (e.g. zerocopy cast errors) as a library bug
    pub fn from_debug(err: impl std::fmt::Debug) -> Self {
        Self::LibraryBug(eyre!("{:?}", err))
    }
}

impl<'a> From<ErrPayloadBytes<'a>> for Error {
    fn from(value: ErrPayloadBytes<'a>) -> Self {
        match ErrPayload::try_from(value) {
            Ok(err_payload) => Error::ServerError(err_payload),
            Err(err) => err,
        }
    }
}

impl From<std::convert::Infallible> for Error {
    fn from(err: std::convert::Infallible) -> Self {
        match err {}
    }
}

pub type Result<T> = std::result::Result<T, Error>;
