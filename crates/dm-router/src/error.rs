//! Error types for the routing client

use std::io;

use dm_protocol::{ConversionError, ParseError, RouteTable, ValidationKind};
use thiserror::Error;

/// Errors that can occur while talking to a switch
#[derive(Debug, Error)]
pub enum RouterError {
    /// Socket, write, read, or deadline failure
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A new connection never showed the console prompt
    #[error("unable to read new connection prompt: {0}")]
    Handshake(#[source] io::Error),

    /// The switch answered with nothing
    #[error("empty response")]
    EmptyResponse,

    /// The routing dump did not follow the expected grammar
    #[error("unexpected line: {line}")]
    Parse {
        /// The offending line
        line: String,
        /// Routes resolved before the offending line
        partial: RouteTable,
    },

    /// The output slot could not be turned into a set-route index
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// The switch rejected a set-route request
    #[error("{0}")]
    Validation(ValidationKind),

    /// Set-route requested on a router without slot calibration
    #[error("switch is not calibrated; set-route is unavailable")]
    NotCalibrated,
}

impl RouterError {
    /// Routes salvaged from a failed dump parse
    pub fn partial_routes(&self) -> Option<&RouteTable> {
        match self {
            RouterError::Parse { partial, .. } => Some(partial),
            _ => None,
        }
    }

    /// Whether the peer went away underneath the exchange
    pub fn is_connection_lost(&self) -> bool {
        match self {
            RouterError::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::NotConnected
            ),
            _ => false,
        }
    }

    /// Whether the exchange ran past its deadline
    pub fn is_timeout(&self) -> bool {
        matches!(self, RouterError::Io(e) | RouterError::Handshake(e) if e.kind() == io::ErrorKind::TimedOut)
    }
}

impl From<ParseError> for RouterError {
    fn from(e: ParseError) -> Self {
        match e {
            ParseError::Empty => RouterError::EmptyResponse,
            ParseError::UnexpectedLine { line, partial } => RouterError::Parse { line, partial },
        }
    }
}

impl From<ValidationKind> for RouterError {
    fn from(kind: ValidationKind) -> Self {
        RouterError::Validation(kind)
    }
}
