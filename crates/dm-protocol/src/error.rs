//! Error types for console response parsing and slot conversion

use std::num::ParseIntError;

use thiserror::Error;

use crate::route_dump::RouteTable;

/// Errors that can occur while parsing a routing dump
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The device returned no lines at all
    #[error("empty response")]
    Empty,

    /// A line matched none of the known section prefixes
    ///
    /// `partial` holds every output resolved before the offending line.
    #[error("unexpected line: {line}")]
    UnexpectedLine { line: String, partial: RouteTable },
}

impl ParseError {
    /// Routes resolved before parsing failed, if any were kept
    pub fn partial(&self) -> Option<&RouteTable> {
        match self {
            ParseError::Empty => None,
            ParseError::UnexpectedLine { partial, .. } => Some(partial),
        }
    }
}

/// Errors converting an output slot into a set-route device index
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConversionError {
    /// The slot identifier is not a base-10 integer
    #[error("unable to convert output {slot:?} to number: {source}")]
    NotANumber {
        slot: String,
        #[source]
        source: ParseIntError,
    },

    /// The offset arithmetic overflowed
    #[error("output {slot:?} is out of range for the configured offsets")]
    OutOfRange { slot: String },

    /// The input identifier would not survive as a single command argument
    #[error("input {input:?} is not a single console argument")]
    InvalidInputId { input: String },
}
