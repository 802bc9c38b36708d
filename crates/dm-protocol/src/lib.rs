//! DigitalMedia Console Protocol Library
//!
//! This crate provides parsing and encoding for the text console exposed by
//! Crestron DigitalMedia matrix switches over telnet.
//!
//! # Format
//! - Commands: ASCII words separated by spaces, terminated by CR LF
//! - Responses: free-form text followed by the console prompt, which always
//!   ends with `>` (0x3E)
//!
//! # Architecture
//!
//! - [`command`] encodes the commands this client issues and classifies the
//!   set-route acknowledgment
//! - [`route_dump`] turns a `dumpdmrouteinfo` response into a [`RouteTable`]
//! - [`offset`] converts operator-facing output slots into set-route indices
//!
//! Nothing in this crate performs I/O.
//!
//! # Example
//!
//! ```rust
//! use dm_protocol::{parse_route_dump, to_device_index, SlotOffsetConfig};
//!
//! let dump = "DM Routing Information for all Output cards\n\
//!             Routing Information for Output Card at Slot 33\n\
//!             Video Routed From Input Card at slot 5\n\
//!             Audio Routed From Input Card at slot 5\n";
//!
//! let table = parse_route_dump(dump).unwrap();
//! assert_eq!(table.get("33"), Some("5"));
//!
//! let cfg = SlotOffsetConfig::new(33, 101);
//! assert_eq!(to_device_index("34", &cfg).unwrap(), 102);
//! ```

pub mod command;
pub mod error;
pub mod offset;
pub mod route_dump;

pub use command::{classify_set_route_reply, DmCommand, ValidationKind};
pub use error::{ConversionError, ParseError};
pub use offset::{to_device_index, SlotOffsetConfig};
pub use route_dump::{parse_route_dump, OutputRoute, RouteTable};

/// The byte that ends every console prompt (`>`)
pub const PROMPT_END: u8 = 0x3E;

/// Terminator appended to every command
pub const COMMAND_TERMINATOR: &[u8] = b"\r\n";

/// Trait for commands that can be encoded to bytes
pub trait EncodeCommand {
    /// Encode this command to its wire format, including the terminator
    fn encode(&self) -> Vec<u8>;
}
