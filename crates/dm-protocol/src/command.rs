//! Console commands issued by the client
//!
//! Only the two commands needed for routing are modelled:
//! - `dumpdmrouteinfo` - full routing table for every card
//! - `setavuroute <input> <output index>` - route audio and video of one
//!   input to one output

use std::fmt;

use crate::error::ConversionError;
use crate::{EncodeCommand, COMMAND_TERMINATOR};

/// Reply marker for an output index the switch does not know
pub const INVALID_OUTPUT_MARKER: &str = "Invalid Output";

/// Reply marker for an input the switch does not know
pub const INVALID_INPUT_MARKER: &str = "Invalid Input";

/// A console command understood by the switch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DmCommand {
    /// Dump routing information: `dumpdmrouteinfo`
    DumpRouteInfo,
    /// Route audio+video: `setavuroute 5 102`
    SetAvuRoute {
        /// Input identifier, passed through verbatim
        input: String,
        /// Set-route output index (see [`crate::offset`])
        output_index: i64,
    },
}

impl DmCommand {
    /// Build a `setavuroute` command
    ///
    /// The input is sent verbatim, so it must be a single non-empty word.
    pub fn set_avu_route(input: &str, output_index: i64) -> Result<Self, ConversionError> {
        if input.is_empty() || input.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(ConversionError::InvalidInputId {
                input: input.to_string(),
            });
        }

        Ok(DmCommand::SetAvuRoute {
            input: input.to_string(),
            output_index,
        })
    }

    /// Command keyword as typed on the console
    pub fn keyword(&self) -> &'static str {
        match self {
            DmCommand::DumpRouteInfo => "dumpdmrouteinfo",
            DmCommand::SetAvuRoute { .. } => "setavuroute",
        }
    }
}

impl fmt::Display for DmCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DmCommand::DumpRouteInfo => f.write_str(self.keyword()),
            DmCommand::SetAvuRoute {
                input,
                output_index,
            } => write!(f, "{} {} {}", self.keyword(), input, output_index),
        }
    }
}

impl EncodeCommand for DmCommand {
    fn encode(&self) -> Vec<u8> {
        let mut out = self.to_string().into_bytes();
        out.extend_from_slice(COMMAND_TERMINATOR);
        out
    }
}

/// Why the switch rejected a set-route request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValidationKind {
    /// The output index does not address an output card
    InvalidOutput,
    /// The input does not address an input card
    InvalidInput,
}

impl fmt::Display for ValidationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationKind::InvalidOutput => f.write_str("invalid output"),
            ValidationKind::InvalidInput => f.write_str("invalid input"),
        }
    }
}

/// Inspect a `setavuroute` reply for rejection markers
///
/// Anything that carries neither marker counts as an acknowledgment. When
/// both appear the output marker wins.
pub fn classify_set_route_reply(reply: &str) -> Result<(), ValidationKind> {
    if reply.contains(INVALID_OUTPUT_MARKER) {
        Err(ValidationKind::InvalidOutput)
    } else if reply.contains(INVALID_INPUT_MARKER) {
        Err(ValidationKind::InvalidInput)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_dump() {
        assert_eq!(DmCommand::DumpRouteInfo.encode(), b"dumpdmrouteinfo\r\n");
    }

    #[test]
    fn test_encode_set_route() {
        let cmd = DmCommand::SetAvuRoute {
            input: "5".into(),
            output_index: 102,
        };
        assert_eq!(cmd.encode(), b"setavuroute 5 102\r\n");
    }

    #[test]
    fn test_encode_negative_index() {
        let cmd = DmCommand::SetAvuRoute {
            input: "1".into(),
            output_index: -3,
        };
        assert_eq!(cmd.encode(), b"setavuroute 1 -3\r\n");
    }

    #[test]
    fn test_set_avu_route_rejects_multiple_words() {
        assert!(DmCommand::set_avu_route("5", 101).is_ok());
        assert!(matches!(
            DmCommand::set_avu_route("5\r\nreboot", 101),
            Err(ConversionError::InvalidInputId { .. })
        ));
        assert!(DmCommand::set_avu_route("5 6", 101).is_err());
        assert!(DmCommand::set_avu_route("", 101).is_err());
    }

    #[test]
    fn test_classify_ack() {
        assert_eq!(classify_set_route_reply("setavuroute 5 102"), Ok(()));
        assert_eq!(classify_set_route_reply(""), Ok(()));
    }

    #[test]
    fn test_classify_invalid_output() {
        assert_eq!(
            classify_set_route_reply("ERROR: Invalid Output"),
            Err(ValidationKind::InvalidOutput)
        );
    }

    #[test]
    fn test_classify_invalid_input() {
        assert_eq!(
            classify_set_route_reply("Invalid Input specified"),
            Err(ValidationKind::InvalidInput)
        );
    }

    #[test]
    fn test_classify_output_marker_wins() {
        assert_eq!(
            classify_set_route_reply("Invalid Input\r\nInvalid Output"),
            Err(ValidationKind::InvalidOutput)
        );
    }

    #[test]
    fn test_classify_is_case_sensitive() {
        assert_eq!(classify_set_route_reply("invalid output"), Ok(()));
    }
}
