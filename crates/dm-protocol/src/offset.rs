//! Output slot to set-route index translation
//!
//! `dumpdmrouteinfo` reports output cards by slot number (for example 33, 34,
//! ...), but `setavuroute` addresses outputs by an unrelated internal index
//! (for example 101, 102, ...). The two schemes differ by a fixed per-device
//! offset that has to be read off the device once (`cards` on the console)
//! and supplied as a [`SlotOffsetConfig`].

use crate::error::ConversionError;

/// Calibration pair relating dump slot numbers to set-route indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SlotOffsetConfig {
    /// Slot number of the first output card as reported by `dumpdmrouteinfo`
    pub output_slot_start: i64,
    /// `setavuroute` index that addresses the card at `output_slot_start`
    pub set_route_output_start: i64,
}

impl SlotOffsetConfig {
    /// Create a calibration pair
    pub fn new(output_slot_start: i64, set_route_output_start: i64) -> Self {
        Self {
            output_slot_start,
            set_route_output_start,
        }
    }
}

/// Convert an output slot identifier into the device's set-route index
///
/// The slot must be a plain base-10 integer; surrounding whitespace is
/// rejected along with everything else that `i64::from_str` rejects.
pub fn to_device_index(output_slot: &str, cfg: &SlotOffsetConfig) -> Result<i64, ConversionError> {
    let slot: i64 = output_slot
        .parse()
        .map_err(|source| ConversionError::NotANumber {
            slot: output_slot.to_string(),
            source,
        })?;

    slot.checked_sub(cfg.output_slot_start)
        .and_then(|n| n.checked_add(cfg.set_route_output_start))
        .ok_or_else(|| ConversionError::OutOfRange {
            slot: output_slot.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> SlotOffsetConfig {
        SlotOffsetConfig::new(33, 101)
    }

    #[test]
    fn test_first_output_maps_to_route_start() {
        assert_eq!(to_device_index("33", &cfg()).unwrap(), 101);
    }

    #[test]
    fn test_offset_applied() {
        assert_eq!(to_device_index("34", &cfg()).unwrap(), 102);
        assert_eq!(to_device_index("40", &cfg()).unwrap(), 108);
    }

    #[test]
    fn test_slot_below_start_goes_below_route_start() {
        assert_eq!(to_device_index("1", &cfg()).unwrap(), 69);
    }

    #[test]
    fn test_non_numeric_slot() {
        let err = to_device_index("abc", &cfg()).unwrap_err();
        assert!(matches!(err, ConversionError::NotANumber { ref slot, .. } if slot == "abc"));
        assert!(err.to_string().contains("abc"));
    }

    #[test]
    fn test_whitespace_rejected() {
        assert!(to_device_index(" 34", &cfg()).is_err());
        assert!(to_device_index("", &cfg()).is_err());
    }

    #[test]
    fn test_overflow_is_conversion_error() {
        let cfg = SlotOffsetConfig::new(-1, i64::MAX);
        let err = to_device_index("1", &cfg).unwrap_err();
        assert!(matches!(err, ConversionError::OutOfRange { .. }));
    }
}
