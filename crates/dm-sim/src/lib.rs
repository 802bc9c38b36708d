//! DigitalMedia Switch Simulation Library
//!
//! A stand-in for a Crestron DigitalMedia matrix switch, for testing the
//! routing client without hardware. It includes:
//!
//! - **VirtualSwitch**: routing state plus protocol-accurate console replies
//! - **run_virtual_switch_task**: serves the console over any async stream
//!
//! # Example
//!
//! ```rust
//! use dm_sim::VirtualSwitch;
//!
//! let mut switch = VirtualSwitch::new();
//! assert_eq!(switch.process_line("setavuroute 5 102"), "");
//! assert_eq!(switch.route(34), Some((Some(5), Some(5))));
//! ```

pub mod error;
pub mod switch;
pub mod switch_task;

pub use error::SimError;
pub use switch::{VirtualSwitch, VirtualSwitchConfig};
pub use switch_task::{run_virtual_switch_task, SharedSwitch, VirtualSwitchCommand};
