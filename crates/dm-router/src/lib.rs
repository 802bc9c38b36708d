//! DigitalMedia Switch Routing Client
//!
//! This crate drives the telnet console of a Crestron DigitalMedia matrix
//! switch to list and change output routes.
//!
//! # Architecture
//!
//! - [`channel`] writes one command and reads the reply up to the `>` prompt
//! - [`pool`] owns the console connection behind the [`Gateway`] seam:
//!   dialing, prompt handshake, serialized reuse, command spacing, idle TTL
//! - [`router`] composes the two with the parsers from `dm-protocol`
//!
//! A router built without a [`SlotOffsetConfig`] is inspection-only: it can
//! list routes but refuses to change them.
//!
//! # Example
//!
//! ```rust,no_run
//! use dm_router::{RouterConfig, SwitchRouter};
//! use dm_protocol::SlotOffsetConfig;
//!
//! # async fn example() -> Result<(), dm_router::RouterError> {
//! let mut config = RouterConfig::for_host("10.66.76.171");
//! config.calibration = Some(SlotOffsetConfig::new(33, 101));
//!
//! let router = SwitchRouter::from_config(&config);
//! let change = router.set_route("33", "1").await?;
//! change.settled().await;
//!
//! let routes = router.query_routes().await?;
//! assert_eq!(routes.get("33"), Some("1"));
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod config;
pub mod error;
pub mod pool;
pub mod router;

pub use channel::RawResponse;
pub use config::RouterConfig;
pub use error::RouterError;
pub use pool::{ConnectionPool, Connector, Gateway, PoolOptions, TcpConnector};
pub use router::{RouteChange, SwitchRouter};

pub use dm_protocol::{OutputRoute, RouteTable, SlotOffsetConfig, ValidationKind};
