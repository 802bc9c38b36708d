//! Switch routing operations
//!
//! [`SwitchRouter`] lists the current routes and changes one output at a
//! time. It holds no mutable state of its own; concurrent callers are
//! serialized by the [`Gateway`].

use std::time::Duration;

use dm_protocol::{
    classify_set_route_reply, parse_route_dump, to_device_index, DmCommand, EncodeCommand,
    RouteTable, SlotOffsetConfig,
};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::config::RouterConfig;
use crate::error::RouterError;
use crate::pool::{ConnectionPool, Gateway, TcpConnector};

/// Default per-operation deadline
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Acknowledged route change
///
/// The switch acknowledges `setavuroute` before its relays move. A routing
/// dump only reflects the change once [`settled_at`](Self::settled_at) has
/// passed; callers that query right after a change should await
/// [`settled`](Self::settled) first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteChange {
    /// Output slot as given by the caller
    pub output_slot: String,
    /// Input now feeding the output
    pub input: String,
    /// `setavuroute` index the slot translated to
    pub device_index: i64,
    /// Earliest instant a dump is guaranteed to show the change
    pub settled_at: Instant,
}

impl RouteChange {
    /// Wait out the settle delay
    pub async fn settled(&self) {
        sleep_until(self.settled_at).await;
    }

    /// Whether the settle delay has passed
    pub fn is_settled(&self) -> bool {
        Instant::now() >= self.settled_at
    }
}

/// Queries and changes routes on one switch
pub struct SwitchRouter<G> {
    gateway: G,
    calibration: Option<SlotOffsetConfig>,
    command_timeout: Duration,
}

impl SwitchRouter<ConnectionPool<TcpConnector>> {
    /// Build a TCP router from configuration; nothing is dialed yet
    pub fn from_config(config: &RouterConfig) -> Self {
        let connector =
            TcpConnector::new(config.address()).with_connect_timeout(config.connect_timeout());
        let pool = ConnectionPool::new(connector, config.pool_options());
        Self::new(pool, config.calibration).with_command_timeout(config.command_timeout())
    }
}

impl<G: Gateway> SwitchRouter<G> {
    /// Create a router; `None` calibration gives an inspection-only router
    pub fn new(gateway: G, calibration: Option<SlotOffsetConfig>) -> Self {
        Self {
            gateway,
            calibration,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    /// Override the deadline used by the operations that take none
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Underlying gateway
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Whether [`set_route`](Self::set_route) is available
    pub fn is_calibrated(&self) -> bool {
        self.calibration.is_some()
    }

    /// Wait required after a route change before a query reflects it
    pub fn settle_delay(&self) -> Duration {
        self.gateway.settle_delay()
    }

    /// Translate an output slot into its `setavuroute` index
    pub fn device_index(&self, output_slot: &str) -> Result<i64, RouterError> {
        let cfg = self.calibration.as_ref().ok_or(RouterError::NotCalibrated)?;
        Ok(to_device_index(output_slot, cfg)?)
    }

    /// Current routing, using the default deadline
    pub async fn query_routes(&self) -> Result<RouteTable, RouterError> {
        self.query_routes_by(Instant::now() + self.command_timeout)
            .await
    }

    /// Current routing
    ///
    /// A dump that breaks off mid-way yields [`RouterError::Parse`] carrying
    /// the routes read before the break.
    pub async fn query_routes_by(&self, deadline: Instant) -> Result<RouteTable, RouterError> {
        let cmd = DmCommand::DumpRouteInfo;
        let resp = self.gateway.exchange(&cmd.encode(), deadline).await?;

        match parse_route_dump(&resp.text()) {
            Ok(table) => {
                debug!("Switch reports {} outputs", table.len());
                Ok(table)
            }
            Err(e) => {
                warn!("Unable to parse route dump: {}", e);
                Err(e.into())
            }
        }
    }

    /// Route `input` to `output_slot`, using the default deadline
    pub async fn set_route(&self, output_slot: &str, input: &str) -> Result<RouteChange, RouterError> {
        self.set_route_by(output_slot, input, Instant::now() + self.command_timeout)
            .await
    }

    /// Route `input` to `output_slot`
    ///
    /// The reply is checked for the switch's rejection markers; the device
    /// is never assumed to have changed on a failure.
    pub async fn set_route_by(
        &self,
        output_slot: &str,
        input: &str,
        deadline: Instant,
    ) -> Result<RouteChange, RouterError> {
        let device_index = self.device_index(output_slot)?;
        let cmd = DmCommand::set_avu_route(input, device_index)?;

        info!(
            "Routing input {} to output {} (index {})",
            input, output_slot, device_index
        );

        let resp = self.gateway.exchange(&cmd.encode(), deadline).await?;
        if let Err(kind) = classify_set_route_reply(&resp.text()) {
            warn!("Switch rejected {}: {}", cmd, kind);
            return Err(kind.into());
        }

        Ok(RouteChange {
            output_slot: output_slot.to_string(),
            input: input.to_string(),
            device_index,
            settled_at: Instant::now() + self.gateway.settle_delay(),
        })
    }
}
