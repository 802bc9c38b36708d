//! Connection gateway
//!
//! The router never touches sockets directly. It hands a command to a
//! [`Gateway`], which borrows a console connection, runs exactly one
//! exchange on it, and returns it.
//!
//! [`ConnectionPool`] is the stock gateway. It keeps a single connection to
//! the switch and:
//! - waits for the console prompt before using a newly dialed connection
//! - serializes exchanges so two commands never interleave on the wire
//! - spaces consecutive commands at least `delay` apart
//! - redials once a connection has been idle for `ttl`
//! - drops the connection after any failed exchange, redialing once if a
//!   reused connection turned out to be dead

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::channel::{self, RawResponse};
use crate::error::RouterError;

/// Default time a connection stays open after its last use
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Default minimum spacing between commands
pub const DEFAULT_DELAY: Duration = Duration::from_millis(500);

/// Default TCP connect timeout
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Borrow a connection, run one exchange, return it
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Send `command` and return everything printed before the next prompt
    async fn exchange(&self, command: &[u8], deadline: Instant) -> Result<RawResponse, RouterError>;

    /// How long a route change needs before a dump reflects it
    fn settle_delay(&self) -> Duration;
}

/// Opens fresh byte streams to a switch console
#[async_trait]
pub trait Connector: Send + Sync {
    /// Stream type produced by [`connect`](Connector::connect)
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    /// Dial the switch
    async fn connect(&self, deadline: Instant) -> io::Result<Self::Stream>;

    /// Label used in log messages
    fn peer(&self) -> &str;
}

/// Dials a switch console over TCP
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: String,
    connect_timeout: Duration,
}

impl TcpConnector {
    /// Create a connector for a `host:port` address
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Override the connect timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

#[async_trait]
impl Connector for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&self, deadline: Instant) -> io::Result<TcpStream> {
        let deadline = deadline.min(Instant::now() + self.connect_timeout);
        debug!("Connecting to {}", self.addr);

        let stream = timeout_at(deadline, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| {
                io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("timed out connecting to {}", self.addr),
                )
            })??;

        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY on {}: {}", self.addr, e);
        }

        Ok(stream)
    }

    fn peer(&self) -> &str {
        &self.addr
    }
}

/// Pool timing options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolOptions {
    /// Idle time after which the connection is closed and redialed
    pub ttl: Duration,
    /// Minimum spacing between consecutive commands
    pub delay: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            delay: DEFAULT_DELAY,
        }
    }
}

struct Slot<S> {
    conn: Option<BufReader<S>>,
    last_used: Option<Instant>,
}

/// Single-connection gateway with serialized reuse
pub struct ConnectionPool<C: Connector> {
    connector: C,
    options: PoolOptions,
    slot: Mutex<Slot<C::Stream>>,
}

impl<C: Connector> ConnectionPool<C> {
    /// Create a pool; nothing is dialed until the first exchange
    pub fn new(connector: C, options: PoolOptions) -> Self {
        Self {
            connector,
            options,
            slot: Mutex::new(Slot {
                conn: None,
                last_used: None,
            }),
        }
    }

    /// Connector used for dialing
    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Pool timing options
    pub fn options(&self) -> PoolOptions {
        self.options
    }

    /// Whether a live connection is currently held
    pub async fn is_connected(&self) -> bool {
        self.slot.lock().await.conn.is_some()
    }

    /// Close the held connection, if any
    pub async fn close(&self) {
        let mut slot = self.slot.lock().await;
        if let Some(mut conn) = slot.conn.take() {
            if let Err(e) = conn.get_mut().shutdown().await {
                debug!("Shutdown of {} failed: {}", self.connector.peer(), e);
            }
            info!("Closed connection to {}", self.connector.peer());
        }
    }

    async fn dial(&self, deadline: Instant) -> Result<BufReader<C::Stream>, RouterError> {
        let stream = self.connector.connect(deadline).await?;
        let mut conn = BufReader::new(stream);
        channel::handshake(&mut conn, deadline).await?;
        info!("Connected to {}", self.connector.peer());
        Ok(conn)
    }

    async fn run(
        &self,
        slot: &mut Slot<C::Stream>,
        command: &[u8],
        deadline: Instant,
    ) -> Result<RawResponse, RouterError> {
        let mut conn = match slot.conn.take() {
            Some(conn) => conn,
            None => self.dial(deadline).await?,
        };

        let result = channel::exchange(&mut conn, command, deadline).await;
        slot.last_used = Some(Instant::now());
        // a failed exchange leaves the console in an unknown state
        if result.is_ok() {
            slot.conn = Some(conn);
        }
        result
    }
}

#[async_trait]
impl<C: Connector> Gateway for ConnectionPool<C> {
    async fn exchange(&self, command: &[u8], deadline: Instant) -> Result<RawResponse, RouterError> {
        let mut slot = timeout_at(deadline, self.slot.lock())
            .await
            .map_err(|_| {
                io::Error::new(io::ErrorKind::TimedOut, "timed out waiting for connection")
            })?;

        if let Some(last) = slot.last_used {
            if slot.conn.is_some() && last.elapsed() >= self.options.ttl {
                debug!("Connection to {} idle past TTL, redialing", self.connector.peer());
                slot.conn = None;
            }
            sleep_until((last + self.options.delay).min(deadline)).await;
        }

        // the switch must never see a command its caller has given up on
        if Instant::now() >= deadline {
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "deadline passed before command could be sent",
            )
            .into());
        }

        let reused = slot.conn.is_some();
        match self.run(&mut slot, command, deadline).await {
            Err(e) if reused && e.is_connection_lost() => {
                warn!(
                    "Connection to {} lost ({}), redialing once",
                    self.connector.peer(),
                    e
                );
                self.run(&mut slot, command, deadline).await
            }
            result => result,
        }
    }

    fn settle_delay(&self) -> Duration {
        self.options.delay * 2
    }
}
