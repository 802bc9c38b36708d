//! Prompt-delimited command exchange
//!
//! The console prints a prompt ending in `>` whenever it is ready for input.
//! One exchange is: write the command plus CR LF, then read until the next
//! `>`. Everything before that byte, trimmed, is the response.
//!
//! Functions here operate on an already-borrowed connection; pooling and
//! serialization live in [`crate::pool`].

use std::borrow::Cow;
use std::io;

use dm_protocol::{COMMAND_TERMINATOR, PROMPT_END};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, trace};

use crate::error::RouterError;

/// The text a switch printed in answer to one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse(Vec<u8>);

impl RawResponse {
    /// Build a response from the bytes preceding the prompt, trimming
    /// surrounding whitespace
    pub fn from_frame(frame: &[u8]) -> Self {
        Self(frame.trim_ascii().to_vec())
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Response decoded as text, replacing invalid UTF-8
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }

    /// Whether the switch printed nothing but the prompt
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Wait for the first prompt on a freshly opened connection
///
/// Failure here means the connection never became usable; it is reported as
/// [`RouterError::Handshake`] rather than as an exchange failure.
pub async fn handshake<S>(stream: &mut S, deadline: Instant) -> Result<(), RouterError>
where
    S: AsyncBufRead + Unpin,
{
    let banner = read_until_prompt(stream, deadline)
        .await
        .map_err(RouterError::Handshake)?;
    debug!("Console ready after {} banner bytes", banner.len());
    Ok(())
}

/// Send one command and read its response
///
/// The terminator is appended unless `command` already ends with it. Nothing
/// is written once `deadline` has passed.
pub async fn exchange<S>(
    stream: &mut S,
    command: &[u8],
    deadline: Instant,
) -> Result<RawResponse, RouterError>
where
    S: AsyncBufRead + AsyncWrite + Unpin,
{
    if Instant::now() >= deadline {
        return Err(timed_out("before writing command").into());
    }

    let mut wire = command.to_vec();
    if !wire.ends_with(COMMAND_TERMINATOR) {
        wire.extend_from_slice(COMMAND_TERMINATOR);
    }

    debug!("Sending command: {:?}", String::from_utf8_lossy(&wire).trim_end());

    timeout_at(deadline, async {
        stream.write_all(&wire).await?;
        stream.flush().await
    })
    .await
    .map_err(|_| timed_out("writing command"))?
    .map_err(|e| io::Error::new(e.kind(), format!("unable to write command: {}", e)))?;

    let frame = read_until_prompt(stream, deadline)
        .await
        .map_err(|e| io::Error::new(e.kind(), format!("unable to read response: {}", e)))?;

    let response = RawResponse::from_frame(&frame);
    trace!("Response ({} bytes): {:?}", response.as_bytes().len(), response.text());
    Ok(response)
}

/// Read up to and including the next prompt byte, returning what preceded it
async fn read_until_prompt<S>(stream: &mut S, deadline: Instant) -> io::Result<Vec<u8>>
where
    S: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    timeout_at(deadline, stream.read_until(PROMPT_END, &mut buf))
        .await
        .map_err(|_| timed_out("waiting for prompt"))??;

    if buf.pop() != Some(PROMPT_END) {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "connection closed before prompt",
        ));
    }
    Ok(buf)
}

fn timed_out(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::TimedOut, format!("timed out {}", what))
}
