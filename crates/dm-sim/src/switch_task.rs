//! Virtual switch console task
//!
//! Serves one console session for a shared [`VirtualSwitch`] over an async
//! stream. The session prints a banner and the `NAME>` prompt, then answers
//! each CRLF-terminated line followed by a fresh prompt. Several sessions may
//! share one switch, as when a client redials.

use std::io;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::VirtualSwitch;

/// Switch state shared between console sessions
pub type SharedSwitch = Arc<Mutex<VirtualSwitch>>;

/// Commands that can be sent to a console session
#[derive(Debug, Clone)]
pub enum VirtualSwitchCommand {
    /// Hang up the session
    Shutdown,
}

/// Run one console session until the peer disconnects or a shutdown arrives
pub async fn run_virtual_switch_task<S>(
    stream: S,
    switch: SharedSwitch,
    mut cmd_rx: mpsc::Receiver<VirtualSwitchCommand>,
) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (name, greeting) = {
        let sw = switch.lock().await;
        (sw.name().to_string(), format!("{}{}", sw.banner(), sw.prompt()))
    };
    let prompt = format!("{}>", name);

    info!("Starting virtual switch session for {}", name);

    let mut lines = BufReader::new(stream).lines();
    let writer = lines.get_mut();
    writer.write_all(greeting.as_bytes()).await?;
    writer.flush().await?;

    loop {
        tokio::select! {
            result = lines.next_line() => {
                match result {
                    Ok(Some(line)) => {
                        let reply = switch.lock().await.process_line(line.trim());
                        debug!("Virtual switch {} replying {} bytes", name, reply.len());

                        let frame = format!("\r\n{}\r\n{}", reply, prompt);
                        let writer = lines.get_mut();
                        writer.write_all(frame.as_bytes()).await?;
                        writer.flush().await?;
                    }
                    Ok(None) => {
                        debug!("Virtual switch stream closed for {}", name);
                        break;
                    }
                    Err(e) => {
                        warn!("Virtual switch {} stream error: {}", name, e);
                        return Err(e);
                    }
                }
            }

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(VirtualSwitchCommand::Shutdown) => {
                        info!("Shutdown requested for virtual switch session {}", name);
                        break;
                    }
                    None => {
                        debug!("Command channel closed for virtual switch {}", name);
                        break;
                    }
                }
            }
        }
    }

    info!("Virtual switch session ended for {}", name);
    Ok(())
}
