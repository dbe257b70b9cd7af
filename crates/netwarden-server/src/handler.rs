//! Per-connection protocol loop.
//!
//! Generic over the stream type so plain TCP, TLS, and in-memory test
//! duplexes all share one code path. Timeouts are tolerated up to a
//! budget; everything else closes the connection.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::time::timeout;
use uuid::Uuid;

use netwarden_core::command::{parse_line, CommandKind, ParseOutcome};
use netwarden_core::response::Response;

use crate::commands;
use crate::context::ServerContext;

/// Keepalive probe line sent after repeated idle timeouts.
const KEEPALIVE: &[u8] = b"PING\n";

fn welcome() -> String {
    format!("NetWarden {} ready\n", env!("CARGO_PKG_VERSION"))
}

/// Serve one client connection until QUIT, EOF, I/O error, or an
/// exhausted idle-timeout budget.
///
/// The first idle timeout is tolerated silently; each later one sends a
/// bare `PING` line so half-dead clients get a nudge; receiving any line
/// resets the budget.
pub async fn serve_connection<S>(
    stream: S,
    context: Arc<ServerContext>,
    peer: String,
) -> std::io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let connection_id = Uuid::new_v4();
    let started = Instant::now();
    let read_timeout = Duration::from_millis(context.config.server.read_timeout_ms);
    let max_retries = context.config.server.max_timeout_retries;

    let (read_half, mut write_half) = tokio::io::split(stream);
    let mut reader = BufReader::new(read_half);

    let mut commands_processed = 0u64;
    let mut bytes_in = 0u64;
    let mut bytes_out = 0u64;

    let greeting = welcome();
    write_half.write_all(greeting.as_bytes()).await?;
    bytes_out += greeting.len() as u64;

    let mut retries = 0u32;
    let mut line = String::new();

    let reason = loop {
        line.clear();
        match timeout(read_timeout, reader.read_line(&mut line)).await {
            Ok(Ok(0)) => break "client disconnected",
            Ok(Ok(n)) => {
                bytes_in += n as u64;
                retries = 0;

                let (response, quit) = match parse_line(line.trim()) {
                    ParseOutcome::Empty => continue,
                    ParseOutcome::Unknown(keyword) => (Response::invalid_command(keyword), false),
                    ParseOutcome::BadArity(spec, got) => {
                        (Response::error(spec.arity_error(got)), false)
                    }
                    ParseOutcome::Ok(spec, args) => (
                        commands::dispatch(&context, spec.kind, &args),
                        spec.kind == CommandKind::Quit,
                    ),
                };

                commands_processed += 1;
                context.command_executed();

                let wire = response.to_wire();
                write_half.write_all(wire.as_bytes()).await?;
                bytes_out += wire.len() as u64;

                if quit {
                    break "quit";
                }
            }
            Ok(Err(err)) => return Err(err),
            Err(_) => {
                retries += 1;
                if retries >= max_retries {
                    tracing::warn!(
                        connection_id = %connection_id,
                        peer = %peer,
                        retries,
                        "Idle timeout budget exhausted, closing"
                    );
                    break "idle timeout";
                }
                if retries == 1 {
                    tracing::debug!(connection_id = %connection_id, peer = %peer, "Idle timeout");
                } else {
                    write_half.write_all(KEEPALIVE).await?;
                    bytes_out += KEEPALIVE.len() as u64;
                    tracing::debug!(
                        connection_id = %connection_id,
                        peer = %peer,
                        retries,
                        "Idle timeout, keepalive sent"
                    );
                }
            }
        }
    };

    tracing::info!(
        connection_id = %connection_id,
        peer = %peer,
        reason,
        commands = commands_processed,
        bytes_in,
        bytes_out,
        duration_ms = started.elapsed().as_millis() as u64,
        "Connection closed"
    );

    Ok(())
}
