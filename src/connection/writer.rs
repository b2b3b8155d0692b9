//! Outbound loop: rate-limited, delimiter-framed writes.

use super::context::LinkContext;
use crate::framing::frame_outbound;
use crate::port::{PortError, Transport};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

/// Write every string from `input`, spaced at least `interval` apart.
///
/// A string whose write fails is dropped, not retried.
pub(crate) async fn run(
    ctx: LinkContext,
    mut input: mpsc::Receiver<String>,
    interval: Duration,
    delimiter: String,
) {
    let name = ctx.transport.name().to_string();
    let mut last_send: Option<Instant> = None;
    debug!(transport = %name, ?interval, "writer started");

    loop {
        let payload = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => break,
            next = input.recv() => match next {
                Some(payload) => payload,
                None => {
                    debug!(transport = %name, "outbound queue closed");
                    break;
                }
            },
        };

        if let Some(last) = last_send {
            let elapsed = last.elapsed();
            if elapsed < interval {
                let wait = interval - elapsed;
                trace!(transport = %name, ?wait, "rate limiting write");
                tokio::select! {
                    biased;
                    _ = ctx.cancel.cancelled() => break,
                    _ = tokio::time::sleep(wait) => {}
                }
            }
        }

        let frame = frame_outbound(&payload, &delimiter);
        let written = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => break,
            written = write_all(ctx.transport.as_ref(), &frame) => written,
        };

        match written {
            Ok(()) => {
                trace!(transport = %name, line = %payload.trim_end(), "line sent");
                last_send = Some(Instant::now());
            }
            Err(err) => {
                warn!(transport = %name, error = %err, "write failed, dropping line");
                if !ctx.report_failure(err).await {
                    break;
                }
            }
        }
    }

    debug!(transport = %name, "writer stopped");
}

async fn write_all(transport: &dyn Transport, frame: &[u8]) -> Result<(), PortError> {
    let mut written = 0;
    while written < frame.len() {
        match transport.write(&frame[written..]).await? {
            0 => return Err(PortError::Io(std::io::ErrorKind::WriteZero.into())),
            n => written += n,
        }
    }
    Ok(())
}
