//! Inbound loop: byte-at-a-time reads into the line framer.

use super::context::LinkContext;
use crate::framing::LineFramer;
use crate::message::Message;
use tracing::{debug, trace, warn};

/// Read until shutdown, emitting one message per completed line.
///
/// A failed read is reported and the loop immediately reads again; those reads
/// keep failing until the reconnect loop has re-established the link.
pub(crate) async fn run(ctx: LinkContext, mut framer: LineFramer) {
    let name = ctx.transport.name().to_string();
    let mut byte = [0u8; 1];
    debug!(transport = %name, "reader started");

    loop {
        let read = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => break,
            read = ctx.transport.read(&mut byte) => read,
        };

        match read {
            Ok(0) => continue,
            Ok(_) => {
                if let Some(line) = framer.push(byte[0]) {
                    trace!(transport = %name, %line, "line received");
                    if !ctx.emit(Message::Data(line)).await {
                        break;
                    }
                }
            }
            Err(err) => {
                warn!(transport = %name, error = %err, "read failed");
                if !ctx.report_failure(err).await {
                    break;
                }
            }
        }
    }

    debug!(transport = %name, "reader stopped");
}
