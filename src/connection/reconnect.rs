//! The single place that re-opens the transport after a failure.
//!
//! Requests arrive one at a time because each carries the gate permit. A
//! request observed before the last completed reconnection is stale: the
//! failure it describes was already repaired, so it is dropped unprocessed.

use super::context::{LinkContext, ReconnectRequest};
use crate::message::Message;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Fixed delay between failed reopen attempts.
pub const RECONNECT_INTERVAL: Duration = Duration::from_millis(100);

pub(crate) async fn run(
    ctx: LinkContext,
    mut requests: mpsc::Receiver<ReconnectRequest>,
    retry_interval: Duration,
) {
    let name = ctx.transport.name().to_string();
    let mut last_reconnect: Option<Instant> = None;
    debug!(transport = %name, "reconnect loop started");

    loop {
        let request = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => break,
            request = requests.recv() => match request {
                Some(request) => request,
                None => break,
            },
        };

        if last_reconnect.is_some_and(|done| request.observed_at < done) {
            debug!(transport = %name, "stale reconnect request, skipping");
            continue;
        }

        info!(transport = %name, "link failed, reconnecting");
        if let Err(err) = ctx.transport.close().await {
            debug!(transport = %name, error = %err, "close before reopen failed");
        }

        let Some(attempts) = reopen_until_success(&ctx, &name, retry_interval).await else {
            debug!(transport = %name, "shutdown during reconnect, abandoning");
            break;
        };

        last_reconnect = Some(Instant::now());
        info!(transport = %name, attempts, "reconnected");
        drop(request);
    }

    debug!(transport = %name, "reconnect loop stopped");
}

/// Retry `reopen` until it succeeds. Returns `None` on shutdown.
///
/// The first attempt is immediate. An attempt already in flight is allowed to
/// finish so the transport is never left half-open.
async fn reopen_until_success(
    ctx: &LinkContext,
    name: &str,
    retry_interval: Duration,
) -> Option<u32> {
    let mut attempts = 0u32;
    loop {
        if ctx.cancel.is_cancelled() {
            return None;
        }
        attempts += 1;

        match ctx.transport.reopen().await {
            Ok(()) => return Some(attempts),
            Err(err) => {
                warn!(transport = %name, attempt = attempts, error = %err, "reopen failed");
                if !ctx.emit(Message::Err(err)).await {
                    return None;
                }
            }
        }

        tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => return None,
            _ = tokio::time::sleep(retry_interval) => {}
        }
    }
}
