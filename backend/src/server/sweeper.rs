//! Background expiry sweep for abandoned group sessions.
//!
//! Sessions have a hard expiry and no renegotiation; this task is the only
//! mechanism that reaps them. The interval carries a small random jitter so
//! replicas do not sweep in lockstep.

use std::sync::Arc;
use std::time::Duration;

use mockable::Clock;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tokio::task::JoinHandle;
use tracing::warn;

use backend::domain::ports::GroupOrderingCommand;

/// Spawn the sweep loop. The handle is detached; the loop runs until the
/// process exits.
pub(crate) fn spawn_expiry_sweeper(
    ordering: Arc<dyn GroupOrderingCommand>,
    clock: Arc<dyn Clock>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut rng = SmallRng::from_entropy();
        let jitter_ceiling = (interval / 10).max(Duration::from_millis(100));
        loop {
            let jitter = rng.gen_range(Duration::ZERO..jitter_ceiling);
            tokio::time::sleep(interval + jitter).await;

            if let Err(error) = ordering.sweep_expired(clock.utc()).await {
                warn!(error = %error, "expiry sweep failed");
            }
        }
    })
}
