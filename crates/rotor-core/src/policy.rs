//! Scheduling policy: which contract does the next run deploy?
//!
//! Pure decision function over (pruned history, catalog, current time) —
//! no I/O, so tests drive it with fixed inputs and a seeded RNG.
//!
//! Two-tier policy: contracts tagged [`Interaction::Scheduled`] carry a
//! mandatory cadence — once `mandatory_interval` has elapsed since the
//! last scheduled-class deployment, the pick is forced from that class.
//! Otherwise the pick is uniform over the FULL catalog, scheduled members
//! included; repeats of recently-deployed contracts are acceptable.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::domain::{ContractCatalog, DeploymentRecord, Result, RotorError};

/// Decide the `log_name` the next run deploys.
///
/// `history` must already be retention-pruned; records without a timestamp
/// never count toward the cadence computation. With no scheduled-class
/// record in history the cadence dates from the epoch, so the mandatory
/// condition is immediately true. An empty scheduled class satisfies the
/// cadence vacuously; an empty catalog is a configuration error.
pub fn next_deployment<R: Rng + ?Sized>(
    catalog: &ContractCatalog,
    history: &[DeploymentRecord],
    now: DateTime<Utc>,
    mandatory_interval: Duration,
    rng: &mut R,
) -> Result<String> {
    if catalog.contracts.is_empty() {
        return Err(RotorError::Catalog(
            "cannot schedule a deployment from an empty catalog".to_string(),
        ));
    }

    let scheduled = catalog.scheduled_class();
    let scheduled_names: HashSet<&str> =
        scheduled.iter().map(|e| e.log_name.as_str()).collect();

    let last_scheduled = history
        .iter()
        .filter(|r| scheduled_names.contains(r.log_name.as_str()))
        .filter_map(|r| r.timestamp)
        .max()
        .unwrap_or(DateTime::UNIX_EPOCH);

    if !scheduled.is_empty() && now - last_scheduled >= mandatory_interval {
        let pick = scheduled
            .choose(rng)
            .expect("scheduled class checked non-empty");
        debug!(
            log_name = %pick.log_name,
            last_scheduled = %last_scheduled,
            "mandatory cadence due, deploying scheduled-class contract"
        );
        return Ok(pick.log_name.clone());
    }

    let pick = catalog
        .contracts
        .choose(rng)
        .expect("catalog checked non-empty");
    debug!(log_name = %pick.log_name, "cadence satisfied, deploying random contract");
    Ok(pick.log_name.clone())
}
