//! Pool Scanner
//!
//! Walks every pool, applies the matcher, and hands the first hit to a
//! callback. Each scan also gives the unavailable-pool registry a chance to
//! promote the pool being examined.

use crate::domain::ports::{Pool, PoolManager};
use crate::hotplug::matcher::{MatchCriteria, MatchedVdev};
use crate::hotplug::unavailable::UnavailablePools;
use crate::metrics::AgentMetrics;
use crate::pool::vdev::Vdev;
use tracing::{debug, info, warn};

/// Iterates pools on behalf of one event
pub struct PoolScanner<'a> {
    manager: &'a dyn PoolManager,
    unavailable: &'a mut UnavailablePools,
    metrics: &'a AgentMetrics,
}

impl<'a> PoolScanner<'a> {
    pub fn new(
        manager: &'a dyn PoolManager,
        unavailable: &'a mut UnavailablePools,
        metrics: &'a AgentMetrics,
    ) -> Self {
        Self {
            manager,
            unavailable,
            metrics,
        }
    }

    /// Scan pools in iteration order until one produces a match.
    ///
    /// `on_match` runs with the pool still open. Pools after the matching
    /// one are never opened. Every handle opened here is closed before
    /// returning.
    pub fn scan<T>(
        &mut self,
        criteria: &MatchCriteria,
        mut on_match: impl FnMut(&dyn Pool, &MatchedVdev) -> T,
    ) -> Option<T> {
        let names = match self.manager.pool_names() {
            Ok(names) => names,
            Err(e) => {
                warn!("cannot list pools: {}", e);
                return None;
            }
        };

        for name in names {
            let pool = match self.manager.open(&name) {
                Ok(pool) => pool,
                Err(e) if e.is_reportable() => {
                    warn!("cannot open pool '{}': {}", name, e);
                    continue;
                }
                Err(e) => {
                    debug!("skipping pool '{}': {}", name, e);
                    continue;
                }
            };

            info!("evaluating vdevs on {} (by {})", name, criteria.key_name());
            let result = examine(pool.as_ref(), criteria, &mut on_match);

            if let Err(e) = self.unavailable.promote_if_available(pool.as_ref(), self.metrics) {
                warn!("promotion check for '{}' failed: {}", name, e);
            }
            drop(pool);

            if result.is_some() {
                return result;
            }
        }
        None
    }
}

fn examine<T>(
    pool: &dyn Pool,
    criteria: &MatchCriteria,
    on_match: &mut impl FnMut(&dyn Pool, &MatchedVdev) -> T,
) -> Option<T> {
    let config = match pool.config() {
        Ok(config) => config,
        Err(e) => {
            warn!("cannot read config of '{}': {}", pool.name(), e);
            return None;
        }
    };
    if !criteria.accepts_pool(config.pool_guid) {
        return None;
    }
    let matched = criteria.match_tree(&config.vdev_tree)?;
    Some(on_match(pool, &matched))
}

/// Find the first pool holding a leaf at `phys_path` and run `on_found`
/// against it. No unavailable-pool promotion happens on this path.
pub fn scan_phys_path<T>(
    manager: &dyn PoolManager,
    phys_path: &str,
    mut on_found: impl FnMut(&dyn Pool, &Vdev) -> T,
) -> Option<T> {
    let names = match manager.pool_names() {
        Ok(names) => names,
        Err(e) => {
            warn!("cannot list pools: {}", e);
            return None;
        }
    };

    for name in names {
        let Ok(pool) = manager.open(&name) else {
            continue;
        };
        info!("searching for '{}' in '{}'", phys_path, name);
        if let Some(leaf) = pool.find_vdev_by_phys_path(phys_path) {
            return Some(on_found(pool.as_ref(), &leaf));
        }
    }
    None
}
