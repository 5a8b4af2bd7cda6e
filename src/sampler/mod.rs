//! Interface byte-counter sampling.

use anyhow::{Result, bail};
use sysinfo::Networks;

/// Source of cumulative interface byte counters.
///
/// `validate` runs once at startup; a configured interface missing from the
/// OS table is a configuration error, not a runtime condition.
pub trait ByteSampler {
    fn validate(&mut self, interfaces: &[String]) -> Result<()>;

    /// Current received + transmitted total (since counter reset) summed
    /// over the named interfaces.
    fn total_bytes(&mut self, interfaces: &[String]) -> Result<u64>;
}

/// Production sampler backed by the OS network statistics table.
pub struct SysinfoSampler {
    networks: Networks,
}

impl SysinfoSampler {
    pub fn new() -> Self {
        Self {
            networks: Networks::new_with_refreshed_list(),
        }
    }
}

impl Default for SysinfoSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteSampler for SysinfoSampler {
    fn validate(&mut self, interfaces: &[String]) -> Result<()> {
        self.networks.refresh_list();
        let missing: Vec<&str> = interfaces
            .iter()
            .filter(|name| !self.networks.iter().any(|(n, _)| n == *name))
            .map(|name| name.as_str())
            .collect();
        if !missing.is_empty() {
            bail!("Interfaces not found: {}", missing.join(", "));
        }
        Ok(())
    }

    fn total_bytes(&mut self, interfaces: &[String]) -> Result<u64> {
        self.networks.refresh();
        let mut total: u64 = 0;
        for (name, data) in self.networks.iter() {
            if interfaces.iter().any(|i| i == name) {
                total = total
                    .saturating_add(data.total_received())
                    .saturating_add(data.total_transmitted());
            }
        }
        Ok(total)
    }
}
