//! Sweep configuration.

use crate::error::{Result, SweepError};
use revsweep_document::{is_commit_root_entry, is_deleted_entry, is_property_name, is_revisions_entry};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Number of corrections delivered to a listener in one batch.
pub const SWEEP_BATCH_SIZE: usize = 100;

/// Minimum time between two progress reports.
pub const PROGRESS_INTERVAL_MS: u64 = 60_000;

/// Configuration for a sweeper.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Also revert uncommitted changes newer than the head revision. Only
    /// safe during recovery of a cluster member that has no commits in
    /// progress.
    pub sweep_newer_than_head: bool,

    /// Maximum number of corrections per listener call.
    pub batch_size: usize,

    /// Minimum milliseconds between progress log lines.
    pub progress_interval_ms: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        SweepConfig {
            sweep_newer_than_head: false,
            batch_size: SWEEP_BATCH_SIZE,
            progress_interval_ms: PROGRESS_INTERVAL_MS,
        }
    }
}

impl SweepConfig {
    /// Configuration used when recovering a crashed cluster member.
    pub fn recovery() -> Self {
        SweepConfig {
            sweep_newer_than_head: true,
            ..Default::default()
        }
    }

    /// Parse and validate a JSON configuration. Missing fields take their
    /// defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SweepConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(SweepError::InvalidConfig(
                "batch_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Selects the properties whose revision entries are swept.
#[derive(Clone)]
pub struct PropertyFilter(Arc<dyn Fn(&str) -> bool + Send + Sync>);

impl PropertyFilter {
    pub fn new(filter: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        PropertyFilter(Arc::new(filter))
    }

    /// User properties plus the `_deleted`, `_commitRoot` and `_revisions`
    /// system maps.
    ///
    /// - user properties: content changes
    /// - `_deleted`: creation of this node
    /// - `_commitRoot`: changes committed on an ancestor
    /// - `_revisions`: commit roots, including those of branch commits
    pub fn sweep_relevant() -> Self {
        PropertyFilter::new(|name| {
            is_property_name(name)
                || is_deleted_entry(name)
                || is_commit_root_entry(name)
                || is_revisions_entry(name)
        })
    }

    pub fn matches(&self, property: &str) -> bool {
        (self.0)(property)
    }
}

impl Default for PropertyFilter {
    fn default() -> Self {
        PropertyFilter::sweep_relevant()
    }
}

impl fmt::Debug for PropertyFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PropertyFilter")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SweepConfig::default();
        assert!(!config.sweep_newer_than_head);
        assert_eq!(config.batch_size, 100);
        assert!(SweepConfig::recovery().sweep_newer_than_head);
    }

    #[test]
    fn test_config_from_json() {
        let config = SweepConfig::from_json(r#"{"sweep_newer_than_head": true}"#).unwrap();
        assert!(config.sweep_newer_than_head);
        assert_eq!(config.batch_size, SWEEP_BATCH_SIZE);
        assert_eq!(config.progress_interval_ms, PROGRESS_INTERVAL_MS);

        assert!(matches!(
            SweepConfig::from_json(r#"{"batch_size": 0}"#),
            Err(SweepError::InvalidConfig(_))
        ));
        assert!(SweepConfig::from_json("not json").is_err());
    }

    #[test]
    fn test_sweep_relevant_properties() {
        let filter = PropertyFilter::default();
        assert!(filter.matches("title"));
        assert!(filter.matches("__hidden"));
        assert!(filter.matches("_deleted"));
        assert!(filter.matches("_commitRoot"));
        assert!(filter.matches("_revisions"));
        assert!(!filter.matches("_bc"));
        assert!(!filter.matches("_sweepRev"));
    }

    #[test]
    fn test_custom_filter() {
        let filter = PropertyFilter::new(|name| name == "only");
        assert!(filter.matches("only"));
        assert!(!filter.matches("_deleted"));
    }
}
