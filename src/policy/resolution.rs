//! Resolution policy: the thresholds `find` runs with.

use serde::{Deserialize, Serialize};

use crate::canonical::canonical_hash_hex;
use crate::DEFAULT_POLICY_VERSION;

/// Policy parameters for one resolution run.
///
/// ## Parameters
///
/// - `min_samples`: series with fewer samples (before or after trimming) are removed
/// - `max_overlap`: largest number of shared samples two kept series may have
/// - `min_cluster_size`: smallest cluster reported by the cluster reporter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionPolicy {
    /// Policy version identifier.
    pub version: String,
    /// Minimum number of samples a kept series must have.
    pub min_samples: usize,
    /// Maximum number of samples two kept series may share.
    pub max_overlap: usize,
    /// Minimum member count of reported clusters.
    pub min_cluster_size: usize,
}

/// Invalid policy parameters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    /// Clusters always have at least one member.
    #[error("min_cluster_size must be at least 1")]
    ZeroClusterSize,
}

impl ResolutionPolicy {
    /// Create a policy with custom thresholds.
    pub fn new(min_samples: usize, max_overlap: usize) -> Self {
        Self {
            min_samples,
            max_overlap,
            ..Self::default()
        }
    }

    /// Builder-style setter for the reported cluster size.
    pub fn with_min_cluster_size(mut self, min_cluster_size: usize) -> Self {
        self.min_cluster_size = min_cluster_size;
        self
    }

    /// Check the parameters.
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.min_cluster_size == 0 {
            return Err(PolicyError::ZeroClusterSize);
        }
        Ok(())
    }

    /// Compute a hash of the policy parameters.
    pub fn params_hash(&self) -> String {
        canonical_hash_hex(self)
    }
}

impl Default for ResolutionPolicy {
    fn default() -> Self {
        Self {
            version: DEFAULT_POLICY_VERSION.to_string(),
            min_samples: 3,
            max_overlap: 3,
            min_cluster_size: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let policy = ResolutionPolicy::default();
        assert_eq!(policy.min_samples, 3);
        assert_eq!(policy.max_overlap, 3);
        assert_eq!(policy.min_cluster_size, 2);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_params_hash_determinism() {
        let policy1 = ResolutionPolicy::default();
        let policy2 = ResolutionPolicy::default();

        assert_eq!(policy1.params_hash(), policy2.params_hash());
    }

    #[test]
    fn test_params_hash_changes() {
        let policy1 = ResolutionPolicy::default();
        let policy2 = ResolutionPolicy::new(3, 5);

        assert_ne!(policy1.params_hash(), policy2.params_hash());
    }

    #[test]
    fn test_zero_cluster_size_rejected() {
        let policy = ResolutionPolicy::default().with_min_cluster_size(0);
        assert_eq!(policy.validate(), Err(PolicyError::ZeroClusterSize));
    }

    #[test]
    fn test_partial_deserialize_uses_defaults() {
        let policy: ResolutionPolicy = serde_json::from_str(r#"{"max_overlap": 1}"#).unwrap();
        assert_eq!(policy.max_overlap, 1);
        assert_eq!(policy.min_samples, 3);
    }
}
