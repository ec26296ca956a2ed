//! Sequencer configuration

use crate::defaults::DEFAULT_TWO_OPT_MAX_ITERATIONS;

/// Configuration for the local route sequencer
#[derive(Debug, Clone)]
pub struct SequencerConfig {
    /// Maximum number of full 2-opt scans before giving up on further improvement
    pub max_iterations: usize,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_TWO_OPT_MAX_ITERATIONS,
        }
    }
}

impl SequencerConfig {
    pub fn new(max_iterations: usize) -> Self {
        Self {
            max_iterations: max_iterations.max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequencer_config_default() {
        let config = SequencerConfig::default();
        assert_eq!(config.max_iterations, 2000);
    }

    #[test]
    fn test_sequencer_config_keeps_explicit_cap() {
        assert_eq!(SequencerConfig::new(150).max_iterations, 150);
    }

    #[test]
    fn test_sequencer_config_never_zero() {
        assert_eq!(SequencerConfig::new(0).max_iterations, 1);
    }
}
