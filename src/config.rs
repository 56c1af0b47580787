use crate::{LayoutError, Result};
use rayon::{ThreadPool, ThreadPoolBuilder};

/// Thread pool settings for running the kernels
#[derive(Debug, Clone, Default)]
pub struct ParallelConfig {
    /// Worker threads; `None` uses rayon's default (one per logical core)
    pub num_threads: Option<usize>,
}

impl ParallelConfig {
    /// Builds a dedicated pool. Kernels run inside it via `pool.install`.
    pub fn build_pool(&self) -> Result<ThreadPool> {
        let mut builder = ThreadPoolBuilder::new().thread_name(|i| format!("padshrink-{}", i));
        if let Some(threads) = self.num_threads {
            if threads == 0 {
                return Err(LayoutError::InvalidConfig(
                    "num_threads must be at least 1".to_string(),
                ));
            }
            builder = builder.num_threads(threads);
        }
        builder
            .build()
            .map_err(|e| LayoutError::InvalidConfig(e.to_string()))
    }
}

/// Settings controlling how long a [`BestOf`](crate::BestOf) keeps competing
#[derive(Debug, Clone, PartialEq)]
pub struct BestOfConfig {
    /// Maximum rounds (one call per alternative each) before a winner is fixed
    pub rounds: usize,
    /// Alternatives slower than `pruning_speedup` times the best median are dropped
    pub pruning_speedup: f64,
    /// Rounds to complete before pruning or early selection kicks in
    pub prune_after_round: usize,
}

impl Default for BestOfConfig {
    fn default() -> Self {
        BestOfConfig {
            rounds: 10,
            pruning_speedup: 10.0,
            prune_after_round: 4,
        }
    }
}

impl BestOfConfig {
    pub fn validate(&self) -> Result<()> {
        if self.rounds < 1 {
            return Err(LayoutError::InvalidConfig(
                "rounds must be at least 1".to_string(),
            ));
        }
        if self.pruning_speedup.is_nan() || self.pruning_speedup <= 1.0 {
            return Err(LayoutError::InvalidConfig(format!(
                "pruning_speedup must be greater than 1, got {}",
                self.pruning_speedup
            )));
        }
        Ok(())
    }
}
