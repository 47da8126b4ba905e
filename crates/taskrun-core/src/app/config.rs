//! ExecutorConfig - worker pool のサイズ設定

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::ConfigError;

pub const ENV_MAX_THREADS: &str = "TASKRUN_MAX_THREADS";
pub const ENV_QUEUE_CAPACITY: &str = "TASKRUN_QUEUE_CAPACITY";
pub const ENV_POOL_NAME: &str = "TASKRUN_POOL_NAME";

/// Sizing of the task-run worker pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Number of pool workers. 0 = available parallelism.
    #[serde(default = "default_max_threads")]
    pub max_task_runs_threads_num: usize,

    /// Jobs that may wait for a free worker before submissions are refused.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Name used in logs and stats.
    #[serde(default = "default_pool_name")]
    pub pool_name: String,
}

fn default_max_threads() -> usize {
    512
}

fn default_queue_capacity() -> usize {
    4096
}

fn default_pool_name() -> String {
    "taskrun-pool".to_string()
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_task_runs_threads_num: default_max_threads(),
            queue_capacity: default_queue_capacity(),
            pool_name: default_pool_name(),
        }
    }
}

impl ExecutorConfig {
    /// Defaults overridden by `TASKRUN_*` environment variables.
    ///
    /// A `.env` file in the working directory is loaded first when present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// `TASKRUN_*` values read from a dotenv-style file only. The process
    /// environment is neither read nor modified.
    pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let vars = dotenvy::from_path_iter(path)
            .and_then(|iter| iter.collect::<Result<HashMap<String, String>, _>>())
            .map_err(|e| ConfigError::EnvFile(e.to_string()))?;
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    /// Same as [`ExecutorConfig::from_env`] with an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(raw) = lookup(ENV_MAX_THREADS) {
            config.max_task_runs_threads_num = parse_usize(ENV_MAX_THREADS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_QUEUE_CAPACITY) {
            config.queue_capacity = parse_usize(ENV_QUEUE_CAPACITY, &raw)?;
        }
        if let Some(raw) = lookup(ENV_POOL_NAME) {
            config.pool_name = raw.trim().to_string();
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }
        if self.pool_name.trim().is_empty() {
            return Err(ConfigError::EmptyPoolName);
        }
        Ok(())
    }

    /// Resolve worker count (0 means use available parallelism).
    pub fn resolved_worker_threads(&self) -> usize {
        if self.max_task_runs_threads_num == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        } else {
            self.max_task_runs_threads_num
        }
    }
}

fn parse_usize(key: &'static str, raw: &str) -> Result<usize, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
    })
}
