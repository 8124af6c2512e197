use std::{collections::HashSet, env, path::PathBuf, str::FromStr};

use log::{debug, info};

use crate::{
    error::{BenchError, Result},
    strategy::LockVariant,
    trial::MAX_SUPPORTED_THREADS,
    workload::DEFAULT_BUSY_ITERATIONS,
};

pub const DEFAULT_THREAD_COUNTS: [usize; 6] = [2, 4, 6, 8, 12, 16];
pub const DEFAULT_TRIALS: usize = 10;
pub const DEFAULT_OUTPUT: &str = "benchmark_results.csv";

pub const ENV_LOCKS: &str = "SPINBENCH_LOCKS";
pub const ENV_THREADS: &str = "SPINBENCH_THREADS";
pub const ENV_TRIALS: &str = "SPINBENCH_TRIALS";
pub const ENV_BUSY_ITERATIONS: &str = "SPINBENCH_BUSY_ITERATIONS";
pub const ENV_MAX_THREADS: &str = "SPINBENCH_MAX_THREADS";
pub const ENV_OUTPUT: &str = "SPINBENCH_OUTPUT";
pub const ENV_TRACE: &str = "SPINBENCH_TRACE";

/// Everything that shapes a run. Read-only once the harness starts.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchConfig {
    /// Sweep order of the lock variants.
    pub variants: Vec<LockVariant>,
    /// Sweep points, visited in this order.
    pub thread_counts: Vec<usize>,
    pub trials: usize,
    pub busy_iterations: u64,
    /// Size of the pre-allocated node array.
    pub max_threads: usize,
    pub output: PathBuf,
    pub trace: bool,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            variants: LockVariant::ALL.to_vec(),
            thread_counts: DEFAULT_THREAD_COUNTS.to_vec(),
            trials: DEFAULT_TRIALS,
            busy_iterations: DEFAULT_BUSY_ITERATIONS,
            max_threads: MAX_SUPPORTED_THREADS,
            output: PathBuf::from(DEFAULT_OUTPUT),
            trace: false,
        }
    }
}

impl BenchConfig {
    /// Defaults overridden by `SPINBENCH_*` environment variables, validated.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        info!(
            "Loaded configuration: locks {:?}, threads {:?}, {} trials, {} busy iterations",
            config.variants, config.thread_counts, config.trials, config.busy_iterations
        );
        Ok(config)
    }

    /// Applies every override `lookup` knows about. Values that do not parse
    /// are errors.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(value) = lookup(ENV_LOCKS) {
            self.variants = parse_list(ENV_LOCKS, &value)?;
            debug!("{} overrides lock variants: {:?}", ENV_LOCKS, self.variants);
        }
        if let Some(value) = lookup(ENV_THREADS) {
            self.thread_counts = parse_list(ENV_THREADS, &value)?;
            debug!("{} overrides thread counts: {:?}", ENV_THREADS, self.thread_counts);
        }
        if let Some(value) = lookup(ENV_TRIALS) {
            self.trials = parse_value(ENV_TRIALS, &value)?;
        }
        if let Some(value) = lookup(ENV_BUSY_ITERATIONS) {
            self.busy_iterations = parse_value(ENV_BUSY_ITERATIONS, &value)?;
        }
        if let Some(value) = lookup(ENV_MAX_THREADS) {
            self.max_threads = parse_value(ENV_MAX_THREADS, &value)?;
        }
        if let Some(value) = lookup(ENV_OUTPUT) {
            if value.trim().is_empty() {
                return Err(BenchError::Config(format!("{ENV_OUTPUT} is empty")));
            }
            self.output = PathBuf::from(value.trim());
        }
        if let Some(value) = lookup(ENV_TRACE) {
            self.trace = parse_flag(ENV_TRACE, &value)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.variants.is_empty() {
            return Err(BenchError::Config("no lock variants to sweep".into()));
        }
        if let Some(dup) = first_duplicate(&self.variants) {
            return Err(BenchError::Config(format!("lock variant {dup} listed twice")));
        }
        if self.thread_counts.is_empty() {
            return Err(BenchError::Config("no thread counts to sweep".into()));
        }
        if let Some(dup) = first_duplicate(&self.thread_counts) {
            return Err(BenchError::Config(format!("thread count {dup} listed twice")));
        }
        if self.max_threads == 0 || self.max_threads > MAX_SUPPORTED_THREADS {
            return Err(BenchError::Config(format!(
                "max threads {} outside 1..={}",
                self.max_threads, MAX_SUPPORTED_THREADS
            )));
        }
        if let Some(&bad) = self
            .thread_counts
            .iter()
            .find(|&&n| n == 0 || n > self.max_threads)
        {
            return Err(BenchError::ThreadCountOutOfRange {
                thread_count: bad,
                max: self.max_threads,
            });
        }
        if self.trials == 0 {
            return Err(BenchError::Config("trials must be at least 1".into()));
        }
        Ok(())
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| BenchError::Config(format!("{key}: cannot parse `{value}`")))
}

fn parse_list<T: FromStr>(key: &str, value: &str) -> Result<Vec<T>> {
    value
        .split(',')
        .filter(|item| !item.trim().is_empty())
        .map(|item| parse_value(key, item))
        .collect()
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(BenchError::Config(format!("{key}: cannot parse `{value}`"))),
    }
}

fn first_duplicate<T: Copy + Eq + std::hash::Hash>(items: &[T]) -> Option<T> {
    let mut seen = HashSet::new();
    items.iter().copied().find(|item| !seen.insert(*item))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn with_env(pairs: &[(&str, &str)]) -> Result<BenchConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let mut config = BenchConfig::default();
        config.apply_overrides(|key| vars.get(key).cloned())?;
        config.validate()?;
        Ok(config)
    }

    #[test]
    fn test_defaults() {
        let config = BenchConfig::default();
        assert_eq!(
            config.variants,
            vec![LockVariant::Mcs, LockVariant::Cas, LockVariant::Ticket, LockVariant::Ttas]
        );
        assert_eq!(config.thread_counts, vec![2, 4, 6, 8, 12, 16]);
        assert_eq!(config.trials, 10);
        assert_eq!(config.busy_iterations, 100_000);
        assert_eq!(config.output, PathBuf::from("benchmark_results.csv"));
        assert!(!config.trace);
        config.validate().unwrap();
    }

    #[test]
    fn test_overrides() {
        let config = with_env(&[
            (ENV_LOCKS, "ttas, mcs"),
            (ENV_THREADS, "1,3,5,"),
            (ENV_TRIALS, "4"),
            (ENV_BUSY_ITERATIONS, "250"),
            (ENV_MAX_THREADS, "8"),
            (ENV_OUTPUT, "out/run.csv"),
            (ENV_TRACE, "yes"),
        ])
        .unwrap();
        assert_eq!(config.variants, vec![LockVariant::Ttas, LockVariant::Mcs]);
        assert_eq!(config.thread_counts, vec![1, 3, 5]);
        assert_eq!(config.trials, 4);
        assert_eq!(config.busy_iterations, 250);
        assert_eq!(config.max_threads, 8);
        assert_eq!(config.output, PathBuf::from("out/run.csv"));
        assert!(config.trace);
    }

    #[test]
    fn test_unparseable_values() {
        assert!(matches!(with_env(&[(ENV_TRIALS, "ten")]), Err(BenchError::Config(_))));
        assert!(matches!(with_env(&[(ENV_THREADS, "2,x")]), Err(BenchError::Config(_))));
        assert!(matches!(with_env(&[(ENV_LOCKS, "mcs,clh")]), Err(BenchError::Config(_))));
        assert!(matches!(with_env(&[(ENV_TRACE, "maybe")]), Err(BenchError::Config(_))));
        assert!(matches!(with_env(&[(ENV_OUTPUT, " ")]), Err(BenchError::Config(_))));
    }

    #[test]
    fn test_validation() {
        assert!(matches!(with_env(&[(ENV_LOCKS, "")]), Err(BenchError::Config(_))));
        assert!(matches!(with_env(&[(ENV_LOCKS, "cas,CAS")]), Err(BenchError::Config(_))));
        assert!(matches!(with_env(&[(ENV_THREADS, "2,2")]), Err(BenchError::Config(_))));
        assert!(matches!(with_env(&[(ENV_TRIALS, "0")]), Err(BenchError::Config(_))));
        assert!(matches!(with_env(&[(ENV_MAX_THREADS, "1001")]), Err(BenchError::Config(_))));
        assert!(matches!(
            with_env(&[(ENV_THREADS, "0")]),
            Err(BenchError::ThreadCountOutOfRange { thread_count: 0, .. })
        ));
        assert!(matches!(
            with_env(&[(ENV_MAX_THREADS, "8"), (ENV_THREADS, "4,16")]),
            Err(BenchError::ThreadCountOutOfRange { thread_count: 16, max: 8 })
        ));
    }
}
