//! C7: Worker Config Store.
//!
//! Read-mostly in-memory cache (`parking_lot::Mutex`, per §5) backed by
//! Redis as the cross-process source of truth, matching `RedisClient`'s
//! JSON-value-with-TTL shape and the "in-memory cache eagerly consistent
//! with dual-writes" rule in §9 for the worker-weight half of that rule
//! (C7 has no file-persistence rollback path — Redis is authoritative).

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{WorkerConfigError, WorkerConfigResult};
use crate::redis_client::RedisClient;
use crate::registry::JobRegistry;

const REDIS_KEY: &str = "insight-collector:worker-config";

fn known_default_percentage(name: &str) -> Option<u32> {
    match name {
        "critical" => Some(60),
        "default" => Some(30),
        "low" => Some(10),
        _ => None,
    }
}

/// §3 WorkerConfig.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkerConfig {
    pub name: String,
    pub percentage: u32,
    pub task_types: Vec<String>,
}

/// C7: persists per-queue weight + task-type assignment to Redis.
pub struct WorkerConfigStore {
    redis: RedisClient,
    cache: Mutex<Vec<WorkerConfig>>,
}

impl WorkerConfigStore {
    pub fn new(redis: RedisClient) -> Self {
        Self {
            redis,
            cache: Mutex::new(Vec::new()),
        }
    }

    /// `load`: read from Redis; if absent, generate defaults from
    /// `registry` and persist them.
    pub async fn load(&self, registry: &JobRegistry) -> WorkerConfigResult<()> {
        let stored: Option<Vec<WorkerConfig>> = self.redis.get_json(REDIS_KEY).await?;
        let workers = match stored {
            Some(workers) if !workers.is_empty() => workers,
            _ => {
                let defaults = Self::generate_defaults_from_registry(registry);
                self.redis.set_json(REDIS_KEY, &defaults, None).await?;
                defaults
            }
        };
        self.validate_list(&workers);
        *self.cache.lock() = workers;
        Ok(())
    }

    pub async fn save(&self, workers: Vec<WorkerConfig>) -> WorkerConfigResult<()> {
        self.validate_list(&workers);
        self.redis.set_json(REDIS_KEY, &workers, None).await?;
        *self.cache.lock() = workers;
        Ok(())
    }

    pub async fn set(
        &self,
        name: &str,
        percentage: u32,
        task_types: Vec<String>,
    ) -> WorkerConfigResult<()> {
        let mut workers = self.cache.lock().clone();
        match workers.iter_mut().find(|w| w.name == name) {
            Some(w) => {
                w.percentage = percentage;
                w.task_types = task_types;
            }
            None => workers.push(WorkerConfig {
                name: name.to_string(),
                percentage,
                task_types,
            }),
        }
        self.save(workers).await
    }

    pub async fn reset(&self, registry: &JobRegistry) -> WorkerConfigResult<()> {
        let defaults = Self::generate_defaults_from_registry(registry);
        self.save(defaults).await
    }

    pub fn get(&self, name: &str) -> Option<WorkerConfig> {
        self.cache.lock().iter().find(|w| w.name == name).cloned()
    }

    pub fn list(&self) -> Vec<WorkerConfig> {
        self.cache.lock().clone()
    }

    /// §4.7 algorithm: group registered jobs by declared queue, assign
    /// default percentages by name, normalize to sum 100.
    pub fn generate_defaults_from_registry(registry: &JobRegistry) -> Vec<WorkerConfig> {
        let queues = registry.queues();
        let known_total: u32 = queues
            .iter()
            .filter_map(|q| known_default_percentage(q))
            .sum();
        let unknown: Vec<&String> = queues
            .iter()
            .filter(|q| known_default_percentage(q).is_none())
            .collect();
        let remainder = 100u32.saturating_sub(known_total);
        let per_unknown = if unknown.is_empty() {
            0
        } else {
            remainder / unknown.len() as u32
        };

        let raw: Vec<(String, u32)> = queues
            .iter()
            .map(|q| {
                let p = known_default_percentage(q).unwrap_or(per_unknown);
                (q.clone(), p)
            })
            .collect();

        normalize(raw)
            .into_iter()
            .map(|(name, percentage)| WorkerConfig {
                task_types: registry.task_types_for_queue(&name),
                name,
                percentage,
            })
            .collect()
    }

    /// §4.7 `validate`: logs but does not fail.
    pub fn validate(&self) {
        self.validate_list(&self.cache.lock());
    }

    fn validate_list(&self, workers: &[WorkerConfig]) {
        let sum: u32 = workers.iter().map(|w| w.percentage).sum();
        if sum != 100 {
            warn!(sum, "worker percentages do not sum to 100");
        }
        let mut seen = HashMap::new();
        for w in workers {
            for t in &w.task_types {
                if let Some(previous) = seen.insert(t.clone(), w.name.clone()) {
                    warn!(
                        task_type = %t,
                        first_queue = %previous,
                        second_queue = %w.name,
                        "task-type assigned to multiple workers; later one wins"
                    );
                }
            }
        }
    }

    /// §4.7: `max(1, floor(percentage / 10))` per worker.
    pub fn queue_weights(&self) -> HashMap<String, u32> {
        queue_weights_of(&self.cache.lock())
    }

    /// §4.7 `queue_for_task`: last worker declaring `task_type` wins;
    /// unknown types route to `default`.
    pub fn queue_for_task(&self, task_type: &str) -> String {
        queue_for_task_of(&self.cache.lock(), task_type)
    }
}

fn queue_weights_of(workers: &[WorkerConfig]) -> HashMap<String, u32> {
    workers
        .iter()
        .map(|w| (w.name.clone(), (w.percentage / 10).max(1)))
        .collect()
}

fn queue_for_task_of(workers: &[WorkerConfig], task_type: &str) -> String {
    workers
        .iter()
        .rev()
        .find(|w| w.task_types.iter().any(|t| t == task_type))
        .map(|w| w.name.clone())
        .unwrap_or_else(|| "default".to_string())
}

/// §4.7 normalization: all-zero -> distribute 100 evenly (remainder on
/// first entries); non-zero but != 100 -> scale proportionally (floor),
/// residual added to the first entry.
fn normalize(raw: Vec<(String, u32)>) -> Vec<(String, u32)> {
    if raw.is_empty() {
        return raw;
    }
    let sum: u32 = raw.iter().map(|(_, p)| p).sum();
    if sum == 100 {
        return raw;
    }
    if sum == 0 {
        let n = raw.len() as u32;
        let base = 100 / n;
        let remainder = 100 % n;
        return raw
            .into_iter()
            .enumerate()
            .map(|(i, (name, _))| {
                let bonus = if (i as u32) < remainder { 1 } else { 0 };
                (name, base + bonus)
            })
            .collect();
    }

    let mut scaled: Vec<u32> = raw
        .iter()
        .map(|(_, p)| ((*p as f64) * 100.0 / sum as f64).floor() as u32)
        .collect();
    let scaled_sum: u32 = scaled.iter().sum();
    let residual = 100u32.saturating_sub(scaled_sum);
    scaled[0] += residual;
    raw.into_iter()
        .zip(scaled)
        .map(|((name, _), p)| (name, p))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s6_scenario_critical_and_low_normalize_to_86_14() {
        let registry = JobRegistry::default_registry();
        let workers = WorkerConfigStore::generate_defaults_from_registry(&registry);
        let critical = workers.iter().find(|w| w.name == "critical").unwrap();
        let low = workers.iter().find(|w| w.name == "low").unwrap();
        assert_eq!(critical.percentage, 86);
        assert_eq!(low.percentage, 14);
        assert_eq!(
            workers.iter().map(|w| w.percentage).sum::<u32>(),
            100
        );
    }

    #[test]
    fn all_three_named_queues_sum_to_100_unscaled() {
        let mut registry = JobRegistry::new();
        registry
            .register("a", "critical")
            .register("b", "default")
            .register("c", "low");
        let workers = WorkerConfigStore::generate_defaults_from_registry(&registry);
        assert_eq!(
            workers.iter().map(|w| w.percentage).sum::<u32>(),
            100
        );
        assert_eq!(
            workers.iter().find(|w| w.name == "critical").unwrap().percentage,
            60
        );
    }

    #[test]
    fn unknown_queue_names_split_remainder_evenly() {
        let mut registry = JobRegistry::new();
        registry
            .register("a", "critical")
            .register("b", "extra-one")
            .register("c", "extra-two");
        let workers = WorkerConfigStore::generate_defaults_from_registry(&registry);
        let extra_one = workers.iter().find(|w| w.name == "extra-one").unwrap();
        let extra_two = workers.iter().find(|w| w.name == "extra-two").unwrap();
        assert_eq!(extra_one.percentage, extra_two.percentage);
        assert_eq!(
            workers.iter().map(|w| w.percentage).sum::<u32>(),
            100
        );
    }

    #[test]
    fn queue_weights_resolve_to_1_through_10() {
        let registry = JobRegistry::default_registry();
        let workers = WorkerConfigStore::generate_defaults_from_registry(&registry);
        let weights = queue_weights_of(&workers);
        assert_eq!(weights.get("critical"), Some(&8));
        assert_eq!(weights.get("low"), Some(&1));
    }

    #[test]
    fn second_sighting_of_task_type_wins_queue_resolution() {
        let workers = vec![
            WorkerConfig {
                name: "a".into(),
                percentage: 50,
                task_types: vec!["t1".into()],
            },
            WorkerConfig {
                name: "b".into(),
                percentage: 50,
                task_types: vec!["t1".into()],
            },
        ];
        assert_eq!(queue_for_task_of(&workers, "t1"), "b");
        assert_eq!(queue_for_task_of(&workers, "unknown"), "default");
    }
}
