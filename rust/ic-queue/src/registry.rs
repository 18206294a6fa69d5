//! Closed registry of job task-types and their declared queue, per §3
//! JobPayload's "`task_type` (string from a closed registry)" and §4.7's
//! "generated from the registered job list".

/// One declared `(task_type, queue)` pairing.
#[derive(Debug, Clone)]
pub struct JobDefinition {
    pub task_type: String,
    pub queue: String,
}

/// The closed set of task-types the ingest and worker binaries agree on.
#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
    jobs: Vec<JobDefinition>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, task_type: impl Into<String>, queue: impl Into<String>) -> &mut Self {
        self.jobs.push(JobDefinition {
            task_type: task_type.into(),
            queue: queue.into(),
        });
        self
    }

    /// The four telemetry event types this service ingests, per §1/§6.
    pub fn default_registry() -> Self {
        let mut registry = Self::new();
        registry
            .register("user_activity.persist", "critical")
            .register("security_event.persist", "critical")
            .register("transaction_event.persist", "critical")
            .register("callback_log.persist", "low");
        registry
    }

    /// Distinct queue names, in first-declaration order.
    pub fn queues(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.jobs
            .iter()
            .map(|j| j.queue.clone())
            .filter(|q| seen.insert(q.clone()))
            .collect()
    }

    pub fn task_types_for_queue(&self, queue: &str) -> Vec<String> {
        self.jobs
            .iter()
            .filter(|j| j.queue == queue)
            .map(|j| j.task_type.clone())
            .collect()
    }

    pub fn is_known_task_type(&self, task_type: &str) -> bool {
        self.jobs.iter().any(|j| j.task_type == task_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_groups_three_critical_one_low() {
        let registry = JobRegistry::default_registry();
        assert_eq!(registry.queues(), vec!["critical", "low"]);
        assert_eq!(registry.task_types_for_queue("critical").len(), 3);
        assert_eq!(registry.task_types_for_queue("low").len(), 1);
    }
}
