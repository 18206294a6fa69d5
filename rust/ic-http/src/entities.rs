//! Per-entity `QueryBuilder` configuration for the four ingestible event
//! types (§6 HTTP API table: user-activities, security-events,
//! transaction-events, callback-logs). Each entity gets its own
//! measurement name, tag/field allow-lists, and a stable task-type for
//! C6/C7 routing, grounded on `ic_query::EntityConfig` and
//! `ic_queue::JobRegistry::default_registry`.

use std::collections::HashSet;

use ic_query::EntityConfig;

/// One entity's full wiring: its query-builder config, the task-type its
/// insert handler dispatches under, and the URL path segment it's served
/// at.
pub struct Entity {
    pub path_segment: &'static str,
    pub task_type: &'static str,
    pub config: EntityConfig,
}

fn tags(names: &[&str]) -> HashSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// The four entities §6 lists, in the order the route table declares them.
pub fn all() -> Vec<Entity> {
    vec![
        Entity {
            path_segment: "user-activities",
            task_type: "user_activity.persist",
            config: EntityConfig {
                measurement: "user_activities".to_string(),
                valid_tags: tags(&["client_id", "user_id", "action", "status", "request_id"]),
                valid_fields: tags(&["ip", "user_agent"]),
                projection: vec![
                    "client_id".to_string(),
                    "user_id".to_string(),
                    "action".to_string(),
                    "status".to_string(),
                    "request_id".to_string(),
                    "ip".to_string(),
                    "user_agent".to_string(),
                ],
                count_field: "request_id".to_string(),
                unique_tag: "request_id".to_string(),
            },
        },
        Entity {
            path_segment: "security-events",
            task_type: "security_event.persist",
            config: EntityConfig {
                measurement: "security_events".to_string(),
                valid_tags: tags(&["client_id", "event_type", "severity", "request_id"]),
                valid_fields: tags(&["ip", "user_agent"]),
                projection: vec![
                    "client_id".to_string(),
                    "event_type".to_string(),
                    "severity".to_string(),
                    "request_id".to_string(),
                    "ip".to_string(),
                    "user_agent".to_string(),
                ],
                count_field: "request_id".to_string(),
                unique_tag: "request_id".to_string(),
            },
        },
        Entity {
            path_segment: "transaction-events",
            task_type: "transaction_event.persist",
            config: EntityConfig {
                measurement: "transaction_events".to_string(),
                valid_tags: tags(&["client_id", "status", "currency", "request_id"]),
                valid_fields: tags(&["amount", "ip"]),
                projection: vec![
                    "client_id".to_string(),
                    "status".to_string(),
                    "currency".to_string(),
                    "amount".to_string(),
                    "request_id".to_string(),
                    "ip".to_string(),
                ],
                count_field: "request_id".to_string(),
                unique_tag: "request_id".to_string(),
            },
        },
        Entity {
            path_segment: "callback-logs",
            task_type: "callback_log.persist",
            config: EntityConfig {
                measurement: "callback_logs".to_string(),
                valid_tags: tags(&["client_id", "status_code", "request_id"]),
                valid_fields: tags(&["callback_url", "response_body"]),
                projection: vec![
                    "client_id".to_string(),
                    "status_code".to_string(),
                    "callback_url".to_string(),
                    "request_id".to_string(),
                    "response_body".to_string(),
                ],
                count_field: "request_id".to_string(),
                unique_tag: "request_id".to_string(),
            },
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_entities_with_distinct_task_types() {
        let entities = all();
        assert_eq!(entities.len(), 4);
        let mut task_types: Vec<&str> = entities.iter().map(|e| e.task_type).collect();
        task_types.sort();
        task_types.dedup();
        assert_eq!(task_types.len(), 4);
    }
}
