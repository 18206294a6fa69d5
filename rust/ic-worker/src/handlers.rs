//! The four `JobHandler` implementations the worker registers with
//! `WorkerRuntime` (§2 data flow: "C8 picks up -> enrichment (external) ->
//! time-series write (external)"). One handler per ingestible entity,
//! parameterized by the same `EntityConfig` the ingest process's
//! `QueryBuilder` uses, so tag/field allow-lists stay a single source of
//! truth across the write and read paths.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use ic_http::enrichment::Enricher;
use ic_http::events::EnqueuedEvent;
use ic_query::{Backend, EntityConfig};
use ic_queue::{JobHandler, QueuedJob};
use tracing::{debug, warn};

use crate::line_protocol::{FieldValue, Point};

/// Persists one enriched event to the time-series backend as a single
/// point. Registered once per entity under that entity's `task_type`
/// (§2.C6/C7 routing key).
pub struct EventPersistHandler {
    task_type: String,
    config: EntityConfig,
    backend: Arc<dyn Backend>,
    enricher: Arc<dyn Enricher>,
}

impl EventPersistHandler {
    pub fn new(
        task_type: impl Into<String>,
        config: EntityConfig,
        backend: Arc<dyn Backend>,
        enricher: Arc<dyn Enricher>,
    ) -> Self {
        Self {
            task_type: task_type.into(),
            config,
            backend,
            enricher,
        }
    }
}

#[async_trait]
impl JobHandler for EventPersistHandler {
    fn task_type(&self) -> &str {
        &self.task_type
    }

    async fn handle(&self, job: &QueuedJob) -> Result<(), String> {
        let event: EnqueuedEvent = serde_json::from_value(job.data.clone())
            .map_err(|e| format!("failed to decode enqueued event: {e}"))?;

        let mut tags: BTreeMap<String, String> = BTreeMap::new();
        let mut fields: BTreeMap<String, FieldValue> = BTreeMap::new();

        if self.config.valid_tags.contains("client_id") {
            tags.insert("client_id".to_string(), event.client_id.clone());
        }
        if self.config.valid_tags.contains("request_id") {
            tags.insert("request_id".to_string(), event.request_id.clone());
        }

        // Caller-supplied `details`, restricted to this entity's declared
        // tag/field allow-lists — the write-side mirror of §4.9's
        // filter-sanitization rule.
        if let Some(obj) = event.details.as_object() {
            for (key, value) in obj {
                let k = key.to_lowercase();
                if self.config.valid_tags.contains(&k) {
                    tags.entry(k).or_insert_with(|| json_value_to_tag(value));
                } else if self.config.valid_fields.contains(&k) {
                    fields.entry(k).or_insert_with(|| json_value_to_field(value));
                }
            }
        }

        // §4.13: enrichment fills in what the ingest edge only recorded
        // as raw strings.
        if self.config.valid_fields.contains("ip") {
            let ip_str = event.remote_ip.clone().unwrap_or_default();
            if let Ok(ip) = ip_str.parse::<IpAddr>() {
                let city = self.enricher.lookup_city(ip);
                if let Some(country) = city.country {
                    fields.insert("country".to_string(), FieldValue::Text(country));
                }
            }
            fields
                .entry("ip".to_string())
                .or_insert_with(|| FieldValue::Text(ip_str));
        }
        if self.config.valid_fields.contains("user_agent") {
            let ua = event.user_agent.clone().unwrap_or_default();
            let parsed = self.enricher.detect_user_agent(&ua);
            debug!(browser = ?parsed.browser, os = ?parsed.os, "user agent parsed");
            fields
                .entry("user_agent".to_string())
                .or_insert_with(|| FieldValue::Text(ua));
        }

        if fields.is_empty() {
            // A measurement with tags but no fields is invalid for most
            // time-series stores; record a marker field rather than drop
            // the point silently.
            fields.insert("recorded".to_string(), FieldValue::Integer(1));
        }

        let point = Point {
            measurement: self.config.measurement.clone(),
            tags,
            fields,
            timestamp_ns: event.received_at.saturating_mul(1_000_000_000),
        };

        self.backend.write_point(&point.to_line()).await.map_err(|e| {
            warn!(task_id = %job.task_id, task_type = %job.task_type, error = %e, "time-series write failed");
            e.to_string()
        })
    }
}

fn json_value_to_tag(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

fn json_value_to_field(value: &serde_json::Value) -> FieldValue {
    match value {
        serde_json::Value::String(s) => FieldValue::Text(s.clone()),
        serde_json::Value::Number(n) if n.is_i64() => FieldValue::Integer(n.as_i64().unwrap_or_default()),
        serde_json::Value::Number(n) => FieldValue::Float(n.as_f64().unwrap_or_default()),
        serde_json::Value::Bool(b) => FieldValue::Text(b.to_string()),
        _ => FieldValue::Text(value.to_string()),
    }
}
