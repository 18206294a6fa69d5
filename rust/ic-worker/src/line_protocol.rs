//! Minimal InfluxDB line-protocol encoder for the worker's time-series
//! writes. The exact physical on-disk format is an explicit Non-goal
//! (§1), but the worker still needs *a* wire-compatible encoding to hand
//! `ic_query::Backend::write_point` — this is the in-scope "how do tags
//! and fields get serialized" half of that boundary.
//!
//! §9 design notes: tolerate the three numeric physical field types and
//! write empty strings as the sentinel tag value `"-"` so the store's
//! non-empty-tag invariant holds.

use std::collections::BTreeMap;

/// Sentinel for an absent/empty tag value (§9).
pub const ABSENT_TAG: &str = "-";

#[derive(Debug, Clone)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

/// One point: measurement, ordered tag set, ordered field set, ns
/// timestamp. Tags are kept in a `BTreeMap` so the emitted line is
/// deterministic (useful for tests and for idempotent-looking retries).
pub struct Point {
    pub measurement: String,
    pub tags: BTreeMap<String, String>,
    pub fields: BTreeMap<String, FieldValue>,
    pub timestamp_ns: i64,
}

fn escape_tag(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
}

fn escape_field_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Replaces an empty string with the §9 absent-tag sentinel.
pub fn tag_value_or_sentinel(value: &str) -> &str {
    if value.is_empty() {
        ABSENT_TAG
    } else {
        value
    }
}

impl Point {
    pub fn to_line(&self) -> String {
        let mut line = escape_tag(&self.measurement);
        for (k, v) in &self.tags {
            line.push(',');
            line.push_str(&escape_tag(k));
            line.push('=');
            line.push_str(&escape_tag(tag_value_or_sentinel(v)));
        }
        line.push(' ');

        let field_strs: Vec<String> = self
            .fields
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    FieldValue::Integer(i) => format!("{i}i"),
                    FieldValue::Float(f) => format!("{f}"),
                    FieldValue::Text(s) => format!("\"{}\"", escape_field_string(s)),
                };
                format!("{}={}", escape_tag(k), value)
            })
            .collect();
        line.push_str(&field_strs.join(","));
        line.push(' ');
        line.push_str(&self.timestamp_ns.to_string());
        line
    }
}
