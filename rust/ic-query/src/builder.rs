//! C9: Query Builder.
//!
//! Builds a cursor-paginated, filter-validated, date-bounded Flux-style
//! query string against a configured measurement, per §4.9. One
//! `QueryBuilder` is instantiated per entity (`user_activities`,
//! `security_events`, `transaction_events`, `callback_logs`), configured
//! with its measurement name, valid tag/field sets, projection, and
//! count/unique columns.

use std::collections::HashSet;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{QueryBuilderError, QueryBuilderResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Next,
    Prev,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Filter {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

/// §6 pagination request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationRequest {
    pub length: usize,
    #[serde(default)]
    pub cursor: Option<String>,
    pub direction: Direction,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub range: Option<DateRange>,
}

/// §6 pagination response metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationInfo {
    pub length: usize,
    pub has_next: bool,
    pub has_prev: bool,
    pub next_cursor: Option<String>,
    pub prev_cursor: Option<String>,
    pub direction: Direction,
    pub total: i64,
}

/// A single time-series row after the backend pivots fields onto `_time`.
/// §9 design notes: tolerate three numeric physical types per field and
/// treat the sentinel tag value `"-"` as absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Row {
    pub time: String,
    #[serde(flatten)]
    pub fields: std::collections::HashMap<String, FieldValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    /// Normalizes the sentinel absent-tag value `"-"` to `None`.
    pub fn as_present_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) if s == "-" => None,
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Per-entity query configuration (§4.9).
#[derive(Debug, Clone)]
pub struct EntityConfig {
    pub measurement: String,
    pub valid_tags: HashSet<String>,
    pub valid_fields: HashSet<String>,
    pub projection: Vec<String>,
    pub count_field: String,
    pub unique_tag: String,
}

/// C9: the configured query builder for one entity.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    bucket: String,
    config: EntityConfig,
}

impl QueryBuilder {
    pub fn new(bucket: impl Into<String>, config: EntityConfig) -> Self {
        Self {
            bucket: bucket.into(),
            config,
        }
    }

    /// `build_list_query`: validate, resolve the date range, sanitize
    /// filters, and emit a cursor-paginated query string.
    pub fn build_list_query(
        &self,
        req: &PaginationRequest,
        now: DateTime<Utc>,
    ) -> QueryBuilderResult<String> {
        validate_length(req.length)?;
        let cursor = validate_cursor(req.cursor.as_deref())?;
        let (start, end) = resolve_range(req.range.as_ref(), now)?;
        let filters = sanitize_filters(&req.filters, &self.config);

        let mut q = format!(
            "from(bucket: \"{}\")\n  |> range(start: {}, stop: {})\n  |> filter(fn: (r) => r._measurement == \"{}\")",
            escape(&self.bucket),
            start.to_rfc3339(),
            end.to_rfc3339(),
            escape(&self.config.measurement),
        );
        for (key, value) in &filters {
            q.push_str(&format!(
                "\n  |> filter(fn: (r) => r[\"{}\"] == \"{}\")",
                key, value
            ));
        }

        if let Some(cursor) = &cursor {
            let op = match req.direction {
                Direction::Next => "<",
                Direction::Prev => ">",
            };
            q.push_str(&format!(
                "\n  |> filter(fn: (r) => r._time {} time(v: \"{}\"))",
                op,
                cursor.to_rfc3339()
            ));
        }

        q.push_str("\n  |> pivot(rowKey: [\"_time\"], columnKey: [\"_field\"], valueColumn: \"_value\")");

        let desc = matches!(req.direction, Direction::Next);
        q.push_str(&format!("\n  |> sort(columns: [\"_time\"], desc: {desc})"));

        if cursor.is_none() {
            let limit = (req.length as i64 * 10).clamp(50, 1000);
            q.push_str(&format!("\n  |> limit(n: {limit})"));
        }

        if !self.config.projection.is_empty() {
            let cols: Vec<String> = self
                .config
                .projection
                .iter()
                .map(|c| format!("\"{c}\""))
                .collect();
            q.push_str(&format!("\n  |> keep(columns: [\"_time\", {}])", cols.join(", ")));
        }

        Ok(q)
    }

    /// `build_count_query`: unbounded count of distinct values of the
    /// configured count field over the same filters/range.
    pub fn build_count_query(
        &self,
        req: &PaginationRequest,
        now: DateTime<Utc>,
    ) -> QueryBuilderResult<String> {
        let (start, end) = resolve_range(req.range.as_ref(), now)?;
        let filters = sanitize_filters(&req.filters, &self.config);

        let mut q = format!(
            "from(bucket: \"{}\")\n  |> range(start: {}, stop: {})\n  |> filter(fn: (r) => r._measurement == \"{}\")\n  |> filter(fn: (r) => r._field == \"{}\")",
            escape(&self.bucket),
            start.to_rfc3339(),
            end.to_rfc3339(),
            escape(&self.config.measurement),
            escape(&self.config.count_field),
        );
        for (key, value) in &filters {
            q.push_str(&format!(
                "\n  |> filter(fn: (r) => r[\"{}\"] == \"{}\")",
                key, value
            ));
        }
        q.push_str("\n  |> distinct(column: \"_value\")\n  |> count()");
        Ok(q)
    }

    /// `build_detail_query`: scans `[timestamp - 1min, timestamp + 1min]`
    /// filtering the unique column, returns the single matching row.
    pub fn build_detail_query(
        &self,
        timestamp: &DateTime<Utc>,
        value: &str,
    ) -> String {
        let start = *timestamp - Duration::minutes(1);
        let end = *timestamp + Duration::minutes(1);
        format!(
            "from(bucket: \"{}\")\n  |> range(start: {}, stop: {})\n  |> filter(fn: (r) => r._measurement == \"{}\")\n  |> filter(fn: (r) => r[\"{}\"] == \"{}\")\n  |> pivot(rowKey: [\"_time\"], columnKey: [\"_field\"], valueColumn: \"_value\")\n  |> limit(n: 1)",
            escape(&self.bucket),
            start.to_rfc3339(),
            end.to_rfc3339(),
            escape(&self.config.measurement),
            escape(&self.config.unique_tag),
            escape_value(value),
        )
    }

    /// `pagination_info`: derives page metadata from the trimmed result
    /// set. Cursors are absent when `results` is empty.
    pub fn pagination_info(
        &self,
        req: &PaginationRequest,
        results: &[Row],
        total: i64,
    ) -> PaginationInfo {
        let has_next = results.len() == req.length;
        let has_prev = req.cursor.is_some();
        let (next_cursor, prev_cursor) = if results.is_empty() {
            (None, None)
        } else {
            (
                Some(results.last().unwrap().time.clone()),
                Some(results.first().unwrap().time.clone()),
            )
        };
        PaginationInfo {
            length: results.len(),
            has_next,
            has_prev,
            next_cursor,
            prev_cursor,
            direction: req.direction,
            total,
        }
    }
}

fn validate_length(length: usize) -> QueryBuilderResult<()> {
    if (1..=100).contains(&length) {
        Ok(())
    } else {
        Err(QueryBuilderError::InvalidLength)
    }
}

fn validate_cursor(cursor: Option<&str>) -> QueryBuilderResult<Option<DateTime<Utc>>> {
    match cursor {
        None => Ok(None),
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|_| QueryBuilderError::InvalidCursor),
    }
}

fn parse_date(s: &str) -> QueryBuilderResult<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| QueryBuilderError::InvalidDateFormat)
}

/// §4.9 date-range resolution.
fn resolve_range(
    range: Option<&DateRange>,
    now: DateTime<Utc>,
) -> QueryBuilderResult<(DateTime<Utc>, DateTime<Utc>)> {
    let start = range.and_then(|r| r.start.as_deref());
    let end = range.and_then(|r| r.end.as_deref());

    match (start, end) {
        (Some(start), Some(end)) => {
            let start_date = parse_date(start)?;
            let end_date = parse_date(end)?;
            if start_date > end_date {
                return Err(QueryBuilderError::StartAfterEnd);
            }
            Ok((day_start(start_date), day_end(end_date)))
        }
        (Some(start), None) => {
            let date = parse_date(start)?;
            Ok((day_start(date), day_end(date)))
        }
        (None, Some(end)) => {
            let date = parse_date(end)?;
            Ok((day_start(date), day_end(date)))
        }
        (None, None) => Ok((now - Duration::days(7), now)),
    }
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap())
}

fn day_end(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(23, 59, 59).unwrap())
}

/// §4.9 filter sanitization: lowercase+trim key, keep only valid
/// tags/fields, escape embedded quotes in the value.
fn sanitize_filters(filters: &[Filter], config: &EntityConfig) -> Vec<(String, String)> {
    filters
        .iter()
        .filter_map(|f| {
            let key = f.key.trim().to_lowercase();
            if config.valid_tags.contains(&key) || config.valid_fields.contains(&key) {
                Some((key, escape_value(&f.value)))
            } else {
                None
            }
        })
        .collect()
}

fn escape_value(value: &str) -> String {
    value.replace('"', "\\\"")
}

fn escape(value: &str) -> String {
    value.replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EntityConfig {
        let mut valid_tags = HashSet::new();
        valid_tags.insert("status".to_string());
        valid_tags.insert("request_id".to_string());
        EntityConfig {
            measurement: "user_activities".to_string(),
            valid_tags,
            valid_fields: HashSet::new(),
            projection: vec!["status".to_string()],
            count_field: "request_id".to_string(),
            unique_tag: "request_id".to_string(),
        }
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-20T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn s4_scenario_range_filter_and_limit() {
        let builder = QueryBuilder::new("b", config());
        let req = PaginationRequest {
            length: 25,
            cursor: None,
            direction: Direction::Next,
            filters: vec![Filter {
                key: "status".to_string(),
                value: "success".to_string(),
            }],
            range: Some(DateRange {
                start: Some("2024-01-15".to_string()),
                end: Some("2024-01-16".to_string()),
            }),
        };
        let query = builder.build_list_query(&req, now()).unwrap();
        assert!(query.contains("2024-01-15T00:00:00+00:00"));
        assert!(query.contains("2024-01-16T23:59:59+00:00"));
        assert!(query.contains("r[\"status\"] == \"success\""));
        assert!(query.contains("limit(n: 250)"));
        assert!(query.contains("desc: true"));
    }

    #[test]
    fn invalid_filters_are_dropped_silently() {
        let builder = QueryBuilder::new("b", config());
        let req = PaginationRequest {
            length: 10,
            cursor: None,
            direction: Direction::Next,
            filters: vec![Filter {
                key: "not-a-real-field".to_string(),
                value: "x".to_string(),
            }],
            range: None,
        };
        let query = builder.build_list_query(&req, now()).unwrap();
        assert!(!query.contains("not-a-real-field"));
    }

    #[test]
    fn cursor_adds_time_bound_and_no_limit() {
        let builder = QueryBuilder::new("b", config());
        let req = PaginationRequest {
            length: 10,
            cursor: Some("2024-01-15T10:00:00Z".to_string()),
            direction: Direction::Prev,
            filters: vec![],
            range: None,
        };
        let query = builder.build_list_query(&req, now()).unwrap();
        assert!(query.contains("r._time > time"));
        assert!(!query.contains("limit(n:"));
        assert!(query.contains("desc: false"));
    }

    #[test]
    fn length_out_of_bounds_is_rejected() {
        let builder = QueryBuilder::new("b", config());
        let mut req = PaginationRequest {
            length: 0,
            cursor: None,
            direction: Direction::Next,
            filters: vec![],
            range: None,
        };
        assert_eq!(
            builder.build_list_query(&req, now()),
            Err(QueryBuilderError::InvalidLength)
        );
        req.length = 101;
        assert_eq!(
            builder.build_list_query(&req, now()),
            Err(QueryBuilderError::InvalidLength)
        );
    }

    #[test]
    fn start_after_end_is_rejected() {
        let builder = QueryBuilder::new("b", config());
        let req = PaginationRequest {
            length: 10,
            cursor: None,
            direction: Direction::Next,
            filters: vec![],
            range: Some(DateRange {
                start: Some("2024-01-20".to_string()),
                end: Some("2024-01-10".to_string()),
            }),
        };
        assert_eq!(
            builder.build_list_query(&req, now()),
            Err(QueryBuilderError::StartAfterEnd)
        );
    }

    #[test]
    fn no_range_defaults_to_last_7_days() {
        let builder = QueryBuilder::new("b", config());
        let req = PaginationRequest {
            length: 10,
            cursor: None,
            direction: Direction::Next,
            filters: vec![],
            range: None,
        };
        let query = builder.build_list_query(&req, now()).unwrap();
        assert!(query.contains("2024-01-13T00:00:00+00:00"));
    }

    #[test]
    fn pagination_info_empty_results_has_no_cursors() {
        let builder = QueryBuilder::new("b", config());
        let req = PaginationRequest {
            length: 10,
            cursor: None,
            direction: Direction::Next,
            filters: vec![],
            range: None,
        };
        let info = builder.pagination_info(&req, &[], 0);
        assert!(!info.has_next);
        assert!(!info.has_prev);
        assert_eq!(info.next_cursor, None);
        assert_eq!(info.prev_cursor, None);
    }

    #[test]
    fn pagination_info_has_next_when_full_page() {
        let builder = QueryBuilder::new("b", config());
        let req = PaginationRequest {
            length: 2,
            cursor: Some("2024-01-01T00:00:00Z".to_string()),
            direction: Direction::Next,
            filters: vec![],
            range: None,
        };
        let mut fields = std::collections::HashMap::new();
        fields.insert("status".to_string(), FieldValue::Text("ok".to_string()));
        let rows = vec![
            Row { time: "2024-01-02T00:00:00Z".to_string(), fields: fields.clone() },
            Row { time: "2024-01-01T12:00:00Z".to_string(), fields },
        ];
        let info = builder.pagination_info(&req, &rows, 42);
        assert!(info.has_next);
        assert!(info.has_prev);
        assert_eq!(info.next_cursor.as_deref(), Some("2024-01-01T12:00:00Z"));
        assert_eq!(info.prev_cursor.as_deref(), Some("2024-01-02T00:00:00Z"));
        assert_eq!(info.total, 42);
    }

    #[test]
    fn value_quote_escaping() {
        let builder = QueryBuilder::new("b", config());
        let req = PaginationRequest {
            length: 10,
            cursor: None,
            direction: Direction::Next,
            filters: vec![Filter {
                key: "status".to_string(),
                value: "a\"b".to_string(),
            }],
            range: None,
        };
        let query = builder.build_list_query(&req, now()).unwrap();
        assert!(query.contains(r#"a\"b"#));
    }
}
