//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the logging subsystem once at startup
//! - Write one JSON object per event in the service's record shape
//! - Configure log level from config, overridable by `RUST_LOG`
//!
//! # Record shape
//! ```text
//! {"timestamp":"2026-01-01T00:00:00.000Z","level":"info","target":"http.access",
//!  "trace_id":"…","method":"GET","route":"/tasks","status":200,"message":"…"}
//! ```
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - `level` is the lowercase tracing level, or the event's `severity`
//!   field when present (the failure boundary sets `severity = "fatal"`)
//! - Span fields are merged into each event, so anything logged inside a
//!   request span carries that request's `trace_id`

use std::fmt;

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::{JsonFields, Writer};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, FormattedFields, MakeWriter};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};

/// Install the global subscriber.
pub fn init_logging(config: &ObservabilityConfig) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry.with(json_layer(std::io::stdout)).try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer().pretty()).try_init(),
    }
}

/// Formatting layer emitting [`JsonRecordFormat`] lines to `make_writer`.
pub fn json_layer<S, W>(
    make_writer: W,
) -> tracing_subscriber::fmt::Layer<S, JsonFields, JsonRecordFormat, W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + 'static,
{
    tracing_subscriber::fmt::layer()
        .fmt_fields(JsonFields::new())
        .event_format(JsonRecordFormat)
        .with_writer(make_writer)
}

/// Event formatter producing flat JSON records.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRecordFormat;

impl<S, N> FormatEvent<S, N> for JsonRecordFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();

        let mut fields = FieldCollector::default();
        event.record(&mut fields);
        let mut fields = fields.0;

        let level = match fields.remove("severity") {
            Some(Value::String(severity)) => severity,
            _ => metadata.level().as_str().to_ascii_lowercase(),
        };

        let mut record = Map::new();
        record.insert(
            "timestamp".into(),
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        record.insert("level".into(), Value::String(level));
        record.insert("target".into(), Value::String(metadata.target().to_string()));
        record.extend(fields);

        // Innermost span wins, event fields win over all spans.
        if let Some(scope) = ctx.event_scope() {
            for span in scope {
                let extensions = span.extensions();
                let Some(formatted) = extensions.get::<FormattedFields<N>>() else {
                    continue;
                };
                if let Ok(Value::Object(span_fields)) = serde_json::from_str::<Value>(formatted) {
                    for (key, value) in span_fields {
                        record.entry(key).or_insert(value);
                    }
                }
            }
        }

        let line = serde_json::to_string(&record).map_err(|_| fmt::Error)?;
        writeln!(writer, "{line}")
    }
}

#[derive(Default)]
struct FieldCollector(Map<String, Value>);

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().into(), Value::String(value.to_string()));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.0.insert(field.name().into(), value.into());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.0.insert(field.name().into(), value.into());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.0.insert(field.name().into(), value.into());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.0.insert(field.name().into(), value.into());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.0.insert(field.name().into(), Value::String(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().into(), Value::String(format!("{value:?}")));
    }
}


#[cfg(test)]
mod tests {
    use super::capture::LogCapture;

    #[test]
    fn test_event_fields_are_flattened() {
        let capture = LogCapture::default();
        tracing::subscriber::with_default(capture.subscriber(), || {
            tracing::info!(target: "http.access", trace_id = "abc", status = 200u64, "done");
        });

        let records = capture.records();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record["level"], "info");
        assert_eq!(record["target"], "http.access");
        assert_eq!(record["trace_id"], "abc");
        assert_eq!(record["status"], 200);
        assert_eq!(record["message"], "done");
        assert!(record["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_severity_overrides_level() {
        let capture = LogCapture::default();
        tracing::subscriber::with_default(capture.subscriber(), || {
            tracing::error!(severity = "fatal", "boom");
        });

        let records = capture.records();
        assert_eq!(records[0]["level"], "fatal");
        assert!(records[0].get("severity").is_none());
    }

    #[test]
    fn test_span_fields_are_inherited() {
        let capture = LogCapture::default();
        tracing::subscriber::with_default(capture.subscriber(), || {
            let span = tracing::info_span!("request", trace_id = "outer", route = "/tasks");
            let _guard = span.enter();
            tracing::warn!(route = "/override", "inside");
        });

        let record = &capture.records()[0];
        assert_eq!(record["level"], "warn");
        assert_eq!(record["trace_id"], "outer");
        assert_eq!(record["route"], "/override");
    }
}
