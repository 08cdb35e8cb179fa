//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Hold the schema of every counter the service declares
//! - Increment labeled counters from concurrent requests
//! - Seed process-level metrics once at startup
//! - Render everything in the Prometheus text exposition format
//!
//! # Metrics
//! - `http_requests_total` (counter): completed requests by method, route, status_code
//! - `process_start_time_seconds` (gauge): unix time the registry was seeded
//! - `app_build_info` (gauge): always 1, labeled with the crate version
//!
//! # Design Decisions
//! - Owned instance passed through `AppState`; the global `metrics`
//!   recorder is never installed
//! - Sample storage lives in a `PrometheusRecorder`, whose counters are atomics
//! - The schema table only changes at registration time, so the hot path
//!   takes a read lock
//! - Export output is normalized: families sorted by name, samples sorted
//!   within a family

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use std::time::{SystemTime, UNIX_EPOCH};

use metrics::{Key, Label, Level, Metadata, Recorder};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};

/// Counter incremented once per completed request.
pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";

/// Labels of [`HTTP_REQUESTS_TOTAL`], in exposition order.
pub const HTTP_REQUEST_LABELS: [&str; 3] = ["method", "route", "status_code"];

const PROCESS_START_TIME: &str = "process_start_time_seconds";
const BUILD_INFO: &str = "app_build_info";

static METADATA: Metadata<'static> =
    Metadata::new(module_path!(), Level::INFO, Some(module_path!()));

/// Errors raised by registry misuse. These are programmer errors and are
/// expected to surface at startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("metric `{0}` is already registered")]
    DuplicateMetric(String),

    #[error("metric `{name}` expects labels {expected:?}, got {actual:?}")]
    LabelMismatch {
        name: String,
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("metric `{0}` is not registered")]
    UnknownMetric(String),
}

/// Declaration of a counter and the label names every sample must carry.
#[derive(Debug, Clone)]
pub struct CounterDefinition {
    name: String,
    help: String,
    label_names: Vec<String>,
}

impl CounterDefinition {
    pub fn new(name: impl Into<String>, help: impl Into<String>, label_names: &[&str]) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            label_names: label_names.iter().map(|l| l.to_string()).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }

    /// Order `values` by the declared label names, rejecting missing,
    /// unknown or repeated labels.
    fn resolve_labels(&self, values: &[(&str, &str)]) -> Result<Vec<Label>, RegistryError> {
        let mismatch = || RegistryError::LabelMismatch {
            name: self.name.clone(),
            expected: self.label_names.clone(),
            actual: values.iter().map(|(k, _)| k.to_string()).collect(),
        };

        if values.len() != self.label_names.len() {
            return Err(mismatch());
        }

        self.label_names
            .iter()
            .map(|label| {
                let mut matching = values.iter().filter(|(k, _)| *k == label.as_str());
                match (matching.next(), matching.next()) {
                    (Some((_, v)), None) => Ok(Label::new(label.clone(), v.to_string())),
                    _ => Err(mismatch()),
                }
            })
            .collect()
    }
}

/// Process-wide collection of labeled counters.
pub struct MetricRegistry {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
    counters: RwLock<BTreeMap<String, CounterDefinition>>,
    defaults_seeded: AtomicBool,
}

impl MetricRegistry {
    pub fn new() -> Self {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        Self {
            recorder,
            handle,
            counters: RwLock::new(BTreeMap::new()),
            defaults_seeded: AtomicBool::new(false),
        }
    }

    /// Registry with the request counter already declared.
    pub fn with_http_metrics() -> Result<Self, RegistryError> {
        let registry = Self::new();
        registry.register(CounterDefinition::new(
            HTTP_REQUESTS_TOTAL,
            "Total number of completed HTTP requests",
            &HTTP_REQUEST_LABELS,
        ))?;
        Ok(registry)
    }

    /// Declare a counter. Fails if the name is taken.
    pub fn register(&self, definition: CounterDefinition) -> Result<(), RegistryError> {
        let mut counters = self.counters.write().expect("metric schema lock poisoned");
        if counters.contains_key(&definition.name) {
            return Err(RegistryError::DuplicateMetric(definition.name));
        }

        self.recorder.describe_counter(
            definition.name.clone().into(),
            None,
            definition.help.clone().into(),
        );
        tracing::debug!(metric = %definition.name, labels = ?definition.label_names, "Counter registered");
        counters.insert(definition.name.clone(), definition);
        Ok(())
    }

    /// Add one to the sample identified by `label_values`, creating it at 1.
    pub fn increment(&self, name: &str, label_values: &[(&str, &str)]) -> Result<(), RegistryError> {
        let labels = {
            let counters = self.counters.read().expect("metric schema lock poisoned");
            let definition = counters
                .get(name)
                .ok_or_else(|| RegistryError::UnknownMetric(name.to_string()))?;
            definition.resolve_labels(label_values)?
        };

        let key = Key::from_parts(name.to_string(), labels);
        self.recorder.register_counter(&key, &METADATA).increment(1);
        Ok(())
    }

    /// Seed process metrics. Only the first call has any effect.
    pub fn collect_default(&self) {
        if self.defaults_seeded.swap(true, Ordering::SeqCst) {
            return;
        }

        let started = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64();

        self.recorder.describe_gauge(
            PROCESS_START_TIME.into(),
            None,
            "Start time of the process since unix epoch in seconds".into(),
        );
        self.recorder
            .register_gauge(&Key::from_name(PROCESS_START_TIME), &METADATA)
            .set(started);

        self.recorder.describe_gauge(
            BUILD_INFO.into(),
            None,
            "Build information, value is always 1".into(),
        );
        let build_key = Key::from_parts(
            BUILD_INFO,
            vec![Label::new("version", env!("CARGO_PKG_VERSION"))],
        );
        self.recorder.register_gauge(&build_key, &METADATA).set(1.0);
    }

    /// Render all metrics in the text exposition format.
    ///
    /// Read-only; may run concurrently with [`increment`](Self::increment).
    pub fn export(&self) -> String {
        let rendered = self.handle.render();
        let counters = self.counters.read().expect("metric schema lock poisoned");
        normalize_exposition(&rendered, &counters)
    }
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default)]
struct Family {
    header: Vec<String>,
    samples: Vec<String>,
}

/// Group rendered lines into families and order them deterministically.
/// Registered counters always get a header, even with no samples yet.
fn normalize_exposition(rendered: &str, counters: &BTreeMap<String, CounterDefinition>) -> String {
    let mut families: BTreeMap<String, Family> = BTreeMap::new();

    for definition in counters.values() {
        families.insert(
            definition.name.clone(),
            Family {
                header: vec![
                    format!("# HELP {} {}", definition.name, escape_help(&definition.help)),
                    format!("# TYPE {} counter", definition.name),
                ],
                samples: Vec::new(),
            },
        );
    }

    for line in rendered.lines().map(str::trim_end).filter(|l| !l.is_empty()) {
        let header = line
            .strip_prefix("# HELP ")
            .or_else(|| line.strip_prefix("# TYPE "));

        if let Some(rest) = header {
            let name = rest.split_whitespace().next().unwrap_or_default();
            if counters.contains_key(name) {
                continue;
            }
            families.entry(name.to_string()).or_default().header.push(line.to_string());
        } else if !line.starts_with('#') {
            let name = sample_family(line, &families);
            families.entry(name).or_default().samples.push(line.to_string());
        }
    }

    let mut output = String::new();
    for family in families.values_mut() {
        family.samples.sort();
        for line in family.header.iter().chain(family.samples.iter()) {
            output.push_str(line);
            output.push('\n');
        }
        output.push('\n');
    }
    output
}

fn sample_family(line: &str, families: &BTreeMap<String, Family>) -> String {
    let end = line.find(['{', ' ']).unwrap_or(line.len());
    let name = &line[..end];
    if families.contains_key(name) {
        return name.to_string();
    }
    ["_bucket", "_sum", "_count"]
        .iter()
        .filter_map(|suffix| name.strip_suffix(suffix))
        .find(|base| families.contains_key(*base))
        .unwrap_or(name)
        .to_string()
}

fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn sample(export: &str, prefix: &str) -> Option<u64> {
        export
            .lines()
            .find(|l| l.starts_with(prefix))
            .and_then(|l| l.rsplit(' ').next())
            .and_then(|v| v.parse().ok())
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let registry = MetricRegistry::with_http_metrics().unwrap();
        let err = registry
            .register(CounterDefinition::new(HTTP_REQUESTS_TOTAL, "again", &["method"]))
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateMetric(HTTP_REQUESTS_TOTAL.into()));
    }

    #[test]
    fn test_label_mismatch_is_rejected() {
        let registry = MetricRegistry::with_http_metrics().unwrap();

        let missing = registry.increment(HTTP_REQUESTS_TOTAL, &[("method", "GET"), ("route", "/")]);
        assert!(matches!(missing, Err(RegistryError::LabelMismatch { .. })));

        let unknown = registry.increment(
            HTTP_REQUESTS_TOTAL,
            &[("method", "GET"), ("route", "/"), ("path", "/x")],
        );
        assert!(matches!(unknown, Err(RegistryError::LabelMismatch { .. })));

        let repeated = registry.increment(
            HTTP_REQUESTS_TOTAL,
            &[("method", "GET"), ("method", "POST"), ("route", "/")],
        );
        assert!(matches!(repeated, Err(RegistryError::LabelMismatch { .. })));

        assert_eq!(
            registry.increment("nope_total", &[]),
            Err(RegistryError::UnknownMetric("nope_total".into()))
        );
    }

    #[test]
    fn test_increment_creates_and_accumulates() {
        let registry = MetricRegistry::with_http_metrics().unwrap();
        let labels = [("route", "/tasks"), ("status_code", "200"), ("method", "GET")];

        registry.increment(HTTP_REQUESTS_TOTAL, &labels).unwrap();
        let export = registry.export();
        let prefix = r#"http_requests_total{method="GET",route="/tasks",status_code="200"}"#;
        assert_eq!(sample(&export, prefix), Some(1));

        registry.increment(HTTP_REQUESTS_TOTAL, &labels).unwrap();
        assert_eq!(sample(&registry.export(), prefix), Some(2));
    }

    #[test]
    fn test_export_lists_registered_counter_without_samples() {
        let registry = MetricRegistry::with_http_metrics().unwrap();
        let export = registry.export();
        assert!(export.contains("# TYPE http_requests_total counter"));
        assert!(export.contains("# HELP http_requests_total Total number of completed HTTP requests"));
    }

    #[test]
    fn test_export_order_is_deterministic() {
        let registry = MetricRegistry::with_http_metrics().unwrap();
        registry
            .register(CounterDefinition::new("a_events_total", "Events", &["kind"]))
            .unwrap();
        registry.collect_default();

        for route in ["/z", "/a", "/m"] {
            registry
                .increment(
                    HTTP_REQUESTS_TOTAL,
                    &[("method", "GET"), ("route", route), ("status_code", "200")],
                )
                .unwrap();
        }
        registry.increment("a_events_total", &[("kind", "x")]).unwrap();

        let first = registry.export();
        assert_eq!(first, registry.export());

        let a = first.find("a_events_total{").unwrap();
        let b = first.find("app_build_info{").unwrap();
        let h = first.find("http_requests_total{").unwrap();
        let p = first.find("process_start_time_seconds ").unwrap();
        assert!(a < b && b < h && h < p);

        let routes: Vec<_> = first
            .lines()
            .filter(|l| l.starts_with("http_requests_total{"))
            .collect();
        let mut sorted = routes.clone();
        sorted.sort();
        assert_eq!(routes, sorted);
    }

    #[test]
    fn test_collect_default_is_idempotent() {
        let registry = MetricRegistry::new();
        registry.collect_default();
        registry.collect_default();
        let export = registry.export();
        assert_eq!(export.matches("# TYPE process_start_time_seconds gauge").count(), 1);
        assert!(export.contains(&format!(
            r#"app_build_info{{version="{}"}}"#,
            env!("CARGO_PKG_VERSION")
        )));
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let registry = Arc::new(MetricRegistry::with_http_metrics().unwrap());
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for _ in 0..1_000 {
                        registry
                            .increment(
                                HTTP_REQUESTS_TOTAL,
                                &[("method", "GET"), ("route", "/health"), ("status_code", "200")],
                            )
                            .unwrap();
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        let prefix = r#"http_requests_total{method="GET",route="/health",status_code="200"}"#;
        assert_eq!(sample(&registry.export(), prefix), Some(8_000));
    }
}
