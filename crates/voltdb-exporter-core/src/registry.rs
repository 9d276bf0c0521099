//! Gauge store.
//!
//! Every exported metric is a `GaugeVec`: VoltDB already aggregates its
//! statistics, so the exporter only transfers the last reported value.
//! Counters would not work because they cannot be set, and they cannot go
//! down after a statistics reset.
//!
//! Each `MetricRegistry` owns a private `prometheus::Registry`, so exposition
//! never includes collectors registered elsewhere in the process.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};
use tracing::{debug, trace, warn};

/// Content type of the text exposition produced by [`MetricRegistry::encode`].
pub const TEXT_CONTENT_TYPE: &str = prometheus::TEXT_FORMAT;

/// Error type for registry operations.
#[derive(Debug)]
pub enum RegistryError {
    /// The name is already registered with different label names.
    SchemaConflict {
        name: String,
        existing: Vec<String>,
        requested: Vec<String>,
    },
    /// Rejected by the prometheus client (invalid name, encoding failure).
    Prometheus(prometheus::Error),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::SchemaConflict {
                name,
                existing,
                requested,
            } => write!(
                f,
                "metric {} already registered with labels {:?}, requested {:?}",
                name, existing, requested
            ),
            RegistryError::Prometheus(e) => write!(f, "prometheus: {}", e),
        }
    }
}

impl std::error::Error for RegistryError {}

impl From<prometheus::Error> for RegistryError {
    fn from(e: prometheus::Error) -> Self {
        RegistryError::Prometheus(e)
    }
}

struct RegisteredGauge {
    gauge: GaugeVec,
    label_names: Vec<String>,
}

pub struct MetricRegistry {
    registry: Registry,
    gauges: RwLock<HashMap<String, RegisteredGauge>>,
    has_values: AtomicBool,
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            gauges: RwLock::new(HashMap::new()),
            has_values: AtomicBool::new(false),
        }
    }

    /// Registers a gauge. Registering the same name and labels again is a no-op.
    pub fn register(
        &self,
        name: &str,
        label_names: &[&str],
        help: &str,
    ) -> Result<(), RegistryError> {
        let mut gauges = self.gauges.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = gauges.get(name) {
            if existing.label_names.iter().map(String::as_str).eq(label_names.iter().copied()) {
                return Ok(());
            }
            return Err(RegistryError::SchemaConflict {
                name: name.to_string(),
                existing: existing.label_names.clone(),
                requested: label_names.iter().map(|s| s.to_string()).collect(),
            });
        }

        let help = if help.is_empty() { name } else { help };
        let gauge = GaugeVec::new(Opts::new(name, help), label_names)?;
        self.registry.register(Box::new(gauge.clone()))?;
        gauges.insert(
            name.to_string(),
            RegisteredGauge {
                gauge,
                label_names: label_names.iter().map(|s| s.to_string()).collect(),
            },
        );
        debug!(metric = name, "registered metric");
        Ok(())
    }

    /// Sets the value for one label combination.
    ///
    /// Unknown metrics and label-count mismatches are logged and ignored;
    /// returns whether a value was stored.
    pub fn set_value(&self, name: &str, value: f64, label_values: &[&str]) -> bool {
        let gauges = self.gauges.read().unwrap_or_else(PoisonError::into_inner);
        let Some(entry) = gauges.get(name) else {
            debug!(metric = name, "couldn't find metric");
            return false;
        };
        if entry.label_names.len() != label_values.len() {
            warn!(
                metric = name,
                expected = entry.label_names.len(),
                got = label_values.len(),
                "label count mismatch, value dropped"
            );
            return false;
        }
        match entry.gauge.get_metric_with_label_values(label_values) {
            Ok(gauge) => {
                gauge.set(value);
                self.has_values.store(true, Ordering::Relaxed);
                trace!(metric = name, value, "metric updated");
                true
            }
            Err(e) => {
                warn!(metric = name, error = %e, "failed to set metric");
                false
            }
        }
    }

    /// Current value for a label combination, if it was ever set.
    pub fn value(&self, name: &str, label_values: &[&str]) -> Option<f64> {
        let families = self.registry.gather();
        let family = families.iter().find(|mf| mf.get_name() == name)?;
        let labels = self
            .gauges
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)?
            .label_names
            .clone();
        family
            .get_metric()
            .iter()
            .find(|m| {
                labels.iter().zip(label_values).all(|(label, expected)| {
                    m.get_label()
                        .iter()
                        .any(|p| p.get_name() == label && p.get_value() == *expected)
                })
            })
            .map(|m| m.get_gauge().get_value())
    }

    /// Names of every registered metric.
    pub fn snapshot_names(&self) -> BTreeSet<String> {
        self.gauges
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Whether any value has been recorded since the process started.
    pub fn has_values(&self) -> bool {
        self.has_values.load(Ordering::Relaxed)
    }

    /// Text exposition of the registered metrics only.
    pub fn encode(&self) -> Result<String, RegistryError> {
        let names = self.snapshot_names();
        let families: Vec<_> = self
            .registry
            .gather()
            .into_iter()
            .filter(|mf| names.contains(mf.get_name()))
            .collect();
        let mut buf = Vec::new();
        TextEncoder::new().encode(&families, &mut buf)?;
        String::from_utf8(buf)
            .map_err(|e| RegistryError::Prometheus(prometheus::Error::Msg(e.to_string())))
    }
}
