//! Statistics → metric mapping.
//!
//! Each `@Statistics` selector has a static [`CategorySpec`] in its own module
//! declaring:
//! - the namespace (`voltdb_<selector>`) that prefixes every metric name
//! - label columns, whose values identify a series (`hostname`, `siteid`, ...)
//! - metric columns, with key, optional unit suffix, scale and value kind
//!
//! A [`StatsMapper`] is built from a spec once at startup. It registers the
//! category's gauges and decodes result tables into registry updates.
//!
//! Metric names are `<namespace>_<key>[_<unit>]`. Units follow Prometheus
//! base units, so VoltDB's milliseconds/microseconds/nanoseconds and
//! kilobytes are scaled to seconds and bytes when read.

mod commandlog;
mod cpu;
mod export;
mod gc;
mod idletime;
mod index;
mod initiator;
mod iostats;
mod latency;
mod liveclients;
mod memory;
mod procedure;
mod queue;
mod queuepriority;
mod table;

use tracing::debug;

use crate::category::StatsCategory;
use crate::client::{StatsTable, Value};
use crate::registry::{MetricRegistry, RegistryError};

/// Milliseconds → seconds.
pub const MILLIS: f64 = 0.001;
/// Microseconds → seconds.
pub const MICROS: f64 = 0.000_001;
/// Nanoseconds → seconds.
pub const NANOS: f64 = 0.000_000_001;
/// Kilobytes → bytes.
pub const KILOBYTES: f64 = 1024.0;

/// How a raw column is read before scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Integer,
    Float,
    /// Timestamp column, reported as its integer epoch (microseconds).
    Timestamp,
}

#[derive(Debug, Clone, Copy)]
pub struct LabelColumn {
    pub label: &'static str,
    pub column: &'static str,
}

impl LabelColumn {
    pub const fn new(label: &'static str, column: &'static str) -> Self {
        Self { label, column }
    }
}

/// The `HOSTNAME` label every statistics table carries.
pub(crate) const HOSTNAME: LabelColumn = LabelColumn::new("hostname", "HOSTNAME");

#[derive(Debug, Clone, Copy)]
pub struct MetricColumn {
    pub column: &'static str,
    pub key: &'static str,
    pub unit: Option<&'static str>,
    pub scale: f64,
    pub kind: ValueKind,
    pub help: &'static str,
}

impl MetricColumn {
    pub const fn new(column: &'static str, key: &'static str) -> Self {
        Self {
            column,
            key,
            unit: None,
            scale: 1.0,
            kind: ValueKind::Integer,
            help: "",
        }
    }

    pub const fn unit(self, unit: &'static str) -> Self {
        Self {
            unit: Some(unit),
            ..self
        }
    }

    pub const fn scale(self, scale: f64) -> Self {
        Self { scale, ..self }
    }

    pub const fn kind(self, kind: ValueKind) -> Self {
        Self { kind, ..self }
    }

    pub const fn help(self, help: &'static str) -> Self {
        Self { help, ..self }
    }
}

/// Static declaration of one category.
#[derive(Debug)]
pub struct CategorySpec {
    pub namespace: &'static str,
    pub labels: &'static [LabelColumn],
    pub metrics: &'static [MetricColumn],
}

impl StatsCategory {
    pub fn spec(self) -> &'static CategorySpec {
        match self {
            StatsCategory::CommandLog => &commandlog::COMMANDLOG,
            StatsCategory::Cpu => &cpu::CPU,
            StatsCategory::Export => &export::EXPORT,
            StatsCategory::Gc => &gc::GC,
            StatsCategory::Idletime => &idletime::IDLETIME,
            StatsCategory::Index => &index::INDEX,
            StatsCategory::Initiator => &initiator::INITIATOR,
            StatsCategory::IoStats => &iostats::IOSTATS,
            StatsCategory::Latency => &latency::LATENCY,
            StatsCategory::LiveClients => &liveclients::LIVECLIENTS,
            StatsCategory::Memory => &memory::MEMORY,
            StatsCategory::Procedure => &procedure::PROCEDURE,
            StatsCategory::Queue => &queue::QUEUE,
            StatsCategory::QueuePriority => &queuepriority::QUEUEPRIORITY,
            StatsCategory::Table => &table::TABLE,
        }
    }
}

/// Builds `<namespace>_<key>[_<unit>]`.
pub fn metric_name(namespace: &str, key: &str, unit: Option<&str>) -> String {
    match unit {
        Some(unit) => format!("{}_{}_{}", namespace, key, unit),
        None => format!("{}_{}", namespace, key),
    }
}

/// Error type for category-level decode failures.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// The response carried no result table.
    MissingTable { category: StatsCategory },
    /// A declared column is not in the table schema.
    MissingColumn {
        category: StatsCategory,
        column: &'static str,
    },
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::MissingTable { category } => {
                write!(f, "{}: response has no result table", category)
            }
            DecodeError::MissingColumn { category, column } => {
                write!(f, "{}: column {} not found", category, column)
            }
        }
    }
}

impl std::error::Error for DecodeError {}

#[derive(Debug)]
struct MappedMetric {
    name: String,
    column: &'static MetricColumn,
}

/// Decoder for one category.
#[derive(Debug)]
pub struct StatsMapper {
    category: StatsCategory,
    spec: &'static CategorySpec,
    label_names: Vec<&'static str>,
    metrics: Vec<MappedMetric>,
}

impl StatsMapper {
    pub fn new(category: StatsCategory) -> Self {
        let spec = category.spec();
        let metrics = spec
            .metrics
            .iter()
            .map(|column| MappedMetric {
                name: metric_name(spec.namespace, column.key, column.unit),
                column,
            })
            .collect();
        Self {
            category,
            spec,
            label_names: spec.labels.iter().map(|l| l.label).collect(),
            metrics,
        }
    }

    pub fn category(&self) -> StatsCategory {
        self.category
    }

    pub fn label_names(&self) -> &[&'static str] {
        &self.label_names
    }

    pub fn metric_names(&self) -> impl Iterator<Item = &str> {
        self.metrics.iter().map(|m| m.name.as_str())
    }

    /// Registers every metric of this category.
    pub fn register(&self, registry: &MetricRegistry) -> Result<(), RegistryError> {
        for metric in &self.metrics {
            registry.register(&metric.name, &self.label_names, metric.column.help)?;
        }
        debug!(category = %self.category, metrics = self.metrics.len(), "registered category");
        Ok(())
    }

    /// Pushes every row of the first result table into the registry.
    ///
    /// A row with a null or mistyped cell is skipped on its own; a schema
    /// that lacks a declared column fails the whole category. Returns the
    /// number of values recorded.
    pub fn decode(
        &self,
        tables: &[StatsTable],
        registry: &MetricRegistry,
    ) -> Result<usize, DecodeError> {
        let table = tables.first().ok_or(DecodeError::MissingTable {
            category: self.category,
        })?;

        let label_idx = self
            .spec
            .labels
            .iter()
            .map(|l| self.column_index(table, l.column))
            .collect::<Result<Vec<_>, _>>()?;
        let metric_idx = self
            .metrics
            .iter()
            .map(|m| self.column_index(table, m.column.column))
            .collect::<Result<Vec<_>, _>>()?;

        let mut reported = 0;
        let mut skipped = 0;
        let mut values = Vec::with_capacity(self.metrics.len());

        for (row_no, row) in table.rows.iter().enumerate() {
            let Some(labels) = label_idx
                .iter()
                .map(|&i| row.get(i).and_then(Value::as_label))
                .collect::<Option<Vec<String>>>()
            else {
                debug!(category = %self.category, row = row_no, "null label value, row skipped");
                skipped += 1;
                continue;
            };

            values.clear();
            let mut bad_column = None;
            for (metric, &i) in self.metrics.iter().zip(&metric_idx) {
                match row.get(i).and_then(|v| read_value(v, metric.column.kind)) {
                    Some(raw) => values.push(raw * metric.column.scale),
                    None => {
                        bad_column = Some(metric.column.column);
                        break;
                    }
                }
            }
            if let Some(column) = bad_column {
                debug!(category = %self.category, row = row_no, column, "unusable value, row skipped");
                skipped += 1;
                continue;
            }

            let label_refs: Vec<&str> = labels.iter().map(String::as_str).collect();
            for (metric, value) in self.metrics.iter().zip(&values) {
                if registry.set_value(&metric.name, *value, &label_refs) {
                    reported += 1;
                }
            }
        }

        debug!(
            category = %self.category,
            rows = table.rows.len(),
            skipped,
            reported,
            "decoded statistics"
        );
        Ok(reported)
    }

    fn column_index(&self, table: &StatsTable, column: &'static str) -> Result<usize, DecodeError> {
        table
            .column_index(column)
            .ok_or(DecodeError::MissingColumn {
                category: self.category,
                column,
            })
    }
}

fn read_value(value: &Value, kind: ValueKind) -> Option<f64> {
    match kind {
        ValueKind::Integer | ValueKind::Timestamp => value.as_i64().map(|v| v as f64),
        ValueKind::Float => value.as_f64(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ColumnType;
    use std::collections::HashSet;

    fn queue_table() -> StatsTable {
        StatsTable::new(&[
            ("TIMESTAMP", ColumnType::BigInt),
            ("HOST_ID", ColumnType::Integer),
            ("HOSTNAME", ColumnType::String),
            ("SITE_ID", ColumnType::Integer),
            ("CURRENT_DEPTH", ColumnType::Integer),
            ("POLL_COUNT", ColumnType::BigInt),
            ("AVG_WAIT", ColumnType::BigInt),
            ("MAX_WAIT", ColumnType::BigInt),
        ])
    }

    fn queue_row(host: &str, site: i64, depth: i64, avg_wait: i64) -> Vec<Value> {
        vec![
            Value::Integer(1_600_000_000_000),
            Value::Integer(0),
            Value::String(host.to_string()),
            Value::Integer(site),
            Value::Integer(depth),
            Value::Integer(100),
            Value::Integer(avg_wait),
            Value::Integer(9000),
        ]
    }

    fn registered(category: StatsCategory) -> (StatsMapper, MetricRegistry) {
        let mapper = StatsMapper::new(category);
        let registry = MetricRegistry::new();
        mapper.register(&registry).unwrap();
        (mapper, registry)
    }

    #[test]
    fn metric_name_with_and_without_unit() {
        assert_eq!(metric_name("voltdb_queue", "depth", None), "voltdb_queue_depth");
        assert_eq!(
            metric_name("voltdb_queue", "avg_wait", Some("seconds")),
            "voltdb_queue_avg_wait_seconds"
        );
    }

    #[test]
    fn queue_row_is_scaled_and_labelled() {
        let (mapper, registry) = registered(StatsCategory::Queue);
        let table = queue_table().with_row(queue_row("h1", 3, 7, 2500));

        let reported = mapper.decode(&[table], &registry).unwrap();

        assert_eq!(reported, 4);
        assert_eq!(registry.value("voltdb_queue_depth", &["h1", "3"]), Some(7.0));
        let avg = registry
            .value("voltdb_queue_avg_wait_seconds", &["h1", "3"])
            .unwrap();
        assert!((avg - 0.0025).abs() < 1e-12);

        let text = registry.encode().unwrap();
        assert!(text.contains(r#"voltdb_queue_depth{hostname="h1",siteid="3"} 7"#));
        assert!(text.contains(r#"voltdb_queue_avg_wait_seconds{hostname="h1",siteid="3"} 0.0025"#));
    }

    #[test]
    fn null_cell_skips_only_that_row() {
        let (mapper, registry) = registered(StatsCategory::Queue);
        let mut bad = queue_row("h2", 4, 1, 1);
        bad[4] = Value::Null;
        let table = queue_table()
            .with_row(queue_row("h1", 3, 7, 2500))
            .with_row(bad)
            .with_row(queue_row("h3", 5, 2, 10));

        let reported = mapper.decode(&[table], &registry).unwrap();

        assert_eq!(reported, 8);
        assert_eq!(registry.value("voltdb_queue_depth", &["h3", "5"]), Some(2.0));
        assert_eq!(registry.value("voltdb_queue_poll_count", &["h2", "4"]), None);
    }

    #[test]
    fn null_label_skips_row() {
        let (mapper, registry) = registered(StatsCategory::Queue);
        let mut bad = queue_row("h2", 4, 1, 1);
        bad[2] = Value::Null;
        let table = queue_table().with_row(bad);

        assert_eq!(mapper.decode(&[table], &registry).unwrap(), 0);
        assert!(!registry.has_values());
    }

    #[test]
    fn mistyped_cell_skips_row() {
        let (mapper, registry) = registered(StatsCategory::Queue);
        let mut bad = queue_row("h2", 4, 1, 1);
        bad[6] = Value::String("soon".into());
        let table = queue_table().with_row(bad).with_row(queue_row("h1", 3, 7, 2500));

        assert_eq!(mapper.decode(&[table], &registry).unwrap(), 4);
    }

    #[test]
    fn missing_column_fails_category() {
        let (mapper, registry) = registered(StatsCategory::Queue);
        let table = StatsTable::new(&[
            ("HOSTNAME", ColumnType::String),
            ("SITE_ID", ColumnType::Integer),
            ("CURRENT_DEPTH", ColumnType::Integer),
        ]);

        let err = mapper.decode(&[table], &registry).unwrap_err();
        assert_eq!(
            err,
            DecodeError::MissingColumn {
                category: StatsCategory::Queue,
                column: "POLL_COUNT"
            }
        );
    }

    #[test]
    fn missing_table_fails_category() {
        let (mapper, registry) = registered(StatsCategory::Cpu);
        assert_eq!(
            mapper.decode(&[], &registry).unwrap_err(),
            DecodeError::MissingTable {
                category: StatsCategory::Cpu
            }
        );
    }

    #[test]
    fn idletime_ratio_keeps_fraction() {
        let (mapper, registry) = registered(StatsCategory::Idletime);
        let table = StatsTable::new(&[
            ("HOSTNAME", ColumnType::String),
            ("SITE_ID", ColumnType::Integer),
            ("COUNT", ColumnType::BigInt),
            ("PERCENT", ColumnType::Float),
            ("AVG", ColumnType::BigInt),
            ("MIN", ColumnType::BigInt),
            ("MAX", ColumnType::BigInt),
            ("STDDEV", ColumnType::BigInt),
        ])
        .with_row(vec![
            Value::String("h1".into()),
            Value::Integer(0),
            Value::Integer(12),
            Value::Float(0.875),
            Value::Integer(2_000_000),
            Value::Integer(10),
            Value::Integer(5_000_000),
            Value::Integer(1),
        ]);

        mapper.decode(&[table], &registry).unwrap();
        assert_eq!(registry.value("voltdb_idletime_idle_ratio", &["h1", "0"]), Some(0.875));
        assert_eq!(
            registry.value("voltdb_idletime_avg_wait_time_seconds", &["h1", "0"]),
            Some(2.0)
        );
    }

    #[test]
    fn export_timestamps_are_integer_epochs() {
        let (mapper, registry) = registered(StatsCategory::Export);
        let mut table = StatsTable::new(&[
            ("HOSTNAME", ColumnType::String),
            ("PARTITION_ID", ColumnType::BigInt),
            ("SOURCE", ColumnType::String),
            ("TARGET", ColumnType::String),
            ("TUPLE_COUNT", ColumnType::BigInt),
            ("TUPLE_PENDING", ColumnType::BigInt),
            ("LAST_QUEUED_TIMESTAMP", ColumnType::Timestamp),
            ("LAST_ACKED_TIMESTAMP", ColumnType::Timestamp),
            ("AVERAGE_LATENCY", ColumnType::BigInt),
            ("MAX_LATENCY", ColumnType::BigInt),
            ("QUEUE_GAP", ColumnType::BigInt),
        ]);
        table.rows.push(vec![
            Value::String("h1".into()),
            Value::Integer(2),
            Value::String("ORDERS".into()),
            Value::String("kafka".into()),
            Value::Integer(100),
            Value::Integer(4),
            Value::Integer(1_700_000_000_123_456),
            Value::Integer(1_700_000_000_000_000),
            Value::Integer(250),
            Value::Integer(1500),
            Value::Integer(0),
        ]);

        assert_eq!(mapper.decode(&[table], &registry).unwrap(), 7);
        let labels = ["h1", "2", "ORDERS", "kafka"];
        assert_eq!(
            registry.value("voltdb_export_last_queued_timestamp", &labels),
            Some(1_700_000_000_123_456.0)
        );
        assert_eq!(
            registry.value("voltdb_export_max_latency_seconds", &labels),
            Some(1.5)
        );
    }

    #[test]
    fn memory_kilobytes_become_bytes() {
        let (mapper, registry) = registered(StatsCategory::Memory);
        let spec = StatsCategory::Memory.spec();
        let mut columns = vec![("HOSTNAME", ColumnType::String)];
        columns.extend(spec.metrics.iter().map(|m| (m.column, ColumnType::BigInt)));
        let mut row = vec![Value::String("h1".into())];
        row.extend(spec.metrics.iter().map(|_| Value::Integer(2)));
        let table = StatsTable::new(&columns).with_row(row);

        mapper.decode(&[table], &registry).unwrap();
        assert_eq!(registry.value("voltdb_memory_rss_bytes", &["h1"]), Some(2048.0));
        assert_eq!(registry.value("voltdb_memory_tuplecount", &["h1"]), Some(2.0));
    }

    #[test]
    fn every_category_registers_unique_valid_names() {
        let registry = MetricRegistry::new();
        let mut seen = HashSet::new();
        for category in StatsCategory::ALL {
            let mapper = StatsMapper::new(category);
            assert!(!mapper.label_names().is_empty(), "{} has no labels", category);
            assert_eq!(mapper.label_names()[0], "hostname");
            for name in mapper.metric_names() {
                assert!(name.starts_with(category.spec().namespace));
                assert!(seen.insert(name.to_string()), "duplicate metric {}", name);
            }
            mapper.register(&registry).unwrap();
        }
        assert_eq!(registry.snapshot_names().len(), seen.len());
    }
}
