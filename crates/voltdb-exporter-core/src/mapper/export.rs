//! Export stream statistics, one row per stream, partition and target.

use super::{CategorySpec, HOSTNAME, LabelColumn, MILLIS, MetricColumn, ValueKind};

pub(super) static EXPORT: CategorySpec = CategorySpec {
    namespace: "voltdb_export",
    labels: &[
        HOSTNAME,
        LabelColumn::new("partitionid", "PARTITION_ID"),
        LabelColumn::new("source", "SOURCE"),
        LabelColumn::new("target", "TARGET"),
    ],
    metrics: &[
        MetricColumn::new("TUPLE_COUNT", "total_queued_tuples_count")
            .help("Tuples queued to the export stream since startup"),
        MetricColumn::new("TUPLE_PENDING", "pending_tuples_count")
            .help("Tuples not yet acknowledged by the export target"),
        MetricColumn::new("LAST_QUEUED_TIMESTAMP", "last_queued_timestamp")
            .kind(ValueKind::Timestamp)
            .help("Time the last tuple was queued, microseconds since epoch"),
        MetricColumn::new("LAST_ACKED_TIMESTAMP", "last_acked_timestamp")
            .kind(ValueKind::Timestamp)
            .help("Time the last tuple was acknowledged, microseconds since epoch"),
        MetricColumn::new("AVERAGE_LATENCY", "avg_latency")
            .unit("seconds")
            .scale(MILLIS)
            .help("Average export latency"),
        MetricColumn::new("MAX_LATENCY", "max_latency")
            .unit("seconds")
            .scale(MILLIS)
            .help("Maximum export latency"),
        MetricColumn::new("QUEUE_GAP", "missing_tuples_count")
            .help("Tuples missing from the export queue"),
    ],
};
