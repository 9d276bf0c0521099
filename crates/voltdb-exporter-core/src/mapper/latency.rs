//! Cluster-wide transaction latency percentiles over the last five seconds.

use super::{CategorySpec, HOSTNAME, MICROS, MetricColumn};

pub(super) static LATENCY: CategorySpec = CategorySpec {
    namespace: "voltdb_latency",
    labels: &[HOSTNAME],
    metrics: &[
        MetricColumn::new("TPS", "tps").help("Transactions per second"),
        MetricColumn::new("P50", "median")
            .unit("seconds")
            .scale(MICROS)
            .help("Median transaction latency"),
        MetricColumn::new("P95", "95th")
            .unit("seconds")
            .scale(MICROS)
            .help("95th percentile transaction latency"),
        MetricColumn::new("P99", "99th")
            .unit("seconds")
            .scale(MICROS)
            .help("99th percentile transaction latency"),
        MetricColumn::new("P99.9", "three_nines")
            .unit("seconds")
            .scale(MICROS)
            .help("99.9th percentile transaction latency"),
        MetricColumn::new("P99.99", "four_nines")
            .unit("seconds")
            .scale(MICROS)
            .help("99.99th percentile transaction latency"),
        MetricColumn::new("P99.999", "five_nines")
            .unit("seconds")
            .scale(MICROS)
            .help("99.999th percentile transaction latency"),
        MetricColumn::new("MAX", "max")
            .unit("seconds")
            .scale(MICROS)
            .help("Maximum transaction latency"),
    ],
};
