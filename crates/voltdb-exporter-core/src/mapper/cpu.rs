use super::{CategorySpec, HOSTNAME, MetricColumn};

pub(super) static CPU: CategorySpec = CategorySpec {
    namespace: "voltdb_cpu",
    labels: &[HOSTNAME],
    metrics: &[MetricColumn::new("PERCENT_USED", "usage_percent")
        .help("Host CPU usage as a percentage")],
};
