//! Site idle time. `PERCENT` is a fraction in `[0, 1]` despite its name.

use super::{CategorySpec, HOSTNAME, LabelColumn, MICROS, MetricColumn, ValueKind};

pub(super) static IDLETIME: CategorySpec = CategorySpec {
    namespace: "voltdb_idletime",
    labels: &[HOSTNAME, LabelColumn::new("siteid", "SITE_ID")],
    metrics: &[
        MetricColumn::new("COUNT", "queue_empty_count")
            .help("Times the site found its queue empty"),
        MetricColumn::new("PERCENT", "idle_ratio")
            .kind(ValueKind::Float)
            .help("Fraction of time the site was idle"),
        MetricColumn::new("AVG", "avg_wait_time")
            .unit("seconds")
            .scale(MICROS)
            .help("Average idle wait"),
        MetricColumn::new("MIN", "min_wait_time")
            .unit("seconds")
            .scale(MICROS)
            .help("Minimum idle wait"),
        MetricColumn::new("MAX", "max_wait_time")
            .unit("seconds")
            .scale(MICROS)
            .help("Maximum idle wait"),
        MetricColumn::new("STDDEV", "stddev_wait_time")
            .unit("seconds")
            .scale(MICROS)
            .help("Standard deviation of idle wait"),
    ],
};
