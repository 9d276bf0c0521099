use super::{CategorySpec, HOSTNAME, LabelColumn, MICROS, MetricColumn};

pub(super) const SITE_ID: LabelColumn = LabelColumn::new("siteid", "SITE_ID");

pub(super) const QUEUE_METRICS: &[MetricColumn] = &[
    MetricColumn::new("CURRENT_DEPTH", "depth").help("Tasks waiting in the site queue"),
    MetricColumn::new("POLL_COUNT", "poll_count").help("Tasks taken from the site queue"),
    MetricColumn::new("AVG_WAIT", "avg_wait")
        .unit("seconds")
        .scale(MICROS)
        .help("Average time a task waited in the queue"),
    MetricColumn::new("MAX_WAIT", "max_wait")
        .unit("seconds")
        .scale(MICROS)
        .help("Longest time a task waited in the queue"),
];

pub(super) static QUEUE: CategorySpec = CategorySpec {
    namespace: "voltdb_queue",
    labels: &[HOSTNAME, SITE_ID],
    metrics: QUEUE_METRICS,
};
