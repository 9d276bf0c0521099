use super::{CategorySpec, HOSTNAME, MILLIS, MetricColumn};

pub(super) static COMMANDLOG: CategorySpec = CategorySpec {
    namespace: "voltdb_commandlog",
    labels: &[HOSTNAME],
    metrics: &[
        MetricColumn::new("OUTSTANDING_BYTES", "outstanding_bytes")
            .help("Bytes waiting to be written to the command log"),
        MetricColumn::new("OUTSTANDING_TXNS", "outstanding_txns")
            .help("Transactions waiting to be written to the command log"),
        MetricColumn::new("IN_USE_SEGMENT_COUNT", "in_use_segments")
            .help("Command log segments currently in use"),
        MetricColumn::new("SEGMENT_COUNT", "segments").help("Command log segments on disk"),
        MetricColumn::new("FSYNC_INTERVAL", "fsync_interval")
            .unit("seconds")
            .scale(MILLIS)
            .help("Average interval between command log fsyncs"),
    ],
};
