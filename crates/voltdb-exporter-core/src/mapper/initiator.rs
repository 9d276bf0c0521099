use super::{CategorySpec, HOSTNAME, LabelColumn, MILLIS, MetricColumn};

pub(super) static INITIATOR: CategorySpec = CategorySpec {
    namespace: "voltdb_initiator",
    labels: &[
        HOSTNAME,
        LabelColumn::new("cnxhostname", "CONNECTION_HOSTNAME"),
        LabelColumn::new("procname", "PROCEDURE_NAME"),
    ],
    metrics: &[
        MetricColumn::new("INVOCATIONS", "invocations")
            .help("Procedure invocations initiated by this connection"),
        MetricColumn::new("AVG_EXECUTION_TIME", "execution_time")
            .unit("seconds")
            .scale(MILLIS)
            .help("Average execution time"),
        MetricColumn::new("MIN_EXECUTION_TIME", "min_execution_time")
            .unit("seconds")
            .scale(MILLIS)
            .help("Minimum execution time"),
        MetricColumn::new("MAX_EXECUTION_TIME", "max_execution_time")
            .unit("seconds")
            .scale(MILLIS)
            .help("Maximum execution time"),
        MetricColumn::new("ABORTS", "aborts").help("Aborted invocations"),
        MetricColumn::new("FAILURES", "failures").help("Failed invocations"),
    ],
};
