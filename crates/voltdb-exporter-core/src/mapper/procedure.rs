use super::{CategorySpec, HOSTNAME, LabelColumn, MetricColumn, NANOS};

pub(super) static PROCEDURE: CategorySpec = CategorySpec {
    namespace: "voltdb_procedure",
    labels: &[
        HOSTNAME,
        LabelColumn::new("partitionid", "PARTITION_ID"),
        LabelColumn::new("procedure", "PROCEDURE"),
    ],
    metrics: &[
        MetricColumn::new("INVOCATIONS", "invocations").help("Procedure invocations"),
        MetricColumn::new("MIN_EXECUTION_TIME", "min_execution_time")
            .unit("seconds")
            .scale(NANOS)
            .help("Minimum execution time"),
        MetricColumn::new("MAX_EXECUTION_TIME", "max_execution_time")
            .unit("seconds")
            .scale(NANOS)
            .help("Maximum execution time"),
        MetricColumn::new("AVG_EXECUTION_TIME", "avg_execution_time")
            .unit("seconds")
            .scale(NANOS)
            .help("Average execution time"),
        MetricColumn::new("MIN_RESULT_SIZE", "min_result_size")
            .unit("bytes")
            .help("Smallest result size"),
        MetricColumn::new("MAX_RESULT_SIZE", "max_result_size")
            .unit("bytes")
            .help("Largest result size"),
        MetricColumn::new("AVG_RESULT_SIZE", "avg_result_size")
            .unit("bytes")
            .help("Average result size"),
        MetricColumn::new("MIN_PARAMETER_SET_SIZE", "min_parameter_size")
            .unit("bytes")
            .help("Smallest parameter set size"),
        MetricColumn::new("MAX_PARAMETER_SET_SIZE", "max_parameter_size")
            .unit("bytes")
            .help("Largest parameter set size"),
        MetricColumn::new("AVG_PARAMETER_SET_SIZE", "avg_parameter_size")
            .unit("bytes")
            .help("Average parameter set size"),
        MetricColumn::new("ABORTS", "aborts").help("Aborted invocations"),
        MetricColumn::new("FAILURES", "failures").help("Failed invocations"),
    ],
};
