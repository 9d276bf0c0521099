use super::{CategorySpec, HOSTNAME, KILOBYTES, LabelColumn, MetricColumn};

pub(super) static TABLE: CategorySpec = CategorySpec {
    namespace: "voltdb_table",
    labels: &[
        HOSTNAME,
        LabelColumn::new("partitionid", "PARTITION_ID"),
        LabelColumn::new("tablename", "TABLE_NAME"),
        LabelColumn::new("type", "TABLE_TYPE"),
    ],
    metrics: &[
        MetricColumn::new("TUPLE_COUNT", "tuple_count").help("Tuples in the table partition"),
        MetricColumn::new("TUPLE_ALLOCATED_MEMORY", "tuple_allocated_memory")
            .unit("bytes")
            .scale(KILOBYTES)
            .help("Memory allocated for tuples"),
        MetricColumn::new("TUPLE_DATA_MEMORY", "inline_tuple")
            .unit("bytes")
            .scale(KILOBYTES)
            .help("Memory holding inline tuple data"),
        MetricColumn::new("STRING_DATA_MEMORY", "non_inline_data")
            .unit("bytes")
            .scale(KILOBYTES)
            .help("Memory holding non-inline strings and blobs"),
    ],
};
