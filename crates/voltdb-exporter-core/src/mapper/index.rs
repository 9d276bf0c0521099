use super::{CategorySpec, HOSTNAME, KILOBYTES, LabelColumn, MetricColumn};

pub(super) static INDEX: CategorySpec = CategorySpec {
    namespace: "voltdb_index",
    labels: &[
        HOSTNAME,
        LabelColumn::new("partitionid", "PARTITION_ID"),
        LabelColumn::new("indexname", "INDEX_NAME"),
        LabelColumn::new("tablename", "TABLE_NAME"),
        LabelColumn::new("indextype", "INDEX_TYPE"),
    ],
    metrics: &[
        MetricColumn::new("ENTRY_COUNT", "entries_count").help("Entries in the index"),
        MetricColumn::new("MEMORY_ESTIMATE", "memory_estimate")
            .unit("bytes")
            .scale(KILOBYTES)
            .help("Estimated memory used by the index"),
    ],
};
