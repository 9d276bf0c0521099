use super::{CategorySpec, HOSTNAME, MILLIS, MetricColumn};

pub(super) static GC: CategorySpec = CategorySpec {
    namespace: "voltdb_gc",
    labels: &[HOSTNAME],
    metrics: &[
        MetricColumn::new("NEWGEN_GC_COUNT", "newgen_gc_count")
            .help("Young generation collections"),
        MetricColumn::new("NEWGEN_AVG_GC_TIME", "newgen_avg_gc_time")
            .unit("seconds")
            .scale(MILLIS)
            .help("Average young generation collection time"),
        MetricColumn::new("OLDGEN_GC_COUNT", "oldgen_gc_count")
            .help("Old generation collections"),
        MetricColumn::new("OLDGEN_AVG_GC_TIME", "oldgen_avg_gc_time")
            .unit("seconds")
            .scale(MILLIS)
            .help("Average old generation collection time"),
    ],
};
