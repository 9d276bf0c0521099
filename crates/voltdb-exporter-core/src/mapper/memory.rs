//! Per-host memory. VoltDB reports sizes in kilobytes.

use super::{CategorySpec, HOSTNAME, KILOBYTES, MetricColumn};

const fn kilobytes(column: &'static str, key: &'static str, help: &'static str) -> MetricColumn {
    MetricColumn::new(column, key)
        .unit("bytes")
        .scale(KILOBYTES)
        .help(help)
}

pub(super) static MEMORY: CategorySpec = CategorySpec {
    namespace: "voltdb_memory",
    labels: &[HOSTNAME],
    metrics: &[
        kilobytes("RSS", "rss", "Resident set size of the server process"),
        kilobytes("JAVAUSED", "javaused", "Java heap in use"),
        kilobytes("JAVAUNUSED", "javaunused", "Java heap allocated but unused"),
        kilobytes("TUPLEDATA", "tupledata", "Memory holding tuple data"),
        kilobytes("TUPLEALLOCATED", "tupleallocated", "Memory allocated for tuples"),
        kilobytes("INDEXMEMORY", "indexmemory", "Memory used by indexes"),
        kilobytes("STRINGMEMORY", "stringmemory", "Memory used by non-inline strings"),
        MetricColumn::new("TUPLECOUNT", "tuplecount").help("Tuples stored on the host"),
        kilobytes("POOLEDMEMORY", "pooledmemory", "Memory held in allocation pools"),
        kilobytes("PHYSICALMEMORY", "physicalmemory", "Physical memory of the host"),
        kilobytes("JAVAMAXHEAP", "javamaxheap", "Maximum Java heap size"),
    ],
};
