//! Site queue statistics split by task priority.

use super::queue::{QUEUE_METRICS, SITE_ID};
use super::{CategorySpec, HOSTNAME, LabelColumn};

pub(super) static QUEUEPRIORITY: CategorySpec = CategorySpec {
    namespace: "voltdb_queuepriority",
    labels: &[HOSTNAME, SITE_ID, LabelColumn::new("priority", "PRIORITY")],
    metrics: QUEUE_METRICS,
};
