use super::{CategorySpec, HOSTNAME, LabelColumn, MetricColumn};

pub(super) static IOSTATS: CategorySpec = CategorySpec {
    namespace: "voltdb_iostats",
    labels: &[HOSTNAME, LabelColumn::new("cnxhostname", "CONNECTION_HOSTNAME")],
    metrics: &[
        MetricColumn::new("BYTES_READ", "received_bytes").help("Bytes read from the connection"),
        MetricColumn::new("MESSAGES_READ", "received_messages")
            .help("Messages read from the connection"),
        MetricColumn::new("BYTES_WRITTEN", "sent_bytes").help("Bytes written to the connection"),
        MetricColumn::new("MESSAGES_WRITTEN", "sent_messages")
            .help("Messages written to the connection"),
    ],
};
