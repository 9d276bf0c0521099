use super::{CategorySpec, HOSTNAME, LabelColumn, MetricColumn};

pub(super) static LIVECLIENTS: CategorySpec = CategorySpec {
    namespace: "voltdb_liveclients",
    labels: &[
        HOSTNAME,
        LabelColumn::new("cnxhostname", "CLIENT_HOSTNAME"),
        LabelColumn::new("admin", "ADMIN"),
    ],
    metrics: &[
        MetricColumn::new("OUTSTANDING_REQUEST_BYTES", "outstanding_request_bytes")
            .help("Request bytes queued from the client"),
        // Published dashboards query this spelling.
        MetricColumn::new("OUTSTANDING_RESPONSE_MESSAGES", "outstanding_reponse_messages")
            .help("Response messages queued to the client"),
        MetricColumn::new("OUTSTANDING_TRANSACTIONS", "outstanding_txns")
            .help("Transactions in flight for the client"),
    ],
};
