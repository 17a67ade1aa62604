use std::sync::Arc;
use std::time::Duration;

use ringkv_admission::Admission;
use ringkv_base::config::NodeConfig;
use ringkv_membership::Membership;
use ringkv_store::RecordStore;

/// Shared state cloned into every Axum handler and background task.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub membership: Membership,
    pub admission: Arc<Admission>,
    pub config: Arc<NodeConfig>,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>, config: NodeConfig) -> Self {
        let admission = Admission::new(config.max_in_flight);
        let membership = Membership::new(config.node_addr.clone());
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(1))
            .build()
            .expect("reqwest client");
        Self {
            store,
            membership,
            admission,
            config: Arc::new(config),
            http,
        }
    }
}
