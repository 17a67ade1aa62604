use std::sync::Arc;
use std::time::Duration;

use ringkv_admission::Admission;
use ringkv_base::config::GatewayConfig;
use ringkv_membership::Membership;

#[derive(Clone)]
pub struct AppState {
    pub membership: Membership,
    pub admission: Arc<Admission>,
    pub config: Arc<GatewayConfig>,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: GatewayConfig) -> Self {
        let admission = Admission::new(config.in_flight_limit);
        let membership = Membership::new_gateway();
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(1))
            .build()
            .expect("reqwest client");
        Self {
            membership,
            admission,
            config: Arc::new(config),
            http,
        }
    }
}
