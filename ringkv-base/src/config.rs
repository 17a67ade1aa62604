use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_parse<T>(name: &str, default: T) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env_var(name) {
        Some(raw) => raw
            .parse()
            .map_err(|e| format!("{name}: invalid value '{raw}': {e}")),
        None => Ok(default),
    }
}

fn port_from_addr(addr: &str) -> Result<u16, String> {
    let without_scheme = addr.rsplit("://").next().unwrap_or(addr);
    let trimmed = without_scheme.trim_end_matches('/');
    let port_str = trimmed
        .rsplit(':')
        .next()
        .ok_or_else(|| format!("{addr}: missing port"))?;
    port_str
        .parse::<u16>()
        .map_err(|e| format!("{addr}: invalid port '{port_str}': {e}"))
}

fn listen_addr_from_node_addr(node_addr: &str) -> Result<SocketAddr, String> {
    let port = port_from_addr(node_addr)?;
    format!("0.0.0.0:{port}")
        .parse()
        .map_err(|e| format!("derived listen addr for '{node_addr}' is invalid: {e}"))
}

/// Ring parameters shared by every process in the cluster. Every node and
/// gateway must agree on these for `owners(key)` to resolve consistently.
#[derive(Debug, Clone, Copy)]
pub struct ClusterParams {
    pub replication_factor: usize,
    pub num_vnodes: usize,
}

impl ClusterParams {
    pub fn from_env() -> Result<Self, String> {
        let replication_factor = env_parse("REPLICATION_FACTOR", 3usize)?;
        let num_vnodes = env_parse("NUM_VNODES", 16usize)?;
        let params = Self {
            replication_factor,
            num_vnodes,
        };
        params.validate()?;
        Ok(params)
    }

    fn validate(&self) -> Result<(), String> {
        if self.replication_factor == 0 {
            return Err("REPLICATION_FACTOR must be at least 1".to_string());
        }
        if self.num_vnodes == 0 {
            return Err("NUM_VNODES must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Configuration for a `ringkv-node` process, parsed from the environment.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Self address advertised in gossip and used as the owner identity on
    /// the hash ring (e.g. `http://10.0.0.3:7000`).
    pub node_addr: String,
    pub listen_addr: SocketAddr,
    pub seed_node: Option<String>,
    pub db_file: PathBuf,
    pub max_in_flight: u32,
    pub dead_timeout: Duration,
    pub cluster: ClusterParams,
}

impl NodeConfig {
    pub fn from_env() -> Result<Self, String> {
        let node_addr = env_var("NODE_ADDR")
            .ok_or_else(|| "NODE_ADDR environment variable is not set".to_string())?;

        let listen_addr = match env_var("LISTEN_ADDR") {
            Some(raw) => raw
                .parse()
                .map_err(|e| format!("LISTEN_ADDR: invalid value '{raw}': {e}"))?,
            None => listen_addr_from_node_addr(&node_addr)?,
        };

        let seed_node = env_var("SEED_NODE");
        let db_file = env_var("DB_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/data/kv.db"));
        let max_in_flight = env_parse("MAX_IN_FLIGHT", 16u32)?.clamp(8, 32);
        let dead_timeout = Duration::from_secs_f64(env_parse("DEAD_TIMEOUT", 30.0f64)?);
        let cluster = ClusterParams::from_env()?;

        Ok(Self {
            node_addr,
            listen_addr,
            seed_node,
            db_file,
            max_in_flight,
            dead_timeout,
            cluster,
        })
    }
}

/// Configuration for a `ringkv-gateway` process, parsed from the environment.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub listen_addr: SocketAddr,
    /// Node polled for `/nodes` to refresh the gateway's membership snapshot.
    pub seed_node: String,
    pub in_flight_limit: u32,
    pub ring_update_interval: Duration,
    pub ring_stable_period: Duration,
    pub cluster: ClusterParams,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, String> {
        let listen_addr = match env_var("LISTEN_ADDR") {
            Some(raw) => raw
                .parse()
                .map_err(|e| format!("LISTEN_ADDR: invalid value '{raw}': {e}"))?,
            None => "0.0.0.0:8080".parse().unwrap(),
        };

        let seed_node = env_var("SEED_NODE")
            .ok_or_else(|| "SEED_NODE environment variable is not set".to_string())?;

        let in_flight_limit = env_parse("IN_FLIGHT_LIMIT", 100u32)?;
        let ring_update_interval = Duration::from_secs_f64(env_parse("RING_UPDATE_INTERVAL", 2.0f64)?);
        let ring_stable_period = Duration::from_secs_f64(env_parse("RING_STABLE_PERIOD", 5.0f64)?);
        let cluster = ClusterParams::from_env()?;

        let cfg = Self {
            listen_addr,
            seed_node,
            in_flight_limit,
            ring_update_interval,
            ring_stable_period,
            cluster,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), String> {
        if self.in_flight_limit == 0 {
            return Err("IN_FLIGHT_LIMIT must be at least 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Env vars are process-global; serialize tests that touch them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_all() {
        for var in [
            "NODE_ADDR",
            "LISTEN_ADDR",
            "SEED_NODE",
            "DB_FILE",
            "MAX_IN_FLIGHT",
            "DEAD_TIMEOUT",
            "REPLICATION_FACTOR",
            "NUM_VNODES",
            "IN_FLIGHT_LIMIT",
            "RING_UPDATE_INTERVAL",
            "RING_STABLE_PERIOD",
        ] {
            env::remove_var(var);
        }
    }

    #[test]
    fn port_from_addr_strips_scheme_and_path() {
        assert_eq!(port_from_addr("http://10.0.0.3:7000").unwrap(), 7000);
        assert_eq!(port_from_addr("10.0.0.3:7000").unwrap(), 7000);
        assert_eq!(port_from_addr("http://10.0.0.3:7000/").unwrap(), 7000);
    }

    #[test]
    fn node_config_requires_node_addr() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        let err = NodeConfig::from_env().unwrap_err();
        assert!(err.contains("NODE_ADDR"), "error was: {err}");
    }

    #[test]
    fn node_config_derives_listen_addr_from_node_addr() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        env::set_var("NODE_ADDR", "http://127.0.0.1:7100");
        let cfg = NodeConfig::from_env().unwrap();
        assert_eq!(cfg.listen_addr, "0.0.0.0:7100".parse().unwrap());
        assert_eq!(cfg.max_in_flight, 16);
        assert_eq!(cfg.db_file, PathBuf::from("/data/kv.db"));
        clear_all();
    }

    #[test]
    fn node_config_clamps_max_in_flight() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        env::set_var("NODE_ADDR", "http://127.0.0.1:7100");
        env::set_var("MAX_IN_FLIGHT", "4");
        let cfg = NodeConfig::from_env().unwrap();
        assert_eq!(cfg.max_in_flight, 8);
        env::set_var("MAX_IN_FLIGHT", "200");
        let cfg = NodeConfig::from_env().unwrap();
        assert_eq!(cfg.max_in_flight, 32);
        clear_all();
    }

    #[test]
    fn gateway_config_requires_seed_node() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        let err = GatewayConfig::from_env().unwrap_err();
        assert!(err.contains("SEED_NODE"), "error was: {err}");
    }

    #[test]
    fn gateway_config_parses_defaults() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        env::set_var("SEED_NODE", "http://127.0.0.1:7100");
        let cfg = GatewayConfig::from_env().unwrap();
        assert_eq!(cfg.listen_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(cfg.in_flight_limit, 100);
        assert_eq!(cfg.ring_stable_period, Duration::from_secs(5));
        clear_all();
    }

    #[test]
    fn cluster_params_rejects_zero_replication_factor() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        env::set_var("REPLICATION_FACTOR", "0");
        let err = ClusterParams::from_env().unwrap_err();
        assert!(err.contains("REPLICATION_FACTOR"), "error was: {err}");
        clear_all();
    }
}
