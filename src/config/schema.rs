//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the daemon.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the health-check daemon.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct HadbConfig {
    /// Listener, worker pool and persistence settings.
    pub server: ServerConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,

    /// Monitored targets keyed by the identifier used in probe requests.
    pub targets: BTreeMap<String, TargetConfig>,
}

impl HadbConfig {
    /// Look up a target by its probe identifier.
    pub fn target(&self, id: &str) -> Option<&TargetConfig> {
        self.targets.get(id)
    }

    /// Consecutive failures needed before `target` is declared dead.
    pub fn dead_limit_for(&self, target: &TargetConfig) -> u32 {
        target.dead_limit.unwrap_or(self.server.dead_limit)
    }
}

/// Server section.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind (e.g., "0.0.0.0").
    pub ip_address: String,

    /// Port to bind. `0` asks the OS for an ephemeral port.
    pub port: u16,

    /// Number of workers sharing the listening socket.
    pub children: usize,

    /// Path of the pid file.
    pub pid_file: PathBuf,

    /// Directory holding one status record per target.
    pub status_dir: PathBuf,

    /// Default number of consecutive failures before a target is DEAD.
    pub dead_limit: u32,

    /// Optional upper bound on a single probe. Unset leaves it to the driver.
    pub probe_timeout_secs: Option<u64>,

    /// Remove the pid file on shutdown.
    pub remove_pid_on_exit: bool,
}

impl ServerConfig {
    /// `ip_address:port` as a string suitable for parsing into a socket address.
    pub fn bind_address(&self) -> String {
        if self.ip_address.contains(':') {
            format!("[{}]:{}", self.ip_address, self.port)
        } else {
            format!("{}:{}", self.ip_address, self.port)
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ip_address: "0.0.0.0".to_string(),
            port: 9200,
            children: 4,
            pid_file: PathBuf::from("/var/run/hadb.pid"),
            status_dir: PathBuf::from("/var/lib/hadb"),
            dead_limit: 10,
            probe_timeout_secs: None,
            remove_pid_on_exit: true,
        }
    }
}

/// Database engine used to probe a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    Postgres,
    Mysql,
    /// Plain TCP connect; no protocol handshake.
    Tcp,
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Engine::Postgres => "PostgreSQL",
            Engine::Mysql => "MySQL",
            Engine::Tcp => "TCP",
        };
        f.write_str(name)
    }
}

/// A monitored database endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TargetConfig {
    pub engine: Engine,

    pub host: String,

    pub port: u16,

    /// Database name.
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Overrides `server.dead_limit` for this target.
    #[serde(default)]
    pub dead_limit: Option<u32>,

    /// Shell command run after the target is declared dead.
    #[serde(default)]
    pub failover_cmd: Option<String>,

    /// Shell command run before `failover_cmd` to fence the dead node.
    #[serde(default)]
    pub stonith_cmd: Option<String>,
}

impl TargetConfig {
    /// A target with only connection coordinates filled in.
    pub fn new(engine: Engine, host: impl Into<String>, port: u16) -> Self {
        Self {
            engine,
            host: host.into(),
            port,
            name: None,
            username: None,
            password: None,
            dead_limit: None,
            failover_cmd: None,
            stonith_cmd: None,
        }
    }

    /// True when at least one remediation command is configured.
    pub fn has_remediation(&self) -> bool {
        self.failover_cmd.is_some() || self.stonith_cmd.is_some()
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Optional log file, written in addition to stdout.
    pub log_file: Option<PathBuf>,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Exporter bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_file: None,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9464".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_document() {
        let doc = r#"
            [server]
            ip_address = "127.0.0.1"
            port = 9300
            children = 2
            pid_file = "/tmp/hadb.pid"
            status_dir = "/tmp/hadb"
            dead_limit = 5

            [targets.db1]
            engine = "postgres"
            host = "10.0.0.5"
            port = 5432
            name = "app"
            username = "monitor"
            password = "secret"
            dead_limit = 3
            failover_cmd = "touch /tmp/trigger"
        "#;

        let config: HadbConfig = toml::from_str(doc).unwrap();
        assert_eq!(config.server.bind_address(), "127.0.0.1:9300");
        assert_eq!(config.server.children, 2);
        assert!(config.server.remove_pid_on_exit);

        let db1 = config.target("db1").unwrap();
        assert_eq!(db1.engine, Engine::Postgres);
        assert_eq!(db1.name.as_deref(), Some("app"));
        assert_eq!(config.dead_limit_for(db1), 3);
        assert!(db1.has_remediation());
        assert!(config.target("db2").is_none());
    }

    #[test]
    fn server_defaults_apply() {
        let config: HadbConfig = toml::from_str(
            r#"
            [targets.cache]
            engine = "tcp"
            host = "localhost"
            port = 6379
            "#,
        )
        .unwrap();

        assert_eq!(config.server.dead_limit, 10);
        assert_eq!(config.server.probe_timeout_secs, None);
        let cache = config.target("cache").unwrap();
        assert_eq!(config.dead_limit_for(cache), 10);
        assert!(!cache.has_remediation());
    }

    #[test]
    fn ipv6_bind_address_is_bracketed() {
        let server = ServerConfig {
            ip_address: "::1".into(),
            port: 80,
            ..ServerConfig::default()
        };
        assert_eq!(server.bind_address(), "[::1]:80");
    }
}
