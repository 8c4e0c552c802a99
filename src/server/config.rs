use super::RequestsLoggingLevel;
use std::time::Duration;

#[derive(Clone)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub port: u16,
    pub metrics_port: u16,
    /// Idle time after which a session is dropped, also used as cookie max-age.
    pub session_ttl: Duration,
    pub session_prune_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            port: 3001,
            metrics_port: 9091,
            session_ttl: Duration::from_secs(72 * 3600),
            session_prune_interval: Duration::from_secs(3600),
        }
    }
}
