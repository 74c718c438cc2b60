// Server configuration — bind addresses for both transports.

use serde::{Deserialize, Serialize};

/// Default bind host for both listeners.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default port for the WebSocket signaling transport.
pub const DEFAULT_SIGNAL_PORT: u16 = 9876;

/// Default port for the TCP directory transport.
pub const DEFAULT_DIRECTORY_PORT: u16 = 8765;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host both listeners bind to
    pub host: String,

    /// Port for the WebSocket signaling transport
    pub signal_port: u16,

    /// Port for the TCP directory transport
    pub directory_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            signal_port: DEFAULT_SIGNAL_PORT,
            directory_port: DEFAULT_DIRECTORY_PORT,
        }
    }
}

impl ServerConfig {
    /// Bind address for the signaling listener.
    pub fn signal_addr(&self) -> String {
        format!("{}:{}", self.host, self.signal_port)
    }

    /// Bind address for the directory listener.
    pub fn directory_addr(&self) -> String {
        format!("{}:{}", self.host, self.directory_port)
    }
}
