use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use texgate::{Compiler, WorkspaceRoot, DEFAULT_TOOLCHAIN};

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Server bind address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Maximum request body size in MB
    #[serde(default = "default_max_body_size_mb")]
    pub max_body_size_mb: usize,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Toolchain executable, looked up on `PATH` unless absolute
    #[serde(default = "default_toolchain")]
    pub toolchain: String,

    /// Kill the toolchain after this many seconds. Unset means wait forever.
    #[serde(default)]
    pub compile_timeout_secs: Option<u64>,

    /// Directory request workspaces are created in. Defaults to the OS temp dir.
    #[serde(default)]
    pub workspace_root: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            max_body_size_mb: default_max_body_size_mb(),
            log_level: default_log_level(),
            toolchain: default_toolchain(),
            compile_timeout_secs: None,
            workspace_root: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables and config files
    pub fn load() -> anyhow::Result<Self> {
        // A missing .env file is the normal case in containers.
        let _ = dotenvy::dotenv();

        let builder = config::Config::builder()
            // Load from file if exists
            .add_source(config::File::with_name("server").required(false))
            // Override with environment variables
            .add_source(config::Environment::with_prefix("TEXGATE_SERVER").separator("__"));

        let config: ServerConfig = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.bind_addr, self.port);
        Ok(addr_str.parse()?)
    }

    /// Get max body size in bytes
    pub fn max_body_size(&self) -> usize {
        self.max_body_size_mb * 1024 * 1024
    }

    pub fn compile_timeout(&self) -> Option<Duration> {
        self.compile_timeout_secs.map(Duration::from_secs)
    }

    pub fn compiler(&self) -> Compiler {
        Compiler::new(&self.toolchain).with_timeout(self.compile_timeout())
    }

    pub fn workspace_root(&self) -> WorkspaceRoot {
        match &self.workspace_root {
            Some(dir) => WorkspaceRoot::at(dir),
            None => WorkspaceRoot::system(),
        }
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_body_size_mb() -> usize {
    50
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_toolchain() -> String {
    DEFAULT_TOOLCHAIN.to_string()
}
