use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use std::sync::Arc;
use texgate::{Compiler, WorkspaceRoot};

/// Shared application state
///
/// Built once at startup and handed to every handler. Nothing in here is
/// mutated per request; requests only share the workspace root directory.
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Toolchain runner
    pub compiler: Compiler,

    /// Where request workspaces are created
    pub workspaces: WorkspaceRoot,
}

impl ServerState {
    /// Create new server state
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let workspaces = config.workspace_root();
        let root = workspaces.path();
        if !root.is_dir() {
            return Err(ServerError::Config(format!(
                "workspace root {} is not a directory",
                root.display()
            )));
        }

        Ok(Self {
            compiler: config.compiler(),
            workspaces,
            config: Arc::new(config),
        })
    }
}
