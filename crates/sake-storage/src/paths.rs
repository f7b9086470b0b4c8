//! Workspace-scoped storage paths.
//!
//! Persisted session state belongs to the workspace it was created in, so
//! everything lives under a `.sake/` directory at the workspace root:
//!
//! ```text
//! <workspace>/.sake/
//! ├── state.json           # persisted sessions + shared state
//! └── logs/                # application logs
//! ```

use sake_core::error::{Result, SakeError};
use std::path::{Path, PathBuf};

const STATE_DIR: &str = ".sake";
const STATE_FILE: &str = "state.json";

/// Path resolution for one workspace.
#[derive(Debug, Clone)]
pub struct SakePaths {
    workspace_root: PathBuf,
}

impl SakePaths {
    /// Creates paths rooted at an explicit workspace directory.
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
        }
    }

    /// Resolves the workspace root from the current directory, falling
    /// back to the user's home directory when there is none.
    pub fn discover() -> Result<Self> {
        if let Ok(cwd) = std::env::current_dir() {
            return Ok(Self::new(cwd));
        }
        let home = dirs::home_dir()
            .ok_or_else(|| SakeError::io("cannot determine home directory"))?;
        Ok(Self::new(home))
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// The `.sake/` directory of this workspace.
    pub fn state_dir(&self) -> PathBuf {
        self.workspace_root.join(STATE_DIR)
    }

    /// The persisted state document.
    pub fn state_file(&self) -> PathBuf {
        self.state_dir().join(STATE_FILE)
    }

    /// Directory for application logs.
    pub fn logs_dir(&self) -> PathBuf {
        self.state_dir().join("logs")
    }
}
