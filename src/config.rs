use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::externals::DEFAULT_EXTERNALS_FILE;

/// Explicit run configuration, passed to every operation that needs it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub github: GithubSettings,
    /// Where command-capture files are created. Defaults to the system temp dir.
    pub scratch_dir: Option<PathBuf>,
    pub externals_file: PathBuf,
    pub build_tool: BuildTool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            logging: LoggingSettings::default(),
            github: GithubSettings::default(),
            scratch_dir: None,
            externals_file: PathBuf::from(DEFAULT_EXTERNALS_FILE),
            build_tool: BuildTool::default(),
        }
    }
}

impl Settings {
    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    pub fn trace_loaded(&self) {
        info!(
            api_base = %self.github.api_base,
            uploads_base = %self.github.uploads_base,
            build_tool = %self.build_tool.program,
            log_file = ?self.logging.file,
            "Loaded Settings"
        );
        debug!(?self, "Settings loaded (full debug)");
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive; `RUST_LOG` still takes precedence.
    pub level: String,
    /// Optional log file receiving a plain-text copy of every event.
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GithubSettings {
    pub api_base: String,
    pub uploads_base: String,
    pub user_agent: String,
    pub asset_content_type: String,
    /// Pause between creating a release and listing releases to find its id.
    pub settle_delay_ms: u64,
}

impl Default for GithubSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            uploads_base: "https://uploads.github.com".to_string(),
            user_agent: concat!("release-helper/", env!("CARGO_PKG_VERSION")).to_string(),
            asset_content_type: "text/markdown".to_string(),
            settle_delay_ms: 1000,
        }
    }
}

/// How to dry-run the build and what its output must contain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BuildTool {
    pub program: String,
    pub args: Vec<String>,
    /// File that must exist in the working directory before the dry run.
    pub project_file: Option<PathBuf>,
    /// Regex matched against output lines; absent means the tool never started.
    pub start_marker: String,
    /// Regex matched against output lines; present means nothing to rebuild.
    pub up_to_date_marker: String,
}

impl Default for BuildTool {
    fn default() -> Self {
        Self {
            program: "scons".to_string(),
            args: vec!["--dry-run".to_string()],
            project_file: Some(PathBuf::from("SConstruct")),
            start_marker: "scons: Reading SConscript files".to_string(),
            up_to_date_marker: r"is up to date\.$".to_string(),
        }
    }
}

impl BuildTool {
    /// Run a local SCons checkout through `python <script>` instead of `scons`.
    pub fn with_local_scons(mut self, script: impl Into<String>) -> Self {
        let mut args = vec![script.into()];
        args.extend(self.args.drain(..));
        self.program = "python".to_string();
        self.args = args;
        self
    }
}
