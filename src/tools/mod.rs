use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Install locations that are often missing from PATH when launched from a GUI or cron
const COMMON_BIN_DIRS: &[&str] = &["/opt/homebrew/bin", "/usr/local/bin", "/usr/bin"];

/// Discovery of external tools on the host
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ToolLocator: Send + Sync {
    /// Resolve an executable name to its path, if installed
    async fn find_executable(&self, name: &str) -> Option<PathBuf>;

    /// Usage text printed by `<executable> --help`, if the tool runs at all
    async fn help_text(&self, executable: &Path) -> Option<String>;
}

/// Tool discovery against the real host
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTools;

impl SystemTools {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ToolLocator for SystemTools {
    async fn find_executable(&self, name: &str) -> Option<PathBuf> {
        let lookup = if cfg!(windows) { "where" } else { "which" };

        let output = Command::new(lookup)
            .arg(name)
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .await;

        if let Ok(output) = output {
            if output.status.success() {
                let stdout = String::from_utf8_lossy(&output.stdout);
                if let Some(path) = stdout.lines().map(str::trim).find(|line| !line.is_empty()) {
                    tracing::debug!("Found {} at {}", name, path);
                    return Some(PathBuf::from(path));
                }
            }
        }

        let found = COMMON_BIN_DIRS
            .iter()
            .map(|dir| Path::new(dir).join(name))
            .find(|candidate| candidate.is_file());

        match &found {
            Some(path) => tracing::debug!("Found {} at {}", name, path.display()),
            None => tracing::debug!("{} not found", name),
        }

        found
    }

    async fn help_text(&self, executable: &Path) -> Option<String> {
        let output = Command::new(executable)
            .arg("--help")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| tracing::debug!("Could not run {} --help: {}", executable.display(), e))
            .ok()?;

        // Usage goes to stderr for some CLIs, and a non-zero exit is common for --help
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}
