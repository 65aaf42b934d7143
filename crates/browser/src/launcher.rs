//! Local Chromium launcher
//!
//! Starts a throwaway browser with remote debugging on an ephemeral port and
//! reads the control-channel address it prints on stderr.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};

use crate::error::{ConnectionError, Result};

/// Flags required inside containers and other restricted sandboxes, where the
/// kernel namespaces Chromium's sandbox relies on are unavailable.
pub const CONTAINER_FLAGS: [&str; 3] = ["--disable-gpu", "--no-sandbox", "--disable-setuid-sandbox"];

/// Environment variables consulted for an explicit browser binary, in order
pub const EXECUTABLE_ENV_VARS: [&str; 2] = ["CHROME_PATH", "PUPPETEER_EXECUTABLE_PATH"];

const DEVTOOLS_BANNER: &str = "DevTools listening on ";

/// How long a gracefully closed browser gets to exit before it is killed
const EXIT_GRACE: Duration = Duration::from_secs(5);

/// Launch configuration
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    pub headless: bool,
    /// Explicit binary; located automatically when `None`
    pub executable: Option<PathBuf>,
    pub extra_args: Vec<String>,
}

/// A browser process owned by this crate.
///
/// The process is killed when this value is dropped without [`LocalBrowser::shutdown`].
#[derive(Debug)]
pub struct LocalBrowser {
    child: Child,
    /// Profile directory, deleted on drop
    _profile: TempDir,
    ws_url: String,
}

impl LocalBrowser {
    /// Control-channel address printed by the browser
    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Reap the process.
    ///
    /// With `graceful` the browser was already asked to close and gets a short
    /// grace period; otherwise it is killed right away.
    pub async fn shutdown(mut self, graceful: bool) -> std::io::Result<()> {
        if graceful {
            if let Ok(status) = tokio::time::timeout(EXIT_GRACE, self.child.wait()).await {
                log_exit(status?);
                return Ok(());
            }
            tracing::warn!("Browser did not exit after Browser.close, killing it");
        }
        self.child.kill().await?;
        Ok(())
    }
}

fn log_exit(status: ExitStatus) {
    tracing::debug!(%status, "Local browser exited");
}

/// Launch a local browser and wait for its control-channel address
pub async fn launch(options: &LaunchOptions) -> Result<LocalBrowser> {
    let executable = match &options.executable {
        Some(path) => path.clone(),
        None => find_executable().ok_or_else(|| ConnectionError::LaunchFailure {
            reason: format!(
                "no Chromium executable found; set {} or install chromium",
                EXECUTABLE_ENV_VARS[0]
            ),
        })?,
    };

    let profile = tempfile::Builder::new()
        .prefix("hn-browser-profile-")
        .tempdir()
        .map_err(|e| ConnectionError::LaunchFailure {
            reason: format!("failed to create profile directory: {}", e),
        })?;

    let args = build_args(options, profile.path());
    tracing::info!(executable = %executable.display(), headless = options.headless, "Launching local browser");
    tracing::debug!(?args, "Browser arguments");

    let mut child = Command::new(&executable)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| ConnectionError::LaunchFailure {
            reason: format!("failed to spawn {}: {}", executable.display(), e),
        })?;

    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| ConnectionError::LaunchFailure {
            reason: "browser stderr was not captured".to_string(),
        })?;
    let mut lines = BufReader::new(stderr).lines();

    let ws_url = loop {
        match lines.next_line().await {
            Ok(Some(line)) => match parse_devtools_banner(&line) {
                Some(url) => break url.to_string(),
                None => tracing::trace!(target: "hn_browser::chromium", "{}", line),
            },
            Ok(None) => {
                let status = child.wait().await.ok();
                return Err(ConnectionError::LaunchFailure {
                    reason: match status {
                        Some(status) => {
                            format!("browser exited before listening for DevTools ({})", status)
                        }
                        None => "browser closed stderr before listening for DevTools".to_string(),
                    },
                });
            }
            Err(e) => {
                return Err(ConnectionError::LaunchFailure {
                    reason: format!("failed to read browser output: {}", e),
                });
            }
        }
    };

    // Keep draining so the browser never blocks on a full pipe
    tokio::spawn(async move {
        while let Ok(Some(line)) = lines.next_line().await {
            tracing::trace!(target: "hn_browser::chromium", "{}", line);
        }
    });

    tracing::info!(pid = ?child.id(), %ws_url, "Local browser listening");

    Ok(LocalBrowser {
        child,
        _profile: profile,
        ws_url,
    })
}

/// Command line for a launch
pub fn build_args(options: &LaunchOptions, profile_dir: &Path) -> Vec<String> {
    let mut args: Vec<String> = CONTAINER_FLAGS.iter().map(|f| f.to_string()).collect();
    args.push("--remote-debugging-port=0".to_string());
    args.push(format!("--user-data-dir={}", profile_dir.display()));
    args.push("--no-first-run".to_string());
    args.push("--no-default-browser-check".to_string());
    if options.headless {
        args.push("--headless=new".to_string());
    }
    args.extend(
        options
            .extra_args
            .iter()
            .filter(|a| !a.trim().is_empty())
            .cloned(),
    );
    args.push("about:blank".to_string());
    args
}

/// Extract the address from `DevTools listening on ws://...`
pub fn parse_devtools_banner(line: &str) -> Option<&str> {
    let url = line.trim().strip_prefix(DEVTOOLS_BANNER)?.trim();
    (url.starts_with("ws://") || url.starts_with("wss://")).then_some(url)
}

/// Locate a Chromium-family binary
pub fn find_executable() -> Option<PathBuf> {
    for var in EXECUTABLE_ENV_VARS {
        if let Some(path) = std::env::var_os(var).filter(|v| !v.is_empty()) {
            return Some(PathBuf::from(path));
        }
    }

    let names = [
        "chromium",
        "chromium-browser",
        "google-chrome-stable",
        "google-chrome",
        "chrome",
    ];
    if let Some(path) = names.iter().find_map(|name| which::which(name).ok()) {
        return Some(path);
    }

    let absolute = [
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/usr/bin/google-chrome",
        "/snap/bin/chromium",
    ];
    absolute
        .iter()
        .map(PathBuf::from)
        .find(|path| path.exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_include_container_flags() {
        let options = LaunchOptions {
            headless: true,
            ..Default::default()
        };
        let args = build_args(&options, Path::new("/tmp/profile"));

        for flag in CONTAINER_FLAGS {
            assert!(args.iter().any(|a| a == flag), "missing {}", flag);
        }
        assert!(args.contains(&"--remote-debugging-port=0".to_string()));
        assert!(args.contains(&"--user-data-dir=/tmp/profile".to_string()));
        assert!(args.contains(&"--headless=new".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("about:blank"));
    }

    #[test]
    fn test_headed_launch_omits_headless() {
        let options = LaunchOptions {
            headless: false,
            extra_args: vec!["--lang=en-US".to_string(), " ".to_string()],
            ..Default::default()
        };
        let args = build_args(&options, Path::new("/tmp/profile"));

        assert!(!args.iter().any(|a| a.starts_with("--headless")));
        assert!(args.contains(&"--lang=en-US".to_string()));
        assert!(!args.iter().any(|a| a.trim().is_empty()));
    }

    #[test]
    fn test_parse_devtools_banner() {
        assert_eq!(
            parse_devtools_banner(
                "DevTools listening on ws://127.0.0.1:40123/devtools/browser/5f0c-11aa\n"
            ),
            Some("ws://127.0.0.1:40123/devtools/browser/5f0c-11aa")
        );
        assert_eq!(
            parse_devtools_banner("[1018/120000.000:ERROR:gpu_init.cc(1)] Passthrough is not supported"),
            None
        );
        assert_eq!(parse_devtools_banner("DevTools listening on nothing"), None);
    }

    #[tokio::test]
    async fn test_missing_executable_is_launch_failure() {
        let options = LaunchOptions {
            headless: true,
            executable: Some(PathBuf::from("/nonexistent/hn-browser/chromium")),
            extra_args: Vec::new(),
        };
        let err = launch(&options).await.unwrap_err();
        assert!(matches!(err, ConnectionError::LaunchFailure { .. }));
    }

    #[tokio::test]
    #[ignore] // Needs a local Chromium
    async fn test_launch_local_browser() {
        let browser = launch(&LaunchOptions {
            headless: true,
            ..Default::default()
        })
        .await
        .unwrap();
        assert!(browser.ws_url().starts_with("ws://"));
        browser.shutdown(false).await.unwrap();
    }
}
