use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable naming the workspace directory (set by GitHub Actions).
pub const WORKSPACE_ENV: &str = "GITHUB_WORKSPACE";
pub const DEFAULT_WORKSPACE: &str = "/default/path";
pub const DEFAULT_URL: &str = "http://the-internet.herokuapp.com/download";
pub const DEFAULT_LINK_TEXT: &str = "some-file.txt";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub workspace: WorkspaceConfig,
    pub download: DownloadConfig,
    pub browser: BrowserConfig,
    pub locate: LocateConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    pub dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    pub url: String,
    pub link_text: String,
    pub timeout_secs: u64,
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    pub headless: bool,
    pub no_sandbox: bool,
    #[serde(default)]
    pub executable: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocateConfig {
    pub pattern: String,
}

impl AppConfig {
    pub fn workspace_dir(&self) -> PathBuf {
        PathBuf::from(&self.workspace.dir)
    }

    pub fn launch_options(&self) -> browser::LaunchOptions {
        browser::LaunchOptions {
            headless: self.browser.headless,
            no_sandbox: self.browser.no_sandbox,
            executable: self.browser.executable.as_ref().map(PathBuf::from),
            ..browser::LaunchOptions::new(self.workspace_dir())
        }
    }
}

impl DownloadConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: WorkspaceConfig {
                dir: DEFAULT_WORKSPACE.to_string(),
            },
            download: DownloadConfig {
                url: DEFAULT_URL.to_string(),
                link_text: DEFAULT_LINK_TEXT.to_string(),
                timeout_secs: 30,
                poll_interval_ms: 250,
            },
            browser: BrowserConfig {
                headless: true,
                no_sandbox: false,
                executable: None,
            },
            locate: LocateConfig {
                pattern: "*.txt".to_string(),
            },
        }
    }
}

/// Loads defaults, then the optional TOML file, then `GITHUB_WORKSPACE`.
pub fn load(path: Option<&str>) -> anyhow::Result<AppConfig> {
    load_with_workspace(path, std::env::var(WORKSPACE_ENV).ok())
}

pub fn load_with_workspace(path: Option<&str>, workspace: Option<String>) -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();
    let mut settings = config::Config::builder()
        .set_default("workspace.dir", defaults.workspace.dir)?
        .set_default("download.url", defaults.download.url)?
        .set_default("download.link_text", defaults.download.link_text)?
        .set_default("download.timeout_secs", defaults.download.timeout_secs as i64)?
        .set_default("download.poll_interval_ms", defaults.download.poll_interval_ms as i64)?
        .set_default("browser.headless", defaults.browser.headless)?
        .set_default("browser.no_sandbox", defaults.browser.no_sandbox)?
        .set_default("locate.pattern", defaults.locate.pattern)?;
    if let Some(p) = path {
        settings = settings.add_source(config::File::with_name(p));
    } else {
        settings = settings.add_source(config::File::with_name("config/default").required(false));
    }
    if let Some(dir) = workspace.filter(|d| !d.is_empty()) {
        settings = settings.set_override("workspace.dir", dir)?;
    }
    let cfg = settings.build()?;
    Ok(cfg.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_file_or_env() {
        let cfg = load_with_workspace(Some("does/not/exist"), None);
        // An explicit path must exist.
        assert!(cfg.is_err());

        let cfg = load_with_workspace(None, None).unwrap();
        assert_eq!(cfg.workspace.dir, DEFAULT_WORKSPACE);
        assert_eq!(cfg.download.url, DEFAULT_URL);
        assert_eq!(cfg.download.link_text, DEFAULT_LINK_TEXT);
        assert_eq!(cfg.locate.pattern, "*.txt");
        assert!(cfg.browser.headless);
    }

    #[test]
    fn workspace_env_overrides_file() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("fetchlog.toml");
        std::fs::write(
            &file,
            "[workspace]\ndir = \"/from/file\"\n[download]\ntimeout_secs = 5\n",
        )
        .unwrap();
        let path = file.to_string_lossy().into_owned();

        let cfg = load_with_workspace(Some(&path), None).unwrap();
        assert_eq!(cfg.workspace.dir, "/from/file");
        assert_eq!(cfg.download.timeout(), Duration::from_secs(5));
        assert_eq!(cfg.download.poll_interval(), Duration::from_millis(250));

        let cfg = load_with_workspace(Some(&path), Some("/from/env".into())).unwrap();
        assert_eq!(cfg.workspace.dir, "/from/env");
    }

    #[test]
    fn launch_options_follow_config() {
        let mut cfg = AppConfig::default();
        cfg.workspace.dir = "/work".into();
        cfg.browser.no_sandbox = true;
        cfg.browser.executable = Some("/usr/bin/chromium".into());

        let opts = cfg.launch_options();
        assert_eq!(opts.download_dir, PathBuf::from("/work"));
        assert!(opts.headless);
        assert!(opts.no_sandbox);
        assert_eq!(opts.executable, Some(PathBuf::from("/usr/bin/chromium")));
    }
}
