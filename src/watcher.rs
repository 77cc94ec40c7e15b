//! Reload watcher.
//!
//! Polls the reload marker and, once the reader has deleted it, restarts the
//! sync service so the next batch is fetched. With an empty restart command
//! the pass runs inside the watcher instead.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::app::{AppContext, Result, ShelfError};
use crate::cli::commands::{self, SyncOutcome};
use crate::config::Config;
use crate::sentinel::SentinelController;
use crate::store::FsStore;

/// Parse interval string like "10s", "5m", "1h", "1d" or plain seconds.
pub fn parse_interval(s: &str) -> std::result::Result<u64, String> {
    let s = s.trim().to_lowercase();

    let (value, unit, label) = if let Some(hours) = s.strip_suffix('h') {
        (hours, 3600, "hours")
    } else if let Some(minutes) = s.strip_suffix('m') {
        (minutes, 60, "minutes")
    } else if let Some(days) = s.strip_suffix('d') {
        (days, 86400, "days")
    } else if let Some(secs) = s.strip_suffix('s') {
        (secs, 1, "seconds")
    } else {
        return s
            .parse::<u64>()
            .map_err(|_| format!("Invalid interval: {}. Use format like '10s', '5m', '1h'", s));
    };

    value
        .parse::<u64>()
        .map_err(|_| format!("Invalid {}: {}", label, value))?
        .checked_mul(unit)
        .ok_or_else(|| format!("Interval too large: {}", s))
}

/// Format interval for display
pub fn format_interval(secs: u64) -> String {
    if secs >= 86400 && secs.is_multiple_of(86400) {
        format!("{}d", secs / 86400)
    } else if secs >= 3600 && secs.is_multiple_of(3600) {
        format!("{}h", secs / 3600)
    } else if secs >= 60 && secs.is_multiple_of(60) {
        format!("{}m", secs / 60)
    } else {
        format!("{}s", secs)
    }
}

/// What one check did.
#[derive(Debug)]
pub enum Tick {
    /// The marker is still on the tablet.
    Pending,
    /// The restart command ran.
    Restarted,
    /// A pass ran in-process.
    Synced(SyncOutcome),
}

pub struct Watcher {
    config_path: PathBuf,
    store_dir: Option<PathBuf>,
    /// Overrides `watcher.interval_secs` from the config.
    interval_secs: Option<u64>,
    running: Arc<AtomicBool>,
}

impl Watcher {
    pub fn new(config_path: PathBuf, store_dir: Option<PathBuf>, interval_secs: Option<u64>) -> Self {
        Self {
            config_path,
            store_dir,
            interval_secs,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Get the PID file path
    pub fn pid_file_path() -> Option<PathBuf> {
        dirs::runtime_dir()
            .or_else(dirs::cache_dir)
            .map(|d| d.join("shelfsync").join("watcher.pid"))
    }

    /// Check if another watcher is already running
    pub fn is_running() -> bool {
        Self::running_pid().is_some_and(Self::process_exists)
    }

    fn running_pid() -> Option<u32> {
        let pid_path = Self::pid_file_path()?;
        fs::read_to_string(pid_path).ok()?.trim().parse().ok()
    }

    #[cfg(unix)]
    fn process_exists(pid: u32) -> bool {
        std::process::Command::new("kill")
            .args(["-0", &pid.to_string()])
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    #[cfg(windows)]
    fn process_exists(pid: u32) -> bool {
        std::process::Command::new("tasklist")
            .args(["/FI", &format!("PID eq {}", pid)])
            .output()
            .map(|o| String::from_utf8_lossy(&o.stdout).contains(&pid.to_string()))
            .unwrap_or(false)
    }

    fn write_pid_file(&self) -> std::io::Result<()> {
        if let Some(pid_path) = Self::pid_file_path() {
            if let Some(parent) = pid_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut file = fs::File::create(&pid_path)?;
            writeln!(file, "{}", std::process::id())?;
        }
        Ok(())
    }

    fn remove_pid_file(&self) {
        if let Some(pid_path) = Self::pid_file_path() {
            let _ = fs::remove_file(pid_path);
        }
    }

    fn spawn_signal_handler(&self) {
        let running = self.running.clone();

        #[cfg(unix)]
        tokio::spawn(async move {
            use tokio::signal::unix::{signal, SignalKind};

            let (mut sigterm, mut sigint) =
                match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                    (Ok(term), Ok(int)) => (term, int),
                    (Err(e), _) | (_, Err(e)) => {
                        warn!("Failed to set up signal handlers: {}", e);
                        return;
                    }
                };

            tokio::select! {
                _ = sigterm.recv() => {},
                _ = sigint.recv() => {},
            }
            running.store(false, Ordering::SeqCst);
        });

        #[cfg(windows)]
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            running.store(false, Ordering::SeqCst);
        });
    }

    /// Poll until SIGTERM/SIGINT.
    pub async fn run(&self) -> Result<()> {
        if Self::is_running() {
            return Err(ShelfError::Other(
                "Another watcher instance is already running".to_string(),
            ));
        }

        let secs = match self.interval_secs {
            Some(secs) => secs,
            None => Config::load_from(&self.config_path)?.watcher.interval_secs,
        }
        .max(1);

        self.write_pid_file()
            .map_err(|e| ShelfError::Other(format!("Failed to write PID file: {}", e)))?;
        self.spawn_signal_handler();

        info!(
            "Watcher started (interval: {}, PID: {})",
            format_interval(secs),
            std::process::id()
        );

        let mut timer = interval(Duration::from_secs(secs));
        while self.running.load(Ordering::SeqCst) {
            timer.tick().await;

            if !self.running.load(Ordering::SeqCst) {
                break;
            }

            match self.check_once().await {
                Ok(Tick::Pending) => debug!("Reload marker still present"),
                Ok(Tick::Restarted) => info!("Reload marker removed, service restarted"),
                Ok(Tick::Synced(outcome)) => info!("Reload marker removed, pass finished: {:?}", outcome),
                Err(e) => warn!("Check failed: {}", e),
            }
        }

        info!("Watcher shutting down...");
        self.remove_pid_file();
        Ok(())
    }

    /// Check the marker once with freshly loaded settings.
    pub async fn check_once(&self) -> Result<Tick> {
        let mut config = Config::load_from(&self.config_path)?;
        let store_root = match &self.store_dir {
            Some(dir) => dir.clone(),
            None => config.store_root()?,
        };
        let store = FsStore::new(&store_root)?;

        if SentinelController::new(&store, &mut config, &self.config_path).reload_pending()? {
            return Ok(Tick::Pending);
        }

        if config.watcher.restart_command.is_empty() {
            let quota = config.max_articles;
            let mut ctx = AppContext::new(config, self.config_path.clone(), self.store_dir.clone())?;
            let outcome = commands::sync(&mut ctx, quota).await?;
            return Ok(Tick::Synced(outcome));
        }

        restart(&config.watcher.restart_command).await?;
        Ok(Tick::Restarted)
    }
}

async fn restart(command: &[String]) -> Result<()> {
    let Some((program, args)) = command.split_first() else {
        return Err(ShelfError::Other("Empty restart command".to_string()));
    };

    info!("Running {}", command.join(" "));
    let status = Command::new(program).args(args).status().await?;
    if !status.success() {
        return Err(ShelfError::Other(format!(
            "`{}` exited with {}",
            command.join(" "),
            status
        )));
    }
    Ok(())
}

/// Stop a running watcher by reading PID file and sending signal
pub fn stop_watcher() -> Result<()> {
    let pid_path = Watcher::pid_file_path()
        .ok_or_else(|| ShelfError::Other("Could not determine PID file path".to_string()))?;

    if !pid_path.exists() {
        return Err(ShelfError::Other(
            "No watcher is running (PID file not found)".to_string(),
        ));
    }

    let pid = Watcher::running_pid()
        .ok_or_else(|| ShelfError::Other("Invalid PID in PID file".to_string()))?;

    #[cfg(unix)]
    let status = std::process::Command::new("kill")
        .args(["-TERM", &pid.to_string()])
        .status()?;

    #[cfg(windows)]
    let status = std::process::Command::new("taskkill")
        .args(["/PID", &pid.to_string(), "/F"])
        .status()?;

    if status.success() {
        let _ = fs::remove_file(&pid_path);
        Ok(())
    } else {
        Err(ShelfError::Other(format!("Failed to stop watcher (PID {})", pid)))
    }
}

/// Check watcher status
pub fn watcher_status() -> String {
    match Watcher::running_pid() {
        Some(pid) if Watcher::process_exists(pid) => format!("Watcher is running (PID: {})", pid),
        Some(_) => "Watcher is not running (stale PID file)".to_string(),
        None => "Watcher is not running".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval("10s").unwrap(), 10);
        assert_eq!(parse_interval("5m").unwrap(), 300);
        assert_eq!(parse_interval("1h").unwrap(), 3600);
        assert_eq!(parse_interval("1d").unwrap(), 86400);
        assert_eq!(parse_interval(" 30 ").unwrap(), 30);
        assert!(parse_interval("soon").is_err());
    }

    #[test]
    fn test_parse_interval_rejects_overflow() {
        assert!(parse_interval("9999999999999999h").is_err());
        assert!(parse_interval("999999999999999999m").is_err());
        assert!(parse_interval("9999999999999999d").is_err());
        assert_eq!(parse_interval("18446744073709551615s").unwrap(), u64::MAX);
    }

    #[test]
    fn test_format_interval() {
        assert_eq!(format_interval(10), "10s");
        assert_eq!(format_interval(90), "90s");
        assert_eq!(format_interval(300), "5m");
        assert_eq!(format_interval(7200), "2h");
        assert_eq!(format_interval(86400), "1d");
    }

    /// Config with credentials and a restart command that touches `flag`.
    fn setup(dir: &TempDir) -> (PathBuf, PathBuf, PathBuf) {
        let config_path = dir.path().join("config.toml");
        let store_dir = dir.path().join("store");
        let flag = dir.path().join("restarted");

        let mut config = Config::default();
        config.pocket.consumer_key = "ck".into();
        config.pocket.access_token = "at".into();
        config.watcher.restart_command = vec![
            "sh".into(),
            "-c".into(),
            format!("touch '{}'", flag.display()),
        ];
        config.save_to(&config_path).unwrap();

        (config_path, store_dir, flag)
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_pending_marker_does_not_restart() {
        let dir = TempDir::new().unwrap();
        let (config_path, store_dir, flag) = setup(&dir);

        let store = FsStore::new(&store_dir).unwrap();
        let mut config = Config::load_from(&config_path).unwrap();
        let mut sentinel = SentinelController::new(&store, &mut config, &config_path);
        sentinel.ensure_target_folder().unwrap();
        sentinel.write_sentinel().unwrap();

        let watcher = Watcher::new(config_path, Some(store_dir), None);
        assert!(matches!(watcher.check_once().await.unwrap(), Tick::Pending));
        assert!(!flag.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_missing_marker_restarts_service() {
        let dir = TempDir::new().unwrap();
        let (config_path, store_dir, flag) = setup(&dir);

        let watcher = Watcher::new(config_path, Some(store_dir), None);
        assert!(matches!(watcher.check_once().await.unwrap(), Tick::Restarted));
        assert!(flag.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_restart_command_is_an_error() {
        let dir = TempDir::new().unwrap();
        let (config_path, store_dir, _) = setup(&dir);
        let mut config = Config::load_from(&config_path).unwrap();
        config.watcher.restart_command = vec!["false".into()];
        config.save_to(&config_path).unwrap();

        let watcher = Watcher::new(config_path, Some(store_dir), None);
        assert!(watcher.check_once().await.is_err());
    }
}
