use std::{
    env, fs,
    net::SocketAddr,
    panic,
    path::{Path, PathBuf},
    str::FromStr,
    thread,
    time::{Duration, SystemTime},
};
use tokio::net::TcpListener;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

const DEFAULT_LOG_DIR: &str = "/var/log/quiztrack";

/// Keeps the non-blocking file writer alive; drop it only on shutdown.
pub struct TracingGuards {
    _file_guard: Option<WorkerGuard>,
}

/// Where and how long service logs are kept.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogSettings {
    pub service_name: String,
    pub log_root: PathBuf,
    pub retention_days: u64,
    pub cleanup_interval_minutes: u64,
}

impl LogSettings {
    pub fn from_env(service_name: &str) -> Self {
        let log_dir = env::var("LOG_DIR").unwrap_or_else(|_| DEFAULT_LOG_DIR.to_string());
        Self {
            service_name: service_name.to_string(),
            log_root: PathBuf::from(log_dir).join(service_name),
            retention_days: env_or("LOG_RETENTION_DAYS", 14u64),
            cleanup_interval_minutes: env_or("LOG_CLEANUP_INTERVAL_MINUTES", 360u64),
        }
    }

    fn file_name(&self) -> String {
        format!("{}.log", self.service_name)
    }
}

pub fn init_tracing(service_name: &str) -> TracingGuards {
    init_tracing_with(LogSettings::from_env(service_name))
}

pub fn init_tracing_with(settings: LogSettings) -> TracingGuards {
    // RUST_LOG wins over the default level.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let (file_layer, file_guard) = match rolling_writer(&settings) {
        Some((writer, guard)) => (Some(fmt::layer().with_writer(writer)), Some(guard)),
        None => (None, None),
    };

    if let Some(layer) = file_layer {
        let subscriber = Registry::default()
            .with(filter)
            .with(stdout_layer)
            .with(layer);
        let _ = tracing::subscriber::set_global_default(subscriber);
    } else {
        let subscriber = Registry::default().with(filter).with(stdout_layer);
        let _ = tracing::subscriber::set_global_default(subscriber);
        tracing::warn!(
            log_root = %settings.log_root.display(),
            "file logging disabled, log directory not writable"
        );
    }

    if file_guard.is_some() {
        spawn_log_cleanup(
            settings.log_root.clone(),
            settings.retention_days,
            settings.cleanup_interval_minutes,
        );
    }

    TracingGuards {
        _file_guard: file_guard,
    }
}

fn rolling_writer(
    settings: &LogSettings,
) -> Option<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    fs::create_dir_all(&settings.log_root).ok()?;
    // The rolling appender panics when it cannot open the initial file.
    let appender = panic::catch_unwind(|| {
        tracing_appender::rolling::daily(&settings.log_root, settings.file_name())
    })
    .ok()?;
    Some(tracing_appender::non_blocking(appender))
}

/// Parse a typed environment value, falling back to `default` when unset or malformed.
pub fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<T>().ok())
        .unwrap_or(default)
}

/// Read a required environment value; blank values count as missing.
pub fn env_required(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn spawn_log_cleanup(log_root: PathBuf, retention_days: u64, cleanup_interval_minutes: u64) {
    if retention_days == 0 || cleanup_interval_minutes == 0 {
        return;
    }

    let retention = Duration::from_secs(retention_days * 24 * 60 * 60);
    let interval = Duration::from_secs(cleanup_interval_minutes * 60);

    thread::spawn(move || loop {
        if let Some(cutoff) = SystemTime::now().checked_sub(retention) {
            cleanup_old_logs(&log_root, cutoff);
        }
        thread::sleep(interval);
    });
}

fn cleanup_old_logs(root: &Path, cutoff: SystemTime) {
    let Ok(entries) = fs::read_dir(root) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            cleanup_old_logs(&path, cutoff);
            continue;
        }
        let modified = fs::metadata(&path).and_then(|metadata| metadata.modified());
        if matches!(modified, Ok(modified) if modified < cutoff) {
            let _ = fs::remove_file(&path);
        }
    }
}

/// Bind on all interfaces for container compatibility.
pub async fn bind_listener(port: u16) -> std::io::Result<TcpListener> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    TcpListener::bind(addr).await
}

pub async fn shutdown_signal() {
    // Handle ctrl-c and SIGTERM to allow graceful shutdown.
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {},
                    _ = sigterm.recv() => {},
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "sigterm handler unavailable, waiting for ctrl-c");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_or_falls_back_on_unparsable_value() {
        env::set_var("QUIZTRACK_TEST_PORT", "not-a-port");
        assert_eq!(env_or("QUIZTRACK_TEST_PORT", 8080u16), 8080);
        env::set_var("QUIZTRACK_TEST_PORT", "9090");
        assert_eq!(env_or("QUIZTRACK_TEST_PORT", 8080u16), 9090);
        env::remove_var("QUIZTRACK_TEST_PORT");
    }

    #[test]
    fn env_required_treats_blank_as_missing() {
        env::set_var("QUIZTRACK_TEST_REQUIRED", "   ");
        assert_eq!(env_required("QUIZTRACK_TEST_REQUIRED"), None);
        env::set_var("QUIZTRACK_TEST_REQUIRED", " postgres://db ");
        assert_eq!(
            env_required("QUIZTRACK_TEST_REQUIRED").as_deref(),
            Some("postgres://db")
        );
        env::remove_var("QUIZTRACK_TEST_REQUIRED");
        assert_eq!(env_required("QUIZTRACK_TEST_REQUIRED"), None);
    }

    #[test]
    fn log_root_is_scoped_by_service() {
        let settings = LogSettings {
            service_name: "telemetry-service".to_string(),
            log_root: PathBuf::from("/tmp/logs/telemetry-service"),
            retention_days: 1,
            cleanup_interval_minutes: 1,
        };
        assert_eq!(settings.file_name(), "telemetry-service.log");
    }

    #[test]
    fn cleanup_removes_only_stale_files() {
        let root = env::temp_dir().join(format!("quiztrack-cleanup-{}", std::process::id()));
        fs::create_dir_all(root.join("nested")).unwrap();
        let stale = root.join("nested").join("old.log");
        fs::write(&stale, "old").unwrap();

        // Nothing is older than a cutoff in the distant past.
        cleanup_old_logs(&root, SystemTime::UNIX_EPOCH);
        assert!(stale.exists());

        let future = SystemTime::now() + Duration::from_secs(60);
        cleanup_old_logs(&root, future);
        assert!(!stale.exists());
        let _ = fs::remove_dir_all(&root);
    }
}
