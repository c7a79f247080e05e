//! Process setup shared by both binaries: configuration, logging and the
//! local time zone.

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Local, MappedLocalTime, TimeDelta, TimeZone as _};
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use s3share_core::{AppConfig, TimeZone};
use std::path::{Path, PathBuf};
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Prefix of environment variables that override configuration values.
pub const ENV_PREFIX: &str = "S3SHARE_";

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "S3SHARE_CONFIG";

/// SDK targets that stay at `warn` unless debugging.
const QUIET_TARGETS: &[&str] = &[
    "aws_config",
    "aws_runtime",
    "aws_smithy_runtime",
    "aws_smithy_runtime_api",
    "aws_sdk_s3",
    "aws_sdk_dynamodb",
    "hyper",
    "sqlx",
];

/// Resolve the config file path.
///
/// Order: explicit flag, `S3SHARE_CONFIG`, `$XDG_CONFIG_HOME/s3share/config.toml`,
/// `$HOME/.config/s3share/config.toml`.
pub fn config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Ok(PathBuf::from(path));
    }

    let base = match std::env::var_os("XDG_CONFIG_HOME") {
        Some(path) => PathBuf::from(path),
        None => {
            let home = std::env::var_os("HOME")
                .ok_or_else(|| anyhow::anyhow!("HOME not set; set {CONFIG_ENV}"))?;
            PathBuf::from(home).join(".config")
        }
    };

    Ok(base.join("s3share").join("config.toml"))
}

/// Load configuration from `path` (optional) merged with `S3SHARE_*` variables.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let mut figment = Figment::new();
    let has_config_file = path.exists();

    if has_config_file {
        tracing::debug!(config_path = %path.display(), "loading configuration from file");
        figment = figment.merge(Toml::file(path));
    }

    let has_env_config =
        std::env::vars().any(|(key, _)| key.starts_with(ENV_PREFIX) && key != CONFIG_ENV);

    if !has_config_file && !has_env_config {
        anyhow::bail!(
            "No configuration provided.\n\n\
             Provide configuration via one of:\n  \
             1. Config file: {} (or --config / {CONFIG_ENV})\n  \
             2. Environment variables: S3SHARE_STORAGE__TYPE=s3 S3SHARE_STORAGE__BUCKET=... \
             S3SHARE_CATALOG__TYPE=dynamodb S3SHARE_CATALOG__TABLE=...",
            path.display()
        );
    }

    let config: AppConfig = figment
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Where the local state cache lives: `share.state_path`, else `$HOME/.s3share`.
pub fn state_path(config: &AppConfig) -> Result<PathBuf> {
    match &config.share.state_path {
        Some(path) => Ok(path.clone()),
        None => s3share_catalog::default_state_path().context("cannot locate local state file"),
    }
}

/// Install the stderr log subscriber.
///
/// `RUST_LOG` wins when set; otherwise `debug` > `verbose` > `warn`.
pub fn init_tracing(verbose: bool, debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose, debug)));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn default_filter(verbose: bool, debug: bool) -> String {
    if debug {
        return "debug".to_string();
    }
    let level = if verbose { "info" } else { "warn" };
    let mut directives = vec![level.to_string()];
    directives.extend(QUIET_TARGETS.iter().map(|target| format!("{target}=warn")));
    directives.join(",")
}

/// The machine's local time zone, daylight-saving rules included.
///
/// Backed by the system zone database (`TZ` or `/etc/localtime`), so lookups
/// are safe from any thread. Offsets that cannot be represented fall back
/// to UTC.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemZone;

impl TimeZone for SystemZone {
    fn offset_at(&self, at: OffsetDateTime) -> UtcOffset {
        match DateTime::from_timestamp(at.unix_timestamp(), 0) {
            Some(utc) => to_utc_offset(Local.offset_from_utc_datetime(&utc.naive_utc())),
            None => UtcOffset::UTC,
        }
    }

    fn offset_for_local(&self, local: PrimitiveDateTime) -> UtcOffset {
        // The same wall-clock reading as a chrono value.
        let Some(naive) = DateTime::from_timestamp(local.assume_utc().unix_timestamp(), 0)
            .map(|dt| dt.naive_utc())
        else {
            return UtcOffset::UTC;
        };

        match Local.offset_from_local_datetime(&naive) {
            MappedLocalTime::Single(offset) => to_utc_offset(offset),
            MappedLocalTime::Ambiguous(earliest, _) => to_utc_offset(earliest),
            // Skipped by a forward change: read it with the offset from a day
            // earlier, which predates the change.
            MappedLocalTime::None => {
                to_utc_offset(Local.offset_from_utc_datetime(&(naive - TimeDelta::days(1))))
            }
        }
    }
}

fn to_utc_offset(offset: FixedOffset) -> UtcOffset {
    UtcOffset::from_whole_seconds(offset.local_minus_utc()).unwrap_or(UtcOffset::UTC)
}

/// Single-threaded runtime; every remote call is awaited in sequence.
pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}

#[cfg(test)]
mod tests {
    use super::*;
    use s3share_core::{CatalogConfig, StorageConfig};
    use std::ffi::OsString;
    use std::future::Future;
    use std::sync::OnceLock;
    use tempfile::tempdir;
    use tokio::sync::Mutex;

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    async fn with_env_lock<F, Fut, T>(action: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _guard = ENV_LOCK.get_or_init(|| Mutex::new(())).lock().await;
        action().await
    }

    struct EnvVarGuard {
        key: &'static str,
        prev: Option<OsString>,
    }

    impl EnvVarGuard {
        fn set(key: &'static str, value: &str) -> Self {
            let prev = std::env::var_os(key);
            // SAFETY: env access in these tests is serialized by ENV_LOCK
            unsafe { std::env::set_var(key, value) };
            Self { key, prev }
        }

        fn unset(key: &'static str) -> Self {
            let prev = std::env::var_os(key);
            // SAFETY: env access in these tests is serialized by ENV_LOCK
            unsafe { std::env::remove_var(key) };
            Self { key, prev }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            // SAFETY: env access in these tests is serialized by ENV_LOCK
            unsafe {
                if let Some(value) = self.prev.take() {
                    std::env::set_var(self.key, value);
                } else {
                    std::env::remove_var(self.key);
                }
            }
        }
    }

    #[tokio::test]
    async fn config_path_prefers_flag_then_env_then_xdg() {
        with_env_lock(|| async {
            let temp = tempdir().unwrap();
            let _xdg = EnvVarGuard::set("XDG_CONFIG_HOME", temp.path().to_str().unwrap());
            let _unset = EnvVarGuard::unset(CONFIG_ENV);
            assert_eq!(
                config_path(None).unwrap(),
                temp.path().join("s3share").join("config.toml")
            );

            let _env = EnvVarGuard::set(CONFIG_ENV, "/tmp/s3share-env.toml");
            assert_eq!(
                config_path(None).unwrap(),
                PathBuf::from("/tmp/s3share-env.toml")
            );

            let explicit = config_path(Some(Path::new("/tmp/explicit.toml"))).unwrap();
            assert_eq!(explicit, PathBuf::from("/tmp/explicit.toml"));
        })
        .await;
    }

    #[tokio::test]
    async fn load_config_merges_file_and_env() {
        with_env_lock(|| async {
            let temp = tempdir().unwrap();
            let path = temp.path().join("config.toml");
            std::fs::write(
                &path,
                r#"
[storage]
type = "s3"
bucket = "shared"
region = "eu-west-1"

[catalog]
type = "dynamodb"
table = "uploads"

[share]
replace_non_urlsafe_characters = true
"#,
            )
            .unwrap();

            let _bucket = EnvVarGuard::set("S3SHARE_STORAGE__BUCKET", "override");
            let config = load_config(&path).unwrap();

            match &config.storage {
                StorageConfig::S3 {
                    bucket,
                    storage_class,
                    ..
                } => {
                    assert_eq!(bucket, "override");
                    assert_eq!(storage_class, "STANDARD_IA");
                }
                other => panic!("unexpected storage config: {other:?}"),
            }
            assert!(matches!(config.catalog, CatalogConfig::Dynamodb { .. }));
            assert!(config.share.replace_non_urlsafe_characters);
            assert_eq!(
                config.serve_base_url(),
                "https://s3.eu-west-1.amazonaws.com/override/"
            );
        })
        .await;
    }

    #[tokio::test]
    async fn load_config_requires_some_source() {
        with_env_lock(|| async {
            let temp = tempdir().unwrap();
            let has_env = std::env::vars().any(|(k, _)| k.starts_with(ENV_PREFIX) && k != CONFIG_ENV);
            if has_env {
                return;
            }
            let err = load_config(&temp.path().join("missing.toml")).unwrap_err();
            assert!(err.to_string().contains("No configuration provided"));
        })
        .await;
    }

    #[tokio::test]
    async fn load_config_rejects_invalid_values() {
        with_env_lock(|| async {
            let temp = tempdir().unwrap();
            let path = temp.path().join("config.toml");
            std::fs::write(
                &path,
                r#"
[storage]
type = "filesystem"
path = "/tmp/objects"

[catalog]
type = "dynamodb"
table = ""
"#,
            )
            .unwrap();

            let err = load_config(&path).unwrap_err();
            assert!(format!("{err:#}").contains("non-empty table"));
        })
        .await;
    }

    #[test]
    fn state_path_uses_configured_override() {
        let config = AppConfig::for_testing("/tmp/s3share-test");
        assert_eq!(
            state_path(&config).unwrap(),
            PathBuf::from("/tmp/s3share-test/state.json")
        );
    }

    #[test]
    fn system_zone_round_trips_wall_clock_times() {
        use time::macros::datetime;

        for at in [datetime!(2021-01-01 12:00 UTC), datetime!(2021-07-01 12:00 UTC)] {
            let local = at.to_offset(SystemZone.offset_at(at));
            let wall = PrimitiveDateTime::new(local.date(), local.time());
            assert_eq!(wall.assume_offset(SystemZone.offset_for_local(wall)), at);
        }
    }

    #[test]
    fn default_filter_quiets_sdk_unless_debugging() {
        assert_eq!(default_filter(false, true), "debug");
        let quiet = default_filter(true, false);
        assert!(quiet.starts_with("info,"));
        assert!(quiet.contains("aws_sdk_dynamodb=warn"));
        assert!(default_filter(false, false).starts_with("warn,"));
    }
}
