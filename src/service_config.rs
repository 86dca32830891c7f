use std::{env, path::PathBuf, time::Duration};

use url::Url;

use crate::{
    logging, runtime_paths, AUTO_UPDATE_CHECK_ENV, BUNDLED_SERVICE_DIR, BUNDLED_SERVICE_EXECUTABLE,
    DEFAULT_READY_PROBE_ATTEMPTS, DEFAULT_SERVICE_ARGS, DEFAULT_SHUTDOWN_TIMEOUT_MS,
    DEFAULT_SHUTDOWN_URL, DEFAULT_UPDATE_FEED_BASE_URL, DIAGNOSTIC_BUFFER_MAX_BYTES,
    EXIT_WATCH_INTERVAL, INSTALL_DIR_ENV, LOG_DIR_ENV, READY_PROBE_ATTEMPTS_ENV,
    READY_PROBE_ATTEMPTS_MAX, READY_PROBE_CONNECT_TIMEOUT, READY_PROBE_INITIAL_DELAY,
    READY_PROBE_MAX_DELAY, SERVER_ARGS_ENV, SERVER_DIR_NAME_ENV, SHUTDOWN_TIMEOUT_ENV,
    SHUTDOWN_TIMEOUT_MAX_MS, SHUTDOWN_TIMEOUT_MIN_MS, SHUTDOWN_URL_ENV, UPDATE_FEED_URL_ENV,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ReadyProbeConfig {
    pub(crate) attempts: u32,
    pub(crate) initial_delay: Duration,
    pub(crate) max_delay: Duration,
    pub(crate) connect_timeout: Duration,
}

impl Default for ReadyProbeConfig {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_READY_PROBE_ATTEMPTS,
            initial_delay: READY_PROBE_INITIAL_DELAY,
            max_delay: READY_PROBE_MAX_DELAY,
            connect_timeout: READY_PROBE_CONNECT_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ServiceConfig {
    pub(crate) install_dir_override: Option<PathBuf>,
    pub(crate) service_dir_name: String,
    pub(crate) executable_name: String,
    pub(crate) args: Vec<String>,
    pub(crate) shutdown_url: Url,
    pub(crate) shutdown_timeout: Duration,
    pub(crate) ready_probe: ReadyProbeConfig,
    pub(crate) update_feed_base_url: String,
    pub(crate) auto_update_check: bool,
    pub(crate) log_dir_override: Option<PathBuf>,
    /// Desktop log and per-run service output files.
    pub(crate) log_dir: PathBuf,
    pub(crate) diagnostic_buffer_bytes: usize,
    pub(crate) exit_watch_interval: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl ServiceConfig {
    pub(crate) fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let shutdown_url = read(SHUTDOWN_URL_ENV)
            .and_then(|raw| match parse_http_url(&raw) {
                Ok(url) => Some(url),
                Err(error) => {
                    tracing::warn!("ignoring {SHUTDOWN_URL_ENV}={raw:?}: {error}");
                    None
                }
            })
            .unwrap_or_else(default_shutdown_url);

        let args = read(SERVER_ARGS_ENV)
            .and_then(|raw| match shlex::split(&raw) {
                Some(args) => Some(args),
                None => {
                    tracing::warn!("ignoring unparsable {SERVER_ARGS_ENV}={raw:?}");
                    None
                }
            })
            .unwrap_or_else(|| DEFAULT_SERVICE_ARGS.iter().map(|arg| arg.to_string()).collect());

        let shutdown_timeout_ms = parse_clamped_u64(
            read(SHUTDOWN_TIMEOUT_ENV).as_deref(),
            DEFAULT_SHUTDOWN_TIMEOUT_MS,
            SHUTDOWN_TIMEOUT_MIN_MS,
            SHUTDOWN_TIMEOUT_MAX_MS,
            SHUTDOWN_TIMEOUT_ENV,
        );
        let ready_probe_attempts = u32::try_from(parse_clamped_u64(
            read(READY_PROBE_ATTEMPTS_ENV).as_deref(),
            u64::from(DEFAULT_READY_PROBE_ATTEMPTS),
            0,
            u64::from(READY_PROBE_ATTEMPTS_MAX),
            READY_PROBE_ATTEMPTS_ENV,
        ))
        .unwrap_or(DEFAULT_READY_PROBE_ATTEMPTS);
        let log_dir_override = read(LOG_DIR_ENV).map(PathBuf::from);
        let log_dir = logging::resolve_log_dir(
            log_dir_override.as_deref(),
            runtime_paths::default_data_root_dir().as_deref(),
        );

        Self {
            install_dir_override: read(INSTALL_DIR_ENV).map(PathBuf::from),
            service_dir_name: read(SERVER_DIR_NAME_ENV)
                .unwrap_or_else(|| BUNDLED_SERVICE_DIR.to_string()),
            executable_name: format!("{BUNDLED_SERVICE_EXECUTABLE}{}", env::consts::EXE_SUFFIX),
            args,
            shutdown_url,
            shutdown_timeout: Duration::from_millis(shutdown_timeout_ms),
            ready_probe: ReadyProbeConfig {
                attempts: ready_probe_attempts,
                ..ReadyProbeConfig::default()
            },
            update_feed_base_url: read(UPDATE_FEED_URL_ENV)
                .map(|raw| raw.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_UPDATE_FEED_BASE_URL.to_string()),
            auto_update_check: read(AUTO_UPDATE_CHECK_ENV)
                .map(|raw| parse_flag(&raw))
                .unwrap_or(true),
            log_dir_override,
            log_dir,
            diagnostic_buffer_bytes: DIAGNOSTIC_BUFFER_MAX_BYTES,
            exit_watch_interval: EXIT_WATCH_INTERVAL,
        }
    }
}

fn default_shutdown_url() -> Url {
    // The constant is a well-formed absolute URL.
    Url::parse(DEFAULT_SHUTDOWN_URL).expect("default shutdown url must parse")
}

pub(crate) fn parse_http_url(raw: &str) -> Result<Url, String> {
    let parsed = Url::parse(raw.trim()).map_err(|error| format!("invalid url: {error}"))?;
    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(format!("unsupported scheme '{scheme}'")),
    }
    if parsed.host_str().is_none() {
        return Err("url has no host".to_string());
    }
    Ok(parsed)
}

fn parse_clamped_u64(raw: Option<&str>, default: u64, min: u64, max: u64, key: &str) -> u64 {
    let Some(raw) = raw else {
        return default;
    };
    match raw.parse::<u64>() {
        Ok(value) => value.clamp(min, max),
        Err(_) => {
            tracing::warn!("ignoring non-numeric {key}={raw:?}, using {default}");
            default
        }
    }
}

fn parse_flag(raw: &str) -> bool {
    !matches!(
        raw.to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}
