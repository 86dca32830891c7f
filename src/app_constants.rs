use std::time::Duration;

pub(crate) const MAIN_WINDOW_LABEL: &str = "main";
pub(crate) const MAIN_WINDOW_TITLE: &str = "OpenBazaar";
pub(crate) const MAIN_WINDOW_ENTRY: &str = "index.html";
pub(crate) const TRAY_ID: &str = "openbazaar-tray";

pub(crate) const BUNDLED_SERVICE_DIR: &str = "OpenBazaar-Server";
pub(crate) const BUNDLED_SERVICE_EXECUTABLE: &str = "openbazaard";
pub(crate) const DEFAULT_SERVICE_ARGS: [&str; 4] = ["start", "--testnet", "--loglevel", "debug"];

pub(crate) const DEFAULT_SHUTDOWN_URL: &str = "http://localhost:18469/api/v1/shutdown";
pub(crate) const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 3_000;
pub(crate) const SHUTDOWN_TIMEOUT_MIN_MS: u64 = 500;
pub(crate) const SHUTDOWN_TIMEOUT_MAX_MS: u64 = 30_000;
// Outer bound for the whole quit sequence, on top of the request timeout.
pub(crate) const EXIT_CLEANUP_GRACE: Duration = Duration::from_millis(500);

pub(crate) const DEFAULT_READY_PROBE_ATTEMPTS: u32 = 40;
pub(crate) const READY_PROBE_ATTEMPTS_MAX: u32 = 1_000;
pub(crate) const READY_PROBE_INITIAL_DELAY: Duration = Duration::from_millis(250);
pub(crate) const READY_PROBE_MAX_DELAY: Duration = Duration::from_secs(2);
pub(crate) const READY_PROBE_CONNECT_TIMEOUT: Duration = Duration::from_millis(800);

pub(crate) const EXIT_WATCH_INTERVAL: Duration = Duration::from_millis(250);
pub(crate) const DIAGNOSTIC_BUFFER_MAX_BYTES: usize = 64 * 1024;

pub(crate) const DEFAULT_UPDATE_FEED_BASE_URL: &str = "http://updates.openbazaar.org:5000/update";
pub(crate) const UPDATE_FEED_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) const DESKTOP_LOG_FILE: &str = "desktop.log";
pub(crate) const DESKTOP_DATA_DIR: &str = ".openbazaar-desktop";
pub(crate) const DEFAULT_LOG_FILTER: &str = "openbazaar_desktop=info";
pub(crate) const SERVICE_OUTPUT_TARGET: &str = "openbazaar_desktop::service_output";
pub(crate) const SERVICE_OUTPUT_FILE_PREFIX: &str = "openbazaard";
pub(crate) const OUTPUT_TAIL_INTERVAL: Duration = Duration::from_millis(100);

pub(crate) const INSTALL_DIR_ENV: &str = "OPENBAZAAR_INSTALL_DIR";
pub(crate) const SERVER_DIR_NAME_ENV: &str = "OPENBAZAAR_SERVER_DIR_NAME";
pub(crate) const SERVER_ARGS_ENV: &str = "OPENBAZAAR_SERVER_ARGS";
pub(crate) const SHUTDOWN_URL_ENV: &str = "OPENBAZAAR_SHUTDOWN_URL";
pub(crate) const SHUTDOWN_TIMEOUT_ENV: &str = "OPENBAZAAR_SHUTDOWN_TIMEOUT_MS";
pub(crate) const READY_PROBE_ATTEMPTS_ENV: &str = "OPENBAZAAR_READY_PROBE_ATTEMPTS";
pub(crate) const UPDATE_FEED_URL_ENV: &str = "OPENBAZAAR_UPDATE_FEED_URL";
pub(crate) const AUTO_UPDATE_CHECK_ENV: &str = "OPENBAZAAR_AUTO_UPDATE_CHECK";
pub(crate) const LOG_DIR_ENV: &str = "OPENBAZAAR_LOG_DIR";

#[cfg(target_os = "windows")]
pub(crate) const CREATE_NO_WINDOW: u32 = 0x0800_0000;
#[cfg(target_os = "windows")]
pub(crate) const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
