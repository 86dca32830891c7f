//! Loopback HTTP stubs and service fixtures for tests.

use std::{
    fs,
    io::{Read, Write},
    net::{SocketAddr, TcpListener, TcpStream},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use url::Url;

use crate::{
    lifecycle_state::ServiceLifecycle,
    service_config::{ReadyProbeConfig, ServiceConfig},
    supervisor::Supervisor,
    BUNDLED_SERVICE_DIR, BUNDLED_SERVICE_EXECUTABLE,
};

pub(crate) struct StubResponse {
    pub(crate) status_line: &'static str,
    pub(crate) body: String,
}

impl StubResponse {
    pub(crate) fn new(status_line: &'static str, body: impl Into<String>) -> Self {
        Self {
            status_line,
            body: body.into(),
        }
    }
}

pub(crate) struct StubServer {
    pub(crate) addr: SocketAddr,
    pub(crate) hits: Arc<AtomicUsize>,
}

impl StubServer {
    pub(crate) fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub(crate) fn hit_count(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Serves every request that carries a request line with `respond`; bare
/// connections (TCP probes) are dropped.
pub(crate) fn spawn_stub_server<F>(respond: F) -> StubServer
where
    F: Fn(&str) -> StubResponse + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub listener");
    let addr = listener.local_addr().expect("stub listener addr");
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_for_thread = Arc::clone(&hits);

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else {
                continue;
            };
            let Some(request_line) = read_request_line(&mut stream) else {
                continue;
            };
            hits_for_thread.fetch_add(1, Ordering::SeqCst);
            let response = respond(&request_line);
            let payload = format!(
                "HTTP/1.1 {}\r\ncontent-length: {}\r\ncontent-type: application/json\r\nconnection: close\r\n\r\n{}",
                response.status_line,
                response.body.len(),
                response.body
            );
            let _ = stream.write_all(payload.as_bytes());
            let _ = stream.flush();
        }
    });

    StubServer { addr, hits }
}

/// Returns a loopback address with nothing listening on it.
pub(crate) fn unused_local_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind probe listener");
    listener.local_addr().expect("probe listener addr")
}

fn read_request_line(stream: &mut TcpStream) -> Option<String> {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let mut received = Vec::new();
    let mut chunk = [0_u8; 1024];
    loop {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(read) => {
                received.extend_from_slice(&chunk[..read]);
                if received.windows(4).any(|window| window == b"\r\n\r\n") {
                    break;
                }
            }
            Err(_) => break,
        }
    }
    let text = String::from_utf8_lossy(&received);
    let line = text.lines().next()?.trim().to_string();
    if line.is_empty() {
        None
    } else {
        Some(line)
    }
}

// Loops until a `stop` file appears in its working directory.
#[cfg(unix)]
pub(crate) const WAIT_FOR_STOP_FILE: &str =
    "echo launched >> launches\nwhile [ ! -f stop ]; do sleep 0.05; done\necho stopping\n";

/// Installs `script_body` as the bundled service executable under `install_dir`.
#[cfg(unix)]
pub(crate) fn write_service_script(install_dir: &Path, script_body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let bundle = install_dir.join(BUNDLED_SERVICE_DIR);
    fs::create_dir_all(&bundle).expect("create bundle dir");
    let executable = bundle.join(BUNDLED_SERVICE_EXECUTABLE);
    fs::write(&executable, format!("#!/bin/sh\n{script_body}")).expect("write script");
    let mut permissions = fs::metadata(&executable).expect("metadata").permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(&executable, permissions).expect("chmod");
    bundle
}

/// Short timeouts and probe delays so lifecycle tests settle quickly.
pub(crate) fn supervisor_config(log_dir: &Path, shutdown_url: &str, probe_attempts: u32) -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.log_dir = log_dir.to_path_buf();
    config.shutdown_url = Url::parse(shutdown_url).expect("shutdown url");
    config.shutdown_timeout = Duration::from_millis(800);
    config.exit_watch_interval = Duration::from_millis(20);
    config.ready_probe = ReadyProbeConfig {
        attempts: probe_attempts,
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(50),
        connect_timeout: Duration::from_millis(200),
    };
    config
}

pub(crate) fn unreachable_shutdown_url() -> String {
    format!("http://{}/api/v1/shutdown", unused_local_addr())
}

pub(crate) fn wait_for_lifecycle(supervisor: &Supervisor, expected: ServiceLifecycle) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while supervisor.lifecycle() != expected {
        assert!(
            Instant::now() < deadline,
            "lifecycle stuck at {:?}, expected {:?}",
            supervisor.lifecycle(),
            expected
        );
        thread::sleep(Duration::from_millis(20));
    }
}
