use std::{
    net::{SocketAddr, TcpStream, ToSocketAddrs},
    thread,
    time::Duration,
};

use url::Url;

use crate::service_config::ReadyProbeConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReadinessOutcome {
    Ready { attempts: u32 },
    Abandoned,
    Exhausted { attempts: u32 },
}

pub(crate) fn probe_addrs(url: &Url) -> Vec<SocketAddr> {
    let Some(host) = url.host_str() else {
        return Vec::new();
    };
    let port = url.port_or_known_default().unwrap_or(80);
    match (host, port).to_socket_addrs() {
        Ok(addrs) => addrs.collect(),
        Err(_) => Vec::new(),
    }
}

pub(crate) fn ping(addrs: &[SocketAddr], timeout: Duration) -> bool {
    addrs
        .iter()
        .any(|address| TcpStream::connect_timeout(address, timeout).is_ok())
}

pub(crate) fn next_delay(current: Duration, max_delay: Duration) -> Duration {
    current.saturating_mul(2).min(max_delay)
}

/// Polls the service port until it accepts a TCP connection.
///
/// `still_wanted` is checked before every attempt so the probe stops as soon
/// as the supervised process goes away.
pub(crate) fn wait_until_ready<F>(
    url: &Url,
    config: &ReadyProbeConfig,
    still_wanted: F,
) -> ReadinessOutcome
where
    F: Fn() -> bool,
{
    let mut delay = config.initial_delay;
    for attempt in 1..=config.attempts {
        if !still_wanted() {
            return ReadinessOutcome::Abandoned;
        }
        // Resolve on every attempt: localhost may map to several families.
        if ping(&probe_addrs(url), config.connect_timeout) {
            return ReadinessOutcome::Ready { attempts: attempt };
        }
        if attempt < config.attempts {
            thread::sleep(delay);
            delay = next_delay(delay, config.max_delay);
        }
    }
    ReadinessOutcome::Exhausted {
        attempts: config.attempts,
    }
}
