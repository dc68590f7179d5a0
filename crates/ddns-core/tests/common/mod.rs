//! Test doubles and common utilities for monitor contract tests
//!
//! The doubles are cheap to clone; clones share counters so a test can keep
//! a handle while the monitor owns the boxed original.

#![allow(dead_code)]

use ddns_core::error::{Error, Result};
use ddns_core::traits::{DnsProvider, IpSource, UpdateResult};
use ddns_core::{MemoryAddressStore, MonitorConfig, MonitorEvent, MonitorLoop, PublicAddress};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Outcome a scripted source returns for one call
#[derive(Debug, Clone)]
pub enum Resolve {
    Ok(PublicAddress),
    Status(u16),
}

/// An IpSource that replays a script, repeating the last entry forever
#[derive(Clone)]
pub struct ScriptedIpSource {
    script: Arc<Mutex<VecDeque<Resolve>>>,
    last: Arc<Mutex<Option<Resolve>>>,
    call_count: Arc<AtomicUsize>,
    call_times: Arc<Mutex<Vec<tokio::time::Instant>>>,
}

impl ScriptedIpSource {
    pub fn new(script: Vec<Resolve>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            last: Arc::new(Mutex::new(None)),
            call_count: Arc::new(AtomicUsize::new(0)),
            call_times: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A source that always resolves to `ip`
    pub fn fixed(ip: PublicAddress) -> Self {
        Self::new(vec![Resolve::Ok(ip)])
    }

    /// Get the number of times current() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Instants at which current() was called
    pub fn call_times(&self) -> Vec<tokio::time::Instant> {
        self.call_times.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl IpSource for ScriptedIpSource {
    async fn current(&self) -> Result<PublicAddress> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.call_times
            .lock()
            .unwrap()
            .push(tokio::time::Instant::now());

        let next = {
            let mut script = self.script.lock().unwrap();
            let mut last = self.last.lock().unwrap();
            if let Some(step) = script.pop_front() {
                *last = Some(step);
            }
            last.clone().expect("script must not be empty")
        };

        match next {
            Resolve::Ok(ip) => Ok(ip),
            Resolve::Status(code) => Err(Error::ip_source(format!(
                "unsuccessful status code returned from API: {}",
                code
            ))),
        }
    }

    fn source_name(&self) -> &'static str {
        "scripted"
    }
}

/// A mock DnsProvider that records calls and can be told to fail or stall
#[derive(Clone)]
pub struct MockDnsProvider {
    update_call_count: Arc<AtomicUsize>,
    updated_ips: Arc<Mutex<Vec<PublicAddress>>>,
    fail: Arc<AtomicBool>,
    delay: Arc<Mutex<Option<Duration>>>,
}

impl MockDnsProvider {
    pub fn new() -> Self {
        Self {
            update_call_count: Arc::new(AtomicUsize::new(0)),
            updated_ips: Arc::new(Mutex::new(Vec::new())),
            fail: Arc::new(AtomicBool::new(false)),
            delay: Arc::new(Mutex::new(None)),
        }
    }

    /// A provider whose calls always fail
    pub fn failing() -> Self {
        let provider = Self::new();
        provider.set_fail(true);
        provider
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Make each update take `delay` before answering
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Get the number of times update_record() was called
    pub fn update_call_count(&self) -> usize {
        self.update_call_count.load(Ordering::SeqCst)
    }

    /// Addresses passed to update_record(), in order
    pub fn updated_ips(&self) -> Vec<PublicAddress> {
        self.updated_ips.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn update_record(&self, new_ip: PublicAddress) -> Result<UpdateResult> {
        self.update_call_count.fetch_add(1, Ordering::SeqCst);
        self.updated_ips.lock().unwrap().push(new_ip);

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::provider("mock", "badauth"));
        }

        Ok(UpdateResult::Updated { new_ip })
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

pub fn ip(text: &str) -> PublicAddress {
    text.parse().expect("valid test address")
}

/// Build a monitor over clones of the given doubles
pub fn monitor_with(
    source: &ScriptedIpSource,
    provider: &MockDnsProvider,
    store: &MemoryAddressStore,
    config: MonitorConfig,
) -> (MonitorLoop, mpsc::Receiver<MonitorEvent>) {
    MonitorLoop::new(
        Box::new(source.clone()),
        Box::new(provider.clone()),
        Box::new(store.clone()),
        config,
    )
    .expect("monitor construction succeeds")
}

/// Monitor settings used by most tests
pub fn minimal_config() -> MonitorConfig {
    MonitorConfig::new(Duration::from_secs(60))
}

/// Drain every event currently buffered
pub fn drain(rx: &mut mpsc::Receiver<MonitorEvent>) -> Vec<MonitorEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
