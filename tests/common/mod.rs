//! Shared fakes for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use rack_external::region::{
    Connection, ConnectionRegistry, ConnectionSet, ControllerType, DnsSettings, ProxySettings,
    RegionClient, RpcError, TimeSettings,
};
use rack_external::reconcile::{Intervals, RackExternalService};
use rack_external::services::{
    rack_services, DnsWriter, DnssecValidation, ProxyWriter, ServiceError, TimeWriter,
};
use rack_external::supervisor::{ServiceSupervisor, SupervisorError};

/// Ordered log of every side effect, shared by all recorders.
#[derive(Clone, Default)]
pub struct Calls(Arc<Mutex<Vec<String>>>);

impl Calls {
    pub fn push(&self, call: impl Into<String>) {
        self.0.lock().unwrap().push(call.into());
    }

    pub fn all(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn with_prefix(&self, prefix: &str) -> Vec<String> {
        self.all().into_iter().filter(|c| c.starts_with(prefix)).collect()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    UnknownNode,
    NoConnections,
    Unexpected,
}

pub struct RegionState {
    pub controller: ControllerType,
    pub time: TimeSettings,
    pub dns: DnsSettings,
    pub proxy: ProxySettings,
    pub connections: ConnectionSet,
    pub failure: Option<Failure>,
}

impl Default for RegionState {
    fn default() -> Self {
        Self {
            controller: ControllerType { is_region: false, is_rack: true },
            time: TimeSettings {
                servers: vec!["ntp.ubuntu.com".into()],
                peers: Vec::new(),
            },
            dns: DnsSettings {
                trusted_networks: vec!["192.168.1.0/24".into()],
            },
            proxy: ProxySettings::default(),
            connections: ConnectionSet::new(),
            failure: None,
        }
    }
}

/// Region client and connection registry backed by mutable state.
#[derive(Default)]
pub struct FakeRegion {
    pub state: Mutex<RegionState>,
    pub calls: AtomicUsize,
}

impl FakeRegion {
    pub fn update(&self, f: impl FnOnce(&mut RegionState)) {
        f(&mut self.state.lock().unwrap());
    }

    fn answer<T>(&self, system_id: &str, get: impl FnOnce(&RegionState) -> T) -> Result<T, RpcError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        match state.failure {
            Some(Failure::UnknownNode) => Err(RpcError::NoSuchNode(system_id.to_string())),
            Some(Failure::NoConnections) => Err(RpcError::NoConnectionsAvailable),
            Some(Failure::Unexpected) => Err(RpcError::Unexpected("boom".into())),
            None => Ok(get(&state)),
        }
    }
}

#[async_trait]
impl RegionClient for FakeRegion {
    async fn controller_type(&self, system_id: &str) -> Result<ControllerType, RpcError> {
        self.answer(system_id, |s| s.controller)
    }

    async fn time_configuration(&self, system_id: &str) -> Result<TimeSettings, RpcError> {
        self.answer(system_id, |s| s.time.clone())
    }

    async fn dns_configuration(&self, system_id: &str) -> Result<DnsSettings, RpcError> {
        self.answer(system_id, |s| s.dns.clone())
    }

    async fn proxy_configuration(&self, system_id: &str) -> Result<ProxySettings, RpcError> {
        self.answer(system_id, |s| s.proxy.clone())
    }
}

impl ConnectionRegistry for FakeRegion {
    fn connections(&self) -> ConnectionSet {
        self.state.lock().unwrap().connections.clone()
    }
}

pub fn connection_set(conns: &[(&str, &str)]) -> ConnectionSet {
    conns
        .iter()
        .map(|(label, addr)| (label.to_string(), Connection::new(*label, addr.parse().unwrap())))
        .collect()
}

pub struct RecordingSupervisor {
    pub calls: Calls,
    pub restart_only: bool,
    pub fail: AtomicBool,
}

impl RecordingSupervisor {
    pub fn new(calls: Calls) -> Self {
        Self {
            calls,
            restart_only: false,
            fail: AtomicBool::new(false),
        }
    }

    fn result(&self, action: &str, service: &str) -> Result<(), SupervisorError> {
        self.calls.push(format!("supervisor.{} {}", action, service));
        if self.fail.load(Ordering::SeqCst) {
            Err(SupervisorError::Command {
                action: action.into(),
                unit: service.into(),
                detail: "injected".into(),
            })
        } else {
            Ok(())
        }
    }
}

impl ServiceSupervisor for RecordingSupervisor {
    fn on(&self, service: &str) {
        self.calls.push(format!("supervisor.on {}", service));
    }

    fn off(&self, service: &str, reason: &str) {
        self.calls.push(format!("supervisor.off {} ({})", service, reason));
    }

    fn any(&self, service: &str, reason: &str) {
        self.calls.push(format!("supervisor.any {} ({})", service, reason));
    }

    fn ensure_service(&self, service: &str) -> Result<(), SupervisorError> {
        self.result("ensure", service)
    }

    fn restart_service(&self, service: &str) -> Result<(), SupervisorError> {
        self.result("restart", service)
    }

    fn reload_service(&self, service: &str) -> Result<(), SupervisorError> {
        self.result("reload", service)
    }

    fn restart_only(&self) -> bool {
        self.restart_only
    }
}

pub struct RecordingTimeWriter {
    pub calls: Calls,
    pub fail: AtomicBool,
}

impl TimeWriter for RecordingTimeWriter {
    fn configure(&self, references: &[String], peers: &[String]) -> std::io::Result<()> {
        self.calls.push(format!("ntp.configure {:?} {:?}", references, peers));
        fail_if(&self.fail)
    }
}

pub struct RecordingDnsWriter {
    pub calls: Calls,
    pub fail: AtomicBool,
}

impl DnsWriter for RecordingDnsWriter {
    fn write_options(&self, upstream_dns: &[String], dnssec_validation: DnssecValidation) -> std::io::Result<()> {
        self.calls.push(format!(
            "dns.options {:?} dnssec={}",
            upstream_dns,
            dnssec_validation.as_str()
        ));
        fail_if(&self.fail)
    }

    fn write_configuration(&self, zones: &[String], trusted_networks: &[String]) -> std::io::Result<()> {
        self.calls.push(format!("dns.configuration {:?} {:?}", zones, trusted_networks));
        fail_if(&self.fail)
    }

    fn reload_with_retries(&self) -> Result<(), ServiceError> {
        self.calls.push("dns.reload");
        Ok(())
    }
}

pub struct RecordingProxyWriter {
    pub calls: Calls,
    pub fail: AtomicBool,
}

impl ProxyWriter for RecordingProxyWriter {
    fn write_config(
        &self,
        allowed_cidrs: &[String],
        peer_proxies: &[String],
        prefer_v4_proxy: bool,
        port: u16,
    ) -> std::io::Result<()> {
        self.calls.push(format!(
            "proxy.write {:?} {:?} v4={} port={}",
            allowed_cidrs, peer_proxies, prefer_v4_proxy, port
        ));
        fail_if(&self.fail)
    }
}

fn fail_if(flag: &AtomicBool) -> std::io::Result<()> {
    if flag.load(Ordering::SeqCst) {
        Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "injected"))
    } else {
        Ok(())
    }
}

/// A loop wired entirely to fakes.
pub struct Harness {
    pub region: Arc<FakeRegion>,
    pub calls: Calls,
    pub supervisor: Arc<RecordingSupervisor>,
    pub time_writer: Arc<RecordingTimeWriter>,
    pub dns_writer: Arc<RecordingDnsWriter>,
    pub proxy_writer: Arc<RecordingProxyWriter>,
}

impl Harness {
    pub fn new() -> Self {
        let calls = Calls::default();
        Self {
            region: Arc::new(FakeRegion::default()),
            supervisor: Arc::new(RecordingSupervisor::new(calls.clone())),
            time_writer: Arc::new(RecordingTimeWriter {
                calls: calls.clone(),
                fail: AtomicBool::new(false),
            }),
            dns_writer: Arc::new(RecordingDnsWriter {
                calls: calls.clone(),
                fail: AtomicBool::new(false),
            }),
            proxy_writer: Arc::new(RecordingProxyWriter {
                calls: calls.clone(),
                fail: AtomicBool::new(false),
            }),
            calls,
        }
    }

    pub fn service(&self) -> RackExternalService {
        self.service_with_intervals(Intervals::default())
    }

    pub fn service_with_intervals(&self, intervals: Intervals) -> RackExternalService {
        let services = rack_services(
            self.time_writer.clone(),
            self.dns_writer.clone(),
            self.proxy_writer.clone(),
            self.supervisor.clone(),
        );
        RackExternalService::new(
            "abc123",
            self.region.clone(),
            self.region.clone(),
            services,
            intervals,
        )
    }
}

/// A local HTTP server standing in for one region controller.
pub struct RegionStub {
    pub addr: SocketAddr,
    task: tokio::task::JoinHandle<()>,
}

impl RegionStub {
    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// Close the listening socket; later connects are refused.
    pub async fn stop(self) {
        self.task.abort();
        let _ = self.task.await;
    }
}

/// Serve canned `(status, body)` responses keyed by path suffix.
pub async fn start_region_stub(routes: Vec<(&'static str, u16, &'static str)>) -> RegionStub {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let routes = Arc::new(routes);

    let task = tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let routes = routes.clone();
            tokio::spawn(async move {
                let mut buf = vec![0u8; 4096];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buf[..n]);
                let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();

                let (status, body) = routes
                    .iter()
                    .find(|(suffix, _, _)| path.ends_with(suffix))
                    .map(|(_, status, body)| (*status, *body))
                    .unwrap_or((404, "{}"));
                let status_text = match status {
                    200 => "200 OK",
                    404 => "404 Not Found",
                    _ => "500 Internal Server Error",
                };

                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_text,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    RegionStub { addr, task }
}
