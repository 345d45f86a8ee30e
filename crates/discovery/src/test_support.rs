//! In-memory host used by the unit tests.

use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use rlgrab_netscan::{ConnectionInfo, NetScanError};

use crate::host::Host;

pub fn conn(remote: [u8; 4], port: u16, pid: u32) -> ConnectionInfo {
    ConnectionInfo {
        local_address: Ipv4Addr::new(192, 168, 1, 20),
        local_port: 50000 + port,
        remote_address: Ipv4Addr::from(remote),
        remote_port: port,
        owner_pid: pid,
    }
}

#[derive(Debug, Default)]
pub struct FakeHost {
    pid: Mutex<Option<u32>>,
    connections: Mutex<Vec<ConnectionInfo>>,
    fail_enumeration: AtomicBool,
    log_path: Option<PathBuf>,
    enumerations: AtomicUsize,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pid(self, pid: u32) -> Self {
        self.set_pid(Some(pid));
        self
    }

    pub fn with_connections(self, connections: Vec<ConnectionInfo>) -> Self {
        self.set_connections(connections);
        self
    }

    pub fn with_log_path(mut self, path: impl AsRef<Path>) -> Self {
        self.log_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn failing_enumeration(self) -> Self {
        self.fail_enumeration.store(true, Ordering::SeqCst);
        self
    }

    pub fn set_pid(&self, pid: Option<u32>) {
        *self.pid.lock().unwrap() = pid;
    }

    pub fn set_connections(&self, connections: Vec<ConnectionInfo>) {
        *self.connections.lock().unwrap() = connections;
    }

    pub fn enumerations(&self) -> usize {
        self.enumerations.load(Ordering::SeqCst)
    }
}

impl Host for FakeHost {
    fn find_process_id(&self, _executable: &str) -> Option<u32> {
        *self.pid.lock().unwrap()
    }

    fn enumerate_connections(&self) -> Result<Vec<ConnectionInfo>, NetScanError> {
        self.enumerations.fetch_add(1, Ordering::SeqCst);
        if self.fail_enumeration.load(Ordering::SeqCst) {
            return Err(NetScanError::Enumeration("fake failure".into()));
        }
        Ok(self.connections.lock().unwrap().clone())
    }

    fn log_path(&self) -> Option<PathBuf> {
        self.log_path.clone()
    }
}
