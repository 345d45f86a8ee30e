//! Linux backend reading procfs.
//!
//! The target normally runs under Proton/Wine here, so the process is found
//! through the Windows-style path in `argv[0]` as well as through `comm`.

use std::collections::HashMap;
use std::fs;
use std::net::Ipv4Addr;
use std::path::Path;

use crate::{ConnectionInfo, NetScanError, same_executable};

const PROC_ROOT: &str = "/proc";

/// Kernel truncates `comm` to 15 bytes.
const COMM_MAX: usize = 15;

pub fn find_process_id(executable: &str) -> Option<u32> {
    find_process_id_in(Path::new(PROC_ROOT), executable)
}

pub fn enumerate_tcp_connections() -> Result<Vec<ConnectionInfo>, NetScanError> {
    enumerate_tcp_connections_in(Path::new(PROC_ROOT))
}

fn find_process_id_in(proc_root: &Path, executable: &str) -> Option<u32> {
    let mut pids = list_pids(proc_root);
    pids.sort_unstable();
    pids.into_iter()
        .find(|&pid| process_matches(&proc_root.join(pid.to_string()), executable))
}

fn list_pids(proc_root: &Path) -> Vec<u32> {
    let Ok(entries) = fs::read_dir(proc_root) else {
        return Vec::new();
    };
    entries
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().to_str().and_then(|n| n.parse().ok()))
        .collect()
}

fn process_matches(dir: &Path, executable: &str) -> bool {
    if let Ok(cmdline) = fs::read(dir.join("cmdline")) {
        let argv0 = cmdline.split(|&b| b == 0).next().unwrap_or_default();
        let argv0 = String::from_utf8_lossy(argv0);
        if same_executable(basename(&argv0), executable) {
            return true;
        }
    }

    if let Ok(comm) = fs::read_to_string(dir.join("comm")) {
        let comm = comm.trim_end();
        if same_executable(comm, executable) {
            return true;
        }
        if executable.len() > COMM_MAX
            && let Some(prefix) = executable.get(..COMM_MAX)
        {
            return same_executable(comm, prefix);
        }
    }

    false
}

/// Last path component, accepting both `/` and `\` separators.
fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

fn enumerate_tcp_connections_in(proc_root: &Path) -> Result<Vec<ConnectionInfo>, NetScanError> {
    let table = fs::read_to_string(proc_root.join("net").join("tcp"))
        .map_err(|e| NetScanError::Enumeration(format!("failed to read net/tcp: {e}")))?;
    let owners = socket_owners(proc_root);

    let conns = parse_tcp_table(&table)
        .into_iter()
        .map(|row| ConnectionInfo {
            local_address: row.local.0,
            local_port: row.local.1,
            remote_address: row.remote.0,
            remote_port: row.remote.1,
            // Sockets without a visible owner (TIME_WAIT, other users) get pid 0.
            owner_pid: owners.get(&row.inode).copied().unwrap_or(0),
        })
        .collect();
    Ok(conns)
}

struct TcpRow {
    local: (Ipv4Addr, u16),
    remote: (Ipv4Addr, u16),
    inode: u64,
}

fn parse_tcp_table(content: &str) -> Vec<TcpRow> {
    content
        .lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 10 {
                return None;
            }
            Some(TcpRow {
                local: parse_hex_endpoint(fields[1])?,
                remote: parse_hex_endpoint(fields[2])?,
                inode: fields[9].parse().ok()?,
            })
        })
        .collect()
}

/// Parses `0100007F:1F90`. The address is the network-order word printed as
/// a host-order integer; the port is printed in host order.
fn parse_hex_endpoint(field: &str) -> Option<(Ipv4Addr, u16)> {
    let (addr, port) = field.split_once(':')?;
    let addr = u32::from_str_radix(addr, 16).ok()?;
    let port = u16::from_str_radix(port, 16).ok()?;
    Some((Ipv4Addr::from(addr.to_ne_bytes()), port))
}

/// Maps socket inode to the pid holding it, from `/proc/<pid>/fd` links.
fn socket_owners(proc_root: &Path) -> HashMap<u64, u32> {
    let mut owners = HashMap::new();
    for pid in list_pids(proc_root) {
        let Ok(fds) = fs::read_dir(proc_root.join(pid.to_string()).join("fd")) else {
            continue;
        };
        for fd in fds.filter_map(|e| e.ok()) {
            let Ok(target) = fs::read_link(fd.path()) else {
                continue;
            };
            if let Some(inode) = target
                .to_str()
                .and_then(|t| t.strip_prefix("socket:["))
                .and_then(|t| t.strip_suffix(']'))
                .and_then(|t| t.parse::<u64>().ok())
            {
                owners.entry(inode).or_insert(pid);
            }
        }
    }
    owners
}
