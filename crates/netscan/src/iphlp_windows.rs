//! Windows backend: Tool Help snapshots and the IP Helper TCP table.

use std::mem::size_of;
use std::ptr::null_mut;

use windows_sys::Win32::Foundation::{
    CloseHandle, ERROR_INSUFFICIENT_BUFFER, INVALID_HANDLE_VALUE, NO_ERROR,
};
use windows_sys::Win32::NetworkManagement::IpHelper::{
    GetExtendedTcpTable, MIB_TCPROW_OWNER_PID, MIB_TCPTABLE_OWNER_PID, TCP_TABLE_OWNER_PID_ALL,
};
use windows_sys::Win32::Networking::WinSock::AF_INET;
use windows_sys::Win32::System::Diagnostics::ToolHelp::{
    CreateToolhelp32Snapshot, PROCESSENTRY32W, Process32FirstW, Process32NextW,
    TH32CS_SNAPPROCESS,
};

use crate::{ConnectionInfo, NetScanError, decode_ipv4, decode_port, same_executable};

pub fn find_process_id(executable: &str) -> Option<u32> {
    unsafe {
        let snapshot = CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0);
        if snapshot == INVALID_HANDLE_VALUE {
            tracing::warn!("CreateToolhelp32Snapshot failed");
            return None;
        }

        let mut entry: PROCESSENTRY32W = std::mem::zeroed();
        entry.dwSize = size_of::<PROCESSENTRY32W>() as u32;

        let mut found = None;
        if Process32FirstW(snapshot, &mut entry) != 0 {
            loop {
                let len = entry
                    .szExeFile
                    .iter()
                    .position(|&c| c == 0)
                    .unwrap_or(entry.szExeFile.len());
                let name = String::from_utf16_lossy(&entry.szExeFile[..len]);
                if same_executable(&name, executable) {
                    found = Some(entry.th32ProcessID);
                    break;
                }
                if Process32NextW(snapshot, &mut entry) == 0 {
                    break;
                }
            }
        }

        let _ = CloseHandle(snapshot);
        found
    }
}

pub fn enumerate_tcp_connections() -> Result<Vec<ConnectionInfo>, NetScanError> {
    // Sizing call: anything other than "buffer too small" is a failure.
    let mut size: u32 = 0;
    let ret = unsafe {
        GetExtendedTcpTable(
            null_mut(),
            &mut size,
            1,
            AF_INET as u32,
            TCP_TABLE_OWNER_PID_ALL,
            0,
        )
    };
    if ret != ERROR_INSUFFICIENT_BUFFER {
        return Err(NetScanError::Enumeration(format!(
            "GetExtendedTcpTable sizing call returned {ret}"
        )));
    }

    // u32 storage keeps the table aligned for the row reads below.
    let mut buf = vec![0u32; (size as usize).div_ceil(size_of::<u32>())];
    let ret = unsafe {
        GetExtendedTcpTable(
            buf.as_mut_ptr().cast(),
            &mut size,
            1,
            AF_INET as u32,
            TCP_TABLE_OWNER_PID_ALL,
            0,
        )
    };
    if ret != NO_ERROR {
        return Err(NetScanError::Enumeration(format!(
            "GetExtendedTcpTable returned {ret}"
        )));
    }

    let table = buf.as_ptr() as *const MIB_TCPTABLE_OWNER_PID;
    let count = unsafe { (*table).dwNumEntries } as usize;
    // Rows run past the declared one-element array; take the pointer from
    // the whole allocation, not from that array.
    let first = unsafe { std::ptr::addr_of!((*table).table).cast::<MIB_TCPROW_OWNER_PID>() };

    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let row: MIB_TCPROW_OWNER_PID = unsafe { *first.add(i) };
        out.push(ConnectionInfo {
            local_address: decode_ipv4(row.dwLocalAddr),
            local_port: decode_port(row.dwLocalPort),
            remote_address: decode_ipv4(row.dwRemoteAddr),
            remote_port: decode_port(row.dwRemotePort),
            owner_pid: row.dwOwningPid,
        });
    }
    Ok(out)
}
