//! Best-effort local network address lookup.

use std::net::{IpAddr, SocketAddr, UdpSocket};

use anyhow::{Context, Result};

/// Returned whenever the local address cannot be determined.
pub const UNKNOWN_ADDRESS: &str = "NO_IP";

/// Public address used only to select the outbound interface. No packet is
/// sent: connecting a UDP socket just asks the kernel for a route.
pub const ROUTE_PROBE_TARGET: &str = "8.8.8.8:1";

/// The address of the interface that routes to the internet, or
/// [`UNKNOWN_ADDRESS`] on any failure.
pub fn local_address() -> String {
    match probe_local_address(ROUTE_PROBE_TARGET) {
        Ok(addr) => addr.to_string(),
        Err(err) => {
            log::debug!("local address lookup failed: {:#}", err);
            UNKNOWN_ADDRESS.to_string()
        }
    }
}

/// Local address the kernel would use to reach `target`.
pub fn probe_local_address(target: &str) -> Result<IpAddr> {
    let target: SocketAddr = target
        .parse()
        .with_context(|| format!("invalid probe target {}", target))?;
    let bind: SocketAddr = if target.is_ipv4() {
        ([0, 0, 0, 0], 0).into()
    } else {
        ([0u16; 8], 0).into()
    };
    let socket = UdpSocket::bind(bind).context("bind probe socket")?;
    socket
        .connect(target)
        .with_context(|| format!("no route to {}", target))?;
    Ok(socket.local_addr().context("read probe socket address")?.ip())
}
