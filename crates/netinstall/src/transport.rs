//! The broadcast UDP link: one socket, one blocking receive timeout, one
//! interface's MAC address standing in for "us" on the wire.

use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::time::Duration;

use netinstall_proto::Frame;

use crate::error::{AbortFlashing, FatalError};

/// Etherboot netinstall's well-known UDP port.
pub const PORT: u16 = 5000;

/// Largest datagram we ever need to receive: a 20-byte header plus a
/// 1024-byte file chunk, rounded up generously for slop.
const RECV_BUFFER_LEN: usize = 2048;

/// How a caller names the interface whose MAC address stands in for us.
#[derive(Debug, Clone)]
pub enum Interface {
    /// Resolve a MAC address from an OS interface name (e.g. `"eth0"`).
    Name(String),
    /// Use this MAC address directly, bypassing interface resolution.
    Mac([u8; 6]),
}

/// What the session engine and discovery need from the link: send one
/// frame, receive one frame, and decide whether a received frame came from
/// the device we're talking to.
///
/// Exists as a trait (rather than using [`Transport`] directly) so tests can
/// drive the session state machine against an in-memory double instead of a
/// real broadcast socket.
pub trait LinkTransport {
    /// Broadcast one frame. See [`Transport::send`].
    ///
    /// # Errors
    ///
    /// See [`Transport::send`].
    fn send(
        &self,
        payload: &[u8],
        counter_a: u16,
        counter_b: u16,
        dst_mac: [u8; 6],
    ) -> Result<(), AbortFlashing>;

    /// Receive one frame. See [`Transport::recv`].
    ///
    /// # Errors
    ///
    /// See [`Transport::recv`].
    fn recv(&self) -> Result<(Frame, IpAddr), AbortFlashing>;

    /// See [`Transport::accept_peer`].
    fn accept_peer(&self, src_ip: IpAddr, frame: &Frame) -> bool;
}

/// The broadcast UDP transport: owns the socket and our interface's MAC
/// address, and implements the self-echo guard every caller needs applied
/// to whatever it receives.
pub struct Transport {
    socket: UdpSocket,
    our_mac: [u8; 6],
}

impl Transport {
    /// Bind a broadcast-capable UDP socket on [`PORT`] and resolve `iface`
    /// to a MAC address.
    ///
    /// # Errors
    ///
    /// Returns [`FatalError::InterfaceUnusable`] if `iface` names an
    /// interface with no MAC address, or a wrapped I/O error if the socket
    /// cannot be bound or configured.
    pub fn open(iface: &Interface, recv_timeout: Duration) -> Result<Self, FatalError> {
        let our_mac = match iface {
            Interface::Mac(mac) => *mac,
            Interface::Name(name) => resolve_interface_mac(name)?,
        };

        let socket = UdpSocket::bind(("0.0.0.0", PORT))
            .map_err(|source| FatalError::FileUnreadable { path: "<udp socket>".into(), source })?;
        socket
            .set_broadcast(true)
            .map_err(|source| FatalError::FileUnreadable { path: "<udp socket>".into(), source })?;
        socket
            .set_read_timeout(Some(recv_timeout))
            .map_err(|source| FatalError::FileUnreadable { path: "<udp socket>".into(), source })?;

        Ok(Self { socket, our_mac })
    }

    /// Our interface's MAC address, as stamped into every outbound frame's
    /// `src_mac`.
    #[must_use]
    pub fn our_mac(&self) -> [u8; 6] {
        self.our_mac
    }

    /// Broadcast one frame addressed to `dst_mac` with the given counters
    /// and payload.
    ///
    /// # Errors
    ///
    /// Returns [`AbortFlashing::Encode`] if `payload` exceeds the protocol's
    /// 16-bit length field, or [`AbortFlashing::Io`] if the send fails.
    pub fn send(
        &self,
        payload: &[u8],
        counter_a: u16,
        counter_b: u16,
        dst_mac: [u8; 6],
    ) -> Result<(), AbortFlashing> {
        let wire = netinstall_proto::encode(self.our_mac, dst_mac, counter_a, counter_b, payload)?;
        let broadcast = SocketAddr::from((Ipv4Addr::BROADCAST, PORT));
        self.socket.send_to(&wire, broadcast)?;
        Ok(())
    }

    /// Block for up to the configured receive timeout for one datagram.
    ///
    /// Returns the decoded frame and the peer's source IP. Does not filter
    /// self-echoes or foreign senders; see [`Self::accept_peer`].
    ///
    /// # Errors
    ///
    /// Returns [`AbortFlashing::Timeout`] if no datagram arrives before the
    /// timeout, [`AbortFlashing::Io`] on other socket errors, and
    /// [`AbortFlashing::Decode`] if the datagram is shorter than a header.
    pub fn recv(&self) -> Result<(Frame, IpAddr), AbortFlashing> {
        let mut buf = [0u8; RECV_BUFFER_LEN];
        let (len, peer) = match self.socket.recv_from(&mut buf) {
            Ok(pair) => pair,
            Err(err)
                if matches!(
                    err.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) =>
            {
                return Err(AbortFlashing::Timeout);
            }
            Err(err) => return Err(AbortFlashing::Io(err)),
        };
        let frame = netinstall_proto::decode(&buf[..len])?;
        Ok((frame, peer.ip()))
    }

    /// Whether a received frame should be treated as coming from the device
    /// we're talking to, rather than our own broadcast echoed back to us.
    ///
    /// The primary signal is the device's source IP: a RouterBOARD in
    /// netinstall mode has no address yet, so it always sends from
    /// `0.0.0.0`. That alone is not airtight on every NIC/driver
    /// combination, so a frame whose `src_mac` equals ours is always
    /// rejected as well, regardless of what IP it claims.
    #[must_use]
    pub fn accept_peer(&self, src_ip: IpAddr, frame: &Frame) -> bool {
        let from_unconfigured_host = src_ip == IpAddr::V4(Ipv4Addr::UNSPECIFIED);
        let not_our_own_echo = frame.src_mac() != self.our_mac;
        from_unconfigured_host && not_our_own_echo
    }
}

impl LinkTransport for Transport {
    fn send(
        &self,
        payload: &[u8],
        counter_a: u16,
        counter_b: u16,
        dst_mac: [u8; 6],
    ) -> Result<(), AbortFlashing> {
        Transport::send(self, payload, counter_a, counter_b, dst_mac)
    }

    fn recv(&self) -> Result<(Frame, IpAddr), AbortFlashing> {
        Transport::recv(self)
    }

    fn accept_peer(&self, src_ip: IpAddr, frame: &Frame) -> bool {
        Transport::accept_peer(self, src_ip, frame)
    }
}

fn resolve_interface_mac(name: &str) -> Result<[u8; 6], FatalError> {
    pnet_datalink::interfaces()
        .into_iter()
        .find(|iface| iface.name == name)
        .and_then(|iface| iface.mac)
        .map(|mac| [mac.0, mac.1, mac.2, mac.3, mac.4, mac.5])
        .ok_or_else(|| FatalError::InterfaceUnusable { name: name.to_string() })
}
