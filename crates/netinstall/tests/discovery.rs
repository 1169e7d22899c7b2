//! Discovery recognizes the (1, 0)-countered announcement and ignores
//! everything else without consuming the caller's timeout budget again.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::net::{IpAddr, Ipv4Addr};

use netinstall::discovery::discover;
use netinstall::error::AbortFlashing;
use netinstall::transport::LinkTransport;
use netinstall_proto::Frame;

const OUR_MAC: [u8; 6] = [0xAA; 6];
const DEV_MAC: [u8; 6] = [0x00, 0x0C, 0x42, 0x01, 0x02, 0x03];

enum Incoming {
    From { mac: [u8; 6], ip: IpAddr, counters: (u16, u16), payload: &'static [u8] },
    Timeout,
}

struct FakeLink {
    incoming: RefCell<VecDeque<Incoming>>,
}

impl FakeLink {
    fn new(incoming: Vec<Incoming>) -> Self {
        Self { incoming: RefCell::new(incoming.into()) }
    }
}

impl LinkTransport for FakeLink {
    fn send(&self, _: &[u8], _: u16, _: u16, _: [u8; 6]) -> Result<(), AbortFlashing> {
        Ok(())
    }

    fn recv(&self) -> Result<(Frame, IpAddr), AbortFlashing> {
        match self.incoming.borrow_mut().pop_front() {
            Some(Incoming::From { mac, ip, counters, payload }) => {
                let wire = netinstall_proto::encode(mac, OUR_MAC, counters.0, counters.1, payload)?;
                Ok((netinstall_proto::decode(&wire)?, ip))
            }
            Some(Incoming::Timeout) | None => Err(AbortFlashing::Timeout),
        }
    }

    fn accept_peer(&self, src_ip: IpAddr, frame: &Frame) -> bool {
        src_ip == IpAddr::V4(Ipv4Addr::UNSPECIFIED) && frame.src_mac() != OUR_MAC
    }
}

const ANNOUNCEMENT: &[u8] = b"ignored\nLIC1\nKEY1\nRB450G\nmipsbe\n6.45.9";

#[test]
fn recognizes_a_genuine_announcement() {
    let link = FakeLink::new(vec![Incoming::From {
        mac: DEV_MAC,
        ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        counters: (1, 0),
        payload: ANNOUNCEMENT,
    }]);

    let device = discover(&link).expect("should not error").expect("should find a device");
    assert_eq!(device.mac, DEV_MAC);
    assert_eq!(device.model, "RB450G");
}

#[test]
fn times_out_cleanly_when_nothing_arrives() {
    let link = FakeLink::new(vec![Incoming::Timeout]);
    let result = discover(&link).expect("timeout is not an error");
    assert!(result.is_none());
}

#[test]
fn ignores_our_own_echoed_broadcast() {
    let link = FakeLink::new(vec![
        Incoming::From {
            mac: OUR_MAC, // our own echo: src_mac == our_mac
            ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            counters: (1, 0),
            payload: ANNOUNCEMENT,
        },
        Incoming::Timeout,
    ]);
    let result = discover(&link).expect("should not error");
    assert!(result.is_none());
}

#[test]
fn ignores_a_configured_hosts_traffic() {
    let link = FakeLink::new(vec![
        Incoming::From {
            mac: [0x11; 6],
            ip: IpAddr::V4(Ipv4Addr::new(192, 168, 1, 50)), // has an address, not a fresh device
            counters: (1, 0),
            payload: ANNOUNCEMENT,
        },
        Incoming::Timeout,
    ]);
    let result = discover(&link).expect("should not error");
    assert!(result.is_none());
}

#[test]
fn ignores_stray_frames_with_the_wrong_counters() {
    let link = FakeLink::new(vec![
        Incoming::From {
            mac: DEV_MAC,
            ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            counters: (7, 3), // stale RETR/WTRM traffic from an earlier session
            payload: b"RETR",
        },
        Incoming::From {
            mac: DEV_MAC,
            ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            counters: (1, 0),
            payload: ANNOUNCEMENT,
        },
    ]);
    let device = discover(&link).expect("should not error").expect("should find a device");
    assert_eq!(device.mac, DEV_MAC);
}
