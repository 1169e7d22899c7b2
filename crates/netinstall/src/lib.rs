//! Unattended netinstall host for Mikrotik RouterBOARD devices.
//!
//! Listens for a RouterBOARD booted into its Etherboot netinstall ROM on
//! broadcast UDP, negotiates the lock-step Offer-to-Reboot session protocol
//! ([`session`]), uploads firmware and optional extra packages and an
//! initial configuration script, and loops ([`supervisor`]) to service
//! devices one at a time.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod counters;
pub mod device;
pub mod discovery;
pub mod error;
pub mod provider;
pub mod session;
pub mod signal;
pub mod supervisor;
pub mod transport;
