//! Embedded FTP server engine
//!
//! A single-client, tick-driven FTP server for microcontroller-class targets.
//! The engine never blocks: the host calls [`Server::tick`] at a fixed period
//! and supplies the network, filesystem, update sink and clock.

pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod navigate;
pub mod network;
pub mod protocol;
pub mod server;
pub mod storage;
pub mod transfer;
pub mod update;

pub use server::Server;
