//! Client-facing side of the daemon
//!
//! A local stream socket that LIRC clients connect to, and the set of
//! connected clients every key line is broadcast to.

pub mod hub;
pub mod socket;

pub use hub::ClientHub;
pub use socket::ListenSocket;
