#![warn(unreachable_pub, missing_debug_implementations)]

//! The running `shunt` controller: the REST surface external callers admit
//! and complete flows through, the periodic stats monitor, and the channel
//! pair an OpenFlow 1.3 session attaches to.

pub mod api;
pub mod monitor;
pub mod southbound;
pub mod state;

/// The built-in 7-switch, 19-host mesh, used when no topology file is given.
pub const DEFAULT_TOPOLOGY: &str = include_str!("../topology.toml");
