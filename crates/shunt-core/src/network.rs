//! The topology graph and the path engine that runs over it.

pub mod paths;
pub mod topology;
pub mod types;

pub use paths::{all_paths, shortest_path, PathMetrics};
pub use topology::{Topology, TopologyError};
pub use types::*;
