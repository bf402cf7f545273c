#![warn(unreachable_pub, missing_debug_implementations)]

//! The core of the `shunt` flow controller: an attributed topology graph fed
//! by switch statistics, a simple-paths engine over it, and the admission
//! controller that places video and best-effort flows, displacing the latter
//! when a video guarantee needs the headroom.

#[macro_use]
mod ident;

pub mod admission;
pub mod config;
pub mod network;
pub mod program;
pub mod registry;
pub mod spec;
pub mod stats;

#[cfg(test)]
pub(crate) mod testing;

pub use admission::{AdmitError, Controller, TrafficClass, UnknownFlow};
pub use config::{Config, PathSelectAlgorithm};
pub use network::{
    topology::{Topology, TopologyError},
    types::{DatapathId, Link, MacAddr, Node, NodeId, NodeKind, PortNo},
};
pub use program::{FlowRule, ProgramError, SwitchControl, TransportError};
pub use registry::{FlowRecord, FlowRegistry};
pub use spec::{LinkSpec, NetworkSpec, SpecError};
pub use stats::{FlowStat, PortStat, StatsAggregator};
