//! Path admission for the two traffic classes, and the displacement of
//! best-effort flows when a video guarantee needs the headroom.

use std::cmp::{Ordering, Reverse};

use crate::config::{Config, PathSelectAlgorithm};
use crate::network::paths::{self, PathMetrics};
use crate::network::topology::Topology;
use crate::network::types::{DatapathId, NodeId};
use crate::program::{self, ProgramError, SwitchControl};
use crate::registry::{FlowRecord, FlowRegistry};
use crate::stats::{FlowStat, PortStat, StatsAggregator};

/// The two admission classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrafficClass {
    /// Guaranteed-margin traffic. Admitted on the single shortest path,
    /// displacing best-effort flows if necessary; never registered.
    Video,
    /// Best-effort bulk traffic. Admitted on the shortest path with enough
    /// headroom and tracked in the registry until completed.
    Other,
}

/// Reasons an admission fails.
#[derive(Debug, thiserror::Error)]
pub enum AdmitError {
    /// No simple path exists between the endpoints, or displacement could
    /// not clear the video path.
    #[error("no path between the requested hosts")]
    NoPath,

    /// Paths exist, but none has enough headroom for a best-effort flow.
    #[error("no path with sufficient headroom")]
    NoCapacity,

    /// Displacement is required but the policy forbids it.
    #[error("displacement forbidden by policy")]
    DisplacementForbidden,

    /// The request names a host the topology does not contain.
    #[error("unknown host {0:?}")]
    UnknownHost(String),

    /// The chosen path could not be programmed onto the switches.
    #[error(transparent)]
    Program(#[from] ProgramError),
}

/// Completion was requested for a flow that is not registered.
#[derive(Debug, thiserror::Error)]
#[error("unknown flow {src} -> {dst}")]
pub struct UnknownFlow {
    pub src: String,
    pub dst: String,
}

/// The admission engine. Owns the topology, the active-flow registry, and
/// the stats aggregator; all operations take `&mut self`, so one controller
/// value serializes admissions, displacements, completions, and stats
/// batches against each other.
#[derive(Debug)]
pub struct Controller<T> {
    topology: Topology,
    registry: FlowRegistry,
    stats: StatsAggregator,
    config: Config,
    transport: T,
}

impl<T: SwitchControl> Controller<T> {
    pub fn new(topology: Topology, config: Config, transport: T) -> Self {
        Self {
            topology,
            registry: FlowRegistry::default(),
            stats: StatsAggregator::default(),
            config,
            transport,
        }
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    #[cfg(test)]
    pub(crate) fn topology_mut(&mut self) -> &mut Topology {
        &mut self.topology
    }

    pub fn registry(&self) -> &FlowRegistry {
        &self.registry
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Admits a flow between two named hosts, choosing and programming a
    /// path per the class policy. Returns the node path that was programmed.
    pub fn admit(
        &mut self,
        src_host: &str,
        dst_host: &str,
        class: TrafficClass,
    ) -> Result<Vec<NodeId>, AdmitError> {
        let src = self.host_id(src_host)?;
        let dst = self.host_id(dst_host)?;
        if src == dst {
            return Err(AdmitError::NoPath);
        }
        let path = match class {
            TrafficClass::Video => self.admit_video(src, dst)?,
            TrafficClass::Other => self.admit_other(src, dst, None)?,
        };
        tracing::info!(
            src = src_host,
            dst = dst_host,
            ?class,
            hops = path.len().saturating_sub(1),
            "flow admitted"
        );
        Ok(path)
    }

    /// Removes a completed best-effort flow from the registry. The switches
    /// keep their entries; they are overwritten by later admissions.
    pub fn complete(&mut self, src_host: &str, dst_host: &str) -> Result<FlowRecord, UnknownFlow> {
        let unknown = || UnknownFlow {
            src: src_host.to_owned(),
            dst: dst_host.to_owned(),
        };
        let src = self.topology.node_by_name(src_host).ok_or_else(unknown)?.id;
        let dst = self.topology.node_by_name(dst_host).ok_or_else(unknown)?.id;
        let record = self.registry.remove(&(src, dst)).ok_or_else(unknown)?;
        tracing::info!(src = src_host, dst = dst_host, "flow completed");
        Ok(record)
    }

    /// Issues the periodic port- and flow-stats requests for every known
    /// switch. Send failures are logged and do not stop the cycle.
    pub fn request_stats(&self) {
        for dpid in self.topology.switch_dpids() {
            if let Err(error) = self.transport.request_flow_stats(dpid) {
                tracing::warn!(%dpid, %error, "flow-stats request failed");
            }
            if let Err(error) = self.transport.request_port_stats(dpid) {
                tracing::warn!(%dpid, %error, "port-stats request failed");
            }
        }
    }

    /// Applies one port-stats reply to the topology's utilization readings.
    pub fn handle_port_stats(&mut self, dpid: DatapathId, stats: &[PortStat]) {
        self.stats.apply_port_stats(&mut self.topology, dpid, stats);
    }

    /// Applies one flow-stats reply to the registry's transmit rates.
    pub fn handle_flow_stats(&mut self, dpid: DatapathId, stats: &[FlowStat]) {
        self.stats
            .apply_flow_stats(&mut self.registry, &self.topology, dpid, stats);
    }

    fn host_id(&self, name: &str) -> Result<NodeId, AdmitError> {
        self.topology
            .node_by_name(name)
            .filter(|n| n.is_host())
            .map(|n| n.id)
            .ok_or_else(|| AdmitError::UnknownHost(name.to_owned()))
    }

    fn admit_video(&mut self, src: NodeId, dst: NodeId) -> Result<Vec<NodeId>, AdmitError> {
        let path = paths::shortest_path(&self.topology, src, dst).ok_or(AdmitError::NoPath)?;
        let metrics =
            PathMetrics::evaluate(&self.topology, &path, self.config.limit_video_bandwidth);
        if metrics.min_bandwidth < self.config.limit_video_bandwidth {
            for &i in &metrics.exceeded_video_edges {
                self.displace(path[i], path[i + 1], &path)?;
            }
        }
        program::program_path(&self.topology, &self.transport, &path)?;
        Ok(path)
    }

    /// Best-effort admission: shortest candidate with enough headroom wins.
    /// `exclude` is set during displacement so the flow cannot return to the
    /// edges the incoming video path needs.
    fn admit_other(
        &mut self,
        src: NodeId,
        dst: NodeId,
        exclude: Option<&[NodeId]>,
    ) -> Result<Vec<NodeId>, AdmitError> {
        let displaced = exclude.is_some();
        if displaced && !self.registry.contains(&(src, dst)) {
            // The flow completed while it was being displaced; nothing to
            // re-route.
            return Ok(Vec::new());
        }
        let mut candidates = paths::all_paths(&self.topology, src, dst, self.config.h_max, exclude);
        if candidates.is_empty() {
            return Err(AdmitError::NoPath);
        }
        candidates.sort_by_key(|p| p.len());
        let path = candidates
            .into_iter()
            .find(|p| {
                PathMetrics::evaluate(&self.topology, p, self.config.limit_video_bandwidth)
                    .min_bandwidth
                    >= self.config.limit_other_bandwidth
            })
            .ok_or(AdmitError::NoCapacity)?;
        program::program_path(&self.topology, &self.transport, &path)?;
        if displaced {
            self.registry.set_path(&(src, dst), path.clone());
        } else {
            self.registry
                .insert((src, dst), FlowRecord::new(path.clone()));
        }
        Ok(path)
    }

    /// Moves one best-effort flow off the link `(u, v)` so the incoming
    /// video path can claim its headroom. Only the first candidate under the
    /// configured ordering is moved.
    fn displace(&mut self, u: NodeId, v: NodeId, video_path: &[NodeId]) -> Result<(), AdmitError> {
        let mut candidates = self
            .registry
            .flows_crossing(u, v)
            .into_iter()
            .map(|(key, rec)| (key, rec.path.len(), rec.rate_mbps))
            .collect::<Vec<_>>();
        if candidates.is_empty() {
            return Err(AdmitError::NoPath);
        }
        match self.config.path_select_algorithm {
            PathSelectAlgorithm::NoChange => return Err(AdmitError::DisplacementForbidden),
            PathSelectAlgorithm::ShortestPath => {
                candidates.sort_by_key(|&(key, hops, _)| (hops, key));
            }
            PathSelectAlgorithm::LongestPath => {
                candidates.sort_by_key(|&(key, hops, _)| (Reverse(hops), key));
            }
            PathSelectAlgorithm::Bandwidth => {
                candidates.sort_by(|&(ka, _, ra), &(kb, _, rb)| {
                    rb.partial_cmp(&ra)
                        .unwrap_or(Ordering::Equal)
                        .then(ka.cmp(&kb))
                });
            }
        }
        let ((src, dst), ..) = candidates[0];
        tracing::info!(
            src = %self.topology.node(src).name,
            dst = %self.topology.node(dst).name,
            edge = %format_args!("{}-{}", self.topology.node(u).name, self.topology.node(v).name),
            "displacing best-effort flow"
        );
        match self.admit_other(src, dst, Some(video_path)) {
            Ok(_) => Ok(()),
            Err(AdmitError::NoPath | AdmitError::NoCapacity) => Err(AdmitError::NoPath),
            Err(e) => Err(e),
        }
    }
}
