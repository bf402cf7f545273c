use std::net::Ipv4Addr;

id_type!(
    /// Position of a node in the topology's node arena.
    NodeId,
    usize
);
id_type!(
    /// A switch's OpenFlow datapath id.
    DatapathId,
    u64
);
id_type!(
    /// A physical port number on a switch or host, numbered from 1.
    PortNo,
    u32
);

/// A 48-bit Ethernet address.
#[derive(
    Debug,
    Default,
    Copy,
    Clone,
    PartialOrd,
    Ord,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct MacAddr([u8; 6]);

impl MacAddr {
    /// Creates an address from its six octets.
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// The deterministic address of the `index`-th host (1-indexed): the
    /// 48-bit integer `index`.
    pub fn from_host_index(index: u64) -> Self {
        let b = index.to_be_bytes();
        Self([b[2], b[3], b[4], b[5], b[6], b[7]])
    }

    /// Returns the six octets of the address.
    pub const fn octets(self) -> [u8; 6] {
        self.0
    }
}

impl std::fmt::Display for MacAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
}

impl Node {
    /// Creates the `index`-th host (1-indexed). The MAC and IP are a
    /// deterministic function of the index.
    pub fn new_host(id: NodeId, index: u64) -> Self {
        Self {
            id,
            name: format!("h{index}"),
            kind: NodeKind::Host {
                mac: MacAddr::from_host_index(index),
                ip: Ipv4Addr::from(0x0a00_0000 + index as u32 - 1),
            },
        }
    }

    /// Creates the `index`-th switch (1-indexed); the index doubles as the
    /// datapath id.
    pub fn new_switch(id: NodeId, index: u64) -> Self {
        Self {
            id,
            name: format!("s{index}"),
            kind: NodeKind::Switch {
                dpid: DatapathId::new(index),
            },
        }
    }

    pub fn is_host(&self) -> bool {
        matches!(self.kind, NodeKind::Host { .. })
    }

    pub fn is_switch(&self) -> bool {
        matches!(self.kind, NodeKind::Switch { .. })
    }

    /// The host's MAC, or `None` for a switch.
    pub fn mac(&self) -> Option<MacAddr> {
        match self.kind {
            NodeKind::Host { mac, .. } => Some(mac),
            NodeKind::Switch { .. } => None,
        }
    }

    /// The switch's datapath id, or `None` for a host.
    pub fn dpid(&self) -> Option<DatapathId> {
        match self.kind {
            NodeKind::Host { .. } => None,
            NodeKind::Switch { dpid } => Some(dpid),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Host { mac: MacAddr, ip: Ipv4Addr },
    Switch { dpid: DatapathId },
}

/// A `Link` is a bidirectional channel between two ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_new::new)]
pub struct Link {
    pub a: NodeId,
    pub a_port: PortNo,
    pub b: NodeId,
    pub b_port: PortNo,
}

/// One direction of a link. The graph stores two `Channel`s per link, so each
/// direction carries its own utilization reading.
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    src: NodeId,
    dst: NodeId,
    src_port: PortNo,
    dst_port: PortNo,
    capacity: f64,
    used: f64,
}

impl Channel {
    pub(crate) fn new(
        src: NodeId,
        dst: NodeId,
        src_port: PortNo,
        dst_port: PortNo,
        capacity: f64,
    ) -> Self {
        Self {
            src,
            dst,
            src_port,
            dst_port,
            capacity,
            used: 0.0,
        }
    }

    pub fn src(&self) -> NodeId {
        self.src
    }

    pub fn dst(&self) -> NodeId {
        self.dst
    }

    /// The egress port on `src` for this direction.
    pub fn src_port(&self) -> PortNo {
        self.src_port
    }

    /// Nominal capacity, in Mb.
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Most recent utilization reading for this direction, in Mb.
    pub fn used(&self) -> f64 {
        self.used
    }

    /// Headroom left in this direction, in Mb.
    pub fn available(&self) -> f64 {
        self.capacity - self.used
    }

    pub(crate) fn set_used(&mut self, mbps: f64) {
        self.used = mbps;
    }
}
