/*!

Packets (spec.md SS3): data, beacon (PCB) and probe variants. A packet is
immutable except for the `path`/`hops` a router appends while a beacon is
in flight — and even then each router forwards independent clones, never a
shared one, so that siblings flooded out of different ports never observe
each other's mutations.

*/

use crate::kernel::Time;

pub type AsId = String;
pub type RouterId = String;
pub type RouterPath = Vec<RouterId>;
/// A host identifier, `ISD-AS,host-addr` per spec.md SS3. Kept as an opaque
/// string like [`RouterId`]; nothing in this crate parses its internal
/// structure beyond what [`as_of_router`]-style splitting would need, and
/// nothing currently needs that.
pub type HostId = String;

/// Splits a router id on the `-br` token to recover its owning AS, per
/// spec.md SS3: "The AS prefix is derivable by splitting on this token."
pub fn as_of_router(router_id: &str) -> AsId
{
	match router_id.find("-br")
	{
		Some(index) => router_id[..index].to_string(),
		None => router_id.to_string(),
	}
}

/// Per-hop metrics a beacon records about the link it just crossed.
#[derive(Clone, Debug, PartialEq)]
pub struct LinkMetrics
{
	pub latency_ms: f64,
	pub bandwidth_mbps: f64,
}

/// One AS-level hop in a beacon's accumulated path (spec.md SS3).
#[derive(Clone, Debug)]
pub struct HopInfo
{
	pub as_id: AsId,
	pub router_id: RouterId,
	pub ingress_if: Option<RouterId>,
	pub egress_if: Option<RouterId>,
	pub link_metrics: Option<LinkMetrics>,
}

impl HopInfo
{
	pub fn origin(as_id: AsId, router_id: RouterId) -> HopInfo
	{
		HopInfo{ as_id, router_id, ingress_if: None, egress_if: None, link_metrics: None }
	}
}

/// The three packet kinds a link can carry (spec.md SS3). Beacon and probe
/// payloads are kept as variant fields rather than separate structs so that
/// `Packet` stays a single type routers and links deal with uniformly.
#[derive(Clone, Debug)]
pub enum PacketKind
{
	Data,
	Beacon
	{
		hops: Vec<HopInfo>,
		origin_as: AsId,
	},
	Probe
	{
		probe_id: u64,
		send_time: Time,
	},
}

/// Bytes used for a 1500-byte application payload (spec.md SS4.5).
pub const DATA_PACKET_SIZE: usize = 1500;
/// Bytes used for a probe packet (spec.md SS4.8).
pub const PROBE_PACKET_SIZE: usize = 64;
/// Bytes used for a freshly emitted beacon, before any hops are appended.
pub const BEACON_PACKET_SIZE: usize = 100;

#[derive(Clone, Debug)]
pub struct Packet
{
	pub source: String,
	pub destination: String,
	pub path: RouterPath,
	pub size: usize,
	pub creation_time: Time,
	pub kind: PacketKind,
}

impl Packet
{
	pub fn data(source: String, destination: String, path: RouterPath, creation_time: Time) -> Packet
	{
		Packet{ source, destination, path, size: DATA_PACKET_SIZE, creation_time, kind: PacketKind::Data }
	}

	/// A fresh beacon seeded with the origin hop (spec.md SS4.3). The
	/// router-level `path` starts as `[origin_router_id]`, matching the
	/// original's `BeaconPacket.__init__`.
	pub fn beacon(origin_router_id: RouterId, origin_as: AsId, creation_time: Time) -> Packet
	{
		let hops = vec![HopInfo::origin(origin_as.clone(), origin_router_id.clone())];
		Packet{
			source: origin_router_id.clone(),
			destination: String::new(),
			path: vec![origin_router_id],
			size: BEACON_PACKET_SIZE,
			creation_time,
			kind: PacketKind::Beacon{ hops, origin_as },
		}
	}

	pub fn probe(source: String, destination: String, path: RouterPath, probe_id: u64, send_time: Time) -> Packet
	{
		Packet{ source, destination, path, size: PROBE_PACKET_SIZE, creation_time: send_time, kind: PacketKind::Probe{ probe_id, send_time } }
	}

	pub fn is_beacon(&self) -> bool
	{
		matches!(self.kind, PacketKind::Beacon{..})
	}

	pub fn is_probe(&self) -> bool
	{
		matches!(self.kind, PacketKind::Probe{..})
	}

	/// The AS-level path recorded so far on a beacon. Empty for non-beacons.
	pub fn as_path(&self) -> Vec<AsId>
	{
		match &self.kind
		{
			PacketKind::Beacon{ hops, .. } => hops.iter().map(|h| h.as_id.clone()).collect(),
			_ => Vec::new(),
		}
	}

	/// The router-level path recorded by a beacon's hop list (used for data
	/// forwarding once a path is registered). Falls back to `self.path` for
	/// non-beacon kinds.
	pub fn router_path_from_hops(&self) -> RouterPath
	{
		match &self.kind
		{
			PacketKind::Beacon{ hops, .. } => hops.iter().map(|h| h.router_id.clone()).collect(),
			_ => self.path.clone(),
		}
	}
}
