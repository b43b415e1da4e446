/*!

A border router: a port map plus the beacon-flooding/path-registration
logic of spec.md SS4.3, grounded in `components.py`'s `Router` class.

*/

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::kernel::Kernel;
use crate::link::Link;
use crate::node::{Endpoint, Host};
use crate::packet::{AsId, LinkMetrics, Packet, PacketKind, RouterId, as_of_router};
use crate::pathstore::PathStore;

pub struct Router
{
	pub id: RouterId,
	pub as_id: AsId,
	ports: RefCell<HashMap<RouterId, Link>>,
	/// Hosts in this AS directly attached to this router (spec.md SS3:
	/// hosts connect to the AS's first listed border router).
	attached_hosts: RefCell<HashMap<String, Rc<Host>>>,
	path_store: Rc<RefCell<PathStore>>,
}

impl Router
{
	pub fn new(id: RouterId, path_store: Rc<RefCell<PathStore>>) -> Router
	{
		let as_id = as_of_router(&id);
		Router{ id, as_id, ports: RefCell::new(HashMap::new()), attached_hosts: RefCell::new(HashMap::new()), path_store }
	}

	/// Wires an outgoing port toward `neighbor`. Called once per edge while
	/// the topology is built.
	pub fn add_port(&self, neighbor: RouterId, link: Link)
	{
		self.ports.borrow_mut().insert(neighbor, link);
	}

	pub fn attach_host(&self, host: Rc<Host>)
	{
		self.attached_hosts.borrow_mut().insert(host.id.clone(), host);
	}

	pub fn ports(&self) -> std::cell::Ref<HashMap<RouterId, Link>>
	{
		self.ports.borrow()
	}

	fn receive_beacon(&self, packet: Packet)
	{
		let mut packet = packet;
		let as_path = packet.as_path();
		if as_path.contains(&self.as_id)
		{
			// AS-level loop (spec.md SS4.3): drop.
			return;
		}

		let previous_router = packet.path.last().cloned();
		let link_metrics = previous_router.as_ref().and_then(|prev|
		{
			self.ports.borrow().get(prev).map(|link| LinkMetrics{ latency_ms: link.latency_ms, bandwidth_mbps: link.bandwidth_mbps })
		});

		let origin_as = if let PacketKind::Beacon{ ref mut hops, ref origin_as } = packet.kind
		{
			hops.push(crate::packet::HopInfo{
				as_id: self.as_id.clone(),
				router_id: self.id.clone(),
				ingress_if: previous_router,
				egress_if: None,
				link_metrics,
			});
			origin_as.clone()
		}
		else
		{
			unreachable!("receive_beacon called on a non-beacon packet")
		};
		packet.path.push(self.id.clone());

		let router_path = packet.router_path_from_hops();
		self.path_store.borrow_mut().register_beacon(&origin_as, &self.as_id, router_path);

		for (neighbor, link) in self.ports.borrow().iter()
		{
			if !packet.path.contains(neighbor)
			{
				link.enqueue(packet.clone());
			}
		}
	}

	fn forward(&self, kernel: &Kernel, packet: Packet)
	{
		if let Some(host) = self.attached_hosts.borrow().get(&packet.destination)
		{
			host.receive(kernel, packet);
			return;
		}

		match packet.path.iter().position(|r| r == &self.id)
		{
			Some(index) => match packet.path.get(index + 1)
			{
				Some(next_hop) => match self.ports.borrow().get(next_hop)
				{
					Some(link) => link.enqueue(packet),
					None => eprintln!("[{:.2}] router {}: dead end toward {} via {} — dropping", kernel.now(), self.id, packet.destination, next_hop),
				},
				None => eprintln!("[{:.2}] router {}: path ends here with no attached destination {} — dropping", kernel.now(), self.id, packet.destination),
			},
			None => eprintln!("[{:.2}] router {}: invalid path for packet to {} — dropping", kernel.now(), self.id, packet.destination),
		}
	}

	fn receive_probe(&self, kernel: &Kernel, packet: Packet)
	{
		if packet.destination == self.id
		{
			// Reflect back along the reverse of the path it travelled
			// (SPEC_FULL.md SS3: closes the probe round-trip).
			let mut reversed_path = packet.path.clone();
			reversed_path.reverse();
			let reflected = Packet{
				source: packet.destination.clone(),
				destination: packet.source.clone(),
				path: reversed_path,
				size: packet.size,
				creation_time: packet.creation_time,
				kind: packet.kind,
			};
			self.forward(kernel, reflected);
		}
		else
		{
			self.forward(kernel, packet);
		}
	}
}

impl Endpoint for Router
{
	fn receive(&self, kernel: &Kernel, packet: Packet)
	{
		match packet.kind
		{
			PacketKind::Beacon{..} => self.receive_beacon(packet),
			PacketKind::Probe{..} => self.receive_probe(kernel, packet),
			PacketKind::Data => self.forward(kernel, packet),
		}
	}
}
