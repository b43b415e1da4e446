/*!

The topology graph (spec.md SS4.3, SS3): routers and hosts wired together
from the declarative [`TopologyConfig`](crate::config::TopologyConfig),
grounded in `original_source/topology.py`'s `Topology._load_from_json`.

Two differences from the original, both needed for anything beyond a
single link to actually forward packets (see DESIGN.md):

- The original shares a single `Link` object between both directions of a
  router-router edge (`self.nodes[to_node].ports[from_node] = link_component`),
  which always delivers toward `to_node` regardless of which router enqueued
  onto it. Each router's `interfaces` entry here gets its own directed
  [`Link`](crate::link::Link) instead, so both directions of an edge are
  independently queued.
- Hosts are *not* given a `Link`-backed port into their border router; the
  router holds them in `attached_hosts` and delivers directly, matching
  spec.md SS3 ("Hosts are not part of a path").

*/

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::config::TopologyConfig;
use crate::kernel::Kernel;
use crate::link::Link;
use crate::node::{Host, Router};
use crate::packet::{AsId, HostId, RouterId};
use crate::pathstore::{AsPair, PathStore};

pub struct Topology
{
	pub routers: HashMap<RouterId, Rc<Router>>,
	pub hosts: HashMap<HostId, Rc<Host>>,
	pub core_ases: HashSet<AsId>,
	pub path_store: Rc<RefCell<PathStore>>,
}

impl Topology
{
	/// Builds the full graph: one [`Router`] per declared border router,
	/// one [`Host`] per declared host (connected to the AS's first listed
	/// border router, spec.md SS6), then every `interfaces` edge as a
	/// directed [`Link`].
	pub fn build(kernel: &Kernel, config: &TopologyConfig) -> Topology
	{
		let path_store = Rc::new(RefCell::new(PathStore::new()));
		let mut routers: HashMap<RouterId, Rc<Router>> = HashMap::new();
		let mut hosts: HashMap<HostId, Rc<Host>> = HashMap::new();
		let mut core_ases = HashSet::new();

		for (isd_as, as_config) in config.iter()
		{
			if as_config.core
			{
				core_ases.insert(isd_as.clone());
			}
			for router_suffix in as_config.border_routers.keys()
			{
				let router_id = format!("{}-{}", isd_as, router_suffix);
				routers.insert(router_id.clone(), Rc::new(Router::new(router_id, Rc::clone(&path_store))));
			}
		}

		for (isd_as, as_config) in config.iter()
		{
			let first_router_suffix = as_config.border_routers.keys().min();
			for (host_suffix, host_config) in as_config.hosts.iter()
			{
				let host_id = format!("{},{}", isd_as, host_config.addr);
				let host = Rc::new(Host::new(kernel, host_id.clone(), isd_as.clone()));
				if let Some(first) = first_router_suffix
				{
					let router_id = format!("{}-{}", isd_as, first);
					if let Some(router) = routers.get(&router_id)
					{
						let uplink = Link::new(kernel, 1.0, 1000.0, Rc::clone(router) as Rc<dyn crate::node::Endpoint>);
						host.set_uplink(uplink);
						router.attach_host(Rc::clone(&host));
					}
				}
				else
				{
					eprintln!("AS {} host {} ({}): no border router to attach to", isd_as, host_suffix, host_id);
				}
				hosts.insert(host_id, host);
			}
		}

		for (isd_as, as_config) in config.iter()
		{
			for (router_suffix, router_config) in as_config.border_routers.iter()
			{
				let local_id = format!("{}-{}", isd_as, router_suffix);
				let local_router = match routers.get(&local_id)
				{
					Some(r) => Rc::clone(r),
					None => continue,
				};
				for interface in router_config.interfaces.iter()
				{
					let remote_id = format!("{}-{}", interface.isd_as, interface.neighbor_router);
					let remote_router = match routers.get(&remote_id)
					{
						Some(r) => Rc::clone(r),
						None =>
						{
							eprintln!("AS {} router {}: neighbor {} not found in topology", isd_as, local_id, remote_id);
							continue;
						}
					};
					let link = Link::new(kernel, interface.latency_ms, interface.bandwidth_mbps, remote_router as Rc<dyn crate::node::Endpoint>);
					local_router.add_port(remote_id, link);
				}
			}
		}

		Topology{ routers, hosts, core_ases, path_store }
	}

	pub fn get_host(&self, host_id: &str) -> Option<&Rc<Host>>
	{
		self.hosts.get(host_id)
	}

	pub fn get_router(&self, router_id: &str) -> Option<&Rc<Router>>
	{
		self.routers.get(router_id)
	}

	/// The router every core AS should start beaconing from: its
	/// lexicographically first border router, matching the "first listed
	/// border router" convention spec.md SS6 uses for host attachment and
	/// `topology.py`'s `initiate_beaconing` uses for the beacon origin.
	pub fn core_origin_routers(&self) -> Vec<Rc<Router>>
	{
		let mut origins = Vec::new();
		for as_id in self.core_ases.iter()
		{
			let mut candidates: Vec<&RouterId> = self.routers.keys().filter(|id| crate::packet::as_of_router(id) == *as_id).collect();
			candidates.sort();
			if let Some(first) = candidates.into_iter().next()
			{
				if let Some(router) = self.routers.get(first)
				{
					origins.push(Rc::clone(router));
				}
			}
		}
		origins
	}

	/// A beacon-free oracle of "what simple paths exist between every pair
	/// of ASes", reconstructed from `original_source/path_selection.py`'s
	/// `discover_paths(use_graph_traversal=True)` fallback. Used only by
	/// tests that want ground truth independent of beacon convergence
	/// (SPEC_FULL.md SS3) — the production simulation never calls this.
	pub fn discover_paths_by_traversal(&self) -> HashMap<AsPair, Vec<Vec<RouterId>>>
	{
		let mut adjacency: HashMap<&RouterId, Vec<&RouterId>> = HashMap::new();
		for router in self.routers.values()
		{
			let neighbors: Vec<&RouterId> = router.ports().keys().collect();
			adjacency.insert(&router.id, neighbors);
		}

		let mut by_as: HashMap<AsId, Vec<&RouterId>> = HashMap::new();
		for id in self.routers.keys()
		{
			by_as.entry(crate::packet::as_of_router(id)).or_insert_with(Vec::new).push(id);
		}

		let mut result: HashMap<AsPair, Vec<Vec<RouterId>>> = HashMap::new();
		for (src_as, src_routers) in by_as.iter()
		{
			for (dst_as, dst_routers) in by_as.iter()
			{
				if src_as == dst_as { continue; }
				let mut paths = Vec::new();
				for src in src_routers.iter()
				{
					for dst in dst_routers.iter()
					{
						let mut visited = HashSet::new();
						let mut current = vec![(*src).clone()];
						visited.insert((*src).clone());
						all_simple_paths(&adjacency, src, dst, &mut visited, &mut current, &mut paths);
					}
				}
				if !paths.is_empty()
				{
					result.insert((src_as.clone(), dst_as.clone()), paths);
				}
			}
		}
		result
	}
}

fn all_simple_paths(adjacency: &HashMap<&RouterId, Vec<&RouterId>>, current_id: &RouterId, target: &RouterId, visited: &mut HashSet<RouterId>, path: &mut Vec<RouterId>, out: &mut Vec<Vec<RouterId>>)
{
	if current_id == target
	{
		out.push(path.clone());
		return;
	}
	let neighbors = match adjacency.get(current_id)
	{
		Some(n) => n.clone(),
		None => return,
	};
	for neighbor in neighbors
	{
		if visited.contains(neighbor) { continue; }
		visited.insert(neighbor.clone());
		path.push(neighbor.clone());
		all_simple_paths(adjacency, neighbor, target, visited, path, out);
		path.pop();
		visited.remove(neighbor);
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::config::TopologyConfig;

	fn two_as_topology() -> TopologyConfig
	{
		let json = r#"
		{
			"1-ff00:0:110": {
				"core": true,
				"border_routers": { "br1": { "interfaces": [
					{ "isd_as": "1-ff00:0:111", "neighbor_router": "br1", "latency_ms": 10, "bandwidth_mbps": 1000 }
				]}},
				"hosts": { "h1": { "addr": "10.0.0.1" } }
			},
			"1-ff00:0:111": {
				"core": false,
				"border_routers": { "br1": { "interfaces": [
					{ "isd_as": "1-ff00:0:110", "neighbor_router": "br1", "latency_ms": 10, "bandwidth_mbps": 1000 }
				]}},
				"hosts": { "h1": { "addr": "10.0.0.2" } }
			}
		}
		"#;
		serde_json::from_str(json).unwrap()
	}

	#[test]
	fn builds_routers_and_hosts_and_identifies_core()
	{
		let kernel = Kernel::new();
		let config = two_as_topology();
		let topology = Topology::build(&kernel, &config);

		assert!(topology.core_ases.contains("1-ff00:0:110"));
		assert!(!topology.core_ases.contains("1-ff00:0:111"));
		assert!(topology.get_router("1-ff00:0:110-br1").is_some());
		assert!(topology.get_host("1-ff00:0:110,10.0.0.1").is_some());
	}

	#[test]
	fn discover_paths_finds_the_direct_edge()
	{
		let kernel = Kernel::new();
		let config = two_as_topology();
		let topology = Topology::build(&kernel, &config);

		let all = topology.discover_paths_by_traversal();
		let key = ("1-ff00:0:110".to_string(), "1-ff00:0:111".to_string());
		assert_eq!(all.get(&key).unwrap(), &vec![vec!["1-ff00:0:110-br1".to_string(), "1-ff00:0:111-br1".to_string()]]);
	}
}
