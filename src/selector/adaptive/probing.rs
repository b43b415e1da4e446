/*!

Active latency probing (spec.md SS4.8), grounded in
`original_source/path_selection.py`'s `ProbingManager.start`. A 64-byte
[`Packet::probe`] is sent every `interval_ms` along each currently known
router path, from one representative host per AS — the router reflects it
back (`node::router::Router::receive_probe`) and the observed round trip is
handed to the [`AdaptiveSelector`] via [`ProbeResponder::resolve_probe`].

A host whose own [`Application`](crate::application::Application) is already
draining its inbox gets its probe responses for free, since that receive
handler special-cases [`Packet::is_probe`]. A host picked as a representative
with no bound application gets a small dedicated inbox-reading loop here
instead — see [`spawn_fallback_readers`].

*/

use std::rc::Rc;

use crate::kernel::Kernel;
use crate::node::Host;
use crate::packet::{AsId, Packet, as_of_router};
use crate::pathstore::AsPair;
use crate::selector::adaptive::AdaptiveSelector;
use crate::selector::ProbeResponder;
use crate::topology::Topology;

/// One host per AS willing to originate/absorb probes: prefers a host that
/// already has a bound application (spec.md SS4.4), falling back to any
/// host in that AS.
fn representative_hosts(topology: &Topology) -> std::collections::HashMap<AsId, Rc<Host>>
{
	let mut chosen: std::collections::HashMap<AsId, Rc<Host>> = std::collections::HashMap::new();
	for host in topology.hosts.values()
	{
		match chosen.get(&host.isd_as)
		{
			Some(existing) if existing.has_application() => {}
			_ => { chosen.insert(host.isd_as.clone(), Rc::clone(host)); }
		}
	}
	chosen
}

/// Spawns the periodic prober loop and, for every representative host with
/// no bound application, a fallback inbox reader.
pub fn spawn_probing(kernel: &Kernel, topology: &Topology, selector: Rc<AdaptiveSelector>, interval_ms: f64)
{
	let hosts_by_as = representative_hosts(topology);

	for host in hosts_by_as.values()
	{
		if !host.has_application()
		{
			spawn_fallback_reader(kernel, Rc::clone(host), Rc::clone(&selector));
		}
	}

	spawn_sender(kernel, Rc::clone(&selector), hosts_by_as, interval_ms);
}

fn spawn_sender(kernel: &Kernel, selector: Rc<AdaptiveSelector>, hosts_by_as: std::collections::HashMap<AsId, Rc<Host>>, interval_ms: f64)
{
	let k = kernel.clone();
	let path_store = Rc::clone(selector.path_store());
	kernel.spawn(async move
	{
		loop
		{
			k.timeout(interval_ms).await;

			let pairs: Vec<AsPair> = path_store.borrow().all_pairs().cloned().collect();
			let mut all_paths: Vec<crate::packet::RouterPath> = Vec::new();
			for pair in pairs.iter()
			{
				all_paths.extend(path_store.borrow().paths_for(pair).to_vec());
			}

			for path in all_paths
			{
				let origin_router = match path.first() { Some(r) => r, None => continue };
				let target_router = match path.last() { Some(r) => r, None => continue };
				let origin_as = as_of_router(origin_router);
				let host = match hosts_by_as.get(&origin_as) { Some(h) => h, None => continue };

				let probe_id = selector.next_probe_id();
				let send_time = k.now();
				selector.register_pending_probe(probe_id, path.clone(), send_time);

				let packet = Packet::probe(host.id.clone(), target_router.clone(), path.clone(), probe_id, send_time);
				host.send(packet);
			}
		}
	});
}

fn spawn_fallback_reader(kernel: &Kernel, host: Rc<Host>, selector: Rc<AdaptiveSelector>)
{
	let k = kernel.clone();
	let inbox = host.inbox();
	kernel.spawn(async move
	{
		loop
		{
			let packet = inbox.get().await;
			if let crate::packet::PacketKind::Probe{ probe_id, send_time } = packet.kind
			{
				selector.resolve_probe(&packet.path, probe_id, k.now() - send_time);
			}
		}
	});
}

#[cfg(test)]
mod tests
{
	use super::*;
	use std::cell::RefCell;
	use crate::config::TopologyConfig;
	use crate::pathstore::PathStore;
	use crate::selector::adaptive::AdaptiveConfig;

	fn two_as_topology() -> TopologyConfig
	{
		let json = r#"
		{
			"A": { "core": true, "border_routers": { "br1": { "interfaces": [
				{ "isd_as": "B", "neighbor_router": "br1", "latency_ms": 5, "bandwidth_mbps": 1000 }
			]}}, "hosts": { "h1": { "addr": "10.0.0.1" } } },
			"B": { "core": false, "border_routers": { "br1": { "interfaces": [
				{ "isd_as": "A", "neighbor_router": "br1", "latency_ms": 5, "bandwidth_mbps": 1000 }
			]}}, "hosts": { "h1": { "addr": "10.0.0.2" } } }
		}
		"#;
		serde_json::from_str(json).unwrap()
	}

	#[test]
	fn a_probe_round_trip_resolves_into_the_selector()
	{
		let kernel = Kernel::new();
		let config = two_as_topology();
		let topology = Topology::build(&kernel, &config);
		crate::beaconing::spawn_beaconing(&kernel, &topology, 1000.0);
		kernel.run_until(50.0);

		let store: Rc<RefCell<PathStore>> = Rc::clone(&topology.path_store);
		let selector = Rc::new(AdaptiveSelector::new(kernel.clone(), store, AdaptiveConfig::default(), 7));

		spawn_probing(&kernel, &topology, Rc::clone(&selector), 100.0);
		kernel.run_until(500.0);

		let path = selector.path_store().borrow().paths_for(&("A".to_string(), "B".to_string())).first().cloned();
		if let Some(path) = path
		{
			assert!(selector.probed_latency(&path).is_some(), "a probe sent on a real path must eventually resolve a latency sample");
		}
	}
}
