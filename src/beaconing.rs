/*!

Periodic beacon emission from every core AS (spec.md SS4.3), grounded in
`original_source/beaconing.py`'s `BeaconingProcess.start`. Each core AS's
origin router spawns one perpetual process on the [`Kernel`] that, every
`interval_ms`, builds a fresh beacon and enqueues an independent clone onto
every one of its ports.

*/

use std::rc::Rc;

use crate::kernel::Kernel;
use crate::node::Router;
use crate::packet::Packet;
use crate::topology::Topology;

/// Default beacon interval (spec.md S1/S6 leave it unspecified at the
/// scenario level; `original_source/beaconing.py`'s `BeaconingProcess`
/// defaults to 1000ms).
pub const DEFAULT_BEACON_INTERVAL_MS: f64 = 1000.0;

/// Spawns one beaconing process per core AS found in `topology`.
pub fn spawn_beaconing(kernel: &Kernel, topology: &Topology, interval_ms: f64)
{
	for origin in topology.core_origin_routers()
	{
		spawn_origin(kernel, origin, interval_ms);
	}
}

fn spawn_origin(kernel: &Kernel, origin: Rc<Router>, interval_ms: f64)
{
	let k = kernel.clone();
	kernel.spawn(async move
	{
		loop
		{
			let beacon = Packet::beacon(origin.id.clone(), origin.as_id.clone(), k.now());
			for link in origin.ports().values()
			{
				link.enqueue(beacon.clone());
			}
			k.timeout(interval_ms).await;
		}
	});
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::config::TopologyConfig;

	fn three_as_chain() -> TopologyConfig
	{
		let json = r#"
		{
			"A": {
				"core": true,
				"border_routers": { "br1": { "interfaces": [
					{ "isd_as": "B", "neighbor_router": "br1", "latency_ms": 5, "bandwidth_mbps": 1000 },
					{ "isd_as": "C", "neighbor_router": "br1", "latency_ms": 5, "bandwidth_mbps": 1000 }
				]}}
			},
			"B": {
				"core": false,
				"border_routers": { "br1": { "interfaces": [
					{ "isd_as": "A", "neighbor_router": "br1", "latency_ms": 5, "bandwidth_mbps": 1000 }
				]}}
			},
			"C": {
				"core": false,
				"border_routers": { "br1": { "interfaces": [
					{ "isd_as": "A", "neighbor_router": "br1", "latency_ms": 5, "bandwidth_mbps": 1000 }
				]}}
			}
		}
		"#;
		serde_json::from_str(json).unwrap()
	}

	#[test]
	fn beacons_populate_reverse_and_transit_paths()
	{
		let kernel = Kernel::new();
		let config = three_as_chain();
		let topology = Topology::build(&kernel, &config);
		spawn_beaconing(&kernel, &topology, 1000.0);
		kernel.run_until(50.0);

		let store = topology.path_store.borrow();
		let b_to_a = store.paths_for(&("B".to_string(), "A".to_string()));
		assert!(!b_to_a.is_empty());
		let b_to_c = store.paths_for(&("B".to_string(), "C".to_string()));
		assert!(!b_to_c.is_empty(), "transit path B->C through core A must materialise");
		assert!(b_to_c[0].iter().any(|r| r.starts_with("A-")), "combined path must pass through A's border router");

		for (_, paths) in store_pairs(&store)
		{
			for path in paths
			{
				let mut seen = std::collections::HashSet::new();
				for router in path
				{
					assert!(seen.insert(router.clone()), "no router loops: {:?}", path);
				}
			}
		}
	}

	fn store_pairs(store: &crate::pathstore::PathStore) -> Vec<(crate::pathstore::AsPair, Vec<crate::packet::RouterPath>)>
	{
		store.all_pairs().map(|k| (k.clone(), store.paths_for(k).to_vec())).collect()
	}
}
