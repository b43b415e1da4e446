use scion_path_sim::config::{self, TopologyConfig, TrafficConfig};

/// A two-AS topology, one host each side, one direct border-router link.
pub fn two_as_topology() -> TopologyConfig
{
	let json = r#"
	{
		"A": {
			"core": true,
			"border_routers": { "br1": { "interfaces": [
				{ "isd_as": "B", "neighbor_router": "br1", "latency_ms": 10, "bandwidth_mbps": 100 }
			]}},
			"hosts": { "h1": { "addr": "10.0.0.1" } }
		},
		"B": {
			"core": false,
			"border_routers": { "br1": { "interfaces": [
				{ "isd_as": "A", "neighbor_router": "br1", "latency_ms": 10, "bandwidth_mbps": 100 }
			]}},
			"hosts": { "h1": { "addr": "10.0.0.2" } }
		}
	}
	"#;
	serde_json::from_str(json).expect("fixture JSON must parse")
}

/// A three-AS diamond: core A links both B and C, giving A<->B, A<->C, and
/// a transit-combined B<->C path once beacons converge. The two branch
/// latencies are deliberately unequal (5ms vs 50ms) so B's beacon always
/// registers strictly before C's: which side wins the transit-combination
/// race would otherwise depend on `HashMap`'s per-process random iteration
/// order over `Router::ports`, making the winning direction untestable.
pub fn diamond_topology() -> TopologyConfig
{
	let json = r#"
	{
		"A": {
			"core": true,
			"border_routers": { "br1": { "interfaces": [
				{ "isd_as": "B", "neighbor_router": "br1", "latency_ms": 5, "bandwidth_mbps": 100 },
				{ "isd_as": "C", "neighbor_router": "br1", "latency_ms": 50, "bandwidth_mbps": 100 }
			]}},
			"hosts": { "h1": { "addr": "10.0.0.1" } }
		},
		"B": {
			"core": false,
			"border_routers": { "br1": { "interfaces": [
				{ "isd_as": "A", "neighbor_router": "br1", "latency_ms": 5, "bandwidth_mbps": 100 }
			]}},
			"hosts": { "h1": { "addr": "10.0.1.1" } }
		},
		"C": {
			"core": false,
			"border_routers": { "br1": { "interfaces": [
				{ "isd_as": "A", "neighbor_router": "br1", "latency_ms": 5, "bandwidth_mbps": 100 }
			]}},
			"hosts": { "h1": { "addr": "10.0.2.1" } }
		}
	}
	"#;
	serde_json::from_str(json).expect("fixture JSON must parse")
}

pub fn single_flow_traffic(source: &str, destination: &str, duration_ms: f64, data_size_kb: f64) -> TrafficConfig
{
	let json = format!(r#"
	{{
		"duration_ms": {duration},
		"flows": [
			{{ "name": "f1", "source": "{src}", "destination": "{dst}", "start_time_ms": 50, "data_size_kb": {size} }}
		],
		"events": []
	}}
	"#, duration = duration_ms, src = source, dst = destination, size = data_size_kb);
	serde_json::from_str(&json).expect("fixture JSON must parse")
}

#[allow(dead_code)]
pub fn load_topology_fixture(path: &str) -> TopologyConfig
{
	config::load_topology(std::path::Path::new(path)).expect("fixture file must parse")
}
