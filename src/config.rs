/*!

Deserialization of the two external inputs (spec.md SS6): the topology file
(`ISD-AS -> {core, border_routers, hosts}`) and the traffic scenario file
(`{duration_ms, flows, events?}`). These shapes are grounded in
`topology.py`'s `_load_from_json` and `simulation.py`'s `load_traffic_scenario`
from `original_source/`, expressed as `serde` structs the way
`RephlexZero-strata`'s `rist-bonding-core::config` and `nsg-ethz-Chameleon`'s
`specification` module do it — `caminos-lib` itself parses its own
`gramatica` DSL rather than JSON, so this module has no direct teacher
analog and borrows the idiom from the rest of the pack instead (see
DESIGN.md).

Loading never panics: every failure becomes an [`Error`](crate::error::Error)
of kind `Io` or `IllFormedConfiguration`, per spec.md SS7.

*/

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::{error, source_location};
use crate::error::Error;

#[derive(Debug, Clone, Deserialize)]
pub struct InterfaceConfig
{
	pub isd_as: String,
	pub neighbor_router: String,
	pub latency_ms: f64,
	pub bandwidth_mbps: f64,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct BorderRouterConfig
{
	#[serde(default)]
	pub interfaces: Vec<InterfaceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HostConfig
{
	pub addr: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AsConfig
{
	#[serde(default)]
	pub core: bool,
	#[serde(default)]
	pub border_routers: HashMap<String, BorderRouterConfig>,
	#[serde(default)]
	pub hosts: HashMap<String, HostConfig>,
}

/// The whole topology file: `ISD-AS -> AsConfig` (spec.md SS6).
pub type TopologyConfig = HashMap<String, AsConfig>;

#[derive(Debug, Clone, Deserialize)]
pub struct FlowConfig
{
	pub name: String,
	pub source: String,
	pub destination: String,
	pub start_time_ms: f64,
	pub data_size_kb: f64,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind
{
	PathDown,
	PathUp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventConfig
{
	pub time_ms: f64,
	pub kind: EventKind,
	pub path: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrafficConfig
{
	#[serde(default = "default_duration_ms")]
	pub duration_ms: f64,
	#[serde(default)]
	pub flows: Vec<FlowConfig>,
	#[serde(default)]
	pub events: Vec<EventConfig>,
}

fn default_duration_ms() -> f64 { 1000.0 }

fn read_file(path: &Path) -> Result<String, Error>
{
	fs::read_to_string(path).map_err(|e| error!(io).with_message(format!("could not read {}: {}", path.display(), e)))
}

pub fn load_topology(path: &Path) -> Result<TopologyConfig, Error>
{
	let text = read_file(path)?;
	serde_json::from_str(&text).map_err(|e| error!(ill_formed_configuration).with_message(format!("topology file {}: {}", path.display(), e)))
}

pub fn load_traffic(path: &Path) -> Result<TrafficConfig, Error>
{
	let text = read_file(path)?;
	serde_json::from_str(&text).map_err(|e| error!(ill_formed_configuration).with_message(format!("traffic file {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests
{
	use super::*;

	#[test]
	fn parses_minimal_topology()
	{
		let json = r#"
		{
			"1-ff00:0:110": {
				"core": true,
				"border_routers": { "br1": { "interfaces": [] } },
				"hosts": { "h1": { "addr": "10.0.0.1" } }
			}
		}
		"#;
		let config: TopologyConfig = serde_json::from_str(json).unwrap();
		assert!(config["1-ff00:0:110"].core);
		assert_eq!(config["1-ff00:0:110"].hosts["h1"].addr, "10.0.0.1");
	}

	#[test]
	fn traffic_events_default_to_empty()
	{
		let json = r#"{ "duration_ms": 500, "flows": [] }"#;
		let config: TrafficConfig = serde_json::from_str(json).unwrap();
		assert_eq!(config.duration_ms, 500.0);
		assert!(config.events.is_empty());
	}

	#[test]
	fn unknown_fields_are_ignored()
	{
		let json = r#"{ "duration_ms": 500, "flows": [], "future_field": 42 }"#;
		let config: TrafficConfig = serde_json::from_str(json).unwrap();
		assert_eq!(config.duration_ms, 500.0);
	}
}
