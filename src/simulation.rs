/*!

Top-level wiring (spec.md SS4.1, SS5): builds the topology, starts
beaconing (and, for the adaptive selector, probing), spawns every
configured flow and the scripted event schedule, then drives the kernel to
the traffic scenario's configured duration. Grounded in
`original_source/simulation.py`'s `Simulation.run`.

*/

use std::rc::Rc;

use crate::app_registry::AppRegistry;
use crate::application::Application;
use crate::beaconing::{self, DEFAULT_BEACON_INTERVAL_MS};
use crate::config::{TopologyConfig, TrafficConfig};
use crate::event_manager;
use crate::kernel::Kernel;
use crate::selector::adaptive::{AdaptiveConfig, AdaptiveSelector};
use crate::selector::shortest::ShortestSelector;
use crate::selector::PathSelector;
use crate::selector::adaptive::probing;
use crate::topology::Topology;

/// How long beaconing runs before any flow, probe, or scripted event is
/// spawned (grounded in `original_source/simulation.py`'s `run()`, which
/// calls `initiate_beaconing` then `yield env.timeout(2000)` before starting
/// applications). Without this warmup a `start_time_ms=0` flow selects a
/// path before beacons have had a chance to converge.
const BEACON_CONVERGENCE_WARMUP_MS: f64 = 2000.0;

/// Which path-selection policy to run a scenario under (spec.md SS4.6),
/// grounded in `original_source/path_selection.py` exposing both a
/// `ShortestPathAlgorithm` and the adaptive algorithm behind one factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm
{
	Shortest,
	Adaptive,
}

impl Algorithm
{
	pub fn parse(name: &str) -> Option<Algorithm>
	{
		match name
		{
			"shortest" => Some(Algorithm::Shortest),
			"adaptive" => Some(Algorithm::Adaptive),
			_ => None,
		}
	}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SimulationSummary
{
	pub packets_sent: u64,
	pub packets_received: u64,
	pub packets_lost: u64,
	pub mean_latency_ms: f64,
}

impl std::fmt::Display for SimulationSummary
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
	{
		let attempted = self.packets_sent + self.packets_lost;
		let loss_rate = if attempted == 0 { 0.0 } else { 100.0 * self.packets_lost as f64 / attempted as f64 };
		write!(f, "sent={} received={} lost={} loss_rate={:.2}% mean_latency_ms={:.3}",
			self.packets_sent, self.packets_received, self.packets_lost, loss_rate, self.mean_latency_ms)
	}
}

pub struct Simulation
{
	kernel: Kernel,
	topology: Topology,
	traffic: TrafficConfig,
	selector: Rc<dyn PathSelector>,
	/// Kept alongside the trait-object handle above so probing (which
	/// needs [`AdaptiveSelector`]'s concrete probe-bookkeeping methods, not
	/// just the [`PathSelector`] capability surface) can be wired without a
	/// downcast (spec.md SS9 "Polymorphic selector").
	adaptive: Option<Rc<AdaptiveSelector>>,
	registry: Rc<AppRegistry>,
	flows: Vec<Rc<Application>>,
}

impl Simulation
{
	pub fn build(topology_config: &TopologyConfig, traffic: TrafficConfig, algorithm: Algorithm, seed: u64) -> Simulation
	{
		let kernel = Kernel::new();
		let topology = Topology::build(&kernel, topology_config);

		let mut adaptive = None;
		let selector: Rc<dyn PathSelector> = match algorithm
		{
			Algorithm::Shortest => Rc::new(ShortestSelector::new(Rc::clone(&topology.path_store))),
			Algorithm::Adaptive =>
			{
				let config = AdaptiveConfig{ probing_enabled: true, ..AdaptiveConfig::default() };
				let concrete = Rc::new(AdaptiveSelector::new(kernel.clone(), Rc::clone(&topology.path_store), config, seed));
				adaptive = Some(Rc::clone(&concrete));
				concrete
			}
		};

		let registry = Rc::new(AppRegistry::new());

		let mut flows = Vec::new();
		for flow_config in traffic.flows.iter()
		{
			let source = topology.get_host(&flow_config.source).cloned();
			let destination = topology.get_host(&flow_config.destination).cloned();
			match (source, destination)
			{
				(Some(source), Some(destination)) =>
				{
					let app = Application::new(
						flow_config.name.clone(),
						kernel.clone(),
						source,
						destination,
						flow_config.start_time_ms,
						flow_config.data_size_kb,
						Rc::clone(&selector),
						Rc::clone(&registry),
					);
					flows.push(app);
				}
				_ => eprintln!("flow {}: unknown source or destination host, skipping", flow_config.name),
			}
		}

		Simulation{ kernel, topology, traffic, selector, adaptive, registry, flows }
	}

	pub fn run(&self) -> SimulationSummary
	{
		beaconing::spawn_beaconing(&self.kernel, &self.topology, DEFAULT_BEACON_INTERVAL_MS);

		// Let beacons converge before anything reads the path store: flows,
		// probing and the event schedule all start counting their own
		// relative delays (start_time_ms, time_ms) from this point on.
		self.kernel.run_until(BEACON_CONVERGENCE_WARMUP_MS);

		if let Some(adaptive) = self.adaptive.as_ref()
		{
			if adaptive.config().probing_enabled
			{
				probing::spawn_probing(&self.kernel, &self.topology, Rc::clone(adaptive), adaptive.config().probing_interval_ms);
			}
		}

		for flow in self.flows.iter()
		{
			flow.spawn(&self.kernel);
		}

		event_manager::spawn_event_manager(&self.kernel, self.traffic.events.clone(), Rc::clone(&self.selector), Rc::clone(&self.registry));

		self.kernel.run_until(BEACON_CONVERGENCE_WARMUP_MS + self.traffic.duration_ms);

		self.summarize()
	}

	fn summarize(&self) -> SimulationSummary
	{
		let mut summary = SimulationSummary::default();
		for flow in self.flows.iter()
		{
			let stats = flow.stats();
			summary.packets_sent += stats.packets_sent;
			summary.packets_received += stats.packets_received;
			summary.packets_lost += stats.packets_lost;
			summary.mean_latency_ms += stats.latency_sum_ms;
		}
		if summary.packets_received > 0
		{
			summary.mean_latency_ms /= summary.packets_received as f64;
		}
		summary
	}
}
