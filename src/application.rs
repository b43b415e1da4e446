/*!

An application flow (spec.md SS4.5): start-time delay, path selection, a
bounded 1500-byte send loop, and a receive handler bound to the destination
host. Grounded in `original_source/application.py`'s `Application.run`.

*/

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::app_registry::AppRegistry;
use crate::kernel::Kernel;
use crate::node::Host;
use crate::packet::{DATA_PACKET_SIZE, Packet, RouterPath};
use crate::selector::PathSelector;

/// Delay an application waits before retrying after discovering no path is
/// currently available (spec.md SS4.5 "path-down retry").
const PATH_DOWN_BACKOFF_MS: f64 = 10.0;
/// Spacing between consecutive packets of one flow's send loop.
const INTER_PACKET_SPACING_MS: f64 = 1.0;

#[derive(Default, Debug, Clone, Copy)]
pub struct FlowStats
{
	pub packets_sent: u64,
	pub packets_received: u64,
	pub packets_lost: u64,
	pub latency_sum_ms: f64,
}

impl FlowStats
{
	pub fn mean_latency_ms(&self) -> f64
	{
		if self.packets_received == 0 { 0.0 } else { self.latency_sum_ms / self.packets_received as f64 }
	}

	pub fn loss_rate(&self) -> f64
	{
		let attempted = self.packets_sent + self.packets_lost;
		if attempted == 0 { 0.0 } else { self.packets_lost as f64 / attempted as f64 }
	}
}

pub struct Application
{
	pub id: String,
	kernel: Kernel,
	source: Rc<Host>,
	destination: Rc<Host>,
	start_time_ms: f64,
	data_size_kb: f64,
	selector: Rc<dyn PathSelector>,
	registry: Rc<AppRegistry>,
	current_path: RefCell<Option<RouterPath>>,
	/// Set by [`Application::on_path_down`], cleared once a re-selection in
	/// the send loop succeeds (spec.md SS4.5 step 5's `isPathDown` flag).
	is_path_down: Cell<bool>,
	stats: RefCell<FlowStats>,
}

impl Application
{
	pub fn new(id: String, kernel: Kernel, source: Rc<Host>, destination: Rc<Host>, start_time_ms: f64, data_size_kb: f64, selector: Rc<dyn PathSelector>, registry: Rc<AppRegistry>) -> Rc<Application>
	{
		Rc::new(Application{
			id, kernel, source, destination, start_time_ms, data_size_kb, selector, registry,
			current_path: RefCell::new(None),
			is_path_down: Cell::new(false),
			stats: RefCell::new(FlowStats::default()),
		})
	}

	#[cfg(test)]
	pub fn new_for_test(kernel: &Kernel, selector: Rc<dyn PathSelector>) -> Rc<Application>
	{
		let source = Rc::new(Host::new(kernel, "A,10.0.0.1".to_string(), "A".to_string()));
		let destination = Rc::new(Host::new(kernel, "B,10.0.0.1".to_string(), "B".to_string()));
		Application::new("test-flow".to_string(), kernel.clone(), source, destination, 0.0, 1.5, selector, Rc::new(AppRegistry::new()))
	}

	pub fn stats(&self) -> FlowStats
	{
		*self.stats.borrow()
	}

	/// Spawns this flow's start-delay wait, receive handler, and send loop
	/// onto `kernel`.
	pub fn spawn(self: &Rc<Self>, kernel: &Kernel)
	{
		let app = Rc::clone(self);
		kernel.spawn(async move { app.run().await });
	}

	async fn run(self: Rc<Self>)
	{
		self.kernel.timeout(self.start_time_ms).await;

		self.destination.mark_has_application();
		self.spawn_receive_handler();

		// spec.md SS4.5 step 2 / SS7 "No path": a null initial selection
		// terminates the flow outright, it is not a loss (original_source/
		// application.py:23-25 `if not path: ... return`).
		if self.reselect(&self).is_none()
		{
			eprintln!("[{:.2}] flow {}: no path available at start, terminating", self.kernel.now(), self.id);
			return;
		}

		let total_bytes = (self.data_size_kb * 1024.0).round().max(0.0) as u64;
		let num_packets = (total_bytes / DATA_PACKET_SIZE as u64).max(1);

		let mut sent = 0u64;
		while sent < num_packets
		{
			if self.is_path_down.get()
			{
				if self.reselect(&self).is_none()
				{
					self.kernel.timeout(PATH_DOWN_BACKOFF_MS).await;
					continue;
				}
				self.is_path_down.set(false);
			}

			let path = self.current_path.borrow().clone().expect("not down and not terminated implies a current path");
			let packet = Packet::data(self.source.id.clone(), self.destination.id.clone(), path, self.kernel.now());
			self.source.send(packet);
			self.stats.borrow_mut().packets_sent += 1;
			sent += 1;
			self.kernel.timeout(INTER_PACKET_SPACING_MS).await;
		}
	}

	/// Selects a path for this flow's `(sourceAs, destinationAs)` pair once
	/// and updates the registry accordingly (spec.md SS4.9), used both for
	/// the initial pick and for re-selection after a path goes down (spec.md
	/// SS4.5 step 5) — never called once per packet, matching
	/// `original_source/application.py`'s `self.current_path` reuse. Takes
	/// the owning `Rc` explicitly since [`AppRegistry`] tracks registrants by
	/// `Weak<Application>` identity.
	fn reselect(&self, app_rc: &Rc<Application>) -> Option<RouterPath>
	{
		let selected = self.selector.select_path(&self.source.isd_as, &self.destination.isd_as);

		let mut current = self.current_path.borrow_mut();
		if let Some(old) = current.as_ref()
		{
			self.registry.unregister_usage(old, app_rc);
		}
		*current = selected.clone();
		drop(current);

		if let Some(path) = selected.as_ref()
		{
			self.registry.register_usage(path, app_rc);
		}
		selected
	}

	fn spawn_receive_handler(self: &Rc<Self>)
	{
		let app = Rc::clone(self);
		let inbox = self.destination.inbox();
		let kernel = self.kernel.clone();
		kernel.spawn(async move
		{
			loop
			{
				let packet = inbox.get().await;
				if packet.is_probe()
				{
					if let Some(responder) = app.selector.as_probe_responder()
					{
						if let crate::packet::PacketKind::Probe{ probe_id, send_time } = packet.kind
						{
							responder.resolve_probe(&packet.path, probe_id, app.kernel.now() - send_time);
						}
					}
					continue;
				}

				let latency = app.kernel.now() - packet.creation_time;
				{
					let mut stats = app.stats.borrow_mut();
					stats.packets_received += 1;
					stats.latency_sum_ms += latency;
				}
				if let Some(sink) = app.selector.as_feedback_sink()
				{
					sink.update_feedback(&packet.path, latency, false, packet.size);
				}
			}
		});
	}

	/// `notifyLoss(packet)` (spec.md SS4.5 callbacks): records one known-lost
	/// packet and, if the selector accepts feedback, reports it. The
	/// baseline never calls this itself — spec.md SS7 "Routing error" drops
	/// undeliverable data packets silently at the router with no loss signal
	/// synthesised back to the sender — but it is kept as a public capability
	/// for a caller with its own loss-detection (e.g. an ACK/timeout scheme)
	/// to report through.
	pub fn notify_loss(&self, packet: &Packet)
	{
		self.stats.borrow_mut().packets_lost += 1;
		if let Some(sink) = self.selector.as_feedback_sink()
		{
			sink.update_feedback(&packet.path, 0.0, true, packet.size);
		}
	}

	/// Invoked by the event manager when a path this flow is registered
	/// against goes down (spec.md SS4.9: "set `isPathDown`, trigger
	/// immediate re-selection"). The send loop checks the flag at its next
	/// suspension point and reselects there.
	pub fn on_path_down(&self, path: &RouterPath)
	{
		if self.current_path.borrow().as_ref() == Some(path)
		{
			eprintln!("[{:.2}] flow {}: path down, will reselect", self.kernel.now(), self.id);
			self.is_path_down.set(true);
		}
	}

	pub fn on_path_up(&self, path: &RouterPath)
	{
		eprintln!("[{:.2}] flow {}: path {:?} back up", self.kernel.now(), self.id, path);
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::pathstore::PathStore;
	use crate::selector::shortest::ShortestSelector;
	use std::cell::RefCell as StdRefCell;

	fn setup() -> (Kernel, Rc<Application>)
	{
		let kernel = Kernel::new();
		let store = Rc::new(StdRefCell::new(PathStore::new()));
		store.borrow_mut().register_beacon(&"A".to_string(), &"B".to_string(), vec!["A-br1".to_string(), "B-br1".to_string()]);
		let selector: Rc<dyn PathSelector> = Rc::new(ShortestSelector::new(Rc::clone(&store)));

		let source = Rc::new(Host::new(&kernel, "A,10.0.0.1".to_string(), "A".to_string()));
		let destination = Rc::new(Host::new(&kernel, "B,10.0.0.1".to_string(), "B".to_string()));
		let registry = Rc::new(AppRegistry::new());
		let app = Application::new("flow-1".to_string(), kernel.clone(), source, destination, 0.0, 1.5, selector, registry);
		(kernel, app)
	}

	#[test]
	fn a_flow_with_no_initial_path_terminates_without_recording_a_loss()
	{
		let kernel = Kernel::new();
		let store = Rc::new(StdRefCell::new(PathStore::new()));
		let selector: Rc<dyn PathSelector> = Rc::new(ShortestSelector::new(store));
		let source = Rc::new(Host::new(&kernel, "A,10.0.0.1".to_string(), "A".to_string()));
		let destination = Rc::new(Host::new(&kernel, "B,10.0.0.1".to_string(), "B".to_string()));
		let app = Application::new("flow-2".to_string(), kernel.clone(), source, destination, 0.0, 1.5, selector, Rc::new(AppRegistry::new()));

		app.spawn(&kernel);
		kernel.run_until(100.0);

		assert_eq!(app.stats().packets_sent, 0);
		assert_eq!(app.stats().packets_lost, 0, "spec.md SS4.5/SS7: no initial path terminates the flow, it is not a loss");
	}

	#[test]
	fn a_flow_with_a_path_delivers_and_records_latency()
	{
		let (kernel, app) = setup();
		app.spawn(&kernel);
		kernel.run_until(200.0);

		let stats = app.stats();
		assert!(stats.packets_sent >= 1);
		assert_eq!(stats.packets_received, stats.packets_sent, "an always-up direct link must deliver everything sent");
		assert!(stats.mean_latency_ms() >= 0.0);
	}
}
