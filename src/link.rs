/*!

A Link (spec.md SS4.2): a FIFO queue with propagation and transmission
delay to a single destination. Each link runs a perpetual cooperative
process on the [`Kernel`] that drains its queue; `enqueue` is the only
non-suspending entry point.

*/

use std::rc::Rc;

use crate::kernel::{Channel, Kernel, Time};
use crate::node::Endpoint;
use crate::packet::Packet;

/// `bandwidth_mbps * 1_000_000` bits/s, used to compute transmission delay.
fn bits_per_ms(bandwidth_mbps: f64) -> f64
{
	bandwidth_mbps * 1_000_000.0 / 1000.0
}

pub struct Link
{
	pub latency_ms: f64,
	pub bandwidth_mbps: f64,
	queue: Channel<Packet>,
}

impl Link
{
	/// Spawns the link's drain process and returns a handle whose
	/// `enqueue` is the only way code outside this module touches it.
	pub fn new(kernel: &Kernel, latency_ms: f64, bandwidth_mbps: f64, destination: Rc<dyn Endpoint>) -> Link
	{
		let queue: Channel<Packet> = Channel::new(kernel);
		let link = Link{ latency_ms, bandwidth_mbps, queue: queue.clone() };
		spawn_drain(kernel.clone(), queue, latency_ms, bandwidth_mbps, destination);
		link
	}

	/// Non-blocking; the packet joins the tail of the FIFO.
	pub fn enqueue(&self, packet: Packet)
	{
		self.queue.put(packet);
	}
}

fn spawn_drain(kernel: Kernel, queue: Channel<Packet>, latency_ms: f64, bandwidth_mbps: f64, destination: Rc<dyn Endpoint>)
{
	let k = kernel.clone();
	kernel.spawn(async move
	{
		loop
		{
			let packet = queue.get().await;
			k.timeout(latency_ms).await;
			let transmission_delay: Time = (packet.size as f64 * 8.0) / bits_per_ms(bandwidth_mbps);
			k.timeout(transmission_delay).await;
			destination.receive(&k, packet);
		}
	});
}
