/*!

Nodes (spec.md SS4.3, SS4.4): routers forward and flood, hosts are pure
send/receive endpoints bound to exactly one application. Both sides of a
[`crate::link::Link`] are trait objects behind [`Endpoint`] so a link never
needs to know whether its destination is a router or a host.

*/

pub mod router;
pub mod host;

pub use host::Host;
pub use router::Router;

use crate::kernel::Kernel;
use crate::packet::Packet;

/// Anything a [`crate::link::Link`] can deliver a packet to.
pub trait Endpoint
{
	fn receive(&self, kernel: &Kernel, packet: Packet);
}
