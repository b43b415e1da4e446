/*!

A host: one inbound channel, one bound application, and a single uplink to
its AS's border router (spec.md SS4.4).

*/

use std::cell::{Cell, RefCell};

use crate::kernel::{Channel, Kernel};
use crate::link::Link;
use crate::node::Endpoint;
use crate::packet::{AsId, HostId, Packet};

pub struct Host
{
	pub id: HostId,
	pub isd_as: AsId,
	inbox: Channel<Packet>,
	uplink: RefCell<Option<Link>>,
	/// Set once an [`crate::application::Application`] binds to this host
	/// (spec.md SS4.4: "one bound Application"). Lets the probing loop
	/// (SPEC_FULL.md SS3) tell whether it needs its own inbox reader or
	/// whether the application's receive handler already drains this
	/// host's inbox and will hand probe responses to the selector itself.
	has_application: Cell<bool>,
}

impl Host
{
	pub fn new(kernel: &Kernel, id: HostId, isd_as: AsId) -> Host
	{
		Host{ id, isd_as, inbox: Channel::new(kernel), uplink: RefCell::new(None), has_application: Cell::new(false) }
	}

	pub fn mark_has_application(&self)
	{
		self.has_application.set(true);
	}

	pub fn has_application(&self) -> bool
	{
		self.has_application.get()
	}

	pub fn set_uplink(&self, link: Link)
	{
		*self.uplink.borrow_mut() = Some(link);
	}

	/// Routes onto the link to this host's (single) connected border
	/// router. Non-blocking.
	pub fn send(&self, packet: Packet)
	{
		match self.uplink.borrow().as_ref()
		{
			Some(link) => link.enqueue(packet),
			None => eprintln!("host {}: no uplink to a border router, dropping packet", self.id),
		}
	}

	pub fn inbox(&self) -> Channel<Packet>
	{
		self.inbox.clone()
	}
}

impl Endpoint for Host
{
	fn receive(&self, _kernel: &Kernel, packet: Packet)
	{
		self.inbox.put(packet);
	}
}
