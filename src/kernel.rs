/*!

The simulation kernel: a single-threaded cooperative scheduler over a virtual
clock. There is no real concurrency here — `Kernel` drives a small, hand
written `std::future::Future` executor whose only notion of "now" is the
float millisecond clock it advances itself. Long-lived activities (a link's
drain loop, a host's receive handler, an application's send loop, the
beaconing emitter, the probing loop, the event manager) are each written as
an ordinary `async fn` and `spawn`ed onto the kernel; they suspend only at
`kernel.timeout(..)` and `Channel::get()`.

This is deliberately not backed by `tokio` or any other real-time async
runtime: a real runtime wakes tasks from OS timers and I/O readiness, which
would make the same scenario produce different interleavings run to run.
Here the clock only ever moves forward when every currently-ready process
has been polled to its next suspension point, so two runs with the same
inputs and the same PRNG seed produce bit-identical event orderings.

*/

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

/// Virtual time, in milliseconds. Never tied to wall-clock time.
pub type Time = f64;

thread_local! {
	/// The task currently being polled by the executor, if any.
	/// `Timeout`/`ChannelGet` futures consult this instead of threading a
	/// task id through every `async fn` signature.
	static CURRENT_TASK: RefCell<Option<usize>> = RefCell::new(None);
}

fn current_task() -> usize
{
	CURRENT_TASK.with(|c| c.borrow().expect("kernel future polled outside of a scheduled task"))
}

fn noop_raw_waker() -> RawWaker
{
	fn clone(_: *const ()) -> RawWaker { noop_raw_waker() }
	fn no_op(_: *const ()) {}
	static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, no_op, no_op, no_op);
	RawWaker::new(std::ptr::null(), &VTABLE)
}

fn noop_waker() -> Waker
{
	unsafe { Waker::from_raw(noop_raw_waker()) }
}

struct TimerEntry
{
	time: Time,
	seq: u64,
	task: usize,
}

impl PartialEq for TimerEntry
{
	fn eq(&self, other: &Self) -> bool { self.time == other.time && self.seq == other.seq }
}
impl Eq for TimerEntry {}

impl PartialOrd for TimerEntry
{
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for TimerEntry
{
	/// Reversed so that `BinaryHeap` (a max-heap) pops the smallest time, and
	/// among equal times the smallest `seq` (earliest scheduled) first.
	fn cmp(&self, other: &Self) -> Ordering
	{
		other.time.partial_cmp(&self.time).unwrap_or(Ordering::Equal)
			.then_with(|| other.seq.cmp(&self.seq))
	}
}

struct Inner
{
	now: Time,
	seq: u64,
	timers: BinaryHeap<TimerEntry>,
	ready: VecDeque<usize>,
	tasks: Vec<Option<Pin<Box<dyn Future<Output = ()>>>>>,
}

impl Inner
{
	fn next_seq(&mut self) -> u64
	{
		let s = self.seq;
		self.seq += 1;
		s
	}
}

/// A cheap, cloneable handle onto the kernel's scheduler state. Every
/// simulated component (links, routers, hosts, applications, the beaconing
/// and probing loops, the event manager) holds one of these to spawn
/// processes and to suspend on `timeout`.
#[derive(Clone)]
pub struct Kernel
{
	inner: Rc<RefCell<Inner>>,
}

impl Kernel
{
	pub fn new() -> Kernel
	{
		Kernel{
			inner: Rc::new(RefCell::new(Inner{
				now: 0.0,
				seq: 0,
				timers: BinaryHeap::new(),
				ready: VecDeque::new(),
				tasks: Vec::new(),
			})),
		}
	}

	/// Current virtual time, in milliseconds.
	pub fn now(&self) -> Time
	{
		self.inner.borrow().now
	}

	/// Register a cooperative process. It runs up to its first suspension
	/// point the next time the executor drains the ready queue.
	pub fn spawn<F>(&self, future: F)
		where F: Future<Output = ()> + 'static
	{
		let mut inner = self.inner.borrow_mut();
		let id = inner.tasks.len();
		inner.tasks.push(Some(Box::pin(future)));
		inner.ready.push_back(id);
	}

	/// Suspend the current process until `now + delay`. A delay of zero
	/// still yields control once before resuming, so that other processes
	/// scheduled at the same instant get a turn first — matching the
	/// ordering guarantee in spec.md SS4.1/SS5.
	pub fn timeout(&self, delay: Time) -> Timeout
	{
		let target = self.now() + delay.max(0.0);
		Timeout{
			kernel: self.clone(),
			target,
			registered: false,
		}
	}

	fn wake_task(&self, task: usize)
	{
		self.inner.borrow_mut().ready.push_back(task);
	}

	fn poll_task(&self, id: usize)
	{
		let taken = self.inner.borrow_mut().tasks[id].take();
		if let Some(mut future) = taken
		{
			CURRENT_TASK.with(|c| *c.borrow_mut() = Some(id));
			let waker = noop_waker();
			let mut cx = Context::from_waker(&waker);
			let poll = future.as_mut().poll(&mut cx);
			CURRENT_TASK.with(|c| *c.borrow_mut() = None);
			if poll.is_pending()
			{
				self.inner.borrow_mut().tasks[id] = Some(future);
			}
		}
	}

	/// Advance the simulation until no events remain or virtual time reaches
	/// `end`, whichever comes first.
	pub fn run_until(&self, end: Time)
	{
		loop
		{
			loop
			{
				let next_ready = self.inner.borrow_mut().ready.pop_front();
				match next_ready
				{
					Some(id) => self.poll_task(id),
					None => break,
				}
			}

			let next_time = self.inner.borrow().timers.peek().map(|e| e.time);
			match next_time
			{
				Some(t) if t <= end =>
				{
					let mut inner = self.inner.borrow_mut();
					inner.now = t;
					while let Some(top) = inner.timers.peek()
					{
						if top.time == t
						{
							let entry = inner.timers.pop().expect("peeked entry must pop");
							inner.ready.push_back(entry.task);
						}
						else { break; }
					}
				}
				_ =>
				{
					let mut inner = self.inner.borrow_mut();
					if inner.now < end { inner.now = end; }
					break;
				}
			}
		}
	}
}

impl Default for Kernel
{
	fn default() -> Self { Kernel::new() }
}

/// Future returned by [`Kernel::timeout`].
pub struct Timeout
{
	kernel: Kernel,
	target: Time,
	registered: bool,
}

impl Future for Timeout
{
	type Output = ();

	fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()>
	{
		let this = self.get_mut();
		if this.registered
		{
			if this.kernel.now() >= this.target { return Poll::Ready(()); }
		}
		let task = current_task();
		let mut inner = this.kernel.inner.borrow_mut();
		if this.target <= inner.now
		{
			// Zero (or already-elapsed) delay: still yield once.
			inner.ready.push_back(task);
		}
		else
		{
			let seq = inner.next_seq();
			inner.timers.push(TimerEntry{ time: this.target, seq, task });
		}
		this.registered = true;
		Poll::Pending
	}
}

struct ChannelInner<T>
{
	queue: VecDeque<T>,
	waiters: VecDeque<usize>,
}

/// An unbounded FIFO channel. `put` never blocks; `get` suspends the calling
/// process until an item is available. Used for per-link packet queues and
/// host inboxes (spec.md SS4.1).
pub struct Channel<T>
{
	inner: Rc<RefCell<ChannelInner<T>>>,
	kernel: Kernel,
}

impl<T> Clone for Channel<T>
{
	fn clone(&self) -> Self
	{
		Channel{ inner: Rc::clone(&self.inner), kernel: self.kernel.clone() }
	}
}

impl<T> Channel<T>
{
	pub fn new(kernel: &Kernel) -> Channel<T>
	{
		Channel{
			inner: Rc::new(RefCell::new(ChannelInner{ queue: VecDeque::new(), waiters: VecDeque::new() })),
			kernel: kernel.clone(),
		}
	}

	/// Non-blocking enqueue. Wakes one waiting `get`, if any.
	pub fn put(&self, item: T)
	{
		let waiter = {
			let mut inner = self.inner.borrow_mut();
			inner.queue.push_back(item);
			inner.waiters.pop_front()
		};
		if let Some(task) = waiter
		{
			self.kernel.wake_task(task);
		}
	}

	/// Suspend until an item is available, then return it.
	pub fn get(&self) -> ChannelGet<T>
	{
		ChannelGet{ channel: self.clone() }
	}

	pub fn len(&self) -> usize { self.inner.borrow().queue.len() }
	pub fn is_empty(&self) -> bool { self.len() == 0 }
}

pub struct ChannelGet<T>
{
	channel: Channel<T>,
}

impl<T> Future for ChannelGet<T>
{
	type Output = T;

	fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<T>
	{
		let mut inner = self.channel.inner.borrow_mut();
		if let Some(item) = inner.queue.pop_front()
		{
			Poll::Ready(item)
		}
		else
		{
			let task = current_task();
			inner.waiters.push_back(task);
			Poll::Pending
		}
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use std::cell::Cell;
	use std::rc::Rc as StdRc;

	#[test]
	fn timeout_orders_by_scheduled_time()
	{
		let kernel = Kernel::new();
		let log: StdRc<RefCell<Vec<(Time, &'static str)>>> = StdRc::new(RefCell::new(Vec::new()));

		{
			let kernel = kernel.clone();
			let log = StdRc::clone(&log);
			kernel.spawn(async move {
				kernel.timeout(10.0).await;
				log.borrow_mut().push((kernel.now(), "a"));
			});
		}
		{
			let kernel = kernel.clone();
			let log = StdRc::clone(&log);
			kernel.spawn(async move {
				kernel.timeout(5.0).await;
				log.borrow_mut().push((kernel.now(), "b"));
			});
		}

		kernel.run_until(100.0);
		let events = log.borrow();
		assert_eq!(events.as_slice(), &[(5.0, "b"), (10.0, "a")]);
	}

	#[test]
	fn equal_time_events_fire_in_scheduling_order()
	{
		let kernel = Kernel::new();
		let order: StdRc<RefCell<Vec<u32>>> = StdRc::new(RefCell::new(Vec::new()));
		for i in 0..5u32
		{
			let kernel_clone = kernel.clone();
			let order = StdRc::clone(&order);
			kernel.spawn(async move {
				kernel_clone.timeout(1.0).await;
				order.borrow_mut().push(i);
			});
		}
		kernel.run_until(10.0);
		assert_eq!(order.borrow().as_slice(), &[0, 1, 2, 3, 4]);
	}

	#[test]
	fn channel_get_suspends_until_put()
	{
		let kernel = Kernel::new();
		let chan: Channel<u32> = Channel::new(&kernel);
		let received = StdRc::new(Cell::new(None));

		{
			let chan = chan.clone();
			let received = StdRc::clone(&received);
			kernel.spawn(async move {
				let v = chan.get().await;
				received.set(Some(v));
			});
		}

		kernel.run_until(0.0);
		assert_eq!(received.get(), None, "no item yet; process must be suspended");

		chan.put(42);
		kernel.run_until(0.0);
		assert_eq!(received.get(), Some(42));
	}

	#[test]
	fn timeout_zero_yields_without_advancing_time()
	{
		let kernel = Kernel::new();
		let observed = StdRc::new(Cell::new(-1.0));
		{
			let kernel_clone = kernel.clone();
			let observed = StdRc::clone(&observed);
			kernel.spawn(async move {
				kernel_clone.timeout(0.0).await;
				observed.set(kernel_clone.now());
			});
		}
		kernel.run_until(0.0);
		assert_eq!(observed.get(), 0.0);
	}
}
