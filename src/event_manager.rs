/*!

Scripted network events (spec.md SS4.9): a sorted `[{time_ms, kind, path}]`
schedule that marks paths down/up on the selector and notifies every
application currently registered against the affected path. Grounded in
spec.md SS4.9 directly; there is no `events.py` in the retrieved
`original_source/` pack to draw from (see DESIGN.md).

*/

use std::rc::Rc;

use crate::app_registry::AppRegistry;
use crate::config::{EventConfig, EventKind};
use crate::kernel::Kernel;
use crate::selector::PathSelector;

pub fn spawn_event_manager(kernel: &Kernel, events: Vec<EventConfig>, selector: Rc<dyn PathSelector>, registry: Rc<AppRegistry>)
{
	let mut sorted = events;
	sorted.sort_by(|a, b| a.time_ms.partial_cmp(&b.time_ms).unwrap_or(std::cmp::Ordering::Equal));

	let k = kernel.clone();
	kernel.spawn(async move
	{
		let mut elapsed = 0.0;
		for event in sorted
		{
			let delay = (event.time_ms - elapsed).max(0.0);
			k.timeout(delay).await;
			elapsed = event.time_ms;

			match event.kind
			{
				EventKind::PathDown =>
				{
					selector.mark_down(&event.path);
					for app in registry.applications_for(&event.path)
					{
						app.on_path_down(&event.path);
					}
					eprintln!("[{:.2}] event: path {:?} down", k.now(), event.path);
				}
				EventKind::PathUp =>
				{
					selector.mark_up(&event.path);
					for app in registry.applications_for(&event.path)
					{
						app.on_path_up(&event.path);
					}
					eprintln!("[{:.2}] event: path {:?} up", k.now(), event.path);
				}
			}
		}
	});
}
