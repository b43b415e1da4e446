/*!

The application registry (spec.md SS4.9): tracks which
[`Application`](crate::application::Application)s are currently using a
given router path, so the [`EventManager`](crate::event_manager::EventManager)
knows whom to notify when that path goes down or comes back up. Grounded in
spec.md SS4.9 directly — the retrieved `original_source/` pack has no
`app_registry.py` of its own to draw from (see DESIGN.md).

*/

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::application::Application;
use crate::packet::RouterPath;

#[derive(Default)]
pub struct AppRegistry
{
	by_path: RefCell<HashMap<RouterPath, Vec<Weak<Application>>>>,
}

impl AppRegistry
{
	pub fn new() -> AppRegistry
	{
		AppRegistry::default()
	}

	/// Records that `application` is currently sending over `path`.
	pub fn register_usage(&self, path: &RouterPath, application: &Rc<Application>)
	{
		self.by_path.borrow_mut().entry(path.clone()).or_insert_with(Vec::new).push(Rc::downgrade(application));
	}

	/// Drops the association between `application` and `path` (spec.md
	/// SS4.9: an application stops using a path once it re-selects after a
	/// down event, or finishes).
	pub fn unregister_usage(&self, path: &RouterPath, application: &Rc<Application>)
	{
		if let Some(list) = self.by_path.borrow_mut().get_mut(path)
		{
			list.retain(|weak| !Weak::ptr_eq(weak, &Rc::downgrade(application)));
		}
	}

	/// Every still-live application currently registered against `path`.
	/// Dead `Weak`s (the application already finished) are pruned as a
	/// side effect.
	pub fn applications_for(&self, path: &RouterPath) -> Vec<Rc<Application>>
	{
		let mut registry = self.by_path.borrow_mut();
		let list = match registry.get_mut(path)
		{
			Some(l) => l,
			None => return Vec::new(),
		};
		list.retain(|weak| weak.strong_count() > 0);
		list.iter().filter_map(|weak| weak.upgrade()).collect()
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::kernel::Kernel;
	use crate::selector::shortest::ShortestSelector;
	use crate::pathstore::PathStore;
	use std::cell::RefCell as StdRefCell;

	fn dummy_application(kernel: &Kernel) -> Rc<Application>
	{
		let store = Rc::new(StdRefCell::new(PathStore::new()));
		let selector = Rc::new(ShortestSelector::new(store));
		Application::new_for_test(kernel, selector)
	}

	#[test]
	fn registers_and_lists_live_applications()
	{
		let kernel = Kernel::new();
		let registry = AppRegistry::new();
		let path = vec!["a-br".to_string(), "b-br".to_string()];
		let app = dummy_application(&kernel);

		registry.register_usage(&path, &app);
		assert_eq!(registry.applications_for(&path).len(), 1);

		registry.unregister_usage(&path, &app);
		assert_eq!(registry.applications_for(&path).len(), 0);
	}

	#[test]
	fn dropped_applications_are_pruned()
	{
		let kernel = Kernel::new();
		let registry = AppRegistry::new();
		let path = vec!["a-br".to_string(), "b-br".to_string()];
		{
			let app = dummy_application(&kernel);
			registry.register_usage(&path, &app);
		}
		assert_eq!(registry.applications_for(&path).len(), 0, "a dropped application must not be returned");
	}
}
