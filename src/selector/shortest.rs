/*!

The `Shortest` selector (spec.md SS4.6): no feedback, no probing, just the
available path of minimum length, grounded in
`original_source/path_selection.py`'s `ShortestPathAlgorithm.select_path`.

*/

use std::cell::RefCell;
use std::rc::Rc;

use crate::packet::RouterPath;
use crate::pathstore::{AsPair, PathStore};
use crate::selector::PathSelector;

pub struct ShortestSelector
{
	path_store: Rc<RefCell<PathStore>>,
}

impl ShortestSelector
{
	pub fn new(path_store: Rc<RefCell<PathStore>>) -> ShortestSelector
	{
		ShortestSelector{ path_store }
	}
}

impl PathSelector for ShortestSelector
{
	fn select_path(&self, source_as: &str, destination_as: &str) -> Option<RouterPath>
	{
		let store = self.path_store.borrow();
		let key = (source_as.to_string(), destination_as.to_string());
		store.paths_for(&key).iter()
			.filter(|p| store.is_available(p))
			.min_by_key(|p| p.len())
			.cloned()
	}

	fn mark_down(&self, path: &RouterPath) -> Vec<AsPair>
	{
		self.path_store.borrow_mut().mark_down(path)
	}

	fn mark_up(&self, path: &RouterPath) -> Vec<AsPair>
	{
		self.path_store.borrow_mut().mark_up(path)
	}
}

#[cfg(test)]
mod tests
{
	use super::*;

	#[test]
	fn picks_the_shortest_available_path()
	{
		let store = Rc::new(RefCell::new(PathStore::new()));
		store.borrow_mut().register_beacon(&"A".to_string(), &"B".to_string(), vec!["a-br".into(), "mid-br".into(), "b-br".into()]);
		store.borrow_mut().register_beacon(&"A".to_string(), &"B".to_string(), vec!["a-br".into(), "b-br".into()]);

		let selector = ShortestSelector::new(Rc::clone(&store));
		let chosen = selector.select_path("A", "B").unwrap();
		assert_eq!(chosen.len(), 2);
	}

	#[test]
	fn never_returns_a_downed_path()
	{
		let store = Rc::new(RefCell::new(PathStore::new()));
		store.borrow_mut().register_beacon(&"A".to_string(), &"B".to_string(), vec!["a-br".into(), "b-br".into()]);
		let selector = ShortestSelector::new(Rc::clone(&store));
		let path = selector.select_path("A", "B").unwrap();
		selector.mark_down(&path);
		assert_eq!(selector.select_path("A", "B"), None);
	}
}
