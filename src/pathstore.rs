/*!

The control-plane path index (spec.md SS3, SS4.3): `(srcAs, dstAs) -> paths`
plus the unavailability map. Populated exclusively by beacon registration
(`register_beacon`); read by the selectors and by the event manager.

Reverse and transit-combined paths are materialised eagerly at registration
time, following `beaconing.py`'s `register_path`/`_create_combined_paths`.

*/

use std::collections::{HashMap, HashSet};

use crate::packet::{AsId, RouterPath};

pub type AsPair = (AsId, AsId);

#[derive(Default)]
pub struct PathStore
{
	paths: HashMap<AsPair, Vec<RouterPath>>,
	unavailable: HashMap<AsPair, HashSet<RouterPath>>,
}

impl PathStore
{
	pub fn new() -> PathStore
	{
		PathStore::default()
	}

	pub fn paths_for(&self, key: &AsPair) -> &[RouterPath]
	{
		self.paths.get(key).map(|v| v.as_slice()).unwrap_or(&[])
	}

	pub fn all_pairs(&self) -> impl Iterator<Item = &AsPair>
	{
		self.paths.keys()
	}

	fn insert_unique(&mut self, key: AsPair, path: RouterPath) -> bool
	{
		let entry = self.paths.entry(key).or_insert_with(Vec::new);
		if entry.iter().any(|p| p == &path)
		{
			false
		}
		else
		{
			entry.push(path);
			true
		}
	}

	/// Register a path discovered by a beacon reaching `receiving_as`
	/// (spec.md SS4.3). `path` is the beacon's router-level hop list with
	/// the receiving router appended. Returns whether this added anything
	/// new (used only for logging by the caller).
	pub fn register_beacon(&mut self, origin_as: &AsId, receiving_as: &AsId, path: RouterPath) -> bool
	{
		if origin_as == receiving_as
		{
			return false;
		}

		let down_key = (origin_as.clone(), receiving_as.clone());
		if !self.insert_unique(down_key, path.clone())
		{
			return false;
		}

		let reverse_path: RouterPath = path.iter().rev().cloned().collect();
		let up_key = (receiving_as.clone(), origin_as.clone());
		self.insert_unique(up_key, reverse_path.clone());

		self.create_combined_paths(origin_as, receiving_as, &path);
		true
	}

	/// Transit combination (spec.md SS4.3): for every `(x, origin)` already
	/// known with `x` not `origin`/`recv`, synthesise `x -> recv` by
	/// splicing `path` onto the existing up-segment at the core router.
	fn create_combined_paths(&mut self, origin_as: &AsId, receiving_as: &AsId, down_path: &RouterPath)
	{
		let candidates: Vec<(AsId, RouterPath)> = self.paths.iter()
			.filter(|((src, dst), _)| dst == origin_as && src != receiving_as && src != origin_as)
			.flat_map(|((src, _), paths)| paths.iter().map(move |p| (src.clone(), p.clone())))
			.collect();

		for (src_as, existing_path) in candidates
		{
			if existing_path.is_empty()
			{
				continue;
			}
			let mut combined = existing_path[..existing_path.len() - 1].to_vec();
			combined.extend(down_path.iter().cloned());
			let combined_key = (src_as, receiving_as.clone());
			self.insert_unique(combined_key, combined);
		}
	}

	/// Mark every `(src,dst)` pair whose path list contains `path` as down.
	/// Returns the affected pairs (spec.md SS4.9), empty if `path` is
	/// registered nowhere (spec.md SS7: "no-op, returns empty affected list").
	pub fn mark_down(&mut self, path: &RouterPath) -> Vec<AsPair>
	{
		let mut affected = Vec::new();
		for (key, paths) in self.paths.iter()
		{
			if paths.iter().any(|p| p == path)
			{
				self.unavailable.entry(key.clone()).or_insert_with(HashSet::new).insert(path.clone());
				affected.push(key.clone());
			}
		}
		affected
	}

	pub fn mark_up(&mut self, path: &RouterPath) -> Vec<AsPair>
	{
		let mut affected = Vec::new();
		let mut empty_keys = Vec::new();
		for (key, set) in self.unavailable.iter_mut()
		{
			if set.remove(path)
			{
				affected.push(key.clone());
				if set.is_empty()
				{
					empty_keys.push(key.clone());
				}
			}
		}
		for key in empty_keys
		{
			self.unavailable.remove(&key);
		}
		affected
	}

	pub fn is_available(&self, path: &RouterPath) -> bool
	{
		!self.unavailable.values().any(|set| set.contains(path))
	}
}

#[cfg(test)]
mod tests
{
	use super::*;

	#[test]
	fn reverse_path_is_materialised()
	{
		let mut store = PathStore::new();
		let a: AsId = "1-ff00:0:110".into();
		let b: AsId = "1-ff00:0:111".into();
		let path = vec!["1-ff00:0:110-br1".to_string(), "1-ff00:0:111-br1".to_string()];
		store.register_beacon(&a, &b, path.clone());

		let reverse: RouterPath = path.iter().rev().cloned().collect();
		assert_eq!(store.paths_for(&(b.clone(), a.clone())), &[reverse]);
		assert_eq!(store.paths_for(&(a, b)), &[path]);
	}

	#[test]
	fn transit_combination_splices_through_core()
	{
		let mut store = PathStore::new();
		let core: AsId = "1-ff00:0:110".into();
		let b: AsId = "1-ff00:0:111".into();
		let c: AsId = "1-ff00:0:112".into();

		// B -> core registered first, ending at the core's (single) border router.
		store.register_beacon(&b, &core, vec!["b-br".into(), "core-br1".into()]);
		// core -> C registered second, starting from that same border router:
		// should splice B's up-segment through, deduplicating the shared hop.
		store.register_beacon(&core, &c, vec!["core-br1".into(), "c-br".into()]);

		let combined = store.paths_for(&(b, c));
		assert_eq!(combined.len(), 1);
		assert_eq!(combined[0], vec!["b-br".to_string(), "core-br1".to_string(), "c-br".to_string()]);
	}

	#[test]
	fn mark_down_then_up_restores_availability()
	{
		let mut store = PathStore::new();
		let a: AsId = "A".into();
		let b: AsId = "B".into();
		let path = vec!["a-br".to_string(), "b-br".to_string()];
		store.register_beacon(&a, &b, path.clone());

		assert!(store.is_available(&path));
		let affected = store.mark_down(&path);
		assert!(!affected.is_empty());
		assert!(!store.is_available(&path));

		let affected = store.mark_up(&path);
		assert!(!affected.is_empty());
		assert!(store.is_available(&path));
	}

	#[test]
	fn marking_unknown_path_is_a_noop()
	{
		let mut store = PathStore::new();
		let unknown = vec!["x".to_string(), "y".to_string()];
		assert!(store.mark_down(&unknown).is_empty());
		assert!(store.mark_up(&unknown).is_empty());
	}
}
