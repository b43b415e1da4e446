/*!

Unintended multi-path congestion collapse (UMCC) suppression (spec.md SS4.7),
grounded in `original_source/path_selection.py`'s `_detect_shared_bottleneck`.

When two or more candidates under consideration are congested and share an
interface that no non-congested candidate also uses, that interface is a
"shared bottleneck": all but the best congested path touching it are dropped
from this round's selection, so traffic stops piling onto the same saturated
link.

*/

use std::collections::{HashMap, HashSet};

use crate::kernel::Time;
use crate::packet::RouterPath;

use super::PathCandidate;

/// Runs congestion detection for every `considered` candidate, computes the
/// shared-bottleneck interface set, and returns the subset of `considered`
/// that survives suppression. Candidates not in `considered` are left
/// untouched.
pub fn apply(candidates: &mut HashMap<RouterPath, PathCandidate>, considered: &[RouterPath], now: Time) -> Vec<RouterPath>
{
	for path in considered
	{
		let candidate = candidates.get_mut(path).expect("considered path must have a synced candidate");
		let was_congested = candidate.is_congested;
		candidate.is_congested = candidate.detect_congestion();
		candidate.shared_bottleneck_ifaces.clear();
		if candidate.is_congested && !was_congested
		{
			candidate.congestion_start = Some(now);
		}
		else if !candidate.is_congested
		{
			candidate.congestion_start = None;
		}
	}

	let congested: Vec<&RouterPath> = considered.iter().filter(|p| candidates[*p].is_congested).collect();
	if congested.len() < 2
	{
		return considered.to_vec();
	}

	let non_congested_ifaces: HashSet<String> = considered.iter()
		.filter(|p| !candidates[*p].is_congested)
		.flat_map(|p| candidates[p].interface_ids())
		.collect();

	let mut shared: Option<HashSet<String>> = None;
	for path in congested.iter()
	{
		let ifaces = candidates[*path].interface_ids();
		shared = Some(match shared
		{
			Some(acc) => acc.intersection(&ifaces).cloned().collect(),
			None => ifaces,
		});
	}
	let mut shared = shared.unwrap_or_default();
	for iface in non_congested_ifaces
	{
		shared.remove(&iface);
	}

	if shared.is_empty()
	{
		return considered.to_vec();
	}

	for path in congested.iter()
	{
		candidates.get_mut(*path).expect("congested path exists").shared_bottleneck_ifaces = shared.clone();
	}

	let touching_bottleneck: Vec<&RouterPath> = congested.iter().filter(|p| candidates[**p].interface_ids().iter().any(|i| shared.contains(i))).cloned().collect();

	let best = touching_bottleneck.iter().min_by(|a, b|
	{
		let ca = &candidates[**a];
		let cb = &candidates[**b];
		ca.avg_latency.partial_cmp(&cb.avg_latency).unwrap_or(std::cmp::Ordering::Equal)
			.then_with(|| ca.loss_rate().partial_cmp(&cb.loss_rate()).unwrap_or(std::cmp::Ordering::Equal))
	}).cloned();

	let suppressed: HashSet<&RouterPath> = touching_bottleneck.iter().filter(|p| Some(**p) != best).cloned().collect();

	considered.iter().filter(|p| !suppressed.contains(p)).cloned().collect()
}
