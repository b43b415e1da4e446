/*!

The selector capability set (spec.md SS4.6, SS9 "Polymorphic selector"):
applications depend only on [`PathSelector`], and discover the optional
feedback capability via [`PathSelector::as_feedback_sink`] — a typed
presence check, never a downcast or an exception.

Two implementations are provided: [`shortest::ShortestSelector`] (no state,
no feedback) and [`adaptive::AdaptiveSelector`] (stateful, scored, probed,
UMCC-aware).

*/

pub mod shortest;
pub mod adaptive;

use crate::packet::RouterPath;
use crate::pathstore::AsPair;

/// The contract every application depends on (spec.md SS4.6).
pub trait PathSelector
{
	fn select_path(&self, source_as: &str, destination_as: &str) -> Option<RouterPath>;

	/// Marks `path` down across every `(src,dst)` pair that contains it.
	/// Returns the affected pairs (empty if `path` is registered nowhere,
	/// spec.md SS7).
	fn mark_down(&self, path: &RouterPath) -> Vec<AsPair>;

	fn mark_up(&self, path: &RouterPath) -> Vec<AsPair>;

	/// Present only on selectors that ingest data-plane feedback
	/// (spec.md SS4.6: "an optional `updateFeedback`").
	fn as_feedback_sink(&self) -> Option<&dyn FeedbackSink>
	{
		None
	}

	/// Present only on selectors that run probing (spec.md SS4.8).
	fn as_probe_responder(&self) -> Option<&dyn ProbeResponder>
	{
		None
	}
}

/// The optional feedback-ingestion capability (spec.md SS4.6 "Feedback
/// ingestion").
pub trait FeedbackSink
{
	fn update_feedback(&self, path: &RouterPath, latency_ms: f64, is_loss: bool, size_bytes: usize);
}

/// The optional probe-response capability (spec.md SS4.8: "Returning
/// probes resolve pending entries by `probeId`").
pub trait ProbeResponder
{
	fn resolve_probe(&self, path: &RouterPath, probe_id: u64, rtt_ms: f64);
}
