/*!
scion-path-sim
==============

A discrete-event simulator of SCION-style multi-path inter-domain routing:
beacon-driven path discovery across autonomous systems, a polymorphic
path-selection capability (a stateless shortest-path policy and a stateful
adaptive policy with feedback, active probing, and shared-bottleneck
suppression), and a scripted traffic/event scenario runner.

# Usage

This crate is both a library and the `scion-path-sim` binary. The binary
reads a topology and a traffic scenario from JSON and prints a one-line
summary of what was sent, delivered, lost, and how long it took:

```sh
scion-path-sim --topology topology.json --traffic traffic.json --algorithm adaptive
```

As a library, [`topology::Topology`] and [`simulation::Simulation`] are the
two entry points most consumers need; [`kernel::Kernel`] underlies both and
is rarely constructed directly.

# Determinism

There is no real concurrency anywhere in this crate — [`kernel::Kernel`] is a
single-threaded cooperative scheduler over a virtual millisecond clock, and
the only randomness ([`selector::adaptive::AdaptiveSelector`]'s jittered
final pick) is seeded. The same topology, traffic file, algorithm, and seed
always produce the same sequence of events.
*/

pub mod error;
pub mod kernel;
pub mod packet;
pub mod link;
pub mod node;
pub mod pathstore;
pub mod config;
pub mod topology;
pub mod beaconing;
pub mod selector;
pub mod app_registry;
pub mod application;
pub mod event_manager;
pub mod simulation;
