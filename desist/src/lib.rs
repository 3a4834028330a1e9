//! DeSIST: game-theoretic secure tree routing for low-power networks.
//!
//! This crate is the protocol and decision core. It contains no event loop,
//! no clock and no I/O: a [`Node`] is driven entirely through explicit
//! callbacks (`handle_timer`, `handle_delivery`, `generate_data`) that take
//! the current virtual time as an argument, and it communicates back by
//! queueing [`Transmission`]s for the harness to route. The `desistsim`
//! crate provides the discrete-event harness.
//!
//! Three decision modules share a per-neighbor learned archive ([`LiaTable`]):
//!
//! - the packet-forwarding game picks a next hop by expected utility,
//! - the parent-selection game scores rank advertisements against the
//!   incumbent parent,
//! - the intrusion-reporting game decides when accumulated defections are
//!   worth a report toward the sink.
//!
//! Every action costs energy; a node whose balance crosses zero becomes
//! permanently inert.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod energy;
pub mod games;
pub mod lia;
pub mod node;
pub mod stats;
pub mod time;
pub mod types;

pub use config::{ConfigError, EnergyCosts, IrgParams, PfgPayoffs, PsgWeights, SimConfig};
pub use energy::{ActionKind, Charge, EnergyMeter};
pub use games::{ForwardAction, ParentCandidate};
pub use lia::{LiaEntry, LiaTable};
pub use node::{DataDisposition, Node, Transmission};
pub use stats::{NullStats, StatsSink};
pub use time::{Duration, Timestamp};
pub use types::{
    Advertisement, Destination, DropCause, NodeId, NodeRole, Outcome, Packet, PacketId,
    PacketKind, Rank, SINK_ID,
};
