//! Structural netlist access for the kairos pipeline rebalancer.
//!
//! Reads the synthesized design's JSON netlist to recover, for each pipelined
//! instance, the parameters that key it in the design sources and the mask of
//! stage-enable tie-offs the synthesizer actually saw.
//!
//! # Usage
//!
//! ```ignore
//! use kairos_netlist::{read_instance_state, Netlist};
//!
//! let netlist = Netlist::load(&flow.netlist)?;
//! let state = read_instance_state(&netlist, "mul1", "top", &config.netlist)?;
//! println!("{} id={} mask={}", state.instance, state.instance_id, state.mask);
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod netlist;
pub mod state;

pub use error::NetlistError;
pub use netlist::{Cell, Netlist, NetlistModule};
pub use state::{read_instance_state, InstanceState};
