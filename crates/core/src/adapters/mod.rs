pub mod mux;
pub mod proc;

pub use mux::{Multiplexer, MuxError, TmuxMultiplexer};
pub use proc::{ProcessProbe, SignalProbe};
