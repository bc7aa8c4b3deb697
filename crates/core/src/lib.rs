//! Core library for the Muster orchestration daemon.
//!
//! Muster coordinates autonomous coding agents, each in its own git
//! worktree and terminal-multiplexer window. One daemon per host owns
//! the authoritative state file, serves a Unix-socket control protocol
//! for short-lived CLI invocations, transports asynchronous messages
//! between agents, and reaps bookkeeping for processes that exited
//! without signaling completion.
//!
//! Quick start:
//! - Resolve the state root via `config::resolve_paths()`.
//! - Build and start the daemon with `daemon::Daemon::new(paths)?.start()`.
//! - Talk to it over the socket: one `protocol::Request` per
//!   connection, newline-delimited JSON, one `protocol::Response` back.

pub mod adapters;
pub mod ci;
pub mod config;
pub mod daemon;
pub mod domain;
pub mod events;
pub mod logging;
pub mod messages;
pub mod protocol;
pub mod state;
