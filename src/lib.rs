//! Multi-agent terminal multiplexer: PTY-backed panes arranged in a
//! binary split tree, driven by a vim-modal input router, with an
//! inter-agent FIPA message bus and session persistence layered on top.

pub mod agent;
pub mod bus;
pub mod compositor;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod ex;
pub mod input;
pub mod layout;
pub mod overlay;
pub mod registers;
pub mod session;
pub mod terminal_host;
pub mod workspace;
