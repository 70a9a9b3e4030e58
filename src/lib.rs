//! Two-player networked bomb duel: a TCP relay server that pairs clients into
//! sessions, and a terminal client that keeps both boards in lock-step.

pub mod client;
pub mod config;
pub mod game;
pub mod logging;
pub mod network;
pub mod server;
pub mod timing;
pub mod ui;
