//! Card Echo Bot, a Bot Framework webhook that echoes text and serves an
//! Adaptive Card.

pub mod activity;
pub mod adapter;
pub mod bot;
pub mod cards;
pub mod channels;
pub mod config;
pub mod error;
pub mod server;
