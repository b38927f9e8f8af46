//! Discord source for the relay: watches a set of guild channels and feeds
//! their messages into the relay's inbound queue.
//!
//! Members with Manage Channels edit the watch list with `/add` and
//! `/remove`; changes are written back to the config file.

pub mod bot;
pub mod commands;
pub mod error;
pub mod handler;
pub mod history;
pub mod normalize;
pub mod watchlist;

pub use {
    bot::run_bot,
    error::{Error, Result},
    handler::RelayHandler,
    watchlist::WatchList,
};
