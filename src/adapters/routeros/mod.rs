//! RouterOS API adapter: wire protocol codec and TCP client.

mod client;
pub mod protocol;

pub use client::RouterOsClient;
