//! SMS delivery adapters.

mod http_sender;
mod mock_sender;

pub use http_sender::HttpSmsSender;
pub use mock_sender::{MockSmsSender, SentMessage};
