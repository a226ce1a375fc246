pub mod config;
pub mod error;
pub mod message;
pub mod paths;
pub mod types;

pub use config::{Config, ResponderMode};
pub use error::{Error, Result};
pub use message::{InboundMessage, OutboundMessage};
pub use paths::Paths;
