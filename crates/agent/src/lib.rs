pub mod bus;
pub mod prompt;
pub mod responder;
pub mod runtime;

pub use bus::MessageBus;
pub use responder::{CommandResponder, APOLOGY};
pub use runtime::AgentRuntime;
