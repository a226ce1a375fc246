pub mod evolution;
pub mod manager;
pub mod rate_limit;
pub mod whatsapp;

pub use manager::ChannelManager;
pub use whatsapp::WhatsAppChannel;
