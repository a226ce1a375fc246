pub mod agent;
pub mod channels;
pub mod config_cmd;
pub mod onboard;
pub mod sales_cmd;
pub mod serve;
pub mod status;
