// Inner modules
mod poller;
mod register;

// Exports
pub use poller::{BrokerOffsetsPoller, PollSummary};
pub use register::BrokerOffsetsRegister;
