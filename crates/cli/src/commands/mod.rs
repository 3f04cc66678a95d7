pub mod agent;
pub mod onboard;
