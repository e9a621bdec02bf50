// Export agent implementation
pub mod core;
pub mod executor;
pub mod tools;

pub use self::core::{Agent, AgentState};
