pub mod dispatch;
mod loop_impl;
pub mod prompt;

pub use loop_impl::{AgentConfig, AgentEvent, ChatSession, TurnError};
