//! Decision agents.
//!
//! The set of agents is closed: [`AgentKind`] is parsed once from
//! configuration and [`Agent`] dispatches with a `match`, so an unknown
//! agent name fails at startup rather than mid-run.

pub mod action_space;
pub mod random;

use std::str::FromStr;

use crate::infra::BridgeError;
use crate::state::GameState;

pub use action_space::{ACTION_COUNT, ActionId, ControllerAction, NEUTRAL};
pub use random::RandomAgent;

pub trait DecisionAgent {
    /// Choose the next action for the current snapshot.
    fn act(&mut self, state: &GameState) -> ActionId;

    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentKind {
    Random,
    Idle,
}

impl FromStr for AgentKind {
    type Err = BridgeError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.to_ascii_lowercase().as_str() {
            "random" => Ok(AgentKind::Random),
            "idle" => Ok(AgentKind::Idle),
            other => Err(BridgeError::invalid_config(
                "agent",
                format!("unknown agent '{}' (expected random or idle)", other),
            )),
        }
    }
}

/// Holds the neutral action forever.
pub struct IdleAgent;

impl DecisionAgent for IdleAgent {
    fn act(&mut self, _state: &GameState) -> ActionId {
        NEUTRAL
    }

    fn name(&self) -> &'static str {
        "idle"
    }
}

pub enum Agent {
    Random(RandomAgent),
    Idle(IdleAgent),
}

impl Agent {
    pub fn new(kind: AgentKind, seed: Option<u64>) -> Self {
        match kind {
            AgentKind::Random => Agent::Random(RandomAgent::new(seed)),
            AgentKind::Idle => Agent::Idle(IdleAgent),
        }
    }
}

impl DecisionAgent for Agent {
    fn act(&mut self, state: &GameState) -> ActionId {
        match self {
            Agent::Random(agent) => agent.act(state),
            Agent::Idle(agent) => agent.act(state),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Agent::Random(agent) => agent.name(),
            Agent::Idle(agent) => agent.name(),
        }
    }
}
