use crate::state::GameState;

/// Snapshot copy plus the agent's previous and current action.
#[derive(Clone, PartialEq, prost::Message)]
pub struct StateAction {
    #[prost(message, optional, tag = "1")]
    pub state: Option<GameState>,
    #[prost(uint32, tag = "2")]
    pub prev_action: u32,
    #[prost(uint32, tag = "3")]
    pub action: u32,
}

/// On-disk layout of one experience slot.
#[derive(Clone, PartialEq, prost::Message)]
pub struct ExperienceWindow {
    #[prost(message, repeated, tag = "1")]
    pub records: Vec<StateAction>,
}
