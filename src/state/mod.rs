mod game_state;
mod locations;
mod state_manager;

pub use game_state::{GameState, Menu, PORTS, PlayerState};
pub use locations::{Field, LocationRegistry, PlayerField, TRACKED_PORTS};
pub use state_manager::{Drained, StateManager};
