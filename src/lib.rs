pub mod config;
pub mod experience;
pub mod game;
pub mod infra;
pub mod menu;
pub mod planners;
pub mod state;
pub mod stats;

// Re-export commonly used types for convenience
pub use config::RunConfig;
pub use game::ControlLoop;
pub use infra::{BridgeError, DefaultObserver, RunObserver};
pub use state::{GameState, LocationRegistry};
