mod default_observer;
mod error;
mod game_observer;
mod memory_watcher;
mod pad;
mod run_token;

pub use default_observer::DefaultObserver;
pub use error::BridgeError;
pub use game_observer::RunObserver;
pub use memory_watcher::{
    ChannelTransport, Delta, DeltaTransport, SocketTransport, parse_datagram, write_locations,
};
#[cfg(test)]
pub use pad::RecordingPad;
pub use pad::{Button, ControllerSink, PadCommand, PipePad, Stick, Trigger};
pub use run_token::{RunHandle, RunToken, run_token};
