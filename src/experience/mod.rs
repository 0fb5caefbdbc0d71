mod record;
mod recorder;
mod reward;

pub use record::{ExperienceWindow, StateAction};
pub use recorder::{DEAD_SLOT, ExperienceRecorder, FlushReport, RecorderConfig};
pub use reward::{DamageReward, RewardFn, mean};
