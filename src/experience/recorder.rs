use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use prost::Message;
use time::OffsetDateTime;

use crate::experience::{ExperienceWindow, RewardFn, StateAction, mean};
use crate::infra::BridgeError;
use crate::planners::ActionId;
use crate::state::GameState;

/// Slot name for the very first flush of a run.
pub const DEAD_SLOT: &str = ".dead";

#[derive(Debug, Clone)]
pub struct RecorderConfig {
    pub dump_dir: PathBuf,
    pub reward_log: PathBuf,
    pub tag: Option<String>,
    /// Records per window
    pub dump_size: usize,
    /// Number of rotating slots
    pub dump_max: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlushReport {
    pub path: PathBuf,
    /// Flushes completed so far, this one included
    pub dump_count: u64,
    pub records: usize,
    pub timestamp: f64,
    pub mean_reward: f32,
}

/// Fixed-size circular window of state/action records.
///
/// Every time the cursor wraps, the full window is written to a rotating slot
/// and its mean reward appended to the reward log.
pub struct ExperienceRecorder {
    config: RecorderConfig,
    window: Vec<StateAction>,
    cursor: usize,
    dump_count: u64,
    last_timestamp: f64,
    reward: Box<dyn RewardFn>,
}

impl ExperienceRecorder {
    pub fn new(config: RecorderConfig, reward: Box<dyn RewardFn>) -> Result<Self, BridgeError> {
        if config.dump_size == 0 {
            return Err(BridgeError::invalid_config("dump_size", "must be at least 1"));
        }
        if config.dump_max == 0 {
            return Err(BridgeError::invalid_config("dump_max", "must be at least 1"));
        }

        fs::create_dir_all(&config.dump_dir)
            .map_err(|e| BridgeError::persistence(&config.dump_dir, e))?;
        if let Some(parent) = config.reward_log.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| BridgeError::persistence(parent, e))?;
        }

        Ok(Self {
            window: vec![StateAction::default(); config.dump_size],
            config,
            cursor: 0,
            dump_count: 0,
            last_timestamp: 0.0,
            reward,
        })
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn dump_count(&self) -> u64 {
        self.dump_count
    }

    pub fn dump_size(&self) -> usize {
        self.config.dump_size
    }

    pub fn window(&self) -> &[StateAction] {
        &self.window
    }

    /// Store a copy of `state` at the cursor. Flushes when the cursor wraps.
    pub fn capture(
        &mut self,
        state: &GameState,
        prev_action: ActionId,
        action: ActionId,
    ) -> Result<Option<FlushReport>, BridgeError> {
        self.window[self.cursor] = StateAction {
            state: Some(state.clone()),
            prev_action,
            action,
        };

        self.cursor += 1;
        if self.cursor < self.config.dump_size {
            return Ok(None);
        }

        self.cursor = 0;
        self.flush().map(Some)
    }

    /// Path of the slot the next flush writes to.
    pub fn slot_path(&self) -> PathBuf {
        let name = if self.dump_count == 0 {
            DEAD_SLOT.to_string()
        } else {
            let slot = self.dump_count % self.config.dump_max as u64;
            match &self.config.tag {
                Some(tag) => format!("{}-{}", tag, slot),
                None => slot.to_string(),
            }
        };
        self.config.dump_dir.join(name)
    }

    /// Persist the whole window, then log its mean reward.
    pub fn flush(&mut self) -> Result<FlushReport, BridgeError> {
        let path = self.slot_path();
        tracing::debug!("Dumping to {}", path.display());

        let encoded = ExperienceWindow {
            records: self.window.clone(),
        }
        .encode_to_vec();
        write_whole(&path, &encoded)?;
        self.dump_count += 1;

        let rewards = self.reward.rewards(&self.window);
        let mean_reward = mean(&rewards);
        let timestamp = self.next_timestamp();
        self.append_reward(timestamp, mean_reward)?;

        Ok(FlushReport {
            path,
            dump_count: self.dump_count,
            records: self.window.len(),
            timestamp,
            mean_reward,
        })
    }

    /// Seconds since the epoch, never earlier than the previous line's.
    fn next_timestamp(&mut self) -> f64 {
        let now = OffsetDateTime::now_utc().unix_timestamp_nanos() as f64 / 1e9;
        self.last_timestamp = now.max(self.last_timestamp);
        self.last_timestamp
    }

    fn append_reward(&self, timestamp: f64, mean_reward: f32) -> Result<(), BridgeError> {
        let path = &self.config.reward_log;
        let line = format!("{} {}\n", timestamp, mean_reward);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| BridgeError::persistence(path, e))?;
        file.write_all(line.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| BridgeError::persistence(path, e))
    }
}

/// Write through a temp file and rename, so readers never see half a window.
fn write_whole(path: &Path, bytes: &[u8]) -> Result<(), BridgeError> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!("tmp-{}", file_name));

    fs::write(&tmp, bytes).map_err(|e| BridgeError::persistence(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| BridgeError::persistence(path, e))
}
