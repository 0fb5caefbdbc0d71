use std::env;
use std::fmt::Display;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::experience::RecorderConfig;
use crate::infra::BridgeError;
use crate::menu::{Character, Stage};
use crate::planners::AgentKind;
use crate::stats::FRAMES_PER_SECOND;

/// Seconds between periodic statistics reports, in match time.
const STATS_PERIOD_SECS: u32 = 15;

/// Settings for one run, read once at startup and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Run directory holding `experience/` and `rewards.log`
    pub path: PathBuf,
    pub tag: Option<String>,
    /// Record experience windows
    pub dump: bool,
    pub dump_max: usize,
    pub dolphin_dir: PathBuf,
    /// Drive both ports instead of only port 1
    pub self_play: bool,
    pub agent: AgentKind,
    pub act_every: u32,
    /// Seconds of match time per experience window
    pub experience_time: u32,
    pub p1: Character,
    pub p2: Character,
    pub stage: Stage,
    /// Emulator binary to launch and own for the lifetime of the run
    pub dolphin_exe: Option<PathBuf>,
    pub seed: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("."),
            tag: None,
            dump: true,
            dump_max: 10,
            dolphin_dir: expand_home("~/.local/share/dolphin-emu/", env::var("HOME").ok()),
            self_play: false,
            agent: AgentKind::Random,
            act_every: 5,
            experience_time: 60,
            p1: Character::Marth,
            p2: Character::Zelda,
            stage: Stage::Battlefield,
            dolphin_exe: None,
            seed: None,
        }
    }
}

impl RunConfig {
    /// Read `SMASHBOT_*` variables on top of the defaults.
    pub fn from_env() -> Result<Self, BridgeError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, BridgeError> {
        let defaults = Self::default();
        let home = lookup("HOME").or_else(|| env::var("HOME").ok());

        let dolphin_dir = match lookup("SMASHBOT_DOLPHIN_DIR") {
            Some(dir) => expand_home(&dir, home.clone()),
            None => defaults.dolphin_dir,
        };

        Ok(Self {
            path: lookup("SMASHBOT_PATH")
                .map(|path| expand_home(&path, home.clone()))
                .unwrap_or(defaults.path),
            tag: lookup("SMASHBOT_TAG").filter(|tag| !tag.is_empty()),
            dump: parse_flag(&lookup, "SMASHBOT_DUMP", "dump")?.unwrap_or(defaults.dump),
            dump_max: parse_var(&lookup, "SMASHBOT_DUMP_MAX", "dump_max")?
                .unwrap_or(defaults.dump_max),
            dolphin_dir,
            self_play: parse_flag(&lookup, "SMASHBOT_SELF_PLAY", "self_play")?
                .unwrap_or(defaults.self_play),
            agent: parse_var(&lookup, "SMASHBOT_AGENT", "agent")?.unwrap_or(defaults.agent),
            act_every: parse_var(&lookup, "SMASHBOT_ACT_EVERY", "act_every")?
                .unwrap_or(defaults.act_every),
            experience_time: parse_var(&lookup, "SMASHBOT_EXPERIENCE_TIME", "experience_time")?
                .unwrap_or(defaults.experience_time),
            p1: parse_var(&lookup, "SMASHBOT_P1", "p1")?.unwrap_or(defaults.p1),
            p2: parse_var(&lookup, "SMASHBOT_P2", "p2")?.unwrap_or(defaults.p2),
            stage: parse_var(&lookup, "SMASHBOT_STAGE", "stage")?.unwrap_or(defaults.stage),
            dolphin_exe: lookup("SMASHBOT_DOLPHIN_EXE")
                .filter(|exe| !exe.is_empty())
                .map(|exe| expand_home(&exe, home.clone())),
            seed: parse_var(&lookup, "SMASHBOT_SEED", "seed")?,
        })
    }

    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.act_every == 0 {
            return Err(BridgeError::invalid_config("act_every", "must be at least 1"));
        }
        if self.dump_max == 0 {
            return Err(BridgeError::invalid_config("dump_max", "must be at least 1"));
        }
        if self.dump && self.experience_time.checked_mul(self.fps()).is_none() {
            return Err(BridgeError::invalid_config(
                "experience_time",
                format!(
                    "{}s at {} decisions per second overflows the window size",
                    self.experience_time,
                    self.fps()
                ),
            ));
        }
        if self.dump && self.dump_size() < 2 {
            return Err(BridgeError::invalid_config(
                "experience_time",
                format!(
                    "{}s at {} decisions per second gives {} record(s), need at least 2",
                    self.experience_time,
                    self.fps(),
                    self.dump_size()
                ),
            ));
        }
        if self.ports().is_empty() {
            return Err(BridgeError::invalid_config("self_play", "no participants"));
        }
        Ok(())
    }

    /// Decisions per second of match time.
    pub fn fps(&self) -> u32 {
        FRAMES_PER_SECOND.checked_div(self.act_every).unwrap_or(0)
    }

    /// Records per experience window.
    pub fn dump_size(&self) -> usize {
        self.experience_time
            .checked_mul(self.fps())
            .map_or(0, |records| records as usize)
    }

    /// Match frames between periodic statistics reports.
    pub fn stats_every(&self) -> u64 {
        u64::from(STATS_PERIOD_SECS * self.fps()).max(1)
    }

    /// Controller ports driven by an agent. The last one is the recorded one.
    pub fn ports(&self) -> Vec<usize> {
        if self.self_play { vec![0, 1] } else { vec![1] }
    }

    /// Character for each entry of [`RunConfig::ports`].
    pub fn characters(&self) -> Vec<Character> {
        if self.self_play {
            vec![self.p1, self.p2]
        } else {
            vec![self.p2]
        }
    }

    /// Explicit seed, else one derived from the run tag, else none.
    pub fn agent_seed(&self) -> Option<u64> {
        self.seed.or_else(|| {
            self.tag.as_ref().map(|tag| {
                let mut hasher = DefaultHasher::new();
                tag.hash(&mut hasher);
                hasher.finish()
            })
        })
    }

    pub fn dump_dir(&self) -> PathBuf {
        self.path.join("experience")
    }

    pub fn reward_log(&self) -> PathBuf {
        self.path.join("rewards.log")
    }

    pub fn memory_watcher_socket(&self) -> PathBuf {
        self.dolphin_dir.join("MemoryWatcher").join("MemoryWatcher")
    }

    pub fn pipes_dir(&self) -> PathBuf {
        self.dolphin_dir.join("Pipes")
    }

    pub fn recorder_config(&self) -> Option<RecorderConfig> {
        self.dump.then(|| RecorderConfig {
            dump_dir: self.dump_dir(),
            reward_log: self.reward_log(),
            tag: self.tag.clone(),
            dump_size: self.dump_size(),
            dump_max: self.dump_max,
        })
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    field: &'static str,
) -> Result<Option<T>, BridgeError>
where
    T: FromStr,
    T::Err: Display,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<T>()
        .map(Some)
        .map_err(|e| BridgeError::invalid_config(field, format!("{}={:?}: {}", key, raw, e)))
}

fn parse_flag(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    field: &'static str,
) -> Result<Option<bool>, BridgeError> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "" => Ok(None),
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        other => Err(BridgeError::invalid_config(
            field,
            format!("{}={:?} is not a boolean", key, other),
        )),
    }
}

fn expand_home(path: &str, home: Option<String>) -> PathBuf {
    match (path.strip_prefix('~'), home) {
        (Some(rest), Some(home)) => Path::new(&home).join(rest.trim_start_matches('/')),
        _ => PathBuf::from(path),
    }
}
