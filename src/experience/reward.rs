use crate::experience::StateAction;
use crate::state::PlayerState;

/// Computes one reward per record after the first, from the whole window.
pub trait RewardFn {
    fn rewards(&self, window: &[StateAction]) -> Vec<f32>;
}

/// Damage dealt minus damage taken, plus stocks taken minus stocks lost.
#[derive(Debug, Clone)]
pub struct DamageReward {
    pub port: usize,
    pub opponent: usize,
    /// Weight of one percent of damage relative to one stock
    pub damage_scale: f32,
}

impl DamageReward {
    pub fn new(port: usize, opponent: usize) -> Self {
        Self {
            port,
            opponent,
            damage_scale: 0.01,
        }
    }

    fn players(record: &StateAction, port: usize) -> Option<&PlayerState> {
        record.state.as_ref().and_then(|state| state.player(port))
    }

    fn step(&self, before: &StateAction, after: &StateAction) -> f32 {
        let (Some(own_before), Some(own_after), Some(opp_before), Some(opp_after)) = (
            Self::players(before, self.port),
            Self::players(after, self.port),
            Self::players(before, self.opponent),
            Self::players(after, self.opponent),
        ) else {
            return 0.0;
        };

        // Percent resets to zero on a lost stock, so only count increases
        let gain = |before: &PlayerState, after: &PlayerState| {
            after.percent.saturating_sub(before.percent) as f32
        };
        let lost = |before: &PlayerState, after: &PlayerState| {
            before.stock.saturating_sub(after.stock) as f32
        };

        let damage = gain(opp_before, opp_after) - gain(own_before, own_after);
        let stocks = lost(opp_before, opp_after) - lost(own_before, own_after);
        self.damage_scale * damage + stocks
    }
}

impl RewardFn for DamageReward {
    fn rewards(&self, window: &[StateAction]) -> Vec<f32> {
        window
            .windows(2)
            .map(|pair| self.step(&pair[0], &pair[1]))
            .collect()
    }
}

pub fn mean(rewards: &[f32]) -> f32 {
    if rewards.is_empty() {
        0.0
    } else {
        rewards.iter().sum::<f32>() / rewards.len() as f32
    }
}
