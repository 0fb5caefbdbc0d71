use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::planners::{ACTION_COUNT, ActionId, DecisionAgent};
use crate::state::GameState;

/// Uniformly random controller actions; a baseline and a stand-in for a learned policy.
pub struct RandomAgent {
    rng: StdRng,
}

impl RandomAgent {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self { rng }
    }
}

impl DecisionAgent for RandomAgent {
    fn act(&mut self, _state: &GameState) -> ActionId {
        self.rng.random_range(0..ACTION_COUNT)
    }

    fn name(&self) -> &'static str {
        "random"
    }
}
