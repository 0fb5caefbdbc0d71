use crate::infra::{Button, PadCommand, Stick};
use crate::state::GameState;

/// Cursor distance at which the target counts as under the cursor.
const REACH_RADIUS: f32 = 1.0;
/// Inside this distance the stick tilt shrinks so the cursor does not overshoot.
const SLOW_RADIUS: f32 = 4.0;

/// Capability interface for per-game menu logic.
pub trait MenuNavigator {
    /// Commands for this poll. Returns nothing once the target is reached.
    fn advance(&mut self, state: &GameState) -> Vec<PadCommand>;

    fn reached(&self) -> bool;

    /// Re-arm for a new run.
    fn reset(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Seeking,
    Confirming,
    Reached,
}

/// Steers one port's character-select cursor onto a fixed target and confirms with A.
#[derive(Debug, Clone)]
pub struct CursorNavigator {
    port: usize,
    target: (f32, f32),
    phase: Phase,
}

impl CursorNavigator {
    pub fn new(port: usize, target: (f32, f32)) -> Self {
        Self {
            port,
            target,
            phase: Phase::Seeking,
        }
    }
}

impl MenuNavigator for CursorNavigator {
    fn advance(&mut self, state: &GameState) -> Vec<PadCommand> {
        match self.phase {
            Phase::Reached => Vec::new(),
            Phase::Confirming => {
                self.phase = Phase::Reached;
                vec![PadCommand::Release(Button::A)]
            }
            Phase::Seeking => {
                let Some(player) = state.player(self.port) else {
                    return Vec::new();
                };

                let dx = self.target.0 - player.cursor_x;
                let dy = self.target.1 - player.cursor_y;
                let distance = dx.hypot(dy);

                if !distance.is_finite() {
                    // Cursor memory not populated yet
                    return Vec::new();
                }

                if distance <= REACH_RADIUS {
                    self.phase = Phase::Confirming;
                    return vec![PadCommand::NEUTRAL_STICK, PadCommand::Press(Button::A)];
                }

                let speed = (distance / SLOW_RADIUS).min(1.0);
                let x = 0.5 + 0.5 * speed * dx / distance;
                let y = 0.5 + 0.5 * speed * dy / distance;
                vec![PadCommand::Tilt(Stick::Main, x, y)]
            }
        }
    }

    fn reached(&self) -> bool {
        self.phase == Phase::Reached
    }

    fn reset(&mut self) {
        self.phase = Phase::Seeking;
    }
}
