use crate::infra::{Button, ControllerSink, PadCommand, Stick};
use crate::menu::Stage;

/// One command followed by a number of idle frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacroStep {
    pub command: PadCommand,
    pub hold_frames: u32,
}

impl MacroStep {
    pub const fn new(command: PadCommand, hold_frames: u32) -> Self {
        Self {
            command,
            hold_frames,
        }
    }
}

/// Plays a pre-authored command sequence once, one call per frame.
#[derive(Debug, Clone)]
pub struct MacroPlayer {
    steps: Vec<MacroStep>,
    index: usize,
    wait: u32,
}

impl MacroPlayer {
    pub fn new(steps: Vec<MacroStep>) -> Self {
        Self {
            steps,
            index: 0,
            wait: 0,
        }
    }

    /// Advance one frame. Returns true once the whole sequence has been played.
    pub fn play(&mut self, pad: &mut dyn ControllerSink) -> bool {
        if self.wait > 0 {
            self.wait -= 1;
            return false;
        }

        let Some(step) = self.steps.get(self.index) else {
            return true;
        };
        pad.send(step.command);
        self.wait = step.hold_frames;
        self.index += 1;
        false
    }

    pub fn reset(&mut self) {
        self.index = 0;
        self.wait = 0;
    }
}

/// Rules for endless play: open the rules screen from the settings button,
/// switch to stock mode with infinite stocks, back out, then pick `stage`.
pub fn endless_netplay(stage: Stage) -> Vec<MacroStep> {
    use PadCommand::{Press, Release, Tilt};

    let mut steps = vec![
        // Open rules
        MacroStep::new(Press(Button::A), 1),
        MacroStep::new(Release(Button::A), 10),
        // Mode: time -> stock
        MacroStep::new(Tilt(Stick::Main, 1.0, 0.5), 1),
        MacroStep::new(PadCommand::NEUTRAL_STICK, 4),
        // Stock count down to infinite
        MacroStep::new(Tilt(Stick::Main, 0.5, 0.0), 1),
        MacroStep::new(PadCommand::NEUTRAL_STICK, 4),
        MacroStep::new(Tilt(Stick::Main, 0.0, 0.5), 1),
        MacroStep::new(PadCommand::NEUTRAL_STICK, 4),
        // Back to character select
        MacroStep::new(Press(Button::B), 1),
        MacroStep::new(Release(Button::B), 10),
        // Into stage select
        MacroStep::new(Press(Button::Start), 1),
        MacroStep::new(Release(Button::Start), 30),
    ];

    let ((x, y), hold) = stage.select_path();
    steps.push(MacroStep::new(Tilt(Stick::Main, x, y), hold));
    steps.push(MacroStep::new(PadCommand::NEUTRAL_STICK, 4));
    steps.push(MacroStep::new(Press(Button::A), 1));
    steps.push(MacroStep::new(Release(Button::A), 0));
    steps
}
