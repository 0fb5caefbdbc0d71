use crate::infra::{Button, PadCommand, Stick};

/// Index into the fixed controller action table.
pub type ActionId = u32;

/// Stick in the middle, no button held.
pub const NEUTRAL: ActionId = 0;

const STICKS: [(f32, f32); 9] = [
    (0.5, 0.5),
    (0.5, 1.0),
    (0.5, 0.0),
    (0.0, 0.5),
    (1.0, 0.5),
    (0.0, 1.0),
    (1.0, 1.0),
    (0.0, 0.0),
    (1.0, 0.0),
];

const BUTTONS: [Option<Button>; 5] = [
    None,
    Some(Button::A),
    Some(Button::B),
    Some(Button::Y),
    Some(Button::L),
];

pub const ACTION_COUNT: ActionId = (STICKS.len() * BUTTONS.len()) as ActionId;

/// One discrete controller configuration: a main-stick position plus at most one held button.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerAction {
    pub button: Option<Button>,
    pub stick: (f32, f32),
}

impl ControllerAction {
    /// Out-of-range ids fall back to neutral.
    pub fn from_id(id: ActionId) -> Self {
        let id = if id < ACTION_COUNT { id as usize } else { NEUTRAL as usize };
        Self {
            button: BUTTONS[id % BUTTONS.len()],
            stick: STICKS[id / BUTTONS.len()],
        }
    }

    /// Commands that move the pad from `previous` to this action.
    pub fn commands(&self, previous: &ControllerAction) -> Vec<PadCommand> {
        let mut commands = Vec::with_capacity(3);

        if previous.button != self.button {
            if let Some(button) = previous.button {
                commands.push(PadCommand::Release(button));
            }
            if let Some(button) = self.button {
                commands.push(PadCommand::Press(button));
            }
        }

        let (x, y) = self.stick;
        commands.push(PadCommand::Tilt(Stick::Main, x, y));
        commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neutral_action() {
        let action = ControllerAction::from_id(NEUTRAL);
        assert_eq!(action.button, None);
        assert_eq!(action.stick, (0.5, 0.5));
        assert_eq!(ControllerAction::from_id(ACTION_COUNT + 3), action);
    }

    #[test]
    fn test_every_id_is_distinct() {
        let actions: Vec<ControllerAction> = (0..ACTION_COUNT).map(ControllerAction::from_id).collect();
        for (i, a) in actions.iter().enumerate() {
            for b in &actions[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_button_change_releases_previous() {
        let previous = ControllerAction {
            button: Some(Button::A),
            stick: (0.5, 0.5),
        };
        let next = ControllerAction {
            button: Some(Button::B),
            stick: (1.0, 0.5),
        };

        assert_eq!(
            next.commands(&previous),
            vec![
                PadCommand::Release(Button::A),
                PadCommand::Press(Button::B),
                PadCommand::Tilt(Stick::Main, 1.0, 0.5),
            ]
        );
        // Holding the same button only moves the stick
        assert_eq!(next.commands(&next), vec![PadCommand::Tilt(Stick::Main, 1.0, 0.5)]);
    }
}
