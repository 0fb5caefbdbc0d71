use std::str::FromStr;

use crate::infra::BridgeError;

/// Character-select cursor position of the rules/settings button.
pub const SETTINGS_TARGET: (f32, f32) = (0.0, 24.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Character {
    Fox,
    Falco,
    Falcon,
    Roy,
    Marth,
    Zelda,
    Mewtwo,
    Peach,
    Luigi,
    Puff,
    Pikachu,
    Doc,
}

impl Character {
    /// Where the character-select cursor has to be to pick this character.
    pub fn cursor_target(self) -> (f32, f32) {
        match self {
            Character::Fox => (-23.5, 11.5),
            Character::Falco => (-30.0, 11.0),
            Character::Falcon => (18.0, 18.0),
            Character::Roy => (18.0, 5.0),
            Character::Marth => (11.0, 5.0),
            Character::Zelda => (11.0, 11.0),
            Character::Mewtwo => (-2.0, 5.0),
            Character::Peach => (-2.0, 18.0),
            Character::Luigi => (-16.0, 18.0),
            Character::Puff => (-9.0, 5.0),
            Character::Pikachu => (-9.0, 11.0),
            Character::Doc => (-30.0, 18.0),
        }
    }
}

impl FromStr for Character {
    type Err = BridgeError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let character = match name.to_ascii_lowercase().as_str() {
            "fox" => Character::Fox,
            "falco" => Character::Falco,
            "falcon" | "captain_falcon" => Character::Falcon,
            "roy" => Character::Roy,
            "marth" => Character::Marth,
            "zelda" => Character::Zelda,
            "mewtwo" => Character::Mewtwo,
            "peach" => Character::Peach,
            "luigi" => Character::Luigi,
            "puff" | "jigglypuff" => Character::Puff,
            "pikachu" => Character::Pikachu,
            "doc" | "dr_mario" => Character::Doc,
            other => {
                return Err(BridgeError::invalid_config(
                    "character",
                    format!("unknown character '{}'", other),
                ));
            }
        };
        Ok(character)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Battlefield,
    FinalDestination,
    Dreamland,
    YoshisStory,
    FountainOfDreams,
    PokemonStadium,
}

impl Stage {
    /// Main-stick tilt and how many frames to hold it to reach the stage icon
    /// from the stage-select cursor's starting point.
    pub fn select_path(self) -> ((f32, f32), u32) {
        match self {
            Stage::Battlefield => ((0.5, 1.0), 20),
            Stage::FinalDestination => ((1.0, 1.0), 24),
            Stage::Dreamland => ((0.0, 1.0), 24),
            Stage::YoshisStory => ((0.0, 1.0), 12),
            Stage::FountainOfDreams => ((1.0, 1.0), 12),
            Stage::PokemonStadium => ((0.5, 1.0), 8),
        }
    }
}

impl FromStr for Stage {
    type Err = BridgeError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let stage = match name.to_ascii_lowercase().as_str() {
            "battlefield" => Stage::Battlefield,
            "final_destination" | "fd" => Stage::FinalDestination,
            "dreamland" => Stage::Dreamland,
            "yoshis_story" | "yoshis" => Stage::YoshisStory,
            "fountain_of_dreams" | "fod" => Stage::FountainOfDreams,
            "pokemon_stadium" | "stadium" => Stage::PokemonStadium,
            other => {
                return Err(BridgeError::invalid_config(
                    "stage",
                    format!("unknown stage '{}'", other),
                ));
            }
        };
        Ok(stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_resolve() {
        assert_eq!("Marth".parse::<Character>().unwrap(), Character::Marth);
        assert_eq!("jigglypuff".parse::<Character>().unwrap(), Character::Puff);
        assert_eq!("fd".parse::<Stage>().unwrap(), Stage::FinalDestination);
        assert!("waluigi".parse::<Character>().is_err());
        // Sheik has no select-screen slot
        assert!("sheik".parse::<Character>().is_err());
        assert!("hyrule".parse::<Stage>().is_err());
    }
}
