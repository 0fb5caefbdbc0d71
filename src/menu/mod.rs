mod characters;
mod movie;
mod navigator;

pub use characters::{Character, SETTINGS_TARGET, Stage};
pub use movie::{MacroPlayer, MacroStep, endless_netplay};
pub use navigator::{CursorNavigator, MenuNavigator};
