/// Number of controller ports the game exposes.
pub const PORTS: usize = 4;

/// Screen the game is currently showing, as read from the menu location.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum Menu {
    Characters = 0,
    Stages = 1,
    Game = 2,
    PostGame = 4,
}

impl Menu {
    pub fn is_pre_match(self) -> bool {
        matches!(self, Menu::Characters | Menu::Stages)
    }
}

/// Tracked scalars for one port.
#[derive(Clone, PartialEq, prost::Message)]
pub struct PlayerState {
    #[prost(uint32, tag = "1")]
    pub character: u32,
    #[prost(uint32, tag = "2")]
    pub percent: u32,
    #[prost(uint32, tag = "3")]
    pub stock: u32,
    #[prost(float, tag = "4")]
    pub facing: f32,
    #[prost(float, tag = "5")]
    pub x: f32,
    #[prost(float, tag = "6")]
    pub y: f32,
    #[prost(float, tag = "7")]
    pub vel_x: f32,
    #[prost(float, tag = "8")]
    pub vel_y: f32,
    #[prost(uint32, tag = "9")]
    pub action_state: u32,
    #[prost(float, tag = "10")]
    pub action_frame: f32,
    #[prost(bool, tag = "11")]
    pub airborne: bool,
    #[prost(float, tag = "12")]
    pub shield_size: f32,
    /// Character-select cursor, only meaningful on the menu screens
    #[prost(float, tag = "13")]
    pub cursor_x: f32,
    #[prost(float, tag = "14")]
    pub cursor_y: f32,
}

/// Reconstruction of the emulated game's memory, rebuilt delta by delta.
#[derive(Clone, PartialEq, prost::Message)]
pub struct GameState {
    #[prost(uint32, tag = "1")]
    pub frame: u32,
    #[prost(enumeration = "Menu", tag = "2")]
    pub menu: i32,
    #[prost(uint32, tag = "3")]
    pub stage: u32,
    #[prost(message, repeated, tag = "4")]
    pub players: Vec<PlayerState>,
}

impl GameState {
    pub fn new() -> Self {
        Self {
            players: vec![PlayerState::default(); PORTS],
            ..Default::default()
        }
    }

    pub fn player(&self, port: usize) -> Option<&PlayerState> {
        self.players.get(port)
    }

    pub fn player_mut(&mut self, port: usize) -> Option<&mut PlayerState> {
        self.players.get_mut(port)
    }
}
