use std::collections::HashMap;

use crate::infra::BridgeError;
use crate::state::GameState;

const FRAME_ADDRESS: u32 = 0x8047_9D60;
const MENU_ADDRESS: u32 = 0x8047_9D30;
const STAGE_ADDRESS: u32 = 0x804D_6CAC;

const STATIC_PLAYER_BLOCK: u32 = 0x8045_3080;
const PLAYER_DATA_POINTER: u32 = 0x8045_3130;
const PLAYER_BLOCK_STRIDE: u32 = 0xE90;

const CURSOR_X_ADDRESS: u32 = 0x8111_8DEC;
const CURSOR_STRIDE: u32 = 0xB80;

/// Ports whose player blocks are watched.
pub const TRACKED_PORTS: [usize; 2] = [0, 1];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerField {
    Character,
    Percent,
    Stock,
    Facing,
    X,
    Y,
    VelX,
    VelY,
    ActionState,
    ActionFrame,
    Airborne,
    ShieldSize,
    CursorX,
    CursorY,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Frame,
    Menu,
    Stage,
    Player(usize, PlayerField),
}

/// How the raw 32-bit word read from memory maps onto a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decode {
    Float,
    Int { shift: u32, mask: u32 },
}

impl Decode {
    fn int(self, raw: u32) -> u32 {
        match self {
            Decode::Float => raw,
            Decode::Int { shift, mask } => (raw >> shift) & mask,
        }
    }

    fn float(self, raw: u32) -> f32 {
        match self {
            Decode::Float => f32::from_bits(raw),
            Decode::Int { .. } => self.int(raw) as f32,
        }
    }
}

#[derive(Debug, Clone)]
struct Location {
    id: String,
    field: Field,
    decode: Decode,
}

/// Ordered set of watched memory locations and the snapshot field each one feeds.
///
/// Registration order is part of the contract: it is exported verbatim to the
/// memory watcher's `Locations.txt`.
#[derive(Debug, Clone)]
pub struct LocationRegistry {
    locations: Vec<Location>,
    index: HashMap<String, usize>,
}

impl LocationRegistry {
    pub fn new(ports: &[usize]) -> Self {
        let mut registry = Self {
            locations: Vec::new(),
            index: HashMap::new(),
        };

        registry.register(address(FRAME_ADDRESS), Field::Frame, int(0, u32::MAX));
        registry.register(address(MENU_ADDRESS), Field::Menu, int(0, 0xFF));
        registry.register(address(STAGE_ADDRESS), Field::Stage, int(16, 0xFFFF));

        for &port in ports {
            registry.register_player(port);
        }

        registry
    }

    fn register_player(&mut self, port: usize) {
        let offset = PLAYER_BLOCK_STRIDE * port as u32;
        let block = STATIC_PLAYER_BLOCK + offset;
        let pointer = PLAYER_DATA_POINTER + offset;
        let cursor = CURSOR_X_ADDRESS - CURSOR_STRIDE * port as u32;

        let player = |field| Field::Player(port, field);

        self.register(address(block + 0x04), player(PlayerField::Character), int(0, 0xFF));
        self.register(address(block + 0x60), player(PlayerField::Percent), int(16, 0xFFFF));
        self.register(address(block + 0x8E), player(PlayerField::Stock), int(24, 0xFF));

        self.register(pointed(pointer, 0x2C), player(PlayerField::Facing), Decode::Float);
        self.register(pointed(pointer, 0xB0), player(PlayerField::X), Decode::Float);
        self.register(pointed(pointer, 0xB4), player(PlayerField::Y), Decode::Float);
        self.register(pointed(pointer, 0x80), player(PlayerField::VelX), Decode::Float);
        self.register(pointed(pointer, 0x84), player(PlayerField::VelY), Decode::Float);
        self.register(pointed(pointer, 0x10), player(PlayerField::ActionState), int(0, 0xFFFF));
        self.register(pointed(pointer, 0x8F4), player(PlayerField::ActionFrame), Decode::Float);
        self.register(pointed(pointer, 0x140), player(PlayerField::Airborne), int(0, 0x1));
        self.register(pointed(pointer, 0x19F8), player(PlayerField::ShieldSize), Decode::Float);

        self.register(address(cursor), player(PlayerField::CursorX), Decode::Float);
        self.register(address(cursor + 4), player(PlayerField::CursorY), Decode::Float);
    }

    fn register(&mut self, id: String, field: Field, decode: Decode) {
        self.index.insert(id.clone(), self.locations.len());
        self.locations.push(Location { id, field, decode });
    }

    /// Location identifiers in registration order.
    pub fn locations(&self) -> impl Iterator<Item = &str> {
        self.locations.iter().map(|location| location.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Write one raw value into the snapshot field registered for `location`.
    /// Returns the field that was written.
    pub fn apply(&self, state: &mut GameState, location: &str, raw: u32) -> Result<Field, BridgeError> {
        let entry = self
            .index
            .get(location)
            .map(|&index| &self.locations[index])
            .ok_or_else(|| BridgeError::UnknownLocation {
                location: location.to_string(),
            })?;
        let decode = entry.decode;

        match entry.field {
            Field::Frame => state.frame = decode.int(raw),
            Field::Menu => state.menu = decode.int(raw) as i32,
            Field::Stage => state.stage = decode.int(raw),
            Field::Player(port, field) => {
                let Some(player) = state.player_mut(port) else {
                    return Err(BridgeError::UnknownLocation {
                        location: location.to_string(),
                    });
                };
                match field {
                    PlayerField::Character => player.character = decode.int(raw),
                    PlayerField::Percent => player.percent = decode.int(raw),
                    PlayerField::Stock => player.stock = decode.int(raw),
                    PlayerField::Facing => player.facing = decode.float(raw),
                    PlayerField::X => player.x = decode.float(raw),
                    PlayerField::Y => player.y = decode.float(raw),
                    PlayerField::VelX => player.vel_x = decode.float(raw),
                    PlayerField::VelY => player.vel_y = decode.float(raw),
                    PlayerField::ActionState => player.action_state = decode.int(raw),
                    PlayerField::ActionFrame => player.action_frame = decode.float(raw),
                    PlayerField::Airborne => player.airborne = decode.int(raw) != 0,
                    PlayerField::ShieldSize => player.shield_size = decode.float(raw),
                    PlayerField::CursorX => player.cursor_x = decode.float(raw),
                    PlayerField::CursorY => player.cursor_y = decode.float(raw),
                }
            }
        }

        Ok(entry.field)
    }

    pub fn frame_location() -> String {
        address(FRAME_ADDRESS)
    }

    pub fn menu_location() -> String {
        address(MENU_ADDRESS)
    }

    pub fn cursor_locations(port: usize) -> (String, String) {
        let cursor = CURSOR_X_ADDRESS - CURSOR_STRIDE * port as u32;
        (address(cursor), address(cursor + 4))
    }

    pub fn percent_location(port: usize) -> String {
        address(STATIC_PLAYER_BLOCK + PLAYER_BLOCK_STRIDE * port as u32 + 0x60)
    }

    pub fn stock_location(port: usize) -> String {
        address(STATIC_PLAYER_BLOCK + PLAYER_BLOCK_STRIDE * port as u32 + 0x8E)
    }
}

fn address(addr: u32) -> String {
    format!("{:08X}", addr)
}

fn pointed(pointer: u32, offset: u32) -> String {
    format!("{:08X} {:X}", pointer, offset)
}

fn int(shift: u32, mask: u32) -> Decode {
    Decode::Int { shift, mask }
}
