pub const NUM_CABINET_LIGHTS: usize = 8;
pub const NUM_GAME_CONTROLLERS: usize = 2;
pub const NUM_GAME_BUTTONS: usize = 4;

/// Cabinet lamps addressable through the output word.
#[derive(Clone, Copy, PartialEq, Eq, Debug, strum::Display, strum::EnumIter)]
pub enum CabinetLight {
    MarqueeUpLeft,
    MarqueeUpRight,
    MarqueeLowerLeft,
    MarqueeLowerRight,
    ButtonsLeft,
    ButtonsRight,
    BassLeft,
    BassRight,
}

/// Dance-pad panels, per controller.
#[derive(Clone, Copy, PartialEq, Eq, Debug, strum::Display, strum::EnumIter)]
pub enum GameButton {
    Left,
    Right,
    Up,
    Down,
}

/// Snapshot of every lamp the cabinet can drive, plus the coin counter.
#[derive(Clone, Copy, Default, Debug)]
pub struct LightsState {
    pub cabinet: [bool; NUM_CABINET_LIGHTS],
    pub game: [[bool; NUM_GAME_BUTTONS]; NUM_GAME_CONTROLLERS],
    pub coin_counter: bool,
}

impl LightsState {
    pub fn set_cabinet(&mut self, light: CabinetLight, on: bool) {
        self.cabinet[light as usize] = on;
    }

    pub fn set_game(&mut self, controller: usize, button: GameButton, on: bool) {
        self.game[controller][button as usize] = on;
    }
}

/// Output-word bit assignments for each lamp.
#[derive(Clone, Copy, Debug)]
pub struct LightsMappings {
    pub cabinet: [u32; NUM_CABINET_LIGHTS],
    pub game: [[u32; NUM_GAME_BUTTONS]; NUM_GAME_CONTROLLERS],
    pub coin_counter_on: u32,
    pub coin_counter_off: u32,
}

impl Default for LightsMappings {
    fn default() -> Self {
        Self {
            cabinet: [
                // UL, UR, LL, LR marquee lights
                1 << 23,
                1 << 26,
                1 << 25,
                1 << 24,
                // selection buttons (not wired), bass neons
                0,
                0,
                1 << 10,
                1 << 10,
            ],
            game: [
                // Left, Right, Up, Down
                [1 << 20, 1 << 21, 1 << 18, 1 << 19], // player 1
                [1 << 4, 1 << 5, 1 << 2, 1 << 3],     // player 2
            ],
            coin_counter_on: 1 << 28,
            coin_counter_off: 1 << 27,
        }
    }
}

// bits 0, 1, 16 and 17 of the output word select the sensor set; lights
// data must never drive them
pub(crate) const PHASE_CLEAR: u32 = 0xFFFC_FFFC;

/// Folds a lights snapshot through the mappings into an output word. The
/// sensor-select bits always come back clear; the scan loop owns those.
pub fn compose_lights(state: &LightsState, mappings: &LightsMappings) -> u32 {
    let mut data = 0u32;

    for (on, bits) in state.cabinet.iter().zip(mappings.cabinet) {
        if *on {
            data |= bits;
        }
    }

    for (buttons, bits) in state.game.iter().zip(mappings.game) {
        for (on, bits) in buttons.iter().zip(bits) {
            if *on {
                data |= bits;
            }
        }
    }

    // the counter coil moves halfway on the "on" bit and the rest of the
    // way (or not at all) on "off"; exactly one of the two is always driven
    data |= if state.coin_counter {
        mappings.coin_counter_on
    } else {
        mappings.coin_counter_off
    };

    data & PHASE_CLEAR
}

/// Produces lights snapshots for the scan loop to fold each iteration.
pub trait LightsSource: Send {
    fn snapshot(&self) -> LightsState;
}

impl LightsSource for std::sync::Arc<std::sync::Mutex<LightsState>> {
    fn snapshot(&self) -> LightsState {
        *self.lock().unwrap()
    }
}
