use serde::{Deserialize, Serialize};

/// GBA button bit positions in KEYINPUT (active-low: pressed = 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    A = 1 << 0,
    B = 1 << 1,
    Select = 1 << 2,
    Start = 1 << 3,
    Right = 1 << 4,
    Left = 1 << 5,
    Up = 1 << 6,
    Down = 1 << 7,
    R = 1 << 8,
    L = 1 << 9,
}

impl Button {
    /// Maps a logical host key name to a button. The names are what the
    /// host's keyboard layer delivers, not the console's own labels.
    #[must_use]
    pub fn from_key_name(name: &str) -> Option<Self> {
        match name {
            "ArrowRight" => Some(Self::Right),
            "ArrowLeft" => Some(Self::Left),
            "ArrowUp" => Some(Self::Up),
            "ArrowDown" => Some(Self::Down),
            "A" => Some(Self::L),
            "S" => Some(Self::R),
            "X" => Some(Self::A),
            "Z" => Some(Self::B),
            "Enter" => Some(Self::Start),
            "Backspace" => Some(Self::Select),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct Keypad {
    /// KEYINPUT: 10 bits, active-low.
    pub key_input: u16,
    /// KEYCNT: interrupt match mask and control.
    pub key_interrupt_control: u16,
}

impl Default for Keypad {
    fn default() -> Self {
        Self {
            key_input: 0xFFFF,
            key_interrupt_control: 0,
        }
    }
}

impl Keypad {
    /// Replaces the key state with the given set of pressed logical keys.
    /// Returns true when a newly pressed key matches KEYCNT and the keypad
    /// interrupt should be requested.
    pub fn set_keys(&mut self, keys: &[&str]) -> bool {
        let mut key_input: u16 = 0xFFFF;
        for key in keys {
            if let Some(button) = Button::from_key_name(key) {
                key_input &= !(button as u16);
            }
        }

        let newly_pressed = !key_input & self.key_input;
        let request_irq = newly_pressed & self.key_interrupt_control != 0;

        self.key_input = key_input;
        request_irq
    }
}
