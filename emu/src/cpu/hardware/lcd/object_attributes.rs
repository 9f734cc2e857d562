// Nomenclature follows the usual OAM attribute layout: three 16-bit
// attributes per entry, with the fourth slot of every entry carrying one
// component of the 32 rotation/scaling parameter groups.

use serde::{Deserialize, Serialize};

use crate::bitwise::Bits;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjMode {
    #[default]
    Normal,
    Affine,
    Disabled,
    AffineDouble,
}

impl From<u16> for ObjMode {
    fn from(value: u16) -> Self {
        match value {
            0 => Self::Normal,
            1 => Self::Affine,
            2 => Self::Disabled,
            3 => Self::AffineDouble,
            _ => unreachable!(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorMode {
    /// 16 colors with a per-object palette bank.
    #[default]
    Palette4bpp,
    /// 256 colors.
    Palette8bpp,
}

impl From<bool> for ColorMode {
    fn from(value: bool) -> Self {
        if value {
            Self::Palette8bpp
        } else {
            Self::Palette4bpp
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjShape {
    #[default]
    Square,
    Horizontal,
    Vertical,
    /// Encoding 3 describes no size; such entries are never drawn.
    Prohibited,
}

impl From<u16> for ObjShape {
    fn from(value: u16) -> Self {
        match value {
            0 => Self::Square,
            1 => Self::Horizontal,
            2 => Self::Vertical,
            3 => Self::Prohibited,
            _ => unreachable!(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransformationKind {
    RotationScaling {
        rotation_scaling_parameter: u8,
    },
    Flip {
        horizontal_flip: bool,
        vertical_flip: bool,
    },
}

impl Default for TransformationKind {
    fn default() -> Self {
        Self::Flip {
            horizontal_flip: false,
            vertical_flip: false,
        }
    }
}

#[derive(Default, Clone, Copy, Serialize, Deserialize)]
pub struct ObjAttribute0 {
    pub y_coordinate: u8,
    pub obj_mode: ObjMode,
    pub color_mode: ColorMode,
    pub obj_shape: ObjShape,
}

impl From<u16> for ObjAttribute0 {
    fn from(value: u16) -> Self {
        Self {
            y_coordinate: value.get_byte(0),
            obj_mode: value.get_bits(8..=9).into(),
            color_mode: value.get_bit(13).into(),
            obj_shape: value.get_bits(14..=15).into(),
        }
    }
}

#[derive(Default, Clone, Copy, Serialize, Deserialize)]
pub struct ObjAttribute1 {
    pub x_coordinate: u16,
    pub transformation_kind: TransformationKind,
    pub obj_size: u16,
}

impl ObjAttribute1 {
    fn from_value(value: u16, obj_mode: ObjMode) -> Self {
        Self {
            x_coordinate: value.get_bits(0..=8),
            transformation_kind: match obj_mode {
                ObjMode::Affine | ObjMode::AffineDouble => TransformationKind::RotationScaling {
                    rotation_scaling_parameter: value.get_bits(9..=13) as u8,
                },
                ObjMode::Normal | ObjMode::Disabled => TransformationKind::Flip {
                    horizontal_flip: value.get_bit(12),
                    vertical_flip: value.get_bit(13),
                },
            },
            obj_size: value.get_bits(14..=15),
        }
    }
}

#[derive(Clone, Copy, Serialize, Deserialize)]
pub struct ObjAttribute2 {
    pub tile_number: u16,
    pub priority: u8,
    pub palette_number: u8,
}

impl Default for ObjAttribute2 {
    fn default() -> Self {
        Self {
            tile_number: 0,
            // lowest priority
            priority: 3,
            palette_number: 0,
        }
    }
}

impl From<u16> for ObjAttribute2 {
    fn from(value: u16) -> Self {
        Self {
            tile_number: value.get_bits(0..=9),
            priority: value.get_bits(10..=11) as u8,
            palette_number: value.get_bits(12..=15) as u8,
        }
    }
}

#[derive(Default, Clone, Copy, Serialize, Deserialize)]
pub struct ObjAttributes {
    pub attribute0: ObjAttribute0,
    pub attribute1: ObjAttribute1,
    pub attribute2: ObjAttribute2,
}

impl ObjAttributes {
    /// Sprite width and height in pixels from the shape and size codes.
    #[must_use]
    pub fn size(&self) -> (i32, i32) {
        match (self.attribute0.obj_shape, self.attribute1.obj_size) {
            (ObjShape::Square, 0) => (8, 8),
            (ObjShape::Square, 1) => (16, 16),
            (ObjShape::Square, 2) => (32, 32),
            (ObjShape::Square, 3) => (64, 64),
            (ObjShape::Horizontal, 0) => (16, 8),
            (ObjShape::Horizontal, 1) => (32, 8),
            (ObjShape::Horizontal, 2) => (32, 16),
            (ObjShape::Horizontal, 3) => (64, 32),
            (ObjShape::Vertical, 0) => (8, 16),
            (ObjShape::Vertical, 1) => (8, 32),
            (ObjShape::Vertical, 2) => (16, 32),
            (ObjShape::Vertical, 3) => (32, 64),
            _ => (0, 0),
        }
    }
}

impl From<[u16; 3]> for ObjAttributes {
    fn from(value: [u16; 3]) -> Self {
        let attribute0 = ObjAttribute0::from(value[0]);
        Self {
            attribute0,
            attribute1: ObjAttribute1::from_value(value[1], attribute0.obj_mode),
            attribute2: value[2].into(),
        }
    }
}

/// One rotation/scaling parameter group: a 2x2 matrix of 8.8 fixed-point
/// values stored across four OAM entries.
#[derive(Default, Copy, Clone, Serialize, Deserialize)]
pub struct RotationScaling {
    pa: u16,
    pb: u16,
    pc: u16,
    pd: u16,
}

impl RotationScaling {
    #[must_use]
    pub fn pa(self) -> i32 {
        i32::from(self.pa as i16)
    }

    #[must_use]
    pub fn pb(self) -> i32 {
        i32::from(self.pb as i16)
    }

    #[must_use]
    pub fn pc(self) -> i32 {
        i32::from(self.pc as i16)
    }

    #[must_use]
    pub fn pd(self) -> i32 {
        i32::from(self.pd as i16)
    }

    pub(crate) fn set_component(&mut self, index: usize, value: u16) {
        match index {
            0 => self.pa = value,
            1 => self.pb = value,
            2 => self.pc = value,
            3 => self.pd = value,
            _ => unreachable!(),
        }
    }
}

/// Parses the whole OAM into the 128 typed entries and the 32 parameter
/// groups. Called once per frame so that mid-frame OAM writes do not tear
/// sprites.
#[must_use]
pub fn get_attributes(oam_memory: &[u8]) -> ([ObjAttributes; 128], [RotationScaling; 32]) {
    let mut obj_attributes = [ObjAttributes::default(); 128];
    let mut rotation_scalings = [RotationScaling::default(); 32];

    for (idx, chunk) in oam_memory.chunks_exact(8).enumerate() {
        let attribute0 = u16::from(chunk[0]) | u16::from(chunk[1]) << 8;
        let attribute1 = u16::from(chunk[2]) | u16::from(chunk[3]) << 8;
        let attribute2 = u16::from(chunk[4]) | u16::from(chunk[5]) << 8;
        let rotation_scaling = u16::from(chunk[6]) | u16::from(chunk[7]) << 8;

        obj_attributes[idx] = [attribute0, attribute1, attribute2].into();
        rotation_scalings[idx / 4].set_component(idx % 4, rotation_scaling);
    }

    (obj_attributes, rotation_scalings)
}
