//! Semantic hand classes and the colours used in labeled class images.

use image::{Luma, Rgb, RgbImage};

use skeleton::HandJointType;
use types::{ClassImage, BACKGROUND_INDEX};

/// Number of hand classes the forest distinguishes
pub const NUM_CLASSES: usize = 22;

pub const BACKGROUND_COLOR: [u8; 3] = [0, 0, 0];

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandClass {
    Wrist,
    Center,
    ThumbBase,
    ThumbMid,
    ThumbTop,
    ThumbTip,
    IndexBase,
    IndexMid,
    IndexTop,
    IndexTip,
    MiddleBase,
    MiddleMid,
    MiddleTop,
    MiddleTip,
    RingBase,
    RingMid,
    RingTop,
    RingTip,
    PinkyBase,
    PinkyMid,
    PinkyTop,
    PinkyTip,
}

macro_rules! rgb {
    ($hex: expr) => ([(($hex >> 16) & 0xFF) as u8, (($hex >> 8) & 0xFF) as u8, ($hex & 0xFF) as u8])
}

const PALETTE: [[u8; 3]; NUM_CLASSES] = [rgb!(0xFF0000),
                                         rgb!(0xBC00BC),
                                         rgb!(0xBCFFBC),
                                         rgb!(0xFFFF00),
                                         rgb!(0x00FFBC),
                                         rgb!(0x00FF00),
                                         rgb!(0xBCBCFF),
                                         rgb!(0xBC00FF),
                                         rgb!(0x00BCFF),
                                         rgb!(0x0000FF),
                                         rgb!(0x6389BC),
                                         rgb!(0x63BC89),
                                         rgb!(0x89BCBC),
                                         rgb!(0x00FFFF),
                                         rgb!(0x898989),
                                         rgb!(0xA5A5A5),
                                         rgb!(0xBCBCBC),
                                         rgb!(0xE1E1E1),
                                         rgb!(0xBC8963),
                                         rgb!(0x89BC63),
                                         rgb!(0xBCBC89),
                                         rgb!(0xFF00FF)];

impl HandClass {
    pub const ALL: [HandClass; NUM_CLASSES] = [HandClass::Wrist,
                                               HandClass::Center,
                                               HandClass::ThumbBase,
                                               HandClass::ThumbMid,
                                               HandClass::ThumbTop,
                                               HandClass::ThumbTip,
                                               HandClass::IndexBase,
                                               HandClass::IndexMid,
                                               HandClass::IndexTop,
                                               HandClass::IndexTip,
                                               HandClass::MiddleBase,
                                               HandClass::MiddleMid,
                                               HandClass::MiddleTop,
                                               HandClass::MiddleTip,
                                               HandClass::RingBase,
                                               HandClass::RingMid,
                                               HandClass::RingTop,
                                               HandClass::RingTip,
                                               HandClass::PinkyBase,
                                               HandClass::PinkyMid,
                                               HandClass::PinkyTop,
                                               HandClass::PinkyTip];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(idx: usize) -> Option<HandClass> {
        HandClass::ALL.get(idx).cloned()
    }

    pub fn color(self) -> [u8; 3] {
        PALETTE[self.index()]
    }

    /// The skeleton joint this class is localized as.
    pub fn joint(self) -> HandJointType {
        // both enums share the same order
        HandJointType::ALL[self.index()]
    }
}

/// Returns the class index of the colour, `BACKGROUND_INDEX` for
/// black and for every colour which is not in the palette.
pub fn class_index_from_rgb(rgb: [u8; 3]) -> i8 {
    PALETTE
        .iter()
        .position(|c| *c == rgb)
        .map(|i| i as i8)
        .unwrap_or(BACKGROUND_INDEX)
}

/// Returns the colour of the class index. Unknown indices are background.
pub fn rgb_from_class_index(idx: i8) -> [u8; 3] {
    if idx < 0 {
        return BACKGROUND_COLOR;
    }
    HandClass::from_index(idx as usize)
        .map(|c| c.color())
        .unwrap_or(BACKGROUND_COLOR)
}

pub fn rgb_to_classes(img: &RgbImage) -> ClassImage {
    ClassImage::from_fn(img.width(),
                        img.height(),
                        |x, y| Luma([class_index_from_rgb(img[(x, y)].0)]))
}

pub fn classes_to_rgb(img: &ClassImage) -> RgbImage {
    RgbImage::from_fn(img.width(),
                      img.height(),
                      |x, y| Rgb(rgb_from_class_index(img[(x, y)].0[0])))
}
