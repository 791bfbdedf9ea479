//! Channel layouts: tags, labels, bitmaps and the layout value built from them.
//!
//! A [`ChannelLayout`] describes its channels in one of three ways, selected
//! by its tag:
//!
//! - a predefined layout tag such as [`ChannelLayoutTag::MPEG_5_1_A`]
//! - [`ChannelLayoutTag::USE_CHANNEL_BITMAP`] with a [`ChannelBitmap`]
//! - [`ChannelLayoutTag::USE_CHANNEL_DESCRIPTIONS`] with one
//!   [`ChannelDescription`] per channel
//!
//! All three expand to an ordered list of [`ChannelLabel`]s, which is what
//! channel mapping works on.

use std::fmt;
use std::str::FromStr;

use caext_macros::{FromBytes, ToBytes, caf_chunk_type};
use log::trace;

use crate::impl_u32_code;
use crate::utils::byte_stream::ByteStream;
use crate::utils::byteorder::{ReadBytesBe, WriteBytesBe};
use crate::utils::errors::ChannelLayoutError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ToBytes, FromBytes)]
pub struct ChannelLayoutTag(pub u32);

impl ChannelLayoutTag {
    /// Use the array of channel descriptions to define the mapping.
    pub const USE_CHANNEL_DESCRIPTIONS: Self = Self(0);
    /// Use the bitmap to define the mapping.
    pub const USE_CHANNEL_BITMAP: Self = Self(1 << 16);

    pub const MONO: Self = Self((100 << 16) | 1);
    pub const STEREO: Self = Self((101 << 16) | 2);
    pub const STEREO_HEADPHONES: Self = Self((102 << 16) | 2);
    pub const MATRIX_STEREO: Self = Self((103 << 16) | 2);
    pub const MID_SIDE: Self = Self((104 << 16) | 2);
    pub const XY: Self = Self((105 << 16) | 2);
    pub const BINAURAL: Self = Self((106 << 16) | 2);
    pub const AMBISONIC_B_FORMAT: Self = Self((107 << 16) | 4);
    pub const QUADRAPHONIC: Self = Self((108 << 16) | 4);
    pub const PENTAGONAL: Self = Self((109 << 16) | 5);
    pub const HEXAGONAL: Self = Self((110 << 16) | 6);
    pub const OCTAGONAL: Self = Self((111 << 16) | 8);
    pub const CUBE: Self = Self((112 << 16) | 8);

    pub const MPEG_3_0_A: Self = Self((113 << 16) | 3);
    pub const MPEG_3_0_B: Self = Self((114 << 16) | 3);
    pub const MPEG_4_0_A: Self = Self((115 << 16) | 4);
    pub const MPEG_4_0_B: Self = Self((116 << 16) | 4);
    pub const MPEG_5_0_A: Self = Self((117 << 16) | 5);
    pub const MPEG_5_0_B: Self = Self((118 << 16) | 5);
    pub const MPEG_5_0_C: Self = Self((119 << 16) | 5);
    pub const MPEG_5_0_D: Self = Self((120 << 16) | 5);
    pub const MPEG_5_1_A: Self = Self((121 << 16) | 6);
    pub const MPEG_5_1_B: Self = Self((122 << 16) | 6);
    pub const MPEG_5_1_C: Self = Self((123 << 16) | 6);
    pub const MPEG_5_1_D: Self = Self((124 << 16) | 6);
    pub const MPEG_6_1_A: Self = Self((125 << 16) | 7);
    pub const MPEG_7_1_A: Self = Self((126 << 16) | 8);
    pub const MPEG_7_1_B: Self = Self((127 << 16) | 8);
    pub const MPEG_7_1_C: Self = Self((128 << 16) | 8);
    pub const EMAGIC_DEFAULT_7_1: Self = Self((129 << 16) | 8);
    pub const SMPTE_DTV: Self = Self((130 << 16) | 8);

    pub const ITU_2_1: Self = Self((131 << 16) | 3);
    pub const ITU_2_2: Self = Self((132 << 16) | 4);

    pub const DVD_4: Self = Self((133 << 16) | 3);
    pub const DVD_5: Self = Self((134 << 16) | 4);
    pub const DVD_6: Self = Self((135 << 16) | 5);
    pub const DVD_10: Self = Self((136 << 16) | 4);
    pub const DVD_11: Self = Self((137 << 16) | 5);
    pub const DVD_18: Self = Self((138 << 16) | 5);

    pub const AUDIO_UNIT_6_0: Self = Self((139 << 16) | 6);
    pub const AUDIO_UNIT_7_0: Self = Self((140 << 16) | 7);

    pub const AAC_6_0: Self = Self((141 << 16) | 6);
    pub const AAC_6_1: Self = Self((142 << 16) | 7);
    pub const AAC_7_0: Self = Self((143 << 16) | 7);
    pub const AAC_OCTAGONAL: Self = Self((144 << 16) | 8);

    pub const TMH_10_2_STD: Self = Self((145 << 16) | 16);
    pub const TMH_10_2_FULL: Self = Self((146 << 16) | 21);

    /// Needs the channel count OR'd in.
    pub const DISCRETE_IN_ORDER: Self = Self(147 << 16);
    pub const UNKNOWN: Self = Self(0xFFFF_0000);

    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Channel count encoded in the low 16 bits.
    pub const fn channel_count(self) -> u32 {
        self.0 & 0xFFFF
    }

    pub const fn discrete_in_order(channels: u16) -> Self {
        Self(Self::DISCRETE_IN_ORDER.0 | channels as u32)
    }

    /// The customary layout for a plain channel count.
    pub fn default_for_channels(channels: u16) -> Self {
        match channels {
            1 => Self::MONO,
            2 => Self::STEREO,
            3 => Self::MPEG_3_0_A,
            4 => Self::QUADRAPHONIC,
            5 => Self::MPEG_5_0_A,
            6 => Self::MPEG_5_1_A,
            7 => Self::MPEG_6_1_A,
            8 => Self::MPEG_7_1_A,
            n => Self::discrete_in_order(n),
        }
    }

    fn known(self) -> Option<&'static KnownLayout> {
        KNOWN_LAYOUTS.iter().find(|k| k.tag == self)
    }

    pub fn name(self) -> Option<&'static str> {
        match self {
            Self::USE_CHANNEL_DESCRIPTIONS => Some("UseChannelDescriptions"),
            Self::USE_CHANNEL_BITMAP => Some("UseChannelBitmap"),
            Self::UNKNOWN => Some("Unknown"),
            tag if tag.0 & 0xFFFF_0000 == Self::DISCRETE_IN_ORDER.0 => Some("DiscreteInOrder"),
            tag => tag.known().map(|k| k.name),
        }
    }

    pub fn from_name(name: &str) -> Result<Self, ChannelLayoutError> {
        KNOWN_LAYOUTS
            .iter()
            .find(|k| k.name.eq_ignore_ascii_case(name))
            .map(|k| k.tag)
            .ok_or_else(|| ChannelLayoutError::UnknownTagName(name.to_string()))
    }
}

impl From<u32> for ChannelLayoutTag {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for ChannelLayoutTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "{:#010X}", self.0),
        }
    }
}

struct KnownLayout {
    tag: ChannelLayoutTag,
    name: &'static str,
    labels: &'static str,
}

macro_rules! known_layouts {
    ($($tag:ident => $name:literal, $labels:literal;)+) => {
        const KNOWN_LAYOUTS: &[KnownLayout] = &[
            $(KnownLayout { tag: ChannelLayoutTag::$tag, name: $name, labels: $labels },)+
        ];
    };
}

known_layouts! {
    MONO => "Mono", "M";
    STEREO => "Stereo", "L R";
    STEREO_HEADPHONES => "StereoHeadphones", "HPL HPR";
    MATRIX_STEREO => "MatrixStereo", "Lt Rt";
    MID_SIDE => "MidSide", "Mid Side";
    XY => "XY", "XY-X XY-Y";
    BINAURAL => "Binaural", "HPL HPR";
    AMBISONIC_B_FORMAT => "Ambisonic_B_Format", "W X Y Z";
    QUADRAPHONIC => "Quadraphonic", "L R Ls Rs";
    PENTAGONAL => "Pentagonal", "L R Rls Rrs C";
    HEXAGONAL => "Hexagonal", "L R Rls Rrs C Cs";
    OCTAGONAL => "Octagonal", "L R Rls Rrs C Cs Ls Rs";
    CUBE => "Cube", "L R Rls Rrs Vhl Vhr Ltr Rtr";
    MPEG_3_0_A => "MPEG_3_0_A", "L R C";
    MPEG_3_0_B => "MPEG_3_0_B", "C L R";
    MPEG_4_0_A => "MPEG_4_0_A", "L R C Cs";
    MPEG_4_0_B => "MPEG_4_0_B", "C L R Cs";
    MPEG_5_0_A => "MPEG_5_0_A", "L R C Ls Rs";
    MPEG_5_0_B => "MPEG_5_0_B", "L R Ls Rs C";
    MPEG_5_0_C => "MPEG_5_0_C", "L C R Ls Rs";
    MPEG_5_0_D => "MPEG_5_0_D", "C L R Ls Rs";
    MPEG_5_1_A => "MPEG_5_1_A", "L R C LFE Ls Rs";
    MPEG_5_1_B => "MPEG_5_1_B", "L R Ls Rs C LFE";
    MPEG_5_1_C => "MPEG_5_1_C", "L C R Ls Rs LFE";
    MPEG_5_1_D => "MPEG_5_1_D", "C L R Ls Rs LFE";
    MPEG_6_1_A => "MPEG_6_1_A", "L R C LFE Ls Rs Cs";
    MPEG_7_1_A => "MPEG_7_1_A", "L R C LFE Ls Rs Lc Rc";
    MPEG_7_1_B => "MPEG_7_1_B", "C Lc Rc L R Ls Rs LFE";
    MPEG_7_1_C => "MPEG_7_1_C", "L R C LFE Ls Rs Rls Rrs";
    EMAGIC_DEFAULT_7_1 => "Emagic_Default_7_1", "L R Ls Rs C LFE Lc Rc";
    SMPTE_DTV => "SMPTE_DTV", "L R C LFE Ls Rs Lt Rt";
    ITU_2_1 => "ITU_2_1", "L R Cs";
    ITU_2_2 => "ITU_2_2", "L R Ls Rs";
    DVD_4 => "DVD_4", "L R LFE";
    DVD_5 => "DVD_5", "L R LFE Cs";
    DVD_6 => "DVD_6", "L R LFE Ls Rs";
    DVD_10 => "DVD_10", "L R C LFE";
    DVD_11 => "DVD_11", "L R C LFE Cs";
    DVD_18 => "DVD_18", "L R Ls Rs LFE";
    AUDIO_UNIT_6_0 => "AudioUnit_6_0", "L R Ls Rs C Cs";
    AUDIO_UNIT_7_0 => "AudioUnit_7_0", "L R Ls Rs C Rls Rrs";
    AAC_6_0 => "AAC_6_0", "C L R Ls Rs Cs";
    AAC_6_1 => "AAC_6_1", "C L R Ls Rs Cs LFE";
    AAC_7_0 => "AAC_7_0", "C L R Ls Rs Rls Rrs";
    AAC_OCTAGONAL => "AAC_Octagonal", "C L R Ls Rs Rls Rrs Cs";
    TMH_10_2_STD => "TMH_10_2_std", "L R C Vhc Lsd Rsd Ls Rs Vhl Vhr Lw Rw Csd Cs LFE LFE2";
    TMH_10_2_FULL => "TMH_10_2_full", "L R C Vhc Lsd Rsd Ls Rs Vhl Vhr Lw Rw Csd Cs LFE LFE2 Lc Rc HI Narr Haptic";
}

/// Role of a single channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ChannelLabel(pub u32);

impl ChannelLabel {
    /// Unknown role or unspecified other use for the channel.
    pub const UNKNOWN: Self = Self(0xFFFF_FFFF);
    /// Present, but with no intended role or destination.
    pub const UNUSED: Self = Self(0);
    /// Described solely by the coordinates of its description.
    pub const USE_COORDINATES: Self = Self(100);

    pub const LEFT: Self = Self(1);
    pub const RIGHT: Self = Self(2);
    pub const CENTER: Self = Self(3);
    pub const LFE_SCREEN: Self = Self(4);
    /// WAVE: "Back Left"
    pub const LEFT_SURROUND: Self = Self(5);
    /// WAVE: "Back Right"
    pub const RIGHT_SURROUND: Self = Self(6);
    pub const LEFT_CENTER: Self = Self(7);
    pub const RIGHT_CENTER: Self = Self(8);
    /// WAVE: "Back Center"
    pub const CENTER_SURROUND: Self = Self(9);
    /// WAVE: "Side Left"
    pub const LEFT_SURROUND_DIRECT: Self = Self(10);
    /// WAVE: "Side Right"
    pub const RIGHT_SURROUND_DIRECT: Self = Self(11);
    pub const TOP_CENTER_SURROUND: Self = Self(12);
    /// WAVE: "Top Front Left"
    pub const VERTICAL_HEIGHT_LEFT: Self = Self(13);
    /// WAVE: "Top Front Center"
    pub const VERTICAL_HEIGHT_CENTER: Self = Self(14);
    /// WAVE: "Top Front Right"
    pub const VERTICAL_HEIGHT_RIGHT: Self = Self(15);
    pub const TOP_BACK_LEFT: Self = Self(16);
    pub const TOP_BACK_CENTER: Self = Self(17);
    pub const TOP_BACK_RIGHT: Self = Self(18);
    pub const REAR_SURROUND_LEFT: Self = Self(33);
    pub const REAR_SURROUND_RIGHT: Self = Self(34);
    pub const LEFT_WIDE: Self = Self(35);
    pub const RIGHT_WIDE: Self = Self(36);
    pub const LFE2: Self = Self(37);
    /// Matrix encoded 4 channels
    pub const LEFT_TOTAL: Self = Self(38);
    /// Matrix encoded 4 channels
    pub const RIGHT_TOTAL: Self = Self(39);
    pub const HEARING_IMPAIRED: Self = Self(40);
    pub const NARRATION: Self = Self(41);
    pub const MONO: Self = Self(42);
    pub const DIALOG_CENTRIC_MIX: Self = Self(43);
    /// Back center, non diffuse
    pub const CENTER_SURROUND_DIRECT: Self = Self(44);
    pub const HAPTIC: Self = Self(45);

    pub const AMBISONIC_W: Self = Self(200);
    pub const AMBISONIC_X: Self = Self(201);
    pub const AMBISONIC_Y: Self = Self(202);
    pub const AMBISONIC_Z: Self = Self(203);
    pub const MS_MID: Self = Self(204);
    pub const MS_SIDE: Self = Self(205);
    pub const XY_X: Self = Self(206);
    pub const XY_Y: Self = Self(207);

    pub const HEADPHONES_LEFT: Self = Self(301);
    pub const HEADPHONES_RIGHT: Self = Self(302);
    pub const CLICK_TRACK: Self = Self(304);
    pub const FOREIGN_LANGUAGE: Self = Self(305);

    const DISCRETE_BASE: u32 = 1 << 16;

    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// The `n`th discrete channel, with no spatial role.
    pub const fn discrete(n: u16) -> Self {
        Self(Self::DISCRETE_BASE | n as u32)
    }

    pub const fn discrete_index(self) -> Option<u16> {
        if self.0 & 0xFFFF_0000 == Self::DISCRETE_BASE {
            Some((self.0 & 0xFFFF) as u16)
        } else {
            None
        }
    }

    /// Short name, e.g. `L`, `Rs` or `LFE`.
    pub fn abbreviation(self) -> Option<String> {
        if let Some(n) = self.discrete_index() {
            return Some(format!("D{n}"));
        }
        LABEL_NAMES
            .iter()
            .find(|(label, _, _)| *label == self)
            .map(|(_, abbreviation, _)| abbreviation.to_string())
    }

    pub fn full_name(self) -> Option<&'static str> {
        LABEL_NAMES
            .iter()
            .find(|(label, _, _)| *label == self)
            .map(|(_, _, name)| *name)
    }

    pub fn from_abbreviation(s: &str) -> Result<Self, ChannelLayoutError> {
        if let Some((label, _, _)) = LABEL_NAMES.iter().find(|(_, a, _)| *a == s) {
            return Ok(*label);
        }
        s.strip_prefix('D')
            .and_then(|n| n.parse::<u16>().ok())
            .map(Self::discrete)
            .ok_or_else(|| ChannelLayoutError::UnknownLabel(s.to_string()))
    }

    fn bitmap_bit(self) -> Option<ChannelBitmap> {
        match self.0 {
            n @ 1..=18 => Some(ChannelBitmap(1 << (n - 1))),
            _ => None,
        }
    }
}

impl From<u32> for ChannelLabel {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for ChannelLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.abbreviation() {
            Some(a) => f.write_str(&a),
            None => write!(f, "#{}", self.0),
        }
    }
}

impl FromStr for ChannelLabel {
    type Err = ChannelLayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_abbreviation(s)
    }
}

impl_u32_code!(ChannelLabel);

const LABEL_NAMES: &[(ChannelLabel, &str, &str)] = &[
    (ChannelLabel::UNUSED, "Unused", "Unused"),
    (ChannelLabel::UNKNOWN, "?", "Unknown"),
    (ChannelLabel::USE_COORDINATES, "Coord", "Use Coordinates"),
    (ChannelLabel::LEFT, "L", "Left"),
    (ChannelLabel::RIGHT, "R", "Right"),
    (ChannelLabel::CENTER, "C", "Center"),
    (ChannelLabel::LFE_SCREEN, "LFE", "LFE Screen"),
    (ChannelLabel::LEFT_SURROUND, "Ls", "Left Surround"),
    (ChannelLabel::RIGHT_SURROUND, "Rs", "Right Surround"),
    (ChannelLabel::LEFT_CENTER, "Lc", "Left Center"),
    (ChannelLabel::RIGHT_CENTER, "Rc", "Right Center"),
    (ChannelLabel::CENTER_SURROUND, "Cs", "Center Surround"),
    (ChannelLabel::LEFT_SURROUND_DIRECT, "Lsd", "Left Surround Direct"),
    (ChannelLabel::RIGHT_SURROUND_DIRECT, "Rsd", "Right Surround Direct"),
    (ChannelLabel::TOP_CENTER_SURROUND, "Ts", "Top Center Surround"),
    (ChannelLabel::VERTICAL_HEIGHT_LEFT, "Vhl", "Vertical Height Left"),
    (ChannelLabel::VERTICAL_HEIGHT_CENTER, "Vhc", "Vertical Height Center"),
    (ChannelLabel::VERTICAL_HEIGHT_RIGHT, "Vhr", "Vertical Height Right"),
    (ChannelLabel::TOP_BACK_LEFT, "Ltr", "Top Back Left"),
    (ChannelLabel::TOP_BACK_CENTER, "Ctr", "Top Back Center"),
    (ChannelLabel::TOP_BACK_RIGHT, "Rtr", "Top Back Right"),
    (ChannelLabel::REAR_SURROUND_LEFT, "Rls", "Rear Surround Left"),
    (ChannelLabel::REAR_SURROUND_RIGHT, "Rrs", "Rear Surround Right"),
    (ChannelLabel::LEFT_WIDE, "Lw", "Left Wide"),
    (ChannelLabel::RIGHT_WIDE, "Rw", "Right Wide"),
    (ChannelLabel::LFE2, "LFE2", "LFE 2"),
    (ChannelLabel::LEFT_TOTAL, "Lt", "Left Total"),
    (ChannelLabel::RIGHT_TOTAL, "Rt", "Right Total"),
    (ChannelLabel::HEARING_IMPAIRED, "HI", "Hearing Impaired"),
    (ChannelLabel::NARRATION, "Narr", "Narration"),
    (ChannelLabel::MONO, "M", "Mono"),
    (ChannelLabel::DIALOG_CENTRIC_MIX, "DLG", "Dialog Centric Mix"),
    (ChannelLabel::CENTER_SURROUND_DIRECT, "Csd", "Center Surround Direct"),
    (ChannelLabel::HAPTIC, "Haptic", "Haptic"),
    (ChannelLabel::AMBISONIC_W, "W", "Ambisonic W"),
    (ChannelLabel::AMBISONIC_X, "X", "Ambisonic X"),
    (ChannelLabel::AMBISONIC_Y, "Y", "Ambisonic Y"),
    (ChannelLabel::AMBISONIC_Z, "Z", "Ambisonic Z"),
    (ChannelLabel::MS_MID, "Mid", "Mid/Side Mid"),
    (ChannelLabel::MS_SIDE, "Side", "Mid/Side Side"),
    (ChannelLabel::XY_X, "XY-X", "X-Y X"),
    (ChannelLabel::XY_Y, "XY-Y", "X-Y Y"),
    (ChannelLabel::HEADPHONES_LEFT, "HPL", "Headphones Left"),
    (ChannelLabel::HEADPHONES_RIGHT, "HPR", "Headphones Right"),
    (ChannelLabel::CLICK_TRACK, "Click", "Click Track"),
    (ChannelLabel::FOREIGN_LANGUAGE, "Foreign", "Foreign Language"),
];

fn parse_labels(s: &str) -> Result<Vec<ChannelLabel>, ChannelLayoutError> {
    s.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|token| !token.is_empty())
        .map(ChannelLabel::from_abbreviation)
        .collect()
}

/// Speaker positions present in a stream, bit `n` standing for label `n + 1`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, ToBytes, FromBytes)]
pub struct ChannelBitmap(pub u32);

impl ChannelBitmap {
    pub const LEFT: Self = Self(1 << 0);
    pub const RIGHT: Self = Self(1 << 1);
    pub const CENTER: Self = Self(1 << 2);
    pub const LFE_SCREEN: Self = Self(1 << 3);
    pub const LEFT_SURROUND: Self = Self(1 << 4);
    pub const RIGHT_SURROUND: Self = Self(1 << 5);
    pub const LEFT_CENTER: Self = Self(1 << 6);
    pub const RIGHT_CENTER: Self = Self(1 << 7);
    pub const CENTER_SURROUND: Self = Self(1 << 8);
    pub const LEFT_SURROUND_DIRECT: Self = Self(1 << 9);
    pub const RIGHT_SURROUND_DIRECT: Self = Self(1 << 10);
    pub const TOP_CENTER_SURROUND: Self = Self(1 << 11);
    pub const VERTICAL_HEIGHT_LEFT: Self = Self(1 << 12);
    pub const VERTICAL_HEIGHT_CENTER: Self = Self(1 << 13);
    pub const VERTICAL_HEIGHT_RIGHT: Self = Self(1 << 14);
    pub const TOP_BACK_LEFT: Self = Self(1 << 15);
    pub const TOP_BACK_CENTER: Self = Self(1 << 16);
    pub const TOP_BACK_RIGHT: Self = Self(1 << 17);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn channel_count(self) -> u32 {
        self.0.count_ones()
    }

    /// Labels of the set bits, lowest bit first.
    pub fn labels(self) -> Vec<ChannelLabel> {
        (0..18)
            .filter(|bit| self.0 & (1 << bit) != 0)
            .map(|bit| ChannelLabel(bit + 1))
            .collect()
    }
}

impl std::ops::BitOr for ChannelBitmap {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, ToBytes, FromBytes)]
pub struct ChannelDescription {
    pub label: ChannelLabel,
    pub flags: u32,
    pub coordinates: [f32; 3],
}

impl ChannelDescription {
    pub const SIZE: usize = 20;

    pub fn new(label: ChannelLabel) -> Self {
        Self {
            label,
            ..Default::default()
        }
    }
}

/// Owned channel layout. An absent layout is `Option<ChannelLayout>::None`.
///
/// Serialises as the CAF `chan` chunk body.
#[derive(Debug, Clone, PartialEq)]
#[caf_chunk_type(b"chan")]
pub struct ChannelLayout {
    pub tag: ChannelLayoutTag,
    pub bitmap: ChannelBitmap,
    pub descriptions: Vec<ChannelDescription>,
}

impl ChannelLayout {
    pub fn with_tag(tag: ChannelLayoutTag) -> Self {
        Self {
            tag,
            bitmap: ChannelBitmap::default(),
            descriptions: Vec::new(),
        }
    }

    pub fn with_bitmap(bitmap: ChannelBitmap) -> Self {
        Self {
            tag: ChannelLayoutTag::USE_CHANNEL_BITMAP,
            bitmap,
            descriptions: Vec::new(),
        }
    }

    pub fn with_labels<I: IntoIterator<Item = ChannelLabel>>(labels: I) -> Self {
        Self {
            tag: ChannelLayoutTag::USE_CHANNEL_DESCRIPTIONS,
            bitmap: ChannelBitmap::default(),
            descriptions: labels.into_iter().map(ChannelDescription::new).collect(),
        }
    }

    /// Builds a description-based layout from abbreviations such as `"L R C"`.
    pub fn from_label_string(s: &str) -> Result<Self, ChannelLayoutError> {
        let labels = parse_labels(s)?;
        if labels.is_empty() {
            return Err(ChannelLayoutError::Empty);
        }
        Ok(Self::with_labels(labels))
    }

    pub fn mono() -> Self {
        Self::with_tag(ChannelLayoutTag::MONO)
    }

    pub fn stereo() -> Self {
        Self::with_tag(ChannelLayoutTag::STEREO)
    }

    pub fn channel_count(&self) -> usize {
        match self.tag {
            ChannelLayoutTag::USE_CHANNEL_DESCRIPTIONS => self.descriptions.len(),
            ChannelLayoutTag::USE_CHANNEL_BITMAP => self.bitmap.channel_count() as usize,
            tag => tag.channel_count() as usize,
        }
    }

    /// Expands the layout to one label per channel, in channel order.
    pub fn labels(&self) -> Result<Vec<ChannelLabel>, ChannelLayoutError> {
        match self.tag {
            ChannelLayoutTag::USE_CHANNEL_DESCRIPTIONS => {
                Ok(self.descriptions.iter().map(|d| d.label).collect())
            }
            ChannelLayoutTag::USE_CHANNEL_BITMAP => Ok(self.bitmap.labels()),
            tag if tag.0 & 0xFFFF_0000 == ChannelLayoutTag::DISCRETE_IN_ORDER.0 => {
                Ok((0..tag.channel_count() as u16).map(ChannelLabel::discrete).collect())
            }
            tag => match tag.known() {
                Some(known) => parse_labels(known.labels),
                None => Err(ChannelLayoutError::UnmappableTag(tag.0)),
            },
        }
    }

    /// Rewrites the layout as a bitmap when every channel has a bitmap bit
    /// and the labels appear in bitmap order.
    pub fn to_bitmap(&self) -> Option<ChannelBitmap> {
        let labels = self.labels().ok()?;
        let bits = labels
            .iter()
            .map(|label| label.bitmap_bit())
            .collect::<Option<Vec<_>>>()?;
        let ordered = bits.windows(2).all(|w| w[0].0 < w[1].0);
        ordered.then(|| bits.into_iter().fold(ChannelBitmap(0), |acc, b| acc | b))
    }

    /// For every channel of `output`, the index of the matching channel in
    /// `self`, or -1 when `self` has no channel with that label.
    pub fn map_to_layout(&self, output: &ChannelLayout) -> Result<Vec<i32>, ChannelLayoutError> {
        let input_labels = self.labels()?;
        let output_labels = output.labels()?;
        let map = output_labels
            .iter()
            .map(|label| {
                input_labels
                    .iter()
                    .position(|l| l == label)
                    .map_or(-1, |i| i as i32)
            })
            .collect::<Vec<_>>();
        trace!("Channel map {self} -> {output}: {map:?}");
        Ok(map)
    }

    /// Size of the equivalent host structure in bytes.
    pub fn size_in_bytes(&self) -> usize {
        12 + ChannelDescription::SIZE * self.descriptions.len()
    }

    pub fn description(&self, prefix: &str) -> String {
        let labels = match self.labels() {
            Ok(labels) => labels
                .iter()
                .map(ChannelLabel::to_string)
                .collect::<Vec<_>>()
                .join(" "),
            Err(_) => format!("{} ch", self.channel_count()),
        };
        match self.tag {
            ChannelLayoutTag::USE_CHANNEL_DESCRIPTIONS => {
                format!("{prefix}Channel descriptions ({labels})")
            }
            ChannelLayoutTag::USE_CHANNEL_BITMAP => {
                format!("{prefix}Bitmap {:#010x} ({labels})", self.bitmap.0)
            }
            tag => format!("{prefix}{tag} ({labels})"),
        }
    }

    /// Reads a CAF `chan` chunk body.
    pub fn read_caf<S: AsRef<[u8]>>(stream: &mut ByteStream<S>) -> Result<Self, ChannelLayoutError> {
        let start = stream.position();
        let tag = ChannelLayoutTag::read_be(stream)?;
        let bitmap = ChannelBitmap::read_be(stream)?;
        let declared = stream.read_be::<u32>()?;

        let available = stream.remaining();
        if declared as usize > available / ChannelDescription::SIZE {
            stream.set_position(start)?;
            return Err(ChannelLayoutError::Truncated {
                declared,
                available,
            });
        }

        let descriptions = (0..declared)
            .map(|_| ChannelDescription::read_be(stream))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            tag,
            bitmap,
            descriptions,
        })
    }
}

impl WriteBytesBe for ChannelLayout {
    fn write_be(&self, dst: &mut Vec<u8>) {
        self.tag.write_be(dst);
        self.bitmap.write_be(dst);
        (self.descriptions.len() as u32).write_be(dst);
        self.descriptions.write_be(dst);
    }
}

impl fmt::Display for ChannelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description(""))
    }
}

impl FromStr for ChannelLayout {
    type Err = ChannelLayoutError;

    /// Accepts a layout tag name (`"MPEG_5_1_A"`) or a label string (`"L R C"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match ChannelLayoutTag::from_name(s.trim()) {
            Ok(tag) => Ok(Self::with_tag(tag)),
            Err(_) => Self::from_label_string(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caf::CafChunk;

    #[test]
    fn stereo_has_two_channels() {
        let stereo = ChannelLayout::stereo();
        assert_eq!(stereo.channel_count(), 2);
        assert_eq!(
            stereo.labels().unwrap(),
            vec![ChannelLabel::LEFT, ChannelLabel::RIGHT]
        );
        assert_eq!(ChannelLayout::mono().channel_count(), 1);
        assert_eq!(stereo.size_in_bytes(), 12);
    }

    #[test]
    fn label_string() {
        let layout = ChannelLayout::from_label_string("L R").unwrap();
        assert_eq!(layout.channel_count(), 2);
        assert_eq!(layout.tag, ChannelLayoutTag::USE_CHANNEL_DESCRIPTIONS);
        assert_eq!(layout.size_in_bytes(), 12 + 2 * 20);
        assert_eq!(layout.to_string(), "Channel descriptions (L R)");

        assert!(matches!(
            ChannelLayout::from_label_string("L Q"),
            Err(ChannelLayoutError::UnknownLabel(ref s)) if s == "Q"
        ));
        assert_eq!(
            ChannelLayout::from_label_string("  "),
            Err(ChannelLayoutError::Empty)
        );
    }

    #[test]
    fn known_layout_tables_are_consistent() {
        for known in KNOWN_LAYOUTS {
            let labels = parse_labels(known.labels).unwrap();
            assert_eq!(
                labels.len() as u32,
                known.tag.channel_count(),
                "{}",
                known.name
            );
            assert_eq!(ChannelLayoutTag::from_name(known.name).unwrap(), known.tag);
        }
    }

    #[test]
    fn bitmap_layouts() {
        let bitmap = ChannelBitmap::LEFT | ChannelBitmap::RIGHT | ChannelBitmap::LFE_SCREEN;
        let layout = ChannelLayout::with_bitmap(bitmap);
        assert_eq!(layout.channel_count(), 3);
        assert_eq!(
            layout.labels().unwrap(),
            vec![ChannelLabel::LEFT, ChannelLabel::RIGHT, ChannelLabel::LFE_SCREEN]
        );
        assert_eq!(layout.to_string(), "Bitmap 0x0000000b (L R LFE)");

        assert_eq!(
            ChannelLayout::with_tag(ChannelLayoutTag::MPEG_5_1_A).to_bitmap(),
            Some(ChannelBitmap(0b11_1111))
        );
        assert_eq!(ChannelLayout::with_tag(ChannelLayoutTag::MPEG_5_1_B).to_bitmap(), None);
    }

    #[test]
    fn channel_maps() {
        let input = ChannelLayout::with_tag(ChannelLayoutTag::MPEG_5_1_A);
        let output = ChannelLayout::with_tag(ChannelLayoutTag::MPEG_5_1_D);
        assert_eq!(input.map_to_layout(&output).unwrap(), vec![2, 0, 1, 4, 5, 3]);

        let stereo = ChannelLayout::stereo();
        assert_eq!(
            stereo.map_to_layout(&output).unwrap(),
            vec![-1, 0, 1, -1, -1, -1]
        );

        let unknown = ChannelLayout::with_tag(ChannelLayoutTag::UNKNOWN);
        assert_eq!(
            unknown.map_to_layout(&stereo),
            Err(ChannelLayoutError::UnmappableTag(0xFFFF_0000))
        );
    }

    #[test]
    fn discrete_layouts() {
        let layout = ChannelLayout::with_tag(ChannelLayoutTag::discrete_in_order(3));
        assert_eq!(layout.channel_count(), 3);
        assert_eq!(
            layout.to_string(),
            "DiscreteInOrder (D0 D1 D2)"
        );
        assert_eq!("D12".parse::<ChannelLabel>().unwrap(), ChannelLabel::discrete(12));
    }

    #[test]
    fn parse_tag_or_labels() {
        let layout: ChannelLayout = "mpeg_5_1_a".parse().unwrap();
        assert_eq!(layout.tag, ChannelLayoutTag::MPEG_5_1_A);
        assert_eq!(layout.to_string(), "MPEG_5_1_A (L R C LFE Ls Rs)");

        let layout: ChannelLayout = "C, Lc Rc".parse().unwrap();
        assert_eq!(layout.channel_count(), 3);
    }

    #[test]
    fn equality() {
        assert_eq!(ChannelLayout::stereo(), ChannelLayout::with_tag(ChannelLayoutTag::STEREO));
        assert_ne!(
            ChannelLayout::stereo(),
            ChannelLayout::from_label_string("L R").unwrap()
        );
    }

    #[test]
    fn chan_chunk() {
        let layout = ChannelLayout::from_label_string("L R").unwrap();
        let data = layout.chunk_data();
        assert_eq!(data.len(), layout.size_in_bytes());
        assert_eq!(&data[..12], &[0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2]);
        assert_eq!(&data[12..16], &[0, 0, 0, 1]);

        let mut stream = ByteStream::from(&data[..]);
        assert_eq!(ChannelLayout::read_caf(&mut stream).unwrap(), layout);

        let mut short = ByteStream::from(&data[..30]);
        assert_eq!(
            ChannelLayout::read_caf(&mut short),
            Err(ChannelLayoutError::Truncated {
                declared: 2,
                available: 18
            })
        );
        assert_eq!(short.position(), 0);
    }
}
