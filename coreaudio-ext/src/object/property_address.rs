use std::fmt;

use crate::utils::fourcc::{fourcc, fourcc_string};

/// Identifier of an audio object.
pub type ObjectId = u32;

pub const UNKNOWN_OBJECT: ObjectId = 0;
pub const SYSTEM_OBJECT: ObjectId = 1;

pub const WILDCARD: u32 = fourcc(b"****");

/// Property scopes.
pub mod scope {
    use crate::utils::fourcc::fourcc;

    pub const GLOBAL: u32 = fourcc(b"glob");
    pub const INPUT: u32 = fourcc(b"inpt");
    pub const OUTPUT: u32 = fourcc(b"outp");
    pub const PLAY_THROUGH: u32 = fourcc(b"ptru");
    pub const WILDCARD: u32 = super::WILDCARD;
}

pub const ELEMENT_MAIN: u32 = 0;
pub const ELEMENT_WILDCARD: u32 = 0xFFFF_FFFF;

/// Property selectors understood by the object wrappers.
pub mod selector {
    use crate::utils::fourcc::fourcc;

    pub const WILDCARD: u32 = super::WILDCARD;

    // Audio object
    pub const BASE_CLASS: u32 = fourcc(b"bcls");
    pub const CLASS: u32 = fourcc(b"clas");
    pub const OWNER: u32 = fourcc(b"stdv");
    pub const NAME: u32 = fourcc(b"lnam");
    pub const MODEL_NAME: u32 = fourcc(b"lmod");
    pub const MANUFACTURER: u32 = fourcc(b"lmak");
    pub const ELEMENT_NAME: u32 = fourcc(b"lchn");
    pub const ELEMENT_CATEGORY_NAME: u32 = fourcc(b"lccn");
    pub const ELEMENT_NUMBER_NAME: u32 = fourcc(b"lcnn");
    pub const OWNED_OBJECTS: u32 = fourcc(b"ownd");
    pub const SERIAL_NUMBER: u32 = fourcc(b"snum");
    pub const FIRMWARE_VERSION: u32 = fourcc(b"fwvn");

    // System object
    pub const DEVICES: u32 = fourcc(b"dev#");
    pub const DEFAULT_INPUT_DEVICE: u32 = fourcc(b"dIn ");
    pub const DEFAULT_OUTPUT_DEVICE: u32 = fourcc(b"dOut");
    pub const DEFAULT_SYSTEM_OUTPUT_DEVICE: u32 = fourcc(b"sOut");

    // Device
    pub const DEVICE_UID: u32 = fourcc(b"uid ");
    pub const MODEL_UID: u32 = fourcc(b"muid");
    pub const LATENCY: u32 = fourcc(b"ltnc");
    pub const SAFETY_OFFSET: u32 = fourcc(b"saft");
    pub const STREAMS: u32 = fourcc(b"stm#");
    pub const NOMINAL_SAMPLE_RATE: u32 = fourcc(b"nsrt");
    pub const AVAILABLE_NOMINAL_SAMPLE_RATES: u32 = fourcc(b"nsr#");
    pub const BUFFER_FRAME_SIZE: u32 = fourcc(b"fsiz");
    pub const DEVICE_IS_ALIVE: u32 = fourcc(b"livn");
    pub const DEVICE_IS_RUNNING: u32 = fourcc(b"goin");
    pub const TRANSPORT_TYPE: u32 = fourcc(b"tran");
    pub const PREFERRED_CHANNELS_FOR_STEREO: u32 = fourcc(b"dch2");

    // Stream
    pub const IS_ACTIVE: u32 = fourcc(b"sact");
    pub const DIRECTION: u32 = fourcc(b"sdir");
    pub const TERMINAL_TYPE: u32 = fourcc(b"term");
    pub const STARTING_CHANNEL: u32 = fourcc(b"schn");
    pub const VIRTUAL_FORMAT: u32 = fourcc(b"sfmt");
    pub const AVAILABLE_VIRTUAL_FORMATS: u32 = fourcc(b"sfma");
    pub const PHYSICAL_FORMAT: u32 = fourcc(b"pft ");
    pub const AVAILABLE_PHYSICAL_FORMATS: u32 = fourcc(b"pfta");
}

/// Audio object class identifiers.
pub mod class {
    use crate::utils::fourcc::fourcc;

    pub const OBJECT: u32 = fourcc(b"aobj");
    pub const SYSTEM: u32 = fourcc(b"asys");
    pub const DEVICE: u32 = fourcc(b"adev");
    pub const STREAM: u32 = fourcc(b"astr");
    pub const AGGREGATE_DEVICE: u32 = fourcc(b"aagg");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropertyAddress {
    pub selector: u32,
    pub scope: u32,
    pub element: u32,
}

impl PropertyAddress {
    pub const fn new(selector: u32, scope: u32, element: u32) -> Self {
        Self {
            selector,
            scope,
            element,
        }
    }

    /// Address in the global scope on the main element.
    pub const fn global(selector: u32) -> Self {
        Self::new(selector, scope::GLOBAL, ELEMENT_MAIN)
    }

    pub const fn scoped(selector: u32, scope: u32) -> Self {
        Self::new(selector, scope, ELEMENT_MAIN)
    }

    /// Matches every property of every scope and element.
    pub const fn wildcard() -> Self {
        Self::new(selector::WILDCARD, scope::WILDCARD, ELEMENT_WILDCARD)
    }

    /// Equal in every field, with wildcards on either side matching anything.
    pub fn congruent(&self, other: &Self) -> bool {
        (self.selector == other.selector
            || self.selector == selector::WILDCARD
            || other.selector == selector::WILDCARD)
            && (self.scope == other.scope
                || self.scope == scope::WILDCARD
                || other.scope == scope::WILDCARD)
            && (self.element == other.element
                || self.element == ELEMENT_WILDCARD
                || other.element == ELEMENT_WILDCARD)
    }
}

impl fmt::Display for PropertyAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ",
            fourcc_string(self.selector),
            fourcc_string(self.scope)
        )?;
        match self.element {
            ELEMENT_WILDCARD => f.write_str("*"),
            element => write!(f, "{element}"),
        }
    }
}

/// Input or output side of a device or stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectionalScope {
    Input,
    Output,
}

impl DirectionalScope {
    pub const fn scope(self) -> u32 {
        match self {
            DirectionalScope::Input => scope::INPUT,
            DirectionalScope::Output => scope::OUTPUT,
        }
    }
}

impl fmt::Display for DirectionalScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DirectionalScope::Input => "input",
            DirectionalScope::Output => "output",
        })
    }
}

/// How a device connects to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransportType(pub u32);

impl TransportType {
    pub const UNKNOWN: Self = Self(0);
    pub const BUILT_IN: Self = Self(fourcc(b"bltn"));
    pub const AGGREGATE: Self = Self(fourcc(b"grup"));
    pub const VIRTUAL: Self = Self(fourcc(b"virt"));
    pub const PCI: Self = Self(fourcc(b"pci "));
    pub const USB: Self = Self(fourcc(b"usb "));
    pub const FIREWIRE: Self = Self(fourcc(b"1394"));
    pub const BLUETOOTH: Self = Self(fourcc(b"blue"));
    pub const BLUETOOTH_LE: Self = Self(fourcc(b"blea"));
    pub const HDMI: Self = Self(fourcc(b"hdmi"));
    pub const DISPLAY_PORT: Self = Self(fourcc(b"dprt"));
    pub const AIRPLAY: Self = Self(fourcc(b"airp"));
    pub const AVB: Self = Self(fourcc(b"eavb"));
    pub const THUNDERBOLT: Self = Self(fourcc(b"thun"));

    pub fn name(self) -> Option<&'static str> {
        Some(match self {
            Self::UNKNOWN => "Unknown",
            Self::BUILT_IN => "Built-in",
            Self::AGGREGATE => "Aggregate",
            Self::VIRTUAL => "Virtual",
            Self::PCI => "PCI",
            Self::USB => "USB",
            Self::FIREWIRE => "FireWire",
            Self::BLUETOOTH => "Bluetooth",
            Self::BLUETOOTH_LE => "Bluetooth LE",
            Self::HDMI => "HDMI",
            Self::DISPLAY_PORT => "DisplayPort",
            Self::AIRPLAY => "AirPlay",
            Self::AVB => "AVB",
            Self::THUNDERBOLT => "Thunderbolt",
            _ => return None,
        })
    }
}

impl fmt::Display for TransportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => f.write_str(&fourcc_string(self.0)),
        }
    }
}
