//! Typed section identifiers.

use crate::prelude::*;

/// Component Model section IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SectionId {
    /// Custom section (0)
    Custom = 0,
    /// Core module section (1)
    CoreModule = 1,
    /// Core instance section (2)
    CoreInstance = 2,
    /// Core type section (3)
    CoreType = 3,
    /// Nested component section (4)
    Component = 4,
    /// Component instance section (5)
    Instance = 5,
    /// Alias section (6)
    Alias = 6,
    /// Type section (7)
    Type = 7,
    /// Canon section (8)
    Canon = 8,
    /// Start section (9)
    Start = 9,
    /// Import section (10)
    Import = 10,
    /// Export section (11)
    Export = 11,
    /// Value section (12)
    Value = 12,
}

impl SectionId {
    /// Decode from the section ID byte.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Custom),
            1 => Some(Self::CoreModule),
            2 => Some(Self::CoreInstance),
            3 => Some(Self::CoreType),
            4 => Some(Self::Component),
            5 => Some(Self::Instance),
            6 => Some(Self::Alias),
            7 => Some(Self::Type),
            8 => Some(Self::Canon),
            9 => Some(Self::Start),
            10 => Some(Self::Import),
            11 => Some(Self::Export),
            12 => Some(Self::Value),
            _ => None,
        }
    }

    /// Section name for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Custom => "custom",
            Self::CoreModule => "core-module",
            Self::CoreInstance => "core-instance",
            Self::CoreType => "core-type",
            Self::Component => "component",
            Self::Instance => "instance",
            Self::Alias => "alias",
            Self::Type => "type",
            Self::Canon => "canon",
            Self::Start => "start",
            Self::Import => "import",
            Self::Export => "export",
            Self::Value => "value",
        }
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
