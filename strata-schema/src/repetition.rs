use std::fmt::{Display, Formatter};

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// How many values a column holds per instance of its parent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Repetition {
    /// Exactly one value
    Required = 0,
    /// Zero or one value
    #[default]
    Optional = 1,
    /// Zero or more values
    Repeated = 2,
}

impl Repetition {
    /// Whether the column must always be present.
    pub fn is_required(&self) -> bool {
        matches!(self, Repetition::Required)
    }

    /// Whether the column may hold more than one value.
    pub fn is_repeated(&self) -> bool {
        matches!(self, Repetition::Repeated)
    }
}

impl Display for Repetition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Required => write!(f, "required"),
            Self::Optional => write!(f, "optional"),
            Self::Repeated => write!(f, "repeated"),
        }
    }
}
