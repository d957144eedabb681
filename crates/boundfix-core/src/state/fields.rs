use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Set of observable [`StoreState`](super::StoreState) fields.
///
/// Each commit records which fields it touched, and derived computations
/// declare the fields they read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Fields(u8);

impl Fields {
    pub const NONE: Self = Self(0);
    /// Progress part of the status: running, initialized, missing, export.
    pub const STATUS: Self = Self(1 << 0);
    pub const CONFIG: Self = Self(1 << 1);
    pub const COORDINATE: Self = Self(1 << 2);
    pub const SELECTION: Self = Self(1 << 3);
    /// Disabled flags of the current suggestions.
    pub const SUGGESTIONS: Self = Self(1 << 4);
    pub const LOADING: Self = Self(1 << 5);
    pub const HOVER: Self = Self(1 << 6);

    const NAMES: [(Self, &'static str); 7] = [
        (Self::STATUS, "status"),
        (Self::CONFIG, "config"),
        (Self::COORDINATE, "coordinate"),
        (Self::SELECTION, "selection"),
        (Self::SUGGESTIONS, "suggestions"),
        (Self::LOADING, "loading"),
        (Self::HOVER, "hover"),
    ];

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// `true` if every field of `other` is in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Fields {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for Fields {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

impl fmt::Display for Fields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let mut first = true;
        for (field, name) in Self::NAMES {
            if self.contains(field) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}
