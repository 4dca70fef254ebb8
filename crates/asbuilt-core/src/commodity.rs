//! Commodity classification from the `WATERTYPE` attribute.
//!
//! Every feature carries exactly one commodity at classification time. Flags
//! only ever widen afterwards, when buffers sharing a source document are
//! merged.

use serde::{Deserialize, Serialize};

/// The five commodity columns of the as-built polygon layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Commodity {
    Water,
    Sewer,
    Reclaimed,
    Raw,
    Other,
}

/// Known `WATERTYPE` values. Anything else classifies as [`Commodity::Other`].
pub const WATER_TYPES: &[(&str, Commodity)] = &[
    ("Potable", Commodity::Water),
    ("Sewage", Commodity::Sewer),
    ("Reclaimed", Commodity::Reclaimed),
    ("Raw", Commodity::Raw),
];

impl Commodity {
    pub const ALL: [Commodity; 5] = [
        Commodity::Water,
        Commodity::Sewer,
        Commodity::Reclaimed,
        Commodity::Raw,
        Commodity::Other,
    ];

    /// Output column name.
    pub fn column(self) -> &'static str {
        match self {
            Commodity::Water => "water",
            Commodity::Sewer => "sewer",
            Commodity::Reclaimed => "reclaimed",
            Commodity::Raw => "raw",
            Commodity::Other => "other",
        }
    }
}

/// Per-commodity booleans, persisted as `Yes`/`No`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommodityFlags {
    pub water: bool,
    pub sewer: bool,
    pub reclaimed: bool,
    pub raw: bool,
    pub other: bool,
}

impl CommodityFlags {
    /// Flags with only `commodity` set.
    pub fn only(commodity: Commodity) -> Self {
        let mut flags = Self::default();
        flags.set(commodity);
        flags
    }

    pub fn set(&mut self, commodity: Commodity) {
        match commodity {
            Commodity::Water => self.water = true,
            Commodity::Sewer => self.sewer = true,
            Commodity::Reclaimed => self.reclaimed = true,
            Commodity::Raw => self.raw = true,
            Commodity::Other => self.other = true,
        }
    }

    pub fn get(&self, commodity: Commodity) -> bool {
        match commodity {
            Commodity::Water => self.water,
            Commodity::Sewer => self.sewer,
            Commodity::Reclaimed => self.reclaimed,
            Commodity::Raw => self.raw,
            Commodity::Other => self.other,
        }
    }

    /// Logical OR of both flag sets.
    pub fn union(self, other: Self) -> Self {
        Self {
            water: self.water || other.water,
            sewer: self.sewer || other.sewer,
            reclaimed: self.reclaimed || other.reclaimed,
            raw: self.raw || other.raw,
            other: self.other || other.other,
        }
    }

    /// True if every flag set in `self` is also set in `other`.
    pub fn is_subset_of(&self, other: &Self) -> bool {
        self.union(*other) == *other
    }

    pub fn count(&self) -> usize {
        Commodity::ALL.iter().filter(|c| self.get(**c)).count()
    }

    /// `(column, "Yes"/"No")` pairs in column order.
    pub fn columns(&self) -> [(&'static str, &'static str); 5] {
        Commodity::ALL.map(|c| (c.column(), yes_no(self.get(c))))
    }
}

/// Map a `WATERTYPE` value to its initial commodity flags.
///
/// Matching is exact; unknown, padded or empty values classify as `other`.
pub fn classify(water_type: &str) -> CommodityFlags {
    let commodity = WATER_TYPES
        .iter()
        .find(|(name, _)| *name == water_type)
        .map(|(_, c)| *c)
        .unwrap_or(Commodity::Other);
    CommodityFlags::only(commodity)
}

pub fn yes_no(value: bool) -> &'static str {
    if value { "Yes" } else { "No" }
}

/// Parse a persisted `Yes`/`No` value. Anything but `Yes` reads as false.
pub fn parse_yes_no(value: &str) -> bool {
    value.eq_ignore_ascii_case("yes")
}
