//! Market segments and the symbol → segment lookup table.

use std::fmt;
use std::str::FromStr;

use rustc_hash::FxHashSet;

use crate::error::ValidationError;
use crate::types::Symbol;

/// Listing board a symbol trades on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MarketSegment {
    /// Main board (TSE).
    Primary,
    /// Over-the-counter board (OTC).
    Otc,
    /// Emerging stock board (ESB).
    EmergingBoard,
}

impl MarketSegment {
    /// All segments in lookup priority order.
    pub const ALL: [MarketSegment; 3] = [
        MarketSegment::Primary,
        MarketSegment::Otc,
        MarketSegment::EmergingBoard,
    ];

    /// Market code used by the market-data service.
    pub fn code(self) -> &'static str {
        match self {
            MarketSegment::Primary => "TSE",
            MarketSegment::Otc => "OTC",
            MarketSegment::EmergingBoard => "ESB",
        }
    }

    /// Exchange operating the segment.
    pub fn exchange(self) -> &'static str {
        match self {
            MarketSegment::Primary => "TWSE",
            MarketSegment::Otc | MarketSegment::EmergingBoard => "TPEx",
        }
    }

    /// Order-routing market type for symbols on this segment.
    pub fn market_type(self) -> MarketType {
        match self {
            MarketSegment::EmergingBoard => MarketType::Emerging,
            MarketSegment::Primary | MarketSegment::Otc => MarketType::Common,
        }
    }
}

impl fmt::Display for MarketSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.code())
    }
}

impl FromStr for MarketSegment {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MarketSegment::ALL
            .into_iter()
            .find(|seg| seg.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::UnknownSegment(s.to_string()))
    }
}

/// Market type code attached to an order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MarketType {
    /// Regular session on the main or OTC board.
    #[default]
    Common,
    /// Emerging stock board routing.
    Emerging,
}

impl fmt::Display for MarketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketType::Common => write!(f, "Common"),
            MarketType::Emerging => write!(f, "Emg"),
        }
    }
}

/// Limit or market pricing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PriceType {
    Limit,
    Market,
}

impl fmt::Display for PriceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceType::Limit => write!(f, "Limit"),
            PriceType::Market => write!(f, "Market"),
        }
    }
}

/// Known symbols per segment.
///
/// Lookup follows [`MarketSegment::ALL`] order, so a symbol listed under two
/// segments resolves to the earlier one (Primary, then OTC, then emerging).
#[derive(Debug, Clone, Default)]
pub struct SegmentTable {
    primary: FxHashSet<Symbol>,
    otc: FxHashSet<Symbol>,
    emerging: FxHashSet<Symbol>,
}

impl SegmentTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add symbols to one segment's set.
    pub fn extend<I>(&mut self, segment: MarketSegment, symbols: I)
    where
        I: IntoIterator<Item = Symbol>,
    {
        self.set_mut(segment).extend(symbols);
    }

    /// Builder-style variant of [`SegmentTable::extend`].
    pub fn with<I>(mut self, segment: MarketSegment, symbols: I) -> Self
    where
        I: IntoIterator<Item = Symbol>,
    {
        self.extend(segment, symbols);
        self
    }

    /// Resolve a symbol to its segment; `None` if no set contains it.
    pub fn classify(&self, symbol: &Symbol) -> Option<MarketSegment> {
        MarketSegment::ALL
            .into_iter()
            .find(|&seg| self.set(seg).contains(symbol))
    }

    /// Number of known symbols in one segment.
    pub fn len(&self, segment: MarketSegment) -> usize {
        self.set(segment).len()
    }

    pub fn is_empty(&self) -> bool {
        MarketSegment::ALL.iter().all(|&seg| self.set(seg).is_empty())
    }

    fn set(&self, segment: MarketSegment) -> &FxHashSet<Symbol> {
        match segment {
            MarketSegment::Primary => &self.primary,
            MarketSegment::Otc => &self.otc,
            MarketSegment::EmergingBoard => &self.emerging,
        }
    }

    fn set_mut(&mut self, segment: MarketSegment) -> &mut FxHashSet<Symbol> {
        match segment {
            MarketSegment::Primary => &mut self.primary,
            MarketSegment::Otc => &mut self.otc,
            MarketSegment::EmergingBoard => &mut self.emerging,
        }
    }
}
