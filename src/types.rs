//! Core types: Price, Quantity, Lots, Symbol

use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Shares in one board lot.
pub const SHARES_PER_LOT: i64 = 1000;

/// Price in smallest units (cents).
///
/// `Price(15_50)` represents 15.50. Using fixed-point avoids floating-point
/// errors when prices from the target list are forwarded to the broker.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Price(pub i64);

impl Price {
    pub const ZERO: Price = Price(0);

    /// Parse a plain decimal string (`"15.5"`, `"600"`, `"0.35"`) into cents.
    ///
    /// At most two fractional digits are significant; trailing zeros beyond
    /// that are accepted (`"15.500"`), anything else is rejected rather than
    /// rounded.
    pub fn parse_decimal(s: &str) -> Result<Price, ValidationError> {
        let s = s.trim();
        let invalid = || ValidationError::InvalidPrice(s.to_string());

        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };

        let (whole, frac) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid());
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }
        if frac.len() > 2 && frac[2..].bytes().any(|b| b != b'0') {
            return Err(invalid());
        }

        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        let mut cents = 0_i64;
        for (i, b) in frac.bytes().take(2).enumerate() {
            let digit = i64::from(b - b'0');
            cents += if i == 0 { digit * 10 } else { digit };
        }

        let value = whole
            .checked_mul(100)
            .and_then(|v| v.checked_add(cents))
            .ok_or_else(invalid)?;
        Ok(Price(if negative { -value } else { value }))
    }

    /// Decimal string as sent on the wire (`"15.50"`).
    pub fn to_decimal_string(self) -> String {
        self.to_string()
    }

    #[inline]
    pub fn is_positive(self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let units = self.0 / 100;
        let cents = (self.0 % 100).abs();
        if self.0 < 0 {
            write!(f, "-{}.{:02}", units.abs(), cents)
        } else {
            write!(f, "{}.{:02}", units, cents)
        }
    }
}

/// Quantity of shares. Always positive on an order.
pub type Quantity = u64;

/// Convert whole lots to shares, saturating at `i64::MAX`.
#[inline]
pub fn lots_to_shares(lots: u64) -> i64 {
    i64::try_from(lots)
        .unwrap_or(i64::MAX)
        .saturating_mul(SHARES_PER_LOT)
}

/// Convert shares to (possibly fractional) lots.
#[inline]
pub fn shares_to_lots(shares: i64) -> f64 {
    shares as f64 / SHARES_PER_LOT as f64
}

/// Maximum ticker length in bytes.
pub const SYMBOL_MAX_LEN: usize = 8;

/// Ticker symbol stored inline (no heap), at most 8 ASCII bytes.
///
/// Exchange tickers such as `2330`, `00878` or `6488` all fit; the inline
/// representation keeps `Symbol` `Copy` so it can be used freely as a map key.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol {
    bytes: [u8; SYMBOL_MAX_LEN],
    len: u8,
}

impl Symbol {
    /// Create a symbol, returning `None` if it is empty, longer than 8 bytes,
    /// or contains anything other than ASCII alphanumerics, `.` or `-`.
    pub fn try_new(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() || s.len() > SYMBOL_MAX_LEN {
            return None;
        }
        if !s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'-')
        {
            return None;
        }
        let mut bytes = [0u8; SYMBOL_MAX_LEN];
        bytes[..s.len()].copy_from_slice(s.as_bytes());
        Some(Self {
            bytes,
            len: s.len() as u8,
        })
    }

    /// Create a symbol from a known-good literal.
    ///
    /// # Panics
    /// If `s` is not a valid symbol (see [`Symbol::try_new`]).
    pub fn new(s: &str) -> Self {
        Self::try_new(s).unwrap_or_else(|| panic!("invalid symbol: {s:?}"))
    }

    pub fn as_str(&self) -> &str {
        // Only ASCII bytes are ever stored.
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or_default()
    }
}

impl FromStr for Symbol {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Symbol::try_new(s).ok_or_else(|| ValidationError::InvalidSymbol(s.to_string()))
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({:?})", self.as_str())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Symbol {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Symbol {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        Symbol::try_new(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid symbol: {s:?}")))
    }
}
