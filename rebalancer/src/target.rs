//! Target list (CSV) loading and normalization.
//!
//! Each row holds `symbol, target_lot, limit_price`. Loading happens in two
//! passes: [`TargetList`] parses and validates the whole file (any negative
//! lot or duplicate symbol aborts before anything else runs), then
//! [`TargetList::into_intents`] classifies each symbol and drops the rows no
//! segment knows about.

use std::io::Read;
use std::path::Path;

use log::{info, warn};
use lotbook::{MarketSegment, Price, Symbol};
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::classify::Classify;
use crate::error::{Error, Result};

/// A parsed row whose symbol and price are usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetRow {
    /// 1-based line in the source file.
    pub line: u64,
    pub symbol: Symbol,
    /// `None` when the cell was blank or not a whole number.
    pub target_lot: Option<u64>,
    /// `None` means a market order.
    pub limit_price: Option<Price>,
}

/// Why a row was left out of the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum DropReason {
    InvalidSymbol,
    InvalidPrice(String),
    UnresolvedSymbol,
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DropReason::InvalidSymbol => write!(f, "invalid symbol"),
            DropReason::InvalidPrice(p) => write!(f, "invalid limit price {p:?}"),
            DropReason::UnresolvedSymbol => write!(f, "not listed on any market segment"),
        }
    }
}

/// A row that will not produce an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedRow {
    pub line: u64,
    pub symbol: String,
    #[serde(flatten)]
    pub reason: DropReason,
}

/// A classified, normalized target ready for the rebalancing engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TradeIntent {
    pub line: u64,
    pub symbol: Symbol,
    pub target_lot: Option<u64>,
    #[serde(serialize_with = "price_or_market")]
    pub limit_price: Option<Price>,
    pub segment: MarketSegment,
}

fn price_or_market<S: serde::Serializer>(
    price: &Option<Price>,
    s: S,
) -> std::result::Result<S::Ok, S::Error> {
    match price {
        Some(p) => s.serialize_str(&p.to_decimal_string()),
        None => s.serialize_str("market"),
    }
}

/// Result of loading: intents to plan, plus every row left out and why.
#[derive(Debug, Clone, Default)]
pub struct LoadedTargets {
    pub intents: Vec<TradeIntent>,
    pub dropped: Vec<DroppedRow>,
}

/// Validated target rows, not yet classified.
#[derive(Debug, Clone, Default)]
pub struct TargetList {
    pub rows: Vec<TargetRow>,
    pub dropped: Vec<DroppedRow>,
}

enum LotCell {
    Known(u64),
    Unknown,
    Negative,
}

impl TargetList {
    /// Load a target list from a CSV file.
    pub fn load(path: &Path, has_header: bool) -> Result<Self> {
        if !path.exists() {
            return Err(Error::SourceNotFound(path.to_path_buf()));
        }
        let file = std::fs::File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::SourceNotFound(path.to_path_buf())
            } else {
                Error::Parse(format!("{}: {e}", path.display()))
            }
        })?;
        Self::from_reader(file, has_header)
    }

    /// Parse from any reader (useful for testing).
    pub fn from_reader<R: Read>(reader: R, has_header: bool) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(has_header)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut list = TargetList::default();
        let mut seen: FxHashMap<Symbol, u64> = FxHashMap::default();

        for (idx, record) in rdr.records().enumerate() {
            let record = record?;
            let line = record
                .position()
                .map(|p| p.line())
                .unwrap_or(idx as u64 + 1);

            let cells: Vec<Option<&str>> = record
                .iter()
                .map(|c| Some(c.trim()).filter(|c| !c.is_empty()))
                .collect();

            if cells.iter().all(Option::is_none) {
                continue;
            }
            if cells.len() < 3 {
                return Err(Error::Parse(format!(
                    "line {line}: expected 3 cells (symbol, target_lot, limit_price), found {}",
                    cells.len()
                )));
            }
            if cells[3..].iter().any(Option::is_some) {
                return Err(Error::Parse(format!(
                    "line {line}: unexpected data beyond the third cell"
                )));
            }

            let (raw_symbol, raw_lot, raw_price) = (cells[0], cells[1], cells[2]);

            let target_lot = match raw_lot.map(parse_lot) {
                Some(LotCell::Negative) => {
                    return Err(Error::NegativeQuantity {
                        line,
                        symbol: raw_symbol.unwrap_or_default().to_string(),
                        value: raw_lot.unwrap_or_default().to_string(),
                    });
                }
                Some(LotCell::Known(n)) => Some(n),
                Some(LotCell::Unknown) | None => None,
            };

            let Some(symbol) = raw_symbol.and_then(Symbol::try_new) else {
                warn!("line {line}: dropping row with invalid symbol {raw_symbol:?}");
                list.dropped.push(DroppedRow {
                    line,
                    symbol: raw_symbol.unwrap_or_default().to_string(),
                    reason: DropReason::InvalidSymbol,
                });
                continue;
            };

            if let Some(&first_line) = seen.get(&symbol) {
                return Err(Error::DuplicateSymbol {
                    symbol: symbol.to_string(),
                    first_line,
                    line,
                });
            }
            seen.insert(symbol, line);

            let limit_price = match raw_price {
                None => None,
                Some(raw) => match Price::parse_decimal(raw) {
                    Ok(p) if p.is_positive() => Some(p),
                    _ => {
                        warn!(
                            "line {line}: dropping {symbol}, limit price {raw:?} is not a positive decimal"
                        );
                        list.dropped.push(DroppedRow {
                            line,
                            symbol: symbol.to_string(),
                            reason: DropReason::InvalidPrice(raw.to_string()),
                        });
                        continue;
                    }
                },
            };

            if target_lot.is_none() {
                warn!(
                    "line {line}: target lot for {symbol} is unknown ({raw_lot:?}), no order will be placed"
                );
            }

            list.rows.push(TargetRow {
                line,
                symbol,
                target_lot,
                limit_price,
            });
        }

        Ok(list)
    }

    /// Classify every row, dropping those no segment lists.
    ///
    /// Classifier errors (e.g. the market-data service being down) abort.
    pub fn into_intents<C: Classify + ?Sized>(self, classifier: &C) -> Result<LoadedTargets> {
        let mut loaded = LoadedTargets {
            intents: Vec::with_capacity(self.rows.len()),
            dropped: self.dropped,
        };

        for row in self.rows {
            match classifier.classify(&row.symbol)? {
                Some(segment) => loaded.intents.push(TradeIntent {
                    line: row.line,
                    symbol: row.symbol,
                    target_lot: row.target_lot,
                    limit_price: row.limit_price,
                    segment,
                }),
                None => {
                    warn!(
                        "line {}: {} is not listed on any market segment, dropping",
                        row.line, row.symbol
                    );
                    loaded.dropped.push(DroppedRow {
                        line: row.line,
                        symbol: row.symbol.to_string(),
                        reason: DropReason::UnresolvedSymbol,
                    });
                }
            }
        }

        loaded.dropped.sort_by_key(|d| d.line);
        info!(
            "{} trade intents loaded, {} rows dropped",
            loaded.intents.len(),
            loaded.dropped.len()
        );
        Ok(loaded)
    }

}

/// Load and classify a target list in one step.
pub fn load_trade_intents<C: Classify + ?Sized>(
    path: &Path,
    has_header: bool,
    classifier: &C,
) -> Result<LoadedTargets> {
    TargetList::load(path, has_header)?.into_intents(classifier)
}

/// `digits` or `digits.000` is a known lot count. Anything that starts with
/// `-` is negative. Everything else (exponents, `inf`, `NaN`, fractions) is
/// unknown.
fn parse_lot(raw: &str) -> LotCell {
    if raw.starts_with('-') {
        return LotCell::Negative;
    }
    let (whole, frac) = match raw.split_once('.') {
        Some((whole, frac)) => (whole, Some(frac)),
        None => (raw, None),
    };
    let whole_ok = !whole.is_empty() && whole.bytes().all(|b| b.is_ascii_digit());
    let frac_ok = frac.is_none_or(|f| !f.is_empty() && f.bytes().all(|b| b == b'0'));
    if !(whole_ok && frac_ok) {
        return LotCell::Unknown;
    }
    whole.parse::<u64>().map_or(LotCell::Unknown, LotCell::Known)
}
