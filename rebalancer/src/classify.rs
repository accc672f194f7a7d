//! Symbol → market segment resolution.
//!
//! The segment table is fetched from the market-data service at most once per
//! run, on the first lookup, and reused for every later row.

use std::sync::OnceLock;

use log::{debug, info, warn};
use lotbook::{MarketSegment, SegmentTable, Symbol};
use lotbook_broker::{MarketData, Session};

use crate::error::{Error, Result};

/// Resolves a symbol to the segment it trades on.
pub trait Classify {
    /// `Ok(None)` means the symbol is not listed on any known segment.
    fn classify(&self, symbol: &Symbol) -> Result<Option<MarketSegment>>;
}

impl Classify for SegmentTable {
    fn classify(&self, symbol: &Symbol) -> Result<Option<MarketSegment>> {
        Ok(SegmentTable::classify(self, symbol))
    }
}

/// Classifier that loads its table from the market-data service on first use.
pub struct LazyClassifier<'a, M: MarketData + ?Sized> {
    market: &'a M,
    session: &'a Session,
    table: OnceLock<SegmentTable>,
}

impl<'a, M: MarketData + ?Sized> LazyClassifier<'a, M> {
    pub fn new(market: &'a M, session: &'a Session) -> Self {
        Self {
            market,
            session,
            table: OnceLock::new(),
        }
    }

    /// The cached table, fetching it if this is the first call.
    pub fn table(&self) -> Result<&SegmentTable> {
        if let Some(table) = self.table.get() {
            return Ok(table);
        }
        let fetched = fetch_segment_table(self.market, self.session)?;
        Ok(self.table.get_or_init(|| fetched))
    }

    /// Whether the table has been fetched yet.
    pub fn is_loaded(&self) -> bool {
        self.table.get().is_some()
    }
}

impl<M: MarketData + ?Sized> Classify for LazyClassifier<'_, M> {
    fn classify(&self, symbol: &Symbol) -> Result<Option<MarketSegment>> {
        Ok(self.table()?.classify(symbol))
    }
}

/// Fetch every segment's ticker list and build the lookup table.
///
/// Any segment failing to load is fatal. Tickers that are not valid
/// symbols are skipped.
pub fn fetch_segment_table<M: MarketData + ?Sized>(
    market: &M,
    session: &Session,
) -> Result<SegmentTable> {
    let mut table = SegmentTable::new();

    for segment in MarketSegment::ALL {
        let tickers = market
            .tickers(session, segment)
            .map_err(|e| Error::MarketData(format!("{segment} tickers: {e}")))?;

        let total = tickers.len();
        let symbols: Vec<Symbol> = tickers
            .iter()
            .filter_map(|t| {
                let sym = Symbol::try_new(&t.symbol);
                if sym.is_none() {
                    debug!("skipping unusable {segment} ticker {:?}", t.symbol);
                }
                sym
            })
            .collect();

        if symbols.len() < total {
            warn!(
                "{} of {total} {segment} tickers could not be used as symbols",
                total - symbols.len()
            );
        }
        table.extend(segment, symbols);
        debug!("{segment}: {} symbols", table.len(segment));
    }

    info!(
        "segment table loaded: {} TSE, {} OTC, {} ESB",
        table.len(MarketSegment::Primary),
        table.len(MarketSegment::Otc),
        table.len(MarketSegment::EmergingBoard),
    );
    Ok(table)
}
