// Allow our units.cents digit grouping convention (e.g., 15_50 = 15.50)
#![allow(clippy::inconsistent_digit_grouping)]

//! # lotbook
//!
//! Core value types for rebalancing a lot-based equities account.
//!
//! ## Features
//!
//! - **Inline symbols**: `Symbol` is `Copy`, at most 8 ASCII bytes
//! - **Fixed-point prices**: integer cents, parsed exactly from decimal strings
//! - **Lots**: one board lot is [`SHARES_PER_LOT`] shares
//! - **Market segments**: main board, OTC and emerging board, with a
//!   deterministic lookup table
//!
//! ## Quick Start
//!
//! ```
//! use lotbook::{MarketSegment, MarketType, Price, SegmentTable, Symbol};
//!
//! let table = SegmentTable::new()
//!     .with(MarketSegment::Primary, [Symbol::new("2330")])
//!     .with(MarketSegment::EmergingBoard, [Symbol::new("7795")]);
//!
//! assert_eq!(table.classify(&Symbol::new("2330")), Some(MarketSegment::Primary));
//! assert_eq!(table.classify(&Symbol::new("0000")), None);
//! assert_eq!(MarketSegment::EmergingBoard.market_type(), MarketType::Emerging);
//!
//! let price = Price::parse_decimal("15.5").unwrap();
//! assert_eq!(price, Price(15_50));
//! assert_eq!(format!("{price}"), "15.50");
//! ```
//!
//! ## Lots and shares
//!
//! ```
//! use lotbook::{lots_to_shares, shares_to_lots};
//!
//! assert_eq!(lots_to_shares(6), 6000);
//! assert_eq!(shares_to_lots(4500), 4.5);
//! ```

mod error;
mod segment;
mod side;
mod tif;
mod types;

// Re-export public API
pub use error::ValidationError;
pub use segment::{MarketSegment, MarketType, PriceType, SegmentTable};
pub use side::Side;
pub use tif::TimeInForce;
pub use types::{
    Price, Quantity, SHARES_PER_LOT, SYMBOL_MAX_LEN, Symbol, lots_to_shares, shares_to_lots,
};
