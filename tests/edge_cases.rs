// Allow our units.cents digit grouping convention (e.g., 15_50 = 15.50)
#![allow(clippy::inconsistent_digit_grouping)]

//! Edge-case tests: adversarial inputs to every public API.

use lotbook::{
    MarketSegment, MarketType, Price, SegmentTable, Side, Symbol, TimeInForce, ValidationError,
    lots_to_shares, shares_to_lots,
};

// ============================================================================
// Symbol
// ============================================================================

#[test]
fn symbol_rejects_empty_and_blank() {
    assert!(Symbol::try_new("").is_none());
    assert!(Symbol::try_new("   ").is_none());
}

#[test]
fn symbol_length_boundary() {
    assert!(Symbol::try_new("12345678").is_some());
    assert!(Symbol::try_new("123456789").is_none());
}

#[test]
fn symbol_rejects_non_ascii_and_punctuation() {
    assert!(Symbol::try_new("台積電").is_none());
    assert!(Symbol::try_new("23 30").is_none());
    assert!(Symbol::try_new("2330,").is_none());
}

#[test]
fn symbol_trims_and_keeps_leading_zeros() {
    let s = Symbol::try_new(" 00878 ").unwrap();
    assert_eq!(s.as_str(), "00878");
    assert_ne!(s, Symbol::new("878"));
}

#[test]
fn symbol_from_str_error() {
    let err = "bad symbol".parse::<Symbol>().unwrap_err();
    assert_eq!(err, ValidationError::InvalidSymbol("bad symbol".into()));
}

#[test]
fn symbol_display_padding() {
    assert_eq!(format!("[{:6}]", Symbol::new("2330")), "[2330  ]");
}

// ============================================================================
// Price
// ============================================================================

#[test]
fn price_plain_forms() {
    assert_eq!(Price::parse_decimal("600").unwrap(), Price(600_00));
    assert_eq!(Price::parse_decimal("15.5").unwrap(), Price(15_50));
    assert_eq!(Price::parse_decimal(".35").unwrap(), Price(0_35));
    assert_eq!(Price::parse_decimal("7.").unwrap(), Price(7_00));
    assert_eq!(Price::parse_decimal("15.500").unwrap(), Price(15_50));
}

#[test]
fn price_rejects_garbage() {
    for s in ["", ".", "-", "abc", "1.2.3", "1,5", "15.555", "NaN", "inf", "1e2"] {
        assert!(Price::parse_decimal(s).is_err(), "{s:?} should not parse");
    }
}

#[test]
fn price_sign_and_positivity() {
    assert!(!Price::parse_decimal("0").unwrap().is_positive());
    assert!(!Price::parse_decimal("-1.25").unwrap().is_positive());
    assert_eq!(Price::parse_decimal("-1.25").unwrap(), Price(-1_25));
}

#[test]
fn price_overflow_rejected() {
    let huge = format!("{}", i64::MAX);
    assert!(Price::parse_decimal(&huge).is_err());
}

#[test]
fn price_display() {
    assert_eq!(Price(15_50).to_string(), "15.50");
    assert_eq!(Price(0_05).to_string(), "0.05");
    assert_eq!(Price(-1_25).to_string(), "-1.25");
}

// ============================================================================
// Lots
// ============================================================================

#[test]
fn lot_conversions() {
    assert_eq!(lots_to_shares(0), 0);
    assert_eq!(lots_to_shares(10), 10_000);
    assert_eq!(shares_to_lots(4_500), 4.5);
    assert_eq!(shares_to_lots(-1_000), -1.0);
}

#[test]
fn lot_conversion_saturates() {
    assert_eq!(lots_to_shares(u64::MAX), i64::MAX);
    assert_eq!(lots_to_shares(i64::MAX as u64 / 1000 + 1), i64::MAX);
}

// ============================================================================
// Segments
// ============================================================================

#[test]
fn empty_table_resolves_nothing() {
    let table = SegmentTable::new();
    assert!(table.is_empty());
    assert_eq!(table.classify(&Symbol::new("2330")), None);
}

#[test]
fn tie_break_follows_segment_priority() {
    let sym = Symbol::new("2330");
    let table = SegmentTable::new()
        .with(MarketSegment::EmergingBoard, [sym])
        .with(MarketSegment::Otc, [sym]);
    assert_eq!(table.classify(&sym), Some(MarketSegment::Otc));

    let table = table.with(MarketSegment::Primary, [sym]);
    assert_eq!(table.classify(&sym), Some(MarketSegment::Primary));
}

#[test]
fn segment_codes_parse_case_insensitively() {
    assert_eq!("tse".parse::<MarketSegment>().unwrap(), MarketSegment::Primary);
    assert_eq!(" OTC ".parse::<MarketSegment>().unwrap(), MarketSegment::Otc);
    assert_eq!("esb".parse::<MarketSegment>().unwrap(), MarketSegment::EmergingBoard);
    assert!(matches!(
        "NYSE".parse::<MarketSegment>(),
        Err(ValidationError::UnknownSegment(_))
    ));
}

#[test]
fn only_emerging_board_routes_emerging() {
    assert_eq!(MarketSegment::Primary.market_type(), MarketType::Common);
    assert_eq!(MarketSegment::Otc.market_type(), MarketType::Common);
    assert_eq!(MarketSegment::EmergingBoard.market_type(), MarketType::Emerging);
}

// ============================================================================
// Side / TimeInForce
// ============================================================================

#[test]
fn side_from_extreme_deltas() {
    assert_eq!(Side::from_delta(i64::MAX), Some(Side::Buy));
    assert_eq!(Side::from_delta(i64::MIN), Some(Side::Sell));
}

#[test]
fn day_order_is_default() {
    assert_eq!(TimeInForce::default(), TimeInForce::ROD);
    assert_eq!(TimeInForce::default().to_string(), "ROD");
}
