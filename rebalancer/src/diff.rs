//! TARGET vs HELD diff engine.
//!
//! For every trade intent with a known target, compares the target lots
//! against the inventory snapshot and emits one order for the gap. Deltas are
//! computed in whole shares so odd-lot holdings never go through floats.

use log::info;
use lotbook::{
    MarketType, Price, PriceType, Quantity, Side, Symbol, TimeInForce, lots_to_shares,
};
use lotbook_broker::{BrokerOrder, OrderType};
use serde::Serialize;

use crate::inventory::InventoryMap;
use crate::target::TradeIntent;

/// An order the run intends to place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderIntent {
    pub symbol: Symbol,
    pub side: Side,
    /// Shares (lots × 1000 for whole-lot moves).
    pub quantity: Quantity,
    /// `None` for market orders.
    pub price: Option<Price>,
    pub price_type: PriceType,
    pub market_type: MarketType,
    pub time_in_force: TimeInForce,
    pub order_type: OrderType,
    pub target_lot: u64,
    pub held_shares: i64,
}

impl OrderIntent {
    /// Wire order for the broker.
    pub fn to_broker_order(&self) -> BrokerOrder {
        BrokerOrder {
            symbol: self.symbol,
            buy_sell: self.side,
            quantity: self.quantity,
            price: self.price,
            price_type: self.price_type,
            market_type: self.market_type,
            time_in_force: self.time_in_force,
            order_type: self.order_type,
        }
    }

    /// Signed share change this order makes.
    pub fn delta_shares(&self) -> i64 {
        let q = i64::try_from(self.quantity).unwrap_or(i64::MAX);
        match self.side {
            Side::Buy => q,
            Side::Sell => -q,
        }
    }
}

/// Everything the engine decided for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub orders: Vec<OrderIntent>,
    /// Symbols already at target.
    pub unchanged: Vec<Symbol>,
    /// Symbols whose target lot is unknown.
    pub skipped: Vec<Symbol>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

/// Plan the orders that move `inventory` to the targets in `intents`.
///
/// Pure: the same inputs always give the same plan, in input order.
pub fn plan(intents: &[TradeIntent], inventory: &InventoryMap) -> Plan {
    let mut plan = Plan::default();

    for intent in intents {
        let Some(target_lot) = intent.target_lot else {
            info!("{}: target lot unknown, skipping", intent.symbol);
            plan.skipped.push(intent.symbol);
            continue;
        };

        let held = inventory.shares(&intent.symbol);
        let delta = lots_to_shares(target_lot).saturating_sub(held);

        let Some(side) = Side::from_delta(delta) else {
            info!(
                "{}: no action needed, holding target of {target_lot} lots",
                intent.symbol
            );
            plan.unchanged.push(intent.symbol);
            continue;
        };

        let (price, price_type) = match intent.limit_price {
            Some(p) => (Some(p), PriceType::Limit),
            None => (None, PriceType::Market),
        };

        plan.orders.push(OrderIntent {
            symbol: intent.symbol,
            side,
            quantity: delta.unsigned_abs(),
            price,
            price_type,
            market_type: intent.segment.market_type(),
            time_in_force: TimeInForce::ROD,
            order_type: OrderType::Stock,
            target_lot,
            held_shares: held,
        });
    }

    plan
}

/// Just the orders from [`plan`].
pub fn compute(intents: &[TradeIntent], inventory: &InventoryMap) -> Vec<OrderIntent> {
    plan(intents, inventory).orders
}
