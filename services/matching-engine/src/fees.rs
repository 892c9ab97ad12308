//! Fee calculator
//!
//! Placement fee: `fee_per_block × order_expire_blocks`, locked when the
//! order is placed. Exit fee: `fee_per_block × elapsed blocks`, capped at the
//! placement fee, charged when the order is cancelled, expired or filled.
//! Trade fee: `price × quantity × rate` in the quote denomination, never
//! below the configured floor.

use rust_decimal::Decimal;
use tracing::error;
use types::account::Coin;
use types::ids::ProductId;
use types::numeric::{round_to, Price, Quantity, DEC_PRECISION};
use types::order::Order;

/// Fee locked for an order resting `expire_blocks` blocks at `fee_per_block`
pub fn placement_fee(fee_per_block: &Coin, expire_blocks: i64) -> Coin {
    Coin::new(
        fee_per_block.denom.clone(),
        fee_per_block.amount * Decimal::from(expire_blocks.max(0)),
    )
}

/// Placement fee captured by `order`
pub fn order_placement_fee(order: &Order) -> Coin {
    placement_fee(&order.fee_per_block, order.order_expire_blocks)
}

/// Holding fee owed when `order` leaves the book at `current_height`
pub fn exit_fee(order: &Order, current_height: i64) -> Coin {
    let mut elapsed = current_height - order.order_id.height();
    if elapsed < 0 {
        error!(
            order_id = %order.order_id,
            current_height,
            "order created above the current height, exit fee clamped to zero"
        );
        elapsed = 0;
    }
    let elapsed = elapsed.min(order.order_expire_blocks);
    Coin::new(
        order.fee_per_block.denom.clone(),
        order.fee_per_block.amount * Decimal::from(elapsed),
    )
}

/// Trade fee of one fill, in the product's quote denomination
pub fn trade_fee(product: &ProductId, price: Price, quantity: Quantity, rate: Decimal, floor: Decimal) -> Coin {
    let fee = round_to(price * quantity * rate, DEC_PRECISION);
    Coin::new(product.quote(), fee.max(floor))
}
