//! Shared harness for the engine integration tests
//!
//! Drives a `MatchingEngine` block by block over in-memory storage, ledger
//! and product registry. One product, `xxb_okt`, is listed with price and
//! quantity precision 1 and an initial price of 10.0.

#![allow(dead_code)]

use matching_engine::{
    BlockContext, EngineError, EngineParams, InMemoryLedger, InMemoryRegistry, MatchingEngine, MemStore, OrderItem,
    OrderResult, ProductInfo,
};
use rust_decimal::Decimal;
use std::str::FromStr;
use types::account::Coin;
use types::ids::{AccountId, OrderId, ProductId};
use types::numeric::{Price, Quantity};
use types::order::{Order, Side};

pub const PRODUCT: &str = "xxb_okt";
pub const OWNER: &str = "product_owner";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn price(s: &str) -> Price {
    Price::from_str(s).unwrap()
}

pub fn qty(s: &str) -> Quantity {
    Quantity::from_str(s).unwrap()
}

pub fn product() -> ProductId {
    ProductId::new(PRODUCT)
}

pub fn product_info(symbol: &str) -> ProductInfo {
    ProductInfo {
        symbol: ProductId::new(symbol),
        price_precision: 1,
        quantity_precision: 1,
        min_quantity: qty("0.1"),
        owner: AccountId::new(OWNER),
        init_price: price("10.0"),
        delisting: false,
    }
}

pub struct Harness {
    pub engine: MatchingEngine,
    pub store: MemStore,
    pub ledger: InMemoryLedger,
    pub registry: InMemoryRegistry,
    pub height: i64,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_params(EngineParams::default())
    }

    pub fn with_params(params: EngineParams) -> Self {
        init_tracing();
        let mut registry = InMemoryRegistry::new();
        registry.add_product(product_info(PRODUCT));
        Self {
            engine: MatchingEngine::new(params).unwrap(),
            store: MemStore::new(),
            ledger: InMemoryLedger::new(),
            registry,
            height: 0,
        }
    }

    pub fn fund(&mut self, who: &str, denom: &str, amount: &str) {
        self.ledger
            .deposit(&AccountId::new(who), &Coin::new(denom, dec(amount)))
            .unwrap();
    }

    pub fn available(&self, who: &str, denom: &str) -> Decimal {
        self.ledger.available(&AccountId::new(who), denom)
    }

    pub fn begin_block(&mut self) {
        self.height += 1;
        self.engine.begin_block(&self.store).unwrap();
    }

    pub fn end_block(&mut self) {
        let mut ctx = BlockContext::new(
            self.height,
            self.height * 3,
            &mut self.store,
            &mut self.ledger,
            &mut self.registry,
        );
        self.engine.end_block(&mut ctx).unwrap();
    }

    /// Run an empty block
    pub fn skip_block(&mut self) {
        self.begin_block();
        self.end_block();
    }

    pub fn try_place_batch(&mut self, who: &str, items: &[(Side, &str, &str)]) -> Result<Vec<OrderResult>, EngineError> {
        let items: Vec<OrderItem> = items
            .iter()
            .map(|(side, p, q)| OrderItem::new(product(), *side, price(p), qty(q)))
            .collect();
        let mut ctx = BlockContext::new(
            self.height,
            self.height * 3,
            &mut self.store,
            &mut self.ledger,
            &mut self.registry,
        );
        self.engine.new_orders(&mut ctx, &AccountId::new(who), &items)
    }

    pub fn place_batch(&mut self, who: &str, items: &[(Side, &str, &str)]) -> Vec<OrderResult> {
        self.try_place_batch(who, items).unwrap()
    }

    pub fn place(&mut self, who: &str, side: Side, p: &str, q: &str) -> OrderResult {
        self.place_batch(who, &[(side, p, q)]).remove(0)
    }

    /// Place an order that must be accepted and return its id
    pub fn place_ok(&mut self, who: &str, side: Side, p: &str, q: &str) -> OrderId {
        let result = self.place(who, side, p, q);
        assert!(result.is_success(), "placement rejected: {}", result.message);
        result.order_id.unwrap()
    }

    pub fn cancel(&mut self, who: &str, ids: &[OrderId]) -> Result<Vec<OrderResult>, EngineError> {
        let mut ctx = BlockContext::new(
            self.height,
            self.height * 3,
            &mut self.store,
            &mut self.ledger,
            &mut self.registry,
        );
        self.engine.cancel_orders(&mut ctx, &AccountId::new(who), ids)
    }

    pub fn order(&self, id: &OrderId) -> Option<Order> {
        self.engine.order(&self.store, id).unwrap()
    }

    pub fn must_order(&self, id: &OrderId) -> Order {
        self.order(id).expect("order should be stored")
    }

    pub fn assert_invariants(&self) {
        self.engine.check_invariants(&self.store, &self.ledger).unwrap();
    }
}
