//! External collaborators of the engine
//!
//! The engine never owns balances or the product catalogue. It talks to a
//! `Ledger` for funds and a `ProductRegistry` for product metadata and the
//! per-product lock flag. In-memory implementations are provided for tests
//! and simulation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use types::account::{Balance, Coin, LockKind};
use types::errors::LedgerError;
use types::ids::{AccountId, ProductId};
use types::numeric::{Price, Quantity};

/// Token ledger with locked and available balances
pub trait Ledger {
    /// Move `coin` from available into the `kind` lock
    fn lock(&mut self, owner: &AccountId, coin: &Coin, kind: LockKind) -> Result<(), LedgerError>;

    /// Move `coin` from the `kind` lock back to available
    fn unlock(&mut self, owner: &AccountId, coin: &Coin, kind: LockKind) -> Result<(), LedgerError>;

    /// Settle one fill: consume `spent` from the owner's principal lock and
    /// credit `received` to the owner's available balance
    fn settle(&mut self, owner: &AccountId, spent: &Coin, received: &Coin) -> Result<(), LedgerError>;

    /// Move available funds between accounts
    fn transfer(&mut self, from: &AccountId, to: &AccountId, coin: &Coin) -> Result<(), LedgerError>;

    /// Move available funds of `from` to the fee collector
    fn collect_fee(&mut self, from: &AccountId, coin: &Coin) -> Result<(), LedgerError>;

    /// Sum of all `kind` locks per denomination
    fn locked_total(&self, kind: LockKind) -> BTreeMap<String, Decimal>;
}

/// Product metadata as reported by the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductInfo {
    pub symbol: ProductId,
    pub price_precision: u32,
    pub quantity_precision: u32,
    pub min_quantity: Quantity,
    /// Receives the trade fees of this product
    pub owner: AccountId,
    /// Reference price before the first trade
    pub init_price: Price,
    pub delisting: bool,
}

/// Product catalogue
pub trait ProductRegistry {
    fn get_product(&self, symbol: &ProductId) -> Option<ProductInfo>;

    fn is_locked(&self, symbol: &ProductId) -> bool;

    fn set_locked(&mut self, symbol: &ProductId, locked: bool);

    fn exists(&self, symbol: &ProductId) -> bool {
        self.get_product(symbol).is_some()
    }
}

/// Ledger held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    balances: BTreeMap<(AccountId, String), Balance>,
    fee_collector: BTreeMap<String, Decimal>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `coin` to the owner's available balance
    pub fn deposit(&mut self, owner: &AccountId, coin: &Coin) -> Result<(), LedgerError> {
        self.balance_mut(owner, &coin.denom).credit(coin.amount)
    }

    pub fn balance(&self, owner: &AccountId, denom: &str) -> Balance {
        self.balances
            .get(&(owner.clone(), denom.to_string()))
            .cloned()
            .unwrap_or_else(|| Balance::new(denom, Decimal::ZERO))
    }

    pub fn available(&self, owner: &AccountId, denom: &str) -> Decimal {
        self.balance(owner, denom).available
    }

    /// Fees gathered by the fee collector
    pub fn collected_fees(&self, denom: &str) -> Decimal {
        self.fee_collector.get(denom).copied().unwrap_or(Decimal::ZERO)
    }

    /// Sum of every balance and collected fee in `denom`
    pub fn supply(&self, denom: &str) -> Decimal {
        let held: Decimal = self
            .balances
            .iter()
            .filter(|((_, d), _)| d == denom)
            .map(|(_, balance)| balance.total())
            .sum();
        held + self.collected_fees(denom)
    }

    fn balance_mut(&mut self, owner: &AccountId, denom: &str) -> &mut Balance {
        self.balances
            .entry((owner.clone(), denom.to_string()))
            .or_insert_with(|| Balance::new(denom, Decimal::ZERO))
    }
}

impl Ledger for InMemoryLedger {
    fn lock(&mut self, owner: &AccountId, coin: &Coin, kind: LockKind) -> Result<(), LedgerError> {
        self.balance_mut(owner, &coin.denom).lock(coin.amount, kind)
    }

    fn unlock(&mut self, owner: &AccountId, coin: &Coin, kind: LockKind) -> Result<(), LedgerError> {
        self.balance_mut(owner, &coin.denom).unlock(coin.amount, kind)
    }

    fn settle(&mut self, owner: &AccountId, spent: &Coin, received: &Coin) -> Result<(), LedgerError> {
        self.balance_mut(owner, &spent.denom)
            .deduct_locked(spent.amount, LockKind::Quantity)?;
        self.balance_mut(owner, &received.denom).credit(received.amount)
    }

    fn transfer(&mut self, from: &AccountId, to: &AccountId, coin: &Coin) -> Result<(), LedgerError> {
        self.balance_mut(from, &coin.denom).deduct(coin.amount)?;
        self.balance_mut(to, &coin.denom).credit(coin.amount)
    }

    fn collect_fee(&mut self, from: &AccountId, coin: &Coin) -> Result<(), LedgerError> {
        self.balance_mut(from, &coin.denom).deduct(coin.amount)?;
        *self.fee_collector.entry(coin.denom.clone()).or_insert(Decimal::ZERO) += coin.amount;
        Ok(())
    }

    fn locked_total(&self, kind: LockKind) -> BTreeMap<String, Decimal> {
        let mut totals = BTreeMap::new();
        for ((_, denom), balance) in &self.balances {
            let locked = balance.locked(kind);
            if !locked.is_zero() {
                *totals.entry(denom.clone()).or_insert(Decimal::ZERO) += locked;
            }
        }
        totals
    }
}

/// Product registry held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryRegistry {
    products: BTreeMap<ProductId, ProductInfo>,
    locked: BTreeSet<ProductId>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_product(&mut self, info: ProductInfo) {
        self.products.insert(info.symbol.clone(), info);
    }

    /// Delist a product entirely
    pub fn remove_product(&mut self, symbol: &ProductId) -> Option<ProductInfo> {
        self.products.remove(symbol)
    }

    pub fn set_delisting(&mut self, symbol: &ProductId, delisting: bool) {
        if let Some(info) = self.products.get_mut(symbol) {
            info.delisting = delisting;
        }
    }
}

impl ProductRegistry for InMemoryRegistry {
    fn get_product(&self, symbol: &ProductId) -> Option<ProductInfo> {
        self.products.get(symbol).cloned()
    }

    fn is_locked(&self, symbol: &ProductId) -> bool {
        self.locked.contains(symbol)
    }

    fn set_locked(&mut self, symbol: &ProductId, locked: bool) {
        if locked {
            self.locked.insert(symbol.clone());
        } else {
            self.locked.remove(symbol);
        }
    }
}
