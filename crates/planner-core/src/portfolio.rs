//! Portfolio snapshot model
//!
//! A [`PortfolioSnapshot`] is built fresh for every analysis request and is
//! read-only inside the engine. Market values and totals are derived on
//! demand and never stored.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use tracing::debug;

use crate::error::{Error, Result};

fn default_price() -> f64 {
    100.0
}

/// Tax treatment of an account
///
/// Anything other than `taxable` and `tax_deferred` is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AccountType {
    #[default]
    Taxable,
    TaxDeferred,
    Other(String),
}

impl AccountType {
    /// The account type tag as it appears in input data
    pub fn as_str(&self) -> &str {
        match self {
            AccountType::Taxable => "taxable",
            AccountType::TaxDeferred => "tax_deferred",
            AccountType::Other(tag) => tag,
        }
    }

    /// Only `taxable` accounts count as taxable; every other tag is sheltered
    pub fn is_taxable(&self) -> bool {
        matches!(self, AccountType::Taxable)
    }
}

impl From<String> for AccountType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "taxable" => AccountType::Taxable,
            "tax_deferred" => AccountType::TaxDeferred,
            _ => AccountType::Other(tag),
        }
    }
}

impl From<&str> for AccountType {
    fn from(tag: &str) -> Self {
        AccountType::from(tag.to_string())
    }
}

impl From<AccountType> for String {
    fn from(account_type: AccountType) -> Self {
        match account_type {
            AccountType::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Insertion-ordered `key -> percent` map
///
/// Percentages are on a 0-100 scale. Iteration follows insertion order (JSON
/// document order when deserialized), which keeps every tie-break that
/// depends on encounter order deterministic. Missing keys read as 0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AllocationMap {
    entries: Vec<(String, f64)>,
}

impl AllocationMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Value for `key`, or 0 when absent
    pub fn get(&self, key: &str) -> f64 {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map_or(0.0, |(_, v)| *v)
    }

    /// Set `key` to `value`, keeping the position of an existing key
    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Add `amount` to `key`, inserting it at the end if absent
    pub fn add(&mut self, key: &str, amount: f64) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 += amount,
            None => self.entries.push((key.to_string(), amount)),
        }
    }

    /// Iterate entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Sum of all values
    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, v)| v).sum()
    }

    /// The first entry holding the largest value
    pub fn largest(&self) -> Option<(&str, f64)> {
        self.iter().fold(None, |best, (key, value)| match best {
            Some((_, best_value)) if value <= best_value => best,
            _ => Some((key, value)),
        })
    }

    /// Apply `f` to every value, keeping keys and order
    pub fn map_values(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            entries: self.entries.iter().map(|(k, v)| (k.clone(), f(*v))).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for AllocationMap {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut map = AllocationMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl Serialize for AllocationMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

struct AllocationMapVisitor;

impl<'de> Visitor<'de> for AllocationMapVisitor {
    type Value = AllocationMap;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a map of allocation keys to numeric percentages")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Self::Value, A::Error> {
        let mut map = AllocationMap::new();
        while let Some((key, value)) = access.next_entry::<String, f64>()? {
            map.insert(key, value);
        }
        Ok(map)
    }
}

impl<'de> Deserialize<'de> for AllocationMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(AllocationMapVisitor)
    }
}

/// Market data and breakdowns for a held instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default = "default_price")]
    pub current_price: f64,

    /// Asset class -> percent (`equity`, `fixed_income`, `real_estate`, `commodities`)
    #[serde(default)]
    pub allocation_asset_class: AllocationMap,

    /// Sector -> percent
    #[serde(default)]
    pub allocation_sectors: AllocationMap,

    /// Region -> percent
    #[serde(default)]
    pub allocation_regions: AllocationMap,
}

impl Default for Instrument {
    fn default() -> Self {
        Self {
            name: None,
            current_price: default_price(),
            allocation_asset_class: AllocationMap::new(),
            allocation_sectors: AllocationMap::new(),
            allocation_regions: AllocationMap::new(),
        }
    }
}

/// A holding of one instrument within an account
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    #[serde(default)]
    pub symbol: String,

    #[serde(default)]
    pub quantity: f64,

    /// Cost per unit
    #[serde(default)]
    pub cost_basis: f64,

    #[serde(default)]
    pub instrument: Instrument,
}

impl Position {
    /// `quantity * current_price`
    pub fn market_value(&self) -> f64 {
        self.quantity * self.instrument.current_price
    }

    /// `quantity * cost_basis`
    pub fn total_cost(&self) -> f64 {
        self.quantity * self.cost_basis
    }

    /// Instrument name, falling back to the symbol
    pub fn display_name(&self) -> &str {
        self.instrument.name.as_deref().unwrap_or(&self.symbol)
    }
}

/// A brokerage or retirement account
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Account {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub account_type: AccountType,

    #[serde(default)]
    pub cash_balance: f64,

    #[serde(default)]
    pub positions: Vec<Position>,
}

/// Point-in-time view of every account a user holds
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    #[serde(default)]
    pub accounts: Vec<Account>,
}

impl PortfolioSnapshot {
    /// Create a snapshot from accounts
    pub fn new(accounts: Vec<Account>) -> Self {
        Self { accounts }
    }

    /// Parse and validate a snapshot from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Self = serde_json::from_str(json)
            .map_err(|e| Error::Validation(format!("Invalid portfolio snapshot: {e}")))?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Convert and validate a snapshot from a JSON value
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let snapshot: Self = serde_json::from_value(value)
            .map_err(|e| Error::Validation(format!("Invalid portfolio snapshot: {e}")))?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Every `(account, position)` pair in snapshot order
    pub fn holdings(&self) -> impl Iterator<Item = (&Account, &Position)> {
        self.accounts
            .iter()
            .flat_map(|account| account.positions.iter().map(move |position| (account, position)))
    }

    /// Sum of all cash balances
    pub fn available_cash(&self) -> f64 {
        self.accounts.iter().map(|a| a.cash_balance).sum()
    }

    /// Cash plus the market value of every position
    pub fn total_value(&self) -> f64 {
        self.accounts
            .iter()
            .map(|account| {
                account.cash_balance
                    + account.positions.iter().map(Position::market_value).sum::<f64>()
            })
            .sum()
    }

    /// [`total_value`](Self::total_value), failing with
    /// [`Error::AnalysisFailed`] when the sum overflows
    pub fn checked_total_value(&self) -> Result<f64> {
        crate::numeric::ensure_finite("portfolio total value", self.total_value())
    }

    /// Number of positions across all accounts
    pub fn position_count(&self) -> usize {
        self.accounts.iter().map(|a| a.positions.len()).sum()
    }

    /// Reject non-finite numbers and negative amounts, prices or percentages
    pub fn validate(&self) -> Result<()> {
        for (i, account) in self.accounts.iter().enumerate() {
            let prefix = format!("accounts[{i}]");
            check_amount(&format!("{prefix}.cash_balance"), account.cash_balance)?;

            for (j, position) in account.positions.iter().enumerate() {
                let prefix = format!("{prefix}.positions[{j}]");
                check_amount(&format!("{prefix}.quantity"), position.quantity)?;
                check_amount(&format!("{prefix}.cost_basis"), position.cost_basis)?;

                let instrument = &position.instrument;
                check_amount(&format!("{prefix}.instrument.current_price"), instrument.current_price)?;
                for (label, map) in [
                    ("allocation_asset_class", &instrument.allocation_asset_class),
                    ("allocation_sectors", &instrument.allocation_sectors),
                    ("allocation_regions", &instrument.allocation_regions),
                ] {
                    for (key, pct) in map.iter() {
                        check_amount(&format!("{prefix}.instrument.{label}.{key}"), pct)?;
                    }
                }
            }
        }

        debug!(
            accounts = self.accounts.len(),
            positions = self.position_count(),
            "Validated portfolio snapshot"
        );
        Ok(())
    }
}

fn check_amount(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(Error::invalid_field(field, "must be a finite number"));
    }
    if value < 0.0 {
        return Err(Error::invalid_field(field, "must be non-negative"));
    }
    Ok(())
}
