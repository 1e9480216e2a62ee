//! Read-only reference prices.
//!
//! The ledger asks a [`PriceSource`] for prices only when reporting; no
//! balance or cap check depends on one.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::primitives::Asset;

/// A price quoted in canonical units per whole unit of the asset, as a
/// fixed-point integer with `decimals` fractional digits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Fixed-point mantissa.
    #[serde(with = "crate::primitives::amount_str")]
    pub value: u128,
    /// Fractional digits in `value`.
    pub decimals: u8,
}

impl Price {
    /// Builds a price.
    pub fn new(value: u128, decimals: u8) -> Self {
        Self { value, decimals }
    }
}

/// Why a price could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriceError {
    /// The source has no feed for this asset.
    #[error("no price feed for {0}")]
    NoFeed(Asset),

    /// The feed exists but its answer is unusable.
    #[error("stale or invalid price: {0}")]
    Invalid(String),
}

/// Supplies an asset's latest reference price.
pub trait PriceSource: Send + Sync {
    /// Latest price for `asset`.
    fn latest_price(&self, asset: &Asset) -> Result<Price, PriceError>;
}

/// Prices kept in memory and set by hand.
#[derive(Debug, Default)]
pub struct StaticPriceSource {
    prices: RwLock<HashMap<Asset, Price>>,
}

impl StaticPriceSource {
    /// Creates a source with no feeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets or replaces the price of `asset`.
    pub fn set_price(&self, asset: Asset, price: Price) {
        self.prices.write().insert(asset, price);
    }

    /// Drops the feed for `asset`.
    pub fn clear_price(&self, asset: &Asset) {
        self.prices.write().remove(asset);
    }
}

impl PriceSource for StaticPriceSource {
    fn latest_price(&self, asset: &Asset) -> Result<Price, PriceError> {
        let price = self
            .prices
            .read()
            .get(asset)
            .copied()
            .ok_or(PriceError::NoFeed(*asset))?;
        if price.value == 0 {
            return Err(PriceError::Invalid(format!("zero price for {asset}")));
        }
        Ok(price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_feed_is_an_error() {
        let source = StaticPriceSource::new();
        assert_eq!(
            source.latest_price(&Asset::Native),
            Err(PriceError::NoFeed(Asset::Native))
        );
    }

    #[test]
    fn set_and_clear() {
        let source = StaticPriceSource::new();
        source.set_price(Asset::Native, Price::new(200_000_000_000, 8));
        assert_eq!(
            source.latest_price(&Asset::Native).unwrap(),
            Price::new(200_000_000_000, 8)
        );
        source.clear_price(&Asset::Native);
        assert!(source.latest_price(&Asset::Native).is_err());
    }

    #[test]
    fn zero_price_is_invalid() {
        let source = StaticPriceSource::new();
        source.set_price(Asset::Native, Price::new(0, 8));
        assert!(matches!(
            source.latest_price(&Asset::Native),
            Err(PriceError::Invalid(_))
        ));
    }
}
