//! Uniswap v2 style `Sync` events as an observation source.
//!
//! A pair contract emits `Sync(reserve0, reserve1)` after every swap, mint
//! and burn. The spot price after the event is the reserve ratio scaled by
//! token decimals. Fetching and ABI-decoding the logs belongs to the node
//! adapter; this module starts from already decoded events.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use tracing::info;
use twap_oracle_types::Observation;

use crate::error::{OracleError, Result};
use crate::oracle::PriceOracle;

/// Token metadata needed to turn reserves into a price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairDetails {
    pub token0_decimals: u32,
    pub token1_decimals: u32,

    /// Quote token0 in token1 instead of token1 in token0
    pub reverse_token_order: bool,
}

impl PairDetails {
    pub fn new(token0_decimals: u32, token1_decimals: u32) -> Self {
        Self {
            token0_decimals,
            token1_decimals,
            reverse_token_order: false,
        }
    }

    pub fn reversed(mut self) -> Self {
        self.reverse_token_order = !self.reverse_token_order;
        self
    }

    /// Price of token0 in token1 (or the inverse when reversed).
    ///
    /// Returns `None` if either reserve is zero or does not fit a `Decimal`.
    pub fn price(&self, reserve0: u128, reserve1: u128) -> Option<Decimal> {
        let r0 = scaled(reserve0, self.token0_decimals)?;
        let r1 = scaled(reserve1, self.token1_decimals)?;

        if r0.is_zero() || r1.is_zero() {
            return None;
        }

        if self.reverse_token_order {
            r0.checked_div(r1)
        } else {
            r1.checked_div(r0)
        }
    }
}

fn scaled(raw: u128, decimals: u32) -> Option<Decimal> {
    let raw = i128::try_from(raw).ok()?;
    Decimal::try_from_i128_with_scale(raw, decimals).ok()
}

/// A decoded `Sync` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SyncEvent {
    pub block_number: u64,

    /// Timestamp of the block the event was emitted in
    pub timestamp: DateTime<Utc>,

    #[serde(deserialize_with = "reserve_from_json")]
    pub reserve0: u128,

    #[serde(deserialize_with = "reserve_from_json")]
    pub reserve1: u128,
}

impl SyncEvent {
    /// Convert to an observation tagged with the event's block.
    pub fn to_observation(&self, pair: &PairDetails) -> Result<Observation> {
        let price = pair
            .price(self.reserve0, self.reserve1)
            .ok_or(OracleError::InvalidReserves {
                block_number: self.block_number,
            })?;

        Ok(Observation::with_block(self.timestamp, price, self.block_number))
    }
}

/// Reserves are uint112 on chain, so JSON sources usually send them as strings.
fn reserve_from_json<'de, D>(deserializer: D) -> std::result::Result<u128, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
        Raw::Number(n) => Ok(u128::from(n)),
    }
}

/// Feed decoded `Sync` events into an oracle.
///
/// Events may arrive in any order, e.g. concatenated from block ranges that
/// were fetched concurrently. Returns the number of observations fed; stops
/// at the first event whose reserves cannot be priced.
pub fn feed_sync_events<I>(oracle: &mut PriceOracle, pair: &PairDetails, events: I) -> Result<usize>
where
    I: IntoIterator<Item = SyncEvent>,
{
    let mut fed = 0;
    let mut blocks: Option<(u64, u64)> = None;

    for event in events {
        oracle.feed_observation(event.to_observation(pair)?)?;
        fed += 1;

        blocks = Some(match blocks {
            Some((lo, hi)) => (lo.min(event.block_number), hi.max(event.block_number)),
            None => (event.block_number, event.block_number),
        });
    }

    if let Some((first, last)) = blocks {
        info!(
            "Fed {} sync events from blocks {}..={} ({} observations buffered)",
            fed,
            first,
            last,
            oracle.buffer_size()
        );
    }

    Ok(fed)
}
