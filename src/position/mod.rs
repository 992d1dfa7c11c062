//! Position model and ingestion boundary.
//!
//! Positions are owned by an external store; this core reads a fresh
//! snapshot each cycle through [`PositionSource`] and never writes back.

mod file;

pub use file::PortfolioFile;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Direction of a leveraged position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

/// A leveraged position snapshot as read from the external store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: String,
    /// Asset symbol, e.g. "BTC"
    pub asset: String,
    pub side: Side,
    pub entry_price: Decimal,
    pub current_price: Decimal,
    pub liquidation_price: Decimal,
    /// Notional size
    pub size: Decimal,
    /// Posted collateral
    pub collateral: Decimal,
    #[serde(default = "Utc::now")]
    pub last_updated: DateTime<Utc>,
}

/// Raised only at the ingestion boundary; metric computation never errors.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("position is missing required field '{0}'")]
    MissingField(&'static str),
    #[error("position {id}: size must be positive, got {size}")]
    NonPositiveSize { id: String, size: Decimal },
    #[error("position {id}: collateral must be positive, got {collateral}")]
    NonPositiveCollateral { id: String, collateral: Decimal },
}

impl Position {
    /// Validate a position at ingestion.
    ///
    /// Display and metric paths degrade to sentinels instead; this is the
    /// one place bad data is rejected outright.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::MissingField("id"));
        }
        if self.asset.trim().is_empty() {
            return Err(ValidationError::MissingField("asset"));
        }
        if self.size <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveSize {
                id: self.id.clone(),
                size: self.size,
            });
        }
        if self.collateral <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveCollateral {
                id: self.id.clone(),
                collateral: self.collateral,
            });
        }
        Ok(())
    }
}

/// Source of the current position snapshot, read fresh every cycle.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PositionSource: Send + Sync {
    async fn read_all(&self) -> anyhow::Result<Vec<Position>>;
}
