//! JSON portfolio document source.
//!
//! Reads the full position set from a portfolio file on every cycle, so
//! edits land on the next tick without a restart. Entries that fail
//! ingestion validation are logged and skipped rather than failing the
//! whole read.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{Position, PositionSource};

/// Portfolio document layout: `{ "positions": [ ... ] }`.
#[derive(Debug, Deserialize)]
struct PortfolioDocument {
    positions: Vec<Position>,
}

/// Position source backed by a JSON portfolio file.
pub struct PortfolioFile {
    path: PathBuf,
}

impl PortfolioFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl PositionSource for PortfolioFile {
    async fn read_all(&self) -> anyhow::Result<Vec<Position>> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        let document: PortfolioDocument = serde_json::from_str(&raw)?;

        let total = document.positions.len();
        let positions: Vec<Position> = document
            .positions
            .into_iter()
            .filter(|pos| match pos.validate() {
                Ok(()) => true,
                Err(e) => {
                    warn!(position_id = %pos.id, error = %e, "Skipping invalid portfolio entry");
                    false
                }
            })
            .collect();

        debug!(
            path = %self.path.display(),
            loaded = positions.len(),
            skipped = total - positions.len(),
            "Portfolio snapshot loaded"
        );

        Ok(positions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reads_positions_and_skips_invalid() {
        let dir = std::env::temp_dir().join("sentinel-portfolio-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("portfolio.json");
        std::fs::write(
            &path,
            r#"{
                "positions": [
                    {
                        "id": "pos-1", "asset": "BTC", "side": "Long",
                        "entry_price": "100", "current_price": "90",
                        "liquidation_price": "50", "size": "10", "collateral": "1000"
                    },
                    {
                        "id": "pos-2", "asset": "ETH", "side": "Short",
                        "entry_price": "200", "current_price": "210",
                        "liquidation_price": "260", "size": "0", "collateral": "500"
                    }
                ]
            }"#,
        )
        .unwrap();

        let source = PortfolioFile::new(&path);
        let positions = source.read_all().await.unwrap();

        // pos-2 has size 0 and is dropped at the ingestion boundary
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].id, "pos-1");
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let source = PortfolioFile::new("/nonexistent/portfolio.json");
        assert!(source.read_all().await.is_err());
    }
}
