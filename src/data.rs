//! Price series input
//!
//! Builds synthetic price paths for backtesting an exit plan and loads
//! recorded price paths from CSV files.

use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;
use tracing::info;

// =============================================================================
// Synthetic paths
// =============================================================================

/// Ticks in the default rising path (entry up to +34%)
pub const RISING_TICKS: usize = 35;

/// Ticks in the default falling path (entry down to -9%)
pub const FALLING_TICKS: usize = 10;

/// `ticks` prices starting at `start`, moving `step_pct` percent of `start`
/// per tick: `start * (1 + i * step_pct / 100)`
pub fn linear_path(start: f64, step_pct: f64, ticks: usize) -> Vec<f64> {
    (0..ticks)
        .map(|i| start * (1.0 + i as f64 * step_pct / 100.0))
        .collect()
}

/// Price climbing 1% of entry per tick
pub fn rising_path(entry_price: f64) -> Vec<f64> {
    linear_path(entry_price, 1.0, RISING_TICKS)
}

/// Price dropping 1% of entry per tick
pub fn falling_path(entry_price: f64) -> Vec<f64> {
    linear_path(entry_price, -1.0, FALLING_TICKS)
}

// =============================================================================
// CSV Data Loading
// =============================================================================

/// Load a price path from a CSV file
pub fn load_prices_csv(path: impl AsRef<Path>) -> Result<Vec<f64>> {
    let file = std::fs::File::open(path.as_ref())
        .with_context(|| format!("Failed to open CSV file {}", path.as_ref().display()))?;
    let prices = read_prices(file)?;
    info!(
        "Loaded {} prices from {}",
        prices.len(),
        path.as_ref().display()
    );
    Ok(prices)
}

/// Read prices from CSV with a header row.
///
/// Uses the `close` column if present, otherwise `price`, otherwise the
/// first column.
pub fn read_prices<R: Read>(source: R) -> Result<Vec<f64>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(source);

    let headers = reader.headers().context("Failed to read CSV header")?.clone();
    let column = ["close", "price"]
        .iter()
        .find_map(|name| headers.iter().position(|h| h.eq_ignore_ascii_case(name)))
        .unwrap_or(0);

    let mut prices = Vec::new();

    for (row_idx, result) in reader.records().enumerate() {
        let record = result.context(format!("Failed to read row {}", row_idx + 1))?;

        let raw = record
            .get(column)
            .context(format!("Missing price column in row {}", row_idx + 1))?;
        let price: f64 = raw
            .parse()
            .context(format!("Failed to parse price '{}' in row {}", raw, row_idx + 1))?;

        prices.push(price);
    }

    Ok(prices)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_rising_path() {
        let path = rising_path(36.0);
        assert_eq!(path.len(), 35);
        assert_eq!(path[0], 36.0);
        assert_abs_diff_eq!(path[10], 39.6, epsilon = 1e-9);
        assert_abs_diff_eq!(path[34], 36.0 * 1.34, epsilon = 1e-9);
    }

    #[test]
    fn test_falling_path() {
        let path = falling_path(100.0);
        assert_eq!(path.len(), 10);
        assert_abs_diff_eq!(path[9], 91.0, epsilon = 1e-9);
    }

    #[test]
    fn test_read_prices_prefers_close_column() {
        let csv = "datetime,open,high,low,close,volume\n\
                   2024-01-01 00:00:00,1,2,0.5,1.5,10\n\
                   2024-01-02 00:00:00,1.5,2.5,1,2.0,12\n";
        let prices = read_prices(csv.as_bytes()).unwrap();
        assert_eq!(prices, vec![1.5, 2.0]);
    }

    #[test]
    fn test_read_prices_single_column() {
        let csv = "value\n36\n 36.5 \n37\n";
        let prices = read_prices(csv.as_bytes()).unwrap();
        assert_eq!(prices, vec![36.0, 36.5, 37.0]);
    }

    #[test]
    fn test_read_prices_reports_bad_row() {
        let csv = "price\n36\nabc\n";
        let err = read_prices(csv.as_bytes()).unwrap_err();
        assert!(format!("{:#}", err).contains("row 2"));
    }
}
