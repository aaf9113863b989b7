//! Persisted rate cache operations for the repository.

use crate::domain::{Decimal, Rate, RateSource, TimeMs};
use chrono::NaiveDate;
use sqlx::Row;

use super::{asset_from_row, decimal_column, decode_error, Repository};

impl Repository {
    pub async fn get_cached_rate(&self, cache_key: &str) -> Result<Option<Rate>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT asset_type, symbol, day, rate_usd, source FROM rate_cache WHERE cache_key = ?",
        )
        .bind(cache_key)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let day: String = row.try_get("day")?;
        let day = NaiveDate::parse_from_str(&day, "%Y-%m-%d")
            .map_err(|e| decode_error("day", e.to_string()))?;
        let rate_usd: Decimal = decimal_column(&row, "rate_usd")?;
        let source: String = row.try_get("source")?;

        Ok(Some(Rate::new(
            asset_from_row(&row)?,
            rate_usd,
            day,
            RateSource::from(source),
        )))
    }

    /// Store a resolved rate under `cache_key`. The first rate stored for a
    /// key is kept.
    pub async fn save_rate(&self, rate: &Rate, cache_key: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO rate_cache (cache_key, asset_type, symbol, day, rate_usd, source, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(cache_key) DO NOTHING
            "#,
        )
        .bind(cache_key)
        .bind(rate.asset.asset_type.as_str())
        .bind(rate.asset.symbol.as_str())
        .bind(rate.day.format("%Y-%m-%d").to_string())
        .bind(rate.rate_usd.to_canonical_string())
        .bind(rate.source.as_str())
        .bind(TimeMs::now().as_ms())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
