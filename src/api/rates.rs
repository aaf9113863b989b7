use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use std::str::FromStr;

use crate::api::AppState;
use crate::domain::{Asset, Rate, TimeMs};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct RateQueryParams {
    /// `TYPE:SYMBOL`, e.g. `CRYPTO:BTC`.
    pub asset: String,
    /// Epoch milliseconds, RFC 3339 or `YYYY-MM-DD`. Omitted means now.
    pub at: Option<String>,
}

pub async fn get_rate(
    Query(params): Query<RateQueryParams>,
    State(state): State<AppState>,
) -> Result<Json<Rate>, AppError> {
    let asset = Asset::from_str(&params.asset).map_err(|e| AppError::BadRequest(e.to_string()))?;
    let at = params.at.as_deref().map(parse_time).transpose()?;

    Ok(Json(state.resolver.get_rate_usd(&asset, at).await))
}

/// Accept epoch milliseconds or an ISO date/time.
pub(crate) fn parse_time(raw: &str) -> Result<TimeMs, AppError> {
    let raw = raw.trim();
    let parsed = match raw.parse::<i64>() {
        Ok(ms) => TimeMs::checked(ms),
        Err(_) => TimeMs::parse_iso(raw),
    };
    parsed.ok_or_else(|| AppError::BadRequest(format!("invalid timestamp: {}", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time_accepts_ms_and_iso() {
        assert_eq!(parse_time("1700000000000").unwrap(), TimeMs::new(1_700_000_000_000));
        assert_eq!(parse_time("1970-01-02").unwrap(), TimeMs::new(86_400_000));
        assert!(matches!(parse_time("yesterday"), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_parse_time_rejects_unrepresentable_ms() {
        assert!(matches!(
            parse_time("99999999999999999"),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            parse_time("-99999999999999999"),
            Err(AppError::BadRequest(_))
        ));
        assert_eq!(parse_time("-86400000").unwrap(), TimeMs::new(-86_400_000));
    }
}
