use axum::Json;
use serde::{Deserialize, Serialize};

use crate::domain::CashFlow;
use crate::engine::returns::{total_deposited, total_withdrawn};
use crate::engine::{annualize_rate, calculate_irr, calculate_irr_based_apr, calculate_roi};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IrrRequest {
    pub cash_flows: Vec<CashFlow>,
    /// Defaults to the last cash flow's offset.
    pub total_days: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IrrResponse {
    pub irr: f64,
    pub apr_pct: f64,
    pub roi_pct: f64,
    /// Simple ROI compounded over a year.
    pub annualized_roi_pct: f64,
    pub total_deposited: f64,
    pub total_withdrawn: f64,
    pub total_days: f64,
}

pub async fn compute_irr(Json(body): Json<IrrRequest>) -> Result<Json<IrrResponse>, AppError> {
    if body
        .cash_flows
        .iter()
        .any(|cf| !cf.amount.is_finite() || !cf.days_from_start.is_finite() || cf.days_from_start < 0.0)
    {
        return Err(AppError::BadRequest(
            "cash flows need finite amounts and non-negative day offsets".into(),
        ));
    }

    let total_days = body.total_days.unwrap_or_else(|| {
        body.cash_flows
            .iter()
            .map(|cf| cf.days_from_start)
            .fold(0.0, f64::max)
    });
    let deposited = total_deposited(&body.cash_flows);
    let withdrawn = total_withdrawn(&body.cash_flows);
    let roi_pct = calculate_roi(withdrawn - deposited, deposited);

    Ok(Json(IrrResponse {
        irr: calculate_irr(&body.cash_flows),
        apr_pct: calculate_irr_based_apr(&body.cash_flows, total_days, roi_pct / 100.0),
        roi_pct,
        annualized_roi_pct: annualize_rate(roi_pct / 100.0, total_days),
        total_deposited: deposited,
        total_withdrawn: withdrawn,
        total_days,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_one_year_twenty_percent() {
        let body = IrrRequest {
            cash_flows: vec![CashFlow::new(-1000.0, 0.0), CashFlow::new(1200.0, 365.0)],
            total_days: None,
        };
        let Json(resp) = compute_irr(Json(body)).await.unwrap();
        assert!((resp.irr - 0.2).abs() < 1e-9);
        assert!((resp.apr_pct - 20.0).abs() < 1e-6);
        assert!((resp.roi_pct - 20.0).abs() < 1e-9);
        assert_eq!(resp.total_days, 365.0);
    }

    #[tokio::test]
    async fn test_rejects_negative_offsets() {
        let body = IrrRequest {
            cash_flows: vec![CashFlow::new(-1000.0, -1.0)],
            total_days: None,
        };
        assert!(matches!(
            compute_irr(Json(body)).await,
            Err(AppError::BadRequest(_))
        ));
    }
}
