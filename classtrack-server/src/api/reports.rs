//! Billing and payroll report endpoints

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{Datelike, Utc};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::models::{StudentBilling, TutorPayroll};
use crate::AppState;

/// Month selector shared by all report endpoints. Defaults to the current
/// UTC month when omitted.
#[derive(Debug, Deserialize)]
pub struct MonthQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

impl MonthQuery {
    fn resolve(&self) -> (i32, u32) {
        let now = Utc::now();
        (
            self.year.unwrap_or_else(|| now.year()),
            self.month.unwrap_or_else(|| now.month()),
        )
    }
}

/// GET /reports/billing/:student_id?year=&month=
pub async fn student_billing(
    State(state): State<AppState>,
    Path(student_id): Path<i64>,
    Query(query): Query<MonthQuery>,
) -> ApiResult<Json<StudentBilling>> {
    let (year, month) = query.resolve();
    let billing = state.billing.student_billing(student_id, year, month).await?;
    Ok(Json(billing))
}

/// GET /reports/billing?year=&month=
///
/// Billing for every active student with a nonzero total in the month.
pub async fn all_billing(
    State(state): State<AppState>,
    Query(query): Query<MonthQuery>,
) -> ApiResult<Json<Vec<StudentBilling>>> {
    let (year, month) = query.resolve();
    let billing = state.billing.all_students_billing(year, month).await?;
    Ok(Json(billing))
}

/// GET /reports/payroll/:tutor_id?year=&month=
pub async fn tutor_payroll(
    State(state): State<AppState>,
    Path(tutor_id): Path<i64>,
    Query(query): Query<MonthQuery>,
) -> ApiResult<Json<TutorPayroll>> {
    let (year, month) = query.resolve();
    let payroll = state.billing.tutor_payroll(tutor_id, year, month).await?;
    Ok(Json(payroll))
}

/// GET /reports/payroll?year=&month=
pub async fn all_payroll(
    State(state): State<AppState>,
    Query(query): Query<MonthQuery>,
) -> ApiResult<Json<Vec<TutorPayroll>>> {
    let (year, month) = query.resolve();
    let payroll = state.billing.all_tutors_payroll(year, month).await?;
    Ok(Json(payroll))
}

/// Build report routes
pub fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/reports/billing", get(all_billing))
        .route("/reports/billing/:student_id", get(student_billing))
        .route("/reports/payroll", get(all_payroll))
        .route("/reports/payroll/:tutor_id", get(tutor_payroll))
}
