//! Billing and payroll rollups
//!
//! Pure read side: sums recorded interval durations for a calendar month and
//! multiplies by the user's hourly rate. Minutes accumulate as f64; monetary
//! totals round to 2 decimal places once, at the output edge. Queries report
//! whatever is durable now and never fail on provider trouble.

use sqlx::SqlitePool;
use tracing::warn;

use classtrack_common::{time, Result};

use crate::db;
use crate::models::{Identity, PayrollLine, StudentBilling, TutorPayroll, UserRole};

/// Round a monetary amount to 2 decimal places (final output step only)
fn round_amount(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

fn period_label(year: i32, month: u32) -> String {
    format!("{}-{:02}", year, month)
}

/// Billing/payroll aggregation service
#[derive(Clone)]
pub struct BillingService {
    pool: SqlitePool,
}

impl BillingService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Monthly billing for one student; NotFound when the id is unknown
    pub async fn student_billing(
        &self,
        student_id: i64,
        year: i32,
        month: u32,
    ) -> Result<StudentBilling> {
        let student = db::users::get_user(&self.pool, student_id, UserRole::Student).await?;
        let window = time::month_window(year, month)?;
        let total_minutes =
            db::intervals::sum_minutes(&self.pool, Identity::Student(student_id), window).await?;

        Ok(StudentBilling {
            student_id: student.id,
            student_name: student.full_name,
            student_email: student.email,
            total_minutes,
            hourly_rate: student.hourly_rate,
            total_amount: round_amount(total_minutes / 60.0 * student.hourly_rate),
            period: period_label(year, month),
        })
    }

    /// Monthly billing for every active student with activity in the month
    ///
    /// Students with zero recorded minutes are omitted: no zero-value noise
    /// in reports.
    pub async fn all_students_billing(&self, year: i32, month: u32) -> Result<Vec<StudentBilling>> {
        let window = time::month_window(year, month)?;
        let students = db::users::list_active(&self.pool, UserRole::Student).await?;

        let mut billings = Vec::new();
        for student in students {
            let total_minutes =
                match db::intervals::sum_minutes(&self.pool, Identity::Student(student.id), window)
                    .await
                {
                    Ok(minutes) => minutes,
                    Err(e) => {
                        warn!(student_id = student.id, "Billing query failed: {}", e);
                        continue;
                    }
                };
            if total_minutes <= 0.0 {
                continue;
            }
            billings.push(StudentBilling {
                student_id: student.id,
                student_name: student.full_name,
                student_email: student.email,
                total_minutes,
                hourly_rate: student.hourly_rate,
                total_amount: round_amount(total_minutes / 60.0 * student.hourly_rate),
                period: period_label(year, month),
            });
        }

        Ok(billings)
    }

    /// Monthly payroll for one tutor with a per-student breakdown
    pub async fn tutor_payroll(&self, tutor_id: i64, year: i32, month: u32) -> Result<TutorPayroll> {
        let tutor = db::users::get_user(&self.pool, tutor_id, UserRole::Tutor).await?;
        let window = time::month_window(year, month)?;
        let total_minutes =
            db::intervals::sum_minutes(&self.pool, Identity::Tutor(tutor_id), window).await?;

        let breakdown = db::intervals::tutor_student_breakdown(&self.pool, tutor_id, window).await?;
        let students = breakdown
            .into_iter()
            .map(|(student_id, student_name, student_email, minutes)| PayrollLine {
                student_id,
                student_name,
                student_email,
                total_minutes: minutes,
            })
            .collect();

        Ok(TutorPayroll {
            tutor_id: tutor.id,
            tutor_name: tutor.full_name,
            tutor_email: tutor.email,
            total_minutes,
            hourly_rate: tutor.hourly_rate,
            total_amount: round_amount(total_minutes / 60.0 * tutor.hourly_rate),
            period: period_label(year, month),
            students,
        })
    }

    /// Monthly payroll for every active tutor with activity in the month
    pub async fn all_tutors_payroll(&self, year: i32, month: u32) -> Result<Vec<TutorPayroll>> {
        let tutors = db::users::list_active(&self.pool, UserRole::Tutor).await?;

        let mut payrolls = Vec::new();
        for tutor in tutors {
            match self.tutor_payroll(tutor.id, year, month).await {
                Ok(payroll) if payroll.total_minutes > 0.0 => payrolls.push(payroll),
                Ok(_) => {}
                Err(e) => {
                    warn!(tutor_id = tutor.id, "Payroll query failed: {}", e);
                }
            }
        }

        Ok(payrolls)
    }
}
