//! One-shot startup reconciliation for legacy accounts.
//!
//! Paid accounts created before billing history existed have no history rows.
//! This inserts a single backfill row for each of them. It runs once per
//! process start and is not part of steady-state convergence.

use anyhow::Result;
use sqlx::PgPool;
use tracing::info;

pub const BACKFILL_DESCRIPTION: &str = "Backfilled record for legacy paid account";

/// Returns the number of accounts backfilled. Safe to run repeatedly.
pub async fn backfill_billing_history(pool: &PgPool) -> Result<u64> {
    let result = sqlx::query(
        r#"
        INSERT INTO billing_history (id, profile_id, plan, amount_cents, description)
        SELECT gen_random_uuid(), p.id, p.plan, 0, $1
        FROM profiles p
        WHERE p.plan IS NOT NULL
          AND p.plan <> 'free'
          AND NOT EXISTS (
              SELECT 1 FROM billing_history b WHERE b.profile_id = p.id
          )
        "#,
    )
    .bind(BACKFILL_DESCRIPTION)
    .execute(pool)
    .await?;

    let backfilled = result.rows_affected();
    info!("Billing history backfill complete: {backfilled} account(s) reconciled");
    Ok(backfilled)
}
