use tally_core::{ComparisonSummary, Money, ReconciliationRecord};

use crate::db::{cents, DbPool};

type HistoryRow = (i64, String, i64, i64, i64, i64, i64, i64);

/// Appends a reconciliation summary and returns its id.
pub async fn save_summary(pool: &DbPool, summary: &ComparisonSummary) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO reconciliation_history (
            total_matches, total_ledger_only, total_bank_only,
            total_matched_cents, total_ledger_cents, total_bank_cents
        ) VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(summary.total_matches)
    .bind(summary.total_ledger_only)
    .bind(summary.total_bank_only)
    .bind(cents(summary.total_matched_amount)?)
    .bind(cents(summary.total_ledger_amount)?)
    .bind(cents(summary.total_bank_amount)?)
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

/// Newest first.
pub async fn list_history(pool: &DbPool, limit: i64) -> Result<Vec<ReconciliationRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, HistoryRow>(
        r#"
        SELECT id, created_at, total_matches, total_ledger_only, total_bank_only,
               total_matched_cents, total_ledger_cents, total_bank_cents
        FROM reconciliation_history
        ORDER BY created_at DESC, id DESC
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| ReconciliationRecord {
            id: r.0,
            created_at: r.1,
            total_matches: r.2,
            total_ledger_only: r.3,
            total_bank_only: r.4,
            total_matched_amount: Money::from_cents(r.5),
            total_ledger_amount: Money::from_cents(r.6),
            total_bank_amount: Money::from_cents(r.7),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect;

    #[tokio::test]
    async fn saved_summaries_are_listed_newest_first() {
        let pool = connect("sqlite::memory:").await.unwrap();
        assert!(list_history(&pool, 50).await.unwrap().is_empty());

        let first = save_summary(
            &pool,
            &ComparisonSummary {
                total_matches: 1,
                total_matched_amount: Money::from_cents(1598),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let second = save_summary(
            &pool,
            &ComparisonSummary {
                total_bank_only: 2,
                total_bank_amount: Money::from_cents(5599),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(second > first);

        let records = list_history(&pool, 50).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, second);
        assert_eq!(records[0].total_bank_only, 2);
        assert_eq!(records[0].total_bank_amount, Money::from_cents(5599));
        assert_eq!(records[1].total_matches, 1);
        assert_eq!(records[1].total_matched_amount, Money::from_cents(1598));

        assert_eq!(list_history(&pool, 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn oversized_total_is_an_encode_error() {
        let pool = connect("sqlite::memory:").await.unwrap();
        let summary = ComparisonSummary {
            total_bank_amount: "100000000000000000".parse().unwrap(),
            ..Default::default()
        };
        assert!(matches!(save_summary(&pool, &summary).await, Err(sqlx::Error::Encode(_))));
        assert!(list_history(&pool, 50).await.unwrap().is_empty());
    }
}
