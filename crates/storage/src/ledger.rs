use chrono::NaiveDate;
use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite};
use tally_core::{LedgerEntry, LedgerUpdate, Money, ValidatedEntry};

use crate::db::{cents, DbPool};

const LEDGER_COLUMNS: &str = "id, email_id, email_subject, email_date, merchant_name, amount_cents, \
     date, category, description, receipt_text, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct LedgerRow {
    id: i64,
    email_id: Option<String>,
    email_subject: Option<String>,
    email_date: Option<String>,
    merchant_name: String,
    amount_cents: i64,
    date: NaiveDate,
    category: String,
    description: String,
    receipt_text: String,
    created_at: String,
    updated_at: String,
}

impl From<LedgerRow> for LedgerEntry {
    fn from(r: LedgerRow) -> Self {
        LedgerEntry {
            id: r.id,
            email_id: r.email_id,
            email_subject: r.email_subject,
            email_date: r.email_date,
            merchant_name: r.merchant_name,
            amount: Money::from_cents(r.amount_cents),
            date: r.date,
            category: r.category,
            description: r.description,
            receipt_text: r.receipt_text,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// Filters and paging for [`list_entries`]. `page` is 1-based.
#[derive(Debug, Clone)]
pub struct LedgerQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub page: u32,
    pub limit: u32,
}

impl Default for LedgerQuery {
    fn default() -> Self {
        Self {
            search: None,
            category: None,
            page: 1,
            limit: 50,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LedgerPage {
    pub entries: Vec<LedgerEntry>,
    /// Number of rows matching the filters, across all pages.
    pub total: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LedgerStats {
    pub total_entries: i64,
    pub total_amount: Money,
    pub unique_categories: i64,
    pub unique_merchants: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub count: i64,
    pub total_amount: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTotal {
    /// `YYYY-MM`
    pub month: String,
    pub count: i64,
    pub total_amount: Money,
}

pub async fn insert_entry(pool: &DbPool, entry: &ValidatedEntry) -> Result<LedgerEntry, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO ledger (
            email_id, email_subject, email_date, merchant_name,
            amount_cents, date, category, description, receipt_text
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&entry.email_id)
    .bind(&entry.email_subject)
    .bind(&entry.email_date)
    .bind(&entry.merchant_name)
    .bind(cents(entry.amount)?)
    .bind(entry.date)
    .bind(&entry.category)
    .bind(&entry.description)
    .bind(&entry.receipt_text)
    .execute(pool)
    .await?;

    get_entry(pool, result.last_insert_rowid())
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}

pub async fn get_entry(pool: &DbPool, id: i64) -> Result<Option<LedgerEntry>, sqlx::Error> {
    let row = sqlx::query_as::<_, LedgerRow>(&format!("SELECT {LEDGER_COLUMNS} FROM ledger WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(LedgerEntry::from))
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, query: &LedgerQuery) {
    qb.push(" WHERE 1=1");
    if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{search}%");
        qb.push(" AND (merchant_name LIKE ")
            .push_bind(pattern.clone())
            .push(" OR description LIKE ")
            .push_bind(pattern.clone())
            .push(" OR email_subject LIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(category) = query.category.as_deref().filter(|c| !c.is_empty()) {
        qb.push(" AND category = ").push_bind(category.to_string());
    }
}

/// Newest first by creation time.
pub async fn list_entries(pool: &DbPool, query: &LedgerQuery) -> Result<LedgerPage, sqlx::Error> {
    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM ledger");
    push_filters(&mut count, query);
    let (total,): (i64,) = count.build_query_as().fetch_one(pool).await?;

    let limit = i64::from(query.limit);
    let offset = i64::from(query.page.saturating_sub(1)) * limit;

    let mut select = QueryBuilder::<Sqlite>::new(format!("SELECT {LEDGER_COLUMNS} FROM ledger"));
    push_filters(&mut select, query);
    select
        .push(" ORDER BY created_at DESC, id DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);
    let rows: Vec<LedgerRow> = select.build_query_as().fetch_all(pool).await?;

    Ok(LedgerPage {
        entries: rows.into_iter().map(LedgerEntry::from).collect(),
        total,
    })
}

/// Replaces the editable fields. `None` if the id does not exist.
pub async fn update_entry(
    pool: &DbPool,
    id: i64,
    update: &LedgerUpdate,
) -> Result<Option<LedgerEntry>, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE ledger SET
            merchant_name = ?, amount_cents = ?, date = ?,
            category = ?, description = ?, updated_at = datetime('now')
        WHERE id = ?
        "#,
    )
    .bind(&update.merchant_name)
    .bind(cents(update.amount)?)
    .bind(update.date)
    .bind(&update.category)
    .bind(&update.description)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get_entry(pool, id).await
}

pub async fn delete_entry(pool: &DbPool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM ledger WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Empties the ledger and the email processing log together.
pub async fn clear_all(pool: &DbPool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM ledger").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM email_processing_log")
        .execute(&mut *tx)
        .await?;
    tx.commit().await
}

pub async fn ledger_stats(pool: &DbPool) -> Result<LedgerStats, sqlx::Error> {
    let (total_entries, total_cents, unique_categories, unique_merchants) =
        sqlx::query_as::<_, (i64, i64, i64, i64)>(
            r#"
            SELECT COUNT(*), COALESCE(SUM(amount_cents), 0),
                   COUNT(DISTINCT category), COUNT(DISTINCT merchant_name)
            FROM ledger
            "#,
        )
        .fetch_one(pool)
        .await?;

    Ok(LedgerStats {
        total_entries,
        total_amount: Money::from_cents(total_cents),
        unique_categories,
        unique_merchants,
    })
}

/// Largest spend first.
pub async fn category_totals(pool: &DbPool) -> Result<Vec<CategoryTotal>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (String, i64, i64)>(
        r#"
        SELECT category, COUNT(*), SUM(amount_cents) AS total
        FROM ledger
        GROUP BY category
        ORDER BY total DESC, category ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(category, count, cents)| CategoryTotal {
            category,
            count,
            total_amount: Money::from_cents(cents),
        })
        .collect())
}

/// The twelve most recent months with any entries, newest first.
pub async fn monthly_totals(pool: &DbPool) -> Result<Vec<MonthlyTotal>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (String, i64, i64)>(
        r#"
        SELECT strftime('%Y-%m', date) AS month, COUNT(*), SUM(amount_cents)
        FROM ledger
        GROUP BY month
        ORDER BY month DESC
        LIMIT 12
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(month, count, cents)| MonthlyTotal {
            month,
            count,
            total_amount: Money::from_cents(cents),
        })
        .collect())
}

/// Every entry, most recent purchase date first; the order the matching
/// engine scans candidates in.
pub async fn entries_for_reconciliation(pool: &DbPool) -> Result<Vec<LedgerEntry>, sqlx::Error> {
    let rows = sqlx::query_as::<_, LedgerRow>(&format!(
        "SELECT {LEDGER_COLUMNS} FROM ledger ORDER BY date DESC, id ASC"
    ))
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(LedgerEntry::from).collect())
}
