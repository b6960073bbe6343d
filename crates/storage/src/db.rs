use std::path::Path;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};

use arbiter_core::{AccountCode, BankTransaction, InvoiceCandidate, InvoiceStatus, TenantId};
use arbiter_engine::{AmountProfile, CandidateSource, HistoricalMatch, SourceError};

pub type DbPool = Pool<Sqlite>;

pub async fn create_db(path: &Path) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS invoices (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            number TEXT NOT NULL,
            counterparty TEXT NOT NULL,
            total_cents INTEGER NOT NULL,
            allocated_cents INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL,
            issued_on TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_invoices_tenant_status ON invoices(tenant_id, status)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS categorized_transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id TEXT NOT NULL,
            payee TEXT NOT NULL,
            account_code TEXT NOT NULL,
            account_name TEXT NOT NULL,
            amount_cents INTEGER NOT NULL,
            categorized_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_categorized_tenant_payee ON categorized_transactions(tenant_id, payee)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

fn status_str(status: InvoiceStatus) -> &'static str {
    match status {
        InvoiceStatus::Draft => "Draft",
        InvoiceStatus::Sent => "Sent",
        InvoiceStatus::PartiallyPaid => "PartiallyPaid",
        InvoiceStatus::Paid => "Paid",
        InvoiceStatus::Overdue => "Overdue",
        InvoiceStatus::Voided => "Voided",
    }
}

fn parse_status(status: &str) -> InvoiceStatus {
    match status {
        "Draft" => InvoiceStatus::Draft,
        "Sent" => InvoiceStatus::Sent,
        "PartiallyPaid" => InvoiceStatus::PartiallyPaid,
        "Paid" => InvoiceStatus::Paid,
        "Overdue" => InvoiceStatus::Overdue,
        // Unknown states are treated as voided so they never match.
        _ => InvoiceStatus::Voided,
    }
}

pub async fn insert_invoice(
    pool: &DbPool,
    tenant: &TenantId,
    invoice: &InvoiceCandidate,
    issued_on: NaiveDate,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO invoices (id, tenant_id, number, counterparty, total_cents, allocated_cents, status, issued_on) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&invoice.id)
    .bind(&tenant.0)
    .bind(&invoice.number)
    .bind(&invoice.counterparty)
    .bind(invoice.total_cents)
    .bind(invoice.allocated_cents)
    .bind(status_str(invoice.status))
    .bind(issued_on.to_string())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn insert_categorized(
    pool: &DbPool,
    tenant: &TenantId,
    payee: &str,
    account_code: &str,
    account_name: &str,
    amount_cents: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO categorized_transactions (tenant_id, payee, account_code, account_name, amount_cents) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&tenant.0)
    .bind(payee)
    .bind(account_code)
    .bind(account_name)
    .bind(amount_cents)
    .execute(pool)
    .await?;
    Ok(())
}

/// Lifecycle-eligible invoices for the tenant: open status, strictly
/// positive outstanding. Ordered by issue date then id, which is the
/// source order the matcher's stable sort preserves for equal scores.
pub async fn open_invoices(
    pool: &DbPool,
    tenant: &TenantId,
) -> Result<Vec<InvoiceCandidate>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (String, String, String, i64, i64, String)>(
        r#"
        SELECT id, number, counterparty, total_cents, allocated_cents, status
        FROM invoices
        WHERE tenant_id = ?
          AND status IN ('Sent', 'PartiallyPaid', 'Overdue')
          AND total_cents - allocated_cents > 0
        ORDER BY issued_on, id
        "#,
    )
    .bind(&tenant.0)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| InvoiceCandidate {
            id: r.0,
            number: r.1,
            counterparty: r.2,
            total_cents: r.3,
            allocated_cents: r.4,
            status: parse_status(&r.5),
        })
        .collect())
}

/// Most frequent account among the tenant's prior categorizations whose
/// payee contains `payee` case-insensitively; ties go to most recent use.
pub async fn most_frequent_account(
    pool: &DbPool,
    tenant: &TenantId,
    payee: &str,
) -> Result<Option<HistoricalMatch>, sqlx::Error> {
    let row = sqlx::query_as::<_, (String, String, i64)>(
        r#"
        SELECT account_code, account_name, COUNT(*) AS uses
        FROM categorized_transactions
        WHERE tenant_id = ? AND instr(lower(payee), lower(?)) > 0
        GROUP BY account_code, account_name
        ORDER BY uses DESC, MAX(categorized_at) DESC
        LIMIT 1
        "#,
    )
    .bind(&tenant.0)
    .bind(payee)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(code, name, uses)| HistoricalMatch {
        code: AccountCode::new(code),
        name,
        occurrences: uses as u32,
    }))
}

pub async fn account_amount_profile(
    pool: &DbPool,
    tenant: &TenantId,
    code: &AccountCode,
) -> Result<Option<AmountProfile>, sqlx::Error> {
    let (count, mean): (i64, Option<f64>) = sqlx::query_as(
        "SELECT COUNT(*), AVG(amount_cents) FROM categorized_transactions WHERE tenant_id = ? AND account_code = ?",
    )
    .bind(&tenant.0)
    .bind(code.0.as_str())
    .fetch_one(pool)
    .await?;

    Ok(mean.filter(|_| count > 0).map(|mean| AmountProfile {
        sample_count: count as u32,
        mean_cents: mean.round() as i64,
    }))
}

/// `CandidateSource` served from the platform's SQLite database.
#[derive(Clone)]
pub struct SqliteCandidateSource {
    pool: DbPool,
}

impl SqliteCandidateSource {
    pub fn new(pool: DbPool) -> Self {
        SqliteCandidateSource { pool }
    }
}

fn into_source_error(e: sqlx::Error) -> SourceError {
    SourceError::Query(e.to_string())
}

#[async_trait]
impl CandidateSource for SqliteCandidateSource {
    async fn invoice_candidates(
        &self,
        tenant: &TenantId,
        _transaction: &BankTransaction,
    ) -> Result<Vec<InvoiceCandidate>, SourceError> {
        open_invoices(&self.pool, tenant)
            .await
            .map_err(into_source_error)
    }

    async fn historical_account(
        &self,
        tenant: &TenantId,
        payee: &str,
    ) -> Result<Option<HistoricalMatch>, SourceError> {
        most_frequent_account(&self.pool, tenant, payee)
            .await
            .map_err(into_source_error)
    }

    async fn amount_profile(
        &self,
        tenant: &TenantId,
        code: &AccountCode,
    ) -> Result<Option<AmountProfile>, SourceError> {
        account_amount_profile(&self.pool, tenant, code)
            .await
            .map_err(into_source_error)
    }
}
