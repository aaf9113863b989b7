//! Repository layer for database operations.
//!
//! Methods are organized across submodules by domain:
//! - `mod.rs` - Vaults and vault ledger entries
//! - `positions.rs` - Stake positions and their exit history
//! - `rates.rs` - Persisted rate cache

mod positions;
mod rates;

use crate::domain::{Asset, AssetType, Decimal, EntryType, TimeMs, Vault, VaultEntry, VaultStatus};
use sqlx::sqlite::{SqliteConnection, SqlitePool, SqliteRow};
use sqlx::Row;
use std::str::FromStr;

/// Repository for database operations.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // =========================================================================
    // Vault operations
    // =========================================================================

    /// Create a vault unless one with that name exists.
    ///
    /// Returns true if a new row was inserted.
    pub async fn insert_vault_if_absent(&self, name: &str, at: TimeMs) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO vaults (name, status, created_at)
            VALUES (?, 'ACTIVE', ?)
            ON CONFLICT(name) DO NOTHING
            "#,
        )
        .bind(name)
        .bind(at.as_ms())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn get_vault(&self, name: &str) -> Result<Option<Vault>, sqlx::Error> {
        let row = sqlx::query("SELECT name, status, created_at, closed_at FROM vaults WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| vault_from_row(&r)).transpose()
    }

    pub async fn list_vaults(&self) -> Result<Vec<Vault>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT name, status, created_at, closed_at FROM vaults ORDER BY created_at ASC, name ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(vault_from_row).collect()
    }

    /// Flip an active vault to CLOSED. Returns false if it was not active.
    pub async fn close_vault(&self, name: &str, at: TimeMs) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE vaults SET status = 'CLOSED', closed_at = ? WHERE name = ? AND status = 'ACTIVE'",
        )
        .bind(at.as_ms())
        .bind(name)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Vault entry operations
    // =========================================================================

    /// Append an entry and return it with its assigned id.
    ///
    /// An entry whose `reference` was already posted to the same vault is not
    /// inserted again; the previously stored entry is returned instead.
    pub async fn append_entry(&self, entry: &VaultEntry) -> Result<VaultEntry, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        insert_entry(&mut conn, entry).await
    }

    /// All entries of a vault in insertion order. Callers sort by `at`.
    pub async fn find_entries(&self, vault: &str) -> Result<Vec<VaultEntry>, sqlx::Error> {
        let rows = sqlx::query(&format!("{} WHERE vault = ? ORDER BY id ASC", SELECT_ENTRY))
            .bind(vault)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(entry_from_row).collect()
    }
}

const SELECT_ENTRY: &str = r#"
    SELECT id, vault, entry_type, asset_type, symbol, amount, usd_value,
           at_ms, account, note, reference
    FROM vault_entries"#;

/// Insert `entry` on an open connection or transaction. A duplicate
/// `(vault, reference)` resolves to the stored row.
pub(crate) async fn insert_entry(
    conn: &mut SqliteConnection,
    entry: &VaultEntry,
) -> Result<VaultEntry, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO vault_entries (
            vault, entry_type, asset_type, symbol, amount, usd_value,
            at_ms, account, note, reference
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(entry.vault.as_str())
    .bind(entry.entry_type.as_str())
    .bind(entry.asset.asset_type.as_str())
    .bind(entry.asset.symbol.as_str())
    .bind(entry.amount.to_canonical_string())
    .bind(entry.usd_value.to_canonical_string())
    .bind(entry.at.as_ms())
    .bind(entry.account.as_deref())
    .bind(entry.note.as_deref())
    .bind(entry.reference.as_deref())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() > 0 {
        let mut stored = entry.clone();
        stored.id = Some(result.last_insert_rowid());
        return Ok(stored);
    }

    let reference = entry.reference.as_deref().unwrap_or_default();
    let row = sqlx::query(&format!(
        "{} WHERE vault = ? AND reference = ?",
        SELECT_ENTRY
    ))
    .bind(entry.vault.as_str())
    .bind(reference)
    .fetch_one(&mut *conn)
    .await?;
    entry_from_row(&row)
}

fn vault_from_row(row: &SqliteRow) -> Result<Vault, sqlx::Error> {
    let status: String = row.try_get("status")?;
    Ok(Vault {
        name: row.try_get("name")?,
        status: VaultStatus::from_str(&status).map_err(|e| decode_error("status", e))?,
        created_at: TimeMs::new(row.try_get("created_at")?),
        closed_at: row.try_get::<Option<i64>, _>("closed_at")?.map(TimeMs::new),
    })
}

fn entry_from_row(row: &SqliteRow) -> Result<VaultEntry, sqlx::Error> {
    let entry_type: String = row.try_get("entry_type")?;
    Ok(VaultEntry {
        id: Some(row.try_get("id")?),
        vault: row.try_get("vault")?,
        entry_type: EntryType::from_str(&entry_type).map_err(|e| decode_error("entry_type", e))?,
        asset: asset_from_row(row)?,
        amount: decimal_column(row, "amount")?,
        usd_value: decimal_column(row, "usd_value")?,
        at: TimeMs::new(row.try_get("at_ms")?),
        account: row.try_get("account")?,
        note: row.try_get("note")?,
        reference: row.try_get("reference")?,
    })
}

pub(crate) fn asset_from_row(row: &SqliteRow) -> Result<Asset, sqlx::Error> {
    let asset_type: String = row.try_get("asset_type")?;
    let symbol: String = row.try_get("symbol")?;
    let asset_type =
        AssetType::from_str(&asset_type).map_err(|e| decode_error("asset_type", e.to_string()))?;
    Ok(Asset::new(asset_type, &symbol))
}

/// Decimals are stored as canonical strings; a malformed one is a decode error
/// rather than a silent zero.
pub(crate) fn decimal_column(row: &SqliteRow, column: &str) -> Result<Decimal, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    Decimal::from_str_canonical(&raw)
        .map_err(|e| decode_error(column, format!("invalid decimal {:?}: {}", raw, e)))
}

pub(crate) fn decode_error(column: &str, message: String) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: message.into(),
    }
}
