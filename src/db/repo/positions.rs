//! Stake position and exit history operations for the repository.

use crate::domain::{Position, PositionExit, TimeMs, VaultEntry};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;

use super::{asset_from_row, decimal_column, insert_entry, Repository};

const SELECT_POSITION: &str = r#"
    SELECT id, asset_type, symbol, account, vault, deposit_qty, deposit_cost,
           deposit_date, exit_date, remaining_qty, realized_pnl, exit_value_total, exit_count
    FROM positions"#;

impl Repository {
    /// Insert a position, or overwrite the stored row with the same id.
    ///
    /// # Errors
    /// Returns an error if the write fails.
    pub async fn save_position(&self, position: &Position) -> Result<(), sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        write_position(&mut conn, position).await
    }

    /// Store a freshly staked position together with its vault deposit, if
    /// any. Either both rows land or neither does.
    ///
    /// # Errors
    /// Returns an error if the transaction fails.
    pub async fn open_position(
        &self,
        position: &Position,
        deposit: Option<&VaultEntry>,
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        write_position(&mut tx, position).await?;
        if let Some(entry) = deposit {
            insert_entry(&mut tx, entry).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn find_position(&self, id: &str) -> Result<Option<Position>, sqlx::Error> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_POSITION))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| position_from_row(&r)).transpose()
    }

    /// Positions ordered by deposit date, optionally narrowed to one account
    /// and to positions that still hold quantity.
    pub async fn list_positions(
        &self,
        account: Option<&str>,
        open_only: bool,
    ) -> Result<Vec<Position>, sqlx::Error> {
        let mut sql = format!("{} WHERE 1 = 1", SELECT_POSITION);
        if account.is_some() {
            sql.push_str(" AND account = ?");
        }
        if open_only {
            sql.push_str(" AND exit_date IS NULL");
        }
        sql.push_str(" ORDER BY deposit_date ASC, id ASC");

        let mut query = sqlx::query(&sql);
        if let Some(account) = account {
            query = query.bind(account);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(position_from_row).collect()
    }

    /// Persist one unstake: the updated position, its exit line and the
    /// matching vault withdrawal, atomically.
    ///
    /// The update only applies while the stored `exit_count` still equals
    /// `expected_exit_count`. Returns false when another exit won the race,
    /// in which case nothing is written.
    ///
    /// # Errors
    /// Returns an error if the transaction fails.
    pub async fn record_unstake(
        &self,
        next: &Position,
        exit: &PositionExit,
        withdraw: Option<&VaultEntry>,
        expected_exit_count: i64,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE positions
            SET remaining_qty = ?, realized_pnl = ?, exit_value_total = ?,
                exit_count = ?, exit_date = ?, updated_at = ?
            WHERE id = ? AND exit_count = ?
            "#,
        )
        .bind(next.remaining_qty.to_canonical_string())
        .bind(next.realized_pnl.to_canonical_string())
        .bind(next.exit_value_total.to_canonical_string())
        .bind(next.exit_count)
        .bind(next.exit_date.map(|t| t.as_ms()))
        .bind(TimeMs::now().as_ms())
        .bind(next.id.as_str())
        .bind(expected_exit_count)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO position_exits (
                position_id, seq, qty, exit_value_usd, cost_basis, pnl, roi_pct, at_ms, close_all
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(exit.position_id.as_str())
        .bind(exit.seq)
        .bind(exit.qty.to_canonical_string())
        .bind(exit.exit_value_usd.to_canonical_string())
        .bind(exit.cost_basis.to_canonical_string())
        .bind(exit.pnl.to_canonical_string())
        .bind(exit.roi_pct.to_canonical_string())
        .bind(exit.at.as_ms())
        .bind(exit.close_all as i32)
        .execute(&mut *tx)
        .await?;

        if let Some(entry) = withdraw {
            insert_entry(&mut tx, entry).await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    /// Exit history of a position in application order.
    pub async fn list_exits(&self, position_id: &str) -> Result<Vec<PositionExit>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT position_id, seq, qty, exit_value_usd, cost_basis, pnl, roi_pct, at_ms, close_all
            FROM position_exits
            WHERE position_id = ?
            ORDER BY seq ASC
            "#,
        )
        .bind(position_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(PositionExit {
                    position_id: row.try_get("position_id")?,
                    seq: row.try_get("seq")?,
                    qty: decimal_column(row, "qty")?,
                    exit_value_usd: decimal_column(row, "exit_value_usd")?,
                    cost_basis: decimal_column(row, "cost_basis")?,
                    pnl: decimal_column(row, "pnl")?,
                    roi_pct: decimal_column(row, "roi_pct")?,
                    at: TimeMs::new(row.try_get("at_ms")?),
                    close_all: row.try_get::<i32, _>("close_all")? != 0,
                })
            })
            .collect()
    }
}

async fn write_position(
    conn: &mut SqliteConnection,
    position: &Position,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO positions (
            id, asset_type, symbol, account, vault, deposit_qty, deposit_cost,
            deposit_date, exit_date, remaining_qty, realized_pnl, exit_value_total,
            exit_count, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            vault = excluded.vault,
            exit_date = excluded.exit_date,
            remaining_qty = excluded.remaining_qty,
            realized_pnl = excluded.realized_pnl,
            exit_value_total = excluded.exit_value_total,
            exit_count = excluded.exit_count,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(position.id.as_str())
    .bind(position.asset.asset_type.as_str())
    .bind(position.asset.symbol.as_str())
    .bind(position.account.as_str())
    .bind(position.vault.as_deref())
    .bind(position.deposit_qty.to_canonical_string())
    .bind(position.deposit_cost.to_canonical_string())
    .bind(position.deposit_date.as_ms())
    .bind(position.exit_date.map(|t| t.as_ms()))
    .bind(position.remaining_qty.to_canonical_string())
    .bind(position.realized_pnl.to_canonical_string())
    .bind(position.exit_value_total.to_canonical_string())
    .bind(position.exit_count)
    .bind(TimeMs::now().as_ms())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

fn position_from_row(row: &SqliteRow) -> Result<Position, sqlx::Error> {
    Ok(Position {
        id: row.try_get("id")?,
        asset: asset_from_row(row)?,
        account: row.try_get("account")?,
        vault: row.try_get("vault")?,
        deposit_qty: decimal_column(row, "deposit_qty")?,
        deposit_cost: decimal_column(row, "deposit_cost")?,
        deposit_date: TimeMs::new(row.try_get("deposit_date")?),
        exit_date: row.try_get::<Option<i64>, _>("exit_date")?.map(TimeMs::new),
        remaining_qty: decimal_column(row, "remaining_qty")?,
        realized_pnl: decimal_column(row, "realized_pnl")?,
        exit_value_total: decimal_column(row, "exit_value_total")?,
        exit_count: row.try_get("exit_count")?,
    })
}
