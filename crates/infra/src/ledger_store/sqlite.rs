//! SQLite-backed ledger store.
//!
//! Two relations, created on connect:
//!
//! | table | columns |
//! |-------|---------|
//! | `accounts` | `id` PK, `name`, `balance` (minor units, `CHECK >= 0`) |
//! | `transfers` | `id` PK AUTOINCREMENT, `sender_id`, `receiver_id`, `amount`, `timestamp` |
//!
//! `transfers.amount` is in minor units (`CHECK > 0`); `timestamp` is
//! microseconds since the epoch, indexed for the recent window.
//!
//! Every apply runs inside one SQL transaction, additionally serialized by a
//! process-local write lock. Any error before `COMMIT` drops the transaction,
//! which rolls back every statement already executed in it.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tokio::sync::Mutex;
use tracing::instrument;

use peerpay_core::{AccountId, Money, TransferError, TransferId};
use peerpay_ledger::{Account, Transfer, ValidatedTransfer};

use super::r#trait::{LedgerStore, LedgerStoreError};

#[derive(Debug, Clone)]
pub struct SqliteLedgerStore {
    pool: SqlitePool,
    write_lock: std::sync::Arc<Mutex<()>>,
}

impl SqliteLedgerStore {
    /// Connect, create the schema if needed, and seed `accounts` when the
    /// table is empty.
    pub async fn connect(database_url: &str, seed: &[Account]) -> Result<Self, LedgerStoreError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| map_sqlx_error("parse database url", e))?
            .create_if_missing(true);

        // Every connection to `:memory:` is its own database, so pin the pool
        // to one long-lived connection in that case.
        let in_memory = database_url.contains(":memory:");
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(4)
        };

        let pool = pool_options
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;

        let store = Self {
            pool,
            write_lock: std::sync::Arc::new(Mutex::new(())),
        };
        store.migrate().await?;
        store.seed(seed).await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), LedgerStoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS accounts (
                id      INTEGER PRIMARY KEY,
                name    TEXT    NOT NULL,
                balance INTEGER NOT NULL CHECK (balance >= 0)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create accounts", e))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS transfers (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                sender_id   INTEGER NOT NULL REFERENCES accounts(id),
                receiver_id INTEGER NOT NULL REFERENCES accounts(id),
                amount      INTEGER NOT NULL CHECK (amount > 0),
                timestamp   INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create transfers", e))?;

        // Serves both the last-timestamp read on apply and the recent window.
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS transfers_recent ON transfers (timestamp DESC, id DESC)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create transfers index", e))?;

        Ok(())
    }

    async fn seed(&self, accounts: &[Account]) -> Result<(), LedgerStoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin seed", e))?;

        let existing: i64 = sqlx::query("SELECT COUNT(*) AS n FROM accounts")
            .fetch_one(&mut *tx)
            .await
            .and_then(|row| row.try_get("n"))
            .map_err(|e| map_sqlx_error("count accounts", e))?;
        if existing > 0 {
            tracing::debug!(existing, "accounts already present; skipping seed");
            return Ok(());
        }

        for account in accounts {
            sqlx::query("INSERT INTO accounts (id, name, balance) VALUES (?1, ?2, ?3)")
                .bind(account.id.get())
                .bind(&account.name)
                .bind(account.balance.minor())
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("seed account", e))?;
        }

        tx.commit().await.map_err(|e| map_sqlx_error("commit seed", e))?;
        tracing::info!(count = accounts.len(), "seeded accounts");
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl LedgerStore for SqliteLedgerStore {
    #[instrument(skip(self), fields(account_id = %id), err)]
    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, LedgerStoreError> {
        let row = sqlx::query("SELECT id, name, balance FROM accounts WHERE id = ?1")
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_account", e))?;
        row.as_ref().map(account_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn get_all_accounts(&self) -> Result<Vec<Account>, LedgerStoreError> {
        let rows = sqlx::query("SELECT id, name, balance FROM accounts ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_all_accounts", e))?;
        rows.iter().map(account_from_row).collect()
    }

    #[instrument(
        skip(self, transfer),
        fields(
            sender_id = %transfer.sender_id(),
            receiver_id = %transfer.receiver_id(),
            amount = %transfer.amount()
        ),
        err
    )]
    async fn apply_transfer_atomic(
        &self,
        transfer: ValidatedTransfer,
    ) -> Result<Transfer, LedgerStoreError> {
        let _guard = self.write_lock.lock().await;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;

        let sender = fetch_balance(&mut tx, transfer.sender_id())
            .await?
            .ok_or(LedgerStoreError::Rejected(TransferError::InvalidSender))?;
        let receiver = fetch_balance(&mut tx, transfer.receiver_id())
            .await?
            .ok_or(LedgerStoreError::Rejected(TransferError::InvalidReceiver))?;
        if transfer.sender_id() == transfer.receiver_id() {
            return Err(LedgerStoreError::Rejected(TransferError::SameAccount));
        }

        let new_sender = sender
            .checked_sub(transfer.amount())
            .ok_or(LedgerStoreError::Rejected(TransferError::InsufficientBalance))?;
        let new_receiver = receiver
            .checked_add(transfer.amount())
            .ok_or_else(|| LedgerStoreError::backend("receiver balance overflow"))?;

        for (id, balance) in [
            (transfer.sender_id(), new_sender),
            (transfer.receiver_id(), new_receiver),
        ] {
            sqlx::query("UPDATE accounts SET balance = ?1 WHERE id = ?2")
                .bind(balance.minor())
                .bind(id.get())
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("update balance", e))?;
        }

        let last_micros: Option<i64> = sqlx::query("SELECT MAX(timestamp) AS ts FROM transfers")
            .fetch_one(&mut *tx)
            .await
            .and_then(|row| row.try_get("ts"))
            .map_err(|e| map_sqlx_error("read last timestamp", e))?;
        let now_micros = Utc::now().timestamp_micros();
        let micros = match last_micros {
            Some(last) if now_micros <= last => last + 1,
            _ => now_micros,
        };

        let id = sqlx::query(
            r#"
            INSERT INTO transfers (sender_id, receiver_id, amount, timestamp)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(transfer.sender_id().get())
        .bind(transfer.receiver_id().get())
        .bind(transfer.amount().minor())
        .bind(micros)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert transfer", e))?
        .last_insert_rowid();

        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;

        Ok(Transfer {
            id: TransferId::Committed(id),
            sender_id: transfer.sender_id(),
            receiver_id: transfer.receiver_id(),
            amount: transfer.amount(),
            timestamp: timestamp_from_micros(micros)?,
        })
    }

    #[instrument(skip(self), err)]
    async fn get_recent_transfers(&self, limit: usize) -> Result<Vec<Transfer>, LedgerStoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, sender_id, receiver_id, amount, timestamp
            FROM transfers
            ORDER BY timestamp DESC, id DESC
            LIMIT ?1
            "#,
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_recent_transfers", e))?;
        rows.iter().map(transfer_from_row).collect()
    }
}

async fn fetch_balance(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    id: AccountId,
) -> Result<Option<Money>, LedgerStoreError> {
    let row = sqlx::query("SELECT balance FROM accounts WHERE id = ?1")
        .bind(id.get())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("read balance", e))?;
    match row {
        Some(row) => {
            let minor: i64 = row.try_get("balance").map_err(|e| map_sqlx_error("read balance", e))?;
            money_from_minor(minor).map(Some)
        }
        None => Ok(None),
    }
}

fn account_from_row(row: &SqliteRow) -> Result<Account, LedgerStoreError> {
    let id: i64 = row.try_get("id").map_err(|e| map_sqlx_error("decode account", e))?;
    let name: String = row.try_get("name").map_err(|e| map_sqlx_error("decode account", e))?;
    let balance: i64 = row.try_get("balance").map_err(|e| map_sqlx_error("decode account", e))?;
    Ok(Account::new(AccountId::new(id), name, money_from_minor(balance)?))
}

fn transfer_from_row(row: &SqliteRow) -> Result<Transfer, LedgerStoreError> {
    let decode = |e| map_sqlx_error("decode transfer", e);
    let id: i64 = row.try_get("id").map_err(decode)?;
    let sender_id: i64 = row.try_get("sender_id").map_err(decode)?;
    let receiver_id: i64 = row.try_get("receiver_id").map_err(decode)?;
    let amount: i64 = row.try_get("amount").map_err(decode)?;
    let micros: i64 = row.try_get("timestamp").map_err(decode)?;
    Ok(Transfer {
        id: TransferId::Committed(id),
        sender_id: AccountId::new(sender_id),
        receiver_id: AccountId::new(receiver_id),
        amount: money_from_minor(amount)?,
        timestamp: timestamp_from_micros(micros)?,
    })
}

fn money_from_minor(minor: i64) -> Result<Money, LedgerStoreError> {
    Money::from_minor(minor)
        .ok_or_else(|| LedgerStoreError::backend(format!("negative amount in storage: {minor}")))
}

fn timestamp_from_micros(micros: i64) -> Result<DateTime<Utc>, LedgerStoreError> {
    DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| LedgerStoreError::backend(format!("timestamp out of range: {micros}")))
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> LedgerStoreError {
    tracing::warn!(operation, error = %err, "sqlite operation failed");
    LedgerStoreError::backend(format!("{operation}: {err}"))
}
