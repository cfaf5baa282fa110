use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{
    Connection, ErrorCode, OptionalExtension, Row, TransactionBehavior, params, types::Type,
};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::{
    account::{Account, AccountId, Statement, TransactionRecord, next_timestamp},
    command::{CreateTransactionCommand, TransactionKind},
    person::{NewPerson, Person, PersonId, account_name},
    store::StoreConfig,
};

use super::{Directory, Receipt, TransactionProcessError, TransactionProcessor};

/// Ledger engine over a SQLite connection owned by this value.
///
/// Concurrent callers each open their own processor on the same database file;
/// the database's write lock is the only coordination between them.
pub struct SqliteProcessor {
    conn: Connection,
}

impl SqliteProcessor {
    /// Takes an already opened and migrated connection.
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn open(config: &StoreConfig) -> Result<Self, TransactionProcessError> {
        Ok(Self::new(config.open()?))
    }

    pub fn in_memory() -> Result<Self, TransactionProcessError> {
        Self::open(&StoreConfig::in_memory())
    }

    /// Runs `unit` inside an immediate transaction. Commits on success, otherwise
    /// rolls back before handing the error to the caller.
    fn atomically<T>(
        &mut self,
        unit: impl FnOnce(&rusqlite::Transaction<'_>) -> Result<T, TransactionProcessError>,
    ) -> Result<T, TransactionProcessError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        match unit(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    warn!(error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }
}

fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn decimal_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let text: String = row.get(idx)?;
    Decimal::from_str(&text).map_err(|err| conversion_error(idx, err))
}

fn timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|err| conversion_error(idx, err))
}

fn kind_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<TransactionKind> {
    let text: String = row.get(idx)?;
    TransactionKind::from_str(&text).map_err(|err| conversion_error(idx, err))
}

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        person_id: row.get(1)?,
        name: row.get(2)?,
        balance: decimal_at(row, 3)?,
    })
}

fn transaction_from_row(row: &Row<'_>) -> rusqlite::Result<TransactionRecord> {
    Ok(TransactionRecord {
        id: row.get(0)?,
        account_id: row.get(1)?,
        name: row.get(2)?,
        amount: decimal_at(row, 3)?,
        kind: kind_at(row, 4)?,
        created_at: timestamp_at(row, 5)?,
    })
}

fn person_from_row(row: &Row<'_>) -> rusqlite::Result<Person> {
    Ok(Person {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        email: row.get(3)?,
        ip_address: row.get(4)?,
    })
}

/// `None` when no row matches; every other failure stays an error.
fn select_account(conn: &Connection, account_id: AccountId) -> rusqlite::Result<Option<Account>> {
    conn.query_row(
        "SELECT id, person_id, name, balance FROM accounts WHERE id = ?1",
        params![account_id],
        account_from_row,
    )
    .optional()
}

fn select_person(conn: &Connection, person_id: PersonId) -> rusqlite::Result<Option<Person>> {
    conn.query_row(
        "SELECT id, first_name, last_name, email, ip_address FROM people WHERE id = ?1",
        params![person_id],
        person_from_row,
    )
    .optional()
}

fn latest_created_at(
    conn: &Connection,
    account_id: AccountId,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let latest: Option<String> = conn.query_row(
        "SELECT MAX(created_at) FROM transactions WHERE account_id = ?1",
        params![account_id],
        |row| row.get(0),
    )?;
    latest
        .map(|text| {
            DateTime::parse_from_rfc3339(&text)
                .map(|at| at.with_timezone(&Utc))
                .map_err(|err| conversion_error(0, err))
        })
        .transpose()
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _) if failure.code == ErrorCode::ConstraintViolation
    )
}

impl TransactionProcessor for SqliteProcessor {
    fn create_account(&mut self, person_id: PersonId) -> Result<AccountId, TransactionProcessError> {
        let account_id = self.atomically(|tx| {
            let person = select_person(tx, person_id)?
                .ok_or(TransactionProcessError::ReferentialIntegrity { person_id })?;
            tx.execute(
                "INSERT INTO accounts (person_id, name, balance) VALUES (?1, ?2, ?3)",
                params![person_id, person.account_name(), Decimal::ZERO.to_string()],
            )
            .map_err(|err| {
                if is_constraint_violation(&err) {
                    TransactionProcessError::ReferentialIntegrity { person_id }
                } else {
                    err.into()
                }
            })?;
            Ok(tx.last_insert_rowid())
        })?;
        info!(account_id, person_id, "account created");
        Ok(account_id)
    }

    fn process_transaction(
        &mut self,
        account_id: AccountId,
        amount: Decimal,
        kind: TransactionKind,
    ) -> Result<Receipt, TransactionProcessError> {
        let command = CreateTransactionCommand::new(account_id, kind, amount)?;
        let receipt = self.atomically(|tx| {
            let mut acc = select_account(tx, account_id)?
                .ok_or(TransactionProcessError::AccountNotFound { account_id })?;
            let evt = acc.handle_new_transaction(&command)?;
            let previous = acc.balance;
            acc.apply(&evt);

            let updated = tx.execute(
                "UPDATE accounts SET balance = ?1 WHERE id = ?2 AND balance = ?3",
                params![acc.balance.to_string(), account_id, previous.to_string()],
            )?;
            // the row was read under the same write lock, so only outside
            // interference with the stored balance ends up here
            if updated == 0 {
                return Err(TransactionProcessError::BalanceConflict { account_id });
            }

            let created_at = next_timestamp(latest_created_at(tx, account_id)?);
            tx.execute(
                "INSERT INTO transactions (account_id, name, amount, transaction_type, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    account_id,
                    acc.name,
                    evt.amount.to_string(),
                    evt.kind.as_str(),
                    format_timestamp(&created_at),
                ],
            )?;

            Ok(Receipt {
                transaction_id: tx.last_insert_rowid(),
                account_id,
                kind: evt.kind,
                amount: evt.amount,
                balance: acc.balance,
                created_at,
            })
        });
        match &receipt {
            Ok(receipt) => info!(
                account_id,
                transaction_id = receipt.transaction_id,
                %amount,
                %kind,
                balance = %receipt.balance,
                "transaction committed"
            ),
            Err(err) => warn!(account_id, %amount, %kind, error = %err, "transaction rejected"),
        }
        receipt
    }

    fn account_statement(
        &self,
        account_id: AccountId,
    ) -> Result<Statement, TransactionProcessError> {
        // one read transaction, so the balance and the ledger come from the same snapshot
        let tx = self.conn.unchecked_transaction()?;
        let account = select_account(&tx, account_id)?
            .ok_or(TransactionProcessError::AccountNotFound { account_id })?;
        let transactions = {
            let mut stmt = tx.prepare(
                "SELECT id, account_id, name, amount, transaction_type, created_at
                 FROM transactions
                 WHERE account_id = ?1
                 ORDER BY created_at, id",
            )?;
            let rows = stmt.query_map(params![account_id], transaction_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()?
        };
        tx.commit()?;
        debug!(account_id, count = transactions.len(), "statement read");
        Ok(Statement {
            account,
            transactions,
        })
    }
}

impl Directory for SqliteProcessor {
    fn register_person(&mut self, person: NewPerson) -> Result<PersonId, TransactionProcessError> {
        person.validate()?;
        self.conn.execute(
            "INSERT INTO people (first_name, last_name, email, ip_address) VALUES (?1, ?2, ?3, ?4)",
            params![
                person.first_name,
                person.last_name,
                person.email,
                person.ip_address
            ],
        )?;
        let person_id = self.conn.last_insert_rowid();
        info!(person_id, name = ?account_name(&person.first_name, &person.last_name), "person registered");
        Ok(person_id)
    }

    fn person(&self, person_id: PersonId) -> Result<Person, TransactionProcessError> {
        select_person(&self.conn, person_id)?
            .ok_or(TransactionProcessError::PersonNotFound { person_id })
    }

    fn accounts_for_person(
        &self,
        person_id: PersonId,
    ) -> Result<Vec<Account>, TransactionProcessError> {
        self.person(person_id)?;
        let mut stmt = self.conn.prepare(
            "SELECT id, person_id, name, balance FROM accounts WHERE person_id = ?1 ORDER BY id",
        )?;
        let accounts = stmt
            .query_map(params![person_id], account_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(accounts)
    }
}
