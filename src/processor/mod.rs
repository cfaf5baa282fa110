use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::{
    account::{Account, AccountError, AccountId, Reconciliation, Statement, TransactionId},
    command::{AccountCommandError, TransactionKind},
    person::{NewPerson, Person, PersonError, PersonId},
};

pub mod in_memory_processor;
pub mod sqlite_processor;

#[derive(Debug, Error)]
pub enum TransactionProcessError {
    #[error(transparent)]
    CommandErr(#[from] AccountCommandError),
    #[error(transparent)]
    AccountErr(#[from] AccountError),
    #[error(transparent)]
    PersonErr(#[from] PersonError),
    #[error("Account {account_id} not found")]
    AccountNotFound { account_id: AccountId },
    #[error("Person {person_id} not found")]
    PersonNotFound { person_id: PersonId },
    #[error("Account {account_id} changed while being updated")]
    BalanceConflict { account_id: AccountId },
    #[error("Cannot create an account for person {person_id}: no such person")]
    ReferentialIntegrity { person_id: PersonId },
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[from] rusqlite::Error),
}

impl TransactionProcessError {
    /// Everything except a storage fault is an expected, reportable outcome.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, TransactionProcessError::StorageUnavailable(_))
    }
}

/// Confirmation of a committed deposit or withdrawal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub transaction_id: TransactionId,
    pub account_id: AccountId,
    pub kind: TransactionKind,
    pub amount: Decimal,
    /// Balance after the transaction was applied.
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Ledger engine. Balance changes go through [`TransactionProcessor::process_transaction`],
/// which writes the new balance and the ledger entry as one atomic unit.
pub trait TransactionProcessor {
    fn create_account(&mut self, person_id: PersonId) -> Result<AccountId, TransactionProcessError>;

    fn process_transaction(
        &mut self,
        account_id: AccountId,
        amount: Decimal,
        kind: TransactionKind,
    ) -> Result<Receipt, TransactionProcessError>;

    fn account_statement(&self, account_id: AccountId)
    -> Result<Statement, TransactionProcessError>;

    fn deposit(
        &mut self,
        account_id: AccountId,
        amount: Decimal,
    ) -> Result<Receipt, TransactionProcessError> {
        self.process_transaction(account_id, amount, TransactionKind::Deposit)
    }

    fn withdraw(
        &mut self,
        account_id: AccountId,
        amount: Decimal,
    ) -> Result<Receipt, TransactionProcessError> {
        self.process_transaction(account_id, amount, TransactionKind::Withdrawal)
    }

    fn reconcile(&self, account_id: AccountId) -> Result<Reconciliation, TransactionProcessError> {
        Ok(self.account_statement(account_id)?.reconciliation())
    }
}

/// People registry, and the accounts they own.
pub trait Directory {
    fn register_person(&mut self, person: NewPerson) -> Result<PersonId, TransactionProcessError>;

    fn person(&self, person_id: PersonId) -> Result<Person, TransactionProcessError>;

    fn accounts_for_person(&self, person_id: PersonId)
    -> Result<Vec<Account>, TransactionProcessError>;
}
