use std::collections::BTreeMap;

use rust_decimal::Decimal;
use tracing::info;

use crate::{
    account::{Account, AccountId, Statement, TransactionRecord, next_timestamp},
    command::{CreateTransactionCommand, TransactionKind},
    person::{NewPerson, Person, PersonId},
};

use super::{Directory, Receipt, TransactionProcessError, TransactionProcessor};

/// Keeps everything in process memory. Ids start at 1 and are never reused.
#[derive(Debug, Default)]
pub struct InMemoryTransactionProcessor {
    people: BTreeMap<PersonId, Person>,
    accounts: BTreeMap<AccountId, Account>,
    transactions: Vec<TransactionRecord>,
}

impl InMemoryTransactionProcessor {
    fn next_id(len: usize) -> i64 {
        len as i64 + 1
    }
}

impl TransactionProcessor for InMemoryTransactionProcessor {
    fn create_account(&mut self, person_id: PersonId) -> Result<AccountId, TransactionProcessError> {
        let person = self
            .people
            .get(&person_id)
            .ok_or(TransactionProcessError::ReferentialIntegrity { person_id })?;
        let id = Self::next_id(self.accounts.len());
        self.accounts
            .insert(id, Account::open(id, person_id, person.account_name()));
        Ok(id)
    }

    fn process_transaction(
        &mut self,
        account_id: AccountId,
        amount: Decimal,
        kind: TransactionKind,
    ) -> Result<Receipt, TransactionProcessError> {
        let command = CreateTransactionCommand::new(account_id, kind, amount)?;
        let acc = self
            .accounts
            .get_mut(&account_id)
            .ok_or(TransactionProcessError::AccountNotFound { account_id })?;
        let evt = acc.handle_new_transaction(&command)?;
        // nothing below can fail, so both writes land together
        acc.apply(&evt);
        let latest = self
            .transactions
            .iter()
            .filter(|tx| tx.account_id == account_id)
            .map(|tx| tx.created_at)
            .max();
        let record = TransactionRecord {
            id: Self::next_id(self.transactions.len()),
            account_id,
            name: acc.name.clone(),
            amount: evt.amount,
            kind: evt.kind,
            created_at: next_timestamp(latest),
        };
        let receipt = Receipt {
            transaction_id: record.id,
            account_id,
            kind: record.kind,
            amount: record.amount,
            balance: acc.balance,
            created_at: record.created_at,
        };
        self.transactions.push(record);
        info!(account_id, %amount, %kind, balance = %receipt.balance, "transaction applied");
        Ok(receipt)
    }

    fn account_statement(
        &self,
        account_id: AccountId,
    ) -> Result<Statement, TransactionProcessError> {
        let account = self
            .accounts
            .get(&account_id)
            .ok_or(TransactionProcessError::AccountNotFound { account_id })?;
        let mut transactions: Vec<_> = self
            .transactions
            .iter()
            .filter(|tx| tx.account_id == account_id)
            .cloned()
            .collect();
        transactions.sort_by_key(|tx| (tx.created_at, tx.id));
        Ok(Statement {
            account: account.clone(),
            transactions,
        })
    }
}

impl Directory for InMemoryTransactionProcessor {
    fn register_person(&mut self, person: NewPerson) -> Result<PersonId, TransactionProcessError> {
        person.validate()?;
        let id = Self::next_id(self.people.len());
        self.people.insert(id, person.with_id(id));
        Ok(id)
    }

    fn person(&self, person_id: PersonId) -> Result<Person, TransactionProcessError> {
        self.people
            .get(&person_id)
            .cloned()
            .ok_or(TransactionProcessError::PersonNotFound { person_id })
    }

    fn accounts_for_person(
        &self,
        person_id: PersonId,
    ) -> Result<Vec<Account>, TransactionProcessError> {
        self.person(person_id)?;
        Ok(self
            .accounts
            .values()
            .filter(|acc| acc.person_id == person_id)
            .cloned()
            .collect())
    }
}
