use chrono::{DateTime, SubsecRound, Utc};
use rust_decimal::{Decimal, prelude::Zero};
use thiserror::Error;

use crate::{
    command::{CreateTransactionCommand, TransactionKind},
    person::PersonId,
};

pub type AccountId = i64;
pub type TransactionId = i64;

/// Balance change produced by a successfully handled command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountEvent {
    pub account_id: AccountId,
    pub kind: TransactionKind,
    pub amount: Decimal,
    /// Balance once the event is applied, already checked for overflow.
    pub balance: Decimal,
}

impl AccountEvent {
    pub fn signed_amount(&self) -> Decimal {
        match self.kind {
            TransactionKind::Deposit => self.amount,
            TransactionKind::Withdrawal => -self.amount,
        }
    }
}

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        available: Decimal,
        requested: Decimal,
    },
    #[error("Balance {balance} cannot take a {kind} of {amount}")]
    BalanceOverflow {
        balance: Decimal,
        kind: TransactionKind,
        amount: Decimal,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub person_id: PersonId,
    pub name: Option<String>,
    pub balance: Decimal,
}

impl Account {
    /// A freshly created account always starts at zero.
    pub fn open(id: AccountId, person_id: PersonId, name: Option<String>) -> Self {
        Self {
            id,
            person_id,
            name,
            balance: Decimal::zero(),
        }
    }

    pub fn apply(&mut self, event: &AccountEvent) {
        self.balance = event.balance;
    }

    pub fn handle_new_transaction(
        &self,
        command: &CreateTransactionCommand,
    ) -> Result<AccountEvent, AccountError> {
        if command.kind == TransactionKind::Withdrawal && self.balance < command.amount {
            return Err(AccountError::InsufficientFunds {
                available: self.balance,
                requested: command.amount,
            });
        }
        let balance = match command.kind {
            TransactionKind::Deposit => self.balance.checked_add(command.amount),
            TransactionKind::Withdrawal => self.balance.checked_sub(command.amount),
        }
        .ok_or(AccountError::BalanceOverflow {
            balance: self.balance,
            kind: command.kind,
            amount: command.amount,
        })?;
        Ok(AccountEvent {
            account_id: self.id,
            kind: command.kind,
            amount: command.amount,
            balance,
        })
    }
}

/// Immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub id: TransactionId,
    pub account_id: AccountId,
    pub name: Option<String>,
    pub amount: Decimal,
    pub kind: TransactionKind,
    pub created_at: DateTime<Utc>,
}

impl TransactionRecord {
    pub fn signed_amount(&self) -> Decimal {
        match self.kind {
            TransactionKind::Deposit => self.amount,
            TransactionKind::Withdrawal => -self.amount,
        }
    }
}

/// Account snapshot plus its ledger, ordered by `created_at` then `id`.
#[derive(Debug, Clone)]
pub struct Statement {
    pub account: Account,
    pub transactions: Vec<TransactionRecord>,
}

impl Statement {
    pub fn ledger_total(&self) -> Decimal {
        self.transactions
            .iter()
            .map(TransactionRecord::signed_amount)
            .sum()
    }

    pub fn reconciliation(&self) -> Reconciliation {
        Reconciliation {
            account_id: self.account.id,
            balance: self.account.balance,
            ledger_total: self.ledger_total(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciliation {
    pub account_id: AccountId,
    pub balance: Decimal,
    pub ledger_total: Decimal,
}

impl Reconciliation {
    pub fn is_balanced(&self) -> bool {
        self.balance == self.ledger_total
    }
}

/// Timestamp for a new ledger entry: now, truncated to the stored precision,
/// but never earlier than the account's latest entry.
pub fn next_timestamp(latest: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now().trunc_subsecs(6);
    match latest {
        Some(latest) if latest > now => latest,
        _ => now,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use rust_decimal::prelude::FromPrimitive;
    use rust_decimal_macros::dec;

    use super::*;

    fn record(id: TransactionId, kind: TransactionKind, amount: Decimal) -> TransactionRecord {
        TransactionRecord {
            id,
            account_id: 1,
            name: None,
            amount,
            kind,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn apply_events() {
        let mut acc = Account::open(1, 1, None);
        acc.apply(&AccountEvent {
            account_id: 1,
            kind: TransactionKind::Deposit,
            amount: Decimal::from_u32(10).unwrap(),
            balance: Decimal::from_u32(10).unwrap(),
        });
        assert_eq!(acc.balance, Decimal::from_u32(10).unwrap());
        // event is the source of truth, there's no more validation happening
        acc.apply(&AccountEvent {
            account_id: 1,
            kind: TransactionKind::Withdrawal,
            amount: Decimal::from_u32(13).unwrap(),
            balance: Decimal::from_i32(-3).unwrap(),
        });
        assert_eq!(acc.balance, Decimal::from_i32(-3).unwrap());
    }

    #[test]
    fn handle_new_transaction() {
        let mut acc = Account::open(7, 1, Some("Ada Lovelace".to_string()));

        // withdrawal from an empty account
        let withdrawal_cmd =
            CreateTransactionCommand::new(7, TransactionKind::Withdrawal, dec!(5)).unwrap();
        let err = acc.handle_new_transaction(&withdrawal_cmd).unwrap_err();
        assert!(matches!(
            err,
            AccountError::InsufficientFunds {
                available,
                requested,
            } if available == dec!(0) && requested == dec!(5)
        ));

        // deposit
        let deposit_cmd =
            CreateTransactionCommand::new(7, TransactionKind::Deposit, dec!(13)).unwrap();
        let deposit_evt = acc.handle_new_transaction(&deposit_cmd).unwrap();
        assert_eq!(deposit_evt.amount, dec!(13));
        assert_eq!(deposit_evt.account_id, 7);
        assert_eq!(deposit_evt.kind, TransactionKind::Deposit);

        // withdrawal after deposit applied
        acc.apply(&deposit_evt);
        let withdrawal_evt = acc.handle_new_transaction(&withdrawal_cmd).unwrap();
        assert_eq!(withdrawal_evt.signed_amount(), dec!(-5));
        acc.apply(&withdrawal_evt);
        assert_eq!(acc.balance, dec!(8));

        // draining the account exactly is allowed
        let drain_cmd =
            CreateTransactionCommand::new(7, TransactionKind::Withdrawal, dec!(8)).unwrap();
        let drain_evt = acc.handle_new_transaction(&drain_cmd).unwrap();
        acc.apply(&drain_evt);
        assert_eq!(acc.balance, dec!(0));
    }

    #[test]
    fn deposit_past_decimal_max() {
        let acc = Account {
            balance: Decimal::MAX,
            ..Account::open(3, 1, None)
        };
        let cmd = CreateTransactionCommand::new(3, TransactionKind::Deposit, dec!(1)).unwrap();
        let err = acc.handle_new_transaction(&cmd).unwrap_err();
        assert!(matches!(
            err,
            AccountError::BalanceOverflow {
                balance,
                kind: TransactionKind::Deposit,
                amount,
            } if balance == Decimal::MAX && amount == dec!(1)
        ));
        assert_eq!(acc.balance, Decimal::MAX);
    }

    #[test]
    fn statement_reconciliation() {
        let statement = Statement {
            account: Account {
                balance: dec!(100.00),
                ..Account::open(1, 1, None)
            },
            transactions: vec![
                record(1, TransactionKind::Deposit, dec!(150.00)),
                record(2, TransactionKind::Withdrawal, dec!(50.00)),
            ],
        };
        assert_eq!(statement.ledger_total(), dec!(100.00));
        assert!(statement.reconciliation().is_balanced());

        let drifted = Statement {
            account: Account {
                balance: dec!(99),
                ..statement.account.clone()
            },
            ..statement
        };
        let rec = drifted.reconciliation();
        assert!(!rec.is_balanced());
        assert_eq!(rec.ledger_total, dec!(100.00));
    }

    #[test]
    fn timestamps_never_go_backwards() {
        let future = Utc::now() + Duration::hours(1);
        assert_eq!(next_timestamp(Some(future)), future);

        let past = Utc::now() - Duration::hours(1);
        assert!(next_timestamp(Some(past)) > past);
        assert_eq!(next_timestamp(None).timestamp_subsec_nanos() % 1_000, 0);
    }
}
