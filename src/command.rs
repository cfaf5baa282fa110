use std::{fmt, str::FromStr};

use rust_decimal::{Decimal, prelude::Zero};
use serde::Deserialize;
use thiserror::Error;

use crate::account::AccountId;

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
}

impl TransactionKind {
    /// Value stored in the `transaction_type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "deposit",
            TransactionKind::Withdrawal => "withdrawal",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = AccountCommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(TransactionKind::Deposit),
            "withdrawal" => Ok(TransactionKind::Withdrawal),
            other => Err(AccountCommandError::UnknownTransactionKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateTransactionCommand {
    pub account_id: AccountId,
    pub kind: TransactionKind,
    pub amount: Decimal,
}

#[derive(Debug, Error)]
pub enum AccountCommandError {
    #[error("Amount must be greater than zero for {kind}, got {amount}")]
    InvalidAmount { kind: TransactionKind, amount: Decimal },
    #[error("Unknown transaction type `{0}`")]
    UnknownTransactionKind(String),
}

impl CreateTransactionCommand {
    /// Rejects non-positive amounts, so nothing downstream has to.
    pub fn new(
        account_id: AccountId,
        kind: TransactionKind,
        amount: Decimal,
    ) -> Result<Self, AccountCommandError> {
        if amount > Decimal::zero() {
            Ok(Self {
                account_id,
                kind,
                amount,
            })
        } else {
            Err(AccountCommandError::InvalidAmount { kind, amount })
        }
    }
}
