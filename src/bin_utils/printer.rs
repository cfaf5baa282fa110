use std::io::{self, Write};

use rust_decimal::Decimal;

use crate::account::{Reconciliation, Statement};

/// Two decimal places, padding when the amount carries fewer.
pub fn format_amount(amount: Decimal) -> String {
    let mut amount = amount.round_dp(2);
    amount.rescale(2);
    amount.to_string()
}

pub fn print_statement<W>(output: &mut W, statement: &Statement) -> io::Result<()>
where
    W: Write,
{
    let account = &statement.account;
    writeln!(output, "Account ID: {}", account.id)?;
    writeln!(output, "Person ID: {}", account.person_id)?;
    writeln!(output, "Name: {}", account.name.as_deref().unwrap_or("-"))?;
    writeln!(output, "Balance: {}", format_amount(account.balance))?;
    writeln!(output, "Transactions:")?;
    for tx in &statement.transactions {
        writeln!(
            output,
            "ID: {} | Amount: {} | Type: {} | Date: {}",
            tx.id,
            format_amount(tx.amount),
            tx.kind,
            tx.created_at.format("%Y-%m-%d %H:%M:%S")
        )?;
    }
    print_reconciliation(output, &statement.reconciliation())
}

fn print_reconciliation<W>(output: &mut W, reconciliation: &Reconciliation) -> io::Result<()>
where
    W: Write,
{
    if !reconciliation.is_balanced() {
        writeln!(
            output,
            "Warning: balance {} does not match ledger total {}",
            format_amount(reconciliation.balance),
            format_amount(reconciliation.ledger_total)
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    use crate::{
        account::{Account, TransactionRecord},
        command::TransactionKind,
    };

    use super::*;

    #[test]
    fn amounts_have_two_decimals() {
        assert_eq!(format_amount(dec!(100)), "100.00");
        assert_eq!(format_amount(dec!(0.5)), "0.50");
        assert_eq!(format_amount(dec!(12.345)), "12.34");
        assert_eq!(format_amount(dec!(12.355)), "12.36");
    }

    #[test]
    fn prints_statement_and_drift_warning() {
        let statement = Statement {
            account: Account {
                balance: dec!(90),
                ..Account::open(10, 1, Some("Ada Lovelace".to_string()))
            },
            transactions: vec![TransactionRecord {
                id: 1,
                account_id: 10,
                name: Some("Ada Lovelace".to_string()),
                amount: dec!(150),
                kind: TransactionKind::Deposit,
                created_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
            }],
        };
        let mut output = Vec::new();
        print_statement(&mut output, &statement).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert_eq!(
            text,
            "Account ID: 10\n\
             Person ID: 1\n\
             Name: Ada Lovelace\n\
             Balance: 90.00\n\
             Transactions:\n\
             ID: 1 | Amount: 150.00 | Type: deposit | Date: 2024-03-01 09:30:00\n\
             Warning: balance 90.00 does not match ledger total 150.00\n"
        );
    }
}
