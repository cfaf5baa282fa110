//! Interactive menu for the ledger. Input is collected and parsed here; the
//! processor only ever sees well-formed ids and amounts.

use std::{
    fmt,
    io::{self, BufRead, Read, Write},
    str::FromStr,
};

use anyhow::Result;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{error, warn};

use crate::{
    account::AccountId,
    person::{NewPerson, PersonId},
    processor::{Directory, TransactionProcessError, TransactionProcessor},
};
use csv_parser::PeopleCsvParser;
use printer::{format_amount, print_statement};

pub mod csv_parser;
pub mod printer;

/// Registers every row of a `first_name,last_name,email,ip_address` CSV in order.
/// Stops at the first malformed row; rows before it stay registered.
pub fn import_people<D, R>(
    directory: &mut D,
    source: R,
) -> Result<Vec<PersonId>, TransactionProcessError>
where
    D: Directory,
    R: Read,
{
    let mut ids = Vec::new();
    for (line, row) in PeopleCsvParser::new(source) {
        let person = row
            .map_err(|err| TransactionProcessError::InvalidInput(format!("line {line}: {err}")))?;
        ids.push(directory.register_person(person)?);
    }
    Ok(ids)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuOption {
    AddPerson,
    CreateAccount,
    Deposit,
    Withdraw,
    ViewAccount,
    Exit,
}

impl MenuOption {
    pub const ALL: [MenuOption; 6] = [
        MenuOption::AddPerson,
        MenuOption::CreateAccount,
        MenuOption::Deposit,
        MenuOption::Withdraw,
        MenuOption::ViewAccount,
        MenuOption::Exit,
    ];
}

impl fmt::Display for MenuOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MenuOption::AddPerson => "Add a new Person",
            MenuOption::CreateAccount => "Create an Account",
            MenuOption::Deposit => "Deposit Money",
            MenuOption::Withdraw => "Withdraw Money",
            MenuOption::ViewAccount => "View Account",
            MenuOption::Exit => "Exit",
        })
    }
}

impl FromStr for MenuOption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|idx| Self::ALL.get(idx).copied())
            .ok_or_else(|| format!("`{s}` is not a menu option"))
    }
}

#[derive(Debug, Error)]
enum ServiceError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Process(#[from] TransactionProcessError),
}

enum Flow {
    Continue,
    Exit,
}

pub struct Service<'w, R, W: 'w, P> {
    pub input: R,
    pub output: &'w mut W,
    pub processor: &'w mut P,
}

impl<'w, R, W, P> Service<'w, R, W, P>
where
    R: BufRead,
    W: Write + 'w,
    P: TransactionProcessor + Directory,
{
    /// Runs until Exit is chosen or the input ends. Request failures are reported
    /// and the loop goes on; only I/O failures on the menu itself stop it.
    pub fn run(mut self) -> Result<()> {
        loop {
            writeln!(self.output, "What would you like to do?")?;
            for (idx, option) in MenuOption::ALL.iter().enumerate() {
                writeln!(self.output, "{}) {option}", idx + 1)?;
            }
            let Some(choice) = self.ask("")? else {
                break;
            };
            let option = match choice.parse::<MenuOption>() {
                Ok(MenuOption::Exit) => break,
                Ok(option) => option,
                Err(err) => {
                    writeln!(self.output, "Error: {err}")?;
                    continue;
                }
            };
            match self.handle(option) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Exit) => break,
                Err(ServiceError::Io(err)) => return Err(err.into()),
                Err(ServiceError::Process(err)) => {
                    if err.is_recoverable() {
                        warn!(%option, error = %err, "request rejected");
                    } else {
                        error!(%option, error = %err, "request failed");
                    }
                    writeln!(self.output, "Error: {err}")?;
                }
            }
        }
        writeln!(self.output, "Goodbye.")?;
        self.output.flush()?;
        Ok(())
    }

    fn handle(&mut self, option: MenuOption) -> Result<Flow, ServiceError> {
        match option {
            MenuOption::AddPerson => self.add_person(),
            MenuOption::CreateAccount => self.create_account(),
            MenuOption::Deposit => self.deposit(),
            MenuOption::Withdraw => self.withdraw(),
            MenuOption::ViewAccount => self.view_account(),
            MenuOption::Exit => Ok(Flow::Exit),
        }
    }

    fn add_person(&mut self) -> Result<Flow, ServiceError> {
        let Some(first_name) = self.ask("Enter a first name: ")? else {
            return Ok(Flow::Exit);
        };
        let Some(last_name) = self.ask("Enter a last name: ")? else {
            return Ok(Flow::Exit);
        };
        let Some(email) = self.ask("Enter an email address: ")? else {
            return Ok(Flow::Exit);
        };
        let Some(ip_address) = self.ask("Enter an IP address: ")? else {
            return Ok(Flow::Exit);
        };
        let person = NewPerson::new(&first_name, &last_name, &email, &ip_address)
            .map_err(TransactionProcessError::from)?;
        let id = self.processor.register_person(person.clone())?;
        writeln!(
            self.output,
            "Added {} {} with id {id}.",
            person.first_name, person.last_name
        )?;
        Ok(Flow::Continue)
    }

    fn create_account(&mut self) -> Result<Flow, ServiceError> {
        let Some(person_id) =
            self.ask_parsed::<PersonId>("Enter the person ID for the new account: ", "person ID")?
        else {
            return Ok(Flow::Exit);
        };
        let account_id = self.processor.create_account(person_id)?;
        writeln!(self.output, "Account {account_id} created successfully.")?;
        Ok(Flow::Continue)
    }

    fn deposit(&mut self) -> Result<Flow, ServiceError> {
        let Some((account_id, amount)) = self.ask_account_and_amount("deposit")? else {
            return Ok(Flow::Exit);
        };
        let receipt = self.processor.deposit(account_id, amount)?;
        writeln!(
            self.output,
            "Deposit successful. New balance: {}",
            format_amount(receipt.balance)
        )?;
        Ok(Flow::Continue)
    }

    fn withdraw(&mut self) -> Result<Flow, ServiceError> {
        let Some((account_id, amount)) = self.ask_account_and_amount("withdraw")? else {
            return Ok(Flow::Exit);
        };
        let receipt = self.processor.withdraw(account_id, amount)?;
        writeln!(
            self.output,
            "Withdrawal successful. New balance: {}",
            format_amount(receipt.balance)
        )?;
        Ok(Flow::Continue)
    }

    fn view_account(&mut self) -> Result<Flow, ServiceError> {
        let Some(account_id) =
            self.ask_parsed::<AccountId>("Enter the account ID to view: ", "account ID")?
        else {
            return Ok(Flow::Exit);
        };
        let statement = self.processor.account_statement(account_id)?;
        print_statement(&mut *self.output, &statement)?;
        Ok(Flow::Continue)
    }

    fn ask_account_and_amount(
        &mut self,
        verb: &str,
    ) -> Result<Option<(AccountId, Decimal)>, ServiceError> {
        let Some(account_id) = self.ask_parsed::<AccountId>(
            &format!("Enter the account ID to {verb} money: "),
            "account ID",
        )?
        else {
            return Ok(None);
        };
        let Some(amount) =
            self.ask_parsed::<Decimal>(&format!("Enter the amount to {verb}: "), "amount")?
        else {
            return Ok(None);
        };
        Ok(Some((account_id, amount)))
    }

    /// Prints `prompt` and reads one trimmed line; `None` once the input is exhausted.
    fn ask(&mut self, prompt: &str) -> io::Result<Option<String>> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn ask_parsed<T: FromStr>(
        &mut self,
        prompt: &str,
        what: &str,
    ) -> Result<Option<T>, ServiceError> {
        let Some(raw) = self.ask(prompt)? else {
            return Ok(None);
        };
        match raw.parse::<T>() {
            Ok(value) => Ok(Some(value)),
            Err(_) => Err(TransactionProcessError::InvalidInput(format!(
                "`{raw}` is not a valid {what}"
            ))
            .into()),
        }
    }
}
