use serde::Deserialize;
use thiserror::Error;

pub type PersonId = i64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PersonError {
    #[error("Person {field} must not be blank")]
    BlankName { field: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Person {
    pub id: PersonId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub ip_address: String,
}

impl Person {
    pub fn account_name(&self) -> Option<String> {
        account_name(&self.first_name, &self.last_name)
    }
}

/// Person registration request, before storage assigns an id.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewPerson {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub ip_address: String,
}

impl NewPerson {
    /// Trims every field and requires both name parts.
    pub fn new(
        first_name: &str,
        last_name: &str,
        email: &str,
        ip_address: &str,
    ) -> Result<Self, PersonError> {
        let person = Self {
            first_name: first_name.trim().to_string(),
            last_name: last_name.trim().to_string(),
            email: email.trim().to_string(),
            ip_address: ip_address.trim().to_string(),
        };
        person.validate()?;
        Ok(person)
    }

    pub fn validate(&self) -> Result<(), PersonError> {
        if self.first_name.trim().is_empty() {
            return Err(PersonError::BlankName {
                field: "first name",
            });
        }
        if self.last_name.trim().is_empty() {
            return Err(PersonError::BlankName { field: "last name" });
        }
        Ok(())
    }

    pub fn with_id(self, id: PersonId) -> Person {
        Person {
            id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            ip_address: self.ip_address,
        }
    }
}

/// Display label given to accounts: "first last", or `None` when both are blank.
pub fn account_name(first_name: &str, last_name: &str) -> Option<String> {
    let name = format!("{} {}", first_name.trim(), last_name.trim());
    let name = name.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}
