//! Customer master directory
//!
//! The desk only needs two operations on the customer master. The stub
//! returns fixed records so conversations are reproducible.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::Result;

/// One row of the customer master
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub name: String,
    pub address: String,
    pub phone: String,
}

impl CustomerRecord {
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        phone: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            phone: phone.into(),
        }
    }
}

impl fmt::Display for CustomerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n{}\n{}", self.name, self.address, self.phone)
    }
}

/// Lookup and update by bank card number
pub trait CustomerDirectory: Send + Sync {
    fn lookup(&self, card_number: &str) -> Result<CustomerRecord>;

    /// Change the registered address and return the updated record
    fn update_address(&self, card_number: &str, new_address: &str) -> Result<CustomerRecord>;
}

/// Hard-coded directory; inputs are ignored
#[derive(Debug, Clone, Default)]
pub struct StubDirectory;

impl StubDirectory {
    const NAME: &'static str = "マイクロ太郎";
    const PHONE: &'static str = "03-4332-5300";
    const CURRENT_ADDRESS: &'static str = "港区港南 2-16-3";
    const UPDATED_ADDRESS: &'static str = "港区港南 9-86-7";

    pub fn new() -> Self {
        Self
    }
}

impl CustomerDirectory for StubDirectory {
    fn lookup(&self, _card_number: &str) -> Result<CustomerRecord> {
        Ok(CustomerRecord::new(Self::NAME, Self::CURRENT_ADDRESS, Self::PHONE))
    }

    fn update_address(&self, _card_number: &str, _new_address: &str) -> Result<CustomerRecord> {
        Ok(CustomerRecord::new(Self::NAME, Self::UPDATED_ADDRESS, Self::PHONE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stub_lookup_is_deterministic() {
        let directory = StubDirectory::new();
        let first = directory.lookup("1234").unwrap();
        let second = directory.lookup("9999").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.address, "港区港南 2-16-3");
    }

    #[test]
    fn test_stub_update_ignores_inputs() {
        let record = StubDirectory::new()
            .update_address("1234", "千代田区1-1")
            .unwrap();
        assert_eq!(record.name, "マイクロ太郎");
        assert_eq!(record.address, "港区港南 9-86-7");
        assert_eq!(record.phone, "03-4332-5300");
    }

    #[test]
    fn test_record_display() {
        let record = StubDirectory::new().lookup("1").unwrap();
        assert_eq!(record.to_string(), "マイクロ太郎\n港区港南 2-16-3\n03-4332-5300");
    }
}
