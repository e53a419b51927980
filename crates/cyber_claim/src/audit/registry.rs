//! Contract address ↔ role name registry, used only to make audit output readable.

use crate::config::ContractsConfig;
use std::collections::HashMap;

pub const GIFT_ROLE: &str = "Gift Contract";
pub const PASSPORT_ROLE: &str = "Passport Contract";

#[derive(Clone, Debug, Default)]
pub struct ContractRegistry {
    by_address: HashMap<String, String>,
    by_role: HashMap<String, String>,
}

impl ContractRegistry {
    pub fn new<I, A, R>(entries: I) -> Self
    where
        I: IntoIterator<Item = (A, R)>,
        A: Into<String>,
        R: Into<String>,
    {
        let mut registry = Self::default();
        registry.replace_all(entries);
        registry
    }

    /// Gift and passport contracts under their standard roles, plus configured extras.
    pub fn from_contracts(contracts: &ContractsConfig) -> Self {
        let mut entries: Vec<(String, String)> = vec![
            (contracts.gift.clone(), GIFT_ROLE.to_string()),
            (contracts.passport.clone(), PASSPORT_ROLE.to_string()),
        ];
        entries.extend(
            contracts
                .extra
                .iter()
                .map(|(role, address)| (address.clone(), role.clone())),
        );
        Self::new(entries.into_iter().filter(|(a, _)| !a.is_empty()))
    }

    /// Drop every entry and load `entries`. The only way to change a built registry.
    pub fn replace_all<I, A, R>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (A, R)>,
        A: Into<String>,
        R: Into<String>,
    {
        self.by_address.clear();
        self.by_role.clear();
        for (address, role) in entries {
            let (address, role) = (address.into(), role.into());
            if let Some(old_role) = self.by_address.insert(address.clone(), role.clone()) {
                self.by_role.remove(&old_role);
            }
            if let Some(old_address) = self.by_role.insert(role, address.clone()) {
                if old_address != address {
                    self.by_address.remove(&old_address);
                }
            }
        }
    }

    pub fn role_of(&self, address: &str) -> Option<&str> {
        self.by_address.get(address).map(String::as_str)
    }

    pub fn address_of(&self, role: &str) -> Option<&str> {
        self.by_role.get(role).map(String::as_str)
    }

    /// Role name for a known address, otherwise the value unchanged.
    pub fn resolve<'a>(&'a self, value: &'a str) -> &'a str {
        self.role_of(value).unwrap_or(value)
    }

    pub fn len(&self) -> usize {
        self.by_address.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_address.is_empty()
    }
}
