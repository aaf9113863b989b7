//! Vaults and their append-only ledger entries.

use crate::domain::{Asset, Decimal, TimeMs};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VaultStatus {
    Active,
    Closed,
}

impl VaultStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VaultStatus::Active => "ACTIVE",
            VaultStatus::Closed => "CLOSED",
        }
    }
}

impl FromStr for VaultStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(VaultStatus::Active),
            "CLOSED" => Ok(VaultStatus::Closed),
            other => Err(format!("unknown vault status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vault {
    pub name: String,
    pub status: VaultStatus,
    pub created_at: TimeMs,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<TimeMs>,
}

impl Vault {
    pub fn is_active(&self) -> bool {
        self.status == VaultStatus::Active
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntryType {
    Deposit,
    Withdraw,
    /// Manually reported total value of the vault (e.g. a third-party NAV).
    Valuation,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Deposit => "DEPOSIT",
            EntryType::Withdraw => "WITHDRAW",
            EntryType::Valuation => "VALUATION",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEPOSIT" => Ok(EntryType::Deposit),
            "WITHDRAW" => Ok(EntryType::Withdraw),
            "VALUATION" => Ok(EntryType::Valuation),
            other => Err(format!("unknown entry type: {}", other)),
        }
    }
}

/// A single ledger line. `id` is assigned by the store on append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub vault: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub asset: Asset,
    pub amount: Decimal,
    #[serde(rename = "usdValue")]
    pub usd_value: Decimal,
    pub at: TimeMs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Caller-supplied idempotency reference, unique within a vault.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl VaultEntry {
    pub fn new(
        vault: &str,
        entry_type: EntryType,
        asset: Asset,
        amount: Decimal,
        usd_value: Decimal,
        at: TimeMs,
    ) -> Self {
        Self {
            id: None,
            vault: vault.to_string(),
            entry_type,
            asset,
            amount,
            usd_value,
            at,
            account: None,
            note: None,
            reference: None,
        }
    }

    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_type_parse_case_insensitive() {
        assert_eq!("deposit".parse::<EntryType>(), Ok(EntryType::Deposit));
        assert_eq!("VALUATION".parse::<EntryType>(), Ok(EntryType::Valuation));
        assert!("transfer".parse::<EntryType>().is_err());
    }

    #[test]
    fn test_entry_json_shape() {
        let entry = VaultEntry::new(
            "hlp",
            EntryType::Deposit,
            Asset::crypto("usdc"),
            Decimal::from_i64(100),
            Decimal::from_i64(100),
            TimeMs::new(1000),
        )
        .with_account("main");

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "DEPOSIT");
        assert_eq!(json["usdValue"], 100.0);
        assert_eq!(json["account"], "main");
        assert!(json.get("id").is_none());
        assert!(json.get("note").is_none());
    }
}
