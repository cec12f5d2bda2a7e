//! # Parties, Roles and Sessions
//!
//! Three human actors participate in clearance: the sender, the receiver
//! and the clearance agency. A fourth, `System`, acts for scheduled work
//! such as timeout enforcement.
//!
//! A [`Session`] binds a role to a subject. For senders the subject is the
//! owning account id; for receivers it is the receiver's email address;
//! for the agency it is the officer id.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{bounded_text, ValidationError};
use crate::identity::EmailAddress;

// ── Role ────────────────────────────────────────────────────────────────────

/// Actor role. Every engine call is attributed to exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The party that created and ships the parcel.
    Sender,
    /// The consignee.
    Receiver,
    /// The clearance agency.
    Agency,
    /// Scheduled or automatic actions.
    System,
}

impl Role {
    /// Return the string representation of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sender => "sender",
            Self::Receiver => "receiver",
            Self::Agency => "agency",
            Self::System => "system",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sender" => Ok(Self::Sender),
            "receiver" => Ok(Self::Receiver),
            "agency" => Ok(Self::Agency),
            "system" => Ok(Self::System),
            _ => Err(ValidationError::Unknown {
                kind: "role",
                value: s.to_string(),
            }),
        }
    }
}

// ── Session ─────────────────────────────────────────────────────────────────

/// Explicit caller identity passed into every engine operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// The caller's role.
    pub role: Role,
    /// Account id (sender), email (receiver), officer id (agency).
    pub subject: String,
}

impl Session {
    /// A sender acting for `account`.
    pub fn sender(account: impl Into<String>) -> Self {
        Self {
            role: Role::Sender,
            subject: account.into(),
        }
    }

    /// A receiver identified by email.
    pub fn receiver(email: impl Into<String>) -> Self {
        Self {
            role: Role::Receiver,
            subject: email.into(),
        }
    }

    /// An agency officer.
    pub fn agency(officer: impl Into<String>) -> Self {
        Self {
            role: Role::Agency,
            subject: officer.into(),
        }
    }

    /// The scheduler.
    pub fn system() -> Self {
        Self {
            role: Role::System,
            subject: "system".to_string(),
        }
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.role, self.subject)
    }
}

// ── Duty mode ───────────────────────────────────────────────────────────────

/// Who pays import duty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DutyMode {
    /// Delivered Duty Paid: the sender pays.
    #[serde(rename = "DDP")]
    Ddp,
    /// Delivered At Place: the receiver pays.
    #[serde(rename = "DAP")]
    Dap,
}

impl DutyMode {
    /// The role responsible for the duty payment.
    pub fn duty_payer(&self) -> Role {
        match self {
            Self::Ddp => Role::Sender,
            Self::Dap => Role::Receiver,
        }
    }

    /// Return the string representation of this mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ddp => "DDP",
            Self::Dap => "DAP",
        }
    }
}

impl fmt::Display for DutyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DutyMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DDP" => Ok(Self::Ddp),
            "DAP" => Ok(Self::Dap),
            _ => Err(ValidationError::Unknown {
                kind: "duty mode",
                value: s.to_string(),
            }),
        }
    }
}

// ── Document party ──────────────────────────────────────────────────────────

/// The party a document is requested from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentParty {
    /// Requested from the sender.
    Sender,
    /// Requested from the receiver.
    Receiver,
}

impl DocumentParty {
    /// The role that may fulfil requirements for this party.
    pub fn role(&self) -> Role {
        match self {
            Self::Sender => Role::Sender,
            Self::Receiver => Role::Receiver,
        }
    }

    /// Map a role to its document party, if it has one.
    pub fn for_role(role: Role) -> Option<Self> {
        match role {
            Role::Sender => Some(Self::Sender),
            Role::Receiver => Some(Self::Receiver),
            Role::Agency | Role::System => None,
        }
    }

    /// Return the string representation of this party.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sender => "sender",
            Self::Receiver => "receiver",
        }
    }
}

impl fmt::Display for DocumentParty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentParty {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sender" => Ok(Self::Sender),
            "receiver" => Ok(Self::Receiver),
            _ => Err(ValidationError::Unknown {
                kind: "document party",
                value: s.to_string(),
            }),
        }
    }
}

// ── Party details ───────────────────────────────────────────────────────────

/// Postal address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Street line.
    pub line1: String,
    /// City.
    pub city: String,
    /// State or province.
    pub state: String,
    /// Postal code.
    pub postal_code: String,
    /// Country name or ISO code.
    pub country: String,
}

impl Address {
    /// Check every field is present and bounded.
    pub fn validate(&self) -> Result<(), ValidationError> {
        bounded_text("address line", &self.line1, 256)?;
        bounded_text("city", &self.city, 128)?;
        bounded_text("state", &self.state, 128)?;
        bounded_text("postal code", &self.postal_code, 16)?;
        bounded_text("country", &self.country, 64)?;
        Ok(())
    }
}

/// Sender or receiver contact details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    /// Full name or company name.
    pub name: String,
    /// Email address; notifications go here.
    pub email: EmailAddress,
    /// Phone number as entered.
    pub phone: String,
    /// Postal address.
    pub address: Address,
}

impl Party {
    /// Check name, phone and address.
    pub fn validate(&self) -> Result<(), ValidationError> {
        bounded_text("party name", &self.name, 128)?;
        let phone = bounded_text("phone", &self.phone, 32)?;
        if !phone
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')'))
        {
            return Err(ValidationError::OutOfRange {
                field: "phone",
                reason: "digits, spaces, '+', '-', '(' and ')' only".to_string(),
            });
        }
        self.address.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> Address {
        Address {
            line1: "12 Harbour Road".to_string(),
            city: "Mumbai".to_string(),
            state: "MH".to_string(),
            postal_code: "400001".to_string(),
            country: "IN".to_string(),
        }
    }

    #[test]
    fn role_round_trips_through_str() {
        for role in [Role::Sender, Role::Receiver, Role::Agency, Role::System] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn duty_mode_picks_payer() {
        assert_eq!(DutyMode::Ddp.duty_payer(), Role::Sender);
        assert_eq!(DutyMode::Dap.duty_payer(), Role::Receiver);
    }

    #[test]
    fn duty_mode_serde_uses_incoterm_codes() {
        assert_eq!(serde_json::to_string(&DutyMode::Dap).unwrap(), "\"DAP\"");
        let mode: DutyMode = serde_json::from_str("\"DDP\"").unwrap();
        assert_eq!(mode, DutyMode::Ddp);
        assert_eq!("dap".parse::<DutyMode>().unwrap(), DutyMode::Dap);
    }

    #[test]
    fn document_party_maps_roles() {
        assert_eq!(DocumentParty::for_role(Role::Receiver), Some(DocumentParty::Receiver));
        assert_eq!(DocumentParty::for_role(Role::Agency), None);
        assert_eq!(DocumentParty::Sender.role(), Role::Sender);
    }

    #[test]
    fn party_validation_rejects_letters_in_phone() {
        let party = Party {
            name: "Asha Traders".to_string(),
            email: EmailAddress::new("asha@example.com").unwrap(),
            phone: "call me".to_string(),
            address: address(),
        };
        assert!(party.validate().is_err());
    }

    #[test]
    fn party_validation_accepts_formatted_phone() {
        let party = Party {
            name: "Asha Traders".to_string(),
            email: EmailAddress::new("asha@example.com").unwrap(),
            phone: "+91 (22) 5555-0100".to_string(),
            address: address(),
        };
        assert!(party.validate().is_ok());
    }

    #[test]
    fn session_display() {
        assert_eq!(Session::agency("officer-7").to_string(), "agency:officer-7");
        assert_eq!(Session::system().role, Role::System);
    }
}
