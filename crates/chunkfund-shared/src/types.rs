use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// Row ids are SQLite INTEGER PRIMARY KEYs
macro_rules! row_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<i64>().map(Self)
            }
        }
    };
}

row_id!(UserId);
row_id!(InvoiceId);
row_id!(TransactionId);
row_id!(TransferId);

/// Returned when a status or role column holds text we do not recognise.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Invoice lifecycle. Only ever moves forward: Pending -> Active -> Paid.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum InvoiceStatus {
    Pending,
    Active,
    Paid,
}

impl InvoiceStatus {
    pub const ALL: [InvoiceStatus; 3] = [Self::Pending, Self::Active, Self::Paid];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Active => "Active",
            Self::Paid => "Paid",
        }
    }

    /// Whether the invoice is still listed for browsing.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::Active)
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Active" => Ok(Self::Active),
            "Paid" => Ok(Self::Paid),
            other => Err(UnknownVariant {
                kind: "invoice status",
                value: other.to_string(),
            }),
        }
    }
}

/// Status of a chunk purchase, mirroring its invoice.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TransactionStatus {
    #[serde(rename = "Pending Activation")]
    PendingActivation,
    Active,
    #[serde(rename = "Paid Out")]
    PaidOut,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingActivation => "Pending Activation",
            Self::Active => "Active",
            Self::PaidOut => "Paid Out",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending Activation" => Ok(Self::PendingActivation),
            "Active" => Ok(Self::Active),
            "Paid Out" => Ok(Self::PaidOut),
            other => Err(UnknownVariant {
                kind: "transaction status",
                value: other.to_string(),
            }),
        }
    }
}

/// The role a party plays in a cash transfer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PartyRole {
    Debtor,
    CollectiveBuyers,
    InvoiceOwner,
    Buyer,
    PlatformOwner,
}

impl PartyRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debtor => "debtor",
            Self::CollectiveBuyers => "collective_buyers",
            Self::InvoiceOwner => "invoice_owner",
            Self::Buyer => "buyer",
            Self::PlatformOwner => "platform_owner",
        }
    }
}

impl FromStr for PartyRole {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debtor" => Ok(Self::Debtor),
            "collective_buyers" => Ok(Self::CollectiveBuyers),
            "invoice_owner" => Ok(Self::InvoiceOwner),
            "buyer" => Ok(Self::Buyer),
            "platform_owner" => Ok(Self::PlatformOwner),
            other => Err(UnknownVariant {
                kind: "party role",
                value: other.to_string(),
            }),
        }
    }
}

/// One endpoint of a cash transfer: a role plus, where the party is a
/// registered user, that user's id.
///
/// Storage keeps the two parts in separate columns; the human-readable
/// label is produced by [`crate::format::party_label`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Party {
    pub role: PartyRole,
    pub user_id: Option<UserId>,
}

impl Party {
    pub fn debtor() -> Self {
        Self {
            role: PartyRole::Debtor,
            user_id: None,
        }
    }

    pub fn collective_buyers() -> Self {
        Self {
            role: PartyRole::CollectiveBuyers,
            user_id: None,
        }
    }

    pub fn invoice_owner(user: UserId) -> Self {
        Self {
            role: PartyRole::InvoiceOwner,
            user_id: Some(user),
        }
    }

    pub fn buyer(user: UserId) -> Self {
        Self {
            role: PartyRole::Buyer,
            user_id: Some(user),
        }
    }

    pub fn platform_owner(user: UserId) -> Self {
        Self {
            role: PartyRole::PlatformOwner,
            user_id: Some(user),
        }
    }
}

/// What a cash transfer records.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TransferKind {
    /// All chunks sold; the collected sale price is released to the owner.
    Funding,
    /// The debtor paid the original invoice amount to the owner.
    DebtorPayment,
    /// Platform's cut of the profit margin.
    PlatformFee,
    /// Owner pays a buyer for the chunks they hold.
    BuyerPayout,
    /// Rounding leftover that stays with the owner.
    OwnerResidual,
}

impl TransferKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Funding => "funding",
            Self::DebtorPayment => "debtor_payment",
            Self::PlatformFee => "platform_fee",
            Self::BuyerPayout => "buyer_payout",
            Self::OwnerResidual => "owner_residual",
        }
    }
}

impl FromStr for TransferKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "funding" => Ok(Self::Funding),
            "debtor_payment" => Ok(Self::DebtorPayment),
            "platform_fee" => Ok(Self::PlatformFee),
            "buyer_payout" => Ok(Self::BuyerPayout),
            "owner_residual" => Ok(Self::OwnerResidual),
            other => Err(UnknownVariant {
                kind: "transfer kind",
                value: other.to_string(),
            }),
        }
    }
}
