//! Display formatting for amounts, parties and transfer events.
//!
//! Nothing here is persisted: the store keeps typed roles and ids, and these
//! helpers turn them into the labels shown to people.

use crate::constants::CURRENCY_SYMBOL;
use crate::types::{Party, PartyRole, TransferKind};

/// Render an amount as baht with two decimals, e.g. `฿1234.50`.
pub fn format_currency(amount: f64) -> String {
    format!("{CURRENCY_SYMBOL}{amount:.2}")
}

/// Human-readable label for a transfer endpoint.
pub fn party_label(party: &Party) -> String {
    match (party.role, party.user_id) {
        (PartyRole::Debtor, _) => "Debtor".to_string(),
        (PartyRole::CollectiveBuyers, _) => "Collective Buyers".to_string(),
        (PartyRole::InvoiceOwner, Some(id)) => format!("Invoice Owner (User {id})"),
        (PartyRole::InvoiceOwner, None) => "Invoice Owner".to_string(),
        (PartyRole::Buyer, Some(id)) => format!("Buyer {id}"),
        (PartyRole::Buyer, None) => "Buyer".to_string(),
        (PartyRole::PlatformOwner, Some(id)) => format!("PLATFORM OWNER (User {id})"),
        (PartyRole::PlatformOwner, None) => "PLATFORM OWNER".to_string(),
    }
}

/// Event description written alongside each transfer.
pub fn transfer_description(kind: TransferKind, to: &Party) -> String {
    match kind {
        TransferKind::Funding => "Invoice Fully Funded - Cash Released to Owner".to_string(),
        TransferKind::DebtorPayment => "Debtor Paid Invoice to Owner".to_string(),
        TransferKind::PlatformFee => "Platform Fee (10% of Profit)".to_string(),
        TransferKind::BuyerPayout => format!("Payout to {} (Owner Paid)", party_label(to)),
        TransferKind::OwnerResidual => "Remaining Balance Kept by Owner".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UserId;

    #[test]
    fn currency_has_two_decimals() {
        assert_eq!(format_currency(45000.0), "฿45000.00");
        assert_eq!(format_currency(99.999), "฿100.00");
    }

    #[test]
    fn party_labels() {
        assert_eq!(party_label(&Party::debtor()), "Debtor");
        assert_eq!(party_label(&Party::collective_buyers()), "Collective Buyers");
        assert_eq!(party_label(&Party::buyer(UserId(5))), "Buyer 5");
        assert_eq!(
            party_label(&Party::invoice_owner(UserId(2))),
            "Invoice Owner (User 2)"
        );
        assert_eq!(
            party_label(&Party::platform_owner(UserId(3))),
            "PLATFORM OWNER (User 3)"
        );
    }

    #[test]
    fn payout_description_names_the_buyer() {
        let desc = transfer_description(TransferKind::BuyerPayout, &Party::buyer(UserId(7)));
        assert_eq!(desc, "Payout to Buyer 7 (Owner Paid)");
    }
}
