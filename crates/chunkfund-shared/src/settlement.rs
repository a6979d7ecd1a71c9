//! Pure settlement arithmetic.
//!
//! Everything in this module is side-effect free: the store layer feeds it
//! invoice figures and buyer holdings, and writes the resulting transfers.
//!
//! The rules:
//! 1. An invoice is cut into `floor(sale_price / 100)` chunks of ฿100.
//! 2. When the debtor pays, buyers have paid `chunks_total * 100` in total and
//!    the profit is `original_amount - chunks_total * 100`.
//! 3. The platform takes 10% of that profit. The fee is not clamped, so a
//!    loss-making invoice produces a negative fee (which is never transferred).
//! 4. Each chunk pays out `(original_amount - fee) / chunks_total`.
//! 5. Whatever is left after the fee and the payouts stays with the owner.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::{CHUNK_PRICE, DUST_THRESHOLD, PLATFORM_FEE_RATE};
use crate::error::LedgerError;
use crate::types::UserId;

/// Reject NaN, infinities and non-positive amounts.
pub fn validate_amount(field: &'static str, value: f64) -> Result<f64, LedgerError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(LedgerError::InvalidAmount { field, value })
    }
}

/// Number of chunks an invoice with this sale price is split into.
pub fn chunks_for_sale_price(sale_price: f64) -> Result<u32, LedgerError> {
    let sale_price = validate_amount("desired_sale_price", sale_price)?;
    let chunks = (sale_price / CHUNK_PRICE).floor();
    if chunks < 1.0 {
        return Err(LedgerError::SalePriceBelowChunk(sale_price));
    }
    if chunks > f64::from(u32::MAX) {
        return Err(LedgerError::InvalidAmount {
            field: "desired_sale_price",
            value: sale_price,
        });
    }
    Ok(chunks as u32)
}

/// Expected profit on one chunk before the platform fee.
pub fn chunk_profit_preview(original_amount: f64, sale_price: f64) -> Result<f64, LedgerError> {
    let original_amount = validate_amount("original_amount", original_amount)?;
    let sale_price = validate_amount("desired_sale_price", sale_price)?;
    Ok(original_amount / sale_price * CHUNK_PRICE - CHUNK_PRICE)
}

pub fn is_fully_funded(chunks_sold: u32, chunks_total: u32) -> bool {
    chunks_sold >= chunks_total
}

/// Chunks held by one buyer in one invoice.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Holding {
    pub buyer: UserId,
    pub chunks: u32,
}

/// Collapse individual purchases into one holding per buyer, ordered by
/// buyer id.
pub fn group_holdings<I>(purchases: I) -> Vec<Holding>
where
    I: IntoIterator<Item = (UserId, u32)>,
{
    let mut by_buyer: BTreeMap<UserId, u32> = BTreeMap::new();
    for (buyer, chunks) in purchases {
        *by_buyer.entry(buyer).or_default() += chunks;
    }
    by_buyer
        .into_iter()
        .map(|(buyer, chunks)| Holding { buyer, chunks })
        .collect()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BuyerPayout {
    pub buyer: UserId,
    pub chunks: u32,
    pub amount: f64,
}

/// The full money movement for one owner-confirmed debtor payment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SettlementPlan {
    pub original_amount: f64,
    pub chunks_total: u32,
    pub total_paid_by_buyers: f64,
    pub total_profit: f64,
    pub platform_fee: f64,
    pub net_payout_per_chunk: f64,
    pub buyer_payouts: Vec<BuyerPayout>,
    pub residual: f64,
}

impl SettlementPlan {
    /// Work out fee, per-chunk payout and each buyer's share.
    ///
    /// `holdings` should already be grouped per buyer (see [`group_holdings`]);
    /// payouts are emitted in the order given.
    pub fn compute(
        original_amount: f64,
        chunks_total: u32,
        holdings: &[Holding],
    ) -> Result<Self, LedgerError> {
        let original_amount = validate_amount("original_amount", original_amount)?;
        if chunks_total == 0 {
            return Err(LedgerError::ZeroChunks);
        }

        let chunks = f64::from(chunks_total);
        let total_paid_by_buyers = chunks * CHUNK_PRICE;
        let total_profit = original_amount - total_paid_by_buyers;
        let platform_fee = total_profit * PLATFORM_FEE_RATE;
        let net_payout_per_chunk = original_amount / chunks - platform_fee / chunks;

        let buyer_payouts: Vec<BuyerPayout> = holdings
            .iter()
            .map(|h| BuyerPayout {
                buyer: h.buyer,
                chunks: h.chunks,
                amount: f64::from(h.chunks) * net_payout_per_chunk,
            })
            .collect();

        let paid_out: f64 = buyer_payouts.iter().map(|p| p.amount).sum();
        let residual = original_amount - platform_fee - paid_out;

        Ok(Self {
            original_amount,
            chunks_total,
            total_paid_by_buyers,
            total_profit,
            platform_fee,
            net_payout_per_chunk,
            buyer_payouts,
            residual,
        })
    }

    /// Whether a fee transfer to the platform owner is recorded.
    pub fn charges_fee(&self) -> bool {
        self.platform_fee > DUST_THRESHOLD
    }

    /// Whether a residual self-transfer for the owner is recorded.
    pub fn keeps_residual(&self) -> bool {
        self.residual > DUST_THRESHOLD
    }

    pub fn total_buyer_payouts(&self) -> f64 {
        self.buyer_payouts.iter().map(|p| p.amount).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn chunks_are_floor_of_sale_price() {
        assert_eq!(chunks_for_sale_price(45000.0).unwrap(), 450);
        assert_eq!(chunks_for_sale_price(45099.99).unwrap(), 450);
        assert_eq!(chunks_for_sale_price(100.0).unwrap(), 1);
    }

    #[test]
    fn sale_price_below_one_chunk_is_rejected() {
        assert_eq!(
            chunks_for_sale_price(99.0),
            Err(LedgerError::SalePriceBelowChunk(99.0))
        );
        assert!(chunks_for_sale_price(f64::NAN).is_err());
        assert!(chunks_for_sale_price(-500.0).is_err());
    }

    #[test]
    fn profit_preview_per_chunk() {
        let preview = chunk_profit_preview(50000.0, 45000.0).unwrap();
        assert!(close(preview, 50000.0 / 45000.0 * 100.0 - 100.0));
    }

    #[test]
    fn holdings_are_grouped_and_sorted() {
        let grouped = group_holdings([
            (UserId(9), 5),
            (UserId(2), 10),
            (UserId(9), 3),
        ]);
        assert_eq!(
            grouped,
            vec![
                Holding { buyer: UserId(2), chunks: 10 },
                Holding { buyer: UserId(9), chunks: 8 },
            ]
        );
    }

    #[test]
    fn scenario_fifty_thousand_invoice() {
        let holdings = [
            Holding { buyer: UserId(2), chunks: 10 },
            Holding { buyer: UserId(3), chunks: 440 },
        ];
        let plan = SettlementPlan::compute(50000.0, 450, &holdings).unwrap();

        assert!(close(plan.total_paid_by_buyers, 45000.0));
        assert!(close(plan.total_profit, 5000.0));
        assert!(close(plan.platform_fee, 500.0));
        assert!(close(plan.net_payout_per_chunk, 50000.0 / 450.0 - 500.0 / 450.0));
        assert!(close(plan.buyer_payouts[0].amount, 10.0 * plan.net_payout_per_chunk));
        assert!(plan.charges_fee());
        assert!(!plan.keeps_residual());
    }

    #[test]
    fn payouts_fee_and_residual_sum_to_original() {
        let holdings = [
            Holding { buyer: UserId(1), chunks: 1 },
            Holding { buyer: UserId(2), chunks: 2 },
        ];
        let plan = SettlementPlan::compute(1000.0, 3, &holdings).unwrap();
        let total = plan.total_buyer_payouts() + plan.platform_fee + plan.residual;
        assert!(close(total, 1000.0));
    }

    #[test]
    fn unsold_chunks_leave_a_residual_with_the_owner() {
        let holdings = [Holding { buyer: UserId(4), chunks: 5 }];
        let plan = SettlementPlan::compute(1200.0, 10, &holdings).unwrap();
        assert!(plan.keeps_residual());
        assert!(close(plan.residual, 1200.0 - plan.platform_fee - 5.0 * plan.net_payout_per_chunk));
    }

    #[test]
    fn loss_yields_negative_fee_that_is_not_charged() {
        let holdings = [Holding { buyer: UserId(1), chunks: 10 }];
        let plan = SettlementPlan::compute(900.0, 10, &holdings).unwrap();
        assert!(close(plan.total_profit, -100.0));
        assert!(close(plan.platform_fee, -10.0));
        assert!(!plan.charges_fee());
        assert!(close(plan.net_payout_per_chunk, 91.0));
    }

    #[test]
    fn zero_chunks_cannot_be_settled() {
        assert_eq!(
            SettlementPlan::compute(1000.0, 0, &[]),
            Err(LedgerError::ZeroChunks)
        );
    }
}
