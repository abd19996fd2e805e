//! Fair-fee redistribution.
//!
//! The network fees of executing a payout are charged to the paid voters in
//! proportion to their payout. Each deduction is rounded up to a whole unit,
//! so the total deducted covers the fees and exceeds them by less than one
//! unit per recipient.

use crate::policy::FairFeeSchedule;
use rust_decimal::Decimal;
use tbw_types::AmountMap;

/// Network fees for paying `recipients` voters plus `extra_recipients` single transfers.
pub fn fair_fee_total(recipients: usize, extra_recipients: usize, schedule: &FairFeeSchedule) -> Decimal {
    let per_tx = schedule.transfers_per_multipayment.max(1) as usize;
    let transactions = recipients.div_ceil(per_tx);

    Decimal::from(transactions as u64) * schedule.multipayment_fee
        + Decimal::from(extra_recipients as u64) * schedule.transfer_fee
}

/// Deduct each payout's proportional share of `total_fees`; returns the amount deducted.
///
/// Payouts reduced to zero are removed.
pub fn apply_fair_fees(payouts: &mut AmountMap, total_fees: Decimal) -> Decimal {
    let total_payout: Decimal = payouts.values().copied().sum();
    if total_payout.is_zero() || total_fees.is_zero() {
        return Decimal::ZERO;
    }

    let mut deducted = Decimal::ZERO;
    for amount in payouts.values_mut() {
        let share = (*amount * total_fees / total_payout).ceil().min(*amount);
        *amount -= share;
        deducted += share;
    }

    payouts.retain(|_, amount| !amount.is_zero());
    deducted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule(per_tx: u32) -> FairFeeSchedule {
        FairFeeSchedule {
            enabled: true,
            transfers_per_multipayment: per_tx,
            multipayment_fee: Decimal::from(10_000_000u64),
            transfer_fee: Decimal::from(1_000_000u64),
        }
    }

    #[test]
    fn total_counts_multipayments_and_extra_transfers() {
        assert_eq!(fair_fee_total(0, 0, &schedule(64)), Decimal::ZERO);
        assert_eq!(fair_fee_total(64, 0, &schedule(64)), Decimal::from(10_000_000u64));
        assert_eq!(fair_fee_total(65, 2, &schedule(64)), Decimal::from(22_000_000u64));
    }

    #[test]
    fn deductions_are_proportional() {
        let mut payouts = AmountMap::from([
            ("A".to_string(), Decimal::from(300_000_000u64)),
            ("B".to_string(), Decimal::from(100_000_000u64)),
        ]);

        let deducted = apply_fair_fees(&mut payouts, Decimal::from(4_000_000u64));

        assert_eq!(deducted, Decimal::from(4_000_000u64));
        assert_eq!(payouts["A"], Decimal::from(297_000_000u64));
        assert_eq!(payouts["B"], Decimal::from(99_000_000u64));
    }

    #[test]
    fn fees_larger_than_payouts_empty_the_set() {
        let mut payouts = AmountMap::from([("A".to_string(), Decimal::from(10u64))]);
        let deducted = apply_fair_fees(&mut payouts, Decimal::from(1_000u64));

        assert_eq!(deducted, Decimal::from(10u64));
        assert!(payouts.is_empty());
    }
}
