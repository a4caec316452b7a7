//! Greedy debt netting between over- and under-paid investors.
//!
//! Creditors (positive balance) and debtors (negative balance, taken by magnitude) are each
//! ordered largest first. The current largest debtor pays the current largest creditor
//! `min(debtor remaining, creditor remaining)`; a party leaves its queue once its remainder
//! drops below the epsilon. The result is deterministic and has at most
//! `creditors + debtors - 1` transfers, though not always the fewest possible.

use std::{cmp::Ordering, collections::HashMap};

use rust_decimal::Decimal;
use treasury_domain::{round_money, InvestorSettlement, SettlementTransfer};
use uuid::Uuid;

fn by_magnitude(
    a: &(&InvestorSettlement, Decimal),
    b: &(&InvestorSettlement, Decimal),
) -> Ordering {
    b.1.cmp(&a.1)
        .then_with(|| a.0.investor_name.cmp(&b.0.investor_name))
        .then_with(|| a.0.investor_id.cmp(&b.0.investor_id))
}

fn queue(
    balances: &[InvestorSettlement],
    magnitude: impl Fn(Decimal) -> Decimal,
    epsilon: Decimal,
) -> Vec<(&InvestorSettlement, Decimal)> {
    let mut parties: Vec<_> = balances
        .iter()
        .map(|investor| (investor, magnitude(investor.balance)))
        .filter(|(_, remaining)| *remaining >= epsilon)
        .collect();
    parties.sort_by(by_magnitude);
    parties
}

/// Builds the netting plan for a set of investor balances. Does not touch its input.
pub fn net_balances(balances: &[InvestorSettlement], epsilon: Decimal) -> Vec<SettlementTransfer> {
    let creditors = queue(balances, |balance| balance, epsilon);
    let debtors = queue(balances, |balance| -balance, epsilon);

    let remaining_of = |parties: &[(&InvestorSettlement, Decimal)], index: usize| {
        parties.get(index).map_or(Decimal::ZERO, |(_, amount)| *amount)
    };

    let mut plan = Vec::new();
    let (mut ci, mut di) = (0, 0);
    let mut credit_left = remaining_of(&creditors, 0);
    let mut debit_left = remaining_of(&debtors, 0);
    while ci < creditors.len() && di < debtors.len() {
        let amount = credit_left.min(debit_left);
        let (creditor, _) = creditors[ci];
        let (debtor, _) = debtors[di];
        plan.push(SettlementTransfer {
            from_investor: debtor.investor_id,
            from_name: debtor.investor_name.clone(),
            to_investor: creditor.investor_id,
            to_name: creditor.investor_name.clone(),
            amount: round_money(amount),
        });
        credit_left -= amount;
        debit_left -= amount;
        if credit_left < epsilon {
            ci += 1;
            credit_left = remaining_of(&creditors, ci);
        }
        if debit_left < epsilon {
            di += 1;
            debit_left = remaining_of(&debtors, di);
        }
    }
    plan
}

/// Balances left after every transfer of `plan` has been paid.
pub fn residual_balances(
    balances: &[InvestorSettlement],
    plan: &[SettlementTransfer],
) -> HashMap<Uuid, Decimal> {
    let mut residual: HashMap<Uuid, Decimal> = balances
        .iter()
        .map(|investor| (investor.investor_id, investor.balance))
        .collect();
    for transfer in plan {
        *residual.entry(transfer.from_investor).or_default() += transfer.amount;
        *residual.entry(transfer.to_investor).or_default() -= transfer.amount;
    }
    residual
}

#[cfg(test)]
mod tests {
    use super::*;
    use treasury_domain::CENT;

    fn investor(name: &str, balance: i64) -> InvestorSettlement {
        InvestorSettlement {
            investor_id: Uuid::new_v4(),
            investor_name: name.into(),
            ratio: Decimal::ZERO,
            paid: Decimal::ZERO,
            fair_share: Decimal::ZERO,
            balance: Decimal::new(balance, 2),
        }
    }

    #[test]
    fn two_party_plan_is_a_single_transfer() {
        let balances = [investor("X", 28000), investor("Y", -28000)];
        let plan = net_balances(&balances, CENT);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].to_string(), "Y pays 280.00 to X");
    }

    #[test]
    fn largest_debtor_pays_largest_creditor_first() {
        let balances = [
            investor("A", 5000),
            investor("B", 15000),
            investor("C", -12000),
            investor("D", -8000),
        ];
        let plan = net_balances(&balances, CENT);
        let lines: Vec<String> = plan.iter().map(ToString::to_string).collect();
        assert_eq!(
            lines,
            vec![
                "C pays 120.00 to B",
                "D pays 30.00 to B",
                "D pays 50.00 to A"
            ]
        );
        assert!(plan.len() <= 2 + 2 - 1);
        for (_, left) in residual_balances(&balances, &plan) {
            assert!(left.abs() < CENT, "left {left}");
        }
    }

    #[test]
    fn sub_cent_balances_produce_no_transfers() {
        let balances = [
            InvestorSettlement {
                balance: Decimal::new(4, 3),
                ..investor("A", 0)
            },
            InvestorSettlement {
                balance: Decimal::new(-4, 3),
                ..investor("B", 0)
            },
        ];
        assert!(net_balances(&balances, CENT).is_empty());
        assert!(net_balances(&[], CENT).is_empty());
    }

    #[test]
    fn plan_is_deterministic_and_input_is_untouched() {
        let balances = vec![
            investor("A", 1000),
            investor("B", 1000),
            investor("C", -2000),
        ];
        let before = balances.clone();
        let first = net_balances(&balances, CENT);
        let second = net_balances(&balances, CENT);
        assert_eq!(first, second);
        assert_eq!(balances, before);
        assert_eq!(first[0].to_name, "A");
    }
}
