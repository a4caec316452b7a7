//! Vouchers and the journal entries that back them.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::*;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
/// Direction of the cash movement a voucher records.
pub enum VoucherKind {
    Receipt,
    Payment,
    TransferOut,
    TransferIn,
}

impl VoucherKind {
    pub fn is_transfer(self) -> bool {
        matches!(self, VoucherKind::TransferOut | VoucherKind::TransferIn)
    }

    /// True when the cash leg of the voucher is debited.
    pub fn debits_cash_leg(self) -> bool {
        matches!(self, VoucherKind::Receipt | VoucherKind::TransferIn)
    }
}

impl fmt::Display for VoucherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            VoucherKind::Receipt => "receipt",
            VoucherKind::Payment => "payment",
            VoucherKind::TransferOut => "transferOut",
            VoucherKind::TransferIn => "transferIn",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "camelCase")]
/// How the money physically moved.
pub enum PaymentMethod {
    #[default]
    Cash,
    BankTransfer,
    Cheque,
    Card,
    Other,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::BankTransfer => "Bank transfer",
            PaymentMethod::Cheque => "Cheque",
            PaymentMethod::Card => "Card",
            PaymentMethod::Other => "Other",
        };
        f.write_str(label)
    }
}

/// A receipt, payment, or transfer leg. Always backed by exactly two balanced entries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Voucher {
    pub id: Uuid,
    pub number: u64,
    pub date: NaiveDate,
    pub kind: VoucherKind,
    /// The cash or bank leg.
    pub account_id: Uuid,
    /// The opposite account; for transfers, the account on the other side of the move.
    #[serde(default)]
    pub contra_account_id: Option<Uuid>,
    #[serde(default)]
    pub party_id: Option<Uuid>,
    #[serde(default)]
    pub partner_id: Option<Uuid>,
    #[serde(default)]
    pub investor_id: Option<Uuid>,
    #[serde(default)]
    pub project_id: Option<Uuid>,
    #[serde(default)]
    pub category_id: Option<Uuid>,
    pub amount: Decimal,
    #[serde(default)]
    pub method: PaymentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Correlates the `transferOut` and `transferIn` legs of one transfer.
    #[serde(default)]
    pub transfer_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identifiable for Voucher {
    fn id(&self) -> Uuid {
        self.id
    }
}

/// One debit-or-credit line of a voucher.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entry {
    pub id: Uuid,
    pub voucher_id: Uuid,
    pub account_id: Uuid,
    pub debit: Decimal,
    pub credit: Decimal,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Entry {
    pub fn debit(voucher: &Voucher, account_id: Uuid, amount: Decimal) -> Self {
        Self::line(voucher, account_id, amount, Decimal::ZERO)
    }

    pub fn credit(voucher: &Voucher, account_id: Uuid, amount: Decimal) -> Self {
        Self::line(voucher, account_id, Decimal::ZERO, amount)
    }

    fn line(voucher: &Voucher, account_id: Uuid, debit: Decimal, credit: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            voucher_id: voucher.id,
            account_id,
            debit,
            credit,
            date: voucher.date,
            notes: voucher.description.clone(),
        }
    }

    /// Signed effect on the account balance (`debit - credit`).
    pub fn net(&self) -> Decimal {
        self.debit - self.credit
    }

    /// Exactly one side is positive and the other is zero.
    pub fn is_well_formed(&self) -> bool {
        let debit_only = self.debit > Decimal::ZERO && self.credit.is_zero();
        let credit_only = self.credit > Decimal::ZERO && self.debit.is_zero();
        debit_only || credit_only
    }
}

impl Identifiable for Entry {
    fn id(&self) -> Uuid {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voucher(kind: VoucherKind) -> Voucher {
        let now = Utc::now();
        Voucher {
            id: Uuid::new_v4(),
            number: 1,
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            kind,
            account_id: Uuid::new_v4(),
            contra_account_id: None,
            party_id: None,
            partner_id: None,
            investor_id: None,
            project_id: None,
            category_id: None,
            amount: Decimal::new(1000, 0),
            method: PaymentMethod::Cash,
            description: Some("rent".into()),
            transfer_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn entries_carry_exactly_one_side() {
        let v = voucher(VoucherKind::Receipt);
        let debit = Entry::debit(&v, v.account_id, v.amount);
        let credit = Entry::credit(&v, Uuid::new_v4(), v.amount);
        assert!(debit.is_well_formed());
        assert!(credit.is_well_formed());
        assert_eq!(debit.net() + credit.net(), Decimal::ZERO);
        assert_eq!(debit.notes.as_deref(), Some("rent"));
    }

    #[test]
    fn kind_serializes_in_camel_case() {
        let json = serde_json::to_string(&VoucherKind::TransferOut).unwrap();
        assert_eq!(json, "\"transferOut\"");
        assert!(VoucherKind::TransferIn.debits_cash_leg());
        assert!(!VoucherKind::Payment.debits_cash_leg());
    }
}
