//! Voucher engine: balanced postings for receipts, payments, and transfers.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use treasury_domain::{
    Entry, Ledger, PartyKind, PaymentMethod, SettlementExpense, Voucher, VoucherKind,
};
use uuid::Uuid;

use crate::{account_service::AccountService, CoreError};

/// Intent to post a receipt or payment.
#[derive(Debug, Clone, PartialEq)]
pub struct VoucherDraft {
    pub kind: VoucherKind,
    pub date: NaiveDate,
    pub cash_account: Uuid,
    pub contra_account: Option<Uuid>,
    pub amount: Decimal,
    pub party: Option<Uuid>,
    pub partner: Option<Uuid>,
    /// Set on a payment funded by an investor; mirrors the payment as a settlement expense.
    pub investor: Option<Uuid>,
    pub project: Option<Uuid>,
    pub category: Option<Uuid>,
    pub method: PaymentMethod,
    pub notes: Option<String>,
}

impl VoucherDraft {
    pub fn new(
        kind: VoucherKind,
        date: NaiveDate,
        cash_account: Uuid,
        contra_account: Uuid,
        amount: Decimal,
    ) -> Self {
        Self {
            kind,
            date,
            cash_account,
            contra_account: Some(contra_account),
            amount,
            party: None,
            partner: None,
            investor: None,
            project: None,
            category: None,
            method: PaymentMethod::default(),
            notes: None,
        }
    }

    /// Money coming into `cash_account`.
    pub fn receipt(date: NaiveDate, cash_account: Uuid, contra_account: Uuid, amount: Decimal) -> Self {
        Self::new(VoucherKind::Receipt, date, cash_account, contra_account, amount)
    }

    /// Money leaving `cash_account`.
    pub fn payment(date: NaiveDate, cash_account: Uuid, contra_account: Uuid, amount: Decimal) -> Self {
        Self::new(VoucherKind::Payment, date, cash_account, contra_account, amount)
    }

    pub fn with_party(mut self, party: Uuid) -> Self {
        self.party = Some(party);
        self
    }

    pub fn with_partner(mut self, partner: Uuid) -> Self {
        self.partner = Some(partner);
        self
    }

    /// Attributes the payment to `investor` as a shared expense of `project`.
    pub fn funded_by(mut self, investor: Uuid, project: Uuid, category: Uuid) -> Self {
        self.investor = Some(investor);
        self.project = Some(project);
        self.category = Some(category);
        self
    }

    pub fn with_method(mut self, method: PaymentMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn is_investor_attributed(&self) -> bool {
        self.investor.is_some()
    }
}

/// Intent to move money between two cash or bank accounts.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferDraft {
    pub from_account: Uuid,
    pub to_account: Uuid,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub method: PaymentMethod,
    pub notes: Option<String>,
}

impl TransferDraft {
    pub fn new(from_account: Uuid, to_account: Uuid, amount: Decimal, date: NaiveDate) -> Self {
        Self {
            from_account,
            to_account,
            amount,
            date,
            method: PaymentMethod::BankTransfer,
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Identifiers of the two legs written by a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostedTransfer {
    pub out_id: Uuid,
    pub in_id: Uuid,
    pub transfer_id: Uuid,
    pub out_number: u64,
    pub in_number: u64,
}

/// Ledger-wide debit and credit totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialBalance {
    pub total_debit: Decimal,
    pub total_credit: Decimal,
}

impl TrialBalance {
    pub fn is_balanced(&self) -> bool {
        self.total_debit == self.total_credit
    }
}

pub struct VoucherService;

impl VoucherService {
    /// Checks a receipt/payment draft against the ledger without mutating it.
    pub fn validate(ledger: &Ledger, draft: &VoucherDraft) -> Result<(), CoreError> {
        if draft.kind.is_transfer() {
            return Err(CoreError::Validation(
                "transfers are posted as a pair of legs".into(),
            ));
        }
        if draft.amount <= Decimal::ZERO {
            return Err(CoreError::AmountNotPositive(draft.amount));
        }
        let contra = draft
            .contra_account
            .ok_or_else(|| CoreError::MissingRequiredAccount("contra account".into()))?;
        if contra == draft.cash_account {
            return Err(CoreError::AccountsIdentical);
        }
        Self::ensure_cash_leg(ledger, draft.cash_account)?;
        let contra_account = AccountService::get(ledger, contra)?;
        if !contra_account.active {
            return Err(CoreError::Validation(format!(
                "account `{}` is inactive",
                contra_account.name
            )));
        }
        if contra_account.system {
            return Err(CoreError::Validation(format!(
                "`{}` only carries transfers",
                contra_account.name
            )));
        }
        if let Some(id) = draft.party {
            Self::ensure_party(ledger, PartyKind::Party, id)?;
        }
        if let Some(id) = draft.partner {
            Self::ensure_party(ledger, PartyKind::Partner, id)?;
        }
        if let Some(id) = draft.project {
            ledger.project(id).ok_or(CoreError::ProjectNotFound(id))?;
        }
        if let Some(id) = draft.category {
            ledger.category(id).ok_or(CoreError::CategoryNotFound(id))?;
        }
        if let Some(id) = draft.investor {
            let investor = ledger.investor(id).ok_or(CoreError::InvestorNotFound(id))?;
            if !investor.active {
                return Err(CoreError::Validation(format!(
                    "investor `{}` is inactive",
                    investor.name
                )));
            }
            if draft.kind != VoucherKind::Payment {
                return Err(CoreError::Validation(
                    "only payments can be attributed to an investor".into(),
                ));
            }
            if draft.project.is_none() || draft.category.is_none() {
                return Err(CoreError::Validation(
                    "an investor-funded payment needs a project and a category".into(),
                ));
            }
        }
        Ok(())
    }

    /// Posts a receipt or payment: one voucher plus its two entries.
    ///
    /// Investor-attributed payments also write the mirrored settlement expense; a failure
    /// there surfaces as [`CoreError::CrossStoreWriteFailed`]. Callers stage the ledger so
    /// that any error leaves the committed state untouched.
    pub fn post(
        ledger: &mut Ledger,
        draft: VoucherDraft,
        now: DateTime<Utc>,
    ) -> Result<Uuid, CoreError> {
        Self::validate(ledger, &draft)?;
        let contra = draft
            .contra_account
            .ok_or_else(|| CoreError::MissingRequiredAccount("contra account".into()))?;
        let number = Self::allocate_number(ledger)?;
        let voucher = Voucher {
            id: Uuid::new_v4(),
            number,
            date: draft.date,
            kind: draft.kind,
            account_id: draft.cash_account,
            contra_account_id: Some(contra),
            party_id: draft.party,
            partner_id: draft.partner,
            investor_id: draft.investor,
            project_id: draft.project,
            category_id: draft.category,
            amount: draft.amount,
            method: draft.method,
            description: draft.notes,
            transfer_id: None,
            created_at: now,
            updated_at: now,
        };
        let (debit_account, credit_account) = if voucher.kind.debits_cash_leg() {
            (voucher.account_id, contra)
        } else {
            (contra, voucher.account_id)
        };
        let lines = [
            Entry::debit(&voucher, debit_account, voucher.amount),
            Entry::credit(&voucher, credit_account, voucher.amount),
        ];
        let voucher_id = Self::insert(ledger, voucher.clone(), lines)?;
        if voucher.investor_id.is_some() {
            Self::mirror_settlement_expense(ledger, &voucher, now)?;
        }
        ledger.touch();
        Ok(voucher_id)
    }

    /// Writes both legs of a transfer with consecutive numbers and one shared `transfer_id`.
    ///
    /// Each leg balances against the system clearing account, so the pair moves exactly
    /// `amount` from `from_account` to `to_account` and leaves the clearing account at zero.
    pub fn post_transfer(
        ledger: &mut Ledger,
        draft: TransferDraft,
        now: DateTime<Utc>,
    ) -> Result<PostedTransfer, CoreError> {
        Self::validate_transfer(ledger, &draft)?;
        let clearing = AccountService::ensure_transfer_clearing(ledger);
        let transfer_id = Uuid::new_v4();

        let leg = |kind: VoucherKind, number: u64, account: Uuid, other: Uuid| Voucher {
            id: Uuid::new_v4(),
            number,
            date: draft.date,
            kind,
            account_id: account,
            contra_account_id: Some(other),
            party_id: None,
            partner_id: None,
            investor_id: None,
            project_id: None,
            category_id: None,
            amount: draft.amount,
            method: draft.method,
            description: draft.notes.clone(),
            transfer_id: Some(transfer_id),
            created_at: now,
            updated_at: now,
        };

        let out_number = Self::allocate_number(ledger)?;
        let out = leg(
            VoucherKind::TransferOut,
            out_number,
            draft.from_account,
            draft.to_account,
        );
        let out_lines = [
            Entry::debit(&out, clearing, out.amount),
            Entry::credit(&out, out.account_id, out.amount),
        ];
        let out_id = Self::insert(ledger, out, out_lines)?;

        let in_number = Self::allocate_number(ledger)?;
        let incoming = leg(
            VoucherKind::TransferIn,
            in_number,
            draft.to_account,
            draft.from_account,
        );
        let in_lines = [
            Entry::debit(&incoming, incoming.account_id, incoming.amount),
            Entry::credit(&incoming, clearing, incoming.amount),
        ];
        let in_id = Self::insert(ledger, incoming, in_lines)?;

        ledger.touch();
        Ok(PostedTransfer {
            out_id,
            in_id,
            transfer_id,
            out_number,
            in_number,
        })
    }

    pub fn validate_transfer(ledger: &Ledger, draft: &TransferDraft) -> Result<(), CoreError> {
        if draft.amount <= Decimal::ZERO {
            return Err(CoreError::AmountNotPositive(draft.amount));
        }
        if draft.from_account == draft.to_account {
            return Err(CoreError::AccountsIdentical);
        }
        Self::ensure_cash_leg(ledger, draft.from_account)?;
        Self::ensure_cash_leg(ledger, draft.to_account)?;
        Ok(())
    }

    /// Deletes a voucher and cascades to its entries.
    ///
    /// Both legs of a transfer go together, as does the settlement expense mirrored from
    /// an investor-attributed payment. Returns the ids of the removed vouchers.
    pub fn delete(ledger: &mut Ledger, id: Uuid) -> Result<Vec<Uuid>, CoreError> {
        let voucher = ledger
            .voucher(id)
            .ok_or_else(|| CoreError::VoucherNotFound(id.to_string()))?;
        let doomed: HashSet<Uuid> = match voucher.transfer_id {
            Some(transfer_id) => ledger
                .vouchers
                .iter()
                .filter(|v| v.transfer_id == Some(transfer_id))
                .map(|v| v.id)
                .collect(),
            None => HashSet::from([id]),
        };
        ledger.vouchers.retain(|v| !doomed.contains(&v.id));
        ledger.entries.retain(|e| !doomed.contains(&e.voucher_id));
        ledger
            .settlement_expenses
            .retain(|e| e.voucher_id.map_or(true, |v| !doomed.contains(&v)));
        ledger.touch();
        let mut removed: Vec<Uuid> = doomed.into_iter().collect();
        removed.sort();
        Ok(removed)
    }

    pub fn by_number(ledger: &Ledger, number: u64) -> Result<&Voucher, CoreError> {
        ledger
            .voucher_by_number(number)
            .ok_or_else(|| CoreError::VoucherNotFound(format!("#{number}")))
    }

    /// Vouchers numbered within `[first, last]`, in number order.
    pub fn in_number_range(ledger: &Ledger, first: u64, last: u64) -> Vec<&Voucher> {
        let mut vouchers: Vec<&Voucher> = ledger
            .vouchers
            .iter()
            .filter(|v| v.number >= first && v.number <= last)
            .collect();
        vouchers.sort_by_key(|v| v.number);
        vouchers
    }

    pub fn trial_balance(ledger: &Ledger) -> TrialBalance {
        TrialBalance {
            total_debit: ledger.entries.iter().map(|e| e.debit).sum(),
            total_credit: ledger.entries.iter().map(|e| e.credit).sum(),
        }
    }

    /// Next number from the ledger's sequence column. Must run inside the same staged
    /// write as the insert that consumes it.
    fn allocate_number(ledger: &mut Ledger) -> Result<u64, CoreError> {
        let number = ledger.last_voucher_number + 1;
        if ledger.voucher_by_number(number).is_some() {
            return Err(CoreError::DuplicateVoucherNumber(number));
        }
        ledger.last_voucher_number = number;
        Ok(number)
    }

    fn insert(ledger: &mut Ledger, voucher: Voucher, lines: [Entry; 2]) -> Result<Uuid, CoreError> {
        let debit: Decimal = lines.iter().map(|e| e.debit).sum();
        let credit: Decimal = lines.iter().map(|e| e.credit).sum();
        if debit != credit || lines.iter().any(|e| !e.is_well_formed()) {
            return Err(CoreError::Validation(format!(
                "voucher {} does not balance",
                voucher.number
            )));
        }
        let id = voucher.id;
        ledger.vouchers.push(voucher);
        ledger.entries.extend(lines);
        Ok(id)
    }

    fn mirror_settlement_expense(
        ledger: &mut Ledger,
        voucher: &Voucher,
        now: DateTime<Utc>,
    ) -> Result<(), CoreError> {
        let (Some(investor_id), Some(project_id), Some(category_id)) =
            (voucher.investor_id, voucher.project_id, voucher.category_id)
        else {
            return Err(CoreError::CrossStoreWriteFailed(format!(
                "voucher {} lacks investor, project, or category",
                voucher.number
            )));
        };
        if ledger
            .settlement_expenses
            .iter()
            .any(|e| e.voucher_id == Some(voucher.id))
        {
            return Err(CoreError::CrossStoreWriteFailed(format!(
                "voucher {} is already mirrored",
                voucher.number
            )));
        }
        if ledger.project(project_id).is_none() || ledger.category(category_id).is_none() {
            return Err(CoreError::CrossStoreWriteFailed(format!(
                "settlement target of voucher {} disappeared",
                voucher.number
            )));
        }
        ledger.settlement_expenses.push(SettlementExpense {
            id: Uuid::new_v4(),
            project_id,
            investor_id,
            category_id,
            amount: voucher.amount,
            date: voucher.date,
            voucher_id: Some(voucher.id),
            description: voucher.description.clone(),
            created_at: now,
        });
        Ok(())
    }

    fn ensure_cash_leg(ledger: &Ledger, id: Uuid) -> Result<(), CoreError> {
        let account = AccountService::get(ledger, id)?;
        if !account.kind.is_cash_like() {
            return Err(CoreError::Validation(format!(
                "`{}` is a {} account; the cash leg must be cash or bank",
                account.name, account.kind
            )));
        }
        if !account.active {
            return Err(CoreError::Validation(format!(
                "account `{}` is inactive",
                account.name
            )));
        }
        Ok(())
    }

    fn ensure_party(ledger: &Ledger, kind: PartyKind, id: Uuid) -> Result<(), CoreError> {
        let party = ledger.party(kind, id).ok_or_else(|| CoreError::PartyNotFound {
            kind: kind.to_string(),
            id,
        })?;
        if !party.active {
            return Err(CoreError::Validation(format!(
                "{kind} `{}` is inactive",
                party.name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use treasury_domain::{Account, AccountKind};

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
    }

    fn ledger() -> (Ledger, Uuid, Uuid, Uuid) {
        let mut ledger = Ledger::new("Vouchers");
        let cash = ledger.add_account(Account::new("Cashbox", AccountKind::Cash));
        let bank = ledger.add_account(Account::new("Bank", AccountKind::Bank));
        let revenue = ledger.add_account(Account::new("Sales", AccountKind::Revenue));
        (ledger, cash, bank, revenue)
    }

    #[test]
    fn rejects_non_positive_amounts_and_identical_accounts() {
        let (mut ledger, cash, _, revenue) = ledger();
        let err = VoucherService::post(
            &mut ledger,
            VoucherDraft::receipt(date(1), cash, revenue, Decimal::ZERO),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::AmountNotPositive(_)));

        let err = VoucherService::post(
            &mut ledger,
            VoucherDraft::receipt(date(1), cash, cash, Decimal::ONE),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::AccountsIdentical));

        let mut draft = VoucherDraft::receipt(date(1), cash, revenue, Decimal::ONE);
        draft.contra_account = None;
        let err = VoucherService::post(&mut ledger, draft, Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::MissingRequiredAccount(_)));
        assert!(ledger.vouchers.is_empty());
        assert_eq!(ledger.last_voucher_number, 0);
    }

    #[test]
    fn numbers_are_monotonic_and_never_reused() {
        let (mut ledger, cash, _, revenue) = ledger();
        let first = VoucherService::post(
            &mut ledger,
            VoucherDraft::receipt(date(1), cash, revenue, Decimal::TEN),
            Utc::now(),
        )
        .unwrap();
        VoucherService::delete(&mut ledger, first).unwrap();
        VoucherService::post(
            &mut ledger,
            VoucherDraft::receipt(date(2), cash, revenue, Decimal::TEN),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(ledger.vouchers[0].number, 2);
    }

    #[test]
    fn stale_sequence_is_reported_as_duplicate_number() {
        let (mut ledger, cash, _, revenue) = ledger();
        VoucherService::post(
            &mut ledger,
            VoucherDraft::receipt(date(1), cash, revenue, Decimal::TEN),
            Utc::now(),
        )
        .unwrap();
        ledger.last_voucher_number = 0;
        let err = VoucherService::post(
            &mut ledger,
            VoucherDraft::receipt(date(2), cash, revenue, Decimal::TEN),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateVoucherNumber(1)));
    }

    #[test]
    fn transfer_legs_share_id_and_clear_to_zero() {
        let (mut ledger, cash, bank, _) = ledger();
        let posted = VoucherService::post_transfer(
            &mut ledger,
            TransferDraft::new(cash, bank, Decimal::new(100, 0), date(3)),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(posted.in_number, posted.out_number + 1);
        let clearing = ledger.system_clearing_account().unwrap().id;
        assert_eq!(
            AccountService::balance(&ledger, clearing).unwrap(),
            Decimal::ZERO
        );
        assert_eq!(
            AccountService::balance(&ledger, cash).unwrap(),
            Decimal::new(-100, 0)
        );

        let removed = VoucherService::delete(&mut ledger, posted.in_id).unwrap();
        assert_eq!(removed.len(), 2);
        assert!(ledger.vouchers.is_empty());
        assert!(ledger.entries.is_empty());
    }
}
