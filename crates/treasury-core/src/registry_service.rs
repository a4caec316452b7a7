//! Validated mutations for parties, partners, investors, projects, and expense categories.

use treasury_domain::{
    normalized_name, Activatable, CategoryUpdate, ExpenseCategory, Identifiable, Investor,
    InvestorUpdate, Ledger, NamedEntity, Party, PartyKind, PartyUpdate, Project, ProjectUpdate,
};
use uuid::Uuid;

use crate::CoreError;

/// Registry of the counterparties and capital partners referenced by vouchers.
///
/// Every delete is guarded: an entity that is still referenced stays in place and the
/// call fails with [`CoreError::InUse`].
pub struct RegistryService;

fn ensure_unique_name<'a, T>(
    existing: impl IntoIterator<Item = &'a T>,
    exclude: Option<Uuid>,
    candidate: &str,
) -> Result<(), CoreError>
where
    T: Identifiable + NamedEntity + 'a,
{
    let normalized = normalized_name(candidate);
    if normalized.is_empty() {
        return Err(CoreError::Validation("name is required".into()));
    }
    let duplicate = existing
        .into_iter()
        .any(|item| normalized_name(item.name()) == normalized && exclude != Some(item.id()));
    if duplicate {
        Err(CoreError::DuplicateName(candidate.trim().to_string()))
    } else {
        Ok(())
    }
}

fn find_mut<T: Identifiable>(items: &mut [T], id: Uuid) -> Option<&mut T> {
    items.iter_mut().find(|item| item.id() == id)
}

impl RegistryService {
    pub fn add_party(ledger: &mut Ledger, kind: PartyKind, party: Party) -> Result<Uuid, CoreError> {
        ensure_unique_name(ledger.counterparties(kind), None, &party.name)?;
        let id = party.id;
        ledger.counterparties_mut(kind).push(party);
        ledger.touch();
        Ok(id)
    }

    pub fn update_party(
        ledger: &mut Ledger,
        kind: PartyKind,
        id: Uuid,
        changes: PartyUpdate,
    ) -> Result<(), CoreError> {
        if let Some(name) = changes.name.as_deref() {
            ensure_unique_name(ledger.counterparties(kind), Some(id), name)?;
        }
        let party = find_mut(ledger.counterparties_mut(kind), id).ok_or_else(|| {
            CoreError::PartyNotFound {
                kind: kind.to_string(),
                id,
            }
        })?;
        changes.apply(party);
        ledger.touch();
        Ok(())
    }

    pub fn set_party_active(
        ledger: &mut Ledger,
        kind: PartyKind,
        id: Uuid,
        active: bool,
    ) -> Result<(), CoreError> {
        let party = find_mut(ledger.counterparties_mut(kind), id).ok_or_else(|| {
            CoreError::PartyNotFound {
                kind: kind.to_string(),
                id,
            }
        })?;
        party.set_active(active);
        ledger.touch();
        Ok(())
    }

    pub fn delete_party(ledger: &mut Ledger, kind: PartyKind, id: Uuid) -> Result<(), CoreError> {
        let party = ledger
            .party(kind, id)
            .ok_or_else(|| CoreError::PartyNotFound {
                kind: kind.to_string(),
                id,
            })?;
        let referenced = ledger.vouchers.iter().any(|voucher| match kind {
            PartyKind::Party => voucher.party_id == Some(id),
            PartyKind::Partner => voucher.partner_id == Some(id),
        });
        if referenced {
            return Err(CoreError::in_use(
                format!("{kind} `{}`", party.name),
                "it is referenced by vouchers",
            ));
        }
        ledger.counterparties_mut(kind).retain(|party| party.id != id);
        ledger.touch();
        Ok(())
    }

    pub fn add_investor(ledger: &mut Ledger, investor: Investor) -> Result<Uuid, CoreError> {
        ensure_unique_name(&ledger.investors, None, &investor.name)?;
        let id = investor.id;
        ledger.investors.push(investor);
        ledger.touch();
        Ok(id)
    }

    pub fn update_investor(
        ledger: &mut Ledger,
        id: Uuid,
        changes: InvestorUpdate,
    ) -> Result<(), CoreError> {
        if let Some(name) = changes.name.as_deref() {
            ensure_unique_name(&ledger.investors, Some(id), name)?;
        }
        let investor =
            find_mut(&mut ledger.investors, id).ok_or(CoreError::InvestorNotFound(id))?;
        changes.apply(investor);
        ledger.touch();
        Ok(())
    }

    pub fn set_investor_active(ledger: &mut Ledger, id: Uuid, active: bool) -> Result<(), CoreError> {
        let investor =
            find_mut(&mut ledger.investors, id).ok_or(CoreError::InvestorNotFound(id))?;
        investor.set_active(active);
        ledger.touch();
        Ok(())
    }

    pub fn delete_investor(ledger: &mut Ledger, id: Uuid) -> Result<(), CoreError> {
        let investor = ledger.investor(id).ok_or(CoreError::InvestorNotFound(id))?;
        let entity = format!("investor `{}`", investor.name);
        if ledger.vouchers.iter().any(|v| v.investor_id == Some(id)) {
            return Err(CoreError::in_use(entity, "it is referenced by vouchers"));
        }
        if ledger.project_investors.iter().any(|l| l.investor_id == id) {
            return Err(CoreError::in_use(entity, "it holds project settlement ratios"));
        }
        if ledger.settlement_expenses.iter().any(|e| e.investor_id == id) {
            return Err(CoreError::in_use(entity, "it paid settlement expenses"));
        }
        ledger.investors.retain(|investor| investor.id != id);
        ledger.touch();
        Ok(())
    }

    pub fn add_project(ledger: &mut Ledger, project: Project) -> Result<Uuid, CoreError> {
        ensure_unique_name(&ledger.projects, None, &project.name)?;
        let id = project.id;
        ledger.projects.push(project);
        ledger.touch();
        Ok(id)
    }

    pub fn update_project(
        ledger: &mut Ledger,
        id: Uuid,
        changes: ProjectUpdate,
    ) -> Result<(), CoreError> {
        if let Some(name) = changes.name.as_deref() {
            ensure_unique_name(&ledger.projects, Some(id), name)?;
        }
        let project = find_mut(&mut ledger.projects, id).ok_or(CoreError::ProjectNotFound(id))?;
        changes.apply(project);
        ledger.touch();
        Ok(())
    }

    pub fn set_project_active(ledger: &mut Ledger, id: Uuid, active: bool) -> Result<(), CoreError> {
        let project = find_mut(&mut ledger.projects, id).ok_or(CoreError::ProjectNotFound(id))?;
        project.set_active(active);
        ledger.touch();
        Ok(())
    }

    pub fn delete_project(ledger: &mut Ledger, id: Uuid) -> Result<(), CoreError> {
        let project = ledger.project(id).ok_or(CoreError::ProjectNotFound(id))?;
        let entity = format!("project `{}`", project.name);
        if ledger.ratios_for_project(id).next().is_some() {
            return Err(CoreError::in_use(entity, "it has settlement ratios"));
        }
        if ledger.expenses_for_project(id).next().is_some() {
            return Err(CoreError::in_use(entity, "it has settlement expenses"));
        }
        if ledger.settlement_snapshots.iter().any(|s| s.project_id == id) {
            return Err(CoreError::in_use(entity, "it has settlement snapshots"));
        }
        if ledger.vouchers.iter().any(|v| v.project_id == Some(id)) {
            return Err(CoreError::in_use(entity, "it is referenced by vouchers"));
        }
        ledger.projects.retain(|project| project.id != id);
        ledger.touch();
        Ok(())
    }

    pub fn add_category(ledger: &mut Ledger, category: ExpenseCategory) -> Result<Uuid, CoreError> {
        ensure_unique_name(&ledger.expense_categories, None, &category.name)?;
        let id = category.id;
        ledger.expense_categories.push(category);
        ledger.touch();
        Ok(id)
    }

    pub fn update_category(
        ledger: &mut Ledger,
        id: Uuid,
        changes: CategoryUpdate,
    ) -> Result<(), CoreError> {
        if let Some(name) = changes.name.as_deref() {
            ensure_unique_name(&ledger.expense_categories, Some(id), name)?;
        }
        let category = find_mut(&mut ledger.expense_categories, id)
            .ok_or(CoreError::CategoryNotFound(id))?;
        changes.apply(category);
        ledger.touch();
        Ok(())
    }

    pub fn delete_category(ledger: &mut Ledger, id: Uuid) -> Result<(), CoreError> {
        let category = ledger.category(id).ok_or(CoreError::CategoryNotFound(id))?;
        let entity = format!("category `{}`", category.name);
        if ledger.settlement_expenses.iter().any(|e| e.category_id == id)
            || ledger.vouchers.iter().any(|v| v.category_id == Some(id))
        {
            return Err(CoreError::in_use(entity, "it has postings"));
        }
        ledger.expense_categories.retain(|category| category.id != id);
        ledger.touch();
        Ok(())
    }
}
