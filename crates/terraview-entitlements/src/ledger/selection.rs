//! Which hierarchical plan pays for a consumption when several could.

use terraview_core::config::PlanMatchPolicy;
use terraview_core::models::{EntityRef, PlanStatus, PlanType};

use crate::hierarchy::{normalize_name, HierarchyIndex};

fn breadth(plan_type: PlanType) -> u8 {
    match plan_type {
        PlanType::Village | PlanType::Free => 0,
        PlanType::Taluka => 1,
        PlanType::District => 2,
    }
}

/// Plans eligible to pay for `entity` under `policy`, most preferred first.
/// Ties keep the input order, which is oldest first. Validity is not checked.
pub fn candidates<'a>(
    index: &HierarchyIndex,
    plans: &'a [PlanStatus],
    entity: &EntityRef,
    policy: PlanMatchPolicy,
) -> Vec<&'a PlanStatus> {
    match policy {
        PlanMatchPolicy::Exact => {
            let key = normalize_name(&entity.name);
            plans
                .iter()
                .filter(|s| {
                    s.plan.plan_type.entity_type() == entity.entity_type
                        && normalize_name(&s.plan.entity_name) == key
                })
                .collect()
        }
        PlanMatchPolicy::Narrowest | PlanMatchPolicy::Broadest => {
            let mut covering: Vec<&PlanStatus> = plans
                .iter()
                .filter(|s| {
                    index
                        .coverage(s.plan.plan_type, &s.plan.entity_name)
                        .map(|c| c.covers(entity))
                        .unwrap_or(false)
                })
                .collect();
            if policy == PlanMatchPolicy::Narrowest {
                covering.sort_by_key(|s| breadth(s.plan.plan_type));
            } else {
                covering.sort_by_key(|s| std::cmp::Reverse(breadth(s.plan.plan_type)));
            }
            covering
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use terraview_core::models::{HierarchyEntry, Plan};

    fn index() -> HierarchyIndex {
        HierarchyIndex::build(vec![HierarchyEntry {
            state: "maharashtra".into(),
            district_code: "19".into(),
            district_name: "Jalgaon".into(),
            taluka_code: "1901".into(),
            taluka_name: "Parola".into(),
            village_code: "190102".into(),
            village_name: "Mohadi".into(),
        }])
    }

    fn status(plan_type: PlanType, entity: &str) -> PlanStatus {
        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        PlanStatus {
            plan: Plan::new("u1", plan_type, entity, 12, t0),
            used: 0,
            allowed: 5,
        }
    }

    fn types(picked: Vec<&PlanStatus>) -> Vec<PlanType> {
        picked.into_iter().map(|s| s.plan.plan_type).collect()
    }

    fn plans() -> Vec<PlanStatus> {
        vec![
            status(PlanType::District, "Jalgaon"),
            status(PlanType::Village, "Mohadi"),
            status(PlanType::Taluka, "Parola"),
        ]
    }

    #[test]
    fn exact_ignores_broader_plans() {
        let plans = plans();
        let picked = candidates(&index(), &plans, &EntityRef::village("mohadi"), PlanMatchPolicy::Exact);
        assert_eq!(types(picked), vec![PlanType::Village]);

        let picked = candidates(&index(), &plans[..1], &EntityRef::village("Mohadi"), PlanMatchPolicy::Exact);
        assert!(picked.is_empty());
    }

    #[test]
    fn narrowest_orders_village_first() {
        let plans = plans();
        let picked = candidates(&index(), &plans, &EntityRef::village("Mohadi"), PlanMatchPolicy::Narrowest);
        assert_eq!(
            types(picked),
            vec![PlanType::Village, PlanType::Taluka, PlanType::District]
        );
    }

    #[test]
    fn broadest_orders_district_first() {
        let plans = plans();
        let picked = candidates(&index(), &plans, &EntityRef::taluka("Parola"), PlanMatchPolicy::Broadest);
        assert_eq!(types(picked), vec![PlanType::District, PlanType::Taluka]);
    }
}
