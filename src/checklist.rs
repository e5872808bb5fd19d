//! Checklist templates keyed by service type.
//!
//! Every template is assembled from fixed item sets. `basic` uses the base set
//! only, `deep` appends the deep set, `after` appends deep and after-renovation
//! items, and `office` appends the office set to the base set. Item ids are
//! static so that two calls for the same service type return identical lists.

use serde::{Deserialize, Serialize};

use crate::models::ServiceType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: String,
    pub text: String,
    pub category: String,
    pub checked: bool,
}

/// Who the checklist is for: the maid doing the work or the senior cleaner
/// inspecting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecklistMode {
    Work,
    Inspection,
}

type TemplateItem = (&'static str, &'static str, &'static str);

struct ItemSets {
    base: &'static [TemplateItem],
    deep: &'static [TemplateItem],
    after: &'static [TemplateItem],
    office: &'static [TemplateItem],
}

static WORK: ItemSets = ItemSets {
    base: &[
        ("w1", "Dust all furniture", "Common areas"),
        ("w2", "Vacuum the floors", "Common areas"),
        ("w3", "Mop the floors", "Common areas"),
        ("w4", "Wipe the mirrors", "Common areas"),
        ("w5", "Wipe door handles", "Common areas"),
        ("w6", "Wipe light switches", "Common areas"),
        ("w7", "Clean the sink", "Kitchen"),
        ("w8", "Clean the stove", "Kitchen"),
        ("w9", "Wipe the countertops", "Kitchen"),
        ("w10", "Clean the fridge exterior", "Kitchen"),
        ("w11", "Clean the microwave", "Kitchen"),
        ("w12", "Take out the trash", "Kitchen"),
        ("w13", "Clean the toilet", "Bathroom"),
        ("w14", "Clean the washbasin", "Bathroom"),
        ("w15", "Clean the bathtub or shower", "Bathroom"),
        ("w16", "Wipe the bathroom mirror", "Bathroom"),
        ("w17", "Wash the tiles", "Bathroom"),
        ("w18", "Polish the faucets", "Bathroom"),
        ("w19", "Wipe the window sills", "Bedroom"),
        ("w20", "Vacuum under the bed", "Bedroom"),
        ("w21", "Dust all surfaces", "Bedroom"),
    ],
    deep: &[
        ("w22", "Wash the baseboards", "Deep cleaning"),
        ("w23", "Wipe doors on both sides", "Deep cleaning"),
        ("w24", "Clean between radiator fins", "Deep cleaning"),
        ("w25", "Dust lamps and chandeliers", "Deep cleaning"),
        ("w26", "Clean the fridge interior", "Deep cleaning"),
        ("w27", "Clean the oven interior", "Deep cleaning"),
        ("w28", "Degrease the range hood", "Deep cleaning"),
        ("w29", "Wipe kitchen cabinet fronts", "Deep cleaning"),
        ("w30", "Scrub tile grout", "Deep cleaning"),
        ("w31", "Descale the plumbing fixtures", "Deep cleaning"),
        ("w32", "Wash the windows", "Deep cleaning"),
    ],
    after: &[
        ("w33", "Remove construction dust", "After renovation"),
        ("w34", "Remove paint and plaster marks", "After renovation"),
        ("w35", "Peel protective film from windows", "After renovation"),
    ],
    office: &[
        ("w36", "Wipe the desks", "Office"),
        ("w37", "Dust the office equipment", "Office"),
        ("w38", "Tidy the meeting room", "Office"),
        ("w39", "Clean the kitchenette", "Office"),
    ],
};

static INSPECTION: ItemSets = ItemSets {
    base: &[
        ("i1", "Surfaces are free of dust", "General check"),
        ("i2", "Floors are clean, no streaks or stains", "General check"),
        ("i3", "Mirrors are streak-free", "General check"),
        ("i4", "No dust on radiators and window sills", "General check"),
        ("i5", "Door handles and switches are clean", "General check"),
        ("i6", "Trash has been taken out", "General check"),
        ("i7", "Sink has no residue or stains", "Kitchen"),
        ("i8", "Stove and countertops are spotless", "Kitchen"),
        ("i9", "Fridge exterior has no fingerprints", "Kitchen"),
        ("i10", "Microwave is clean inside and out", "Kitchen"),
        ("i11", "Faucets are shining", "Kitchen"),
        ("i12", "Toilet is spotless", "Bathroom"),
        ("i13", "Washbasin has no limescale", "Bathroom"),
        ("i14", "Bathtub or shower has no soap marks", "Bathroom"),
        ("i15", "Tiles and grout are clean", "Bathroom"),
        ("i16", "Mirrors have no streaks or drops", "Bathroom"),
        ("i17", "Faucets are polished", "Bathroom"),
    ],
    deep: &[
        ("i18", "Baseboards are clean along their full length", "Detailed check"),
        ("i19", "Doors are wiped on both sides", "Detailed check"),
        ("i20", "Radiators are clean between the fins", "Detailed check"),
        ("i21", "Lamps and chandeliers are dust-free", "Detailed check"),
        ("i22", "Fridge is clean inside", "Detailed check"),
        ("i23", "Oven is clean inside", "Detailed check"),
        ("i24", "Range hood is clean", "Detailed check"),
        ("i25", "Kitchen cabinets are wiped outside", "Detailed check"),
        ("i26", "Tile grout is clean", "Detailed check"),
        ("i27", "Plumbing fixtures are polished", "Detailed check"),
        ("i28", "Windows are clean (if included)", "Detailed check"),
    ],
    after: &[
        ("i29", "No construction dust left", "After renovation"),
        ("i30", "Renovation marks are removed", "After renovation"),
        ("i31", "Protective film is removed from windows", "After renovation"),
    ],
    office: &[
        ("i32", "Desks are wiped", "Office"),
        ("i33", "Office equipment is clean", "Office"),
        ("i34", "Meeting room is tidy", "Office"),
        ("i35", "Kitchen area is clean", "Office"),
    ],
};

impl ItemSets {
    fn for_mode(mode: ChecklistMode) -> &'static ItemSets {
        match mode {
            ChecklistMode::Work => &WORK,
            ChecklistMode::Inspection => &INSPECTION,
        }
    }

    fn sections(&self, service_type: ServiceType) -> Vec<&'static [TemplateItem]> {
        match service_type {
            ServiceType::Basic => vec![self.base],
            ServiceType::Deep => vec![self.base, self.deep],
            ServiceType::After => vec![self.base, self.deep, self.after],
            ServiceType::Office => vec![self.base, self.office],
        }
    }
}

/// Builds the unchecked checklist for a service type.
pub fn build_checklist(service_type: ServiceType, mode: ChecklistMode) -> Vec<ChecklistItem> {
    ItemSets::for_mode(mode)
        .sections(service_type)
        .into_iter()
        .flatten()
        .map(|(id, text, category)| ChecklistItem {
            id: (*id).to_string(),
            text: (*text).to_string(),
            category: (*category).to_string(),
            checked: false,
        })
        .collect()
}

/// Same as [`build_checklist`] but keyed by the stored tag; unknown tags get
/// the base items.
pub fn build_checklist_for_tag(service_type: &str, mode: ChecklistMode) -> Vec<ChecklistItem> {
    let service_type = service_type.parse().unwrap_or(ServiceType::Basic);
    build_checklist(service_type, mode)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    const MODES: [ChecklistMode; 2] = [ChecklistMode::Work, ChecklistMode::Inspection];

    fn ids(items: &[ChecklistItem]) -> Vec<&str> {
        items.iter().map(|item| item.id.as_str()).collect()
    }

    #[test]
    fn deeper_services_extend_shallower_ones() {
        for mode in MODES {
            let base = build_checklist(ServiceType::Basic, mode);
            let deep = build_checklist(ServiceType::Deep, mode);
            let after = build_checklist(ServiceType::After, mode);

            assert!(deep.len() > base.len());
            assert_eq!(&deep[..base.len()], base.as_slice());
            assert!(after.len() > deep.len());
            assert_eq!(&after[..deep.len()], deep.as_slice());
        }
    }

    #[test]
    fn office_is_base_plus_office_items_only() {
        for mode in MODES {
            let sets = ItemSets::for_mode(mode);
            let base = build_checklist(ServiceType::Basic, mode);
            let office = build_checklist(ServiceType::Office, mode);

            assert_eq!(office.len(), sets.base.len() + sets.office.len());
            assert_eq!(&office[..base.len()], base.as_slice());

            let office_ids: HashSet<&str> = ids(&office).into_iter().collect();
            for (id, _, _) in sets.deep.iter().chain(sets.after.iter()) {
                assert!(!office_ids.contains(id), "{id} leaked into office");
            }
        }
    }

    #[test]
    fn templates_are_deterministic_and_unchecked() {
        for mode in MODES {
            for service_type in ServiceType::ALL {
                let first = build_checklist(*service_type, mode);
                let second = build_checklist(*service_type, mode);
                assert_eq!(first, second);
                assert!(first.iter().all(|item| !item.checked));

                let unique: HashSet<&str> = ids(&first).into_iter().collect();
                assert_eq!(unique.len(), first.len());
            }
        }
    }

    #[test]
    fn unknown_tag_falls_back_to_base() {
        assert_eq!(
            build_checklist_for_tag("spring-clean", ChecklistMode::Inspection),
            build_checklist(ServiceType::Basic, ChecklistMode::Inspection)
        );
    }

    #[test]
    fn inspection_deep_list_has_twenty_eight_items() {
        let items = build_checklist(ServiceType::Deep, ChecklistMode::Inspection);
        assert_eq!(items.len(), 28);
        assert_eq!(items.first().map(|item| item.id.as_str()), Some("i1"));
        assert_eq!(items.last().map(|item| item.id.as_str()), Some("i28"));
    }

    #[test]
    fn work_and_inspection_ids_do_not_collide() {
        let work: HashSet<String> = build_checklist(ServiceType::After, ChecklistMode::Work)
            .into_iter()
            .map(|item| item.id)
            .collect();
        let inspection = build_checklist(ServiceType::After, ChecklistMode::Inspection);
        assert!(inspection.iter().all(|item| !work.contains(&item.id)));
    }

    #[test]
    fn items_serialize_with_checked_flag() {
        let items = build_checklist(ServiceType::Basic, ChecklistMode::Work);
        let json = serde_json::to_value(&items[0]).unwrap();
        assert_eq!(json["id"], "w1");
        assert_eq!(json["checked"], false);
    }
}
