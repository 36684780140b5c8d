use serde::Serialize;
use shared::domain::{ConsentCategory, ConsentRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryToggle {
    pub category: ConsentCategory,
    pub enabled: bool,
    pub locked: bool,
}

/// What the preference modal renders: one toggle per category, essentials
/// locked on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModalView {
    pub toggles: Vec<CategoryToggle>,
}

impl ModalView {
    pub fn new(record: ConsentRecord) -> Self {
        let toggles = ConsentCategory::ALL
            .into_iter()
            .map(|category| CategoryToggle {
                category,
                enabled: record.is_granted(category),
                locked: category.is_locked(),
            })
            .collect();
        Self { toggles }
    }

    pub fn toggle(&self, category: ConsentCategory) -> Option<&CategoryToggle> {
        self.toggles.iter().find(|t| t.category == category)
    }
}
