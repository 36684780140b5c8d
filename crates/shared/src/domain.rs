use serde::{Deserialize, Serialize};

/// Cookie name used when the integrator does not pick one.
pub const DEFAULT_CONSENT_COOKIE: &str = "cookieConsent";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentCategory {
    Essentials,
    Analytics,
    Marketing,
}

impl ConsentCategory {
    pub const ALL: [ConsentCategory; 3] = [
        ConsentCategory::Essentials,
        ConsentCategory::Analytics,
        ConsentCategory::Marketing,
    ];

    /// Essentials cannot be switched off by the visitor.
    pub fn is_locked(self) -> bool {
        matches!(self, ConsentCategory::Essentials)
    }

    pub fn label(self) -> &'static str {
        match self {
            ConsentCategory::Essentials => "Essentials",
            ConsentCategory::Analytics => "Analytics",
            ConsentCategory::Marketing => "Marketing",
        }
    }
}

/// A visitor's cookie-category choices.
///
/// `essentials` is private and always `true`: every constructor and the
/// deserializer force it, so no reachable record can carry `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawConsentRecord")]
pub struct ConsentRecord {
    essentials: bool,
    analytics: bool,
    marketing: bool,
}

#[derive(Deserialize)]
struct RawConsentRecord {
    #[serde(default)]
    #[allow(dead_code)]
    essentials: bool,
    analytics: bool,
    marketing: bool,
}

impl From<RawConsentRecord> for ConsentRecord {
    fn from(raw: RawConsentRecord) -> Self {
        Self::new(raw.analytics, raw.marketing)
    }
}

impl Default for ConsentRecord {
    fn default() -> Self {
        Self::accept_all()
    }
}

impl ConsentRecord {
    pub const fn new(analytics: bool, marketing: bool) -> Self {
        Self {
            essentials: true,
            analytics,
            marketing,
        }
    }

    pub const fn accept_all() -> Self {
        Self::new(true, true)
    }

    pub const fn decline_all() -> Self {
        Self::new(false, false)
    }

    pub fn essentials(&self) -> bool {
        self.essentials
    }

    pub fn analytics(&self) -> bool {
        self.analytics
    }

    pub fn marketing(&self) -> bool {
        self.marketing
    }

    pub fn is_granted(&self, category: ConsentCategory) -> bool {
        match category {
            ConsentCategory::Essentials => self.essentials,
            ConsentCategory::Analytics => self.analytics,
            ConsentCategory::Marketing => self.marketing,
        }
    }

    /// Returns a new record with `update` merged over `self`.
    pub fn with_update(self, update: ConsentUpdate) -> Self {
        Self::new(
            update.analytics.unwrap_or(self.analytics),
            update.marketing.unwrap_or(self.marketing),
        )
    }
}

/// Partial consent change. Absent fields keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analytics: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marketing: Option<bool>,
}

impl ConsentUpdate {
    pub fn analytics(value: bool) -> Self {
        Self {
            analytics: Some(value),
            marketing: None,
        }
    }

    pub fn marketing(value: bool) -> Self {
        Self {
            analytics: None,
            marketing: Some(value),
        }
    }
}

impl From<ConsentRecord> for ConsentUpdate {
    fn from(record: ConsentRecord) -> Self {
        Self {
            analytics: Some(record.analytics),
            marketing: Some(record.marketing),
        }
    }
}
