use serde::{Deserialize, Serialize};

/// Tiered outcome of zone resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    /// Inside a deliverable zone: browsing and ordering.
    FullAccess,
    /// Known area outside delivery: browsing only.
    ViewingOnly,
    /// Service not offered here.
    #[default]
    NoAccess,
}

impl AccessLevel {
    /// Ordering is permitted.
    pub fn can_order(self) -> bool {
        self == Self::FullAccess
    }

    /// Browsing without ordering.
    pub fn is_viewing_only(self) -> bool {
        self == Self::ViewingOnly
    }

    /// Any level that lets the user into the app.
    pub fn permits_entry(self) -> bool {
        matches!(self, Self::FullAccess | Self::ViewingOnly)
    }
}

/// Decision returned by a zone resolver.
///
/// `success` is a domain flag: false for `NoAccess`, true otherwise. A resolver that
/// cannot answer at all returns an error instead of a decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneDecision {
    /// Resolved access tier.
    pub access_level: AccessLevel,
    /// Resolver-provided explanation, surfaced to the user for `NoAccess`.
    pub message: String,
    /// Domain success flag.
    pub success: bool,
}

impl ZoneDecision {
    /// Build a decision with `success` derived from the access level.
    pub fn new(access_level: AccessLevel, message: impl Into<String>) -> Self {
        Self {
            access_level,
            message: message.into(),
            success: access_level.permits_entry(),
        }
    }

    /// Ordering permitted.
    pub fn full_access(message: impl Into<String>) -> Self {
        Self::new(AccessLevel::FullAccess, message)
    }

    /// Browsing only.
    pub fn viewing_only(message: impl Into<String>) -> Self {
        Self::new(AccessLevel::ViewingOnly, message)
    }

    /// Not serviceable.
    pub fn no_access(message: impl Into<String>) -> Self {
        Self::new(AccessLevel::NoAccess, message)
    }

    /// `success` agrees with the access level.
    pub fn is_consistent(&self) -> bool {
        self.success == self.access_level.permits_entry()
    }
}
