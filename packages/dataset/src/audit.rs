//! Audit trail of changes made through the report form and admin panel.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Who performed admin actions. The admin panel has a single account.
pub const ADMIN_USER: &str = "المشرف العام";

/// Who submitted public reports.
pub const PUBLIC_USER: &str = "زائر";

/// Kind of change recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    /// Violation created from the admin panel.
    Added,
    /// Violation submitted through the public report form.
    Reported,
    /// Violation edited from the admin panel.
    Updated,
    /// Violation deleted from the admin panel.
    Deleted,
}

impl AuditAction {
    /// Arabic label shown in the admin log table.
    #[must_use]
    pub const fn label_ar(self) -> &'static str {
        match self {
            Self::Added => "إضافة بلاغ",
            Self::Reported => "بلاغ جديد",
            Self::Updated => "تعديل بلاغ",
            Self::Deleted => "حذف بلاغ",
        }
    }

    const fn user(self) -> &'static str {
        match self {
            Self::Reported => PUBLIC_USER,
            Self::Added | Self::Updated | Self::Deleted => ADMIN_USER,
        }
    }
}

/// One audit trail entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    /// What happened.
    pub action: AuditAction,
    /// Arabic label of [`action`](Self::action).
    pub label: String,
    /// Acting user.
    pub user: String,
    /// Violation the change applied to.
    pub violation_id: i64,
    /// Free-text detail (`حذف البلاغ رقم: 4`).
    pub details: String,
    /// When the change was made.
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    /// Creates an entry stamped with the current time.
    #[must_use]
    pub fn now(action: AuditAction, violation_id: i64) -> Self {
        Self {
            action,
            label: action.label_ar().to_string(),
            user: action.user().to_string(),
            violation_id,
            details: format!("{} رقم: {violation_id}", action.label_ar()),
            timestamp: Utc::now(),
        }
    }
}
