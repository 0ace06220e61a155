//! Who may see aggregated reports.

use crate::model::{Profile, Role};

/// Capability check consulted before any report data is fetched.
pub trait AccessPolicy: Send + Sync {
    /// May `viewer` see aggregates across many students?
    fn may_view_aggregates(&self, viewer: &Profile) -> bool;

    /// May `viewer` see the report of one student?
    ///
    /// Defaults to aggregate access, or an active viewer looking at their own
    /// report.
    fn may_view_student(&self, viewer: &Profile, student_id: &str) -> bool {
        self.may_view_aggregates(viewer) || (viewer.active && viewer.id == student_id)
    }
}

/// Active managers see everything; collaborators only their own report.
#[derive(Debug, Clone, Copy, Default)]
pub struct RolePolicy;

impl AccessPolicy for RolePolicy {
    fn may_view_aggregates(&self, viewer: &Profile) -> bool {
        viewer.active && viewer.role == Role::Manager
    }
}
