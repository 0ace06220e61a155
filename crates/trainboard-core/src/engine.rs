//! Report engine orchestrator.
//!
//! Checks access, loads one snapshot per request, indexes it once, and hands
//! the index to the aggregation core and the report builders.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::access::{AccessPolicy, RolePolicy};
use crate::aggregate::{active_collaborators, feedback_stats_by_module, module_metrics, student_metrics};
use crate::config::ReportConfig;
use crate::error::ReportError;
use crate::gateway::{load_snapshot, DataGateway, SnapshotScope};
use crate::index::SnapshotIndex;
use crate::metrics::{ModuleFeedback, ModuleMetrics, StudentMetrics};
use crate::model::Profile;
use crate::slot::{Publication, ReportSlot};
use crate::table::{self, DashboardSelection, ReportTable};

/// Which report to build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum ReportRequest {
    Student(String),
    Module(String),
    Dashboard(DashboardSelection),
    Feedback,
}

impl ReportRequest {
    /// Rows the request needs fetched.
    pub fn scope(&self) -> SnapshotScope {
        match self {
            ReportRequest::Student(id) => SnapshotScope::student(id),
            ReportRequest::Module(id) => SnapshotScope::module(id),
            ReportRequest::Dashboard(_) | ReportRequest::Feedback => SnapshotScope::all(),
        }
    }
}

/// Metric records behind the on-screen ranking tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsOverview {
    pub students: Vec<StudentMetrics>,
    pub modules: Vec<ModuleMetrics>,
    pub feedback: Vec<ModuleFeedback>,
}

/// The central report engine.
pub struct ReportEngine {
    gateway: Arc<dyn DataGateway>,
    policy: Arc<dyn AccessPolicy>,
    config: ReportConfig,
}

impl ReportEngine {
    /// Engine with the default [`RolePolicy`].
    pub fn new(gateway: Arc<dyn DataGateway>, config: ReportConfig) -> Self {
        Self {
            gateway,
            policy: Arc::new(RolePolicy),
            config,
        }
    }

    pub fn with_policy(mut self, policy: Arc<dyn AccessPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    fn authorize(&self, viewer: &Profile, request: &ReportRequest) -> Result<(), ReportError> {
        let allowed = match request {
            ReportRequest::Student(id) => self.policy.may_view_student(viewer, id),
            _ => self.policy.may_view_aggregates(viewer),
        };
        if allowed {
            Ok(())
        } else {
            tracing::warn!(viewer = %viewer.id, ?request, "report access denied");
            Err(ReportError::AccessDenied(viewer.id.clone()))
        }
    }

    /// Build one report for `viewer`.
    #[instrument(skip_all, fields(viewer = %viewer.id, request = ?request))]
    pub async fn build(
        &self,
        viewer: &Profile,
        request: &ReportRequest,
    ) -> Result<ReportTable, ReportError> {
        self.authorize(viewer, request)?;
        let snapshot = load_snapshot(self.gateway.as_ref(), &request.scope()).await?;
        let index = SnapshotIndex::build(&snapshot);

        let report = match request {
            ReportRequest::Student(id) => table::student_report(&index, id, &self.config)?,
            ReportRequest::Module(id) => table::module_report(&index, id, &self.config)?,
            ReportRequest::Dashboard(selection) => {
                table::dashboard_report(&index, &self.config, selection)?
            }
            ReportRequest::Feedback => table::feedback_report(&index)?,
        };
        tracing::debug!(
            sections = report.sections.len(),
            charts = report.charts.len(),
            "built report"
        );
        Ok(report)
    }

    /// Build a report and offer it to `slot`; only the newest request
    /// started on the slot can publish.
    pub async fn refresh(
        &self,
        slot: &ReportSlot<ReportTable>,
        viewer: &Profile,
        request: &ReportRequest,
    ) -> Publication {
        let ticket = slot.begin();
        let result = self.build(viewer, request).await;
        slot.complete(ticket, result)
    }

    /// Student, module, and feedback metrics for the ranking views.
    #[instrument(skip_all, fields(viewer = %viewer.id))]
    pub async fn overview(&self, viewer: &Profile) -> Result<MetricsOverview, ReportError> {
        if !self.policy.may_view_aggregates(viewer) {
            return Err(ReportError::AccessDenied(viewer.id.clone()));
        }
        let snapshot = load_snapshot(self.gateway.as_ref(), &SnapshotScope::all()).await?;
        let index = SnapshotIndex::build(&snapshot);

        let overview = MetricsOverview {
            students: student_metrics(&index, active_collaborators(snapshot.profiles.iter())),
            modules: module_metrics(&index, snapshot.modules.iter()),
            feedback: feedback_stats_by_module(&index)?,
        };
        tracing::debug!(
            students = overview.students.len(),
            modules = overview.modules.len(),
            "computed metrics overview"
        );
        Ok(overview)
    }
}
