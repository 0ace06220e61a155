//! The data access seam and snapshot loading.
//!
//! Implemented by the `trainboard-gateway` crate. The core only ever reads
//! through [`DataGateway`]; it never writes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ReportError;
use crate::model::{
    AnswerRecord, Class, FeedbackRecord, Module, Profile, ProgressRecord, Snapshot,
};

/// Restricts which rows a snapshot load fetches.
///
/// `None` means "all rows"; `Some(ids)` becomes a single batched
/// `id in (...)` filter per entity type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotScope {
    pub user_ids: Option<Vec<String>>,
    pub module_ids: Option<Vec<String>>,
}

impl SnapshotScope {
    /// Every row of every entity type.
    pub fn all() -> Self {
        Self::default()
    }

    /// Rows belonging to one student.
    pub fn student(id: &str) -> Self {
        Self {
            user_ids: Some(vec![id.to_string()]),
            module_ids: None,
        }
    }

    /// Rows belonging to one module.
    pub fn module(id: &str) -> Self {
        Self {
            user_ids: None,
            module_ids: Some(vec![id.to_string()]),
        }
    }
}

/// Read-only access to the persisted record sets.
///
/// Each method is one batched query; the ids in the filters are sent in a
/// single request, never one request per id.
#[async_trait]
pub trait DataGateway: Send + Sync {
    /// Human-readable backend name (e.g. "postgrest").
    fn name(&self) -> &str;

    async fn fetch_profiles(&self, ids: Option<&[String]>) -> anyhow::Result<Vec<Profile>>;

    async fn fetch_modules(&self, ids: Option<&[String]>) -> anyhow::Result<Vec<Module>>;

    async fn fetch_progress(&self, scope: &SnapshotScope) -> anyhow::Result<Vec<ProgressRecord>>;

    async fn fetch_answers(&self, scope: &SnapshotScope) -> anyhow::Result<Vec<AnswerRecord>>;

    async fn fetch_feedback(&self, scope: &SnapshotScope) -> anyhow::Result<Vec<FeedbackRecord>>;

    async fn fetch_classes(&self) -> anyhow::Result<Vec<Class>>;
}

/// Fetch every record set a report needs, concurrently.
///
/// Profiles are narrowed by `scope.user_ids`; modules are always fetched in
/// full so detail rows can show titles. Aggregation only starts once every
/// fetch has resolved; the first failure aborts the load.
pub async fn load_snapshot(
    gateway: &dyn DataGateway,
    scope: &SnapshotScope,
) -> Result<Snapshot, ReportError> {
    let (profiles, modules, progress, answers, feedback, classes) = futures::try_join!(
        gateway.fetch_profiles(scope.user_ids.as_deref()),
        gateway.fetch_modules(None),
        gateway.fetch_progress(scope),
        gateway.fetch_answers(scope),
        gateway.fetch_feedback(scope),
        gateway.fetch_classes(),
    )
    .map_err(|e| ReportError::Gateway(format!("{}: {e:#}", gateway.name())))?;

    let snapshot = Snapshot {
        profiles,
        modules,
        progress,
        answers,
        feedback,
        classes,
    };
    tracing::debug!(
        gateway = gateway.name(),
        rows = snapshot.row_count(),
        "loaded snapshot"
    );
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModuleStatus, ProgressStatus};

    /// Serves fixed rows and honours the user filter on profiles.
    struct FixedGateway {
        fail_progress: bool,
    }

    #[async_trait]
    impl DataGateway for FixedGateway {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn fetch_profiles(&self, ids: Option<&[String]>) -> anyhow::Result<Vec<Profile>> {
            let all = ["u1", "u2"].map(|id| Profile {
                id: id.into(),
                name: id.into(),
                email: String::new(),
                role: crate::model::Role::Collaborator,
                active: true,
            });
            Ok(all
                .into_iter()
                .filter(|p| ids.map_or(true, |ids| ids.contains(&p.id)))
                .collect())
        }

        async fn fetch_modules(&self, _: Option<&[String]>) -> anyhow::Result<Vec<Module>> {
            Ok(vec![Module {
                id: "m1".into(),
                title: "Ética".into(),
                status: ModuleStatus::Published,
            }])
        }

        async fn fetch_progress(&self, _: &SnapshotScope) -> anyhow::Result<Vec<ProgressRecord>> {
            if self.fail_progress {
                anyhow::bail!("connection reset");
            }
            Ok(vec![ProgressRecord {
                user_id: "u1".into(),
                module_id: "m1".into(),
                status: ProgressStatus::Completed,
                score_percent: Some(90.0),
                completed_at: None,
            }])
        }

        async fn fetch_answers(&self, _: &SnapshotScope) -> anyhow::Result<Vec<AnswerRecord>> {
            Ok(Vec::new())
        }

        async fn fetch_feedback(&self, _: &SnapshotScope) -> anyhow::Result<Vec<FeedbackRecord>> {
            Ok(Vec::new())
        }

        async fn fetch_classes(&self) -> anyhow::Result<Vec<Class>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn load_snapshot_narrows_profiles_by_scope() {
        let gateway = FixedGateway { fail_progress: false };
        let snapshot = load_snapshot(&gateway, &SnapshotScope::student("u1")).await.unwrap();
        assert_eq!(snapshot.profiles.len(), 1);
        assert_eq!(snapshot.modules.len(), 1);
        assert_eq!(snapshot.progress.len(), 1);
    }

    #[tokio::test]
    async fn any_failed_fetch_fails_the_load() {
        let gateway = FixedGateway { fail_progress: true };
        let err = load_snapshot(&gateway, &SnapshotScope::all()).await.unwrap_err();
        assert!(matches!(err, ReportError::Gateway(_)));
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn scope_constructors() {
        assert_eq!(SnapshotScope::all(), SnapshotScope::default());
        assert_eq!(
            SnapshotScope::student("u1").user_ids,
            Some(vec!["u1".to_string()])
        );
        assert_eq!(SnapshotScope::module("m1").user_ids, None);
    }
}
