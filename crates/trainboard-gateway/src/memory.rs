//! In-memory gateway for tests and embedding.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use trainboard_core::gateway::{DataGateway, SnapshotScope};
use trainboard_core::model::{
    AnswerRecord, Class, FeedbackRecord, Module, Profile, ProgressRecord, Snapshot,
};

use crate::error::GatewayError;

/// Record sets a fetch can be made to fail on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Profiles,
    Modules,
    Progress,
    Answers,
    Feedback,
    Classes,
}

impl Entity {
    fn name(self) -> &'static str {
        match self {
            Entity::Profiles => "profiles",
            Entity::Modules => "modules",
            Entity::Progress => "progress",
            Entity::Answers => "answers",
            Entity::Feedback => "feedback",
            Entity::Classes => "classes",
        }
    }
}

/// Serves a fixed [`Snapshot`], applying scope filters like a real backend.
///
/// Counts fetches, and can inject failures and latency for exercising
/// error and ordering paths.
pub struct MemoryGateway {
    data: Mutex<Snapshot>,
    failing: Mutex<HashSet<Entity>>,
    delay: Mutex<Option<Duration>>,
    call_count: AtomicU32,
}

impl MemoryGateway {
    pub fn new(data: Snapshot) -> Self {
        Self {
            data: Mutex::new(data),
            failing: Mutex::new(HashSet::new()),
            delay: Mutex::new(None),
            call_count: AtomicU32::new(0),
        }
    }

    /// Replace the served data, as if rows changed in the backend.
    pub fn replace(&self, data: Snapshot) {
        *self.data.lock().unwrap_or_else(PoisonError::into_inner) = data;
    }

    /// Make every fetch of `entity` fail until [`heal`](Self::heal) is called.
    pub fn fail_on(&self, entity: Entity) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(entity);
    }

    pub fn heal(&self) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Sleep this long before answering each fetch.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap_or_else(PoisonError::into_inner) = delay;
    }

    /// Number of fetch calls made so far.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    async fn enter(&self, entity: Entity) -> Result<(), GatewayError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        let delay = *self.delay.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let failing = self
            .failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&entity);
        if failing {
            return Err(GatewayError::Injected(entity.name().to_string()));
        }
        Ok(())
    }

    fn read<T, F>(&self, f: F) -> Vec<T>
    where
        F: FnOnce(&Snapshot) -> Vec<T>,
    {
        f(&self.data.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

fn in_scope(scope: &SnapshotScope, user_id: &str, module_id: &str) -> bool {
    let user_ok = scope
        .user_ids
        .as_ref()
        .map_or(true, |ids| ids.iter().any(|id| id == user_id));
    let module_ok = scope
        .module_ids
        .as_ref()
        .map_or(true, |ids| ids.iter().any(|id| id == module_id));
    user_ok && module_ok
}

fn by_ids<T: Clone>(items: &[T], ids: Option<&[String]>, id: impl Fn(&T) -> &str) -> Vec<T> {
    items
        .iter()
        .filter(|item| ids.map_or(true, |ids| ids.iter().any(|i| i == id(*item))))
        .cloned()
        .collect()
}

#[async_trait]
impl DataGateway for MemoryGateway {
    fn name(&self) -> &str {
        "memory"
    }

    async fn fetch_profiles(&self, ids: Option<&[String]>) -> anyhow::Result<Vec<Profile>> {
        self.enter(Entity::Profiles).await?;
        Ok(self.read(|s| by_ids(&s.profiles, ids, |p| p.id.as_str())))
    }

    async fn fetch_modules(&self, ids: Option<&[String]>) -> anyhow::Result<Vec<Module>> {
        self.enter(Entity::Modules).await?;
        Ok(self.read(|s| by_ids(&s.modules, ids, |m| m.id.as_str())))
    }

    async fn fetch_progress(&self, scope: &SnapshotScope) -> anyhow::Result<Vec<ProgressRecord>> {
        self.enter(Entity::Progress).await?;
        Ok(self.read(|s| {
            s.progress
                .iter()
                .filter(|p| in_scope(scope, &p.user_id, &p.module_id))
                .cloned()
                .collect()
        }))
    }

    async fn fetch_answers(&self, scope: &SnapshotScope) -> anyhow::Result<Vec<AnswerRecord>> {
        self.enter(Entity::Answers).await?;
        Ok(self.read(|s| {
            s.answers
                .iter()
                .filter(|a| in_scope(scope, &a.user_id, &a.module_id))
                .cloned()
                .collect()
        }))
    }

    async fn fetch_feedback(&self, scope: &SnapshotScope) -> anyhow::Result<Vec<FeedbackRecord>> {
        self.enter(Entity::Feedback).await?;
        Ok(self.read(|s| {
            s.feedback
                .iter()
                .filter(|f| in_scope(scope, &f.user_id, &f.module_id))
                .cloned()
                .collect()
        }))
    }

    async fn fetch_classes(&self) -> anyhow::Result<Vec<Class>> {
        self.enter(Entity::Classes).await?;
        Ok(self.read(|s| s.classes.clone()))
    }
}
