//! Build-once lookups over a snapshot.
//!
//! Every aggregation entry point receives a [`SnapshotIndex`] built a single
//! time per batch, so no report rebuilds its own key → rows maps.

use std::collections::HashMap;
use std::hash::Hash;

use crate::model::{
    AnswerRecord, Class, FeedbackRecord, Module, Profile, ProgressRecord, Snapshot,
};

/// Group `items` by `key` in one pass, keeping input order inside each group.
pub fn group_by<'a, T, K, F>(items: &'a [T], key: F) -> HashMap<K, Vec<&'a T>>
where
    K: Eq + Hash,
    F: Fn(&'a T) -> K,
{
    let mut grouped: HashMap<K, Vec<&'a T>> = HashMap::new();
    for item in items {
        grouped.entry(key(item)).or_default().push(item);
    }
    grouped
}

/// Map `items` by a unique key. Later duplicates win.
pub fn index_by<'a, T, K, F>(items: &'a [T], key: F) -> HashMap<K, &'a T>
where
    K: Eq + Hash,
    F: Fn(&'a T) -> K,
{
    items.iter().map(|item| (key(item), item)).collect()
}

/// Every lookup a report run needs, borrowed from one [`Snapshot`].
#[derive(Debug)]
pub struct SnapshotIndex<'a> {
    pub snapshot: &'a Snapshot,
    pub profiles_by_id: HashMap<&'a str, &'a Profile>,
    pub modules_by_id: HashMap<&'a str, &'a Module>,
    pub classes_by_id: HashMap<&'a str, &'a Class>,
    pub progress_by_user: HashMap<&'a str, Vec<&'a ProgressRecord>>,
    pub progress_by_module: HashMap<&'a str, Vec<&'a ProgressRecord>>,
    pub answers_by_user: HashMap<&'a str, Vec<&'a AnswerRecord>>,
    pub answers_by_module: HashMap<&'a str, Vec<&'a AnswerRecord>>,
    pub feedback_by_module: HashMap<&'a str, Vec<&'a FeedbackRecord>>,
}

impl<'a> SnapshotIndex<'a> {
    /// Build all indices with one pass over each record set.
    pub fn build(snapshot: &'a Snapshot) -> Self {
        let index = Self {
            snapshot,
            profiles_by_id: index_by(&snapshot.profiles, |p| p.id.as_str()),
            modules_by_id: index_by(&snapshot.modules, |m| m.id.as_str()),
            classes_by_id: index_by(&snapshot.classes, |c| c.id.as_str()),
            progress_by_user: group_by(&snapshot.progress, |p| p.user_id.as_str()),
            progress_by_module: group_by(&snapshot.progress, |p| p.module_id.as_str()),
            answers_by_user: group_by(&snapshot.answers, |a| a.user_id.as_str()),
            answers_by_module: group_by(&snapshot.answers, |a| a.module_id.as_str()),
            feedback_by_module: group_by(&snapshot.feedback, |f| f.module_id.as_str()),
        };
        tracing::debug!(
            profiles = snapshot.profiles.len(),
            modules = snapshot.modules.len(),
            progress = snapshot.progress.len(),
            answers = snapshot.answers.len(),
            feedback = snapshot.feedback.len(),
            "built snapshot index"
        );
        index
    }

    /// Progress rows of one user, empty when the user has none.
    pub fn progress_for_user(&self, user_id: &str) -> &[&'a ProgressRecord] {
        self.progress_by_user
            .get(user_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Progress rows of one module, empty when the module has none.
    pub fn progress_for_module(&self, module_id: &str) -> &[&'a ProgressRecord] {
        self.progress_by_module
            .get(module_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn answers_for_user(&self, user_id: &str) -> &[&'a AnswerRecord] {
        self.answers_by_user
            .get(user_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn answers_for_module(&self, module_id: &str) -> &[&'a AnswerRecord] {
        self.answers_by_module
            .get(module_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn feedback_for_module(&self, module_id: &str) -> &[&'a FeedbackRecord] {
        self.feedback_by_module
            .get(module_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn profile(&self, id: &str) -> Option<&'a Profile> {
        self.profiles_by_id.get(id).copied()
    }

    pub fn module(&self, id: &str) -> Option<&'a Module> {
        self.modules_by_id.get(id).copied()
    }

    pub fn class(&self, id: &str) -> Option<&'a Class> {
        self.classes_by_id.get(id).copied()
    }
}
