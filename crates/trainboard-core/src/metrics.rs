//! Derived metric records.
//!
//! Metrics are computed fresh from raw rows on every report load and never
//! persisted. The same records feed tables, charts, and exports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Module, Profile, ProgressStatus};

/// Identity of the student a metric row describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRef {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl From<&Profile> for StudentRef {
    fn from(p: &Profile) -> Self {
        Self {
            id: p.id.clone(),
            name: p.name.clone(),
            email: p.email.clone(),
        }
    }
}

/// Identity of the module a metric row describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRef {
    pub id: String,
    pub title: String,
}

impl From<&Module> for ModuleRef {
    fn from(m: &Module) -> Self {
        Self {
            id: m.id.clone(),
            title: m.title.clone(),
        }
    }
}

/// Per-student performance across all of their progress rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentMetrics {
    pub student: StudentRef,
    pub total_modules: usize,
    pub completed_count: usize,
    pub in_progress_count: usize,
    /// Rounded mean of scored rows; `0` when `has_scores` is false.
    pub average_score: u32,
    pub completion_rate: u32,
    pub has_scores: bool,
    /// Graded quiz answers submitted by the student.
    pub answered_count: usize,
    /// Graded quiz answers marked correct.
    pub correct_count: usize,
}

/// Which formula produced a module's average score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    /// Mean of `score_percent` over scored progress rows.
    Progress,
    /// Correct / graded answers, used only when no progress row is scored.
    Answers,
    /// Neither source had any data.
    None,
}

/// Per-module performance across all enrolled users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleMetrics {
    pub module: ModuleRef,
    pub total_users: usize,
    pub completed_count: usize,
    pub in_progress_count: usize,
    pub average_score: u32,
    pub completion_rate: u32,
    pub has_scores: bool,
    pub score_source: ScoreSource,
}

/// Star-rating summary of a set of feedback rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackStats {
    pub total_count: usize,
    /// Mean rating rounded to one decimal; `0.0` when there is no feedback.
    pub average_rating: f64,
    /// Count per star, index 0 holding one-star ratings.
    pub distribution: [usize; 5],
}

impl Default for FeedbackStats {
    fn default() -> Self {
        Self {
            total_count: 0,
            average_rating: 0.0,
            distribution: [0; 5],
        }
    }
}

/// Feedback summary for one module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleFeedback {
    pub module: ModuleRef,
    pub stats: FeedbackStats,
}

/// A module line in a per-student report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentModuleRow {
    pub module: ModuleRef,
    pub status: ProgressStatus,
    pub score: Option<u32>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A student line in a per-module report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleStudentRow {
    pub student: StudentRef,
    pub status: ProgressStatus,
    pub score: Option<u32>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Progress rows counted by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusBreakdown {
    pub completed: usize,
    pub in_progress: usize,
    pub not_started: usize,
}

impl StatusBreakdown {
    pub fn total(&self) -> usize {
        self.completed + self.in_progress + self.not_started
    }
}

/// Headline numbers of the manager dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub active_collaborators: usize,
    pub published_modules: usize,
    /// Rounded mean of active collaborators' completion rates.
    pub average_completion_rate: u32,
    pub class_count: usize,
}

/// Completions falling in one calendar period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodCount {
    /// `YYYY-MM` for months, `YYYY-Www` for ISO weeks.
    pub period: String,
    pub completions: usize,
}
