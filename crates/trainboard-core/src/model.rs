//! Raw record types for trainboard.
//!
//! These mirror the rows owned by the persistence layer: profiles, modules,
//! progress, quiz answers, feedback, and classes. They are read-only inputs
//! to every aggregation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A platform user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Login email.
    #[serde(default)]
    pub email: String,
    /// Manager or collaborator.
    pub role: Role,
    /// Inactive profiles are kept for history but excluded from headcounts.
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

/// Platform role of a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Manager,
    Collaborator,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Manager => write!(f, "manager"),
            Role::Collaborator => write!(f, "collaborator"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "manager" | "admin" | "gestor" => Ok(Role::Manager),
            "collaborator" | "user" | "colaborador" => Ok(Role::Collaborator),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// A learning module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub id: String,
    pub title: String,
    pub status: ModuleStatus,
}

/// Publication state of a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleStatus {
    #[serde(alias = "rascunho")]
    Draft,
    #[serde(alias = "publicado")]
    Published,
}

impl fmt::Display for ModuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleStatus::Draft => write!(f, "draft"),
            ModuleStatus::Published => write!(f, "published"),
        }
    }
}

impl FromStr for ModuleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" | "rascunho" => Ok(ModuleStatus::Draft),
            "published" | "publicado" => Ok(ModuleStatus::Published),
            other => Err(format!("unknown module status: {other}")),
        }
    }
}

/// One row per (user, module), upserted on every state transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub user_id: String,
    pub module_id: String,
    pub status: ProgressStatus,
    /// Final quiz score in `[0, 100]`, when the module has been scored.
    #[serde(default)]
    pub score_percent: Option<f64>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Completion state of a progress row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    #[serde(alias = "pendente")]
    NotStarted,
    #[serde(alias = "em_andamento")]
    InProgress,
    #[serde(alias = "concluido")]
    Completed,
}

impl ProgressStatus {
    /// Label used in report tables.
    pub fn label(self) -> &'static str {
        match self {
            ProgressStatus::NotStarted => "Pendente",
            ProgressStatus::InProgress => "Em Andamento",
            ProgressStatus::Completed => "Concluído",
        }
    }
}

impl fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressStatus::NotStarted => write!(f, "not_started"),
            ProgressStatus::InProgress => write!(f, "in_progress"),
            ProgressStatus::Completed => write!(f, "completed"),
        }
    }
}

impl FromStr for ProgressStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "not_started" | "pendente" => Ok(ProgressStatus::NotStarted),
            "in_progress" | "em_andamento" => Ok(ProgressStatus::InProgress),
            "completed" | "concluido" => Ok(ProgressStatus::Completed),
            other => Err(format!("unknown progress status: {other}")),
        }
    }
}

/// One row per (user, question).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub user_id: String,
    pub module_id: String,
    pub question_id: String,
    /// `None` for open questions that are not graded.
    #[serde(default)]
    pub is_correct: Option<bool>,
}

/// One row per (user, module).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub user_id: String,
    pub module_id: String,
    /// Star rating, 1 through 5.
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
}

/// A named cohort of collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Class {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub member_ids: Vec<String>,
}

/// One fetched batch of raw record sets.
///
/// Every aggregation in a report run reads from the same snapshot so that
/// all derived numbers describe the same moment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub profiles: Vec<Profile>,
    #[serde(default)]
    pub modules: Vec<Module>,
    #[serde(default)]
    pub progress: Vec<ProgressRecord>,
    #[serde(default)]
    pub answers: Vec<AnswerRecord>,
    #[serde(default)]
    pub feedback: Vec<FeedbackRecord>,
    #[serde(default)]
    pub classes: Vec<Class>,
}

impl Snapshot {
    /// Total number of raw rows across all record sets.
    pub fn row_count(&self) -> usize {
        self.profiles.len()
            + self.modules.len()
            + self.progress.len()
            + self.answers.len()
            + self.feedback.len()
            + self.classes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display_and_parse() {
        assert_eq!(ProgressStatus::InProgress.to_string(), "in_progress");
        assert_eq!(
            "completed".parse::<ProgressStatus>().unwrap(),
            ProgressStatus::Completed
        );
        assert_eq!(
            "em_andamento".parse::<ProgressStatus>().unwrap(),
            ProgressStatus::InProgress
        );
        assert!("done".parse::<ProgressStatus>().is_err());
        assert_eq!("Publicado".parse::<ModuleStatus>().unwrap(), ModuleStatus::Published);
        assert_eq!("gestor".parse::<Role>().unwrap(), Role::Manager);
    }

    #[test]
    fn progress_row_from_json() {
        let json = r#"{
            "user_id": "u1",
            "module_id": "m1",
            "status": "completed",
            "score_percent": 82.5,
            "completed_at": "2025-11-01T10:00:00Z"
        }"#;
        let row: ProgressRecord = serde_json::from_str(json).unwrap();
        assert_eq!(row.status, ProgressStatus::Completed);
        assert_eq!(row.score_percent, Some(82.5));
        assert!(row.completed_at.is_some());
    }

    #[test]
    fn portuguese_aliases_deserialize() {
        let module: Module =
            serde_json::from_str(r#"{"id":"m1","title":"Segurança","status":"publicado"}"#)
                .unwrap();
        assert_eq!(module.status, ModuleStatus::Published);

        let row: ProgressRecord = serde_json::from_str(
            r#"{"user_id":"u1","module_id":"m1","status":"em_andamento"}"#,
        )
        .unwrap();
        assert_eq!(row.status, ProgressStatus::InProgress);
        assert_eq!(row.score_percent, None);
    }

    #[test]
    fn profile_defaults_to_active() {
        let p: Profile =
            serde_json::from_str(r#"{"id":"u1","name":"Ana","role":"collaborator"}"#).unwrap();
        assert!(p.active);
        assert!(p.email.is_empty());
    }
}
