//! Search, sort, and paging over already-computed metrics.
//!
//! Nothing here fetches or aggregates; every function reorders or selects
//! records that the aggregation core has produced.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::metrics::{ModuleFeedback, ModuleMetrics, ModuleStudentRow, StudentMetrics, StudentModuleRow};
use crate::model::FeedbackRecord;

/// Sort direction of a table column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flip(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    fn apply(self, ord: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "asc"),
            SortDirection::Desc => write!(f, "desc"),
        }
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(SortDirection::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(SortDirection::Desc)
        } else {
            Err(format!("sort direction must be one of: asc, desc (got {s})"))
        }
    }
}

/// Column and direction a table is currently sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState<F> {
    pub field: F,
    pub direction: SortDirection,
}

impl<F: Copy + PartialEq> SortState<F> {
    pub fn new(field: F) -> Self {
        Self {
            field,
            direction: SortDirection::Asc,
        }
    }

    /// The state after the user clicks the `clicked` column header.
    pub fn toggle(self, clicked: F) -> Self {
        let (field, direction) = toggle_sort(self.field, self.direction, clicked);
        Self { field, direction }
    }
}

/// Clicking the current column flips its direction; clicking another column
/// sorts by it ascending.
pub fn toggle_sort<F: PartialEq>(
    current_field: F,
    current_direction: SortDirection,
    clicked_field: F,
) -> (F, SortDirection) {
    if clicked_field == current_field {
        (current_field, current_direction.flip())
    } else {
        (clicked_field, SortDirection::Asc)
    }
}

/// Records that can be ordered by a named column.
pub trait Sortable {
    /// Column identifier.
    type Field: Copy;

    /// Compare two records on `field` alone.
    fn compare_by(&self, other: &Self, field: Self::Field) -> Ordering;

    /// Unique, deterministic tie-breaker (the entity id).
    fn tie_key(&self) -> &str;
}

/// Records that can be matched by a free-text search.
pub trait Searchable {
    /// The text fields a search term is matched against.
    fn search_fields(&self) -> Vec<&str>;
}

/// Keep the records whose search fields contain `term`, ignoring case.
///
/// A blank term keeps everything. Relative order is preserved.
pub fn filter<T: Searchable + Clone>(items: &[T], term: &str) -> Vec<T> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return items.to_vec();
    }
    items
        .iter()
        .filter(|item| {
            item.search_fields()
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
        })
        .cloned()
        .collect()
}

/// Stable sort on `field`, ties broken by id.
///
/// Descending order is the exact reverse of ascending order, tie-breaks
/// included, so toggling a column twice restores the original order.
pub fn sort<T: Sortable>(items: &mut [T], field: T::Field, direction: SortDirection) {
    items.sort_by(|a, b| {
        let ord = a
            .compare_by(b, field)
            .then_with(|| a.tie_key().cmp(b.tie_key()));
        direction.apply(ord)
    });
}

/// Sorted copy of `items`.
pub fn sorted<T: Sortable + Clone>(items: &[T], state: SortState<T::Field>) -> Vec<T> {
    let mut out = items.to_vec();
    sort(&mut out, state.field, state.direction);
    out
}

/// One 1-based page of `items`; out-of-range pages are empty.
pub fn paginate<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
    let start = page.saturating_sub(1).saturating_mul(page_size);
    if start >= items.len() {
        return &[];
    }
    let end = std::cmp::min(start.saturating_add(page_size), items.len());
    &items[start..end]
}

/// Number of pages needed for `total` rows.
pub fn page_count(total: usize, page_size: usize) -> usize {
    if page_size == 0 {
        0
    } else {
        total.div_ceil(page_size)
    }
}

/// The feedback view's module and star filters.
pub fn filter_feedback<'a>(
    feedback: &'a [FeedbackRecord],
    module_id: Option<&str>,
    rating: Option<u8>,
) -> Vec<&'a FeedbackRecord> {
    feedback
        .iter()
        .filter(|f| module_id.map_or(true, |id| f.module_id == id))
        .filter(|f| rating.map_or(true, |r| f.rating == r))
        .collect()
}

fn cmp_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

// ---------------------------------------------------------------------------
// Student metrics
// ---------------------------------------------------------------------------

/// Sortable columns of the student ranking table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudentField {
    Name,
    Email,
    TotalModules,
    Completed,
    InProgress,
    AverageScore,
    CompletionRate,
}

impl FromStr for StudentField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(StudentField::Name),
            "email" => Ok(StudentField::Email),
            "total_modules" | "totalModules" => Ok(StudentField::TotalModules),
            "completed" | "completed_count" => Ok(StudentField::Completed),
            "in_progress" | "in_progress_count" => Ok(StudentField::InProgress),
            "average_score" | "averageScore" => Ok(StudentField::AverageScore),
            "completion_rate" | "completionRate" => Ok(StudentField::CompletionRate),
            other => Err(format!("unknown student sort field: {other}")),
        }
    }
}

impl Sortable for StudentMetrics {
    type Field = StudentField;

    fn compare_by(&self, other: &Self, field: StudentField) -> Ordering {
        match field {
            StudentField::Name => cmp_text(&self.student.name, &other.student.name),
            StudentField::Email => cmp_text(&self.student.email, &other.student.email),
            StudentField::TotalModules => self.total_modules.cmp(&other.total_modules),
            StudentField::Completed => self.completed_count.cmp(&other.completed_count),
            StudentField::InProgress => self.in_progress_count.cmp(&other.in_progress_count),
            StudentField::AverageScore => self.average_score.cmp(&other.average_score),
            StudentField::CompletionRate => self.completion_rate.cmp(&other.completion_rate),
        }
    }

    fn tie_key(&self) -> &str {
        &self.student.id
    }
}

impl Searchable for StudentMetrics {
    fn search_fields(&self) -> Vec<&str> {
        vec![&self.student.name, &self.student.email]
    }
}

// ---------------------------------------------------------------------------
// Module metrics
// ---------------------------------------------------------------------------

/// Sortable columns of the module ranking table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleField {
    Title,
    TotalUsers,
    Completed,
    InProgress,
    AverageScore,
    CompletionRate,
}

impl FromStr for ModuleField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "title" => Ok(ModuleField::Title),
            "total_users" | "totalUsers" => Ok(ModuleField::TotalUsers),
            "completed" | "completed_count" => Ok(ModuleField::Completed),
            "in_progress" | "in_progress_count" => Ok(ModuleField::InProgress),
            "average_score" | "averageScore" => Ok(ModuleField::AverageScore),
            "completion_rate" | "completionRate" => Ok(ModuleField::CompletionRate),
            other => Err(format!("unknown module sort field: {other}")),
        }
    }
}

impl Sortable for ModuleMetrics {
    type Field = ModuleField;

    fn compare_by(&self, other: &Self, field: ModuleField) -> Ordering {
        match field {
            ModuleField::Title => cmp_text(&self.module.title, &other.module.title),
            ModuleField::TotalUsers => self.total_users.cmp(&other.total_users),
            ModuleField::Completed => self.completed_count.cmp(&other.completed_count),
            ModuleField::InProgress => self.in_progress_count.cmp(&other.in_progress_count),
            ModuleField::AverageScore => self.average_score.cmp(&other.average_score),
            ModuleField::CompletionRate => self.completion_rate.cmp(&other.completion_rate),
        }
    }

    fn tie_key(&self) -> &str {
        &self.module.id
    }
}

impl Searchable for ModuleMetrics {
    fn search_fields(&self) -> Vec<&str> {
        vec![&self.module.title]
    }
}

// ---------------------------------------------------------------------------
// Feedback per module
// ---------------------------------------------------------------------------

/// Sortable columns of the per-module feedback table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackField {
    Title,
    TotalCount,
    AverageRating,
}

impl Sortable for ModuleFeedback {
    type Field = FeedbackField;

    fn compare_by(&self, other: &Self, field: FeedbackField) -> Ordering {
        match field {
            FeedbackField::Title => cmp_text(&self.module.title, &other.module.title),
            FeedbackField::TotalCount => self.stats.total_count.cmp(&other.stats.total_count),
            FeedbackField::AverageRating => {
                cmp_f64(self.stats.average_rating, other.stats.average_rating)
            }
        }
    }

    fn tie_key(&self) -> &str {
        &self.module.id
    }
}

impl Searchable for ModuleFeedback {
    fn search_fields(&self) -> Vec<&str> {
        vec![&self.module.title]
    }
}

// ---------------------------------------------------------------------------
// Report detail rows
// ---------------------------------------------------------------------------

impl Searchable for StudentModuleRow {
    fn search_fields(&self) -> Vec<&str> {
        vec![&self.module.title]
    }
}

impl Searchable for FeedbackRecord {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.user_id.as_str(), self.module_id.as_str()];
        if let Some(comment) = &self.comment {
            fields.push(comment);
        }
        fields
    }
}

impl Searchable for ModuleStudentRow {
    fn search_fields(&self) -> Vec<&str> {
        vec![&self.student.name, &self.student.email]
    }
}
