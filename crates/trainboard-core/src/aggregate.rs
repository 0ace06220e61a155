//! The aggregation core.
//!
//! Pure functions from raw record sets to metric records. Every report
//! surface (dashboard, per-student report, per-module report, feedback view)
//! goes through these functions, so a metric is defined in exactly one place.

use std::collections::{BTreeMap, HashSet};

use chrono::Datelike;

use crate::error::ReportError;
use crate::index::{group_by, SnapshotIndex};
use crate::metrics::{
    DashboardSummary, FeedbackStats, ModuleFeedback, ModuleMetrics, ModuleRef, ModuleStudentRow,
    PeriodCount, ScoreSource, StatusBreakdown, StudentMetrics, StudentModuleRow, StudentRef,
};
use crate::model::{
    AnswerRecord, FeedbackRecord, Module, ModuleStatus, Profile, ProgressRecord, ProgressStatus,
    Role, Snapshot,
};
use crate::numeric::{clamp_percent, mean_rounded, percent, round_one_decimal};

// ---------------------------------------------------------------------------
// Entry points over plain record slices
// ---------------------------------------------------------------------------

/// Compute one [`StudentMetrics`] per profile, in profile order.
pub fn compute_student_metrics(
    profiles: &[Profile],
    progress: &[ProgressRecord],
    answers: &[AnswerRecord],
) -> Vec<StudentMetrics> {
    let progress_by_user = group_by(progress, |p| p.user_id.as_str());
    let answers_by_user = group_by(answers, |a| a.user_id.as_str());

    profiles
        .iter()
        .map(|profile| {
            let rows = progress_by_user
                .get(profile.id.as_str())
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let answers = answers_by_user
                .get(profile.id.as_str())
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            student_metrics_for(profile, rows, answers)
        })
        .collect()
}

/// Compute one [`ModuleMetrics`] per module, in module order.
pub fn compute_module_metrics(
    modules: &[Module],
    progress: &[ProgressRecord],
    answers: &[AnswerRecord],
) -> Vec<ModuleMetrics> {
    let progress_by_module = group_by(progress, |p| p.module_id.as_str());
    let answers_by_module = group_by(answers, |a| a.module_id.as_str());

    modules
        .iter()
        .map(|module| {
            let rows = progress_by_module
                .get(module.id.as_str())
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let answers = answers_by_module
                .get(module.id.as_str())
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            module_metrics_for(module, rows, answers)
        })
        .collect()
}

/// Summarize star ratings.
///
/// A rating outside 1..=5 is a data-contract violation and fails the whole
/// computation instead of being skipped.
pub fn compute_feedback_stats(feedback: &[FeedbackRecord]) -> Result<FeedbackStats, ReportError> {
    feedback_stats_of(feedback.iter())
}

// ---------------------------------------------------------------------------
// Entry points over a prebuilt index
// ---------------------------------------------------------------------------

/// [`compute_student_metrics`] over an existing index.
pub fn student_metrics<'a, I>(index: &SnapshotIndex<'a>, profiles: I) -> Vec<StudentMetrics>
where
    I: IntoIterator<Item = &'a Profile>,
{
    profiles
        .into_iter()
        .map(|p| {
            student_metrics_for(
                p,
                index.progress_for_user(&p.id),
                index.answers_for_user(&p.id),
            )
        })
        .collect()
}

/// [`compute_module_metrics`] over an existing index.
pub fn module_metrics<'a, I>(index: &SnapshotIndex<'a>, modules: I) -> Vec<ModuleMetrics>
where
    I: IntoIterator<Item = &'a Module>,
{
    modules
        .into_iter()
        .map(|m| {
            module_metrics_for(
                m,
                index.progress_for_module(&m.id),
                index.answers_for_module(&m.id),
            )
        })
        .collect()
}

/// Feedback summary of every module in the snapshot, in module order.
pub fn feedback_stats_by_module(index: &SnapshotIndex<'_>) -> Result<Vec<ModuleFeedback>, ReportError> {
    index
        .snapshot
        .modules
        .iter()
        .map(|m| {
            Ok(ModuleFeedback {
                module: ModuleRef::from(m),
                stats: feedback_stats_of(index.feedback_for_module(&m.id).iter().copied())?,
            })
        })
        .collect()
}

/// Module lines of one student's report, ordered by module title then id.
pub fn student_module_rows(
    index: &SnapshotIndex<'_>,
    student_id: &str,
) -> Result<Vec<StudentModuleRow>, ReportError> {
    if index.profile(student_id).is_none() {
        return Err(ReportError::UnknownStudent(student_id.to_string()));
    }

    let mut rows: Vec<StudentModuleRow> = index
        .progress_for_user(student_id)
        .iter()
        .map(|p| StudentModuleRow {
            module: index.module(&p.module_id).map(ModuleRef::from).unwrap_or_else(|| {
                ModuleRef {
                    id: p.module_id.clone(),
                    title: p.module_id.clone(),
                }
            }),
            status: p.status,
            score: p.score_percent.map(clamp_percent),
            completed_at: p.completed_at,
        })
        .collect();

    rows.sort_by(|a, b| {
        a.module
            .title
            .to_lowercase()
            .cmp(&b.module.title.to_lowercase())
            .then_with(|| a.module.id.cmp(&b.module.id))
    });
    Ok(rows)
}

/// Student lines of one module's report, ordered by student name then id.
pub fn module_student_rows(
    index: &SnapshotIndex<'_>,
    module_id: &str,
) -> Result<Vec<ModuleStudentRow>, ReportError> {
    if index.module(module_id).is_none() {
        return Err(ReportError::UnknownModule(module_id.to_string()));
    }

    let mut rows: Vec<ModuleStudentRow> = index
        .progress_for_module(module_id)
        .iter()
        .map(|p| ModuleStudentRow {
            student: index.profile(&p.user_id).map(StudentRef::from).unwrap_or_else(|| {
                StudentRef {
                    id: p.user_id.clone(),
                    name: p.user_id.clone(),
                    email: String::new(),
                }
            }),
            status: p.status,
            score: p.score_percent.map(clamp_percent),
            completed_at: p.completed_at,
        })
        .collect();

    rows.sort_by(|a, b| {
        a.student
            .name
            .to_lowercase()
            .cmp(&b.student.name.to_lowercase())
            .then_with(|| a.student.id.cmp(&b.student.id))
    });
    Ok(rows)
}

/// Count progress rows by status.
pub fn status_breakdown<'a, I>(progress: I) -> StatusBreakdown
where
    I: IntoIterator<Item = &'a ProgressRecord>,
{
    let mut breakdown = StatusBreakdown::default();
    for p in progress {
        match p.status {
            ProgressStatus::Completed => breakdown.completed += 1,
            ProgressStatus::InProgress => breakdown.in_progress += 1,
            ProgressStatus::NotStarted => breakdown.not_started += 1,
        }
    }
    breakdown
}

/// Headline numbers for the manager dashboard.
pub fn dashboard_summary(index: &SnapshotIndex<'_>) -> DashboardSummary {
    let snapshot = index.snapshot;
    let collaborators: Vec<&Profile> = active_collaborators(snapshot.profiles.iter()).collect();
    let rates = student_metrics(index, collaborators.iter().copied())
        .into_iter()
        .map(|m| m.completion_rate as f64);

    DashboardSummary {
        active_collaborators: collaborators.len(),
        published_modules: snapshot
            .modules
            .iter()
            .filter(|m| m.status == ModuleStatus::Published)
            .count(),
        average_completion_rate: mean_rounded(rates).unwrap_or(0),
        class_count: snapshot.classes.len(),
    }
}

/// Active profiles with the collaborator role, in input order.
pub fn active_collaborators<'a, I>(profiles: I) -> impl Iterator<Item = &'a Profile>
where
    I: IntoIterator<Item = &'a Profile>,
{
    profiles
        .into_iter()
        .filter(|p| p.active && p.role == Role::Collaborator)
}

/// Completed rows bucketed by `YYYY-MM`, oldest first.
pub fn completions_by_month<'a, I>(progress: I) -> Vec<PeriodCount>
where
    I: IntoIterator<Item = &'a ProgressRecord>,
{
    bucket_completions(progress, |at| format!("{:04}-{:02}", at.year(), at.month()))
}

/// Completed rows bucketed by ISO week (`YYYY-Www`), oldest first.
pub fn completions_by_week<'a, I>(progress: I) -> Vec<PeriodCount>
where
    I: IntoIterator<Item = &'a ProgressRecord>,
{
    bucket_completions(progress, |at| {
        let week = at.iso_week();
        format!("{:04}-W{:02}", week.year(), week.week())
    })
}

/// Per-module average score of a group of students.
///
/// For a single student this is that student's score on each module; for a
/// class it is the mean over members with a scored row. Modules without any
/// scored row contribute `0`. The output is aligned with `modules`.
pub fn module_score_vector(
    index: &SnapshotIndex<'_>,
    student_ids: &[&str],
    modules: &[&Module],
) -> Vec<u32> {
    modules
        .iter()
        .map(|m| {
            let scores = index
                .progress_for_module(&m.id)
                .iter()
                .filter(|p| student_ids.contains(&p.user_id.as_str()))
                .filter_map(|p| p.score_percent);
            mean_rounded(scores).unwrap_or(0)
        })
        .collect()
}

/// Mean score of a group over every scored row its members have on
/// `modules`, or `None` when no member has one.
pub fn group_average_score(
    index: &SnapshotIndex<'_>,
    student_ids: &[&str],
    modules: &[&Module],
) -> Option<u32> {
    let scores = student_ids.iter().flat_map(|id| {
        index
            .progress_for_user(id)
            .iter()
            .filter(|p| modules.iter().any(|m| m.id == p.module_id))
            .filter_map(|p| p.score_percent)
    });
    mean_rounded(scores)
}

/// The slice of `snapshot` the manager dashboard counts: progress and
/// answers of active collaborators on published modules.
///
/// Headline numbers, ranking grids and charts are all computed from this
/// one record set, so they describe the same population.
pub fn dashboard_snapshot(snapshot: &Snapshot) -> Snapshot {
    let users: HashSet<&str> = active_collaborators(snapshot.profiles.iter())
        .map(|p| p.id.as_str())
        .collect();
    let modules: HashSet<&str> = snapshot
        .modules
        .iter()
        .filter(|m| m.status == ModuleStatus::Published)
        .map(|m| m.id.as_str())
        .collect();
    let counted = |user_id: &str, module_id: &str| {
        users.contains(user_id) && modules.contains(module_id)
    };

    let mut scoped = snapshot.clone();
    scoped.progress.retain(|p| counted(&p.user_id, &p.module_id));
    scoped.answers.retain(|a| counted(&a.user_id, &a.module_id));
    scoped
}

// ---------------------------------------------------------------------------
// Per-entity formulas
// ---------------------------------------------------------------------------

fn student_metrics_for(
    profile: &Profile,
    rows: &[&ProgressRecord],
    answers: &[&AnswerRecord],
) -> StudentMetrics {
    let breakdown = status_breakdown(rows.iter().copied());
    let average = mean_rounded(rows.iter().filter_map(|p| p.score_percent));
    let (answered_count, correct_count) = graded_answers(answers);

    StudentMetrics {
        student: StudentRef::from(profile),
        total_modules: rows.len(),
        completed_count: breakdown.completed,
        in_progress_count: breakdown.in_progress,
        average_score: average.unwrap_or(0),
        completion_rate: percent(breakdown.completed, rows.len()),
        has_scores: average.is_some(),
        answered_count,
        correct_count,
    }
}

fn module_metrics_for(
    module: &Module,
    rows: &[&ProgressRecord],
    answers: &[&AnswerRecord],
) -> ModuleMetrics {
    let breakdown = status_breakdown(rows.iter().copied());

    // Progress scores win whenever any row carries one; answers are only a
    // fallback, never blended in.
    let (average_score, score_source) =
        match mean_rounded(rows.iter().filter_map(|p| p.score_percent)) {
            Some(avg) => (avg, ScoreSource::Progress),
            None => {
                let (graded, correct) = graded_answers(answers);
                if graded > 0 {
                    (percent(correct, graded), ScoreSource::Answers)
                } else {
                    (0, ScoreSource::None)
                }
            }
        };

    ModuleMetrics {
        module: ModuleRef::from(module),
        total_users: rows.len(),
        completed_count: breakdown.completed,
        in_progress_count: breakdown.in_progress,
        average_score,
        completion_rate: percent(breakdown.completed, rows.len()),
        has_scores: score_source != ScoreSource::None,
        score_source,
    }
}

fn feedback_stats_of<'a, I>(feedback: I) -> Result<FeedbackStats, ReportError>
where
    I: IntoIterator<Item = &'a FeedbackRecord>,
{
    let mut stats = FeedbackStats::default();
    let mut sum = 0u64;
    for f in feedback {
        if !(1..=5).contains(&f.rating) {
            return Err(ReportError::InvalidRating {
                user_id: f.user_id.clone(),
                module_id: f.module_id.clone(),
                rating: f.rating,
            });
        }
        stats.distribution[(f.rating - 1) as usize] += 1;
        stats.total_count += 1;
        sum += f.rating as u64;
    }
    if stats.total_count > 0 {
        stats.average_rating = round_one_decimal(sum as f64 / stats.total_count as f64);
    }
    Ok(stats)
}

/// (graded, correct) over answers with a non-null correctness flag.
fn graded_answers(answers: &[&AnswerRecord]) -> (usize, usize) {
    answers
        .iter()
        .filter_map(|a| a.is_correct)
        .fold((0, 0), |(graded, correct), ok| {
            (graded + 1, correct + usize::from(ok))
        })
}

fn bucket_completions<'a, I, F>(progress: I, period: F) -> Vec<PeriodCount>
where
    I: IntoIterator<Item = &'a ProgressRecord>,
    F: Fn(&chrono::DateTime<chrono::Utc>) -> String,
{
    let mut buckets: BTreeMap<String, usize> = BTreeMap::new();
    for p in progress {
        if p.status != ProgressStatus::Completed {
            continue;
        }
        if let Some(at) = &p.completed_at {
            *buckets.entry(period(at)).or_default() += 1;
        }
    }
    buckets
        .into_iter()
        .map(|(period, completions)| PeriodCount {
            period,
            completions,
        })
        .collect()
}
