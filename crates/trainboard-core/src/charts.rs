//! Chart projection.
//!
//! Turns metric records into the series shapes the presentation layer draws.
//! Projections never aggregate on their own beyond reading the index; all
//! rounding goes through [`crate::numeric`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::aggregate::{group_average_score, module_score_vector};
use crate::error::{ensure_len, ReportError};
use crate::index::SnapshotIndex;
use crate::metrics::{FeedbackStats, ModuleMetrics, PeriodCount, StatusBreakdown, StudentMetrics};
use crate::model::{Module, ProgressStatus};
use crate::numeric::pie_percentages;

/// Display names of the five rating stars, one-star first.
pub const RATING_LABELS: [&str; 5] = ["Muito Ruim", "Ruim", "Regular", "Bom", "Excelente"];

/// Kind of a labelled single-series chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesKind {
    Bar,
    Line,
}

/// A bar or line chart: one value per label, in source order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesChart {
    pub kind: SeriesKind,
    pub title: String,
    pub labels: Vec<String>,
    pub data: Vec<u32>,
}

impl SeriesChart {
    pub fn validate(&self) -> Result<(), ReportError> {
        ensure_len(&self.title, self.labels.len(), self.data.len())
    }
}

/// A pie chart. `percentages` always sums to 100 unless every count is 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieChart {
    pub title: String,
    pub labels: Vec<String>,
    pub counts: Vec<usize>,
    pub percentages: Vec<u32>,
}

impl PieChart {
    pub fn validate(&self) -> Result<(), ReportError> {
        ensure_len(&self.title, self.labels.len(), self.counts.len())?;
        ensure_len(&self.title, self.labels.len(), self.percentages.len())
    }
}

/// One axis of a radar chart: the key series values are looked up by, and
/// the text drawn at the axis tip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadarAxis {
    pub key: String,
    pub label: String,
}

impl From<&Module> for RadarAxis {
    fn from(m: &Module) -> Self {
        Self {
            key: m.id.clone(),
            label: m.title.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadarSeries {
    pub label: String,
    /// One value per axis, in axis order.
    pub values: Vec<u32>,
}

/// A radar chart over a fixed axis order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadarChart {
    pub title: String,
    /// What the axes are, used as the first column heading of the tabular form.
    #[serde(default = "default_axis_name")]
    pub axis_name: String,
    pub axes: Vec<String>,
    pub series: Vec<RadarSeries>,
}

fn default_axis_name() -> String {
    "Módulo".to_string()
}

impl RadarChart {
    pub fn validate(&self) -> Result<(), ReportError> {
        for s in &self.series {
            ensure_len(
                &format!("{} / {}", self.title, s.label),
                self.axes.len(),
                s.values.len(),
            )?;
        }
        Ok(())
    }
}

/// Any projected chart, as attached to a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Chart {
    Series(SeriesChart),
    Pie(PieChart),
    Radar(RadarChart),
}

impl Chart {
    pub fn title(&self) -> &str {
        match self {
            Chart::Series(c) => &c.title,
            Chart::Pie(c) => &c.title,
            Chart::Radar(c) => &c.title,
        }
    }

    pub fn validate(&self) -> Result<(), ReportError> {
        match self {
            Chart::Series(c) => c.validate(),
            Chart::Pie(c) => c.validate(),
            Chart::Radar(c) => c.validate(),
        }
    }
}

impl From<SeriesChart> for Chart {
    fn from(c: SeriesChart) -> Self {
        Chart::Series(c)
    }
}

impl From<PieChart> for Chart {
    fn from(c: PieChart) -> Self {
        Chart::Pie(c)
    }
}

impl From<RadarChart> for Chart {
    fn from(c: RadarChart) -> Self {
        Chart::Radar(c)
    }
}

// ---------------------------------------------------------------------------
// Generic projections
// ---------------------------------------------------------------------------

pub fn bar(title: &str, labels: Vec<String>, data: Vec<u32>) -> Result<SeriesChart, ReportError> {
    series(SeriesKind::Bar, title, labels, data)
}

pub fn line(title: &str, labels: Vec<String>, data: Vec<u32>) -> Result<SeriesChart, ReportError> {
    series(SeriesKind::Line, title, labels, data)
}

fn series(
    kind: SeriesKind,
    title: &str,
    labels: Vec<String>,
    data: Vec<u32>,
) -> Result<SeriesChart, ReportError> {
    let chart = SeriesChart {
        kind,
        title: title.to_string(),
        labels,
        data,
    };
    chart.validate()?;
    Ok(chart)
}

/// Pie over raw counts; percentages use the largest-remainder correction.
pub fn pie(title: &str, labels: Vec<String>, counts: Vec<usize>) -> Result<PieChart, ReportError> {
    ensure_len(title, labels.len(), counts.len())?;
    let as_f64: Vec<f64> = counts.iter().map(|&c| c as f64).collect();
    Ok(PieChart {
        title: title.to_string(),
        labels,
        percentages: pie_percentages(&as_f64),
        counts,
    })
}

/// Radar over a fixed axis order. A series with no value for an axis gets 0.
pub fn radar(title: &str, axes: &[RadarAxis], series: Vec<(String, HashMap<String, u32>)>) -> RadarChart {
    RadarChart {
        title: title.to_string(),
        axis_name: default_axis_name(),
        axes: axes.iter().map(|a| a.label.clone()).collect(),
        series: series
            .into_iter()
            .map(|(label, values)| RadarSeries {
                label,
                values: axes
                    .iter()
                    .map(|a| values.get(&a.key).copied().unwrap_or(0))
                    .collect(),
            })
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Report projections
// ---------------------------------------------------------------------------

pub fn module_average_bar(metrics: &[ModuleMetrics]) -> Result<SeriesChart, ReportError> {
    bar(
        "Média de Pontuação",
        metrics.iter().map(|m| m.module.title.clone()).collect(),
        metrics.iter().map(|m| m.average_score).collect(),
    )
}

pub fn module_completion_bar(metrics: &[ModuleMetrics]) -> Result<SeriesChart, ReportError> {
    bar(
        "Taxa de Conclusão (%)",
        metrics.iter().map(|m| m.module.title.clone()).collect(),
        metrics.iter().map(|m| m.completion_rate).collect(),
    )
}

pub fn student_completion_bar(metrics: &[StudentMetrics]) -> Result<SeriesChart, ReportError> {
    bar(
        "Conclusão por Colaborador (%)",
        metrics.iter().map(|s| s.student.name.clone()).collect(),
        metrics.iter().map(|s| s.completion_rate).collect(),
    )
}

pub fn monthly_completions_bar(periods: &[PeriodCount]) -> Result<SeriesChart, ReportError> {
    bar("Conclusões por Mês", period_labels(periods), period_values(periods))
}

pub fn weekly_completions_line(periods: &[PeriodCount]) -> Result<SeriesChart, ReportError> {
    line("Conclusões/semana", period_labels(periods), period_values(periods))
}

/// Completed / in progress / not started, in that order.
pub fn status_pie(breakdown: StatusBreakdown) -> Result<PieChart, ReportError> {
    pie(
        "Status",
        [
            ProgressStatus::Completed,
            ProgressStatus::InProgress,
            ProgressStatus::NotStarted,
        ]
        .iter()
        .map(|s| s.label().to_string())
        .collect(),
        vec![breakdown.completed, breakdown.in_progress, breakdown.not_started],
    )
}

pub fn feedback_distribution_bar(stats: &FeedbackStats) -> Result<SeriesChart, ReportError> {
    bar(
        "Distribuição de Avaliações",
        RATING_LABELS
            .iter()
            .enumerate()
            .map(|(i, name)| format!("{} - {}", i + 1, name))
            .collect(),
        stats.distribution.iter().map(|&c| count_u32(c)).collect(),
    )
}

/// Radar of per-module average scores, one series per labelled group of
/// students.
pub fn score_radar(
    index: &SnapshotIndex<'_>,
    title: &str,
    modules: &[&Module],
    groups: &[(String, Vec<&str>)],
) -> RadarChart {
    let axes: Vec<RadarAxis> = modules.iter().map(|m| RadarAxis::from(*m)).collect();
    let series = groups
        .iter()
        .map(|(label, ids)| {
            let values = modules
                .iter()
                .map(|m| m.id.clone())
                .zip(module_score_vector(index, ids, modules))
                .collect();
            (label.clone(), values)
        })
        .collect();
    radar(title, &axes, series)
}

/// One collaborator's scores against their class average.
pub fn collaborator_vs_class_radar(
    index: &SnapshotIndex<'_>,
    modules: &[&Module],
    student_id: &str,
    class_id: &str,
) -> Result<RadarChart, ReportError> {
    let student = index
        .profile(student_id)
        .ok_or_else(|| ReportError::UnknownStudent(student_id.to_string()))?;
    let class = index
        .class(class_id)
        .ok_or_else(|| ReportError::UnknownClass(class_id.to_string()))?;
    let members: Vec<&str> = class.member_ids.iter().map(String::as_str).collect();
    Ok(score_radar(
        index,
        "Colaborador vs Turma",
        modules,
        &[
            (student.name.clone(), vec![student.id.as_str()]),
            (class.name.clone(), members),
        ],
    ))
}

/// Two collaborators side by side.
pub fn collaborator_comparison_radar(
    index: &SnapshotIndex<'_>,
    modules: &[&Module],
    first_id: &str,
    second_id: &str,
) -> Result<RadarChart, ReportError> {
    let mut groups = Vec::with_capacity(2);
    for id in [first_id, second_id] {
        let profile = index
            .profile(id)
            .ok_or_else(|| ReportError::UnknownStudent(id.to_string()))?;
        groups.push((profile.name.clone(), vec![profile.id.as_str()]));
    }
    Ok(score_radar(index, "Colaborador vs Colaborador", modules, &groups))
}

/// Average score of each class over `modules`, one axis per class in
/// snapshot order. A class with no scored rows sits at 0.
pub fn class_average_radar(index: &SnapshotIndex<'_>, modules: &[&Module]) -> RadarChart {
    let classes = &index.snapshot.classes;
    let axes: Vec<RadarAxis> = classes
        .iter()
        .map(|c| RadarAxis {
            key: c.id.clone(),
            label: c.name.clone(),
        })
        .collect();
    let averages = classes
        .iter()
        .map(|c| {
            let members: Vec<&str> = c.member_ids.iter().map(String::as_str).collect();
            let average = group_average_score(index, &members, modules).unwrap_or(0);
            (c.id.clone(), average)
        })
        .collect();
    let mut chart = radar("Média por Turma", &axes, vec![("Média".to_string(), averages)]);
    chart.axis_name = "Turma".to_string();
    chart
}

fn period_labels(periods: &[PeriodCount]) -> Vec<String> {
    periods.iter().map(|p| p.period.clone()).collect()
}

fn period_values(periods: &[PeriodCount]) -> Vec<u32> {
    periods.iter().map(|p| count_u32(p.completions)).collect()
}

fn count_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
