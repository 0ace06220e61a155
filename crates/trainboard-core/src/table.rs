//! Report tables.
//!
//! A [`ReportTable`] is the typed grid shown on screen. Both export encodings
//! render it cell by cell, so they can never disagree with the screen about
//! a number.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregate::{
    active_collaborators, completions_by_month, completions_by_week, compute_feedback_stats,
    dashboard_snapshot, dashboard_summary, feedback_stats_by_module, module_metrics, module_student_rows,
    status_breakdown, student_metrics, student_module_rows,
};
use crate::charts::{self, Chart};
use crate::config::{EmptyScore, ReportConfig};
use crate::error::{ensure_len, ReportError};
use crate::index::SnapshotIndex;
use crate::model::{Module, ModuleStatus, ProgressStatus};
use crate::numeric::{format_percent, format_rating, round_one_decimal};
use crate::ranking::{paginate, sort, ModuleField, SortDirection, StudentField};

/// Display format of timestamps in report cells.
pub const DATE_FORMAT: &str = "%d/%m/%Y %H:%M";

/// One typed table cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Cell {
    Text(String),
    /// A plain count.
    Count(u64),
    /// An integer percentage, shown as `80%`.
    Percent(u32),
    /// A star rating average, shown with one decimal.
    Rating(f64),
    Date(DateTime<Utc>),
    /// No value.
    Empty,
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }

    pub fn count(n: usize) -> Self {
        Cell::Count(n as u64)
    }

    /// The text shown on screen and written into both export encodings.
    pub fn display(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Count(n) => n.to_string(),
            Cell::Percent(p) => format_percent(*p),
            Cell::Rating(r) => format_rating(*r),
            Cell::Date(at) => at.format(DATE_FORMAT).to_string(),
            Cell::Empty => String::new(),
        }
    }

    /// The raw number behind a numeric cell.
    pub fn numeric_value(&self) -> Option<f64> {
        match self {
            Cell::Count(n) => Some(*n as f64),
            Cell::Percent(p) => Some(f64::from(*p)),
            Cell::Rating(r) => Some(round_one_decimal(*r)),
            _ => None,
        }
    }
}

/// A labelled headline value of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryItem {
    pub label: String,
    pub value: Cell,
}

impl SummaryItem {
    pub fn new(label: &str, value: Cell) -> Self {
        Self {
            label: label.to_string(),
            value,
        }
    }
}

/// A named grid: one header row and any number of body rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    /// Sheet name in the workbook, section heading in the document.
    pub name: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Grid {
    pub fn new(name: &str, header: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            header: header.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    /// Every row must be exactly as wide as the header.
    pub fn validate(&self) -> Result<(), ReportError> {
        for (i, row) in self.rows.iter().enumerate() {
            ensure_len(
                &format!("{} row {}", self.name, i + 1),
                self.header.len(),
                row.len(),
            )?;
        }
        Ok(())
    }

    /// One 1-based page of body rows.
    pub fn page(&self, page: usize, page_size: usize) -> &[Vec<Cell>] {
        paginate(&self.rows, page, page_size)
    }

    /// [`Grid::page`] at the configured page size.
    pub fn page_for(&self, config: &ReportConfig, page: usize) -> &[Vec<Cell>] {
        self.page(page, config.page_size)
    }

    /// Tabular form of a chart: one row per label, or per radar axis.
    pub fn from_chart(name: &str, chart: &Chart) -> Self {
        match chart {
            Chart::Series(c) => {
                let mut grid = Grid::new(name, &["Rótulo", c.title.as_str()]);
                for (label, value) in c.labels.iter().zip(&c.data) {
                    grid.push(vec![Cell::text(label), Cell::Count(u64::from(*value))]);
                }
                grid
            }
            Chart::Pie(c) => {
                let mut grid = Grid::new(name, &[c.title.as_str(), "Quantidade", "Percentual"]);
                for ((label, count), pct) in c.labels.iter().zip(&c.counts).zip(&c.percentages) {
                    grid.push(vec![Cell::text(label), Cell::count(*count), Cell::Percent(*pct)]);
                }
                grid
            }
            Chart::Radar(c) => {
                let mut header = vec![c.axis_name.clone()];
                header.extend(c.series.iter().map(|s| s.label.clone()));
                let mut grid = Grid {
                    name: name.to_string(),
                    header,
                    rows: Vec::new(),
                };
                for (i, axis) in c.axes.iter().enumerate() {
                    let mut row = vec![Cell::text(axis)];
                    row.extend(
                        c.series
                            .iter()
                            .map(|s| s.values.get(i).map_or(Cell::Empty, |v| Cell::Percent(*v))),
                    );
                    grid.push(row);
                }
                grid
            }
        }
    }
}

/// A chart attached to a report, with the sheet it exports to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachedChart {
    pub sheet: String,
    pub chart: Chart,
}

/// What a report is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Student,
    Module,
    Dashboard,
    Feedback,
}

impl ReportKind {
    /// The `<subject>` part of exported file names.
    pub fn subject(self) -> &'static str {
        match self {
            ReportKind::Student => "aluno",
            ReportKind::Module => "modulo",
            ReportKind::Dashboard => "dashboard",
            ReportKind::Feedback => "feedback",
        }
    }
}

/// A complete report: title, summary block, detail grids, and charts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportTable {
    pub kind: ReportKind,
    pub title: String,
    /// Identifier used in the export file name, if the report has a subject.
    pub slug: Option<String>,
    /// Sheet name of the summary block.
    pub summary_name: String,
    pub summary: Vec<SummaryItem>,
    pub sections: Vec<Grid>,
    pub charts: Vec<AttachedChart>,
}

impl ReportTable {
    /// Structural checks run before any export renders the report.
    pub fn validate(&self) -> Result<(), ReportError> {
        for grid in &self.sections {
            grid.validate()?;
        }
        for attached in &self.charts {
            attached.chart.validate()?;
        }
        Ok(())
    }

    /// Summary block as a two-column grid.
    pub fn summary_grid(&self) -> Grid {
        let first = match self.kind {
            ReportKind::Dashboard | ReportKind::Feedback => "Métrica",
            ReportKind::Student | ReportKind::Module => "Campo",
        };
        let mut grid = Grid::new(&self.summary_name, &[first, "Valor"]);
        for item in &self.summary {
            grid.push(vec![Cell::text(&item.label), item.value.clone()]);
        }
        grid
    }

    /// Detail grids followed by one grid per attached chart.
    pub fn all_grids(&self) -> Vec<Grid> {
        let mut grids = self.sections.clone();
        grids.extend(
            self.charts
                .iter()
                .map(|a| Grid::from_chart(&a.sheet, &a.chart)),
        );
        grids
    }

    pub fn section(&self, name: &str) -> Option<&Grid> {
        self.sections.iter().find(|g| g.name == name)
    }
}

fn score_cell(score: Option<u32>, config: &ReportConfig) -> Cell {
    match (score, config.empty_score) {
        (Some(v), _) => Cell::Percent(v),
        (None, EmptyScore::Zero) => Cell::Percent(0),
        (None, EmptyScore::Placeholder) => Cell::text(&config.placeholder),
    }
}

fn status_cell(status: ProgressStatus) -> Cell {
    Cell::text(status.label())
}

fn date_cell(at: Option<DateTime<Utc>>) -> Cell {
    at.map_or(Cell::Empty, Cell::Date)
}

// ---------------------------------------------------------------------------
// Report builders
// ---------------------------------------------------------------------------

/// Per-student performance report.
pub fn student_report(
    index: &SnapshotIndex<'_>,
    student_id: &str,
    config: &ReportConfig,
) -> Result<ReportTable, ReportError> {
    let profile = index
        .profile(student_id)
        .ok_or_else(|| ReportError::UnknownStudent(student_id.to_string()))?;
    let rows = student_module_rows(index, student_id)?;
    let metrics = student_metrics(index, [profile])
        .pop()
        .ok_or_else(|| ReportError::UnknownStudent(student_id.to_string()))?;

    let mut results = Grid::new(
        "Resultados",
        &["Módulo", "Nome", "Status", "Pontuação (%)", "Concluído em"],
    );
    for row in &rows {
        results.push(vec![
            Cell::text(&row.module.id),
            Cell::text(&row.module.title),
            status_cell(row.status),
            score_cell(row.score, config),
            date_cell(row.completed_at),
        ]);
    }

    let average = metrics.has_scores.then_some(metrics.average_score);
    Ok(ReportTable {
        kind: ReportKind::Student,
        title: "Relatório de Desempenho do Aluno".into(),
        slug: Some(profile.id.clone()),
        summary_name: "Aluno".into(),
        summary: vec![
            SummaryItem::new("Aluno", Cell::text(&profile.name)),
            SummaryItem::new("ID do Aluno", Cell::text(&profile.id)),
            SummaryItem::new("Total de Módulos", Cell::count(metrics.total_modules)),
            SummaryItem::new("Concluídos", Cell::count(metrics.completed_count)),
            SummaryItem::new("Taxa de Conclusão", Cell::Percent(metrics.completion_rate)),
            SummaryItem::new("Média de Pontuação", score_cell(average, config)),
        ],
        sections: vec![results],
        charts: Vec::new(),
    })
}

/// Per-module performance report.
pub fn module_report(
    index: &SnapshotIndex<'_>,
    module_id: &str,
    config: &ReportConfig,
) -> Result<ReportTable, ReportError> {
    let module = index
        .module(module_id)
        .ok_or_else(|| ReportError::UnknownModule(module_id.to_string()))?;
    let rows = module_student_rows(index, module_id)?;
    let metrics = module_metrics(index, [module])
        .pop()
        .ok_or_else(|| ReportError::UnknownModule(module_id.to_string()))?;

    let mut students = Grid::new(
        "Alunos",
        &["Aluno ID", "Aluno", "Status", "Pontuação (%)", "Concluído em"],
    );
    for row in &rows {
        students.push(vec![
            Cell::text(&row.student.id),
            Cell::text(&row.student.name),
            status_cell(row.status),
            score_cell(row.score, config),
            date_cell(row.completed_at),
        ]);
    }

    let average = metrics.has_scores.then_some(metrics.average_score);
    Ok(ReportTable {
        kind: ReportKind::Module,
        title: "Relatório de Desempenho por Módulo".into(),
        slug: Some(module.id.clone()),
        summary_name: "Módulo".into(),
        summary: vec![
            SummaryItem::new("Módulo", Cell::text(&module.title)),
            SummaryItem::new("ID do Módulo", Cell::text(&module.id)),
            SummaryItem::new("Total de Alunos", Cell::count(metrics.total_users)),
            SummaryItem::new("Concluídos", Cell::count(metrics.completed_count)),
            SummaryItem::new("Taxa de Conclusão", Cell::Percent(metrics.completion_rate)),
            SummaryItem::new("Média de Pontuação", score_cell(average, config)),
        ],
        sections: vec![students],
        charts: Vec::new(),
    })
}

/// Optional comparison picked on the dashboard. With a collaborator and a
/// class the report gains a "ColabVsTurma" radar, with a collaborator and
/// `compare_with` a "ColabVsColab" radar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardSelection {
    pub collaborator: Option<String>,
    pub class: Option<String>,
    pub compare_with: Option<String>,
}

impl DashboardSelection {
    pub fn collaborator_vs_class(collaborator: &str, class: &str) -> Self {
        Self {
            collaborator: Some(collaborator.to_string()),
            class: Some(class.to_string()),
            compare_with: None,
        }
    }
}

/// Manager dashboard: headline numbers, rankings, and the dashboard charts.
///
/// Everything is computed over the progress of active collaborators on
/// published modules, so the charts and the headline rate agree.
pub fn dashboard_report(
    index: &SnapshotIndex<'_>,
    config: &ReportConfig,
    selection: &DashboardSelection,
) -> Result<ReportTable, ReportError> {
    let counted = dashboard_snapshot(index.snapshot);
    let index = SnapshotIndex::build(&counted);
    let summary = dashboard_summary(&index);
    let snapshot = index.snapshot;
    let published: Vec<&Module> = snapshot
        .modules
        .iter()
        .filter(|m| m.status == ModuleStatus::Published)
        .collect();

    let mut students = student_metrics(&index, active_collaborators(snapshot.profiles.iter()));
    sort(&mut students, StudentField::CompletionRate, SortDirection::Desc);
    let mut collaborators = Grid::new(
        "Colaboradores",
        &[
            "Colaborador",
            "E-mail",
            "Módulos",
            "Concluídos",
            "Em Andamento",
            "Pontuação Média (%)",
            "Taxa de Conclusão (%)",
        ],
    );
    for s in &students {
        collaborators.push(vec![
            Cell::text(&s.student.name),
            Cell::text(&s.student.email),
            Cell::count(s.total_modules),
            Cell::count(s.completed_count),
            Cell::count(s.in_progress_count),
            score_cell(s.has_scores.then_some(s.average_score), config),
            Cell::Percent(s.completion_rate),
        ]);
    }

    let mut module_rows = module_metrics(&index, published.iter().copied());
    sort(&mut module_rows, ModuleField::CompletionRate, SortDirection::Desc);
    let mut modules = Grid::new(
        "Módulos",
        &[
            "Módulo",
            "Alunos",
            "Concluídos",
            "Em Andamento",
            "Pontuação Média (%)",
            "Taxa de Conclusão (%)",
        ],
    );
    for m in &module_rows {
        modules.push(vec![
            Cell::text(&m.module.title),
            Cell::count(m.total_users),
            Cell::count(m.completed_count),
            Cell::count(m.in_progress_count),
            score_cell(m.has_scores.then_some(m.average_score), config),
            Cell::Percent(m.completion_rate),
        ]);
    }

    let mut charts = vec![
        AttachedChart {
            sheet: "Conclusões".into(),
            chart: charts::monthly_completions_bar(&completions_by_month(&snapshot.progress))?
                .into(),
        },
        AttachedChart {
            sheet: "Status".into(),
            chart: charts::status_pie(status_breakdown(&snapshot.progress))?.into(),
        },
        AttachedChart {
            sheet: "Semanal".into(),
            chart: charts::weekly_completions_line(&completions_by_week(&snapshot.progress))?
                .into(),
        },
        AttachedChart {
            sheet: "MediaModulos".into(),
            chart: charts::module_average_bar(&module_rows)?.into(),
        },
        AttachedChart {
            sheet: "RadarTurmas".into(),
            chart: charts::class_average_radar(&index, &published).into(),
        },
    ];
    if let Some(collaborator) = selection.collaborator.as_deref() {
        if let Some(class) = selection.class.as_deref() {
            let chart =
                charts::collaborator_vs_class_radar(&index, &published, collaborator, class)?;
            charts.push(AttachedChart {
                sheet: "ColabVsTurma".into(),
                chart: chart.into(),
            });
        }
        if let Some(other) = selection.compare_with.as_deref() {
            let chart =
                charts::collaborator_comparison_radar(&index, &published, collaborator, other)?;
            charts.push(AttachedChart {
                sheet: "ColabVsColab".into(),
                chart: chart.into(),
            });
        }
    }

    Ok(ReportTable {
        kind: ReportKind::Dashboard,
        title: "Relatório do Dashboard Administrativo".into(),
        slug: None,
        summary_name: "VisãoGeral".into(),
        summary: vec![
            SummaryItem::new("Colaboradores Ativos", Cell::count(summary.active_collaborators)),
            SummaryItem::new("Módulos Criados", Cell::count(summary.published_modules)),
            SummaryItem::new(
                "Taxa de Conclusão Média",
                Cell::Percent(summary.average_completion_rate),
            ),
            SummaryItem::new("Turmas Ativas", Cell::count(summary.class_count)),
        ],
        sections: vec![collaborators, modules],
        charts,
    })
}

/// Feedback overview: overall stats plus one line per module.
pub fn feedback_report(index: &SnapshotIndex<'_>) -> Result<ReportTable, ReportError> {
    let overall = compute_feedback_stats(&index.snapshot.feedback)?;
    let per_module = feedback_stats_by_module(index)?;

    let mut by_module = Grid::new(
        "PorMódulo",
        &["Módulo", "Avaliações", "Média", "Nota 1", "Nota 2", "Nota 3", "Nota 4", "Nota 5"],
    );
    for mf in &per_module {
        let mut row = vec![
            Cell::text(&mf.module.title),
            Cell::count(mf.stats.total_count),
            Cell::Rating(mf.stats.average_rating),
        ];
        row.extend(mf.stats.distribution.iter().map(|&c| Cell::count(c)));
        by_module.push(row);
    }

    let mut comments = Grid::new("Comentários", &["Módulo", "Colaborador", "Nota", "Comentário"]);
    for f in &index.snapshot.feedback {
        let Some(comment) = f.comment.as_deref().filter(|c| !c.trim().is_empty()) else {
            continue;
        };
        comments.push(vec![
            Cell::text(index.module(&f.module_id).map_or(&f.module_id, |m| &m.title)),
            Cell::text(index.profile(&f.user_id).map_or(&f.user_id, |p| &p.name)),
            Cell::Count(u64::from(f.rating)),
            Cell::text(comment),
        ]);
    }

    Ok(ReportTable {
        kind: ReportKind::Feedback,
        title: "Relatório de Avaliações".into(),
        slug: None,
        summary_name: "Resumo".into(),
        summary: vec![
            SummaryItem::new("Total de Avaliações", Cell::count(overall.total_count)),
            SummaryItem::new("Média Geral", Cell::Rating(overall.average_rating)),
        ],
        sections: vec![by_module, comments],
        charts: vec![AttachedChart {
            sheet: "Distribuição".into(),
            chart: charts::feedback_distribution_bar(&overall)?.into(),
        }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FeedbackRecord, Profile, ProgressRecord, Role, Snapshot};
    use chrono::TimeZone;

    fn snapshot() -> Snapshot {
        let profile = |id: &str, name: &str| Profile {
            id: id.into(),
            name: name.into(),
            email: format!("{id}@acme.com"),
            role: Role::Collaborator,
            active: true,
        };
        let progress = |user: &str, status, score| ProgressRecord {
            user_id: user.into(),
            module_id: "m1".into(),
            status,
            score_percent: score,
            completed_at: Some(Utc.with_ymd_and_hms(2025, 3, 7, 14, 5, 0).unwrap()),
        };
        Snapshot {
            profiles: vec![profile("u1", "Ana"), profile("u2", "Bruno")],
            modules: vec![Module {
                id: "m1".into(),
                title: "Ética".into(),
                status: ModuleStatus::Published,
            }],
            progress: vec![
                progress("u1", ProgressStatus::Completed, Some(80.0)),
                progress("u2", ProgressStatus::InProgress, None),
            ],
            feedback: vec![FeedbackRecord {
                user_id: "u1".into(),
                module_id: "m1".into(),
                rating: 4,
                comment: Some("Muito útil".into()),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn cell_display_and_value_agree() {
        assert_eq!(Cell::Percent(80).display(), "80%");
        assert_eq!(Cell::Percent(80).numeric_value(), Some(80.0));
        assert_eq!(Cell::Rating(4.4).display(), "4.4");
        assert_eq!(Cell::count(3).display(), "3");
        assert_eq!(Cell::Empty.display(), "");
        assert_eq!(Cell::text("x").numeric_value(), None);
    }

    #[test]
    fn student_report_layout() {
        let snapshot = snapshot();
        let index = SnapshotIndex::build(&snapshot);
        let report = student_report(&index, "u1", &ReportConfig::default()).unwrap();

        assert_eq!(report.slug.as_deref(), Some("u1"));
        assert_eq!(report.summary[0].value, Cell::text("Ana"));
        let grid = report.section("Resultados").unwrap();
        assert_eq!(grid.rows.len(), 1);
        assert_eq!(grid.rows[0][3], Cell::Percent(80));
        assert_eq!(grid.rows[0][4].display(), "07/03/2025 14:05");
        assert!(report.validate().is_ok());
    }

    #[test]
    fn placeholder_applies_only_to_display() {
        let snapshot = snapshot();
        let index = SnapshotIndex::build(&snapshot);
        let config = ReportConfig {
            empty_score: EmptyScore::Placeholder,
            ..Default::default()
        };

        let report = module_report(&index, "m1", &config).unwrap();
        let grid = report.section("Alunos").unwrap();
        assert_eq!(grid.rows[1][3], Cell::text("-"));

        let zero = module_report(&index, "m1", &ReportConfig::default()).unwrap();
        assert_eq!(zero.section("Alunos").unwrap().rows[1][3], Cell::Percent(0));
    }

    #[test]
    fn unknown_subjects_are_errors() {
        let snapshot = snapshot();
        let index = SnapshotIndex::build(&snapshot);
        let config = ReportConfig::default();
        assert!(matches!(
            student_report(&index, "ghost", &config),
            Err(ReportError::UnknownStudent(_))
        ));
        assert!(matches!(
            module_report(&index, "ghost", &config),
            Err(ReportError::UnknownModule(_))
        ));
    }

    #[test]
    fn dashboard_has_summary_and_chart_sheets() {
        let snapshot = snapshot();
        let index = SnapshotIndex::build(&snapshot);
        let report =
            dashboard_report(&index, &ReportConfig::default(), &DashboardSelection::default()).unwrap();

        assert_eq!(report.slug, None);
        assert_eq!(report.summary[0].value, Cell::count(2));
        assert_eq!(report.summary[2].value, Cell::Percent(50));
        let names: Vec<String> = report.all_grids().into_iter().map(|g| g.name).collect();
        assert_eq!(
            names,
            vec![
                "Colaboradores",
                "Módulos",
                "Conclusões",
                "Status",
                "Semanal",
                "MediaModulos",
                "RadarTurmas"
            ]
        );
        assert!(report.validate().is_ok());
    }

    #[test]
    fn dashboard_charts_ignore_rows_outside_the_headline() {
        let mut snapshot = snapshot();
        snapshot.profiles[1].active = false;
        snapshot.profiles.push(Profile {
            id: "boss".into(),
            name: "Gestora".into(),
            email: "boss@acme.com".into(),
            role: Role::Manager,
            active: true,
        });
        snapshot.modules.push(Module {
            id: "m2".into(),
            title: "Rascunho".into(),
            status: ModuleStatus::Draft,
        });
        snapshot.progress = vec![
            ProgressRecord {
                user_id: "u1".into(),
                module_id: "m1".into(),
                status: ProgressStatus::NotStarted,
                score_percent: None,
                completed_at: None,
            },
            ProgressRecord {
                user_id: "u2".into(),
                module_id: "m1".into(),
                status: ProgressStatus::Completed,
                score_percent: Some(90.0),
                completed_at: Some(Utc.with_ymd_and_hms(2025, 3, 7, 14, 5, 0).unwrap()),
            },
            ProgressRecord {
                user_id: "boss".into(),
                module_id: "m2".into(),
                status: ProgressStatus::Completed,
                score_percent: Some(100.0),
                completed_at: Some(Utc.with_ymd_and_hms(2025, 3, 8, 9, 0, 0).unwrap()),
            },
        ];
        let index = SnapshotIndex::build(&snapshot);
        let report =
            dashboard_report(&index, &ReportConfig::default(), &DashboardSelection::default()).unwrap();

        assert_eq!(report.summary[2].value, Cell::Percent(0));
        let grids = report.all_grids();
        let status = grids.iter().find(|g| g.name == "Status").unwrap();
        assert_eq!(status.rows[0], vec![Cell::text("Concluído"), Cell::count(0), Cell::Percent(0)]);
        assert_eq!(status.rows[2], vec![Cell::text("Pendente"), Cell::count(1), Cell::Percent(100)]);
        let monthly = grids.iter().find(|g| g.name == "Conclusões").unwrap();
        assert!(monthly.rows.is_empty());
    }

    #[test]
    fn dashboard_rankings_are_sorted_by_completion_rate() {
        let mut snapshot = snapshot();
        snapshot.progress[0].status = ProgressStatus::InProgress;
        snapshot.progress[1].status = ProgressStatus::Completed;
        let index = SnapshotIndex::build(&snapshot);
        let report =
            dashboard_report(&index, &ReportConfig::default(), &DashboardSelection::default()).unwrap();

        let collaborators = report.section("Colaboradores").unwrap();
        assert_eq!(collaborators.rows[0][0], Cell::text("Bruno"));
        assert_eq!(collaborators.rows[0][6], Cell::Percent(100));
        assert_eq!(collaborators.rows[1][0], Cell::text("Ana"));
    }

    #[test]
    fn dashboard_selection_attaches_comparison_radars() {
        let mut snapshot = snapshot();
        snapshot.classes.push(crate::model::Class {
            id: "c1".into(),
            name: "Turma A".into(),
            member_ids: vec!["u1".into(), "u2".into()],
        });
        let index = SnapshotIndex::build(&snapshot);
        let selection = DashboardSelection {
            compare_with: Some("u2".into()),
            ..DashboardSelection::collaborator_vs_class("u1", "c1")
        };
        let report = dashboard_report(&index, &ReportConfig::default(), &selection).unwrap();

        let sheets: Vec<&str> = report.charts.iter().map(|c| c.sheet.as_str()).collect();
        assert!(sheets.ends_with(&["RadarTurmas", "ColabVsTurma", "ColabVsColab"]));

        let grids = report.all_grids();
        let by_class = grids.iter().find(|g| g.name == "RadarTurmas").unwrap();
        assert_eq!(by_class.header, vec!["Turma", "Média"]);
        assert_eq!(by_class.rows, vec![vec![Cell::text("Turma A"), Cell::Percent(80)]]);
        let versus = grids.iter().find(|g| g.name == "ColabVsTurma").unwrap();
        assert_eq!(versus.header, vec!["Módulo", "Ana", "Turma A"]);
        assert_eq!(versus.rows[0][1], Cell::Percent(80));

        let unknown = DashboardSelection::collaborator_vs_class("u1", "nope");
        assert!(matches!(
            dashboard_report(&index, &ReportConfig::default(), &unknown),
            Err(ReportError::UnknownClass(_))
        ));
    }

    #[test]
    fn summary_header_depends_on_report_kind() {
        let snapshot = snapshot();
        let index = SnapshotIndex::build(&snapshot);
        let config = ReportConfig::default();

        let dashboard = dashboard_report(&index, &config, &DashboardSelection::default()).unwrap();
        assert_eq!(dashboard.summary_grid().header, vec!["Métrica", "Valor"]);
        let feedback = feedback_report(&index).unwrap();
        assert_eq!(feedback.summary_grid().header, vec!["Métrica", "Valor"]);
        let student = student_report(&index, "u1", &config).unwrap();
        assert_eq!(student.summary_grid().header, vec!["Campo", "Valor"]);
    }

    #[test]
    fn feedback_report_lists_comments() {
        let snapshot = snapshot();
        let index = SnapshotIndex::build(&snapshot);
        let report = feedback_report(&index).unwrap();
        assert_eq!(report.summary[1].value.display(), "4.0");
        let comments = report.section("Comentários").unwrap();
        assert_eq!(comments.rows[0][1], Cell::text("Ana"));
    }

    #[test]
    fn ragged_rows_fail_validation() {
        let mut grid = Grid::new("g", &["a", "b"]);
        grid.push(vec![Cell::Empty]);
        assert!(grid.validate().is_err());
    }

    #[test]
    fn grid_pages() {
        let mut grid = Grid::new("g", &["n"]);
        for n in 0..5 {
            grid.push(vec![Cell::count(n)]);
        }
        assert_eq!(grid.page(2, 2), &[vec![Cell::count(2)], vec![Cell::count(3)]][..]);

        let config = ReportConfig {
            page_size: 3,
            ..Default::default()
        };
        assert_eq!(grid.page_for(&config, 2), &[vec![Cell::count(3)], vec![Cell::count(4)]][..]);
    }

    #[test]
    fn pie_grid_carries_counts_and_percentages() {
        let chart = charts::status_pie(crate::metrics::StatusBreakdown {
            completed: 2,
            in_progress: 1,
            not_started: 1,
        })
        .unwrap();
        let grid = Grid::from_chart("Status", &chart.into());
        assert_eq!(grid.header, vec!["Status", "Quantidade", "Percentual"]);
        assert_eq!(grid.rows[0], vec![Cell::text("Concluído"), Cell::count(2), Cell::Percent(50)]);
    }
}
