//! trainboard-export: Report file export.
//!
//! Renders a [`ReportTable`] as an XLSX workbook or an A4 PDF document and
//! writes it under a `relatorio-<subject>-<slug>-<timestamp>.<ext>` name.
//! Both encodings read every value through [`Cell::display`], so an
//! exported number always matches the one on screen.
//!
//! [`Cell::display`]: trainboard_core::table::Cell::display

pub mod pdf;
pub mod xlsx;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use trainboard_core::config::ReportConfig;
use trainboard_core::filename::export_filename;
use trainboard_core::table::ReportTable;

pub use pdf::render_pdf;
pub use xlsx::render_xlsx;

pub const MIME_XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const MIME_PDF: &str = "application/pdf";

/// Supported export encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Xlsx,
    Pdf,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            ExportFormat::Xlsx => MIME_XLSX,
            ExportFormat::Pdf => MIME_PDF,
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xlsx" | "excel" => Ok(ExportFormat::Xlsx),
            "pdf" => Ok(ExportFormat::Pdf),
            other => anyhow::bail!("unknown export format '{other}' (expected xlsx or pdf)"),
        }
    }
}

/// Render `report` into the bytes of `format`.
pub fn render(report: &ReportTable, format: ExportFormat, generated_at: DateTime<Utc>) -> Result<Vec<u8>> {
    match format {
        ExportFormat::Xlsx => render_xlsx(report, generated_at),
        ExportFormat::Pdf => render_pdf(report, generated_at),
    }
}

/// File name `report` is exported under.
pub fn file_name(report: &ReportTable, format: ExportFormat, generated_at: DateTime<Utc>) -> String {
    export_filename(
        report.kind.subject(),
        report.slug.as_deref(),
        generated_at,
        format.extension(),
    )
}

/// Render `report` and write it into `dir`, returning the written path.
///
/// Nothing is written if rendering fails.
pub fn write_report(
    dir: &Path,
    report: &ReportTable,
    format: ExportFormat,
    generated_at: DateTime<Utc>,
) -> Result<PathBuf> {
    let bytes = render(report, format, generated_at)
        .with_context(|| format!("failed to render {format} for '{}'", report.title))?;

    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output dir {}", dir.display()))?;
    let path = dir.join(file_name(report, format, generated_at));
    std::fs::write(&path, &bytes)
        .with_context(|| format!("failed to write {}", path.display()))?;

    tracing::info!(path = %path.display(), bytes = bytes.len(), %format, "exported report");
    Ok(path)
}

/// [`write_report`] into the configured `output_dir`.
pub fn export_report(
    config: &ReportConfig,
    report: &ReportTable,
    format: ExportFormat,
    generated_at: DateTime<Utc>,
) -> Result<PathBuf> {
    write_report(&config.output_dir, report, format, generated_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use trainboard_core::table::{Cell, Grid, ReportKind, SummaryItem};

    fn report(slug: Option<&str>) -> ReportTable {
        let mut grid = Grid::new("Resultados", &["Módulo", "Pontuação (%)"]);
        grid.push(vec![Cell::text("Ética"), Cell::Percent(80)]);
        ReportTable {
            kind: ReportKind::Student,
            title: "Relatório de Desempenho do Aluno".into(),
            slug: slug.map(String::from),
            summary_name: "Aluno".into(),
            summary: vec![SummaryItem::new("Aluno", Cell::text("Ana Souza"))],
            sections: vec![grid],
            charts: Vec::new(),
        }
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 2, 14, 5, 9).unwrap()
    }

    #[test]
    fn format_parsing() {
        assert_eq!("XLSX".parse::<ExportFormat>().unwrap(), ExportFormat::Xlsx);
        assert_eq!(" pdf ".parse::<ExportFormat>().unwrap(), ExportFormat::Pdf);
        assert!("csv".parse::<ExportFormat>().is_err());
        assert_eq!(ExportFormat::Pdf.mime(), "application/pdf");
    }

    #[test]
    fn file_name_follows_pattern() {
        assert_eq!(
            file_name(&report(Some("u1")), ExportFormat::Xlsx, at()),
            "relatorio-aluno-u1-2025-10-02-14-05-09.xlsx"
        );
        assert_eq!(
            file_name(&report(None), ExportFormat::Pdf, at()),
            "relatorio-aluno-2025-10-02-14-05-09.pdf"
        );
    }

    #[test]
    fn write_report_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("relatorios").join("2025");

        let path = write_report(&nested, &report(Some("u1")), ExportFormat::Pdf, at()).unwrap();
        assert!(path.starts_with(&nested));
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.4"));
    }

    #[test]
    fn export_report_uses_configured_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = ReportConfig {
            output_dir: dir.path().join("saida"),
            ..Default::default()
        };

        let path = export_report(&config, &report(Some("u1")), ExportFormat::Xlsx, at()).unwrap();
        assert_eq!(
            path,
            config.output_dir.join("relatorio-aluno-u1-2025-10-02-14-05-09.xlsx")
        );
        assert!(path.is_file());
    }

    #[test]
    fn failed_render_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut bad = report(Some("u1"));
        bad.sections[0].rows.push(vec![Cell::Empty]);

        let err = write_report(dir.path(), &bad, ExportFormat::Xlsx, at()).unwrap_err();
        assert!(format!("{err:#}").contains("failed to render xlsx"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
