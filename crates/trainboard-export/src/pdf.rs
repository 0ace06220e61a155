//! A4 PDF writer.
//!
//! Builds a PDF 1.4 document directly: standard Helvetica fonts with
//! WinAnsi encoding, one content stream per page, and a byte-exact xref
//! table. Pages are laid out first; the "Página N de M" footer is stamped
//! once the total page count is known.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use trainboard_core::table::{Cell, Grid, ReportTable, DATE_FORMAT};

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 40.0;
const FOOTER_Y: f32 = 24.0;
/// Lowest baseline body content may use before breaking the page.
const CONTENT_BOTTOM: f32 = MARGIN + 16.0;

const TITLE_SIZE: f32 = 16.0;
const HEADING_SIZE: f32 = 12.0;
const BODY_SIZE: f32 = 9.0;
const FOOTER_SIZE: f32 = 8.0;
const ROW_HEIGHT: f32 = 15.0;
const CELL_PADDING: f32 = 3.0;
const ELLIPSIS: &str = "...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }
}

/// Encode text as Windows-1252 bytes; unmappable characters become `?`.
pub fn encode_cp1252(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            0x00..=0x7F | 0xA0..=0xFF => c as u32 as u8,
            _ => match c {
                '€' => 0x80,
                '‚' => 0x82,
                '„' => 0x84,
                '…' => 0x85,
                '‘' => 0x91,
                '’' => 0x92,
                '“' => 0x93,
                '”' => 0x94,
                '•' => 0x95,
                '–' => 0x96,
                '—' => 0x97,
                '™' => 0x99,
                _ => b'?',
            },
        })
        .collect()
}

/// PDF literal string body: backslash, parentheses and line breaks escaped.
fn literal(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + 2);
    for &b in bytes {
        match b {
            b'\\' | b'(' | b')' => {
                out.push(b'\\');
                out.push(b);
            }
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            _ => out.push(b),
        }
    }
    out
}

/// Approximate Helvetica advance width of one character, in em.
fn char_width(c: char, font: Font) -> f32 {
    let base = match c {
        'i' | 'j' | 'l' | '.' | ',' | ':' | ';' | '\'' | '|' | '!' | 'í' | 'ì' => 0.25,
        'f' | 't' | 'r' | 'I' | ' ' | '(' | ')' | '[' | ']' | '/' | '-' => 0.32,
        'm' | 'w' | 'M' | 'W' | '%' | '@' => 0.85,
        c if c.is_uppercase() => 0.68,
        c if c.is_ascii_digit() => 0.56,
        _ => 0.54,
    };
    match font {
        Font::Regular => base,
        Font::Bold => base * 1.06,
    }
}

fn text_width(text: &str, font: Font, size: f32) -> f32 {
    text.chars().map(|c| char_width(c, font)).sum::<f32>() * size
}

/// Shorten `text` with a trailing ellipsis until it fits in `max_width`.
fn truncate_to_width(text: &str, font: Font, size: f32, max_width: f32) -> String {
    if text_width(text, font, size) <= max_width {
        return text.to_string();
    }
    let budget = max_width - text_width(ELLIPSIS, font, size);
    let mut out = String::new();
    let mut used = 0.0;
    for c in text.chars() {
        let w = char_width(c, font) * size;
        if used + w > budget {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push_str(ELLIPSIS);
    out
}

/// Page-by-page content stream builder.
struct Layout {
    pages: Vec<Vec<u8>>,
    current: Vec<u8>,
    /// Baseline of the next line to draw.
    y: f32,
}

impl Layout {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: Vec::new(),
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn break_page(&mut self) {
        let done = std::mem::take(&mut self.current);
        self.pages.push(done);
        self.y = PAGE_HEIGHT - MARGIN;
    }

    /// Break the page unless `height` more points fit above the footer.
    fn reserve(&mut self, height: f32) -> bool {
        if self.y - height < CONTENT_BOTTOM {
            self.break_page();
            true
        } else {
            false
        }
    }

    fn text(&mut self, font: Font, size: f32, x: f32, y: f32, text: &str) {
        self.current.extend_from_slice(
            format!("BT /{} {size:.1} Tf {x:.2} {y:.2} Td (", font.resource()).as_bytes(),
        );
        self.current.extend_from_slice(&literal(&encode_cp1252(text)));
        self.current.extend_from_slice(b") Tj ET\n");
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, gray: f32) {
        self.current.extend_from_slice(
            format!("{gray:.2} g {x:.2} {y:.2} {w:.2} {h:.2} re f 0 g\n").as_bytes(),
        );
    }

    fn rule(&mut self, x1: f32, x2: f32, y: f32) {
        self.current.extend_from_slice(
            format!("0.5 w 0.7 G {x1:.2} {y:.2} m {x2:.2} {y:.2} l S 0 G\n").as_bytes(),
        );
    }

    fn finish(mut self) -> Vec<Vec<u8>> {
        if !self.current.is_empty() || self.pages.is_empty() {
            self.break_page();
        }
        self.pages
    }
}

fn usable_width() -> f32 {
    PAGE_WIDTH - 2.0 * MARGIN
}

/// Column widths proportional to the widest text in each column.
fn column_widths(grid: &Grid) -> Vec<f32> {
    let weights: Vec<f32> = grid
        .header
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let widest = grid
                .rows
                .iter()
                .filter_map(|r| r.get(i))
                .map(|c| c.display().chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(1);
            widest.clamp(4, 40) as f32
        })
        .collect();
    let total: f32 = weights.iter().sum();
    if total <= 0.0 {
        return Vec::new();
    }
    weights.iter().map(|w| usable_width() * w / total).collect()
}

fn is_numeric(cell: &Cell) -> bool {
    cell.numeric_value().is_some()
}

fn draw_header_row(layout: &mut Layout, grid: &Grid, widths: &[f32]) {
    let top = layout.y;
    layout.fill_rect(MARGIN, top - ROW_HEIGHT, usable_width(), ROW_HEIGHT, 0.88);
    let baseline = top - ROW_HEIGHT + 4.5;
    let mut x = MARGIN;
    for (header, width) in grid.header.iter().zip(widths) {
        let shown = truncate_to_width(header, Font::Bold, BODY_SIZE, width - 2.0 * CELL_PADDING);
        layout.text(Font::Bold, BODY_SIZE, x + CELL_PADDING, baseline, &shown);
        x += width;
    }
    layout.y = top - ROW_HEIGHT;
}

fn draw_grid(layout: &mut Layout, grid: &Grid) {
    layout.reserve(HEADING_SIZE + 8.0 + 2.0 * ROW_HEIGHT);
    layout.y -= HEADING_SIZE;
    layout.text(Font::Bold, HEADING_SIZE, MARGIN, layout.y, &grid.name);
    layout.y -= 8.0;

    if grid.header.is_empty() {
        return;
    }
    let widths = column_widths(grid);
    draw_header_row(layout, grid, &widths);

    if grid.rows.is_empty() {
        layout.y -= ROW_HEIGHT;
        layout.text(Font::Regular, BODY_SIZE, MARGIN + CELL_PADDING, layout.y + 4.5, "Sem registros");
    }

    for row in &grid.rows {
        if layout.reserve(ROW_HEIGHT) {
            draw_header_row(layout, grid, &widths);
        }
        let baseline = layout.y - ROW_HEIGHT + 4.5;
        let mut x = MARGIN;
        for (cell, width) in row.iter().zip(&widths) {
            let avail = width - 2.0 * CELL_PADDING;
            let shown = truncate_to_width(&cell.display(), Font::Regular, BODY_SIZE, avail);
            let text_x = if is_numeric(cell) {
                x + width - CELL_PADDING - text_width(&shown, Font::Regular, BODY_SIZE)
            } else {
                x + CELL_PADDING
            };
            layout.text(Font::Regular, BODY_SIZE, text_x, baseline, &shown);
            x += width;
        }
        layout.y -= ROW_HEIGHT;
        layout.rule(MARGIN, MARGIN + usable_width(), layout.y);
    }
    layout.y -= 14.0;
}

fn draw_summary(layout: &mut Layout, report: &ReportTable) {
    if report.summary.is_empty() {
        return;
    }
    let value_x = MARGIN + 200.0;
    for item in &report.summary {
        layout.reserve(ROW_HEIGHT);
        layout.y -= ROW_HEIGHT;
        let label = truncate_to_width(&item.label, Font::Bold, BODY_SIZE + 1.0, 190.0);
        layout.text(Font::Bold, BODY_SIZE + 1.0, MARGIN, layout.y, &label);
        let value = truncate_to_width(
            &item.value.display(),
            Font::Regular,
            BODY_SIZE + 1.0,
            MARGIN + usable_width() - value_x,
        );
        layout.text(Font::Regular, BODY_SIZE + 1.0, value_x, layout.y, &value);
    }
    layout.y -= 18.0;
}

fn stamp_footers(pages: &mut [Vec<u8>], generated_at: DateTime<Utc>) {
    let total = pages.len();
    let stamp = format!("Gerado em {}", generated_at.format(DATE_FORMAT));
    for (i, page) in pages.iter_mut().enumerate() {
        let mut footer = Layout {
            pages: Vec::new(),
            current: std::mem::take(page),
            y: FOOTER_Y,
        };
        footer.text(
            Font::Regular,
            FOOTER_SIZE,
            MARGIN,
            FOOTER_Y,
            &format!("Página {} de {}", i + 1, total),
        );
        let stamp_x = PAGE_WIDTH - MARGIN - text_width(&stamp, Font::Regular, FOOTER_SIZE);
        footer.text(Font::Regular, FOOTER_SIZE, stamp_x, FOOTER_Y, &stamp);
        *page = footer.current;
    }
}

/// Lay out `report` into per-page content streams.
fn layout_pages(report: &ReportTable, generated_at: DateTime<Utc>) -> Vec<Vec<u8>> {
    let mut layout = Layout::new();

    layout.y -= TITLE_SIZE;
    let title = truncate_to_width(&report.title, Font::Bold, TITLE_SIZE, usable_width());
    layout.text(Font::Bold, TITLE_SIZE, MARGIN, layout.y, &title);
    layout.y -= 14.0;
    layout.text(
        Font::Regular,
        BODY_SIZE,
        MARGIN,
        layout.y,
        &format!("Gerado em {}", generated_at.format(DATE_FORMAT)),
    );
    layout.y -= 10.0;

    draw_summary(&mut layout, report);
    for grid in report.all_grids() {
        draw_grid(&mut layout, &grid);
    }

    let mut pages = layout.finish();
    stamp_footers(&mut pages, generated_at);
    pages
}

/// Serializes numbered objects and tracks their byte offsets.
struct PdfWriter {
    buf: Vec<u8>,
    offsets: Vec<usize>,
}

impl PdfWriter {
    fn new() -> Self {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");
        Self {
            buf,
            offsets: Vec::new(),
        }
    }

    /// Write object `id`; ids must be written in ascending order from 1.
    fn object(&mut self, id: usize, body: &[u8]) {
        debug_assert_eq!(id, self.offsets.len() + 1);
        self.offsets.push(self.buf.len());
        self.buf.extend_from_slice(format!("{id} 0 obj\n").as_bytes());
        self.buf.extend_from_slice(body);
        self.buf.extend_from_slice(b"\nendobj\n");
    }

    fn stream(&mut self, id: usize, content: &[u8]) {
        let mut body = format!("<< /Length {} >>\nstream\n", content.len()).into_bytes();
        body.extend_from_slice(content);
        body.extend_from_slice(b"\nendstream");
        self.object(id, &body);
    }

    fn finish(mut self, root: usize, info: usize, file_id: &str) -> Vec<u8> {
        let xref_at = self.buf.len();
        let size = self.offsets.len() + 1;
        self.buf
            .extend_from_slice(format!("xref\n0 {size}\n0000000000 65535 f \n").as_bytes());
        for offset in &self.offsets {
            self.buf
                .extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
        }
        self.buf.extend_from_slice(
            format!(
                "trailer\n<< /Size {size} /Root {root} 0 R /Info {info} 0 R /ID [<{file_id}> <{file_id}>] >>\nstartxref\n{xref_at}\n%%EOF\n"
            )
            .as_bytes(),
        );
        self.buf
    }
}

fn font_dict(base: &str) -> Vec<u8> {
    format!("<< /Type /Font /Subtype /Type1 /BaseFont /{base} /Encoding /WinAnsiEncoding >>")
        .into_bytes()
}

/// Render `report` as an A4 PDF document.
pub fn render_pdf(report: &ReportTable, generated_at: DateTime<Utc>) -> Result<Vec<u8>> {
    report
        .validate()
        .context("report failed validation before PDF export")?;

    let pages = layout_pages(report, generated_at);

    // 1 catalog, 2 page tree, 3-4 fonts, 5 info, then a page and its content per page.
    const FIRST_PAGE: usize = 6;
    let page_ids: Vec<usize> = (0..pages.len()).map(|i| FIRST_PAGE + 2 * i).collect();

    let mut pdf = PdfWriter::new();
    pdf.object(1, b"<< /Type /Catalog /Pages 2 0 R >>");

    let kids: Vec<String> = page_ids.iter().map(|id| format!("{id} 0 R")).collect();
    pdf.object(
        2,
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            pages.len()
        )
        .as_bytes(),
    );
    pdf.object(3, &font_dict("Helvetica"));
    pdf.object(4, &font_dict("Helvetica-Bold"));

    let mut info = b"<< /Title (".to_vec();
    info.extend_from_slice(&literal(&encode_cp1252(&report.title)));
    info.extend_from_slice(
        format!(
            ") /Producer (trainboard) /CreationDate (D:{}Z) >>",
            generated_at.format("%Y%m%d%H%M%S")
        )
        .as_bytes(),
    );
    pdf.object(5, &info);

    for (content, page_id) in pages.iter().zip(&page_ids) {
        pdf.object(
            *page_id,
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH:.0} {PAGE_HEIGHT:.0}] \
/Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {} 0 R >>",
                page_id + 1
            )
            .as_bytes(),
        );
        pdf.stream(page_id + 1, content);
    }

    let file_id = uuid::Uuid::new_v4().simple().to_string();
    let bytes = pdf.finish(1, 5, &file_id);
    tracing::debug!(pages = pages.len(), bytes = bytes.len(), "rendered PDF");
    Ok(bytes)
}
