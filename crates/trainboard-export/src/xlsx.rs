//! XLSX workbook writer.
//!
//! Produces a minimal SpreadsheetML package: one sheet for the summary block,
//! then one per detail grid and attached chart. Numbers are written as
//! numeric cells whose number format reproduces the on-screen text.

use std::collections::HashSet;
use std::io::{Cursor, Write};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use trainboard_core::numeric::format_rating;
use trainboard_core::table::{Cell, Grid, ReportTable};

/// Style indices into `cellXfs` of [`STYLES_XML`].
const STYLE_PERCENT: u32 = 1;
const STYLE_RATING: u32 = 2;
const STYLE_HEADER: u32 = 3;

/// Excel caps sheet names at 31 characters.
const MAX_SHEET_NAME: usize = 31;

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<numFmts count="2"><numFmt numFmtId="164" formatCode="0&quot;%&quot;"/><numFmt numFmtId="165" formatCode="0.0"/></numFmts>
<fonts count="2"><font><sz val="11"/><name val="Calibri"/></font><font><b/><sz val="11"/><name val="Calibri"/></font></fonts>
<fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills>
<borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>
<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>
<cellXfs count="4"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="164" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/><xf numFmtId="165" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/><xf numFmtId="0" fontId="1" fillId="0" borderId="0" xfId="0" applyFont="1"/></cellXfs>
<cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>
</styleSheet>
"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
</Relationships>
"#;

/// Escape a string for safe XML text or attribute insertion.
///
/// Control characters XML 1.0 cannot carry are dropped.
fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(c),
            c if (c as u32) < 0x20 => {}
            c => out.push(c),
        }
    }
    out
}

/// Spreadsheet column letters for a zero-based index: 0 → A, 26 → AA.
pub fn column_name(mut index: usize) -> String {
    let mut name = Vec::new();
    loop {
        name.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    name.reverse();
    String::from_utf8_lossy(&name).into_owned()
}

/// A sheet name Excel accepts, unique within `used`.
fn sheet_name(raw: &str, used: &mut HashSet<String>) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .take(MAX_SHEET_NAME)
        .collect();
    let base = if cleaned.trim().is_empty() {
        "Planilha".to_string()
    } else {
        cleaned
    };

    let mut candidate = base.clone();
    let mut n = 2;
    while used.contains(&candidate.to_lowercase()) {
        let suffix = format!(" ({n})");
        let keep = MAX_SHEET_NAME.saturating_sub(suffix.chars().count());
        candidate = format!("{}{}", base.chars().take(keep).collect::<String>(), suffix);
        n += 1;
    }
    used.insert(candidate.to_lowercase());
    candidate
}

fn inline_string(reference: &str, text: &str, style: Option<u32>) -> String {
    let style = style.map(|s| format!(" s=\"{s}\"")).unwrap_or_default();
    format!(
        "<c r=\"{reference}\"{style} t=\"inlineStr\"><is><t xml:space=\"preserve\">{}</t></is></c>",
        xml_escape(text)
    )
}

/// One `<c>` element, or nothing for an empty cell.
fn cell_xml(reference: &str, cell: &Cell) -> String {
    match cell {
        Cell::Empty => String::new(),
        Cell::Count(n) => format!("<c r=\"{reference}\"><v>{n}</v></c>"),
        Cell::Percent(p) => format!("<c r=\"{reference}\" s=\"{STYLE_PERCENT}\"><v>{p}</v></c>"),
        Cell::Rating(r) => format!(
            "<c r=\"{reference}\" s=\"{STYLE_RATING}\"><v>{}</v></c>",
            format_rating(*r)
        ),
        // Text and dates are stored as the displayed text.
        Cell::Text(_) | Cell::Date(_) => inline_string(reference, &cell.display(), None),
    }
}

/// Worksheet XML for one grid: header row, then body rows.
fn sheet_xml(grid: &Grid) -> String {
    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n");
    xml.push_str(
        "<worksheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\">\n",
    );

    if !grid.header.is_empty() {
        xml.push_str("<cols>");
        for (i, h) in grid.header.iter().enumerate() {
            let widest = grid
                .rows
                .iter()
                .filter_map(|r| r.get(i))
                .map(|c| c.display().chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(8);
            let width = (widest + 2).clamp(8, 60);
            xml.push_str(&format!(
                "<col min=\"{n}\" max=\"{n}\" width=\"{width}\" customWidth=\"1\"/>",
                n = i + 1
            ));
        }
        xml.push_str("</cols>\n");
    }

    xml.push_str("<sheetData>\n");
    xml.push_str("<row r=\"1\">");
    for (i, h) in grid.header.iter().enumerate() {
        xml.push_str(&inline_string(
            &format!("{}1", column_name(i)),
            h,
            Some(STYLE_HEADER),
        ));
    }
    xml.push_str("</row>\n");

    for (r, row) in grid.rows.iter().enumerate() {
        let row_number = r + 2;
        xml.push_str(&format!("<row r=\"{row_number}\">"));
        for (c, cell) in row.iter().enumerate() {
            xml.push_str(&cell_xml(&format!("{}{row_number}", column_name(c)), cell));
        }
        xml.push_str("</row>\n");
    }
    xml.push_str("</sheetData>\n</worksheet>\n");
    xml
}

fn content_types_xml(sheet_count: usize) -> String {
    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n");
    xml.push_str(
        "<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\n",
    );
    xml.push_str("<Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\n");
    xml.push_str("<Default Extension=\"xml\" ContentType=\"application/xml\"/>\n");
    xml.push_str("<Override PartName=\"/xl/workbook.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml\"/>\n");
    xml.push_str("<Override PartName=\"/xl/styles.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml\"/>\n");
    xml.push_str("<Override PartName=\"/docProps/core.xml\" ContentType=\"application/vnd.openxmlformats-package.core-properties+xml\"/>\n");
    for i in 1..=sheet_count {
        xml.push_str(&format!(
            "<Override PartName=\"/xl/worksheets/sheet{i}.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml\"/>\n"
        ));
    }
    xml.push_str("</Types>\n");
    xml
}

fn workbook_xml(names: &[String]) -> String {
    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n");
    xml.push_str("<workbook xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\">\n<sheets>\n");
    for (i, name) in names.iter().enumerate() {
        xml.push_str(&format!(
            "<sheet name=\"{}\" sheetId=\"{id}\" r:id=\"rId{id}\"/>\n",
            xml_escape(name),
            id = i + 1
        ));
    }
    xml.push_str("</sheets>\n</workbook>\n");
    xml
}

fn workbook_rels_xml(sheet_count: usize) -> String {
    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n");
    xml.push_str("<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\n");
    for i in 1..=sheet_count {
        xml.push_str(&format!(
            "<Relationship Id=\"rId{i}\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet\" Target=\"worksheets/sheet{i}.xml\"/>\n"
        ));
    }
    xml.push_str(&format!(
        "<Relationship Id=\"rId{}\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles\" Target=\"styles.xml\"/>\n",
        sheet_count + 1
    ));
    xml.push_str("</Relationships>\n");
    xml
}

fn core_props_xml(title: &str, generated_at: DateTime<Utc>) -> String {
    let stamp = generated_at.format("%Y-%m-%dT%H:%M:%SZ");
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
<cp:coreProperties xmlns:cp=\"http://schemas.openxmlformats.org/package/2006/metadata/core-properties\" \
xmlns:dc=\"http://purl.org/dc/elements/1.1/\" xmlns:dcterms=\"http://purl.org/dc/terms/\" \
xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\">\n\
<dc:title>{}</dc:title>\n<dc:creator>trainboard</dc:creator>\n\
<dcterms:created xsi:type=\"dcterms:W3CDTF\">{stamp}</dcterms:created>\n\
</cp:coreProperties>\n",
        xml_escape(title)
    )
}

/// Render `report` as XLSX bytes.
///
/// The report is validated first; a ragged grid or malformed chart fails
/// the export instead of producing a misaligned sheet.
pub fn render_xlsx(report: &ReportTable, generated_at: DateTime<Utc>) -> Result<Vec<u8>> {
    report
        .validate()
        .context("report failed validation before XLSX export")?;

    let mut grids = vec![report.summary_grid()];
    grids.extend(report.all_grids());

    let mut used = HashSet::new();
    let names: Vec<String> = grids.iter().map(|g| sheet_name(&g.name, &mut used)).collect();

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut put = |zip: &mut ZipWriter<Cursor<Vec<u8>>>, entry: &str, body: &str| -> Result<()> {
        zip.start_file(entry, opts)
            .with_context(|| format!("failed to start {entry}"))?;
        zip.write_all(body.as_bytes())
            .with_context(|| format!("failed to write {entry}"))?;
        Ok(())
    };

    put(&mut zip, "[Content_Types].xml", &content_types_xml(grids.len()))?;
    put(&mut zip, "_rels/.rels", ROOT_RELS_XML)?;
    put(&mut zip, "docProps/core.xml", &core_props_xml(&report.title, generated_at))?;
    put(&mut zip, "xl/workbook.xml", &workbook_xml(&names))?;
    put(&mut zip, "xl/_rels/workbook.xml.rels", &workbook_rels_xml(grids.len()))?;
    put(&mut zip, "xl/styles.xml", STYLES_XML)?;
    for (i, grid) in grids.iter().enumerate() {
        put(&mut zip, &format!("xl/worksheets/sheet{}.xml", i + 1), &sheet_xml(grid))?;
    }

    let cursor = zip.finish().context("failed to finalize XLSX package")?;
    Ok(cursor.into_inner())
}
