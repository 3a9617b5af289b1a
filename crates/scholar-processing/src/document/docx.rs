//! Word (OOXML) to XHTML conversion.
//!
//! Reads `word/document.xml` out of the zip container and emits a standalone XHTML
//! document that the PDF renderer understands. Only structure survives: headings,
//! run emphasis, breaks, tabs, list paragraphs, tables and embedded raster images.

use base64::Engine;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use zip::read::ZipFile;
use zip::ZipArchive;

use super::{ConversionError, PAGE_MARGIN_CM};

const DOCUMENT_PART: &str = "word/document.xml";
const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";

/// Largest uncompressed size accepted for any single package part.
const MAX_PART_BYTES: u64 = 64 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParagraphKind {
    Normal,
    Heading(u8),
    ListItem(u8),
}

#[derive(Debug)]
enum Inline {
    Text {
        text: String,
        bold: bool,
        italic: bool,
        underline: bool,
    },
    Tab,
    Break,
    Image(String),
}

#[derive(Debug)]
struct Paragraph {
    kind: ParagraphKind,
    inlines: Vec<Inline>,
}

impl Paragraph {
    fn new() -> Self {
        Self {
            kind: ParagraphKind::Normal,
            inlines: Vec::new(),
        }
    }
}

type Row = Vec<Vec<Paragraph>>;

#[derive(Debug)]
enum BodyItem {
    Paragraph(Paragraph),
    Table(Vec<Row>),
}

#[derive(Debug, Default, Clone, Copy)]
struct RunProps {
    bold: bool,
    italic: bool,
    underline: bool,
}

/// Convert a `.docx` payload to XHTML.
pub fn docx_to_html(bytes: &[u8]) -> Result<String, ConversionError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ConversionError::InvalidDocument(format!("not an OOXML package: {}", e)))?;

    let document_xml = read_part(&mut archive, DOCUMENT_PART, MAX_PART_BYTES)?.ok_or_else(|| {
        ConversionError::InvalidDocument(format!("missing {}", DOCUMENT_PART))
    })?;
    let rels = match read_part(&mut archive, DOCUMENT_RELS_PART, MAX_PART_BYTES)? {
        Some(xml) => parse_relationships(&xml)?,
        None => HashMap::new(),
    };

    let body = parse_body(&document_xml)?;

    let mut html = String::with_capacity(document_xml.len() / 2);
    html.push_str("<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"/><style>");
    html.push_str(&default_stylesheet());
    html.push_str("</style></head><body>");
    for item in &body {
        match item {
            BodyItem::Paragraph(paragraph) => {
                write_paragraph(&mut html, paragraph, &rels, &mut archive)
            }
            BodyItem::Table(rows) => write_table(&mut html, rows, &rels, &mut archive),
        }
    }
    html.push_str("</body></html>");

    Ok(html)
}

/// Print stylesheet embedded in every converted document.
fn default_stylesheet() -> String {
    format!(
        "@page {{ size: A4; margin: {m}cm; }} \
         body {{ font-family: Helvetica, Arial, sans-serif; font-size: 11pt; }} \
         img {{ max-width: 100%; }} \
         table {{ border-collapse: collapse; width: 100%; }} \
         td {{ border: 1px solid #000; padding: 4pt; vertical-align: top; }} \
         .list-item {{ margin-left: 18pt; }}",
        m = PAGE_MARGIN_CM
    )
}

/// Inflate one entry, refusing anything that expands past `limit` bytes.
///
/// The declared size is checked first; the read itself is capped as well since the
/// header is not trustworthy.
fn read_entry(
    file: &mut ZipFile<'_>,
    name: &str,
    limit: u64,
) -> Result<Vec<u8>, ConversionError> {
    let too_large = || {
        ConversionError::InvalidDocument(format!("{} expands beyond {} bytes", name, limit))
    };
    if file.size() > limit {
        return Err(too_large());
    }
    let mut content = Vec::with_capacity(file.size() as usize);
    file.take(limit + 1)
        .read_to_end(&mut content)
        .map_err(|e| ConversionError::InvalidDocument(format!("{}: {}", name, e)))?;
    if content.len() as u64 > limit {
        return Err(too_large());
    }
    Ok(content)
}

fn read_part(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    name: &str,
    limit: u64,
) -> Result<Option<String>, ConversionError> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(ConversionError::InvalidDocument(e.to_string())),
    };
    let content = read_entry(&mut file, name, limit)?;
    String::from_utf8(content)
        .map(Some)
        .map_err(|e| ConversionError::InvalidDocument(format!("{}: {}", name, e)))
}

fn read_binary_part(archive: &mut ZipArchive<Cursor<&[u8]>>, name: &str) -> Option<Vec<u8>> {
    let mut file = archive.by_name(name).ok()?;
    match read_entry(&mut file, name, MAX_PART_BYTES) {
        Ok(content) => Some(content),
        Err(e) => {
            tracing::warn!(part = %name, error = %e, "Skipping unreadable embedded image");
            None
        }
    }
}

/// Value of the first attribute whose local name matches, ignoring namespace prefixes.
fn attr_value(element: &BytesStart<'_>, local: &[u8]) -> Option<String> {
    element
        .attributes()
        .with_checks(false)
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == local)
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}

/// `w:b`, `w:i` style toggles: present means on unless `w:val` says otherwise.
fn toggle_on(element: &BytesStart<'_>) -> bool {
    !matches!(
        attr_value(element, b"val").as_deref(),
        Some("0") | Some("false") | Some("off") | Some("none")
    )
}

fn parse_relationships(xml: &str) -> Result<HashMap<String, String>, ConversionError> {
    let mut reader = Reader::from_str(xml);
    let mut rels = HashMap::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                if attr_value(&e, b"TargetMode").as_deref() == Some("External") {
                    continue;
                }
                if let (Some(id), Some(target)) = (attr_value(&e, b"Id"), attr_value(&e, b"Target"))
                {
                    let path = match target.strip_prefix('/') {
                        Some(absolute) => absolute.to_string(),
                        None => format!("word/{}", target),
                    };
                    rels.insert(id, path);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ConversionError::InvalidDocument(format!(
                    "relationships: {}",
                    e
                )))
            }
            _ => {}
        }
    }

    Ok(rels)
}

struct BodyParser {
    body: Vec<BodyItem>,
    // Open tables, innermost last. Nested tables are flattened into the enclosing cell.
    tables: Vec<Vec<Row>>,
    // Open paragraphs, innermost last. Text boxes nest paragraphs inside a run.
    paragraphs: Vec<Paragraph>,
    // Closed nested paragraphs, emitted after their enclosing paragraph.
    detached: Vec<Paragraph>,
    run: RunProps,
    in_run: bool,
    in_text: bool,
}

impl BodyParser {
    fn new() -> Self {
        Self {
            body: Vec::new(),
            tables: Vec::new(),
            paragraphs: Vec::new(),
            detached: Vec::new(),
            run: RunProps::default(),
            in_run: false,
            in_text: false,
        }
    }

    fn push_inline(&mut self, inline: Inline) {
        if let Some(paragraph) = self.paragraphs.last_mut() {
            paragraph.inlines.push(inline);
        }
    }

    fn current_cell(&mut self) -> Option<&mut Vec<Paragraph>> {
        self.tables.last_mut()?.last_mut()?.last_mut()
    }

    fn emit(&mut self, paragraph: Paragraph) {
        if !self.paragraphs.is_empty() {
            self.detached.push(paragraph);
            return;
        }
        let detached = std::mem::take(&mut self.detached);
        for paragraph in std::iter::once(paragraph).chain(detached) {
            if self.tables.is_empty() {
                self.body.push(BodyItem::Paragraph(paragraph));
            } else if let Some(cell) = self.current_cell() {
                cell.push(paragraph);
            }
        }
    }

    fn finish_paragraph(&mut self) {
        if let Some(paragraph) = self.paragraphs.pop() {
            self.emit(paragraph);
        }
    }

    fn finish_table(&mut self) {
        let Some(rows) = self.tables.pop() else {
            return;
        };
        if !self.paragraphs.is_empty() {
            // A table inside a text box keeps its text but not its grid.
            self.detached.extend(rows.into_iter().flatten().flatten());
        } else if self.tables.is_empty() {
            self.body.push(BodyItem::Table(rows));
        } else if let Some(cell) = self.current_cell() {
            cell.extend(rows.into_iter().flatten().flatten());
        }
    }

    fn start(&mut self, e: &BytesStart<'_>, empty: bool) {
        match e.local_name().as_ref() {
            b"p" => {
                if empty {
                    self.emit(Paragraph::new());
                } else {
                    self.paragraphs.push(Paragraph::new());
                }
            }
            b"pStyle" => {
                if let (Some(paragraph), Some(style)) =
                    (self.paragraphs.last_mut(), attr_value(e, b"val"))
                {
                    if let Some(kind) = style_kind(&style) {
                        paragraph.kind = kind;
                    }
                }
            }
            b"numPr" => {
                if let Some(paragraph) = self.paragraphs.last_mut() {
                    if !matches!(paragraph.kind, ParagraphKind::Heading(_)) {
                        paragraph.kind = ParagraphKind::ListItem(0);
                    }
                }
            }
            b"ilvl" => {
                if let Some(paragraph) = self.paragraphs.last_mut() {
                    if let ParagraphKind::ListItem(_) = paragraph.kind {
                        let level = attr_value(e, b"val")
                            .and_then(|v| v.parse::<u8>().ok())
                            .unwrap_or(0);
                        paragraph.kind = ParagraphKind::ListItem(level.min(8));
                    }
                }
            }
            b"r" => {
                self.in_run = !empty;
                self.run = RunProps::default();
            }
            b"b" if self.in_run => self.run.bold = toggle_on(e),
            b"i" if self.in_run => self.run.italic = toggle_on(e),
            b"u" if self.in_run => self.run.underline = toggle_on(e),
            b"t" if self.in_run && !empty => self.in_text = true,
            b"tab" if self.in_run => self.push_inline(Inline::Tab),
            b"br" | b"cr" if self.in_run => self.push_inline(Inline::Break),
            b"blip" => {
                if let Some(id) = attr_value(e, b"embed") {
                    self.push_inline(Inline::Image(id));
                }
            }
            b"tbl" if !empty => self.tables.push(Vec::new()),
            b"tr" if !empty => {
                if let Some(table) = self.tables.last_mut() {
                    table.push(Vec::new());
                }
            }
            b"tc" => {
                if let Some(row) = self.tables.last_mut().and_then(|t| t.last_mut()) {
                    row.push(Vec::new());
                }
            }
            _ => {}
        }
    }

    fn end(&mut self, local_name: &[u8]) {
        match local_name {
            b"p" => self.finish_paragraph(),
            b"r" => self.in_run = false,
            b"t" => self.in_text = false,
            b"tbl" => self.finish_table(),
            _ => {}
        }
    }

    fn text(&mut self, text: String) {
        if !self.in_text || text.is_empty() {
            return;
        }
        let RunProps {
            bold,
            italic,
            underline,
        } = self.run;
        self.push_inline(Inline::Text {
            text,
            bold,
            italic,
            underline,
        });
    }
}

fn style_kind(style: &str) -> Option<ParagraphKind> {
    let lower = style.to_ascii_lowercase();
    if lower == "title" {
        return Some(ParagraphKind::Heading(1));
    }
    if lower == "subtitle" {
        return Some(ParagraphKind::Heading(2));
    }
    if let Some(level) = lower.strip_prefix("heading") {
        let level = level.trim().parse::<u8>().ok()?;
        return Some(ParagraphKind::Heading(level.clamp(1, 6)));
    }
    if lower == "listparagraph" || lower.starts_with("listbullet") {
        return Some(ParagraphKind::ListItem(0));
    }
    None
}

fn parse_body(xml: &str) -> Result<Vec<BodyItem>, ConversionError> {
    let mut reader = Reader::from_str(xml);
    let mut parser = BodyParser::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => parser.start(&e, false),
            Ok(Event::Empty(e)) => parser.start(&e, true),
            Ok(Event::End(e)) => parser.end(e.local_name().as_ref()),
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| ConversionError::InvalidDocument(e.to_string()))?;
                parser.text(text.into_owned());
            }
            Ok(Event::CData(t)) => {
                parser.text(String::from_utf8_lossy(&t.into_inner()).into_owned());
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ConversionError::InvalidDocument(format!(
                    "document.xml at byte {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }
    while !parser.paragraphs.is_empty() {
        parser.finish_paragraph();
    }
    while !parser.tables.is_empty() {
        parser.finish_table();
    }

    Ok(parser.body)
}

fn image_data_uri(
    rel_id: &str,
    rels: &HashMap<String, String>,
    archive: &mut ZipArchive<Cursor<&[u8]>>,
) -> Option<String> {
    let path = rels.get(rel_id)?;
    let extension = path.rsplit_once('.')?.1.to_ascii_lowercase();
    let mime = match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        other => {
            tracing::debug!(rel_id = %rel_id, extension = %other, "Skipping non-raster image");
            return None;
        }
    };
    let bytes = read_binary_part(archive, path)?;
    Some(format!(
        "data:{};base64,{}",
        mime,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    ))
}

fn write_inlines(
    html: &mut String,
    inlines: &[Inline],
    rels: &HashMap<String, String>,
    archive: &mut ZipArchive<Cursor<&[u8]>>,
) {
    for inline in inlines {
        match inline {
            Inline::Text {
                text,
                bold,
                italic,
                underline,
            } => {
                if *bold {
                    html.push_str("<strong>");
                }
                if *italic {
                    html.push_str("<em>");
                }
                if *underline {
                    html.push_str("<u>");
                }
                html.push_str(&html_escape::encode_text(text));
                if *underline {
                    html.push_str("</u>");
                }
                if *italic {
                    html.push_str("</em>");
                }
                if *bold {
                    html.push_str("</strong>");
                }
            }
            Inline::Tab => html.push_str("<span class=\"tab\">&#160;&#160;&#160;&#160;</span>"),
            Inline::Break => html.push_str("<br/>"),
            Inline::Image(rel_id) => {
                if let Some(src) = image_data_uri(rel_id, rels, archive) {
                    html.push_str("<img src=\"");
                    html.push_str(&src);
                    html.push_str("\" alt=\"\"/>");
                }
            }
        }
    }
}

fn write_paragraph(
    html: &mut String,
    paragraph: &Paragraph,
    rels: &HashMap<String, String>,
    archive: &mut ZipArchive<Cursor<&[u8]>>,
) {
    match paragraph.kind {
        ParagraphKind::Heading(level) => {
            html.push_str(&format!("<h{}>", level));
            write_inlines(html, &paragraph.inlines, rels, archive);
            html.push_str(&format!("</h{}>", level));
        }
        ParagraphKind::ListItem(level) => {
            html.push_str(&format!(
                "<p class=\"list-item level-{}\">&#8226; ",
                level + 1
            ));
            write_inlines(html, &paragraph.inlines, rels, archive);
            html.push_str("</p>");
        }
        ParagraphKind::Normal => {
            html.push_str("<p>");
            write_inlines(html, &paragraph.inlines, rels, archive);
            html.push_str("</p>");
        }
    }
}

fn write_table(
    html: &mut String,
    rows: &[Row],
    rels: &HashMap<String, String>,
    archive: &mut ZipArchive<Cursor<&[u8]>>,
) {
    html.push_str("<table>");
    for row in rows {
        html.push_str("<tr>");
        for cell in row {
            html.push_str("<td>");
            for paragraph in cell {
                write_paragraph(html, paragraph, rels, archive);
            }
            html.push_str("</td>");
        }
        html.push_str("</tr>");
    }
    html.push_str("</table>");
}
