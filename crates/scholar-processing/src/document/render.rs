//! XHTML to PDF rendering.
//!
//! A deliberately small layout engine: block-level flow of paragraphs, headings,
//! list items, tables and raster images onto A4 pages, set in the standard
//! Helvetica faces with WinAnsi encoding. No CSS is interpreted beyond the
//! `level-N` list indentation classes produced by the Word converter.

use base64::Engine;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::Write;

use super::{ConversionError, HtmlRenderer, PAGE_MARGIN_CM};

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = PAGE_MARGIN_CM * 72.0 / 2.54;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;
const CONTENT_TOP: f32 = PAGE_HEIGHT - MARGIN;

const BODY_FONT_SIZE: f32 = 11.0;
const TABLE_FONT_SIZE: f32 = 10.0;
const LINE_SPACING: f32 = 1.3;
const LIST_INDENT: f32 = 18.0;
const CELL_PADDING: f32 = 4.0;
const PX_TO_PT: f32 = 0.75;
const BOLD_WIDTH_FACTOR: f32 = 1.05;
const IMAGE_GAP: f32 = 6.0;

const FONTS: [(&str, &str); 4] = [
    ("F1", "Helvetica"),
    ("F2", "Helvetica-Bold"),
    ("F3", "Helvetica-Oblique"),
    ("F4", "Helvetica-BoldOblique"),
];

/// Helvetica advance widths for WinAnsi codes 32..=126, in 1/1000 em.
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Renders the XHTML produced by the Word converter and the placeholder notice.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfRenderer;

impl PdfRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl HtmlRenderer for PdfRenderer {
    fn render(&self, html: &str) -> Result<Vec<u8>, ConversionError> {
        let blocks = parse_markup(html)?;

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut fonts = Dictionary::new();
        for (name, base_font) in FONTS {
            let font_id = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => base_font,
                "Encoding" => "WinAnsiEncoding",
            });
            fonts.set(name, font_id);
        }

        let mut layout = Layout::new(&mut doc);
        for block in &blocks {
            match block {
                Block::Text(text) => layout.text_block(text),
                Block::Table(rows) => layout.table(rows),
                Block::Image(src) => layout.image(src),
            }
        }
        let canvases = layout.finish();

        let mut kids: Vec<Object> = Vec::with_capacity(canvases.len());
        for canvas in canvases {
            let content = Content {
                operations: canvas.ops,
            };
            let encoded = content
                .encode()
                .map_err(|e| ConversionError::Render(e.to_string()))?;
            let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

            let mut xobjects = Dictionary::new();
            for (name, image_id) in canvas.images {
                xobjects.set(name, image_id);
            }

            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "Font" => fonts.clone(),
                    "XObject" => xobjects,
                },
            });
            kids.push(page_id.into());
        }

        let page_count = kids.len();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Count" => page_count as i64,
                "Kids" => kids,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(PAGE_WIDTH as i64),
                    Object::Integer(PAGE_HEIGHT as i64),
                ],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        doc.save_to(&mut out)
            .map_err(|e| ConversionError::Render(e.to_string()))?;

        tracing::debug!(
            pages = page_count,
            size_bytes = out.len(),
            "Rendered document to PDF"
        );

        Ok(out)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct FontStyle {
    bold: bool,
    italic: bool,
}

impl FontStyle {
    fn resource_name(self) -> &'static str {
        match (self.bold, self.italic) {
            (false, false) => FONTS[0].0,
            (true, false) => FONTS[1].0,
            (false, true) => FONTS[2].0,
            (true, true) => FONTS[3].0,
        }
    }
}

#[derive(Debug, Clone)]
struct Span {
    text: String,
    style: FontStyle,
    underline: bool,
}

#[derive(Debug, Clone)]
enum Piece {
    Text(Span),
    Break,
    /// Only produced inside table cells; top-level images are their own block.
    Image(String),
}

#[derive(Debug)]
struct TextBlock {
    pieces: Vec<Piece>,
    size: f32,
    indent: f32,
    space_before: f32,
}

type Cell = Vec<Piece>;

#[derive(Debug)]
enum Block {
    Text(TextBlock),
    Table(Vec<Vec<Cell>>),
    Image(String),
}

#[derive(Debug, Clone, Copy)]
enum ListKind {
    Unordered,
    Ordered(u32),
}

fn heading_size(level: u8) -> f32 {
    match level {
        1 => 22.0,
        2 => 18.0,
        3 => 15.0,
        4 => 13.0,
        5 => 12.0,
        _ => BODY_FONT_SIZE,
    }
}

fn heading_level(name: &[u8]) -> Option<u8> {
    match name {
        [b'h', digit @ b'1'..=b'6'] => Some(digit - b'0'),
        _ => None,
    }
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = false;
    for c in text.chars() {
        if c.is_ascii_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
    out
}

fn attr(element: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    element
        .attributes()
        .with_checks(false)
        .flatten()
        .find(|a| a.key.as_ref() == name)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Indentation requested through a `level-N` class.
fn class_indent(element: &BytesStart<'_>) -> f32 {
    attr(element, b"class")
        .and_then(|classes| {
            classes
                .split_ascii_whitespace()
                .find_map(|c| c.strip_prefix("level-")?.parse::<u8>().ok())
        })
        .map(|level| f32::from(level.min(8)) * LIST_INDENT)
        .unwrap_or(0.0)
}

#[derive(Default)]
struct MarkupParser {
    blocks: Vec<Block>,
    current: Option<TextBlock>,
    table: Option<Vec<Vec<Cell>>>,
    in_cell: bool,
    bold: u32,
    italic: u32,
    underline: u32,
    skip_depth: u32,
    lists: Vec<ListKind>,
}

impl MarkupParser {
    fn style(&self) -> FontStyle {
        FontStyle {
            bold: self.bold > 0,
            italic: self.italic > 0,
        }
    }

    fn cell_mut(&mut self) -> Option<&mut Cell> {
        if !self.in_cell {
            return None;
        }
        self.table.as_mut()?.last_mut()?.last_mut()
    }

    fn flush(&mut self) {
        if let Some(block) = self.current.take() {
            self.blocks.push(Block::Text(block));
        }
    }

    fn begin_block(&mut self, size: f32, indent: f32, space_before: f32) {
        if self.in_cell {
            if let Some(cell) = self.cell_mut() {
                if !cell.is_empty() {
                    cell.push(Piece::Break);
                }
            }
            return;
        }
        self.flush();
        self.current = Some(TextBlock {
            pieces: Vec::new(),
            size,
            indent,
            space_before,
        });
    }

    fn end_block(&mut self) {
        if !self.in_cell {
            self.flush();
        }
    }

    fn push_piece(&mut self, piece: Piece) {
        if let Some(cell) = self.cell_mut() {
            cell.push(piece);
            return;
        }
        if self.current.is_none() {
            self.begin_block(BODY_FONT_SIZE, 0.0, 0.0);
        }
        if let Some(block) = self.current.as_mut() {
            block.pieces.push(piece);
        }
    }

    fn text(&mut self, raw: &str) {
        if self.skip_depth > 0 {
            return;
        }
        let text = collapse_whitespace(raw);
        let inside_flow = self.current.is_some() || self.in_cell;
        if text.trim().is_empty() && !inside_flow {
            return;
        }
        let span = Span {
            text,
            style: self.style(),
            underline: self.underline > 0,
        };
        self.push_piece(Piece::Text(span));
    }

    fn start(&mut self, e: &BytesStart<'_>, empty: bool) {
        let name = e.local_name().as_ref().to_ascii_lowercase();
        if self.skip_depth > 0 {
            if !empty {
                self.skip_depth += 1;
            }
            return;
        }

        if let Some(level) = heading_level(&name) {
            let size = heading_size(level);
            self.begin_block(size, 0.0, size * 0.6);
            self.bold += 1;
            if empty {
                self.bold -= 1;
                self.end_block();
            }
            return;
        }

        match name.as_slice() {
            b"head" | b"style" | b"script" | b"title" if !empty => self.skip_depth = 1,
            b"p" | b"div" | b"blockquote" | b"pre" => {
                self.begin_block(BODY_FONT_SIZE, class_indent(e), 0.0);
                if empty {
                    self.end_block();
                }
            }
            b"ul" if !empty => self.lists.push(ListKind::Unordered),
            b"ol" if !empty => self.lists.push(ListKind::Ordered(0)),
            b"li" => {
                let indent = self.lists.len().max(1) as f32 * LIST_INDENT;
                self.begin_block(BODY_FONT_SIZE, indent, 0.0);
                let marker = match self.lists.last_mut() {
                    Some(ListKind::Ordered(n)) => {
                        *n += 1;
                        format!("{}. ", n)
                    }
                    _ => "\u{2022} ".to_string(),
                };
                let span = Span {
                    text: marker,
                    style: self.style(),
                    underline: false,
                };
                self.push_piece(Piece::Text(span));
                if empty {
                    self.end_block();
                }
            }
            b"br" => self.push_piece(Piece::Break),
            b"strong" | b"b" if !empty => self.bold += 1,
            b"em" | b"i" if !empty => self.italic += 1,
            b"u" if !empty => self.underline += 1,
            b"table" if !empty => {
                self.flush();
                self.table = Some(Vec::new());
            }
            b"tr" if !empty => {
                if let Some(table) = self.table.as_mut() {
                    table.push(Vec::new());
                }
            }
            b"td" | b"th" => {
                if let Some(row) = self.table.as_mut().and_then(|t| t.last_mut()) {
                    row.push(Vec::new());
                    self.in_cell = !empty;
                    if name == b"th" && !empty {
                        self.bold += 1;
                    }
                }
            }
            b"img" => {
                let Some(src) = attr(e, b"src") else {
                    return;
                };
                if let Some(cell) = self.cell_mut() {
                    cell.push(Piece::Image(src));
                    return;
                }
                self.flush();
                self.blocks.push(Block::Image(src));
            }
            _ => {}
        }
    }

    fn end(&mut self, local_name: &[u8]) {
        let name = local_name.to_ascii_lowercase();
        if self.skip_depth > 0 {
            self.skip_depth -= 1;
            return;
        }

        if heading_level(&name).is_some() {
            self.bold = self.bold.saturating_sub(1);
            self.end_block();
            return;
        }

        match name.as_slice() {
            b"p" | b"div" | b"blockquote" | b"pre" | b"li" => self.end_block(),
            b"ul" | b"ol" => {
                self.lists.pop();
            }
            b"strong" | b"b" => self.bold = self.bold.saturating_sub(1),
            b"em" | b"i" => self.italic = self.italic.saturating_sub(1),
            b"u" => self.underline = self.underline.saturating_sub(1),
            b"td" => self.in_cell = false,
            b"th" => {
                self.in_cell = false;
                self.bold = self.bold.saturating_sub(1);
            }
            b"table" => {
                self.in_cell = false;
                if let Some(rows) = self.table.take() {
                    self.blocks.push(Block::Table(rows));
                }
            }
            _ => {}
        }
    }

    fn finish(mut self) -> Vec<Block> {
        self.flush();
        if let Some(rows) = self.table.take() {
            self.blocks.push(Block::Table(rows));
        }
        self.blocks
    }
}

fn parse_markup(html: &str) -> Result<Vec<Block>, ConversionError> {
    let mut reader = Reader::from_str(html);
    let mut parser = MarkupParser::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => parser.start(&e, false),
            Ok(Event::Empty(e)) => parser.start(&e, true),
            Ok(Event::End(e)) => parser.end(e.local_name().as_ref()),
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape_with(|entity| match entity {
                        "nbsp" => Some("\u{a0}"),
                        _ => None,
                    })
                    .map_err(|e| ConversionError::Markup(e.to_string()))?;
                parser.text(&text);
            }
            Ok(Event::CData(t)) => {
                parser.text(&String::from_utf8_lossy(&t.into_inner()));
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ConversionError::Markup(format!(
                    "at byte {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    Ok(parser.finish())
}

/// Encode text for the WinAnsi-encoded standard fonts; unmappable characters become `?`.
fn to_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20}'..='\u{7e}' | '\u{a0}'..='\u{ff}' => c as u8,
            '\t' | '\n' | '\r' => b' ',
            '\u{20ac}' => 0x80,
            '\u{201a}' => 0x82,
            '\u{0192}' => 0x83,
            '\u{201e}' => 0x84,
            '\u{2026}' => 0x85,
            '\u{2020}' => 0x86,
            '\u{2021}' => 0x87,
            '\u{02c6}' => 0x88,
            '\u{2030}' => 0x89,
            '\u{0160}' => 0x8a,
            '\u{2039}' => 0x8b,
            '\u{0152}' => 0x8c,
            '\u{017d}' => 0x8e,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201c}' => 0x93,
            '\u{201d}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{02dc}' => 0x98,
            '\u{2122}' => 0x99,
            '\u{0161}' => 0x9a,
            '\u{203a}' => 0x9b,
            '\u{0153}' => 0x9c,
            '\u{017e}' => 0x9e,
            '\u{0178}' => 0x9f,
            _ => b'?',
        })
        .collect()
}

fn glyph_width(code: u8) -> u16 {
    match code {
        32..=126 => HELVETICA_WIDTHS[(code - 32) as usize],
        0xa0 => 278,
        0x95 => 350,
        _ => 556,
    }
}

fn text_width(bytes: &[u8], size: f32, style: FontStyle) -> f32 {
    let units: u32 = bytes.iter().map(|&b| u32::from(glyph_width(b))).sum();
    let width = units as f32 * size / 1000.0;
    if style.bold {
        width * BOLD_WIDTH_FACTOR
    } else {
        width
    }
}

/// A run of same-styled text placed on a line, `x` relative to the line start.
#[derive(Debug, Clone)]
struct Fragment {
    text: Vec<u8>,
    style: FontStyle,
    underline: bool,
    x: f32,
    width: f32,
}

type Line = Vec<Fragment>;

struct LineBreaker {
    lines: Vec<Line>,
    line: Line,
    x: f32,
    pending_space: bool,
    max_width: f32,
    size: f32,
}

impl LineBreaker {
    fn new(max_width: f32, size: f32) -> Self {
        Self {
            lines: Vec::new(),
            line: Vec::new(),
            x: 0.0,
            pending_space: false,
            max_width: max_width.max(size),
            size,
        }
    }

    fn break_line(&mut self) {
        self.lines.push(std::mem::take(&mut self.line));
        self.x = 0.0;
        self.pending_space = false;
    }

    fn append(&mut self, word: &[u8], style: FontStyle, underline: bool, space: f32) {
        let width = text_width(word, self.size, style);
        match self.line.last_mut() {
            Some(last) if last.style == style && last.underline == underline => {
                if space > 0.0 {
                    last.text.push(b' ');
                }
                last.text.extend_from_slice(word);
                last.width += space + width;
            }
            _ => self.line.push(Fragment {
                text: word.to_vec(),
                style,
                underline,
                x: self.x + space,
                width,
            }),
        }
        self.x += space + width;
        self.pending_space = false;
    }

    fn push_word(&mut self, word: &[u8], style: FontStyle, underline: bool) {
        let mut remaining = word;

        // Words wider than the line are split at character boundaries.
        while text_width(remaining, self.size, style) > self.max_width {
            if self.x > 0.0 {
                self.break_line();
            }
            let mut cut = 0;
            let mut used = 0.0;
            for (i, &b) in remaining.iter().enumerate() {
                let w = text_width(&[b], self.size, style);
                if used + w > self.max_width {
                    break;
                }
                used += w;
                cut = i + 1;
            }
            let cut = cut.max(1);
            self.append(&remaining[..cut], style, underline, 0.0);
            self.break_line();
            remaining = &remaining[cut..];
        }
        if remaining.is_empty() {
            return;
        }

        let mut space = if self.pending_space && self.x > 0.0 {
            text_width(b" ", self.size, style)
        } else {
            0.0
        };
        let width = text_width(remaining, self.size, style);
        if self.x > 0.0 && self.x + space + width > self.max_width {
            self.break_line();
            space = 0.0;
        }
        self.append(remaining, style, underline, space);
    }

    fn push_span(&mut self, span: &Span) {
        let encoded = to_win_ansi(&span.text);
        for (i, word) in encoded.split(|&b| b == b' ').enumerate() {
            if i > 0 {
                self.pending_space = true;
            }
            if !word.is_empty() {
                self.push_word(word, span.style, span.underline);
            }
        }
    }

    fn finish(mut self) -> Vec<Line> {
        if !self.line.is_empty() {
            self.lines.push(self.line);
        }
        self.lines
    }
}

fn wrap(pieces: &[Piece], max_width: f32, size: f32) -> Vec<Line> {
    let mut breaker = LineBreaker::new(max_width, size);
    for piece in pieces {
        match piece {
            Piece::Text(span) => breaker.push_span(span),
            Piece::Break => breaker.break_line(),
            Piece::Image(_) => {}
        }
    }
    breaker.finish()
}

/// An image XObject already added to the document, with its placed size in points.
struct PlacedImage {
    id: ObjectId,
    width: f32,
    height: f32,
}

enum CellItem {
    Line(Line),
    Image(PlacedImage),
}

#[derive(Default)]
struct PageCanvas {
    ops: Vec<Operation>,
    images: Vec<(String, ObjectId)>,
}

struct Layout<'a> {
    doc: &'a mut Document,
    finished: Vec<PageCanvas>,
    current: PageCanvas,
    y: f32,
    image_count: usize,
}

impl<'a> Layout<'a> {
    fn new(doc: &'a mut Document) -> Self {
        Self {
            doc,
            finished: Vec::new(),
            current: PageCanvas::default(),
            y: CONTENT_TOP,
            image_count: 0,
        }
    }

    fn at_page_top(&self) -> bool {
        self.y >= CONTENT_TOP
    }

    fn new_page(&mut self) {
        let page = std::mem::take(&mut self.current);
        self.finished.push(page);
        self.y = CONTENT_TOP;
    }

    fn ensure_space(&mut self, height: f32) {
        if self.y - height < MARGIN && !self.at_page_top() {
            self.new_page();
        }
    }

    fn advance(&mut self, gap: f32) {
        if !self.at_page_top() {
            self.y -= gap;
        }
    }

    fn draw_line(&mut self, line: &[Fragment], x0: f32, baseline: f32, size: f32) {
        for fragment in line {
            let x = x0 + fragment.x;
            self.current.ops.extend([
                Operation::new("BT", vec![]),
                Operation::new(
                    "Tf",
                    vec![fragment.style.resource_name().into(), size.into()],
                ),
                Operation::new("Td", vec![x.into(), baseline.into()]),
                Operation::new(
                    "Tj",
                    vec![Object::String(fragment.text.clone(), StringFormat::Literal)],
                ),
                Operation::new("ET", vec![]),
            ]);
            if fragment.underline {
                let y = baseline - size * 0.12;
                self.current.ops.extend([
                    Operation::new("w", vec![(size * 0.05).into()]),
                    Operation::new("m", vec![x.into(), y.into()]),
                    Operation::new("l", vec![(x + fragment.width).into(), y.into()]),
                    Operation::new("S", vec![]),
                ]);
            }
        }
    }

    fn text_block(&mut self, block: &TextBlock) {
        let line_height = block.size * LINE_SPACING;
        self.advance(block.space_before);

        let lines = wrap(&block.pieces, CONTENT_WIDTH - block.indent, block.size);
        if lines.is_empty() {
            self.ensure_space(line_height);
            self.y -= line_height;
        }
        for line in &lines {
            self.ensure_space(line_height);
            let baseline = self.y - block.size;
            self.draw_line(line, MARGIN + block.indent, baseline, block.size);
            self.y -= line_height;
        }
        self.y -= block.size * 0.4;
    }

    /// Wrap a cell's text and size its images to the column.
    fn cell_items(&mut self, pieces: &[Piece], width: f32, size: f32) -> Vec<CellItem> {
        let mut items = Vec::new();
        let mut text_start = 0;
        for (i, piece) in pieces.iter().enumerate() {
            let Piece::Image(src) = piece else {
                continue;
            };
            let lines = wrap(&pieces[text_start..i], width, size);
            items.extend(lines.into_iter().map(CellItem::Line));
            text_start = i + 1;
            let max_height = CONTENT_TOP - MARGIN - 2.0 * CELL_PADDING;
            if let Some(image) = self.prepare_image(src, width, max_height) {
                items.push(CellItem::Image(image));
            }
        }
        let lines = wrap(&pieces[text_start..], width, size);
        items.extend(lines.into_iter().map(CellItem::Line));
        items
    }

    fn table(&mut self, rows: &[Vec<Cell>]) {
        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        if columns == 0 {
            return;
        }
        let column_width = CONTENT_WIDTH / columns as f32;
        let inner_width = column_width - 2.0 * CELL_PADDING;
        let size = TABLE_FONT_SIZE;
        let line_height = size * LINE_SPACING;
        let item_height = |item: &CellItem| match item {
            CellItem::Line(_) => line_height,
            CellItem::Image(image) => image.height + IMAGE_GAP,
        };

        self.advance(4.0);
        for row in rows {
            let mut cells: Vec<Vec<CellItem>> = Vec::with_capacity(columns);
            for i in 0..columns {
                let items = match row.get(i) {
                    Some(pieces) => self.cell_items(pieces, inner_width, size),
                    None => Vec::new(),
                };
                cells.push(items);
            }
            let content_height = cells
                .iter()
                .map(|items| items.iter().map(item_height).sum::<f32>())
                .fold(line_height, f32::max);
            let row_height = content_height + 2.0 * CELL_PADDING;

            self.ensure_space(row_height);
            let top = self.y;
            self.current
                .ops
                .push(Operation::new("w", vec![0.5f32.into()]));
            for (i, items) in cells.iter().enumerate() {
                let x = MARGIN + i as f32 * column_width;
                self.current.ops.extend([
                    Operation::new(
                        "re",
                        vec![
                            x.into(),
                            (top - row_height).into(),
                            column_width.into(),
                            row_height.into(),
                        ],
                    ),
                    Operation::new("S", vec![]),
                ]);
                let mut cursor = top - CELL_PADDING;
                for item in items {
                    match item {
                        CellItem::Line(line) => {
                            self.draw_line(line, x + CELL_PADDING, cursor - size, size);
                            cursor -= line_height;
                        }
                        CellItem::Image(image) => {
                            let bottom = cursor - image.height;
                            self.place_image(image, x + CELL_PADDING, bottom);
                            cursor = bottom - IMAGE_GAP;
                        }
                    }
                }
            }
            self.y -= row_height;
        }
        self.y -= 6.0;
    }

    fn image(&mut self, src: &str) {
        let Some(image) = self.prepare_image(src, CONTENT_WIDTH, CONTENT_TOP - MARGIN) else {
            return;
        };
        self.ensure_space(image.height);
        let bottom = self.y - image.height;
        self.place_image(&image, MARGIN, bottom);
        self.y = bottom - IMAGE_GAP;
    }

    /// Decode a `data:` image and add it to the document, scaled down to fit the box.
    fn prepare_image(
        &mut self,
        src: &str,
        max_width: f32,
        max_height: f32,
    ) -> Option<PlacedImage> {
        let decoded = match decode_image(src) {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping image that could not be decoded");
                return None;
            }
        };
        let (pixel_width, pixel_height) = decoded.dimensions();
        if pixel_width == 0 || pixel_height == 0 {
            return None;
        }

        let mut width = pixel_width as f32 * PX_TO_PT;
        let mut height = pixel_height as f32 * PX_TO_PT;
        if width > max_width {
            height *= max_width / width;
            width = max_width;
        }
        if height > max_height {
            width *= max_height / height;
            height = max_height;
        }

        let compressed = match zlib(decoded.as_raw()) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping image that could not be compressed");
                return None;
            }
        };
        let id = self.doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(pixel_width),
                "Height" => i64::from(pixel_height),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "FlateDecode",
            },
            compressed,
        ));

        Some(PlacedImage { id, width, height })
    }

    fn place_image(&mut self, image: &PlacedImage, x: f32, bottom: f32) {
        self.image_count += 1;
        let name = format!("Im{}", self.image_count);
        self.current.ops.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    image.width.into(),
                    Object::Integer(0),
                    Object::Integer(0),
                    image.height.into(),
                    x.into(),
                    bottom.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(name.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ]);
        self.current.images.push((name, image.id));
    }

    /// Close the layout; always yields at least one page.
    fn finish(mut self) -> Vec<PageCanvas> {
        if !self.current.ops.is_empty() || self.finished.is_empty() {
            self.finished.push(self.current);
        }
        self.finished
    }
}

fn decode_image(src: &str) -> Result<image::RgbImage, String> {
    let rest = src
        .strip_prefix("data:")
        .ok_or_else(|| "only data: URIs are supported".to_string())?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| "malformed data URI".to_string())?;
    if !meta.ends_with(";base64") {
        return Err("data URI is not base64".to_string());
    }
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| e.to_string())?;
    let img = image::load_from_memory(&bytes).map_err(|e| e.to_string())?;
    Ok(img.to_rgb8())
}

fn zlib(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(html: &str) -> Vec<u8> {
        PdfRenderer::new().render(html).unwrap()
    }

    fn page_count(pdf: &[u8]) -> usize {
        Document::load_mem(pdf).unwrap().get_pages().len()
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn test_renders_single_page() {
        let pdf = render(
            "<html><body><h1>Syllabus</h1><p>Week one: <strong>intro</strong></p></body></html>",
        );
        assert!(pdf.starts_with(b"%PDF-1.5"));
        assert_eq!(page_count(&pdf), 1);
        assert!(contains(&pdf, b"(Syllabus) Tj"));
        assert!(contains(&pdf, b"/Helvetica-Bold"));
    }

    #[test]
    fn test_empty_body_still_has_a_page() {
        let pdf = render("<html><body></body></html>");
        assert_eq!(page_count(&pdf), 1);
    }

    #[test]
    fn test_long_content_paginates() {
        let paragraph = "<p>Lorem ipsum dolor sit amet, consectetur adipiscing elit, sed do \
                         eiusmod tempor incididunt ut labore et dolore magna aliqua.</p>";
        let html = format!("<html><body>{}</body></html>", paragraph.repeat(200));
        assert!(page_count(&render(&html)) > 1);
    }

    #[test]
    fn test_head_and_style_are_not_rendered() {
        let pdf = render(
            "<html><head><title>hidden title</title><style>p { color: red; }</style></head>\
             <body><p>shown</p></body></html>",
        );
        assert!(!contains(&pdf, b"hidden title"));
        assert!(!contains(&pdf, b"color: red"));
        assert!(contains(&pdf, b"(shown) Tj"));
    }

    #[test]
    fn test_entities_are_decoded() {
        let pdf = render("<p>&lt;script&gt; &amp; caf&#233;&nbsp;x</p>");
        assert!(contains(&pdf, b"<script> & caf\xe9\xa0x"));
    }

    #[test]
    fn test_tables_draw_cell_borders() {
        let pdf = render("<table><tr><td><p>A1</p></td><td>B1</td></tr></table>");
        assert!(contains(&pdf, b"(A1) Tj"));
        assert!(contains(&pdf, b"(B1) Tj"));
        assert!(contains(&pdf, b" re"));
    }

    #[test]
    fn test_images_become_xobjects() {
        let img = image::RgbImage::from_pixel(8, 8, image::Rgb([0, 128, 255]));
        let mut png = std::io::Cursor::new(Vec::new());
        img.write_to(&mut png, image::ImageFormat::Png).unwrap();
        let src = format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(png.into_inner())
        );
        let pdf = render(&format!("<body><img src=\"{}\" alt=\"\"/></body>", src));
        assert!(contains(&pdf, b"/Im1 Do"));
        assert!(contains(&pdf, b"/Image"));
    }

    #[test]
    fn test_images_inside_table_cells_are_drawn() {
        let img = image::RgbImage::from_pixel(2000, 100, image::Rgb([0, 128, 255]));
        let mut png = std::io::Cursor::new(Vec::new());
        img.write_to(&mut png, image::ImageFormat::Png).unwrap();
        let src = format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(png.into_inner())
        );
        let pdf = render(&format!(
            "<table><tr><td><p>A1</p><p><img src=\"{}\" alt=\"\"/></p></td><td>B1</td></tr></table>",
            src
        ));
        assert!(contains(&pdf, b"(A1) Tj"));
        assert!(contains(&pdf, b"/Im1 Do"));
        assert!(contains(&pdf, b"/Image"));

        // Scaled to the cell: half the content width minus padding.
        let column = CONTENT_WIDTH / 2.0 - 2.0 * CELL_PADDING;
        let mut doc = Document::with_version("1.5");
        let mut layout = Layout::new(&mut doc);
        let placed = layout.prepare_image(&src, column, CONTENT_TOP).unwrap();
        assert!((placed.width - column).abs() < 0.01);
        assert!(placed.height < 100.0 * PX_TO_PT);
    }

    #[test]
    fn test_undecodable_image_is_skipped() {
        let pdf = render("<body><img src=\"data:image/png;base64,AAAA\"/><p>after</p></body>");
        assert!(!contains(&pdf, b"/Im1 Do"));
        assert!(contains(&pdf, b"(after) Tj"));
    }

    #[test]
    fn test_malformed_markup_is_rejected() {
        let result = PdfRenderer::new().render("<p>unclosed <b>bold</p>");
        assert!(matches!(result, Err(ConversionError::Markup(_))));
    }

    #[test]
    fn test_wrap_breaks_long_lines() {
        let span = Span {
            text: "word ".repeat(100),
            style: FontStyle::default(),
            underline: false,
        };
        let lines = wrap(&[Piece::Text(span)], 200.0, 11.0);
        assert!(lines.len() > 1);
        for line in &lines {
            let end = line.iter().map(|f| f.x + f.width).fold(0.0f32, f32::max);
            assert!(end <= 200.0 + 0.01);
        }
    }

    #[test]
    fn test_wrap_splits_oversized_words() {
        let span = Span {
            text: "x".repeat(500),
            style: FontStyle::default(),
            underline: false,
        };
        let lines = wrap(&[Piece::Text(span)], 100.0, 10.0);
        assert!(lines.len() > 1);
        let total: usize = lines.iter().flatten().map(|f| f.text.len()).sum();
        assert_eq!(total, 500);
    }

    #[test]
    fn test_win_ansi_encoding() {
        assert_eq!(to_win_ansi("a\u{2022}\u{e9}\u{4e2d}"), vec![b'a', 0x95, 0xe9, b'?']);
    }
}
