//! A4 layout writer on top of lopdf.
//!
//! Generators describe a document as a list of [`Block`]s; the writer flows
//! them onto pages, wraps long lines and starts new pages as needed. Every
//! visual line is its own text object so that text extraction reads the
//! output back line by line. Table cells on one line are separated by
//! spaces in the text layer.

use anyhow::{Context, Result};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};

pub const PAGE_WIDTH: f32 = 595.28;
pub const PAGE_HEIGHT: f32 = 841.89;
const MARGIN: f32 = 50.0;
const FOOTER_SPACE: f32 = 30.0;
const CELL_PADDING: f32 = 4.0;
const LINE_FACTOR: f32 = 1.3;
/// Spaces written in front of a table cell so extracted text keeps columns apart
const CELL_GAP: &str = "   ";

const REGULAR: &str = "F1";
const BOLD: &str = "F2";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub size: f32,
    pub bold: bool,
    pub align: Align,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Relative column widths
    pub columns: Vec<f32>,
    pub header: Option<Vec<String>>,
    pub rows: Vec<Vec<String>>,
    pub bold_first_column: bool,
    pub size: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Text { text: String, style: TextStyle },
    Table(Table),
    Spacer(f32),
    Rule,
    PageBreak,
}

impl Block {
    pub fn title(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            style: TextStyle { size: 16.0, bold: true, align: Align::Center },
        }
    }

    pub fn centered(text: impl Into<String>, size: f32, bold: bool) -> Self {
        Self::Text {
            text: text.into(),
            style: TextStyle { size, bold, align: Align::Center },
        }
    }

    pub fn heading(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            style: TextStyle { size: 11.0, bold: true, align: Align::Left },
        }
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            style: TextStyle { size: 9.5, bold: false, align: Align::Left },
        }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            style: TextStyle { size: 9.5, bold: true, align: Align::Left },
        }
    }

    pub fn table(columns: Vec<f32>, header: Option<Vec<String>>, rows: Vec<Vec<String>>) -> Self {
        Self::Table(Table {
            columns,
            header,
            rows,
            bold_first_column: false,
            size: 9.0,
        })
    }

    /// Two-column label/value grid
    pub fn key_values<L, V>(rows: impl IntoIterator<Item = (L, V)>) -> Self
    where
        L: Into<String>,
        V: Into<String>,
    {
        Self::Table(Table {
            columns: vec![0.35, 0.65],
            header: None,
            rows: rows
                .into_iter()
                .map(|(label, value)| vec![label.into(), value.into()])
                .collect(),
            bold_first_column: true,
            size: 9.0,
        })
    }
}

/// Render blocks into a complete PDF file.
pub fn render_document(blocks: &[Block]) -> Result<Vec<u8>> {
    let mut writer = LayoutWriter::new();
    for block in blocks {
        writer.push(block);
    }
    writer.finish()
}

struct LayoutWriter {
    pages: Vec<Vec<Operation>>,
    y: f32,
}

impl LayoutWriter {
    fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn content_width() -> f32 {
        PAGE_WIDTH - 2.0 * MARGIN
    }

    fn bottom() -> f32 {
        MARGIN + FOOTER_SPACE
    }

    fn ops(&mut self) -> &mut Vec<Operation> {
        if self.pages.is_empty() {
            self.pages.push(Vec::new());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn new_page(&mut self) {
        self.pages.push(Vec::new());
        self.y = PAGE_HEIGHT - MARGIN;
    }

    fn ensure_space(&mut self, height: f32) {
        let page_is_fresh = self.y >= PAGE_HEIGHT - MARGIN;
        if self.y - height < Self::bottom() && !page_is_fresh {
            self.new_page();
        }
    }

    fn push(&mut self, block: &Block) {
        match block {
            Block::Text { text, style } => self.push_text(text, *style),
            Block::Table(table) => self.push_table(table),
            Block::Spacer(height) => {
                self.y -= height;
                if self.y < Self::bottom() {
                    self.new_page();
                }
            }
            Block::Rule => {
                self.ensure_space(6.0);
                let y = self.y - 3.0;
                self.ops().extend(line_ops(MARGIN, y, PAGE_WIDTH - MARGIN, y, 0.8));
                self.y -= 6.0;
            }
            Block::PageBreak => self.new_page(),
        }
    }

    fn push_text(&mut self, text: &str, style: TextStyle) {
        let line_height = style.size * LINE_FACTOR;
        for line in wrap_text(text, Self::content_width(), style.size, style.bold) {
            self.ensure_space(line_height);
            self.y -= line_height;
            let x = match style.align {
                Align::Left => MARGIN,
                Align::Center => {
                    let width = text_width(&line, style.size, style.bold);
                    MARGIN + ((Self::content_width() - width) / 2.0).max(0.0)
                }
            };
            let y = self.y + line_height - style.size;
            let font = if style.bold { BOLD } else { REGULAR };
            self.ops().extend(text_ops(&[(x, line.as_str(), font)], y, style.size));
        }
    }

    fn push_table(&mut self, table: &Table) {
        let total: f32 = table.columns.iter().sum();
        if total <= 0.0 || table.columns.is_empty() {
            return;
        }
        let widths: Vec<f32> = table
            .columns
            .iter()
            .map(|weight| weight / total * Self::content_width())
            .collect();

        if let Some(header) = &table.header {
            self.push_row(header, &widths, table.size, true, false);
        }
        for row in &table.rows {
            self.push_row(row, &widths, table.size, false, table.bold_first_column);
        }
        self.y -= 4.0;
    }

    fn push_row(&mut self, cells: &[String], widths: &[f32], size: f32, header: bool, bold_first: bool) {
        let line_height = size * LINE_FACTOR;
        let wrapped: Vec<(Vec<String>, bool)> = widths
            .iter()
            .enumerate()
            .map(|(i, width)| {
                let bold = header || (bold_first && i == 0);
                let text = cells.get(i).map(String::as_str).unwrap_or("");
                (wrap_text(text, width - 2.0 * CELL_PADDING, size, bold), bold)
            })
            .collect();

        let line_count = wrapped.iter().map(|(lines, _)| lines.len()).max().unwrap_or(1).max(1);
        let row_height = line_count as f32 * line_height + 2.0 * CELL_PADDING;
        self.ensure_space(row_height);

        let top = self.y;
        let mut x = MARGIN;
        let mut borders = Vec::new();
        for width in widths {
            borders.extend(rect_ops(x, top - row_height, *width, row_height));
            x += width;
        }
        self.ops().extend(borders);

        for line_index in 0..line_count {
            let baseline = top - CELL_PADDING - (line_index as f32 + 1.0) * line_height + (line_height - size);
            let mut segments = Vec::new();
            let mut cell_x = MARGIN;
            for ((lines, bold), width) in wrapped.iter().zip(widths) {
                if let Some(line) = lines.get(line_index).filter(|line| !line.is_empty()) {
                    let font = if *bold { BOLD } else { REGULAR };
                    segments.push((cell_x + CELL_PADDING, line.as_str(), font));
                }
                cell_x += width;
            }
            if !segments.is_empty() {
                self.ops().extend(text_ops(&segments, baseline, size));
            }
        }

        self.y -= row_height;
    }

    fn finish(mut self) -> Result<Vec<u8>> {
        if self.pages.last().is_some_and(|ops| ops.is_empty()) && self.pages.len() > 1 {
            self.pages.pop();
        }

        let page_count = self.pages.len();
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let regular_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let bold_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                REGULAR => regular_id,
                BOLD => bold_id,
            },
        });

        let mut kids: Vec<Object> = Vec::with_capacity(page_count);
        for (index, mut operations) in self.pages.into_iter().enumerate() {
            let footer = format!("Page {} of {}", index + 1, page_count);
            let width = text_width(&footer, 8.0, false);
            operations.extend(text_ops(&[((PAGE_WIDTH - width) / 2.0, footer.as_str(), REGULAR)], MARGIN / 2.0, 8.0));

            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(
                dictionary! {},
                content.encode().context("Failed to encode page content")?,
            ));
            let page_id: ObjectId = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
                "Resources" => resources_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => page_count as i64,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).context("Failed to write PDF")?;
        Ok(buffer)
    }
}

/// One text object holding every segment of a visual line.
fn text_ops(segments: &[(f32, &str, &str)], baseline: f32, size: f32) -> Vec<Operation> {
    let mut ops = vec![Operation::new("BT", vec![])];
    for (index, (x, text, font)) in segments.iter().enumerate() {
        let (x, text) = if index == 0 {
            (*x, text.to_string())
        } else {
            // Shift left by the gap so the visible text still starts at x
            (x - text_width(CELL_GAP, size, false), format!("{}{}", CELL_GAP, text))
        };
        ops.push(Operation::new("Tf", vec![Object::Name(font.as_bytes().to_vec()), size.into()]));
        ops.push(Operation::new(
            "Tm",
            vec![1.into(), 0.into(), 0.into(), 1.into(), x.into(), baseline.into()],
        ));
        ops.push(Operation::new(
            "Tj",
            vec![Object::String(to_win_ansi(&text), StringFormat::Literal)],
        ));
    }
    ops.push(Operation::new("ET", vec![]));
    ops
}

fn line_ops(x1: f32, y1: f32, x2: f32, y2: f32, width: f32) -> Vec<Operation> {
    vec![
        Operation::new("w", vec![width.into()]),
        Operation::new("m", vec![x1.into(), y1.into()]),
        Operation::new("l", vec![x2.into(), y2.into()]),
        Operation::new("S", vec![]),
    ]
}

fn rect_ops(x: f32, y: f32, width: f32, height: f32) -> Vec<Operation> {
    vec![
        Operation::new("w", vec![0.5.into()]),
        Operation::new("re", vec![x.into(), y.into(), width.into(), height.into()]),
        Operation::new("S", vec![]),
    ]
}

/// Map text onto the WinAnsi code page used by the standard fonts.
///
/// The base-14 fonts carry no CJK glyphs. Characters outside WinAnsi (Chinese
/// supplier values or product names included) print as `?`, one per
/// character, with full-width punctuation folded to its ASCII form first.
pub fn to_win_ansi(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\t' => bytes.push(b' '),
            ' '..='~' => bytes.push(c as u8),
            '\u{a0}'..='\u{ff}' => bytes.push(c as u32 as u8),
            '≥' => bytes.extend_from_slice(b">="),
            '≤' => bytes.extend_from_slice(b"<="),
            '–' => bytes.push(0x96),
            '—' => bytes.push(0x97),
            '‘' => bytes.push(0x91),
            '’' => bytes.push(0x92),
            '“' => bytes.push(0x93),
            '”' => bytes.push(0x94),
            '•' => bytes.push(0x95),
            '€' => bytes.push(0x80),
            'μ' => bytes.push(0xb5),
            '～' | '〜' => bytes.push(b'~'),
            '：' => bytes.push(b':'),
            '（' => bytes.push(b'('),
            '）' => bytes.push(b')'),
            '％' => bytes.push(b'%'),
            '，' => bytes.push(b','),
            _ => bytes.push(b'?'),
        }
    }
    bytes
}

/// Approximate Helvetica advance widths in 1/1000 em.
fn glyph_width(byte: u8, bold: bool) -> f32 {
    let base = match byte {
        b' ' | b'!' | b'.' | b',' | b':' | b';' | b'i' | b'j' | b'l' | b'I' | b'|' | b'\'' => 278.0,
        b'f' | b't' | b'r' | b'(' | b')' | b'[' | b']' | b'/' | b'-' => 333.0,
        b'0'..=b'9' | b'a'..=b'e' | b'g' | b'h' | b'k' | b'n'..=b'q' | b's' | b'u' | b'v' | b'x'..=b'z' => 556.0,
        b'm' | b'M' => 833.0,
        b'w' | b'W' => 944.0,
        b'A'..=b'Z' => 690.0,
        b'%' => 889.0,
        _ => 600.0,
    };
    if bold {
        base * 1.06
    } else {
        base
    }
}

pub fn text_width(text: &str, size: f32, bold: bool) -> f32 {
    to_win_ansi(text)
        .into_iter()
        .map(|byte| glyph_width(byte, bold))
        .sum::<f32>()
        * size
        / 1000.0
}

/// Greedy word wrap. Words longer than the line are split by character.
pub fn wrap_text(text: &str, max_width: f32, size: f32, bold: bool) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", current, word)
            };

            if text_width(&candidate, size, bold) <= max_width {
                current = candidate;
                continue;
            }

            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }

            if text_width(word, size, bold) <= max_width {
                current = word.to_string();
            } else {
                for c in word.chars() {
                    current.push(c);
                    if text_width(&current, size, bold) > max_width && current.chars().count() > 1 {
                        current.pop();
                        lines.push(std::mem::take(&mut current));
                        current.push(c);
                    }
                }
            }
        }
        lines.push(current);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
