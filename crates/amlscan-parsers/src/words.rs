//! Positioned word extraction from PDF text layers.
//!
//! The spatial parser never works on raw text lines: every text element is
//! extracted with its bounding box so multi-line table cells can be
//! reassembled by coordinates. Glyph metrics are approximated from the
//! current font size; column assembly tolerances absorb the error.

use std::path::Path;

use amlscan_core::{AmlError, AmlResult};
use lopdf::content::Content;
use lopdf::{Document, Object};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Average glyph width as a fraction of the font size.
const GLYPH_WIDTH_FACTOR: f64 = 0.5;

/// A text element with its position on the page.
///
/// Coordinates use the top-left origin convention: `top` grows downward,
/// so "below the header" means a larger `top` value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordBox {
    pub text: String,
    pub x0: f64,
    pub x1: f64,
    pub top: f64,
    pub bottom: f64,
    pub page: usize,
}

impl WordBox {
    /// Horizontal center.
    pub fn cx(&self) -> f64 {
        (self.x0 + self.x1) / 2.0
    }

    /// Vertical center.
    pub fn cy(&self) -> f64 {
        (self.top + self.bottom) / 2.0
    }
}

/// Extracted data for a single page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageData {
    pub page_num: usize,
    pub width: f64,
    pub height: f64,
    pub words: Vec<WordBox>,
}

impl PageData {
    /// Total characters of text on the page.
    pub fn char_count(&self) -> usize {
        self.words.iter().map(|w| w.text.chars().count()).sum()
    }
}

/// Load a PDF file and extract positioned words from every page.
pub fn extract_words(path: &Path) -> AmlResult<Vec<PageData>> {
    let doc = Document::load(path)
        .map_err(|e| AmlError::unsupported(format!("cannot open PDF: {e}")))?;
    extract_words_from_doc(&doc)
}

/// Extract positioned words from in-memory PDF bytes.
pub fn extract_words_from_bytes(bytes: &[u8]) -> AmlResult<Vec<PageData>> {
    let doc = Document::load_mem(bytes)
        .map_err(|e| AmlError::unsupported(format!("cannot open PDF: {e}")))?;
    extract_words_from_doc(&doc)
}

fn extract_words_from_doc(doc: &Document) -> AmlResult<Vec<PageData>> {
    let mut pages = Vec::new();

    for (page_index, (_, page_id)) in doc.get_pages().into_iter().enumerate() {
        let (width, height) = page_media_box(doc, page_id);
        let content_bytes = doc
            .get_page_content(page_id)
            .map_err(|e| AmlError::unsupported(format!("page content: {e}")))?;
        let content = Content::decode(&content_bytes)
            .map_err(|e| AmlError::unsupported(format!("content stream: {e}")))?;

        let fonts = doc.get_page_fonts(page_id);
        let mut words = Vec::new();
        let mut state = TextState::default();

        for op in &content.operations {
            match op.operator.as_str() {
                "BT" => state.begin_text(),
                "Tf" => {
                    if let Some(Object::Name(name)) = op.operands.first() {
                        state.encoding = fonts
                            .get(name)
                            .map(|font| font.get_font_encoding().to_string());
                    }
                    if let Some(size) = op.operands.get(1).and_then(as_f64) {
                        state.font_size = size;
                    }
                }
                "TL" => {
                    if let Some(leading) = op.operands.first().and_then(as_f64) {
                        state.leading = leading;
                    }
                }
                "Td" => {
                    let tx = op.operands.first().and_then(as_f64).unwrap_or(0.0);
                    let ty = op.operands.get(1).and_then(as_f64).unwrap_or(0.0);
                    state.translate_line(tx, ty);
                }
                "TD" => {
                    let tx = op.operands.first().and_then(as_f64).unwrap_or(0.0);
                    let ty = op.operands.get(1).and_then(as_f64).unwrap_or(0.0);
                    state.leading = -ty;
                    state.translate_line(tx, ty);
                }
                "Tm" => {
                    let vals: Vec<f64> = op.operands.iter().filter_map(as_f64).collect();
                    if vals.len() == 6 {
                        state.set_matrix(vals[4], vals[5]);
                    }
                }
                "T*" => state.next_line(),
                "Tj" => {
                    if let Some(Object::String(bytes, _)) = op.operands.first() {
                        state.show_text(bytes, height, page_index, &mut words);
                    }
                }
                "'" => {
                    state.next_line();
                    if let Some(Object::String(bytes, _)) = op.operands.first() {
                        state.show_text(bytes, height, page_index, &mut words);
                    }
                }
                "\"" => {
                    state.next_line();
                    if let Some(Object::String(bytes, _)) = op.operands.get(2) {
                        state.show_text(bytes, height, page_index, &mut words);
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(items)) = op.operands.first() {
                        for item in items {
                            match item {
                                Object::String(bytes, _) => {
                                    state.show_text(bytes, height, page_index, &mut words);
                                }
                                other => {
                                    if let Some(adjust) = as_f64(other) {
                                        // Kerning adjustment, thousandths of em.
                                        state.x -= adjust / 1000.0 * state.font_size;
                                    }
                                }
                            }
                        }
                    }
                }
                "ET" => {}
                _ => {}
            }
        }

        debug!(page = page_index, words = words.len(), "extracted page words");
        pages.push(PageData {
            page_num: page_index,
            width,
            height,
            words,
        });
    }

    Ok(pages)
}

fn as_f64(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

fn page_media_box(doc: &Document, page_id: lopdf::ObjectId) -> (f64, f64) {
    // A4 portrait fallback when the media box is absent or inherited oddly.
    let fallback = (595.0, 842.0);
    let Ok(dict) = doc.get_dictionary(page_id) else {
        return fallback;
    };
    let Ok(media_box) = dict.get(b"MediaBox") else {
        return fallback;
    };
    let Ok(values) = media_box.as_array() else {
        return fallback;
    };
    let nums: Vec<f64> = values.iter().filter_map(as_f64).collect();
    if nums.len() == 4 {
        ((nums[2] - nums[0]).abs(), (nums[3] - nums[1]).abs())
    } else {
        fallback
    }
}

/// Text positioning state for one page's content stream.
struct TextState {
    /// Current pen position in PDF user space (bottom-left origin).
    x: f64,
    y: f64,
    /// Start of the current text line.
    line_x: f64,
    line_y: f64,
    font_size: f64,
    leading: f64,
    encoding: Option<String>,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            line_x: 0.0,
            line_y: 0.0,
            font_size: 10.0,
            leading: 12.0,
            encoding: None,
        }
    }
}

impl TextState {
    fn begin_text(&mut self) {
        self.x = 0.0;
        self.y = 0.0;
        self.line_x = 0.0;
        self.line_y = 0.0;
    }

    fn translate_line(&mut self, tx: f64, ty: f64) {
        self.line_x += tx;
        self.line_y += ty;
        self.x = self.line_x;
        self.y = self.line_y;
    }

    /// Set the text matrix translation. Scale/rotation components are
    /// ignored; bank statements are axis-aligned.
    fn set_matrix(&mut self, e: f64, f: f64) {
        self.line_x = e;
        self.line_y = f;
        self.x = e;
        self.y = f;
    }

    fn next_line(&mut self) {
        self.line_y -= self.leading.max(self.font_size);
        self.x = self.line_x;
        self.y = self.line_y;
    }

    /// Emit words for a shown string, advancing the pen.
    fn show_text(
        &mut self,
        bytes: &[u8],
        page_height: f64,
        page: usize,
        words: &mut Vec<WordBox>,
    ) {
        let text = Document::decode_text(self.encoding.as_deref(), bytes);
        if text.is_empty() {
            return;
        }
        let glyph = self.font_size * GLYPH_WIDTH_FACTOR;

        for segment in split_keeping_offsets(&text) {
            match segment {
                Segment::Space(len) => {
                    self.x += glyph * len as f64;
                }
                Segment::Word(word) => {
                    let width = glyph * word.chars().count() as f64;
                    let top = page_height - self.y - self.font_size;
                    words.push(WordBox {
                        text: word.to_string(),
                        x0: self.x,
                        x1: self.x + width,
                        top,
                        bottom: top + self.font_size,
                        page,
                    });
                    self.x += width;
                }
            }
        }
    }
}

enum Segment<'a> {
    Word(&'a str),
    Space(usize),
}

/// Split a string into word and whitespace runs, preserving order.
fn split_keeping_offsets(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut in_space = None::<bool>;
    for (i, c) in text.char_indices() {
        let is_space = c.is_whitespace();
        match in_space {
            None => in_space = Some(is_space),
            Some(prev) if prev != is_space => {
                let chunk = &text[start..i];
                if prev {
                    segments.push(Segment::Space(chunk.chars().count()));
                } else {
                    segments.push(Segment::Word(chunk));
                }
                start = i;
                in_space = Some(is_space);
            }
            _ => {}
        }
    }
    if start < text.len() {
        let chunk = &text[start..];
        match in_space {
            Some(true) => segments.push(Segment::Space(chunk.chars().count())),
            _ => segments.push(Segment::Word(chunk)),
        }
    }
    segments
}
