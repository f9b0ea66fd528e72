//! Content-stream interpretation.
//!
//! Walks the operators of a page content stream, tracking the graphics state
//! stack and the text matrices, and records two things: positioned text spans
//! and the placement of every XObject drawn with `Do`. Coordinates come out
//! top-down relative to the page MediaBox.

use std::collections::BTreeMap;

use lopdf::{content::Content, Dictionary, Document as LopdfDocument, Object, ObjectId};

use crate::error::{Error, Result};
use crate::model::{BBox, TextSpan};

/// Nested form XObjects deeper than this are not entered.
const MAX_FORM_DEPTH: usize = 4;

/// Text adjustment (thousandths of text space) treated as a word break in `TJ`.
const TJ_SPACE_THRESHOLD: f32 = 200.0;

/// Average glyph advance as a fraction of the font size.
const GLYPH_ADVANCE: f32 = 0.5;

/// Where an image XObject was drawn on the page.
#[derive(Debug, Clone)]
pub(crate) struct ImagePlacement {
    /// The image stream
    pub id: ObjectId,
    /// Placement, top-down page coordinates
    pub bbox: BBox,
}

/// Everything the interpreter found on one page.
#[derive(Debug, Default)]
pub(crate) struct PageContent {
    pub spans: Vec<TextSpan>,
    pub placements: Vec<ImagePlacement>,
}

/// Affine transform `[a b c d e f]` as used by `cm` and `Tm`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }
}

impl Matrix {
    pub(crate) fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    fn translation(tx: f32, ty: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    fn from_operands(operands: &[Object]) -> Option<Self> {
        if operands.len() < 6 {
            return None;
        }
        let n: Vec<f32> = operands[..6].iter().map(get_number).collect::<Option<_>>()?;
        Some(Self::new(n[0], n[1], n[2], n[3], n[4], n[5]))
    }

    /// `self` applied first, then `other`.
    pub(crate) fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    pub(crate) fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (self.a * x + self.c * y + self.e, self.b * x + self.d * y + self.f)
    }

    fn vertical_scale(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }

    /// Bounds of the unit square under this transform.
    pub(crate) fn unit_square_bounds(&self) -> (f32, f32, f32, f32) {
        let corners = [
            self.apply(0.0, 0.0),
            self.apply(1.0, 0.0),
            self.apply(0.0, 1.0),
            self.apply(1.0, 1.0),
        ];
        corners.iter().fold(
            (f32::MAX, f32::MAX, f32::MIN, f32::MIN),
            |(x0, y0, x1, y1), &(x, y)| (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        )
    }
}

#[derive(Debug, Clone)]
struct TextState {
    font_resource: Vec<u8>,
    font_name: String,
    font_size: f32,
    leading: f32,
    tm: Matrix,
    tlm: Matrix,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font_resource: Vec::new(),
            font_name: String::new(),
            font_size: 12.0,
            leading: 0.0,
            tm: Matrix::default(),
            tlm: Matrix::default(),
        }
    }
}

impl TextState {
    fn move_line(&mut self, tx: f32, ty: f32) {
        self.tlm = Matrix::translation(tx, ty).then(&self.tlm);
        self.tm = self.tlm;
    }

    fn next_line(&mut self) {
        self.move_line(0.0, -self.leading);
    }
}

/// Interprets the content streams of one page.
pub(crate) struct ContentInterpreter<'a> {
    doc: &'a LopdfDocument,
    fonts: BTreeMap<Vec<u8>, &'a Dictionary>,
    /// MediaBox left edge
    origin_x: f32,
    /// MediaBox top edge
    top: f32,
}

impl<'a> ContentInterpreter<'a> {
    pub(crate) fn new(
        doc: &'a LopdfDocument,
        fonts: BTreeMap<Vec<u8>, &'a Dictionary>,
        origin_x: f32,
        top: f32,
    ) -> Self {
        Self {
            doc,
            fonts,
            origin_x,
            top,
        }
    }

    /// Interpret a decoded content stream with the given XObject resources.
    pub(crate) fn run(&self, content: &[u8], xobjects: Option<&Dictionary>) -> Result<PageContent> {
        let mut out = PageContent::default();
        self.interpret(content, xobjects, Matrix::default(), 0, &mut out)?;
        Ok(out)
    }

    fn interpret(
        &self,
        content: &[u8],
        xobjects: Option<&Dictionary>,
        base_ctm: Matrix,
        depth: usize,
        out: &mut PageContent,
    ) -> Result<()> {
        let content = Content::decode(content).map_err(|e| Error::PdfParse(e.to_string()))?;

        let mut ctm = base_ctm;
        let mut stack: Vec<Matrix> = Vec::new();
        let mut ts = TextState::default();
        let mut in_text = false;

        for op in content.operations {
            match op.operator.as_str() {
                "q" => stack.push(ctm),
                "Q" => {
                    if let Some(saved) = stack.pop() {
                        ctm = saved;
                    }
                }
                "cm" => {
                    if let Some(m) = Matrix::from_operands(&op.operands) {
                        ctm = m.then(&ctm);
                    }
                }
                "BT" => {
                    in_text = true;
                    ts.tm = Matrix::default();
                    ts.tlm = Matrix::default();
                }
                "ET" => in_text = false,
                "Tf" => {
                    if op.operands.len() >= 2 {
                        if let Object::Name(name) = &op.operands[0] {
                            ts.font_name = self.base_font(name);
                            ts.font_resource = name.clone();
                        }
                        ts.font_size = get_number(&op.operands[1]).unwrap_or(12.0);
                    }
                }
                "TL" => {
                    if let Some(l) = op.operands.first().and_then(get_number) {
                        ts.leading = l;
                    }
                }
                "Td" | "TD" => {
                    if op.operands.len() >= 2 {
                        let tx = get_number(&op.operands[0]).unwrap_or(0.0);
                        let ty = get_number(&op.operands[1]).unwrap_or(0.0);
                        if op.operator == "TD" {
                            ts.leading = -ty;
                        }
                        ts.move_line(tx, ty);
                    }
                }
                "Tm" => {
                    if let Some(m) = Matrix::from_operands(&op.operands) {
                        ts.tm = m;
                        ts.tlm = m;
                    }
                }
                "T*" => ts.next_line(),
                "Tj" | "TJ" | "'" | "\"" => {
                    if matches!(op.operator.as_str(), "'" | "\"") {
                        ts.next_line();
                    }
                    if !in_text {
                        continue;
                    }
                    let text = match op.operator.as_str() {
                        "TJ" => self.decode_array(&ts.font_resource, op.operands.first()),
                        "\"" => self.decode_operand(&ts.font_resource, op.operands.get(2)),
                        _ => self.decode_operand(&ts.font_resource, op.operands.first()),
                    };
                    self.emit_span(text, &mut ts, &ctm, out);
                }
                "Do" => {
                    let Some(Object::Name(name)) = op.operands.first() else {
                        continue;
                    };
                    self.draw_xobject(name, xobjects, &ctm, depth, out)?;
                }
                _ => {}
            }
        }

        Ok(())
    }

    fn emit_span(&self, text: String, ts: &mut TextState, ctm: &Matrix, out: &mut PageContent) {
        let glyphs = text.chars().count() as f32;
        let advance = glyphs * ts.font_size * GLYPH_ADVANCE;

        if !text.trim().is_empty() {
            let trm = ts.tm.then(ctm);
            let (x, y) = trm.apply(0.0, 0.0);
            let size = ts.font_size * trm.vertical_scale();
            let width = advance * trm.a.hypot(trm.b);

            // Ascender/descender approximated from the size.
            let bbox = BBox::new(
                x - self.origin_x,
                self.top - (y + size * 0.8),
                x - self.origin_x + width,
                self.top - (y - size * 0.2),
            );
            out.spans.push(TextSpan::new(text, size, ts.font_name.clone(), bbox));
        }

        ts.tm = Matrix::translation(advance, 0.0).then(&ts.tm);
    }

    fn draw_xobject(
        &self,
        name: &[u8],
        xobjects: Option<&Dictionary>,
        ctm: &Matrix,
        depth: usize,
        out: &mut PageContent,
    ) -> Result<()> {
        let Some(id) = xobjects
            .and_then(|d| d.get(name).ok())
            .and_then(|o| o.as_reference().ok())
        else {
            log::debug!("XObject {} not found in resources", String::from_utf8_lossy(name));
            return Ok(());
        };

        let Ok(Object::Stream(stream)) = self.doc.get_object(id) else {
            return Ok(());
        };

        match stream.dict.get(b"Subtype").and_then(|s| s.as_name()) {
            Ok(b"Image") => {
                let (x0, y0, x1, y1) = ctm.unit_square_bounds();
                out.placements.push(ImagePlacement {
                    id,
                    bbox: BBox::new(
                        x0 - self.origin_x,
                        self.top - y1,
                        x1 - self.origin_x,
                        self.top - y0,
                    ),
                });
            }
            Ok(b"Form") if depth < MAX_FORM_DEPTH => {
                let form_matrix = stream
                    .dict
                    .get(b"Matrix")
                    .and_then(|m| m.as_array())
                    .ok()
                    .and_then(|a| Matrix::from_operands(a))
                    .unwrap_or_default();
                let form_xobjects = stream
                    .dict
                    .get(b"Resources")
                    .ok()
                    .and_then(|r| resolve_dict(self.doc, r))
                    .and_then(|r| r.get(b"XObject").ok())
                    .and_then(|x| resolve_dict(self.doc, x))
                    .or(xobjects);
                let data = if stream.dict.has(b"Filter") {
                    stream.decompressed_content()?
                } else {
                    stream.content.clone()
                };
                self.interpret(&data, form_xobjects, form_matrix.then(ctm), depth + 1, out)?;
            }
            _ => {}
        }

        Ok(())
    }

    fn base_font(&self, resource: &[u8]) -> String {
        self.fonts
            .get(resource)
            .and_then(|f| f.get(b"BaseFont").ok())
            .and_then(|o| o.as_name().ok())
            .map(|n| String::from_utf8_lossy(n).to_string())
            .unwrap_or_else(|| String::from_utf8_lossy(resource).to_string())
    }

    fn decode(&self, font: &[u8], bytes: &[u8]) -> String {
        let encoding = self
            .fonts
            .get(font)
            .and_then(|f| f.get_font_encoding(self.doc).ok());
        match encoding {
            Some(ref enc) => LopdfDocument::decode_text(enc, bytes)
                .unwrap_or_else(|_| decode_text_simple(bytes)),
            None => decode_text_simple(bytes),
        }
    }

    fn decode_operand(&self, font: &[u8], operand: Option<&Object>) -> String {
        match operand {
            Some(Object::String(bytes, _)) => self.decode(font, bytes),
            _ => String::new(),
        }
    }

    fn decode_array(&self, font: &[u8], operand: Option<&Object>) -> String {
        let Some(Object::Array(items)) = operand else {
            return String::new();
        };

        let mut combined = String::new();
        for item in items {
            match item {
                Object::String(bytes, _) => combined.push_str(&self.decode(font, bytes)),
                other => {
                    // Large negative adjustments are word breaks.
                    let adjustment = get_number(other).map(|n| -n).unwrap_or(0.0);
                    if adjustment > TJ_SPACE_THRESHOLD
                        && !combined.is_empty()
                        && !combined.ends_with(char::is_whitespace)
                    {
                        combined.push(' ');
                    }
                }
            }
        }
        combined
    }
}

/// Follow a reference to a dictionary, or take an inline one.
pub(crate) fn resolve_dict<'d>(doc: &'d LopdfDocument, obj: &'d Object) -> Option<&'d Dictionary> {
    match obj {
        Object::Reference(r) => doc.get_dictionary(*r).ok(),
        Object::Dictionary(d) => Some(d),
        _ => None,
    }
}

/// Helper to extract number from PDF object.
pub(crate) fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Decode PDF string bytes without a font encoding.
pub(crate) fn decode_text_simple(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    // Latin-1
    bytes.iter().map(|&b| b as char).collect()
}
