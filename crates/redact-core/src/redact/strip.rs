//! Content stream rewriting
//!
//! Walks a page's operations while tracking the graphics and text state,
//! drops every glyph whose box intersects a strip region and replaces it with
//! a `TJ` offset of the same advance, so the remaining text does not move.

use lopdf::content::Operation;
use lopdf::{Object, StringFormat};

use super::fonts::{FontMetrics, FontTable};
use crate::coords::OutputRect;
use crate::page::as_number;

/// Glyph box in text space, as fractions of the font size
const DESCENT: f64 = -0.2;
const ASCENT: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Matrix {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    e: f64,
    f: f64,
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    fn translate(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// `self × other` in PDF's row-vector convention
    fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            x * self.a + y * self.c + self.e,
            x * self.b + y * self.d + self.f,
        )
    }

    fn from_operands(operands: &[Object]) -> Option<Matrix> {
        let values: Vec<f64> = operands.iter().filter_map(as_number).collect();
        match values.as_slice() {
            [a, b, c, d, e, f] => Some(Matrix::new(*a, *b, *c, *d, *e, *f)),
            _ => None,
        }
    }
}

/// Parameters saved and restored by `q` / `Q`
#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    font: Option<Vec<u8>>,
    font_size: f64,
    char_spacing: f64,
    word_spacing: f64,
    /// `Tz / 100`
    horizontal_scaling: f64,
    leading: f64,
    rise: f64,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: Matrix::IDENTITY,
            font: None,
            font_size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scaling: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

/// Result of rewriting one page
#[derive(Debug, Default)]
pub(crate) struct Rewritten {
    pub operations: Vec<Operation>,
    pub glyphs_removed: usize,
}

pub(crate) struct TextStripper<'a> {
    fonts: &'a FontTable,
    regions: &'a [OutputRect],
    state: GraphicsState,
    stack: Vec<GraphicsState>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    in_text: bool,
    glyphs_removed: usize,
}

impl<'a> TextStripper<'a> {
    pub fn new(fonts: &'a FontTable, regions: &'a [OutputRect]) -> Self {
        Self {
            fonts,
            regions,
            state: GraphicsState::default(),
            stack: Vec::new(),
            text_matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            in_text: false,
            glyphs_removed: 0,
        }
    }

    /// Rewrite the operations, leaving the graphics state balanced at the end
    /// so that anything appended afterwards draws in default user space.
    pub fn rewrite(mut self, operations: Vec<Operation>) -> Rewritten {
        let mut out = Vec::with_capacity(operations.len());

        for op in operations {
            let operator = op.operator.clone();
            match operator.as_str() {
                "q" => {
                    self.stack.push(self.state.clone());
                    out.push(op);
                }
                "Q" => {
                    // An unmatched Q would pop state we do not own
                    if let Some(saved) = self.stack.pop() {
                        self.state = saved;
                        out.push(op);
                    }
                }
                "cm" => {
                    if let Some(m) = Matrix::from_operands(&op.operands) {
                        self.state.ctm = m.then(&self.state.ctm);
                    }
                    out.push(op);
                }
                "BT" => {
                    self.in_text = true;
                    self.text_matrix = Matrix::IDENTITY;
                    self.line_matrix = Matrix::IDENTITY;
                    out.push(op);
                }
                "ET" => {
                    self.in_text = false;
                    out.push(op);
                }
                "Tf" => {
                    if let [name, size, ..] = op.operands.as_slice() {
                        self.state.font = name.as_name().ok().map(<[u8]>::to_vec);
                        self.state.font_size = as_number(size).unwrap_or(0.0);
                    }
                    out.push(op);
                }
                "Tc" => {
                    self.state.char_spacing = first_number(&op.operands);
                    out.push(op);
                }
                "Tw" => {
                    self.state.word_spacing = first_number(&op.operands);
                    out.push(op);
                }
                "Tz" => {
                    self.state.horizontal_scaling = first_number(&op.operands) / 100.0;
                    out.push(op);
                }
                "TL" => {
                    self.state.leading = first_number(&op.operands);
                    out.push(op);
                }
                "Ts" => {
                    self.state.rise = first_number(&op.operands);
                    out.push(op);
                }
                "Td" | "TD" => {
                    let values: Vec<f64> = op.operands.iter().filter_map(as_number).collect();
                    if let [tx, ty] = values.as_slice() {
                        if operator == "TD" {
                            self.state.leading = -ty;
                        }
                        self.move_line(*tx, *ty);
                    }
                    out.push(op);
                }
                "Tm" => {
                    if let Some(m) = Matrix::from_operands(&op.operands) {
                        self.text_matrix = m;
                        self.line_matrix = m;
                    }
                    out.push(op);
                }
                "T*" => {
                    self.next_line();
                    out.push(op);
                }
                "Tj" | "TJ" => {
                    let elements = match op.operands.first() {
                        Some(Object::Array(items)) => items.clone(),
                        Some(other) => vec![other.clone()],
                        None => Vec::new(),
                    };
                    match self.show(&elements) {
                        Some(replacement) => out.push(replacement),
                        None => out.push(op),
                    }
                }
                "'" => {
                    self.next_line();
                    match self.show(&op.operands) {
                        Some(replacement) => {
                            out.push(Operation::new("T*", vec![]));
                            out.push(replacement);
                        }
                        None => out.push(op),
                    }
                }
                "\"" => {
                    if let [aw, ac, text] = op.operands.as_slice() {
                        self.state.word_spacing = as_number(aw).unwrap_or(0.0);
                        self.state.char_spacing = as_number(ac).unwrap_or(0.0);
                        self.next_line();
                        match self.show(std::slice::from_ref(text)) {
                            Some(replacement) => {
                                out.push(Operation::new("Tw", vec![aw.clone()]));
                                out.push(Operation::new("Tc", vec![ac.clone()]));
                                out.push(Operation::new("T*", vec![]));
                                out.push(replacement);
                            }
                            None => out.push(op),
                        }
                    } else {
                        out.push(op);
                    }
                }
                _ => out.push(op),
            }
        }

        if self.in_text {
            out.push(Operation::new("ET", vec![]));
        }
        for _ in 0..self.stack.len() {
            out.push(Operation::new("Q", vec![]));
        }

        Rewritten {
            operations: out,
            glyphs_removed: self.glyphs_removed,
        }
    }

    fn move_line(&mut self, tx: f64, ty: f64) {
        self.line_matrix = Matrix::translate(tx, ty).then(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        self.move_line(0.0, -self.state.leading);
    }

    /// Advance through a shown string, returning a `TJ` replacement when at
    /// least one glyph was removed.
    fn show(&mut self, elements: &[Object]) -> Option<Operation> {
        let fonts = self.fonts;
        let font = fonts.get(self.state.font.as_deref());
        let mut rebuilt = TjBuilder::default();
        let mut removed_any = false;

        for element in elements {
            match element {
                Object::String(bytes, format) => {
                    for (code, range) in font.glyphs(bytes) {
                        let width = font.width(code);
                        let spacing = self.spacing_for(font, code);
                        if self.glyph_hits_region(width) {
                            removed_any = true;
                            self.glyphs_removed += 1;
                            rebuilt.offset(-self.offset_for(width, spacing));
                        } else {
                            rebuilt.text(&bytes[range], format.clone());
                        }
                        self.advance((width / 1000.0) * self.state.font_size + spacing);
                    }
                }
                other => {
                    if let Some(n) = as_number(other) {
                        rebuilt.offset(n);
                        self.advance(-n / 1000.0 * self.state.font_size);
                    }
                }
            }
        }

        removed_any.then(|| Operation::new("TJ", vec![Object::Array(rebuilt.finish())]))
    }

    fn spacing_for(&self, font: &FontMetrics, code: u32) -> f64 {
        let word = if !font.two_byte && code == 32 {
            self.state.word_spacing
        } else {
            0.0
        };
        self.state.char_spacing + word
    }

    /// `TJ` number that advances exactly as far as the removed glyph did
    fn offset_for(&self, width: f64, spacing: f64) -> f64 {
        if self.state.font_size == 0.0 {
            width
        } else {
            width + spacing * 1000.0 / self.state.font_size
        }
    }

    fn advance(&mut self, tx: f64) {
        self.text_matrix =
            Matrix::translate(tx * self.state.horizontal_scaling, 0.0).then(&self.text_matrix);
    }

    fn glyph_hits_region(&self, width: f64) -> bool {
        if self.regions.is_empty() {
            return false;
        }
        let state = &self.state;
        let render = Matrix::new(
            state.font_size * state.horizontal_scaling,
            0.0,
            0.0,
            state.font_size,
            0.0,
            state.rise,
        )
        .then(&self.text_matrix)
        .then(&state.ctm);

        let w = width / 1000.0;
        let corners = [
            render.apply(0.0, DESCENT),
            render.apply(w, DESCENT),
            render.apply(0.0, ASCENT),
            render.apply(w, ASCENT),
        ];
        let (min_x, max_x) = min_max(corners.iter().map(|c| c.0));
        let (min_y, max_y) = min_max(corners.iter().map(|c| c.1));
        let glyph_box = OutputRect {
            x: min_x,
            y: min_y,
            width: max_x - min_x,
            height: max_y - min_y,
        };

        self.regions.iter().any(|region| region.overlaps(&glyph_box))
    }
}

fn first_number(operands: &[Object]) -> f64 {
    operands.first().and_then(as_number).unwrap_or(0.0)
}

fn min_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

/// Accumulates `TJ` array elements, merging neighbouring strings and offsets
#[derive(Default)]
struct TjBuilder {
    elements: Vec<Object>,
    pending_text: Option<(Vec<u8>, StringFormat)>,
    pending_offset: f64,
}

impl TjBuilder {
    fn text(&mut self, bytes: &[u8], format: StringFormat) {
        self.flush_offset();
        match &mut self.pending_text {
            Some((buffer, _)) => buffer.extend_from_slice(bytes),
            None => self.pending_text = Some((bytes.to_vec(), format)),
        }
    }

    fn offset(&mut self, n: f64) {
        self.flush_text();
        self.pending_offset += n;
    }

    fn flush_text(&mut self) {
        if let Some((bytes, format)) = self.pending_text.take() {
            self.elements.push(Object::String(bytes, format));
        }
    }

    fn flush_offset(&mut self) {
        if self.pending_offset != 0.0 {
            self.elements.push(Object::Real(self.pending_offset as f32));
            self.pending_offset = 0.0;
        }
    }

    fn finish(mut self) -> Vec<Object> {
        self.flush_text();
        self.flush_offset();
        self.elements
    }
}
