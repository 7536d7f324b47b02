//! Content-stream walker that turns text-showing operators into
//! [`TextFragment`]s.
//!
//! Each shown string (or `TJ` array) becomes one fragment whose transform is
//! the text rendering matrix `[fs·Th, 0, 0, fs, 0, rise] × Tm × CTM`: the
//! translation gives the fragment position and the vertical scale its font
//! height. Glyph widths are approximated, so fragment widths are estimates.

use unicode_normalization::UnicodeNormalization;

use super::backend::{decode_pdf_string, Operand, PageId, PdfBackend, TextOp};
use crate::driver::FragmentSource;
use crate::fragment::TextFragment;
use crate::ReflowError;

/// Affine matrix `[a, b, c, d, e, f]`.
type Matrix = [f64; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// Average glyph advance as a fraction of the font size.
const APPROX_CHAR_WIDTH_RATIO: f64 = 0.5;

/// A `TJ` adjustment wider than this fraction of an average glyph is taken as
/// a word gap.
const KERNING_SPACE_RATIO: f64 = 0.3;

/// `m1 × m2` in PDF's row-vector convention.
fn multiply(m1: &Matrix, m2: &Matrix) -> Matrix {
    [
        m1[0] * m2[0] + m1[1] * m2[2],
        m1[0] * m2[1] + m1[1] * m2[3],
        m1[2] * m2[0] + m1[3] * m2[2],
        m1[2] * m2[1] + m1[3] * m2[3],
        m1[4] * m2[0] + m1[5] * m2[2] + m2[4],
        m1[4] * m2[1] + m1[5] * m2[3] + m2[5],
    ]
}

/// Six numeric operands as a matrix.
fn matrix_operands(op: &TextOp) -> Option<Matrix> {
    let mut m = [0.0; 6];
    for (i, slot) in m.iter_mut().enumerate() {
        *slot = op.number(i)?;
    }
    Some(m)
}

#[derive(Debug, Clone)]
struct TextState {
    font_key: Vec<u8>,
    font_size: f64,
    text_matrix: Matrix,
    line_matrix: Matrix,
    /// Horizontal scaling as a factor (Tz / 100).
    horiz_scale: f64,
    char_spacing: f64,
    word_spacing: f64,
    rise: f64,
    leading: f64,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font_key: Vec::new(),
            font_size: 0.0,
            text_matrix: IDENTITY,
            line_matrix: IDENTITY,
            horiz_scale: 1.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            rise: 0.0,
            leading: 0.0,
        }
    }
}

impl TextState {
    /// Td: translate the line matrix and restart the text matrix from it.
    fn translate_line(&mut self, tx: f64, ty: f64) {
        self.line_matrix = multiply(&[1.0, 0.0, 0.0, 1.0, tx, ty], &self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        self.translate_line(0.0, -self.leading);
    }

    /// Move the text matrix right by `tx` unscaled text-space units.
    fn advance(&mut self, tx: f64) {
        self.text_matrix = multiply(
            &[1.0, 0.0, 0.0, 1.0, tx * self.horiz_scale, 0.0],
            &self.text_matrix,
        );
    }

    /// Unscaled advance of `text` using the approximate glyph width.
    fn text_advance(&self, text: &str) -> f64 {
        text.chars()
            .map(|ch| {
                let spacing = if ch == ' ' { self.word_spacing } else { 0.0 };
                self.font_size * APPROX_CHAR_WIDTH_RATIO + self.char_spacing + spacing
            })
            .sum()
    }

    fn rendering_matrix(&self, ctm: &Matrix) -> Matrix {
        let font = [
            self.font_size * self.horiz_scale,
            0.0,
            0.0,
            self.font_size,
            0.0,
            self.rise,
        ];
        multiply(&multiply(&font, &self.text_matrix), ctm)
    }
}

/// Accumulates fragments for one page.
struct Walker<'a> {
    backend: &'a dyn PdfBackend,
    page: PageId,
    font_keys: Vec<Vec<u8>>,
    state: TextState,
    ctm: Matrix,
    saved: Vec<(Matrix, TextState)>,
    fragments: Vec<TextFragment>,
}

impl<'a> Walker<'a> {
    fn decode(&self, operand: &Operand) -> String {
        match operand {
            Operand::Str(bytes) => {
                let decoded = self.backend.decode_text(self.page, &self.state.font_key, bytes);
                if decoded.is_empty() {
                    decode_pdf_string(bytes)
                } else {
                    decoded
                }
            }
            _ => String::new(),
        }
    }

    /// Emit a fragment starting at the current text position and advance.
    fn show(&mut self, text: String) {
        if text.is_empty() {
            return;
        }
        let start = self.state.rendering_matrix(&self.ctm);
        let advance = self.state.text_advance(&text);
        self.state.advance(advance);
        self.push(text, start);
    }

    fn push(&mut self, text: String, start: Matrix) {
        let end = self.state.rendering_matrix(&self.ctm);
        let width = ((end[4] - start[4]).powi(2) + (end[5] - start[5]).powi(2)).sqrt();
        let content: String = text.nfc().collect();
        self.fragments
            .push(TextFragment::from_transform(content, start).with_size(width, start[3].abs()));
    }

    /// `TJ`: strings interleaved with adjustments in thousandths of text
    /// space. The whole array becomes a single fragment.
    fn show_array(&mut self, elements: &[Operand]) {
        let mut buf = String::new();
        let mut start: Option<Matrix> = None;

        for element in elements {
            if let Operand::Str(_) = element {
                let piece = self.decode(element);
                if start.is_none() && !piece.is_empty() {
                    start = Some(self.state.rendering_matrix(&self.ctm));
                }
                let advance = self.state.text_advance(&piece);
                self.state.advance(advance);
                buf.push_str(&piece);
            } else if let Some(adj) = element.as_number() {
                let tx = -adj / 1000.0 * self.state.font_size;
                let gap = self.state.font_size * APPROX_CHAR_WIDTH_RATIO * KERNING_SPACE_RATIO;
                if tx > gap && !buf.is_empty() && !buf.ends_with(' ') {
                    buf.push(' ');
                }
                self.state.advance(tx);
            }
        }

        let text = buf.trim_end().to_string();
        if let Some(start) = start.filter(|_| !text.is_empty()) {
            self.push(text, start);
        }
    }

    fn set_font(&mut self, op: &TextOp) {
        let key = match op.operands.first() {
            Some(Operand::Name(n)) | Some(Operand::Str(n)) => n.clone(),
            _ => return,
        };
        self.state.font_size = op.number(1).unwrap_or(0.0);
        if !self.font_keys.contains(&key) {
            log::trace!(
                "font {} not in page resources",
                String::from_utf8_lossy(&key)
            );
        }
        self.state.font_key = key;
    }

    fn apply(&mut self, op: &TextOp) {
        match op.operator.as_str() {
            // -- Graphics state -----------------------------------------
            "q" => self.saved.push((self.ctm, self.state.clone())),
            "Q" => {
                if let Some((ctm, state)) = self.saved.pop() {
                    self.ctm = ctm;
                    self.state = state;
                }
            }
            "cm" => {
                if let Some(m) = matrix_operands(op) {
                    self.ctm = multiply(&m, &self.ctm);
                }
            }

            // -- Text object and positioning ----------------------------
            "BT" => {
                self.state.text_matrix = IDENTITY;
                self.state.line_matrix = IDENTITY;
            }
            "Tf" => self.set_font(op),
            "Tm" => {
                if let Some(m) = matrix_operands(op) {
                    self.state.text_matrix = m;
                    self.state.line_matrix = m;
                }
            }
            "Td" => {
                if let (Some(tx), Some(ty)) = (op.number(0), op.number(1)) {
                    self.state.translate_line(tx, ty);
                }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (op.number(0), op.number(1)) {
                    self.state.leading = -ty;
                    self.state.translate_line(tx, ty);
                }
            }
            "T*" => self.state.next_line(),
            "TL" => {
                if let Some(v) = op.number(0) {
                    self.state.leading = v;
                }
            }
            "Tc" => {
                if let Some(v) = op.number(0) {
                    self.state.char_spacing = v;
                }
            }
            "Tw" => {
                if let Some(v) = op.number(0) {
                    self.state.word_spacing = v;
                }
            }
            "Tz" => {
                if let Some(v) = op.number(0) {
                    self.state.horiz_scale = v / 100.0;
                }
            }
            "Ts" => {
                if let Some(v) = op.number(0) {
                    self.state.rise = v;
                }
            }

            // -- Text showing -------------------------------------------
            "Tj" => {
                if let Some(operand) = op.operands.first() {
                    let text = self.decode(operand);
                    self.show(text);
                }
            }
            "TJ" => {
                if let Some(Operand::Array(elements)) = op.operands.first() {
                    self.show_array(elements);
                }
            }
            "'" => {
                self.state.next_line();
                if let Some(operand) = op.operands.first() {
                    let text = self.decode(operand);
                    self.show(text);
                }
            }
            "\"" => {
                if let (Some(aw), Some(ac), Some(operand)) =
                    (op.number(0), op.number(1), op.operands.get(2))
                {
                    self.state.word_spacing = aw;
                    self.state.char_spacing = ac;
                    self.state.next_line();
                    let text = self.decode(operand);
                    self.show(text);
                }
            }

            _ => {}
        }
    }
}

/// Walk one page's content stream and collect its text fragments.
pub fn extract_page_fragments(
    backend: &dyn PdfBackend,
    page: PageId,
) -> Result<Vec<TextFragment>, ReflowError> {
    let ops = backend.page_ops(page)?;

    let mut walker = Walker {
        backend,
        page,
        font_keys: backend.font_keys(page),
        state: TextState::default(),
        ctm: IDENTITY,
        saved: Vec::new(),
        fragments: Vec::new(),
    };

    for op in &ops {
        walker.apply(op);
    }

    Ok(walker.fragments)
}

/// [`FragmentSource`] over any [`PdfBackend`], in page-tree order.
pub struct PdfFragmentSource<B> {
    backend: B,
    pages: Vec<PageId>,
}

impl<B: PdfBackend> PdfFragmentSource<B> {
    pub fn new(backend: B) -> Self {
        let pages = backend.pages();
        Self { backend, pages }
    }
}

impl<B: PdfBackend> FragmentSource for PdfFragmentSource<B> {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_fragments(&self, index: usize) -> Result<Vec<TextFragment>, ReflowError> {
        let page = self
            .pages
            .get(index)
            .copied()
            .ok_or_else(|| ReflowError::PageUnreadable {
                page: index + 1,
                reason: "page index out of range".to_string(),
            })?;
        extract_page_fragments(&self.backend, page)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    struct MockBackend {
        pages: Vec<PageId>,
        ops: BTreeMap<PageId, Vec<TextOp>>,
    }

    impl MockBackend {
        fn single(ops: Vec<TextOp>) -> Self {
            Self {
                pages: vec![(1, 0)],
                ops: BTreeMap::from([((1, 0), ops)]),
            }
        }
    }

    impl PdfBackend for MockBackend {
        fn pages(&self) -> Vec<PageId> {
            self.pages.clone()
        }

        fn font_keys(&self, _page: PageId) -> Vec<Vec<u8>> {
            vec![b"F1".to_vec()]
        }

        fn page_ops(&self, page: PageId) -> Result<Vec<TextOp>, ReflowError> {
            self.ops
                .get(&page)
                .cloned()
                .ok_or_else(|| ReflowError::Parse(format!("no content for {:?}", page)))
        }

        fn decode_text(&self, _page: PageId, _font_key: &[u8], bytes: &[u8]) -> String {
            decode_pdf_string(bytes)
        }
    }

    fn op(operator: &str, operands: Vec<Operand>) -> TextOp {
        TextOp::new(operator, operands)
    }

    fn nums(values: &[f64]) -> Vec<Operand> {
        values.iter().map(|v| Operand::Number(*v)).collect()
    }

    fn tf(size: f64) -> TextOp {
        op("Tf", vec![Operand::Name(b"F1".to_vec()), Operand::Number(size)])
    }

    fn tj(text: &str) -> TextOp {
        op("Tj", vec![Operand::Str(text.as_bytes().to_vec())])
    }

    fn extract(ops: Vec<TextOp>) -> Vec<TextFragment> {
        extract_page_fragments(&MockBackend::single(ops), (1, 0)).unwrap()
    }

    #[test]
    fn test_tj_position_and_height() {
        let fragments = extract(vec![
            op("BT", vec![]),
            tf(12.0),
            op("Tm", nums(&[1.0, 0.0, 0.0, 1.0, 72.0, 700.0])),
            tj("Hello World"),
            op("ET", vec![]),
        ]);
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].content, "Hello World");
        assert!((fragments[0].x - 72.0).abs() < 1e-9);
        assert!((fragments[0].y - 700.0).abs() < 1e-9);
        assert_eq!(fragments[0].font_height, Some(12.0));
        // 11 chars at 6pt each
        assert!((fragments[0].width.unwrap() - 66.0).abs() < 1e-9);
    }

    #[test]
    fn test_text_matrix_scales_height() {
        let fragments = extract(vec![
            op("BT", vec![]),
            tf(1.0),
            op("Tm", nums(&[9.0, 0.0, 0.0, 9.0, 50.0, 400.0])),
            tj("scaled"),
        ]);
        assert_eq!(fragments[0].font_height, Some(9.0));
        assert!((fragments[0].x - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_cm_and_restore() {
        let fragments = extract(vec![
            op("q", vec![]),
            op("cm", nums(&[1.0, 0.0, 0.0, 1.0, 100.0, 200.0])),
            op("BT", vec![]),
            tf(10.0),
            op("Td", nums(&[5.0, 5.0])),
            tj("moved"),
            op("ET", vec![]),
            op("Q", vec![]),
            op("BT", vec![]),
            op("Td", nums(&[5.0, 5.0])),
            tj("home"),
            op("ET", vec![]),
        ]);
        assert_eq!(fragments.len(), 2);
        assert!((fragments[0].x - 105.0).abs() < 1e-9);
        assert!((fragments[0].y - 205.0).abs() < 1e-9);
        assert!((fragments[1].x - 5.0).abs() < 1e-9);
        assert!((fragments[1].y - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_td_and_t_star() {
        let fragments = extract(vec![
            op("BT", vec![]),
            tf(10.0),
            op("TD", nums(&[72.0, -14.0])),
            tj("first"),
            op("T*", vec![]),
            tj("second"),
            op("'", vec![Operand::Str(b"third".to_vec())]),
        ]);
        let ys: Vec<f64> = fragments.iter().map(|f| f.y).collect();
        assert_eq!(ys, vec![-14.0, -28.0, -42.0]);
        assert!(fragments.iter().all(|f| (f.x - 72.0).abs() < 1e-9));
    }

    #[test]
    fn test_double_quote_sets_spacing() {
        let fragments = extract(vec![
            op("BT", vec![]),
            tf(10.0),
            op("TL", nums(&[12.0])),
            op(
                "\"",
                vec![
                    Operand::Number(2.0),
                    Operand::Number(1.0),
                    Operand::Str(b"a b".to_vec()),
                ],
            ),
        ]);
        assert_eq!(fragments[0].y, -12.0);
        // 3 glyphs * (5 + 1) + 2 word spacing
        assert!((fragments[0].width.unwrap() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_tj_array_single_fragment_with_gap() {
        let fragments = extract(vec![
            op("BT", vec![]),
            tf(10.0),
            op(
                "TJ",
                vec![Operand::Array(vec![
                    Operand::Str(b"Hel".to_vec()),
                    Operand::Number(-20.0),
                    Operand::Str(b"lo".to_vec()),
                    Operand::Number(-400.0),
                    Operand::Str(b"there".to_vec()),
                ])],
            ),
        ]);
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].content, "Hello there");
    }

    #[test]
    fn test_empty_strings_skipped() {
        let fragments = extract(vec![
            op("BT", vec![]),
            tf(10.0),
            tj(""),
            op("TJ", vec![Operand::Array(vec![Operand::Number(-100.0)])]),
        ]);
        assert!(fragments.is_empty());
    }

    #[test]
    fn test_whitespace_fragment_is_kept_for_normalizer() {
        let fragments = extract(vec![op("BT", vec![]), tf(10.0), tj("   ")]);
        assert_eq!(fragments.len(), 1);
        assert!(fragments[0].is_blank());
    }

    #[test]
    fn test_content_is_nfc() {
        let fragments = extract(vec![op("BT", vec![]), tf(10.0), tj("e\u{0301}")]);
        assert_eq!(fragments[0].content, "\u{00E9}");
    }

    #[test]
    fn test_source_pages_in_order() {
        let backend = MockBackend {
            pages: vec![(4, 0), (9, 0)],
            ops: BTreeMap::from([
                ((4, 0), vec![op("BT", vec![]), tf(10.0), tj("one")]),
                ((9, 0), vec![op("BT", vec![]), tf(10.0), tj("two")]),
            ]),
        };
        let source = PdfFragmentSource::new(backend);
        assert_eq!(source.page_count(), 2);
        assert_eq!(source.page_fragments(0).unwrap()[0].content, "one");
        assert_eq!(source.page_fragments(1).unwrap()[0].content, "two");
        assert!(matches!(
            source.page_fragments(2),
            Err(ReflowError::PageUnreadable { page: 3, .. })
        ));
    }

    #[test]
    fn test_source_page_error_propagates() {
        let backend = MockBackend {
            pages: vec![(4, 0), (5, 0)],
            ops: BTreeMap::from([((4, 0), vec![tj("one")])]),
        };
        let source = PdfFragmentSource::new(backend);
        assert!(source.page_fragments(0).is_ok());
        assert!(matches!(source.page_fragments(1), Err(ReflowError::Parse(_))));
    }

    #[test]
    fn test_multiply_identity() {
        let m = [2.0, 0.5, -0.5, 2.0, 10.0, 20.0];
        assert_eq!(multiply(&IDENTITY, &m), m);
        assert_eq!(multiply(&m, &IDENTITY), m);
    }
}
