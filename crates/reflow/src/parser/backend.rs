use std::collections::BTreeMap;

use lopdf::{content::Content, Dictionary, Document, Object};

use crate::ReflowError;

/// `(object number, generation)` of a page object.
pub type PageId = (u32, u16);

/// Operand of a content-stream operator, reduced to what text extraction
/// reads. Keeping it apart from `lopdf::Object` lets tests drive the walker
/// without building a PDF.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Number(f64),
    Name(Vec<u8>),
    Str(Vec<u8>),
    Array(Vec<Operand>),
    Other,
}

impl Operand {
    pub fn from_object(obj: &Object) -> Self {
        match obj {
            Object::Integer(i) => Operand::Number(*i as f64),
            Object::Real(r) => Operand::Number(f64::from(*r)),
            Object::Name(n) => Operand::Name(n.clone()),
            Object::String(s, _) => Operand::Str(s.clone()),
            Object::Array(items) => {
                Operand::Array(items.iter().map(Operand::from_object).collect())
            }
            _ => Operand::Other,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Operand::Number(n) => Some(*n),
            _ => None,
        }
    }
}

/// One operator with its operands, in stream order.
#[derive(Debug, Clone)]
pub struct TextOp {
    pub operator: String,
    pub operands: Vec<Operand>,
}

impl TextOp {
    pub fn new(operator: &str, operands: Vec<Operand>) -> Self {
        Self {
            operator: operator.to_string(),
            operands,
        }
    }

    /// Operand `i` as a number, if present and numeric.
    pub fn number(&self, i: usize) -> Option<f64> {
        self.operands.get(i).and_then(Operand::as_number)
    }
}

/// Decode PDF string bytes with no font knowledge: UTF-16BE when the BOM is
/// present, UTF-8 when valid, Latin-1 otherwise.
pub fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(payload) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        return utf16be(payload);
    }

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

/// Big-endian UTF-16; a trailing odd byte is dropped.
fn utf16be(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

/// What the fragment walker needs from a parsed PDF.
pub trait PdfBackend {
    /// Page ids in page-tree order.
    fn pages(&self) -> Vec<PageId>;

    /// Resource keys of the fonts a page can select with `Tf`.
    fn font_keys(&self, page: PageId) -> Vec<Vec<u8>>;

    /// Decoded operators of a page's content stream.
    fn page_ops(&self, page: PageId) -> Result<Vec<TextOp>, ReflowError>;

    /// Turn the bytes of a text-showing operand into text, using whatever is
    /// known about the font selected as `font_key`.
    fn decode_text(&self, page: PageId, font_key: &[u8], bytes: &[u8]) -> String;
}

/// [`PdfBackend`] over an in-memory lopdf document.
pub struct LopdfBackend {
    doc: Document,
}

impl LopdfBackend {
    /// Parse PDF bytes. Encrypted documents are refused.
    pub fn load_bytes(data: &[u8]) -> Result<Self, ReflowError> {
        let doc = Document::load_mem(data).map_err(|e| ReflowError::Parse(e.to_string()))?;
        if doc.is_encrypted() {
            return Err(ReflowError::Encrypted);
        }
        Ok(Self { doc })
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// Text entries of the Info dictionary keyed by name. Empty when the
    /// trailer has no usable Info.
    pub fn metadata(&self) -> BTreeMap<String, String> {
        let info: Option<&Dictionary> = match self.doc.trailer.get(b"Info") {
            Ok(Object::Reference(id)) => self.doc.get_dictionary(*id).ok(),
            Ok(Object::Dictionary(dict)) => Some(dict),
            _ => None,
        };

        info.into_iter()
            .flat_map(|dict| dict.iter())
            .filter_map(|(key, value)| {
                let text = match value {
                    Object::String(bytes, _) => decode_pdf_string(bytes),
                    Object::Name(name) => String::from_utf8_lossy(name).into_owned(),
                    _ => return None,
                };
                Some((String::from_utf8_lossy(key).into_owned(), text))
            })
            .collect()
    }

    /// `/Encoding` of a page font when it is a plain name.
    fn font_encoding(&self, page: PageId, font_key: &[u8]) -> Option<String> {
        let fonts = self.doc.get_page_fonts(page).ok()?;
        let font = fonts.get(font_key)?;
        font.get(b"Encoding")
            .and_then(Object::as_name)
            .ok()
            .map(|name| String::from_utf8_lossy(name).into_owned())
    }
}

impl PdfBackend for LopdfBackend {
    fn pages(&self) -> Vec<PageId> {
        self.doc.get_pages().into_values().collect()
    }

    fn font_keys(&self, page: PageId) -> Vec<Vec<u8>> {
        match self.doc.get_page_fonts(page) {
            Ok(fonts) => fonts.into_keys().collect(),
            Err(e) => {
                log::debug!("page {:?}: no font resources: {}", page, e);
                Vec::new()
            }
        }
    }

    fn page_ops(&self, page: PageId) -> Result<Vec<TextOp>, ReflowError> {
        let data = self
            .doc
            .get_page_content(page)
            .map_err(|e| ReflowError::Parse(format!("page content: {e}")))?;
        let content =
            Content::decode(&data).map_err(|e| ReflowError::Parse(format!("content stream: {e}")))?;

        Ok(content
            .operations
            .into_iter()
            .map(|op| TextOp {
                operands: op.operands.iter().map(Operand::from_object).collect(),
                operator: op.operator,
            })
            .collect())
    }

    fn decode_text(&self, page: PageId, font_key: &[u8], bytes: &[u8]) -> String {
        // Identity-H/V fonts show two-byte codes that are usually Unicode.
        let two_byte = bytes.len() % 2 == 0
            && self
                .font_encoding(page, font_key)
                .is_some_and(|enc| enc.starts_with("Identity"));

        if two_byte {
            let text = utf16be(bytes);
            if text.chars().any(|c| c != '\u{FFFD}' && c != '\0') {
                return text;
            }
        }

        decode_pdf_string(bytes)
    }
}
