/// A byte range within the input stream's current buffer.
///
/// Spans stay valid across buffer growth (they are offsets, not pointers),
/// but the bytes they refer to may be rewritten in place by entity
/// resolution and case normalization, and tokens borrowing from the buffer
/// must be consumed before the stream is advanced again.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Span {
    /// Byte offset of the first byte.
    pub start: usize,
    /// Length in bytes.
    pub len: usize,
}

impl Span {
    /// Byte offset one past the last byte.
    #[must_use]
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    /// True if the span covers no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// How character data of the current element is interpreted.
///
/// Set externally between tokens (e.g. after `<script>` or `<title>`); a
/// matched close tag in RCDATA/CDATA resets the model to PCDATA.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ContentModel {
    /// Tags and character references are both recognized.
    #[default]
    Pcdata,
    /// Character references are recognized, `<` only opens close tags.
    Rcdata,
    /// Neither character references nor start tags; `<` only opens close tags.
    Cdata,
    /// Everything is character data until the end of the stream.
    Plaintext,
}

/// The namespace a tag belongs to.
///
/// The tokenizer always reports [`Namespace::Html`]; tree builders rewrite
/// the field when they emit tags in foreign content.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Namespace {
    /// The HTML namespace.
    #[default]
    Html,
    /// The MathML namespace.
    MathMl,
    /// The SVG namespace.
    Svg,
}

/// A single HTML attribute. Names and values borrow from the input buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Attribute<'b> {
    /// The attribute name, lowercased during collection.
    pub name: &'b [u8],
    /// The attribute value, with character references resolved. Empty for
    /// valueless attributes.
    pub value: &'b [u8],
}

/// A start or end tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tag<'b> {
    /// The tag name, lowercased during collection.
    pub name: &'b [u8],
    /// The attributes in source order. Duplicate names have been removed,
    /// keeping the first occurrence.
    pub attributes: Vec<Attribute<'b>>,
    /// Whether the tag was closed with `/>`.
    pub self_closing: bool,
    /// See [`Namespace`].
    pub ns: Namespace,
}

/// A DOCTYPE declaration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Doctype<'b> {
    /// The doctype name, uppercased during collection.
    pub name: &'b [u8],
    /// The public identifier. Never populated by this tokenizer.
    pub public_id: Option<&'b [u8]>,
    /// The system identifier. Never populated by this tokenizer.
    pub system_id: Option<&'b [u8]>,
    /// True iff the name matches `HTML` ASCII case-insensitively and the
    /// declaration was otherwise well-formed.
    pub correct: bool,
}

/// A token produced by the tokenizer.
///
/// All byte slices borrow from the input stream's buffer and are only valid
/// for the duration of the sink callback; copy out anything that needs to
/// survive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token<'b> {
    /// A contiguous run of character data. Adjacent runs may be coalesced
    /// into a single token.
    Characters(&'b [u8]),
    /// A start tag such as `<p>` or `<a href="x">`.
    StartTag(Tag<'b>),
    /// An end tag such as `</p>`.
    EndTag(Tag<'b>),
    /// A comment; the slice covers the body without the delimiters.
    Comment(&'b [u8]),
    /// A DOCTYPE declaration.
    Doctype(Doctype<'b>),
    /// The end of the input stream. Emitted exactly once.
    Eof,
}
