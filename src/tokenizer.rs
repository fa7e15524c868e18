use std::mem;

use log::{debug, trace};

use crate::entities::{EntityMatcher, NamedEntities};
use crate::error::{FatalError, ParseError};
use crate::machine;
use crate::machine_helper::Control;
use crate::sink::TokenSink;
use crate::state::State;
use crate::stream::Stream;
use crate::token::{Attribute, ContentModel, Doctype, Namespace, Span, Tag, Token};

/// Result of a [`Tokenizer::run`] call that did not fail fatally.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    /// The stream ran out of data before terminating. Feed more input
    /// through [`Tokenizer::stream_mut`] and call [`Tokenizer::run`] again.
    Suspended,
    /// The end of the stream was reached and [`Token::Eof`] was emitted.
    /// Further calls return `Complete` immediately.
    Complete,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum TagKind {
    #[default]
    Start,
    End,
}

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct AttrSpan {
    pub(crate) name: Span,
    pub(crate) value: Span,
}

/// Scratch for the tag under construction. Reused across tags; the
/// attribute vector keeps its allocation.
#[derive(Debug, Default)]
pub(crate) struct TagScratch {
    pub(crate) kind: TagKind,
    pub(crate) name: Span,
    pub(crate) attrs: Vec<AttrSpan>,
    pub(crate) self_closing: bool,
}

#[derive(Debug, Default)]
pub(crate) struct DoctypeScratch {
    pub(crate) name: Span,
    pub(crate) forced_incorrect: bool,
}

/// Scratch for the character-reference consumer. All counts are in bytes
/// and include the introducing `&`.
#[derive(Debug)]
pub(crate) struct EntityScratch {
    /// False while a reference is being consumed; the entity states drive
    /// the sub-machine until it flips back.
    pub(crate) complete: bool,
    /// Byte offset of the `&`.
    pub(crate) offset: usize,
    /// Bytes consumed since (and including) the `&`.
    pub(crate) consumed: usize,
    /// Length of the longest full match, 0 if none yet.
    pub(crate) best: usize,
    /// Resolved code point of the longest match.
    pub(crate) codepoint: Option<char>,
    /// Numeric base, once `&#x`/`&#` has decided it.
    pub(crate) base: Option<u32>,
    /// Numeric accumulator, clamped past the Unicode range.
    pub(crate) value: u32,
    pub(crate) had_digits: bool,
    /// The entity state to restore once resolution finishes.
    pub(crate) return_state: State,
}

impl Default for EntityScratch {
    fn default() -> Self {
        EntityScratch {
            complete: true,
            offset: 0,
            consumed: 0,
            best: 0,
            codepoint: None,
            base: None,
            value: 0,
            had_digits: false,
            return_state: State::Data,
        }
    }
}

/// All mutable scratch of the state machine. Kept separate from the
/// tokenizer so handlers can borrow it alongside the stream and sink.
#[derive(Debug)]
pub(crate) struct Context {
    /// The pending character run. Zero length between emits.
    pub(crate) chars: Span,
    pub(crate) tag: TagScratch,
    pub(crate) comment: Span,
    pub(crate) doctype: DoctypeScratch,
    pub(crate) match_entity: EntityScratch,
    /// Bytes of the last start tag name matched so far in CloseTagMatch.
    pub(crate) close_tag_matched: usize,
    /// How many bytes of the `DOCTYPE` keyword have been matched.
    pub(crate) match_doctype_count: usize,
    /// The attribute-value state to resume after an entity resolves.
    pub(crate) prev_state: State,
    /// Name of the most recently emitted start tag, owned because the
    /// buffer bytes may be rewritten before a close tag shows up.
    pub(crate) last_start_tag: Vec<u8>,
    /// A `/` was the last code point consumed inside the current tag.
    pub(crate) solidus: bool,
}

impl Default for Context {
    fn default() -> Self {
        Context {
            chars: Span::default(),
            tag: TagScratch::default(),
            comment: Span::default(),
            doctype: DoctypeScratch::default(),
            match_entity: EntityScratch::default(),
            close_tag_matched: 0,
            match_doctype_count: 0,
            prev_state: State::Data,
            last_start_tag: Vec::new(),
            solidus: false,
        }
    }
}

impl Context {
    pub(crate) fn extend_chars(&mut self, pos: usize, width: usize) {
        if self.chars.len == 0 {
            self.chars.start = pos;
        }
        self.chars.len += width;
    }

    pub(crate) fn extend_comment(&mut self, pos: usize, width: usize) {
        if self.comment.len == 0 {
            self.comment.start = pos;
        }
        self.comment.len += width;
    }

    /// Fold `n` already-consumed bytes ending at `end` back into the
    /// comment body (used for dashes that turned out not to close it).
    pub(crate) fn extend_comment_back(&mut self, end: usize, n: usize) {
        if self.comment.len == 0 {
            self.comment.start = end - n;
        }
        self.comment.len += n;
    }

    /// Start a fresh tag, dropping the pending `<`/`</` characters.
    pub(crate) fn init_tag(&mut self, kind: TagKind, pos: usize, width: usize) {
        self.chars = Span::default();
        self.tag.kind = kind;
        self.tag.name = Span { start: pos, len: width };
        self.tag.attrs.clear();
        self.tag.self_closing = false;
        self.solidus = false;
    }

    pub(crate) fn new_attribute(&mut self, pos: usize, width: usize) {
        self.tag.attrs.push(AttrSpan {
            name: Span { start: pos, len: width },
            value: Span::default(),
        });
    }

    pub(crate) fn extend_attr_name(&mut self, width: usize) {
        match self.tag.attrs.last_mut() {
            Some(attr) => attr.name.len += width,
            None => debug_assert!(false, "no attribute under construction"),
        }
    }

    pub(crate) fn extend_attr_value(&mut self, pos: usize, width: usize) {
        match self.tag.attrs.last_mut() {
            Some(attr) => {
                if attr.value.len == 0 {
                    attr.value.start = pos;
                }
                attr.value.len += width;
            }
            None => debug_assert!(false, "no attribute under construction"),
        }
    }
}

/// A resumable HTML5 tokenizer over a [`Stream`], delivering tokens to a
/// [`TokenSink`]. See the crate-level docs for usage.
pub struct Tokenizer<S: Stream, K: TokenSink, M: EntityMatcher = NamedEntities> {
    pub(crate) stream: S,
    pub(crate) sink: K,
    pub(crate) matcher: M,
    pub(crate) state: State,
    pub(crate) content_model: ContentModel,
    pub(crate) ctx: Context,
    eof: bool,
}

impl<S: Stream, K: TokenSink> Tokenizer<S, K> {
    /// Create a tokenizer with the built-in named-entity table.
    pub fn new(stream: S, sink: K) -> Self {
        Tokenizer::new_with_entities(stream, sink, NamedEntities::default())
    }
}

impl<S: Stream, K: TokenSink, M: EntityMatcher> Tokenizer<S, K, M> {
    /// Create a tokenizer with a custom named-entity matcher.
    pub fn new_with_entities(stream: S, sink: K, matcher: M) -> Self {
        Tokenizer {
            stream,
            sink,
            matcher,
            state: State::Data,
            content_model: ContentModel::default(),
            ctx: Context::default(),
            eof: false,
        }
    }

    /// Drive the state machine until the stream runs out of data or ends.
    ///
    /// Parse errors are reported through the sink and never abort; a
    /// [`FatalError`] (resource failure) does, and the tokenizer must not
    /// be re-run afterwards.
    pub fn run(&mut self) -> Result<Status, FatalError> {
        loop {
            if self.eof {
                return Ok(Status::Complete);
            }
            if let Some(len) = self.stream.take_buffer_move() {
                self.sink.buffer_moved(len);
            }
            match machine::consume(self)? {
                Control::Continue => {}
                Control::Suspend => return Ok(Status::Suspended),
                Control::Eof => {
                    self.eof = true;
                    debug!("end of stream");
                    self.sink.token(Token::Eof);
                    return Ok(Status::Complete);
                }
            }
        }
    }

    /// Set the content model applied to character data. Meant to be called
    /// between tokens, e.g. after seeing a `<script>` or `<title>` start
    /// tag.
    pub fn set_content_model(&mut self, model: ContentModel) {
        self.content_model = model;
    }

    /// Override the remembered last start tag name, which close tags are
    /// matched against in RCDATA/CDATA.
    ///
    /// Normally the emit path maintains this; the hook exists for tree
    /// builders and test harnesses that enter those content models
    /// directly.
    pub fn set_last_start_tag(&mut self, name: Option<&[u8]>) {
        self.ctx.last_start_tag.clear();
        self.ctx
            .last_start_tag
            .extend_from_slice(name.unwrap_or_default());
    }

    /// The underlying stream.
    pub fn stream(&self) -> &S {
        &self.stream
    }

    /// Mutable access to the stream, for feeding input between runs.
    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// The installed sink.
    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Mutable access to the installed sink.
    pub fn sink_mut(&mut self) -> &mut K {
        &mut self.sink
    }

    /// Consume the tokenizer and hand back the sink.
    pub fn into_sink(self) -> K {
        self.sink
    }

    pub(crate) fn switch_to(&mut self, state: State) {
        trace!("state: {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    /// Report a recoverable parse error at the current cursor position.
    pub(crate) fn parse_error(&mut self, error: ParseError) {
        let (offset, _) = self.stream.cur_pos();
        self.sink.parse_error(error, offset);
    }

    /// Flush the pending character run, if any.
    pub(crate) fn emit_chars(&mut self) {
        if self.ctx.chars.is_empty() {
            return;
        }
        let span = mem::take(&mut self.ctx.chars);
        let data = self.stream.slice(span);
        self.sink.token(Token::Characters(data));
    }

    /// Finalize and deliver the current tag.
    pub(crate) fn emit_tag(&mut self) {
        self.ctx.solidus = false;
        self.dedup_attributes();
        if self.ctx.tag.kind == TagKind::End {
            if !self.ctx.tag.attrs.is_empty() {
                self.parse_error(ParseError::EndTagWithAttributes);
            }
            if self.ctx.tag.self_closing {
                self.parse_error(ParseError::EndTagWithTrailingSolidus);
            }
        }
        debug!("emit {:?} tag", self.ctx.tag.kind);
        let tag = &self.ctx.tag;
        let token = Tag {
            name: self.stream.slice(tag.name),
            attributes: tag
                .attrs
                .iter()
                .map(|attr| Attribute {
                    name: self.stream.slice(attr.name),
                    value: self.stream.slice(attr.value),
                })
                .collect(),
            self_closing: tag.self_closing,
            ns: Namespace::Html,
        };
        match tag.kind {
            TagKind::Start => self.sink.token(Token::StartTag(token)),
            TagKind::End => self.sink.token(Token::EndTag(token)),
        }
        if self.ctx.tag.kind == TagKind::Start {
            let name = self.stream.slice(self.ctx.tag.name).to_vec();
            self.ctx.last_start_tag = name;
        }
    }

    /// Remove duplicate attribute names, keeping the first occurrence and
    /// preserving order.
    fn dedup_attributes(&mut self) {
        let removed = {
            let stream = &self.stream;
            let attrs = &mut self.ctx.tag.attrs;
            if attrs.len() < 2 {
                return;
            }
            let mut keep = vec![true; attrs.len()];
            let mut removed = 0usize;
            for i in 0..attrs.len() {
                if !keep[i] {
                    continue;
                }
                for j in i + 1..attrs.len() {
                    if keep[j]
                        && attrs[i].name.len == attrs[j].name.len
                        && stream.compare_range_cs(
                            attrs[i].name.start,
                            attrs[j].name.start,
                            attrs[i].name.len,
                        )
                    {
                        keep[j] = false;
                        removed += 1;
                    }
                }
            }
            if removed > 0 {
                let mut flags = keep.iter();
                attrs.retain(|_| *flags.next().unwrap_or(&true));
            }
            removed
        };
        for _ in 0..removed {
            self.parse_error(ParseError::DuplicateAttribute);
        }
    }

    /// Deliver the accumulated comment body.
    pub(crate) fn emit_comment(&mut self) {
        let span = mem::take(&mut self.ctx.comment);
        let body = self.stream.slice(span);
        self.sink.token(Token::Comment(body));
    }

    /// Deliver the accumulated doctype, deciding correctness from the
    /// (uppercased-in-place) name.
    pub(crate) fn emit_doctype(&mut self) {
        let DoctypeScratch {
            name,
            forced_incorrect,
        } = mem::take(&mut self.ctx.doctype);
        let correct =
            !forced_incorrect && self.stream.compare_range_ascii(name.start, name.len, b"HTML");
        let doctype = Doctype {
            name: self.stream.slice(name),
            public_id: None,
            system_id: None,
            correct,
        };
        self.sink.token(Token::Doctype(doctype));
    }
}
