#![allow(dead_code)]

use html5span::{ByteStream, ParseError, Token, TokenSink, Tokenizer};

/// Owned mirror of [`Token`] so assertions can outlive the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Chars(Vec<u8>),
    StartTag {
        name: Vec<u8>,
        attrs: Vec<(Vec<u8>, Vec<u8>)>,
        self_closing: bool,
    },
    EndTag {
        name: Vec<u8>,
        attrs: Vec<(Vec<u8>, Vec<u8>)>,
        self_closing: bool,
    },
    Comment(Vec<u8>),
    Doctype {
        name: Vec<u8>,
        correct: bool,
    },
    Eof,
}

#[derive(Debug, Default)]
pub struct Collector {
    pub events: Vec<Event>,
    pub errors: Vec<(ParseError, usize)>,
}

fn owned_attrs(tag: &html5span::Tag<'_>) -> Vec<(Vec<u8>, Vec<u8>)> {
    tag.attributes
        .iter()
        .map(|attr| (attr.name.to_vec(), attr.value.to_vec()))
        .collect()
}

impl TokenSink for Collector {
    fn token(&mut self, token: Token<'_>) {
        let event = match token {
            Token::Characters(data) => Event::Chars(data.to_vec()),
            Token::StartTag(tag) => Event::StartTag {
                name: tag.name.to_vec(),
                attrs: owned_attrs(&tag),
                self_closing: tag.self_closing,
            },
            Token::EndTag(tag) => Event::EndTag {
                name: tag.name.to_vec(),
                attrs: owned_attrs(&tag),
                self_closing: tag.self_closing,
            },
            Token::Comment(body) => Event::Comment(body.to_vec()),
            Token::Doctype(doctype) => Event::Doctype {
                name: doctype.name.to_vec(),
                correct: doctype.correct,
            },
            Token::Eof => Event::Eof,
        };
        self.events.push(event);
    }

    fn parse_error(&mut self, error: ParseError, offset: usize) {
        self.errors.push((error, offset));
    }
}

/// Tokenize a complete document in one go.
pub fn tokenize(input: &str) -> Collector {
    let mut tokenizer = Tokenizer::new(ByteStream::from(input), Collector::default());
    tokenizer.run().expect("tokenizer failed fatally");
    tokenizer.into_sink()
}

/// Merge adjacent character events. Differently-chunked feeds may split
/// runs differently; coalescing makes them comparable.
pub fn coalesce(events: Vec<Event>) -> Vec<Event> {
    let mut out: Vec<Event> = Vec::new();
    for event in events {
        match (out.last_mut(), event) {
            (Some(Event::Chars(run)), Event::Chars(more)) => run.extend(more),
            (_, event) => out.push(event),
        }
    }
    out
}

pub fn chars(data: &str) -> Event {
    Event::Chars(data.as_bytes().to_vec())
}

pub fn start(name: &str, attrs: &[(&str, &str)]) -> Event {
    Event::StartTag {
        name: name.as_bytes().to_vec(),
        attrs: attrs
            .iter()
            .map(|(name, value)| (name.as_bytes().to_vec(), value.as_bytes().to_vec()))
            .collect(),
        self_closing: false,
    }
}

pub fn start_self_closing(name: &str, attrs: &[(&str, &str)]) -> Event {
    match start(name, attrs) {
        Event::StartTag { name, attrs, .. } => Event::StartTag {
            name,
            attrs,
            self_closing: true,
        },
        event => event,
    }
}

pub fn end(name: &str) -> Event {
    Event::EndTag {
        name: name.as_bytes().to_vec(),
        attrs: Vec::new(),
        self_closing: false,
    }
}

pub fn comment(body: &str) -> Event {
    Event::Comment(body.as_bytes().to_vec())
}

pub fn doctype(name: &str, correct: bool) -> Event {
    Event::Doctype {
        name: name.as_bytes().to_vec(),
        correct,
    }
}
