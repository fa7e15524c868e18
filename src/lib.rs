#![deny(missing_docs)]
// This is an HTML parser. HTML can be untrusted input from the internet.
#![forbid(unsafe_code)]

//! A resumable, span-based WHATWG HTML5 tokenizer.
//!
//! The tokenizer turns a stream of decoded code points into character
//! runs, start/end tags (with attributes and a self-closing flag),
//! comments, DOCTYPEs and an end-of-file marker, recovering from
//! malformed input instead of failing. Tokens borrow byte spans directly
//! from the input buffer; character references are resolved by rewriting
//! the matched bytes in place.
//!
//! ```
//! use html5span::{ByteStream, CallbackSink, Token, Tokenizer};
//!
//! let mut names: Vec<Vec<u8>> = Vec::new();
//! let mut tokenizer = Tokenizer::new(
//!     ByteStream::from("<p class=greeting>hi</p>"),
//!     CallbackSink(|token: Token<'_>| {
//!         if let Token::StartTag(tag) = token {
//!             names.push(tag.name.to_vec());
//!         }
//!     }),
//! );
//! tokenizer.run().unwrap();
//! drop(tokenizer);
//! assert_eq!(names, [b"p".to_vec()]);
//! ```
//!
//! Streaming input works by feeding a [`ByteStream`] incrementally:
//! [`Tokenizer::run`] returns [`Status::Suspended`] when it runs out of
//! data mid-token and resumes exactly where it left off once more bytes
//! have been appended. Closing the stream yields [`Token::Eof`].
//!
//! Content-model switching (RCDATA for `<title>`, CDATA for `<script>`,
//! PLAINTEXT) is the caller's decision, made between tokens via
//! [`Tokenizer::set_content_model`]; the tokenizer itself resets to
//! PCDATA when a matching close tag ends such a section.

mod entities;
mod error;
mod machine;
mod machine_helper;
mod sink;
mod state;
mod stream;
mod token;
mod tokenizer;

pub use entities::{EntityMatcher, EntityStep, NamedEntities};
pub use error::{FatalError, ParseError};
pub use sink::{CallbackSink, TokenSink};
pub use stream::{ByteStream, Input, Stream, StreamError};
pub use token::{Attribute, ContentModel, Doctype, Namespace, Span, Tag, Token};
pub use tokenizer::{Status, Tokenizer};
