use crate::error::ParseError;
use crate::token::Token;

/// The consumer of everything the tokenizer produces.
///
/// `token` receives each token exactly once, in recognition order. The
/// remaining hooks are optional observers with no-op defaults: parse
/// errors (never fatal, reported with the byte offset of the offending
/// code point) and buffer relocations (relevant only to sinks that cache
/// raw slices across calls; spans themselves are offsets and survive).
pub trait TokenSink {
    /// Receive one token. Borrowed data is only valid during this call.
    fn token(&mut self, token: Token<'_>);

    /// A recoverable parse error occurred at `offset`.
    fn parse_error(&mut self, error: ParseError, offset: usize) {
        let _ = (error, offset);
    }

    /// The input buffer's backing storage relocated; it now holds
    /// `buffer_len` bytes.
    fn buffer_moved(&mut self, buffer_len: usize) {
        let _ = buffer_len;
    }
}

/// A sink-less tokenizer: every emit is a no-op.
impl TokenSink for () {
    fn token(&mut self, _token: Token<'_>) {}
}

/// Adapter that turns a plain closure into a [`TokenSink`] for callers
/// that only care about tokens.
///
/// ```
/// use html5span::{ByteStream, CallbackSink, Token, Tokenizer};
///
/// let mut count = 0;
/// let mut tokenizer = Tokenizer::new(
///     ByteStream::from("<i>x</i>"),
///     CallbackSink(|_token: Token<'_>| count += 1),
/// );
/// tokenizer.run().unwrap();
/// drop(tokenizer);
/// assert_eq!(count, 4); // start tag, text, end tag, eof
/// ```
pub struct CallbackSink<F>(pub F);

impl<F> TokenSink for CallbackSink<F>
where
    F: FnMut(Token<'_>),
{
    fn token(&mut self, token: Token<'_>) {
        (self.0)(token)
    }
}
