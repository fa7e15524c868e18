use crate::stream::StreamError;

macro_rules! impl_error {
    ($(
        $string:literal <=> $variant:ident,
    )*) => {
        /// All parse errors this tokenizer can report.
        ///
        /// Parse errors are never fatal; the tokenizer recovers and keeps
        /// producing tokens. They are delivered through
        /// [`crate::TokenSink::parse_error`] together with the byte offset
        /// of the offending code point.
        #[derive(Debug, Eq, PartialEq, Clone, Copy)]
        pub enum ParseError {
            $(
                #[doc = "The `"]
                #[doc = $string]
                #[doc = "` error."]
                $variant
            ),*
        }

        impl std::str::FromStr for ParseError {
            type Err = ();

            /// Parse a `kebab-case` error code as typically written in the
            /// WHATWG spec into an enum variant.
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $string => Ok(Self::$variant), )*
                    _ => Err(())
                }
            }
        }

        impl ParseError {
            /// Convert an enum variant back into the `kebab-case` error
            /// code as typically written in the WHATWG spec.
            #[must_use]
            pub fn as_str(&self) -> &'static str {
                match *self {
                    $( Self::$variant => $string, )*
                }
            }
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.as_str().fmt(f)
    }
}

impl_error! {
    "absence-of-digits-in-numeric-character-reference" <=> AbsenceOfDigitsInNumericCharacterReference,
    "character-reference-outside-unicode-range" <=> CharacterReferenceOutsideUnicodeRange,
    "control-character-reference" <=> ControlCharacterReference,
    "duplicate-attribute" <=> DuplicateAttribute,
    "end-tag-with-attributes" <=> EndTagWithAttributes,
    "end-tag-with-trailing-solidus" <=> EndTagWithTrailingSolidus,
    "eof-before-tag-name" <=> EofBeforeTagName,
    "eof-in-comment" <=> EofInComment,
    "eof-in-doctype" <=> EofInDoctype,
    "eof-in-tag" <=> EofInTag,
    "incorrectly-opened-comment" <=> IncorrectlyOpenedComment,
    "invalid-character-sequence-after-doctype-name" <=> InvalidCharacterSequenceAfterDoctypeName,
    "invalid-first-character-of-tag-name" <=> InvalidFirstCharacterOfTagName,
    "missing-doctype-name" <=> MissingDoctypeName,
    "missing-end-tag-name" <=> MissingEndTagName,
    "missing-semicolon-after-character-reference" <=> MissingSemicolonAfterCharacterReference,
    "null-character-reference" <=> NullCharacterReference,
    "surrogate-character-reference" <=> SurrogateCharacterReference,
    "unexpected-question-mark-instead-of-tag-name" <=> UnexpectedQuestionMarkInsteadOfTagName,
    "unknown-named-character-reference" <=> UnknownNamedCharacterReference,
}

/// An unrecoverable tokenizer failure.
///
/// Parse errors never end up here; this covers the resource taxonomy
/// (cursor rewinds past the buffer, span replacements out of bounds).
/// After [`crate::Tokenizer::run`] returns one of these the tokenizer must
/// not be re-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FatalError {
    /// The input stream rejected an operation.
    #[error("input stream error: {0}")]
    Stream(#[from] StreamError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn error_code_round_trip() {
        let error = ParseError::from_str("duplicate-attribute").unwrap();
        assert_eq!(error, ParseError::DuplicateAttribute);
        assert_eq!(error.as_str(), "duplicate-attribute");
        assert!(ParseError::from_str("no-such-error").is_err());
    }
}
