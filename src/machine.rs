use crate::entities::{EntityMatcher, EntityStep};
use crate::error::{FatalError, ParseError};
use crate::machine_helper::{cont, eof, peek, switch_to, whitespace_pat, Control};
use crate::sink::TokenSink;
use crate::state::State;
use crate::stream::{Input, Stream};
use crate::token::{ContentModel, Span};
use crate::tokenizer::{DoctypeScratch, TagKind, Tokenizer};

/// Run the handler for the current state once.
///
/// Every handler consumes at most a bounded amount of input and either
/// transitions, continues, or suspends on out-of-data with its scratch
/// intact, so the dispatcher can be re-entered after more input arrives.
pub(crate) fn consume<S: Stream, K: TokenSink, M: EntityMatcher>(
    slf: &mut Tokenizer<S, K, M>,
) -> Result<Control, FatalError> {
    match slf.state {
        State::Data => {
            let stops: &[u8] = match slf.content_model {
                ContentModel::Pcdata | ContentModel::Rcdata => &[b'&', b'<'],
                ContentModel::Cdata => &[b'<'],
                ContentModel::Plaintext => &[],
            };
            let (run_start, _) = slf.stream.cur_pos();
            let run = slf.stream.advance_run(stops);
            if run > 0 {
                slf.ctx.extend_chars(run_start, run);
            }
            match peek!(slf) {
                Some('&')
                    if matches!(
                        slf.content_model,
                        ContentModel::Pcdata | ContentModel::Rcdata
                    ) =>
                {
                    slf.ctx.match_entity.complete = false;
                    slf.ctx.match_entity.return_state = State::EntityData;
                    switch_to!(slf, State::EntityData)
                }
                Some('<') if slf.content_model != ContentModel::Plaintext => {
                    slf.emit_chars();
                    let (pos, width) = slf.stream.cur_pos();
                    slf.ctx.chars = Span { start: pos, len: width };
                    slf.stream.advance();
                    switch_to!(slf, State::TagOpen)
                }
                Some(_) => {
                    let (pos, width) = slf.stream.cur_pos();
                    slf.ctx.extend_chars(pos, width);
                    slf.stream.advance();
                    cont!()
                }
                None => {
                    slf.emit_chars();
                    eof!()
                }
            }
        }

        State::EntityData => {
            if !slf.ctx.match_entity.complete {
                return begin_entity(slf);
            }
            // the resolved code point (or the unresolved `&`) sits under
            // the cursor; it joins the pending run
            match peek!(slf) {
                Some(_) => {
                    let (pos, width) = slf.stream.cur_pos();
                    slf.ctx.extend_chars(pos, width);
                    slf.stream.advance();
                    switch_to!(slf, State::Data)
                }
                None => switch_to!(slf, State::Data),
            }
        }

        State::TagOpen => match slf.content_model {
            ContentModel::Pcdata => match peek!(slf) {
                Some('!') => {
                    slf.ctx.chars = Span::default();
                    slf.stream.advance();
                    switch_to!(slf, State::MarkupDeclarationOpen)
                }
                Some('/') => {
                    let (pos, width) = slf.stream.cur_pos();
                    slf.ctx.extend_chars(pos, width);
                    slf.stream.advance();
                    switch_to!(slf, State::CloseTagOpen)
                }
                Some(c) if c.is_ascii_alphabetic() => {
                    if c.is_ascii_uppercase() {
                        slf.stream.lowercase();
                    }
                    let (pos, width) = slf.stream.cur_pos();
                    slf.ctx.init_tag(TagKind::Start, pos, width);
                    slf.stream.advance();
                    switch_to!(slf, State::TagName)
                }
                Some('>') => {
                    let (pos, width) = slf.stream.cur_pos();
                    slf.ctx.extend_chars(pos, width);
                    slf.stream.advance();
                    slf.emit_chars();
                    switch_to!(slf, State::Data)
                }
                Some('?') => {
                    slf.parse_error(ParseError::UnexpectedQuestionMarkInsteadOfTagName);
                    slf.ctx.chars = Span::default();
                    let (pos, width) = slf.stream.cur_pos();
                    slf.ctx.comment = Span { start: pos, len: width };
                    slf.stream.advance();
                    switch_to!(slf, State::BogusComment)
                }
                Some(_) => {
                    slf.parse_error(ParseError::InvalidFirstCharacterOfTagName);
                    slf.emit_chars();
                    switch_to!(slf, State::Data)
                }
                None => {
                    slf.parse_error(ParseError::EofBeforeTagName);
                    slf.emit_chars();
                    switch_to!(slf, State::Data)
                }
            },
            ContentModel::Rcdata | ContentModel::Cdata => match peek!(slf) {
                Some('/') => {
                    let (pos, width) = slf.stream.cur_pos();
                    slf.ctx.extend_chars(pos, width);
                    slf.stream.advance();
                    switch_to!(slf, State::CloseTagOpen)
                }
                _ => {
                    slf.emit_chars();
                    switch_to!(slf, State::Data)
                }
            },
            ContentModel::Plaintext => {
                slf.emit_chars();
                switch_to!(slf, State::Data)
            }
        },

        State::CloseTagOpen => {
            if matches!(
                slf.content_model,
                ContentModel::Rcdata | ContentModel::Cdata
            ) {
                slf.ctx.close_tag_matched = 0;
                return switch_to!(slf, State::CloseTagMatch);
            }
            match peek!(slf) {
                Some(c) if c.is_ascii_alphabetic() => {
                    if c.is_ascii_uppercase() {
                        slf.stream.lowercase();
                    }
                    let (pos, width) = slf.stream.cur_pos();
                    slf.ctx.init_tag(TagKind::End, pos, width);
                    slf.stream.advance();
                    switch_to!(slf, State::TagName)
                }
                Some('>') => {
                    slf.parse_error(ParseError::MissingEndTagName);
                    slf.ctx.chars = Span::default();
                    slf.stream.advance();
                    switch_to!(slf, State::Data)
                }
                None => {
                    slf.parse_error(ParseError::EofBeforeTagName);
                    slf.emit_chars();
                    switch_to!(slf, State::Data)
                }
                Some(_) => {
                    slf.parse_error(ParseError::InvalidFirstCharacterOfTagName);
                    slf.ctx.chars = Span::default();
                    let (pos, width) = slf.stream.cur_pos();
                    slf.ctx.comment = Span { start: pos, len: width };
                    slf.stream.advance();
                    switch_to!(slf, State::BogusComment)
                }
            }
        }

        State::CloseTagMatch => loop {
            let want = slf.ctx.last_start_tag.len();
            let matched = slf.ctx.close_tag_matched;
            if want == 0 {
                slf.emit_chars();
                return switch_to!(slf, State::Data);
            }
            if matched == want {
                // full name matched; it must be followed by a delimiter
                // for this to count as a close tag
                return match peek!(slf) {
                    Some(whitespace_pat!() | '>' | '/' | '<') | None => {
                        slf.stream.rewind(matched)?;
                        slf.content_model = ContentModel::Pcdata;
                        switch_to!(slf, State::CloseTagOpen)
                    }
                    Some(_) => {
                        slf.stream.rewind(matched)?;
                        slf.emit_chars();
                        switch_to!(slf, State::Data)
                    }
                };
            }
            match peek!(slf) {
                Some(c)
                    if c.is_ascii()
                        && (c as u8).eq_ignore_ascii_case(&slf.ctx.last_start_tag[matched]) =>
                {
                    slf.stream.advance();
                    slf.ctx.close_tag_matched += 1;
                }
                _ => {
                    slf.stream.rewind(matched)?;
                    slf.emit_chars();
                    return switch_to!(slf, State::Data);
                }
            }
        },

        State::TagName => match peek!(slf) {
            Some(whitespace_pat!()) => {
                slf.stream.advance();
                switch_to!(slf, State::BeforeAttributeName)
            }
            Some('>') => {
                slf.stream.advance();
                slf.emit_tag();
                switch_to!(slf, State::Data)
            }
            Some('/') => {
                slf.ctx.solidus = true;
                slf.stream.advance();
                switch_to!(slf, State::BeforeAttributeName)
            }
            Some('<') => {
                slf.emit_tag();
                switch_to!(slf, State::Data)
            }
            None => {
                slf.parse_error(ParseError::EofInTag);
                slf.emit_tag();
                switch_to!(slf, State::Data)
            }
            Some(c) => {
                if c.is_ascii_uppercase() {
                    slf.stream.lowercase();
                }
                let (_, width) = slf.stream.cur_pos();
                slf.ctx.tag.name.len += width;
                slf.stream.advance();
                cont!()
            }
        },

        State::BeforeAttributeName => match peek!(slf) {
            Some(whitespace_pat!()) => {
                slf.ctx.solidus = false;
                slf.stream.advance();
                cont!()
            }
            Some('/') => {
                slf.ctx.solidus = true;
                slf.stream.advance();
                cont!()
            }
            Some('>') => {
                slf.ctx.tag.self_closing = slf.ctx.solidus;
                slf.stream.advance();
                slf.emit_tag();
                switch_to!(slf, State::Data)
            }
            Some('<') => {
                slf.emit_tag();
                switch_to!(slf, State::Data)
            }
            None => {
                slf.parse_error(ParseError::EofInTag);
                slf.emit_tag();
                switch_to!(slf, State::Data)
            }
            Some(c) => {
                slf.ctx.solidus = false;
                if c.is_ascii_uppercase() {
                    slf.stream.lowercase();
                }
                let (pos, width) = slf.stream.cur_pos();
                slf.ctx.new_attribute(pos, width);
                slf.stream.advance();
                switch_to!(slf, State::AttributeName)
            }
        },

        State::AttributeName => match peek!(slf) {
            Some(whitespace_pat!()) => {
                slf.stream.advance();
                switch_to!(slf, State::AfterAttributeName)
            }
            Some('=') => {
                slf.stream.advance();
                switch_to!(slf, State::BeforeAttributeValue)
            }
            Some('>') => {
                slf.stream.advance();
                slf.emit_tag();
                switch_to!(slf, State::Data)
            }
            Some('/') => {
                slf.ctx.solidus = true;
                slf.stream.advance();
                switch_to!(slf, State::BeforeAttributeName)
            }
            Some('<') => {
                slf.emit_tag();
                switch_to!(slf, State::Data)
            }
            None => {
                slf.parse_error(ParseError::EofInTag);
                slf.emit_tag();
                switch_to!(slf, State::Data)
            }
            Some(c) => {
                if c.is_ascii_uppercase() {
                    slf.stream.lowercase();
                }
                let (_, width) = slf.stream.cur_pos();
                slf.ctx.extend_attr_name(width);
                slf.stream.advance();
                cont!()
            }
        },

        State::AfterAttributeName => match peek!(slf) {
            Some(whitespace_pat!()) => {
                slf.ctx.solidus = false;
                slf.stream.advance();
                cont!()
            }
            Some('=') => {
                slf.stream.advance();
                switch_to!(slf, State::BeforeAttributeValue)
            }
            Some('>') => {
                slf.ctx.tag.self_closing = slf.ctx.solidus;
                slf.stream.advance();
                slf.emit_tag();
                switch_to!(slf, State::Data)
            }
            Some('/') => {
                slf.ctx.solidus = true;
                slf.stream.advance();
                switch_to!(slf, State::BeforeAttributeName)
            }
            Some('<') => {
                slf.emit_tag();
                switch_to!(slf, State::Data)
            }
            None => {
                slf.parse_error(ParseError::EofInTag);
                slf.emit_tag();
                switch_to!(slf, State::Data)
            }
            Some(c) => {
                slf.ctx.solidus = false;
                if c.is_ascii_uppercase() {
                    slf.stream.lowercase();
                }
                let (pos, width) = slf.stream.cur_pos();
                slf.ctx.new_attribute(pos, width);
                slf.stream.advance();
                switch_to!(slf, State::AttributeName)
            }
        },

        State::BeforeAttributeValue => match peek!(slf) {
            Some(whitespace_pat!()) => {
                slf.stream.advance();
                cont!()
            }
            Some('"') => {
                slf.stream.advance();
                switch_to!(slf, State::AttributeValueDoubleQuoted)
            }
            Some('\'') => {
                slf.stream.advance();
                switch_to!(slf, State::AttributeValueSingleQuoted)
            }
            Some('&') => switch_to!(slf, State::AttributeValueUnquoted),
            Some('>') => {
                slf.stream.advance();
                slf.emit_tag();
                switch_to!(slf, State::Data)
            }
            Some('<') => {
                slf.emit_tag();
                switch_to!(slf, State::Data)
            }
            None => {
                slf.parse_error(ParseError::EofInTag);
                slf.emit_tag();
                switch_to!(slf, State::Data)
            }
            Some(_) => {
                let (pos, width) = slf.stream.cur_pos();
                slf.ctx.extend_attr_value(pos, width);
                slf.stream.advance();
                switch_to!(slf, State::AttributeValueUnquoted)
            }
        },

        State::AttributeValueDoubleQuoted => match peek!(slf) {
            Some('"') => {
                slf.stream.advance();
                switch_to!(slf, State::BeforeAttributeName)
            }
            Some('&') => {
                slf.ctx.prev_state = State::AttributeValueDoubleQuoted;
                slf.ctx.match_entity.complete = false;
                slf.ctx.match_entity.return_state = State::EntityInAttributeValue;
                switch_to!(slf, State::EntityInAttributeValue)
            }
            None => {
                slf.parse_error(ParseError::EofInTag);
                slf.emit_tag();
                switch_to!(slf, State::Data)
            }
            Some(_) => {
                let (pos, width) = slf.stream.cur_pos();
                slf.ctx.extend_attr_value(pos, width);
                slf.stream.advance();
                cont!()
            }
        },

        State::AttributeValueSingleQuoted => match peek!(slf) {
            Some('\'') => {
                slf.stream.advance();
                switch_to!(slf, State::BeforeAttributeName)
            }
            Some('&') => {
                slf.ctx.prev_state = State::AttributeValueSingleQuoted;
                slf.ctx.match_entity.complete = false;
                slf.ctx.match_entity.return_state = State::EntityInAttributeValue;
                switch_to!(slf, State::EntityInAttributeValue)
            }
            None => {
                slf.parse_error(ParseError::EofInTag);
                slf.emit_tag();
                switch_to!(slf, State::Data)
            }
            Some(_) => {
                let (pos, width) = slf.stream.cur_pos();
                slf.ctx.extend_attr_value(pos, width);
                slf.stream.advance();
                cont!()
            }
        },

        State::AttributeValueUnquoted => match peek!(slf) {
            Some(whitespace_pat!()) => {
                slf.stream.advance();
                switch_to!(slf, State::BeforeAttributeName)
            }
            Some('&') => {
                slf.ctx.prev_state = State::AttributeValueUnquoted;
                slf.ctx.match_entity.complete = false;
                slf.ctx.match_entity.return_state = State::EntityInAttributeValue;
                switch_to!(slf, State::EntityInAttributeValue)
            }
            Some('>') => {
                slf.stream.advance();
                slf.emit_tag();
                switch_to!(slf, State::Data)
            }
            Some('<') => {
                slf.emit_tag();
                switch_to!(slf, State::Data)
            }
            None => {
                slf.parse_error(ParseError::EofInTag);
                slf.emit_tag();
                switch_to!(slf, State::Data)
            }
            Some(_) => {
                let (pos, width) = slf.stream.cur_pos();
                slf.ctx.extend_attr_value(pos, width);
                slf.stream.advance();
                cont!()
            }
        },

        State::EntityInAttributeValue => {
            if !slf.ctx.match_entity.complete {
                return begin_entity(slf);
            }
            match peek!(slf) {
                Some(_) => {
                    let (pos, width) = slf.stream.cur_pos();
                    slf.ctx.extend_attr_value(pos, width);
                    slf.stream.advance();
                    switch_to!(slf, slf.ctx.prev_state)
                }
                // recoverable: let the value state deal with the EOF
                None => switch_to!(slf, slf.ctx.prev_state),
            }
        }

        State::BogusComment => match peek!(slf) {
            Some('>') => {
                slf.stream.advance();
                slf.emit_comment();
                switch_to!(slf, State::Data)
            }
            None => {
                slf.emit_comment();
                switch_to!(slf, State::Data)
            }
            Some(_) => {
                let (pos, width) = slf.stream.cur_pos();
                slf.ctx.extend_comment(pos, width);
                slf.stream.advance();
                cont!()
            }
        },

        State::MarkupDeclarationOpen => match peek!(slf) {
            Some('-') => {
                slf.ctx.comment = Span::default();
                slf.stream.advance();
                switch_to!(slf, State::CommentStart)
            }
            Some('D' | 'd') => {
                slf.stream.uppercase();
                slf.stream.advance();
                slf.ctx.match_doctype_count = 1;
                switch_to!(slf, State::MatchDoctype)
            }
            _ => {
                slf.parse_error(ParseError::IncorrectlyOpenedComment);
                slf.ctx.comment = Span::default();
                switch_to!(slf, State::BogusComment)
            }
        },

        State::CommentStart => match peek!(slf) {
            Some('-') => {
                slf.stream.advance();
                switch_to!(slf, State::Comment)
            }
            _ => {
                // re-expose the consumed dash so it becomes body data
                slf.stream.push_back(b'-');
                switch_to!(slf, State::BogusComment)
            }
        },

        State::Comment => match peek!(slf) {
            Some('-') => {
                slf.stream.advance();
                switch_to!(slf, State::CommentDash)
            }
            None => {
                slf.parse_error(ParseError::EofInComment);
                slf.emit_comment();
                switch_to!(slf, State::Data)
            }
            Some(_) => {
                let (pos, width) = slf.stream.cur_pos();
                slf.ctx.extend_comment(pos, width);
                slf.stream.advance();
                cont!()
            }
        },

        State::CommentDash => match peek!(slf) {
            Some('-') => {
                slf.stream.advance();
                switch_to!(slf, State::CommentEnd)
            }
            None => {
                slf.parse_error(ParseError::EofInComment);
                slf.emit_comment();
                switch_to!(slf, State::Data)
            }
            Some(_) => {
                // the dash did not close anything: it and the current
                // code point both belong to the body
                let (pos, width) = slf.stream.cur_pos();
                slf.ctx.extend_comment_back(pos, 1);
                slf.ctx.extend_comment(pos, width);
                slf.stream.advance();
                switch_to!(slf, State::Comment)
            }
        },

        State::CommentEnd => match peek!(slf) {
            Some('>') => {
                slf.stream.advance();
                slf.emit_comment();
                switch_to!(slf, State::Data)
            }
            Some('-') => {
                // dash run: the earliest pending dash joins the body,
                // the last two stay pending
                let (pos, _) = slf.stream.cur_pos();
                slf.ctx.extend_comment_back(pos - 1, 1);
                slf.stream.advance();
                cont!()
            }
            None => {
                slf.parse_error(ParseError::EofInComment);
                slf.emit_comment();
                switch_to!(slf, State::Data)
            }
            Some(_) => {
                let (pos, width) = slf.stream.cur_pos();
                slf.ctx.extend_comment_back(pos, 2);
                slf.ctx.extend_comment(pos, width);
                slf.stream.advance();
                switch_to!(slf, State::Comment)
            }
        },

        State::MatchDoctype => {
            const KEYWORD: &[u8] = b"DOCTYPE";
            let count = slf.ctx.match_doctype_count;
            match peek!(slf) {
                Some(c) if c.is_ascii() && (c as u8).eq_ignore_ascii_case(&KEYWORD[count]) => {
                    slf.stream.uppercase();
                    slf.stream.advance();
                    slf.ctx.match_doctype_count += 1;
                    if slf.ctx.match_doctype_count == KEYWORD.len() {
                        slf.ctx.doctype = DoctypeScratch::default();
                        switch_to!(slf, State::Doctype)
                    } else {
                        cont!()
                    }
                }
                _ => {
                    slf.parse_error(ParseError::IncorrectlyOpenedComment);
                    // the (uppercased) prefix re-reads as bogus body
                    slf.stream.rewind(count)?;
                    slf.ctx.comment = Span::default();
                    switch_to!(slf, State::BogusComment)
                }
            }
        }

        State::Doctype => {
            if let Some(whitespace_pat!()) = peek!(slf) {
                slf.stream.advance();
            }
            switch_to!(slf, State::BeforeDoctypeName)
        }

        State::BeforeDoctypeName => match peek!(slf) {
            Some(whitespace_pat!()) => {
                slf.stream.advance();
                cont!()
            }
            Some('>') => {
                slf.parse_error(ParseError::MissingDoctypeName);
                slf.stream.advance();
                slf.emit_doctype();
                switch_to!(slf, State::Data)
            }
            None => {
                slf.parse_error(ParseError::EofInDoctype);
                slf.emit_doctype();
                switch_to!(slf, State::Data)
            }
            Some(c) => {
                if c.is_ascii_lowercase() {
                    slf.stream.uppercase();
                }
                let (pos, width) = slf.stream.cur_pos();
                slf.ctx.doctype.name = Span { start: pos, len: width };
                slf.stream.advance();
                switch_to!(slf, State::DoctypeName)
            }
        },

        State::DoctypeName => match peek!(slf) {
            Some(whitespace_pat!()) => {
                slf.stream.advance();
                switch_to!(slf, State::AfterDoctypeName)
            }
            Some('>') => {
                slf.stream.advance();
                slf.emit_doctype();
                switch_to!(slf, State::Data)
            }
            None => {
                slf.parse_error(ParseError::EofInDoctype);
                slf.emit_doctype();
                switch_to!(slf, State::Data)
            }
            Some(c) => {
                if c.is_ascii_lowercase() {
                    slf.stream.uppercase();
                }
                let (_, width) = slf.stream.cur_pos();
                slf.ctx.doctype.name.len += width;
                slf.stream.advance();
                cont!()
            }
        },

        State::AfterDoctypeName => match peek!(slf) {
            Some(whitespace_pat!()) => {
                slf.stream.advance();
                cont!()
            }
            Some('>') => {
                slf.stream.advance();
                slf.emit_doctype();
                switch_to!(slf, State::Data)
            }
            None => {
                slf.parse_error(ParseError::EofInDoctype);
                slf.emit_doctype();
                switch_to!(slf, State::Data)
            }
            Some(_) => {
                slf.parse_error(ParseError::InvalidCharacterSequenceAfterDoctypeName);
                slf.ctx.doctype.forced_incorrect = true;
                switch_to!(slf, State::BogusDoctype)
            }
        },

        State::BogusDoctype => match peek!(slf) {
            Some('>') => {
                slf.stream.advance();
                slf.emit_doctype();
                switch_to!(slf, State::Data)
            }
            None => {
                slf.emit_doctype();
                switch_to!(slf, State::Data)
            }
            Some(_) => {
                slf.stream.advance();
                cont!()
            }
        },

        State::NumberedEntity => {
            if slf.ctx.match_entity.base.is_none() {
                match peek!(slf) {
                    Some(c) if c.is_ascii() && (c as u8) & !0x20u8 == b'X' => {
                        slf.stream.advance();
                        slf.ctx.match_entity.consumed += 1;
                        slf.ctx.match_entity.base = Some(16);
                    }
                    _ => slf.ctx.match_entity.base = Some(10),
                }
            }
            let base = slf.ctx.match_entity.base.unwrap_or(10);
            loop {
                let next = peek!(slf);
                let Some(digit) = next.and_then(|c| c.to_digit(base)) else {
                    break;
                };
                let value = slf.ctx.match_entity.value;
                slf.ctx.match_entity.value = value
                    .checked_mul(base)
                    .and_then(|shifted| shifted.checked_add(digit))
                    .unwrap_or(0x0011_0000);
                slf.ctx.match_entity.had_digits = true;
                slf.stream.advance();
                slf.ctx.match_entity.consumed += 1;
            }
            let mut semicolon = false;
            if let Some(';') = peek!(slf) {
                slf.stream.advance();
                slf.ctx.match_entity.consumed += 1;
                semicolon = true;
            }
            finish_numbered(slf, semicolon)
        }

        State::NamedEntity => {
            loop {
                let next = peek!(slf);
                let Some(c) = next.filter(char::is_ascii) else {
                    break;
                };
                match slf.matcher.step(c as u8) {
                    EntityStep::NoMore => break,
                    step => {
                        slf.stream.advance();
                        slf.ctx.match_entity.consumed += 1;
                        if let EntityStep::Match(resolved) = step {
                            slf.ctx.match_entity.codepoint = Some(resolved);
                            slf.ctx.match_entity.best = slf.ctx.match_entity.consumed;
                        }
                    }
                }
            }
            // a ';' directly after the longest match joins it, for
            // matchers whose tables store names without the terminator
            if slf.ctx.match_entity.codepoint.is_some()
                && slf.ctx.match_entity.best == slf.ctx.match_entity.consumed
                && !best_match_has_semicolon(slf)
                && matches!(slf.stream.peek(), Input::Char(';'))
            {
                slf.stream.advance();
                slf.ctx.match_entity.consumed += 1;
                slf.ctx.match_entity.best += 1;
            }
            finish_named(slf)
        }
    }
}

/// Shared setup of the entity consumer: step past the `&`, reset the
/// scratch, and pick the numeric or named sub-machine.
fn begin_entity<S: Stream, K: TokenSink, M: EntityMatcher>(
    slf: &mut Tokenizer<S, K, M>,
) -> Result<Control, FatalError> {
    let (offset, amp_width) = slf.stream.cur_pos();
    slf.stream.advance();
    let next = match slf.stream.peek() {
        Input::Ood => {
            // undo, so the setup replays once more input arrives
            slf.stream.rewind(amp_width)?;
            return Ok(Control::Suspend);
        }
        Input::Eof => None,
        Input::Char(c) => Some(c),
    };
    let entity = &mut slf.ctx.match_entity;
    entity.offset = offset;
    entity.consumed = amp_width;
    entity.best = 0;
    entity.codepoint = None;
    entity.base = None;
    entity.value = 0;
    entity.had_digits = false;
    if next == Some('#') {
        slf.stream.advance();
        slf.ctx.match_entity.consumed += 1;
        switch_to!(slf, State::NumberedEntity)
    } else {
        slf.matcher.reset();
        switch_to!(slf, State::NamedEntity)
    }
}

fn finish_numbered<S: Stream, K: TokenSink, M: EntityMatcher>(
    slf: &mut Tokenizer<S, K, M>,
    semicolon: bool,
) -> Result<Control, FatalError> {
    let consumed = slf.ctx.match_entity.consumed;
    let offset = slf.ctx.match_entity.offset;
    slf.stream.rewind(consumed)?;
    if slf.ctx.match_entity.had_digits {
        if !semicolon {
            slf.parse_error(ParseError::MissingSemicolonAfterCharacterReference);
        }
        let value = slf.ctx.match_entity.value;
        match value {
            0 => slf.parse_error(ParseError::NullCharacterReference),
            0x80..=0x9F => slf.parse_error(ParseError::ControlCharacterReference),
            0xD800..=0xDFFF => slf.parse_error(ParseError::SurrogateCharacterReference),
            v if v > 0x0010_FFFF => {
                slf.parse_error(ParseError::CharacterReferenceOutsideUnicodeRange)
            }
            _ => {}
        }
        slf.stream
            .replace_range(offset, consumed, resolve_numeric(value))?;
    } else {
        // "&#" / "&#x" with nothing attached stays in the buffer as data
        slf.parse_error(ParseError::AbsenceOfDigitsInNumericCharacterReference);
    }
    slf.ctx.match_entity.complete = true;
    switch_to!(slf, slf.ctx.match_entity.return_state)
}

fn finish_named<S: Stream, K: TokenSink, M: EntityMatcher>(
    slf: &mut Tokenizer<S, K, M>,
) -> Result<Control, FatalError> {
    let consumed = slf.ctx.match_entity.consumed;
    let offset = slf.ctx.match_entity.offset;
    let best = slf.ctx.match_entity.best;
    let codepoint = slf.ctx.match_entity.codepoint;
    let semicolon = best_match_has_semicolon(slf);
    slf.stream.rewind(consumed)?;
    match codepoint {
        Some(c) => {
            if !semicolon {
                slf.parse_error(ParseError::MissingSemicolonAfterCharacterReference);
            }
            // trailing bytes past the longest match stay in the buffer
            // and re-read as ordinary data
            slf.stream.replace_range(offset, best, c)?;
        }
        None => {
            if consumed > 1 {
                slf.parse_error(ParseError::UnknownNamedCharacterReference);
            }
        }
    }
    slf.ctx.match_entity.complete = true;
    switch_to!(slf, slf.ctx.match_entity.return_state)
}

/// Whether the longest named match currently ends in `;` in the buffer.
fn best_match_has_semicolon<S: Stream, K: TokenSink, M: EntityMatcher>(
    slf: &Tokenizer<S, K, M>,
) -> bool {
    let entity = &slf.ctx.match_entity;
    entity.best > 0
        && slf
            .stream
            .slice(Span {
                start: entity.offset,
                len: entity.best,
            })
            .last()
            == Some(&b';')
}

/// Map a numeric character reference to the code point it denotes.
///
/// Total on all of `u32`: 0x80..=0x9F go through the Windows-1252 table,
/// zero, surrogates and out-of-range values become U+FFFD, everything
/// else is itself.
fn resolve_numeric(value: u32) -> char {
    /// Replacements for 0x80..=0x9F, indexed by `value - 0x80`.
    const WINDOWS_1252: [char; 32] = [
        '\u{20ac}', '\u{fffd}', '\u{201a}', '\u{0192}', '\u{201e}', '\u{2026}', '\u{2020}',
        '\u{2021}', '\u{02c6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{fffd}',
        '\u{017d}', '\u{fffd}', '\u{fffd}', '\u{2018}', '\u{2019}', '\u{201c}', '\u{201d}',
        '\u{2022}', '\u{2013}', '\u{2014}', '\u{02dc}', '\u{2122}', '\u{0161}', '\u{203a}',
        '\u{0153}', '\u{fffd}', '\u{017e}', '\u{0178}',
    ];
    match value {
        0x80..=0x9F => WINDOWS_1252[(value - 0x80) as usize],
        0 => '\u{fffd}',
        value if value > 0x0010_FFFF => '\u{fffd}',
        value => char::from_u32(value).unwrap_or('\u{fffd}'),
    }
}

#[cfg(test)]
mod tests {
    use super::resolve_numeric;

    #[test]
    fn numeric_mapping_windows_1252() {
        assert_eq!(resolve_numeric(0x80), '\u{20ac}');
        assert_eq!(resolve_numeric(0x93), '\u{201c}');
        assert_eq!(resolve_numeric(0x9F), '\u{0178}');
    }

    #[test]
    fn numeric_mapping_is_total() {
        assert_eq!(resolve_numeric(0), '\u{fffd}');
        assert_eq!(resolve_numeric(0x41), 'A');
        assert_eq!(resolve_numeric(0x7F), '\u{7f}');
        assert_eq!(resolve_numeric(0xA0), '\u{a0}');
        assert_eq!(resolve_numeric(0xD800), '\u{fffd}');
        assert_eq!(resolve_numeric(0x10FFFF), '\u{10ffff}');
        assert_eq!(resolve_numeric(0x110000), '\u{fffd}');
        assert_eq!(resolve_numeric(u32::MAX), '\u{fffd}');
    }
}
