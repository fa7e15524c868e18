mod common;

use common::{
    chars, coalesce, comment, doctype, end, start, start_self_closing, tokenize, Event,
};
use html5span::{ByteStream, ContentModel, ParseError, Tokenizer};
use pretty_assertions::assert_eq;

fn events(input: &str) -> Vec<Event> {
    coalesce(tokenize(input).events)
}

#[test]
fn simple_element() {
    assert_eq!(
        events("<p>hi</p>"),
        [start("p", &[]), chars("hi"), end("p"), Event::Eof]
    );
}

#[test]
fn attribute_with_entity() {
    assert_eq!(
        events("<a href=\"x&amp;y\">z</a>"),
        [
            start("a", &[("href", "x&y")]),
            chars("z"),
            end("a"),
            Event::Eof
        ]
    );
}

#[test]
fn doctype_html_is_correct() {
    assert_eq!(
        events("<!DOCTYPE html>"),
        [doctype("HTML", true), Event::Eof]
    );
}

#[test]
fn doctype_lowercase_is_uppercased() {
    assert_eq!(
        events("<!doctype html>"),
        [doctype("HTML", true), Event::Eof]
    );
}

#[test]
fn doctype_other_name_is_incorrect() {
    assert_eq!(
        events("<!DOCTYPE xhtml>"),
        [doctype("XHTML", false), Event::Eof]
    );
}

#[test]
fn doctype_without_name() {
    let collector = tokenize("<!DOCTYPE>");
    assert_eq!(
        coalesce(collector.events),
        [doctype("", false), Event::Eof]
    );
    assert!(collector
        .errors
        .iter()
        .any(|(error, _)| *error == ParseError::MissingDoctypeName));
}

#[test]
fn doctype_trailing_junk_goes_bogus() {
    assert_eq!(
        events("<!DOCTYPE html PUBLIC \"-//W3C//DTD HTML 4.01//EN\">"),
        [doctype("HTML", false), Event::Eof]
    );
}

#[test]
fn comment_keeps_inner_dashes() {
    assert_eq!(
        events("<!-- a -- b -->"),
        [comment(" a -- b "), Event::Eof]
    );
}

#[test]
fn empty_comment() {
    assert_eq!(events("<!---->"), [comment(""), Event::Eof]);
}

#[test]
fn comment_with_dash_run() {
    assert_eq!(events("<!-- x --->"), [comment(" x -"), Event::Eof]);
}

#[test]
fn comment_dash_then_close() {
    // a lone dash before `>` rejoins the body together with the `>`
    assert_eq!(events("<!--->"), [comment("->"), Event::Eof]);
}

#[test]
fn unterminated_comment_still_emitted() {
    let collector = tokenize("<!--a");
    assert_eq!(coalesce(collector.events), [comment("a"), Event::Eof]);
    assert!(collector
        .errors
        .iter()
        .any(|(error, _)| *error == ParseError::EofInComment));
}

#[test]
fn single_dash_markup_is_bogus() {
    assert_eq!(events("<!-x>"), [comment("-x"), Event::Eof]);
}

#[test]
fn question_mark_is_bogus_comment() {
    assert_eq!(events("<?php x?>"), [comment("?php x?"), Event::Eof]);
}

#[test]
fn doctype_keyword_mismatch_is_bogus_comment() {
    assert_eq!(events("<!DOCX>"), [comment("DOCX"), Event::Eof]);
}

#[test]
fn doctype_keyword_prefix_is_uppercased_in_bogus_body() {
    assert_eq!(events("<!docty>"), [comment("DOCTY"), Event::Eof]);
}

#[test]
fn duplicate_attributes_keep_first() {
    let collector = tokenize("<X a=1 A=2>");
    assert_eq!(
        coalesce(collector.events),
        [start("x", &[("a", "1")]), Event::Eof]
    );
    assert!(collector
        .errors
        .iter()
        .any(|(error, _)| *error == ParseError::DuplicateAttribute));
}

#[test]
fn duplicate_attributes_preserve_order() {
    assert_eq!(
        events("<i a=1 b=2 a=3 c=4>"),
        [
            start("i", &[("a", "1"), ("b", "2"), ("c", "4")]),
            Event::Eof
        ]
    );
}

#[test]
fn attribute_variants() {
    assert_eq!(
        events("<a b=c d e='f' g = h>"),
        [
            start("a", &[("b", "c"), ("d", ""), ("e", "f"), ("g", "h")]),
            Event::Eof
        ]
    );
}

#[test]
fn self_closing_tag() {
    assert_eq!(
        events("<br/>"),
        [start_self_closing("br", &[]), Event::Eof]
    );
    assert_eq!(
        events("<a x/>"),
        [start_self_closing("a", &[("x", "")]), Event::Eof]
    );
    assert_eq!(
        events("<a href=\"x\"/>"),
        [start_self_closing("a", &[("href", "x")]), Event::Eof]
    );
}

#[test]
fn solidus_not_before_gt_is_not_self_closing() {
    assert_eq!(events("<a / >"), [start("a", &[]), Event::Eof]);
    assert_eq!(events("<a/b>"), [start("a", &[("b", "")]), Event::Eof]);
    // inside an unquoted value the slash is value data
    assert_eq!(
        events("<a b=1/>"),
        [start("a", &[("b", "1/")]), Event::Eof]
    );
}

#[test]
fn empty_end_tag_is_dropped() {
    let collector = tokenize("x</>y");
    assert_eq!(coalesce(collector.events), [chars("xy"), Event::Eof]);
    assert!(collector
        .errors
        .iter()
        .any(|(error, _)| *error == ParseError::MissingEndTagName));
}

#[test]
fn end_tag_with_attributes_is_reported() {
    let collector = tokenize("</p attr>");
    assert_eq!(
        coalesce(collector.events),
        [
            Event::EndTag {
                name: b"p".to_vec(),
                attrs: vec![(b"attr".to_vec(), Vec::new())],
                self_closing: false,
            },
            Event::Eof
        ]
    );
    assert!(collector
        .errors
        .iter()
        .any(|(error, _)| *error == ParseError::EndTagWithAttributes));
}

#[test]
fn stray_lt_is_data() {
    assert_eq!(events("a<>b"), [chars("a<>b"), Event::Eof]);
    assert_eq!(events("a< b"), [chars("a< b"), Event::Eof]);
}

#[test]
fn lt_terminates_tag_and_reprocesses() {
    assert_eq!(
        events("<a<b>"),
        [start("a", &[]), start("b", &[]), Event::Eof]
    );
}

#[test]
fn numeric_references() {
    assert_eq!(events("&#x41;&#65;"), [chars("AA"), Event::Eof]);
    assert_eq!(events("&#38;#38;"), [chars("&#38;"), Event::Eof]);
}

#[test]
fn numeric_reference_fixups() {
    assert_eq!(events("&#x80;"), [chars("\u{20ac}"), Event::Eof]);
    assert_eq!(events("&#x9f;"), [chars("\u{178}"), Event::Eof]);
    let collector = tokenize("&#0;");
    assert_eq!(
        coalesce(collector.events),
        [chars("\u{fffd}"), Event::Eof]
    );
    assert!(collector
        .errors
        .iter()
        .any(|(error, _)| *error == ParseError::NullCharacterReference));
    assert_eq!(events("&#x110000;"), [chars("\u{fffd}"), Event::Eof]);
    assert_eq!(events("&#xD800;"), [chars("\u{fffd}"), Event::Eof]);
}

#[test]
fn numeric_reference_without_digits_stays_data() {
    let collector = tokenize("&#x good");
    assert_eq!(
        coalesce(collector.events),
        [chars("&#x good"), Event::Eof]
    );
    assert!(collector.errors.iter().any(
        |(error, _)| *error == ParseError::AbsenceOfDigitsInNumericCharacterReference
    ));
}

#[test]
fn named_reference_longest_match() {
    // "not" is a known reference; the rest of the run is plain data
    assert_eq!(
        events("&notanentity;"),
        [chars("\u{ac}anentity;"), Event::Eof]
    );
    assert_eq!(events("&ampx"), [chars("&x"), Event::Eof]);
}

#[test]
fn named_reference_without_semicolon() {
    let collector = tokenize("&amp");
    assert_eq!(coalesce(collector.events), [chars("&"), Event::Eof]);
    assert!(collector
        .errors
        .iter()
        .any(|(error, _)| *error == ParseError::MissingSemicolonAfterCharacterReference));
}

#[test]
fn named_reference_trailing_semicolon_is_not_eaten() {
    assert_eq!(events("&amp;;"), [chars("&;"), Event::Eof]);
}

#[test]
fn unknown_reference_is_left_alone() {
    assert_eq!(events("&zzz;"), [chars("&zzz;"), Event::Eof]);
    assert_eq!(events("x&&y"), [chars("x&&y"), Event::Eof]);
    assert_eq!(events("&"), [chars("&"), Event::Eof]);
}

#[test]
fn entity_in_unquoted_value() {
    assert_eq!(
        events("<a b=x&amp;>"),
        [start("a", &[("b", "x&")]), Event::Eof]
    );
}

#[test]
fn entity_in_single_quoted_value() {
    assert_eq!(
        events("<a b='&lt;tag&gt;'>"),
        [start("a", &[("b", "<tag>")]), Event::Eof]
    );
}

#[test]
fn lone_ampersand_at_quote_end() {
    assert_eq!(
        events("<a b=\"&\">"),
        [start("a", &[("b", "&")]), Event::Eof]
    );
}

#[test]
fn unterminated_quoted_value_emits_tag_at_eof() {
    let collector = tokenize("<a b=\"&");
    assert_eq!(
        coalesce(collector.events),
        [start("a", &[("b", "&")]), Event::Eof]
    );
    assert!(collector
        .errors
        .iter()
        .any(|(error, _)| *error == ParseError::EofInTag));
}

#[test]
fn rcdata_only_matching_close_tag_ends_it() {
    // switch models after the start tag, the way a tree builder would
    let mut tokenizer = Tokenizer::new(ByteStream::new(), common::Collector::default());
    tokenizer.stream_mut().append(b"<title>");
    tokenizer.run().unwrap();
    tokenizer.set_content_model(ContentModel::Rcdata);
    tokenizer.stream_mut().append(b"a<b</div>c</title>d");
    tokenizer.stream_mut().close();
    tokenizer.run().unwrap();
    assert_eq!(
        coalesce(tokenizer.into_sink().events),
        [
            start("title", &[]),
            chars("a<b</div>c"),
            end("title"),
            chars("d"),
            Event::Eof
        ]
    );
}

#[test]
fn rcdata_resolves_entities() {
    let mut tokenizer = Tokenizer::new(
        ByteStream::from("&amp;</title>"),
        common::Collector::default(),
    );
    tokenizer.set_content_model(ContentModel::Rcdata);
    tokenizer.set_last_start_tag(Some(b"title"));
    tokenizer.run().unwrap();
    assert_eq!(
        coalesce(tokenizer.into_sink().events),
        [chars("&"), end("title"), Event::Eof]
    );
}

#[test]
fn cdata_treats_ampersand_as_data() {
    let mut tokenizer = Tokenizer::new(
        ByteStream::from("1 &amp; 2</script>"),
        common::Collector::default(),
    );
    tokenizer.set_content_model(ContentModel::Cdata);
    tokenizer.set_last_start_tag(Some(b"script"));
    tokenizer.run().unwrap();
    assert_eq!(
        coalesce(tokenizer.into_sink().events),
        [chars("1 &amp; 2"), end("script"), Event::Eof]
    );
}

#[test]
fn close_tag_match_is_case_insensitive() {
    let mut tokenizer = Tokenizer::new(
        ByteStream::from("x</TiTlE >"),
        common::Collector::default(),
    );
    tokenizer.set_content_model(ContentModel::Rcdata);
    tokenizer.set_last_start_tag(Some(b"title"));
    tokenizer.run().unwrap();
    assert_eq!(
        coalesce(tokenizer.into_sink().events),
        [chars("x"), end("title"), Event::Eof]
    );
}

#[test]
fn close_tag_match_requires_delimiter() {
    let mut tokenizer = Tokenizer::new(
        ByteStream::from("</titles>"),
        common::Collector::default(),
    );
    tokenizer.set_content_model(ContentModel::Rcdata);
    tokenizer.set_last_start_tag(Some(b"title"));
    tokenizer.run().unwrap();
    assert_eq!(
        coalesce(tokenizer.into_sink().events),
        [chars("</titles>"), Event::Eof]
    );
}

#[test]
fn close_tag_match_eof_mid_name_reverts_to_text() {
    let mut tokenizer = Tokenizer::new(ByteStream::from("a</tit"), common::Collector::default());
    tokenizer.set_content_model(ContentModel::Rcdata);
    tokenizer.set_last_start_tag(Some(b"title"));
    tokenizer.run().unwrap();
    assert_eq!(
        coalesce(tokenizer.into_sink().events),
        [chars("a</tit"), Event::Eof]
    );
}

#[test]
fn plaintext_swallows_everything() {
    let mut tokenizer = Tokenizer::new(
        ByteStream::from("a<b>&amp;</plaintext>"),
        common::Collector::default(),
    );
    tokenizer.set_content_model(ContentModel::Plaintext);
    tokenizer.run().unwrap();
    assert_eq!(
        coalesce(tokenizer.into_sink().events),
        [chars("a<b>&amp;</plaintext>"), Event::Eof]
    );
}

#[test]
fn eof_inside_tag_emits_tag() {
    let collector = tokenize("<a href=x");
    assert_eq!(
        coalesce(collector.events),
        [start("a", &[("href", "x")]), Event::Eof]
    );
}

#[test]
fn eof_after_open_angle() {
    let collector = tokenize("<");
    assert_eq!(coalesce(collector.events), [chars("<"), Event::Eof]);
    let collector = tokenize("</");
    assert_eq!(coalesce(collector.events), [chars("</"), Event::Eof]);
}

#[test]
fn non_ascii_text_and_names() {
    assert_eq!(
        events("<p>caf\u{e9} &egrave;</p>"),
        [
            start("p", &[]),
            chars("caf\u{e9} \u{e8}"),
            end("p"),
            Event::Eof
        ]
    );
}

#[test]
fn error_offsets_point_into_the_input() {
    let collector = tokenize("ab<?x>");
    let (error, offset) = collector.errors[0];
    assert_eq!(error, ParseError::UnexpectedQuestionMarkInsteadOfTagName);
    assert_eq!(offset, 3);
}
