use expect_test::{expect, Expect};

use super::*;
use token::{Position, Span, TokenKind};

fn check_kinds(input: &str, expect: Expect) {
    let tokens = lex(input).unwrap();
    let kinds: Vec<TokenKind> = tokens.into_iter().map(|t| t.kind).collect();
    expect.assert_eq(&format!("{:?}", kinds));
}

#[test]
fn lex_simple_assignment() {
    check_kinds(
        "x = 1\n",
        expect![[r#"[Identifier("x"), Equal, Integer(1), Newline, Eof]"#]],
    );
}

#[test]
fn lex_missing_trailing_newline_is_synthesized() {
    check_kinds(
        "x = 1",
        expect![[r#"[Identifier("x"), Equal, Integer(1), Newline, Eof]"#]],
    );
}

#[test]
fn lex_empty_input() {
    check_kinds("", expect![[r#"[Eof]"#]]);
    check_kinds("\n\n# only a comment\n", expect![[r#"[Eof]"#]]);
}

#[test]
fn lex_function_definition_block() {
    check_kinds(
        "def f(a):\n    return a\n",
        expect![[r#"[Def, Identifier("f"), LeftParen, Identifier("a"), RightParen, Colon, Newline, Indent, Return, Identifier("a"), Newline, Dedent, Eof]"#]],
    );
}

#[test]
fn lex_blank_and_comment_lines_are_skipped() {
    check_kinds(
        "x = 1\n\n# comment\ny = 2",
        expect![[r#"[Identifier("x"), Equal, Integer(1), Newline, Identifier("y"), Equal, Integer(2), Newline, Eof]"#]],
    );
}

#[test]
fn lex_newlines_inside_brackets_are_ignored() {
    check_kinds(
        "f(1,\n  2)\n",
        expect![[r#"[Identifier("f"), LeftParen, Integer(1), Comma, Integer(2), RightParen, Newline, Eof]"#]],
    );
}

#[test]
fn lex_nested_blocks_close_with_multiple_dedents() {
    check_kinds(
        "if a:\n    if b:\n        x\ny\n",
        expect![[r#"[If, Identifier("a"), Colon, Newline, Indent, If, Identifier("b"), Colon, Newline, Indent, Identifier("x"), Newline, Dedent, Dedent, Identifier("y"), Newline, Eof]"#]],
    );
}

#[test]
fn lex_open_blocks_closed_at_end_of_input() {
    check_kinds(
        "if a:\n    x",
        expect![[r#"[If, Identifier("a"), Colon, Newline, Indent, Identifier("x"), Newline, Dedent, Eof]"#]],
    );
}

#[test]
fn lex_operators() {
    check_kinds(
        "a ** b // c != d <= e % f",
        expect![[r#"[Identifier("a"), DoubleStar, Identifier("b"), DoubleSlash, Identifier("c"), NotEqual, Identifier("d"), LessEqual, Identifier("e"), Percent, Identifier("f"), Newline, Eof]"#]],
    );
}

#[test]
fn lex_keywords() {
    check_kinds(
        "lambda x: not x and y or z is w",
        expect![[r#"[Lambda, Identifier("x"), Colon, Not, Identifier("x"), And, Identifier("y"), Or, Identifier("z"), Is, Identifier("w"), Newline, Eof]"#]],
    );
}

#[test]
fn lex_builtin_constants_are_identifiers() {
    check_kinds(
        "True False None",
        expect![[r#"[Identifier("True"), Identifier("False"), Identifier("None"), Newline, Eof]"#]],
    );
}

#[test]
fn lex_numbers() {
    check_kinds(
        "3.14 1_000 7",
        expect![[r#"[Float(3.14), Integer(1000), Integer(7), Newline, Eof]"#]],
    );
}

#[test]
fn lex_number_followed_by_attribute_dot() {
    check_kinds(
        "1 .real",
        expect![[r#"[Integer(1), Dot, Identifier("real"), Newline, Eof]"#]],
    );
}

#[test]
fn lex_strings_with_both_quote_styles() {
    let tokens = lex(r#"'it\'s' "a\tb""#).unwrap();
    assert_eq!(tokens[0].kind, TokenKind::String("it's".to_string()));
    assert_eq!(tokens[1].kind, TokenKind::String("a\tb".to_string()));
}

#[test]
fn lex_token_spans() {
    let tokens = lex("x = 10\nyy").unwrap();
    assert_eq!(
        tokens[2].span,
        Span::new(Position::new(1, 5), Position::new(1, 7))
    );
    assert_eq!(
        tokens[4].span,
        Span::new(Position::new(2, 1), Position::new(2, 3))
    );
}

#[test]
fn lex_unterminated_string() {
    assert_eq!(
        lex("'abc"),
        Err(LexError::UnterminatedString {
            position: Position::new(1, 1)
        })
    );
    assert_eq!(
        lex("x = \"abc\ny"),
        Err(LexError::UnterminatedString {
            position: Position::new(1, 5)
        })
    );
}

#[test]
fn lex_unexpected_character() {
    assert_eq!(
        lex("a ? b"),
        Err(LexError::UnexpectedCharacter {
            ch: '?',
            position: Position::new(1, 3)
        })
    );
}

#[test]
fn lex_oversized_integer_saturates() {
    check_kinds(
        "99999999999999999999",
        expect![[r#"[Integer(9223372036854775807), Newline, Eof]"#]],
    );
}

#[test]
fn lex_invalid_number() {
    assert!(matches!(
        lex("0x10"),
        Err(LexError::InvalidNumber { .. })
    ));
}

#[test]
fn lex_inconsistent_dedent() {
    assert_eq!(
        lex("if a:\n    x\n  y\n"),
        Err(LexError::InconsistentIndentation {
            position: Position::new(3, 3)
        })
    );
}
