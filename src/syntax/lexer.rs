//! Tokenizer for the C++ declaration subset.
//!
//! Comments, whitespace and preprocessor lines (`#include`, `#pragma`, ...)
//! never reach the parser.

use logos::Logos;

use crate::base::{TextRange, TextSize};

use super::ParseError;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*([^*]|\*+[^*/])*\*+/")]
#[logos(skip r"#[^\n]*")]
pub enum TokenKind {
    // Keywords
    #[token("namespace")]
    Namespace,
    #[token("class")]
    Class,
    #[token("struct")]
    Struct,
    #[token("union")]
    Union,
    #[token("enum")]
    Enum,
    #[token("using")]
    Using,
    #[token("typedef")]
    Typedef,
    #[token("typename")]
    Typename,
    #[token("template")]
    Template,
    #[token("const")]
    Const,
    #[token("constexpr")]
    Constexpr,
    #[token("volatile")]
    Volatile,
    #[token("static")]
    Static,
    #[token("virtual")]
    Virtual,
    #[token("inline")]
    Inline,
    #[token("explicit")]
    Explicit,
    #[token("extern")]
    Extern,
    #[token("friend")]
    Friend,
    #[token("mutable")]
    Mutable,
    #[token("operator")]
    Operator,
    #[token("noexcept")]
    Noexcept,
    #[token("public")]
    Public,
    #[token("protected")]
    Protected,
    #[token("private")]
    Private,
    #[token("static_assert")]
    StaticAssert,

    // Literals and names
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,
    #[regex(r"[0-9][0-9A-Za-z_.']*")]
    Number,
    #[regex(r#""([^"\\\n]|\\.)*""#)]
    String,
    #[regex(r"'([^'\\\n]|\\.)*'")]
    Char,

    // Punctuation
    #[token("::")]
    ColonColon,
    #[token(":")]
    Colon,
    #[token(";")]
    Semi,
    #[token(",")]
    Comma,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("=")]
    Eq,
    #[token("*")]
    Star,
    #[token("&&")]
    AmpAmp,
    #[token("&")]
    Amp,
    #[token("~")]
    Tilde,
    #[token("...")]
    Ellipsis,
    #[token("->")]
    Arrow,
    /// Operators that only show up inside skipped expressions and
    /// `operator` names.
    #[regex(r"[-+/%^!?.|]")]
    #[token("==")]
    #[token("!=")]
    #[token("<=")]
    #[token(">=")]
    #[token("||")]
    #[token("+=")]
    #[token("-=")]
    #[token("*=")]
    #[token("/=")]
    #[token("++")]
    #[token("--")]
    #[token("<<")]
    Punct,

    /// End of input, appended by [`tokenize`].
    Eof,
}

impl TokenKind {
    /// Human-readable spelling for error messages.
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::Ident => "identifier",
            TokenKind::Number => "number",
            TokenKind::String => "string literal",
            TokenKind::Char => "character literal",
            TokenKind::ColonColon => "'::'",
            TokenKind::Colon => "':'",
            TokenKind::Semi => "';'",
            TokenKind::Comma => "','",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBracket => "'['",
            TokenKind::RBracket => "']'",
            TokenKind::Lt => "'<'",
            TokenKind::Gt => "'>'",
            TokenKind::Eq => "'='",
            TokenKind::Star => "'*'",
            TokenKind::AmpAmp => "'&&'",
            TokenKind::Amp => "'&'",
            TokenKind::Tilde => "'~'",
            TokenKind::Ellipsis => "'...'",
            TokenKind::Arrow => "'->'",
            TokenKind::Punct => "operator",
            TokenKind::Eof => "end of file",
            _ => "keyword",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub range: TextRange,
}

/// Split `text` into tokens, terminated by a single [`TokenKind::Eof`].
pub fn tokenize(text: &str) -> Result<Vec<Token>, ParseError> {
    let mut lexer = TokenKind::lexer(text);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let range = TextRange::new(
            TextSize::from(span.start as u32),
            TextSize::from(span.end as u32),
        );
        match result {
            Ok(kind) => tokens.push(Token { kind, range }),
            Err(()) => {
                return Err(ParseError::new(
                    format!("unexpected character '{}'", lexer.slice()),
                    range,
                ));
            }
        }
    }

    let end = TextSize::of(text);
    tokens.push(Token {
        kind: TokenKind::Eof,
        range: TextRange::empty(end),
    });
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<TokenKind> {
        tokenize(text).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_keywords_beat_identifiers() {
        assert_eq!(
            kinds("class classy const"),
            vec![TokenKind::Class, TokenKind::Ident, TokenKind::Const, TokenKind::Eof]
        );
    }

    #[test]
    fn test_comments_and_preprocessor_skipped() {
        let text = "#include \"bind_defs.hpp\"\n// line\n/* block\n * more */ namespace";
        assert_eq!(kinds(text), vec![TokenKind::Namespace, TokenKind::Eof]);
    }

    #[test]
    fn test_reference_and_scope_tokens() {
        assert_eq!(
            kinds("const ::pxr::TfToken &"),
            vec![
                TokenKind::Const,
                TokenKind::ColonColon,
                TokenKind::Ident,
                TokenKind::ColonColon,
                TokenKind::Ident,
                TokenKind::Amp,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_ranges_point_into_source() {
        let tokens = tokenize("  Foo").unwrap();
        assert_eq!(tokens[0].range, TextRange::new(2.into(), 5.into()));
    }

    #[test]
    fn test_unknown_character_is_an_error() {
        let err = tokenize("class @Foo").unwrap_err();
        assert!(err.message.contains("'@'"));
    }
}
