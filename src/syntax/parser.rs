//! Recursive-descent parser for the C++ declaration subset.
//!
//! Only declarations are understood. Function bodies, initializers, default
//! arguments, templates and `friend`/`static_assert` declarations are
//! skipped by brace/paren matching, which is enough to read real library
//! headers without a full C++ grammar.

use smol_str::SmolStr;

use crate::base::TextRange;

use super::ast::*;
use super::lexer::{Token, TokenKind, tokenize};
use super::{ATTRIBUTE_PREFIX, ParseError};

/// Parse one file.
pub fn parse(text: &str) -> Result<SourceFile, ParseError> {
    let tokens = tokenize(text)?;
    let mut parser = Parser {
        text,
        tokens,
        pos: 0,
    };
    let items = parser.parse_items(TokenKind::Eof)?;
    Ok(SourceFile { items })
}

/// Words that make up fundamental type names (`unsigned long long`).
const FUNDAMENTAL_WORDS: &[&str] = &[
    "void", "bool", "char", "wchar_t", "char8_t", "char16_t", "char32_t", "short", "int", "long",
    "float", "double", "signed", "unsigned",
];

fn is_fundamental_word(word: &str) -> bool {
    FUNDAMENTAL_WORDS.contains(&word)
}

/// Export macros such as `USD_API` that prefix declarations in headers.
fn is_export_macro(word: &str) -> bool {
    word.ends_with("_API") && word.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

struct Parser<'t> {
    text: &'t str,
    tokens: Vec<Token>,
    pos: usize,
}

/// Declarator parsed by [`Parser::parse_declaration`].
enum Declared {
    Function(FunctionDecl),
    Field(FieldDecl),
}

type PResult<T> = Result<T, ParseError>;

impl<'t> Parser<'t> {
    // ========================================================================
    // TOKEN CURSOR
    // ========================================================================

    fn current(&self) -> Token {
        self.tokens[self.pos]
    }

    fn kind(&self) -> TokenKind {
        self.current().kind
    }

    fn nth(&self, n: usize) -> TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    fn nth_text(&self, n: usize) -> &'t str {
        self.tokens
            .get(self.pos + n)
            .map(|t| &self.text[t.range])
            .unwrap_or("")
    }

    fn current_text(&self) -> &'t str {
        self.nth_text(0)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.kind() == kind
    }

    fn at_ident(&self, text: &str) -> bool {
        self.at(TokenKind::Ident) && self.current_text() == text
    }

    fn bump(&mut self) -> Token {
        let token = self.current();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn error_here(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.current().range)
    }

    fn expect(&mut self, kind: TokenKind, context: &str) -> PResult<Token> {
        if self.at(kind) {
            return Ok(self.bump());
        }
        Err(self.error_here(format!(
            "expected {} {}, found {}",
            kind.describe(),
            context,
            self.found()
        )))
    }

    fn expect_ident(&mut self, context: &str) -> PResult<SmolStr> {
        if self.at(TokenKind::Ident) {
            let text = self.current_text();
            self.bump();
            return Ok(SmolStr::new(text));
        }
        Err(self.error_here(format!("expected identifier {}, found {}", context, self.found())))
    }

    fn found(&self) -> String {
        match self.kind() {
            TokenKind::Eof => "end of file".to_string(),
            _ => format!("'{}'", self.current_text()),
        }
    }

    fn range_from(&self, start: TextRange) -> TextRange {
        let end = self
            .pos
            .checked_sub(1)
            .map(|i| self.tokens[i].range.end())
            .unwrap_or(start.end());
        TextRange::new(start.start(), end.max(start.start()))
    }

    // ========================================================================
    // SKIPPING
    // ========================================================================

    /// Skip a bracketed group starting at the current `open` token.
    fn skip_balanced(&mut self, open: TokenKind, close: TokenKind) -> PResult<()> {
        let start = self.expect(open, "to open group")?;
        let mut depth = 1usize;
        while depth > 0 {
            match self.kind() {
                TokenKind::Eof => {
                    return Err(ParseError::new(
                        format!("unclosed {}", open.describe()),
                        start.range,
                    ));
                }
                k if k == open => depth += 1,
                k if k == close => depth -= 1,
                _ => {}
            }
            self.bump();
        }
        Ok(())
    }

    /// Skip tokens up to (not including) one of `stops` at nesting depth 0.
    /// Returns the skipped text with tokens concatenated.
    fn skip_expression(&mut self, stops: &[TokenKind]) -> PResult<String> {
        let mut text = String::new();
        let mut depth = 0usize;
        loop {
            let kind = self.kind();
            if kind == TokenKind::Eof {
                return Err(self.error_here("unexpected end of file in expression"));
            }
            if depth == 0 && stops.contains(&kind) {
                return Ok(text);
            }
            match kind {
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => depth += 1,
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                    if depth == 0 {
                        return Err(self.error_here(format!("unbalanced {}", kind.describe())));
                    }
                    depth -= 1;
                }
                _ => {}
            }
            text.push_str(self.current_text());
            self.bump();
        }
    }

    /// Skip a whole declaration: up to a `;` at depth 0, or through a
    /// braced body (and its optional trailing `;`).
    fn skip_declaration(&mut self) -> PResult<()> {
        loop {
            match self.kind() {
                TokenKind::Eof => return Err(self.error_here("unexpected end of file in declaration")),
                TokenKind::Semi => {
                    self.bump();
                    return Ok(());
                }
                TokenKind::LBrace => {
                    self.skip_balanced(TokenKind::LBrace, TokenKind::RBrace)?;
                    self.eat(TokenKind::Semi);
                    return Ok(());
                }
                TokenKind::LParen => self.skip_balanced(TokenKind::LParen, TokenKind::RParen)?,
                TokenKind::LBracket => self.skip_balanced(TokenKind::LBracket, TokenKind::RBracket)?,
                TokenKind::RBrace => return Err(self.error_here("unexpected '}' in declaration")),
                _ => {
                    self.bump();
                }
            }
        }
    }

    // ========================================================================
    // NAMESPACE SCOPE
    // ========================================================================

    fn parse_items(&mut self, terminator: TokenKind) -> PResult<Vec<Item>> {
        let mut items = Vec::new();
        while !self.at(terminator) {
            if self.at(TokenKind::Eof) {
                return Err(self.error_here(format!("expected {} before end of file", terminator.describe())));
            }
            self.parse_item(&mut items)?;
        }
        Ok(items)
    }

    fn parse_item(&mut self, items: &mut Vec<Item>) -> PResult<()> {
        let attributes = self.parse_attributes()?;

        match self.kind() {
            TokenKind::Semi => {
                reject_attributes(&attributes, "an empty declaration")?;
                self.bump();
            }
            TokenKind::Inline if self.nth(1) == TokenKind::Namespace => {
                reject_attributes(&attributes, "a namespace")?;
                self.bump();
                items.push(self.parse_namespace()?);
            }
            TokenKind::Namespace => {
                reject_attributes(&attributes, "a namespace")?;
                items.push(self.parse_namespace()?);
            }
            TokenKind::Extern if self.nth(1) == TokenKind::String => {
                reject_attributes(&attributes, "an extern block")?;
                let start = self.bump().range;
                self.bump();
                if self.eat(TokenKind::LBrace) {
                    let inner = self.parse_items(TokenKind::RBrace)?;
                    self.expect(TokenKind::RBrace, "to close extern block")?;
                    items.push(Item::Namespace(NamespaceDef {
                        name: None,
                        items: inner,
                        range: self.range_from(start),
                    }));
                } else {
                    self.parse_item(items)?;
                }
            }
            TokenKind::Template | TokenKind::StaticAssert => {
                reject_attributes(&attributes, "a template")?;
                self.skip_declaration()?;
            }
            TokenKind::Using => {
                match self.parse_using(attributes)? {
                    Some(Member::Using(using)) => items.push(Item::Using(using)),
                    Some(Member::TypeAlias(alias)) => items.push(Item::TypeAlias(alias)),
                    _ => {}
                }
            }
            TokenKind::Typedef => {
                reject_attributes(&attributes, "a typedef")?;
                items.push(Item::TypeAlias(self.parse_typedef()?));
            }
            TokenKind::Class | TokenKind::Struct | TokenKind::Union => {
                let record = self.parse_record(attributes)?;
                items.push(Item::Record(record));
            }
            TokenKind::Enum => {
                if let Some(def) = self.parse_enum(attributes)? {
                    items.push(Item::Enum(def));
                }
            }
            _ => {
                for declared in self.parse_declaration(attributes, None, Access::Public)? {
                    items.push(match declared {
                        Declared::Function(f) => Item::Function(f),
                        Declared::Field(v) => Item::Variable(v),
                    });
                }
            }
        }
        Ok(())
    }

    fn parse_namespace(&mut self) -> PResult<Item> {
        let start = self.expect(TokenKind::Namespace, "")?.range;

        if self.at(TokenKind::Ident) && self.nth(1) == TokenKind::Eq {
            let alias = self.expect_ident("for namespace alias")?;
            self.bump();
            let target = self.parse_path()?;
            self.expect(TokenKind::Semi, "after namespace alias")?;
            return Ok(Item::NamespaceAlias(NamespaceAliasDef {
                alias,
                target,
                range: self.range_from(start),
            }));
        }

        // `namespace a::b { }` nests; an unnamed namespace has no segments.
        let mut names = Vec::new();
        if self.at(TokenKind::Ident) {
            names.push(self.expect_ident("")?);
            while self.eat(TokenKind::ColonColon) {
                names.push(self.expect_ident("in nested namespace name")?);
            }
        }

        self.expect(TokenKind::LBrace, "to open namespace")?;
        let mut items = self.parse_items(TokenKind::RBrace)?;
        self.expect(TokenKind::RBrace, "to close namespace")?;
        let range = self.range_from(start);

        if names.is_empty() {
            return Ok(Item::Namespace(NamespaceDef { name: None, items, range }));
        }
        while names.len() > 1 {
            let name = names.pop();
            items = vec![Item::Namespace(NamespaceDef { name, items, range })];
        }
        Ok(Item::Namespace(NamespaceDef {
            name: names.pop(),
            items,
            range,
        }))
    }

    fn parse_path(&mut self) -> PResult<Path> {
        let global = self.eat(TokenKind::ColonColon);
        let mut segments = vec![self.expect_ident("in qualified name")?];
        while self.at(TokenKind::ColonColon) && self.nth(1) == TokenKind::Ident {
            self.bump();
            segments.push(self.expect_ident("after '::'")?);
        }
        Ok(Path { global, segments })
    }

    /// `CPPMM_NAME` or `CPPMM_NAME(arg, ...)`, repeated.
    fn parse_attributes(&mut self) -> PResult<Vec<Attribute>> {
        let mut attributes = Vec::new();
        while self.at(TokenKind::Ident) && self.current_text().starts_with(ATTRIBUTE_PREFIX) {
            let start = self.current().range;
            let name = SmolStr::new(self.current_text());
            self.bump();
            let mut args = Vec::new();
            if self.eat(TokenKind::LParen) {
                while !self.at(TokenKind::RParen) {
                    let arg = self.skip_expression(&[TokenKind::Comma, TokenKind::RParen])?;
                    args.push(SmolStr::new(arg));
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::RParen, "to close attribute arguments")?;
            }
            attributes.push(Attribute {
                name,
                args,
                range: self.range_from(start),
            });
        }
        Ok(attributes)
    }

    fn parse_using(&mut self, attributes: Vec<Attribute>) -> PResult<Option<Member>> {
        let start = self.expect(TokenKind::Using, "")?.range;

        if self.at(TokenKind::Namespace) {
            reject_attributes(&attributes, "a using directive")?;
            self.skip_declaration()?;
            return Ok(None);
        }

        if self.at(TokenKind::Ident) && self.nth(1) == TokenKind::Eq {
            reject_attributes(&attributes, "a type alias")?;
            let name = self.expect_ident("for type alias")?;
            self.bump();
            let ty = self.parse_type()?;
            self.expect(TokenKind::Semi, "after type alias")?;
            return Ok(Some(Member::TypeAlias(TypeAliasDecl {
                name,
                ty,
                range: self.range_from(start),
            })));
        }

        self.eat(TokenKind::Typename);
        let path = self.parse_path()?;
        self.expect(TokenKind::Semi, "after using declaration")?;
        Ok(Some(Member::Using(UsingDecl {
            attributes,
            path,
            range: self.range_from(start),
        })))
    }

    fn parse_typedef(&mut self) -> PResult<TypeAliasDecl> {
        let start = self.expect(TokenKind::Typedef, "")?.range;
        let ty = self.parse_type()?;
        let name = self.expect_ident("for typedef name")?;
        self.expect(TokenKind::Semi, "after typedef")?;
        Ok(TypeAliasDecl {
            name,
            ty,
            range: self.range_from(start),
        })
    }

    // ========================================================================
    // RECORDS AND ENUMS
    // ========================================================================

    fn parse_record(&mut self, leading: Vec<Attribute>) -> PResult<RecordDef> {
        let start = self.current().range;
        let keyword = match self.bump().kind {
            TokenKind::Class => RecordKeyword::Class,
            TokenKind::Struct => RecordKeyword::Struct,
            _ => RecordKeyword::Union,
        };

        while self.at(TokenKind::Ident) && is_export_macro(self.current_text()) {
            self.bump();
        }
        if self.at(TokenKind::LBrace) {
            return Err(self.error_here(format!("anonymous {} is not supported", keyword.as_str())));
        }
        let name = self.expect_ident(&format!("after '{}'", keyword.as_str()))?;

        if self.eat(TokenKind::Semi) {
            return Ok(RecordDef {
                keyword,
                name,
                bases: Vec::new(),
                members: None,
                attributes: leading,
                range: self.range_from(start),
            });
        }

        if self.at_ident("final") {
            self.bump();
        }

        let default_access = match keyword {
            RecordKeyword::Class => Access::Private,
            _ => Access::Public,
        };

        let mut bases = Vec::new();
        if self.eat(TokenKind::Colon) {
            loop {
                let mut access = default_access;
                loop {
                    match self.kind() {
                        TokenKind::Public => access = Access::Public,
                        TokenKind::Protected => access = Access::Protected,
                        TokenKind::Private => access = Access::Private,
                        TokenKind::Virtual => {}
                        _ => break,
                    }
                    self.bump();
                }
                let path = self.parse_path()?;
                if self.at(TokenKind::Lt) {
                    self.parse_template_args()?;
                }
                bases.push(BaseSpec { path, access });
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }

        self.expect(TokenKind::LBrace, &format!("to open '{}'", name))?;
        let members = self.parse_members(&name, default_access)?;
        self.expect(TokenKind::RBrace, &format!("to close '{}'", name))?;

        let mut attributes = leading;
        attributes.extend(self.parse_attributes()?);
        self.expect(TokenKind::Semi, &format!("after definition of '{}'", name))?;

        Ok(RecordDef {
            keyword,
            name,
            bases,
            members: Some(members),
            attributes,
            range: self.range_from(start),
        })
    }

    fn parse_members(&mut self, class_name: &str, default_access: Access) -> PResult<Vec<Member>> {
        let mut members = Vec::new();
        let mut access = default_access;

        while !self.at(TokenKind::RBrace) {
            if self.at(TokenKind::Eof) {
                return Err(self.error_here(format!("expected '}}' to close '{}'", class_name)));
            }

            match self.kind() {
                TokenKind::Public | TokenKind::Protected | TokenKind::Private
                    if self.nth(1) == TokenKind::Colon =>
                {
                    access = match self.bump().kind {
                        TokenKind::Public => Access::Public,
                        TokenKind::Protected => Access::Protected,
                        _ => Access::Private,
                    };
                    self.bump();
                    continue;
                }
                TokenKind::Semi => {
                    self.bump();
                    continue;
                }
                TokenKind::Friend | TokenKind::Template | TokenKind::StaticAssert => {
                    self.skip_declaration()?;
                    continue;
                }
                _ => {}
            }

            let attributes = self.parse_attributes()?;
            match self.kind() {
                TokenKind::Using => {
                    if let Some(member) = self.parse_using(attributes)? {
                        members.push(member);
                    }
                }
                TokenKind::Typedef => {
                    reject_attributes(&attributes, "a typedef")?;
                    members.push(Member::TypeAlias(self.parse_typedef()?));
                }
                TokenKind::Class | TokenKind::Struct | TokenKind::Union => {
                    members.push(Member::Record(self.parse_record(attributes)?));
                }
                TokenKind::Enum => {
                    if let Some(def) = self.parse_enum(attributes)? {
                        members.push(Member::Enum(def));
                    }
                }
                _ => {
                    for declared in self.parse_declaration(attributes, Some(class_name), access)? {
                        members.push(match declared {
                            Declared::Function(f) => Member::Function(f),
                            Declared::Field(f) => Member::Field(f),
                        });
                    }
                }
            }
        }
        Ok(members)
    }

    /// Returns `None` for opaque enum declarations (`enum class E : int;`).
    fn parse_enum(&mut self, leading: Vec<Attribute>) -> PResult<Option<EnumDef>> {
        let start = self.expect(TokenKind::Enum, "")?.range;
        let scoped = self.eat(TokenKind::Class) || self.eat(TokenKind::Struct);
        while self.at(TokenKind::Ident) && is_export_macro(self.current_text()) {
            self.bump();
        }
        if self.at(TokenKind::LBrace) {
            return Err(self.error_here("anonymous enums are not supported"));
        }
        let name = self.expect_ident("after 'enum'")?;
        let underlying = if self.eat(TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };

        if self.eat(TokenKind::Semi) {
            return Ok(None);
        }

        self.expect(TokenKind::LBrace, &format!("to open enum '{}'", name))?;
        let mut variants = Vec::new();
        while !self.at(TokenKind::RBrace) {
            let variant = self.expect_ident("for enumerator")?;
            let value = if self.eat(TokenKind::Eq) {
                let text = self.skip_expression(&[TokenKind::Comma, TokenKind::RBrace])?;
                Some(SmolStr::new(text))
            } else {
                None
            };
            variants.push(Enumerator { name: variant, value });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace, &format!("to close enum '{}'", name))?;

        let mut attributes = leading;
        attributes.extend(self.parse_attributes()?);
        self.expect(TokenKind::Semi, &format!("after enum '{}'", name))?;

        Ok(Some(EnumDef {
            name,
            scoped,
            underlying,
            variants,
            attributes,
            range: self.range_from(start),
        }))
    }

    // ========================================================================
    // DECLARATIONS
    // ========================================================================

    /// A function or one-or-more field/variable declarators.
    ///
    /// Out-of-line definitions (`Foo::bar() {}`) and macro invocations are
    /// skipped and yield nothing.
    fn parse_declaration(
        &mut self,
        attributes: Vec<Attribute>,
        class_name: Option<&str>,
        access: Access,
    ) -> PResult<Vec<Declared>> {
        let start = self.current().range;
        let mut is_static = false;
        let mut is_virtual = false;

        loop {
            match self.kind() {
                TokenKind::Static => is_static = true,
                TokenKind::Virtual => is_virtual = true,
                TokenKind::Inline
                | TokenKind::Explicit
                | TokenKind::Constexpr
                | TokenKind::Extern
                | TokenKind::Mutable => {}
                TokenKind::Ident if is_export_macro(self.current_text()) => {}
                _ => break,
            }
            self.bump();
        }

        let mut decl = FunctionDecl {
            attributes,
            kind: FunctionKind::Normal,
            name: SmolStr::default(),
            returns: None,
            params: Vec::new(),
            is_variadic: false,
            is_const: false,
            is_static,
            is_virtual,
            is_pure: false,
            is_deleted: false,
            has_body: false,
            access,
            range: start,
        };

        // Destructor
        if self.eat(TokenKind::Tilde) {
            let name = self.expect_ident("after '~'")?;
            decl.kind = FunctionKind::Destructor;
            decl.name = SmolStr::new(format!("~{}", name));
            self.parse_function_tail(&mut decl)?;
            decl.range = self.range_from(start);
            return Ok(vec![Declared::Function(decl)]);
        }

        // Constructor
        if let Some(class_name) = class_name {
            if self.at_ident(class_name) && self.nth(1) == TokenKind::LParen {
                decl.kind = FunctionKind::Constructor;
                decl.name = self.expect_ident("")?;
                self.parse_function_tail(&mut decl)?;
                decl.range = self.range_from(start);
                return Ok(vec![Declared::Function(decl)]);
            }
        }

        // Conversion operator
        if self.eat(TokenKind::Operator) {
            let target = self.parse_type()?;
            decl.kind = FunctionKind::Operator;
            decl.name = SmolStr::new(format!("operator {}", type_spelling(&target)));
            self.parse_function_tail(&mut decl)?;
            decl.range = self.range_from(start);
            return Ok(vec![Declared::Function(decl)]);
        }

        let ty = self.parse_type()?;

        if self.eat(TokenKind::Operator) {
            decl.kind = FunctionKind::Operator;
            decl.name = self.parse_operator_name()?;
            decl.returns = Some(ty);
            self.parse_function_tail(&mut decl)?;
            decl.range = self.range_from(start);
            return Ok(vec![Declared::Function(decl)]);
        }

        // `Foo::bar(...) {}` or `SOME_MACRO(...)`: nothing to declare.
        if self.at(TokenKind::LParen) || (self.at(TokenKind::Ident) && self.nth(1) == TokenKind::ColonColon) {
            self.skip_declaration()?;
            return Ok(Vec::new());
        }

        let name = self.expect_ident("for declaration name")?;

        if self.at(TokenKind::LParen) {
            decl.name = name;
            decl.returns = Some(ty);
            self.parse_function_tail(&mut decl)?;
            decl.range = self.range_from(start);
            return Ok(vec![Declared::Function(decl)]);
        }

        let mut fields = Vec::new();
        let mut name = name;
        loop {
            let extent = if self.eat(TokenKind::LBracket) {
                let text = self.skip_expression(&[TokenKind::RBracket])?;
                self.expect(TokenKind::RBracket, "to close array extent")?;
                Some(SmolStr::new(text))
            } else {
                None
            };
            if self.eat(TokenKind::Colon) {
                // bit-field width
                self.skip_expression(&[TokenKind::Comma, TokenKind::Semi, TokenKind::Eq])?;
            }
            if self.eat(TokenKind::Eq) {
                self.skip_expression(&[TokenKind::Comma, TokenKind::Semi])?;
            } else if self.at(TokenKind::LBrace) {
                self.skip_balanced(TokenKind::LBrace, TokenKind::RBrace)?;
            }

            fields.push(Declared::Field(FieldDecl {
                attributes: decl.attributes.clone(),
                ty: ty.clone(),
                name,
                extent,
                is_static,
                access,
                range: self.range_from(start),
            }));

            if !self.eat(TokenKind::Comma) {
                break;
            }
            name = self.expect_ident("for declarator")?;
        }
        self.expect(TokenKind::Semi, "after field declaration")?;
        Ok(fields)
    }

    fn parse_operator_name(&mut self) -> PResult<SmolStr> {
        let symbol = match self.kind() {
            TokenKind::LParen if self.nth(1) == TokenKind::RParen => {
                self.bump();
                self.bump();
                "()".to_string()
            }
            TokenKind::LBracket if self.nth(1) == TokenKind::RBracket => {
                self.bump();
                self.bump();
                "[]".to_string()
            }
            TokenKind::Eof | TokenKind::LParen | TokenKind::Semi => {
                return Err(self.error_here("expected operator symbol after 'operator'"));
            }
            _ => {
                let text = self.current_text().to_string();
                self.bump();
                text
            }
        };
        Ok(SmolStr::new(format!("operator{}", symbol)))
    }

    /// Parameters, qualifiers and the terminator (`;`, `= 0;`, or a body).
    fn parse_function_tail(&mut self, decl: &mut FunctionDecl) -> PResult<()> {
        self.expect(TokenKind::LParen, &format!("after '{}'", decl.name))?;

        if self.at_ident("void") && self.nth(1) == TokenKind::RParen {
            self.bump();
        }
        while !self.at(TokenKind::RParen) {
            if self.eat(TokenKind::Ellipsis) {
                decl.is_variadic = true;
                break;
            }
            let mut ty = self.parse_type()?;
            let name = if self.at(TokenKind::Ident) {
                Some(self.expect_ident("")?)
            } else {
                None
            };
            while self.eat(TokenKind::LBracket) {
                self.skip_expression(&[TokenKind::RBracket])?;
                self.expect(TokenKind::RBracket, "to close array parameter")?;
                ty.pointer_depth += 1;
            }
            let has_default = if self.eat(TokenKind::Eq) {
                self.skip_expression(&[TokenKind::Comma, TokenKind::RParen])?;
                true
            } else {
                false
            };
            decl.params.push(ParamDecl { ty, name, has_default });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen, &format!("to close parameters of '{}'", decl.name))?;

        loop {
            match self.kind() {
                TokenKind::Const => decl.is_const = true,
                TokenKind::Volatile | TokenKind::Amp | TokenKind::AmpAmp => {}
                TokenKind::Noexcept => {
                    self.bump();
                    if self.at(TokenKind::LParen) {
                        self.skip_balanced(TokenKind::LParen, TokenKind::RParen)?;
                    }
                    continue;
                }
                TokenKind::Arrow => {
                    self.bump();
                    decl.returns = Some(self.parse_type()?);
                    continue;
                }
                TokenKind::Ident if matches!(self.current_text(), "override" | "final") => {}
                _ => break,
            }
            self.bump();
        }

        if self.eat(TokenKind::Eq) {
            match self.kind() {
                TokenKind::Number if self.current_text() == "0" => decl.is_pure = true,
                TokenKind::Ident if self.current_text() == "default" => {}
                TokenKind::Ident if self.current_text() == "delete" => decl.is_deleted = true,
                _ => return Err(self.error_here(format!("expected '0', 'default' or 'delete', found {}", self.found()))),
            }
            self.bump();
            self.expect(TokenKind::Semi, &format!("after declaration of '{}'", decl.name))?;
            return Ok(());
        }

        if self.at(TokenKind::Colon) {
            // constructor initializer list
            self.skip_expression(&[TokenKind::LBrace])?;
        }
        if self.at(TokenKind::LBrace) {
            self.skip_balanced(TokenKind::LBrace, TokenKind::RBrace)?;
            self.eat(TokenKind::Semi);
            decl.has_body = true;
            return Ok(());
        }

        self.expect(TokenKind::Semi, &format!("after declaration of '{}'", decl.name))?;
        Ok(())
    }

    // ========================================================================
    // TYPES
    // ========================================================================

    fn parse_type(&mut self) -> PResult<TypeExpr> {
        let mut is_const = false;
        loop {
            match self.kind() {
                TokenKind::Const => is_const = true,
                TokenKind::Volatile
                | TokenKind::Typename
                | TokenKind::Class
                | TokenKind::Struct
                | TokenKind::Union
                | TokenKind::Enum => {}
                _ => break,
            }
            self.bump();
        }

        let path = if self.at(TokenKind::Ident) && is_fundamental_word(self.current_text()) {
            let mut words = Vec::new();
            while self.at(TokenKind::Ident) && is_fundamental_word(self.current_text()) {
                words.push(self.current_text());
                self.bump();
            }
            Path::single(words.join(" "))
        } else if self.at(TokenKind::Ident) || self.at(TokenKind::ColonColon) {
            self.parse_path()?
        } else {
            return Err(self.error_here(format!("expected type, found {}", self.found())));
        };

        let args = if self.at(TokenKind::Lt) {
            self.parse_template_args()?
        } else {
            Vec::new()
        };

        while matches!(self.kind(), TokenKind::Const | TokenKind::Volatile) {
            if self.bump().kind == TokenKind::Const {
                is_const = true;
            }
        }

        let mut pointer_depth = 0u8;
        while self.eat(TokenKind::Star) {
            pointer_depth = pointer_depth.saturating_add(1);
            while matches!(self.kind(), TokenKind::Const | TokenKind::Volatile) {
                self.bump();
            }
        }

        let reference = if self.eat(TokenKind::AmpAmp) {
            RefKind::RValue
        } else if self.eat(TokenKind::Amp) {
            RefKind::LValue
        } else {
            RefKind::None
        };

        Ok(TypeExpr {
            path,
            args,
            is_const,
            pointer_depth,
            reference,
        })
    }

    fn parse_template_args(&mut self) -> PResult<Vec<TypeExpr>> {
        self.expect(TokenKind::Lt, "to open template arguments")?;
        let mut args = Vec::new();
        while !self.at(TokenKind::Gt) {
            if self.at(TokenKind::Number) {
                let text = self.current_text();
                self.bump();
                args.push(TypeExpr::named(Path::single(text)));
            } else {
                args.push(self.parse_type()?);
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::Gt, "to close template arguments")?;
        Ok(args)
    }
}

/// Render a parsed type back to C++ spelling (used for conversion operator
/// names).
pub fn type_spelling(ty: &TypeExpr) -> String {
    let mut out = String::new();
    if ty.is_const {
        out.push_str("const ");
    }
    if ty.path.global {
        out.push_str("::");
    }
    out.push_str(&ty.path.segments.join("::"));
    if !ty.args.is_empty() {
        let args: Vec<String> = ty.args.iter().map(type_spelling).collect();
        out.push('<');
        out.push_str(&args.join(", "));
        out.push('>');
    }
    for _ in 0..ty.pointer_depth {
        out.push('*');
    }
    match ty.reference {
        RefKind::None => {}
        RefKind::LValue => out.push('&'),
        RefKind::RValue => out.push_str("&&"),
    }
    out
}

/// Only records, enums, functions, fields and using-declarations carry
/// attributes.
fn reject_attributes(attributes: &[Attribute], target: &str) -> PResult<()> {
    match attributes.first() {
        Some(attr) => Err(ParseError::new(
            format!("attribute '{}' cannot be applied to {}", attr.name, target),
            attr.range,
        )),
        None => Ok(()),
    }
}
