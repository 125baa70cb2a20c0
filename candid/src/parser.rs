//! Loads `.did` service descriptions into the [type graph](crate::types).
//!
//! Supported: `type` declarations and one trailing `service` actor, with every data type the
//! type graph can hold. Imports are rejected. Class-style init arguments on the actor
//! (`service : (InitArgs) -> { ... }`) are parsed and dropped.

use std::borrow::Cow;
use std::collections::BTreeSet;

use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;

use crate::{
    error::ParseError,
    id::unquote,
    tokenizer::{tokenize, Token, TokenCursor},
    CandidId, CandidType, FuncMode, FuncType, ParameterType, PrimitiveType, RecordType,
    ServiceFile, ServiceType, VariantType,
};

lazy_static! {
    static ref COMMENT: Regex = Regex::new(r"(?s)//[^\n]*|/\*.*?\*/").unwrap();
}

/// Operators the tokenizer leaves inside text runs.
const OPERATORS: [&str; 3] = ["->", ",", "="];

pub fn parse_service_file(text: &str) -> Result<ServiceFile, ParseError> {
    let text: Cow<str> = COMMENT.replace_all(text, " ");
    let tokens = split_operators(tokenize(&text)?.into_tokens());
    let mut parser = Parser::new(TokenCursor::new(tokens)?);
    parser.parse_file()?;
    Ok(parser.file)
}

/// Splits `,` `=` and `->` out of unquoted text tokens so that each operator is a text token of
/// its own.
fn split_operators(tokens: Vec<Token<'_>>) -> Vec<Token<'_>> {
    let mut result = Vec::with_capacity(tokens.len());
    for token in tokens {
        let Token::Text(mut rest) = token else {
            result.push(token);
            continue;
        };
        if rest.starts_with('"') {
            result.push(token);
            continue;
        }
        while !rest.is_empty() {
            let operator = OPERATORS
                .iter()
                .filter_map(|op| rest.find(op).map(|index| (index, op.len())))
                .min_by_key(|&(index, _)| index);
            match operator {
                Some((index, len)) => {
                    if index > 0 {
                        result.push(Token::Text(&rest[..index]));
                    }
                    result.push(Token::Text(&rest[index..index + len]));
                    rest = &rest[index + len..];
                }
                None => {
                    result.push(Token::Text(rest));
                    break;
                }
            }
        }
    }
    result
}

fn is_operator(text: &str) -> bool {
    OPERATORS.contains(&text)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FieldContainer {
    Record,
    Variant,
}

impl FieldContainer {
    fn name(self) -> &'static str {
        match self {
            Self::Record => "record",
            Self::Variant => "variant",
        }
    }
}

struct Parser<'a> {
    cursor: TokenCursor<'a>,
    /// Set once the last token has been consumed; the cursor itself cannot move past it.
    exhausted: bool,
    file: ServiceFile,
}

impl<'a> Parser<'a> {
    fn new(cursor: TokenCursor<'a>) -> Self {
        Self {
            cursor,
            exhausted: false,
            file: ServiceFile::default(),
        }
    }

    fn peek(&self) -> Option<Token<'a>> {
        (!self.exhausted).then(|| self.cursor.current())
    }

    fn peek_second(&self) -> Option<Token<'a>> {
        if self.exhausted {
            None
        } else {
            self.cursor.next()
        }
    }

    fn advance(&mut self) {
        if !self.cursor.move_next() {
            self.exhausted = true;
        }
    }

    fn unexpected<T>(&self, expected: &'static str) -> Result<T, ParseError> {
        Err(match self.peek() {
            Some(found) => ParseError::Unexpected {
                expected,
                found: found.to_string(),
            },
            None => ParseError::UnexpectedEnd { expected },
        })
    }

    fn eat(&mut self, token: Token) -> bool {
        if self.peek() == Some(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token<'static>, expected: &'static str) -> Result<(), ParseError> {
        if self.eat(token) {
            Ok(())
        } else {
            self.unexpected(expected)
        }
    }

    fn eat_text(&mut self, text: &str) -> bool {
        self.eat(Token::Text(text))
    }

    fn expect_text(&mut self, text: &'static str) -> Result<(), ParseError> {
        if self.eat_text(text) {
            Ok(())
        } else {
            self.unexpected(text)
        }
    }

    /// Consumes an identifier or label (anything textual that is not an operator).
    fn expect_identifier(&mut self, expected: &'static str) -> Result<&'a str, ParseError> {
        match self.peek() {
            Some(Token::Text(text)) if !is_operator(text) => {
                self.advance();
                Ok(text)
            }
            _ => self.unexpected(expected),
        }
    }

    /// `true` if the upcoming tokens are `<text> :`, i.e. a label.
    fn at_label(&self) -> bool {
        matches!(self.peek(), Some(Token::Text(text)) if !is_operator(text))
            && self.peek_second() == Some(Token::Colon)
    }

    fn parse_file(&mut self) -> Result<(), ParseError> {
        while let Some(token) = self.peek() {
            match token {
                Token::SemiColon => self.advance(),
                Token::Text("type") => {
                    self.advance();
                    self.parse_type_declaration()?;
                }
                Token::Text("import") => {
                    self.advance();
                    let target = self.peek().map(|t| t.to_string()).unwrap_or_default();
                    return Err(ParseError::UnsupportedImport(target));
                }
                Token::Text("service") => {
                    self.advance();
                    self.parse_actor()?;
                    while self.eat(Token::SemiColon) {}
                    if self.peek().is_some() {
                        return self.unexpected("end of input after the service");
                    }
                    return Ok(());
                }
                _ => return self.unexpected("`type` or `service`"),
            }
        }
        Err(ParseError::MissingService)
    }

    fn parse_type_declaration(&mut self) -> Result<(), ParseError> {
        let name = CandidId::named(unquote(self.expect_identifier("type name")?));
        self.expect_text("=")?;
        let type_ = self.parse_data_type()?;
        self.expect(Token::SemiColon, "`;`")?;
        if self.file.declared_types.contains_key(&name) {
            return Err(ParseError::DuplicateType(name));
        }
        self.file.declared_types.insert(name, type_);
        Ok(())
    }

    fn parse_actor(&mut self) -> Result<(), ParseError> {
        if !self.at_colon() {
            let name = self.expect_identifier("service name or `:`")?;
            self.file.service_name = Some(unquote(name).to_string());
        }
        self.expect(Token::Colon, "`:`")?;
        if self.peek() == Some(Token::OpenParen) {
            // Init arguments are not part of the client surface
            self.parse_parameter_list()?;
            self.expect_text("->")?;
        }
        if self.peek() == Some(Token::OpenBrace) {
            self.file.service = self.parse_actor_type()?;
        } else {
            let id = CandidId::named(unquote(self.expect_identifier("service type")?));
            self.file.service = self.lookup_service(&id)?;
            self.file.service_reference_id = Some(id);
        }
        Ok(())
    }

    fn at_colon(&self) -> bool {
        self.peek() == Some(Token::Colon)
    }

    fn parse_data_type(&mut self) -> Result<CandidType, ParseError> {
        let text = match self.peek() {
            Some(Token::Text(text)) if !is_operator(text) => text,
            _ => return self.unexpected("a data type"),
        };
        self.advance();
        let type_ = match text {
            "opt" => CandidType::optional(self.parse_data_type()?),
            "vec" => CandidType::vector(self.parse_data_type()?),
            "blob" => CandidType::vector(PrimitiveType::Nat8.into()),
            "record" => CandidType::Record(RecordType {
                fields: self.parse_fields(FieldContainer::Record)?,
            }),
            "variant" => CandidType::Variant(VariantType {
                options: self.parse_fields(FieldContainer::Variant)?,
            }),
            "func" => CandidType::Func(self.parse_func_signature()?),
            "service" => CandidType::Service(self.parse_actor_type()?),
            _ => match PrimitiveType::from_keyword(text) {
                Some(primitive) => CandidType::Primitive(primitive),
                None => CandidType::Reference(CandidId::named(unquote(text))),
            },
        };
        Ok(type_)
    }

    fn parse_fields(
        &mut self,
        container: FieldContainer,
    ) -> Result<IndexMap<CandidId, CandidType>, ParseError> {
        self.expect(Token::OpenBrace, "`{`")?;
        let mut fields = IndexMap::new();
        // Unlabeled record fields take the id after the previous field's
        let mut next_position = 0u32;
        while !self.eat(Token::CloseBrace) {
            let (id, type_) = if self.at_label() {
                let label = CandidId::parse(self.expect_identifier("field label")?);
                self.advance(); // `:`
                (label, self.parse_data_type()?)
            } else {
                match container {
                    FieldContainer::Record => (
                        CandidId::Numbered(next_position),
                        self.parse_data_type()?,
                    ),
                    FieldContainer::Variant => (
                        CandidId::parse(self.expect_identifier("variant option")?),
                        PrimitiveType::Null.into(),
                    ),
                }
            };
            if fields.contains_key(&id) {
                return Err(ParseError::DuplicateField {
                    field: id,
                    container: container.name(),
                });
            }
            next_position = id.hash().wrapping_add(1);
            fields.insert(id, type_);
            if !self.eat(Token::SemiColon) && self.peek() != Some(Token::CloseBrace) {
                return self.unexpected("`;` or `}`");
            }
        }
        Ok(fields)
    }

    fn parse_parameter_list(&mut self) -> Result<Vec<ParameterType>, ParseError> {
        self.expect(Token::OpenParen, "`(`")?;
        let mut parameters = Vec::new();
        while !self.eat(Token::CloseParen) {
            let name = if self.at_label() {
                let name = unquote(self.expect_identifier("parameter name")?).to_string();
                self.advance(); // `:`
                Some(name)
            } else {
                None
            };
            let type_ = self.parse_data_type()?;
            parameters.push(ParameterType { name, type_ });
            if !self.eat_text(",") && self.peek() != Some(Token::CloseParen) {
                return self.unexpected("`,` or `)`");
            }
        }
        Ok(parameters)
    }

    fn parse_func_signature(&mut self) -> Result<FuncType, ParseError> {
        let arg_types = self.parse_parameter_list()?;
        self.expect_text("->")?;
        let return_types = self.parse_parameter_list()?;
        let mut modes = BTreeSet::new();
        while let Some(mode) = self
            .peek()
            .and_then(|t| t.text())
            .and_then(FuncMode::from_keyword)
        {
            self.advance();
            modes.insert(mode);
        }
        Ok(FuncType {
            modes,
            arg_types,
            return_types,
        })
    }

    fn parse_actor_type(&mut self) -> Result<ServiceType, ParseError> {
        self.expect(Token::OpenBrace, "`{`")?;
        let mut service = ServiceType::default();
        while !self.eat(Token::CloseBrace) {
            let name = unquote(self.expect_identifier("method name")?).to_string();
            self.expect(Token::Colon, "`:`")?;
            let func = if self.peek() == Some(Token::OpenParen) {
                self.parse_func_signature()?
            } else {
                let id = CandidId::named(unquote(self.expect_identifier("method type")?));
                self.lookup_func(&id)?
            };
            if service.methods.contains_key(&name) {
                return Err(ParseError::DuplicateMethod(name));
            }
            service.methods.insert(name, func);
            if !self.eat(Token::SemiColon) && self.peek() != Some(Token::CloseBrace) {
                return self.unexpected("`;` or `}`");
            }
        }
        Ok(service)
    }

    /// Follows reference chains among the types declared so far.
    fn lookup_declared(&self, id: &CandidId) -> Result<&CandidType, ParseError> {
        let mut current = id;
        for _ in 0..=self.file.declared_types.len() {
            match self.file.declared_types.get(current) {
                Some(CandidType::Reference(next)) => current = next,
                Some(type_) => return Ok(type_),
                None => return Err(ParseError::UnknownType(current.to_string())),
            }
        }
        // Only a reference cycle gets here
        Err(ParseError::UnknownType(id.to_string()))
    }

    fn lookup_func(&self, id: &CandidId) -> Result<FuncType, ParseError> {
        match self.lookup_declared(id)? {
            CandidType::Func(func) => Ok(func.clone()),
            _ => Err(ParseError::NotAFunction(id.clone())),
        }
    }

    fn lookup_service(&self, id: &CandidId) -> Result<ServiceType, ParseError> {
        match self.lookup_declared(id)? {
            CandidType::Service(service) => Ok(service.clone()),
            _ => Err(ParseError::NotAService(id.clone())),
        }
    }
}
