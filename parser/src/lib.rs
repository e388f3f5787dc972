pub mod span;
pub mod hl;

use std::{iter, slice::Iter};

use itertools::{Itertools, MultiPeek, PeekingNext};
use span::{Positioned, Span};
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Error, Clone, PartialEq)]
#[error("{message} (line {line}, column {column})")]
pub struct SyntaxError {
  pub message: String,
  pub line: usize,
  pub column: usize,
}

impl SyntaxError {
  fn new(message: String, span: Span) -> Self {
    SyntaxError {
      message,
      line: span.line + 1,
      column: span.column + 1,
    }
  }

  fn end_of_input(expected: &str) -> Self {
    SyntaxError {
      message: format!("unexpected end of input, expected {}", expected),
      line: 0,
      column: 0,
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Delimiter {
  ParenOpen,
  ParenClose,
  BracketOpen,
  BracketClose,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
  /// Identifiers and keywords. Keywords are contextual, `type` is also a
  /// valid field name.
  Ident(String),
  Delimiter(Delimiter),
  Colon,
  Comma,
  Question,
  Arrow,
  Comment(String),
}

trait PeekNum<T: Iterator<Item = (usize, char)>> {
  fn peek_num(&mut self, n: usize) -> String;
  fn consume_num(&mut self, n: usize);
}

impl<T: Iterator<Item = (usize, char)>> PeekNum<T> for MultiPeek<T> {
  fn peek_num(&mut self, n: usize) -> String {
    let mut buffer = String::new();

    for _ in 0..n {
      if let Some(&(_, c)) = self.peek() {
        buffer.push(c);
      } else {
        break;
      }
    }
    self.reset_peek();

    buffer
  }

  fn consume_num(&mut self, n: usize) {
    for _ in 0..n {
      if self.next().is_none() {
        break;
      }
    }
  }
}

fn is_ident_continue(ch: char) -> bool {
  ch.is_ascii_alphanumeric() || ch == '_' || ch == '.' || ch == '-'
}

pub fn tokenizer(input: &str) -> Result<Vec<Positioned<Token>>, SyntaxError> {
  let mut tokens: Vec<Positioned<Token>> = Vec::new();
  let mut iter = itertools::multipeek(input.char_indices());

  let mut line: usize = 0;
  let mut column: usize = 0;

  while let Some((pos, ch)) = iter.next() {
    let span = Span::new(pos, pos + ch.len_utf8(), line, column);

    match ch {
      '\n' => {
        line += 1;
        column = 0;
        continue;
      }
      ch if ch.is_whitespace() => {}
      '#' => {
        let comment = iter::from_fn(|| iter.by_ref().peeking_next(|(_, c)| *c != '\n').map(|(_, c)| c)).collect::<String>();
        column += comment.chars().count();

        let span = Span::new(pos, pos + 1 + comment.len(), line, span.column);
        tokens.push(Positioned::new(Token::Comment(comment.trim().to_owned()), span));
      }
      '-' if iter.peek_num(">".len()) == ">" => {
        iter.consume_num(">".len());
        column += 1;
        tokens.push(Positioned::new(Token::Arrow, Span::new(pos, pos + "->".len(), line, span.column)));
      }
      '(' => tokens.push(Positioned::new(Token::Delimiter(Delimiter::ParenOpen), span)),
      ')' => tokens.push(Positioned::new(Token::Delimiter(Delimiter::ParenClose), span)),
      '[' => tokens.push(Positioned::new(Token::Delimiter(Delimiter::BracketOpen), span)),
      ']' => tokens.push(Positioned::new(Token::Delimiter(Delimiter::BracketClose), span)),
      ':' => tokens.push(Positioned::new(Token::Colon, span)),
      ',' => tokens.push(Positioned::new(Token::Comma, span)),
      '?' => tokens.push(Positioned::new(Token::Question, span)),
      ch if ch.is_ascii_alphabetic() || ch == '_' => {
        let s = iter::once(ch)
          .chain(iter::from_fn(|| {
            iter.by_ref().peeking_next(|(_, c)| is_ident_continue(*c)).map(|(_, c)| c)
          }))
          .collect::<String>();
        let len = s.len();
        column += len - 1;

        tokens.push(Positioned::new(Token::Ident(s), Span::new(pos, pos + len, line, span.column)));
      }
      _ => return Err(SyntaxError::new(format!("unrecognized character {:?}", ch), span)),
    }

    column += 1;
  }

  trace!("tokenized {} tokens over {} lines", tokens.len(), line + 1);
  Ok(tokens)
}

#[derive(Debug)]
pub struct Program {
  pub name: Positioned<Identifier>,
  pub body: Vec<ProgramItem>,
}

#[derive(Debug)]
pub enum ProgramItem {
  Type(TypeDeclaration),
  Method(MethodDeclaration),
  Error(ErrorDeclaration),
}

impl ProgramItem {
  /// Line of the parenthesis closing the item.
  pub fn end_line(&self) -> usize {
    match self {
      ProgramItem::Type(type_def) => match &type_def.kind {
        TypeExpr::Group(list) => list.close.line,
        _ => type_def.name.span.line,
      },
      ProgramItem::Method(method) => method.output.close.line,
      ProgramItem::Error(error) => error.fields.close.line,
    }
  }
}

#[derive(Debug, Clone)]
pub struct CommentLit(pub String);

#[derive(Debug, Clone)]
pub struct Identifier(pub String);

#[derive(Debug)]
pub struct TypeDeclaration {
  pub name: Positioned<Identifier>,
  pub kind: TypeExpr,
  pub comments: Vec<CommentLit>,
}

#[derive(Debug)]
pub struct MethodDeclaration {
  pub name: Positioned<Identifier>,
  pub input: FieldList,
  pub output: FieldList,
  pub comments: Vec<CommentLit>,
}

#[derive(Debug)]
pub struct ErrorDeclaration {
  pub name: Positioned<Identifier>,
  pub fields: FieldList,
  pub comments: Vec<CommentLit>,
}

/// A parenthesized list of entries. Depending on its entries it is a struct
/// (`(a: int)`), an enum (`(one, two)`) or the empty struct (`()`).
#[derive(Debug)]
pub struct FieldList {
  pub close: Span,
  pub fields: Vec<FieldDeclaration>,
}

#[derive(Debug)]
pub struct FieldDeclaration {
  pub name: Positioned<Identifier>,
  /// `None` for enum variants.
  pub kind: Option<TypeExpr>,
}

#[derive(Debug)]
pub enum TypeExpr {
  Named(Positioned<Identifier>),
  Array(Box<TypeExpr>),
  Map(Box<TypeExpr>),
  Maybe(Box<TypeExpr>),
  Group(FieldList),
}

pub type TokenStream<'a> = MultiPeek<Iter<'a, Positioned<Token>>>;

fn next_token<'a>(input: &mut TokenStream<'a>, expected: &str) -> Result<&'a Positioned<Token>, SyntaxError> {
  input.next().ok_or_else(|| SyntaxError::end_of_input(expected))
}

fn expect_token(input: &mut TokenStream, token: Token) -> Result<Span, SyntaxError> {
  let next = next_token(input, &format!("{:?}", token))?;
  if next.value != token {
    return Err(SyntaxError::new(format!("unrecognized token {:?}, expected {:?}", next.value, token), next.span));
  }
  Ok(next.span)
}

fn parse_identifier(input: &mut TokenStream, expected: &str) -> Result<Positioned<Identifier>, SyntaxError> {
  let token = next_token(input, expected)?;
  match &token.value {
    Token::Ident(value) => Ok(token.span.wrap(Identifier(value.to_owned()))),
    _ => Err(SyntaxError::new(format!("unrecognized token {:?}, expected {}", token.value, expected), token.span)),
  }
}

fn skip_comments(input: &mut TokenStream) {
  while let Some(&token) = input.peek() {
    if !matches!(token.value, Token::Comment(_)) {
      break;
    }
    trace!("skipping comment {:?}", token);
    input.next();
  }
  input.reset_peek();
}

pub fn parse_program(input: &mut TokenStream) -> Result<Program, SyntaxError> {
  skip_comments(input);

  let keyword = parse_identifier(input, "interface")?;
  if keyword.value.0 != "interface" {
    return Err(SyntaxError::new(format!("unrecognized keyword {}, expected interface", keyword.value.0), keyword.span));
  }
  let name = parse_identifier(input, "interface name")?;
  trace!("interface {:?}", name);

  // Only an unbroken run of comment lines directly above an item documents
  // it; a comment sharing a line with the end of the previous item is dropped.
  let mut body = Vec::new();
  let mut comments = Vec::new();
  let mut comment_line = 0;
  let mut end_line = name.span.line;
  while let Some(&token) = input.peek() {
    let line = token.span.line;
    if !comments.is_empty() && line > comment_line + 1 {
      trace!("dropping detached comments {:?}", comments);
      comments.clear();
    }

    let item = match &token.value {
      Token::Comment(comment) => {
        input.next();
        if line == end_line {
          trace!("trailing comment {:?}", comment);
        } else {
          trace!("comment {:?}", comment);
          comments.push(CommentLit(comment.to_owned()));
          comment_line = line;
        }
        continue;
      }
      Token::Ident(keyword) if keyword == "type" => ProgramItem::Type(parse_type_declaration(input, &comments)?),
      Token::Ident(keyword) if keyword == "method" => ProgramItem::Method(parse_method(input, &comments)?),
      Token::Ident(keyword) if keyword == "error" => ProgramItem::Error(parse_error(input, &comments)?),
      _ => return Err(SyntaxError::new(format!("unrecognized token {:?}, expected type, method or error", token.value), token.span)),
    };

    end_line = item.end_line();
    body.push(item);
    comments.clear();
  }

  Ok(Program {
    name,
    body,
  })
}

pub fn parse_type_declaration(input: &mut TokenStream, comments: &[CommentLit]) -> Result<TypeDeclaration, SyntaxError> {
  parse_identifier(input, "type")?;
  let name = parse_identifier(input, "type name")?;
  let kind = TypeExpr::Group(parse_field_list(input)?);
  trace!("type {:?} = {:?}", name, kind);

  Ok(TypeDeclaration {
    name,
    kind,
    comments: comments.to_vec(),
  })
}

pub fn parse_method(input: &mut TokenStream, comments: &[CommentLit]) -> Result<MethodDeclaration, SyntaxError> {
  parse_identifier(input, "method")?;
  let name = parse_identifier(input, "method name")?;
  let method_input = parse_field_list(input)?;
  skip_comments(input);
  expect_token(input, Token::Arrow)?;
  let output = parse_field_list(input)?;
  trace!("method {:?}({:?}) -> ({:?})", name, method_input, output);

  Ok(MethodDeclaration {
    name,
    input: method_input,
    output,
    comments: comments.to_vec(),
  })
}

pub fn parse_error(input: &mut TokenStream, comments: &[CommentLit]) -> Result<ErrorDeclaration, SyntaxError> {
  parse_identifier(input, "error")?;
  let name = parse_identifier(input, "error name")?;
  let fields = parse_field_list(input)?;
  trace!("error {:?}({:?})", name, fields);

  Ok(ErrorDeclaration {
    name,
    fields,
    comments: comments.to_vec(),
  })
}

pub fn parse_field_list(input: &mut TokenStream) -> Result<FieldList, SyntaxError> {
  skip_comments(input);
  expect_token(input, Token::Delimiter(Delimiter::ParenOpen))?;

  let mut fields = Vec::new();
  loop {
    skip_comments(input);
    if let Some(&token) = input.peek() {
      if token.value == Token::Delimiter(Delimiter::ParenClose) {
        input.next();
        return Ok(FieldList { close: token.span, fields });
      }
    }
    input.reset_peek();

    let name = parse_identifier(input, "field name")?;
    skip_comments(input);
    let typed = matches!(input.peek(), Some(token) if token.value == Token::Colon);
    input.reset_peek();
    let kind = if typed {
      input.next();
      Some(parse_type_expr(input)?)
    } else {
      None
    };
    fields.push(FieldDeclaration { name, kind });

    skip_comments(input);
    let token = next_token(input, "',' or ')'")?;
    match &token.value {
      Token::Comma => continue,
      Token::Delimiter(Delimiter::ParenClose) => return Ok(FieldList { close: token.span, fields }),
      _ => return Err(SyntaxError::new(format!("unrecognized token {:?}, expected ',' or ')'", token.value), token.span)),
    }
  }
}

pub fn parse_type_expr(input: &mut TokenStream) -> Result<TypeExpr, SyntaxError> {
  skip_comments(input);
  if let Some(&token) = input.peek() {
    if token.value == Token::Delimiter(Delimiter::ParenOpen) {
      input.reset_peek();
      return Ok(TypeExpr::Group(parse_field_list(input)?));
    }
  }
  input.reset_peek();

  let token = next_token(input, "type")?;
  match &token.value {
    Token::Question => Ok(TypeExpr::Maybe(Box::new(parse_type_expr(input)?))),
    Token::Delimiter(Delimiter::BracketOpen) => {
      let token = next_token(input, "']' or 'string'")?;
      match &token.value {
        Token::Delimiter(Delimiter::BracketClose) => Ok(TypeExpr::Array(Box::new(parse_type_expr(input)?))),
        Token::Ident(key) if key == "string" => {
          expect_token(input, Token::Delimiter(Delimiter::BracketClose))?;
          Ok(TypeExpr::Map(Box::new(parse_type_expr(input)?)))
        }
        _ => Err(SyntaxError::new(format!("unrecognized token {:?}, expected ']' or 'string'", token.value), token.span)),
      }
    }
    Token::Ident(name) => Ok(TypeExpr::Named(token.span.wrap(Identifier(name.to_owned())))),
    _ => Err(SyntaxError::new(format!("unrecognized token {:?}, expected type", token.value), token.span)),
  }
}

pub fn type_to_hl(kind: &TypeExpr) -> Result<hl::Type, SyntaxError> {
  Ok(match kind {
    TypeExpr::Named(name) => match name.value.0.as_str() {
      "bool" => hl::Type::Bool,
      "int" => hl::Type::Int,
      "float" => hl::Type::Float,
      "string" => hl::Type::String,
      "object" => hl::Type::Object,
      alias => hl::Type::Alias(alias.to_owned()),
    },
    TypeExpr::Array(inner) => hl::Type::Array(Box::new(type_to_hl(inner)?)),
    TypeExpr::Map(inner) => hl::Type::Map(Box::new(type_to_hl(inner)?)),
    TypeExpr::Maybe(inner) => hl::Type::Maybe(Box::new(type_to_hl(inner)?)),
    TypeExpr::Group(list) => group_to_hl(list)?,
  })
}

fn group_to_hl(list: &FieldList) -> Result<hl::Type, SyntaxError> {
  if !list.fields.is_empty() && list.fields.iter().all(|field| field.kind.is_none()) {
    return Ok(hl::Type::Enum(list.fields.iter().map(|field| field.name.value.0.to_owned()).collect_vec()));
  }
  Ok(hl::Type::Struct(struct_to_hl(list)?))
}

pub fn struct_to_hl(list: &FieldList) -> Result<hl::Struct, SyntaxError> {
  let fields = list.fields.iter().map(|field| {
    let kind = field.kind.as_ref().ok_or_else(|| {
      SyntaxError::new(format!("field {} has no type", field.name.value.0), field.name.span)
    })?;
    Ok(hl::Field::new(field.name.value.0.to_owned(), type_to_hl(kind)?))
  }).collect::<Result<Vec<_>, SyntaxError>>()?;

  Ok(hl::Struct::new(fields))
}

pub fn interface_to_definition(program: &Program, description: &str) -> Result<hl::Interface, SyntaxError> {
  let mut aliases = Vec::new();
  let mut methods = Vec::new();
  let mut errors = Vec::new();

  for item in &program.body {
    match item {
      ProgramItem::Type(type_def) => aliases.push(hl::Alias {
        name: type_def.name.value.0.to_owned(),
        kind: type_to_hl(&type_def.kind)?,
        comments: convert_comments(&type_def.comments),
      }),
      ProgramItem::Method(method) => methods.push(hl::Method {
        name: method.name.value.0.to_owned(),
        input: struct_to_hl(&method.input)?,
        output: struct_to_hl(&method.output)?,
        comments: convert_comments(&method.comments),
      }),
      ProgramItem::Error(error) => errors.push(hl::ErrorType {
        name: error.name.value.0.to_owned(),
        kind: struct_to_hl(&error.fields)?,
        comments: convert_comments(&error.comments),
      }),
    }
  }

  Ok(hl::Interface {
    name: program.name.value.0.to_owned(),
    description: description.to_owned(),
    aliases,
    methods,
    errors,
  })
}

/// Tokenizes, parses and lowers an interface description in one step.
pub fn parse_interface(description: &str) -> Result<hl::Interface, SyntaxError> {
  let description = description.trim_end_matches('\n');

  let tokens = tokenizer(description)?;
  let mut iter = itertools::multipeek(&tokens);
  let program = parse_program(&mut iter)?;

  interface_to_definition(&program, description)
}

pub fn convert_comments(comments: &[CommentLit]) -> Vec<String> {
  comments.iter().map(|it| it.0.to_owned()).collect::<_>()
}
