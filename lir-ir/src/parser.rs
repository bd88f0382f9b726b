//! Parser for the canonical textual form
//!
//! Reads the text produced by the `Display` impls in [`crate::ir`] back
//! into the in-memory structure. This is not a source-language frontend;
//! the only accepted input is the IR's own printed form. The
//! `; ModuleID = '...'` header comment is recognized, every other `;`
//! comment is skipped.

use crate::ir::{
    BasicBlock, BinaryOp, Function, GlobalVariable, Instruction, Linkage, Module, UnaryOp, Value,
};
use crate::types::Type;
use lir_common::{IrError, LocationTracker, TempId, TextLocation};
use log::debug;
use std::collections::VecDeque;
use std::fmt;

/// Token types of the textual IR form
#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    /// Bare word: mnemonics, keywords, type names, block labels
    Word(String),

    /// `@name`
    GlobalName(String),

    /// `%N`
    Temp(TempId),

    /// `%name` (block label reference)
    LocalName(String),

    IntLiteral(i64),
    StringLiteral(String),

    /// Module name from the `; ModuleID = '...'` header comment
    ModuleId(String),

    Equal,
    Comma,
    Colon,
    Star,
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,

    EndOfFile,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Word(s) => write!(f, "'{}'", s),
            TokenKind::GlobalName(s) => write!(f, "'@{}'", s),
            TokenKind::Temp(id) => write!(f, "'%{}'", id),
            TokenKind::LocalName(s) => write!(f, "'%{}'", s),
            TokenKind::IntLiteral(n) => write!(f, "'{}'", n),
            TokenKind::StringLiteral(s) => write!(f, "'\"{}\"'", s),
            TokenKind::ModuleId(s) => write!(f, "module header '{}'", s),
            TokenKind::Equal => write!(f, "'='"),
            TokenKind::Comma => write!(f, "','"),
            TokenKind::Colon => write!(f, "':'"),
            TokenKind::Star => write!(f, "'*'"),
            TokenKind::LeftParen => write!(f, "'('"),
            TokenKind::RightParen => write!(f, "')'"),
            TokenKind::LeftBrace => write!(f, "'{{'"),
            TokenKind::RightBrace => write!(f, "'}}'"),
            TokenKind::EndOfFile => write!(f, "end of input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Token {
    kind: TokenKind,
    location: TextLocation,
}

/// Lexer for the textual IR form
struct Lexer {
    chars: Vec<char>,
    pos: usize,
    tracker: LocationTracker,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            tracker: LocationTracker::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        self.tracker.advance(ch);
        Some(ch)
    }

    fn is_ident_start(ch: char) -> bool {
        ch.is_ascii_alphabetic() || ch == '_'
    }

    fn is_ident_char(ch: char) -> bool {
        ch.is_ascii_alphanumeric() || ch == '_' || ch == '.'
    }

    fn read_ident(&mut self) -> String {
        let mut ident = String::new();
        while let Some(ch) = self.peek() {
            if !Self::is_ident_char(ch) {
                break;
            }
            ident.push(ch);
            self.advance();
        }
        ident
    }

    fn tokenize(mut self) -> Result<Vec<Token>, IrError> {
        let mut tokens = Vec::new();
        while let Some(ch) = self.peek() {
            let location = self.tracker.location();
            match ch {
                c if c.is_whitespace() => {
                    self.advance();
                }
                ';' => {
                    if let Some(name) = self.read_comment() {
                        tokens.push(Token {
                            kind: TokenKind::ModuleId(name),
                            location,
                        });
                    }
                }
                '@' => {
                    self.advance();
                    let name = self.read_ident();
                    if name.is_empty() {
                        return Err(IrError::parse_error("expected name after '@'", location));
                    }
                    tokens.push(Token {
                        kind: TokenKind::GlobalName(name),
                        location,
                    });
                }
                '%' => {
                    self.advance();
                    let kind = match self.peek() {
                        Some(c) if c.is_ascii_digit() => {
                            let id = self.read_int(location)?;
                            TokenKind::Temp(id as TempId)
                        }
                        Some(c) if Self::is_ident_start(c) => TokenKind::LocalName(self.read_ident()),
                        _ => {
                            return Err(IrError::parse_error(
                                "expected temporary or label after '%'",
                                location,
                            ))
                        }
                    };
                    tokens.push(Token { kind, location });
                }
                '"' => {
                    self.advance();
                    let mut text = String::new();
                    loop {
                        match self.advance() {
                            Some('"') => break,
                            Some(c) => text.push(c),
                            None => {
                                return Err(IrError::parse_error(
                                    "unterminated string literal",
                                    location,
                                ))
                            }
                        }
                    }
                    tokens.push(Token {
                        kind: TokenKind::StringLiteral(text),
                        location,
                    });
                }
                '-' => {
                    self.advance();
                    let value = self.read_int(location)?;
                    tokens.push(Token {
                        kind: TokenKind::IntLiteral(-value),
                        location,
                    });
                }
                c if c.is_ascii_digit() => {
                    let value = self.read_int(location)?;
                    tokens.push(Token {
                        kind: TokenKind::IntLiteral(value),
                        location,
                    });
                }
                c if Self::is_ident_start(c) => {
                    let word = self.read_ident();
                    tokens.push(Token {
                        kind: TokenKind::Word(word),
                        location,
                    });
                }
                '=' | ',' | ':' | '*' | '(' | ')' | '{' | '}' => {
                    self.advance();
                    let kind = match ch {
                        '=' => TokenKind::Equal,
                        ',' => TokenKind::Comma,
                        ':' => TokenKind::Colon,
                        '*' => TokenKind::Star,
                        '(' => TokenKind::LeftParen,
                        ')' => TokenKind::RightParen,
                        '{' => TokenKind::LeftBrace,
                        _ => TokenKind::RightBrace,
                    };
                    tokens.push(Token { kind, location });
                }
                other => {
                    return Err(IrError::parse_error(
                        format!("unexpected character '{}'", other),
                        location,
                    ))
                }
            }
        }
        tokens.push(Token {
            kind: TokenKind::EndOfFile,
            location: self.tracker.location(),
        });
        Ok(tokens)
    }

    /// Consume a `;` comment line; the module-ID header yields its name
    fn read_comment(&mut self) -> Option<String> {
        let mut line = String::new();
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            line.push(ch);
            self.advance();
        }
        let rest = line.strip_prefix("; ModuleID = '")?;
        rest.strip_suffix('\'').map(str::to_string)
    }

    fn read_int(&mut self, location: TextLocation) -> Result<i64, IrError> {
        let mut digits = String::new();
        while let Some(ch) = self.peek() {
            if !ch.is_ascii_digit() {
                break;
            }
            digits.push(ch);
            self.advance();
        }
        digits
            .parse::<i64>()
            .map_err(|_| IrError::parse_error(format!("invalid integer '{}'", digits), location))
    }
}

/// Recursive descent parser over the token stream
struct Parser {
    tokens: VecDeque<Token>,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens: tokens.into(),
        }
    }

    fn peek(&self) -> &Token {
        self.tokens.front().expect("token stream ends with EOF")
    }

    fn peek2(&self) -> Option<&Token> {
        self.tokens.get(1)
    }

    fn advance(&mut self) -> Token {
        if self.tokens.len() > 1 {
            self.tokens.pop_front().expect("non-empty")
        } else {
            self.peek().clone()
        }
    }

    fn check_word(&self, word: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::Word(w) if w == word)
    }

    fn error(&self, expected: &str) -> IrError {
        let token = self.peek();
        IrError::parse_error(
            format!("expected {}, found {}", expected, token.kind),
            token.location,
        )
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), IrError> {
        if self.peek().kind == kind {
            self.advance();
            Ok(())
        } else {
            Err(self.error(&format!("{}", kind)))
        }
    }

    fn expect_word(&mut self, word: &str) -> Result<(), IrError> {
        if self.check_word(word) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(&format!("'{}'", word)))
        }
    }

    fn expect_any_word(&mut self) -> Result<String, IrError> {
        match &self.peek().kind {
            TokenKind::Word(w) => {
                let word = w.clone();
                self.advance();
                Ok(word)
            }
            _ => Err(self.error("a word")),
        }
    }

    fn expect_global_name(&mut self) -> Result<String, IrError> {
        match &self.peek().kind {
            TokenKind::GlobalName(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.error("a global name")),
        }
    }

    fn expect_local_name(&mut self) -> Result<String, IrError> {
        match &self.peek().kind {
            TokenKind::LocalName(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.error("a label reference")),
        }
    }

    fn expect_temp(&mut self) -> Result<TempId, IrError> {
        match &self.peek().kind {
            TokenKind::Temp(id) => {
                let id = *id;
                self.advance();
                Ok(id)
            }
            _ => Err(self.error("a temporary")),
        }
    }

    fn parse_type(&mut self) -> Result<Type, IrError> {
        let word = match &self.peek().kind {
            TokenKind::Word(w) => w.clone(),
            _ => return Err(self.error("a type")),
        };
        let mut ty = match word.as_str() {
            "void" => Type::Void,
            "i1" => Type::I1,
            "i8" => Type::I8,
            "i16" => Type::I16,
            "i32" => Type::I32,
            "i64" => Type::I64,
            _ => return Err(self.error("a type")),
        };
        self.advance();
        while self.peek().kind == TokenKind::Star {
            self.advance();
            ty = Type::Ptr(Box::new(ty));
        }
        Ok(ty)
    }

    fn parse_value(&mut self) -> Result<Value, IrError> {
        let value = match &self.peek().kind {
            TokenKind::Temp(id) => Value::Temp(*id),
            TokenKind::IntLiteral(n) => Value::Constant(*n),
            TokenKind::GlobalName(name) => Value::Global(name.clone()),
            TokenKind::Word(w) if w == "undef" => Value::Undef,
            _ => return Err(self.error("a value")),
        };
        self.advance();
        Ok(value)
    }

    fn parse_module(&mut self) -> Result<Module, IrError> {
        let name = match &self.peek().kind {
            TokenKind::ModuleId(name) => {
                let name = name.clone();
                self.advance();
                name
            }
            _ => "module".to_string(),
        };
        let mut module = Module::new(&name);

        if self.check_word("target") {
            self.advance();
            self.expect_word("datalayout")?;
            self.expect(TokenKind::Equal)?;
            match &self.peek().kind {
                TokenKind::StringLiteral(layout) => {
                    let layout = layout.clone();
                    self.advance();
                    module.set_data_layout(&layout);
                }
                _ => return Err(self.error("a data layout string")),
            }
        }

        loop {
            match &self.peek().kind {
                TokenKind::EndOfFile => break,
                TokenKind::GlobalName(_) => {
                    let global = self.parse_global()?;
                    module.add_global(global);
                }
                TokenKind::Word(w) if w == "declare" => {
                    let function = self.parse_declare()?;
                    module.add_function(function);
                }
                TokenKind::Word(w) if w == "define" => {
                    let function = self.parse_define()?;
                    module.add_function(function);
                }
                _ => return Err(self.error("'define', 'declare', or a global")),
            }
        }

        debug!(
            "parsed module '{}': {} function(s), {} global(s)",
            module.name,
            module.functions.len(),
            module.globals.len()
        );
        Ok(module)
    }

    fn parse_global(&mut self) -> Result<GlobalVariable, IrError> {
        let name = self.expect_global_name()?;
        self.expect(TokenKind::Equal)?;

        let linkage = if self.check_word("internal") {
            self.advance();
            Linkage::Internal
        } else if self.check_word("private") {
            self.advance();
            Linkage::Private
        } else {
            Linkage::External
        };

        let is_constant = if self.check_word("constant") {
            self.advance();
            true
        } else {
            self.expect_word("global")?;
            false
        };

        let ty = self.parse_type()?;
        let initializer = self.parse_value()?;
        Ok(GlobalVariable {
            name,
            ty,
            is_constant,
            initializer: Some(initializer),
            linkage,
        })
    }

    fn parse_declare(&mut self) -> Result<Function, IrError> {
        self.expect_word("declare")?;
        let return_type = self.parse_type()?;
        let name = self.expect_global_name()?;
        self.expect(TokenKind::LeftParen)?;

        let mut param_types = Vec::new();
        if self.peek().kind != TokenKind::RightParen {
            loop {
                param_types.push(self.parse_type()?);
                if self.peek().kind != TokenKind::Comma {
                    break;
                }
                self.advance();
            }
        }
        self.expect(TokenKind::RightParen)?;
        Ok(Function::external(&name, return_type, param_types))
    }

    fn parse_define(&mut self) -> Result<Function, IrError> {
        self.expect_word("define")?;
        let return_type = self.parse_type()?;
        let name = self.expect_global_name()?;
        let mut function = Function::new(&name, return_type);

        self.expect(TokenKind::LeftParen)?;
        if self.peek().kind != TokenKind::RightParen {
            loop {
                let param_type = self.parse_type()?;
                let param_id = self.expect_temp()?;
                function.add_parameter(param_id, param_type);
                if self.peek().kind != TokenKind::Comma {
                    break;
                }
                self.advance();
            }
        }
        self.expect(TokenKind::RightParen)?;
        self.expect(TokenKind::LeftBrace)?;

        while self.peek().kind != TokenKind::RightBrace {
            let block = self.parse_block()?;
            function.add_block(block);
        }
        self.expect(TokenKind::RightBrace)?;
        Ok(function)
    }

    /// A block starts with `label:`; it runs until the next label or `}`
    fn parse_block(&mut self) -> Result<BasicBlock, IrError> {
        let label = self.expect_any_word()?;
        self.expect(TokenKind::Colon)?;
        let mut block = BasicBlock::new(&label);

        loop {
            if self.peek().kind == TokenKind::RightBrace {
                break;
            }
            if matches!(self.peek().kind, TokenKind::Word(_))
                && matches!(self.peek2().map(|t| &t.kind), Some(TokenKind::Colon))
            {
                break;
            }
            block.add_instruction(self.parse_instruction()?);
        }
        Ok(block)
    }

    fn parse_instruction(&mut self) -> Result<Instruction, IrError> {
        match &self.peek().kind {
            TokenKind::Temp(_) => {
                let result = self.expect_temp()?;
                self.expect(TokenKind::Equal)?;
                self.parse_result_instruction(result)
            }
            TokenKind::Word(w) => match w.as_str() {
                "ret" => self.parse_return(),
                "br" => self.parse_branch(),
                "store" => self.parse_store(),
                "call" => {
                    self.advance();
                    self.parse_call(None)
                }
                _ => Err(self.error("an instruction")),
            },
            _ => Err(self.error("an instruction")),
        }
    }

    fn parse_result_instruction(&mut self, result: TempId) -> Result<Instruction, IrError> {
        let mnemonic = self.expect_any_word()?;

        if let Some(op) = BinaryOp::from_mnemonic(&mnemonic) {
            let ty = self.parse_type()?;
            let lhs = self.parse_value()?;
            self.expect(TokenKind::Comma)?;
            let rhs = self.parse_value()?;
            return Ok(Instruction::Binary {
                result,
                op,
                lhs,
                rhs,
                ty,
            });
        }
        if let Some(op) = UnaryOp::from_mnemonic(&mnemonic) {
            let ty = self.parse_type()?;
            let operand = self.parse_value()?;
            return Ok(Instruction::Unary {
                result,
                op,
                operand,
                ty,
            });
        }

        match mnemonic.as_str() {
            "alloca" => {
                let alloc_ty = self.parse_type()?;
                Ok(Instruction::Alloca { result, alloc_ty })
            }
            "load" => {
                let ty = self.parse_type()?;
                self.expect(TokenKind::Comma)?;
                let ptr_ty = self.parse_type()?;
                if ptr_ty != Type::Ptr(Box::new(ty.clone())) {
                    return Err(self.error("a matching pointer type"));
                }
                let ptr = self.parse_value()?;
                Ok(Instruction::Load { result, ptr, ty })
            }
            "call" => self.parse_call(Some(result)),
            _ => Err(self.error("an instruction mnemonic")),
        }
    }

    fn parse_return(&mut self) -> Result<Instruction, IrError> {
        self.expect_word("ret")?;
        if self.check_word("void") {
            self.advance();
            return Ok(Instruction::Return(None));
        }
        let ty = self.parse_type()?;
        let value = self.parse_value()?;
        Ok(Instruction::Return(Some((ty, value))))
    }

    fn parse_branch(&mut self) -> Result<Instruction, IrError> {
        self.expect_word("br")?;
        if self.check_word("label") {
            self.advance();
            let label = self.expect_local_name()?;
            return Ok(Instruction::Branch(label));
        }

        let ty = self.parse_type()?;
        if ty != Type::I1 {
            return Err(self.error("'i1' condition type"));
        }
        let cond = self.parse_value()?;
        self.expect(TokenKind::Comma)?;
        self.expect_word("label")?;
        let then_label = self.expect_local_name()?;
        self.expect(TokenKind::Comma)?;
        self.expect_word("label")?;
        let else_label = self.expect_local_name()?;
        Ok(Instruction::BranchCond {
            cond,
            then_label,
            else_label,
        })
    }

    fn parse_store(&mut self) -> Result<Instruction, IrError> {
        self.expect_word("store")?;
        let ty = self.parse_type()?;
        let value = self.parse_value()?;
        self.expect(TokenKind::Comma)?;
        let ptr_ty = self.parse_type()?;
        if ptr_ty != Type::Ptr(Box::new(ty.clone())) {
            return Err(self.error("a matching pointer type"));
        }
        let ptr = self.parse_value()?;
        Ok(Instruction::Store { value, ptr, ty })
    }

    /// `call` keyword is already consumed
    fn parse_call(&mut self, result: Option<TempId>) -> Result<Instruction, IrError> {
        let ty = self.parse_type()?;
        let callee = Value::Function(self.expect_global_name()?);
        self.expect(TokenKind::LeftParen)?;

        let mut args = Vec::new();
        if self.peek().kind != TokenKind::RightParen {
            loop {
                let arg_ty = self.parse_type()?;
                let arg = self.parse_value()?;
                args.push((arg_ty, arg));
                if self.peek().kind != TokenKind::Comma {
                    break;
                }
                self.advance();
            }
        }
        self.expect(TokenKind::RightParen)?;
        Ok(Instruction::Call {
            result,
            callee,
            args,
            ty,
        })
    }
}

/// Parse a module from its canonical textual form
pub fn parse_module(source: &str) -> Result<Module, IrError> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser::new(tokens).parse_module()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_sum_module() {
        let text = "\
; ModuleID = 'main_module'
target datalayout = \"e-p:32:32\"

define i32 @main() {
entry:
  %0 = add i32 353, 48
  ret i32 %0
}
";
        let module = parse_module(text).unwrap();
        assert_eq!(module.name, "main_module");
        assert_eq!(module.data_layout.as_deref(), Some("e-p:32:32"));

        let main = module.get_function("main").unwrap();
        assert_eq!(main.return_type, Type::I32);
        assert_eq!(main.blocks.len(), 1);
        assert_eq!(main.blocks[0].label, "entry");
        assert_eq!(
            main.blocks[0].instructions,
            vec![
                Instruction::Binary {
                    result: 0,
                    op: BinaryOp::Add,
                    lhs: Value::Constant(353),
                    rhs: Value::Constant(48),
                    ty: Type::I32,
                },
                Instruction::Return(Some((Type::I32, Value::Temp(0)))),
            ]
        );
    }

    #[test]
    fn test_print_parse_print_is_stable() {
        let text = "\
; ModuleID = 'm'

@counter = internal global i32 0

declare void @put(i32)

define i32 @main(i32 %0) {
entry:
  %1 = alloca i32
  store i32 %0, i32* %1
  %2 = load i32, i32* %1
  %3 = slt i32 %2, 10
  br i1 %3, label %then, label %done
then:
  call void @put(i32 %2)
  br label %done
done:
  %4 = neg i32 %2
  ret i32 %4
}
";
        let module = parse_module(text).unwrap();
        let printed = format!("{}", module);
        assert_eq!(printed, text);

        let reparsed = parse_module(&printed).unwrap();
        assert_eq!(reparsed, module);
    }

    #[test]
    fn test_missing_module_header_gets_default_name() {
        let text = "define void @f() {\nentry:\n  ret void\n}\n";
        let module = parse_module(text).unwrap();
        assert_eq!(module.name, "module");
        assert_eq!(module.data_layout, None);
    }

    #[test]
    fn test_other_comments_are_skipped() {
        let text = "; just a note\ndefine void @f() {\nentry:\n  ret void\n}\n";
        let module = parse_module(text).unwrap();
        assert!(module.get_function("f").is_some());
    }

    #[test]
    fn test_parse_error_has_location() {
        let text = "define i32 @main() {\nentry:\n  %0 = bogus i32 1, 2\n}\n";
        let err = parse_module(text).unwrap_err();
        match err {
            IrError::Parse { location, message } => {
                assert_eq!(location.line, 3);
                assert!(message.contains("an instruction mnemonic"), "{}", message);
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_unexpected_character() {
        let err = parse_module("define i32 @main() { entry: ret i32 #0 }").unwrap_err();
        assert!(matches!(err, IrError::Parse { .. }));
    }

    #[test]
    fn test_load_pointer_type_must_match() {
        let text = "\
define i32 @f() {
entry:
  %0 = alloca i32
  %1 = load i32, i8* %0
  ret i32 %1
}
";
        assert!(parse_module(text).is_err());
    }
}
