//! Core intermediate representation
//!
//! This module defines the in-memory IR graph: values, instructions,
//! basic blocks, functions, globals, and the module container. The
//! `Display` impls produce the canonical textual form, which the parser
//! in [`crate::parser`] reads back.

use crate::types::Type;
use lir_common::TempId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// IR Value - represents operands in IR instructions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Temporary (SSA) value
    Temp(TempId),

    /// Constant integer
    Constant(i64),

    /// Global variable reference
    Global(String),

    /// Function reference
    Function(String),

    /// Undefined value
    Undef,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Temp(id) => write!(f, "%{}", id),
            Value::Constant(val) => write!(f, "{}", val),
            Value::Global(name) => write!(f, "@{}", name),
            Value::Function(name) => write!(f, "@{}", name),
            Value::Undef => write!(f, "undef"),
        }
    }
}

/// Binary operations in IR
///
/// Comparisons are ordinary binary operations whose result type is `i1`
/// regardless of the operand type carried by the instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    SDiv,
    SRem,

    // Bitwise
    And,
    Or,
    Xor,

    // Comparison (produce i1)
    Eq,
    Ne,
    Slt,
    Sle,
    Sgt,
    Sge,
}

impl BinaryOp {
    /// Comparisons produce `i1`; everything else produces the operand type
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Slt | BinaryOp::Sle | BinaryOp::Sgt | BinaryOp::Sge
        )
    }

    /// Parse an operation mnemonic
    pub fn from_mnemonic(s: &str) -> Option<Self> {
        let op = match s {
            "add" => BinaryOp::Add,
            "sub" => BinaryOp::Sub,
            "mul" => BinaryOp::Mul,
            "sdiv" => BinaryOp::SDiv,
            "srem" => BinaryOp::SRem,
            "and" => BinaryOp::And,
            "or" => BinaryOp::Or,
            "xor" => BinaryOp::Xor,
            "eq" => BinaryOp::Eq,
            "ne" => BinaryOp::Ne,
            "slt" => BinaryOp::Slt,
            "sle" => BinaryOp::Sle,
            "sgt" => BinaryOp::Sgt,
            "sge" => BinaryOp::Sge,
            _ => return None,
        };
        Some(op)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op_str = match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::SDiv => "sdiv",
            BinaryOp::SRem => "srem",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
            BinaryOp::Eq => "eq",
            BinaryOp::Ne => "ne",
            BinaryOp::Slt => "slt",
            BinaryOp::Sle => "sle",
            BinaryOp::Sgt => "sgt",
            BinaryOp::Sge => "sge",
        };
        write!(f, "{}", op_str)
    }
}

/// Unary operations in IR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg, // Arithmetic negation
    Not, // Bitwise NOT
}

impl UnaryOp {
    /// Parse an operation mnemonic
    pub fn from_mnemonic(s: &str) -> Option<Self> {
        match s {
            "neg" => Some(UnaryOp::Neg),
            "not" => Some(UnaryOp::Not),
            _ => None,
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOp::Neg => write!(f, "neg"),
            UnaryOp::Not => write!(f, "not"),
        }
    }
}

/// IR Instruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    /// Binary operation: %result = op ty lhs, rhs
    Binary {
        result: TempId,
        op: BinaryOp,
        lhs: Value,
        rhs: Value,
        ty: Type,
    },

    /// Unary operation: %result = op ty operand
    Unary {
        result: TempId,
        op: UnaryOp,
        operand: Value,
        ty: Type,
    },

    /// Allocate stack memory: %result = alloca ty
    Alloca { result: TempId, alloc_ty: Type },

    /// Load from memory: %result = load ty, ty* ptr
    Load {
        result: TempId,
        ptr: Value,
        ty: Type,
    },

    /// Store to memory: store ty value, ty* ptr
    Store { value: Value, ptr: Value, ty: Type },

    /// Function call: %result = call ty callee(args...)
    Call {
        result: Option<TempId>,
        callee: Value,
        args: Vec<(Type, Value)>,
        ty: Type,
    },

    /// Return: ret ty value or ret void
    Return(Option<(Type, Value)>),

    /// Unconditional branch: br label %target
    Branch(String),

    /// Conditional branch: br i1 cond, label %then, label %else
    BranchCond {
        cond: Value,
        then_label: String,
        else_label: String,
    },
}

impl Instruction {
    /// Check if this instruction ends a basic block
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Instruction::Return(_) | Instruction::Branch(_) | Instruction::BranchCond { .. }
        )
    }

    /// The temporary this instruction defines, with its type
    pub fn result_def(&self) -> Option<(TempId, Type)> {
        match self {
            Instruction::Binary { result, op, ty, .. } => {
                let result_ty = if op.is_comparison() { Type::I1 } else { ty.clone() };
                Some((*result, result_ty))
            }
            Instruction::Unary { result, ty, .. } => Some((*result, ty.clone())),
            Instruction::Alloca { result, alloc_ty } => {
                Some((*result, Type::Ptr(Box::new(alloc_ty.clone()))))
            }
            Instruction::Load { result, ty, .. } => Some((*result, ty.clone())),
            Instruction::Call {
                result: Some(result),
                ty,
                ..
            } => Some((*result, ty.clone())),
            _ => None,
        }
    }

    /// The values this instruction reads
    pub fn operands(&self) -> Vec<&Value> {
        match self {
            Instruction::Binary { lhs, rhs, .. } => vec![lhs, rhs],
            Instruction::Unary { operand, .. } => vec![operand],
            Instruction::Alloca { .. } => Vec::new(),
            Instruction::Load { ptr, .. } => vec![ptr],
            Instruction::Store { value, ptr, .. } => vec![value, ptr],
            Instruction::Call { args, .. } => args.iter().map(|(_, v)| v).collect(),
            Instruction::Return(Some((_, value))) => vec![value],
            Instruction::Return(None) => Vec::new(),
            Instruction::Branch(_) => Vec::new(),
            Instruction::BranchCond { cond, .. } => vec![cond],
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Binary {
                result,
                op,
                lhs,
                rhs,
                ty,
            } => {
                write!(f, "%{} = {} {} {}, {}", result, op, ty, lhs, rhs)
            }
            Instruction::Unary {
                result,
                op,
                operand,
                ty,
            } => {
                write!(f, "%{} = {} {} {}", result, op, ty, operand)
            }
            Instruction::Alloca { result, alloc_ty } => {
                write!(f, "%{} = alloca {}", result, alloc_ty)
            }
            Instruction::Load { result, ptr, ty } => {
                write!(f, "%{} = load {}, {}* {}", result, ty, ty, ptr)
            }
            Instruction::Store { value, ptr, ty } => {
                write!(f, "store {} {}, {}* {}", ty, value, ty, ptr)
            }
            Instruction::Call {
                result,
                callee,
                args,
                ty,
            } => {
                if let Some(result) = result {
                    write!(f, "%{} = ", result)?;
                }
                write!(f, "call {} {}(", ty, callee)?;
                for (i, (arg_ty, arg)) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} {}", arg_ty, arg)?;
                }
                write!(f, ")")
            }
            Instruction::Return(Some((ty, value))) => write!(f, "ret {} {}", ty, value),
            Instruction::Return(None) => write!(f, "ret void"),
            Instruction::Branch(label) => write!(f, "br label %{}", label),
            Instruction::BranchCond {
                cond,
                then_label,
                else_label,
            } => {
                write!(
                    f,
                    "br i1 {}, label %{}, label %{}",
                    cond, then_label, else_label
                )
            }
        }
    }
}

/// Basic Block - a sequence of instructions with a single entry point and
/// exactly one terminating control-transfer instruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicBlock {
    pub label: String,
    pub instructions: Vec<Instruction>,
}

impl BasicBlock {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            instructions: Vec::new(),
        }
    }

    pub fn add_instruction(&mut self, instr: Instruction) {
        self.instructions.push(instr);
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn has_terminator(&self) -> bool {
        self.instructions
            .last()
            .is_some_and(Instruction::is_terminator)
    }
}

/// Function in IR
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub return_type: Type,
    pub parameters: Vec<(TempId, Type)>,
    pub blocks: Vec<BasicBlock>,
    pub is_external: bool,
}

impl Function {
    pub fn new(name: &str, return_type: Type) -> Self {
        Self {
            name: name.to_string(),
            return_type,
            parameters: Vec::new(),
            blocks: Vec::new(),
            is_external: false,
        }
    }

    /// Create an external declaration (no body)
    pub fn external(name: &str, return_type: Type, param_types: Vec<Type>) -> Self {
        let parameters = param_types
            .into_iter()
            .enumerate()
            .map(|(i, ty)| (i as TempId, ty))
            .collect();
        Self {
            name: name.to_string(),
            return_type,
            parameters,
            blocks: Vec::new(),
            is_external: true,
        }
    }

    pub fn add_parameter(&mut self, param_id: TempId, param_type: Type) {
        self.parameters.push((param_id, param_type));
    }

    pub fn add_block(&mut self, block: BasicBlock) {
        self.blocks.push(block);
    }

    pub fn get_block(&self, label: &str) -> Option<&BasicBlock> {
        self.blocks.iter().find(|b| b.label == label)
    }

    pub fn get_block_mut(&mut self, label: &str) -> Option<&mut BasicBlock> {
        self.blocks.iter_mut().find(|b| b.label == label)
    }

    pub fn entry_block(&self) -> Option<&BasicBlock> {
        self.blocks.first()
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_external {
            write!(f, "declare {} @{}(", self.return_type, self.name)?;
            for (i, (_, param_ty)) in self.parameters.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", param_ty)?;
            }
            return writeln!(f, ")");
        }

        write!(f, "define {} @{}(", self.return_type, self.name)?;
        for (i, (param_id, param_ty)) in self.parameters.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} %{}", param_ty, param_id)?;
        }
        writeln!(f, ") {{")?;
        for block in &self.blocks {
            writeln!(f, "{}:", block.label)?;
            for instr in &block.instructions {
                writeln!(f, "  {}", instr)?;
            }
        }
        writeln!(f, "}}")
    }
}

/// Linkage types for global symbols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Linkage {
    External, // Visible to other modules
    Internal, // Only visible within this module
    Private,  // Not listed in the symbol table at all
}

/// Global variable definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalVariable {
    pub name: String,
    pub ty: Type,
    pub is_constant: bool,
    pub initializer: Option<Value>,
    pub linkage: Linkage,
}

impl fmt::Display for GlobalVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{} = ", self.name)?;
        match self.linkage {
            Linkage::Internal => write!(f, "internal ")?,
            Linkage::Private => write!(f, "private ")?,
            Linkage::External => {}
        }
        let kind = if self.is_constant { "constant" } else { "global" };
        let init = self.initializer.clone().unwrap_or(Value::Undef);
        write!(f, "{} {} {}", kind, self.ty, init)
    }
}

/// IR Module - the top-level container for one translation unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    pub data_layout: Option<String>,
    pub functions: Vec<Function>,
    pub globals: Vec<GlobalVariable>,
}

impl Module {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            data_layout: None,
            functions: Vec::new(),
            globals: Vec::new(),
        }
    }

    pub fn set_data_layout(&mut self, layout: &str) {
        self.data_layout = Some(layout.to_string());
    }

    pub fn add_function(&mut self, function: Function) {
        self.functions.push(function);
    }

    pub fn add_global(&mut self, global: GlobalVariable) {
        self.globals.push(global);
    }

    pub fn get_function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn get_function_mut(&mut self, name: &str) -> Option<&mut Function> {
        self.functions.iter_mut().find(|f| f.name == name)
    }

    pub fn get_global(&self, name: &str) -> Option<&GlobalVariable> {
        self.globals.iter().find(|g| g.name == name)
    }
}

/// The canonical textual form. Iteration order is insertion order
/// everywhere, so printing is deterministic.
impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; ModuleID = '{}'", self.name)?;
        if let Some(layout) = &self.data_layout {
            writeln!(f, "target datalayout = \"{}\"", layout)?;
        }
        if !self.globals.is_empty() {
            writeln!(f)?;
            for global in &self.globals {
                writeln!(f, "{}", global)?;
            }
        }
        for function in &self.functions {
            writeln!(f)?;
            write!(f, "{}", function)?;
        }
        Ok(())
    }
}
