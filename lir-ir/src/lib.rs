//! Little IR - Intermediate Representation
//!
//! This crate defines a small typed IR: a module containing functions,
//! basic blocks, and instructions, together with a builder for
//! constructing it, a structural verifier, and a parser for the
//! canonical textual form the `Display` impls produce.

pub mod builder;
pub mod ir;
pub mod parser;
pub mod types;
pub mod verify;

pub use builder::IrBuilder;
pub use ir::{
    BasicBlock, BinaryOp, Function, GlobalVariable, Instruction, Linkage, Module, UnaryOp, Value,
};
pub use parser::parse_module;
pub use types::Type;
pub use verify::{verify_function, verify_module, VerifyError};
pub use lir_common::TempId;
