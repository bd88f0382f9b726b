//! Structural well-formedness checks over constructed IR
//!
//! Verification is independent of program semantics: it checks block
//! termination, operand definedness, branch targets, and return types.
//! Temporary definitions are checked in block layout order, a
//! conservative approximation of dominance that is exact for the
//! straight-line and structured control flow the builder produces.

use crate::ir::{Function, Instruction, Module, Value};
use crate::types::Type;
use lir_common::TempId;
use log::debug;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// A single verifier finding
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VerifyError {
    #[error("function '{function}' has no basic blocks")]
    NoBlocks { function: String },

    #[error("block '{block}' in function '{function}' is empty")]
    EmptyBlock { function: String, block: String },

    #[error("block '{block}' in function '{function}' does not end in a terminator")]
    MissingTerminator { function: String, block: String },

    #[error("terminator before the end of block '{block}' in function '{function}'")]
    TerminatorNotLast { function: String, block: String },

    #[error("use of undefined value %{temp} in function '{function}'")]
    UndefinedTemp { function: String, temp: TempId },

    #[error("temporary %{temp} defined more than once in function '{function}'")]
    RedefinedTemp { function: String, temp: TempId },

    #[error("branch to unknown label '{label}' in function '{function}'")]
    UnknownLabel { function: String, label: String },

    #[error("duplicate block label '{label}' in function '{function}'")]
    DuplicateLabel { function: String, label: String },

    #[error("function '{function}' returns {expected} but 'ret' yields {found}")]
    ReturnTypeMismatch {
        function: String,
        expected: Type,
        found: Type,
    },

    #[error("conditional branch on non-i1 value %{temp} in function '{function}'")]
    NonBoolCondition { function: String, temp: TempId },

    #[error("duplicate definition of function '{name}'")]
    DuplicateFunction { name: String },

    #[error("duplicate definition of global '@{name}'")]
    DuplicateGlobal { name: String },

    #[error("global '@{name}' has a non-constant initializer")]
    NonConstantInitializer { name: String },
}

/// Join verifier findings into one report line
pub fn report(errors: &[VerifyError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Verify a single function
pub fn verify_function(function: &Function) -> Result<(), Vec<VerifyError>> {
    let mut errors = Vec::new();

    if function.is_external {
        return Ok(());
    }
    if function.blocks.is_empty() {
        return Err(vec![VerifyError::NoBlocks {
            function: function.name.clone(),
        }]);
    }

    let mut labels: HashSet<&str> = HashSet::new();
    for block in &function.blocks {
        if !labels.insert(&block.label) {
            errors.push(VerifyError::DuplicateLabel {
                function: function.name.clone(),
                label: block.label.clone(),
            });
        }
    }

    // Parameters count as defined from the start
    let mut defined: HashMap<TempId, Type> = HashMap::new();
    for (param_id, param_ty) in &function.parameters {
        defined.insert(*param_id, param_ty.clone());
    }

    for block in &function.blocks {
        if block.is_empty() {
            errors.push(VerifyError::EmptyBlock {
                function: function.name.clone(),
                block: block.label.clone(),
            });
            continue;
        }
        if !block.has_terminator() {
            errors.push(VerifyError::MissingTerminator {
                function: function.name.clone(),
                block: block.label.clone(),
            });
        }
        for (index, instr) in block.instructions.iter().enumerate() {
            if instr.is_terminator() && index + 1 != block.instructions.len() {
                errors.push(VerifyError::TerminatorNotLast {
                    function: function.name.clone(),
                    block: block.label.clone(),
                });
            }

            for operand in instr.operands() {
                if let Value::Temp(temp) = operand {
                    if !defined.contains_key(temp) {
                        errors.push(VerifyError::UndefinedTemp {
                            function: function.name.clone(),
                            temp: *temp,
                        });
                    }
                }
            }

            check_targets(function, instr, &labels, &mut errors);
            check_return(function, instr, &mut errors);

            if let Instruction::BranchCond {
                cond: Value::Temp(temp),
                ..
            } = instr
            {
                if let Some(ty) = defined.get(temp) {
                    if *ty != Type::I1 {
                        errors.push(VerifyError::NonBoolCondition {
                            function: function.name.clone(),
                            temp: *temp,
                        });
                    }
                }
            }

            if let Some((temp, ty)) = instr.result_def() {
                if defined.insert(temp, ty).is_some() {
                    errors.push(VerifyError::RedefinedTemp {
                        function: function.name.clone(),
                        temp,
                    });
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_targets(
    function: &Function,
    instr: &Instruction,
    labels: &HashSet<&str>,
    errors: &mut Vec<VerifyError>,
) {
    let mut check = |label: &str| {
        if !labels.contains(label) {
            errors.push(VerifyError::UnknownLabel {
                function: function.name.clone(),
                label: label.to_string(),
            });
        }
    };
    match instr {
        Instruction::Branch(label) => check(label),
        Instruction::BranchCond {
            then_label,
            else_label,
            ..
        } => {
            check(then_label);
            check(else_label);
        }
        _ => {}
    }
}

fn check_return(function: &Function, instr: &Instruction, errors: &mut Vec<VerifyError>) {
    let found = match instr {
        Instruction::Return(Some((ty, _))) => ty.clone(),
        Instruction::Return(None) => Type::Void,
        _ => return,
    };
    if found != function.return_type {
        errors.push(VerifyError::ReturnTypeMismatch {
            function: function.name.clone(),
            expected: function.return_type.clone(),
            found,
        });
    }
}

/// Verify a whole module
pub fn verify_module(module: &Module) -> Result<(), Vec<VerifyError>> {
    let mut errors = Vec::new();

    let mut function_names: HashSet<&str> = HashSet::new();
    for function in &module.functions {
        if !function_names.insert(&function.name) {
            errors.push(VerifyError::DuplicateFunction {
                name: function.name.clone(),
            });
        }
    }

    let mut global_names: HashSet<&str> = HashSet::new();
    for global in &module.globals {
        if !global_names.insert(&global.name) {
            errors.push(VerifyError::DuplicateGlobal {
                name: global.name.clone(),
            });
        }
        if let Some(init) = &global.initializer {
            if !matches!(init, Value::Constant(_) | Value::Undef) {
                errors.push(VerifyError::NonConstantInitializer {
                    name: global.name.clone(),
                });
            }
        }
    }

    for function in &module.functions {
        if let Err(function_errors) = verify_function(function) {
            errors.extend(function_errors);
        }
    }

    debug!(
        "verified module '{}': {} finding(s)",
        module.name,
        errors.len()
    );
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BasicBlock, BinaryOp, GlobalVariable, Linkage};
    use pretty_assertions::assert_eq;

    fn sum_function() -> Function {
        let mut func = Function::new("main", Type::I32);
        let mut block = BasicBlock::new("entry");
        block.add_instruction(Instruction::Binary {
            result: 0,
            op: BinaryOp::Add,
            lhs: Value::Constant(353),
            rhs: Value::Constant(48),
            ty: Type::I32,
        });
        block.add_instruction(Instruction::Return(Some((Type::I32, Value::Temp(0)))));
        func.add_block(block);
        func
    }

    #[test]
    fn test_well_formed_function() {
        assert_eq!(verify_function(&sum_function()), Ok(()));
    }

    #[test]
    fn test_missing_terminator() {
        let mut func = Function::new("f", Type::I32);
        let mut block = BasicBlock::new("entry");
        block.add_instruction(Instruction::Binary {
            result: 0,
            op: BinaryOp::Add,
            lhs: Value::Constant(1),
            rhs: Value::Constant(2),
            ty: Type::I32,
        });
        func.add_block(block);

        let errors = verify_function(&func).unwrap_err();
        assert_eq!(
            errors,
            vec![VerifyError::MissingTerminator {
                function: "f".to_string(),
                block: "entry".to_string(),
            }]
        );
    }

    #[test]
    fn test_terminator_not_last() {
        let mut func = Function::new("f", Type::Void);
        let mut block = BasicBlock::new("entry");
        block.add_instruction(Instruction::Return(None));
        block.add_instruction(Instruction::Return(None));
        func.add_block(block);

        let errors = verify_function(&func).unwrap_err();
        assert!(errors.contains(&VerifyError::TerminatorNotLast {
            function: "f".to_string(),
            block: "entry".to_string(),
        }));
    }

    #[test]
    fn test_undefined_temp() {
        let mut func = Function::new("f", Type::I32);
        let mut block = BasicBlock::new("entry");
        block.add_instruction(Instruction::Return(Some((Type::I32, Value::Temp(9)))));
        func.add_block(block);

        let errors = verify_function(&func).unwrap_err();
        assert_eq!(
            errors,
            vec![VerifyError::UndefinedTemp {
                function: "f".to_string(),
                temp: 9,
            }]
        );
    }

    #[test]
    fn test_parameters_are_defined() {
        let mut func = Function::new("id", Type::I32);
        func.add_parameter(0, Type::I32);
        let mut block = BasicBlock::new("entry");
        block.add_instruction(Instruction::Return(Some((Type::I32, Value::Temp(0)))));
        func.add_block(block);

        assert_eq!(verify_function(&func), Ok(()));
    }

    #[test]
    fn test_unknown_branch_target() {
        let mut func = Function::new("f", Type::Void);
        let mut block = BasicBlock::new("entry");
        block.add_instruction(Instruction::Branch("nowhere".to_string()));
        func.add_block(block);

        let errors = verify_function(&func).unwrap_err();
        assert_eq!(
            errors,
            vec![VerifyError::UnknownLabel {
                function: "f".to_string(),
                label: "nowhere".to_string(),
            }]
        );
    }

    #[test]
    fn test_return_type_mismatch() {
        let mut func = Function::new("f", Type::I32);
        let mut block = BasicBlock::new("entry");
        block.add_instruction(Instruction::Return(None));
        func.add_block(block);

        let errors = verify_function(&func).unwrap_err();
        assert_eq!(
            errors,
            vec![VerifyError::ReturnTypeMismatch {
                function: "f".to_string(),
                expected: Type::I32,
                found: Type::Void,
            }]
        );
    }

    #[test]
    fn test_non_bool_condition() {
        let mut func = Function::new("f", Type::Void);
        let mut entry = BasicBlock::new("entry");
        entry.add_instruction(Instruction::Binary {
            result: 0,
            op: BinaryOp::Add,
            lhs: Value::Constant(1),
            rhs: Value::Constant(2),
            ty: Type::I32,
        });
        entry.add_instruction(Instruction::BranchCond {
            cond: Value::Temp(0),
            then_label: "done".to_string(),
            else_label: "done".to_string(),
        });
        func.add_block(entry);
        let mut done = BasicBlock::new("done");
        done.add_instruction(Instruction::Return(None));
        func.add_block(done);

        let errors = verify_function(&func).unwrap_err();
        assert_eq!(
            errors,
            vec![VerifyError::NonBoolCondition {
                function: "f".to_string(),
                temp: 0,
            }]
        );
    }

    #[test]
    fn test_external_functions_skip_body_checks() {
        let decl = Function::external("put", Type::Void, vec![Type::I32]);
        assert_eq!(verify_function(&decl), Ok(()));
    }

    #[test]
    fn test_module_duplicates() {
        let mut module = Module::new("m");
        module.add_function(sum_function());
        module.add_function(sum_function());

        let errors = verify_module(&module).unwrap_err();
        assert_eq!(
            errors,
            vec![VerifyError::DuplicateFunction {
                name: "main".to_string(),
            }]
        );
    }

    #[test]
    fn test_non_constant_global_initializer() {
        let mut module = Module::new("m");
        module.add_global(GlobalVariable {
            name: "g".to_string(),
            ty: Type::I32,
            is_constant: false,
            initializer: Some(Value::Temp(0)),
            linkage: Linkage::External,
        });

        let errors = verify_module(&module).unwrap_err();
        assert_eq!(
            errors,
            vec![VerifyError::NonConstantInitializer {
                name: "g".to_string(),
            }]
        );
    }

    #[test]
    fn test_report_joins_findings() {
        let errors = vec![
            VerifyError::NoBlocks {
                function: "f".to_string(),
            },
            VerifyError::DuplicateFunction {
                name: "f".to_string(),
            },
        ];
        assert_eq!(
            report(&errors),
            "function 'f' has no basic blocks; duplicate definition of function 'f'"
        );
    }
}
