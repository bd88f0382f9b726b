//! Little IR Sum Demo
//!
//! Builds one in-memory module with a function `main` that adds the
//! constants 353 and 48, verifies it, and prints the module's textual
//! form on stdout. No arguments, no configuration; output is fully
//! deterministic.

use lir_common::IrError;
use lir_ir::{verify, BinaryOp, IrBuilder, Module, Type, Value};
use log::debug;
use std::io::Write;

const LHS: i64 = 353;
const RHS: i64 = 48;
const DATA_LAYOUT: &str = "e-p:32:32-i64:64-n32";

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), IrError> {
    let module = build_sum_module()?;

    let main_fn = module
        .get_function("main")
        .ok_or_else(|| IrError::build_error("module has no 'main' function"))?;
    verify::verify_function(main_fn)
        .map_err(|errors| IrError::verify_error(verify::report(&errors)))?;
    debug!("verified function '{}'", main_fn.name);

    let stdout = std::io::stdout();
    write!(stdout.lock(), "{}", module)?;
    Ok(())
}

/// The fixed construction sequence: context-free module setup, one
/// function, one entry block, two constants, an add, and a return.
fn build_sum_module() -> Result<Module, IrError> {
    let mut module = Module::new("main_module");
    module.set_data_layout(DATA_LAYOUT);

    let mut builder = IrBuilder::new();
    builder.create_function("main", Type::I32);
    builder.create_block("entry")?;

    let sum = builder.build_binary(
        BinaryOp::Add,
        Value::Constant(LHS),
        Value::Constant(RHS),
        Type::I32,
    )?;
    builder.build_return(Some((Type::I32, Value::Temp(sum))))?;

    let function = builder
        .finish_function()
        .ok_or_else(|| IrError::build_error("no function under construction"))?;
    module.add_function(function);
    Ok(module)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lir_ir::{parse_module, Instruction};
    use pretty_assertions::assert_eq;

    const EXPECTED_OUTPUT: &str = "\
; ModuleID = 'main_module'
target datalayout = \"e-p:32:32-i64:64-n32\"

define i32 @main() {
entry:
  %0 = add i32 353, 48
  ret i32 %0
}
";

    #[test]
    fn test_demo_output_text() {
        let module = build_sum_module().unwrap();
        assert_eq!(format!("{}", module), EXPECTED_OUTPUT);
    }

    #[test]
    fn test_sum_function_shape() {
        let module = build_sum_module().unwrap();
        let main_fn = module.get_function("main").unwrap();

        assert_eq!(main_fn.return_type, Type::I32);
        assert!(main_fn.parameters.is_empty());
        assert_eq!(main_fn.blocks.len(), 1);

        let entry = &main_fn.blocks[0];
        assert_eq!(entry.label, "entry");
        assert!(entry.has_terminator());
        assert_eq!(
            entry.instructions.iter().filter(|i| i.is_terminator()).count(),
            1
        );

        let Instruction::Binary { result, op, lhs, rhs, ty } = &entry.instructions[0] else {
            panic!("first instruction is not a binary op");
        };
        assert_eq!(*op, BinaryOp::Add);
        assert_eq!(*lhs, Value::Constant(353));
        assert_eq!(*rhs, Value::Constant(48));
        assert_eq!(*ty, Type::I32);

        assert_eq!(
            entry.instructions[1],
            Instruction::Return(Some((Type::I32, Value::Temp(*result))))
        );
    }

    #[test]
    fn test_demo_module_verifies() {
        let module = build_sum_module().unwrap();
        assert_eq!(verify::verify_module(&module), Ok(()));
    }

    #[test]
    fn test_output_round_trips() {
        let module = build_sum_module().unwrap();
        let printed = format!("{}", module);

        let reparsed = parse_module(&printed).unwrap();
        assert_eq!(format!("{}", reparsed), printed);
        assert_eq!(reparsed, module);
    }

    #[test]
    fn test_output_is_deterministic() {
        let first = format!("{}", build_sum_module().unwrap());
        let second = format!("{}", build_sum_module().unwrap());
        assert_eq!(first, second);
    }
}
