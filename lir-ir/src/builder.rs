//! Builder for constructing IR
//!
//! The builder holds one function under construction and an insertion
//! point (the current block). Temporaries are numbered per function.

use crate::ir::{BasicBlock, BinaryOp, Function, Instruction, UnaryOp, Value};
use crate::types::Type;
use lir_common::{IrError, TempId};
use log::trace;

pub struct IrBuilder {
    current_function: Option<Function>,
    current_block: Option<String>,
    next_temp: TempId,
}

impl IrBuilder {
    pub fn new() -> Self {
        Self {
            current_function: None,
            current_block: None,
            next_temp: 0,
        }
    }

    pub fn new_temp(&mut self) -> TempId {
        let temp = self.next_temp;
        self.next_temp += 1;
        temp
    }

    /// Start a new function; the temp counter restarts at zero
    pub fn create_function(&mut self, name: &str, return_type: Type) {
        self.current_function = Some(Function::new(name, return_type));
        self.current_block = None;
        self.next_temp = 0;
    }

    /// Add a parameter to the function under construction
    pub fn add_parameter(&mut self, param_type: Type) -> Result<TempId, IrError> {
        let param_id = self.new_temp();
        let function = self
            .current_function
            .as_mut()
            .ok_or_else(|| IrError::build_error("no current function"))?;
        function.add_parameter(param_id, param_type);
        Ok(param_id)
    }

    /// Append a new block and make it the insertion point
    pub fn create_block(&mut self, label: &str) -> Result<(), IrError> {
        let function = self
            .current_function
            .as_mut()
            .ok_or_else(|| IrError::build_error("no current function"))?;
        if function.get_block(label).is_some() {
            return Err(IrError::build_error(format!(
                "duplicate block label '{}'",
                label
            )));
        }
        function.add_block(BasicBlock::new(label));
        self.current_block = Some(label.to_string());
        Ok(())
    }

    pub fn build_binary(
        &mut self,
        op: BinaryOp,
        lhs: Value,
        rhs: Value,
        ty: Type,
    ) -> Result<TempId, IrError> {
        let result = self.new_temp();
        self.add_instruction(Instruction::Binary {
            result,
            op,
            lhs,
            rhs,
            ty,
        })?;
        Ok(result)
    }

    pub fn build_unary(&mut self, op: UnaryOp, operand: Value, ty: Type) -> Result<TempId, IrError> {
        let result = self.new_temp();
        self.add_instruction(Instruction::Unary {
            result,
            op,
            operand,
            ty,
        })?;
        Ok(result)
    }

    pub fn build_alloca(&mut self, alloc_ty: Type) -> Result<TempId, IrError> {
        let result = self.new_temp();
        self.add_instruction(Instruction::Alloca { result, alloc_ty })?;
        Ok(result)
    }

    pub fn build_load(&mut self, ptr: Value, ty: Type) -> Result<TempId, IrError> {
        let result = self.new_temp();
        self.add_instruction(Instruction::Load { result, ptr, ty })?;
        Ok(result)
    }

    pub fn build_store(&mut self, value: Value, ptr: Value, ty: Type) -> Result<(), IrError> {
        self.add_instruction(Instruction::Store { value, ptr, ty })
    }

    /// Void calls produce no result temp
    pub fn build_call(
        &mut self,
        callee: Value,
        args: Vec<(Type, Value)>,
        ty: Type,
    ) -> Result<Option<TempId>, IrError> {
        let result = if ty == Type::Void {
            None
        } else {
            Some(self.new_temp())
        };
        self.add_instruction(Instruction::Call {
            result,
            callee,
            args,
            ty,
        })?;
        Ok(result)
    }

    pub fn build_return(&mut self, value: Option<(Type, Value)>) -> Result<(), IrError> {
        self.add_instruction(Instruction::Return(value))
    }

    pub fn build_branch(&mut self, label: &str) -> Result<(), IrError> {
        self.add_instruction(Instruction::Branch(label.to_string()))
    }

    pub fn build_branch_cond(
        &mut self,
        cond: Value,
        then_label: &str,
        else_label: &str,
    ) -> Result<(), IrError> {
        self.add_instruction(Instruction::BranchCond {
            cond,
            then_label: then_label.to_string(),
            else_label: else_label.to_string(),
        })
    }

    fn add_instruction(&mut self, instr: Instruction) -> Result<(), IrError> {
        let function = self
            .current_function
            .as_mut()
            .ok_or_else(|| IrError::build_error("no current function"))?;
        let label = self
            .current_block
            .clone()
            .ok_or_else(|| IrError::build_error("no current block"))?;
        let block = function
            .get_block_mut(&label)
            .ok_or_else(|| IrError::build_error(format!("current block '{}' not found", label)))?;
        trace!("emit [{}]: {}", label, instr);
        block.add_instruction(instr);
        Ok(())
    }

    pub fn current_block_has_terminator(&self) -> bool {
        let (Some(function), Some(label)) = (&self.current_function, &self.current_block) else {
            return false;
        };
        function
            .get_block(label)
            .is_some_and(BasicBlock::has_terminator)
    }

    /// Take the finished function out of the builder
    pub fn finish_function(&mut self) -> Option<Function> {
        self.current_block = None;
        self.current_function.take()
    }
}

impl Default for IrBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_build_sum_function() {
        let mut builder = IrBuilder::new();
        builder.create_function("main", Type::I32);
        builder.create_block("entry").unwrap();

        let sum = builder
            .build_binary(
                BinaryOp::Add,
                Value::Constant(353),
                Value::Constant(48),
                Type::I32,
            )
            .unwrap();
        builder
            .build_return(Some((Type::I32, Value::Temp(sum))))
            .unwrap();

        let function = builder.finish_function().unwrap();
        assert_eq!(function.name, "main");
        assert_eq!(function.blocks.len(), 1);
        assert_eq!(function.blocks[0].instructions.len(), 2);
        assert!(function.blocks[0].has_terminator());
    }

    #[test]
    fn test_parameters_bump_temp_counter() {
        let mut builder = IrBuilder::new();
        builder.create_function("add2", Type::I32);
        let a = builder.add_parameter(Type::I32).unwrap();
        let b = builder.add_parameter(Type::I32).unwrap();
        builder.create_block("entry").unwrap();

        let sum = builder
            .build_binary(BinaryOp::Add, Value::Temp(a), Value::Temp(b), Type::I32)
            .unwrap();
        assert_eq!((a, b, sum), (0, 1, 2));
    }

    #[test]
    fn test_instruction_outside_block_fails() {
        let mut builder = IrBuilder::new();
        builder.create_function("f", Type::Void);
        let err = builder.build_return(None).unwrap_err();
        assert_eq!(err, IrError::build_error("no current block"));
    }

    #[test]
    fn test_duplicate_block_label_fails() {
        let mut builder = IrBuilder::new();
        builder.create_function("f", Type::Void);
        builder.create_block("entry").unwrap();
        assert!(builder.create_block("entry").is_err());
    }

    #[test]
    fn test_void_call_has_no_result() {
        let mut builder = IrBuilder::new();
        builder.create_function("f", Type::Void);
        builder.create_block("entry").unwrap();

        let result = builder
            .build_call(Value::Function("put".to_string()), Vec::new(), Type::Void)
            .unwrap();
        assert_eq!(result, None);
        assert!(!builder.current_block_has_terminator());

        builder.build_return(None).unwrap();
        assert!(builder.current_block_has_terminator());
    }
}
