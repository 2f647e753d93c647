//! The IR backend facade: a thin wrapper over `inkwell`'s LLVM bindings plus the
//! four auxiliary maps the lowering engine threads through a single file's codegen pass.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;

use inkwell::builder::Builder;
use inkwell::context::Context;
use inkwell::module::Module;
use inkwell::targets::{CodeModel, FileType, InitializationConfig, RelocMode, Target, TargetMachine};
use inkwell::types::{BasicTypeEnum, StructType};
use inkwell::values::{FunctionValue, PhiValue, PointerValue};
use inkwell::OptimizationLevel;

use crate::errors::CompileError;
use crate::types::Type;

/// An entry in `value_table`: the table holds either a first-class value, a stack slot (for
/// `var:<n>` locals), or a callable function object (for `func:<n>` / `extern` / `main`).
#[derive(Debug, Clone, Copy)]
pub enum IrValue<'ctx> {
    Pointer(PointerValue<'ctx>),
    Function(FunctionValue<'ctx>),
}

impl<'ctx> IrValue<'ctx> {
    pub fn as_pointer(&self) -> Option<PointerValue<'ctx>> {
        match self {
            IrValue::Pointer(p) => Some(*p),
            IrValue::Function(_) => None,
        }
    }

    pub fn as_function(&self) -> Option<FunctionValue<'ctx>> {
        match self {
            IrValue::Function(f) => Some(*f),
            IrValue::Pointer(_) => None,
        }
    }
}

/// A materialised struct type (Phase A), `struct_def_table`'s value type.
#[derive(Debug, Clone)]
pub struct StructDef<'ctx> {
    pub ir_type: StructType<'ctx>,
    /// `(field name, field index, IR type, semantic type)`, in declaration order.
    pub members: Vec<(String, u32, BasicTypeEnum<'ctx>, Type)>,
    pub semantic_type: Type,
}

impl<'ctx> StructDef<'ctx> {
    pub fn field(&self, name: &str) -> Option<&(String, u32, BasicTypeEnum<'ctx>, Type)> {
        self.members.iter().find(|(n, ..)| n == name)
    }
}

/// Owns one file's independent LLVM context/module/builder (contexts are never shared across
/// files) and the four auxiliary maps tracking values, semantic types, struct layouts, and
/// in-flight phi nodes.
pub struct CodegenContext<'ctx> {
    pub context: &'ctx Context,
    pub module: Module<'ctx>,
    pub builder: Builder<'ctx>,
    pub value_table: RefCell<HashMap<String, IrValue<'ctx>>>,
    pub semantic_type_table: RefCell<HashMap<String, Type>>,
    pub struct_def_table: RefCell<HashMap<String, StructDef<'ctx>>>,
    pub phi_table: RefCell<HashMap<String, PhiValue<'ctx>>>,
    current_function: RefCell<Option<FunctionValue<'ctx>>>,
}

impl<'ctx> CodegenContext<'ctx> {
    pub fn new(context: &'ctx Context, module_name: &str) -> CodegenContext<'ctx> {
        CodegenContext {
            context,
            module: context.create_module(module_name),
            builder: context.create_builder(),
            value_table: RefCell::new(HashMap::new()),
            semantic_type_table: RefCell::new(HashMap::new()),
            struct_def_table: RefCell::new(HashMap::new()),
            phi_table: RefCell::new(HashMap::new()),
            current_function: RefCell::new(None),
        }
    }

    pub fn set_current_function(&self, f: FunctionValue<'ctx>) {
        *self.current_function.borrow_mut() = Some(f);
        // Locals from a previously lowered function must not leak into this one; function and
        // struct entries (which have no `var:` prefix) are left untouched.
        self.value_table.borrow_mut().retain(|name, _| !name.starts_with("var:"));
    }

    pub fn current_function(&self) -> FunctionValue<'ctx> {
        self.current_function.borrow().expect("current function set before body lowering begins")
    }

    /// Blocks are inserted at the end of the current function, matching `inkwell`'s
    /// `append_basic_block`.
    pub fn append_block(&self, name: &str) -> inkwell::basic_block::BasicBlock<'ctx> {
        self.context.append_basic_block(self.current_function(), name)
    }

    /// Allocas for locals always live in the function's entry block, never at the current
    /// insertion point, so repeated loop iterations don't grow the stack.
    pub fn build_entry_alloca(
        &self,
        ty: BasicTypeEnum<'ctx>,
        name: &str,
    ) -> Result<PointerValue<'ctx>, CompileError> {
        let entry = self.current_function().get_first_basic_block().ok_or_else(|| {
            CompileError::lowering("function has no entry block to allocate into")
        })?;
        let tmp_builder = self.context.create_builder();
        match entry.get_first_instruction() {
            Some(first) => tmp_builder.position_before(&first),
            None => tmp_builder.position_at_end(entry),
        }
        tmp_builder
            .build_alloca(ty, name)
            .map_err(|e| CompileError::lowering(format!("failed to allocate '{name}': {e}")))
    }

    /// Drives target-triple detection, a level-2 optimization pipeline, and object-file
    /// emission.
    pub fn emit_object_file(&self, path: &Path) -> Result<(), CompileError> {
        Target::initialize_native(&InitializationConfig::default())
            .map_err(|e| CompileError::link(format!("failed to initialize native target: {e}")))?;
        let triple = TargetMachine::get_default_triple();
        let target = Target::from_triple(&triple)
            .map_err(|e| CompileError::link(format!("no backend target for '{triple}': {e}")))?;
        let cpu = TargetMachine::get_host_cpu_name();
        let features = TargetMachine::get_host_cpu_features();
        let machine = target
            .create_target_machine(
                &triple,
                cpu.to_str().unwrap_or("generic"),
                features.to_str().unwrap_or(""),
                OptimizationLevel::Default,
                RelocMode::Default,
                CodeModel::Default,
            )
            .ok_or_else(|| CompileError::link("failed to create a target machine".to_string()))?;
        machine
            .write_to_file(&self.module, FileType::Object, path)
            .map_err(|e| CompileError::link(format!("failed to write object file: {e}")))
    }
}
