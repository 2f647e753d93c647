//! The IR lowering engine: `lower_file` walks a bound AST twice - declaration
//! materialisation (Phase A), then body lowering (Phase B) - against the merged global symbol
//! table, producing one `inkwell` module per source file.

pub mod context;

use std::collections::{HashMap, HashSet};

use inkwell::basic_block::BasicBlock;
use inkwell::context::Context;
use inkwell::module::Linkage;
use inkwell::types::{BasicMetadataTypeEnum, BasicType, BasicTypeEnum};
use inkwell::values::{BasicMetadataValueEnum, BasicValue, BasicValueEnum, PointerValue};
use inkwell::{AddressSpace, IntPredicate};

use crate::ast::expression::{BinaryOp, Expr};
use crate::ast::statement::{FuncDecl, Stmt, StructDecl};
use crate::errors::CompileError;
use crate::symbols::{Symbol, SymbolKind};
use crate::types::Type;

use context::{CodegenContext, IrValue, StructDef};

/// A lowered expression's result.
struct Lowered<'ctx> {
    value: BasicValueEnum<'ctx>,
    semantic_type: Type,
    /// The receiver pointer of a member access/call lowered in function-access mode.
    receiver: Option<PointerValue<'ctx>>,
}

impl<'ctx> Lowered<'ctx> {
    fn plain(value: BasicValueEnum<'ctx>, semantic_type: Type) -> Lowered<'ctx> {
        Lowered { value, semantic_type, receiver: None }
    }

    fn pointer(&self) -> Result<PointerValue<'ctx>, CompileError> {
        match self.value {
            BasicValueEnum::PointerValue(p) => Ok(p),
            _ => Err(CompileError::lowering("expected a pointer-valued expression")),
        }
    }
}

/// Two flags, "pointer-access mode" and "function-access mode", set by a parent
/// construct (assignment LHS, call callee, struct-access composition) and restored by it once
/// the recursive call returns.
#[derive(Debug, Clone, Copy, Default)]
struct LowerMode {
    pointer_access: bool,
    function_access: bool,
}

/// Tracks the loop names whose φ-nodes are currently open, so nested loops can save/restore the
/// table around their own.
struct LoopState<'ctx> {
    saved_phi: HashMap<String, inkwell::values::PhiValue<'ctx>>,
}

pub fn lower_file<'ctx>(
    context: &'ctx Context,
    module_name: &str,
    global: &HashMap<String, Symbol>,
    stmts: &[Stmt],
) -> Result<CodegenContext<'ctx>, CompileError> {
    let ctx = CodegenContext::new(context, module_name);
    materialize_declarations(&ctx, global)?;
    for stmt in stmts {
        match stmt {
            Stmt::FuncDecl(f) => lower_function(&ctx, f, None)?,
            Stmt::StructDecl(s) => lower_struct_methods(&ctx, s)?,
            _ => {}
        }
    }
    Ok(ctx)
}

// ---- Phase A: declaration materialisation -----------------------------

fn materialize_declarations<'ctx>(ctx: &CodegenContext<'ctx>, global: &HashMap<String, Symbol>) -> Result<(), CompileError> {
    let i8ptr: BasicMetadataTypeEnum = ctx.context.ptr_type(AddressSpace::default()).into();
    let printf_ty = ctx.context.i32_type().fn_type(&[i8ptr], true);
    let printf = ctx.module.add_function("printf", printf_ty, Some(Linkage::External));
    ctx.value_table.borrow_mut().insert("printf".to_string(), IrValue::Function(printf));

    for sym in global.values().filter(|s| s.kind == SymbolKind::Struct) {
        materialize_struct(ctx, sym)?;
    }
    for sym in global.values().filter(|s| s.kind == SymbolKind::Function) {
        materialize_function(ctx, sym, &sym.name)?;
    }
    for sym in global.values().filter(|s| s.kind == SymbolKind::Struct) {
        for member in sym.struct_members.iter().filter(|m| m.kind == SymbolKind::Function) {
            let qualified = format!("{}::{}", sym.name, member.name);
            materialize_function(ctx, member, &qualified)?;
        }
    }
    Ok(())
}

fn materialize_struct<'ctx>(ctx: &CodegenContext<'ctx>, sym: &Symbol) -> Result<(), CompileError> {
    let ir_struct = ctx.context.opaque_struct_type(&sym.name);
    let mut members = Vec::new();
    let mut field_types = Vec::new();
    for field in sym.struct_members.iter().filter(|m| m.kind == SymbolKind::Variable) {
        let idx = field_types.len() as u32;
        let ir_ty = ir_type_of(ctx, &field.ty)?;
        field_types.push(ir_ty);
        members.push((field.name.clone(), idx, ir_ty, field.ty.clone()));
    }
    ir_struct.set_body(&field_types, false);
    ctx.struct_def_table.borrow_mut().insert(
        sym.name.clone(),
        StructDef { ir_type: ir_struct, members, semantic_type: sym.ty.clone() },
    );
    Ok(())
}

fn function_key(llvm_name: &str, is_extern_or_main: bool) -> String {
    if is_extern_or_main {
        llvm_name.to_string()
    } else {
        format!("func:{llvm_name}")
    }
}

fn materialize_function<'ctx>(ctx: &CodegenContext<'ctx>, sym: &Symbol, llvm_name: &str) -> Result<(), CompileError> {
    let param_types: Vec<BasicMetadataTypeEnum> = sym
        .param_types
        .iter()
        .map(|t| ir_type_of(ctx, t).map(Into::into))
        .collect::<Result<_, _>>()?;
    let fn_type = if sym.ty.is_void() {
        ctx.context.void_type().fn_type(&param_types, false)
    } else {
        ir_type_of(ctx, &sym.ty)?.fn_type(&param_types, false)
    };
    let function = ctx.module.add_function(llvm_name, fn_type, Some(Linkage::External));
    let key = function_key(llvm_name, sym.is_extern_or_main);
    ctx.semantic_type_table.borrow_mut().insert(key.clone(), sym.ty.clone());
    ctx.value_table.borrow_mut().insert(key, IrValue::Function(function));
    Ok(())
}

fn ir_type_of<'ctx>(ctx: &CodegenContext<'ctx>, ty: &Type) -> Result<BasicTypeEnum<'ctx>, CompileError> {
    match ty {
        // Opaque pointers carry no pointee type in LLVM 18; every pointer-of-T collapses to the
        // same IR type regardless of T.
        Type::Pointer(_) => Ok(ctx.context.ptr_type(AddressSpace::default()).into()),
        Type::Identifier(name) => match name.as_str() {
            "int" => Ok(ctx.context.i32_type().into()),
            "float" => Ok(ctx.context.f32_type().into()),
            "double" => Ok(ctx.context.f64_type().into()),
            "bool" => Ok(ctx.context.bool_type().into()),
            "char" | "byte" => Ok(ctx.context.i8_type().into()),
            "string" => Ok(ctx.context.ptr_type(AddressSpace::default()).into()),
            "void" => Err(CompileError::lowering("'void' cannot be used as a value type")),
            other => ctx
                .struct_def_table
                .borrow()
                .get(other)
                .map(|def| def.ir_type.into())
                .ok_or_else(|| CompileError::lowering(format!("unknown type '{other}'"))),
        },
    }
}

// ---- Phase B: body lowering ---------------------------------------------

fn lower_struct_methods<'ctx>(ctx: &CodegenContext<'ctx>, s: &StructDecl) -> Result<(), CompileError> {
    for f in &s.member_funcs {
        lower_function(ctx, f, Some(&s.name))?;
    }
    Ok(())
}

fn lower_function<'ctx>(ctx: &CodegenContext<'ctx>, f: &FuncDecl, owning_struct: Option<&str>) -> Result<(), CompileError> {
    if f.is_extern {
        return Ok(());
    }
    let llvm_name = match owning_struct {
        Some(owner) => format!("{owner}::{}", f.name),
        None => f.name.clone(),
    };
    let is_extern_or_main = f.name == "main";
    let key = function_key(&llvm_name, is_extern_or_main);
    let function = ctx
        .value_table
        .borrow()
        .get(&key)
        .and_then(IrValue::as_function)
        .ok_or_else(|| CompileError::lowering(format!("function '{llvm_name}' was not materialised")))?;

    ctx.set_current_function(function);
    let entry = ctx.context.append_basic_block(function, "entry");
    ctx.builder.position_at_end(entry);

    for (i, param) in f.params.iter().enumerate() {
        let arg = function
            .get_nth_param(i as u32)
            .ok_or_else(|| CompileError::lowering(format!("missing parameter #{i} of '{llvm_name}'")))?;
        let ir_ty = ir_type_of(ctx, &param.ty)?;
        let slot = ctx.build_entry_alloca(ir_ty, &format!("var:{}", param.name))?;
        ctx.builder
            .build_store(slot, arg)
            .map_err(|e| CompileError::lowering(format!("failed to bind parameter '{}': {e}", param.name)))?;
        let var_key = format!("var:{}", param.name);
        ctx.value_table.borrow_mut().insert(var_key.clone(), IrValue::Pointer(slot));
        ctx.semantic_type_table.borrow_mut().insert(var_key, param.ty.clone());
    }

    for stmt in &f.body {
        lower_stmt(ctx, stmt, None)?;
    }

    if f.ret_type.is_void() && current_block_unterminated(ctx) {
        ctx.builder
            .build_return(None)
            .map_err(|e| CompileError::lowering(format!("failed to close '{llvm_name}': {e}")))?;
    }
    Ok(())
}

fn current_block_unterminated(ctx: &CodegenContext) -> bool {
    ctx.builder
        .get_insert_block()
        .map(|b| b.get_terminator().is_none())
        .unwrap_or(false)
}

fn lower_stmt<'ctx>(ctx: &CodegenContext<'ctx>, stmt: &Stmt, merge_block: Option<BasicBlock<'ctx>>) -> Result<(), CompileError> {
    match stmt {
        Stmt::VarDecl { name, ty, init } => lower_var_decl(ctx, name, ty, init.as_ref()),
        Stmt::ConstDecl { .. } => Err(CompileError::lowering("'const' declarations are not lowered")),
        Stmt::Assignment { lhs, rhs } => lower_assignment(ctx, lhs, rhs),
        Stmt::If { cond, then_branch, else_branch } => lower_if(ctx, cond, then_branch, else_branch, merge_block),
        Stmt::While { cond, body } => lower_while(ctx, cond, body),
        Stmt::Return { value } => lower_return(ctx, value.as_ref()),
        Stmt::Expression(expr) => {
            lower_expr(ctx, expr, LowerMode::default())?;
            Ok(())
        }
        Stmt::FuncDecl(_) | Stmt::StructDecl(_) => {
            Err(CompileError::lowering("nested declarations are not lowered"))
        }
        Stmt::Use { .. } | Stmt::PackageDecl { .. } => Ok(()),
    }
}

fn lower_var_decl<'ctx>(ctx: &CodegenContext<'ctx>, name: &str, ty: &Type, init: Option<&Expr>) -> Result<(), CompileError> {
    let ir_ty = ir_type_of(ctx, ty)?;
    let var_key = format!("var:{name}");
    let already_declared = ctx.value_table.borrow().contains_key(&var_key);

    let slot = if already_declared {
        ctx.value_table.borrow().get(&var_key).and_then(IrValue::as_pointer).expect("checked above")
    } else {
        ctx.build_entry_alloca(ir_ty, &var_key)?
    };

    match init {
        Some(Expr::StructCtor { .. }) => {
            lower_struct_ctor_into(ctx, init.unwrap(), slot)?;
        }
        Some(expr) => {
            let lowered = lower_expr(ctx, expr, LowerMode::default())?;
            ctx.builder
                .build_store(slot, lowered.value)
                .map_err(|e| CompileError::lowering(format!("failed to initialise '{name}': {e}")))?;
            if already_declared {
                add_phi_incoming(ctx, name, lowered.value)?;
            }
        }
        None => {}
    }

    if !already_declared {
        ctx.value_table.borrow_mut().insert(var_key.clone(), IrValue::Pointer(slot));
        ctx.semantic_type_table.borrow_mut().insert(var_key, ty.clone());
    }
    Ok(())
}

fn add_phi_incoming<'ctx>(ctx: &CodegenContext<'ctx>, name: &str, value: BasicValueEnum<'ctx>) -> Result<(), CompileError> {
    if let Some(phi) = ctx.phi_table.borrow().get(name) {
        let block = ctx
            .builder
            .get_insert_block()
            .ok_or_else(|| CompileError::lowering("no active basic block for a φ incoming edge"))?;
        phi.add_incoming(&[(&value as &dyn BasicValue, block)]);
    }
    Ok(())
}

fn lower_assignment<'ctx>(ctx: &CodegenContext<'ctx>, lhs: &Expr, rhs: &Expr) -> Result<(), CompileError> {
    let target = lower_expr(ctx, lhs, LowerMode { pointer_access: true, ..Default::default() })?;
    let addr = target.pointer()?;

    if let Expr::StructCtor { .. } = rhs {
        lower_struct_ctor_into(ctx, rhs, addr)?;
    } else {
        let value = lower_expr(ctx, rhs, LowerMode::default())?;
        ctx.builder
            .build_store(addr, value.value)
            .map_err(|e| CompileError::lowering(format!("failed to lower assignment: {e}")))?;
        if let Expr::VariableUse { name, .. } = lhs {
            add_phi_incoming(ctx, name, value.value)?;
        }
    }
    Ok(())
}

/// Nested `if` statements reuse the outer `merge` block, yielding a single
/// join point for `else if` chains.
fn lower_if<'ctx>(
    ctx: &CodegenContext<'ctx>,
    cond: &Expr,
    then_branch: &[Stmt],
    else_branch: &[Stmt],
    merge_block: Option<BasicBlock<'ctx>>,
) -> Result<(), CompileError> {
    let cond_value = lower_expr(ctx, cond, LowerMode::default())?;
    let cond_int = cond_value.value.into_int_value();

    let then_bb = ctx.append_block("then");
    let else_bb = if else_branch.is_empty() { None } else { Some(ctx.append_block("else")) };
    let merge_bb = merge_block.unwrap_or_else(|| ctx.append_block("merge"));

    let else_target = else_bb.unwrap_or(merge_bb);
    ctx.builder
        .build_conditional_branch(cond_int, then_bb, else_target)
        .map_err(|e| CompileError::lowering(format!("failed to lower 'if' condition: {e}")))?;

    ctx.builder.position_at_end(then_bb);
    for stmt in then_branch {
        lower_stmt(ctx, stmt, None)?;
    }
    if current_block_unterminated(ctx) {
        ctx.builder
            .build_unconditional_branch(merge_bb)
            .map_err(|e| CompileError::lowering(format!("failed to close 'then': {e}")))?;
    }

    if let Some(else_bb) = else_bb {
        ctx.builder.position_at_end(else_bb);
        // A single nested `If` (from `else if`) passes this same merge block down so the whole
        // chain shares one join.
        if else_branch.len() == 1 {
            if let Stmt::If { cond, then_branch, else_branch } = &else_branch[0] {
                lower_if(ctx, cond, then_branch, else_branch, Some(merge_bb))?;
            } else {
                for stmt in else_branch {
                    lower_stmt(ctx, stmt, None)?;
                }
            }
        } else {
            for stmt in else_branch {
                lower_stmt(ctx, stmt, None)?;
            }
        }
        if current_block_unterminated(ctx) {
            ctx.builder
                .build_unconditional_branch(merge_bb)
                .map_err(|e| CompileError::lowering(format!("failed to close 'else': {e}")))?;
        }
    }

    ctx.builder.position_at_end(merge_bb);
    Ok(())
}

/// Collects every name declared or assigned anywhere in `body`, for While's φ pre-analysis.
fn assigned_names(body: &[Stmt], out: &mut HashSet<String>) {
    for stmt in body {
        match stmt {
            Stmt::VarDecl { name, .. } | Stmt::ConstDecl { name, .. } => {
                out.insert(name.clone());
            }
            Stmt::Assignment { lhs: Expr::VariableUse { name, .. }, .. } => {
                out.insert(name.clone());
            }
            Stmt::If { then_branch, else_branch, .. } => {
                assigned_names(then_branch, out);
                assigned_names(else_branch, out);
            }
            Stmt::While { body, .. } => assigned_names(body, out),
            _ => {}
        }
    }
}

fn lower_while<'ctx>(ctx: &CodegenContext<'ctx>, cond: &Expr, body: &[Stmt]) -> Result<(), CompileError> {
    let entry_block = ctx
        .builder
        .get_insert_block()
        .ok_or_else(|| CompileError::lowering("no active basic block entering 'while'"))?;

    let cond_bb = ctx.append_block("cond");
    let body_bb = ctx.append_block("body");
    let merge_bb = ctx.append_block("merge");

    ctx.builder
        .build_unconditional_branch(cond_bb)
        .map_err(|e| CompileError::lowering(format!("failed to enter 'while': {e}")))?;
    ctx.builder.position_at_end(cond_bb);

    let mut names = HashSet::new();
    assigned_names(body, &mut names);

    let saved_phi = ctx.phi_table.borrow().clone();
    let mut loop_state = LoopState { saved_phi };
    for name in &names {
        let var_key = format!("var:{name}");
        let Some(slot) = ctx.value_table.borrow().get(&var_key).and_then(IrValue::as_pointer) else { continue };
        let semantic_ty = ctx
            .semantic_type_table
            .borrow()
            .get(&var_key)
            .cloned()
            .ok_or_else(|| CompileError::ty(format!("missing semantic type for expression '{name}'")))?;
        let ir_ty = ir_type_of(ctx, &semantic_ty)?;
        let phi = ctx
            .builder
            .build_phi(ir_ty, name)
            .map_err(|e| CompileError::lowering(format!("failed to create φ-node for '{name}': {e}")))?;
        let entry_value = {
            let tmp = ctx.context.create_builder();
            tmp.position_at_end(entry_block);
            tmp.build_load(ir_ty, slot, "entry_val")
                .map_err(|e| CompileError::lowering(format!("failed to prime φ-node for '{name}': {e}")))?
        };
        phi.add_incoming(&[(&entry_value as &dyn BasicValue, entry_block)]);
        ctx.phi_table.borrow_mut().insert(name.clone(), phi);
        // Reads of this variable inside the loop observe the φ-node's value, not a reload of
        // the stack slot, until the loop is lowered.
        ctx.builder
            .build_store(slot, phi.as_basic_value())
            .map_err(|e| CompileError::lowering(format!("failed to seed loop slot for '{name}': {e}")))?;
    }

    let cond_value = lower_expr(ctx, cond, LowerMode::default())?;
    let cond_int = cond_value.value.into_int_value();
    ctx.builder
        .build_conditional_branch(cond_int, body_bb, merge_bb)
        .map_err(|e| CompileError::lowering(format!("failed to lower 'while' condition: {e}")))?;

    ctx.builder.position_at_end(body_bb);
    for stmt in body {
        lower_stmt(ctx, stmt, None)?;
    }
    if current_block_unterminated(ctx) {
        ctx.builder
            .build_unconditional_branch(cond_bb)
            .map_err(|e| CompileError::lowering(format!("failed to close 'while' body: {e}")))?;
    }

    ctx.builder.position_at_end(merge_bb);
    *ctx.phi_table.borrow_mut() = std::mem::take(&mut loop_state.saved_phi);
    Ok(())
}

fn lower_return<'ctx>(ctx: &CodegenContext<'ctx>, value: Option<&Expr>) -> Result<(), CompileError> {
    match value {
        Some(expr) => {
            let lowered = lower_expr(ctx, expr, LowerMode::default())?;
            ctx.builder
                .build_return(Some(&lowered.value as &dyn BasicValue))
                .map_err(|e| CompileError::lowering(format!("failed to lower 'return': {e}")))?;
        }
        None => {
            ctx.builder
                .build_return(None)
                .map_err(|e| CompileError::lowering(format!("failed to lower 'return': {e}")))?;
        }
    }
    Ok(())
}

fn lower_struct_ctor_into<'ctx>(ctx: &CodegenContext<'ctx>, expr: &Expr, dest: PointerValue<'ctx>) -> Result<(), CompileError> {
    let Expr::StructCtor { type_name, args } = expr else {
        return Err(CompileError::lowering("expected a struct constructor expression"));
    };
    let ctor_key = format!("func:{type_name}::ctor");
    let ctor = ctx.value_table.borrow().get(&ctor_key).and_then(IrValue::as_function);
    if let Some(ctor) = ctor {
        let mut arg_values: Vec<BasicMetadataValueEnum> = Vec::with_capacity(args.len() + 1);
        for arg in args {
            let lowered = lower_expr(ctx, arg, LowerMode::default())?;
            arg_values.push(lowered.value.into());
        }
        arg_values.push(dest.into());
        ctx.builder
            .build_call(ctor, &arg_values, "ctor_call")
            .map_err(|e| CompileError::lowering(format!("failed to call '{type_name}::ctor': {e}")))?;
    } else if !args.is_empty() {
        return Err(CompileError::arity(format!("'{type_name}' has no constructor but was called with arguments")));
    }
    Ok(())
}

fn lower_expr<'ctx>(ctx: &CodegenContext<'ctx>, expr: &Expr, mode: LowerMode) -> Result<Lowered<'ctx>, CompileError> {
    match expr {
        Expr::IntLiteral(n) => {
            let value = ctx.context.i32_type().const_int(*n as u64, true);
            Ok(Lowered::plain(value.into(), Type::identifier("int")))
        }
        Expr::StringLiteral(s) => {
            let global = ctx
                .builder
                .build_global_string_ptr(s, "str")
                .map_err(|e| CompileError::lowering(format!("failed to lower string literal: {e}")))?;
            Ok(Lowered::plain(global.as_pointer_value().into(), Type::identifier("string")))
        }
        Expr::VariableUse { name, is_func_resolved } => lower_variable_use(ctx, name, *is_func_resolved, mode),
        Expr::Binary { lhs, op, rhs } => lower_binary(ctx, lhs, *op, rhs),
        Expr::Postfix { .. } => Err(CompileError::lowering("postfix increment/decrement is not lowered")),
        Expr::Call { callee, args, is_member_call_resolved } => lower_call(ctx, callee, args, *is_member_call_resolved),
        Expr::StructCtor { .. } => {
            let ir_ty = struct_ir_type(ctx, expr)?;
            let dest = ctx.build_entry_alloca(ir_ty.0, "ctor_tmp")?;
            lower_struct_ctor_into(ctx, expr, dest)?;
            Ok(Lowered::plain(dest.into(), ir_ty.1))
        }
        Expr::StructAccess { lhs, member_name } => lower_struct_access(ctx, lhs, member_name, mode),
    }
}

fn struct_ir_type<'ctx>(ctx: &CodegenContext<'ctx>, expr: &Expr) -> Result<(BasicTypeEnum<'ctx>, Type), CompileError> {
    let Expr::StructCtor { type_name, .. } = expr else {
        return Err(CompileError::lowering("expected a struct constructor expression"));
    };
    let def = ctx
        .struct_def_table
        .borrow()
        .get(type_name)
        .cloned()
        .ok_or_else(|| CompileError::lowering(format!("unknown struct '{type_name}'")))?;
    Ok((def.ir_type.into(), def.semantic_type))
}

fn lower_variable_use<'ctx>(
    ctx: &CodegenContext<'ctx>,
    name: &str,
    is_func_resolved: bool,
    mode: LowerMode,
) -> Result<Lowered<'ctx>, CompileError> {
    if is_func_resolved {
        let key = resolve_function_key(ctx, name);
        let function = ctx
            .value_table
            .borrow()
            .get(&key)
            .and_then(IrValue::as_function)
            .ok_or_else(|| CompileError::resolution(format!("undefined function '{name}'")))?;
        let semantic_ty = ctx.semantic_type_table.borrow().get(&key).cloned().unwrap_or(Type::identifier("void"));
        let as_ptr = function.as_global_value().as_pointer_value();
        return Ok(Lowered::plain(as_ptr.into(), semantic_ty));
    }

    let var_key = format!("var:{name}");
    let slot = ctx
        .value_table
        .borrow()
        .get(&var_key)
        .and_then(IrValue::as_pointer)
        .ok_or_else(|| CompileError::resolution(format!("undefined variable '{name}'")))?;
    let semantic_ty = ctx
        .semantic_type_table
        .borrow()
        .get(&var_key)
        .cloned()
        .ok_or_else(|| CompileError::ty(format!("missing semantic type for expression '{name}'")))?;

    if mode.pointer_access {
        return Ok(Lowered::plain(slot.into(), semantic_ty));
    }

    if let Some(phi) = ctx.phi_table.borrow().get(name) {
        return Ok(Lowered::plain(phi.as_basic_value(), semantic_ty));
    }

    let ir_ty = ir_type_of(ctx, &semantic_ty)?;
    let loaded = ctx
        .builder
        .build_load(ir_ty, slot, name)
        .map_err(|e| CompileError::lowering(format!("failed to load '{name}': {e}")))?;
    Ok(Lowered::plain(loaded, semantic_ty))
}

/// Resolves a bare name to its `value_table` key, trying the plain-function prefix first and
/// falling back to the raw name for `extern`/`main` entries.
fn resolve_function_key(ctx: &CodegenContext, name: &str) -> String {
    let prefixed = format!("func:{name}");
    if ctx.value_table.borrow().contains_key(&prefixed) {
        prefixed
    } else {
        name.to_string()
    }
}

fn lower_call<'ctx>(
    ctx: &CodegenContext<'ctx>,
    callee: &Expr,
    args: &[Expr],
    is_member_call: bool,
) -> Result<Lowered<'ctx>, CompileError> {
    let callee_lowered = lower_expr(ctx, callee, LowerMode { function_access: true, ..Default::default() })?;
    let callee_name = callee_display_name(callee);

    let function = if callee_name.as_deref() == Some("print") {
        ctx.value_table.borrow().get("printf").and_then(IrValue::as_function)
    } else {
        let key = match callee {
            Expr::VariableUse { name, .. } => resolve_function_key(ctx, name),
            Expr::StructAccess { member_name, .. } => {
                find_member_function_key(ctx, callee)?.unwrap_or_else(|| format!("func:{member_name}"))
            }
            _ => return Err(CompileError::lowering("callee is not callable")),
        };
        ctx.value_table.borrow().get(&key).and_then(IrValue::as_function)
    }
    .ok_or_else(|| CompileError::resolution("call to an unresolved function"))?;

    let mut arg_values: Vec<BasicMetadataValueEnum> = Vec::with_capacity(args.len() + 1);
    for arg in args {
        let lowered = lower_expr(ctx, arg, LowerMode::default())?;
        arg_values.push(lowered.value.into());
    }
    if is_member_call {
        let receiver = callee_lowered
            .receiver
            .ok_or_else(|| CompileError::lowering("member call missing a receiver"))?;
        arg_values.push(receiver.into());
    }

    let call = ctx
        .builder
        .build_call(function, &arg_values, "call")
        .map_err(|e| CompileError::lowering(format!("failed to lower call: {e}")))?;
    let ret_ty = ctx
        .semantic_type_table
        .borrow()
        .get(&format!("func:{}", function.get_name().to_str().unwrap_or_default()))
        .cloned()
        .unwrap_or(Type::identifier("void"));

    match call.try_as_basic_value().left() {
        Some(value) => Ok(Lowered::plain(value, ret_ty)),
        None => Ok(Lowered::plain(ctx.context.i32_type().const_zero().into(), Type::identifier("void"))),
    }
}

fn callee_display_name(callee: &Expr) -> Option<String> {
    match callee {
        Expr::VariableUse { name, .. } => Some(name.clone()),
        _ => None,
    }
}

fn find_member_function_key(ctx: &CodegenContext, callee: &Expr) -> Result<Option<String>, CompileError> {
    let Expr::StructAccess { lhs, member_name } = callee else { return Ok(None) };
    let struct_name = receiver_struct_name(ctx, lhs)?;
    Ok(Some(format!("func:{struct_name}::{member_name}")))
}

fn receiver_struct_name(ctx: &CodegenContext, lhs: &Expr) -> Result<String, CompileError> {
    match lhs {
        Expr::VariableUse { name, .. } => {
            let var_key = format!("var:{name}");
            let ty = ctx
                .semantic_type_table
                .borrow()
                .get(&var_key)
                .cloned()
                .ok_or_else(|| CompileError::ty(format!("missing semantic type for expression '{name}'")))?;
            Ok(ty.base_of().to_string())
        }
        Expr::StructAccess { member_name, .. } => Ok(member_name.clone()),
        _ => Err(CompileError::lowering("method receiver must be a named value")),
    }
}

fn lower_struct_access<'ctx>(
    ctx: &CodegenContext<'ctx>,
    lhs: &Expr,
    member_name: &str,
    mode: LowerMode,
) -> Result<Lowered<'ctx>, CompileError> {
    let lhs_lowered = lower_expr(ctx, lhs, LowerMode { pointer_access: true, ..Default::default() })?;
    let struct_ptr = lhs_lowered.pointer()?;
    let struct_name = lhs_lowered.semantic_type.base_of().to_string();

    if mode.function_access {
        let key = format!("func:{struct_name}::{member_name}");
        let semantic_ty = ctx.semantic_type_table.borrow().get(&key).cloned().unwrap_or(Type::identifier("void"));
        let function = ctx.value_table.borrow().get(&key).and_then(IrValue::as_function);
        let placeholder = function
            .map(|f| f.as_global_value().as_pointer_value())
            .unwrap_or_else(|| struct_ptr);
        return Ok(Lowered { value: placeholder.into(), semantic_type: semantic_ty, receiver: Some(struct_ptr) });
    }

    let defs = ctx.struct_def_table.borrow();
    let def = defs.get(&struct_name).ok_or_else(|| CompileError::lowering(format!("unknown struct '{struct_name}'")))?;
    let (_, index, ir_ty, semantic_ty) = def
        .field(member_name)
        .ok_or_else(|| CompileError::resolution(format!("'{struct_name}' has no member '{member_name}'")))?
        .clone();
    let ir_struct_type = def.ir_type;
    drop(defs);

    let field_ptr = ctx
        .builder
        .build_struct_gep(ir_struct_type, struct_ptr, index, member_name)
        .map_err(|e| CompileError::lowering(format!("failed to address field '{member_name}': {e}")))?;

    if mode.pointer_access {
        return Ok(Lowered::plain(field_ptr.into(), semantic_ty));
    }

    let loaded = ctx
        .builder
        .build_load(ir_ty, field_ptr, member_name)
        .map_err(|e| CompileError::lowering(format!("failed to load field '{member_name}': {e}")))?;
    Ok(Lowered::plain(loaded, semantic_ty))
}

fn lower_binary<'ctx>(ctx: &CodegenContext<'ctx>, lhs: &Expr, op: BinaryOp, rhs: &Expr) -> Result<Lowered<'ctx>, CompileError> {
    let l = lower_expr(ctx, lhs, LowerMode::default())?;
    let r = lower_expr(ctx, rhs, LowerMode::default())?;
    let lv = l.value.into_int_value();
    let rv = r.value.into_int_value();

    let result_is_bool = op.is_comparison();
    let value = match op {
        BinaryOp::Add => ctx.builder.build_int_add(lv, rv, "add"),
        BinaryOp::Sub => ctx.builder.build_int_sub(lv, rv, "sub"),
        BinaryOp::Mul => ctx.builder.build_int_mul(lv, rv, "mul"),
        BinaryOp::Div => ctx.builder.build_int_signed_div(lv, rv, "div"),
        BinaryOp::Lt => ctx.builder.build_int_compare(IntPredicate::SLT, lv, rv, "lt"),
        BinaryOp::Gt => ctx.builder.build_int_compare(IntPredicate::SGT, lv, rv, "gt"),
        BinaryOp::Le => ctx.builder.build_int_compare(IntPredicate::SLE, lv, rv, "le"),
        BinaryOp::Ge => ctx.builder.build_int_compare(IntPredicate::SGE, lv, rv, "ge"),
        BinaryOp::Eq => ctx.builder.build_int_compare(IntPredicate::EQ, lv, rv, "eq"),
        BinaryOp::Neq => ctx.builder.build_int_compare(IntPredicate::NE, lv, rv, "neq"),
        // `&&`/`||` lower to a short-circuit-free bitwise and/or on `i1` operands.
        BinaryOp::And => ctx.builder.build_and(lv, rv, "and"),
        BinaryOp::Or => ctx.builder.build_or(lv, rv, "or"),
        BinaryOp::Xor
        | BinaryOp::AddAssign
        | BinaryOp::SubAssign
        | BinaryOp::MulAssign
        | BinaryOp::DivAssign
        | BinaryOp::ModAssign
        | BinaryOp::AndAssign
        | BinaryOp::OrAssign
        | BinaryOp::XorAssign => return Err(CompileError::lowering(format!("'{op:?}' is not lowered"))),
    }
    .map_err(|e| CompileError::lowering(format!("failed to lower binary expression: {e}")))?;

    let semantic_type = if result_is_bool { Type::identifier("bool") } else { l.semantic_type };
    Ok(Lowered::plain(value.into(), semantic_type))
}
