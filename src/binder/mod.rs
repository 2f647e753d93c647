//! The two-pass semantic binder.
//!
//! Phase one (`summarize_file`) walks a file's top-level declarations and produces the
//! name -> `Symbol` summary the build driver merges into the global table before
//! any file's binder runs. Phase two (`bind_file`) resolves every name, type-checks every
//! expression, and annotates the AST in place using that merged table plus a per-function local
//! scope stack.

use std::collections::HashMap;

use crate::ast::expression::{BinaryOp, Expr};
use crate::ast::statement::{FuncDecl, Param, Stmt, StructDecl};
use crate::errors::CompileError;
use crate::symbols::{Symbol, SymbolKind, ScopeStack};
use crate::types::Type;

/// The variadic `print` builtin every file can call without an explicit declaration.
fn inject_builtins(stack: &mut ScopeStack) {
    let mut print = Symbol::function("print", Type::identifier("void"), vec![Type::identifier("string")]);
    print.variadic = true;
    stack.add(print);
}

/// Phase one: produces this file's top-level name -> symbol summary, without resolving any
/// body. Struct declarations contribute both the struct symbol itself and function symbols for
/// each member function (with the implicit `this` parameter already appended, so arity checks
/// made by *other* files against these symbols are correct before phase two ever runs).
pub fn summarize_file(stmts: &[Stmt]) -> Result<HashMap<String, Symbol>, CompileError> {
    let mut summary = HashMap::new();
    for stmt in stmts {
        match stmt {
            Stmt::FuncDecl(f) => {
                if summary.contains_key(&f.name) {
                    return Err(CompileError::resolution(format!("'{}' is declared more than once", f.name)));
                }
                summary.insert(f.name.clone(), function_symbol(f, None));
            }
            Stmt::StructDecl(s) => {
                if summary.contains_key(&s.name) {
                    return Err(CompileError::resolution(format!("'{}' is declared more than once", s.name)));
                }
                let members: Vec<Symbol> = s
                    .fields
                    .iter()
                    .map(|p| Symbol::variable(p.name.clone(), p.ty.clone()))
                    .chain(s.member_funcs.iter().map(|f| function_symbol(f, Some(&s.name))))
                    .collect();
                summary.insert(s.name.clone(), Symbol::strct(s.name.clone(), members));
            }
            Stmt::Use { .. } | Stmt::PackageDecl { .. } => {}
            other => {
                return Err(CompileError::resolution(format!(
                    "'{other:?}' is not a valid top-level declaration"
                )))
            }
        }
    }
    Ok(summary)
}

fn function_symbol(f: &FuncDecl, owning_struct: Option<&str>) -> Symbol {
    let mut param_types: Vec<Type> = f.params.iter().map(|p| p.ty.clone()).collect();
    if let Some(owner) = owning_struct {
        param_types.insert(0, Type::pointer_of(Type::identifier(owner)));
    }
    let mut sym = Symbol::function(f.name.clone(), f.ret_type.clone(), param_types);
    sym.is_struct_member_function = owning_struct.is_some();
    sym.is_extern_or_main = f.is_extern || f.name == "main";
    sym
}

/// Phase two: resolves every name in `stmts` against `global` (the merged table from every file
/// in the project), type-checks every expression, and annotates
/// `VariableUse::is_func_resolved` / `Call::is_member_call_resolved` in place. `const` is
/// accepted here.
pub fn bind_file(stmts: &mut [Stmt], global: HashMap<String, Symbol>) -> Result<(), CompileError> {
    let mut stack = ScopeStack::new(global);
    inject_builtins(&mut stack);
    for stmt in stmts.iter_mut() {
        bind_top_level(stmt, &mut stack)?;
    }
    Ok(())
}

fn bind_top_level(stmt: &mut Stmt, stack: &mut ScopeStack) -> Result<(), CompileError> {
    match stmt {
        Stmt::FuncDecl(f) => bind_func_decl(f, stack, None),
        Stmt::StructDecl(s) => bind_struct_decl(s, stack),
        Stmt::Use { .. } | Stmt::PackageDecl { .. } => Ok(()),
        _ => Ok(()),
    }
}

fn bind_struct_decl(s: &mut StructDecl, stack: &mut ScopeStack) -> Result<(), CompileError> {
    let struct_name = s.name.clone();
    for f in s.member_funcs.iter_mut() {
        bind_func_decl(f, stack, Some(&struct_name))?;
    }
    Ok(())
}

/// Appends the implicit `this` parameter exactly once, then binds the
/// body in a fresh scope seeded with all parameters.
fn bind_func_decl(f: &mut FuncDecl, stack: &mut ScopeStack, owning_struct: Option<&str>) -> Result<(), CompileError> {
    if let Some(owner) = owning_struct {
        if !f.is_struct_member_resolved {
            f.params.insert(0, Param { ty: Type::pointer_of(Type::identifier(owner)), name: "this".to_string() });
            f.is_struct_member_resolved = true;
        }
    }
    if f.is_extern {
        return Ok(());
    }
    stack.enter();
    for p in &f.params {
        stack.add(Symbol::variable(p.name.clone(), p.ty.clone()));
    }
    for stmt in f.body.iter_mut() {
        bind_statement(stmt, stack, &f.ret_type)?;
    }
    stack.leave();
    Ok(())
}

fn bind_statement(stmt: &mut Stmt, stack: &mut ScopeStack, ret_type: &Type) -> Result<(), CompileError> {
    match stmt {
        Stmt::VarDecl { name, ty, init } => {
            if stack.contains_in_innermost(name) {
                return Err(CompileError::resolution(format!("'{name}' is already declared in this scope")));
            }
            if ty.is_void() {
                return Err(CompileError::ty(format!("variable '{name}' cannot have type 'void'")));
            }
            if let Some(init) = init {
                let init_ty = bind_expr(init, stack)?;
                if init_ty.to_string() != ty.to_string() {
                    return Err(CompileError::ty(format!(
                        "'{name}' is initialised with type {}, but expected type is {}",
                        init_ty.to_string(),
                        ty.to_string()
                    )));
                }
            }
            stack.add(Symbol::variable(name.clone(), ty.clone()));
            Ok(())
        }
        Stmt::ConstDecl { name, ty, init } => {
            if stack.contains_in_innermost(name) {
                return Err(CompileError::resolution(format!("'{name}' is already declared in this scope")));
            }
            let init_ty = bind_expr(init, stack)?;
            if init_ty.to_string() != ty.to_string() {
                return Err(CompileError::ty(format!(
                    "'{name}' is initialised with type {}, but expected type is {}",
                    init_ty.to_string(),
                    ty.to_string()
                )));
            }
            stack.add(Symbol::variable(name.clone(), ty.clone()));
            Ok(())
        }
        Stmt::Assignment { lhs, rhs } => {
            let lhs_ty = bind_expr(lhs, stack)?;
            let rhs_ty = bind_expr(rhs, stack)?;
            if lhs_ty.to_string() != rhs_ty.to_string() {
                return Err(CompileError::ty(format!(
                    "cannot assign a value of type {} to a target of type {}",
                    rhs_ty.to_string(),
                    lhs_ty.to_string()
                )));
            }
            Ok(())
        }
        // `if`/`while` bodies intentionally do not open a new scope: declarations inside leak
        // into the enclosing function scope (the while-loop re-declaration handling in lowering
        // depends on this).
        Stmt::If { cond, then_branch, else_branch } => {
            bind_expr(cond, stack)?;
            for s in then_branch.iter_mut() {
                bind_statement(s, stack, ret_type)?;
            }
            for s in else_branch.iter_mut() {
                bind_statement(s, stack, ret_type)?;
            }
            Ok(())
        }
        Stmt::While { cond, body } => {
            bind_expr(cond, stack)?;
            for s in body.iter_mut() {
                bind_statement(s, stack, ret_type)?;
            }
            Ok(())
        }
        Stmt::Return { value } => {
            match value {
                Some(value) => {
                    let value_ty = bind_expr(value, stack)?;
                    if value_ty.to_string() != ret_type.to_string() {
                        return Err(CompileError::ty(format!(
                            "'return' yields type {}, but the function returns {}",
                            value_ty.to_string(),
                            ret_type.to_string()
                        )));
                    }
                }
                None if !ret_type.is_void() => {
                    return Err(CompileError::ty(format!(
                        "'return' with no value in a function returning {}",
                        ret_type.to_string()
                    )));
                }
                None => {}
            }
            Ok(())
        }
        Stmt::Expression(expr) => bind_expr(expr, stack).map(|_| ()),
        Stmt::FuncDecl(_) | Stmt::StructDecl(_) => {
            Err(CompileError::resolution("nested function/struct declarations are not supported"))
        }
        Stmt::Use { .. } | Stmt::PackageDecl { .. } => Ok(()),
    }
}

/// Binds `expr` and returns its `Type`.
fn bind_expr(expr: &mut Expr, stack: &mut ScopeStack) -> Result<Type, CompileError> {
    match expr {
        Expr::IntLiteral(_) => Ok(Type::identifier("int")),
        Expr::StringLiteral(_) => Ok(Type::identifier("string")),
        Expr::VariableUse { name, is_func_resolved } => {
            let sym = stack.lookup(name).ok_or_else(|| CompileError::resolution(format!("undefined name '{name}'")))?;
            if !matches!(sym.kind, SymbolKind::Variable | SymbolKind::Function) {
                return Err(CompileError::resolution(format!("'{name}' cannot be used as a value")));
            }
            *is_func_resolved = sym.kind == SymbolKind::Function;
            Ok(sym.ty.clone())
        }
        Expr::Binary { lhs, op, rhs } => {
            let lhs_ty = bind_expr(lhs, stack)?;
            let rhs_ty = bind_expr(rhs, stack)?;
            if lhs_ty.to_string() != rhs_ty.to_string() {
                return Err(CompileError::ty(format!(
                    "binary operands have mismatched types {} and {}",
                    lhs_ty.to_string(),
                    rhs_ty.to_string()
                )));
            }
            if op.is_comparison() {
                Ok(Type::identifier("bool"))
            } else {
                Ok(lhs_ty)
            }
        }
        Expr::Postfix { operand, .. } => bind_expr(operand, stack),
        Expr::Call { callee, args, is_member_call_resolved } => {
            *is_member_call_resolved = matches!(**callee, Expr::StructAccess { .. });
            let func_sym = resolve_callee_symbol(callee, stack)?;
            check_call_arity(&func_sym, args.len())?;
            let mut arg_types = Vec::with_capacity(args.len());
            for a in args.iter_mut() {
                arg_types.push(bind_expr(a, stack)?);
            }
            if !func_sym.variadic {
                let expected: Vec<&Type> = if func_sym.is_struct_member_function {
                    func_sym.param_types.iter().skip(1).collect()
                } else {
                    func_sym.param_types.iter().collect()
                };
                for (i, (expected_ty, actual_ty)) in expected.iter().zip(arg_types.iter()).enumerate() {
                    if expected_ty.to_string() != actual_ty.to_string() {
                        return Err(CompileError::ty(format!(
                            "argument {} has type {}, expected {}",
                            i + 1,
                            actual_ty.to_string(),
                            expected_ty.to_string()
                        )));
                    }
                }
            }
            bind_expr(callee, stack)?;
            Ok(func_sym.ty.clone())
        }
        Expr::StructCtor { type_name, args } => {
            let sym = stack
                .lookup(type_name)
                .ok_or_else(|| CompileError::resolution(format!("undefined struct '{type_name}'")))?
                .clone();
            if sym.kind != SymbolKind::Struct {
                return Err(CompileError::resolution(format!("'{type_name}' is not a struct")));
            }
            match sym.find_member("ctor") {
                Some(ctor) => {
                    if ctor.visible_arity() != args.len() {
                        return Err(CompileError::arity(format!(
                            "'{type_name}::ctor' expects {} argument(s), found {}",
                            ctor.visible_arity(),
                            args.len()
                        )));
                    }
                    for (i, (param_ty, arg)) in ctor.param_types.iter().skip(1).zip(args.iter_mut()).enumerate() {
                        let arg_ty = bind_expr(arg, stack)?;
                        if arg_ty.to_string() != param_ty.to_string() {
                            return Err(CompileError::ty(format!(
                                "constructor argument {} has type {}, expected {}",
                                i + 1,
                                arg_ty.to_string(),
                                param_ty.to_string()
                            )));
                        }
                    }
                }
                None if !args.is_empty() => {
                    return Err(CompileError::arity(format!(
                        "'{type_name}' has no constructor but was called with {} argument(s)",
                        args.len()
                    )));
                }
                None => {}
            }
            Ok(sym.ty.clone())
        }
        Expr::StructAccess { lhs, member_name } => {
            let lhs_ty = bind_expr(lhs, stack)?;
            let struct_name = lhs_ty.base_of().to_string();
            let struct_sym = stack
                .lookup(&struct_name)
                .ok_or_else(|| CompileError::resolution(format!("undefined struct '{struct_name}'")))?;
            let member = struct_sym
                .find_member(member_name)
                .ok_or_else(|| CompileError::resolution(format!("'{struct_name}' has no member '{member_name}'")))?;
            Ok(member.ty.clone())
        }
    }
}

/// Resolves a call's callee expression to the `Symbol` that supplies its signature: the global/
/// local function table for a plain call, or the receiver's struct type for a member call.
fn resolve_callee_symbol(callee: &Expr, stack: &ScopeStack) -> Result<Symbol, CompileError> {
    match callee {
        Expr::VariableUse { name, .. } => {
            let sym = stack.lookup(name).ok_or_else(|| CompileError::resolution(format!("undefined name '{name}'")))?;
            if sym.kind != SymbolKind::Function {
                return Err(CompileError::resolution(format!("'{name}' is not callable")));
            }
            Ok(sym.clone())
        }
        Expr::StructAccess { lhs, member_name } => {
            let struct_name = receiver_struct_name(lhs, stack)?;
            let struct_sym = stack
                .lookup(&struct_name)
                .ok_or_else(|| CompileError::resolution(format!("undefined struct '{struct_name}'")))?;
            let member = struct_sym
                .find_member(member_name)
                .ok_or_else(|| CompileError::resolution(format!("'{struct_name}' has no member '{member_name}'")))?;
            if member.kind != SymbolKind::Function {
                return Err(CompileError::resolution(format!("'{member_name}' is not a method of '{struct_name}'")));
            }
            Ok(member.clone())
        }
        _ => Err(CompileError::resolution("callee is not callable")),
    }
}

fn check_call_arity(func_sym: &Symbol, arg_count: usize) -> Result<(), CompileError> {
    if !func_sym.variadic && func_sym.visible_arity() != arg_count {
        return Err(CompileError::arity(format!(
            "'{}' expects {} argument(s), found {arg_count}",
            func_sym.name,
            func_sym.visible_arity()
        )));
    }
    Ok(())
}

fn receiver_struct_name(expr: &Expr, stack: &ScopeStack) -> Result<String, CompileError> {
    match expr {
        Expr::VariableUse { name, .. } => {
            let sym = stack.lookup(name).ok_or_else(|| CompileError::resolution(format!("undefined name '{name}'")))?;
            Ok(sym.ty.base_of().to_string())
        }
        Expr::StructAccess { member_name, .. } => Ok(member_name.clone()),
        _ => Err(CompileError::resolution("method receiver must be a named value")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse_program;

    fn bind(src: &str) -> Result<(), CompileError> {
        let mut stmts = parse_program(tokenize(src).unwrap()).unwrap();
        let global = summarize_file(&stmts)?;
        bind_file(&mut stmts, global)
    }

    #[test]
    fn rejects_undefined_name() {
        let err = bind("func main() { return missing; }").unwrap_err();
        assert!(matches!(err, CompileError::Resolution { .. }));
    }

    #[test]
    fn accepts_forward_reference_within_file() {
        bind("func helper() -> void { } func main() -> void { helper(); }").unwrap();
    }

    #[test]
    fn rejects_wrong_arity_call() {
        let err = bind("func add(a:int, b:int) -> int { return a + b; } func main() -> int { return add(1); }").unwrap_err();
        assert!(matches!(err, CompileError::Arity { .. }));
    }

    #[test]
    fn rejects_mismatched_binary_operand_types() {
        let err = bind(r#"func main() -> int { return 1 + "x"; }"#).unwrap_err();
        assert!(matches!(err, CompileError::Type { .. }));
    }

    #[test]
    fn rejects_mismatched_var_decl_initializer() {
        let err = bind(r#"func main() -> void { var s:string = 1; }"#).unwrap_err();
        assert!(matches!(err, CompileError::Type { .. }));
    }

    #[test]
    fn comparison_operators_yield_bool() {
        bind("func main() -> void { var ok:bool = 1 == 2; }").unwrap();
    }

    #[test]
    fn member_function_gets_implicit_this() {
        let mut stmts = parse_program(tokenize("P -> struct { x:int; func get() -> int { return 0; } }").unwrap()).unwrap();
        let global = summarize_file(&stmts).unwrap();
        bind_file(&mut stmts, global).unwrap();
        let Stmt::StructDecl(s) = &stmts[0] else { panic!() };
        assert_eq!(s.member_funcs[0].params[0].name, "this");
    }

    #[test]
    fn variable_redeclaration_in_same_scope_is_rejected() {
        let err = bind("func main() -> void { var x:int = 0; var x:int = 1; }").unwrap_err();
        assert!(matches!(err, CompileError::Resolution { .. }));
    }

    #[test]
    fn struct_ctor_arity_is_checked_against_ctor_not_field_count() {
        bind("P -> struct { x:int; y:int; func ctor(v:int) -> void { this->x = v; } } func main() -> void { var p:P = new P(7); }").unwrap();
    }
}
