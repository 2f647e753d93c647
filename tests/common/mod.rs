use std::collections::HashMap;

use inkwell::context::Context;
use occ::ast::statement::Stmt;
use occ::errors::CompileError;
use occ::symbols::{self, Symbol};
use occ::{binder, codegen, lexer, parser};

/// Runs one source file through lex -> parse -> summarize -> merge -> bind, stopping short of
/// codegen. Useful for tests that only care about binder-stage acceptance/rejection.
pub fn bind_one(source: &str) -> Result<Vec<Stmt>, CompileError> {
    let tokens = lexer::tokenize(source)?;
    let mut stmts = parser::parse_program(tokens)?;
    let summary = binder::summarize_file(&stmts)?;
    let global = symbols::merge_global_symbols(vec![summary]);
    binder::bind_file(&mut stmts, global)?;
    Ok(stmts)
}

/// Runs several source files through the same pipeline one `BuildSystem` would, sharing a single
/// merged global table across all of them before any file is bound.
pub fn bind_many(sources: &[&str]) -> Result<Vec<Vec<Stmt>>, CompileError> {
    let mut all_stmts = Vec::new();
    let mut summaries: Vec<HashMap<String, Symbol>> = Vec::new();
    for source in sources {
        let tokens = lexer::tokenize(source)?;
        let stmts = parser::parse_program(tokens)?;
        let summary = binder::summarize_file(&stmts)?;
        summaries.push(summary);
        all_stmts.push(stmts);
    }
    let global = symbols::merge_global_symbols(summaries);
    for stmts in &mut all_stmts {
        binder::bind_file(stmts, global.clone())?;
    }
    Ok(all_stmts)
}

/// Runs one source file all the way through to a lowered `inkwell` module and renders its IR,
/// for tests that need to inspect the generated code rather than just binder acceptance.
pub fn lower_one<'ctx>(context: &'ctx Context, module_name: &str, source: &str) -> Result<String, CompileError> {
    let tokens = lexer::tokenize(source)?;
    let mut stmts = parser::parse_program(tokens)?;
    let summary = binder::summarize_file(&stmts)?;
    let global = symbols::merge_global_symbols(vec![summary]);
    binder::bind_file(&mut stmts, global.clone())?;
    let ctx = codegen::lower_file(context, module_name, &global, &stmts)?;
    Ok(ctx.module.print_to_string().to_string())
}
