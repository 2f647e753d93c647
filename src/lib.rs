//! `occ` - the front-to-middle pipeline of an ahead-of-time compiler: a recursive-descent
//! parser, a two-pass semantic binder, and an IR lowering engine targeting native object files
//! through LLVM, plus the build driver and CLI that drive them over a whole project.

pub mod ast;
pub mod binder;
pub mod build;
pub mod codegen;
pub mod errors;
pub mod lexer;
pub mod parser;
pub mod project;
pub mod symbols;
pub mod types;
