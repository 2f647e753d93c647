//! The abstract syntax tree.
//!
//! A tagged tree of expressions and statements with owned children: every child is owned
//! exclusively by its parent, cloning is explicit and deep.

pub mod expression;
pub mod statement;

pub use expression::{BinaryOp, Expr, PostfixOp};
pub use statement::{FuncDecl, Param, Stmt, StructDecl};
