use crate::ast::expression::Expr;
use crate::types::Type;

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub ty: Type,
    pub name: String,
}

/// A function declaration or definition.
///
/// `is_struct_member_resolved` tracks whether the binder has already appended the implicit
/// `this` parameter; it must only happen once.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    pub name: String,
    pub ret_type: Type,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
    pub is_extern: bool,
    pub is_struct_member_resolved: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructDecl {
    pub name: String,
    pub fields: Vec<Param>,
    pub member_funcs: Vec<FuncDecl>,
}

/// A statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    FuncDecl(FuncDecl),
    StructDecl(StructDecl),
    VarDecl {
        name: String,
        ty: Type,
        init: Option<Expr>,
    },
    /// `const` is recognised by the parser but always rejected at lowering time.
    ConstDecl {
        name: String,
        ty: Type,
        init: Expr,
    },
    Assignment {
        lhs: Expr,
        rhs: Expr,
    },
    If {
        cond: Expr,
        then_branch: Vec<Stmt>,
        else_branch: Vec<Stmt>,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
    },
    Return {
        value: Option<Expr>,
    },
    Expression(Expr),
    Use {
        name: String,
    },
    PackageDecl {
        name: String,
    },
}
