#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Neq,
    And,
    Or,
    // Parsed (precedence row exists for it) but not lowered.
    Xor,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    AndAssign,
    OrAssign,
    XorAssign,
}

impl BinaryOp {
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge | BinaryOp::Eq | BinaryOp::Neq
        )
    }

    pub fn from_lexeme(lexeme: &str) -> Option<BinaryOp> {
        Some(match lexeme {
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "<" => BinaryOp::Lt,
            ">" => BinaryOp::Gt,
            "<=" => BinaryOp::Le,
            ">=" => BinaryOp::Ge,
            "==" => BinaryOp::Eq,
            "!=" => BinaryOp::Neq,
            "&&" => BinaryOp::And,
            "||" => BinaryOp::Or,
            "^" => BinaryOp::Xor,
            "+=" => BinaryOp::AddAssign,
            "-=" => BinaryOp::SubAssign,
            "*=" => BinaryOp::MulAssign,
            "/=" => BinaryOp::DivAssign,
            "%=" => BinaryOp::ModAssign,
            "&=" => BinaryOp::AndAssign,
            "|=" => BinaryOp::OrAssign,
            "^=" => BinaryOp::XorAssign,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostfixOp {
    Increment,
    Decrement,
}

/// A value-producing construct.
///
/// `is_func_resolved` and `is_member_call_resolved` are annotation fields: the parser leaves
/// them `false`, and the binder is the only stage allowed to set them.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    IntLiteral(i32),
    StringLiteral(String),
    VariableUse {
        name: String,
        is_func_resolved: bool,
    },
    Binary {
        lhs: Box<Expr>,
        op: BinaryOp,
        rhs: Box<Expr>,
    },
    Postfix {
        operand: Box<Expr>,
        op: PostfixOp,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        is_member_call_resolved: bool,
    },
    StructCtor {
        type_name: String,
        args: Vec<Expr>,
    },
    StructAccess {
        lhs: Box<Expr>,
        member_name: String,
    },
}

impl Expr {
    pub fn variable_use(name: impl Into<String>) -> Expr {
        Expr::VariableUse { name: name.into(), is_func_resolved: false }
    }

    pub fn call(callee: Expr, args: Vec<Expr>) -> Expr {
        Expr::Call { callee: Box::new(callee), args, is_member_call_resolved: false }
    }
}
