//! Expressions carried by operators.
//!
//! The coordinator never evaluates these; it only copies them between
//! operators, builds references by name and renders them.

use std::fmt;

use serde::{Deserialize, Serialize};

use qcoord_core::schema::{DataType, Schema};
use qcoord_core::types::Scalar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    And,
    Or,
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

impl BinaryOp {
    pub fn is_relational(self) -> bool {
        use BinaryOp::*;
        matches!(
            self,
            And | Or | Equal | NotEqual | Less | LessOrEqual | Greater | GreaterOrEqual
        )
    }

    pub fn symbol(self) -> &'static str {
        use BinaryOp::*;
        match self {
            Plus => "+",
            Minus => "-",
            Multiply => "*",
            Divide => "/",
            Modulo => "%",
            And => "AND",
            Or => "OR",
            Equal => "=",
            NotEqual => "!=",
            Less => "<",
            LessOrEqual => "<=",
            Greater => ">",
            GreaterOrEqual => ">=",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Literal(Scalar),
    /// Column of the source operator's output, by name.
    Reference(String),
    Function {
        name: String,
        args: Vec<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

impl Expr {
    pub fn reference(name: impl Into<String>) -> Self {
        Expr::Reference(name.into())
    }

    pub fn literal(value: impl Into<Scalar>) -> Self {
        Expr::Literal(value.into())
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Function {
            name: name.into(),
            args,
        }
    }

    pub fn is_reference_to(&self, column: &str) -> bool {
        matches!(self, Expr::Reference(name) if name == column)
    }

    /// Best-effort static type against `schema`. Function results take the
    /// type of their first argument.
    pub fn infer_type(&self, schema: &Schema) -> Option<DataType> {
        match self {
            Expr::Literal(v) => v.data_type(),
            Expr::Reference(name) => schema.field_by_name(name).map(|f| f.data_type),
            Expr::Function { args, .. } => args.first().and_then(|a| a.infer_type(schema)),
            Expr::Binary { op, lhs, rhs } => {
                if op.is_relational() {
                    Some(DataType::Boolean)
                } else {
                    lhs.infer_type(schema).or_else(|| rhs.infer_type(schema))
                }
            }
        }
    }

    /// Whether the value may be null; only plain references are known not to be.
    pub fn is_nullable(&self, schema: &Schema) -> bool {
        match self {
            Expr::Reference(name) => schema.field_by_name(name).map_or(true, |f| f.nullable),
            Expr::Literal(Scalar::Null) => true,
            Expr::Literal(_) => false,
            _ => true,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(v) => write!(f, "{v}"),
            Expr::Reference(name) => f.write_str(name),
            Expr::Function { name, args } => {
                write!(f, "{name}(")?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{a}")?;
                }
                f.write_str(")")
            }
            Expr::Binary { op, lhs, rhs } => write!(f, "({lhs} {} {rhs})", op.symbol()),
        }
    }
}

/// Expression with an output name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedExpr {
    pub expr: Expr,
    pub name: String,
}

impl NamedExpr {
    pub fn new(expr: Expr, name: impl Into<String>) -> Self {
        Self {
            expr,
            name: name.into(),
        }
    }

    /// `name := name`
    pub fn identity(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            expr: Expr::Reference(name.clone()),
            name,
        }
    }
}

/// Decomposable aggregates: reducing partial results with the same function
/// yields the final result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregateFunction {
    Sum,
    Min,
    Max,
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AggregateFunction::Sum => "sum",
            AggregateFunction::Min => "min",
            AggregateFunction::Max => "max",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateItem {
    pub expr: Expr,
    pub function: AggregateFunction,
    pub name: String,
}

impl AggregateItem {
    pub fn new(expr: Expr, function: AggregateFunction, name: impl Into<String>) -> Self {
        Self {
            expr,
            function,
            name: name.into(),
        }
    }

    /// Final-phase item: reduce the partial column `name` with the same function.
    pub fn finalizer(&self) -> Self {
        Self {
            expr: Expr::Reference(self.name.clone()),
            function: self.function,
            name: self.name.clone(),
        }
    }
}
