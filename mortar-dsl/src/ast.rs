use crate::diagnostics::Location;

/// Root of a parsed build-definition file. The lexer and parser live outside
/// this workspace; they hand the interpreter one of these per file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CodeBlock {
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Assignment(AssignmentNode),
    PlusAssignment(PlusAssignmentNode),
    Expression(ExpressionStmt),
    If(IfClauseNode),
    Foreach(ForeachNode),
    Break(BreakNode),
    Continue(ContinueNode),
}

impl Stmt {
    pub fn location(&self) -> &Location {
        match self {
            Stmt::Assignment(node) => &node.location,
            Stmt::PlusAssignment(node) => &node.location,
            Stmt::Expression(node) => node.expression.location(),
            Stmt::If(node) => &node.location,
            Stmt::Foreach(node) => &node.location,
            Stmt::Break(node) => &node.location,
            Stmt::Continue(node) => &node.location,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentNode {
    pub name: String,
    pub value: Expr,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlusAssignmentNode {
    pub name: String,
    pub value: Expr,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionStmt {
    pub expression: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfClauseNode {
    pub clauses: Vec<IfNode>,
    pub else_block: Option<CodeBlock>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfNode {
    pub condition: Expr,
    pub block: CodeBlock,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForeachNode {
    pub varnames: Vec<String>,
    pub items: Expr,
    pub block: CodeBlock,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BreakNode {
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContinueNode {
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Id(IdNode),
    Str(StringNode),
    FormatStr(FormatStringNode),
    Number(NumberNode),
    Boolean(BooleanNode),
    Array(ArrayNode),
    Dict(DictNode),
    Arithmetic(ArithmeticNode),
    Comparison(ComparisonNode),
    And(AndNode),
    Or(OrNode),
    Not(NotNode),
    UMinus(UMinusNode),
    Ternary(TernaryNode),
    Index(IndexNode),
    MethodCall(MethodCallNode),
    FunctionCall(FunctionCallNode),
}

impl Expr {
    pub fn location(&self) -> &Location {
        match self {
            Expr::Id(node) => &node.location,
            Expr::Str(node) => &node.location,
            Expr::FormatStr(node) => &node.location,
            Expr::Number(node) => &node.location,
            Expr::Boolean(node) => &node.location,
            Expr::Array(node) => &node.location,
            Expr::Dict(node) => &node.location,
            Expr::Arithmetic(node) => &node.location,
            Expr::Comparison(node) => &node.location,
            Expr::And(node) => &node.location,
            Expr::Or(node) => &node.location,
            Expr::Not(node) => &node.location,
            Expr::UMinus(node) => &node.location,
            Expr::Ternary(node) => &node.location,
            Expr::Index(node) => &node.location,
            Expr::MethodCall(node) => &node.location,
            Expr::FunctionCall(node) => &node.location,
        }
    }

    /// Source text of the expression as the parser saw it, if it recorded
    /// any. `assert()` uses this to reconstruct a message when none is given.
    pub fn as_source_text(&self) -> Option<&str> {
        match self {
            Expr::Id(node) => Some(&node.name),
            Expr::Comparison(node) => node.source_text.as_deref(),
            Expr::FunctionCall(node) => node.source_text.as_deref(),
            Expr::MethodCall(node) => node.source_text.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IdNode {
    pub name: String,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StringNode {
    pub value: String,
    pub location: Location,
}

/// An f-string literal: `f'@var@ suffix'`. Substitution happens against the
/// variable environment at evaluation time.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatStringNode {
    pub value: String,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumberNode {
    pub value: i64,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BooleanNode {
    pub value: bool,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayNode {
    pub args: ArgumentNode,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DictNode {
    pub args: ArgumentNode,
    pub location: Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl ArithmeticOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Sub => "-",
            ArithmeticOp::Mul => "*",
            ArithmeticOp::Div => "/",
            ArithmeticOp::Mod => "%",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArithmeticNode {
    pub op: ArithmeticOp,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
    pub location: Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    In,
    NotIn,
}

impl ComparisonOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ComparisonOp::Eq => "==",
            ComparisonOp::NotEq => "!=",
            ComparisonOp::Lt => "<",
            ComparisonOp::LtEq => "<=",
            ComparisonOp::Gt => ">",
            ComparisonOp::GtEq => ">=",
            ComparisonOp::In => "in",
            ComparisonOp::NotIn => "not in",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonNode {
    pub op: ComparisonOp,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
    pub source_text: Option<String>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AndNode {
    pub left: Box<Expr>,
    pub right: Box<Expr>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrNode {
    pub left: Box<Expr>,
    pub right: Box<Expr>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotNode {
    pub expression: Box<Expr>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UMinusNode {
    pub expression: Box<Expr>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TernaryNode {
    pub condition: Box<Expr>,
    pub if_true: Box<Expr>,
    pub if_false: Box<Expr>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexNode {
    pub object: Box<Expr>,
    pub index: Box<Expr>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodCallNode {
    pub object: Box<Expr>,
    pub name: String,
    pub args: ArgumentNode,
    pub source_text: Option<String>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCallNode {
    pub name: String,
    pub args: ArgumentNode,
    pub source_text: Option<String>,
    pub location: Location,
}

/// Positional and keyword arguments of a call, in source order. Dict literals
/// reuse the keyword half with arbitrary expression keys evaluated to strings.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ArgumentNode {
    pub positional: Vec<Expr>,
    pub keywords: Vec<KeywordPair>,
    pub location: Location,
}

impl ArgumentNode {
    pub fn empty(location: Location) -> Self {
        Self {
            positional: Vec::new(),
            keywords: Vec::new(),
            location,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeywordPair {
    pub name: Expr,
    pub value: Expr,
    pub location: Location,
}
