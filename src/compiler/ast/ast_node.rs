use super::datatype::{ExpType, MemSpace};
use super::literals::Literal;
use super::operators::{AssignOp, Operation};

/// Stable handle to a node inside the `Ast` arena.
///
/// Handles are plain indices; they stay valid for the life of the tree and
/// are what the symbol table stores, so the arena remains the single owner
/// of every node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub(super) fn new(index: usize) -> Self {
        NodeId(index as u32)
    }

    pub(super) fn index(self) -> usize {
        self.0 as usize
    }
}

/// What a node is, together with the payload only that form carries.
///
/// # Example:
///     int x: 5;
///     ^^^^^^^^ -> Var { name: "x" } with a Const(Int(5)) initializer child
///
///     if a < b then output(a);
///     ^^ -> If, with an Op(Less) test child and the body as second child
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Variable declaration. Children: optional initializer.
    Var { name: String },

    /// Function declaration. Children: parameter chain, body compound.
    Func { name: String },

    /// Parameter declaration. No children.
    Parm { name: String },

    /// Compound statement. Children: local declaration chain, statement chain.
    Compound,

    /// Selection statement. Children: test, then-part, optional else-part.
    If,

    /// While loop. Children: test, body.
    While,

    /// For loop. Children: iterator variable, range, body.
    For,

    /// Iteration range of a for loop. Children: from, to, optional by.
    Range,

    /// Return statement. Children: optional value expression.
    Return,

    /// Break statement. No children.
    Break,

    /// Assignment operator. Children: target and value, or just the target
    /// for `++`/`--`.
    Assign(AssignOp),

    /// Expression operator. Children: one or two operands.
    Op(Operation),

    /// Identifier reference.
    Id { name: String },

    /// Function call. Children: argument chain.
    Call { name: String },

    /// Constant value.
    Const(Literal),
}

impl NodeKind {
    /// The symbol name, for the node forms that carry one.
    pub fn name(&self) -> Option<&str> {
        match self {
            NodeKind::Var { name }
            | NodeKind::Func { name }
            | NodeKind::Parm { name }
            | NodeKind::Id { name }
            | NodeKind::Call { name } => Some(name),
            _ => None,
        }
    }
}

/// One node of the abstract syntax tree.
///
/// The parser creates nodes; semantic analysis fills in `exp_type`,
/// `is_array`, the bookkeeping flags and the memory annotations. Children
/// are ordered slots, siblings form a right-linked list of statements,
/// parameters or arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    /// Source line of the first token of this construct.
    pub line: i32,

    pub children: [Option<NodeId>; 3],
    pub sibling: Option<NodeId>,

    pub exp_type: ExpType,
    pub is_array: bool,
    pub is_static: bool,
    /// Set on the implicit variable a for loop declares for its iterator.
    pub is_iter_var: bool,

    pub used: bool,
    pub inited: bool,
    pub init_warned: bool,
    pub returned: bool,

    /// Data words this entity occupies; for scope-carrying statements, the
    /// final frame size of the scope.
    pub size: i32,
    pub mem_space: MemSpace,
    /// Slot offset within the enclosing frame. Frames grow downward.
    pub foffset: i32,
}

impl Node {
    pub fn new(kind: NodeKind, line: i32, exp_type: ExpType) -> Self {
        Node {
            kind,
            line,
            children: [None; 3],
            sibling: None,
            exp_type,
            is_array: false,
            is_static: false,
            is_iter_var: false,
            used: false,
            inited: false,
            init_warned: false,
            returned: false,
            size: 0,
            mem_space: MemSpace::None,
            foffset: 0,
        }
    }

    /// The display text of the node, as it appears in diagnostics: the
    /// symbol name for declarations, identifiers and calls, the spelling
    /// for operators.
    pub fn text(&self) -> &str {
        match &self.kind {
            NodeKind::Var { name }
            | NodeKind::Func { name }
            | NodeKind::Parm { name }
            | NodeKind::Id { name }
            | NodeKind::Call { name } => name,
            NodeKind::Assign(op) => op.text(),
            NodeKind::Op(op) => op.text(),
            NodeKind::Const(Literal::Str(value)) => value,
            _ => "",
        }
    }

    pub fn is_func(&self) -> bool {
        matches!(self.kind, NodeKind::Func { .. })
    }

    pub fn is_parm(&self) -> bool {
        matches!(self.kind, NodeKind::Parm { .. })
    }
}
