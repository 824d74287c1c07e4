use strum_macros::Display;

/// Expression types attached to every node of the tree.
///
/// `Undefined` is the sentinel for nodes whose type could not be inferred
/// because of an earlier error. A child typed `Undefined` suppresses
/// secondary diagnostics on its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ExpType {
    #[strum(serialize = "void")]
    Void,
    #[strum(serialize = "int")]
    Int,
    #[strum(serialize = "bool")]
    Bool,
    #[strum(serialize = "char")]
    Char,
    #[strum(serialize = "undefined type")]
    Undefined,
}

/// The kind of place in memory where an entity will live at run time.
///
/// `None` marks nodes that have not been through semantic analysis or that
/// carry no storage of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum MemSpace {
    Global,
    #[strum(serialize = "LocalStatic")]
    Static,
    Parameter,
    Local,
    None,
}
