use enum_assoc::Assoc;

/// Assignment operators hang off `NodeKind::Assign` nodes.
///
/// `Increment` and `Decrement` are unary (one child, the target); the rest
/// are binary with the target on the left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Assoc)]
#[func(pub const fn text(&self) -> &'static str)]
pub enum AssignOp {
    #[assoc(text = "=")]
    Assign,
    #[assoc(text = "+=")]
    AddAssign,
    #[assoc(text = "-=")]
    SubAssign,
    #[assoc(text = "*=")]
    MulAssign,
    #[assoc(text = "/=")]
    DivAssign,
    #[assoc(text = "++")]
    Increment,
    #[assoc(text = "--")]
    Decrement,
}

impl AssignOp {
    /// The compound arithmetic assignments; these require int operands on
    /// both sides, unlike plain `=` which only requires agreement.
    pub fn is_math(&self) -> bool {
        matches!(
            self,
            AssignOp::AddAssign | AssignOp::SubAssign | AssignOp::MulAssign | AssignOp::DivAssign
        )
    }
}

/// Expression operators hang off `NodeKind::Op` nodes.
///
/// `SizeOf` shares the `*` spelling with `Mul`, and `Negate` shares `-`
/// with `Sub`; consumers must dispatch on the variant, never on the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Assoc)]
#[func(pub const fn text(&self) -> &'static str)]
pub enum Operation {
    #[assoc(text = "or")]
    Or,
    #[assoc(text = "and")]
    And,
    #[assoc(text = "not")]
    Not,
    #[assoc(text = "<")]
    Less,
    #[assoc(text = "<=")]
    LessEqual,
    #[assoc(text = ">")]
    Greater,
    #[assoc(text = ">=")]
    GreaterEqual,
    #[assoc(text = "==")]
    Equal,
    #[assoc(text = "!=")]
    NotEqual,
    #[assoc(text = "+")]
    Add,
    #[assoc(text = "-")]
    Sub,
    #[assoc(text = "*")]
    Mul,
    #[assoc(text = "/")]
    Div,
    #[assoc(text = "%")]
    Mod,
    #[assoc(text = "-")]
    Negate,
    #[assoc(text = "*")]
    SizeOf,
    #[assoc(text = "?")]
    Random,
    #[assoc(text = "[")]
    Index,
}

impl Operation {
    pub fn is_logical(&self) -> bool {
        matches!(self, Operation::Or | Operation::And | Operation::Not)
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Operation::Less
                | Operation::LessEqual
                | Operation::Greater
                | Operation::GreaterEqual
                | Operation::Equal
                | Operation::NotEqual
        )
    }

    pub fn is_math(&self) -> bool {
        matches!(
            self,
            Operation::Add
                | Operation::Sub
                | Operation::Mul
                | Operation::Div
                | Operation::Mod
                | Operation::Negate
        )
    }
}
