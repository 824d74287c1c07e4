pub(super) mod ast_node;
pub(super) mod datatype;
pub(super) mod literals;
pub(super) mod operators;
pub(super) mod printer;


pub use self::{
    ast_node::{Node, NodeId, NodeKind},
    datatype::{ExpType, MemSpace},
    literals::Literal,
    operators::{AssignOp, Operation},
};

pub use self::printer::AstPrinter;

/// Intermediate representation of the compiler model.
///
/// The tree is stored as an arena: the `Ast` owns every `Node` and hands out
/// `NodeId` handles. The parser appends nodes as it reduces productions and
/// records the root; semantic analysis mutates nodes in place through their
/// handles, which is also how the symbol table refers back to declarations
/// without owning them.
pub struct Ast {
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl Ast {
    pub fn new() -> Self {
        Ast {
            nodes: vec![],
            root: None,
        }
    }

    /// Move a node into the arena, returning its handle.
    pub fn add(&mut self, node: Node) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn set_root(&mut self, root: Option<NodeId>) {
        self.root = root;
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn child(&self, id: NodeId, slot: usize) -> Option<NodeId> {
        self.node(id).children[slot]
    }

    pub fn sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).sibling
    }

    /// Append a node at the end of a sibling chain.
    pub fn add_sibling(&mut self, head: NodeId, sibling: NodeId) {
        let mut scout = head;
        while let Some(next) = self.node(scout).sibling {
            scout = next;
        }
        self.node_mut(scout).sibling = Some(sibling);
    }

    /// Iterate every node handle, in creation order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId::new)
    }

    /// Number of nodes in the arena, the built-in function entries included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Default for Ast {
    fn default() -> Self {
        Ast::new()
    }
}
