use super::{Ast, Literal, Node, NodeId, NodeKind};

/// Renders the tree in the fixed textual layout the tooling expects:
/// one node per line, `".   "` per indent level, a `Child`/`Sibling`
/// relation label with its index, the kind payload, then the optional type
/// and memory annotations and the source line. Children print before the
/// sibling chain.
pub struct AstPrinter {
    types: bool,
    mem: bool,
}

impl AstPrinter {
    /// The `-p` form: structure only, no annotations.
    pub fn plain() -> Self {
        AstPrinter {
            types: false,
            mem: false,
        }
    }

    /// The `-P` form: structure plus inferred types.
    pub fn typed() -> Self {
        AstPrinter {
            types: true,
            mem: false,
        }
    }

    /// The `-M` form: structure, types and memory annotations.
    pub fn with_memory() -> Self {
        AstPrinter {
            types: true,
            mem: true,
        }
    }

    pub fn print(&self, ast: &Ast) -> String {
        let mut out = String::new();
        if let Some(root) = ast.root() {
            self.print_node(ast, root, 0, "", -1, 0, &mut out);
        }
        out
    }

    fn print_node(
        &self,
        ast: &Ast,
        id: NodeId,
        level: usize,
        relation: &str,
        child_num: i32,
        sib_num: i32,
        out: &mut String,
    ) {
        let node = ast.node(id);

        for _ in 0..level {
            out.push_str(".   ");
        }

        // Relation to the parent; the root carries neither label nor index.
        out.push_str(relation);
        if child_num > -1 {
            out.push_str(&format!(": {} ", child_num));
        } else if sib_num > 0 {
            out.push_str(&format!(": {} ", sib_num));
        }

        match &node.kind {
            NodeKind::Var { name } => {
                out.push_str(&format!("Var: {}", name));
                self.push_type(node, out);
                self.push_mem(node, out);
            }
            NodeKind::Func { name } => {
                out.push_str(&format!("Func: {} returns type {}", name, node.exp_type));
                self.push_mem(node, out);
            }
            NodeKind::Parm { name } => {
                out.push_str(&format!("Parm: {}", name));
                self.push_type(node, out);
                self.push_mem(node, out);
            }
            NodeKind::If => {
                out.push_str("If");
            }
            NodeKind::Compound => {
                out.push_str("Compound");
                self.push_mem(node, out);
            }
            NodeKind::While => {
                out.push_str("While");
            }
            NodeKind::For => {
                out.push_str("For");
                self.push_mem(node, out);
            }
            NodeKind::Range => {
                out.push_str("Range");
            }
            NodeKind::Return => {
                out.push_str("Return");
            }
            NodeKind::Break => {
                out.push_str("Break");
            }
            NodeKind::Assign(op) => {
                out.push_str(&format!("Assign: {}", op.text()));
                self.push_type(node, out);
            }
            NodeKind::Op(op) => {
                out.push_str(&format!("Op: {}", op.text()));
                self.push_type(node, out);
            }
            NodeKind::Id { name } => {
                out.push_str(&format!("Id: {}", name));
                self.push_type(node, out);
                self.push_mem(node, out);
            }
            NodeKind::Call { name } => {
                out.push_str(&format!("Call: {}", name));
                self.push_type(node, out);
            }
            NodeKind::Const(literal) => {
                out.push_str("Const ");
                match literal {
                    Literal::Int(value) => out.push_str(&format!("{}", value)),
                    Literal::Char(value) => out.push_str(&format!("'{}'", value)),
                    Literal::Bool(value) => {
                        out.push_str(if *value { "true" } else { "false" })
                    }
                    Literal::Str(value) => out.push_str(&format!("\"{}\"", value)),
                }
                self.push_type(node, out);
                // Strings are the one constant with storage of their own.
                if node.is_array {
                    self.push_mem(node, out);
                }
            }
        }

        out.push_str(&format!(" [line: {}]\n", node.line));

        for (slot, child) in node.children.iter().enumerate() {
            if let Some(child) = *child {
                self.print_node(ast, child, level + 1, "Child", slot as i32, 0, out);
            }
        }

        if let Some(sibling) = node.sibling {
            self.print_node(ast, sibling, level, "Sibling", -1, sib_num + 1, out);
        }
    }

    fn push_type(&self, node: &Node, out: &mut String) {
        if self.types {
            out.push_str(" of ");
            if node.is_static {
                out.push_str("static ");
            }
            if node.is_array {
                out.push_str("array of ");
            }
            out.push_str(&format!("type {}", node.exp_type));
        }
    }

    fn push_mem(&self, node: &Node, out: &mut String) {
        if self.mem {
            out.push_str(&format!(
                " [mem: {} loc: {} size: {}]",
                node.mem_space, node.foffset, node.size
            ));
        }
    }
}
