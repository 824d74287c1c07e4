use indexmap::IndexMap;
use log::debug;

use super::super::ast::{Ast, NodeId, NodeKind};
use super::super::ast::MemSpace;
use super::super::diagnostics::{Diagnostics, Tag};

/// One lexical scope: a named, insertion-ordered symbol map plus the offset
/// cursor for the frame slots handed out so far. The cursor starts at the
/// enclosing scope's position and decreases as declarations are added; its
/// final value is the scope's frame size.
pub struct Scope {
    name: String,
    symbols: IndexMap<String, NodeId>,
    current_offset: i32,
}

impl Scope {
    fn new(name: &str, start_offset: i32) -> Self {
        // A for statement reserves two slots for the loop's iterator state
        // before any of its own declarations land.
        let current_offset = if name == "for-stmt" {
            start_offset - 2
        } else {
            start_offset
        };

        Scope {
            name: String::from(name),
            symbols: IndexMap::new(),
            current_offset,
        }
    }

    pub fn scope_name(&self) -> &str {
        &self.name
    }

    /// Bind a symbol in this scope.
    /// Returns false if the name is already bound. On success the node is
    /// handed its frame offset, unless it is a function or a static (statics
    /// are placed in the global scope by the symbol table before this runs).
    fn insert(&mut self, ast: &mut Ast, sym: &str, node: NodeId) -> bool {
        if self.symbols.contains_key(sym) {
            debug!(
                "insert in \"{}\" the symbol \"{}\" but symbol already there!",
                self.name, sym
            );
            return false;
        }

        debug!("insert in \"{}\" the symbol \"{}\"", self.name, sym);
        self.symbols.insert(String::from(sym), node);
        if !ast.node(node).is_static && !ast.node(node).is_func() {
            self.allocate(ast, node);
        }
        true
    }

    fn lookup(&self, sym: &str) -> Option<NodeId> {
        self.symbols.get(sym).copied()
    }

    /// Apply an action to every symbol, in insertion order.
    pub fn apply_to_all<F: FnMut(&str, NodeId)>(&self, mut action: F) {
        for (sym, node) in &self.symbols {
            action(sym, *node);
        }
    }

    /// Hand out a frame slot. A non-parameter array gets one extra slot
    /// ahead of its elements to record the length, so its offset points at
    /// that length slot.
    fn allocate(&mut self, ast: &mut Ast, node: NodeId) {
        let node = ast.node_mut(node);
        node.foffset = if node.is_array && !node.is_parm() {
            self.current_offset - 1
        } else {
            self.current_offset
        };
        self.current_offset -= node.size;
    }

    fn current_offset(&self) -> i32 {
        self.current_offset
    }

    /// Warn about every symbol that was never referenced. `main` and the
    /// built-in I/O functions are exempt.
    fn check_for_unused(&self, ast: &Ast, diagnostics: &mut Diagnostics) {
        for (_, id) in &self.symbols {
            let node = ast.node(*id);
            if !node.used && !Self::is_required_func(ast, *id) {
                let kind = match node.kind {
                    NodeKind::Var { .. } => "variable",
                    NodeKind::Func { .. } => "function",
                    NodeKind::Parm { .. } => "parameter",
                    _ => "unknown symbol",
                };
                diagnostics.warning(
                    node.line,
                    format!("The {} '{}' seems not to be used.", kind, node.text()),
                );
            }
        }
    }

    /// Whether a node is a function whose symbol is either main or one of
    /// the built-in functions.
    fn is_required_func(ast: &Ast, id: NodeId) -> bool {
        let node = ast.node(id);
        node.is_func()
            && matches!(
                node.text(),
                "main" | "output" | "outputb" | "outputc" | "input" | "inputb" | "inputc"
                    | "outnl"
            )
    }
}

/// The symbol table is a stack of scopes. The bottom scope is the global
/// scope and is pushed at construction; it cannot be left. Entries borrow
/// tree nodes by handle; the tree outlives the table.
pub struct SymbolTable {
    stack: Vec<Scope>,
}

impl SymbolTable {
    pub fn new() -> Self {
        let mut table = SymbolTable { stack: vec![] };
        table.enter("Global");
        table
    }

    /// Number of live scopes.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Push a new scope starting at the enclosing scope's current cursor.
    pub fn enter(&mut self, name: &str) {
        debug!("enter scope \"{}\"", name);
        let start_offset = match self.stack.last() {
            Some(scope) => scope.current_offset(),
            None => 0,
        };
        self.stack.push(Scope::new(name, start_offset));
    }

    /// Push a function scope. The first two slots of every function frame
    /// are reserved for the return address and the saved frame pointer, so
    /// the cursor starts at -2.
    pub fn enter_func(&mut self, name: &str) {
        debug!("enter function scope \"{}\"", name);
        self.stack.push(Scope::new(name, -2));
    }

    /// Audit the top scope for unused symbols, then pop it. Leaving the
    /// global scope is an internal error.
    pub fn leave(&mut self, ast: &Ast, diagnostics: &mut Diagnostics) {
        debug!(
            "leave scope \"{}\"",
            self.stack.last().map(Scope::scope_name).unwrap_or("")
        );
        if self.stack.len() > 1 {
            self.stack
                .last()
                .unwrap()
                .check_for_unused(ast, diagnostics);
            self.stack.pop();
        } else {
            diagnostics.internal(
                Tag::SymbolTable,
                format!(
                    "You cannot leave global scope.  Number of scopes: {}.",
                    self.stack.len()
                ),
            );
        }
    }

    /// Look a symbol up anywhere on the stack, innermost scope first.
    pub fn lookup(&self, sym: &str) -> Option<NodeId> {
        for scope in self.stack.iter().rev() {
            if let Some(node) = scope.lookup(sym) {
                debug!(
                    "lookup the symbol \"{}\" and found it in the scope named \"{}\"",
                    sym,
                    scope.scope_name()
                );
                return Some(node);
            }
        }
        debug!("lookup the symbol \"{}\" and did NOT find it!", sym);
        None
    }

    /// Look a symbol up in the top scope only.
    pub fn lookup_local(&self, sym: &str) -> Option<NodeId> {
        self.stack.last().and_then(|scope| scope.lookup(sym))
    }

    /// Look a symbol up in the current function's parameter scope, the scope
    /// immediately beneath the top. Answers nothing unless the top scope is
    /// the function body or a for statement directly under it, and never for
    /// iterator variables.
    pub fn lookup_parm(&self, sym: &str, is_iter_var: bool) -> Option<NodeId> {
        let index = self.stack.len() as i32 - 2;
        if index < 1
            || is_iter_var
            || (index != 1 && self.stack[index as usize].scope_name() != "for-stmt")
        {
            return None;
        }

        self.stack[index as usize].lookup(sym)
    }

    /// Look a symbol up in the global scope only.
    pub fn lookup_global(&self, sym: &str) -> Option<NodeId> {
        self.stack[0].lookup(sym)
    }

    /// Bind a symbol in the top scope. A static variable gets its storage
    /// allocated in the global scope first, whatever the insert outcome.
    /// Returns whether the name was fresh in the top scope.
    pub fn insert(&mut self, ast: &mut Ast, sym: &str, node: NodeId) -> bool {
        if ast.node(node).is_static {
            self.stack[0].allocate(ast, node);
        }

        self.stack.last_mut().unwrap().insert(ast, sym, node)
    }

    /// Bind a symbol in the global scope.
    pub fn insert_global(&mut self, ast: &mut Ast, sym: &str, node: NodeId) -> bool {
        debug!("insert the global symbol \"{}\"", sym);
        self.stack[0].insert(ast, sym, node)
    }

    /// Apply an action to every symbol of the top scope.
    pub fn apply_to_all<F: FnMut(&str, NodeId)>(&self, action: F) {
        self.stack.last().unwrap().apply_to_all(action);
    }

    /// Apply an action to every symbol of the global scope.
    pub fn apply_to_all_global<F: FnMut(&str, NodeId)>(&self, action: F) {
        self.stack[0].apply_to_all(action);
    }

    /// Whether any scope on the stack belongs to a while or for statement.
    pub fn in_loop(&self) -> bool {
        self.stack.iter().rev().any(|scope| {
            matches!(
                scope.scope_name(),
                "while-stmt" | "while-cmpd-stmt" | "for-stmt" | "for-cmpd-stmt"
            )
        })
    }

    /// Audit the global scope for unused symbols.
    pub fn check_global_unused(&self, ast: &Ast, diagnostics: &mut Diagnostics) {
        self.stack[0].check_for_unused(ast, diagnostics);
    }

    /// Current cursor of the top scope.
    pub fn current_frame_size(&self) -> i32 {
        self.stack.last().unwrap().current_offset()
    }

    /// Allocate a string constant in global space.
    pub fn alloc_string(&mut self, ast: &mut Ast, node: NodeId) {
        ast.node_mut(node).mem_space = MemSpace::Global;
        self.stack[0].allocate(ast, node);
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        SymbolTable::new()
    }
}
