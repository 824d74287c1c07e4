use super::super::ast::{
    Ast, AssignOp, ExpType, MemSpace, Node, NodeId, NodeKind, Operation,
};
use super::super::diagnostics::{Diagnostics, Tag};
use super::symbol_table::SymbolTable;
use super::SemanticAnalyser;

/// The two values the walk carries downward: a scope-name suggestion for the
/// next compound statement (so function and loop bodies do not open a second
/// anonymous scope) and whether identifier references should warn about
/// possibly-uninitialized use (assignments turn this off on their target).
struct WalkContext {
    scope_name: String,
    check_init: bool,
}

impl WalkContext {
    fn bare() -> Self {
        WalkContext {
            scope_name: String::new(),
            check_init: true,
        }
    }

    fn named(scope_name: &str) -> Self {
        WalkContext {
            scope_name: String::from(scope_name),
            check_init: true,
        }
    }

    fn no_init() -> Self {
        WalkContext {
            scope_name: String::new(),
            check_init: false,
        }
    }
}

/// CMinusSemanticAnalyser is a concrete SemanticAnalyser.
///
/// It performs the whole semantic pass in a single recursion over the tree:
/// scope management and offset assignment through the symbol table,
/// identifier resolution, type checking, control-flow checks and the final
/// program-level audits (a well-formed `main`, unused global symbols).
pub struct CMinusSemanticAnalyser {
    symbol_table: SymbolTable,
    current_func: Option<NodeId>,
}

impl SemanticAnalyser for CMinusSemanticAnalyser {
    fn default() -> Self {
        Self {
            symbol_table: SymbolTable::new(),
            current_func: None,
        }
    }

    fn analyse(mut self, ast: &mut Ast, diagnostics: &mut Diagnostics) -> i32 {
        self.add_built_in_funcs(ast);

        if let Some(root) = ast.root() {
            self.analyse_node(ast, root, &WalkContext::bare(), diagnostics);
        }

        // The program must define a parameterless function named main.
        let well_formed_main = match self.symbol_table.lookup("main") {
            Some(main) => {
                let main = ast.node(main);
                main.is_func() && main.children[0].is_none()
            }
            None => false,
        };
        if !well_formed_main {
            diagnostics.linker_error(String::from(
                "A function named 'main' with no parameters must be defined.",
            ));
        }

        self.symbol_table.check_global_unused(ast, diagnostics);
        self.symbol_table.current_frame_size()
    }
}

/// Built-in function seeding. The I/O routines exist in every program's
/// global scope before the user's declarations are processed; they carry
/// line -1 and are exempt from the unused-symbol audit.
impl CMinusSemanticAnalyser {
    fn add_built_in_funcs(&mut self, ast: &mut Ast) {
        self.add_output_func(ast, "output", ExpType::Int);
        self.add_output_func(ast, "outputb", ExpType::Bool);
        self.add_output_func(ast, "outputc", ExpType::Char);

        self.add_input_func(ast, "input", ExpType::Int);
        self.add_input_func(ast, "inputb", ExpType::Bool);
        self.add_input_func(ast, "inputc", ExpType::Char);

        let outnl = ast.add(Node::new(
            NodeKind::Func {
                name: String::from("outnl"),
            },
            -1,
            ExpType::Void,
        ));
        self.symbol_table.insert_global(ast, "outnl", outnl);
    }

    /// An output function takes one parameter of the given type and returns
    /// nothing.
    fn add_output_func(&mut self, ast: &mut Ast, name: &str, parm_type: ExpType) {
        let dummy = ast.add(Node::new(
            NodeKind::Parm {
                name: String::from("*dummy*"),
            },
            -1,
            parm_type,
        ));

        let mut func = Node::new(
            NodeKind::Func {
                name: String::from(name),
            },
            -1,
            ExpType::Void,
        );
        func.children[0] = Some(dummy);
        let func = ast.add(func);

        self.symbol_table.insert_global(ast, name, func);
    }

    /// An input function takes no parameters and returns the given type.
    fn add_input_func(&mut self, ast: &mut Ast, name: &str, return_type: ExpType) {
        let func = ast.add(Node::new(
            NodeKind::Func {
                name: String::from(name),
            },
            -1,
            return_type,
        ));

        self.symbol_table.insert_global(ast, name, func);
    }
}

/// Traversal plumbing. Children are visited in slot order, then the sibling
/// chain; the context decides scope naming and init checking for each hop.
impl CMinusSemanticAnalyser {
    fn analyse_node(
        &mut self,
        ast: &mut Ast,
        id: NodeId,
        ctx: &WalkContext,
        diagnostics: &mut Diagnostics,
    ) {
        let kind = ast.node(id).kind.clone();
        match kind {
            NodeKind::Func { .. } => self.analyse_func_decl(ast, id, diagnostics),
            NodeKind::Compound => self.analyse_compound(ast, id, &ctx.scope_name, diagnostics),
            NodeKind::If | NodeKind::While => self.analyse_if_while(ast, id, diagnostics),
            NodeKind::For => self.analyse_for(ast, id, diagnostics),
            NodeKind::Range => self.analyse_range(ast, id, diagnostics),
            NodeKind::Return => self.analyse_return(ast, id, diagnostics),
            NodeKind::Break => self.analyse_break(ast, id, diagnostics),
            NodeKind::Var { .. } => self.analyse_var_decl(ast, id, "", diagnostics),
            NodeKind::Parm { .. } => {
                let scope_name = ctx.scope_name.clone();
                self.analyse_var_decl(ast, id, &scope_name, diagnostics)
            }
            NodeKind::Call { .. } => self.analyse_call(ast, id, diagnostics),
            NodeKind::Id { .. } => self.analyse_id(ast, id, ctx.check_init, diagnostics),
            NodeKind::Const(_) => self.analyse_const(ast, id, diagnostics),
            NodeKind::Assign(op) => match op {
                AssignOp::Increment | AssignOp::Decrement => {
                    self.analyse_inc_op(ast, id, diagnostics)
                }
                AssignOp::Assign => self.analyse_assignment(ast, id, false, diagnostics),
                _ => self.analyse_assignment(ast, id, true, diagnostics),
            },
            NodeKind::Op(op) => match op {
                Operation::Not | Operation::Negate | Operation::Random => {
                    self.analyse_unary(ast, id, diagnostics)
                }
                Operation::SizeOf => self.analyse_sizeof(ast, id, diagnostics),
                Operation::Index => self.analyse_bracket(ast, id, ctx.check_init, diagnostics),
                op if op.is_comparison() => self.analyse_binary_op(ast, id, true, diagnostics),
                _ => self.analyse_binary_op(ast, id, false, diagnostics),
            },
        }
    }

    /// Visit every child with the given scope name and init checking on.
    fn walk_children(
        &mut self,
        ast: &mut Ast,
        id: NodeId,
        scope_name: &str,
        diagnostics: &mut Diagnostics,
    ) {
        for slot in 0..3 {
            if let Some(child) = ast.node(id).children[slot] {
                self.analyse_node(ast, child, &WalkContext::named(scope_name), diagnostics);
            }
        }
    }

    /// Visit every child, with init checking off for just one slot. Operand
    /// positions that define rather than read a variable go through here.
    fn walk_children_ignore_init(
        &mut self,
        ast: &mut Ast,
        id: NodeId,
        ignore_slot: usize,
        diagnostics: &mut Diagnostics,
    ) {
        for slot in 0..3 {
            if let Some(child) = ast.node(id).children[slot] {
                let ctx = if slot == ignore_slot {
                    WalkContext::no_init()
                } else {
                    WalkContext::bare()
                };
                self.analyse_node(ast, child, &ctx, diagnostics);
            }
        }
    }

    fn walk_sibling(
        &mut self,
        ast: &mut Ast,
        id: NodeId,
        scope_name: &str,
        diagnostics: &mut Diagnostics,
    ) {
        if let Some(sibling) = ast.node(id).sibling {
            self.analyse_node(ast, sibling, &WalkContext::named(scope_name), diagnostics);
        }
    }
}

/// Node handlers. Each one recurses into its children with the right
/// context, updates the symbol table, propagates types upward, emits
/// diagnostics and finally follows the sibling chain.
impl CMinusSemanticAnalyser {
    fn analyse_func_decl(&mut self, ast: &mut Ast, id: NodeId, diagnostics: &mut Diagnostics) {
        let name = ast.node(id).text().to_string();

        let dupe = self.symbol_table.lookup_local(&name);
        if !self.symbol_table.insert(ast, &name, id) {
            match dupe {
                Some(dupe) => self.report_already_declared(ast, id, dupe, diagnostics),
                None => diagnostics.internal(
                    Tag::SemanticAnalyzer,
                    String::from("duplicate node couldn't be found"),
                ),
            }
        }

        self.current_func = Some(id);
        self.symbol_table.enter_func(&name);
        let compound_name = format!("{}-cmpd-stmt", name);
        self.walk_children(ast, id, &compound_name, diagnostics);

        // A non-void function must have hit a return statement somewhere.
        let (returned, exp_type, line) = {
            let node = ast.node(id);
            (node.returned, node.exp_type, node.line)
        };
        if !returned && exp_type != ExpType::Void {
            diagnostics.warning(
                line,
                format!(
                    "Expecting to return type {} but function '{}' has no return statement.",
                    exp_type, name
                ),
            );
        }

        // The frame to allocate at call time is the final cursor of the
        // body scope; the body compound recorded it before leaving.
        let size = match ast.node(id).children[1] {
            Some(body) => ast.node(body).size,
            None => self.symbol_table.current_frame_size(),
        };
        ast.node_mut(id).size = size;
        self.symbol_table.leave(ast, diagnostics);

        self.walk_sibling(ast, id, "", diagnostics);
    }

    fn analyse_compound(
        &mut self,
        ast: &mut Ast,
        id: NodeId,
        scope_name: &str,
        diagnostics: &mut Diagnostics,
    ) {
        // A carried name means this compound is the body of a function or
        // control statement that already decided the scope's identity.
        if scope_name.is_empty() {
            self.symbol_table.enter("compound-stmt");
        } else {
            self.symbol_table.enter(scope_name);
        }

        self.walk_children(ast, id, "", diagnostics);

        ast.node_mut(id).size = self.symbol_table.current_frame_size();
        self.symbol_table.leave(ast, diagnostics);

        self.walk_sibling(ast, id, "", diagnostics);
    }

    fn analyse_if_while(&mut self, ast: &mut Ast, id: NodeId, diagnostics: &mut Diagnostics) {
        let (scope_name, compound_name, stmt_type) = match ast.node(id).kind {
            NodeKind::If => ("if-stmt", "if-cmpd-stmt", "if"),
            NodeKind::While => ("while-stmt", "while-cmpd-stmt", "while"),
            _ => ("unknown-stmt", "unknown-cmpd-stmt", "unknown"),
        };

        self.symbol_table.enter(scope_name);

        // Only the test and the then-part / loop body live in this scope;
        // an else part is traversed after leaving it.
        for slot in 0..2 {
            if let Some(child) = ast.node(id).children[slot] {
                self.analyse_node(ast, child, &WalkContext::named(compound_name), diagnostics);
            }
        }

        if let Some(test) = ast.node(id).children[0] {
            let (test_type, test_is_array) = {
                let test = ast.node(test);
                (test.exp_type, test.is_array)
            };
            let line = ast.node(id).line;
            if test_type != ExpType::Bool && test_type != ExpType::Undefined {
                diagnostics.error(
                    line,
                    format!(
                        "Expecting Boolean test condition in {} statement but got type {}.",
                        stmt_type, test_type
                    ),
                );
            }
            if test_is_array {
                diagnostics.error(
                    line,
                    format!("Cannot use array as test condition in {} statement.", stmt_type),
                );
            }
        }

        ast.node_mut(id).size = self.symbol_table.current_frame_size();
        self.symbol_table.leave(ast, diagnostics);

        if let Some(else_part) = ast.node(id).children[2] {
            self.analyse_node(
                ast,
                else_part,
                &WalkContext::named("else-cmpd-stmt"),
                diagnostics,
            );
        }

        self.walk_sibling(ast, id, "", diagnostics);
    }

    fn analyse_for(&mut self, ast: &mut Ast, id: NodeId, diagnostics: &mut Diagnostics) {
        self.symbol_table.enter("for-stmt");
        self.walk_children(ast, id, "for-cmpd-stmt", diagnostics);
        ast.node_mut(id).size = self.symbol_table.current_frame_size();
        self.symbol_table.leave(ast, diagnostics);
        self.walk_sibling(ast, id, "", diagnostics);
    }

    fn analyse_range(&mut self, ast: &mut Ast, id: NodeId, diagnostics: &mut Diagnostics) {
        self.walk_children_ignore_init(ast, id, 1, diagnostics);

        let line = ast.node(id).line;
        for slot in 0..3 {
            if let Some(child) = ast.node(id).children[slot] {
                let (child_type, child_is_array) = {
                    let child = ast.node(child);
                    (child.exp_type, child.is_array)
                };
                if child_type != ExpType::Undefined {
                    if child_type != ExpType::Int {
                        diagnostics.error(
                            line,
                            format!(
                                "Expecting type int in position {} in range of for statement but got type {}.",
                                slot + 1,
                                child_type
                            ),
                        );
                    }
                    if child_is_array {
                        diagnostics.error(
                            line,
                            format!(
                                "Cannot use array in position {} in range of for statement.",
                                slot + 1
                            ),
                        );
                    }
                }
            }
        }

        self.walk_sibling(ast, id, "", diagnostics);
    }

    fn analyse_return(&mut self, ast: &mut Ast, id: NodeId, diagnostics: &mut Diagnostics) {
        self.walk_children(ast, id, "", diagnostics);

        let line = ast.node(id).line;
        let value = ast.node(id).children[0];

        if let Some(value) = value {
            if ast.node(value).is_array {
                diagnostics.error(line, String::from("Cannot return an array."));
            }
        }

        if let Some(func) = self.current_func {
            ast.node_mut(func).returned = true;

            let (func_name, func_line, func_type) = {
                let func = ast.node(func);
                (func.text().to_string(), func.line, func.exp_type)
            };

            match value {
                Some(_) if func_type == ExpType::Void => {
                    diagnostics.error(
                        line,
                        format!(
                            "Function '{}' at line {} is expecting no return value, but return has a value.",
                            func_name, func_line
                        ),
                    );
                }
                None if func_type != ExpType::Void => {
                    diagnostics.error(
                        line,
                        format!(
                            "Function '{}' at line {} is expecting to return type {} but return has no value.",
                            func_name, func_line, func_type
                        ),
                    );
                }
                Some(value) => {
                    let value_type = ast.node(value).exp_type;
                    if value_type != func_type && value_type != ExpType::Undefined {
                        diagnostics.error(
                            line,
                            format!(
                                "Function '{}' at line {} is expecting to return type {} but returns type {}.",
                                func_name, func_line, func_type, value_type
                            ),
                        );
                    }
                }
                None => {}
            }
        }

        self.walk_sibling(ast, id, "", diagnostics);
    }

    fn analyse_break(&mut self, ast: &mut Ast, id: NodeId, diagnostics: &mut Diagnostics) {
        if !self.symbol_table.in_loop() {
            diagnostics.error(
                ast.node(id).line,
                String::from("Cannot have a break statement outside of loop."),
            );
        }

        self.walk_children(ast, id, "", diagnostics);
        self.walk_sibling(ast, id, "", diagnostics);
    }

    /// Variable and parameter declarations share a handler; parameters come
    /// through with the carried scope name so the rest of the parameter
    /// chain keeps it.
    fn analyse_var_decl(
        &mut self,
        ast: &mut Ast,
        id: NodeId,
        scope_name: &str,
        diagnostics: &mut Diagnostics,
    ) {
        self.walk_children(ast, id, "", diagnostics);

        let (name, is_iter_var) = {
            let node = ast.node(id);
            (node.text().to_string(), node.is_iter_var)
        };

        // A declaration may not shadow a parameter of the enclosing
        // function, and may not rebind a name in its own scope.
        let inserted = self.symbol_table.lookup_parm(&name, is_iter_var).is_none()
            && self.symbol_table.insert(ast, &name, id);
        if inserted {
            let depth = self.symbol_table.depth();
            let node = ast.node_mut(id);
            node.mem_space = if node.is_parm() {
                node.inited = true;
                MemSpace::Parameter
            } else if node.is_static {
                MemSpace::Static
            } else if depth == 1 {
                MemSpace::Global
            } else {
                MemSpace::Local
            };
        } else {
            let dupe = self
                .symbol_table
                .lookup_local(&name)
                .or_else(|| self.symbol_table.lookup_parm(&name, is_iter_var));
            match dupe {
                Some(dupe) => self.report_already_declared(ast, id, dupe, diagnostics),
                None => diagnostics.internal(
                    Tag::SemanticAnalyzer,
                    String::from("duplicate node couldn't be found"),
                ),
            }
        }

        if let Some(init) = ast.node(id).children[0] {
            let line = ast.node(id).line;
            let (decl_type, decl_is_array) = {
                let node = ast.node(id);
                (node.exp_type, node.is_array)
            };
            let (init_type, init_is_array) = {
                let init = ast.node(init);
                (init.exp_type, init.is_array)
            };

            if !Self::is_const_exp(ast, init) {
                diagnostics.error(
                    line,
                    format!(
                        "Initializer for variable '{}' is not a constant expression.",
                        name
                    ),
                );
            }

            if decl_type != init_type && init_type != ExpType::Undefined {
                // no trailing period on this message
                diagnostics.error(
                    line,
                    format!(
                        "Initializer for variable '{}' of type {} is of type {}",
                        name, decl_type, init_type
                    ),
                );
            }

            if decl_is_array != init_is_array {
                let (variable_side, rhs_side) = if decl_is_array {
                    ("", " not")
                } else {
                    (" not", "")
                };
                diagnostics.error(
                    line,
                    format!(
                        "Initializer for variable '{}' requires both operands be arrays or not but variable is{} an array and rhs is{} an array.",
                        name, variable_side, rhs_side
                    ),
                );
            }
        }

        self.walk_sibling(ast, id, scope_name, diagnostics);
    }

    fn analyse_call(&mut self, ast: &mut Ast, id: NodeId, diagnostics: &mut Diagnostics) {
        let name = ast.node(id).text().to_string();
        let line = ast.node(id).line;

        match self.symbol_table.lookup(&name) {
            None => {
                diagnostics.error(line, format!("Symbol '{}' is not declared.", name));
                self.walk_children_ignore_init(ast, id, 1, diagnostics);
            }
            Some(dupe) => {
                let (dupe_type, dupe_size, dupe_mem, dupe_foffset, dupe_is_func) = {
                    let dupe = ast.node(dupe);
                    (
                        dupe.exp_type,
                        dupe.size,
                        dupe.mem_space,
                        dupe.foffset,
                        dupe.is_func(),
                    )
                };

                {
                    let node = ast.node_mut(id);
                    node.exp_type = dupe_type;
                    node.size = dupe_size;
                    node.mem_space = dupe_mem;
                    node.foffset = dupe_foffset;
                }
                ast.node_mut(dupe).used = true;

                if !dupe_is_func {
                    diagnostics.error(
                        line,
                        format!("'{}' is a simple variable and cannot be called.", name),
                    );
                    self.walk_children_ignore_init(ast, id, 1, diagnostics);
                } else {
                    self.walk_children_ignore_init(ast, id, 1, diagnostics);
                    self.check_parms(ast, id, dupe, diagnostics);
                }
            }
        }

        self.walk_sibling(ast, id, "", diagnostics);
    }

    fn analyse_id(
        &mut self,
        ast: &mut Ast,
        id: NodeId,
        check_init: bool,
        diagnostics: &mut Diagnostics,
    ) {
        let name = ast.node(id).text().to_string();
        let line = ast.node(id).line;

        match self.symbol_table.lookup(&name) {
            None => {
                diagnostics.error(line, format!("Symbol '{}' is not declared.", name));
            }
            Some(dupe) => {
                let (
                    dupe_type,
                    dupe_is_array,
                    dupe_is_static,
                    dupe_inited,
                    dupe_size,
                    dupe_mem,
                    dupe_foffset,
                    dupe_is_func,
                    dupe_init_warned,
                ) = {
                    let dupe = ast.node(dupe);
                    (
                        dupe.exp_type,
                        dupe.is_array,
                        dupe.is_static,
                        dupe.inited,
                        dupe.size,
                        dupe.mem_space,
                        dupe.foffset,
                        dupe.is_func(),
                        dupe.init_warned,
                    )
                };

                {
                    let node = ast.node_mut(id);
                    node.exp_type = dupe_type;
                    node.is_array = dupe_is_array;
                    node.is_static = dupe_is_static;
                    node.inited = dupe_inited;
                    node.size = dupe_size;
                    node.mem_space = dupe_mem;
                    node.foffset = dupe_foffset;
                }
                ast.node_mut(dupe).used = true;

                if dupe_is_func {
                    diagnostics.error(
                        line,
                        format!("Cannot use function '{}' as a variable.", name),
                    );
                } else if check_init && !dupe_inited && !dupe_is_static && !dupe_init_warned {
                    ast.node_mut(dupe).init_warned = true;
                    diagnostics.warning(
                        line,
                        format!("Variable '{}' may be uninitialized when used here.", name),
                    );
                }
            }
        }

        self.walk_children_ignore_init(ast, id, 1, diagnostics);
        self.walk_sibling(ast, id, "", diagnostics);
    }

    fn analyse_const(&mut self, ast: &mut Ast, id: NodeId, diagnostics: &mut Diagnostics) {
        // A char-array constant is a string literal; its storage lives in
        // the global frame.
        let (exp_type, is_array) = {
            let node = ast.node(id);
            (node.exp_type, node.is_array)
        };
        if exp_type == ExpType::Char && is_array {
            self.symbol_table.alloc_string(ast, id);
        }

        self.walk_children(ast, id, "", diagnostics);
        self.walk_sibling(ast, id, "", diagnostics);
    }

    /// `++` and `--` require a declared int scalar target.
    fn analyse_inc_op(&mut self, ast: &mut Ast, id: NodeId, diagnostics: &mut Diagnostics) {
        self.walk_children_ignore_init(ast, id, 1, diagnostics);

        if let Some(target) = ast.node(id).children[0] {
            if self.resolve_target(ast, target).is_some() {
                let (target_type, target_is_array) = {
                    let target = ast.node(target);
                    (target.exp_type, target.is_array)
                };
                let (line, text, exp_type) = {
                    let node = ast.node(id);
                    (node.line, node.text().to_string(), node.exp_type)
                };

                if target_type != ExpType::Int && target_type != ExpType::Undefined {
                    diagnostics.error(
                        line,
                        format!(
                            "Unary '{}' requires an operand of type {} but was given type {}.",
                            text, exp_type, target_type
                        ),
                    );
                }
                if target_is_array {
                    diagnostics.error(
                        line,
                        format!("The operation '{}' does not work with arrays.", text),
                    );
                }
            }
        }

        self.walk_sibling(ast, id, "", diagnostics);
    }

    /// Plain `=` and the compound arithmetic assignments. The left child is
    /// a definition of its target, so init checking is off on that side.
    fn analyse_assignment(
        &mut self,
        ast: &mut Ast,
        id: NodeId,
        math: bool,
        diagnostics: &mut Diagnostics,
    ) {
        self.walk_children_ignore_init(ast, id, 0, diagnostics);

        let lhs = ast.node(id).children[0];
        let rhs = ast.node(id).children[1];
        let (lhs, rhs) = match (lhs, rhs) {
            (Some(lhs), Some(rhs)) => (lhs, rhs),
            _ => return self.walk_sibling(ast, id, "", diagnostics),
        };

        // Resolve the assignment target, through a bracket if need be, and
        // mark its declaration initialized.
        let target = {
            let lhs_node = ast.node(lhs);
            match &lhs_node.kind {
                NodeKind::Op(Operation::Index) => lhs_node.children[0]
                    .and_then(|array| self.symbol_table.lookup(ast.node(array).text())),
                NodeKind::Id { name } => self.symbol_table.lookup(name),
                _ => None,
            }
        };

        if let Some(target) = target {
            ast.node_mut(target).inited = true;

            let (line, text, node_type) = {
                let node = ast.node(id);
                (node.line, node.text().to_string(), node.exp_type)
            };
            let (lhs_type, lhs_is_array) = {
                let lhs = ast.node(lhs);
                (lhs.exp_type, lhs.is_array)
            };
            let (rhs_type, rhs_is_array) = {
                let rhs = ast.node(rhs);
                (rhs.exp_type, rhs.is_array)
            };

            if math {
                if lhs_type != ExpType::Int && lhs_type != ExpType::Undefined {
                    diagnostics.error(
                        line,
                        format!(
                            "'{}' requires operands of type {} but lhs is of type {}.",
                            text, node_type, lhs_type
                        ),
                    );
                }
                if rhs_type != ExpType::Int && rhs_type != ExpType::Undefined {
                    diagnostics.error(
                        line,
                        format!(
                            "'{}' requires operands of type {} but rhs is of type {}.",
                            text, node_type, rhs_type
                        ),
                    );
                }
                if lhs_is_array || rhs_is_array {
                    diagnostics.error(
                        line,
                        format!("The operation '{}' does not work with arrays.", text),
                    );
                }
            } else {
                // Plain assignment takes its type and array-ness from the
                // target.
                {
                    let node = ast.node_mut(id);
                    node.exp_type = lhs_type;
                    node.is_array = lhs_is_array;
                }

                if lhs_type != rhs_type
                    && lhs_type != ExpType::Undefined
                    && rhs_type != ExpType::Undefined
                {
                    diagnostics.error(
                        line,
                        format!(
                            "'{}' requires operands of the same type but lhs is type {} and rhs is type {}.",
                            text, lhs_type, rhs_type
                        ),
                    );
                }

                if lhs_is_array != rhs_is_array {
                    let (lhs_side, rhs_side) = if lhs_is_array {
                        ("", " not")
                    } else {
                        (" not", "")
                    };
                    diagnostics.error(
                        line,
                        format!(
                            "'{}' requires both operands be arrays or not but lhs is{} an array and rhs is{} an array.",
                            text, lhs_side, rhs_side
                        ),
                    );
                }
            }
        }

        self.walk_sibling(ast, id, "", diagnostics);
    }

    fn analyse_binary_op(
        &mut self,
        ast: &mut Ast,
        id: NodeId,
        comparison: bool,
        diagnostics: &mut Diagnostics,
    ) {
        self.walk_children_ignore_init(ast, id, 1, diagnostics);

        let lhs = ast.node(id).children[0];
        let rhs = ast.node(id).children[1];
        if let (Some(lhs), Some(rhs)) = (lhs, rhs) {
            let (line, text, node_type) = {
                let node = ast.node(id);
                (node.line, node.text().to_string(), node.exp_type)
            };
            let (lhs_type, lhs_is_array) = {
                let lhs = ast.node(lhs);
                (lhs.exp_type, lhs.is_array)
            };
            let (rhs_type, rhs_is_array) = {
                let rhs = ast.node(rhs);
                (rhs.exp_type, rhs.is_array)
            };

            if comparison {
                if lhs_type != rhs_type
                    && lhs_type != ExpType::Undefined
                    && rhs_type != ExpType::Undefined
                {
                    diagnostics.error(
                        line,
                        format!(
                            "'{}' requires operands of the same type but lhs is type {} and rhs is type {}.",
                            text, lhs_type, rhs_type
                        ),
                    );
                }
                if lhs_is_array != rhs_is_array {
                    let (lhs_side, rhs_side) = if lhs_is_array {
                        ("", " not")
                    } else {
                        (" not", "")
                    };
                    diagnostics.error(
                        line,
                        format!(
                            "'{}' requires both operands be arrays or not but lhs is{} an array and rhs is{} an array.",
                            text, lhs_side, rhs_side
                        ),
                    );
                }
            } else {
                if lhs_type != node_type && lhs_type != ExpType::Undefined {
                    diagnostics.error(
                        line,
                        format!(
                            "'{}' requires operands of type {} but lhs is of type {}.",
                            text, node_type, lhs_type
                        ),
                    );
                }
                if rhs_type != node_type && rhs_type != ExpType::Undefined {
                    diagnostics.error(
                        line,
                        format!(
                            "'{}' requires operands of type {} but rhs is of type {}.",
                            text, node_type, rhs_type
                        ),
                    );
                }
                if lhs_is_array || rhs_is_array {
                    diagnostics.error(
                        line,
                        format!("The operation '{}' does not work with arrays.", text),
                    );
                }
            }
        }

        self.walk_sibling(ast, id, "", diagnostics);
    }

    /// `not`, unary `-` and `?` take a scalar operand of the operator's own
    /// type. The operand is only checked once it is known to be something
    /// typed: a resolvable symbol, a constant or another operator.
    fn analyse_unary(&mut self, ast: &mut Ast, id: NodeId, diagnostics: &mut Diagnostics) {
        self.walk_children_ignore_init(ast, id, 1, diagnostics);

        if let Some(operand) = ast.node(id).children[0] {
            let checkable = match &ast.node(operand).kind {
                NodeKind::Const(_) | NodeKind::Op(_) | NodeKind::Assign(_) => true,
                NodeKind::Id { name } | NodeKind::Call { name } => {
                    self.symbol_table.lookup(name).is_some()
                }
                _ => false,
            };

            if checkable {
                let (operand_type, operand_is_array) = {
                    let operand = ast.node(operand);
                    (operand.exp_type, operand.is_array)
                };
                let (line, text, exp_type) = {
                    let node = ast.node(id);
                    (node.line, node.text().to_string(), node.exp_type)
                };

                if operand_type != exp_type && operand_type != ExpType::Undefined {
                    diagnostics.error(
                        line,
                        format!(
                            "Unary '{}' requires an operand of type {} but was given type {}.",
                            text, exp_type, operand_type
                        ),
                    );
                }
                if operand_is_array {
                    diagnostics.error(
                        line,
                        format!("The operation '{}' does not work with arrays.", text),
                    );
                }
            }
        }

        self.walk_sibling(ast, id, "", diagnostics);
    }

    fn analyse_sizeof(&mut self, ast: &mut Ast, id: NodeId, diagnostics: &mut Diagnostics) {
        self.walk_children_ignore_init(ast, id, 1, diagnostics);

        if let Some(operand) = ast.node(id).children[0] {
            if !ast.node(operand).is_array {
                let (line, text) = {
                    let node = ast.node(id);
                    (node.line, node.text().to_string())
                };
                diagnostics.error(
                    line,
                    format!("The operation '{}' only works with arrays.", text),
                );
            }
        }

        self.walk_sibling(ast, id, "", diagnostics);
    }

    fn analyse_bracket(
        &mut self,
        ast: &mut Ast,
        id: NodeId,
        check_init: bool,
        diagnostics: &mut Diagnostics,
    ) {
        // When this bracket is an assignment target the array child is
        // being defined, not read.
        if check_init {
            self.walk_children_ignore_init(ast, id, 1, diagnostics);
        } else {
            self.walk_children_ignore_init(ast, id, 0, diagnostics);
        }

        let array = ast.node(id).children[0];
        let index = ast.node(id).children[1];
        let (array, index) = match (array, index) {
            (Some(array), Some(index)) => (array, index),
            _ => return self.walk_sibling(ast, id, "", diagnostics),
        };

        let line = ast.node(id).line;
        let array_text = ast.node(array).text().to_string();

        if !ast.node(array).is_array {
            diagnostics.error(line, format!("Cannot index nonarray '{}'.", array_text));
        }

        let array_symbol = self.symbol_table.lookup(&array_text);
        let index_symbol = match &ast.node(index).kind {
            NodeKind::Id { name } | NodeKind::Call { name } => self.symbol_table.lookup(name),
            _ => None,
        };

        if array_symbol.is_some() {
            // The bracket's type is the element type of the array.
            let array_type = ast.node(array).exp_type;
            ast.node_mut(id).exp_type = array_type;

            // The index is only checked when it resolved to the matching
            // kind of symbol, or is not a symbol at all.
            let index_checkable = match &ast.node(index).kind {
                NodeKind::Id { .. } => index_symbol
                    .map(|symbol| matches!(ast.node(symbol).kind, NodeKind::Var { .. }))
                    .unwrap_or(false),
                NodeKind::Call { .. } => index_symbol
                    .map(|symbol| ast.node(symbol).is_func())
                    .unwrap_or(false),
                _ => true,
            };

            if index_checkable {
                let (index_type, index_is_array) = {
                    let index = ast.node(index);
                    (index.exp_type, index.is_array)
                };
                if index_type != ExpType::Int && index_type != ExpType::Undefined {
                    diagnostics.error(
                        line,
                        format!(
                            "Array '{}' should be indexed by type int but got type {}.",
                            array_text, index_type
                        ),
                    );
                }
                if index_is_array {
                    diagnostics.error(
                        line,
                        format!(
                            "Array index is the unindexed array '{}'.",
                            ast.node(index).text()
                        ),
                    );
                }
            }
        }

        self.walk_sibling(ast, id, "", diagnostics);
    }
}

/// Helpers shared between handlers.
impl CMinusSemanticAnalyser {
    /// Resolve an operand to its declaration, looking through one bracket
    /// dereference.
    fn resolve_target(&self, ast: &Ast, id: NodeId) -> Option<NodeId> {
        let node = ast.node(id);
        match &node.kind {
            NodeKind::Op(Operation::Index) => {
                let array = node.children[0]?;
                self.symbol_table.lookup(ast.node(array).text())
            }
            _ => self.symbol_table.lookup(node.text()),
        }
    }

    /// A constant expression is built from constants combined with logical,
    /// comparison and arithmetic operators only. Identifiers and calls are
    /// never constant.
    fn is_const_exp(ast: &Ast, id: NodeId) -> bool {
        let node = ast.node(id);
        let valid_node = match &node.kind {
            NodeKind::Const(_) => true,
            NodeKind::Op(op) => op.is_logical() || op.is_comparison() || op.is_math(),
            _ => false,
        };
        if !valid_node {
            return false;
        }

        node.children
            .iter()
            .flatten()
            .all(|child| Self::is_const_exp(ast, *child))
    }

    /// Walk a call's arguments against the declaration's parameters in
    /// lockstep, then report whichever chain was longer.
    fn check_parms(
        &mut self,
        ast: &mut Ast,
        call: NodeId,
        decl: NodeId,
        diagnostics: &mut Diagnostics,
    ) {
        let (call_name, call_line) = {
            let node = ast.node(call);
            (node.text().to_string(), node.line)
        };
        let decl_line = ast.node(decl).line;

        let mut arg_scout = ast.node(call).children[0];
        let mut parm_scout = ast.node(decl).children[0];
        let mut position = 1;
        while let (Some(arg), Some(parm)) = (arg_scout, parm_scout) {
            let (arg_type, arg_is_array) = {
                let arg = ast.node(arg);
                (arg.exp_type, arg.is_array)
            };
            let (parm_type, parm_is_array) = {
                let parm = ast.node(parm);
                (parm.exp_type, parm.is_array)
            };

            if arg_type != parm_type && arg_type != ExpType::Undefined {
                diagnostics.error(
                    call_line,
                    format!(
                        "Expecting type {} in parameter {} of call to '{}' declared on line {} but got type {}.",
                        parm_type, position, call_name, decl_line, arg_type
                    ),
                );
            }

            if arg_is_array && !parm_is_array {
                diagnostics.error(
                    call_line,
                    format!(
                        "Not expecting array in parameter {} of call to '{}' declared on line {}.",
                        position, call_name, decl_line
                    ),
                );
            } else if !arg_is_array && parm_is_array {
                diagnostics.error(
                    call_line,
                    format!(
                        "Expecting array in parameter {} of call to '{}' declared on line {}.",
                        position, call_name, decl_line
                    ),
                );
            }

            arg_scout = ast.node(arg).sibling;
            parm_scout = ast.node(parm).sibling;
            position += 1;
        }

        if arg_scout.is_none() && parm_scout.is_some() {
            diagnostics.error(
                call_line,
                format!(
                    "Too few parameters passed for function '{}' declared on line {}.",
                    call_name, decl_line
                ),
            );
        } else if arg_scout.is_some() && parm_scout.is_none() {
            diagnostics.error(
                call_line,
                format!(
                    "Too many parameters passed for function '{}' declared on line {}.",
                    call_name, decl_line
                ),
            );
        }
    }

    fn report_already_declared(
        &mut self,
        ast: &Ast,
        node: NodeId,
        dupe: NodeId,
        diagnostics: &mut Diagnostics,
    ) {
        let (name, line) = {
            let node = ast.node(node);
            (node.text().to_string(), node.line)
        };
        diagnostics.error(
            line,
            format!(
                "Symbol '{}' is already declared at line {}.",
                name,
                ast.node(dupe).line
            ),
        );
    }
}
