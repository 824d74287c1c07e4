use std::collections::HashMap;

use super::super::ast::{AssignOp, Ast, Literal, MemSpace, NodeId, NodeKind, Operation};
use super::program_code_builder::{Operand, TinyProgramBuilder};
use super::tiny_program::{MemoryOp as RM, RegisterOp as RO, TinyProgram};
use super::BackEndGenerator;

/// Register conventions.
const GP: i32 = 0; // global pointer, top of data memory
const FP: i32 = 1; // frame pointer
const RT: i32 = 2; // return value
const AC: i32 = 3; // accumulator
const AC1: i32 = 4; // second accumulator
const AC2: i32 = 5; // address scratch
const PC: i32 = 7; // program counter

/// TinyCodeGenerator is a backend for the tiny machine.
/// It generates program code from an analysed abstract syntax tree.
///
/// # Frame Structure
/// GP ->    GLOBAL VAR 0
///          ...
///          GLOBAL VAR N            (statics and string storage included)
/// FP ->    SAVED FRAME PTR         offset 0
///          RETURN ADDRESS          offset -1
///          PARAMETER 0             offset -2
///          ...
///          LOCAL VAR 0
///          ...
///          TEMPORARIES             below the frame size, tracked by toffset
///
/// A non-parameter array occupies one extra word ahead of its elements
/// holding the length; the annotated `foffset` points at that word. Array
/// parameters hold the address of the caller's length word.
pub struct TinyCodeGenerator {
    builder: TinyProgramBuilder,
    function_labels: HashMap<String, u64>,
    break_labels: Vec<u64>,

    /// Cursor for temporary slots below the current frame.
    toffset: i32,
    global_offset: i32,
}

impl BackEndGenerator for TinyCodeGenerator {
    /// Creates a default configuration of TinyCodeGenerator
    fn default() -> Self {
        Self {
            builder: TinyProgramBuilder::new(),
            function_labels: HashMap::default(),
            break_labels: vec![],
            toffset: 0,
            global_offset: 0,
        }
    }

    /// Generates a TinyProgram from an analysed Abstract Syntax Tree
    fn generate(mut self, ast: &Ast, global_offset: i32) -> TinyProgram {
        self.global_offset = global_offset;

        self.builder.comment("C- compiler for the tiny machine");
        let init = self.builder.create_label();
        self.builder.emit_memory_ref(
            RM::LoadConst,
            PC,
            Operand::Absolute(init),
            0,
            "jump to init",
        );

        self.generate_builtin_functions();

        if let Some(root) = ast.root() {
            let mut declaration = Some(root);
            while let Some(id) = declaration {
                if ast.node(id).is_func() {
                    self.generate_function(ast, id);
                }
                declaration = ast.node(id).sibling;
            }
        }

        self.builder.set_label(init);
        self.generate_init(ast);

        self.builder.finalize()
    }
}

/// Program scaffolding: built-in routines, function linkage and the init
/// section that sets up registers and static data before calling main.
impl TinyCodeGenerator {
    fn function_label(&mut self, name: &str) -> u64 {
        match self.function_labels.get(name) {
            Some(label) => *label,
            None => {
                let label = self.builder.create_label();
                self.function_labels.insert(String::from(name), label);
                label
            }
        }
    }

    /// The callee side of every call: stash the return address the caller
    /// left in the accumulator.
    fn emit_prologue(&mut self, name: &str) {
        let label = self.function_label(name);
        self.builder.set_label(label);
        self.builder
            .emit_memory(RM::Store, AC, -1, FP, "store return address");
    }

    fn emit_return_sequence(&mut self) {
        self.builder
            .emit_memory(RM::Load, AC, -1, FP, "load return address");
        self.builder.emit_memory(RM::Load, FP, 0, FP, "adjust fp");
        self.builder.emit_memory(RM::LoadAddress, PC, 0, AC, "return");
    }

    fn generate_builtin_functions(&mut self) {
        self.builder.comment("BUILT-IN FUNCTIONS");

        for (name, op) in [
            ("input", RO::In),
            ("inputb", RO::InBool),
            ("inputc", RO::InChar),
        ] {
            self.builder.comment(&format!("FUNCTION {}", name));
            self.emit_prologue(name);
            self.builder.emit_register(op, RT, RT, RT, "read input");
            self.emit_return_sequence();
        }

        for (name, op) in [
            ("output", RO::Out),
            ("outputb", RO::OutBool),
            ("outputc", RO::OutChar),
        ] {
            self.builder.comment(&format!("FUNCTION {}", name));
            self.emit_prologue(name);
            self.builder
                .emit_memory(RM::Load, AC, -2, FP, "load parameter");
            self.builder.emit_register(op, AC, AC, AC, "write output");
            self.builder
                .emit_memory(RM::LoadConst, RT, 0, 0, "void return value");
            self.emit_return_sequence();
        }

        self.builder.comment("FUNCTION outnl");
        self.emit_prologue("outnl");
        self.builder
            .emit_register(RO::OutNewline, AC, AC, AC, "write newline");
        self.builder
            .emit_memory(RM::LoadConst, RT, 0, 0, "void return value");
        self.emit_return_sequence();
    }

    fn generate_function(&mut self, ast: &Ast, id: NodeId) {
        let node = ast.node(id);
        let name = node.text().to_string();
        self.toffset = node.size;

        self.builder.comment(&format!("FUNCTION {}", name));
        self.emit_prologue(&name);

        if let Some(body) = ast.node(id).children[1] {
            self.generate_statement(ast, body);
        }

        // Falling off the end of a function returns zero.
        self.builder
            .emit_memory(RM::LoadConst, RT, 0, 0, "default return value");
        self.emit_return_sequence();
        self.builder.comment(&format!("END FUNCTION {}", name));
    }

    fn generate_init(&mut self, ast: &Ast) {
        self.builder.comment("INIT");
        self.builder
            .emit_memory(RM::Load, GP, 0, GP, "set the global pointer");
        self.builder.emit_memory(
            RM::LoadAddress,
            FP,
            self.global_offset,
            GP,
            "set first frame at end of globals",
        );
        self.builder
            .emit_memory(RM::Store, FP, 0, FP, "store old fp (points to self)");

        self.generate_static_data(ast);

        self.builder
            .emit_memory(RM::LoadAddress, AC, 1, PC, "return address in ac");
        let main = self.function_label("main");
        self.builder
            .emit_memory_ref(RM::LoadConst, PC, Operand::Absolute(main), 0, "jump to main");
        self.builder.emit_register(RO::Halt, 0, 0, 0, "DONE!");
    }

    /// Globals, static locals and string constants all live in the global
    /// frame; their lengths and initial values are stored once, up front.
    fn generate_static_data(&mut self, ast: &Ast) {
        for id in ast.ids() {
            let node = ast.node(id);
            match &node.kind {
                NodeKind::Var { name } => {
                    if node.mem_space != MemSpace::Global && node.mem_space != MemSpace::Static {
                        continue;
                    }
                    if node.is_array {
                        self.builder.emit_memory(
                            RM::LoadConst,
                            AC,
                            node.size - 1,
                            0,
                            &format!("load size of array {}", name),
                        );
                        self.builder.emit_memory(
                            RM::Store,
                            AC,
                            node.foffset,
                            GP,
                            &format!("save size of array {}", name),
                        );
                    }
                    if let Some(init) = node.children[0] {
                        let foffset = node.foffset;
                        let is_array = node.is_array;
                        let comment = format!("initialize {}", name);
                        if is_array {
                            self.generate_array_copy(ast, init, foffset, GP, &comment);
                        } else {
                            self.generate_expression(ast, init);
                            self.builder
                                .emit_memory(RM::Store, AC, foffset, GP, &comment);
                        }
                    }
                }
                NodeKind::Const(Literal::Str(value)) if node.is_array => {
                    self.builder.emit_memory(
                        RM::LoadConst,
                        AC,
                        node.size - 1,
                        0,
                        "load string length",
                    );
                    self.builder
                        .emit_memory(RM::Store, AC, node.foffset, GP, "save string length");
                    for (index, character) in value.chars().enumerate() {
                        self.builder.emit_memory(
                            RM::LoadConst,
                            AC,
                            character as i32,
                            0,
                            "load string character",
                        );
                        self.builder.emit_memory(
                            RM::Store,
                            AC,
                            node.foffset - 1 - index as i32,
                            GP,
                            "save string character",
                        );
                    }
                }
                _ => {}
            }
        }
    }
}

/// Statement generation.
impl TinyCodeGenerator {
    fn generate_statement(&mut self, ast: &Ast, id: NodeId) {
        match &ast.node(id).kind {
            NodeKind::Compound => self.generate_compound(ast, id),
            NodeKind::If => self.generate_if(ast, id),
            NodeKind::While => self.generate_while(ast, id),
            NodeKind::For => self.generate_for(ast, id),
            NodeKind::Return => self.generate_return(ast, id),
            NodeKind::Break => self.generate_break(),
            NodeKind::Var { .. } => self.generate_local_decl(ast, id),
            _ => self.generate_expression(ast, id),
        }
    }

    fn generate_compound(&mut self, ast: &Ast, id: NodeId) {
        self.builder.comment("COMPOUND");
        let mut declaration = ast.node(id).children[0];
        while let Some(decl) = declaration {
            self.generate_local_decl(ast, decl);
            declaration = ast.node(decl).sibling;
        }

        let mut statement = ast.node(id).children[1];
        while let Some(stmt) = statement {
            self.generate_statement(ast, stmt);
            statement = ast.node(stmt).sibling;
        }
    }

    /// Static locals were fully handled by the init section; plain locals
    /// need their array length stored and their initializer run on every
    /// entry to the block.
    fn generate_local_decl(&mut self, ast: &Ast, id: NodeId) {
        let node = ast.node(id);
        if node.is_static {
            return;
        }

        if node.is_array {
            self.builder.emit_memory(
                RM::LoadConst,
                AC,
                node.size - 1,
                0,
                &format!("load size of array {}", node.text()),
            );
            self.builder.emit_memory(
                RM::Store,
                AC,
                node.foffset,
                FP,
                &format!("save size of array {}", node.text()),
            );
        }

        if let Some(init) = node.children[0] {
            let foffset = node.foffset;
            let is_array = node.is_array;
            let comment = format!("initialize {}", node.text());
            if is_array {
                self.generate_array_copy(ast, init, foffset, FP, &comment);
            } else {
                self.generate_expression(ast, init);
                self.builder.emit_memory(RM::Store, AC, foffset, FP, &comment);
            }
        }
    }

    fn generate_if(&mut self, ast: &Ast, id: NodeId) {
        self.builder.comment("IF");
        if let Some(test) = ast.node(id).children[0] {
            self.generate_expression(ast, test);
        }

        let else_label = self.builder.create_label();
        let end_label = self.builder.create_label();
        self.builder.emit_memory_ref(
            RM::JumpZero,
            AC,
            Operand::Relative(else_label),
            PC,
            "jump past then on false",
        );

        if let Some(then_part) = ast.node(id).children[1] {
            self.generate_statement(ast, then_part);
        }
        self.builder.emit_memory_ref(
            RM::LoadAddress,
            PC,
            Operand::Relative(end_label),
            PC,
            "jump past else",
        );

        self.builder.set_label(else_label);
        if let Some(else_part) = ast.node(id).children[2] {
            self.generate_statement(ast, else_part);
        }
        self.builder.set_label(end_label);
        self.builder.comment("END IF");
    }

    fn generate_while(&mut self, ast: &Ast, id: NodeId) {
        self.builder.comment("WHILE");
        let loop_label = self.builder.create_label();
        let exit_label = self.builder.create_label();
        self.break_labels.push(exit_label);

        self.builder.set_label(loop_label);
        if let Some(test) = ast.node(id).children[0] {
            self.generate_expression(ast, test);
        }
        self.builder.emit_memory_ref(
            RM::JumpZero,
            AC,
            Operand::Relative(exit_label),
            PC,
            "exit loop on false",
        );

        if let Some(body) = ast.node(id).children[1] {
            self.generate_statement(ast, body);
        }
        self.builder.emit_memory_ref(
            RM::LoadAddress,
            PC,
            Operand::Relative(loop_label),
            PC,
            "repeat loop",
        );

        self.builder.set_label(exit_label);
        self.break_labels.pop();
        self.builder.comment("END WHILE");
    }

    /// The two slots the analyser reserved above the iterator hold the end
    /// bound and the step, evaluated once before the first test.
    fn generate_for(&mut self, ast: &Ast, id: NodeId) {
        self.builder.comment("FOR");
        let iterator = match ast.node(id).children[0] {
            Some(iterator) => iterator,
            None => return,
        };
        let iterator_offset = ast.node(iterator).foffset;
        let to_offset = iterator_offset + 2;
        let by_offset = iterator_offset + 1;

        if let Some(range) = ast.node(id).children[1] {
            if let Some(from) = ast.node(range).children[0] {
                self.generate_expression(ast, from);
                self.builder
                    .emit_memory(RM::Store, AC, iterator_offset, FP, "initialize iterator");
            }
            if let Some(to) = ast.node(range).children[1] {
                self.generate_expression(ast, to);
                self.builder
                    .emit_memory(RM::Store, AC, to_offset, FP, "save end bound");
            }
            match ast.node(range).children[2] {
                Some(by) => self.generate_expression(ast, by),
                None => self
                    .builder
                    .emit_memory(RM::LoadConst, AC, 1, 0, "default step"),
            }
            self.builder
                .emit_memory(RM::Store, AC, by_offset, FP, "save step");
        }

        let loop_label = self.builder.create_label();
        let exit_label = self.builder.create_label();
        self.break_labels.push(exit_label);

        self.builder.set_label(loop_label);
        self.builder
            .emit_memory(RM::Load, AC, iterator_offset, FP, "load iterator");
        self.builder
            .emit_memory(RM::Load, AC1, to_offset, FP, "load end bound");
        self.builder
            .emit_register(RO::TestGreater, AC, AC, AC1, "past the end?");
        self.builder.emit_memory_ref(
            RM::JumpNotZero,
            AC,
            Operand::Relative(exit_label),
            PC,
            "exit loop",
        );

        if let Some(body) = ast.node(id).children[2] {
            self.generate_statement(ast, body);
        }

        self.builder
            .emit_memory(RM::Load, AC, iterator_offset, FP, "load iterator");
        self.builder
            .emit_memory(RM::Load, AC1, by_offset, FP, "load step");
        self.builder
            .emit_register(RO::Add, AC, AC, AC1, "advance iterator");
        self.builder
            .emit_memory(RM::Store, AC, iterator_offset, FP, "save iterator");
        self.builder.emit_memory_ref(
            RM::LoadAddress,
            PC,
            Operand::Relative(loop_label),
            PC,
            "repeat loop",
        );

        self.builder.set_label(exit_label);
        self.break_labels.pop();
        self.builder.comment("END FOR");
    }

    fn generate_return(&mut self, ast: &Ast, id: NodeId) {
        self.builder.comment("RETURN");
        match ast.node(id).children[0] {
            Some(value) => {
                self.generate_expression(ast, value);
                self.builder
                    .emit_memory(RM::LoadAddress, RT, 0, AC, "copy result to return register");
            }
            None => self
                .builder
                .emit_memory(RM::LoadConst, RT, 0, 0, "void return value"),
        }
        self.emit_return_sequence();
    }

    fn generate_break(&mut self) {
        if let Some(exit_label) = self.break_labels.last() {
            self.builder.emit_memory_ref(
                RM::LoadAddress,
                PC,
                Operand::Relative(*exit_label),
                PC,
                "break",
            );
        }
    }
}

/// Expression generation. Every expression leaves its value in AC; arrays
/// are represented by the address of their length word.
impl TinyCodeGenerator {
    fn generate_expression(&mut self, ast: &Ast, id: NodeId) {
        match &ast.node(id).kind {
            NodeKind::Const(literal) => self.generate_constant(ast, id, literal),
            NodeKind::Id { .. } => self.generate_identifier(ast, id),
            NodeKind::Call { .. } => self.generate_call(ast, id),
            NodeKind::Assign(op) => self.generate_assignment(ast, id, *op),
            NodeKind::Op(op) => self.generate_operation(ast, id, *op),
            _ => {}
        }
    }

    fn generate_constant(&mut self, ast: &Ast, id: NodeId, literal: &Literal) {
        match literal {
            Literal::Int(value) => {
                self.builder
                    .emit_memory(RM::LoadConst, AC, *value, 0, "load integer constant")
            }
            Literal::Char(value) => self.builder.emit_memory(
                RM::LoadConst,
                AC,
                *value as i32,
                0,
                "load character constant",
            ),
            Literal::Bool(value) => self.builder.emit_memory(
                RM::LoadConst,
                AC,
                i32::from(*value),
                0,
                "load boolean constant",
            ),
            Literal::Str(_) => self.builder.emit_memory(
                RM::LoadAddress,
                AC,
                ast.node(id).foffset,
                GP,
                "address of string constant",
            ),
        }
    }

    fn generate_identifier(&mut self, ast: &Ast, id: NodeId) {
        let node = ast.node(id);
        let comment = format!("load {}", node.text());
        if node.is_array {
            self.generate_array_address(ast, id, AC);
        } else {
            self.builder.emit_memory(
                RM::Load,
                AC,
                node.foffset,
                Self::base_register(node.mem_space),
                &comment,
            );
        }
    }

    /// Push the address of an array value into the given register: the
    /// storage address for declared arrays, the stored address for array
    /// parameters.
    fn generate_array_address(&mut self, ast: &Ast, id: NodeId, register: i32) {
        let node = ast.node(id);
        let comment = format!("address of array {}", node.text());
        if node.mem_space == MemSpace::Parameter {
            self.builder
                .emit_memory(RM::Load, register, node.foffset, FP, &comment);
        } else {
            self.builder.emit_memory(
                RM::LoadAddress,
                register,
                node.foffset,
                Self::base_register(node.mem_space),
                &comment,
            );
        }
    }

    /// Leave the address of element [index_register] of the array in AC2.
    fn generate_element_address(&mut self, ast: &Ast, array: NodeId, index_register: i32) {
        self.generate_array_address(ast, array, AC2);
        self.builder
            .emit_memory(RM::LoadAddress, AC2, -1, AC2, "point at first element");
        self.builder
            .emit_register(RO::Sub, AC2, AC2, index_register, "index the array");
    }

    fn generate_call(&mut self, ast: &Ast, id: NodeId) {
        let name = ast.node(id).text().to_string();
        let call_offset = self.toffset;

        self.builder.emit_memory(
            RM::Store,
            FP,
            call_offset,
            FP,
            &format!("store fp in ghost frame for {}", name),
        );
        self.toffset -= 2;

        let mut argument = ast.node(id).children[0];
        while let Some(arg) = argument {
            self.generate_expression(ast, arg);
            self.builder
                .emit_memory(RM::Store, AC, self.toffset, FP, "store argument");
            self.toffset -= 1;
            argument = ast.node(arg).sibling;
        }
        self.toffset = call_offset;

        self.builder.emit_memory(
            RM::LoadAddress,
            FP,
            call_offset,
            FP,
            "ghost frame becomes active frame",
        );
        self.builder
            .emit_memory(RM::LoadAddress, AC, 1, PC, "return address in ac");
        let label = self.function_label(&name);
        self.builder.emit_memory_ref(
            RM::LoadConst,
            PC,
            Operand::Absolute(label),
            0,
            &format!("jump to {}", name),
        );
        self.builder
            .emit_memory(RM::LoadAddress, AC, 0, RT, "save the result in ac");
    }

    fn generate_assignment(&mut self, ast: &Ast, id: NodeId, op: AssignOp) {
        let target = match ast.node(id).children[0] {
            Some(target) => target,
            None => return,
        };

        match op {
            AssignOp::Increment | AssignOp::Decrement => {
                let step = if op == AssignOp::Increment { 1 } else { -1 };
                self.generate_target_load(ast, target);
                self.builder
                    .emit_memory(RM::LoadAddress, AC, step, AC, op.text());
                self.generate_target_store(ast, target);
            }
            AssignOp::Assign => {
                let value = match ast.node(id).children[1] {
                    Some(value) => value,
                    None => return,
                };
                if ast.node(target).is_array {
                    // Whole-array assignment copies length and elements.
                    let (foffset, base) = {
                        let node = ast.node(target);
                        (node.foffset, Self::base_register(node.mem_space))
                    };
                    let comment = format!("copy into array {}", ast.node(target).text());
                    self.generate_array_copy(ast, value, foffset, base, &comment);
                } else {
                    match ast.node(target).kind {
                        NodeKind::Op(Operation::Index) => {
                            self.generate_indexed_store(ast, id, target, None)
                        }
                        _ => {
                            self.generate_expression(ast, value);
                            self.generate_target_store(ast, target);
                        }
                    }
                }
            }
            compound => {
                let machine_op = match compound {
                    AssignOp::AddAssign => RO::Add,
                    AssignOp::SubAssign => RO::Sub,
                    AssignOp::MulAssign => RO::Mul,
                    _ => RO::Div,
                };
                match ast.node(target).kind {
                    NodeKind::Op(Operation::Index) => {
                        self.generate_indexed_store(ast, id, target, Some(machine_op))
                    }
                    _ => {
                        if let Some(value) = ast.node(id).children[1] {
                            self.generate_expression(ast, value);
                        }
                        self.builder.emit_memory(
                            RM::LoadAddress,
                            AC1,
                            0,
                            AC,
                            "save right operand",
                        );
                        self.generate_target_load(ast, target);
                        self.builder
                            .emit_register(machine_op, AC, AC, AC1, op.text());
                        self.generate_target_store(ast, target);
                    }
                }
            }
        }
    }

    /// Store into `a[index]`. For plain `=` the value expression lands in
    /// the element directly; a compound assignment reads the element first
    /// and combines it with the value through the machine op.
    fn generate_indexed_store(
        &mut self,
        ast: &Ast,
        assign: NodeId,
        bracket: NodeId,
        machine_op: Option<RO>,
    ) {
        let array = ast.node(bracket).children[0];
        let index = ast.node(bracket).children[1];
        let (array, index) = match (array, index) {
            (Some(array), Some(index)) => (array, index),
            _ => return,
        };

        self.generate_expression(ast, index);
        self.builder
            .emit_memory(RM::Store, AC, self.toffset, FP, "push index");
        self.toffset -= 1;

        if let Some(value) = ast.node(assign).children[1] {
            self.generate_expression(ast, value);
        }

        self.toffset += 1;
        self.builder
            .emit_memory(RM::Load, AC1, self.toffset, FP, "pop index");
        self.generate_element_address(ast, array, AC1);

        if let Some(machine_op) = machine_op {
            self.builder
                .emit_memory(RM::LoadAddress, AC1, 0, AC, "save right operand");
            self.builder.emit_memory(RM::Load, AC, 0, AC2, "load element");
            self.builder
                .emit_register(machine_op, AC, AC, AC1, "combine with element");
        }

        self.builder.emit_memory(RM::Store, AC, 0, AC2, "save element");
    }

    /// Load the current value of an assignment target into AC.
    fn generate_target_load(&mut self, ast: &Ast, target: NodeId) {
        match ast.node(target).kind {
            NodeKind::Op(Operation::Index) => {
                let array = ast.node(target).children[0];
                let index = ast.node(target).children[1];
                if let (Some(array), Some(index)) = (array, index) {
                    self.generate_expression(ast, index);
                    self.generate_element_address(ast, array, AC);
                    self.builder.emit_memory(RM::Load, AC, 0, AC2, "load element");
                }
            }
            _ => {
                let node = ast.node(target);
                let comment = format!("load {}", node.text());
                self.builder.emit_memory(
                    RM::Load,
                    AC,
                    node.foffset,
                    Self::base_register(node.mem_space),
                    &comment,
                );
            }
        }
    }

    /// Store AC back into an assignment target. Indexed targets recompute
    /// the element address, which clobbers AC2 only.
    fn generate_target_store(&mut self, ast: &Ast, target: NodeId) {
        match ast.node(target).kind {
            NodeKind::Op(Operation::Index) => {
                let array = ast.node(target).children[0];
                let index = ast.node(target).children[1];
                if let (Some(array), Some(index)) = (array, index) {
                    self.builder
                        .emit_memory(RM::Store, AC, self.toffset, FP, "push value");
                    self.toffset -= 1;
                    self.generate_expression(ast, index);
                    self.builder
                        .emit_memory(RM::LoadAddress, AC1, 0, AC, "index in ac1");
                    self.generate_element_address(ast, array, AC1);
                    self.toffset += 1;
                    self.builder
                        .emit_memory(RM::Load, AC, self.toffset, FP, "pop value");
                    self.builder.emit_memory(RM::Store, AC, 0, AC2, "save element");
                }
            }
            _ => {
                let node = ast.node(target);
                let comment = format!("save {}", node.text());
                self.builder.emit_memory(
                    RM::Store,
                    AC,
                    node.foffset,
                    Self::base_register(node.mem_space),
                    &comment,
                );
            }
        }
    }

    /// Copy the array value of `source` (an address-valued expression) into
    /// the array at offset(base): length word plus elements.
    fn generate_array_copy(
        &mut self,
        ast: &Ast,
        source: NodeId,
        foffset: i32,
        base: i32,
        comment: &str,
    ) {
        self.generate_expression(ast, source);
        self.builder
            .emit_memory(RM::LoadAddress, AC1, foffset, base, "destination address");
        self.builder
            .emit_memory(RM::Load, AC2, 0, AC, "source length");
        self.builder
            .emit_memory(RM::LoadAddress, AC2, 1, AC2, "words to copy");
        self.builder.emit_register(RO::Mov, AC1, AC, AC2, comment);
    }

    fn generate_operation(&mut self, ast: &Ast, id: NodeId, op: Operation) {
        match op {
            Operation::Index => {
                let array = ast.node(id).children[0];
                let index = ast.node(id).children[1];
                if let (Some(array), Some(index)) = (array, index) {
                    self.generate_expression(ast, index);
                    self.generate_element_address(ast, array, AC);
                    self.builder.emit_memory(RM::Load, AC, 0, AC2, "load element");
                }
            }
            Operation::Not => {
                self.generate_operand(ast, id, 0);
                self.builder.emit_register(RO::Not, AC, AC, AC, "not");
            }
            Operation::Negate => {
                self.generate_operand(ast, id, 0);
                self.builder.emit_register(RO::Neg, AC, AC, AC, "negate");
            }
            Operation::Random => {
                self.generate_operand(ast, id, 0);
                self.builder.emit_register(RO::Rnd, AC, AC, AC, "random");
            }
            Operation::SizeOf => {
                if let Some(operand) = ast.node(id).children[0] {
                    // The length word holds the array size.
                    self.generate_array_address(ast, operand, AC);
                    self.builder.emit_memory(RM::Load, AC, 0, AC, "load array length");
                }
            }
            binary => {
                self.generate_operand(ast, id, 0);
                self.builder
                    .emit_memory(RM::Store, AC, self.toffset, FP, "push left operand");
                self.toffset -= 1;
                self.generate_operand(ast, id, 1);
                self.toffset += 1;
                self.builder
                    .emit_memory(RM::Load, AC1, self.toffset, FP, "pop left operand");

                let machine_op = match binary {
                    Operation::Or => RO::Or,
                    Operation::And => RO::And,
                    Operation::Less => RO::TestLess,
                    Operation::LessEqual => RO::TestLessEqual,
                    Operation::Greater => RO::TestGreater,
                    Operation::GreaterEqual => RO::TestGreaterEqual,
                    Operation::Equal => RO::TestEqual,
                    Operation::NotEqual => RO::TestNotEqual,
                    Operation::Add => RO::Add,
                    Operation::Sub => RO::Sub,
                    Operation::Mul => RO::Mul,
                    Operation::Div => RO::Div,
                    _ => RO::Mod,
                };
                self.builder
                    .emit_register(machine_op, AC, AC1, AC, binary.text());
            }
        }
    }

    fn generate_operand(&mut self, ast: &Ast, id: NodeId, slot: usize) {
        if let Some(operand) = ast.node(id).children[slot] {
            self.generate_expression(ast, operand);
        }
    }

    fn base_register(mem_space: MemSpace) -> i32 {
        match mem_space {
            MemSpace::Global | MemSpace::Static => GP,
            _ => FP,
        }
    }
}
