use super::tiny_program::{MemoryOp, RegisterOp, TinyInstruction, TinyProgram};

/// Address operand of a register-memory instruction: either a literal
/// offset, or a reference to a label that is resolved at finalisation.
#[derive(Debug, Clone, Copy)]
pub enum Operand {
    Value(i32),
    /// Replaced with the absolute instruction index of the label.
    Absolute(u64),
    /// Replaced with the distance from the next instruction to the label,
    /// the form program-counter-relative jumps want.
    Relative(u64),
}

/// TinyIR is the linear item format the builder accumulates before label
/// resolution.
enum TinyIR {
    Register {
        op: RegisterOp,
        r: i32,
        s: i32,
        t: i32,
        comment: String,
    },
    Memory {
        op: MemoryOp,
        r: i32,
        offset: Operand,
        base: i32,
        comment: String,
    },
    /// Label uses a unique id to bookmark an instruction
    Label(u64),
    /// Comments are purely decorative standalone lines
    Comment(String),
}

/// TinyProgramBuilder is a builder utility that lays a program out
/// linearly. Its label generation and referencing remove the need to know
/// jump distances while emitting: create a label, reference it from any
/// instruction, set it where it belongs, and finalisation patches every
/// reference with the resolved instruction index.
pub struct TinyProgramBuilder {
    program_out: Vec<TinyIR>,
    label_count: u64,
}

impl TinyProgramBuilder {
    pub fn new() -> Self {
        Self {
            program_out: vec![],
            label_count: 0,
        }
    }

    /// Emit a register-to-register instruction.
    pub fn emit_register(&mut self, op: RegisterOp, r: i32, s: i32, t: i32, comment: &str) {
        self.program_out.push(TinyIR::Register {
            op,
            r,
            s,
            t,
            comment: String::from(comment),
        });
    }

    /// Emit a register-memory instruction with a literal offset.
    pub fn emit_memory(&mut self, op: MemoryOp, r: i32, offset: i32, base: i32, comment: &str) {
        self.emit_memory_ref(op, r, Operand::Value(offset), base, comment);
    }

    /// Emit a register-memory instruction whose offset may reference a
    /// label.
    pub fn emit_memory_ref(
        &mut self,
        op: MemoryOp,
        r: i32,
        offset: Operand,
        base: i32,
        comment: &str,
    ) {
        self.program_out.push(TinyIR::Memory {
            op,
            r,
            offset,
            base,
            comment: String::from(comment),
        });
    }

    /// Comment emits a standalone decorative line ahead of the next
    /// instruction.
    pub fn comment(&mut self, comment: &str) {
        self.program_out.push(TinyIR::Comment(String::from(comment)));
    }

    /// Create label generates a new unique label id to address specific
    /// instruction indices in the code.
    ///
    /// ## Typical Usage
    /// let exit = builder.create_label();
    /// builder.emit_memory_ref(MemoryOp::JumpZero, AC, Operand::Relative(exit), PC, "");
    /// ... // generate instructions
    /// builder.set_label(exit);
    pub fn create_label(&mut self) -> u64 {
        let label = self.label_count;
        self.label_count += 1;
        label
    }

    /// Sets a label location within the code. On finalisation the label
    /// itself takes no instruction slot; references to it resolve to the
    /// index of the instruction that follows it.
    pub fn set_label(&mut self, label: u64) {
        self.program_out.push(TinyIR::Label(label));
    }

    /// Resolves all labels and produces the program, consuming the builder.
    pub fn finalize(self) -> TinyProgram {
        let locations = self.label_locations();

        let mut program = TinyProgram::default();
        let mut line: i32 = 0;
        for item in self.program_out {
            match item {
                TinyIR::Register { op, r, s, t, comment } => {
                    program.push(TinyInstruction::Register { op, r, s, t, comment });
                    line += 1;
                }
                TinyIR::Memory { op, r, offset, base, comment } => {
                    let offset = match offset {
                        Operand::Value(value) => value,
                        Operand::Absolute(label) => locations[label as usize],
                        Operand::Relative(label) => locations[label as usize] - (line + 1),
                    };
                    program.push(TinyInstruction::Memory { op, r, offset, base, comment });
                    line += 1;
                }
                TinyIR::Label(_) => {}
                TinyIR::Comment(comment) => {
                    program.push(TinyInstruction::Comment(comment));
                }
            }
        }

        program
    }

    /// First pass: labels and comments occupy no instruction slot, so walk
    /// the items counting only real instructions.
    fn label_locations(&self) -> Vec<i32> {
        let mut locations = vec![0; self.label_count as usize];
        let mut line: i32 = 0;

        for item in &self.program_out {
            match item {
                TinyIR::Label(label) => locations[*label as usize] = line,
                TinyIR::Comment(_) => {}
                _ => line += 1,
            }
        }

        locations
    }
}
