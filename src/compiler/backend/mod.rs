mod program_code_builder;
mod tiny_code_generator;
pub mod tiny_program;

#[cfg(test)]
mod test;

use super::ast::Ast;

// Abstract Definitions

/// BackEndGenerator takes a fully annotated AbstractSyntaxTree and the final
/// offset of the global frame and generates a tiny machine program.
pub trait BackEndGenerator {
    /// Generate default generator configuration
    fn default() -> Self;

    /// Generate program code from an analysed abstract syntax tree
    fn generate(self, ast: &Ast, global_offset: i32) -> tiny_program::TinyProgram;
}

// Concrete Definition Export
pub use self::tiny_code_generator::TinyCodeGenerator;
pub use self::tiny_program::TinyProgram;
