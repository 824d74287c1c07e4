use super::ast::Ast;
use super::diagnostics::Diagnostics;

pub mod cminus_pest_parser;

#[cfg(test)]
mod test;

/// Parser handles interpretation of source text into the intermediate
/// representation. Put another way the parser turns a source string into an
/// abstract syntax tree. Syntax problems are reported through the
/// diagnostics sink; a tree with parse errors is never handed to semantic
/// analysis.
pub trait AstParser {
    /// Creates a default configuration of an AstParser
    fn default() -> Self;

    /// Parse a source string into an Abstract Syntax Tree
    fn parse(self, source: &str, diagnostics: &mut Diagnostics) -> Ast;
}

// Concrete Definition Export
pub use self::cminus_pest_parser::PestCMinusParser;
