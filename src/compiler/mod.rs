pub mod ast;
pub mod backend;
pub mod diagnostics;
pub mod parser;
pub mod semantic_analyser;

use std::error::Error;
use std::fs;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use simple_error::bail;

// Interface Definitions
use self::ast::AstPrinter;
use self::backend::BackEndGenerator;
use self::backend::TinyProgram;
use self::diagnostics::Diagnostics;
use self::parser::AstParser;
use self::semantic_analyser::SemanticAnalyser;

// Concrete Definitions Re-Export
pub use self::backend::TinyCodeGenerator;
pub use self::parser::PestCMinusParser;
pub use self::semantic_analyser::CMinusSemanticAnalyser;

/// Compiler is a simple class that holds the configuration of a compilation
/// run. Compiler takes three typed parameters defining:
///  the AstParser being used,
///  the SemanticAnalyser being used,
///  and the BackEndGenerator being used.
///
/// # Compilation Diagram
/// source -> AstParser -> Ast -> SemanticAnalyser -> Annotated Ast -> BackEndGenerator -> TinyProgram
///
/// Diagnostics accumulate in the sink the caller provides; the tree print
/// switches reproduce the driver's -p / -P / -M behavior, with the typed
/// and memory forms shown only when analysis left zero errors.
pub struct Compiler<P: AstParser, A: SemanticAnalyser, G: BackEndGenerator> {
    parser: P,
    semantic_analyser: A,
    generator: G,
    print_ast: bool,
    print_typed_ast: bool,
    print_memory_ast: bool,
    report: bool,
}

#[allow(dead_code)] // Many of the functions on compiler act as a library interface and are not used
impl<P: AstParser, A: SemanticAnalyser, G: BackEndGenerator> Compiler<P, A, G> {
    /// Default generates a default compiler configuration. Default
    /// configuration is determined by the default methods of the parser,
    /// analyser and generator.
    pub fn default() -> Self {
        Compiler {
            parser: P::default(),
            semantic_analyser: A::default(),
            generator: G::default(),
            print_ast: false,
            print_typed_ast: false,
            print_memory_ast: false,
            report: false,
        }
    }

    /// Create new compiler using a preconfigured parser, analyser and
    /// generator.
    pub fn new(parser: P, semantic_analyser: A, generator: G) -> Self {
        Compiler {
            parser,
            semantic_analyser,
            generator,
            print_ast: false,
            print_typed_ast: false,
            print_memory_ast: false,
            report: false,
        }
    }

    /// Print the tree right after parsing, without annotations.
    pub fn set_print_ast(mut self, enabled: bool) -> Self {
        self.print_ast = enabled;
        self
    }

    /// Print the tree with type annotations after a clean analysis.
    pub fn set_print_typed_ast(mut self, enabled: bool) -> Self {
        self.print_typed_ast = enabled;
        self
    }

    /// Print the tree with type and memory annotations after a clean
    /// analysis, followed by the end-of-global-space offset.
    pub fn set_print_memory_ast(mut self, enabled: bool) -> Self {
        self.print_memory_ast = enabled;
        self
    }

    /// Stream diagnostics to stdout at each stage boundary instead of only
    /// collecting them. The CLI driver turns this on; tests leave it off
    /// and inspect the sink.
    pub fn set_reporting(mut self, enabled: bool) -> Self {
        self.report = enabled;
        self
    }

    /// Compiles a source string into tiny machine program code.
    /// Returns None when parsing or analysis reported errors; the code
    /// generator only runs on a clean tree.
    pub fn compile_str(self, source: &str, diagnostics: &mut Diagnostics) -> Option<TinyProgram> {
        let mut ast = self.parser.parse(source, diagnostics);
        if self.report {
            diagnostics.flush_to(&mut std::io::stdout());
        }
        if self.print_ast {
            print!("{}", AstPrinter::plain().print(&ast));
        }
        if diagnostics.error_count() > 0 {
            return None;
        }

        let global_offset = self.semantic_analyser.analyse(&mut ast, diagnostics);
        if self.report {
            diagnostics.flush_to(&mut std::io::stdout());
        }
        if diagnostics.error_count() == 0 {
            if self.print_typed_ast {
                print!("{}", AstPrinter::typed().print(&ast));
            }
            if self.print_memory_ast {
                print!("{}", AstPrinter::with_memory().print(&ast));
                println!("Offset for end of global space: {}", global_offset);
            }
        }
        if diagnostics.error_count() > 0 {
            return None;
        }

        Some(self.generator.generate(&ast, global_offset))
    }

    /// Compiles a program file into tiny machine program code.
    /// @return: the program if compilation ran, otherwise the IO error from
    /// a failed read.
    pub fn compile(
        self,
        source_filename: &Path,
        diagnostics: &mut Diagnostics,
    ) -> Result<Option<TinyProgram>, Box<dyn Error>> {
        let source_str = fs::read_to_string(source_filename)?;

        Ok(self.compile_str(source_str.as_str(), diagnostics))
    }

    /// Compiles a program file and writes the program code encoded as text
    /// into the destination file path.
    pub fn compile_and_save(
        self,
        source_filename: &Path,
        dest_filename: &Path,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), Box<dyn Error>> {
        match self.compile(source_filename, diagnostics)? {
            Some(program) => {
                let mut file = File::create(dest_filename)?;
                file.write_all(format!("{}", program).as_bytes())?;
                Ok(())
            }
            None => bail!(
                "compilation stopped with {} error(s)",
                diagnostics.error_count()
            ),
        }
    }
}
