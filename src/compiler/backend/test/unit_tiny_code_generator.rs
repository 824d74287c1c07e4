use crate::compiler::backend::tiny_program::TinyInstruction;
use crate::compiler::diagnostics::Diagnostics;
use crate::compiler::{
    CMinusSemanticAnalyser, Compiler, PestCMinusParser, TinyCodeGenerator,
};

fn compile(source: &str) -> (String, usize) {
    let mut diagnostics = Diagnostics::new();
    let compiler: Compiler<PestCMinusParser, CMinusSemanticAnalyser, TinyCodeGenerator> =
        Compiler::default();
    let program = compiler
        .compile_str(source, &mut diagnostics)
        .unwrap_or_else(|| {
            panic!("compilation failed:\n{}", diagnostics.report());
        });
    (format!("{}", program), program.len())
}

#[test]
fn test_program_scaffolding() {
    let (text, length) = compile("main() {\n  return;\n}\n");

    assert!(length > 0);
    assert!(text.contains("* FUNCTION main"));
    assert!(text.contains("* INIT"));
    assert!(text.contains("HALT"));
    // The entry instruction jumps over the function bodies to init.
    assert!(text.starts_with("* C- compiler for the tiny machine\n  0:    LDC  7,"));
}

#[test]
fn test_builtin_functions_are_emitted() {
    let (text, _) = compile("main() {\n  output(1);\n  outnl();\n}\n");

    for name in ["input", "inputb", "inputc", "output", "outputb", "outputc", "outnl"] {
        assert!(
            text.contains(&format!("* FUNCTION {}", name)),
            "missing builtin {}",
            name
        );
    }
    assert!(text.contains("OUT"));
    assert!(text.contains("OUTNL"));
}

#[test]
fn test_globals_are_initialized_before_main() {
    let (text, _) = compile("int a[4];\nint x: 3;\nmain() {\n  x = a[0] + x;\n}\n");

    assert!(text.contains("save size of array a"));
    assert!(text.contains("initialize x"));
    assert!(text.contains("jump to main"));
}

#[test]
fn test_loops_and_breaks_generate_jumps() {
    let source = "\
main() {
  int i;
  i = 0;
  while true do {
    i++;
    if i == 3 then break;
  }
  for j = 1 to 10 by 2 do output(j);
}
";
    let (text, _) = compile(source);

    assert!(text.contains("* WHILE"));
    assert!(text.contains("* FOR"));
    assert!(text.contains("break"));
    assert!(text.contains("JZR"));
    assert!(text.contains("JNZ"));
}

#[test]
fn test_no_program_when_errors_exist() {
    let mut diagnostics = Diagnostics::new();
    let compiler: Compiler<PestCMinusParser, CMinusSemanticAnalyser, TinyCodeGenerator> =
        Compiler::default();
    let program = compiler.compile_str("main() { break; }\n", &mut diagnostics);

    assert!(program.is_none());
    assert_eq!(diagnostics.error_count(), 1);
}

#[test]
fn test_display_numbers_instructions_consecutively() {
    let mut diagnostics = Diagnostics::new();
    let compiler: Compiler<PestCMinusParser, CMinusSemanticAnalyser, TinyCodeGenerator> =
        Compiler::default();
    let program = compiler
        .compile_str("main() { return; }\n", &mut diagnostics)
        .expect("clean program");

    let mut expected_index = 0;
    for line in format!("{}", program).lines() {
        if line.starts_with('*') {
            continue;
        }
        let index: usize = line
            .split(':')
            .next()
            .expect("instruction index")
            .trim()
            .parse()
            .expect("numeric instruction index");
        assert_eq!(index, expected_index);
        expected_index += 1;
    }
    assert_eq!(expected_index, program.len());

    // Every instruction slot is a real register or memory instruction.
    assert!(program
        .instructions()
        .iter()
        .any(|instruction| matches!(instruction, TinyInstruction::Register { .. })));
}
