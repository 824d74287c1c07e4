use crate::compiler::ast::{Ast, AstPrinter, ExpType, MemSpace, NodeId};
use crate::compiler::diagnostics::{Diagnostics, Severity};
use crate::compiler::parser::{AstParser, PestCMinusParser};
use crate::compiler::semantic_analyser::{CMinusSemanticAnalyser, SemanticAnalyser};

/// Parse and analyse a source string, returning the annotated tree, the
/// diagnostics and the final global frame offset.
fn analyse(source: &str) -> (Ast, Diagnostics, i32) {
    let mut diagnostics = Diagnostics::new();
    let mut ast = PestCMinusParser::default().parse(source, &mut diagnostics);
    assert_eq!(
        diagnostics.error_count(),
        0,
        "unexpected syntax errors:\n{}",
        diagnostics.report()
    );
    let global_offset = CMinusSemanticAnalyser::default().analyse(&mut ast, &mut diagnostics);
    (ast, diagnostics, global_offset)
}

fn find_decl(ast: &Ast, name: &str) -> NodeId {
    let mut declaration = ast.root();
    while let Some(id) = declaration {
        if ast.node(id).kind.name() == Some(name) {
            return id;
        }
        declaration = ast.node(id).sibling;
    }
    panic!("declaration '{}' not found", name);
}

/// Every diagnostic, rendered, in emission order.
fn messages(diagnostics: &Diagnostics) -> Vec<String> {
    diagnostics
        .entries()
        .iter()
        .map(|entry| format!("{}", entry))
        .collect()
}

/// Only the counted errors, rendered, in emission order.
fn errors(diagnostics: &Diagnostics) -> Vec<String> {
    diagnostics
        .entries()
        .iter()
        .filter(|entry| entry.severity == Severity::Error)
        .map(|entry| format!("{}", entry))
        .collect()
}

#[test]
fn test_duplicate_declaration() {
    let (_, diagnostics, _) = analyse("int x;\nint x;\nmain() { x = 1; }\n");

    assert_eq!(diagnostics.error_count(), 1);
    assert_eq!(diagnostics.warning_count(), 0);
    assert_eq!(
        errors(&diagnostics)[0],
        "ERROR(2): Symbol 'x' is already declared at line 1."
    );
}

#[test]
fn test_use_before_initialization_warns_once() {
    let (_, diagnostics, _) = analyse("int x;\nmain() {\n  x = x + 1;\n  return;\n}\n");

    assert_eq!(diagnostics.error_count(), 0);
    assert_eq!(diagnostics.warning_count(), 1);
    assert_eq!(
        messages(&diagnostics)[0],
        "WARNING(3): Variable 'x' may be uninitialized when used here."
    );
}

#[test]
fn test_missing_main_is_a_linker_error() {
    let (_, diagnostics, _) = analyse("int q;\nfoo() { q = 1; }\n");

    assert_eq!(diagnostics.error_count(), 1);
    assert!(messages(&diagnostics).contains(&String::from(
        "ERROR(LINKER): A function named 'main' with no parameters must be defined."
    )));
}

#[test]
fn test_main_with_parameters_is_a_linker_error() {
    let (_, diagnostics, _) = analyse("main(int argc) { argc = 0; }\n");

    assert_eq!(diagnostics.error_count(), 1);
    assert!(messages(&diagnostics).contains(&String::from(
        "ERROR(LINKER): A function named 'main' with no parameters must be defined."
    )));
}

#[test]
fn test_break_outside_loop() {
    let (_, diagnostics, _) = analyse("main() {\n  break;\n  return;\n}\n");

    assert_eq!(diagnostics.error_count(), 1);
    assert_eq!(
        errors(&diagnostics)[0],
        "ERROR(2): Cannot have a break statement outside of loop."
    );
}

#[test]
fn test_break_inside_loop_is_accepted() {
    let (_, diagnostics, _) = analyse("main() { while true do break; }\n");

    assert_eq!(diagnostics.error_count(), 0);
}

#[test]
fn test_global_array_frame_layout() {
    let (ast, diagnostics, global_offset) =
        analyse("int a[10];\nmain() {\n  a[0] = 1;\n  return;\n}\n");

    assert_eq!(diagnostics.error_count(), 0);
    let a = find_decl(&ast, "a");
    assert!(ast.node(a).is_array);
    assert_eq!(ast.node(a).size, 11);
    assert_eq!(ast.node(a).mem_space, MemSpace::Global);
    assert_eq!(ast.node(a).foffset, -1);
    assert_eq!(global_offset, -11);
}

#[test]
fn test_function_scope_offsets() {
    let (ast, diagnostics, _) = analyse(
        "f(int p[]) {\n  int q;\n  q = p[1];\n  return;\n}\nmain() {\n  return;\n}\n",
    );

    assert_eq!(diagnostics.error_count(), 0);

    let f = find_decl(&ast, "f");
    let p = ast.node(f).children[0].expect("parameter");
    assert_eq!(ast.node(p).foffset, -2);
    assert_eq!(ast.node(p).mem_space, MemSpace::Parameter);

    let body = ast.node(f).children[1].expect("body");
    let q = ast.node(body).children[0].expect("local");
    assert_eq!(ast.node(q).foffset, -3);
    assert_eq!(ast.node(q).mem_space, MemSpace::Local);

    // The frame to allocate for f covers both reserved slots, the
    // parameter and the local.
    assert_eq!(ast.node(f).size, -4);
}

#[test]
fn test_identifier_inherits_declaration_annotations() {
    let (ast, diagnostics, _) = analyse("int a[3];\nmain() {\n  a[0] = 1;\n}\n");

    assert_eq!(diagnostics.error_count(), 0);
    let a = find_decl(&ast, "a");

    for id in ast.ids() {
        let node = ast.node(id);
        if node.kind.name() == Some("a") && id != a {
            assert_eq!(node.exp_type, ast.node(a).exp_type);
            assert_eq!(node.is_array, ast.node(a).is_array);
            assert_eq!(node.foffset, ast.node(a).foffset);
            assert_eq!(node.mem_space, MemSpace::Global);
        }
    }
    assert!(ast.node(a).used);
}

#[test]
fn test_initializer_type_mismatch_has_no_trailing_period() {
    let (_, diagnostics, _) = analyse("int x: true;\nmain() { x = 1; }\n");

    assert_eq!(diagnostics.error_count(), 1);
    assert_eq!(
        errors(&diagnostics)[0],
        "ERROR(1): Initializer for variable 'x' of type int is of type bool"
    );
}

#[test]
fn test_initializer_must_be_constant() {
    let (_, diagnostics, _) = analyse("int a: 3;\nint b: a;\nmain() { b = a; }\n");

    assert_eq!(diagnostics.error_count(), 1);
    assert_eq!(
        errors(&diagnostics)[0],
        "ERROR(2): Initializer for variable 'b' is not a constant expression."
    );
}

#[test]
fn test_constant_expression_initializers_are_accepted() {
    let (_, diagnostics, _) =
        analyse("int a: 2 + 3 * 4;\nbool b: 1 < 2;\nmain() { a = 0; b = false; }\n");

    assert_eq!(diagnostics.error_count(), 0);
}

#[test]
fn test_parameter_checking() {
    let source = "\
f(int x; bool y) {
  return;
}
main() {
  f(1);
  f(1, 2);
  f(true, false);
}
";
    let (_, diagnostics, _) = analyse(source);

    let errors = errors(&diagnostics);
    assert_eq!(diagnostics.error_count(), 3);
    assert_eq!(
        errors[0],
        "ERROR(5): Too few parameters passed for function 'f' declared on line 1."
    );
    assert_eq!(
        errors[1],
        "ERROR(6): Expecting type bool in parameter 2 of call to 'f' declared on line 1 but got type int."
    );
    assert_eq!(
        errors[2],
        "ERROR(7): Expecting type int in parameter 1 of call to 'f' declared on line 1 but got type bool."
    );
}

#[test]
fn test_array_parameter_agreement() {
    let source = "\
f(int x[]) {
  return;
}
int g(int x) {
  return x;
}
main() {
  int a[4];
  int s;
  f(a);
  f(1);
  s = g(a);
}
";
    let (_, diagnostics, _) = analyse(source);

    let errors = errors(&diagnostics);
    assert_eq!(diagnostics.error_count(), 2);
    assert_eq!(
        errors[0],
        "ERROR(11): Expecting array in parameter 1 of call to 'f' declared on line 1."
    );
    assert_eq!(
        errors[1],
        "ERROR(12): Not expecting array in parameter 1 of call to 'g' declared on line 4."
    );
}

#[test]
fn test_if_test_condition_must_be_bool() {
    let (_, diagnostics, _) = analyse("main() { if 1 then return; }\n");

    assert_eq!(diagnostics.error_count(), 1);
    assert_eq!(
        errors(&diagnostics)[0],
        "ERROR(1): Expecting Boolean test condition in if statement but got type int."
    );
}

#[test]
fn test_for_range_positions_must_be_int() {
    let (_, diagnostics, _) = analyse("main() {\n  for i = 1 to true do i++;\n}\n");

    assert_eq!(diagnostics.error_count(), 1);
    assert_eq!(
        errors(&diagnostics)[0],
        "ERROR(2): Expecting type int in position 2 in range of for statement but got type bool."
    );
}

#[test]
fn test_sizeof_requires_an_array() {
    let (_, diagnostics, _) =
        analyse("main() {\n  int a[5];\n  int x;\n  x = *a;\n  x = *x;\n}\n");

    assert_eq!(diagnostics.error_count(), 1);
    assert_eq!(
        errors(&diagnostics)[0],
        "ERROR(5): The operation '*' only works with arrays."
    );
}

#[test]
fn test_bracket_index_checks() {
    let (_, diagnostics, _) =
        analyse("main() {\n  int a[3];\n  int c;\n  c = a[true];\n  c = c[0];\n}\n");

    let errors = errors(&diagnostics);
    assert_eq!(diagnostics.error_count(), 2);
    assert_eq!(
        errors[0],
        "ERROR(4): Array 'a' should be indexed by type int but got type bool."
    );
    assert_eq!(errors[1], "ERROR(5): Cannot index nonarray 'c'.");
}

#[test]
fn test_array_and_scalar_do_not_mix_in_assignment() {
    let (_, diagnostics, _) = analyse("main() {\n  int a[3];\n  a = 5;\n}\n");

    assert_eq!(diagnostics.error_count(), 1);
    assert_eq!(
        errors(&diagnostics)[0],
        "ERROR(3): '=' requires both operands be arrays or not but lhs is an array and rhs is not an array."
    );
}

#[test]
fn test_binary_operand_types() {
    let (_, diagnostics, _) = analyse("main() {\n  int x;\n  x = 1 + true;\n  x = 'a' * 2;\n}\n");

    let errors = errors(&diagnostics);
    assert_eq!(diagnostics.error_count(), 2);
    assert_eq!(
        errors[0],
        "ERROR(3): '+' requires operands of type int but rhs is of type bool."
    );
    assert_eq!(
        errors[1],
        "ERROR(4): '*' requires operands of type int but lhs is of type char."
    );
}

#[test]
fn test_comparison_requires_matching_types() {
    let (_, diagnostics, _) = analyse("main() {\n  bool b;\n  b = 1 < 'a';\n}\n");

    assert_eq!(diagnostics.error_count(), 1);
    assert_eq!(
        errors(&diagnostics)[0],
        "ERROR(3): '<' requires operands of the same type but lhs is type int and rhs is type char."
    );
}

#[test]
fn test_functions_are_not_variables_and_vice_versa() {
    let source = "\
int v;
f() {
  return;
}
main() {
  v();
  f = 3;
}
";
    let (_, diagnostics, _) = analyse(source);

    let messages = messages(&diagnostics);
    assert!(messages.contains(&String::from(
        "ERROR(6): 'v' is a simple variable and cannot be called."
    )));
    assert!(messages.contains(&String::from(
        "ERROR(7): Cannot use function 'f' as a variable."
    )));
}

#[test]
fn test_undeclared_symbol() {
    let (_, diagnostics, _) = analyse("main() { x = 1; }\n");

    assert_eq!(diagnostics.error_count(), 1);
    assert_eq!(
        errors(&diagnostics)[0],
        "ERROR(1): Symbol 'x' is not declared."
    );
}

#[test]
fn test_redeclaring_a_builtin_reports_line_minus_one() {
    let (_, diagnostics, _) = analyse("output(int x) {\n  return;\n}\nmain() { }\n");

    assert!(messages(&diagnostics).contains(&String::from(
        "ERROR(1): Symbol 'output' is already declared at line -1."
    )));
}

#[test]
fn test_local_declaration_may_not_shadow_a_parameter() {
    let (_, diagnostics, _) =
        analyse("f(int x) {\n  int x;\n  x = 0;\n  return;\n}\nmain() { f(1); }\n");

    assert!(messages(&diagnostics)
        .contains(&String::from("ERROR(2): Symbol 'x' is already declared at line 1.")));
}

#[test]
fn test_static_local_lives_in_global_space() {
    let (ast, diagnostics, global_offset) =
        analyse("main() {\n  static int s;\n  s = s + 1;\n}\n");

    assert_eq!(diagnostics.error_count(), 0);
    // Statics are exempt from the uninitialized-use warning.
    assert_eq!(diagnostics.warning_count(), 0);

    let main = find_decl(&ast, "main");
    let body = ast.node(main).children[1].expect("body");
    let s = ast.node(body).children[0].expect("static local");
    assert_eq!(ast.node(s).mem_space, MemSpace::Static);
    assert_eq!(ast.node(s).foffset, 0);
    assert_eq!(global_offset, -1);
    // The static took no local frame slot.
    assert_eq!(ast.node(main).size, -2);
}

#[test]
fn test_string_constant_is_allocated_globally() {
    let (ast, diagnostics, global_offset) =
        analyse("main() {\n  char c[6];\n  c = \"hello\";\n}\n");

    assert_eq!(diagnostics.error_count(), 0);

    let string = ast
        .ids()
        .find(|id| {
            let node = ast.node(*id);
            node.is_array && node.exp_type == ExpType::Char && node.kind.name().is_none()
        })
        .expect("string constant node");
    assert_eq!(ast.node(string).size, 6);
    assert_eq!(ast.node(string).mem_space, MemSpace::Global);
    assert_eq!(ast.node(string).foffset, -1);
    assert_eq!(global_offset, -6);
}

#[test]
fn test_missing_return_in_non_void_function_warns() {
    let (_, diagnostics, _) = analyse("int f() {\n  int x;\n  x = 1;\n}\nmain() { f(); }\n");

    assert_eq!(diagnostics.warning_count(), 1);
    assert_eq!(
        messages(&diagnostics)[0],
        "WARNING(1): Expecting to return type int but function 'f' has no return statement."
    );
}

#[test]
fn test_return_type_checks() {
    let source = "\
f() {
  return 1;
}
int g() {
  return;
}
bool h() {
  return 1;
}
main() {
  f();
  g();
  h();
}
";
    let (_, diagnostics, _) = analyse(source);

    let errors = errors(&diagnostics);
    assert_eq!(diagnostics.error_count(), 3);
    assert_eq!(
        errors[0],
        "ERROR(2): Function 'f' at line 1 is expecting no return value, but return has a value."
    );
    assert_eq!(
        errors[1],
        "ERROR(5): Function 'g' at line 4 is expecting to return type int but return has no value."
    );
    assert_eq!(
        errors[2],
        "ERROR(8): Function 'h' at line 7 is expecting to return type bool but returns type int."
    );
}

#[test]
fn test_returning_an_array_is_rejected() {
    let (_, diagnostics, _) =
        analyse("int f(int a[]) {\n  return a;\n}\nmain() {\n  int b[2];\n  b[0] = f(b);\n}\n");

    assert!(messages(&diagnostics)
        .contains(&String::from("ERROR(2): Cannot return an array.")));
}

#[test]
fn test_unused_symbols_warn_after_the_linker_check() {
    let (_, diagnostics, _) = analyse("int u;\nmain() { return; }\n");

    assert_eq!(diagnostics.error_count(), 0);
    assert_eq!(diagnostics.warning_count(), 1);
    assert_eq!(
        messages(&diagnostics)[0],
        "WARNING(1): The variable 'u' seems not to be used."
    );
}

#[test]
fn test_analysis_is_deterministic_for_a_fresh_parse() {
    let source = "int x;\nmain() {\n  x = x + 1;\n  return;\n}\n";
    let (first_ast, first, first_offset) = analyse(source);
    let (second_ast, second, second_offset) = analyse(source);

    assert_eq!(first.report(), second.report());
    assert_eq!(first_offset, second_offset);
    assert_eq!(
        AstPrinter::with_memory().print(&first_ast),
        AstPrinter::with_memory().print(&second_ast)
    );
}
