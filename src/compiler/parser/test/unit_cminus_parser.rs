use crate::compiler::ast::{
    AssignOp, Ast, ExpType, Literal, NodeId, NodeKind, Operation,
};
use crate::compiler::diagnostics::Diagnostics;
use crate::compiler::parser::{AstParser, PestCMinusParser};

fn parse(source: &str) -> (Ast, Diagnostics) {
    let mut diagnostics = Diagnostics::new();
    let ast = PestCMinusParser::default().parse(source, &mut diagnostics);
    (ast, diagnostics)
}

fn parse_clean(source: &str) -> Ast {
    let (ast, diagnostics) = parse(source);
    assert_eq!(
        diagnostics.error_count(),
        0,
        "unexpected syntax errors:\n{}",
        diagnostics.report()
    );
    ast
}

/// The statements of main's body, as a vector of node handles.
fn main_statements(ast: &Ast) -> Vec<NodeId> {
    let mut declaration = ast.root();
    while let Some(id) = declaration {
        if ast.node(id).kind.name() == Some("main") {
            let body = ast.node(id).children[1].expect("main body");
            let mut statements = vec![];
            let mut statement = ast.node(body).children[1];
            while let Some(id) = statement {
                statements.push(id);
                statement = ast.node(id).sibling;
            }
            return statements;
        }
        declaration = ast.node(id).sibling;
    }
    panic!("no main in source");
}

#[test]
fn test_parse_global_declarations() {
    let ast = parse_clean("int x, y[10];\nbool b;\n");

    let x = ast.root().expect("root");
    assert_eq!(ast.node(x).kind.name(), Some("x"));
    assert_eq!(ast.node(x).exp_type, ExpType::Int);
    assert_eq!(ast.node(x).size, 1);
    assert!(!ast.node(x).is_array);
    assert_eq!(ast.node(x).line, 1);

    let y = ast.node(x).sibling.expect("y");
    assert!(ast.node(y).is_array);
    assert_eq!(ast.node(y).size, 11);

    let b = ast.node(y).sibling.expect("b");
    assert_eq!(ast.node(b).exp_type, ExpType::Bool);
    assert_eq!(ast.node(b).line, 2);
}

#[test]
fn test_parse_static_declaration_with_initializer() {
    let ast = parse_clean("main() {\n  static int s: 4 + 1;\n}\n");

    let main = ast.root().expect("main");
    let body = ast.node(main).children[1].expect("body");
    let s = ast.node(body).children[0].expect("s");

    assert!(ast.node(s).is_static);
    let init = ast.node(s).children[0].expect("initializer");
    assert!(matches!(ast.node(init).kind, NodeKind::Op(Operation::Add)));
}

#[test]
fn test_parse_function_with_parameter_groups() {
    let ast = parse_clean("int f(int a, b; bool c[]) {\n  return 1;\n}\nmain() { }\n");

    let f = ast.root().expect("f");
    assert_eq!(ast.node(f).exp_type, ExpType::Int);

    let a = ast.node(f).children[0].expect("a");
    assert!(matches!(ast.node(a).kind, NodeKind::Parm { .. }));
    assert_eq!(ast.node(a).exp_type, ExpType::Int);
    assert_eq!(ast.node(a).size, 1);

    let b = ast.node(a).sibling.expect("b");
    assert_eq!(ast.node(b).exp_type, ExpType::Int);

    let c = ast.node(b).sibling.expect("c");
    assert_eq!(ast.node(c).exp_type, ExpType::Bool);
    assert!(ast.node(c).is_array);
    assert_eq!(ast.node(c).size, 1);
    assert!(ast.node(c).sibling.is_none());
}

#[test]
fn test_missing_return_type_means_void() {
    let ast = parse_clean("main() { }\n");

    let main = ast.root().expect("main");
    assert!(ast.node(main).is_func());
    assert_eq!(ast.node(main).exp_type, ExpType::Void);
}

#[test]
fn test_operator_precedence() {
    let ast = parse_clean("main() { x = 1 + 2 * 3; }\n");
    let statements = main_statements(&ast);

    let assign = statements[0];
    assert!(matches!(
        ast.node(assign).kind,
        NodeKind::Assign(AssignOp::Assign)
    ));

    let add = ast.node(assign).children[1].expect("sum");
    assert!(matches!(ast.node(add).kind, NodeKind::Op(Operation::Add)));

    let one = ast.node(add).children[0].expect("lhs");
    assert!(matches!(
        ast.node(one).kind,
        NodeKind::Const(Literal::Int(1))
    ));

    let mul = ast.node(add).children[1].expect("rhs");
    assert!(matches!(ast.node(mul).kind, NodeKind::Op(Operation::Mul)));
}

#[test]
fn test_operator_nodes_carry_preset_types() {
    let ast = parse_clean("main() { b = not (1 < 2) and true; }\n");
    let statements = main_statements(&ast);

    let assign = statements[0];
    let and = ast.node(assign).children[1].expect("and");
    assert!(matches!(ast.node(and).kind, NodeKind::Op(Operation::And)));
    assert_eq!(ast.node(and).exp_type, ExpType::Bool);

    let not = ast.node(and).children[0].expect("not");
    assert!(matches!(ast.node(not).kind, NodeKind::Op(Operation::Not)));
    assert_eq!(ast.node(not).exp_type, ExpType::Bool);

    let less = ast.node(not).children[0].expect("comparison");
    assert!(matches!(ast.node(less).kind, NodeKind::Op(Operation::Less)));
    assert_eq!(ast.node(less).exp_type, ExpType::Bool);
}

#[test]
fn test_sizeof_and_multiplication_share_a_spelling() {
    let ast = parse_clean("main() { x = *a * 2; }\n");
    let statements = main_statements(&ast);

    let assign = statements[0];
    let mul = ast.node(assign).children[1].expect("product");
    assert!(matches!(ast.node(mul).kind, NodeKind::Op(Operation::Mul)));

    let sizeof = ast.node(mul).children[0].expect("sizeof");
    assert!(matches!(
        ast.node(sizeof).kind,
        NodeKind::Op(Operation::SizeOf)
    ));
    // Same display text, distinct operations.
    assert_eq!(ast.node(sizeof).text(), ast.node(mul).text());
    assert_eq!(ast.node(sizeof).exp_type, ExpType::Int);
}

#[test]
fn test_parse_for_loop() {
    let ast = parse_clean("main() {\n  for i = 1 to 10 by 2 do break;\n}\n");
    let statements = main_statements(&ast);

    let for_stmt = statements[0];
    assert!(matches!(ast.node(for_stmt).kind, NodeKind::For));

    let iterator = ast.node(for_stmt).children[0].expect("iterator");
    assert!(matches!(ast.node(iterator).kind, NodeKind::Var { .. }));
    assert!(ast.node(iterator).is_iter_var);
    assert!(ast.node(iterator).inited);
    assert_eq!(ast.node(iterator).exp_type, ExpType::Int);

    let range = ast.node(for_stmt).children[1].expect("range");
    assert!(matches!(ast.node(range).kind, NodeKind::Range));
    assert!(ast.node(range).children.iter().all(|child| child.is_some()));

    let body = ast.node(for_stmt).children[2].expect("body");
    assert!(matches!(ast.node(body).kind, NodeKind::Break));
}

#[test]
fn test_parse_for_loop_without_step() {
    let ast = parse_clean("main() {\n  for i = 1 to 10 do break;\n}\n");
    let statements = main_statements(&ast);

    let range = ast.node(statements[0]).children[1].expect("range");
    assert!(ast.node(range).children[0].is_some());
    assert!(ast.node(range).children[1].is_some());
    assert!(ast.node(range).children[2].is_none());
}

#[test]
fn test_parse_if_else() {
    let ast = parse_clean("main() {\n  if a < b then a = 1; else b = 1;\n}\n");
    let statements = main_statements(&ast);

    let if_stmt = statements[0];
    assert!(matches!(ast.node(if_stmt).kind, NodeKind::If));
    assert!(ast.node(if_stmt).children[0].is_some());
    assert!(ast.node(if_stmt).children[1].is_some());
    assert!(ast.node(if_stmt).children[2].is_some());
}

#[test]
fn test_parse_constants() {
    let ast = parse_clean("main() {\n  outputc('a');\n  output(10);\n  outputb(true);\n}\n");
    let statements = main_statements(&ast);

    let char_call = statements[0];
    let character = ast.node(char_call).children[0].expect("argument");
    assert!(matches!(
        ast.node(character).kind,
        NodeKind::Const(Literal::Char('a'))
    ));
    assert_eq!(ast.node(character).exp_type, ExpType::Char);

    let int_call = statements[1];
    let integer = ast.node(int_call).children[0].expect("argument");
    assert!(matches!(
        ast.node(integer).kind,
        NodeKind::Const(Literal::Int(10))
    ));

    let bool_call = statements[2];
    let boolean = ast.node(bool_call).children[0].expect("argument");
    assert!(matches!(
        ast.node(boolean).kind,
        NodeKind::Const(Literal::Bool(true))
    ));
}

#[test]
fn test_parse_string_constant() {
    let ast = parse_clean("main() { c = \"hi\\n\"; }\n");
    let statements = main_statements(&ast);

    let assign = statements[0];
    let string = ast.node(assign).children[1].expect("string");
    match &ast.node(string).kind {
        NodeKind::Const(Literal::Str(value)) => assert_eq!(value.as_str(), "hi\n"),
        kind => panic!("expected a string constant, found {:?}", kind),
    }
    assert!(ast.node(string).is_array);
    assert_eq!(ast.node(string).exp_type, ExpType::Char);
    // Three characters plus the length word.
    assert_eq!(ast.node(string).size, 4);
}

#[test]
fn test_parse_increment_and_compound_assignment() {
    let ast = parse_clean("main() {\n  x++;\n  x += 2;\n}\n");
    let statements = main_statements(&ast);

    assert!(matches!(
        ast.node(statements[0]).kind,
        NodeKind::Assign(AssignOp::Increment)
    ));
    assert_eq!(ast.node(statements[0]).exp_type, ExpType::Int);

    assert!(matches!(
        ast.node(statements[1]).kind,
        NodeKind::Assign(AssignOp::AddAssign)
    ));
    assert_eq!(ast.node(statements[1]).exp_type, ExpType::Int);
}

#[test]
fn test_parse_array_index_target() {
    let ast = parse_clean("main() { a[i + 1] = 0; }\n");
    let statements = main_statements(&ast);

    let assign = statements[0];
    let bracket = ast.node(assign).children[0].expect("target");
    assert!(matches!(
        ast.node(bracket).kind,
        NodeKind::Op(Operation::Index)
    ));
    assert_eq!(ast.node(bracket).text(), "[");

    let array = ast.node(bracket).children[0].expect("array");
    assert!(matches!(ast.node(array).kind, NodeKind::Id { .. }));
}

#[test]
fn test_keywords_do_not_eat_identifier_prefixes() {
    let ast = parse_clean("int iffy;\nmain() { iffy = 1; }\n");

    let iffy = ast.root().expect("root");
    assert_eq!(ast.node(iffy).kind.name(), Some("iffy"));
}

#[test]
fn test_syntax_error_is_reported_with_a_line() {
    let (ast, diagnostics) = parse("int x;\nint ;\n");

    assert_eq!(diagnostics.error_count(), 1);
    assert_eq!(
        format!("{}", diagnostics.entries()[0]),
        "ERROR(2): Syntax error in input."
    );
    assert!(ast.root().is_none());
}
