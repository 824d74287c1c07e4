use log::debug;

use crate::pest::Parser;

use super::super::ast::{
    AssignOp, Ast, ExpType, Literal, Node, NodeId, NodeKind, Operation,
};
use super::super::diagnostics::Diagnostics;
use super::AstParser;

/// The pest-generated parser for the grammar in src/cminus.pest.
#[derive(Parser)]
#[grammar = "cminus.pest"]
struct CMinusParser;

/// PestCMinusParser is a concrete AstParser.
///
/// It runs the pest grammar over the source text and formalises the token
/// pairs into the arena tree, stamping each node with the line of its first
/// token and the attributes the downstream passes expect to find already
/// set: operator spellings and preset expression types, declaration sizes
/// and flags, and the implicit iterator variable of every for loop.
pub struct PestCMinusParser;

impl AstParser for PestCMinusParser {
    fn default() -> Self {
        PestCMinusParser
    }

    fn parse(self, source: &str, diagnostics: &mut Diagnostics) -> Ast {
        let mut ast = Ast::new();

        match CMinusParser::parse(Rule::program, source) {
            Ok(mut pairs) => {
                let program = pairs.next().expect("grammar produces one program pair");
                let mut head: Option<NodeId> = None;
                let mut count = 0;
                for pair in program.into_inner() {
                    let declaration = match pair.as_rule() {
                        Rule::fun_declaration => self.parse_fun_declaration(pair, &mut ast),
                        Rule::var_declaration => self.parse_var_declaration(pair, &mut ast),
                        Rule::EOI => continue,
                        rule => panic!("Whoops! Unprocessed pest rule: {:?}", rule),
                    };
                    count += 1;
                    match head {
                        None => head = Some(declaration),
                        Some(head) => ast.add_sibling(head, declaration),
                    }
                }
                debug!("parsed {} top-level declarations", count);
                ast.set_root(head);
            }
            Err(error) => {
                let line = match error.line_col {
                    pest::error::LineColLocation::Pos((line, _)) => line,
                    pest::error::LineColLocation::Span((line, _), _) => line,
                };
                diagnostics.error(line as i32, String::from("Syntax error in input."));
            }
        }

        ast
    }
}

/// Declarations.
impl PestCMinusParser {
    fn parse_fun_declaration(&self, pair: pest::iterators::Pair<Rule>, ast: &mut Ast) -> NodeId {
        let line = Self::line_of(&pair);
        let mut inner = pair.into_inner();

        let first = inner.next().expect("function name");
        let (exp_type, name_pair) = if first.as_rule() == Rule::type_spec {
            (
                Self::parse_type(&first),
                inner.next().expect("function name"),
            )
        } else {
            // No return type spelled out means the function returns void.
            (ExpType::Void, first)
        };
        let name = name_pair.as_str().to_string();

        let mut parm_head = None;
        let mut body = None;
        for part in inner {
            match part.as_rule() {
                Rule::parms => parm_head = self.parse_parms(part, ast),
                Rule::compound_stmt => body = Some(self.parse_compound(part, ast)),
                _ => {}
            }
        }

        let mut node = Node::new(NodeKind::Func { name }, line, exp_type);
        node.children[0] = parm_head;
        node.children[1] = body;
        ast.add(node)
    }

    /// One sibling chain holding every parameter of the function, in
    /// declaration order across the type groups.
    fn parse_parms(&self, pair: pest::iterators::Pair<Rule>, ast: &mut Ast) -> Option<NodeId> {
        let mut head: Option<NodeId> = None;

        for group in pair.into_inner() {
            let mut inner = group.into_inner();
            let type_pair = inner.next().expect("parameter type");
            let exp_type = Self::parse_type(&type_pair);

            for parm_id in inner {
                let line = Self::line_of(&parm_id);
                let mut parts = parm_id.into_inner();
                let name = parts.next().expect("parameter name").as_str().to_string();
                let is_array = parts.next().is_some();

                let mut node = Node::new(NodeKind::Parm { name }, line, exp_type);
                // Array parameters are passed by reference, so every
                // parameter takes exactly one word.
                node.size = 1;
                node.is_array = is_array;
                let node = ast.add(node);

                match head {
                    None => head = Some(node),
                    Some(head) => ast.add_sibling(head, node),
                }
            }
        }

        head
    }

    fn parse_var_declaration(&self, pair: pest::iterators::Pair<Rule>, ast: &mut Ast) -> NodeId {
        let mut is_static = false;
        let mut exp_type = ExpType::Undefined;
        let mut head: Option<NodeId> = None;

        for part in pair.into_inner() {
            match part.as_rule() {
                Rule::kw_static => is_static = true,
                Rule::type_spec => exp_type = Self::parse_type(&part),
                Rule::var_decl_init => {
                    let node = self.parse_var_decl_init(part, ast, exp_type, is_static);
                    match head {
                        None => head = Some(node),
                        Some(head) => ast.add_sibling(head, node),
                    }
                }
                rule => panic!("Whoops! Unprocessed pest rule: {:?}", rule),
            }
        }

        head.expect("declaration names at least one variable")
    }

    fn parse_var_decl_init(
        &self,
        pair: pest::iterators::Pair<Rule>,
        ast: &mut Ast,
        exp_type: ExpType,
        is_static: bool,
    ) -> NodeId {
        let mut inner = pair.into_inner();
        let decl_id = inner.next().expect("declarator");
        let line = Self::line_of(&decl_id);

        let mut parts = decl_id.into_inner();
        let name = parts.next().expect("variable name").as_str().to_string();
        let array_length = parts
            .next()
            .map(|length| length.as_str().parse::<i32>().unwrap_or(0));

        let mut node = Node::new(NodeKind::Var { name }, line, exp_type);
        node.is_static = is_static;
        match array_length {
            // One extra word ahead of the elements records the length.
            Some(length) => {
                node.is_array = true;
                node.size = length + 1;
            }
            None => node.size = 1,
        }
        let node = ast.add(node);

        if let Some(init) = inner.next() {
            let init = self.parse_exp(init, ast);
            ast.node_mut(node).children[0] = Some(init);
        }

        node
    }
}

/// Statements.
impl PestCMinusParser {
    /// A bare `;` is a null statement and produces no node at all.
    fn parse_statement(
        &self,
        pair: pest::iterators::Pair<Rule>,
        ast: &mut Ast,
    ) -> Option<NodeId> {
        match pair.as_rule() {
            Rule::compound_stmt => Some(self.parse_compound(pair, ast)),
            Rule::selection_stmt => Some(self.parse_selection(pair, ast)),
            Rule::while_stmt => Some(self.parse_while(pair, ast)),
            Rule::for_stmt => Some(self.parse_for(pair, ast)),
            Rule::return_stmt => Some(self.parse_return(pair, ast)),
            Rule::break_stmt => {
                let line = Self::line_of(&pair);
                Some(ast.add(Node::new(NodeKind::Break, line, ExpType::Void)))
            }
            Rule::expression_stmt => pair
                .into_inner()
                .next()
                .map(|exp| self.parse_exp(exp, ast)),
            rule => panic!("Whoops! Unprocessed pest rule: {:?}", rule),
        }
    }

    fn parse_compound(&self, pair: pest::iterators::Pair<Rule>, ast: &mut Ast) -> NodeId {
        let line = Self::line_of(&pair);
        let mut decl_head: Option<NodeId> = None;
        let mut stmt_head: Option<NodeId> = None;

        for part in pair.into_inner() {
            if part.as_rule() == Rule::var_declaration {
                let declaration = self.parse_var_declaration(part, ast);
                match decl_head {
                    None => decl_head = Some(declaration),
                    Some(head) => ast.add_sibling(head, declaration),
                }
            } else if let Some(statement) = self.parse_statement(part, ast) {
                match stmt_head {
                    None => stmt_head = Some(statement),
                    Some(head) => ast.add_sibling(head, statement),
                }
            }
        }

        let mut node = Node::new(NodeKind::Compound, line, ExpType::Void);
        node.children[0] = decl_head;
        node.children[1] = stmt_head;
        ast.add(node)
    }

    fn parse_selection(&self, pair: pest::iterators::Pair<Rule>, ast: &mut Ast) -> NodeId {
        let line = Self::line_of(&pair);
        let mut inner = pair.into_inner().filter(|part| {
            !matches!(
                part.as_rule(),
                Rule::kw_if | Rule::kw_then | Rule::kw_else
            )
        });

        let test = inner.next().map(|test| self.parse_exp(test, ast));
        let then_part = inner.next().and_then(|part| self.parse_statement(part, ast));
        let else_part = inner.next().and_then(|part| self.parse_statement(part, ast));

        let mut node = Node::new(NodeKind::If, line, ExpType::Void);
        node.children = [test, then_part, else_part];
        ast.add(node)
    }

    fn parse_while(&self, pair: pest::iterators::Pair<Rule>, ast: &mut Ast) -> NodeId {
        let line = Self::line_of(&pair);
        let mut inner = pair
            .into_inner()
            .filter(|part| !matches!(part.as_rule(), Rule::kw_while | Rule::kw_do));

        let test = inner.next().map(|test| self.parse_exp(test, ast));
        let body = inner.next().and_then(|part| self.parse_statement(part, ast));

        let mut node = Node::new(NodeKind::While, line, ExpType::Void);
        node.children = [test, body, None];
        ast.add(node)
    }

    fn parse_for(&self, pair: pest::iterators::Pair<Rule>, ast: &mut Ast) -> NodeId {
        let line = Self::line_of(&pair);
        let mut inner = pair.into_inner().filter(|part| {
            !matches!(
                part.as_rule(),
                Rule::kw_for | Rule::kw_to | Rule::kw_by | Rule::kw_do
            )
        });

        let name_pair = inner.next().expect("iterator name");
        let iter_line = Self::line_of(&name_pair);
        let mut iterator = Node::new(
            NodeKind::Var {
                name: name_pair.as_str().to_string(),
            },
            iter_line,
            ExpType::Int,
        );
        // The loop owns its iterator: always an int scalar, defined by the
        // range before the body ever runs.
        iterator.size = 1;
        iterator.is_iter_var = true;
        iterator.inited = true;
        let iterator = ast.add(iterator);

        let from = inner.next().map(|bound| self.parse_exp(bound, ast));
        let to = inner.next().map(|bound| self.parse_exp(bound, ast));
        // The grammar puts the body last, so a fourth expression pair can
        // only be the optional step with the body still to come.
        let mut remaining: Vec<_> = inner.collect();
        let body_pair = remaining.pop();
        let by = remaining
            .pop()
            .map(|bound| self.parse_exp(bound, ast));

        let mut range = Node::new(NodeKind::Range, line, ExpType::Void);
        range.children = [from, to, by];
        let range = ast.add(range);

        let body = body_pair.and_then(|part| self.parse_statement(part, ast));

        let mut node = Node::new(NodeKind::For, line, ExpType::Void);
        node.children = [Some(iterator), Some(range), body];
        ast.add(node)
    }

    fn parse_return(&self, pair: pest::iterators::Pair<Rule>, ast: &mut Ast) -> NodeId {
        let line = Self::line_of(&pair);
        let value = pair
            .into_inner()
            .find(|part| part.as_rule() != Rule::kw_return)
            .map(|value| self.parse_exp(value, ast));

        let mut node = Node::new(NodeKind::Return, line, ExpType::Void);
        node.children[0] = value;
        ast.add(node)
    }
}

/// Expressions.
impl PestCMinusParser {
    fn parse_exp(&self, pair: pest::iterators::Pair<Rule>, ast: &mut Ast) -> NodeId {
        match pair.as_rule() {
            Rule::assign_exp => self.parse_assign_exp(pair, ast),
            Rule::inc_exp => self.parse_inc_exp(pair, ast),
            Rule::simple_exp
            | Rule::and_exp
            | Rule::rel_exp
            | Rule::sum_exp
            | Rule::mul_exp => self.parse_binary_chain(pair, ast),
            Rule::unary_rel_exp | Rule::unary_exp => self.parse_unary_chain(pair, ast),
            Rule::mutable => self.parse_mutable(pair, ast),
            Rule::call => self.parse_call(pair, ast),
            Rule::int_const
            | Rule::char_const
            | Rule::string_const
            | Rule::bool_const => self.parse_constant(pair, ast),
            rule => panic!("Whoops! Unprocessed pest rule: {:?}", rule),
        }
    }

    fn parse_assign_exp(&self, pair: pest::iterators::Pair<Rule>, ast: &mut Ast) -> NodeId {
        let mut inner = pair.into_inner();
        let target_pair = inner.next().expect("assignment target");
        let op_pair = inner.next().expect("assignment operator");
        let value_pair = inner.next().expect("assigned value");

        let target = self.parse_exp(target_pair, ast);
        let value = self.parse_exp(value_pair, ast);

        // Plain `=` takes its type from the target during analysis; the
        // compound arithmetic forms are int operations outright.
        let (op, exp_type) = match op_pair.as_str() {
            "=" => (AssignOp::Assign, ExpType::Undefined),
            "+=" => (AssignOp::AddAssign, ExpType::Int),
            "-=" => (AssignOp::SubAssign, ExpType::Int),
            "*=" => (AssignOp::MulAssign, ExpType::Int),
            "/=" => (AssignOp::DivAssign, ExpType::Int),
            spelling => panic!("Whoops! Unprocessed assignment operator: {}", spelling),
        };

        let mut node = Node::new(NodeKind::Assign(op), Self::line_of(&op_pair), exp_type);
        node.children = [Some(target), Some(value), None];
        ast.add(node)
    }

    fn parse_inc_exp(&self, pair: pest::iterators::Pair<Rule>, ast: &mut Ast) -> NodeId {
        let mut inner = pair.into_inner();
        let target_pair = inner.next().expect("increment target");
        let op_pair = inner.next().expect("increment operator");

        let target = self.parse_exp(target_pair, ast);
        let op = match op_pair.as_str() {
            "++" => AssignOp::Increment,
            "--" => AssignOp::Decrement,
            spelling => panic!("Whoops! Unprocessed increment operator: {}", spelling),
        };

        let mut node = Node::new(NodeKind::Assign(op), Self::line_of(&op_pair), ExpType::Int);
        node.children[0] = Some(target);
        ast.add(node)
    }

    /// Fold a left-associative operator chain: `a + b + c` becomes
    /// `(a + b) + c` with each operator node taking the line of its own
    /// token.
    fn parse_binary_chain(&self, pair: pest::iterators::Pair<Rule>, ast: &mut Ast) -> NodeId {
        let mut inner = pair.into_inner();
        let first = inner.next().expect("operand");
        let mut lhs = self.parse_exp(first, ast);

        while let Some(op_pair) = inner.next() {
            let rhs_pair = inner.next().expect("right operand");
            let rhs = self.parse_exp(rhs_pair, ast);

            let (op, exp_type) = Self::binary_op_of(&op_pair);
            let mut node = Node::new(NodeKind::Op(op), Self::line_of(&op_pair), exp_type);
            node.children = [Some(lhs), Some(rhs), None];
            lhs = ast.add(node);
        }

        lhs
    }

    /// Logical and comparison operators produce bool, the arithmetic ones
    /// int; the analyser checks operands against this preset type.
    fn binary_op_of(pair: &pest::iterators::Pair<Rule>) -> (Operation, ExpType) {
        match (pair.as_rule(), pair.as_str()) {
            (Rule::kw_or, _) => (Operation::Or, ExpType::Bool),
            (Rule::kw_and, _) => (Operation::And, ExpType::Bool),
            (Rule::relop, "<") => (Operation::Less, ExpType::Bool),
            (Rule::relop, "<=") => (Operation::LessEqual, ExpType::Bool),
            (Rule::relop, ">") => (Operation::Greater, ExpType::Bool),
            (Rule::relop, ">=") => (Operation::GreaterEqual, ExpType::Bool),
            (Rule::relop, "==") => (Operation::Equal, ExpType::Bool),
            (Rule::relop, "!=") => (Operation::NotEqual, ExpType::Bool),
            (Rule::sumop, "+") => (Operation::Add, ExpType::Int),
            (Rule::sumop, "-") => (Operation::Sub, ExpType::Int),
            (Rule::mulop, "*") => (Operation::Mul, ExpType::Int),
            (Rule::mulop, "/") => (Operation::Div, ExpType::Int),
            (Rule::mulop, "%") => (Operation::Mod, ExpType::Int),
            (rule, spelling) => {
                panic!("Whoops! Unprocessed binary operator: {:?} {}", rule, spelling)
            }
        }
    }

    fn parse_unary_chain(&self, pair: pest::iterators::Pair<Rule>, ast: &mut Ast) -> NodeId {
        let mut inner = pair.into_inner();
        let first = inner.next().expect("operand");

        let (op, exp_type) = match (first.as_rule(), first.as_str()) {
            (Rule::kw_not, _) => (Operation::Not, ExpType::Bool),
            (Rule::unaryop, "-") => (Operation::Negate, ExpType::Int),
            (Rule::unaryop, "*") => (Operation::SizeOf, ExpType::Int),
            (Rule::unaryop, "?") => (Operation::Random, ExpType::Int),
            _ => return self.parse_exp(first, ast),
        };

        let operand_pair = inner.next().expect("unary operand");
        let operand = self.parse_exp(operand_pair, ast);

        let mut node = Node::new(NodeKind::Op(op), Self::line_of(&first), exp_type);
        node.children[0] = Some(operand);
        ast.add(node)
    }

    fn parse_mutable(&self, pair: pest::iterators::Pair<Rule>, ast: &mut Ast) -> NodeId {
        let line = Self::line_of(&pair);
        let mut inner = pair.into_inner();
        let name = inner.next().expect("identifier").as_str().to_string();

        let id = ast.add(Node::new(NodeKind::Id { name }, line, ExpType::Undefined));

        match inner.next() {
            Some(index_pair) => {
                let index = self.parse_exp(index_pair, ast);
                let mut node =
                    Node::new(NodeKind::Op(Operation::Index), line, ExpType::Undefined);
                node.children = [Some(id), Some(index), None];
                ast.add(node)
            }
            None => id,
        }
    }

    fn parse_call(&self, pair: pest::iterators::Pair<Rule>, ast: &mut Ast) -> NodeId {
        let line = Self::line_of(&pair);
        let mut inner = pair.into_inner();
        let name = inner.next().expect("callee").as_str().to_string();

        let mut arg_head: Option<NodeId> = None;
        if let Some(args) = inner.next() {
            for arg in args.into_inner() {
                let arg = self.parse_exp(arg, ast);
                match arg_head {
                    None => arg_head = Some(arg),
                    Some(head) => ast.add_sibling(head, arg),
                }
            }
        }

        let mut node = Node::new(NodeKind::Call { name }, line, ExpType::Undefined);
        node.children[0] = arg_head;
        ast.add(node)
    }

    fn parse_constant(&self, pair: pest::iterators::Pair<Rule>, ast: &mut Ast) -> NodeId {
        let line = Self::line_of(&pair);

        let node = match pair.as_rule() {
            Rule::int_const => Node::new(
                NodeKind::Const(Literal::Int(pair.as_str().parse().unwrap_or(0))),
                line,
                ExpType::Int,
            ),
            Rule::bool_const => Node::new(
                NodeKind::Const(Literal::Bool(pair.as_str() == "true")),
                line,
                ExpType::Bool,
            ),
            Rule::char_const => {
                let text = pair.as_str();
                let value = Self::unescape(&text[1..text.len() - 1]);
                Node::new(
                    NodeKind::Const(Literal::Char(value.chars().next().unwrap_or('\0'))),
                    line,
                    ExpType::Char,
                )
            }
            Rule::string_const => {
                let text = pair.as_str();
                let value = Self::unescape(&text[1..text.len() - 1]);
                let mut node =
                    Node::new(NodeKind::Const(Literal::Str(value.clone())), line, ExpType::Char);
                node.is_array = true;
                node.size = value.chars().count() as i32 + 1;
                node
            }
            rule => panic!("Whoops! Unprocessed constant rule: {:?}", rule),
        };

        ast.add(node)
    }
}

/// Token helpers.
impl PestCMinusParser {
    fn line_of(pair: &pest::iterators::Pair<Rule>) -> i32 {
        pair.as_span().start_pos().line_col().0 as i32
    }

    fn parse_type(pair: &pest::iterators::Pair<Rule>) -> ExpType {
        match pair.as_str() {
            "int" => ExpType::Int,
            "bool" => ExpType::Bool,
            "char" => ExpType::Char,
            spelling => panic!("Whoops! Unprocessed type specifier: {}", spelling),
        }
    }

    /// Backslash escapes: `\n` and `\0` mean newline and NUL, anything else
    /// is the escaped character itself.
    fn unescape(text: &str) -> String {
        let mut out = String::new();
        let mut chars = text.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                match chars.next() {
                    Some('n') => out.push('\n'),
                    Some('0') => out.push('\0'),
                    Some(escaped) => out.push(escaped),
                    None => {}
                }
            } else {
                out.push(c);
            }
        }
        out
    }
}
