use expect_test::{expect, Expect};

use super::*;
use crate::lexer::lex;
use crate::parser::ast::{Ast, NodeId, NodeKind, Program};
use crate::parser::parse;

fn program(source: &str) -> Program {
    parse(lex(source).unwrap()).unwrap()
}

fn analyze(source: &str) -> (Program, Analysis) {
    let program = program(source);
    let analysis = Analyzer::new(&program.ast).analyze(program.root).unwrap();
    (program, analysis)
}

fn analyze_err(source: &str) -> InferError {
    let program = program(source);
    let result = Analyzer::new(&program.ast).analyze(program.root);
    result.unwrap_err()
}

/// Type of the expression in a one-line expression statement
fn infer_expr(source: &str) -> String {
    let program = program(source);
    let NodeKind::Module { body } = program.ast.kind(program.root) else {
        panic!("expected module");
    };
    let NodeKind::Expr { value } = program.ast.kind(body[0]) else {
        panic!("expected expression statement");
    };
    let mut analyzer = Analyzer::new(&program.ast);
    analyzer
        .infer(*value, &Env::new(), &CallStack::new())
        .unwrap()
        .to_string()
}

fn entries(program: &Program, analysis: &Analysis) -> Vec<(Option<u32>, NodeId, String)> {
    let mut entries: Vec<_> = analysis
        .history
        .iter()
        .map(|(node, facts)| (program.ast.line(node), node, facts.to_string()))
        .collect();
    entries.sort_by_key(|(line, node, _)| (line.unwrap_or(u32::MAX), *node));
    entries
}

fn render(program: &Program, analysis: &Analysis) -> String {
    entries(program, analysis)
        .into_iter()
        .map(|(line, node, facts)| {
            let line = line.map_or("?".to_string(), |l| l.to_string());
            format!("{}: {}: {}", line, program.ast.describe(node), facts)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn check(source: &str, expect: Expect) {
    let (program, analysis) = analyze(source);
    expect.assert_eq(&render(&program, &analysis));
}

/// Facts at the first node labelled `label` that has any
fn facts_at(program: &Program, analysis: &Analysis, label: &str) -> String {
    program
        .ast
        .ids()
        .filter(|id| program.ast.describe(*id) == label)
        .find_map(|id| analysis.history.get(id))
        .map(|facts| facts.to_string())
        .unwrap_or_default()
}

fn binding_of(source: &str, name: &str) -> String {
    let (program, analysis) = analyze(source);
    facts_at(&program, &analysis, name)
}

fn faults(source: &str) -> Vec<String> {
    let (program, analysis) = analyze(source);
    let mut faults = Vec::new();
    for (line, node, _) in entries(&program, &analysis) {
        if let Some(facts) = analysis.history.get(node) {
            for fault in facts.faults() {
                faults.push(format!(
                    "{}: {}: {}",
                    line.unwrap_or(0),
                    program.ast.describe(node),
                    fault
                ));
            }
        }
    }
    faults
}

fn int() -> Type {
    Type::primitive("int")
}

fn str_() -> Type {
    Type::primitive("str")
}

// ===== Type-set algebra =====

#[test]
fn union_is_idempotent_and_duplicate_free() {
    let set = TypeSet::union([int(), int(), str_()]);
    assert_eq!(set, TypeSet::union([int(), str_()]));
    assert_eq!(set.len(), 2);
}

#[test]
fn union_is_order_independent() {
    assert_eq!(
        TypeSet::union([int(), str_(), Type::Dict]),
        TypeSet::union([Type::Dict, str_(), int()])
    );
}

#[test]
fn union_flattens_nested_unions() {
    let nested = TypeSet::union([Type::Union(vec![int(), str_()]), Type::Dict]);
    assert_eq!(nested, TypeSet::union([int(), str_(), Type::Dict]));
    assert!(nested.iter().all(|t| !matches!(t, Type::Union(_))));
}

#[test]
fn to_type_collapses_to_single_or_union() {
    assert_eq!(TypeSet::empty().to_type(), None);
    assert_eq!(TypeSet::single(int()).to_type(), Some(int()));
    assert_eq!(
        TypeSet::union([int(), str_()]).to_type(),
        Some(Type::Union(vec![int(), str_()]))
    );
}

#[test]
fn continuation_marker_drives_termination() {
    let falls_through = TypeSet::union([int(), Type::cont()]);
    assert!(!falls_through.terminates());
    assert!(falls_through.finalize().terminates());
    assert_eq!(falls_through.finalize(), TypeSet::single(int()));
    assert_eq!(
        falls_through.fall_through_as(Type::none()),
        TypeSet::union([int(), Type::none()])
    );
    assert!(TypeSet::single(int()).terminates());
}

#[test]
fn without_and_membership() {
    let set = TypeSet::union([int(), str_()]);
    assert!(set.contains(&int()));
    assert!(!set.without(&int()).contains(&int()));
    assert!(set.without(&int()).contains(&str_()));
}

#[test]
fn display_types() {
    let function = Type::Function {
        from: vec![
            ("a".to_string(), TypeSet::single(int())),
            ("b".to_string(), TypeSet::empty()),
        ],
        to: TypeSet::union([int(), str_()]),
    };
    assert_eq!(function.to_string(), "(a: int, b) -> int | str");
    assert_eq!(Type::Tuple(vec![int().into()]).to_string(), "(int,)");
    assert_eq!(Type::List(vec![int().into(), str_().into()]).to_string(), "[int, str]");
    assert_eq!(Type::class("int").to_string(), "class:int");
    assert_eq!(Type::Unknown(3).to_string(), "_3");
    assert_eq!(Type::Error(Fault::Unreachable).to_string(), "error: unreachable code");
    assert_eq!(TypeSet::empty().to_string(), "?");
}

// ===== Binding-list comparison =====

fn bindings(pairs: &[(&str, TypeSet)]) -> Signature {
    pairs
        .iter()
        .map(|(name, types)| (name.to_string(), types.clone()))
        .collect()
}

#[test]
fn subtype_bindings_is_reflexive() {
    let list = bindings(&[("x", int().into()), ("y", TypeSet::union([int(), str_()]))]);
    assert!(subtype_bindings(&list, &list));
    assert!(subtype_bindings(&[], &[]));
}

#[test]
fn subtype_bindings_requires_covering_same_name_entry() {
    let narrow = bindings(&[("x", int().into())]);
    let wide = bindings(&[("x", TypeSet::union([int(), str_()]))]);
    let renamed = bindings(&[("y", int().into())]);

    assert!(subtype_bindings(&narrow, &wide));
    assert!(!subtype_bindings(&wide, &narrow));
    assert!(!subtype_bindings(&narrow, &renamed));
}

#[test]
fn subtype_bindings_matches_placeholders_and_closures_by_shape() {
    let a = bindings(&[("x", Type::Unknown(0).into())]);
    let b = bindings(&[("x", Type::Unknown(7).into())]);
    assert!(subtype_bindings(&a, &b));

    let mut ast = Ast::new();
    let def = ast.push(NodeKind::Pass, None);
    let other_def = ast.push(NodeKind::Pass, None);
    let closure = |id: u32, def: NodeId| {
        Type::Closure(ClosureRef {
            id: ClosureId(id),
            def,
            name: None,
        })
    };

    let first = bindings(&[("f", closure(0, def).into())]);
    let second = bindings(&[("f", closure(1, def).into())]);
    let unrelated = bindings(&[("f", closure(2, other_def).into())]);
    assert!(subtype_bindings(&first, &second));
    assert!(!subtype_bindings(&first, &unrelated));

    let nested = bindings(&[("l", Type::List(vec![Type::Unknown(1).into()]).into())]);
    let nested_again = bindings(&[("l", Type::List(vec![Type::Unknown(2).into()]).into())]);
    assert!(subtype_bindings(&nested, &nested_again));
}

// ===== Environment, call stack and history =====

#[test]
fn env_extension_shadows_without_mutating() {
    let base = Env::new().extend("x", int().into(), None);
    let shadowed = base.extend("x", str_().into(), None);

    assert_eq!(base.lookup("x").unwrap().types, TypeSet::single(int()));
    assert_eq!(shadowed.lookup("x").unwrap().types, TypeSet::single(str_()));
    assert!(base.lookup("y").is_none());
}

#[test]
fn env_merge_keeps_names_bound_in_both() {
    let left = Env::new()
        .extend("x", int().into(), None)
        .extend("only_left", int().into(), None);
    let right = Env::new()
        .extend("x", str_().into(), None)
        .extend("only_right", int().into(), None);

    let merged = left.merge(&right);
    assert_eq!(merged.len(), 1);
    assert_eq!(
        merged.lookup("x").unwrap().types,
        TypeSet::union([int(), str_()])
    );
    assert!(!merged.contains("only_left"));
    assert!(!merged.contains("only_right"));
}

#[test]
fn call_stack_detects_covered_signature() {
    let mut ast = Ast::new();
    let call = ast.push(NodeKind::Pass, None);
    let other_call = ast.push(NodeKind::Pass, None);

    let stack = CallStack::new().push(Frame {
        call,
        signature: bindings(&[("x", TypeSet::union([int(), str_()]))]),
    });

    assert_eq!(stack.depth(), 1);
    assert!(stack.contains(call, &bindings(&[("x", int().into())])));
    assert!(!stack.contains(other_call, &bindings(&[("x", int().into())])));
    assert!(!stack.contains(call, &bindings(&[("x", Type::Dict.into())])));
    assert_eq!(CallStack::new().depth(), 0);
}

#[test]
fn history_accumulates_and_dedups_faults() {
    let mut ast = Ast::new();
    let node = ast.push(NodeKind::Pass, None);

    let mut history = History::new();
    history.record(node, &int().into());
    history.record(node, &str_().into());
    history.record_fault(node, Fault::Unreachable);
    history.record_fault(node, Fault::Unreachable);

    assert_eq!(history.get(node).unwrap().len(), 3);
    assert_eq!(history.fault_count(), 1);

    history.clear();
    assert!(history.is_empty());
}

// ===== Expressions =====

#[test]
fn infer_literals() {
    assert_eq!(infer_expr("1 + 1"), "int");
    assert_eq!(infer_expr("'a'"), "str");
    assert_eq!(infer_expr("2.5"), "float");
    assert_eq!(infer_expr("True"), "bool");
    assert_eq!(infer_expr("None"), "NoneType");
}

#[test]
fn infer_arithmetic() {
    assert_eq!(infer_expr("1.5 * 2"), "float");
    assert_eq!(infer_expr("7 / 2"), "float");
    assert_eq!(infer_expr("7 // 2"), "int");
    assert_eq!(infer_expr("True + 1"), "int");
    assert_eq!(infer_expr("2 ** 8"), "int");
    assert_eq!(infer_expr("'a' + 'b'"), "str");
    assert_eq!(infer_expr("'ab' * 3"), "str");
    assert_eq!(infer_expr("'%d' % 5"), "str");
    assert_eq!(infer_expr("[1] + ['a']"), "[int | str]");
    assert_eq!(infer_expr("[1, 2] + [3]"), "[int]");
    assert_eq!(infer_expr("[] + []"), "[]");
}

#[test]
fn infer_unsupported_operation_is_unknown() {
    assert_eq!(infer_expr("1 + 'a'"), "_0");
    assert_eq!(infer_expr("len.real"), "_0");
    assert_eq!(infer_expr("[1][0]"), "_0");
}

#[test]
fn infer_unary_comparison_and_boolean_operators() {
    assert_eq!(infer_expr("not 1"), "bool");
    assert_eq!(infer_expr("-True"), "int");
    assert_eq!(infer_expr("-1.5"), "float");
    assert_eq!(infer_expr("1 < 2 <= 3"), "bool");
    assert_eq!(infer_expr("1 or 'a'"), "int | str");
}

#[test]
fn infer_containers() {
    assert_eq!(infer_expr("(1, 'a')"), "(int, str)");
    assert_eq!(infer_expr("[1, 2]"), "[int, int]");
    assert_eq!(infer_expr("{'a': 1}"), "dict");
    assert_eq!(infer_expr("()"), "()");
    assert_eq!(infer_expr("[[[[1]]]]"), "[[[[int]]]]");
    assert_eq!(infer_expr("[[[[[1]]]]]"), "_0");
}

#[test]
fn infer_builtins() {
    assert_eq!(infer_expr("len"), "(obj) -> int");
    assert_eq!(infer_expr("len([1])"), "int");
    assert_eq!(infer_expr("range(3)"), "[int]");
    assert_eq!(infer_expr("print('hi')"), "NoneType");
    assert_eq!(infer_expr("int('3')"), "int");
    assert_eq!(infer_expr("list()"), "[]");
    assert_eq!(infer_expr("dict()"), "dict");
    assert_eq!(infer_expr("object()"), "_0");
}

#[test]
fn builtin_uses_are_tracked() {
    let (program, analysis) = analyze("x = len\ny = x\n");
    let builtin_names: Vec<String> = analysis
        .builtin_uses
        .iter()
        .map(|node| program.ast.describe(*node))
        .collect();
    assert_eq!(builtin_names, vec!["len".to_string()]);
}

#[test]
fn unresolved_name_is_a_fault() {
    assert_eq!(
        faults("y = nope\n"),
        vec![
            "1: y: unresolved symbol 'nope'".to_string(),
            "1: nope: unresolved symbol 'nope'".to_string(),
        ]
    );
}

// ===== Calls =====

#[test]
fn calling_non_callable() {
    check(
        "x = 1\nx()",
        expect![[r#"
            1: x: int
            2: x: int
            2: call x: error: calling non-callable: int"#]],
    );
}

#[test]
fn arity_mismatch_and_successful_call() {
    check(
        "def f(a): return a\nf(1, 2)\ny = f(1)",
        expect![[r#"
            1: a: int
            1: a: int
            1: def f: (a: int) -> int
            2: f: <function f>
            2: call f: error: too many values: function takes 1 positional argument(s) but 2 were given
            3: y: int
            3: f: <function f>"#]],
    );
}

#[test]
fn unexpected_keyword_arguments() {
    let found = faults("def f(a): return a\nf(a=1, b=2)\n");
    assert_eq!(
        found,
        vec!["2: call f: unexpected keyword arguments: b".to_string()]
    );
}

#[test]
fn extra_keywords_collect_into_kwarg() {
    let source = "def f(a, **kw):\n    return kw\nr = f(a=1, b=2)\n";
    assert_eq!(binding_of(source, "r"), "dict");
    assert_eq!(binding_of(source, "kw"), "dict");
    assert!(faults(source).is_empty());
}

#[test]
fn duplicate_and_missing_arguments() {
    assert_eq!(
        faults("def f(a): return a\nf(1, a=2)\n"),
        vec!["2: call f: multiple values for keyword argument 'a'".to_string()]
    );
    assert_eq!(
        faults("def f(a, b): return a\nf(1)\n"),
        vec!["2: call f: missing value for parameter 'b'".to_string()]
    );
}

#[test]
fn keyword_binds_unbound_formal() {
    let source = "def f(a, b):\n    return b\nr = f(1, b='s')\n";
    assert_eq!(binding_of(source, "r"), "str");
}

#[test]
fn defaults_are_used_for_unbound_formals() {
    let source = "def f(a, b=1):\n    return b\nr = f(0)\ns = f(0, 'x')\n";
    let (program, analysis) = analyze(source);
    assert_eq!(facts_at(&program, &analysis, "r"), "int");
    assert_eq!(facts_at(&program, &analysis, "s"), "str");
    assert_eq!(
        facts_at(&program, &analysis, "def f"),
        "(a: int, b: int) -> int | (a: int, b: str) -> str"
    );
}

#[test]
fn excess_positionals_go_to_vararg() {
    let source = "def f(*rest):\n    return rest\nr = f(1, 'a')\n";
    assert_eq!(binding_of(source, "r"), "int | str");
}

#[test]
fn function_types_accumulate_across_call_sites() {
    let source = "def ident(v):\n    return v\na = ident(1)\nb = ident('s')\n";
    let (program, analysis) = analyze(source);
    assert_eq!(
        facts_at(&program, &analysis, "def ident"),
        "(v: int) -> int | (v: str) -> str"
    );
    assert_eq!(facts_at(&program, &analysis, "v"), "int | str");
}

#[test]
fn lambda_is_a_closure() {
    let source = "f = lambda x: x\nr = f(1)\n";
    let (program, analysis) = analyze(source);
    assert_eq!(facts_at(&program, &analysis, "r"), "int");
    assert_eq!(facts_at(&program, &analysis, "f"), "<lambda>");
    assert_eq!(facts_at(&program, &analysis, "lambda"), "(x: int) -> int");
}

#[test]
fn closures_capture_their_defining_environment() {
    let source = "\
def make(x):
    def get():
        return x
    return get
g = make(1)
r = g()
";
    let (program, analysis) = analyze(source);
    assert_eq!(facts_at(&program, &analysis, "g"), "<function get>");
    assert_eq!(facts_at(&program, &analysis, "r"), "int");
}

#[test]
fn conditional_definitions_give_union_of_closures() {
    let source = "\
c = True
if c:
    def f():
        return 1
else:
    def f():
        return 'a'
r = f()
";
    assert_eq!(binding_of(source, "r"), "int | str");
}

#[test]
fn union_callee_with_non_callable_member() {
    let source = "\
c = True
if c:
    g = len
else:
    g = 1
r = g('a')
";
    assert_eq!(binding_of(source, "r"), "int | error: calling non-callable: int");
}

#[test]
fn called_before_definition() {
    assert_eq!(
        faults("f()\ndef f(): return 1\n"),
        vec!["1: call f: 'f' called before its definition".to_string()]
    );
}

#[test]
fn def_after_reassignment_binds_fresh_closure() {
    let source = "f = 1\ndef f():\n    return 'a'\nr = f()\n";
    assert_eq!(binding_of(source, "r"), "str");
    assert!(faults(source).is_empty());
}

#[test]
fn function_without_return_yields_none() {
    assert_eq!(binding_of("def f():\n    x = 1\nr = f()\n", "r"), "NoneType");
    assert_eq!(binding_of("def f():\n    return\nr = f()\n", "r"), "NoneType");
}

#[test]
fn conditional_return_unions_with_fall_through() {
    let source = "\
def f(c):
    if c:
        return 1
r = f(True)
";
    assert_eq!(binding_of(source, "r"), "int | NoneType");
}

#[test]
fn one_terminating_branch_continues_with_the_other() {
    let source = "\
def f(c):
    if c:
        return 1
    return 'a'
r = f(True)
";
    assert_eq!(binding_of(source, "r"), "int | str");
}

// ===== Recursion =====

#[test]
fn self_recursion_without_base_case_is_bottom() {
    let source = "def f(x): return f(x)\ny = f(1)\n";
    let (program, analysis) = analyze(source);
    assert_eq!(facts_at(&program, &analysis, "y"), BOTTOM);
    assert_eq!(facts_at(&program, &analysis, "def f"), "(x: int) -> _|_");
}

#[test]
fn recursion_without_arguments_terminates() {
    assert_eq!(binding_of("def f():\n    return f()\nr = f()\n", "r"), "_|_");
}

#[test]
fn recursion_with_base_case_keeps_base_type() {
    let source = "\
def fact(n):
    if n == 0:
        return 1
    return n * fact(n - 1)
r = fact(5)
";
    assert_eq!(binding_of(source, "r"), "int | _|_");
}

#[test]
fn mutual_recursion_terminates() {
    let source = "\
def even(n):
    if n == 0:
        return True
    return odd(n - 1)
def odd(n):
    if n == 0:
        return False
    return even(n - 1)
r = even(10)
";
    assert_eq!(binding_of(source, "r"), "bool | _|_");
}

#[test]
fn recursion_over_growing_lists_terminates() {
    let source = "def grow(x):\n    return grow([x])\nr = grow(1)\n";
    assert_eq!(binding_of(source, "r"), "_|_");
}

#[test]
fn recursion_over_concatenated_lists_terminates() {
    let source = "def grow(x):\n    return grow(x + [1])\nr = grow([])\n";
    assert_eq!(binding_of(source, "r"), "_|_");

    let source = "def double(x):\n    return double(x + x)\nr = double([1])\n";
    assert_eq!(binding_of(source, "r"), "_|_");

    let source = "def nest(x):\n    return nest(x + [x])\nr = nest([])\n";
    assert_eq!(binding_of(source, "r"), "_|_");
}

// ===== Sequencing =====

#[test]
fn both_branches_returning_make_rest_unreachable() {
    let source = "if True: return 1\nelse: return 2\nx = 3";
    let (program, analysis) = analyze(source);
    assert_eq!(analysis.result, TypeSet::single(int()));
    expect![[r#"
        1: True: bool
        3: assignment to x: error: unreachable code"#]]
    .assert_eq(&render(&program, &analysis));
}

#[test]
fn statements_after_return_are_analyzed_and_unreachable() {
    check(
        "def f():\n    return 1\n    y = undefined\nf()\n",
        expect![[r#"
            1: def f: () -> int
            3: y: error: unresolved symbol 'undefined'
            3: undefined: error: unresolved symbol 'undefined'
            3: assignment to y: error: unreachable code
            4: f: <function f>"#]],
    );
}

#[test]
fn branch_bindings_merge() {
    let source = "\
c = True
if c:
    x = 1
else:
    x = 'a'
y = x
";
    assert_eq!(binding_of(source, "y"), "int | str");
}

#[test]
fn names_bound_in_one_branch_are_dropped() {
    let source = "\
c = True
if c:
    x = 1
else:
    y = 2
z = (x, y)
";
    assert_eq!(
        faults(source),
        vec![
            "6: x: unresolved symbol 'x'".to_string(),
            "6: y: unresolved symbol 'y'".to_string(),
        ]
    );
}

#[test]
fn module_result_falls_through() {
    let (_, analysis) = analyze("x = 1\n");
    assert_eq!(analysis.result, TypeSet::single(Type::cont()));
}

#[test]
fn non_name_targets_are_not_assignable() {
    assert_eq!(
        faults("x, y = 1, 2\n"),
        vec!["1: tuple: not assignable".to_string()]
    );
}

#[test]
fn while_is_a_hard_failure() {
    assert_eq!(
        analyze_err("while x:\n    pass\n"),
        InferError::UnrecognizedStatement {
            kind: "While",
            line: Some(1)
        }
    );
    assert_eq!(
        analyze_err("pass\n"),
        InferError::UnrecognizedStatement {
            kind: "Pass",
            line: Some(1)
        }
    );
}

#[test]
fn hard_failure_only_when_body_is_analyzed() {
    let source = "def f():\n    while x:\n        pass\n";
    let (_, analysis) = analyze(source);
    assert!(analysis.history.is_empty());

    assert_eq!(
        analyze_err(&format!("{}f()\n", source)),
        InferError::UnrecognizedStatement {
            kind: "While",
            line: Some(2)
        }
    );
}

#[test]
fn reanalysis_starts_from_a_clean_history() {
    let program = program("def f(a): return a\nr = f(1)\nq = nope\n");
    let mut analyzer = Analyzer::new(&program.ast);
    let first = analyzer.analyze(program.root).unwrap();
    let second = analyzer.analyze(program.root).unwrap();
    assert_eq!(first.history, second.history);
    assert_eq!(first.result, second.result);
}
