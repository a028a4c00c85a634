//! Integration tests for ctrace
//!
//! Drive whole sessions over programs built the way an external parser
//! would hand them over:
//! - Stepping line by line, including filled gaps
//! - print / trace queries
//! - Calls, recursion, pointers and arrays
//! - Optimization soundness
//! - Error recovery

use ctrace::ast::{
    AssignOp, BinOp, Declaration, Expr, FunctionDef, Item, Param, Stmt, TranslationUnit, Type,
    UnOp, VarDecl,
};
use ctrace::interp::{ErrorKind, Value};
use ctrace::opt::{OptLevel, OptimizationPipeline};
use ctrace::{Inspection, Program, Progress, Session, SessionConfig};

fn function(name: &str, return_type: Type, params: Vec<Param>, line: u32, body: Vec<Stmt>) -> Item {
    Item::Function(FunctionDef {
        name: name.to_string(),
        return_type,
        params,
        body,
        line,
    })
}

fn main_only(body: Vec<Stmt>) -> TranslationUnit {
    TranslationUnit::new(vec![function("main", Type::Int, vec![], 1, body)])
}

fn ident(name: &str) -> Expr {
    Expr::ident(name)
}

fn assign(name: &str, value: Expr) -> Expr {
    Expr::assign(ident(name), value)
}

fn add(lhs: Expr, rhs: Expr) -> Expr {
    Expr::binary(BinOp::Add, lhs, rhs)
}

fn session(unit: &TranslationUnit) -> Session {
    Session::new(unit, SessionConfig::default()).unwrap()
}

/// Lines visited, in order, until the program ends
fn visited_lines(session: &mut Session) -> Vec<u32> {
    let mut lines = Vec::new();
    session.begin().unwrap();
    while let Some(line) = session.current_line() {
        lines.push(line);
        session.next(1).unwrap();
    }
    lines
}

fn output_of(unit: &TranslationUnit, level: OptLevel) -> String {
    let mut session = Session::new(unit, SessionConfig::new().opt_level(level)).unwrap();
    session.run_to_end().unwrap();
    session.output().to_string()
}

// ============================================
// Programs
// ============================================

/// int a; a = 2; a = a + 3; printf("%d", a);
fn scenario(with_print: bool) -> TranslationUnit {
    let mut body = vec![
        Stmt::declare(2, vec![VarDecl::new("a", Type::Int)]),
        Stmt::expr(3, assign("a", Expr::int(2))),
        Stmt::expr(4, assign("a", add(ident("a"), Expr::int(3)))),
    ];
    if with_print {
        body.push(Stmt::print(5, "%d", Some(ident("a"))));
    }
    main_only(body)
}

fn sum_loop() -> TranslationUnit {
    main_only(vec![
        Stmt::declare(2, vec![VarDecl::new("i", Type::Int)]),
        Stmt::declare(3, vec![VarDecl::new("sum", Type::Int)]),
        Stmt::expr(4, assign("sum", Expr::int(0))),
        Stmt::for_loop(
            5,
            Some(assign("i", Expr::int(0))),
            Expr::binary(BinOp::Lt, ident("i"), Expr::int(3)),
            Some(Expr::unary(UnOp::Incr, ident("i"))),
            vec![Stmt::expr(6, assign("sum", add(ident("sum"), ident("i"))))],
        ),
        Stmt::print(8, "%d\\n", Some(ident("sum"))),
    ])
}

fn add_call() -> TranslationUnit {
    TranslationUnit::new(vec![
        function(
            "add",
            Type::Int,
            vec![Param::new("x", Type::Int), Param::new("y", Type::Int)],
            1,
            vec![
                Stmt::declare(2, vec![VarDecl::new("s", Type::Int)]),
                Stmt::expr(3, assign("s", add(ident("x"), ident("y")))),
                Stmt::ret(4, Some(ident("s"))),
            ],
        ),
        function(
            "main",
            Type::Int,
            vec![],
            6,
            vec![
                Stmt::declare(7, vec![VarDecl::new("a", Type::Int)]),
                Stmt::expr(8, assign("a", Expr::call("add", vec![Expr::int(2), Expr::int(3)]))),
                Stmt::print(9, "%d\\n", Some(ident("a"))),
                Stmt::ret(10, Some(Expr::int(0))),
            ],
        ),
    ])
}

fn factorial() -> TranslationUnit {
    TranslationUnit::new(vec![
        function(
            "fact",
            Type::Int,
            vec![Param::new("n", Type::Int)],
            1,
            vec![
                Stmt::if_else(
                    2,
                    Expr::binary(BinOp::Le, ident("n"), Expr::int(1)),
                    vec![Stmt::ret(3, Some(Expr::int(1)))],
                    None,
                ),
                Stmt::ret(
                    5,
                    Some(Expr::binary(
                        BinOp::Mul,
                        ident("n"),
                        Expr::call("fact", vec![Expr::binary(BinOp::Sub, ident("n"), Expr::int(1))]),
                    )),
                ),
            ],
        ),
        function(
            "main",
            Type::Int,
            vec![],
            7,
            vec![
                Stmt::print(8, "%d\\n", Some(Expr::call("fact", vec![Expr::int(5)]))),
                Stmt::ret(9, Some(Expr::int(0))),
            ],
        ),
    ])
}

fn swap() -> TranslationUnit {
    let deref = |name: &str| Expr::unary(UnOp::Deref, ident(name));
    TranslationUnit::new(vec![
        function(
            "swap",
            Type::Void,
            vec![
                Param::new("a", Type::pointer_to(Type::Int)),
                Param::new("b", Type::pointer_to(Type::Int)),
            ],
            1,
            vec![
                Stmt::declare(2, vec![VarDecl::new("t", Type::Int)]),
                Stmt::expr(3, assign("t", deref("a"))),
                Stmt::expr(4, Expr::assign(deref("a"), deref("b"))),
                Stmt::expr(5, Expr::assign(deref("b"), ident("t"))),
            ],
        ),
        function(
            "main",
            Type::Int,
            vec![],
            7,
            vec![
                Stmt::declare(
                    8,
                    vec![
                        VarDecl::new("x", Type::Int).with_init(Expr::int(1)),
                        VarDecl::new("y", Type::Int).with_init(Expr::int(2)),
                    ],
                ),
                Stmt::expr(
                    9,
                    Expr::call(
                        "swap",
                        vec![
                            Expr::unary(UnOp::AddrOf, ident("x")),
                            Expr::unary(UnOp::AddrOf, ident("y")),
                        ],
                    ),
                ),
                Stmt::print(10, "%d", Some(ident("x"))),
                Stmt::print(11, " %d\\n", Some(ident("y"))),
            ],
        ),
    ])
}

fn array_through_pointer() -> TranslationUnit {
    let element = |name: &str, i: i64| Expr::index(ident(name), Expr::int(i));
    TranslationUnit::new(vec![
        function(
            "ends",
            Type::Int,
            vec![Param::new("p", Type::pointer_to(Type::Int))],
            1,
            vec![Stmt::ret(2, Some(add(element("p", 0), element("p", 2))))],
        ),
        function(
            "main",
            Type::Int,
            vec![],
            4,
            vec![
                Stmt::declare(5, vec![VarDecl::new("a", Type::array_of(Type::Int, 3))]),
                Stmt::expr(6, Expr::assign(element("a", 0), Expr::int(4))),
                Stmt::expr(7, Expr::assign(element("a", 2), Expr::int(5))),
                Stmt::expr(8, Expr::compound(AssignOp::AddAssign, element("a", 2), Expr::int(1))),
                Stmt::print(9, "%d\\n", Some(Expr::call("ends", vec![ident("a")]))),
            ],
        ),
    ])
}

/// A bare redeclaration keeps the value stored by the previous iteration
fn redeclared_in_loop() -> TranslationUnit {
    let k = || ident("k");
    main_only(vec![
        Stmt::declare(2, vec![VarDecl::new("k", Type::Int).with_init(Expr::int(0))]),
        Stmt::while_loop(
            3,
            Expr::binary(BinOp::Lt, k(), Expr::int(2)),
            vec![
                Stmt::declare(4, vec![VarDecl::new("y", Type::Int)]),
                Stmt::if_else(
                    5,
                    Expr::binary(BinOp::Gt, k(), Expr::int(0)),
                    vec![Stmt::print(6, "%d", Some(ident("y")))],
                    None,
                ),
                Stmt::expr(8, assign("y", Expr::int(7))),
                Stmt::expr(9, assign("k", add(k(), Expr::int(1)))),
            ],
        ),
    ])
}

/// Each iteration reads what the one before wrote
fn fibonacci() -> TranslationUnit {
    main_only(vec![
        Stmt::declare(
            2,
            vec![
                VarDecl::new("a", Type::Int).with_init(Expr::int(0)),
                VarDecl::new("b", Type::Int).with_init(Expr::int(1)),
                VarDecl::new("t", Type::Int),
                VarDecl::new("i", Type::Int),
            ],
        ),
        Stmt::for_loop(
            3,
            Some(assign("i", Expr::int(0))),
            Expr::binary(BinOp::Lt, ident("i"), Expr::int(5)),
            Some(Expr::unary(UnOp::Incr, ident("i"))),
            vec![
                Stmt::expr(4, assign("t", add(ident("a"), ident("b")))),
                Stmt::expr(5, assign("a", ident("b"))),
                Stmt::expr(6, assign("b", ident("t"))),
            ],
        ),
        Stmt::print(8, "%d\\n", Some(ident("a"))),
    ])
}

/// Calls in a loop condition and in a for-step
fn calls_in_loop_control() -> TranslationUnit {
    let next_of = |name: &str| Expr::call("next_of", vec![ident(name)]);
    TranslationUnit::new(vec![
        function(
            "next_of",
            Type::Int,
            vec![Param::new("n", Type::Int)],
            1,
            vec![Stmt::ret(2, Some(add(ident("n"), Expr::int(1))))],
        ),
        function(
            "main",
            Type::Int,
            vec![],
            4,
            vec![
                Stmt::declare(
                    5,
                    vec![
                        VarDecl::new("i", Type::Int).with_init(Expr::int(0)),
                        VarDecl::new("total", Type::Int).with_init(Expr::int(0)),
                    ],
                ),
                Stmt::while_loop(
                    6,
                    Expr::binary(BinOp::Lt, next_of("i"), Expr::int(4)),
                    vec![
                        Stmt::expr(7, assign("total", add(ident("total"), ident("i")))),
                        Stmt::expr(8, assign("i", next_of("i"))),
                    ],
                ),
                Stmt::declare(10, vec![VarDecl::new("j", Type::Int)]),
                Stmt::for_loop(
                    11,
                    Some(assign("j", Expr::int(0))),
                    Expr::binary(BinOp::Lt, ident("j"), Expr::int(3)),
                    Some(assign("j", next_of("j"))),
                    vec![Stmt::expr(
                        12,
                        Expr::compound(AssignOp::AddAssign, ident("total"), ident("j")),
                    )],
                ),
                Stmt::print(14, "%d\\n", Some(ident("total"))),
            ],
        ),
    ])
}

/// The initializer of an unread variable can still fault
fn unread_division(divisor: i64) -> TranslationUnit {
    main_only(vec![
        Stmt::declare(2, vec![VarDecl::new("x", Type::Int).with_init(Expr::int(divisor))]),
        Stmt::declare(
            3,
            vec![VarDecl::new("y", Type::Int)
                .with_init(Expr::binary(BinOp::Div, Expr::int(8), ident("x")))],
        ),
        Stmt::print(4, "%d\\n", Some(ident("x"))),
    ])
}

fn all_programs() -> Vec<TranslationUnit> {
    vec![
        scenario(true),
        scenario(false),
        sum_loop(),
        add_call(),
        factorial(),
        swap(),
        array_through_pointer(),
        redeclared_in_loop(),
        fibonacci(),
        calls_in_loop_control(),
        unread_division(4),
    ]
}

// ============================================
// Stepping and queries
// ============================================

#[test]
fn test_concrete_scenario() {
    let mut session = session(&scenario(true));
    session.begin().unwrap();
    assert_eq!(session.next(3).unwrap(), Progress::Paused { line: 5 });

    assert_eq!(session.print("a", None), Inspection::Value(Value::Int(5)));
    insta::assert_snapshot!(session.trace("a", None).to_string(), @r"
    a = N/A at line 2
    a = 2 at line 3
    a = 5 at line 4
    ");

    assert_eq!(session.next(1).unwrap(), Progress::Finished);
    assert_eq!(session.output(), "5");
}

#[test]
fn test_trace_is_repeatable() {
    let mut session = session(&scenario(true));
    session.next(2).unwrap();
    let first = session.trace("a", None);
    assert_eq!(first.records().len(), 2);
    assert_eq!(session.trace("a", None), first);
}

#[test]
fn test_every_line_is_stepped() {
    let mut session = session(&main_only(vec![
        Stmt::declare(2, vec![VarDecl::new("x", Type::Int).with_init(Expr::int(1))]),
        Stmt::if_else(
            3,
            Expr::binary(BinOp::Gt, ident("x"), Expr::int(0)),
            vec![Stmt::expr(4, assign("x", Expr::int(2)))],
            Some(vec![Stmt::expr(6, assign("x", Expr::int(3)))]),
        ),
        Stmt::ret(8, Some(ident("x"))),
    ]));
    assert_eq!(visited_lines(&mut session), vec![2, 3, 4, 5, 7, 8]);
    assert_eq!(session.steps(), 6);
}

#[test]
fn test_gap_filling_can_be_disabled() {
    let unit = main_only(vec![
        Stmt::declare(2, vec![VarDecl::new("x", Type::Int)]),
        Stmt::expr(4, assign("x", Expr::int(1))),
        Stmt::expr(5, assign("x", Expr::int(2))),
    ]);
    let mut filled = session(&unit);
    assert_eq!(visited_lines(&mut filled), vec![2, 3, 4, 5]);

    let mut plain = Session::new(&unit, SessionConfig::new().fill_gaps(false)).unwrap();
    assert_eq!(visited_lines(&mut plain), vec![2, 4, 5]);
}

#[test]
fn test_next_after_end_is_a_no_op() {
    let mut session = session(&scenario(true));
    assert_eq!(session.next(100).unwrap(), Progress::Finished);
    let steps = session.steps();
    assert!(session.is_done());
    assert_eq!(session.next(1).unwrap(), Progress::Finished);
    assert_eq!(session.steps(), steps);
    assert_eq!(session.current_line(), None);
}

#[test]
fn test_globals_stay_visible() {
    let unit = TranslationUnit::new(vec![
        Item::Declaration(Declaration {
            vars: vec![VarDecl::new("g", Type::Int).with_init(Expr::int(10))],
            line: 1,
        }),
        function(
            "main",
            Type::Int,
            vec![],
            2,
            vec![Stmt::expr(3, Expr::compound(AssignOp::SubAssign, ident("g"), Expr::int(4)))],
        ),
    ]);
    let mut session = session(&unit);
    assert_eq!(session.print("g", None), Inspection::Value(Value::Int(10)));
    session.run_to_end().unwrap();
    assert_eq!(session.print("g", None), Inspection::Value(Value::Int(6)));
    assert_eq!(
        session.trace("g", None).records(),
        &[(Some(Value::Int(10)), 1), (Some(Value::Int(6)), 3)]
    );
}

#[test]
fn test_loop_history() {
    let mut session = session(&sum_loop());
    session.run_to_end().unwrap();
    assert_eq!(session.output(), "3\n");

    let mut session = self::session(&sum_loop());
    session.next(3).unwrap();
    while session.current_line().is_some_and(|line| line != 8) {
        session.next(1).unwrap();
    }
    let history: Vec<(Option<Value>, u32)> = session.trace("sum", None).records().to_vec();
    assert_eq!(
        history,
        vec![
            (None, 3),
            (Some(Value::Int(0)), 4),
            (Some(Value::Int(0)), 6),
            (Some(Value::Int(1)), 6),
            (Some(Value::Int(3)), 6),
        ]
    );
}

// ============================================
// Calls
// ============================================

#[test]
fn test_call_steps_into_callee() {
    let mut session = session(&add_call());
    session.begin().unwrap();

    let mut lines = Vec::new();
    while let Some(line) = session.current_line() {
        lines.push(line);
        if line == 3 {
            assert_eq!(
                session.backtrace(),
                vec![("add".to_string(), 8), ("main".to_string(), 6)]
            );
            assert_eq!(session.print("x", None), Inspection::Value(Value::Int(2)));
            assert_eq!(session.print("a", None), Inspection::Invisible);
        }
        session.next(1).unwrap();
    }

    assert_eq!(lines, vec![7, 8, 2, 3, 4, 9, 10]);
    assert_eq!(session.output(), "5\n");
}

#[test]
fn test_frame_freed_on_return() {
    let mut session = session(&add_call());
    session.next(4).unwrap();
    assert_eq!(session.current_line(), Some(4));
    assert_eq!(session.print("s", None), Inspection::Value(Value::Int(5)));

    session.next(1).unwrap();
    assert_eq!(session.current_line(), Some(9));
    assert_eq!(session.print("s", None), Inspection::Invisible);
    assert_eq!(session.print("x", None), Inspection::Invisible);
    assert_eq!(
        session.trace("a", None).records(),
        &[(None, 7), (Some(Value::Int(5)), 8)]
    );
    assert_eq!(session.interpreter().store().len(), 1);
}

#[test]
fn test_recursion() {
    let mut session = session(&factorial());
    session.run_to_end().unwrap();
    assert_eq!(session.output(), "120\n");
    assert!(session.interpreter().store().is_empty());
}

#[test]
fn test_call_depth_limit() {
    let config = SessionConfig::new().max_call_depth(3);
    let mut session = Session::new(&factorial(), config).unwrap();
    let err = session.run_to_end().unwrap_err();
    assert_eq!(err.kind, ErrorKind::StackOverflow);
    assert!(!session.is_done());
    assert_eq!(session.backtrace().len(), 3);
}

#[test]
fn test_pointer_parameters() {
    let mut session = session(&swap());
    session.run_to_end().unwrap();
    assert_eq!(session.output(), "2 1\n");
}

#[test]
fn test_array_decays_to_pointer() {
    let mut session = session(&array_through_pointer());
    session.next(4).unwrap();
    assert_eq!(session.print("a", None).to_string(), "[4, N/A, 6]");
    assert_eq!(session.print("a", Some(-1)), Inspection::Value(Value::Int(6)));
    assert_eq!(session.trace("a", Some(2)).records().len(), 4);

    session.run_to_end().unwrap();
    assert_eq!(session.output(), "10\n");
}

// ============================================
// Optimization
// ============================================

#[test]
fn test_optimization_preserves_output() {
    for unit in all_programs() {
        assert_eq!(output_of(&unit, OptLevel::Debug), output_of(&unit, OptLevel::Release));
    }
    assert_eq!(output_of(&redeclared_in_loop(), OptLevel::Release), "7");
    assert_eq!(output_of(&fibonacci(), OptLevel::Release), "5\n");
    assert_eq!(output_of(&calls_in_loop_control(), OptLevel::Release), "6\n");
}

#[test]
fn test_unread_initializer_still_faults() {
    for level in [OptLevel::Debug, OptLevel::Release] {
        let mut session = Session::new(&unread_division(0), SessionConfig::new().opt_level(level)).unwrap();
        session.next(1).unwrap();
        let err = session.next(1).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DivisionByZero);
        assert_eq!(session.current_line(), Some(3));
    }
}

#[test]
fn test_dead_stores_are_not_executed() {
    let release = || SessionConfig::new().opt_level(OptLevel::Release);
    let mut session = Session::new(&scenario(false), release()).unwrap();
    assert_eq!(visited_lines(&mut session), vec![2, 3, 4]);

    let mut session = Session::new(&scenario(false), release()).unwrap();
    session.next(2).unwrap();
    assert_eq!(session.trace("a", None).records(), &[(None, 2)]);
    assert_eq!(session.print("a", None), Inspection::Uninitialized);
}

#[test]
fn test_printed_variable_keeps_its_stores() {
    let mut program = Program::build(&scenario(true)).unwrap();
    let before = program.render();
    let stats = OptimizationPipeline::for_level(OptLevel::Release).optimize(&mut program);
    assert_eq!(stats.count("dead_store_elimination"), 0);
    assert_eq!(program.render(), before);
}

#[test]
fn test_optimization_keeps_graph_shape() {
    for unit in all_programs() {
        let mut program = Program::build(&unit).unwrap();
        let entries: Vec<_> = program
            .functions
            .in_source_order()
            .iter()
            .map(|f| f.entry)
            .collect();
        let before: Vec<_> = entries.iter().map(|&e| program.cfg.reachable(e)).collect();

        OptimizationPipeline::for_level(OptLevel::Release).optimize(&mut program);

        for (entry, reachable) in entries.iter().zip(before) {
            assert!(program.cfg.is_well_formed(*entry));
            assert_eq!(program.cfg.reachable(*entry), reachable);
        }
    }
}

#[test]
fn test_graph_listing() {
    let program = Program::build(&main_only(vec![
        Stmt::declare(2, vec![VarDecl::new("x", Type::Int).with_init(Expr::int(1))]),
        Stmt::if_else(
            3,
            Expr::binary(BinOp::Gt, ident("x"), Expr::int(0)),
            vec![Stmt::expr(4, assign("x", Expr::int(2)))],
            None,
        ),
        Stmt::ret(6, Some(ident("x"))),
    ]))
    .unwrap();
    insta::assert_snapshot!(program.render().trim_end(), @r"
    fn main() -> int  [line 1]
    n0:
        2: int x = 1
        3: if (x > 0) -> n1 | n2
    n1:
        4: x = 2
        -> n2
    n2:
        6: return x
        -> n3
    n3: (empty)
        end
    ");
}

// ============================================
// Input and errors
// ============================================

#[test]
fn test_json_input() {
    let json = r#"{"items": [{"Function": {
        "name": "main", "return_type": "Int", "params": [], "line": 1,
        "body": [
            {"line": 2, "kind": {"Declaration": [{"name": "a", "ty": "Int"}]}},
            {"line": 3, "kind": {"Expr": {"Assign": {"op": "Assign",
                "target": {"Identifier": "a"}, "value": {"Constant": {"Int": 2}}}}}},
            {"line": 4, "kind": {"Print": {"format": "%d", "value": {"Identifier": "a"}}}}
        ]
    }}]}"#;
    let unit: TranslationUnit = serde_json::from_str(json).unwrap();
    let mut session = session(&unit);
    assert_eq!(session.run_to_end().unwrap(), 3);
    assert_eq!(session.output(), "2");
}

#[test]
fn test_error_keeps_program_state() {
    let mut session = session(&main_only(vec![
        Stmt::declare(2, vec![VarDecl::new("x", Type::Int).with_init(Expr::int(0))]),
        Stmt::declare(3, vec![VarDecl::new("y", Type::Int)]),
        Stmt::expr(4, assign("y", Expr::binary(BinOp::Div, Expr::int(10), ident("x")))),
        Stmt::expr(5, assign("x", Expr::int(2))),
    ]));
    session.next(2).unwrap();

    let err = session.next(1).unwrap_err();
    assert_eq!(err.kind, ErrorKind::DivisionByZero);
    assert_eq!(session.current_line(), Some(4));
    assert!(!session.is_done());
    assert_eq!(session.print("y", None), Inspection::Uninitialized);
    assert_eq!(session.print("x", None), Inspection::Value(Value::Int(0)));

    let again = session.next(1).unwrap_err();
    assert_eq!(again.kind, ErrorKind::DivisionByZero);
    assert_eq!(session.steps(), 2);
}

#[test]
fn test_failed_step_leaves_no_partial_effects() {
    let mut session = session(&main_only(vec![
        Stmt::declare(
            2,
            vec![
                VarDecl::new("x", Type::Int).with_init(Expr::int(1)),
                VarDecl::new("z", Type::Int).with_init(Expr::int(0)),
                VarDecl::new("y", Type::Int),
            ],
        ),
        Stmt::expr(
            3,
            assign(
                "y",
                add(
                    Expr::unary(UnOp::Incr, ident("x")),
                    Expr::binary(BinOp::Div, Expr::int(10), ident("z")),
                ),
            ),
        ),
    ]));
    session.next(1).unwrap();

    for _ in 0..2 {
        let err = session.next(1).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DivisionByZero);
        assert_eq!(session.current_line(), Some(3));
        assert_eq!(session.print("x", None), Inspection::Value(Value::Int(1)));
        assert_eq!(session.trace("x", None).records(), &[(Some(Value::Int(1)), 2)]);
    }
}

#[test]
fn test_failed_return_can_be_retried() {
    let mut session = session(&TranslationUnit::new(vec![
        function(
            "one",
            Type::Int,
            vec![Param::new("n", Type::Int)],
            1,
            vec![Stmt::ret(2, Some(ident("n")))],
        ),
        function(
            "main",
            Type::Int,
            vec![],
            4,
            vec![
                Stmt::declare(
                    5,
                    vec![
                        VarDecl::new("z", Type::Int).with_init(Expr::int(0)),
                        VarDecl::new("y", Type::Int),
                    ],
                ),
                Stmt::expr(
                    6,
                    assign(
                        "y",
                        add(
                            Expr::call("one", vec![Expr::int(1)]),
                            Expr::binary(BinOp::Div, Expr::int(10), ident("z")),
                        ),
                    ),
                ),
            ],
        ),
    ]));
    session.next(2).unwrap();
    assert_eq!(session.current_line(), Some(2));

    // the return and the rest of line 6 run in one step, which fails
    for _ in 0..2 {
        let err = session.next(1).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DivisionByZero);
        assert_eq!(session.current_line(), Some(2));
        assert_eq!(session.backtrace().len(), 2);
        assert_eq!(session.print("n", None), Inspection::Value(Value::Int(1)));
    }
}

#[test]
fn test_build_errors() {
    let nested = main_only(vec![Stmt::declare(
        2,
        vec![VarDecl::new("m", Type::array_of(Type::array_of(Type::Int, 2), 2))],
    )]);
    let err = Session::new(&nested, SessionConfig::default()).err().unwrap();
    assert_eq!(err.line(), Some(2));

    let void_var = main_only(vec![Stmt::declare(3, vec![VarDecl::new("v", Type::Void)])]);
    assert!(Session::new(&void_var, SessionConfig::default()).is_err());
}
