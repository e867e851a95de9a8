#[cfg(test)]
mod interpreter_tests {
    use std::cell::RefCell;
    use std::io::{self, Write};
    use std::rc::Rc;

    use treelox as lox;

    use lox::config::InterpreterConfig;
    use lox::error::{ErrorKind, LoxError, ResolveError, RuntimeError};
    use lox::value::Value;
    use lox::Lox;

    /// Print sink the test can read back after the interpreter has written to it.
    #[derive(Clone, Default)]
    struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.borrow().clone()).expect("utf-8 output")
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn session() -> (Lox, SharedBuffer) {
        let buffer = SharedBuffer::default();
        (Lox::with_output(Box::new(buffer.clone())), buffer)
    }

    fn run(source: &str) -> String {
        let (mut lox, buffer) = session();
        if let Err(errors) = lox.run(source) {
            panic!("program failed: {:?}\noutput so far:\n{}", errors, buffer.contents());
        }
        buffer.contents()
    }

    fn run_err(source: &str) -> (LoxError, String) {
        let (mut lox, buffer) = session();
        let mut errors = lox.run(source).expect_err("program should fail");
        assert_eq!(errors.len(), 1, "errors: {:?}", errors);
        (errors.remove(0), buffer.contents())
    }

    fn runtime_err(source: &str) -> RuntimeError {
        match run_err(source).0 {
            LoxError::Runtime(e) => e,
            other => panic!("expected runtime error, got {:?}", other),
        }
    }

    // ── values and operators ────────────────────────────────────────────

    #[test]
    fn test_arithmetic_and_number_display() {
        assert_eq!(
            run("print 1 + 2; print 7 / 2; print -3 * 2; print 0.1 + 0.2; print -0;"),
            "3\n3.5\n-6\n0.30000000000000004\n-0\n"
        );
    }

    #[test]
    fn test_plus_is_numeric_only() {
        let err = runtime_err("print \"a\" + \"b\";");
        assert!(matches!(err, RuntimeError::OperandsMustBeNumbers { line: 1 }));
        assert_eq!(err.kind(), ErrorKind::Type);
    }

    #[test]
    fn test_division_by_zero() {
        let err = runtime_err("print 1 / 0;");
        assert_eq!(err.to_string(), "Division by zero.\n[line 1]");
        assert_eq!(err.kind(), ErrorKind::Arithmetic);
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(
            run("print 1 < 2; print 2 <= 2; print \"a\" < \"b\"; print 3 > 4; print 1 == 1;"),
            "true\ntrue\ntrue\nfalse\ntrue\n"
        );

        assert!(matches!(
            runtime_err("print 1 < \"x\";"),
            RuntimeError::OperandsMustBeComparable { .. }
        ));
    }

    #[test]
    fn test_equality_across_types() {
        assert_eq!(
            run("print nil == false; print 1 == \"1\"; print nil == nil; print \"a\" != \"a\";"),
            "false\nfalse\ntrue\nfalse\n"
        );
    }

    #[test]
    fn test_unary_operators() {
        assert_eq!(run("print !nil; print !0; print -(-2);"), "true\nfalse\n2\n");

        assert!(matches!(
            runtime_err("print -\"x\";"),
            RuntimeError::OperandMustBeNumber { line: 1 }
        ));
    }

    #[test]
    fn test_truthiness() {
        assert_eq!(
            run("if (0) print \"yes\"; else print \"no\"; if (\"\") print \"empty\"; if (nil) print \"nil\"; else print \"falsy\";"),
            "yes\nempty\nfalsy\n"
        );
    }

    #[test]
    fn test_logical_operators_return_operands() {
        assert_eq!(
            run("print 1 or 2; print false or \"x\"; print nil and 1; print 1 and 2;"),
            "1\nx\nnil\n2\n"
        );
    }

    #[test]
    fn test_logical_operators_short_circuit() {
        let source = "
            var called = false;
            fun touch() { called = true; return true; }
            print true or touch();
            print false and touch();
            print called;
        ";
        assert_eq!(run(source), "true\nfalse\nfalse\n");
    }

    // ── variables and scope ─────────────────────────────────────────────

    #[test]
    fn test_shadowing() {
        assert_eq!(run("var a = 1; { var a = 2; print a; }"), "2\n");
        assert_eq!(run("var a = 1; { var a = 2; } print a;"), "1\n");
    }

    #[test]
    fn test_uninitialized_var_is_nil() {
        assert_eq!(run("var a; print a;"), "nil\n");
    }

    #[test]
    fn test_assignment_reaches_enclosing_scope() {
        assert_eq!(run("var a = 1; { a = 2; { a = a + 1; } } print a;"), "3\n");
    }

    #[test]
    fn test_undefined_variable() {
        let err = runtime_err("print missing;");
        assert_eq!(err.to_string(), "Undefined variable 'missing'.\n[line 1]");
        assert_eq!(err.kind(), ErrorKind::Name);

        assert!(matches!(
            runtime_err("missing = 1;"),
            RuntimeError::UndefinedVariable { .. }
        ));
    }

    #[test]
    fn test_self_initializer_never_executes() {
        let (err, output) = run_err("print \"before\"; var a = a;");

        assert!(matches!(
            err,
            LoxError::Resolve(ResolveError::SelfReference { .. })
        ));
        assert!(err.is_static());
        assert_eq!(output, "");
    }

    // ── control flow ────────────────────────────────────────────────────

    #[test]
    fn test_while_and_for_loops() {
        assert_eq!(
            run("var i = 0; while (i < 3) { print i; i = i + 1; }"),
            "0\n1\n2\n"
        );
        assert_eq!(
            run("for (var i = 0; i < 3; i = i + 1) print i * 10;"),
            "0\n10\n20\n"
        );
    }

    #[test]
    fn test_break_in_nested_if_leaves_only_inner_loop() {
        let source = "
            for (var i = 0; i < 2; i = i + 1) {
                var j = 0;
                while (true) {
                    if (j == 2) { break; }
                    print i * 10 + j;
                    j = j + 1;
                }
            }
            print \"done\";
        ";
        assert_eq!(run(source), "0\n1\n10\n11\ndone\n");
    }

    #[test]
    fn test_return_unwinds_blocks_and_loops() {
        let source = "
            fun find() {
                var i = 0;
                while (true) {
                    {
                        if (i == 3) { return i; }
                    }
                    i = i + 1;
                }
                print \"unreachable\";
            }
            print find();
        ";
        assert_eq!(run(source), "3\n");
    }

    #[test]
    fn test_function_without_return_yields_nil() {
        assert_eq!(run("fun f() {} print f(); fun g() { return; } print g();"), "nil\nnil\n");
    }

    // ── functions and closures ──────────────────────────────────────────

    #[test]
    fn test_recursion() {
        let source = "
            fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); }
            print fib(15);
        ";
        assert_eq!(run(source), "610\n");
    }

    #[test]
    fn test_closure_counter_shares_frame() {
        let source = "
            fun makeCounter() {
                var count = 0;
                fun increment() { count = count + 1; return count; }
                return increment;
            }
            var a = makeCounter();
            var b = makeCounter();
            print a(); print a(); print b();
        ";
        assert_eq!(run(source), "1\n2\n1\n");
    }

    #[test]
    fn test_each_iteration_gets_its_own_frame() {
        let source = "
            var first; var second;
            for (var i = 0; i < 2; i = i + 1) {
                var j = i;
                fun show() { print j; }
                if (j == 0) first = show; else second = show;
            }
            first();
            second();
        ";
        assert_eq!(run(source), "0\n1\n");
    }

    #[test]
    fn test_closure_binds_at_declaration_not_call() {
        let source = "
            var a = \"global\";
            {
                fun show() { print a; }
                show();
                var a = \"block\";
                show();
            }
        ";
        assert_eq!(run(source), "global\nglobal\n");
    }

    #[test]
    fn test_callable_display() {
        assert_eq!(
            run("fun f() {} class C {} print f; print C; print C(); print clock;"),
            "<fn f>\nC\nC instance\n<native fn>\n"
        );
    }

    #[test]
    fn test_arity_mismatch() {
        let err = runtime_err("fun f(a, b) {} f(1);");
        assert_eq!(err.to_string(), "Expected 2 arguments but got 1.\n[line 1]");
        assert_eq!(err.kind(), ErrorKind::Argument);
    }

    #[test]
    fn test_calling_a_non_callable() {
        assert!(matches!(
            runtime_err("\"text\"();"),
            RuntimeError::NotCallable { line: 1 }
        ));
    }

    #[test]
    fn test_clock_is_a_monotonic_number() {
        assert_eq!(
            run("var a = clock(); var b = clock(); print a <= b; print a >= 0;"),
            "true\ntrue\n"
        );
    }

    #[test]
    fn test_deep_recursion_reports_stack_overflow() {
        let buffer = SharedBuffer::default();
        let mut lox = Lox::with_output(Box::new(buffer.clone()))
            .with_config(InterpreterConfig::default().with_max_call_depth(64));

        let errors = lox
            .run("fun down(n) { return down(n + 1); } down(0);")
            .expect_err("recursion has no base case");

        match &errors[0] {
            LoxError::Runtime(e) => {
                assert!(matches!(e, RuntimeError::StackOverflow { .. }));
                assert_eq!(e.kind(), ErrorKind::Resource);
            }
            other => panic!("expected stack overflow, got {:?}", other),
        }

        // Depth bookkeeping is reset; ordinary calls work again.
        lox.run("fun one() { return 1; } print one();")
            .expect("session recovers");
        assert_eq!(buffer.contents(), "1\n");
    }

    #[test]
    fn test_default_depth_allows_deep_recursion() {
        let source = "
            fun count(n) { if (n == 0) return 0; return 1 + count(n - 1); }
            print count(1000);
        ";
        assert_eq!(run(source), "1000\n");
    }

    // ── classes ─────────────────────────────────────────────────────────

    #[test]
    fn test_class_with_initializer() {
        let source = "
            class C { init(x) { this.x = x; } get() { return this.x; } }
            var c = C(5);
            print c.get();
        ";
        assert_eq!(run(source), "5\n");
    }

    #[test]
    fn test_class_arity_follows_init() {
        let err = runtime_err("class C { init(x) { this.x = x; } } C();");
        assert!(matches!(
            err,
            RuntimeError::ArityMismatch {
                expected: 1,
                got: 0,
                ..
            }
        ));

        assert!(matches!(
            runtime_err("class D {} D(1);"),
            RuntimeError::ArityMismatch { expected: 0, .. }
        ));
    }

    #[test]
    fn test_reinvoked_init_returns_the_instance() {
        let source = "
            class C { init(x) { this.x = x; } }
            var c = C(5);
            var same = c.init(9);
            print same == c;
            print c.x;
            print C(5).init(7);
        ";
        assert_eq!(run(source), "true\n9\nC instance\n");
    }

    #[test]
    fn test_bare_return_in_init_still_yields_instance() {
        let source = "
            class C { init() { this.ready = true; return; } }
            print C().ready;
        ";
        assert_eq!(run(source), "true\n");
    }

    #[test]
    fn test_fields_shadow_methods() {
        let source = "
            class C { name() { return \"method\"; } }
            var c = C();
            print c.name();
            c.name = \"field\";
            print c.name;
        ";
        assert_eq!(run(source), "method\nfield\n");
    }

    #[test]
    fn test_bound_method_remembers_receiver() {
        let source = "
            class Greeter {
                init(who) { this.who = who; }
                greet() { print \"hi \" ; print this.who; }
            }
            var greet = Greeter(\"bob\").greet;
            greet();
        ";
        assert_eq!(run(source), "hi \nbob\n");
    }

    #[test]
    fn test_methods_can_reference_their_class() {
        let source = "
            class Node {
                make() { return Node(); }
            }
            print Node().make();
        ";
        assert_eq!(run(source), "Node instance\n");
    }

    #[test]
    fn test_instances_compare_by_identity() {
        assert_eq!(
            run("class A {} var a = A(); var b = A(); print a == a; print a == b;"),
            "true\nfalse\n"
        );
    }

    #[test]
    fn test_property_errors() {
        let err = runtime_err("class A {} A().missing;");
        assert_eq!(err.to_string(), "Undefined property 'missing'.\n[line 1]");
        assert_eq!(err.kind(), ErrorKind::Attribute);

        assert!(matches!(
            runtime_err("var x = 1; print x.field;"),
            RuntimeError::NotAnInstance { .. }
        ));
        assert!(matches!(
            runtime_err("var x = 1; x.field = 2;"),
            RuntimeError::NotAnInstance { .. }
        ));
    }

    // ── sessions ────────────────────────────────────────────────────────

    #[test]
    fn test_output_before_runtime_error_is_kept() {
        let (err, output) = run_err("print 1; print nil + 1; print 2;");
        assert!(!err.is_static());
        assert_eq!(output, "1\n");
    }

    #[test]
    fn test_session_recovers_after_runtime_error() {
        let (mut lox, buffer) = session();

        lox.run("var kept = \"still here\";").expect("defines a global");
        lox.run("{ var inner = 1; print undefinedThing; }")
            .expect_err("runtime error inside a block");

        // The failed block's frame is gone; globals are intact.
        lox.run("var after = 2; print kept; print after;")
            .expect("session continues");

        assert_eq!(buffer.contents(), "still here\n2\n");
    }

    #[test]
    fn test_closures_survive_across_runs() {
        let (mut lox, buffer) = session();

        lox.run("fun make() { var n = 0; fun next() { n = n + 1; return n; } return next; } var c = make();")
            .expect("defines closure");
        lox.run("print c();").expect("first call");
        lox.run("print c();").expect("second call");

        assert_eq!(buffer.contents(), "1\n2\n");
    }

    #[test]
    fn test_static_error_runs_nothing() {
        let (err, output) = run_err("print \"never\"; return 1;");

        assert!(matches!(
            err,
            LoxError::Resolve(ResolveError::ReturnOutsideFunction { .. })
        ));
        assert_eq!(output, "");
    }

    #[test]
    fn test_evaluate_single_expression() {
        let (mut lox, _) = session();

        lox.run("var base = 40;").expect("defines a global");

        let value = lox.evaluate("base + 2").expect("evaluates");
        assert_eq!(value, Value::Number(42.0));
        assert_eq!(value.to_string(), "42");

        let value = lox.evaluate("\"a\" == \"a\"").expect("evaluates");
        assert_eq!(value, Value::Bool(true));
    }
}
