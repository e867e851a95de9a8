#[cfg(test)]
mod parser_tests {
    use treelox as lox;

    use lox::ast::Stmt;
    use lox::ast_printer::AstPrinter;
    use lox::error::LoxError;
    use lox::parser::Parser;
    use lox::scanner::scan_tokens;

    fn parse_ok(source: &str) -> Vec<Stmt> {
        match lox::parse_program(source) {
            Ok(statements) => statements,
            Err(errors) => panic!("unexpected parse errors for {:?}: {:?}", source, errors),
        }
    }

    fn printed(source: &str) -> Vec<String> {
        parse_ok(source).iter().map(AstPrinter::print_stmt).collect()
    }

    fn parse_errors(source: &str) -> Vec<String> {
        match lox::parse_program(source) {
            Ok(statements) => panic!("expected errors, parsed {:?}", statements),
            Err(errors) => errors.iter().map(|e| e.to_string()).collect(),
        }
    }

    #[test]
    fn test_precedence_and_grouping() {
        assert_eq!(
            printed("1 + 2 * 3 - (4 / 2);"),
            vec!["(; (- (+ 1.0 (* 2.0 3.0)) (group (/ 4.0 2.0))))"]
        );

        assert_eq!(
            printed("print !true == -1 < 2;"),
            vec!["(print (== (! true) (< (- 1.0) 2.0)))"]
        );
    }

    #[test]
    fn test_logical_operators_bind_looser_than_equality() {
        assert_eq!(
            printed("a or b and c == d;"),
            vec!["(; (or a (and b (== c d))))"]
        );
    }

    #[test]
    fn test_assignment_is_right_associative() {
        assert_eq!(printed("a = b = 3;"), vec!["(; (= a (= b 3.0)))"]);
    }

    #[test]
    fn test_property_get_set_and_call_chain() {
        assert_eq!(
            printed("obj.field.inner = make(1, \"two\")(3);"),
            vec!["(; (= (. (. obj field) inner) (call (call make 1.0 two) 3.0)))"]
        );
    }

    #[test]
    fn test_var_without_initializer_is_nil() {
        let statements = parse_ok("var a;");

        match &statements[0] {
            Stmt::Var { name, initializer } => {
                assert_eq!(name.name, "a");
                assert_eq!(AstPrinter::print(initializer), "nil");
            }
            other => panic!("expected var declaration, got {:?}", other),
        }
    }

    #[test]
    fn test_for_loop_desugars_into_while() {
        assert_eq!(
            printed("for (var i = 0; i < 3; i = i + 1) print i;"),
            vec!["(block (var i 0.0) (while (< i 3.0) (block (print i) (; (= i (+ i 1.0))))))"]
        );
    }

    #[test]
    fn test_for_loop_with_empty_clauses() {
        assert_eq!(printed("for (;;) break;"), vec!["(while true (break))"]);
    }

    #[test]
    fn test_if_else_and_blocks() {
        assert_eq!(
            printed("if (x) { print 1; } else print 2;"),
            vec!["(if x (block (print 1.0)) (print 2.0))"]
        );
    }

    #[test]
    fn test_function_and_class_declarations() {
        assert_eq!(
            printed("fun add(a, b) { return a + b; }"),
            vec!["(fun add (a b) (return (+ a b)))"]
        );

        assert_eq!(
            printed("class P { init(x) { this.x = x; } get() { return this.x; } }"),
            vec!["(class P (method init (x) (; (= (. this x) x))) (method get () (return (. this x))))"]
        );
    }

    #[test]
    fn test_bare_return() {
        assert_eq!(printed("fun f() { return; }"), vec!["(fun f () (return))"]);
    }

    #[test]
    fn test_errors_are_collected_after_synchronizing() {
        assert_eq!(
            parse_errors("var = 1;\nprint 2;\n1 +;"),
            vec![
                "[line 1] Error at '=': Expect variable name.",
                "[line 3] Error at ';': Expect expression.",
            ]
        );
    }

    #[test]
    fn test_error_at_end_of_input() {
        assert_eq!(
            parse_errors("print 1"),
            vec!["[line 1] Error at end: Expect ';' after value."]
        );
    }

    #[test]
    fn test_invalid_assignment_target() {
        assert_eq!(
            parse_errors("1 + 2 = 3;"),
            vec!["[line 1] Error at '=': Invalid assignment target."]
        );
    }

    #[test]
    fn test_argument_limit() {
        let args: Vec<String> = (0..255).map(|i| i.to_string()).collect();
        let source = format!("f({});", args.join(", "));
        assert_eq!(parse_ok(&source).len(), 1);

        let args: Vec<String> = (0..256).map(|i| i.to_string()).collect();
        let source = format!("f({});", args.join(", "));
        assert_eq!(
            parse_errors(&source),
            vec!["[line 1] Error at '255': Can't have more than 255 arguments."]
        );
    }

    #[test]
    fn test_parameter_limit() {
        let params: Vec<String> = (0..256).map(|i| format!("p{}", i)).collect();
        let source = format!("fun f({}) {{}}", params.join(", "));

        let errors = parse_errors(&source);
        assert_eq!(
            errors[0],
            "[line 1] Error at 'p255': Can't have more than 255 parameters."
        );
    }

    #[test]
    fn test_lex_errors_stop_before_parsing() {
        match lox::parse_program("print @;") {
            Err(errors) => {
                assert_eq!(errors.len(), 1);
                assert!(matches!(errors[0], LoxError::Lex { .. }));
            }
            Ok(statements) => panic!("expected a lex error, parsed {:?}", statements),
        }
    }

    #[test]
    fn test_single_expression() {
        let tokens = scan_tokens("(1 + 2) * x").expect("valid tokens");
        let expr = Parser::new(&tokens).parse_expression().expect("valid expression");
        assert_eq!(AstPrinter::print(&expr), "(* (group (+ 1.0 2.0)) x)");

        let tokens = scan_tokens("1 2").expect("valid tokens");
        let err = Parser::new(&tokens)
            .parse_expression()
            .expect_err("trailing token");
        assert_eq!(err.to_string(), "[line 1] Error at '2': Expect end of expression.");
    }

    #[test]
    fn test_ast_serializes_to_json() {
        let statements = parse_ok("print 1;");
        let json = serde_json::to_value(&statements).expect("serializable AST");

        assert_eq!(json[0]["Print"]["Literal"]["Number"], 1.0);
    }
}
