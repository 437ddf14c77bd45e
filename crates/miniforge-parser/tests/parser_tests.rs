//! Parser tests: statements, precedence, directives and collected metadata.

use miniforge_lexer::Lexer;
use miniforge_parser::{ParseResult, Parser};
use miniforge_types::ast::*;
use miniforge_types::{ErrorCode, SourceFile};

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

fn parse(source: &str) -> ParseResult {
    let sf = SourceFile::new("test.src", source);
    let lex = Lexer::new(&sf).lex();
    Parser::new(lex.tokens, &sf).parse()
}

/// Parse source, panicking if there are errors.
fn parse_ok(source: &str) -> Chunk {
    let result = parse(source);
    if result.errors.has_errors() {
        for e in &result.errors.errors {
            eprintln!("  ERROR: {} ({}) at {}", e.message, e.code, e.span);
        }
        panic!("unexpected parse errors (see above)");
    }
    result.chunk
}

fn error_codes(source: &str) -> Vec<ErrorCode> {
    parse(source).errors.errors.iter().map(|e| e.code).collect()
}

/// Parse `x = <expr>` and return the assigned value.
fn parse_value(expr: &str) -> Expr {
    let chunk = parse_ok(&format!("x = {expr}"));
    match chunk.body.into_iter().next() {
        Some(Stmt::Assign(assign)) => assign.value,
        other => panic!("expected assignment, got {other:?}"),
    }
}

// ─────────────────────────────────────────────────────────────────────
// Statements
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_assignment_and_compound_assignment() {
    let chunk = parse_ok("a = 1\nb.c += 2\nd[0] ^= 3");
    let ops: Vec<_> = chunk
        .body
        .iter()
        .map(|s| match s {
            Stmt::Assign(a) => a.op,
            other => panic!("expected assignment, got {}", other.variant_name()),
        })
        .collect();
    assert_eq!(ops, vec![None, Some(AssignOp::Add), Some(AssignOp::Pow)]);
}

#[test]
fn test_invalid_assignment_target() {
    assert_eq!(
        error_codes("1 + 2 = 3"),
        vec![ErrorCode::INVALID_ASSIGNMENT_TARGET]
    );
}

#[test]
fn test_call_with_and_without_parens() {
    let chunk = parse_ok("print(\"a\", 1)\nprint \"b\", 2\nobj.method 3");
    assert_eq!(chunk.body.len(), 3);
    for stmt in &chunk.body {
        let Stmt::Call(call) = stmt else {
            panic!("expected call, got {}", stmt.variant_name());
        };
        assert!(matches!(call.call.kind, ExprKind::Call { .. }));
    }
    let Stmt::Call(command) = &chunk.body[1] else {
        unreachable!()
    };
    let ExprKind::Call { args, .. } = &command.call.kind else {
        unreachable!()
    };
    assert_eq!(args.len(), 2);
}

#[test]
fn test_bare_expression_statement() {
    let chunk = parse_ok("foo\nfoo.bar");
    assert!(chunk.body.iter().all(|s| matches!(s, Stmt::Expr(_))));
}

#[test]
fn test_semicolons_separate_statements() {
    let chunk = parse_ok("a = 1; b = 2;c = 3");
    assert_eq!(chunk.body.len(), 3);
}

#[test]
fn test_return_break_continue() {
    let chunk = parse_ok("f = function\n  while true\n    break\n    continue\n  end while\n  return\nend function\ng = function\n  return 1\nend function");
    let Stmt::Assign(f) = &chunk.body[0] else {
        panic!("expected assignment");
    };
    let ExprKind::Function(func) = &f.value.kind else {
        panic!("expected function");
    };
    assert!(matches!(
        func.body.stmts.last(),
        Some(Stmt::Return(ReturnStmt { value: None, .. }))
    ));
}

#[test]
fn test_if_else_if_else() {
    let chunk = parse_ok("if a then\n  b = 1\nelse if c then\n  b = 2\nelse\n  b = 3\nend if");
    let Stmt::If(stmt) = &chunk.body[0] else {
        panic!("expected if");
    };
    assert!(!stmt.inline);
    assert_eq!(stmt.clauses.len(), 2);
    assert!(stmt.else_block.is_some());
    assert_eq!(stmt.span.start_line, 1);
    assert_eq!(stmt.span.end_line, 7);
}

#[test]
fn test_block_span_ends_on_closing_keyword() {
    let chunk = parse_ok("while x\n  y = 1\n\nend while");
    let Stmt::While(stmt) = &chunk.body[0] else {
        panic!("expected while");
    };
    assert_eq!(stmt.body.stmts[0].span().end_line, 2);
    assert_eq!(stmt.body.span.end_line, 4);
}

#[test]
fn test_inline_if_with_else_if_chain() {
    let chunk = parse_ok("if a then b = 1 else if c then b = 2 else b = 3");
    let Stmt::If(stmt) = &chunk.body[0] else {
        panic!("expected if");
    };
    assert!(stmt.inline);
    assert_eq!(stmt.clauses.len(), 2);
    assert!(stmt.else_block.is_some());
}

#[test]
fn test_inline_if_followed_by_comment() {
    let chunk = parse_ok("if a then return // done");
    assert_eq!(chunk.body.len(), 2);
    assert!(matches!(chunk.body[1], Stmt::Comment(_)));
}

#[test]
fn test_for_loop() {
    let chunk = parse_ok("for item in items\n  print item\nend for");
    let Stmt::For(stmt) = &chunk.body[0] else {
        panic!("expected for");
    };
    assert_eq!(stmt.variable.name, "item");
    assert_eq!(stmt.body.stmts.len(), 1);
}

#[test]
fn test_comments_are_statements() {
    let chunk = parse_ok("// header\na = 1 // trailing\n");
    let texts: Vec<_> = chunk
        .body
        .iter()
        .filter_map(|s| match s {
            Stmt::Comment(c) => Some(c.text.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(texts, vec![" header", " trailing"]);
    assert_eq!(chunk.body[2].span().start_line, 2);
}

#[test]
fn test_unclosed_block() {
    assert!(error_codes("if a then\n  b = 1\n").contains(&ErrorCode::UNCLOSED_BLOCK));
    assert!(error_codes("while a\n  b = 1\nend for").contains(&ErrorCode::UNEXPECTED_TOKEN));
}

#[test]
fn test_stray_end_reports_error() {
    assert_eq!(error_codes("end if"), vec![ErrorCode::UNEXPECTED_TOKEN]);
}

#[test]
fn test_error_recovery_continues_after_bad_line() {
    let result = parse("a = )\nb = 2\nc = (\nd = 4");
    assert_eq!(result.errors.total_errors, 2);
    assert!(result
        .chunk
        .body
        .iter()
        .any(|s| matches!(s, Stmt::Assign(a) if matches!(&a.target.kind, ExprKind::Identifier(n) if n == "b"))));
}

// ─────────────────────────────────────────────────────────────────────
// Expressions
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_arithmetic_precedence() {
    let expr = parse_value("1 + 2 * 3");
    let ExprKind::Binary { op, right, .. } = expr.kind else {
        panic!("expected binary");
    };
    assert_eq!(op, BinaryOp::Add);
    assert!(matches!(
        right.kind,
        ExprKind::Binary {
            op: BinaryOp::Mul,
            ..
        }
    ));
}

#[test]
fn test_logical_precedence() {
    let expr = parse_value("a or b and not c");
    let ExprKind::Logical { op, right, .. } = expr.kind else {
        panic!("expected logical");
    };
    assert_eq!(op, LogicalOp::Or);
    let ExprKind::Logical { op, right, .. } = right.kind else {
        panic!("expected logical");
    };
    assert_eq!(op, LogicalOp::And);
    assert!(matches!(
        right.kind,
        ExprKind::Unary {
            op: UnaryOp::Not,
            ..
        }
    ));
}

#[test]
fn test_comparison_binds_looser_than_bitwise() {
    let expr = parse_value("a | b == c & d");
    let ExprKind::Comparison { left, op, right } = expr.kind else {
        panic!("expected comparison");
    };
    assert_eq!(op, ComparisonOp::Eq);
    assert!(matches!(left.kind, ExprKind::Binary { op: BinaryOp::BitOr, .. }));
    assert!(matches!(right.kind, ExprKind::Binary { op: BinaryOp::BitAnd, .. }));
}

#[test]
fn test_isa_comparison() {
    let expr = parse_value("v isa map");
    assert!(matches!(
        expr.kind,
        ExprKind::Comparison {
            op: ComparisonOp::Isa,
            ..
        }
    ));
}

#[test]
fn test_power_is_right_associative_and_binds_tighter_than_minus() {
    let expr = parse_value("2 ^ 3 ^ 2");
    let ExprKind::Binary { op, right, .. } = expr.kind else {
        panic!("expected binary");
    };
    assert_eq!(op, BinaryOp::Pow);
    assert!(matches!(right.kind, ExprKind::Binary { op: BinaryOp::Pow, .. }));

    let expr = parse_value("-2 ^ 2");
    assert!(matches!(
        expr.kind,
        ExprKind::Unary {
            op: UnaryOp::Neg,
            ..
        }
    ));
}

#[test]
fn test_negative_literal_folds() {
    let expr = parse_value("-5");
    let ExprKind::Literal(Literal::Number(number)) = &expr.kind else {
        panic!("expected number literal, got {:?}", expr.kind);
    };
    assert!(number.negated);
    assert_eq!(number.raw(), "-5");

    let chunk = parse_ok("x = -5");
    assert_eq!(chunk.literals.len(), 1);
    assert_eq!(chunk.literals[0].raw(), "-5");
}

#[test]
fn test_negated_identifier_stays_unary() {
    let expr = parse_value("-y");
    assert!(matches!(
        expr.kind,
        ExprKind::Unary {
            op: UnaryOp::Neg,
            ..
        }
    ));
}

#[test]
fn test_new_and_address_of() {
    let expr = parse_value("new Foo");
    assert!(matches!(expr.kind, ExprKind::Unary { op: UnaryOp::New, .. }));
    let expr = parse_value("@obj.method");
    let ExprKind::Unary { op, operand } = expr.kind else {
        panic!("expected unary");
    };
    assert_eq!(op, UnaryOp::AddressOf);
    assert!(matches!(operand.kind, ExprKind::Member { .. }));
}

#[test]
fn test_postfix_chain() {
    let expr = parse_value("a.b[1](2).c");
    let ExprKind::Member { base, member } = expr.kind else {
        panic!("expected member");
    };
    assert_eq!(member.name, "c");
    let ExprKind::Call { callee, args } = base.kind else {
        panic!("expected call");
    };
    assert_eq!(args.len(), 1);
    assert!(matches!(callee.kind, ExprKind::Index { .. }));
}

#[test]
fn test_slices() {
    for (src, has_start, has_end) in [
        ("s[1:2]", true, true),
        ("s[:2]", false, true),
        ("s[1:]", true, false),
        ("s[:]", false, false),
    ] {
        let ExprKind::Slice { start, end, .. } = parse_value(src).kind else {
            panic!("expected slice for {src}");
        };
        assert_eq!(start.is_some(), has_start, "{src}");
        assert_eq!(end.is_some(), has_end, "{src}");
    }
}

#[test]
fn test_list_and_map_literals_span_lines() {
    let expr = parse_value("[\n  1,\n  2,\n]");
    let ExprKind::List(items) = &expr.kind else {
        panic!("expected list");
    };
    assert_eq!(items.len(), 2);
    assert_eq!(expr.span.end_line, 4);

    let expr = parse_value("{ \"a\": 1,\n  \"b\": [2, 3] }");
    let ExprKind::Map(entries) = &expr.kind else {
        panic!("expected map");
    };
    assert_eq!(entries.len(), 2);
}

fn texts(comments: &[Comment]) -> Vec<&str> {
    comments.iter().map(|c| c.text.as_str()).collect()
}

#[test]
fn test_comments_in_lists_attach_to_items() {
    let expr = parse_value("[ // open\n  1, // one\n  // before two\n  2\n  // end\n]");
    let ExprKind::List(items) = &expr.kind else {
        panic!("expected list");
    };
    assert_eq!(items.len(), 2);
    assert_eq!(texts(&items[0].comments.leading), vec![" open"]);
    assert_eq!(texts(&items[0].comments.trailing), vec![" one"]);
    assert_eq!(texts(&items[1].comments.leading), vec![" before two"]);
    assert_eq!(texts(&items[1].comments.trailing), vec![" end"]);
    assert!(expr.comments.inner.is_empty());
}

#[test]
fn test_comments_in_empty_brackets_stay_on_the_node() {
    let expr = parse_value("f( // nothing\n)");
    assert_eq!(texts(&expr.comments.inner), vec![" nothing"]);

    let expr = parse_value("{\n  // todo\n}");
    assert_eq!(texts(&expr.comments.inner), vec![" todo"]);
}

#[test]
fn test_map_and_param_comments() {
    let expr = parse_value("{ \"a\": // colon\n  1, // after\n  \"b\": 2 }");
    let ExprKind::Map(entries) = &expr.kind else {
        panic!("expected map");
    };
    assert_eq!(texts(&entries[0].comments.trailing), vec![" colon", " after"]);
    assert!(entries[1].comments.is_empty());

    let expr = parse_value("function(a, // first\n  b)\nend function");
    let ExprKind::Function(func) = &expr.kind else {
        panic!("expected function");
    };
    assert_eq!(texts(&func.params[0].comments.trailing), vec![" first"]);
}

#[test]
fn test_comment_after_operator_leads_right_operand() {
    let expr = parse_value("a + // why\n  b");
    let ExprKind::Binary { right, .. } = &expr.kind else {
        panic!("expected binary");
    };
    assert_eq!(texts(&right.comments.leading), vec![" why"]);
}

#[test]
fn test_command_call_argument_comments() {
    let chunk = parse_ok("print a, // first\n  // second\n  b");
    let Some(Stmt::Call(call)) = chunk.body.first() else {
        panic!("expected call statement");
    };
    let ExprKind::Call { args, .. } = &call.call.kind else {
        panic!("expected call");
    };
    assert_eq!(texts(&args[0].comments.trailing), vec![" first"]);
    assert_eq!(texts(&args[1].comments.leading), vec![" second"]);
}

#[test]
fn test_line_continues_after_operator() {
    let chunk = parse_ok("x = 1 +\n  2\ny = 3");
    assert_eq!(chunk.body.len(), 2);
}

#[test]
fn test_parenthesized_expression_is_kept() {
    let expr = parse_value("(a + b) * c");
    let ExprKind::Binary { left, .. } = expr.kind else {
        panic!("expected binary");
    };
    assert!(matches!(left.kind, ExprKind::Paren(_)));
}

#[test]
fn test_function_with_defaults() {
    let expr = parse_value("function(a, b = 2, c = \"x\")\n  return a\nend function");
    let ExprKind::Function(func) = expr.kind else {
        panic!("expected function");
    };
    let names: Vec<_> = func.params.iter().map(|p| p.name.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    assert!(func.params[0].default.is_none());
    assert!(func.params[1].default.is_some());
}

#[test]
fn test_deep_nesting_is_rejected() {
    let source = format!("x = {}1{}", "(".repeat(150), ")".repeat(150));
    assert!(error_codes(&source).contains(&ErrorCode::NESTING_LIMIT_EXCEEDED));
}

// ─────────────────────────────────────────────────────────────────────
// Directives
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_import_include_debugger_directives() {
    let chunk = parse_ok("#import lib from \"lib/util\";\n#include \"shared.src\";\n#debugger;");
    assert!(matches!(&chunk.body[0], Stmt::Import(i) if i.name.name == "lib" && i.path == "lib/util"));
    assert!(matches!(&chunk.body[1], Stmt::Include(i) if i.path == "shared.src"));
    assert!(matches!(chunk.body[2], Stmt::Debugger(_)));
    assert_eq!(chunk.imports[0].path, "lib/util");
    assert_eq!(chunk.includes[0].path, "shared.src");
}

#[test]
fn test_expression_directives() {
    let chunk = parse_ok("a = #envar HOME;\nb = #inject \"data.txt\";\nc = #line;\nd = #filename; e = 1");
    let values: Vec<_> = chunk
        .body
        .iter()
        .filter_map(|s| match s {
            Stmt::Assign(a) => Some(&a.value.kind),
            _ => None,
        })
        .collect();
    assert_eq!(values.len(), 5);
    assert_eq!(values[0], &ExprKind::Envar("HOME".into()));
    assert_eq!(values[1], &ExprKind::Inject("data.txt".into()));
    assert_eq!(values[2], &ExprKind::Line);
    assert_eq!(values[3], &ExprKind::Filename);
    assert_eq!(chunk.injects[0].path, "data.txt");
}

#[test]
fn test_unknown_and_malformed_directives() {
    assert_eq!(error_codes("#nope;"), vec![ErrorCode::UNKNOWN_DIRECTIVE]);
    assert_eq!(
        error_codes("#import lib \"x\";"),
        vec![ErrorCode::MALFORMED_DIRECTIVE]
    );
    assert_eq!(
        error_codes("#include lib;"),
        vec![ErrorCode::MALFORMED_DIRECTIVE]
    );
}

#[test]
fn test_native_import_is_recorded() {
    let chunk = parse_ok("import_code(\"/lib/a.src\")\nimport_code(path)");
    assert_eq!(chunk.native_imports.len(), 1);
    assert_eq!(chunk.native_imports[0].path, "/lib/a.src");
}

// ─────────────────────────────────────────────────────────────────────
// Metadata
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_literals_in_source_order() {
    let chunk = parse_ok("a = \"x\" + 1.5\nb = [true, null, \"x\"]");
    let raws: Vec<_> = chunk.literals.iter().map(Literal::raw).collect();
    assert_eq!(raws, vec!["\"x\"", "1.5", "true", "null", "\"x\""]);
}

#[test]
fn test_scopes_collect_identifiers_per_function() {
    let chunk = parse_ok(
        "count = 0\nf = function(step)\n  local = step + count\n  return local\nend function\nprint f(2)",
    );
    assert_eq!(chunk.scopes.len(), 2);
    assert_eq!(chunk.scopes[0].identifiers, vec!["count", "f", "print"]);
    assert_eq!(chunk.scopes[1].identifiers, vec!["step", "local", "count"]);
}

#[test]
fn test_member_names_are_not_identifiers() {
    let chunk = parse_ok("a.b.c = 1");
    assert_eq!(chunk.identifiers().collect::<Vec<_>>(), vec!["a"]);
}

#[test]
fn test_parse_convenience_collects_lexer_errors() {
    let err = miniforge_parser::parse("a = \"open", "x.src").unwrap_err();
    assert_eq!(err.errors[0].code, ErrorCode::UNTERMINATED_STRING);
    assert_eq!(err.errors[0].file, "x.src");
}

#[test]
fn test_parse_is_deterministic() {
    let source = "if a then\n  b = [1, 2]\nend if\nf = function(x = 1)\n  return x ^ 2\nend function";
    let first = parse_ok(source);
    for _ in 0..100 {
        assert_eq!(parse_ok(source), first);
    }
}
