//! Stylesheet-level parser tests: rules, declarations, at-rules, recovery.

use sasso_parser::{parse_expression, parse_stylesheet, ParseResult};
use sasso_types::ast::*;
use sasso_types::{ErrorCode, SourceFile, Span};

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

fn parse(source: &str) -> ParseResult {
    let sf = SourceFile::new("test.scss", source);
    parse_stylesheet(&sf)
}

fn parse_ok(source: &str) -> Vec<Stmt> {
    let result = parse(source);
    if result.errors.has_errors() {
        for e in &result.errors.errors {
            eprintln!("  ERROR: {} ({})", e.message, e.code);
        }
        panic!("unexpected parse errors (see above)");
    }
    result.stylesheet.nodes
}

fn error_codes(source: &str) -> Vec<ErrorCode> {
    parse(source).errors.errors.iter().map(|e| e.code).collect()
}

fn only(source: &str) -> Stmt {
    let mut nodes = parse_ok(source);
    assert_eq!(nodes.len(), 1, "expected one statement, got {nodes:?}");
    nodes.remove(0)
}

// ══════════════════════════════════════════════════════════════════════
// Rules & Declarations
// ══════════════════════════════════════════════════════════════════════

#[test]
fn test_nested_rule_with_declarations() {
    let Stmt::Rule(rule) = only(".a { color: red; .b { margin: 0 } }") else {
        panic!("expected rule");
    };
    assert_eq!(rule.selector, ".a");
    assert_eq!(rule.body.len(), 2);
    assert!(matches!(rule.body[0], Stmt::Declaration(ref d) if d.property == "color"));
    assert!(matches!(rule.body[1], Stmt::Rule(ref r) if r.selector == ".b"));
}

#[test]
fn test_pseudo_class_selector_is_rule() {
    let Stmt::Rule(rule) = only("a:hover { color: blue; }") else {
        panic!("expected rule");
    };
    assert_eq!(rule.selector, "a:hover");
}

#[test]
fn test_multiline_selector_is_collapsed() {
    let Stmt::Rule(rule) = only(".a,\n   .b { x: y }") else {
        panic!("expected rule");
    };
    assert_eq!(rule.selector, ".a, .b");
}

#[test]
fn test_important_flag() {
    let Stmt::Rule(rule) = only("p { color: red !important; }") else {
        panic!("expected rule");
    };
    let Stmt::Declaration(decl) = &rule.body[0] else {
        panic!("expected declaration");
    };
    assert!(decl.important);
}

#[test]
fn test_nested_property_block() {
    let Stmt::Rule(rule) = only("p { font: { family: serif; size: 12px; } }") else {
        panic!("expected rule");
    };
    let Stmt::Declaration(decl) = &rule.body[0] else {
        panic!("expected declaration");
    };
    assert_eq!(decl.property, "font");
    assert!(decl.value.is_none());
    assert_eq!(decl.children.len(), 2);
}

#[test]
fn test_custom_property_keeps_raw_value() {
    let Stmt::Rule(rule) = only(":root { --gap: 1px  2px; --accent: var(--base, #fff); }") else {
        panic!("expected rule");
    };
    let Stmt::CustomProperty(first) = &rule.body[0] else {
        panic!("expected custom property");
    };
    assert_eq!(first.property, "--gap");
    assert_eq!(first.value, "1px  2px");
    let Stmt::CustomProperty(second) = &rule.body[1] else {
        panic!("expected custom property");
    };
    assert_eq!(second.value, "var(--base, #fff)");
}

#[test]
fn test_unparseable_value_falls_back_to_raw_text() {
    let Stmt::Rule(rule) = only("a { filter: progid:DXImageTransform.Microsoft.gradient(a=1); }") else {
        panic!("expected rule");
    };
    let Stmt::Declaration(decl) = &rule.body[0] else {
        panic!("expected declaration");
    };
    assert!(matches!(
        decl.value.as_ref().map(|v| &v.kind),
        Some(ExprKind::String { quoted: false, .. })
    ));
}

#[test]
fn test_line_comments_dropped_loud_comments_kept() {
    let nodes = parse_ok("// gone\n/* kept */\na { b: c; }");
    assert_eq!(nodes.len(), 2);
    assert!(matches!(nodes[0], Stmt::Comment(ref c) if c.text == "/* kept */"));
}

// ══════════════════════════════════════════════════════════════════════
// Variables
// ══════════════════════════════════════════════════════════════════════

#[test]
fn test_variable_flags() {
    let Stmt::Variable(var) = only("$size: 10px !default;") else {
        panic!("expected variable");
    };
    assert_eq!(var.name, "size");
    assert!(var.default);
    assert!(!var.global);
}

#[test]
fn test_namespaced_variable_assignment() {
    let Stmt::Variable(var) = only("lib.$color: red;") else {
        panic!("expected variable");
    };
    assert_eq!(var.namespace.as_deref(), Some("lib"));
    assert_eq!(var.name, "color");
}

#[test]
fn test_unknown_variable_flag_is_error() {
    assert!(error_codes("$a: 1 !bogus;").contains(&ErrorCode::UNEXPECTED_TOKEN));
}

// ══════════════════════════════════════════════════════════════════════
// At-Rules
// ══════════════════════════════════════════════════════════════════════

#[test]
fn test_use_with_alias_and_config() {
    let Stmt::Use(rule) = only("@use \"theme\" as t with ($primary: blue, $size: 2px !default);") else {
        panic!("expected @use");
    };
    assert_eq!(rule.url, "theme");
    assert_eq!(rule.namespace.as_deref(), Some("t"));
    assert_eq!(rule.config.len(), 2);
    assert!(rule.config[1].default);
}

#[test]
fn test_use_with_config_and_no_alias() {
    let Stmt::Use(rule) = only("@use 'lib' with ($a: 1);") else {
        panic!("expected @use");
    };
    assert!(rule.namespace.is_none());
    assert_eq!(rule.config.len(), 1);
}

#[test]
fn test_forward_prefix_and_show() {
    let Stmt::Forward(rule) = only("@forward \"src/list\" as list-* show add, $limit;") else {
        panic!("expected @forward");
    };
    assert_eq!(rule.prefix.as_deref(), Some("list-"));
    assert_eq!(
        rule.filter,
        Some(ForwardFilter::Show(vec!["add".into(), "$limit".into()]))
    );
}

#[test]
fn test_import_mixed_targets() {
    let Stmt::Import(rule) = only("@import 'a', \"b.css\", url(c);") else {
        panic!("expected @import");
    };
    assert_eq!(
        rule.targets,
        vec![
            ImportTarget::Sass("a".into()),
            ImportTarget::Css("\"b.css\"".into()),
            ImportTarget::Css("url(c)".into()),
        ]
    );
}

#[test]
fn test_mixin_definition_and_include_with_content() {
    let nodes = parse_ok(
        "@mixin box($w, $h: 10px, $rest...) { width: $w; @content; }\n\
         .a { @include box(5px, $h: 2px) { color: red; } }",
    );
    let Stmt::MixinDef(mixin) = &nodes[0] else {
        panic!("expected @mixin");
    };
    assert_eq!(mixin.name, "box");
    assert_eq!(mixin.params.len(), 3);
    assert!(matches!(mixin.body[1], Stmt::Content(_)));

    let Stmt::Rule(rule) = &nodes[1] else {
        panic!("expected rule");
    };
    let Stmt::Include(include) = &rule.body[0] else {
        panic!("expected @include");
    };
    assert_eq!(include.args.len(), 2);
    assert_eq!(include.args[1].name.as_deref(), Some("h"));
    assert_eq!(include.content.as_ref().map(Vec::len), Some(1));
}

#[test]
fn test_namespaced_include() {
    let Stmt::Include(include) = only("@include lib.reset;") else {
        panic!("expected @include");
    };
    assert_eq!(include.qualified_name(), "lib.reset");
    assert!(include.content.is_none());
}

#[test]
fn test_function_with_return() {
    let Stmt::FunctionDef(function) = only("@function double($n) { @return $n * 2; }") else {
        panic!("expected @function");
    };
    assert!(matches!(function.body[0], Stmt::Return(_)));
}

#[test]
fn test_if_else_chain() {
    let Stmt::If(rule) = only(
        "@if $a == 1 { a: b } @else if $a == 2 { c: d } @elseif $a == 3 { e: f } @else { g: h }",
    ) else {
        panic!("expected @if");
    };
    assert_eq!(rule.clauses.len(), 3);
    assert!(rule.else_body.is_some());
}

#[test]
fn test_each_with_destructuring() {
    let Stmt::Each(rule) = only("@each $key, $value in $map { a: b }") else {
        panic!("expected @each");
    };
    assert_eq!(rule.variables, vec!["key".to_string(), "value".to_string()]);
}

#[test]
fn test_for_through_and_to() {
    let Stmt::For(through) = only("@for $i from 1 through 3 { a: b }") else {
        panic!("expected @for");
    };
    assert!(through.inclusive);
    assert_eq!(through.variable, "i");
    let Stmt::For(to) = only("@for $i from 1 to $n { a: b }") else {
        panic!("expected @for");
    };
    assert!(!to.inclusive);
}

#[test]
fn test_extend_optional() {
    let Stmt::Rule(rule) = only(".a { @extend %base !optional; }") else {
        panic!("expected rule");
    };
    assert!(matches!(
        rule.body[0],
        Stmt::Extend(ref e) if e.selector == "%base" && e.optional
    ));
}

#[test]
fn test_media_with_nested_rule() {
    let Stmt::AtRule(rule) = only("@media screen and (min-width: 100px) { .a { b: c } }") else {
        panic!("expected at-rule");
    };
    assert_eq!(rule.name, "media");
    assert_eq!(rule.params, "screen and (min-width: 100px)");
    assert_eq!(rule.body.as_ref().map(Vec::len), Some(1));
}

#[test]
fn test_statement_at_rule_without_body() {
    let Stmt::AtRule(rule) = only("@charset \"utf-8\";") else {
        panic!("expected at-rule");
    };
    assert!(rule.body.is_none());
}

#[test]
fn test_keyframes_percent_selectors() {
    let Stmt::AtRule(rule) = only("@keyframes spin { from { a: b } 50% { c: d } }") else {
        panic!("expected at-rule");
    };
    let body = rule.body.expect("body");
    assert!(matches!(body[1], Stmt::Rule(ref r) if r.selector == "50%"));
}

// ══════════════════════════════════════════════════════════════════════
// Errors & Recovery
// ══════════════════════════════════════════════════════════════════════

#[test]
fn test_unclosed_block() {
    assert!(error_codes(".a { color: red;").contains(&ErrorCode::UNCLOSED_BLOCK));
}

#[test]
fn test_stray_else() {
    assert!(error_codes("@else { a: b }").contains(&ErrorCode::INVALID_AT_RULE));
}

#[test]
fn test_recovery_continues_after_bad_statement() {
    let result = parse("$: 1;\n.ok { a: b }");
    assert!(result.errors.has_errors());
    assert!(result
        .stylesheet
        .nodes
        .iter()
        .any(|n| matches!(n, Stmt::Rule(r) if r.selector == ".ok")));
}

#[test]
fn test_error_carries_source_line() {
    let result = parse(".a {\n  $x: (1 + ;\n}");
    let error = result.errors.first().expect("error");
    assert_eq!(error.span.start_line, 2);
    assert_eq!(error.source_line, "  $x: (1 + ;");
}

#[test]
fn test_parse_expression_entry_point() {
    let expr = parse_expression("1px + 2px", "inline", Span::point(1, 1)).expect("parse");
    assert!(matches!(expr.kind, ExprKind::Binary { op: BinOp::Add, .. }));
    assert!(parse_expression("(", "inline", Span::point(1, 1)).is_err());
}
