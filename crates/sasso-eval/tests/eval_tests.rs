//! End-to-end tests for the Sasso evaluator: SCSS in, expanded CSS out.
//!
//! Covers arithmetic and units, variables and scoping, control flow,
//! functions, mixins, `@extend`, both truthiness flavours, messages and
//! source mappings.

use pretty_assertions::assert_eq;
use sasso_eval::{EngineConfig, Evaluator, MemoryLoader, Value};
use std::rc::Rc;

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

fn evaluator() -> Evaluator {
    Evaluator::new(EngineConfig::default(), Rc::new(MemoryLoader::new()))
}

/// Compile and return the CSS (panics on errors).
fn css(source: &str) -> String {
    match evaluator().compile_string(source, "input.scss") {
        Ok(out) => out.css,
        Err(err) => panic!("compile failed: {} (line {})", err.message, err.span.start_line),
    }
}

/// Compile and return the error message (panics on success).
fn error(source: &str) -> String {
    match evaluator().compile_string(source, "input.scss") {
        Ok(out) => panic!("expected an error, got:\n{}", out.css),
        Err(err) => err.message,
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Arithmetic & units
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn multiplication_keeps_unit() {
    assert_eq!(css(".a { width: 2 * 3px; }"), ".a {\n  width: 6px;\n}");
}

#[test]
fn scientific_notation_numbers() {
    assert_eq!(
        css(".a { width: 1e3px; opacity: 2.5e-1; margin: 1em; }"),
        ".a {\n  width: 1000px;\n  opacity: 0.25;\n  margin: 1em;\n}"
    );
}

#[test]
fn unitless_operand_takes_other_unit() {
    assert_eq!(
        css("$x: 10px;\n.a { width: $x + 5; }"),
        ".a {\n  width: 15px;\n}"
    );
}

#[test]
fn same_unit_addition() {
    assert_eq!(css(".a { w: 10px + 5px; }"), ".a {\n  w: 15px;\n}");
}

#[test]
fn incompatible_units_fail() {
    let message = error(".a { width: 10px + 1in; }");
    assert!(message.contains("Incompatible units"), "{message}");
}

#[test]
fn division_cancels_compatible_units() {
    assert_eq!(css(".a { r: 96px / 1in == 1; }"), ".a {\n  r: true;\n}");
}

#[test]
fn font_shorthand_slash_is_kept() {
    assert_eq!(css(".a { font: 12px/1.5 serif; }"), ".a {\n  font: 12px/1.5 serif;\n}");
}

#[test]
fn division_by_zero_fails() {
    let message = error(".a { w: math.div(1px, 0); }");
    assert!(message.contains("Division by zero"), "{message}");
}

#[test]
fn calc_keeps_mixed_units() {
    assert_eq!(
        css(".a { w: calc(100% - 10px); }"),
        ".a {\n  w: calc(100% - 10px);\n}"
    );
}

// ══════════════════════════════════════════════════════════════════════════════
// Variables & scoping
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn default_keeps_existing_value() {
    assert_eq!(
        css("$c: red;\n$c: blue !default;\n.a { color: $c; }"),
        ".a {\n  color: red;\n}"
    );
}

#[test]
fn local_variable_does_not_leak() {
    let message = error(".a { $local: 1px; }\n.b { w: $local; }");
    assert_eq!(message, "Undefined variable: $local");
}

#[test]
fn global_flag_writes_root_scope() {
    assert_eq!(
        css("$g: 1;\n.a { $g: 2 !global; }\n.b { v: $g; }"),
        ".b {\n  v: 2;\n}"
    );
}

#[test]
fn undefined_variable_reports_line() {
    let err = evaluator()
        .compile_string(".a {\n  w: $nope;\n}", "input.scss")
        .unwrap_err();
    assert_eq!(err.message, "Undefined variable: $nope");
    assert_eq!(err.span.start_line, 2);
    assert_eq!(err.source_line, "  w: $nope;");
}

#[test]
fn hyphen_and_underscore_names_are_the_same() {
    assert_eq!(css("$font_size: 2px;\n.a { s: $font-size; }"), ".a {\n  s: 2px;\n}");
}

// ══════════════════════════════════════════════════════════════════════════════
// Control flow
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn each_over_map_destructures_pairs() {
    assert_eq!(
        css("@each $k, $v in (a: 1, b: 2) { .#{$k} { z: $v; } }"),
        ".a {\n  z: 1;\n}\n\n.b {\n  z: 2;\n}"
    );
}

#[test]
fn each_with_three_variables_fails() {
    let message = error("@each $a, $b, $c in 1 2 3 { .x { y: $a; } }");
    assert!(message.contains("at most two"), "{message}");
}

#[test]
fn for_through_includes_end() {
    assert_eq!(
        css("@for $i from 1 through 3 { .m-#{$i} { margin: $i * 1px; } }"),
        ".m-1 {\n  margin: 1px;\n}\n\n.m-2 {\n  margin: 2px;\n}\n\n.m-3 {\n  margin: 3px;\n}"
    );
}

#[test]
fn for_to_excludes_end_and_counts_down() {
    assert_eq!(
        css("@for $i from 3 to 1 { .n-#{$i} { v: $i; } }"),
        ".n-3 {\n  v: 3;\n}\n\n.n-2 {\n  v: 2;\n}"
    );
}

#[test]
fn for_at_integer_limits_does_not_overflow() {
    assert_eq!(
        css("@for $i from 9223372036854775807 through 9223372036854775807 { .a { v: 1; } }"),
        ".a {\n  v: 1;\n}"
    );
    assert_eq!(
        css("@for $i from -9223372036854775808 through -9223372036854775808 { .b { v: 2; } }"),
        ".b {\n  v: 2;\n}"
    );
    assert_eq!(css("@for $i from 9223372036854775807 to 9223372036854775807 { .c { v: 3; } }"), "");
    assert_eq!(
        css("@function first() { @for $i from 1 through 9223372036854775807 { @return $i; } @return 0; }\n.d { v: first(); }"),
        ".d {\n  v: 1;\n}"
    );
}

#[test]
fn while_runs_up_to_limit() {
    assert_eq!(
        css("$i: 0;\n@while $i < 1000 { $i: $i + 1; }\n.a { n: $i; }"),
        ".a {\n  n: 1000;\n}"
    );
}

#[test]
fn while_fails_past_limit() {
    let message = error("@while true { }");
    assert_eq!(message, "@while loop exceeded 1000 iterations");
}

#[test]
fn else_if_chain() {
    assert_eq!(
        css("$n: 2;\n.a { @if $n == 1 { v: one; } @else if $n == 2 { v: two; } @else { v: other; } }"),
        ".a {\n  v: two;\n}"
    );
}

// ══════════════════════════════════════════════════════════════════════════════
// Truthiness
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn flow_truthiness_only_false_and_null_are_falsy() {
    assert_eq!(
        css("@if 0 { .zero { t: y; } }\n@if \"\" { .empty { t: y; } }\n@if null { .null { t: y; } }"),
        ".zero {\n  t: y;\n}\n\n.empty {\n  t: y;\n}"
    );
}

#[test]
fn operator_truthiness_treats_zero_and_empty_as_falsy() {
    assert_eq!(
        css(".a { v: 0 or 5; w: \"\" or x; n: not 0; }"),
        ".a {\n  v: 5;\n  w: x;\n  n: true;\n}"
    );
}

// ══════════════════════════════════════════════════════════════════════════════
// Functions
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn user_function_returns_value() {
    assert_eq!(
        css("@function double($n) { @return $n * 2; }\n.x { w: double(5px); }"),
        ".x {\n  w: 10px;\n}"
    );
}

#[test]
fn function_default_and_keyword_arguments() {
    assert_eq!(
        css("@function f($a, $b: 2) { @return $a + $b; }\n.x { v: f(1); w: f($b: 10, $a: 1); }"),
        ".x {\n  v: 3;\n  w: 11;\n}"
    );
}

#[test]
fn function_without_return_fails() {
    let message = error("@function f() { $x: 1; }\n.x { v: f(); }");
    assert!(message.contains("without @return"), "{message}");
}

#[test]
fn function_cannot_see_caller_locals() {
    let message = error("@function peek() { @return $secret; }\n.x { $secret: 1; v: peek(); }");
    assert_eq!(message, "Undefined variable: $secret");
}

#[test]
fn unknown_function_is_plain_css() {
    assert_eq!(
        css(".x { t: translate(10px, 20px); }"),
        ".x {\n  t: translate(10px, 20px);\n}"
    );
}

#[test]
fn builtin_global_and_namespaced_functions() {
    assert_eq!(
        css("@use \"sass:math\";\n.x { a: math.max(1px, 3px); b: map-get((k: v), k); c: math.$pi > 3; }"),
        ".x {\n  a: 3px;\n  b: v;\n  c: true;\n}"
    );
}

#[test]
fn host_function_is_callable() {
    let mut ev = evaluator();
    ev.add_function(
        "twice",
        Rc::new(|args: &[Value]| match args.first() {
            Some(Value::Number(n)) => Ok(Value::Number(n.with_value(n.value * 2.0))),
            _ => Err("twice() expects a number".to_string()),
        }),
    );
    let out = ev.compile_string(".x { w: twice(3px); }", "input.scss").unwrap();
    assert_eq!(out.css, ".x {\n  w: 6px;\n}");

    let err = ev.compile_string(".x { w: twice(a); }", "input.scss").unwrap_err();
    assert_eq!(err.message, "twice() expects a number");

    let err = ev.compile_string(".x { w: twice($n: 3px); }", "input.scss").unwrap_err();
    assert!(err.message.contains("keyword arguments"), "{}", err.message);
    let err = ev
        .compile_string("@use \"sass:meta\";\n.x { w: meta.call(meta.get-function(twice), $n: 3px); }", "input.scss")
        .unwrap_err();
    assert!(err.message.contains("keyword arguments"), "{}", err.message);
}

#[test]
fn recursion_depth_is_bounded() {
    // Deep recursion needs more than the default test thread stack.
    let handle = std::thread::Builder::new()
        .stack_size(64 * 1024 * 1024)
        .spawn(|| error("@function f($n) { @return f($n + 1); }\n.x { v: f(0); }"))
        .unwrap();
    let message = handle.join().unwrap();
    assert!(message.contains("Maximum call depth"), "{message}");
}

// ══════════════════════════════════════════════════════════════════════════════
// Mixins
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn mixin_declarations_stay_in_rule_and_nested_rules_follow() {
    assert_eq!(
        css("@mixin m { color: red; .inner { top: 0; } }\n.a { @include m; margin: 0; }"),
        ".a {\n  color: red;\n  margin: 0;\n}\n\n.a .inner {\n  top: 0;\n}"
    );
}

#[test]
fn mixin_content_block() {
    assert_eq!(
        css("@mixin hover { &:hover { @content; } }\n.btn { @include hover { color: blue; } }"),
        ".btn:hover {\n  color: blue;\n}"
    );
}

#[test]
fn mixin_without_content_ignores_content_marker() {
    assert_eq!(
        css("@mixin m { top: 0; @content; }\n.a { @include m; }"),
        ".a {\n  top: 0;\n}"
    );
}

#[test]
fn mixin_arbitrary_arguments() {
    assert_eq!(
        css("@mixin shadows($list...) { box-shadow: $list; }\n.a { @include shadows(1px 1px red, 2px 2px blue); }"),
        ".a {\n  box-shadow: 1px 1px red, 2px 2px blue;\n}"
    );
}

#[test]
fn mixin_cache_counts_hits() {
    let mut ev = evaluator();
    ev.compile_string(
        "@mixin m($c) { color: $c; }\n.a { @include m(red); }\n.b { @include m(red); }\n.c { @include m(red); }",
        "input.scss",
    )
    .unwrap();
    assert_eq!(ev.mixin_cache_stats(), (2, 1));
}

#[test]
fn mixin_calling_host_function_is_expanded_each_time() {
    let counter = Rc::new(std::cell::Cell::new(0.0));
    let mut ev = evaluator();
    let calls = Rc::clone(&counter);
    ev.add_function(
        "next-id",
        Rc::new(move |_args: &[Value]| {
            calls.set(calls.get() + 1.0);
            Ok(Value::number(calls.get()))
        }),
    );
    let out = ev
        .compile_string("@mixin m { z: next-id(); }\n.a { @include m; }\n.b { @include m; }", "input.scss")
        .unwrap();
    assert_eq!(out.css, ".a {\n  z: 1;\n}\n\n.b {\n  z: 2;\n}");
    assert_eq!(counter.get(), 2.0);
    assert_eq!(ev.mixin_cache_stats(), (0, 0));
}

#[test]
fn mixin_cache_disabled_by_zero_capacity() {
    let config = EngineConfig {
        mixin_cache_capacity: 0,
        ..EngineConfig::default()
    };
    let mut ev = Evaluator::new(config, Rc::new(MemoryLoader::new()));
    let out = ev
        .compile_string("@mixin m { top: 0; }\n.a { @include m; }\n.b { @include m; }", "input.scss")
        .unwrap();
    assert_eq!(out.css, ".a {\n  top: 0;\n}\n\n.b {\n  top: 0;\n}");
    assert_eq!(ev.mixin_cache_stats(), (0, 0));
}

#[test]
fn recompiling_resets_cache_state() {
    let mut ev = evaluator();
    let source = "@mixin m { top: 0; }\n.a { @include m; }";
    ev.compile_string(source, "input.scss").unwrap();
    ev.compile_string(source, "input.scss").unwrap();
    assert_eq!(ev.mixin_cache_stats(), (0, 1));
}

// ══════════════════════════════════════════════════════════════════════════════
// @extend
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn extend_appends_extender() {
    assert_eq!(
        css(".a { @extend .b; }\n.b { color: red; }"),
        ".b, .a {\n  color: red;\n}"
    );
}

#[test]
fn extend_placeholder_is_removed() {
    assert_eq!(
        css("%base { margin: 0; }\n.a { @extend %base; color: red; }"),
        ".a {\n  margin: 0;\n}\n\n.a {\n  color: red;\n}"
    );
}

#[test]
fn keyframe_percentages_are_not_placeholders() {
    assert_eq!(
        css("@keyframes spin { 0% { opacity: 0; } 100% { opacity: 1; } }"),
        "@keyframes spin {\n  0% {\n    opacity: 0;\n  }\n  100% {\n    opacity: 1;\n  }\n}"
    );
}

#[test]
fn percent_inside_attribute_selector_is_kept() {
    assert_eq!(
        css("[data-w=\"50%\"] { top: 0; }\n%hidden { display: none; }"),
        "[data-w=\"50%\"] {\n  top: 0;\n}"
    );
}

#[test]
fn unmatched_extend_warns_unless_optional() {
    let mut ev = evaluator();
    let out = ev
        .compile_string(".a { @extend .nope; color: red; }\n.b { @extend .gone !optional; top: 0; }", "input.scss")
        .unwrap();
    assert_eq!(out.warnings.len(), 1);
    assert!(out.warnings[0].contains("@extend .nope !optional"), "{}", out.warnings[0]);
}

#[test]
fn extend_outside_rule_fails() {
    let message = error("@extend .a;");
    assert!(message.contains("within style rules"), "{message}");
}

// ══════════════════════════════════════════════════════════════════════════════
// Messages & source mappings
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn error_directive_aborts() {
    assert_eq!(error("@error \"bad #{1 + 1}\";"), "bad 2");
}

#[test]
fn warn_and_debug_are_collected() {
    let mut ev = evaluator();
    let out = ev
        .compile_string("@warn \"careful\";\n@debug 1 + 1;", "input.scss")
        .unwrap();
    assert_eq!(out.css, "");
    assert_eq!(out.warnings, vec!["careful\n    input.scss:1".to_string()]);
    assert_eq!(out.debug, vec!["input.scss:2 DEBUG: 2".to_string()]);
}

#[test]
fn quiet_suppresses_warnings() {
    let config = EngineConfig {
        quiet: true,
        ..EngineConfig::default()
    };
    let mut ev = Evaluator::new(config, Rc::new(MemoryLoader::new()));
    let out = ev.compile_string("@warn \"careful\";", "input.scss").unwrap();
    assert!(out.warnings.is_empty());
}

#[test]
fn mappings_point_at_declarations() {
    let config = EngineConfig {
        source_map: true,
        ..EngineConfig::default()
    };
    let mut ev = Evaluator::new(config, Rc::new(MemoryLoader::new()));
    let out = ev
        .compile_string(".a {\n  color: red;\n  top: 0;\n}", "input.scss")
        .unwrap();
    assert_eq!(out.mappings.len(), 2);
    assert_eq!(out.mappings[0].source, "input.scss");
    assert_eq!(out.mappings[0].source_line, 2);
    assert_eq!(out.mappings[0].generated_line, 1);
    assert_eq!(out.mappings[1].source_line, 3);
}

#[test]
fn no_mappings_without_source_map() {
    let out = evaluator().compile_string(".a { top: 0; }", "input.scss").unwrap();
    assert!(out.mappings.is_empty());
}

// ══════════════════════════════════════════════════════════════════════════════
// Parse errors
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn syntax_error_is_reported_before_evaluation() {
    let err = evaluator().compile_string(".a { color: red;", "input.scss").unwrap_err();
    assert_eq!(err.message, "Expected '}'");
}
