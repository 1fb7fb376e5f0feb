//! Java skeletonizer.
//!
//! Parses with tree-sitter and replaces every outermost executable body
//! (methods, constructors, static and instance initializers) with
//! [`OMITTED_BODY`]. Everything outside those byte spans is kept as is.

use super::{AnalysisResult, LanguageAnalyzer};
use log;
use std::ops::Range;
use tree_sitter::{Node, Parser, Tree};

pub const OMITTED_BODY: &str = "{ /* implementation omitted */ }";

const SNIPPET_CHARS: usize = 40;

#[derive(Debug, Clone, Copy, Default)]
pub struct JavaAnalyzer;

impl LanguageAnalyzer for JavaAnalyzer {
    fn name(&self) -> &'static str {
        "java"
    }

    fn supports(&self, file_name: &str) -> bool {
        file_name.ends_with(".java")
    }

    fn analyze(&self, source: &str) -> AnalysisResult {
        log::debug!("Analyzing Java source ({} bytes)...", source.len());
        let tree = match parse(source) {
            Ok(tree) => tree,
            Err(message) => return AnalysisResult::failed(vec![message]),
        };

        let errors = collect_diagnostics(&tree, source);
        if !errors.is_empty() {
            log::debug!("Java source has {} syntax error(s)", errors.len());
            return AnalysisResult::failed(errors);
        }

        let spans = omitted_spans(&tree);
        log::trace!("Omitting {} body span(s)", spans.len());
        AnalysisResult::ok(apply_rewrites(source, &spans))
    }
}

fn parse(source: &str) -> Result<Tree, String> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_java::LANGUAGE.into())
        .map_err(|e| format!("Failed to load Java grammar: {}", e))?;
    parser
        .parse(source, None)
        .ok_or_else(|| "Java parser produced no syntax tree".to_string())
}

/// One message per ERROR or MISSING node, in source order. The contents of an
/// ERROR node are not searched again.
fn collect_diagnostics(tree: &Tree, source: &str) -> Vec<String> {
    let root = tree.root_node();
    if !root.has_error() {
        return Vec::new();
    }

    let mut errors = Vec::new();
    let mut cursor = tree.walk();
    'walk: loop {
        let node = cursor.node();
        let descend = if node.is_missing() {
            errors.push(diagnostic(&node, format!("missing {}", node.kind())));
            false
        } else if node.is_error() {
            errors.push(diagnostic(
                &node,
                format!("unexpected \"{}\"", snippet(&node, source)),
            ));
            false
        } else {
            node.has_error()
        };

        if descend && cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                continue 'walk;
            }
            if !cursor.goto_parent() {
                break 'walk;
            }
        }
    }

    if errors.is_empty() {
        errors.push("Syntax error at 1:0 - unrecognized syntax error".to_string());
    }
    errors
}

fn diagnostic(node: &Node, message: String) -> String {
    let pos = node.start_position();
    format!("Syntax error at {}:{} - {}", pos.row + 1, pos.column, message)
}

fn snippet(node: &Node, source: &str) -> String {
    let text = source.get(node.byte_range()).unwrap_or_default();
    let first_line = text.lines().next().unwrap_or_default().trim();
    let mut out: String = first_line.chars().take(SNIPPET_CHARS).collect();
    if first_line.chars().count() > SNIPPET_CHARS || text.trim().lines().count() > 1 {
        out.push_str("...");
    }
    out
}

/// Whether the walk is inside a body that has already been replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OmitState {
    Idle,
    Omitting { owner: usize },
}

impl OmitState {
    /// Called when an omittable construct is entered. Returns true when its
    /// body must be rewritten, i.e. no enclosing construct is being omitted.
    pub fn on_enter(&mut self, owner: usize) -> bool {
        match self {
            OmitState::Idle => {
                *self = OmitState::Omitting { owner };
                true
            }
            OmitState::Omitting { .. } => false,
        }
    }

    /// Only the construct that started the omission can end it.
    pub fn on_exit(&mut self, node: usize) {
        if *self == (OmitState::Omitting { owner: node }) {
            *self = OmitState::Idle;
        }
    }
}

/// The executable body owned by `node`, if `node` is an omittable construct.
fn omittable_body<'t>(node: &Node<'t>) -> Option<Node<'t>> {
    match node.kind() {
        "method_declaration" | "constructor_declaration" | "compact_constructor_declaration" => {
            node.child_by_field_name("body")
        }
        "static_initializer" => {
            let mut cursor = node.walk();
            node.named_children(&mut cursor)
                .find(|child| child.kind() == "block")
        }
        "block" => {
            let is_initializer = node.parent().is_some_and(|parent| {
                matches!(parent.kind(), "class_body" | "enum_body_declarations")
            });
            is_initializer.then_some(*node)
        }
        _ => None,
    }
}

/// Byte ranges of outermost bodies, in source order and non-overlapping.
fn omitted_spans(tree: &Tree) -> Vec<Range<usize>> {
    let mut state = OmitState::Idle;
    let mut spans = Vec::new();
    let mut cursor = tree.walk();

    'walk: loop {
        let node = cursor.node();
        if let Some(body) = omittable_body(&node) {
            if state.on_enter(node.id()) {
                spans.push(body.byte_range());
            }
        }

        if cursor.goto_first_child() {
            continue;
        }
        loop {
            state.on_exit(cursor.node().id());
            if cursor.goto_next_sibling() {
                continue 'walk;
            }
            if !cursor.goto_parent() {
                break 'walk;
            }
        }
    }
    spans
}

fn apply_rewrites(source: &str, spans: &[Range<usize>]) -> String {
    let mut out = String::with_capacity(source.len());
    let mut last = 0;
    for span in spans {
        out.push_str(&source[last..span.start]);
        out.push_str(OMITTED_BODY);
        last = span.end;
    }
    out.push_str(&source[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn skeleton_of(source: &str) -> String {
        let result = JavaAnalyzer.analyze(source);
        assert!(!result.has_errors(), "unexpected errors: {:?}", result.errors);
        result.skeleton
    }

    fn squash(s: &str) -> String {
        s.chars().filter(|c| !c.is_whitespace()).collect()
    }

    #[test]
    fn supports_only_java_files() {
        assert!(JavaAnalyzer.supports("App.java"));
        assert!(JavaAnalyzer.supports("src/main/App.java"));
        assert!(!JavaAnalyzer.supports("App.kt"));
        assert!(!JavaAnalyzer.supports("java.txt"));
    }

    #[test]
    fn method_body_is_replaced() {
        let skeleton = skeleton_of(
            "public class App { public void run(){ System.out.println(\"hi\"); } }",
        );
        assert_eq!(
            skeleton,
            "public class App { public void run(){ /* implementation omitted */ } }"
        );
        assert!(!skeleton.contains("System.out.println"));
    }

    #[test]
    fn missing_semicolon_is_reported() {
        let result = JavaAnalyzer.analyze(
            "public class HelloWorld {   public static void main(String[] args) { \
             System.out.println(\"Hello, world!\")   } }",
        );
        assert!(result.has_errors());
        assert!(result.skeleton.is_empty());
        assert!(result.errors[0].starts_with("Syntax error at 1:"));
    }

    #[test]
    fn every_body_kind_is_omitted() {
        let source = "package com.example;\n\
            public class Complex {\n\
            \x20   private String name;\n\
            \x20   static { System.out.println(\"static init\"); }\n\
            \x20   { System.out.println(\"instance init\"); }\n\
            \x20   public Complex(String name) { this.name = name; }\n\
            \x20   public String getName() { return name; }\n\
            }";
        let skeleton = skeleton_of(source);
        let squashed = squash(&skeleton);

        assert!(squashed.contains("packagecom.example;"));
        assert!(squashed.contains("privateStringname;"));
        assert!(squashed.contains("static{/*implementationomitted*/}"));
        assert!(squashed.contains("publicComplex(Stringname){/*implementationomitted*/}"));
        assert!(squashed.contains("publicStringgetName(){/*implementationomitted*/}"));
        assert_eq!(skeleton.matches(OMITTED_BODY).count(), 4);
        assert!(!skeleton.contains("this.name = name;"));
        assert!(!skeleton.contains("return name;"));
        assert!(!skeleton.contains("init"));
    }

    #[test]
    fn nested_bodies_are_not_rewritten_twice() {
        let source = "public class Outer { \
            public void method() { \
              Runnable r = new Runnable() { \
                public void run() { System.out.println(\"inner\"); } \
              }; \
            } \
          }";
        let skeleton = skeleton_of(source);
        assert_eq!(
            skeleton,
            "public class Outer { public void method() { /* implementation omitted */ } }"
        );
        assert_eq!(skeleton.matches(OMITTED_BODY).count(), 1);
    }

    #[test]
    fn inner_class_methods_are_outermost_bodies() {
        let skeleton = skeleton_of(
            "class A { class B { int f() { return 1; } } void g() { h(); } }",
        );
        assert_eq!(
            skeleton,
            "class A { class B { int f() { /* implementation omitted */ } } \
             void g() { /* implementation omitted */ } }"
        );
    }

    #[test]
    fn whitespace_and_comments_outside_bodies_are_preserved() {
        let source = "public class WS {\n    // keep me\n    @Override\n    public void test() {\n        System.out.println(\"hi\");\n    }\n}";
        assert_eq!(
            skeleton_of(source),
            "public class WS {\n    // keep me\n    @Override\n    public void test() { /* implementation omitted */ }\n}"
        );
    }

    #[test]
    fn empty_bodies_still_get_the_placeholder() {
        assert_eq!(
            skeleton_of("class E { E() {} void f() {} }"),
            "class E { E() { /* implementation omitted */ } void f() { /* implementation omitted */ } }"
        );
    }

    #[test]
    fn abstract_and_interface_methods_are_untouched() {
        let source = "interface I { void a(); default int b() { return 2; } }\n\
                      abstract class C { abstract void c(); }";
        assert_eq!(
            skeleton_of(source),
            "interface I { void a(); default int b() { /* implementation omitted */ } }\n\
             abstract class C { abstract void c(); }"
        );
    }

    #[test]
    fn enum_members_are_skeletonized() {
        let skeleton = skeleton_of(
            "enum Color { RED, GREEN; Color() { init(); } int code() { return ordinal(); } }",
        );
        assert_eq!(skeleton.matches(OMITTED_BODY).count(), 2);
        assert!(!skeleton.contains("ordinal()"));
        assert!(skeleton.contains("RED, GREEN;"));
    }

    #[test]
    fn skeletonizing_a_skeleton_is_a_no_op() {
        let once = skeleton_of("class K { static { a(); } void f() { b(); } }");
        let twice = skeleton_of(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn omit_state_only_clears_for_its_owner() {
        let mut state = OmitState::Idle;
        assert!(state.on_enter(1));
        assert!(!state.on_enter(2));
        state.on_exit(2);
        assert_eq!(state, OmitState::Omitting { owner: 1 });
        state.on_exit(1);
        assert_eq!(state, OmitState::Idle);
        assert!(state.on_enter(3));
    }

    #[test]
    fn rewrites_splice_around_spans() {
        assert_eq!(apply_rewrites("ab{x}cd{y}e", &[2..5, 7..10]), format!("ab{0}cd{0}e", OMITTED_BODY));
        assert_eq!(apply_rewrites("plain", &[]), "plain");
    }
}
