// complexity.rs - Branch-count complexity of a code snippet.
//
// Parses the snippet with tree-sitter and counts control-flow constructs:
//
//   score = 1
//         + one per if / elif (else if) branch
//         + one per for / while (do-while) loop
//         + one per exception handler (except / catch)
//         + N-1 per boolean-operator chain of N operands
//
// A snippet that does not parse cleanly scores 0. Broken code can be neither
// penalized nor credited, so a one-sided syntax error in a diff never
// manufactures a complexity violation.

use cg_changeset::SourceLanguage;
use tree_sitter::{Language, Node, Parser};

/// Node kinds that add one branch each, per grammar family.
const PYTHON_BRANCH_KINDS: &[&str] = &[
    "if_statement",
    "elif_clause",
    "for_statement",
    "while_statement",
    "except_clause",
    "except_group_clause",
];

const ECMASCRIPT_BRANCH_KINDS: &[&str] = &[
    "if_statement",
    "for_statement",
    "for_in_statement",
    "while_statement",
    "do_statement",
    "catch_clause",
];

/// Python 2 statements the grammar still accepts but Python 3 rejects.
const PYTHON_LEGACY_KINDS: &[&str] = &["print_statement", "exec_statement"];

/// Short-circuit operators that extend a boolean chain in JS/TS.
const ECMASCRIPT_BOOLEAN_OPERATORS: &[&str] = &["&&", "||", "??"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Grammar {
    Python,
    JavaScript,
    TypeScript,
    Tsx,
}

impl Grammar {
    /// Languages without a bundled grammar are measured as Python, which is
    /// what callers historically sent. Foreign syntax then fails to parse
    /// and scores 0.
    fn for_language(language: SourceLanguage) -> Self {
        match language {
            SourceLanguage::JavaScript => Grammar::JavaScript,
            SourceLanguage::TypeScript => Grammar::TypeScript,
            _ => Grammar::Python,
        }
    }

    fn for_path(path: &str) -> Self {
        if path.to_ascii_lowercase().ends_with(".tsx") {
            return Grammar::Tsx;
        }
        Self::for_language(SourceLanguage::from_path(path))
    }

    fn language(self) -> Language {
        match self {
            Grammar::Python => tree_sitter_python::LANGUAGE.into(),
            Grammar::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Grammar::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Grammar::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }

    /// Node kinds that make a snippet count as unparsable.
    fn rejected_kinds(self) -> &'static [&'static str] {
        match self {
            Grammar::Python => PYTHON_LEGACY_KINDS,
            _ => &[],
        }
    }

    fn branch_kinds(self) -> &'static [&'static str] {
        match self {
            Grammar::Python => PYTHON_BRANCH_KINDS,
            _ => ECMASCRIPT_BRANCH_KINDS,
        }
    }

    /// Whether `node` is one link of a boolean-operator chain.
    ///
    /// Both grammars nest chains as binary nodes, so `a and b and c` yields
    /// two nodes and contributes N-1 = 2.
    fn is_boolean_link(self, node: &Node) -> bool {
        match self {
            Grammar::Python => node.kind() == "boolean_operator",
            _ => {
                node.kind() == "binary_expression"
                    && node
                        .child_by_field_name("operator")
                        .map(|op| ECMASCRIPT_BOOLEAN_OPERATORS.contains(&op.kind()))
                        .unwrap_or(false)
            }
        }
    }
}

/// Measure a Python snippet. Returns 0 when the snippet does not parse.
pub fn measure_complexity(source: &str) -> u32 {
    measure_with(Grammar::Python, source)
}

/// Measure a snippet in the given language. Returns 0 when it does not parse.
pub fn measure_complexity_for(language: SourceLanguage, source: &str) -> u32 {
    measure_with(Grammar::for_language(language), source)
}

/// Complexity added by a change to `file_path`: `modified - original`.
///
/// A missing side counts as 0, as does a side that fails to parse. The
/// result is negative when the change simplifies the code.
pub fn complexity_delta(file_path: &str, original: Option<&str>, modified: Option<&str>) -> i64 {
    let grammar = Grammar::for_path(file_path);
    let before = original.map(|src| measure_with(grammar, src)).unwrap_or(0);
    let after = modified.map(|src| measure_with(grammar, src)).unwrap_or(0);
    i64::from(after) - i64::from(before)
}

fn measure_with(grammar: Grammar, source: &str) -> u32 {
    // Parsers are cheap and not Sync; one per call keeps measuring thread-safe.
    let mut parser = Parser::new();
    if let Err(e) = parser.set_language(&grammar.language()) {
        tracing::warn!(error = %e, "failed to load grammar; scoring snippet as 0");
        return 0;
    }
    let tree = match parser.parse(source, None) {
        Some(tree) => tree,
        None => return 0,
    };
    let root = tree.root_node();
    if root.has_error() {
        return 0;
    }

    let branch_kinds = grammar.branch_kinds();
    let rejected_kinds = grammar.rejected_kinds();
    let mut score: u32 = 1;
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if rejected_kinds.contains(&node.kind()) {
            return 0;
        }
        if branch_kinds.contains(&node.kind()) || grammar.is_boolean_link(&node) {
            score = score.saturating_add(1);
        }
        for i in 0..node.child_count() {
            if let Some(child) = node.child(i) {
                stack.push(child);
            }
        }
    }
    score
}
