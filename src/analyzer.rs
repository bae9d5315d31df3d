//! Stack-effect inference: abstract interpretation of the AST against a
//! synthetic stack, deriving each word's `(consumed, produced, known)`
//! triple without requiring a programmer-written annotation.
//!
//! Analysis runs in three phases: (1) seed every user definition with a
//! placeholder effect, (2) iterate definitions to a fixpoint so forward
//! references and (mutual) recursion settle, (3) walk the top-level
//! statements with the now-resolved dictionary. Phase 2 runs silently — a
//! definition whose callees haven't converged yet would otherwise produce
//! the same "unknown effect" warning on every pass — and a final pass over
//! each definition re-emits the real diagnostics once effects have settled.

use crate::ast::{Ast, Program, StackEffect};
use crate::dictionary::{normalize, Dictionary};
use crate::error::{Diagnostic, DiagnosticKind};
use crate::token::SourceLocation;

/// High-water mark a definition's body is assumed to start with, so the
/// analyzer can discover how many items it actually consumes by watching how
/// far the depth dips below this line.
const ASSUMED_STACK_START: i64 = 10;

/// Bound on how many times phase 2 re-analyzes definitions before giving up
/// on reaching a fixpoint.
const FIXPOINT_BOUND: usize = 5;

/// Depth bookkeeping for one abstract-interpretation pass.
#[derive(Debug, Clone, Copy)]
struct StackState {
    depth: i64,
    min_depth: i64,
    max_depth: i64,
    valid: bool,
}

impl StackState {
    fn reset() -> Self {
        Self {
            depth: 0,
            min_depth: 0,
            max_depth: 0,
            valid: true,
        }
    }

    fn push(&mut self, count: i64) {
        self.depth += count;
        self.max_depth = self.max_depth.max(self.depth);
    }

    /// Pop `count` items; returns `false` (and marks the state invalid) on
    /// underflow, but still applies the pop so depth bookkeeping stays
    /// consistent with what actually happened.
    fn pop(&mut self, count: i64) -> bool {
        self.depth -= count;
        self.min_depth = self.min_depth.min(self.depth);
        if self.depth < 0 {
            self.valid = false;
            return false;
        }
        true
    }
}

fn merge_states(a: StackState, b: StackState) -> StackState {
    if !a.valid || !b.valid {
        return StackState {
            depth: 0,
            min_depth: 0,
            max_depth: 0,
            valid: false,
        };
    }
    let (depth, valid) = if a.depth == b.depth {
        (a.depth, true)
    } else {
        (0, false)
    };
    StackState {
        depth,
        min_depth: a.min_depth.min(b.min_depth),
        max_depth: a.max_depth.max(b.max_depth),
        valid,
    }
}

struct Analyzer {
    stack: StackState,
    saved: Vec<StackState>,
    current_word: Option<String>,
    in_word_definition: bool,
    diagnostics: Vec<Diagnostic>,
    silent: bool,
}

impl Analyzer {
    fn new() -> Self {
        Self {
            stack: StackState::reset(),
            saved: Vec::new(),
            current_word: None,
            in_word_definition: false,
            diagnostics: Vec::new(),
            silent: false,
        }
    }

    fn save_state(&mut self) {
        self.saved.push(self.stack);
    }

    fn restore_state(&mut self) {
        if let Some(state) = self.saved.pop() {
            self.stack = state;
        }
    }

    fn error(&mut self, kind: DiagnosticKind, location: SourceLocation, message: impl Into<String>) {
        if !self.silent {
            self.diagnostics.push(Diagnostic::error(kind, location, message));
        }
    }

    fn warn(&mut self, kind: DiagnosticKind, location: SourceLocation, message: impl Into<String>) {
        if !self.silent {
            self.diagnostics.push(Diagnostic::warning(kind, location, message));
        }
    }

    /// Analyze one definition body in isolation, returning its inferred
    /// stack effect. The body starts from an assumed depth of
    /// `ASSUMED_STACK_START` so consumption below the real stack's top can
    /// be observed without the analyzer needing negative-depth special
    /// casing at the definition boundary.
    fn analyze_definition_body(&mut self, body: &[Ast], dictionary: &mut Dictionary) -> StackEffect {
        self.stack = StackState::reset();
        self.stack.depth = ASSUMED_STACK_START;
        self.stack.min_depth = ASSUMED_STACK_START;
        self.stack.max_depth = ASSUMED_STACK_START;

        for stmt in body {
            self.visit(stmt, dictionary);
        }

        let consumed = (ASSUMED_STACK_START - self.stack.min_depth).max(0);
        let net_change = self.stack.depth - ASSUMED_STACK_START;
        let produced = consumed + net_change;

        StackEffect::new(consumed as u32, produced.max(0) as u32, self.stack.valid)
    }

    fn visit(&mut self, node: &Ast, dictionary: &mut Dictionary) {
        match node {
            Ast::NumberLiteral { .. } => self.stack.push(1),
            Ast::StringLiteral { is_print, .. } => {
                if !is_print {
                    // address + length
                    self.stack.push(1);
                    self.stack.push(1);
                }
            }
            Ast::MathOperation { op, location } => {
                let (consumed, produced) = op.effect();
                if !self.stack.pop(consumed as i64) {
                    self.error(
                        DiagnosticKind::StackUnderflow,
                        *location,
                        format!("stack underflow in math operation '{}'", op),
                    );
                }
                self.stack.push(produced as i64);
            }
            Ast::WordCall { name, location } => self.visit_word_call(name, *location, dictionary),
            Ast::VariableDeclaration {
                name,
                is_constant,
                location,
            } => {
                if *is_constant && !self.stack.pop(1) {
                    self.error(
                        DiagnosticKind::StackUnderflow,
                        *location,
                        format!("stack underflow in constant declaration '{}'", name),
                    );
                }
            }
            Ast::IfStatement {
                then_branch,
                else_branch,
                location,
            } => self.visit_if(then_branch, else_branch.as_deref(), *location, dictionary),
            Ast::BeginUntilLoop { body, location } => {
                self.visit_begin_until(body, *location, dictionary)
            }
            Ast::WordDefinition { .. } | Ast::Program(_) => {
                // Never appears nested inside a body or inside itself.
            }
        }
    }

    fn visit_word_call(&mut self, name: &str, location: SourceLocation, dictionary: &mut Dictionary) {
        let key = normalize(name);
        let mut effect = dictionary.effect_of(&key).unwrap_or(StackEffect::unknown());

        if !effect.known {
            if self.current_word.as_deref() == Some(key.as_str()) {
                // Self-recursive call: assume it preserves stack balance.
                effect = StackEffect::new(1, 1, true);
            } else {
                if dictionary.contains(&key) {
                    self.warn(
                        DiagnosticKind::AnalyzerNonConvergence,
                        location,
                        format!("could not determine a stack effect for word '{}'", name),
                    );
                } else {
                    self.error(
                        DiagnosticKind::UndefinedWord,
                        location,
                        format!("undefined word '{}'", name),
                    );
                }
                // Choose not to guess: skip the abstract update entirely.
                return;
            }
        }

        if !self.in_word_definition && self.stack.depth < effect.consumed as i64 {
            self.error(
                DiagnosticKind::StackUnderflow,
                location,
                format!("stack underflow calling word '{}'", name),
            );
            self.stack.valid = false;
            return;
        }

        self.stack.pop(effect.consumed as i64);
        self.stack.push(effect.produced as i64);
    }

    fn visit_if(
        &mut self,
        then_branch: &[Ast],
        else_branch: Option<&[Ast]>,
        location: SourceLocation,
        dictionary: &mut Dictionary,
    ) {
        if !self.stack.pop(1) {
            self.error(
                DiagnosticKind::StackUnderflow,
                location,
                "stack underflow in IF condition",
            );
        }
        let before = self.stack;

        self.save_state();
        for stmt in then_branch {
            self.visit(stmt, dictionary);
        }
        let after_then = self.stack;
        self.restore_state();

        let after_else = if let Some(else_stmts) = else_branch {
            self.save_state();
            for stmt in else_stmts {
                self.visit(stmt, dictionary);
            }
            let result = self.stack;
            self.restore_state();
            result
        } else {
            before
        };

        self.stack = merge_states(after_then, after_else);
        if !self.stack.valid {
            self.error(
                DiagnosticKind::IfElseDepthMismatch,
                location,
                "IF and ELSE branches leave the stack at different depths",
            );
        }
    }

    fn visit_begin_until(&mut self, body: &[Ast], location: SourceLocation, dictionary: &mut Dictionary) {
        self.save_state();
        let entry = self.stack;

        for stmt in body {
            self.visit(stmt, dictionary);
        }

        // Measured before the UNTIL condition is popped: a loop body that
        // pushes its own condition (the common `BEGIN ... UNTIL` idiom, e.g.
        // `BEGIN 1 UNTIL`) nets to zero once that pop is taken into account,
        // which would hide the fact that each iteration still changes depth.
        let net = self.stack.depth - entry.depth;
        if net != 0 {
            self.warn(
                DiagnosticKind::UnbalancedLoopBody,
                location,
                format!("loop body may have an unbalanced stack effect ({:+})", net),
            );
        }

        if !self.stack.pop(1) {
            self.error(
                DiagnosticKind::StackUnderflow,
                location,
                "stack underflow in UNTIL condition",
            );
        }

        // The loop may run zero or many times; its statically-known effect
        // on the surrounding code is "none" regardless of what one pass did.
        self.restore_state();
    }
}

/// Run full stack-effect inference over `program`, writing each user
/// definition's inferred effect back into `dictionary` and returning the
/// diagnostics collected along the way.
pub fn analyze(program: &Program, dictionary: &mut Dictionary) -> Vec<Diagnostic> {
    let mut analyzer = Analyzer::new();

    for (name, _, _) in program.definitions() {
        let key = normalize(name);
        dictionary.set_effect(&key, StackEffect::new(1, 1, false));
    }

    analyzer.silent = true;
    let mut changed = true;
    let mut iterations = 0;
    while changed && iterations < FIXPOINT_BOUND {
        changed = false;
        iterations += 1;

        for (name, body, _) in program.definitions() {
            let key = normalize(name);
            let old_effect = dictionary.effect_of(&key).unwrap_or(StackEffect::unknown());

            analyzer.current_word = Some(key.clone());
            analyzer.in_word_definition = true;
            analyzer.save_state();

            let new_effect = analyzer.analyze_definition_body(body, dictionary);

            analyzer.restore_state();
            analyzer.in_word_definition = false;
            analyzer.current_word = None;

            if new_effect != old_effect {
                changed = true;
            }
            dictionary.set_effect(&key, new_effect);
        }
    }

    if changed && iterations >= FIXPOINT_BOUND {
        analyzer.diagnostics.push(Diagnostic::warning(
            DiagnosticKind::AnalyzerNonConvergence,
            SourceLocation::default(),
            format!(
                "stack-effect inference did not converge after {} passes",
                FIXPOINT_BOUND
            ),
        ));
    }

    // Re-run every definition once more, loudly, now that effects have
    // settled, so each one's real diagnostics (not fixpoint noise) surface.
    analyzer.silent = false;
    for (name, body, _) in program.definitions() {
        let key = normalize(name);
        analyzer.current_word = Some(key.clone());
        analyzer.in_word_definition = true;
        analyzer.save_state();

        let final_effect = analyzer.analyze_definition_body(body, dictionary);

        analyzer.restore_state();
        analyzer.in_word_definition = false;
        analyzer.current_word = None;
        dictionary.set_effect(&key, final_effect);
    }

    analyzer.stack = StackState::reset();
    analyzer.in_word_definition = false;
    for stmt in program.non_definitions() {
        analyzer.visit(stmt, dictionary);
    }

    analyzer.diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::BuiltinConfig;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn run(src: &str) -> (Dictionary, Vec<Diagnostic>) {
        let tokens = Lexer::new(src).tokenize().unwrap();
        let mut dict = Dictionary::with_builtins(BuiltinConfig::Standard);
        let (program, parse_diags) = Parser::parse(tokens, &mut dict);
        assert!(parse_diags.is_empty(), "unexpected parse errors: {:?}", parse_diags);
        let diags = analyze(&program, &mut dict);
        (dict, diags)
    }

    #[test]
    fn square_has_known_balanced_effect() {
        let (dict, diags) = run(": square ( n -- n*n ) dup * ;");
        assert!(diags.is_empty());
        let effect = dict.effect_of("square").unwrap();
        assert_eq!(effect, StackEffect::new(1, 1, true));
    }

    #[test]
    fn mutual_recursion_converges() {
        let (dict, diags) = run(
            ": is-even dup 0 = IF drop 1 ELSE 1 - is-odd THEN ; \
             : is-odd dup 0 = IF drop 0 ELSE 1 - is-even THEN ;",
        );
        let even = dict.effect_of("is-even").unwrap();
        let odd = dict.effect_of("is-odd").unwrap();
        assert!(even.known);
        assert!(odd.known);
    }

    #[test]
    fn top_level_underflow_is_an_error() {
        let (_, diags) = run("+");
        assert!(diags.iter().any(|d| d.kind == DiagnosticKind::StackUnderflow));
    }

    #[test]
    fn unbalanced_loop_warns() {
        let (_, diags) = run(": leaky BEGIN 1 dup 0 = UNTIL ;");
        assert!(diags.iter().any(|d| d.kind == DiagnosticKind::UnbalancedLoopBody));
    }

    #[test]
    fn if_else_depth_mismatch_is_an_error() {
        let (_, diags) = run(": bad dup 0 = IF 1 2 ELSE 3 THEN ;");
        assert!(diags.iter().any(|d| d.kind == DiagnosticKind::IfElseDepthMismatch));
    }

    #[test]
    fn self_recursive_factorial_is_known() {
        let (dict, diags) = run(
            ": fact dup 1 <= IF drop 1 ELSE dup 1 - fact * THEN ;",
        );
        assert!(diags.iter().all(|d| d.kind != DiagnosticKind::UndefinedWord));
        assert!(dict.effect_of("fact").unwrap().known);
    }

    #[test]
    fn undefined_word_is_reported() {
        let (_, diags) = run(": bad totally-unknown-word ;");
        assert!(diags.iter().any(|d| d.kind == DiagnosticKind::UndefinedWord));
    }

    #[test]
    fn forward_reference_chain_converges_past_the_first_pass() {
        // A calls B calls C; a single pass over A sees B still unresolved, so
        // this only settles once later definitions have had their own turn.
        let (dict, diags) = run(": a b ; : b c ; : c 1 1 ;");
        assert!(diags.iter().all(|d| d.kind != DiagnosticKind::UndefinedWord));
        assert_eq!(dict.effect_of("c").unwrap(), StackEffect::new(0, 2, true));
        assert_eq!(dict.effect_of("b").unwrap(), StackEffect::new(0, 2, true));
        assert_eq!(dict.effect_of("a").unwrap(), StackEffect::new(0, 2, true));
    }
}
