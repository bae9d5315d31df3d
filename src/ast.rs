//! Typed syntax tree for the core language: a closed set of node variants,
//! each carrying the source position needed for diagnostics.

use std::fmt;
use std::rc::Rc;

use crate::token::{MathOp, SourceLocation};

/// `(consumed, produced, known)` — items popped from and pushed onto the data
/// stack by a construct, and whether that pair was statically determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackEffect {
    pub consumed: u32,
    pub produced: u32,
    pub known: bool,
}

impl StackEffect {
    pub const fn new(consumed: u32, produced: u32, known: bool) -> Self {
        Self {
            consumed,
            produced,
            known,
        }
    }

    /// Effect of doing nothing: identity element for `combine`.
    pub const fn identity() -> Self {
        Self::new(0, 0, true)
    }

    /// Conservative "nothing is known" placeholder used for unresolved names.
    pub const fn unknown() -> Self {
        Self::new(0, 0, false)
    }

    pub fn net(self) -> i64 {
        self.produced as i64 - self.consumed as i64
    }
}

/// The effect of `a` immediately followed by `b`. If `a` produces enough to
/// cover what `b` consumes, the combination keeps `a`'s consumption and nets
/// the rest through; otherwise `b` reaches past what `a` produced and the
/// shortfall rolls back into the combined consumption, and the result is
/// marked unknown since that rollback isn't itself a stack effect either
/// operand actually has.
pub fn combine(a: StackEffect, b: StackEffect) -> StackEffect {
    if a.produced >= b.consumed {
        StackEffect::new(
            a.consumed,
            a.produced - b.consumed + b.produced,
            a.known && b.known,
        )
    } else {
        let consumed = a.consumed + (b.consumed - a.produced);
        let net = (a.produced as i64 - a.consumed as i64) + (b.produced as i64 - b.consumed as i64);
        let produced = (consumed as i64 + net).max(0) as u32;
        StackEffect::new(consumed, produced, false)
    }
}

/// Left fold of `combine` over a sequence of effects, e.g. a definition body
/// or a branch's statement list.
pub fn sequence(effects: &[StackEffect]) -> StackEffect {
    effects.iter().fold(StackEffect::identity(), |acc, &e| combine(acc, e))
}

/// The effect of an `IfStatement`: the condition's consumption plus whichever
/// branch consumes more, producing the branches' common net change if they
/// agree and `unknown()` (with that same consumption) if they don't.
pub fn conditional(condition: StackEffect, then_branch: StackEffect, else_branch: StackEffect) -> StackEffect {
    let consumed = condition.consumed + then_branch.consumed.max(else_branch.consumed);
    let agree = condition.known
        && then_branch.known
        && else_branch.known
        && then_branch.net() == else_branch.net();
    if agree {
        let produced = (consumed as i64 + then_branch.net()).max(0) as u32;
        StackEffect::new(consumed, produced, true)
    } else {
        StackEffect::new(consumed, 0, false)
    }
}

/// The effect of a `BeginUntilLoop`: unknown unless the body itself nets to
/// zero (the loop may run any number of times, so anything else can't be
/// given a single static effect), and otherwise bounded by whichever of the
/// body or the UNTIL condition consumes more.
pub fn loop_effect(body: StackEffect, condition: StackEffect) -> StackEffect {
    let consumed = body.consumed.max(condition.consumed);
    if body.known && body.net() == 0 {
        StackEffect::new(consumed, consumed, true)
    } else {
        StackEffect::new(consumed, 0, false)
    }
}

impl fmt::Display for StackEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} -> {}", self.consumed, self.produced)?;
        if !self.known {
            write!(f, ", unknown")?;
        }
        write!(f, ")")
    }
}

/// The program root: an ordered sequence of top-level statements. A
/// well-formed program's statements are each drawn from the same closed `Ast`
/// variant set used inside definition bodies.
#[derive(Debug, Clone)]
pub struct Program {
    pub statements: Vec<Ast>,
}

impl Program {
    pub fn new() -> Self {
        Self {
            statements: Vec::new(),
        }
    }

    /// Top-level word definitions, in source order.
    pub fn definitions(&self) -> impl Iterator<Item = (&str, &Rc<Vec<Ast>>, SourceLocation)> {
        self.statements.iter().filter_map(|s| match s {
            Ast::WordDefinition {
                name,
                body,
                location,
            } => Some((name.as_str(), body, *location)),
            _ => None,
        })
    }

    /// Top-level statements that are not word definitions (§4.4 "program phase").
    pub fn non_definitions(&self) -> impl Iterator<Item = &Ast> {
        self.statements
            .iter()
            .filter(|s| !matches!(s, Ast::WordDefinition { .. }))
    }
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

/// The closed syntax-tree node set described in the core's data model. A
/// `WordDefinition`'s body is reference-counted so the dictionary entry for
/// the same name can share it without cloning or an arena of stable indices:
/// both the program tree and the dictionary hold an `Rc` into the same
/// allocation, so `Dictionary::clone()` trivially "shares bodies by
/// reference" simply by deriving `Clone`.
#[derive(Debug, Clone)]
pub enum Ast {
    Program(Vec<Ast>),
    WordDefinition {
        name: String,
        body: Rc<Vec<Ast>>,
        location: SourceLocation,
    },
    WordCall {
        name: String,
        location: SourceLocation,
    },
    NumberLiteral {
        text: String,
        is_float: bool,
        location: SourceLocation,
    },
    StringLiteral {
        text: String,
        is_print: bool,
        location: SourceLocation,
    },
    IfStatement {
        then_branch: Vec<Ast>,
        else_branch: Option<Vec<Ast>>,
        location: SourceLocation,
    },
    BeginUntilLoop {
        body: Vec<Ast>,
        location: SourceLocation,
    },
    MathOperation {
        op: MathOp,
        location: SourceLocation,
    },
    VariableDeclaration {
        name: String,
        is_constant: bool,
        location: SourceLocation,
    },
}

impl Ast {
    pub fn location(&self) -> SourceLocation {
        match self {
            Ast::Program(_) => SourceLocation::default(),
            Ast::WordDefinition { location, .. }
            | Ast::WordCall { location, .. }
            | Ast::NumberLiteral { location, .. }
            | Ast::StringLiteral { location, .. }
            | Ast::IfStatement { location, .. }
            | Ast::BeginUntilLoop { location, .. }
            | Ast::MathOperation { location, .. }
            | Ast::VariableDeclaration { location, .. } => *location,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combine_chains_consumption_through_produced_items() {
        // DUP (1 -> 2) followed by + (2 -> 1): net effect is (1 -> 1).
        let dup = StackEffect::new(1, 2, true);
        let add = StackEffect::new(2, 1, true);
        assert_eq!(combine(dup, add), StackEffect::new(1, 1, true));
    }

    #[test]
    fn combine_rolls_back_when_b_reaches_past_what_a_produced() {
        // An effect producing nothing followed by one consuming 2 needs both
        // items from further down the stack than `a` ever touched.
        let a = StackEffect::new(0, 0, true);
        let b = StackEffect::new(2, 0, true);
        let combined = combine(a, b);
        assert_eq!(combined.consumed, 2);
        assert!(!combined.known);
    }

    #[test]
    fn sequence_is_identity_on_an_empty_list() {
        assert_eq!(sequence(&[]), StackEffect::identity());
    }

    #[test]
    fn sequence_matches_a_left_fold_of_combine() {
        let dup = StackEffect::new(1, 2, true);
        let mul = StackEffect::new(2, 1, true);
        assert_eq!(sequence(&[dup, mul]), combine(dup, mul));
    }

    #[test]
    fn conditional_agrees_when_both_branches_net_the_same() {
        let condition = StackEffect::new(1, 0, true);
        let then_branch = StackEffect::new(0, 1, true);
        let else_branch = StackEffect::new(1, 2, true);
        let effect = conditional(condition, then_branch, else_branch);
        assert_eq!(effect, StackEffect::new(1, 1, true));
    }

    #[test]
    fn conditional_is_unknown_when_branches_disagree() {
        let condition = StackEffect::new(1, 0, true);
        let then_branch = StackEffect::new(0, 1, true);
        let else_branch = StackEffect::new(0, 2, true);
        let effect = conditional(condition, then_branch, else_branch);
        assert!(!effect.known);
    }

    #[test]
    fn loop_effect_is_known_only_when_the_body_is_balanced() {
        let balanced = StackEffect::new(1, 1, true);
        let condition = StackEffect::new(1, 0, true);
        assert!(loop_effect(balanced, condition).known);

        let unbalanced = StackEffect::new(0, 1, true);
        assert!(!loop_effect(unbalanced, condition).known);
    }
}
