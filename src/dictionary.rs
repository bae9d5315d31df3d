//! The dictionary: the set of known names, their kind, and their stack effect.
//!
//! User definitions and built-ins live in the same namespace. Lookups are
//! case-insensitive; names are normalized to uppercase ASCII before they are
//! ever inserted or queried, so callers never need to normalize twice.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::ast::{Ast, StackEffect};
use crate::token::MathOp;

/// What kind of entry a dictionary slot holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Builtin,
    UserDefined,
    MathBuiltin,
    ControlFlow,
    Variable,
    Constant,
    Immediate,
}

/// A single dictionary slot.
///
/// `body` is `Some` only for `UserDefined` entries, and is the very same
/// `Rc<Vec<Ast>>` held by the owning `Ast::WordDefinition` node — cloning a
/// `Dictionary` clones the map but not the bodies behind it.
#[derive(Debug, Clone)]
pub struct DictionaryEntry {
    pub name: String,
    pub kind: EntryKind,
    pub immediate: bool,
    pub body: Option<Rc<Vec<Ast>>>,
    pub builtin_template: Option<String>,
    pub stack_effect: StackEffect,
    pub compiled: bool,
    pub compiled_text: Option<String>,
}

impl DictionaryEntry {
    fn builtin(name: &str, kind: EntryKind, effect: StackEffect) -> Self {
        Self {
            name: name.to_string(),
            kind,
            immediate: false,
            body: None,
            builtin_template: None,
            stack_effect: effect,
            compiled: true,
            compiled_text: None,
        }
    }
}

/// Normalize a source name to the dictionary's canonical case-insensitive form.
pub fn normalize(name: &str) -> String {
    name.to_ascii_uppercase()
}

/// Which built-in vocabulary a fresh dictionary is seeded with.
///
/// Each tier is additive over the previous one: `Standard` is `Minimal` plus
/// its own words, `MathEnhanced` is `Standard` plus its own, and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinConfig {
    Minimal,
    Standard,
    MathEnhanced,
    Extended,
}

/// The set of known names: user definitions plus seeded built-ins, keyed by
/// normalized name.
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    entries: FxHashMap<String, DictionaryEntry>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self {
            entries: FxHashMap::default(),
        }
    }

    pub fn with_builtins(config: BuiltinConfig) -> Self {
        let mut dict = Self::new();
        dict.seed_builtins(config);
        dict
    }

    fn seed_builtins(&mut self, config: BuiltinConfig) {
        // Arithmetic, comparison, bitwise, stack-manipulation, memory and IO
        // primitives recognized directly by the lexer as `MathWord`s. Present
        // at every configuration tier: the analyzer consults the dictionary
        // for these names too (e.g. diagnostics, `DEPTH`-style introspection)
        // even though the parser folds them into `MathOperation` nodes rather
        // than routing them through a `WordCall`.
        const CORE_MATH: &[MathOp] = &[
            MathOp::Add,
            MathOp::Sub,
            MathOp::Mul,
            MathOp::Div,
            MathOp::Mod,
            MathOp::Lt,
            MathOp::Gt,
            MathOp::Eq,
            MathOp::Ne,
            MathOp::Le,
            MathOp::Ge,
            MathOp::Negate,
            MathOp::Abs,
            MathOp::OnePlus,
            MathOp::OneMinus,
            MathOp::ZeroLt,
            MathOp::ZeroEq,
            MathOp::ZeroGt,
            MathOp::Not,
            MathOp::Sqrt,
            MathOp::And,
            MathOp::Or,
            MathOp::Xor,
            MathOp::Lshift,
            MathOp::Rshift,
            MathOp::Dup,
            MathOp::Drop,
            MathOp::Swap,
            MathOp::Over,
            MathOp::Rot,
            MathOp::TwoDup,
            MathOp::TwoDrop,
            MathOp::TwoSwap,
            MathOp::Fetch,
            MathOp::Store,
            MathOp::Cr,
            MathOp::Space,
        ];
        for op in CORE_MATH {
            self.insert_math_builtin(*op);
        }

        if matches!(
            config,
            BuiltinConfig::Standard | BuiltinConfig::MathEnhanced | BuiltinConfig::Extended
        ) {
            self.insert_math_builtin(MathOp::Print);
            self.insert_math_builtin(MathOp::Emit);
            self.insert_math_builtin(MathOp::Depth);
        }

        if matches!(
            config,
            BuiltinConfig::MathEnhanced | BuiltinConfig::Extended
        ) {
            for op in [
                MathOp::Sin,
                MathOp::Cos,
                MathOp::Tan,
                MathOp::Asin,
                MathOp::Acos,
                MathOp::Atan,
                MathOp::Log,
                MathOp::Exp,
                MathOp::Pow,
            ] {
                self.insert_math_builtin(op);
            }
        }

        if config == BuiltinConfig::Extended {
            self.entries.insert(
                "GPIO-SET".to_string(),
                DictionaryEntry::builtin("GPIO-SET", EntryKind::Builtin, StackEffect::new(2, 0, true)),
            );
            self.entries.insert(
                "GPIO-GET".to_string(),
                DictionaryEntry::builtin("GPIO-GET", EntryKind::Builtin, StackEffect::new(1, 1, true)),
            );
            self.entries.insert(
                "DELAY-MS".to_string(),
                DictionaryEntry::builtin("DELAY-MS", EntryKind::Builtin, StackEffect::new(1, 0, true)),
            );
        }
    }

    fn insert_math_builtin(&mut self, op: MathOp) {
        let (consumed, produced) = op.effect();
        let name = normalize(op.symbol());
        self.entries.insert(
            name.clone(),
            DictionaryEntry::builtin(
                &name,
                EntryKind::MathBuiltin,
                StackEffect::new(consumed, produced, true),
            ),
        );
    }

    /// Register a colon-definition's name ahead of parsing its body, so
    /// self- and forward-references inside the body resolve during parsing.
    /// The body starts out empty and is wired in by `resolve_forward`.
    pub fn define_forward(&mut self, name: &str) {
        let key = normalize(name);
        self.entries.insert(
            key.clone(),
            DictionaryEntry {
                name: key,
                kind: EntryKind::UserDefined,
                immediate: false,
                body: None,
                builtin_template: None,
                stack_effect: StackEffect::unknown(),
                compiled: false,
                compiled_text: None,
            },
        );
    }

    /// Wire a previously forward-declared definition to its parsed body.
    pub fn resolve_forward(&mut self, name: &str, body: Rc<Vec<Ast>>) {
        let key = normalize(name);
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.body = Some(body);
        }
    }

    pub fn define_user(&mut self, name: &str, body: Rc<Vec<Ast>>) {
        let key = normalize(name);
        self.entries.insert(
            key.clone(),
            DictionaryEntry {
                name: key,
                kind: EntryKind::UserDefined,
                immediate: false,
                body: Some(body),
                builtin_template: None,
                stack_effect: StackEffect::unknown(),
                compiled: false,
                compiled_text: None,
            },
        );
    }

    pub fn define_variable(&mut self, name: &str) {
        let key = normalize(name);
        self.entries.insert(
            key.clone(),
            DictionaryEntry::builtin(&key, EntryKind::Variable, StackEffect::new(0, 1, true)),
        );
    }

    pub fn define_constant(&mut self, name: &str) {
        let key = normalize(name);
        self.entries.insert(
            key.clone(),
            DictionaryEntry::builtin(&key, EntryKind::Constant, StackEffect::new(0, 1, true)),
        );
    }

    pub fn lookup(&self, name: &str) -> Option<&DictionaryEntry> {
        self.entries.get(&normalize(name))
    }

    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut DictionaryEntry> {
        self.entries.get_mut(&normalize(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&normalize(name))
    }

    pub fn effect_of(&self, name: &str) -> Option<StackEffect> {
        self.lookup(name).map(|e| e.stack_effect)
    }

    pub fn set_effect(&mut self, name: &str, effect: StackEffect) {
        if let Some(entry) = self.lookup_mut(name) {
            entry.stack_effect = effect;
        }
    }

    pub fn user_defined_names(&self) -> impl Iterator<Item = &str> {
        self.entries
            .values()
            .filter(|e| e.kind == EntryKind::UserDefined)
            .map(|e| e.name.as_str())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_insensitive_lookup() {
        let dict = Dictionary::with_builtins(BuiltinConfig::Standard);
        assert!(dict.lookup("dup").is_some());
        assert!(dict.lookup("Dup").is_some());
        assert!(dict.lookup("DUP").is_some());
    }

    #[test]
    fn tiers_are_additive() {
        let minimal = Dictionary::with_builtins(BuiltinConfig::Minimal);
        assert!(minimal.lookup(".").is_none());
        let standard = Dictionary::with_builtins(BuiltinConfig::Standard);
        assert!(standard.lookup(".").is_some());
        assert!(standard.lookup("SIN").is_none());
        let enhanced = Dictionary::with_builtins(BuiltinConfig::MathEnhanced);
        assert!(enhanced.lookup("SIN").is_some());
        let extended = Dictionary::with_builtins(BuiltinConfig::Extended);
        assert!(extended.lookup("GPIO-SET").is_some());
    }

    #[test]
    fn forward_declaration_then_resolve() {
        let mut dict = Dictionary::new();
        dict.define_forward("FOO");
        assert!(dict.lookup("foo").unwrap().body.is_none());
        dict.resolve_forward("FOO", Rc::new(vec![]));
        assert!(dict.lookup("foo").unwrap().body.is_some());
    }
}
