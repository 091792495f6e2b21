//! Transform Pipeline for Skert Compiler
//!
//! Passes are registered by name and run in registration order over one
//! [`PathTree`]. Edits recorded on the root path are applied after each
//! pass, before the next one starts. State that must outlive a single
//! pass (or a single compile) lives in the caller's [`Accumulator`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::CompileResult;
use crate::path::PathTree;

/// Caller-owned state shared by passes, keyed by pass-chosen strings.
/// Compiles that share one accumulator reuse each other's synthesized
/// helper names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Accumulator {
    values: HashMap<String, Value>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// Look up `entry` in the map stored under `key`.
    pub fn lookup(&self, key: &str, entry: &str) -> Option<&str> {
        self.values
            .get(key)
            .and_then(|map| map.get(entry))
            .and_then(Value::as_str)
    }

    /// Store `entry -> name` in the map under `key`, creating the map.
    pub fn insert(&mut self, key: &str, entry: &str, name: &str) {
        let map = self
            .values
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Default::default()));

        if !map.is_object() {
            *map = Value::Object(Default::default());
        }
        if let Value::Object(map) = map {
            map.insert(entry.to_string(), Value::from(name));
        }
    }
}

pub type PassFn = fn(&mut PathTree, &mut Accumulator) -> CompileResult<()>;

#[derive(Clone, Copy)]
struct Pass {
    name: &'static str,
    run: PassFn,
}

impl std::fmt::Debug for Pass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pass").field("name", &self.name).finish()
    }
}

#[derive(Debug, Default)]
pub struct Pipeline {
    passes: Vec<Pass>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, name: &'static str, run: PassFn) {
        debug!(pass = name, index = self.passes.len(), "registered pass");
        self.passes.push(Pass { name, run });
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|pass| pass.name).collect()
    }

    pub fn run(&self, tree: &mut PathTree, accumulator: &mut Accumulator) -> CompileResult<()> {
        let root = tree.root();

        for (index, pass) in self.passes.iter().enumerate() {
            trace!(pass = pass.name, index, "running pass");
            (pass.run)(tree, accumulator)?;
            tree.apply_changes(root)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{NodeKind, VariableKind};
    use crate::parser::parse_script;
    use crate::path::Declaration;
    use crate::scope::resolve_scopes;

    fn declare_helper(tree: &mut PathTree, accumulator: &mut Accumulator) -> CompileResult<()> {
        if accumulator.get_str("helper").is_none() {
            let root = tree.root();
            let name = tree.unique_identifier(root, "_helper", Some(Declaration::new(VariableKind::Let)));
            accumulator.set("helper", name);
        }
        Ok(())
    }

    #[test]
    fn test_accumulator_maps() {
        let mut accumulator = Accumulator::new();
        assert_eq!(accumulator.lookup("symbolNames", "@x"), None);

        accumulator.insert("symbolNames", "@x", "$x");
        accumulator.insert("symbolNames", "@y", "$y");
        assert_eq!(accumulator.lookup("symbolNames", "@x"), Some("$x"));
        assert_eq!(accumulator.lookup("symbolNames", "@y"), Some("$y"));
    }

    #[test]
    fn test_root_edits_applied_between_passes() {
        let output = parse_script("a;").unwrap();
        let scopes = resolve_scopes(&output.ast, output.root);
        let mut tree = PathTree::new(output.ast, output.root, &scopes);

        let mut pipeline = Pipeline::new();
        pipeline.define("first", declare_helper);
        pipeline.define("second", declare_helper);
        assert_eq!(pipeline.names(), vec!["first", "second"]);

        let mut accumulator = Accumulator::new();
        pipeline.run(&mut tree, &mut accumulator).unwrap();

        let root = tree.root_node().unwrap();
        match tree.ast().get(root) {
            NodeKind::Script { statements } => assert_eq!(statements.len(), 2),
            other => panic!("unexpected {:?}", other.kind()),
        }
        assert_eq!(accumulator.get_str("helper"), Some("_helper"));
    }
}
