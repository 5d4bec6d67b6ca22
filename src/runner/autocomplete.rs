//! Autocomplete tree
//!
//! Commands, their arguments and the global flags are arranged in a trie
//! stored in an arena. Flag and flag value nodes do not own children: they
//! continue at the node they were attached to, so `scw test -o json flower`
//! walks from the `json` value back into the children of `test`.

use crate::runner::arg_specs::ArgSpec;
use crate::runner::command::{Command, Commands};
use crate::runner::context::Context;
use std::collections::BTreeMap;
use std::fmt;

/// Key of the child matching any word: positional values and variable flag
/// values
pub const VALUE_WILDCARD: &str = "*";

/// Index of a node in the tree arena
pub type NodeId = usize;

/// Suggests values for a flag from the prefix typed so far
pub type FlagValueFn = fn(&Context, &str) -> Vec<String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Command,
    Argument,
    Flag,
    FlagValueConst,
    FlagValueVariable,
}

/// A flag understood by every command
pub struct FlagSpec {
    pub name: &'static str,
    pub enum_values: &'static [&'static str],
    /// Takes a free-form value
    pub variable: bool,
    pub complete_value: Option<FlagValueFn>,
}

impl FlagSpec {
    const fn switch(name: &'static str) -> Self {
        FlagSpec {
            name,
            enum_values: &[],
            variable: false,
            complete_value: None,
        }
    }

    const fn choice(name: &'static str, enum_values: &'static [&'static str]) -> Self {
        FlagSpec {
            name,
            enum_values,
            variable: false,
            complete_value: None,
        }
    }

    const fn variable(name: &'static str, complete_value: Option<FlagValueFn>) -> Self {
        FlagSpec {
            name,
            enum_values: &[],
            variable: true,
            complete_value,
        }
    }
}

impl fmt::Debug for FlagSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlagSpec")
            .field("name", &self.name)
            .field("enum_values", &self.enum_values)
            .field("variable", &self.variable)
            .field("complete_value", &self.complete_value.is_some())
            .finish()
    }
}

/// Values accepted by `-o/--output`
pub const OUTPUT_FORMATS: &[&str] = &["human", "json", "template", "yaml"];

pub static GLOBAL_FLAGS: &[FlagSpec] = &[
    FlagSpec::switch("-h"),
    FlagSpec::switch("--help"),
    FlagSpec::switch("-D"),
    FlagSpec::switch("--debug"),
    FlagSpec::choice("-o", OUTPUT_FORMATS),
    FlagSpec::choice("--output", OUTPUT_FORMATS),
    FlagSpec::variable("-p", Some(complete_profile)),
    FlagSpec::variable("--profile", Some(complete_profile)),
    FlagSpec::variable("-c", None),
    FlagSpec::variable("--config", None),
];

pub static WAIT_FLAGS: &[FlagSpec] = &[FlagSpec::switch("-w"), FlagSpec::switch("--wait")];

/// Configured profiles starting with `prefix`
pub fn complete_profile(ctx: &Context, prefix: &str) -> Vec<String> {
    ctx.profiles
        .iter()
        .filter(|profile| profile.starts_with(prefix))
        .cloned()
        .collect()
}

/// A node of the autocomplete tree
#[derive(Debug, Clone)]
pub struct AutoCompleteNode<'a> {
    /// Word the node answers to, for debugging
    pub name: String,
    pub kind: NodeKind,
    pub children: BTreeMap<String, NodeId>,
    pub command: Option<&'a Command>,
    pub arg_spec: Option<&'a ArgSpec>,
    pub flag: Option<&'static FlagSpec>,
    /// Node whose children stand in for this node's own
    pub continues_at: Option<NodeId>,
}

impl<'a> AutoCompleteNode<'a> {
    fn new(name: &str, kind: NodeKind) -> Self {
        AutoCompleteNode {
            name: name.to_string(),
            kind,
            children: BTreeMap::new(),
            command: None,
            arg_spec: None,
            flag: None,
            continues_at: None,
        }
    }
}

/// The autocomplete trie of a command registry
#[derive(Debug, Clone)]
pub struct AutoCompleteTree<'a> {
    nodes: Vec<AutoCompleteNode<'a>>,
    root: NodeId,
}

impl<'a> AutoCompleteTree<'a> {
    /// Build the tree rooted at `program`
    pub fn build(commands: &'a Commands, program: &str) -> Self {
        let mut tree = AutoCompleteTree {
            nodes: vec![AutoCompleteNode::new("", NodeKind::Command)],
            root: 0,
        };
        let program_node = tree.child_or_create(tree.root, program);
        tree.add_flags(program_node, GLOBAL_FLAGS);

        for command in commands {
            let mut node = program_node;
            for part in [&command.namespace, &command.resource, &command.verb] {
                if part.is_empty() {
                    continue;
                }
                node = tree.child_or_create(node, part);
                tree.add_flags(node, GLOBAL_FLAGS);
            }

            tree.nodes[node].command = Some(command);
            for spec in command.arg_specs.iter() {
                let key = if spec.positional {
                    VALUE_WILDCARD.to_string()
                } else {
                    spec.prefix()
                };
                let mut argument = AutoCompleteNode::new(&spec.name, NodeKind::Argument);
                argument.arg_spec = Some(spec);
                let id = tree.push(argument);
                tree.nodes[node].children.insert(key, id);
            }

            if command.wait {
                tree.add_flags(node, WAIT_FLAGS);
            }
        }

        log::trace!("autocomplete tree has {} nodes", tree.nodes.len());
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &AutoCompleteNode<'a> {
        &self.nodes[id]
    }

    /// Follow `continues_at` to the node owning the children
    pub fn resolve(&self, mut id: NodeId) -> NodeId {
        while let Some(next) = self.nodes[id].continues_at {
            id = next;
        }
        id
    }

    /// Children of a node, shared ones included
    pub fn children(&self, id: NodeId) -> &BTreeMap<String, NodeId> {
        &self.nodes[self.resolve(id)].children
    }

    /// Child answering to `word`: the exact key, else the value wildcard
    pub fn child(&self, id: NodeId, word: &str) -> Option<NodeId> {
        let children = self.children(id);
        children
            .get(word)
            .or_else(|| children.get(VALUE_WILDCARD))
            .copied()
    }

    /// A command node without sub-commands
    pub fn is_leaf_command(&self, id: NodeId) -> bool {
        let id = self.resolve(id);
        self.nodes[id].kind == NodeKind::Command
            && self.nodes[id]
                .children
                .values()
                .all(|&child| self.nodes[child].kind != NodeKind::Command)
    }

    fn push(&mut self, node: AutoCompleteNode<'a>) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn child_or_create(&mut self, parent: NodeId, name: &str) -> NodeId {
        if let Some(&id) = self.nodes[parent].children.get(name) {
            return id;
        }
        let id = self.push(AutoCompleteNode::new(name, NodeKind::Command));
        self.nodes[parent].children.insert(name.to_string(), id);
        id
    }

    fn add_flags(&mut self, parent: NodeId, flags: &'static [FlagSpec]) {
        for flag in flags {
            if self.nodes[parent].children.contains_key(flag.name) {
                continue;
            }
            let mut node = AutoCompleteNode::new(flag.name, NodeKind::Flag);
            node.flag = Some(flag);
            let id = self.push(node);

            if flag.variable {
                let mut value = AutoCompleteNode::new(VALUE_WILDCARD, NodeKind::FlagValueVariable);
                value.flag = Some(flag);
                value.continues_at = Some(parent);
                let value = self.push(value);
                self.nodes[id].children.insert(VALUE_WILDCARD.to_string(), value);
            }
            for &choice in flag.enum_values {
                let mut value = AutoCompleteNode::new(choice, NodeKind::FlagValueConst);
                value.flag = Some(flag);
                value.continues_at = Some(parent);
                let value = self.push(value);
                self.nodes[id].children.insert(choice.to_string(), value);
            }
            if self.nodes[id].children.is_empty() {
                self.nodes[id].continues_at = Some(parent);
            }

            self.nodes[parent].children.insert(flag.name.to_string(), id);
        }
    }
}
