//! Autocomplete resolution
//!
//! A command line is split into the words left of the cursor, the word being
//! completed and the words right of it. The left words walk the tree; every
//! word is scanned for arguments and flags already given; suggestions are
//! then drawn from the children of the node reached.

use crate::args::{schema_matches, schema_pattern, MAP_SCHEMA, SLICE_SCHEMA};
use crate::runner::arg_specs::{ArgSpec, AutoCompleteFn, DefaultFn};
use crate::runner::autocomplete::{AutoCompleteTree, NodeId, NodeKind, VALUE_WILDCARD};
use crate::runner::command::Commands;
use crate::runner::context::Context;
use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

/// Suggestions for `word`, sorted and deduplicated
pub fn complete<S: AsRef<str>>(
    ctx: &Context,
    commands: &Commands,
    left_words: &[S],
    word: &str,
    right_words: &[S],
) -> Vec<String> {
    let tree = AutoCompleteTree::build(commands, &ctx.binary_name);

    // Rightmost left word that moved the position, see `delete hibiscus w`
    let mut node = tree.root();
    let mut node_index = 0;
    for (i, left) in left_words.iter().enumerate() {
        let left: &str = left.as_ref();
        match tree.child(node, left) {
            None if tree.is_leaf_command(node) => {}
            None => {
                log::trace!("no completion past unknown word '{}'", left);
                return Vec::new();
            }
            Some(child) if tree.node(child).kind == NodeKind::Argument => {}
            Some(child) => {
                node = child;
                node_index = i;
            }
        }
    }

    let given = GivenWords::scan(&tree, node, node_index, left_words, right_words);

    let suggestions = match word.split_once('=') {
        Some((name, prefix)) => complete_arg_value(ctx, &tree, node, name, prefix),
        None => complete_key(ctx, &tree, node, word, &given),
    };
    suggestions.into_iter().collect::<BTreeSet<_>>().into_iter().collect()
}

/// Arguments, flags and positional values already on the command line
#[derive(Debug, Default)]
struct GivenWords {
    /// `name=` keys of completed arguments
    args: HashSet<String>,
    /// Flag names, without their value
    flags: HashSet<String>,
    positional: HashSet<String>,
}

impl GivenWords {
    fn scan<S: AsRef<str>>(
        tree: &AutoCompleteTree<'_>,
        node: NodeId,
        node_index: usize,
        left_words: &[S],
        right_words: &[S],
    ) -> Self {
        let mut given = GivenWords::default();
        let children = tree.children(node);
        let words = left_words
            .iter()
            .chain(right_words)
            .map(|word: &S| -> &str { word.as_ref() });
        for (i, word) in words.enumerate() {
            if word.starts_with('-') {
                given.flags.insert(word_key(word).to_string());
            } else if word.contains('=') {
                given.args.insert(format!("{}=", word_key(word)));
            } else if i > node_index {
                // A bare word is either a boolean argument or a positional value;
                // the same word may also be a command name, hence the index check.
                let key = format!("{}=", word);
                let is_boolean = children
                    .get(&key)
                    .and_then(|&child| tree.node(child).arg_spec)
                    .map_or(false, ArgSpec::is_boolean);
                if is_boolean {
                    given.args.insert(key);
                } else {
                    given.positional.insert(word.to_string());
                }
            }
        }
        given
    }
}

fn word_key(word: &str) -> &str {
    word.split_once('=').map_or(word, |(key, _)| key)
}

fn complete_arg_value(
    ctx: &Context,
    tree: &AutoCompleteTree<'_>,
    node: NodeId,
    name: &str,
    prefix: &str,
) -> Vec<String> {
    let arg_key = format!("{}=", name);
    let spec = tree.children(node).iter().find_map(|(key, &child)| {
        let child = tree.node(child);
        match child.arg_spec {
            Some(spec) if child.kind == NodeKind::Argument && key != VALUE_WILDCARD => {
                schema_matches(key, &arg_key).then_some(spec)
            }
            _ => None,
        }
    });
    let Some(spec) = spec else {
        return Vec::new();
    };
    arg_value_suggestions(ctx, spec, prefix)
        .into_iter()
        .map(|value| format!("{}{}", arg_key, value))
        .collect()
}

/// Values suggested for an argument: its completion function, else its enum
/// values (`false`/`true` for booleans) starting with `prefix`
pub fn arg_value_suggestions(ctx: &Context, spec: &ArgSpec, prefix: &str) -> Vec<String> {
    if let Some(auto_complete) = &spec.auto_complete {
        return auto_complete(ctx, prefix);
    }
    let values: Vec<&str> = if spec.enum_values.is_empty() && spec.is_boolean() {
        vec!["false", "true"]
    } else {
        spec.enum_values.iter().map(String::as_str).collect()
    };
    values
        .into_iter()
        .filter(|value| value.starts_with(prefix))
        .map(str::to_string)
        .collect()
}

fn complete_key(
    ctx: &Context,
    tree: &AutoCompleteTree<'_>,
    node: NodeId,
    word: &str,
    given: &GivenWords,
) -> Vec<String> {
    let mut suggestions = Vec::new();
    for (key, &child) in tree.children(node) {
        let child = tree.node(child);
        if key == VALUE_WILDCARD {
            match (child.kind, child.arg_spec, child.flag) {
                (NodeKind::Argument, Some(spec), _) => suggestions.extend(
                    arg_value_suggestions(ctx, spec, word)
                        .into_iter()
                        .filter(|value| !given.positional.contains(value)),
                ),
                (NodeKind::FlagValueVariable, _, Some(flag)) => {
                    if let Some(complete_value) = flag.complete_value {
                        suggestions.extend(complete_value(ctx, word));
                    }
                }
                _ => {}
            }
            continue;
        }

        if !has_prefix(key, word) {
            continue;
        }
        if key.contains(SLICE_SCHEMA) || key.contains(MAP_SCHEMA) {
            suggestions.push(key_suggestion(key, word, &given.args));
            continue;
        }
        if given.args.contains(key) || given.flags.contains(key) {
            continue;
        }
        if key.starts_with('-') && word.is_empty() {
            continue;
        }
        suggestions.push(key.clone());
    }
    suggestions
}

/// Whether `word` may be completed into `key`, placeholders included:
/// `image-ids.0` prefixes `image-ids.{index}=`, `ip.fr-par.c` prefixes
/// `ip.{key}.class=`.
pub fn has_prefix(key: &str, word: &str) -> bool {
    if key.starts_with(word) {
        return true;
    }
    if !word.contains('.') && (key.starts_with(SLICE_SCHEMA) || key.starts_with(MAP_SCHEMA)) {
        return true;
    }
    let (Some((left_key, right_key)), Some((left_word, right_word))) =
        (key.split_once('.'), word.split_once('.'))
    else {
        return false;
    };
    if left_key == left_word || left_key == SLICE_SCHEMA || left_key == MAP_SCHEMA {
        return has_prefix(right_key, right_word);
    }
    false
}

/// Concrete form of a placeholder key.
///
/// `{index}` becomes the smallest index not yet used by the same argument
/// family; `{key}` becomes the key the user typed, and without one the
/// suggestion stops right after the dotted prefix (`leaves.`).
fn key_suggestion(key: &str, word: &str, completed: &HashSet<String>) -> String {
    let typed: Vec<&str> = word.split('.').collect();
    let segments: Vec<&str> = key.split('.').collect();
    let mut resolved: Vec<String> = Vec::new();

    for (i, segment) in segments.iter().enumerate() {
        if let Some(suffix) = segment.strip_prefix(SLICE_SCHEMA) {
            let rest = rest_of_key(suffix, &segments[i + 1..]);
            let index = next_index(&resolved, &rest, completed);
            resolved.push(format!("{}{}", index, suffix));
        } else if let Some(suffix) = segment.strip_prefix(MAP_SCHEMA) {
            match typed.get(i).filter(|user_key| !user_key.is_empty()) {
                Some(user_key) => resolved.push(format!("{}{}", user_key, suffix)),
                None => {
                    resolved.push(String::new());
                    return resolved.join(".");
                }
            }
        } else {
            resolved.push(segment.to_string());
        }
    }
    resolved.join(".")
}

/// The part of a key following a placeholder, with its own placeholders
fn rest_of_key(suffix: &str, segments: &[&str]) -> String {
    let mut rest = suffix.to_string();
    for segment in segments {
        rest.push('.');
        rest.push_str(segment);
    }
    rest
}

/// Smallest index not used by completed arguments of the family
/// `<resolved>.<index><rest>`
fn next_index(resolved: &[String], rest: &str, completed: &HashSet<String>) -> usize {
    let prefix = if resolved.is_empty() {
        String::new()
    } else {
        format!("{}.", resolved.join("."))
    };
    let body = schema_pattern(rest);
    let pattern = format!(
        "^{}([0-9]+){}",
        regex::escape(&prefix),
        body.trim_start_matches('^')
    );
    let Ok(family) = Regex::new(&pattern) else {
        return 0;
    };
    let used: HashSet<usize> = completed
        .iter()
        .filter_map(|arg| family.captures(arg))
        .filter_map(|captures| captures.get(1)?.as_str().parse().ok())
        .collect();
    (0..).find(|i| !used.contains(i)).unwrap_or(0)
}

/// Completion function listing the configured profiles
pub fn autocomplete_profile_name() -> AutoCompleteFn {
    Arc::new(crate::runner::autocomplete::complete_profile)
}

/// Default to the active profile, `default` when none is selected
pub fn default_profile_name() -> DefaultFn {
    Arc::new(|ctx: &Context| {
        let name = ctx.profile_name().to_string();
        (name.clone(), name)
    })
}

/// Index of the word under a cursor at `char_index`
pub fn word_index<S: AsRef<str>>(char_index: usize, words: &[S]) -> usize {
    let mut count = 0;
    for (i, word) in words.iter().enumerate() {
        let word: &str = word.as_ref();
        count += word.chars().count();
        if char_index <= count {
            return i;
        }
        count += 1;
    }
    words.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn given(args: &[&str]) -> HashSet<String> {
        args.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn test_has_prefix() {
        assert!(has_prefix("security-group-id=", "security-gr"));
        assert!(has_prefix("image-ids.{index}=", "image-ids.0"));
        assert!(has_prefix("volumes.{index}.size=", "volumes.0.s"));
        assert!(has_prefix("ip.{key}.class=", "ip.fr-par.c"));
        assert!(!has_prefix("ip.{key}.class=", "ip.fr-par.s"));
        assert!(!has_prefix("name=", "species"));
    }

    #[test]
    fn test_key_suggestion_index() {
        assert_eq!(key_suggestion("colours.{index}=", "colo", &given(&[])), "colours.0=");
        assert_eq!(
            key_suggestion("colours.{index}=", "", &given(&["colours.0=", "colours.1="])),
            "colours.2="
        );
        assert_eq!(
            key_suggestion("colours.{index}=", "", &given(&["colours.1="])),
            "colours.0="
        );
    }

    #[test]
    fn test_key_suggestion_families_are_separate() {
        let completed = given(&["ip.0.name=", "ip.1.name="]);
        assert_eq!(key_suggestion("ip.{index}=", "", &completed), "ip.0=");
        assert_eq!(key_suggestion("ip.{index}.name=", "", &completed), "ip.2.name=");
    }

    #[test]
    fn test_key_suggestion_map() {
        assert_eq!(key_suggestion("leaves.{key}.size=", "", &given(&[])), "leaves.");
        assert_eq!(key_suggestion("leaves.{key}.size=", "leaves.", &given(&[])), "leaves.");
        assert_eq!(
            key_suggestion("leaves.{key}.size=", "leaves.0", &given(&[])),
            "leaves.0.size="
        );
        assert_eq!(
            key_suggestion("leaves.{key}.size=", "leaves.top.", &given(&[])),
            "leaves.top.size="
        );
    }

    #[test]
    fn test_autocomplete_profile_name() {
        let mut spec = ArgSpec::new("profile");
        spec.auto_complete = Some(autocomplete_profile_name());
        let ctx = Context::new().with_profiles(vec!["dev".to_string(), "prod".to_string()]);
        assert_eq!(arg_value_suggestions(&ctx, &spec, "p"), vec!["prod"]);
        assert_eq!(arg_value_suggestions(&ctx, &spec, ""), vec!["dev", "prod"]);
    }

    #[test]
    fn test_default_profile_name() {
        let spec = ArgSpec {
            default: Some(default_profile_name()),
            ..ArgSpec::new("profile")
        };
        let ctx = Context::new();
        assert_eq!(spec.default_for(&ctx), Some(("default".to_string(), "default".to_string())));
        let ctx = ctx.with_active_profile(Some("prod".to_string()));
        assert_eq!(spec.default_for(&ctx).map(|(value, _)| value).as_deref(), Some("prod"));
    }

    #[test]
    fn test_arg_value_suggestions_for_booleans() {
        let spec = ArgSpec::new("with-leaves").kind(crate::args::ScalarKind::Bool);
        let ctx = Context::new();
        assert_eq!(arg_value_suggestions(&ctx, &spec, ""), vec!["false", "true"]);
        assert_eq!(arg_value_suggestions(&ctx, &spec, "t"), vec!["true"]);
    }

    #[test]
    fn test_word_index() {
        let words = ["scw", "", "flower"];
        assert_eq!(word_index(0, &words), 0);
        assert_eq!(word_index(3, &words), 0);
        assert_eq!(word_index(4, &words), 1);
        assert_eq!(word_index(5, &words), 2);
        assert_eq!(word_index(42, &words), 3);
    }
}
