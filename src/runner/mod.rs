//! Commands, argument specs and completion
//!
//! This module holds the command registry and everything built from it:
//! the run pipeline, the autocomplete tree and its resolver.

pub mod arg_specs;
pub mod autocomplete;
pub mod command;
pub mod complete;
pub mod context;

pub use arg_specs::{ArgSpec, ArgSpecs, AutoCompleteFn, DefaultFn, ValidateFn};
pub use autocomplete::{AutoCompleteNode, AutoCompleteTree, FlagSpec, NodeId, NodeKind};
pub use command::{Command, Commands, Runner};
pub use complete::{
    arg_value_suggestions, autocomplete_profile_name, complete, default_profile_name, word_index,
};
pub use context::{Context, Verbosity, DEFAULT_PROFILE_NAME};
