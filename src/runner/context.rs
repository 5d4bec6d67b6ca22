//! Invocation context
//!
//! The context carries the state shared by every command of one invocation:
//! program name, profiles, verbosity and the registered value coercers.

use crate::args::CoercerRegistry;
use log::LevelFilter;

/// Program name used when none is configured
pub const DEFAULT_BINARY_NAME: &str = "scw";

/// Profile used when none is selected
pub const DEFAULT_PROFILE_NAME: &str = "default";

/// State shared by the commands of one invocation
#[derive(Debug)]
pub struct Context {
    /// Name the program is invoked as (first word of a command line)
    pub binary_name: String,

    /// Configured profile names, offered when completing `--profile`
    pub profiles: Vec<String>,

    /// Profile selected with `--profile` or by the configuration
    pub active_profile: Option<String>,

    /// Verbosity level
    pub verbosity: Verbosity,

    /// Coercers for custom leaf types
    pub coercers: CoercerRegistry,
}

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Silent = 0,
    Quiet = 1,
    Normal = 2,
    Verbose = 3,
}

impl Verbosity {
    /// Log level used when `RUST_LOG` is not set
    pub fn level_filter(self) -> LevelFilter {
        match self {
            Verbosity::Silent => LevelFilter::Off,
            Verbosity::Quiet => LevelFilter::Error,
            Verbosity::Normal => LevelFilter::Warn,
            Verbosity::Verbose => LevelFilter::Debug,
        }
    }
}

impl Context {
    /// Create a new context with default settings
    pub fn new() -> Self {
        Context {
            binary_name: DEFAULT_BINARY_NAME.to_string(),
            profiles: Vec::new(),
            active_profile: None,
            verbosity: Verbosity::Normal,
            coercers: CoercerRegistry::new(),
        }
    }

    pub fn with_binary_name(mut self, name: impl Into<String>) -> Self {
        self.binary_name = name.into();
        self
    }

    pub fn with_profiles(mut self, profiles: Vec<String>) -> Self {
        self.profiles = profiles;
        self
    }

    pub fn with_active_profile(mut self, profile: Option<String>) -> Self {
        self.active_profile = profile;
        self
    }

    /// Set verbosity level
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Replace the coercer registry
    pub fn with_coercers(mut self, coercers: CoercerRegistry) -> Self {
        self.coercers = coercers;
        self
    }

    /// Register coercers before the first command runs
    pub fn coercers_mut(&mut self) -> &mut CoercerRegistry {
        &mut self.coercers
    }

    /// Name of the profile commands run with
    pub fn profile_name(&self) -> &str {
        self.active_profile.as_deref().unwrap_or(DEFAULT_PROFILE_NAME)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_new() {
        let ctx = Context::new();
        assert_eq!(ctx.verbosity, Verbosity::Normal);
        assert_eq!(ctx.binary_name, "scw");
        assert!(ctx.profiles.is_empty());
        assert!(ctx.active_profile.is_none());
    }

    #[test]
    fn test_context_builder() {
        let ctx = Context::new()
            .with_binary_name("argtree")
            .with_profiles(vec!["p1".to_string(), "p2".to_string()])
            .with_active_profile(Some("p2".to_string()));
        assert_eq!(ctx.binary_name, "argtree");
        assert_eq!(ctx.profiles, vec!["p1", "p2"]);
        assert_eq!(ctx.active_profile.as_deref(), Some("p2"));
    }

    #[test]
    fn test_profile_name() {
        assert_eq!(Context::new().profile_name(), "default");
        let ctx = Context::new().with_active_profile(Some("p2".to_string()));
        assert_eq!(ctx.profile_name(), "p2");
    }

    #[test]
    fn test_verbosity_levels() {
        assert!(Verbosity::Verbose > Verbosity::Normal);
        assert!(Verbosity::Normal > Verbosity::Quiet);
        assert!(Verbosity::Quiet > Verbosity::Silent);
        assert_eq!(Verbosity::Silent.level_filter(), LevelFilter::Off);
        assert_eq!(Verbosity::Verbose.level_filter(), LevelFilter::Debug);
    }

    #[test]
    fn test_registered_coercers_are_kept() {
        let mut ctx = Context::new();
        ctx.coercers_mut()
            .register(|raw: &str| raw.parse::<u8>().map_err(|e| e.to_string()));
        assert!(ctx.coercers.contains::<u8>());
    }
}
