//! Commands and the command registry
//!
//! A command is addressed by its `namespace resource verb` path. Running it
//! resolves the positional argument, fills defaults, checks required
//! arguments, validates every value and unmarshals the tokens into the
//! command's request type, or into a schema-built document when the command
//! has no bound type.

use crate::args::{shape_of, split_token, Addressing, RawArgs, Unmarshaler};
use crate::error::{ArgtreeError, CommandError, RegistryError, RegistryResult, Result};
use crate::runner::arg_specs::ArgSpecs;
use crate::runner::context::Context;
use facet::Facet;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Unmarshals tokens and runs a command with the resulting request
pub type Runner = Arc<dyn Fn(&Context, &[String]) -> Result<Value> + Send + Sync>;

/// A runnable command
#[derive(Clone, Default)]
pub struct Command {
    pub namespace: String,
    pub resource: String,
    pub verb: String,

    /// One-line description
    pub short: String,

    pub arg_specs: ArgSpecs,

    /// Whether the command can wait for its result (`--wait`)
    pub wait: bool,

    /// Tokens are handed over verbatim
    pub raw: bool,

    runner: Option<Runner>,
}

impl Command {
    pub fn new(namespace: &str, resource: &str, verb: &str) -> Self {
        Command {
            namespace: namespace.to_string(),
            resource: resource.to_string(),
            verb: verb.to_string(),
            ..Default::default()
        }
    }

    pub fn short(mut self, short: impl Into<String>) -> Self {
        self.short = short.into();
        self
    }

    pub fn arg_specs(mut self, arg_specs: impl Into<ArgSpecs>) -> Self {
        self.arg_specs = arg_specs.into();
        self
    }

    pub fn with_wait(mut self) -> Self {
        self.wait = true;
        self
    }

    /// Unmarshal into `T` and pass the request to `run`.
    ///
    /// Specs that describe a leaf of `T` learn its kind, so boolean
    /// arguments complete to `false`/`true`. A `RawArgs` request receives
    /// tokens verbatim.
    pub fn bind<T, F>(mut self, run: F) -> Self
    where
        T: Facet<'static> + 'static,
        F: Fn(&Context, T) -> Result<Value> + Send + Sync + 'static,
    {
        let shape = shape_of::<T>();
        self.raw = matches!(Addressing::of(shape, None), Addressing::Raw);
        let learned = ArgSpecs::from_shape(shape);
        for spec in self.arg_specs.iter_mut() {
            if let Some(kind) = learned.get_by_name(&spec.name).and_then(|s| s.kind) {
                spec.kind.get_or_insert(kind);
            }
        }
        self.runner = Some(Arc::new(move |ctx: &Context, tokens: &[String]| {
            let request: T = Unmarshaler::new(&ctx.coercers).unmarshal_as(tokens)?;
            run(ctx, request)
        }));
        self
    }

    /// Accept tokens verbatim, returned as a JSON array
    pub fn raw_args(self) -> Self {
        self.bind(|_, args: RawArgs| Ok(Value::from(args.0)))
    }

    /// Space separated command path (`instance server create`)
    pub fn path(&self) -> String {
        [&self.namespace, &self.resource, &self.verb]
            .iter()
            .filter(|part| !part.is_empty())
            .map(|part| part.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn words(&self) -> Vec<&str> {
        [&self.namespace, &self.resource, &self.verb]
            .into_iter()
            .filter(|part| !part.is_empty())
            .map(String::as_str)
            .collect()
    }

    /// Run the command once per positional value.
    ///
    /// `raw_args` are the words following the command path.
    pub fn run(&self, ctx: &Context, raw_args: &[String]) -> Result<Vec<Value>> {
        if self.raw {
            return Ok(vec![self.execute(ctx, raw_args.to_vec())?]);
        }

        let positional = self.arg_specs.positional()?;
        let Some(positional) = positional else {
            return Ok(vec![self.run_once(ctx, raw_args.to_vec())?]);
        };

        let (values, others): (Vec<String>, Vec<String>) =
            raw_args.iter().cloned().partition(|arg| !arg.contains('='));

        let prefix = positional.prefix();
        if let Some(named) = others.iter().find(|arg| arg.starts_with(&prefix)) {
            let value = &named[prefix.len()..];
            return Err(self.positional_error(ctx, value, &others, &prefix).into());
        }
        if values.is_empty() {
            let placeholder = format!("<{}>", positional.name);
            return Err(self.positional_error(ctx, &placeholder, &others, &prefix).into());
        }

        values
            .iter()
            .map(|value| {
                let mut tokens = others.clone();
                tokens.push(format!("{}{}", prefix, value));
                self.run_once(ctx, tokens)
            })
            .collect()
    }

    fn positional_error(
        &self,
        ctx: &Context,
        value: &str,
        others: &[String],
        prefix: &str,
    ) -> CommandError {
        let mut words = vec![ctx.binary_name.clone(), self.path(), value.to_string()];
        words.extend(others.iter().filter(|arg| !arg.starts_with(prefix)).cloned());
        CommandError::PositionalArgumentMissing {
            hint: format!("Try running: {}", words.join(" ")),
        }
    }

    fn run_once(&self, ctx: &Context, mut tokens: Vec<String>) -> Result<Value> {
        let given: HashSet<String> = tokens
            .iter()
            .map(|token| split_token(token).0.to_string())
            .collect();

        for spec in self.arg_specs.iter() {
            if given.contains(&spec.name) || spec.is_part_of_map_or_slice() {
                continue;
            }
            if let Some((value, _)) = spec.default_for(ctx) {
                log::debug!("defaulting {} to {:?}", spec.name, value);
                tokens.push(format!("{}{}", spec.prefix(), value));
            } else if spec.is_required() {
                return Err(CommandError::MissingRequiredArgument(spec.name.clone()).into());
            }
        }

        for token in &tokens {
            let (name, value) = split_token(token);
            if let Some(spec) = self.arg_specs.find_matching(name) {
                spec.validate_value(value)
                    .map_err(|source| CommandError::InvalidArgument {
                        name: name.to_string(),
                        source,
                    })?;
            }
        }

        self.execute(ctx, tokens)
    }

    fn execute(&self, ctx: &Context, tokens: Vec<String>) -> Result<Value> {
        log::debug!("running '{}' with {:?}", self.path(), tokens);
        let result = match &self.runner {
            Some(runner) => runner(ctx, &tokens),
            None if self.raw => Ok(Value::from(tokens)),
            None => self.unmarshal_document(ctx, &tokens),
        };
        result.map_err(|err| match err {
            ArgtreeError::Unmarshal(source) => ArgtreeError::from(CommandError::BadArgument {
                source,
                valid: self.valid_argument_names(),
            }),
            other => other,
        })
    }

    fn unmarshal_document(&self, ctx: &Context, tokens: &[String]) -> Result<Value> {
        let mut document = self.arg_specs.schema()?.document();
        Unmarshaler::new(&ctx.coercers).unmarshal(tokens, &mut document)?;
        Ok(document.to_json())
    }

    fn valid_argument_names(&self) -> Vec<String> {
        self.arg_specs.iter().map(|spec| spec.name.clone()).collect()
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("path", &self.path())
            .field("short", &self.short)
            .field("arg_specs", &self.arg_specs)
            .field("wait", &self.wait)
            .field("raw", &self.raw)
            .field("runner", &self.runner.is_some())
            .finish()
    }
}

/// The command registry
#[derive(Debug, Clone, Default)]
pub struct Commands {
    commands: Vec<Command>,
}

impl Commands {
    /// Build a registry, checking every command
    pub fn new(commands: Vec<Command>) -> RegistryResult<Self> {
        let mut registry = Commands::default();
        for command in commands {
            registry.add(command)?;
        }
        Ok(registry)
    }

    pub fn add(&mut self, command: Command) -> RegistryResult<()> {
        command.arg_specs.check()?;
        if !command.raw {
            command.arg_specs.schema()?;
        }
        let path = command.path();
        if self.commands.iter().any(|c| c.path() == path) {
            return Err(RegistryError::DuplicateCommand(path));
        }
        log::trace!("registered command '{}'", path);
        self.commands.push(command);
        Ok(())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Command> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn find(&self, namespace: &str, resource: &str, verb: &str) -> Option<&Command> {
        self.commands
            .iter()
            .find(|c| c.namespace == namespace && c.resource == resource && c.verb == verb)
    }

    /// Command with the longest path prefixing `words`, and the number of
    /// words that path takes
    pub fn resolve<S: AsRef<str>>(&self, words: &[S]) -> Option<(&Command, usize)> {
        self.commands
            .iter()
            .filter_map(|command| {
                let path = command.words();
                let matches = path.len() <= words.len()
                    && path.iter().zip(words).all(|(p, w)| *p == w.as_ref());
                matches.then_some((command, path.len()))
            })
            .max_by_key(|(_, len)| *len)
    }

    /// Resolve and run a command line (without the program name)
    pub fn run(&self, ctx: &Context, words: &[String]) -> Result<Vec<Value>> {
        let (command, len) = self
            .resolve(words)
            .ok_or_else(|| CommandError::UnknownCommand(words.join(" ")))?;
        command.run(ctx, &words[len..])
    }
}

impl<'a> IntoIterator for &'a Commands {
    type Item = &'a Command;
    type IntoIter = std::slice::Iter<'a, Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::arg_specs::ArgSpec;
    use serde_json::json;

    #[derive(Facet, Debug, Default)]
    struct Positional {
        name_id: String,
        tag: String,
    }

    fn positional_command() -> Command {
        Command::new("test", "positional", "")
            .arg_specs(vec![ArgSpec::new("name-id").positional(), ArgSpec::new("tag")])
            .bind(|_, args: Positional| Ok(json!({"name-id": args.name_id, "tag": args.tag})))
    }

    fn run(command: &Command, args: &[&str]) -> Result<Vec<Value>> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        command.run(&Context::new(), &args)
    }

    fn hint(result: Result<Vec<Value>>) -> String {
        result.unwrap_err().hint().unwrap_or_default()
    }

    #[test]
    fn test_positional_missing() {
        let command = positional_command();
        assert_eq!(hint(run(&command, &[])), "Try running: scw test positional <name-id>");
        assert_eq!(
            hint(run(&command, &["tag=world"])),
            "Try running: scw test positional <name-id> tag=world"
        );
    }

    #[test]
    fn test_positional_given_by_name() {
        let command = positional_command();
        assert_eq!(
            hint(run(&command, &["name-id=plop", "tag=world"])),
            "Try running: scw test positional plop tag=world"
        );
        assert_eq!(
            hint(run(&command, &["tag=world", "name-id=plop"])),
            "Try running: scw test positional plop tag=world"
        );
        assert_eq!(
            hint(run(&command, &["plop", "name-id=plop"])),
            "Try running: scw test positional plop"
        );
    }

    #[test]
    fn test_positional_runs_once_per_value() {
        let command = positional_command();
        let results = run(&command, &["tag=tag01", "test1", "test2"]).unwrap();
        assert_eq!(
            results,
            vec![
                json!({"name-id": "test1", "tag": "tag01"}),
                json!({"name-id": "test2", "tag": "tag01"}),
            ]
        );
    }

    #[test]
    fn test_bad_argument_lists_valid_names() {
        let command = Command::new("test", "", "")
            .arg_specs(vec![ArgSpec::new("name-id")])
            .bind(|_, args: Positional| Ok(Value::from(args.name_id)));
        let err = run(&command, &["name_id"]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid argument 'name_id': arg name must only contain lowercase letters, numbers or dashes"
        );
        assert_eq!(err.hint().as_deref(), Some("Valid arguments are: name-id"));
    }

    #[test]
    fn test_raw_args() {
        let command = Command::new("test", "raw-args", "").raw_args();
        let results = run(&command, &["blabla", "foo", "bar"]).unwrap();
        assert_eq!(results, vec![json!(["blabla", "foo", "bar"])]);
    }

    #[test]
    fn test_defaults_required_and_enum() {
        let command = Command::new("test", "flower", "create").arg_specs(vec![
            ArgSpec::new("name").required(),
            ArgSpec::new("size").enum_values(["S", "M", "L"]).default_value("M"),
        ]);

        let results = run(&command, &["name=rose"]).unwrap();
        assert_eq!(results, vec![json!({"name": "rose", "size": "M"})]);

        let err = run(&command, &["size=S"]).unwrap_err();
        assert_eq!(err.to_string(), "missing required argument 'name'");

        let err = run(&command, &["name=rose", "size=XL"]).unwrap_err();
        assert!(matches!(
            err,
            ArgtreeError::Command(CommandError::InvalidArgument { ref name, .. }) if name == "size"
        ));
    }

    #[test]
    fn test_registry_rejects_duplicates() {
        let err = Commands::new(vec![
            Command::new("test", "flower", "create"),
            Command::new("test", "flower", "create"),
        ])
        .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateCommand("test flower create".to_string()));
    }

    #[test]
    fn test_resolve_longest_path() {
        let commands = Commands::new(vec![
            Command::new("test", "", ""),
            Command::new("test", "flower", "create"),
        ])
        .unwrap();
        let (command, len) = commands.resolve(&["test", "flower", "create", "name=a"]).unwrap();
        assert_eq!(command.path(), "test flower create");
        assert_eq!(len, 3);

        let (command, len) = commands.resolve(&["test", "name=a"]).unwrap();
        assert_eq!(command.path(), "test");
        assert_eq!(len, 1);

        assert!(commands.resolve(&["other"]).is_none());
    }

    #[test]
    fn test_bind_learns_boolean_kind() {
        #[derive(Facet, Debug, Default)]
        struct Delete {
            name: String,
            with_leaves: bool,
        }

        let command = Command::new("test", "flower", "delete")
            .arg_specs(vec![ArgSpec::new("name"), ArgSpec::new("with-leaves")])
            .bind(|_, _: Delete| Ok(Value::Null));
        assert!(command.arg_specs.get_by_name("with-leaves").unwrap().is_boolean());
        assert!(!command.arg_specs.get_by_name("name").unwrap().is_boolean());
        assert!(!command.raw);
    }

    #[test]
    fn test_bind_runs_registered_coercers() {
        #[derive(Facet, Debug, Default, PartialEq)]
        struct Height(u32);

        #[derive(Facet, Debug, Default)]
        struct Measure {
            height: Option<Height>,
        }

        let command = Command::new("test", "flower", "measure")
            .arg_specs(vec![ArgSpec::new("height")])
            .bind(|_, args: Measure| Ok(json!(args.height.map(|h| h.0))));
        let mut ctx = Context::new();
        ctx.coercers.register(|raw: &str| -> std::result::Result<Height, String> {
            raw.strip_suffix("cm")
                .and_then(|n| n.parse().ok())
                .map(Height)
                .ok_or_else(|| format!("'{}' is not in centimeters", raw))
        });

        let results = command.run(&ctx, &["height=14cm".to_string()]).unwrap();
        assert_eq!(results, vec![json!(14)]);
        let results = command.run(&ctx, &[]).unwrap();
        assert_eq!(results, vec![Value::Null]);
    }
}
