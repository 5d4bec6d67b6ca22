//! Main CLI application

use crate::config::{
    load_env_file, parse_config_auto, parse_config_file, validate_config, Config,
};
use crate::error::Result;
use crate::runner::{complete, word_index, Commands, Context, Verbosity};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use colored::Colorize;
use serde_json::Value;
use std::path::PathBuf;

/// CLI application
pub struct App {
    /// Parsed configuration
    config: Config,
}

impl App {
    /// Create a new app from the discovered configuration file
    pub fn new() -> Result<Self> {
        let (config, config_path) = parse_config_auto()?;
        log::debug!("using config file {}", config_path.display());
        validate_config(&config)?;
        Ok(App { config })
    }

    /// Create app with a specific config file
    pub fn with_config_file(path: PathBuf) -> Result<Self> {
        let config = parse_config_file(&path)?;
        validate_config(&config)?;
        Ok(App { config })
    }

    /// Dispatch the parsed command line
    pub fn run(self, matches: &ArgMatches) -> Result<()> {
        let verbosity = get_verbosity(matches);
        let profile = matches.get_one::<String>("profile").cloned();
        let ctx = self.context(verbosity, profile);
        let commands = self.config.into_commands()?;

        match matches.subcommand() {
            Some(("complete", sub)) => {
                let words = get_words(sub);
                let char_index = sub.get_one::<usize>("char-index").copied();
                for suggestion in complete_words(&ctx, &commands, &words, char_index) {
                    println!("{}", suggestion);
                }
            }
            Some(("parse", sub)) => {
                let mut words = get_words(sub);
                if words.first() == Some(&ctx.binary_name) {
                    words.remove(0);
                }
                let mut results = commands.run(&ctx, &words)?;
                let output = if results.len() == 1 {
                    results.remove(0)
                } else {
                    Value::Array(results)
                };
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            Some(("commands", _)) => {
                for command in &commands {
                    if command.short.is_empty() {
                        println!("{}", command.path().bold());
                    } else {
                        println!("{}  {}", command.path().bold(), command.short);
                    }
                }
            }
            _ => {
                build_command().print_help()?;
                println!();
            }
        }
        Ok(())
    }

    fn context(&self, verbosity: Verbosity, profile: Option<String>) -> Context {
        let mut ctx = Context::new()
            .with_profiles(self.config.profiles.clone())
            .with_active_profile(profile.or_else(|| self.config.active_profile.clone()))
            .with_verbosity(verbosity);
        if let Some(name) = &self.config.name {
            ctx = ctx.with_binary_name(name.clone());
        }
        ctx
    }
}

/// Suggestions for the word under the cursor, the last word by default
pub fn complete_words(
    ctx: &Context,
    commands: &Commands,
    words: &[String],
    char_index: Option<usize>,
) -> Vec<String> {
    let index = match char_index {
        Some(char_index) => word_index(char_index, words),
        None => words.len().saturating_sub(1),
    };
    let index = index.min(words.len());
    let word = words.get(index).map_or("", String::as_str);
    let right = words.get(index + 1..).unwrap_or(&[]);
    complete(ctx, commands, &words[..index], word, right)
}

/// Build the clap command
pub fn build_command() -> Command {
    let words = Arg::new("words")
        .value_name("WORDS")
        .help("Command line, program name first")
        .num_args(0..)
        .trailing_var_arg(true)
        .allow_hyphen_values(true);

    Command::new("argtree")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Path-addressed argument unmarshaling and completion")
        .arg(
            Arg::new("file")
                .short('f')
                .long("file")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("Path to argtree.yml config file")
                .global(true),
        )
        .arg(
            Arg::new("profile")
                .short('p')
                .long("profile")
                .value_name("PROFILE")
                .help("Profile to use")
                .global(true),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Only print results and errors")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("silent")
                .short('s')
                .long("silent")
                .help("Print no log output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Print verbose output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("complete")
                .about("Print completion suggestions, one per line")
                .arg(
                    Arg::new("char-index")
                        .long("char-index")
                        .value_name("N")
                        .value_parser(value_parser!(usize))
                        .help("Cursor position in the joined command line"),
                )
                .arg(words.clone()),
        )
        .subcommand(
            Command::new("parse")
                .about("Validate and unmarshal a command line, print it as JSON")
                .arg(words),
        )
        .subcommand(Command::new("commands").about("List the configured commands"))
}

/// Get verbosity level from matches
fn get_verbosity(matches: &ArgMatches) -> Verbosity {
    if matches.get_flag("silent") {
        Verbosity::Silent
    } else if matches.get_flag("quiet") {
        Verbosity::Quiet
    } else if matches.get_flag("verbose") {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    }
}

fn get_words(matches: &ArgMatches) -> Vec<String> {
    matches
        .get_many::<String>("words")
        .map(|words| words.cloned().collect())
        .unwrap_or_default()
}

/// Initialise logging; `RUST_LOG` overrides the verbosity flags
fn init_logger(verbosity: Verbosity) {
    let _ = env_logger::Builder::new()
        .filter_level(verbosity.level_filter())
        .parse_default_env()
        .format_timestamp(None)
        .try_init();
}

/// Run the CLI application with the process arguments
pub fn run() -> Result<()> {
    load_env_file();
    let matches = build_command().get_matches();
    init_logger(get_verbosity(&matches));

    let app = match matches.get_one::<PathBuf>("file") {
        Some(path) => App::with_config_file(path.clone())?,
        None => App::new()?,
    };
    app.run(&matches)
}
