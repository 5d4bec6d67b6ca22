use colored::Colorize;
use std::process;

fn main() {
    if let Err(e) = argtree::cli::run() {
        eprintln!("{} {}", "Error:".red().bold(), e);
        if let Some(hint) = e.hint() {
            eprintln!("{} {}", "Hint:".yellow(), hint);
        }
        process::exit(1);
    }
}
