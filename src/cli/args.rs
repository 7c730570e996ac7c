//! Command-line argument parsing.

/// Parsed CLI command to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    /// Show version information
    Version,
    /// Show usage
    Help,
    /// Run the interactive chat (default)
    Chat {
        /// Use blocking requests instead of streaming
        blocking: bool,
    },
}

/// Parse command-line arguments and return the appropriate command.
///
/// # Examples
///
/// ```
/// use difychat::cli::args::{parse_args, CliCommand};
///
/// let args = vec!["difychat".to_string(), "--version".to_string()];
/// assert_eq!(parse_args(args.into_iter()), CliCommand::Version);
/// ```
pub fn parse_args<I>(args: I) -> CliCommand
where
    I: Iterator<Item = String>,
{
    let mut blocking = false;
    for arg in args.skip(1) {
        match arg.as_str() {
            "--version" | "-V" => return CliCommand::Version,
            "--help" | "-h" => return CliCommand::Help,
            "--blocking" => blocking = true,
            _ => {}
        }
    }
    CliCommand::Chat { blocking }
}
