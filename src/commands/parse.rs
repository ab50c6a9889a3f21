//! Splitting message text into a command name and arguments.

/// A message recognised as a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// Lowercased name as typed (may be an alias).
    pub name: String,
    pub args: Vec<String>,
}

/// Parse `text` if it starts with `prefix` followed by a command name.
pub fn parse_command(text: &str, prefix: &str) -> Option<ParsedCommand> {
    let rest = text.trim_start().strip_prefix(prefix)?;
    let mut words = rest.split_whitespace();
    let name = words.next()?;
    // "!" followed by a space is ordinary text, not a command.
    if rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(ParsedCommand {
        name: name.to_lowercase(),
        args: words.map(str::to_string).collect(),
    })
}
