//! Chat line parsing. Lines starting with `/` are commands, everything else
//! is said to the room.

/// A parsed chat line, borrowing its arguments from the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatCommand<'a> {
    /// `/nick <name>`, argument untrimmed and possibly empty
    Nick(&'a str),
    /// `/newtable`
    NewTable,
    /// `/jointable <id>`, None when the id is missing or not a number
    JoinTable(Option<u64>),
    /// Any other `/word`
    Unknown(&'a str),
    Say(&'a str),
}

/// Parse one chat line. Blank lines yield None.
pub fn parse(line: &str) -> Option<ChatCommand<'_>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Some(ChatCommand::Say(line));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    let command = match name {
        "nick" => ChatCommand::Nick(arg),
        "newtable" => ChatCommand::NewTable,
        "jointable" => ChatCommand::JoinTable(arg.parse().ok()),
        _ => ChatCommand::Unknown(name),
    };
    Some(command)
}
