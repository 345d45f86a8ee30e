//! Operator console command parsing.

/// A command typed on the agent's stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the discovered endpoints and the current selection.
    List,
    /// Select the endpoint at a zero-based index.
    Select(usize),
    /// Print the selected endpoint's address for copying.
    Copy,
    /// Clear the list.
    Reset,
    /// Ask the poll loop to tick now.
    Rescan,
    MatchStart,
    MatchEnd,
    /// Change the poll interval and persist it.
    SetPoll(u64),
    /// Toggle duplicate retention and persist it.
    SetDuplicates(bool),
    Help,
    Quit,
}

/// Error returned for unrecognised input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0} (type `help` for commands)")]
pub struct ParseError(String);

pub const HELP: &str = "\
commands:
  list                   show discovered endpoints
  select <n>             select endpoint n (0-based)
  copy                   print the selected address
  reset                  clear the list
  rescan                 poll immediately
  match-start            mark a match as started
  match-end              mark the match as ended
  set poll <ms>          change the poll interval (max 5000)
  set duplicates <on|off>
  quit";

/// Parses one input line. Blank lines yield `Ok(None)`.
pub fn parse(line: &str) -> Result<Option<Command>, ParseError> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let cmd = match (head.to_ascii_lowercase().as_str(), args.as_slice()) {
        ("list" | "ls", []) => Command::List,
        ("select", [n]) => Command::Select(
            n.parse()
                .map_err(|_| ParseError(format!("invalid index: {n}")))?,
        ),
        ("copy", []) => Command::Copy,
        ("reset", []) => Command::Reset,
        ("rescan", []) => Command::Rescan,
        ("match-start", []) => Command::MatchStart,
        ("match-end", []) => Command::MatchEnd,
        ("set", ["poll", ms]) => Command::SetPoll(
            ms.parse()
                .map_err(|_| ParseError(format!("invalid interval: {ms}")))?,
        ),
        ("set", ["duplicates", v]) => Command::SetDuplicates(parse_switch(v)?),
        ("help" | "?", []) => Command::Help,
        ("quit" | "exit", []) => Command::Quit,
        _ => return Err(ParseError(format!("unknown command: {}", line.trim()))),
    };
    Ok(Some(cmd))
}

fn parse_switch(value: &str) -> Result<bool, ParseError> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" => Ok(true),
        "off" | "false" | "no" => Ok(false),
        _ => Err(ParseError(format!("expected on or off, got: {value}"))),
    }
}
