//! The protocol command table.
//!
//! Dispatch is table-driven: each command carries its keyword, usage string,
//! and argument arity as data. Handlers live with the server; this module
//! only classifies an input line.

/// Dispatch key for a parsed command. Carries no behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    List,
    Allowlist,
    Add,
    Del,
    Status,
    Quit,
}

/// Static metadata for one protocol command.
#[derive(Debug)]
pub struct CommandSpec {
    pub kind: CommandKind,
    pub name: &'static str,
    pub usage: &'static str,
    pub min_args: usize,
    pub max_args: usize,
}

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        kind: CommandKind::List,
        name: "LIST",
        usage: "LIST",
        min_args: 0,
        max_args: 0,
    },
    CommandSpec {
        kind: CommandKind::Allowlist,
        name: "ALLOWLIST",
        usage: "ALLOWLIST",
        min_args: 0,
        max_args: 0,
    },
    CommandSpec {
        kind: CommandKind::Add,
        name: "ADD",
        usage: "ADD <MAC> [HOSTNAME] [IP]",
        min_args: 1,
        max_args: 3,
    },
    CommandSpec {
        kind: CommandKind::Del,
        name: "DEL",
        usage: "DEL <MAC>",
        min_args: 1,
        max_args: 1,
    },
    CommandSpec {
        kind: CommandKind::Status,
        name: "STATUS",
        usage: "STATUS",
        min_args: 0,
        max_args: 0,
    },
    CommandSpec {
        kind: CommandKind::Quit,
        name: "QUIT",
        usage: "QUIT",
        min_args: 0,
        max_args: 0,
    },
];

impl CommandSpec {
    /// Human message for an arity violation, citing the expected usage.
    pub fn arity_error(&self, got: usize) -> String {
        if got < self.min_args {
            format!(
                "{} requires at least {} argument(s). Usage: {}",
                self.name, self.min_args, self.usage
            )
        } else {
            format!(
                "{} accepts at most {} argument(s). Usage: {}",
                self.name, self.max_args, self.usage
            )
        }
    }
}

/// Case-insensitive lookup of a command keyword.
pub fn lookup(keyword: &str) -> Option<&'static CommandSpec> {
    COMMANDS
        .iter()
        .find(|spec| spec.name.eq_ignore_ascii_case(keyword))
}

/// Comma-separated list of valid command names, for INVALID_COMMAND replies.
pub fn command_names() -> String {
    COMMANDS
        .iter()
        .map(|spec| spec.name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result of classifying one input line.
#[derive(Debug)]
pub enum ParseOutcome<'a> {
    /// Blank line: ignore, no response.
    Empty,
    /// Unrecognized keyword.
    Unknown(&'a str),
    /// Known command, wrong argument count.
    BadArity(&'static CommandSpec, usize),
    /// Ready to dispatch.
    Ok(&'static CommandSpec, Vec<&'a str>),
}

/// Split on whitespace into at most `limit` tokens; the final token absorbs
/// the remainder of the line.
pub fn tokenize(line: &str, limit: usize) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut rest = line.trim();
    while !rest.is_empty() {
        if tokens.len() + 1 == limit {
            tokens.push(rest);
            break;
        }
        match rest.find(char::is_whitespace) {
            Some(idx) => {
                tokens.push(&rest[..idx]);
                rest = rest[idx..].trim_start();
            }
            None => {
                tokens.push(rest);
                break;
            }
        }
    }
    tokens
}

/// Classify one protocol line: keyword lookup plus arity check.
///
/// A command plus up to three arguments covers the widest form
/// (`ADD <MAC> [HOSTNAME] [IP]`), so tokenization stops at four tokens.
pub fn parse_line(line: &str) -> ParseOutcome<'_> {
    let tokens = tokenize(line, 4);
    let Some((keyword, args)) = tokens.split_first() else {
        return ParseOutcome::Empty;
    };

    let Some(spec) = lookup(keyword) else {
        return ParseOutcome::Unknown(keyword);
    };

    if args.len() < spec.min_args || args.len() > spec.max_args {
        return ParseOutcome::BadArity(spec, args.len());
    }

    ParseOutcome::Ok(spec, args.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(lookup("list").unwrap().kind, CommandKind::List);
        assert_eq!(lookup("Add").unwrap().kind, CommandKind::Add);
        assert_eq!(lookup("QUIT").unwrap().kind, CommandKind::Quit);
        assert!(lookup("FOO").is_none());
    }

    #[test]
    fn tokenize_caps_at_limit_and_keeps_remainder() {
        assert_eq!(
            tokenize("ADD  aa:bb:cc:dd:ee:ff   host  1.2.3.4", 4),
            vec!["ADD", "aa:bb:cc:dd:ee:ff", "host", "1.2.3.4"]
        );
        assert_eq!(
            tokenize("ADD a b c d e", 4),
            vec!["ADD", "a", "b", "c d e"]
        );
        assert!(tokenize("   ", 4).is_empty());
    }

    #[test]
    fn parse_line_classifies_blank_unknown_and_arity() {
        assert!(matches!(parse_line(""), ParseOutcome::Empty));
        assert!(matches!(parse_line("  \t "), ParseOutcome::Empty));
        assert!(matches!(parse_line("FOO"), ParseOutcome::Unknown("FOO")));

        match parse_line("ADD") {
            ParseOutcome::BadArity(spec, 0) => assert_eq!(spec.kind, CommandKind::Add),
            other => panic!("expected arity violation, got {other:?}"),
        }
        match parse_line("DEL aa:bb:cc:dd:ee:ff extra") {
            ParseOutcome::BadArity(spec, 2) => assert_eq!(spec.kind, CommandKind::Del),
            other => panic!("expected arity violation, got {other:?}"),
        }
        match parse_line("LIST now") {
            ParseOutcome::BadArity(spec, 1) => assert_eq!(spec.kind, CommandKind::List),
            other => panic!("expected arity violation, got {other:?}"),
        }
    }

    #[test]
    fn parse_line_dispatches_valid_commands() {
        match parse_line("add 00:11:22:33:44:55 printer 10.0.0.9") {
            ParseOutcome::Ok(spec, args) => {
                assert_eq!(spec.kind, CommandKind::Add);
                assert_eq!(args, vec!["00:11:22:33:44:55", "printer", "10.0.0.9"]);
            }
            other => panic!("expected dispatch, got {other:?}"),
        }
        assert!(matches!(
            parse_line("status"),
            ParseOutcome::Ok(spec, _) if spec.kind == CommandKind::Status
        ));
    }

    #[test]
    fn arity_messages_cite_usage() {
        let add = lookup("ADD").unwrap();
        assert_eq!(
            add.arity_error(0),
            "ADD requires at least 1 argument(s). Usage: ADD <MAC> [HOSTNAME] [IP]"
        );
        let del = lookup("DEL").unwrap();
        assert_eq!(
            del.arity_error(2),
            "DEL accepts at most 1 argument(s). Usage: DEL <MAC>"
        );
    }

    #[test]
    fn command_names_lists_all_commands() {
        assert_eq!(
            command_names(),
            "LIST, ALLOWLIST, ADD, DEL, STATUS, QUIT"
        );
    }
}
