//! Parses the in-program ex-command line (spec §6.2) into a structured
//! [`ExCommand`] the dispatcher executes. Unknown commands are reported
//! as `ExCommand::Unknown` rather than an error — the status bar shows
//! "unknown command" feedback, it never aborts the program.

use crate::layout::Orientation;

#[derive(Debug, Clone, PartialEq)]
pub enum ExCommand {
    Quit { force: bool },
    QuitAll { force: bool },
    NewTab { agent_type: Option<String>, extra_argv: Vec<String> },
    Split { orientation: Orientation, agent_type: Option<String>, extra_argv: Vec<String> },
    CloseOthers,
    CloseFocused,
    Save { name: Option<String> },
    SaveAndQuit,
    ListSessions,
    Restore { id_or_name: Option<String> },
    Rename { name: String },
    Set { key: String, value: u64 },
    Unknown(String),
    Empty,
}

pub fn parse(line: &str) -> ExCommand {
    let line = line.trim();
    if line.is_empty() {
        return ExCommand::Empty;
    }
    let mut parts = line.split_whitespace();
    let cmd = parts.next().unwrap_or("");
    let rest: Vec<&str> = parts.collect();

    match cmd {
        "q" | "quit" => ExCommand::Quit { force: false },
        "q!" | "quit!" => ExCommand::Quit { force: true },
        "qa" | "qall" | "qa!" | "qall!" => ExCommand::QuitAll { force: cmd.ends_with('!') },
        "e" => ExCommand::NewTab {
            agent_type: rest.first().map(|s| s.to_string()),
            extra_argv: rest.get(1..).map(|s| s.iter().map(|a| a.to_string()).collect()).unwrap_or_default(),
        },
        "sp" | "split" => ExCommand::Split {
            orientation: Orientation::Horizontal,
            agent_type: rest.first().map(|s| s.to_string()),
            extra_argv: rest.get(1..).map(|s| s.iter().map(|a| a.to_string()).collect()).unwrap_or_default(),
        },
        "vs" | "vsp" | "vsplit" => ExCommand::Split {
            orientation: Orientation::Vertical,
            agent_type: rest.first().map(|s| s.to_string()),
            extra_argv: rest.get(1..).map(|s| s.iter().map(|a| a.to_string()).collect()).unwrap_or_default(),
        },
        "only" | "on" => ExCommand::CloseOthers,
        "close" | "clo" => ExCommand::CloseFocused,
        "w" | "write" | "save" => ExCommand::Save { name: rest.first().map(|s| s.to_string()) },
        "wq" | "x" => ExCommand::SaveAndQuit,
        "sessions" | "ls" => ExCommand::ListSessions,
        "restore" | "load" => ExCommand::Restore { id_or_name: rest.first().map(|s| s.to_string()) },
        "name" | "rename" => match rest.first() {
            Some(name) => ExCommand::Rename { name: name.to_string() },
            None => ExCommand::Unknown(line.to_string()),
        },
        "set" => parse_set(rest.first().copied()).unwrap_or_else(|| ExCommand::Unknown(line.to_string())),
        _ => ExCommand::Unknown(line.to_string()),
    }
}

fn parse_set(assignment: Option<&str>) -> Option<ExCommand> {
    let (key, value) = assignment?.split_once('=')?;
    let key = match key {
        "output_silence" | "output_silence_ms" | "output_silence_duration" => "output_silence_ms",
        "scrollback" => "scrollback",
        _ => return None,
    };
    Some(ExCommand::Set { key: key.to_string(), value: value.parse().ok()? })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_quit_variants() {
        assert_eq!(parse("q"), ExCommand::Quit { force: false });
        assert_eq!(parse("q!"), ExCommand::Quit { force: true });
        assert_eq!(parse("qall!"), ExCommand::QuitAll { force: true });
    }

    #[test]
    fn parses_split_with_agent_type_and_argv() {
        assert_eq!(
            parse("vsp codex --resume"),
            ExCommand::Split {
                orientation: Orientation::Vertical,
                agent_type: Some("codex".into()),
                extra_argv: vec!["--resume".into()],
            }
        );
    }

    #[test]
    fn parses_save_with_optional_name() {
        assert_eq!(parse("w myproj"), ExCommand::Save { name: Some("myproj".into()) });
        assert_eq!(parse("save"), ExCommand::Save { name: None });
    }

    #[test]
    fn parses_set_aliases() {
        assert_eq!(parse("set scrollback=5000"), ExCommand::Set { key: "scrollback".into(), value: 5000 });
        assert_eq!(
            parse("set output_silence_duration=90"),
            ExCommand::Set { key: "output_silence_ms".into(), value: 90 }
        );
    }

    #[test]
    fn unknown_command_is_reported_not_erred() {
        assert_eq!(parse("bogus"), ExCommand::Unknown("bogus".into()));
    }

    #[test]
    fn empty_line_is_empty() {
        assert_eq!(parse("   "), ExCommand::Empty);
    }
}
