#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    Help,
    Clear,
    Quit,
    Model(String),
    Key(String),
    AutoAccept(bool),
    /// `None` clears the selection.
    File(Option<String>),
    Artifacts,
    /// One-based index into the artifact list.
    Show(usize),
    Dismiss(usize),
    Sessions,
    Resume(String),
    Forget(String),
    Status,
    Git,
    Connect,
    Usage(&'static str),
    Unknown(String),
}

pub const HELP_TEXT: &str = "\
commands:
  /help              show this help
  /clear             start a fresh conversation
  /quit              exit
  /model <name>      override the agent model
  /key <value>       override the agent API key
  /auto on|off       auto-accept tool calls
  /file [path]       select file context (no path clears it)
  /artifacts         list artifacts
  /show <n>          print artifact n
  /dismiss <n>       remove artifact n
  /sessions          list stored sessions
  /resume <id>       continue a stored session
  /forget <id>       delete a stored session
  /status            connection and server status
  /git               working tree status
  /connect           (re)connect to the agent";

pub fn parse_slash_command(input: &str) -> Option<SlashCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let (command, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (trimmed, ""),
    };
    let argument = (!rest.is_empty()).then(|| rest.to_string());

    let parsed = match command {
        "/help" => SlashCommand::Help,
        "/clear" => SlashCommand::Clear,
        "/quit" | "/exit" => SlashCommand::Quit,
        "/model" => argument.map_or(SlashCommand::Usage("/model <name>"), SlashCommand::Model),
        "/key" => argument.map_or(SlashCommand::Usage("/key <value>"), SlashCommand::Key),
        "/auto" => match rest {
            "on" => SlashCommand::AutoAccept(true),
            "off" => SlashCommand::AutoAccept(false),
            _ => SlashCommand::Usage("/auto on|off"),
        },
        "/file" => SlashCommand::File(argument),
        "/artifacts" => SlashCommand::Artifacts,
        "/show" => index_argument(rest).map_or(SlashCommand::Usage("/show <n>"), SlashCommand::Show),
        "/dismiss" => {
            index_argument(rest).map_or(SlashCommand::Usage("/dismiss <n>"), SlashCommand::Dismiss)
        }
        "/sessions" => SlashCommand::Sessions,
        "/resume" => argument.map_or(SlashCommand::Usage("/resume <id>"), SlashCommand::Resume),
        "/forget" => argument.map_or(SlashCommand::Usage("/forget <id>"), SlashCommand::Forget),
        "/status" => SlashCommand::Status,
        "/git" => SlashCommand::Git,
        "/connect" => SlashCommand::Connect,
        _ => SlashCommand::Unknown(command.to_string()),
    };

    Some(parsed)
}

fn index_argument(rest: &str) -> Option<usize> {
    rest.parse::<usize>().ok().filter(|index| *index > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_not_a_command() {
        assert_eq!(parse_slash_command("hello /help"), None);
        assert_eq!(parse_slash_command("   "), None);
    }

    #[test]
    fn bare_commands_parse() {
        assert_eq!(parse_slash_command("/help"), Some(SlashCommand::Help));
        assert_eq!(parse_slash_command("  /clear  "), Some(SlashCommand::Clear));
        assert_eq!(parse_slash_command("/exit"), Some(SlashCommand::Quit));
        assert_eq!(parse_slash_command("/git"), Some(SlashCommand::Git));
    }

    #[test]
    fn arguments_keep_inner_whitespace() {
        assert_eq!(
            parse_slash_command("/model  kimi k2 "),
            Some(SlashCommand::Model("kimi k2".to_string()))
        );
        assert_eq!(
            parse_slash_command("/file src/main.rs"),
            Some(SlashCommand::File(Some("src/main.rs".to_string())))
        );
        assert_eq!(parse_slash_command("/file"), Some(SlashCommand::File(None)));
    }

    #[test]
    fn missing_or_bad_arguments_report_usage() {
        assert_eq!(
            parse_slash_command("/model"),
            Some(SlashCommand::Usage("/model <name>"))
        );
        assert_eq!(
            parse_slash_command("/auto maybe"),
            Some(SlashCommand::Usage("/auto on|off"))
        );
        assert_eq!(
            parse_slash_command("/show 0"),
            Some(SlashCommand::Usage("/show <n>"))
        );
        assert_eq!(
            parse_slash_command("/dismiss two"),
            Some(SlashCommand::Usage("/dismiss <n>"))
        );
    }

    #[test]
    fn numeric_and_toggle_arguments() {
        assert_eq!(parse_slash_command("/show 2"), Some(SlashCommand::Show(2)));
        assert_eq!(parse_slash_command("/auto on"), Some(SlashCommand::AutoAccept(true)));
        assert_eq!(
            parse_slash_command("/resume abc-123"),
            Some(SlashCommand::Resume("abc-123".to_string()))
        );
    }

    #[test]
    fn unknown_commands_keep_their_name() {
        assert_eq!(
            parse_slash_command("/cancel now"),
            Some(SlashCommand::Unknown("/cancel".to_string()))
        );
    }
}
