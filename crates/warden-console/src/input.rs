//! Console command parsing.

use warden_core::AdminAction;

/// A row of the current listing or a raw backend id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// 1-based row number as printed.
    Row(usize),
    Id(String),
}

impl Target {
    /// Plain numbers are row numbers; `id:` forces an id.
    fn parse(s: &str) -> Result<Self, String> {
        if let Some(id) = s.strip_prefix("id:") {
            return match id.trim() {
                "" => Err("Missing id".to_string()),
                id => Ok(Target::Id(id.to_string())),
            };
        }
        if s.chars().all(|c| c.is_ascii_digit()) {
            return match s.parse::<usize>() {
                Ok(0) | Err(_) => Err(format!("Invalid row number: {}", s)),
                Ok(n) => Ok(Target::Row(n)),
            };
        }
        Ok(Target::Id(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerCommand {
    Start,
    Stop,
    Status,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Users,
    Sessions,
    Attempts,
    Refresh,
    /// Filter the current listing; an empty query clears the filter.
    Find(String),
    Show(Target),
    Action(AdminAction, Target),
    Logout(Target),
    LogoutAll,
    ClearAllAttempts,
    CreateUser,
    Server(ServerCommand),
    WhoAmI,
    Help,
    Quit,
}

impl ConsoleCommand {
    /// Commands a standard (non-root) operator may run.
    pub fn allowed_for_standard(&self) -> bool {
        matches!(
            self,
            ConsoleCommand::Server(_) | ConsoleCommand::WhoAmI | ConsoleCommand::Help | ConsoleCommand::Quit
        )
    }
}

pub const HELP: &str = "\
Lists (root):
  users | sessions | attempts     fetch and show a list
  refresh                         fetch the current list again
  find <text>                     filter the current list (find alone clears)
  show <n|id>                     details of a row
User actions (root; <n> is a row of the users list, or a user id):
  freeze | unfreeze <n|id>
  promote-app-admin | demote-app-admin <n|id>
  promote-dev-admin | demote-dev-admin <n|id>
  grant-root-auth | revoke-root-auth <n|id>
  clear-attempts <n|id>
Sessions (root):
  logout <n|id>                   revoke a user's sessions
  logout-all                      revoke every session, including this one
  clear-all-attempts              clear every failed-attempt record
  create-user                     create an account
Server:
  server start | stop | status
Other:
  whoami | help | quit";

/// Parse one input line. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<ConsoleCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let word = word.to_lowercase();

    let no_args = |command: ConsoleCommand| {
        if rest.is_empty() {
            Ok(Some(command))
        } else {
            Err(format!("'{}' takes no arguments", word))
        }
    };
    let target = || {
        if rest.is_empty() {
            Err(format!("Usage: {} <n|id>", word))
        } else {
            Target::parse(rest)
        }
    };

    match word.as_str() {
        "users" => no_args(ConsoleCommand::Users),
        "sessions" => no_args(ConsoleCommand::Sessions),
        "attempts" => no_args(ConsoleCommand::Attempts),
        "refresh" => no_args(ConsoleCommand::Refresh),
        "find" | "/" => Ok(Some(ConsoleCommand::Find(rest.to_string()))),
        "show" => Ok(Some(ConsoleCommand::Show(target()?))),
        "logout" => Ok(Some(ConsoleCommand::Logout(target()?))),
        "logout-all" => no_args(ConsoleCommand::LogoutAll),
        "clear-all-attempts" => no_args(ConsoleCommand::ClearAllAttempts),
        "create-user" => no_args(ConsoleCommand::CreateUser),
        "server" => match rest.to_lowercase().as_str() {
            "start" => Ok(Some(ConsoleCommand::Server(ServerCommand::Start))),
            "stop" => Ok(Some(ConsoleCommand::Server(ServerCommand::Stop))),
            "status" | "" => Ok(Some(ConsoleCommand::Server(ServerCommand::Status))),
            other => Err(format!("Unknown server command: {}", other)),
        },
        "whoami" | "session" => no_args(ConsoleCommand::WhoAmI),
        "help" | "?" => no_args(ConsoleCommand::Help),
        "quit" | "exit" | "q" => no_args(ConsoleCommand::Quit),
        _ => match word.parse::<AdminAction>() {
            Ok(action) => Ok(Some(ConsoleCommand::Action(action, target()?))),
            Err(_) => Err(format!("Unknown command: {} (try 'help')", word)),
        },
    }
}
