//! Menu input handling

use std::io::Write;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tokio_util::sync::CancellationToken;

/// Menu entries, numbered as shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Register,
    Login,
    LedOn,
    LedOff,
    LedState,
    Dashboard,
    Logs,
    Logout,
    Exit,
}

/// Map a menu choice to an action
pub fn parse_choice(input: &str) -> Option<Action> {
    match input.trim() {
        "1" => Some(Action::Register),
        "2" => Some(Action::Login),
        "3" | "on" => Some(Action::LedOn),
        "4" | "off" => Some(Action::LedOff),
        "5" | "state" => Some(Action::LedState),
        "6" | "dashboard" => Some(Action::Dashboard),
        "7" | "logs" => Some(Action::Logs),
        "8" | "logout" => Some(Action::Logout),
        "9" | "q" | "exit" => Some(Action::Exit),
        _ => None,
    }
}

type Input = Box<dyn AsyncRead + Unpin + Send>;

/// Line reader that gives up as soon as `shutdown` fires
pub struct Prompt {
    lines: Lines<BufReader<Input>>,
    shutdown: CancellationToken,
}

impl Prompt {
    pub fn stdin(shutdown: CancellationToken) -> Self {
        Self::from_reader(tokio::io::stdin(), shutdown)
    }

    pub fn from_reader(reader: impl AsyncRead + Unpin + Send + 'static, shutdown: CancellationToken) -> Self {
        let reader: Input = Box::new(reader);
        Self {
            lines: BufReader::new(reader).lines(),
            shutdown,
        }
    }

    /// True once Ctrl-C was pressed
    pub fn interrupted(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Print `label` and read one line. `None` on end of input or shutdown.
    pub async fn ask(&mut self, label: &str) -> anyhow::Result<Option<String>> {
        print!("{}", label);
        std::io::stdout().flush()?;
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Ok(None),
            line = self.lines.next_line() => Ok(line?),
        }
    }

    /// Ask for a username and password; `None` if either is empty
    pub async fn credentials(&mut self, user_label: &str, pass_label: &str) -> anyhow::Result<Option<(String, String)>> {
        let Some(username) = self.ask(user_label).await? else {
            return Ok(None);
        };
        let Some(password) = self.ask(pass_label).await? else {
            return Ok(None);
        };
        Ok(non_empty_credentials(username, password))
    }

    /// Yes/no question, default no
    pub async fn confirm(&mut self, question: &str) -> anyhow::Result<bool> {
        let answer = self.ask(&format!("{} [y/N]: ", question)).await?;
        Ok(matches!(answer.as_deref().map(str::trim), Some("y" | "Y" | "yes")))
    }
}

fn non_empty_credentials(username: String, password: String) -> Option<(String, String)> {
    if username.is_empty() || password.is_empty() {
        None
    } else {
        Some((username, password))
    }
}
