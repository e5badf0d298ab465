pub mod executable;
pub mod get;
pub mod ping;
pub mod set;
pub mod unknown;

use std::vec;
use strum_macros::{Display, EnumString};
use thiserror::Error as ThisError;
use tracing::debug;

use crate::commands::executable::Executable;
use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

use get::Get;
use ping::Ping;
use set::Set;
use unknown::Unknown;

#[derive(Debug, PartialEq)]
pub enum Command {
    Get(Get),
    Ping(Ping),
    Set(Set),
    Unknown(Unknown),
}

/// Names of the commands the server knows about, in the upper case the parser normalizes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum CommandName {
    Get,
    Ping,
    Set,
}

impl Executable for Command {
    fn exec(self, store: &Store) -> Result<Frame, Error> {
        match self {
            Command::Get(cmd) => cmd.exec(store),
            Command::Ping(cmd) => cmd.exec(store),
            Command::Set(cmd) => cmd.exec(store),
            Command::Unknown(cmd) => cmd.exec(store),
        }
    }
}

impl TryFrom<Vec<String>> for Command {
    type Error = CommandParserError;

    fn try_from(parts: Vec<String>) -> Result<Self, Self::Error> {
        let parser = &mut CommandParser {
            parts: parts.into_iter(),
        };

        let command_name = parser.parse_command_name()?;

        match command_name.parse::<CommandName>() {
            Ok(CommandName::Get) => Get::try_from(parser).map(Command::Get),
            Ok(CommandName::Ping) => Ping::try_from(parser).map(Command::Ping),
            Ok(CommandName::Set) => Set::try_from(parser).map(Command::Set),
            Err(_) => Ok(Command::Unknown(Unknown::new(command_name))),
        }
    }
}

/// Turns a decoded request into the reply to send back.
///
/// Parse errors that the client should see are answered with an error reply. The rest are
/// returned, and nothing is written for the request.
pub fn dispatch(parts: Vec<String>, store: &Store) -> Result<Frame, Error> {
    match Command::try_from(parts) {
        Ok(cmd) => {
            debug!(?cmd, "executing command");
            cmd.exec(store)
        }
        Err(err) => err.reply().ok_or_else(|| err.into()),
    }
}

pub(crate) struct CommandParser {
    parts: vec::IntoIter<String>,
}

impl CommandParser {
    fn parse_command_name(&mut self) -> Result<String, CommandParserError> {
        self.parts
            .next()
            .map(|name| name.to_ascii_uppercase())
            .ok_or(CommandParserError::EmptyCommand)
    }

    /// Next positional argument of `command`, used verbatim.
    fn next_string(&mut self, command: CommandName) -> Result<String, CommandParserError> {
        self.parts
            .next()
            .ok_or(CommandParserError::WrongArity { command })
    }

    fn next_optional_string(&mut self) -> Option<String> {
        self.parts.next()
    }
}

#[derive(Debug, ThisError, PartialEq)]
pub enum CommandParserError {
    #[error("protocol error; empty command array")]
    EmptyCommand,
    #[error("wrong number of arguments for '{command}' command")]
    WrongArity { command: CommandName },
}

impl CommandParserError {
    /// The reply written to the client for this error, if it is client visible at all.
    ///
    /// A GET without a key is answered; a SET without a key or value and an empty array are not.
    pub fn reply(&self) -> Option<Frame> {
        match self {
            CommandParserError::WrongArity {
                command: CommandName::Get,
            } => Some(Frame::Error(format!(
                "ERR wrong number of arguments for '{}' command",
                CommandName::Get.to_string().to_lowercase()
            ))),
            CommandParserError::WrongArity { .. } | CommandParserError::EmptyCommand => None,
        }
    }
}
