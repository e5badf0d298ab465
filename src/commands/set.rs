use tracing::debug;

use crate::commands::executable::Executable;
use crate::commands::{CommandName, CommandParser, CommandParserError};
use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

/// Set `key` to hold the string `value`, overwriting any previous value.
///
/// Ref: <https://redis.io/docs/latest/commands/set/>
#[derive(Debug, PartialEq)]
pub struct Set {
    pub key: String,
    pub value: String,
}

impl Executable for Set {
    fn exec(self, store: &Store) -> Result<Frame, Error> {
        debug!(key = %self.key, value = %self.value, "setting key");

        store.set(self.key, self.value);

        Ok(Frame::Simple("OK".to_string()))
    }
}

impl TryFrom<&mut CommandParser> for Set {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string(CommandName::Set)?;
        let value = parser.next_string(CommandName::Set)?;

        Ok(Self { key, value })
    }
}
