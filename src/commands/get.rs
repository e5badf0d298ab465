use tracing::debug;

use crate::commands::executable::Executable;
use crate::commands::{CommandName, CommandParser, CommandParserError};
use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

/// Get the value of `key`. If the key does not exist the null bulk string is returned.
///
/// Ref: <https://redis.io/docs/latest/commands/get/>
#[derive(Debug, PartialEq)]
pub struct Get {
    pub key: String,
}

impl Executable for Get {
    fn exec(self, store: &Store) -> Result<Frame, Error> {
        match store.get(&self.key) {
            Some(value) => Ok(Frame::Bulk(value)),
            None => {
                debug!(key = %self.key, "key not found");
                Ok(Frame::Null)
            }
        }
    }
}

impl TryFrom<&mut CommandParser> for Get {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string(CommandName::Get)?;
        Ok(Self { key })
    }
}
