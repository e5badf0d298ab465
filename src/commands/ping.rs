use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

/// Returns PONG if no argument is provided, otherwise return a copy of the argument as a bulk.
///
/// Ref: <https://redis.io/docs/latest/commands/ping>
#[derive(Debug, PartialEq)]
pub struct Ping {
    pub payload: Option<String>,
}

impl Executable for Ping {
    fn exec(self, _store: &Store) -> Result<Frame, Error> {
        let res = self
            .payload
            .map_or(Frame::Simple("PONG".to_string()), Frame::Bulk);

        Ok(res)
    }
}

impl TryFrom<&mut CommandParser> for Ping {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let payload = parser.next_optional_string();

        Ok(Self { payload })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Command;

    #[test]
    fn without_argument() {
        let cmd = Command::try_from(vec!["PING".to_string()]).unwrap();

        let result = cmd.exec(&Store::new()).unwrap();

        assert_eq!(result.serialize(), b"+PONG\r\n");
    }

    #[test]
    fn with_argument() {
        let cmd = Command::try_from(vec!["PING".to_string(), "hello".to_string()]).unwrap();

        let result = cmd.exec(&Store::new()).unwrap();

        assert_eq!(result.serialize(), b"$5\r\nhello\r\n");
    }
}
