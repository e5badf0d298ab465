use tracing::debug;

use crate::commands::executable::Executable;
use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

/// Any command name the server does not implement. It is answered with an error reply and the
/// connection stays open.
#[derive(Debug, PartialEq)]
pub struct Unknown {
    pub command_name: String,
}

impl Unknown {
    pub(crate) fn new(command_name: impl ToString) -> Unknown {
        Unknown {
            command_name: command_name.to_string(),
        }
    }
}

impl Executable for Unknown {
    fn exec(self, _store: &Store) -> Result<Frame, Error> {
        debug!(command = %self.command_name, "unknown command");

        // The name is echoed inside a simple error, which must stay on one line.
        let name = self.command_name.replace(['\r', '\n'], " ");

        Ok(Frame::Error(format!("ERR unknown command '{}'", name)))
    }
}
