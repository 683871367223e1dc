//! Running the external utilities the enumerators depend on.

use crate::error::{Error, Result};
use std::process::Command;

/// Runs an external program and hands back what it printed.
///
/// Enumerators are generic over this so that they can be driven by canned
/// output instead of the real utilities.
pub trait CommandRunner {
    /// Runs `program` with `args` (no shell involved) and waits for it.
    ///
    /// A non-zero exit status is an error.
    fn run(&self, program: &str, args: &[&str]) -> Result<Vec<u8>>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, program: &str, args: &[&str]) -> Result<Vec<u8>> {
        (**self).run(program, args)
    }
}

/// Renders a command line for messages, e.g. `diskutil info -plist disk0`.
pub fn command_line(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs the real programs on this machine.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<Vec<u8>> {
        let command = command_line(program, args);
        log::debug!("running `{command}`");

        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|source| Error::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            let mut combined = output.stdout;
            combined.extend_from_slice(&output.stderr);
            return Err(Error::CommandFailed {
                command,
                status: output.status.to_string(),
                output: String::from_utf8_lossy(&combined).trim().to_string(),
            });
        }

        Ok(output.stdout)
    }
}

/// Checks that every tool in `tools` can be found in `PATH`.
pub fn require_tools(tools: &[&str]) -> Result<()> {
    for tool in tools {
        if which::which(tool).is_err() {
            return Err(Error::MissingTool(tool.to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Replies to known command lines with canned output; anything else
    /// fails the way a missing disk would.
    #[derive(Default)]
    pub(crate) struct ScriptedRunner {
        replies: HashMap<String, std::result::Result<Vec<u8>, String>>,
        pub(crate) calls: RefCell<Vec<String>>,
    }

    impl ScriptedRunner {
        pub(crate) fn reply(mut self, command: &str, output: impl Into<Vec<u8>>) -> Self {
            self.replies.insert(command.to_string(), Ok(output.into()));
            self
        }

        pub(crate) fn fail(mut self, command: &str, output: &str) -> Self {
            self.replies
                .insert(command.to_string(), Err(output.to_string()));
            self
        }
    }

    impl CommandRunner for ScriptedRunner {
        fn run(&self, program: &str, args: &[&str]) -> Result<Vec<u8>> {
            let command = command_line(program, args);
            self.calls.borrow_mut().push(command.clone());
            match self.replies.get(&command) {
                Some(Ok(output)) => Ok(output.clone()),
                Some(Err(output)) => Err(Error::CommandFailed {
                    command,
                    status: "exit status: 1".to_string(),
                    output: output.clone(),
                }),
                None => Err(Error::CommandFailed {
                    command,
                    status: "exit status: 1".to_string(),
                    output: "Could not find disk".to_string(),
                }),
            }
        }
    }
}
