use shell_escape::escape;
use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};

/// One process invocation: program path plus ordered arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Executable file name, used to recognise the process in the tree.
    pub fn program_name(&self) -> String {
        program_name(&self.program)
    }

    /// Value following `flag`, if present.
    pub fn value_of(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }
}

impl fmt::Display for CommandSpec {
    /// Shell-escaped command line, copy-pastable for debugging.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let program = self.program.to_string_lossy();
        write!(f, "{}", escape(Cow::Borrowed(program.as_ref())))?;
        for arg in &self.args {
            write!(f, " {}", escape(Cow::Borrowed(arg.as_str())))?;
        }
        Ok(())
    }
}

/// The two process invocations for one playback attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSpec {
    pub downloader: CommandSpec,
    pub renderer: CommandSpec,
}

pub fn program_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}
