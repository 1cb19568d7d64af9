// Command Domain Model
// argv-style command specifications and stdout redirect targets

use std::fmt;
use std::path::{Path, PathBuf};

use super::error::{DomainError, Result};

/// Ordered argv-style command.
///
/// Element 0 is the executable path, the remaining elements are its
/// arguments. Arguments are passed to the child verbatim: no quoting, no
/// expansion, no path search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
}

impl CommandSpec {
    /// Build a command from an executable path and its arguments
    ///
    /// # Errors
    /// - `DomainError::EmptyCommand` if `program` is empty
    /// - `DomainError::InteriorNul` if any element contains a NUL byte
    ///
    /// # Example
    /// ```
    /// use systemcalls_core::domain::CommandSpec;
    ///
    /// let cmd = CommandSpec::new("/bin/echo", &["hello", "world"]).unwrap();
    /// assert_eq!(cmd.argv().collect::<Vec<_>>(), ["/bin/echo", "hello", "world"]);
    /// ```
    pub fn new<S: AsRef<str>>(program: impl Into<String>, args: &[S]) -> Result<Self> {
        let program = program.into();
        if program.is_empty() {
            return Err(DomainError::EmptyCommand);
        }
        ensure_no_nul(&program)?;

        let args = args
            .iter()
            .map(|arg| {
                let arg = arg.as_ref();
                ensure_no_nul(arg)?;
                Ok(arg.to_string())
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { program, args })
    }

    /// Require the executable to be named by an absolute path
    ///
    /// Direct execution never searches `PATH`, so a relative name would
    /// silently resolve against the caller's working directory.
    pub fn require_absolute(self) -> Result<Self> {
        if Path::new(&self.program).is_absolute() {
            Ok(self)
        } else {
            Err(DomainError::RelativePath(self.program))
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Full argument vector; argv[0] is the executable path
    pub fn argv(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.program.as_str()).chain(self.args.iter().map(String::as_str))
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// File receiving a child's standard output.
///
/// Created if missing and truncated if present, once per invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTarget(PathBuf);

impl RedirectTarget {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(DomainError::EmptyRedirectTarget);
        }
        ensure_no_nul(&path.to_string_lossy())?;
        Ok(Self(path))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for RedirectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Where the child's fd 1 points when it starts running
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StdoutTarget {
    /// Share the caller's standard output
    #[default]
    Inherit,
    /// Replace standard output with a freshly truncated file
    File(RedirectTarget),
}

fn ensure_no_nul(s: &str) -> Result<()> {
    if s.contains('\0') {
        Err(DomainError::InteriorNul(s.replace('\0', "\\0")))
    } else {
        Ok(())
    }
}
