// Execution constants (no magic values)

/// Exit status of a forked child whose exec or redirect setup failed.
/// Same value shells use for "command not found".
pub const DEFAULT_EXEC_FAILURE_EXIT_CODE: i32 = 127;

/// Permission bits for newly created redirect targets (rw-r--r--)
pub const DEFAULT_REDIRECT_FILE_MODE: u32 = 0o644;

/// Default command interpreter on Unix
pub const UNIX_SHELL: &str = "/bin/sh";

/// Flag telling the Unix interpreter to run the next argument as a script
pub const UNIX_SHELL_FLAG: &str = "-c";

/// Default command interpreter on Windows
pub const WINDOWS_SHELL: &str = "cmd.exe";

/// Flag telling `cmd.exe` to run the next argument and exit
pub const WINDOWS_SHELL_FLAG: &str = "/C";

/// Script used to probe whether the interpreter can be launched at all
pub const SHELL_PROBE_SCRIPT: &str = "exit 0";
