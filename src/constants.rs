// src/constants.rs

/// Default number of lines kept by the history store (`-s`).
pub const DEFAULT_MAX_HISTORY: usize = 10;

/// Default capacity of the job table (`-j`).
pub const DEFAULT_MAX_JOBS: usize = 16;

/// Default maximum number of characters accepted on one input line (`-l`).
pub const DEFAULT_MAX_LINE: usize = 1024;

/// Prompt printed before each line is read.
pub const DEFAULT_PROMPT: &str = "msh> ";

/// The name of the history file, created in the user's home directory.
pub const HISTORY_FILENAME: &str = ".msh_history";

/// The name of the directory holding msh configuration (inside the system config dir).
pub const CONFIG_DIR_NAME: &str = "msh";

/// The name of the optional configuration file (inside the msh config dir).
pub const CONFIG_FILENAME: &str = "config.toml";

/// Environment variable overriding the configuration file location.
pub const CONFIG_ENV_VAR: &str = "MSH_CONFIG";

/// The line that ends the interactive session.
pub const EXIT_COMMAND: &str = "exit";

/// One-line usage message for startup flag errors.
pub const USAGE: &str = "usage: msh [-s NUMBER] [-j NUMBER] [-l NUMBER]";

/// Exit status of a child whose program was not found on the search path.
pub const EXIT_NOT_FOUND: i32 = 127;

/// Exit status of a child whose program was found but could not be executed.
pub const EXIT_EXEC_FAILED: i32 = 126;

/// Capacity of the status-change queue filled from the `SIGCHLD` handler.
pub const STATUS_QUEUE_CAPACITY: usize = 64;
