//! # System Interaction Layer
//!
//! Everything that talks to the kernel about child processes lives here.
//!
//! ## Modules
//!
//! - **`signals`**: The signal coordinator. Installs the `SIGCHLD`, `SIGINT` and
//!   `SIGTSTP` handlers, queues child status changes collected in handler
//!   context and applies them to the job table on the control thread. Also
//!   owns the blocking waits (foreground job, shutdown).
//! - **`launcher`**: Forks and execs external jobs, each as the leader of a new
//!   process group, and records them in the job table before any of their
//!   status changes can be observed.

pub mod launcher;
pub mod signals;
