//! The command shell over the virtual filesystem.
//!
//! A line goes through [`parser`] (command or chat text, variables, pipeline split), then
//! [`dispatcher`] (one handler per stage, stdout piped forward), with the session state in
//! [`context::ShellContext`] and the Shell/Chat switch in [`mode`]. [`ShellSession`] ties them
//! together for a host.

pub mod commands;
pub mod context;
pub mod dispatcher;
pub mod mode;
pub mod parser;
pub mod session;
pub mod variables;

pub use commands::default_registry;
pub use context::{PendingAction, ShellContext};
pub use dispatcher::{
    CancellationToken, CommandHandler, CommandRegistry, CommandResult, CommandStatus, HelpEntry,
};
pub use mode::{ChatContext, Mode, ModeMachine};
pub use parser::{CommandInvocation, ParsedInput, parse};
pub use session::{LineResponse, ShellSession};
pub use variables::Variables;
