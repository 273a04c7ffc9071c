//! Ctrl-C handling for the interactive shell.
//!
//! SIGINT never kills the process while the shell runs. It only sets the session's
//! [`CancellationToken`]: a running line sees the flag between pipeline stages, and the REPL
//! checks it when the next line comes in.

use std::thread;

use anyhow::{Context, Result};
use tokio::runtime::Runtime;
use tracing::debug;

use crate::shell::CancellationToken;

/// Forward every SIGINT to `token` for the rest of the process lifetime
#[cfg(unix)]
pub fn forward_interrupts(token: CancellationToken) -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let runtime = signal_runtime()?;
    // Registered before the thread starts
    let mut interrupts = {
        let _guard = runtime.enter();
        signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?
    };
    spawn_listener(runtime, async move {
        while interrupts.recv().await.is_some() {
            debug!("interrupt received");
            token.cancel();
        }
    })
}

#[cfg(not(unix))]
pub fn forward_interrupts(token: CancellationToken) -> Result<()> {
    let runtime = signal_runtime()?;
    spawn_listener(runtime, async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            debug!("interrupt received");
            token.cancel();
        }
    })
}

fn signal_runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start signal runtime")
}

fn spawn_listener(
    runtime: Runtime,
    listener: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    thread::Builder::new()
        .name("chatfs-signals".to_string())
        .spawn(move || runtime.block_on(listener))
        .context("Failed to spawn signal thread")?;
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    #[test]
    fn test_sigint_sets_token() {
        let token = CancellationToken::new();
        forward_interrupts(token.clone()).unwrap();

        // SAFETY: SIGINT is handled by the listener installed above
        unsafe {
            libc::raise(libc::SIGINT);
        }

        let deadline = Instant::now() + Duration::from_secs(5);
        while !token.is_cancelled() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        assert!(token.is_cancelled());
    }
}
