//! Interrupt wiring: SIGINT/SIGTERM flip a cancellation token.

use crate::cancel::CancelToken;

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        use std::sync::OnceLock;

        use anyhow::{Context, Result, anyhow};
        use nix::sys::signal::{self, Signal};

        // Signal handlers may only touch this static; the token inside
        // is an atomic flip.
        static INTERRUPT_TOKEN: OnceLock<CancelToken> = OnceLock::new();

        extern "C" fn handler(_sig: i32) {
            if let Some(token) = INTERRUPT_TOKEN.get() {
                token.cancel();
            }
        }

        /// Cancel `token` when the process receives SIGINT or SIGTERM.
        /// May be installed once per process.
        pub fn cancel_on_interrupt(token: &CancelToken) -> Result<()> {
            INTERRUPT_TOKEN
                .set(token.clone())
                .map_err(|_| anyhow!("interrupt handler already installed"))?;

            let action = signal::SigAction::new(
                signal::SigHandler::Handler(handler),
                signal::SaFlags::empty(),
                signal::SigSet::empty(),
            );

            unsafe {
                signal::sigaction(Signal::SIGINT, &action)
                    .context("failed to register SIGINT handler")?;
                signal::sigaction(Signal::SIGTERM, &action)
                    .context("failed to register SIGTERM handler")?;
            }

            Ok(())
        }
    } else {
        use anyhow::Result;

        /// No interrupt wiring off unix; Ctrl-C falls through to the
        /// default console behavior.
        pub fn cancel_on_interrupt(_token: &CancelToken) -> Result<()> {
            Ok(())
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn second_install_is_rejected() {
        let token = CancelToken::new();
        // First install may race other tests only if they also wire
        // signals; this crate installs exactly once outside tests.
        let first = cancel_on_interrupt(&token);
        let second = cancel_on_interrupt(&token);
        assert!(first.is_ok());
        assert!(second.is_err());
    }
}
