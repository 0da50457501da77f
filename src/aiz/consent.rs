// SPDX-License-Identifier: MIT

//! Operator confirmation before irreversible actions

/// Asks a human operator to approve a proposed action.
///
/// `ask` blocks the calling thread until an answer arrives. Do not call it
/// on an async worker thread; async callers go through
/// `tokio::task::spawn_blocking`.
pub trait ConsentProvider: Send + Sync {
    /// `true` only on explicit approval; no answer counts as a decline
    fn ask(&self, proposed_action: &str, default: bool) -> bool;
}

/// Interactive terminal prompt
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalConsent;

impl ConsentProvider for TerminalConsent {
    fn ask(&self, proposed_action: &str, default: bool) -> bool {
        let prompt = format!("Proposed command:\n{}\nDo you want to execute this command?", proposed_action);
        match cliclack::confirm(prompt).initial_value(default).interact() {
            Ok(answer) => answer,
            Err(e) => {
                log::warn!("No answer from operator ({}); declining", e);
                false
            }
        }
    }
}

/// Fixed answer, for `--yes` and tests
#[derive(Debug, Clone, Copy)]
pub struct StaticConsent(pub bool);

impl ConsentProvider for StaticConsent {
    fn ask(&self, proposed_action: &str, _default: bool) -> bool {
        log::info!(
            "{} without prompting: {}",
            if self.0 { "Approved" } else { "Declined" },
            proposed_action
        );
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_consent_ignores_default() {
        assert!(StaticConsent(true).ask("$ ls", false));
        assert!(!StaticConsent(false).ask("$ ls", true));
    }
}
