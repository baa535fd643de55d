//! Terminal detection: progress bars and cliclack only on an interactive TTY

use std::io::IsTerminal;

/// Environment variables set by common CI providers
const CI_MARKERS: &[&str] = &[
    "CI",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "CIRCLECI",
    "BUILDKITE",
    "JENKINS_URL",
    "HYDRA_SERVER",
    "TF_BUILD",
];

/// How output should be rendered for this process
#[derive(Debug, Clone, Copy)]
pub struct UiContext {
    interactive: bool,
}

impl UiContext {
    /// Inspect stdout, stderr and the environment
    pub fn detect() -> Self {
        let terminal = std::io::stdout().is_terminal() && std::io::stderr().is_terminal();
        Self {
            interactive: terminal && !running_in_ci(),
        }
    }

    /// Plain line-oriented output (tests, pipes, CI)
    pub fn non_interactive() -> Self {
        Self { interactive: false }
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// Whether to draw spinners and progress bars
    pub fn use_fancy_output(&self) -> bool {
        self.interactive
    }
}

fn running_in_ci() -> bool {
    CI_MARKERS.iter().any(|var| std::env::var_os(var).is_some())
}
