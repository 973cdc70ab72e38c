//! Device-authorization state machine for the codex CLI.
//!
//! Owns the process-wide belief about the CLI's login state and drives the
//! interactive `codex login` flow to obtain a short-lived pairing code. All
//! mutation happens as whole-snapshot writes behind a lock; concurrent
//! `start()` calls race benignly (at most one redundant subprocess launch)
//! because each writer replaces the state with a complete, self-consistent
//! snapshot and the cooldown window throttles launches.

mod extract;

use std::sync::RwLock;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::codex::CodexCli;
use crate::error::CliError;
use crate::sanitize::truncate_for_display;

pub use extract::VERIFICATION_URL;

/// Login invocation variants, tried in order until one yields a usable
/// result.
const LOGIN_COMMAND_CANDIDATES: &[&[&str]] = &[&["login", "--device-auth"], &["login"]];

/// How much CLI output to carry into a failure message.
const FAILURE_OUTPUT_LIMIT: usize = 400;

/// Tunables for the device-auth flow.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// How long an issued pairing code stays valid
    pub code_ttl: Duration,
    /// Minimum interval between login subprocess launches
    pub min_retry: Duration,
    /// Cooldown applied when the CLI reports upstream rate limiting
    /// (overridable via `RELAY_AUTH_COOLDOWN_SECS`)
    pub rate_limit_cooldown: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        let rate_limit_secs = std::env::var("RELAY_AUTH_COOLDOWN_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        Self {
            code_ttl: Duration::from_secs(600),
            min_retry: Duration::from_secs(5),
            rate_limit_cooldown: Duration::from_secs(rate_limit_secs),
        }
    }
}

/// Full internal state record.
///
/// A pending code and a cooldown window are tracked independently; either
/// may be present regardless of the `authenticated` flag, and a pending code
/// self-invalidates once `code_expires_at` passes.
#[derive(Debug, Clone)]
struct AuthState {
    authenticated: bool,
    message: String,
    code: Option<String>,
    verification_url: String,
    code_expires_at: Option<Instant>,
    next_start_allowed_at: Option<Instant>,
}

impl Default for AuthState {
    fn default() -> Self {
        Self {
            authenticated: false,
            message: "Not authenticated.".to_string(),
            code: None,
            verification_url: VERIFICATION_URL.to_string(),
            code_expires_at: None,
            next_start_allowed_at: None,
        }
    }
}

impl AuthState {
    /// Drop a pending code whose expiry has passed.
    fn refresh_expiry(&mut self, now: Instant) {
        let expired = matches!(self.code_expires_at, Some(at) if now >= at);
        if self.code.is_some() && expired {
            self.code = None;
            self.code_expires_at = None;
            if !self.authenticated {
                self.message = "Not authenticated.".to_string();
            }
        }
    }

    /// Whole seconds until another login launch is allowed; zero when clear.
    /// Rounded up so a caller honoring the wait never retries early.
    fn retry_after(&self, now: Instant) -> u64 {
        match self.next_start_allowed_at {
            Some(at) if at > now => {
                let remaining = at - now;
                let secs = remaining.as_secs();
                if remaining.subsec_nanos() > 0 {
                    secs + 1
                } else {
                    secs.max(1)
                }
            }
            _ => 0,
        }
    }

    fn mark_authenticated(&mut self, message: &str) {
        self.authenticated = true;
        self.message = message.to_string();
        self.code = None;
        self.code_expires_at = None;
    }
}

/// Read-only snapshot returned by [`DeviceAuth::status`].
#[derive(Debug, Clone, Serialize)]
pub struct AuthSnapshot {
    pub authenticated: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub verification_url: String,
}

/// Result of a [`DeviceAuth::start`] call.
#[derive(Debug, Clone, Serialize)]
pub struct StartOutcome {
    pub authenticated: bool,
    pub code: Option<String>,
    pub verification_url: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<u64>,
}

/// Outcome of one pass over the login command candidates.
enum LoginAttempt {
    NotInstalled,
    AlreadyConnected,
    Code { code: String, url: String },
    RateLimited { output: String },
    TimedOut,
    Failed { output: Option<String> },
}

/// The device-auth state machine.
pub struct DeviceAuth {
    state: RwLock<AuthState>,
    cli: CodexCli,
    config: AuthConfig,
}

impl DeviceAuth {
    pub fn new(cli: CodexCli, config: AuthConfig) -> Self {
        Self {
            state: RwLock::new(AuthState::default()),
            cli,
            config,
        }
    }

    /// The CLI handle this machine drives.
    pub fn cli(&self) -> &CodexCli {
        &self.cli
    }

    /// Read-only state query.
    ///
    /// Refreshes code expiry, then reconciles against the CLI's live session:
    /// a login performed out-of-band (for example in a terminal) flips the
    /// state to authenticated here.
    pub async fn status(&self) -> AuthSnapshot {
        let authenticated = {
            let mut state = self.state.write().unwrap();
            state.refresh_expiry(Instant::now());
            state.authenticated
        };

        if !authenticated && self.cli.is_logged_in().await {
            tracing::debug!("live codex session detected, reconciling state");
            self.state.write().unwrap().mark_authenticated("Connected");
        }

        let state = self.state.read().unwrap();
        AuthSnapshot {
            authenticated: state.authenticated,
            message: state.message.clone(),
            code: state.code.clone(),
            verification_url: state.verification_url.clone(),
        }
    }

    /// Begin or resume the device-pairing flow. Idempotent: under cooldown
    /// it reports the remaining wait without side effects, and an already
    /// authenticated state short-circuits without spawning anything.
    pub async fn start(&self) -> StartOutcome {
        {
            let now = Instant::now();
            let mut state = self.state.write().unwrap();
            state.refresh_expiry(now);

            let retry_after = state.retry_after(now);
            if retry_after > 0 {
                return StartOutcome {
                    authenticated: state.authenticated,
                    code: state.code.clone(),
                    verification_url: state.verification_url.clone(),
                    message: format!("Rate limited. Retry in {retry_after}s."),
                    retry_after_seconds: Some(retry_after),
                };
            }

            if state.authenticated {
                return StartOutcome {
                    authenticated: true,
                    code: None,
                    verification_url: state.verification_url.clone(),
                    message: "Already connected.".to_string(),
                    retry_after_seconds: None,
                };
            }
        }

        // The subprocess runs outside the lock; the cooldown written below
        // bounds how often concurrent callers can reach this point.
        let attempt = self.run_login_flow().await;
        self.apply_attempt(attempt)
    }

    /// Best-effort CLI logout, then an unconditional local reset. The
    /// authoritative signal stays whatever `status()` later observes from
    /// the CLI's live session.
    pub async fn disconnect(&self) -> AuthSnapshot {
        self.cli.logout().await;

        let mut state = self.state.write().unwrap();
        *state = AuthState {
            message: "Disconnected".to_string(),
            ..AuthState::default()
        };
        AuthSnapshot {
            authenticated: false,
            message: state.message.clone(),
            code: None,
            verification_url: state.verification_url.clone(),
        }
    }

    async fn run_login_flow(&self) -> LoginAttempt {
        if self.cli.resolve_binary().is_none() {
            return LoginAttempt::NotInstalled;
        }
        if self.cli.is_logged_in().await {
            return LoginAttempt::AlreadyConnected;
        }

        let login_timeout = self.cli.config().login_timeout;
        let mut last_output = String::new();

        for args in LOGIN_COMMAND_CANDIDATES {
            let capture = match self.cli.run(args, login_timeout).await {
                Ok(capture) => capture,
                Err(CliError::NotInstalled) => return LoginAttempt::NotInstalled,
                Err(e) => {
                    tracing::warn!(?args, "codex login invocation failed: {e}");
                    continue;
                }
            };

            let text = capture.combined_text();
            if !text.is_empty() {
                last_output = text.clone();
            }

            // Mine even partial (timed-out) output before deciding anything.
            if let Some(code) = extract::extract_device_code(&text) {
                let url = extract::extract_verification_url(&text)
                    .unwrap_or(VERIFICATION_URL)
                    .to_string();
                return LoginAttempt::Code { code, url };
            }

            if is_rate_limited(&text) {
                return LoginAttempt::RateLimited { output: text };
            }

            // The CLI sometimes completes the login without printing a code.
            if self.cli.is_logged_in().await {
                return LoginAttempt::AlreadyConnected;
            }

            if capture.timed_out {
                return LoginAttempt::TimedOut;
            }
        }

        LoginAttempt::Failed {
            output: (!last_output.is_empty()).then_some(last_output),
        }
    }

    /// Write the post-attempt snapshot and shape the caller-facing outcome.
    fn apply_attempt(&self, attempt: LoginAttempt) -> StartOutcome {
        let now = Instant::now();
        let mut state = self.state.write().unwrap();

        // Throttle the expensive interactive login; a missing binary is the
        // one case where retrying sooner cannot possibly help more.
        if !matches!(attempt, LoginAttempt::NotInstalled) {
            state.next_start_allowed_at = Some(now + self.config.min_retry);
        }

        match attempt {
            LoginAttempt::NotInstalled => {
                state.authenticated = false;
                state.code = None;
                state.code_expires_at = None;
                state.message =
                    "Codex CLI is not installed on this host. Install the Codex CLI first."
                        .to_string();
                self.outcome_from(&state, None)
            }
            LoginAttempt::AlreadyConnected => {
                state.mark_authenticated("Connected");
                StartOutcome {
                    authenticated: true,
                    code: None,
                    verification_url: state.verification_url.clone(),
                    message: "Already connected.".to_string(),
                    retry_after_seconds: None,
                }
            }
            LoginAttempt::Code { code, url } => {
                state.authenticated = false;
                state.code = Some(code.clone());
                state.code_expires_at = Some(now + self.config.code_ttl);
                state.verification_url = url.clone();
                state.message = "Awaiting device verification.".to_string();
                StartOutcome {
                    authenticated: false,
                    code: Some(code),
                    verification_url: url,
                    message: "Open the verification URL and enter the code.".to_string(),
                    retry_after_seconds: None,
                }
            }
            LoginAttempt::RateLimited { output } => {
                let secs = self.config.rate_limit_cooldown.as_secs().max(1);
                state.code = None;
                state.code_expires_at = None;
                state.next_start_allowed_at = Some(now + self.config.rate_limit_cooldown);
                state.message = format!("Codex sign-in is rate limited upstream. Retry in {secs}s.");
                tracing::warn!(
                    output = %truncate_for_display(&output, FAILURE_OUTPUT_LIMIT),
                    "codex login rate limited"
                );
                self.outcome_from(&state, Some(secs))
            }
            LoginAttempt::TimedOut => {
                state.code = None;
                state.code_expires_at = None;
                state.message = "Timed out while starting codex device auth. Try again.".to_string();
                self.outcome_from(&state, None)
            }
            LoginAttempt::Failed { output } => {
                state.code = None;
                state.code_expires_at = None;
                state.message = match output {
                    Some(output) => format!(
                        "Codex CLI did not return a device code. Output: {}",
                        truncate_for_display(&output, FAILURE_OUTPUT_LIMIT)
                    ),
                    None => "Codex CLI did not return a device code.".to_string(),
                };
                self.outcome_from(&state, None)
            }
        }
    }

    fn outcome_from(&self, state: &AuthState, retry_after_seconds: Option<u64>) -> StartOutcome {
        StartOutcome {
            authenticated: state.authenticated,
            code: state.code.clone(),
            verification_url: state.verification_url.clone(),
            message: state.message.clone(),
            retry_after_seconds,
        }
    }

    #[cfg(test)]
    fn seed_state(&self, state: AuthState) {
        *self.state.write().unwrap() = state;
    }
}

impl Default for DeviceAuth {
    fn default() -> Self {
        Self::new(CodexCli::default(), AuthConfig::default())
    }
}

/// Upstream rate-limit signatures in CLI output.
fn is_rate_limited(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("rate limit") || lower.contains("too many requests") || lower.contains("429")
}
