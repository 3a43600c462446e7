//! Client view controller.
//!
//! Drives the guestbook screens: home, the two password prompts, the write
//! form and the entry list. The controller talks to the server through the
//! [`GuestbookApi`] port and to the signature widget through
//! [`SignaturePadFactory`], so it runs headless in tests.
//!
//! Every API call goes through [`ClientRetry`]: a per-attempt timeout and a
//! small number of attempts with linear backoff. Only transport failures
//! and timeouts are retried; a definitive answer from the server is not.

use std::future::Future;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use tracing::warn;
use zeroize::Zeroizing;

use crate::entry::{Entry, NewEntry};
use crate::gate::AccessKind;
use crate::view::{View, render_entries};

/// Errors returned by a [`GuestbookApi`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response.
    #[error("request failed: {0}")]
    Transport(String),

    /// The request exceeded the client timeout.
    #[error("request timed out")]
    Timeout,

    /// The server answered with an error status.
    #[error("server rejected request with status {status}: {message}")]
    Rejected { status: u16, message: String },
}

impl ApiError {
    /// Whether repeating the request could succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout)
    }
}

/// The three server operations the client uses.
#[async_trait::async_trait]
pub trait GuestbookApi: Send + Sync {
    /// `POST /api/verify-password`; returns `isCorrect`.
    async fn verify_password(&self, password: &str, kind: AccessKind) -> Result<bool, ApiError>;

    /// `POST /api/entries`.
    async fn create_entry(&self, password: &str, entry: &NewEntry) -> Result<(), ApiError>;

    /// `GET /api/entries?password=...`.
    async fn list_entries(&self, password: &str) -> Result<Vec<Entry>, ApiError>;
}

/// A signature drawing surface.
pub trait SignaturePad: Send {
    /// Whether nothing has been drawn.
    fn is_empty(&self) -> bool;
    /// The drawing as an image data URI.
    fn to_data_url(&self) -> String;
    /// Erase the drawing.
    fn clear(&mut self);
}

/// Provides signature pads on demand.
pub trait SignaturePadFactory: Send {
    type Pad: SignaturePad;

    /// Create a pad.
    ///
    /// # Errors
    ///
    /// Returns a description of the failure when no surface is available.
    fn acquire(&mut self) -> Result<Self::Pad, String>;
}

/// Timeout and retry settings for client API calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientRetry {
    /// Limit for a single attempt.
    pub timeout: Duration,
    /// Total attempts, including the first.
    pub attempts: u32,
    /// Backoff unit; the wait after attempt `n` is `n * step`.
    pub step: Duration,
}

impl Default for ClientRetry {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            attempts: 3,
            step: Duration::from_secs(1),
        }
    }
}

impl ClientRetry {
    /// Run `op` until it succeeds, fails definitively, or attempts run out.
    ///
    /// # Errors
    ///
    /// Returns the last error observed.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let attempts = self.attempts.max(1);
        let mut last = ApiError::Timeout;

        for attempt in 1..=attempts {
            match tokio::time::timeout(self.timeout, op()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) if !e.is_retryable() => return Err(e),
                Ok(Err(e)) => last = e,
                Err(_) => last = ApiError::Timeout,
            }

            if attempt < attempts {
                warn!(attempt, error = %last, "api call failed, retrying");
                tokio::time::sleep(self.step.saturating_mul(attempt)).await;
            }
        }

        Err(last)
    }
}

/// A message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Error(String),
    Info(String),
}

/// Headless guestbook client.
pub struct Controller<A, F: SignaturePadFactory> {
    api: A,
    pads: F,
    pad: Option<F::Pad>,
    view: View,
    write_password: Option<Zeroizing<String>>,
    entries: Vec<Entry>,
    rendered: Option<String>,
    notice: Option<Notice>,
    retry: ClientRetry,
}

impl<A: GuestbookApi, F: SignaturePadFactory> Controller<A, F> {
    /// Start on the home view.
    pub fn new(api: A, pads: F) -> Self {
        Self {
            api,
            pads,
            pad: None,
            view: View::Home,
            write_password: None,
            entries: Vec::new(),
            rendered: None,
            notice: None,
            retry: ClientRetry::default(),
        }
    }

    /// Replace the retry settings.
    #[must_use]
    pub fn with_retry(mut self, retry: ClientRetry) -> Self {
        self.retry = retry;
        self
    }

    pub const fn view(&self) -> View {
        self.view
    }

    pub const fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Markup of the last loaded entry list.
    pub fn rendered_entries(&self) -> Option<&str> {
        self.rendered.as_deref()
    }

    /// The signature pad, once acquired.
    pub fn pad_mut(&mut self) -> Option<&mut F::Pad> {
        self.pad.as_mut()
    }

    fn error(&mut self, message: &str) {
        self.notice = Some(Notice::Error(message.to_owned()));
    }

    pub fn open_write_prompt(&mut self) {
        self.notice = None;
        self.view = View::WritePasswordPrompt;
    }

    pub fn open_read_prompt(&mut self) {
        self.notice = None;
        self.view = View::ReadPasswordPrompt;
    }

    /// Return home and forget any unlocked state.
    pub fn go_home(&mut self) {
        self.view = View::Home;
        self.write_password = None;
        self.entries.clear();
        self.rendered = None;
    }

    /// Submit the password typed into the current prompt.
    ///
    /// Does nothing outside a prompt view.
    pub async fn submit_password(&mut self, input: &str) {
        let Some(kind) = self.view.prompt_kind() else {
            return;
        };

        let password = input.trim();
        if password.is_empty() {
            self.error("Please enter a password");
            return;
        }

        let api = &self.api;
        let verified = self
            .retry
            .run(|| api.verify_password(password, kind))
            .await;

        match verified {
            Ok(true) => {
                self.notice = None;
                match kind {
                    AccessKind::Write => {
                        self.write_password = Some(Zeroizing::new(password.to_owned()));
                        self.enter_write();
                    }
                    AccessKind::Read => {
                        self.view = View::unlocked_by(kind);
                        self.load_entries(password).await;
                    }
                }
            }
            Ok(false) | Err(ApiError::Rejected { .. }) => self.error("Invalid password"),
            Err(e) => {
                warn!(error = %e, "password verification failed");
                self.error("Failed to verify password");
            }
        }
    }

    /// Show the write form, creating the signature pad on first use.
    fn enter_write(&mut self) {
        if self.pad.is_none() {
            match self.pads.acquire() {
                Ok(pad) => self.pad = Some(pad),
                Err(e) => {
                    warn!(error = %e, "signature pad unavailable");
                    self.error("Failed to initialize signature pad");
                }
            }
        }
        self.view = View::Write;
    }

    /// Erase the signature if anything is drawn.
    pub fn clear_signature(&mut self) {
        if let Some(pad) = self.pad.as_mut().filter(|p| !p.is_empty()) {
            pad.clear();
        }
    }

    /// Submit the write form.
    ///
    /// Does nothing outside the write view.
    pub async fn submit_entry(&mut self, name: &str, message: &str) {
        if self.view != View::Write {
            return;
        }

        let (name, message) = (name.trim(), message.trim());
        let signature = self
            .pad
            .as_ref()
            .filter(|p| !p.is_empty())
            .map(SignaturePad::to_data_url);

        let (Some(signature), Some(password)) = (signature, self.write_password.clone()) else {
            self.error("Please fill all fields and sign");
            return;
        };
        if name.is_empty() || message.is_empty() {
            self.error("Please fill all fields and sign");
            return;
        }

        let entry = NewEntry {
            name: Some(name.to_owned()),
            message: Some(message.to_owned()),
            signature: Some(signature),
            date: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        };

        let api = &self.api;
        let result = self
            .retry
            .run(|| api.create_entry(password.as_str(), &entry))
            .await;

        match result {
            Ok(()) => {
                if let Some(pad) = self.pad.as_mut() {
                    pad.clear();
                }
                self.go_home();
                self.notice = Some(Notice::Info("Entry saved successfully!".to_owned()));
            }
            Err(e) => {
                warn!(error = %e, "entry submission failed");
                self.error("Failed to save entry");
            }
        }
    }

    async fn load_entries(&mut self, password: &str) {
        let api = &self.api;
        match self.retry.run(|| api.list_entries(password)).await {
            Ok(entries) => {
                self.rendered = Some(render_entries(&entries));
                self.entries = entries;
            }
            Err(e) => {
                warn!(error = %e, "loading entries failed");
                self.error("Failed to load entries");
            }
        }
    }
}
