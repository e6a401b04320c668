//! Session gate: a rendering guard in front of protected UI.
//!
//! Not a security boundary; the session middleware on every protected route is
//! the enforcement. The gate only decides what to show while the session state
//! is being resolved.
//!
//! ```text
//! Loading ──(first resolved session state)──▶ Authenticated(user) ─▶ children
//!                                         └─▶ Unauthenticated     ─▶ fallback or sign-in panel
//! ```

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tokio::sync::watch;
use url::Url;

use crate::auth::SessionUser;

/// Path the identity provider redirects back to after consent.
pub const CALLBACK_PATH: &str = "/auth/callback";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OAuthProvider {
    Google,
    Github,
}

impl OAuthProvider {
    pub const ALL: [OAuthProvider; 2] = [OAuthProvider::Google, OAuthProvider::Github];

    pub fn as_str(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "google",
            OAuthProvider::Github => "github",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "Continue with Google",
            OAuthProvider::Github => "Continue with GitHub",
        }
    }
}

impl fmt::Display for OAuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown OAuth provider: {0}")]
pub struct UnknownProvider(pub String);

impl FromStr for OAuthProvider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "google" => Ok(OAuthProvider::Google),
            "github" => Ok(OAuthProvider::Github),
            _ => Err(UnknownProvider(s.to_string())),
        }
    }
}

/// Browser redirect into the provider's consent flow. Has no result: the outcome
/// is observed later as a session state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInCommand {
    pub provider: OAuthProvider,
    pub redirect_to: Url,
}

/// `{store_url}/auth/v1/authorize?provider=<p>&redirect_to=<origin>/auth/callback`
pub fn sign_in(store_url: &str, provider: OAuthProvider, origin: &str) -> Result<SignInCommand, url::ParseError> {
    let callback = Url::parse(origin)?.join(CALLBACK_PATH)?;
    let mut redirect_to = Url::parse(&format!("{}/auth/v1/authorize", store_url.trim_end_matches('/')))?;
    redirect_to
        .query_pairs_mut()
        .append_pair("provider", provider.as_str())
        .append_pair("redirect_to", callback.as_str());
    Ok(SignInCommand { provider, redirect_to })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInOption {
    pub provider: OAuthProvider,
    pub label: &'static str,
    pub href: Url,
}

/// Default unauthenticated view: one sign-in option per provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInPanel {
    pub options: Vec<SignInOption>,
}

impl SignInPanel {
    pub fn new(store_url: &str, origin: &str) -> Result<Self, url::ParseError> {
        let options = OAuthProvider::ALL
            .iter()
            .map(|&provider| {
                let command = sign_in(store_url, provider, origin)?;
                Ok(SignInOption { provider, label: provider.label(), href: command.redirect_to })
            })
            .collect::<Result<Vec<_>, url::ParseError>>()?;
        Ok(Self { options })
    }

    pub fn to_html(&self) -> String {
        let buttons = self
            .options
            .iter()
            .map(|o| {
                format!(
                    "    <a class=\"sign-in {}\" href=\"{}\">{}</a>\n",
                    o.provider,
                    escape_html(o.href.as_str()),
                    escape_html(o.label)
                )
            })
            .collect::<String>();

        format!(
            "<!doctype html>\n<html>\n<head><meta charset=\"utf-8\"><title>Sign in</title></head>\n<body>\n  <main class=\"sign-in-panel\">\n    <h1>Sign in</h1>\n{}  </main>\n</body>\n</html>\n",
            buttons
        )
    }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// What the session-state subscription reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Loading,
    Resolved(Option<SessionUser>),
}

/// Subscription channel feeding gates; starts in `Loading`.
pub fn session_channel() -> (watch::Sender<SessionState>, watch::Receiver<SessionState>) {
    watch::channel(SessionState::Loading)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStatus {
    Loading,
    Authenticated(SessionUser),
    Unauthenticated,
}

#[derive(Debug, PartialEq, Eq)]
pub enum GateView<C, F> {
    Loading,
    Children(C),
    Fallback(F),
    SignIn(SignInPanel),
}

pub struct SessionGate {
    status: GateStatus,
    subscription: watch::Receiver<SessionState>,
    panel: SignInPanel,
}

impl SessionGate {
    /// Mounts a gate. If the subscription already holds a resolved state the
    /// gate resolves immediately.
    pub fn mount(subscription: watch::Receiver<SessionState>, panel: SignInPanel) -> Self {
        let current = *subscription.borrow();
        let mut gate = Self { status: GateStatus::Loading, subscription, panel };
        if let SessionState::Resolved(user) = current {
            gate.settle(user);
        }
        gate
    }

    pub fn status(&self) -> GateStatus {
        self.status
    }

    /// Waits for the one `Loading` transition. Once resolved, later session
    /// updates are ignored for the life of this gate. A subscription that closes
    /// while loading resolves as unauthenticated.
    pub async fn resolved(&mut self) -> GateStatus {
        if self.status != GateStatus::Loading {
            return self.status;
        }

        let outcome = self
            .subscription
            .wait_for(|state| matches!(state, SessionState::Resolved(_)))
            .await
            .map(|state| *state);

        match outcome {
            Ok(SessionState::Resolved(user)) => self.settle(user),
            Ok(SessionState::Loading) | Err(_) => self.settle(None),
        }
        self.status
    }

    fn settle(&mut self, user: Option<SessionUser>) {
        self.status = match user {
            Some(user) => GateStatus::Authenticated(user),
            None => GateStatus::Unauthenticated,
        };
    }

    /// Children are only built when authenticated. Without a fallback, an
    /// unauthenticated gate shows the default sign-in panel.
    pub fn render<C, F>(&self, children: impl FnOnce(&SessionUser) -> C, fallback: Option<F>) -> GateView<C, F> {
        match &self.status {
            GateStatus::Loading => GateView::Loading,
            GateStatus::Authenticated(user) => GateView::Children(children(user)),
            GateStatus::Unauthenticated => match fallback {
                Some(f) => GateView::Fallback(f),
                None => GateView::SignIn(self.panel.clone()),
            },
        }
    }
}
