//! Login flow of a proxied request as an explicit state machine.
//!
//! ```text
//! Direct ──────────────────────────────────────────► Done
//! Proxied ──login page──► LoginChallenged ──target──► Done
//!    │                         │
//!    └──forward page──► ForwardPending ◄──forward─────┘
//!                              └──anything but login──► Done
//! ```
//!
//! [`ProxySession::open`](super::ProxySession::open) classifies each response
//! URL as a [`Landing`] and asks the current state what to do next.

use super::ProxyError;

/// Where a request is in the login flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyState {
    /// Sent straight to the target host.
    Direct,
    /// Sent to the proxy-rewritten host.
    Proxied,
    /// The proxy demanded a login and the credentials have been posted.
    LoginChallenged,
    /// A cookie-setting page was visited; the original request is repeated.
    ForwardPending,
    Done,
}

/// What the response URL of the last request points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Landing {
    Login,
    Forward,
    Target,
}

impl Landing {
    /// Classifies a response URL by prefix.
    #[must_use]
    pub fn classify(response_url: &str, login_url: &str, forward_url: &str) -> Self {
        if response_url.starts_with(login_url) {
            Self::Login
        } else if response_url.starts_with(forward_url) {
            Self::Forward
        } else {
            Self::Target
        }
    }
}

/// The next request to make.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Scrape the login form from the response and post the credentials.
    SubmitLogin,
    /// Repeat the original proxied request.
    Repeat,
    /// Hand the response to the caller.
    Finish,
}

/// Result of one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next: ProxyState,
    pub action: Action,
}

impl Transition {
    fn to(next: ProxyState, action: Action) -> Self {
        Self { next, action }
    }
}

impl ProxyState {
    /// Advances on a response landing at `landing`.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::LoginRejected`] when a login page shows up again
    /// after credentials were posted.
    pub fn on_landing(self, landing: Landing, url: &str) -> Result<Transition, ProxyError> {
        use Action::{Finish, Repeat, SubmitLogin};
        use ProxyState::{Direct, Done, ForwardPending, LoginChallenged, Proxied};

        let transition = match (self, landing) {
            (Direct | Done, _) | (Proxied | LoginChallenged | ForwardPending, Landing::Target) => {
                Transition::to(Done, Finish)
            }
            (Proxied, Landing::Login) => Transition::to(LoginChallenged, SubmitLogin),
            (Proxied | LoginChallenged, Landing::Forward) => {
                Transition::to(ForwardPending, Repeat)
            }
            (ForwardPending, Landing::Forward) => Transition::to(Done, Finish),
            (LoginChallenged | ForwardPending, Landing::Login) => {
                return Err(ProxyError::LoginRejected {
                    url: url.to_string(),
                });
            }
        };
        Ok(transition)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const LOGIN: &str = "https://login.example.edu/cas/login";
    const FORWARD: &str = "http://proxy.example.edu/connect";

    fn step(state: ProxyState, landing: Landing) -> Transition {
        state.on_landing(landing, "http://x").unwrap()
    }

    #[test]
    fn test_classify_landing() {
        assert_eq!(
            Landing::classify("https://login.example.edu/cas/login?service=abc", LOGIN, FORWARD),
            Landing::Login
        );
        assert_eq!(
            Landing::classify("http://proxy.example.edu/connect?session=1", LOGIN, FORWARD),
            Landing::Forward
        );
        assert_eq!(
            Landing::classify("http://journal.example.com.proxy.example.edu/a", LOGIN, FORWARD),
            Landing::Target
        );
    }

    #[test]
    fn test_direct_request_finishes_immediately() {
        for landing in [Landing::Login, Landing::Forward, Landing::Target] {
            assert_eq!(
                step(ProxyState::Direct, landing),
                Transition::to(ProxyState::Done, Action::Finish)
            );
        }
    }

    #[test]
    fn test_login_challenge_then_target() {
        let challenged = step(ProxyState::Proxied, Landing::Login);
        assert_eq!(
            challenged,
            Transition::to(ProxyState::LoginChallenged, Action::SubmitLogin)
        );
        assert_eq!(
            step(challenged.next, Landing::Target),
            Transition::to(ProxyState::Done, Action::Finish)
        );
    }

    #[test]
    fn test_login_then_forward_repeats_once() {
        let forward = step(ProxyState::LoginChallenged, Landing::Forward);
        assert_eq!(
            forward,
            Transition::to(ProxyState::ForwardPending, Action::Repeat)
        );
        assert_eq!(
            step(forward.next, Landing::Forward),
            Transition::to(ProxyState::Done, Action::Finish)
        );
    }

    #[test]
    fn test_forward_without_login() {
        assert_eq!(
            step(ProxyState::Proxied, Landing::Forward),
            Transition::to(ProxyState::ForwardPending, Action::Repeat)
        );
    }

    #[test]
    fn test_second_login_page_is_rejection() {
        let err = ProxyState::LoginChallenged
            .on_landing(Landing::Login, LOGIN)
            .unwrap_err();
        assert!(matches!(err, ProxyError::LoginRejected { .. }));
        assert!(
            ProxyState::ForwardPending
                .on_landing(Landing::Login, LOGIN)
                .is_err()
        );
    }
}
