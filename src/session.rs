//! Who is making the request. Identity comes from the authenticating proxy in
//! front of the service; the administrator is whoever's email equals the
//! configured address.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;

use crate::state::AppState;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Session {
    pub email: Option<String>,
    pub is_admin: bool,
}

impl Session {
    pub fn resolve(email: Option<&str>, admin_email: Option<&str>) -> Self {
        let email = email
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string);
        let is_admin = matches!((email.as_deref(), admin_email), (Some(e), Some(admin)) if e == admin);

        Self { email, is_admin }
    }

    fn from_parts(parts: &Parts, state: &AppState) -> Self {
        let email = parts
            .headers
            .get(state.config.auth_email_header.as_str())
            .and_then(|value| value.to_str().ok());

        Self::resolve(email, state.config.admin_email.as_deref())
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Session {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(Session::from_parts(parts, state))
    }
}

/// A signed-in caller. Anonymous requests are rejected with 401.
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub email: String,
    pub is_admin: bool,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for SignedIn {
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let session = Session::from_parts(parts, state);
        match session.email {
            Some(email) => Ok(SignedIn {
                email,
                is_admin: session.is_admin,
            }),
            None => Err((StatusCode::UNAUTHORIZED, "Přihlaste se prosím.")),
        }
    }
}

/// The administrator. Anonymous callers get 401, everyone else 403.
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub email: String,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminSession {
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let session = Session::from_parts(parts, state);
        match (session.email, session.is_admin) {
            (Some(email), true) => Ok(AdminSession { email }),
            (Some(email), false) => {
                tracing::warn!("{} attempted an administrator action", email);
                Err((StatusCode::FORBIDDEN, "K této akci nemáte oprávnění."))
            }
            (None, _) => Err((StatusCode::UNAUTHORIZED, "Přihlaste se prosím.")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn administrator_is_exact_email_match() {
        let admin = Some("ucitel@skola.cz");

        assert!(Session::resolve(Some("ucitel@skola.cz"), admin).is_admin);
        assert!(!Session::resolve(Some("Ucitel@skola.cz"), admin).is_admin);
        assert!(!Session::resolve(Some("ana@skola.cz"), admin).is_admin);
        assert!(!Session::resolve(Some("ucitel@skola.cz"), None).is_admin);
    }

    #[test]
    fn blank_identity_is_anonymous() {
        let session = Session::resolve(Some("  "), Some("ucitel@skola.cz"));

        assert_eq!(session, Session::default());
    }
}
