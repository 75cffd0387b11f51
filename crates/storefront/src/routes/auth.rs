//! Sign-in, sign-up and sign-out route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::NavView;
use crate::backend::SignUpOutcome;
use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{CurrentSession, clear_current_session, sign_in_session};
use crate::models::AuthSession;
use crate::notifications::{Notice, NoticeQuery, Toast};
use crate::services::{AuthError, AuthGateway};
use crate::state::AppState;

/// Which form the auth page opens on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthTab {
    #[default]
    SignIn,
    SignUp,
}

/// Tab selection query parameter.
#[derive(Debug, Default, Deserialize)]
pub struct TabQuery {
    #[serde(default)]
    pub tab: Option<String>,
}

impl TabQuery {
    fn tab(&self) -> AuthTab {
        match self.tab.as_deref() {
            Some("sign-up") => AuthTab::SignUp,
            _ => AuthTab::SignIn,
        }
    }
}

/// Auth page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/index.html")]
pub struct AuthTemplate {
    pub nav: NavView,
    pub toast: Option<Toast>,
    pub sign_up_active: bool,
    /// Email to prefill after a failed attempt.
    pub email: String,
}

impl AuthTemplate {
    fn new(tab: AuthTab, toast: Option<Toast>) -> Self {
        Self {
            nav: NavView::default(),
            toast,
            sign_up_active: tab == AuthTab::SignUp,
            email: String::new(),
        }
    }

    fn failed(tab: AuthTab, email: String, err: &AuthError) -> Response {
        let status = if err.is_backend_failure() {
            StatusCode::BAD_GATEWAY
        } else {
            StatusCode::UNPROCESSABLE_ENTITY
        };
        let template = Self {
            email,
            ..Self::new(tab, Some(err.toast()))
        };
        (status, template).into_response()
    }
}

/// Sign-in form data.
#[derive(Deserialize)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
}

/// Sign-up form data.
#[derive(Deserialize)]
pub struct SignUpForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Display the auth page. Signed-in users are sent home.
pub async fn page(
    CurrentSession(current): CurrentSession,
    Query(notice): Query<NoticeQuery>,
    Query(tab): Query<TabQuery>,
) -> Response {
    if current.is_some() {
        return Redirect::to("/").into_response();
    }
    AuthTemplate::new(tab.tab(), notice.notice.map(|n| n.toast())).into_response()
}

/// Handle sign-in form submission.
#[instrument(skip(state, session, form))]
pub async fn sign_in(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SignInForm>,
) -> Result<Response> {
    let gateway = AuthGateway::new(state.backend());
    match gateway.sign_in(&form.email, &form.password).await {
        Ok(auth) => {
            establish(&session, &auth).await?;
            Ok(Redirect::to(&Notice::SignedIn.location("/")).into_response())
        }
        Err(e) => Ok(AuthTemplate::failed(AuthTab::SignIn, form.email, &e)),
    }
}

/// Handle sign-up form submission.
///
/// When the backend requires email confirmation no session is created and
/// the user is asked to check their inbox.
#[instrument(skip(state, session, form))]
pub async fn sign_up(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SignUpForm>,
) -> Result<Response> {
    let gateway = AuthGateway::new(state.backend());
    match gateway
        .sign_up(&form.email, &form.password, &form.confirm_password)
        .await
    {
        Ok(SignUpOutcome::SignedIn(auth)) => {
            establish(&session, &auth).await?;
            Ok(Redirect::to(&Notice::SignedUp.location("/")).into_response())
        }
        Ok(SignUpOutcome::ConfirmationRequired) => {
            Ok(Redirect::to(&Notice::CheckEmail.location("/auth")).into_response())
        }
        Err(e) => Ok(AuthTemplate::failed(AuthTab::SignUp, form.email, &e)),
    }
}

/// Handle sign-out.
#[instrument(skip(state, session, current))]
pub async fn sign_out(
    State(state): State<AppState>,
    session: Session,
    CurrentSession(current): CurrentSession,
) -> Result<Response> {
    if let Some(auth) = current {
        AuthGateway::new(state.backend()).sign_out(&auth).await;
    }
    clear_current_session(&session).await?;
    clear_sentry_user();
    Ok(Redirect::to(&Notice::SignedOut.location("/")).into_response())
}

async fn establish(session: &Session, auth: &AuthSession) -> Result<()> {
    sign_in_session(session, auth).await?;
    set_sentry_user(&auth.user.id, Some(auth.user.email.as_str()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tab_query() {
        assert_eq!(TabQuery::default().tab(), AuthTab::SignIn);
        let query = TabQuery {
            tab: Some("sign-up".to_string()),
        };
        assert_eq!(query.tab(), AuthTab::SignUp);
        let query = TabQuery {
            tab: Some("bogus".to_string()),
        };
        assert_eq!(query.tab(), AuthTab::SignIn);
    }
}
