//! Transient user notifications ("toasts").
//!
//! HTMX responses carry toasts in the `HX-Trigger` header; `static/js/app.js`
//! listens for the `toast` event and renders them. Full-page flows (redirects)
//! carry a [`Notice`] code in the query string instead, which the target page
//! turns back into a toast.

use std::fmt::Write;

use axum::http::HeaderValue;
use axum::response::{IntoResponseParts, ResponseParts};
use serde::{Deserialize, Serialize};

/// Event fired after any cart mutation; the navbar badge refreshes on it.
pub const CART_UPDATED_EVENT: &str = "cart-updated";

/// Toast styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastVariant {
    Default,
    Destructive,
}

/// A notification shown briefly to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub title: String,
    pub description: String,
    pub variant: ToastVariant,
}

impl Toast {
    /// An informational toast.
    #[must_use]
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: ToastVariant::Default,
        }
    }

    /// An error toast.
    #[must_use]
    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: ToastVariant::Destructive,
        }
    }

    /// Whether this toast reports a failure.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.variant == ToastVariant::Destructive
    }
}

/// `HX-Trigger` response header carrying client-side events.
///
/// Used as a response part: `(HxTrigger::cart_updated().with_toast(t), body)`.
#[derive(Debug, Clone, Default)]
pub struct HxTrigger {
    toast: Option<Toast>,
    cart_updated: bool,
}

impl HxTrigger {
    /// Trigger only a toast.
    #[must_use]
    pub fn toast(toast: Toast) -> Self {
        Self {
            toast: Some(toast),
            cart_updated: false,
        }
    }

    /// Trigger the cart-updated event.
    #[must_use]
    pub fn cart_updated() -> Self {
        Self {
            toast: None,
            cart_updated: true,
        }
    }

    /// Add a toast, if any.
    #[must_use]
    pub fn with_toast(mut self, toast: Option<Toast>) -> Self {
        self.toast = toast;
        self
    }

    /// JSON value of the header.
    fn header_json(&self) -> serde_json::Value {
        let mut events = serde_json::Map::new();
        if let Some(toast) = &self.toast {
            events.insert(
                "toast".to_string(),
                serde_json::to_value(toast).unwrap_or_default(),
            );
        }
        if self.cart_updated {
            events.insert(CART_UPDATED_EVENT.to_string(), serde_json::Value::Bool(true));
        }
        serde_json::Value::Object(events)
    }
}

impl IntoResponseParts for HxTrigger {
    type Error = std::convert::Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        if self.toast.is_none() && !self.cart_updated {
            return Ok(res);
        }

        // Header values must be visible ASCII; escape anything else.
        let json = ascii_json(&self.header_json().to_string());
        match HeaderValue::from_str(&json) {
            Ok(value) => {
                res.headers_mut().insert("HX-Trigger", value);
            }
            Err(e) => tracing::warn!("Failed to encode HX-Trigger header: {e}"),
        }
        Ok(res)
    }
}

/// Replace non-ASCII characters in serialized JSON with `\uXXXX` escapes.
fn ascii_json(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                let _ = write!(out, "\\u{unit:04x}");
            }
        }
    }
    out
}

/// Notice codes carried across redirects in the `notice` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Notice {
    SignedIn,
    SignedUp,
    SignedOut,
    CheckEmail,
    SignInRequired,
}

impl Notice {
    /// Query-string value of this notice.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::SignedIn => "signed_in",
            Self::SignedUp => "signed_up",
            Self::SignedOut => "signed_out",
            Self::CheckEmail => "check_email",
            Self::SignInRequired => "sign_in_required",
        }
    }

    /// `path` with this notice appended.
    #[must_use]
    pub fn location(self, path: &str) -> String {
        format!("{path}?notice={}", self.code())
    }

    /// The toast this notice shows.
    #[must_use]
    pub fn toast(self) -> Toast {
        match self {
            Self::SignedIn => Toast::info("Welcome back!", "You've successfully signed in"),
            Self::SignedUp => Toast::info("Account Created!", "Welcome to ShopHub"),
            Self::SignedOut => Toast::info("Signed out", "You've been signed out"),
            Self::CheckEmail => Toast::info(
                "Check your email",
                "Confirm your email address, then sign in",
            ),
            Self::SignInRequired => Toast::error(
                "Please Sign In",
                "Create an account or sign in to add items to your cart",
            ),
        }
    }
}

/// Query parameters accepted by pages that can show a notice.
#[derive(Debug, Default, Deserialize)]
pub struct NoticeQuery {
    /// Unknown codes are ignored rather than rejected.
    #[serde(default, deserialize_with = "lenient_notice")]
    pub notice: Option<Notice>,
}

fn lenient_notice<'de, D>(deserializer: D) -> Result<Option<Notice>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|code| {
        serde_json::from_value(serde_json::Value::String(code)).ok()
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::response::IntoResponse;

    use super::*;

    fn header(trigger: HxTrigger) -> Option<serde_json::Value> {
        let response = (trigger, "body").into_response();
        response
            .headers()
            .get("HX-Trigger")
            .map(|value| serde_json::from_slice(value.as_bytes()).unwrap())
    }

    #[test]
    fn test_cart_updated_with_toast() {
        let trigger = HxTrigger::cart_updated()
            .with_toast(Some(Toast::info("Success", "Item added to cart")));
        let json = header(trigger).unwrap();

        assert_eq!(json["cart-updated"], true);
        assert_eq!(json["toast"]["title"], "Success");
        assert_eq!(json["toast"]["description"], "Item added to cart");
        assert_eq!(json["toast"]["variant"], "default");
    }

    #[test]
    fn test_empty_trigger_sets_no_header() {
        assert!(header(HxTrigger::default()).is_none());
    }

    #[test]
    fn test_non_ascii_is_escaped() {
        let trigger = HxTrigger::toast(Toast::error("Erreur", "Caf\u{e9} introuvable"));
        let json = header(trigger).unwrap();
        assert_eq!(json["toast"]["description"], "Caf\u{e9} introuvable");
        assert_eq!(json["toast"]["variant"], "destructive");
    }

    #[test]
    fn test_notice_location_and_toast() {
        assert_eq!(
            Notice::SignInRequired.location("/auth"),
            "/auth?notice=sign_in_required"
        );
        assert!(Notice::SignInRequired.toast().is_error());
        assert_eq!(Notice::SignedIn.toast().title, "Welcome back!");
    }

    #[test]
    fn test_notice_query_ignores_unknown_codes() {
        let query: NoticeQuery = serde_json::from_str(r#"{"notice":"bogus"}"#).unwrap();
        assert_eq!(query.notice, None);

        let query: NoticeQuery = serde_json::from_str(r#"{"notice":"check_email"}"#).unwrap();
        assert_eq!(query.notice, Some(Notice::CheckEmail));
    }
}
