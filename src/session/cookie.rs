//! Signed-cookie session store.
//!
//! The default `SessionStore` serializes the session mapping to JSON,
//! signs it with HMAC-SHA256 under the configured secret key and ships
//! it as a cookie value of the form `base64(payload).base64(signature)`.
//! A cookie that fails verification is discarded and the request starts
//! with a fresh session.

use std::collections::BTreeMap;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::http::{Request, Response};
use crate::session::Session;

type HmacSha256 = Hmac<Sha256>;

/// Boundary contract for session persistence. The dispatcher opens a
/// session at request entry and saves it onto the response when it was
/// mutated.
pub trait SessionStore: Send + Sync {
    /// Open the session carried by the request, or a fresh one when the
    /// request carries none (or an invalid one).
    fn open(&self, request: &Request) -> Session;

    /// Serialize the session into an outgoing credential on the
    /// response. Only called for mutated, non-null sessions.
    fn save(&self, session: &Session, response: &mut Response);
}

/// The default store: HMAC-signed cookie, JSON payload.
pub struct SignedCookieStore {
    secret_key: Vec<u8>,
    cookie_name: String,
    permanent_lifetime: Duration,
}

impl SignedCookieStore {
    pub fn new(secret_key: &str, cookie_name: &str, permanent_lifetime_days: i64) -> Self {
        Self {
            secret_key: secret_key.as_bytes().to_vec(),
            cookie_name: cookie_name.to_string(),
            permanent_lifetime: Duration::days(permanent_lifetime_days),
        }
    }

    fn sign(&self, payload: &[u8]) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(&self.secret_key)
            .expect("HMAC accepts keys of any length");
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }

    fn encode(&self, session: &Session) -> Option<String> {
        let payload = serde_json::to_vec(session.data()).ok()?;
        let signature = self.sign(&payload);
        Some(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&payload),
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    fn decode(&self, cookie_value: &str) -> Option<BTreeMap<String, serde_json::Value>> {
        let (payload_b64, signature_b64) = cookie_value.split_once('.')?;
        let payload = URL_SAFE_NO_PAD.decode(payload_b64).ok()?;
        let signature = URL_SAFE_NO_PAD.decode(signature_b64).ok()?;

        let mut mac = HmacSha256::new_from_slice(&self.secret_key)
            .expect("HMAC accepts keys of any length");
        mac.update(&payload);
        if mac.verify_slice(&signature).is_err() {
            return None;
        }
        serde_json::from_slice(&payload).ok()
    }
}

impl SessionStore for SignedCookieStore {
    fn open(&self, request: &Request) -> Session {
        request
            .cookie(&self.cookie_name)
            .and_then(|value| self.decode(&value))
            .map_or_else(Session::new, Session::from_data)
    }

    fn save(&self, session: &Session, response: &mut Response) {
        let Some(encoded) = self.encode(session) else {
            return;
        };
        let mut cookie = format!("{}={encoded}; Path=/; HttpOnly", self.cookie_name);
        if session.permanent() {
            let expires = Utc::now() + self.permanent_lifetime;
            cookie.push_str(&format!(
                "; Expires={}",
                expires.format("%a, %d %b %Y %H:%M:%S GMT")
            ));
        }
        response.add_header("Set-Cookie", &cookie);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SignedCookieStore {
        SignedCookieStore::new("test secret", "session", 31)
    }

    fn cookie_value(response: &Response) -> String {
        let header = response.header("Set-Cookie").unwrap();
        let pair = header.split(';').next().unwrap();
        pair.split_once('=').unwrap().1.to_string()
    }

    #[test]
    fn test_save_open_round_trip() {
        let store = store();
        let mut session = Session::new();
        session.insert("user", "admin").unwrap();

        let mut response = Response::new("");
        store.save(&session, &mut response);

        let request = Request::get("/").with_cookie("session", &cookie_value(&response));
        let reopened = store.open(&request);
        assert_eq!(reopened.get_str("user"), Some("admin"));
        assert!(!reopened.is_modified());
    }

    #[test]
    fn test_tampered_cookie_is_discarded() {
        let store = store();
        let mut session = Session::new();
        session.insert("user", "admin").unwrap();
        let mut response = Response::new("");
        store.save(&session, &mut response);

        let mut value = cookie_value(&response);
        // Corrupt the signed payload
        value.replace_range(0..2, "zz");
        let request = Request::get("/").with_cookie("session", &value);
        let reopened = store.open(&request);
        assert!(reopened.is_empty());
    }

    #[test]
    fn test_wrong_key_is_discarded() {
        let store = store();
        let mut session = Session::new();
        session.insert("user", "admin").unwrap();
        let mut response = Response::new("");
        store.save(&session, &mut response);

        let other = SignedCookieStore::new("another secret", "session", 31);
        let request = Request::get("/").with_cookie("session", &cookie_value(&response));
        assert!(other.open(&request).is_empty());
    }

    #[test]
    fn test_missing_cookie_opens_fresh_session() {
        let store = store();
        let session = store.open(&Request::get("/"));
        assert!(session.is_empty());
        assert!(!session.is_null());
    }

    #[test]
    fn test_permanent_session_sets_expiry() {
        let store = store();
        let mut session = Session::new();
        session.set_permanent(true).unwrap();
        let mut response = Response::new("");
        store.save(&session, &mut response);
        let header = response.header("Set-Cookie").unwrap();
        assert!(header.contains("Expires="));
        assert!(header.contains("HttpOnly"));

        let mut transient = Session::new();
        transient.insert("user", "admin").unwrap();
        let mut response = Response::new("");
        store.save(&transient, &mut response);
        assert!(!response.header("Set-Cookie").unwrap().contains("Expires="));
    }
}
