use axum_extra::extract::cookie::{Cookie, Key, SameSite, SignedCookieJar};
use sha2::{Digest, Sha512};
use subtle::ConstantTimeEq;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "aariv_session";

// Single hardcoded account. This is a placeholder gate for the bundled
// frontend, not an authentication system.
const PLACEHOLDER_USERNAME: &str = "admin";
const PLACEHOLDER_PASSWORD: &str = "password123";

/// Expands an arbitrary-length secret into the 64 bytes cookie signing needs.
pub fn derive_cookie_key(secret: &str) -> Key {
    let digest = Sha512::digest(secret.as_bytes());
    Key::from(digest.as_slice())
}

/// Returns the session key carried by the signed cookie, minting a new one
/// (and adding it to the jar) when the request has none or it was tampered.
pub fn session_key(jar: SignedCookieJar) -> (SignedCookieJar, String) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        let value = cookie.value().trim();
        if !value.is_empty() {
            return (jar, value.to_string());
        }
    }

    let key = Uuid::new_v4().to_string();
    let cookie = Cookie::build((SESSION_COOKIE, key.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);
    (jar.add(cookie), key)
}

pub fn verify_placeholder_credentials(username: &str, password: &str) -> bool {
    let user_ok = username.as_bytes().ct_eq(PLACEHOLDER_USERNAME.as_bytes());
    let pass_ok = password.as_bytes().ct_eq(PLACEHOLDER_PASSWORD.as_bytes());
    (user_ok & pass_ok).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_only_the_placeholder_pair() {
        assert!(verify_placeholder_credentials("admin", "password123"));
        assert!(!verify_placeholder_credentials("admin", "password1234"));
        assert!(!verify_placeholder_credentials("root", "password123"));
        assert!(!verify_placeholder_credentials("", ""));
    }

    #[test]
    fn new_jar_gets_a_fresh_session_key() {
        let key = derive_cookie_key("short");
        let jar = SignedCookieJar::new(key);

        let (jar, session) = session_key(jar);
        assert!(Uuid::parse_str(&session).is_ok());

        let (_, again) = session_key(jar);
        assert_eq!(again, session);
    }

    #[test]
    fn derived_keys_are_deterministic() {
        let first = derive_cookie_key("super-secret-key");
        let second = derive_cookie_key("super-secret-key");
        assert_eq!(first.master(), second.master());
    }
}
