/*!
Password hashing and login sessions.

Passwords are stored as PBKDF2-HMAC-SHA256 hashes encoded as

```text
pbkdf2-sha256$<iterations>$<salt>$<hex-encoded 32-byte hash>
```

Sessions live only in memory. A session key is a random alphanumeric string
handed to the browser in a cookie; the server maps it back to the user it was
issued to.
*/
use std::collections::HashMap;
use std::fmt::Write;

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use pbkdf2::pbkdf2_hmac;
use rand::{Rng, distributions};
use sha2::Sha256;
use time::{Duration, OffsetDateTime};

/// Name of the cookie carrying the session key.
pub const SESSION_COOKIE: &str = "appraise_session";

const HASH_SCHEME: &str = "pbkdf2-sha256";
const HASH_LENGTH: usize = 32;
const DEFAULT_KEY_LENGTH: usize = 32;
const DEFAULT_KEY_CHARS: &str =
"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Non-error outcomes of registering or logging in.
#[derive(Debug, PartialEq)]
pub enum AuthResult {
    Ok,
    NoSuchUser,
    BadPassword,
    DuplicateUname,
}

/// Hash `password` with `salt` using `iterations` rounds of PBKDF2.
pub fn hash_password(password: &str, salt: &str, iterations: u32) -> String {
    let mut hash = [0u8; HASH_LENGTH];
    pbkdf2_hmac::<Sha256>(
        password.as_bytes(),
        salt.as_bytes(),
        iterations,
        &mut hash
    );

    let mut encoded = format!("{}${}${}$", HASH_SCHEME, iterations, salt);
    for b in hash.iter() {
        // Writing to a String can't fail.
        let _ = write!(&mut encoded, "{:02x}", b);
    }
    encoded
}

/**
Check `password` against a hash produced by `hash_password()`.

The iteration count and salt are read back out of `encoded`, so hashes made
under an older iteration setting still verify. A malformed `encoded` value
never matches.
*/
pub fn verify_password(encoded: &str, password: &str) -> bool {
    let mut parts = encoded.splitn(4, '$');
    let (scheme, iterations, salt) = match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(iterations), Some(salt)) => (scheme, iterations, salt),
        _ => {
            log::warn!("Malformed password hash encountered.");
            return false;
        },
    };

    if scheme != HASH_SCHEME {
        log::warn!("Unrecognized password hash scheme {:?}.", scheme);
        return false;
    }

    let iterations: u32 = match iterations.parse() {
        Ok(n) => n,
        Err(e) => {
            log::warn!("Unparseable iteration count {:?}: {}", iterations, &e);
            return false;
        },
    };

    hash_password(password, salt, iterations) == encoded
}

/// What the server remembers about a logged-in browser.
#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    pub user_id: i64,
    pub uname: String,
    issued: OffsetDateTime,
}

/// The table of live session keys.
#[derive(Debug)]
pub struct Sessions {
    keys: HashMap<String, Session>,
    key_chars: Vec<char>,
    key_length: usize,
    lifetime: Duration,
}

impl Sessions {
    pub fn new(lifetime: Duration) -> Self {
        log::trace!("Sessions::new( {:?} ) called.", &lifetime);

        Self {
            keys: HashMap::new(),
            key_chars: DEFAULT_KEY_CHARS.chars().collect(),
            key_length: DEFAULT_KEY_LENGTH,
            lifetime,
        }
    }

    fn generate_key(&self) -> String {
        let dist = match distributions::Slice::new(&self.key_chars) {
            Ok(dist) => dist,
            Err(_) => {
                log::error!("Session key character set is empty.");
                return String::new();
            },
        };
        rand::thread_rng()
            .sample_iter(&dist)
            .take(self.key_length)
            .collect()
    }

    /// Issue a new key for the given user and remember it.
    ///
    /// Expired sessions are culled as a side effect.
    pub fn issue_key(&mut self, user_id: i64, uname: &str) -> String {
        log::trace!("Sessions::issue_key( {}, {:?} ) called.", &user_id, uname);

        self.cull();

        let mut key = self.generate_key();
        while self.keys.contains_key(&key) {
            key = self.generate_key();
        }

        let session = Session {
            user_id,
            uname: uname.to_owned(),
            issued: OffsetDateTime::now_utc(),
        };
        self.keys.insert(key.clone(), session);
        key
    }

    /// Return the session belonging to `key`, if it exists and hasn't expired.
    pub fn check_key(&self, key: &str) -> Option<Session> {
        let session = self.keys.get(key)?;
        if self.is_expired(session, OffsetDateTime::now_utc()) {
            log::trace!("Session for {:?} has expired.", &session.uname);
            None
        } else {
            Some(session.clone())
        }
    }

    /// Forget `key`. Returns whether there was anything to forget.
    pub fn revoke(&mut self, key: &str) -> bool {
        match self.keys.remove(key) {
            Some(s) => {
                log::trace!("Session for {:?} revoked.", &s.uname);
                true
            },
            None => false,
        }
    }

    fn is_expired(&self, session: &Session, now: OffsetDateTime) -> bool {
        now - session.issued > self.lifetime
    }

    fn cull(&mut self) {
        let now = OffsetDateTime::now_utc();
        let lifetime = self.lifetime;
        let before = self.keys.len();
        self.keys.retain(|_, s| now - s.issued <= lifetime);
        let n_culled = before - self.keys.len();
        if n_culled > 0 {
            log::debug!("Culled {} expired sessions.", &n_culled);
        }
    }

    pub fn len(&self) -> usize { self.keys.len() }

    pub fn is_empty(&self) -> bool { self.keys.is_empty() }
}

/// The session key the browser sent, if any.
pub fn session_key(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE)
        .map(|c| c.value().trim())
        .filter(|value| !value.is_empty())
        .map(|value| value.to_owned())
}

/// Cookie handing `key` to the browser.
pub fn session_cookie(key: String) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, key)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish()
}

/// Cookie to pass to `CookieJar::remove()` to make the browser drop its
/// session cookie. The path must match the one `session_cookie()` sets.
pub fn expired_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, "")
        .path("/")
        .finish()
}
