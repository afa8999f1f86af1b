/*!
Instructor accounts.
*/

/// A registered instructor.
///
/// `hash` is the encoded password hash produced by `auth::hash_password()`;
/// it is never the plaintext password.
#[derive(Clone, Debug, PartialEq)]
pub struct User {
    pub id: i64,
    pub uname: String,
    pub hash: String,
}

impl User {
    /// Characters of `uname` safe to embed in a download filename.
    ///
    /// Anything outside `[A-Za-z0-9_-]` is dropped; an all-unsafe name
    /// becomes `"user"`.
    pub fn file_stem(uname: &str) -> String {
        let stem: String = uname.chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
            .collect();

        if stem.is_empty() {
            "user".to_owned()
        } else {
            stem
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_stems() {
        assert_eq!(User::file_stem("alice"), "alice");
        assert_eq!(User::file_stem("Mr. O'Brien"), "MrOBrien");
        assert_eq!(User::file_stem("a_b-c"), "a_b-c");
        assert_eq!(User::file_stem("\"; rm"), "rm");
        assert_eq!(User::file_stem("ünï"), "n");
        assert_eq!(User::file_stem("ü/ï"), "user");
    }
}
