/*!
`Store` methods for instructor accounts.
*/
use rusqlite::{ErrorCode, OptionalExtension, Row};

use super::{Store, DbError};
use crate::{
    auth::{self, AuthResult},
    user::User,
};

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get("id")?,
        uname: row.get("username")?,
        hash: row.get("password")?,
    })
}

impl Store {
    /**
    Register a new user with the given password.

    Returns `AuthResult::DuplicateUname` if `uname` is already taken, and
    `AuthResult::Ok` once the user and a salted hash of the password have been
    stored.
    */
    pub fn insert_user(
        &self,
        uname: &str,
        password: &str,
    ) -> Result<AuthResult, DbError> {
        log::trace!("Store::insert_user( {:?}, [ password ] ) called.", uname);

        let salt = self.generate_salt()?;
        let hash = auth::hash_password(password, &salt, self.hash_iterations);

        let conn = self.connect()?;

        // The UNIQUE constraint on `username` is the duplicate check.
        let res = conn.execute(
            "INSERT INTO users (username, password) VALUES (?1, ?2)",
            [uname, hash.as_str()]
        );
        match res {
            Ok(_) => {},
            Err(e) if e.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) => {
                log::trace!("Username {:?} already in use.", uname);
                return Ok(AuthResult::DuplicateUname);
            },
            Err(e) => {
                return Err(DbError::from(e).annotate("Error inserting user"));
            },
        }

        log::info!("Registered user {:?}.", uname);
        Ok(AuthResult::Ok)
    }

    pub fn get_user_by_uname(
        &self,
        uname: &str,
    ) -> Result<Option<User>, DbError> {
        log::trace!("Store::get_user_by_uname( {:?} ) called.", uname);

        let conn = self.connect()?;
        let u = conn.query_row(
            "SELECT id, username, password FROM users WHERE username = ?1",
            [uname],
            user_from_row
        ).optional()?;

        Ok(u)
    }

    pub fn get_user_by_id(
        &self,
        id: i64,
    ) -> Result<Option<User>, DbError> {
        log::trace!("Store::get_user_by_id( {} ) called.", &id);

        let conn = self.connect()?;
        let u = conn.query_row(
            "SELECT id, username, password FROM users WHERE id = ?1",
            [id],
            user_from_row
        ).optional()?;

        Ok(u)
    }

    /**
    Check `password` against the stored hash for `uname`.

    On success returns the user; otherwise `AuthResult::NoSuchUser` or
    `AuthResult::BadPassword`. Callers facing the outside world should not
    let those two be told apart.
    */
    pub fn check_password(
        &self,
        uname: &str,
        password: &str,
    ) -> Result<Result<User, AuthResult>, DbError> {
        log::trace!("Store::check_password( {:?}, [ password ] ) called.", uname);

        let u = match self.get_user_by_uname(uname)? {
            Some(u) => u,
            None => { return Ok(Err(AuthResult::NoSuchUser)); },
        };

        if auth::verify_password(&u.hash, password) {
            Ok(Ok(u))
        } else {
            Ok(Err(AuthResult::BadPassword))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::test_store;

    static USERS: &[(&str, &str)] = &[
        ("alice", "pw1"),
        ("bob", "hunter2"),
        ("Mr. O'Brien", "p@ss w0rd"),
    ];

    #[test]
    fn register_and_check() {
        let db = test_store("users");

        for (uname, pw) in USERS.iter() {
            assert_eq!(db.insert_user(uname, pw).unwrap(), AuthResult::Ok);
        }

        for (uname, pw) in USERS.iter() {
            let u = db.check_password(uname, pw).unwrap().unwrap();
            assert_eq!(&u.uname, uname);
            assert!(!u.hash.contains(pw));
            assert_eq!(db.get_user_by_id(u.id).unwrap(), Some(u));
        }

        assert_eq!(
            db.check_password("alice", "pw2").unwrap(),
            Err(AuthResult::BadPassword)
        );
        assert_eq!(
            db.check_password("carol", "pw1").unwrap(),
            Err(AuthResult::NoSuchUser)
        );
        assert_eq!(db.get_user_by_uname("carol").unwrap(), None);
        assert_eq!(db.get_user_by_id(9999).unwrap(), None);

        db.nuke_database().unwrap();
    }

    #[test]
    fn duplicate_unames() {
        let db = test_store("dupes");

        assert_eq!(db.insert_user("alice", "pw1").unwrap(), AuthResult::Ok);
        assert_eq!(
            db.insert_user("alice", "something else").unwrap(),
            AuthResult::DuplicateUname
        );

        // The original password still works; the second one never took.
        assert!(db.check_password("alice", "pw1").unwrap().is_ok());
        assert_eq!(
            db.check_password("alice", "something else").unwrap(),
            Err(AuthResult::BadPassword)
        );

        db.nuke_database().unwrap();
    }

    #[test]
    fn names_taken_by_other_writers() {
        let db = test_store("other-writer");

        // Another writer sneaks the name in directly.
        let conn = rusqlite::Connection::open(db.dir.path().join("appraise.db")).unwrap();
        conn.execute(
            "INSERT INTO users (username, password) VALUES ('alice', 'x')",
            []
        ).unwrap();
        drop(conn);

        assert_eq!(
            db.insert_user("alice", "pw1").unwrap(),
            AuthResult::DuplicateUname
        );
        // Case matters; these are different names.
        assert_eq!(db.insert_user("Alice", "pw1").unwrap(), AuthResult::Ok);

        db.nuke_database().unwrap();
    }

    #[test]
    fn hashes_keep_their_own_iteration_count() {
        let mut db = test_store("iterations");

        db.insert_user("early", "pw").unwrap();
        db.set_hash_iterations(32);
        db.insert_user("late", "pw").unwrap();

        let early = db.check_password("early", "pw").unwrap().unwrap();
        let late = db.check_password("late", "pw").unwrap().unwrap();
        assert!(early.hash.starts_with("pbkdf2-sha256$16$"));
        assert!(late.hash.starts_with("pbkdf2-sha256$32$"));

        db.nuke_database().unwrap();
    }
}
