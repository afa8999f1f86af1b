/*!
Database interaction module.

Everything lives in a single SQLite file with three tables:

```sql
CREATE TABLE users (
    id       INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT UNIQUE NOT NULL,
    password TEXT NOT NULL          /* encoded hash; see `auth` */
);

CREATE TABLE subjects (
    id      INTEGER PRIMARY KEY AUTOINCREMENT,
    name    TEXT NOT NULL,
    user_id INTEGER NOT NULL REFERENCES users(id)
);

CREATE TABLE feedback (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    student_id TEXT NOT NULL,       /* whatever the student typed */
    subject_id INTEGER NOT NULL REFERENCES subjects(id),
    criteria   TEXT NOT NULL,       /* verbatim criterion text */
    rating     INTEGER NOT NULL,
    user_id    INTEGER NOT NULL REFERENCES users(id)
);
```

Each method opens its own connection and drops it before returning.
*/
use std::path::{Path, PathBuf};

use rand::{Rng, distributions};
use rusqlite::Connection;

mod feedback;
mod subjects;
mod users;

const DEFAULT_SALT_LENGTH: usize = 16;
const DEFAULT_SALT_CHARS: &str =
"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
pub const DEFAULT_HASH_ITERATIONS: u32 = 50_000;

static SCHEMA: &[(&str, &str)] = &[
    (
        "CREATE TABLE IF NOT EXISTS users (
            id       INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT UNIQUE NOT NULL,
            password TEXT NOT NULL
        )",
        "DROP TABLE IF EXISTS users",
    ),

    (
        "CREATE TABLE IF NOT EXISTS subjects (
            id      INTEGER PRIMARY KEY AUTOINCREMENT,
            name    TEXT NOT NULL,
            user_id INTEGER NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users (id)
        )",
        "DROP TABLE IF EXISTS subjects",
    ),

    (
        "CREATE TABLE IF NOT EXISTS feedback (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id TEXT NOT NULL,
            subject_id INTEGER NOT NULL,
            criteria   TEXT NOT NULL,
            rating     INTEGER NOT NULL,
            user_id    INTEGER NOT NULL,
            FOREIGN KEY (subject_id) REFERENCES subjects (id),
            FOREIGN KEY (user_id) REFERENCES users (id)
        )",
        "DROP TABLE IF EXISTS feedback",
    ),
];

#[derive(Debug, PartialEq)]
pub struct DbError(String);

impl DbError {
    /// Prepend some contextual `annotation` for the error.
    fn annotate(self, annotation: &str) -> Self {
        let s = format!("{}: {}", annotation, &self.0);
        Self(s)
    }

    pub fn display(&self) -> &str { &self.0 }
}

impl std::fmt::Display for DbError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", &self.0)
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(e: rusqlite::Error) -> DbError {
        DbError(format!("Data DB: {}", &e))
    }
}

impl From<String> for DbError {
    fn from(s: String) -> DbError { DbError(s) }
}

#[derive(Debug)]
pub struct Store {
    db_path: PathBuf,
    salt_chars: Vec<char>,
    salt_length: usize,
    hash_iterations: u32,
}

impl Store {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Self {
        let db_path = db_path.as_ref().to_path_buf();
        log::trace!("Store::new( {} ) called.", db_path.display());

        let salt_chars: Vec<char> = DEFAULT_SALT_CHARS.chars().collect();
        let salt_length = DEFAULT_SALT_LENGTH;
        let hash_iterations = DEFAULT_HASH_ITERATIONS;

        Self { db_path, salt_chars, salt_length, hash_iterations }
    }

    /// Set the length of salt strings to generate.
    ///
    /// Will quietly do nothing if set to zero.
    pub fn set_salt_length(&mut self, new_length: usize) {
        if new_length > 0 {
            self.salt_length = new_length;
        }
    }

    /// Set the number of PBKDF2 rounds used when hashing new passwords.
    ///
    /// Existing hashes carry their own count and are unaffected. Will quietly
    /// do nothing if set to zero.
    pub fn set_hash_iterations(&mut self, iterations: u32) {
        if iterations > 0 {
            self.hash_iterations = iterations;
        }
    }

    /// Generate a new password salt based on the current values of
    /// self.salt_chars and self.salt_length.
    fn generate_salt(&self) -> Result<String, DbError> {
        let dist = distributions::Slice::new(&self.salt_chars)
            .map_err(|_| DbError("Salt character set is empty.".to_owned()))?;
        let rng = rand::thread_rng();
        let new_salt: String = rng.sample_iter(&dist)
            .take(self.salt_length)
            .collect();
        Ok(new_salt)
    }

    fn connect(&self) -> Result<Connection, DbError> {
        log::trace!(
            "Store::connect() called w/path {}",
            self.db_path.display()
        );

        let conn = Connection::open(&self.db_path)
            .map_err(|e| DbError::from(e).annotate("Unable to connect"))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| DbError::from(e).annotate("Unable to enable foreign keys"))?;

        log::trace!("    ...connection successful.");
        Ok(conn)
    }

    pub fn ensure_db_schema(&self) -> Result<(), DbError> {
        log::trace!("Store::ensure_db_schema() called.");

        let mut conn = self.connect()?;
        let t = conn.transaction()
            .map_err(|e| DbError::from(e)
                .annotate("Data DB unable to begin transaction"))?;

        for (create_stmt, _) in SCHEMA.iter() {
            t.execute(create_stmt, [])?;
        }

        t.commit()
            .map_err(|e| DbError::from(e)
                .annotate("Error committing transaction"))
    }

    /**
    Drop all database tables to fully reset database state.

    This is only meant for cleanup after testing. It is advisable to look at
    the ERROR level log output when testing to ensure this method did its job.
    */
    #[cfg(test)]
    pub fn nuke_database(&self) -> Result<(), DbError> {
        log::trace!("Store::nuke_database() called.");

        let conn = self.connect()?;

        for (_, drop_stmt) in SCHEMA.iter().rev() {
            if let Err(e) = conn.execute(drop_stmt, []) {
                let err = DbError::from(e);
                log::error!("Error dropping: {:?}: {}", &drop_stmt, &err.display());
            }
        }
        drop(conn);

        log::trace!("    ....nuking complete.");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::tests::{ensure_logging, scratch_dir};

    use std::ops::{Deref, DerefMut};

    use tempfile::TempDir;

    /// Few enough PBKDF2 rounds that tests don't crawl.
    pub const TEST_ITERATIONS: u32 = 16;

    /// A `Store` whose database file lives in its own temp directory.
    ///
    /// The directory goes away when this is dropped.
    pub struct TestStore {
        pub store: Store,
        pub dir: TempDir,
    }

    impl Deref for TestStore {
        type Target = Store;
        fn deref(&self) -> &Store { &self.store }
    }

    impl DerefMut for TestStore {
        fn deref_mut(&mut self) -> &mut Store { &mut self.store }
    }

    /// A `Store` backed by a fresh file with the schema in place.
    pub fn test_store(prefix: &str) -> TestStore {
        ensure_logging();
        let dir = scratch_dir(prefix);
        let mut store = Store::new(dir.path().join("appraise.db"));
        store.set_hash_iterations(TEST_ITERATIONS);
        store.ensure_db_schema().unwrap();
        TestStore { store, dir }
    }

    #[test]
    fn create_store() {
        let db = test_store("create");

        // Running it again on an existing file is harmless.
        db.ensure_db_schema().unwrap();

        let conn = db.connect().unwrap();
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master
                WHERE type = 'table'
                AND name IN ('users', 'subjects', 'feedback')",
            [],
            |row| row.get(0)
        ).unwrap();
        assert_eq!(n, 3);
        drop(conn);

        db.nuke_database().unwrap();
    }

    #[test]
    fn files_go_away_even_on_panic() {
        let mut dir = std::path::PathBuf::new();
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let db = test_store("unwind");
            dir = db.dir.path().to_path_buf();
            db.insert_subject(1, "no such owner").unwrap();
        }));

        assert!(res.is_err());
        assert!(!dir.as_os_str().is_empty());
        assert!(!dir.exists());
    }

    #[test]
    fn salts() {
        let mut db = test_store("salts");
        let a = db.generate_salt().unwrap();
        let b = db.generate_salt().unwrap();
        assert_eq!(a.len(), DEFAULT_SALT_LENGTH);
        assert_ne!(a, b);

        db.set_salt_length(0);
        assert_eq!(db.generate_salt().unwrap().len(), DEFAULT_SALT_LENGTH);
        db.set_salt_length(4);
        assert_eq!(db.generate_salt().unwrap().len(), 4);
    }
}
