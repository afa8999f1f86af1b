/*!
`Store` methods for subjects.

Every method here is scoped by the owning user's id; one user can neither see
nor touch another's subjects.
*/
use rusqlite::Row;

use super::{Store, DbError};
use crate::feedback::Subject;

fn subject_from_row(row: &Row) -> rusqlite::Result<Subject> {
    Ok(Subject {
        id: row.get("id")?,
        name: row.get("name")?,
        user_id: row.get("user_id")?,
    })
}

impl Store {
    /// Insert a subject for `owner` and return its id.
    ///
    /// Names are taken as given: no trimming, no check for blanks or repeats.
    pub fn insert_subject(
        &self,
        owner: i64,
        name: &str,
    ) -> Result<i64, DbError> {
        log::trace!("Store::insert_subject( {}, {:?} ) called.", &owner, name);

        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO subjects (name, user_id) VALUES (?1, ?2)",
            rusqlite::params![name, owner]
        ).map_err(|e| DbError::from(e).annotate("Error inserting subject"))?;

        Ok(conn.last_insert_rowid())
    }

    /// All of `owner`'s subjects in the order they were created.
    pub fn get_subjects(
        &self,
        owner: i64,
    ) -> Result<Vec<Subject>, DbError> {
        log::trace!("Store::get_subjects( {} ) called.", &owner);

        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, user_id FROM subjects
                WHERE user_id = ?1
                ORDER BY id"
        )?;
        let subjects = stmt.query_map([owner], subject_from_row)?
            .collect::<Result<Vec<Subject>, _>>()?;

        log::trace!("    ...found {} subjects.", subjects.len());
        Ok(subjects)
    }

    /**
    Delete one of `owner`'s subjects along with all feedback given on it.

    Returns the number of subjects deleted, which is zero if `subject_id`
    doesn't exist or belongs to someone else. Neither case is an error.
    */
    pub fn delete_subject(
        &self,
        owner: i64,
        subject_id: i64,
    ) -> Result<usize, DbError> {
        log::trace!("Store::delete_subject( {}, {} ) called.", &owner, &subject_id);

        let mut conn = self.connect()?;
        let t = conn.transaction()?;

        let n_feedback = t.execute(
            "DELETE FROM feedback WHERE subject_id = ?1 AND user_id = ?2",
            [subject_id, owner]
        )?;
        let n_subjects = t.execute(
            "DELETE FROM subjects WHERE id = ?1 AND user_id = ?2",
            [subject_id, owner]
        )?;

        t.commit()?;

        match n_subjects {
            0 => {
                log::debug!(
                    "User {} tried to delete subject {}, which isn't theirs (or doesn't exist).",
                    &owner, &subject_id
                );
            },
            _ => {
                log::trace!(
                    "Deleted subject {} and {} feedback rows.",
                    &subject_id, &n_feedback
                );
            },
        }
        Ok(n_subjects)
    }

    /**
    Delete every subject and every feedback row belonging to `owner`.

    Returns `(subjects deleted, feedback rows deleted)`. There is no undo.
    */
    pub fn reset_user(
        &self,
        owner: i64,
    ) -> Result<(usize, usize), DbError> {
        log::trace!("Store::reset_user( {} ) called.", &owner);

        let mut conn = self.connect()?;
        let t = conn.transaction()?;

        let n_feedback = t.execute(
            "DELETE FROM feedback WHERE user_id = ?1",
            [owner]
        )?;
        let n_subjects = t.execute(
            "DELETE FROM subjects WHERE user_id = ?1",
            [owner]
        )?;

        t.commit()?;

        log::info!(
            "Reset user {}: deleted {} subjects and {} feedback rows.",
            &owner, &n_subjects, &n_feedback
        );
        Ok((n_subjects, n_feedback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::test_store;

    fn user_id(db: &Store, uname: &str) -> i64 {
        db.insert_user(uname, "pw").unwrap();
        db.get_user_by_uname(uname).unwrap().unwrap().id
    }

    #[test]
    fn subjects_in_creation_order() {
        let db = test_store("subjects");
        let alice = user_id(&db, "alice");

        let names = ["Math", "Art", "", "Math"];
        let ids: Vec<i64> = names.iter()
            .map(|n| db.insert_subject(alice, n).unwrap())
            .collect();

        let subjects = db.get_subjects(alice).unwrap();
        let got: Vec<(i64, &str)> = subjects.iter()
            .map(|s| (s.id, s.name.as_str()))
            .collect();
        let expected: Vec<(i64, &str)> = ids.iter().copied()
            .zip(names.iter().copied())
            .collect();
        assert_eq!(got, expected);
        assert!(subjects.iter().all(|s| s.user_id == alice));

        db.nuke_database().unwrap();
    }

    #[test]
    fn owners_are_isolated() {
        let db = test_store("isolation");
        let alice = user_id(&db, "alice");
        let bob = user_id(&db, "bob");

        let math = db.insert_subject(alice, "Math").unwrap();
        let art = db.insert_subject(bob, "Art").unwrap();

        assert_eq!(db.get_subjects(bob).unwrap().len(), 1);
        assert_eq!(db.get_subjects(bob).unwrap()[0].id, art);

        // Bob can't delete Alice's subject; it's a quiet no-op.
        assert_eq!(db.delete_subject(bob, math).unwrap(), 0);
        assert_eq!(db.get_subjects(alice).unwrap().len(), 1);

        // Nor can resetting Bob touch anything of Alice's.
        db.reset_user(bob).unwrap();
        assert!(db.get_subjects(bob).unwrap().is_empty());
        assert_eq!(db.get_subjects(alice).unwrap()[0].id, math);

        assert_eq!(db.delete_subject(alice, math).unwrap(), 1);
        assert_eq!(db.delete_subject(alice, math).unwrap(), 0);
        assert!(db.get_subjects(alice).unwrap().is_empty());

        db.nuke_database().unwrap();
    }

    #[test]
    fn subjects_need_a_real_owner() {
        let db = test_store("orphans");
        assert!(db.insert_subject(424242, "Nobody's").is_err());
        db.nuke_database().unwrap();
    }
}
