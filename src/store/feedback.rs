/*!
`Store` methods for storing ratings and reading them back out as reports.
*/
use std::collections::HashSet;

use super::{Store, DbError};
use crate::feedback::{Average, Rating, Response, StudentResponses};

impl Store {
    /**
    Store one student's ratings for subjects belonging to `owner`.

    The whole batch goes in one transaction, so a failure partway through
    leaves nothing behind. Returns the number of rows inserted.

    Callers are expected to have built `ratings` from `owner`'s own subjects
    (see `feedback::collect_ratings()`); nothing here checks that.
    */
    pub fn insert_feedback(
        &self,
        owner: i64,
        student_id: &str,
        ratings: &[Rating],
    ) -> Result<usize, DbError> {
        log::trace!(
            "Store::insert_feedback( {}, {:?}, [ {} ratings ] ) called.",
            &owner, student_id, ratings.len()
        );

        if ratings.is_empty() {
            return Ok(0);
        }

        let mut conn = self.connect()?;
        let t = conn.transaction()?;

        let mut n_inserted: usize = 0;
        {
            let mut stmt = t.prepare(
                "INSERT INTO feedback (student_id, subject_id, criteria, rating, user_id)
                    VALUES (?1, ?2, ?3, ?4, ?5)"
            )?;
            for r in ratings.iter() {
                n_inserted += stmt.execute(rusqlite::params![
                    student_id, r.subject_id, r.criterion, r.rating, owner
                ]).map_err(|e| DbError::from(e).annotate(&format!(
                    "Error inserting rating for subject {}, {:?}",
                    &r.subject_id, &r.criterion
                )))?;
            }
        }

        t.commit()
            .map_err(|e| DbError::from(e)
                .annotate("Error committing feedback"))?;

        log::trace!("Inserted {} feedback rows from {:?}.", &n_inserted, student_id);
        Ok(n_inserted)
    }

    /// Mean rating per (subject name, criterion), sorted by subject name and
    /// then criterion.
    pub fn get_averages(
        &self,
        owner: i64,
    ) -> Result<Vec<Average>, DbError> {
        log::trace!("Store::get_averages( {} ) called.", &owner);

        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT s.name AS subject, f.criteria AS criterion,
                    AVG(f.rating) AS average
                FROM feedback f
                JOIN subjects s ON f.subject_id = s.id
                WHERE f.user_id = ?1
                GROUP BY s.name, f.criteria
                ORDER BY s.name, f.criteria"
        )?;
        let averages = stmt.query_map([owner], |row| {
            Ok(Average {
                subject: row.get("subject")?,
                criterion: row.get("criterion")?,
                average: row.get("average")?,
            })
        })?.collect::<Result<Vec<Average>, _>>()?;

        Ok(averages)
    }

    /// Every stored rating, sorted by student, subject, then criterion,
    /// along with how many distinct students responded.
    pub fn get_student_responses(
        &self,
        owner: i64,
    ) -> Result<StudentResponses, DbError> {
        log::trace!("Store::get_student_responses( {} ) called.", &owner);

        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT f.student_id, s.name AS subject, f.criteria AS criterion,
                    f.rating
                FROM feedback f
                JOIN subjects s ON f.subject_id = s.id
                WHERE f.user_id = ?1
                ORDER BY f.student_id, f.subject_id, f.criteria"
        )?;
        let rows = stmt.query_map([owner], |row| {
            Ok(Response {
                student_id: row.get("student_id")?,
                subject: row.get("subject")?,
                criterion: row.get("criterion")?,
                rating: row.get("rating")?,
            })
        })?.collect::<Result<Vec<Response>, _>>()?;

        let n_students = rows.iter()
            .map(|r| r.student_id.as_str())
            .collect::<HashSet<&str>>()
            .len();

        Ok(StudentResponses { rows, n_students })
    }
}
