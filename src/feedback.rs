/*!
Subjects, the ratings students give them, and the shapes reports take.
*/
use std::collections::HashMap;

use serde::Serialize;

use crate::criteria::{Criteria, field_name};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Subject {
    pub id: i64,
    pub name: String,
    pub user_id: i64,
}

/// One rating of one subject on one criterion, about to be stored.
#[derive(Clone, Debug, PartialEq)]
pub struct Rating {
    pub subject_id: i64,
    pub criterion: String,
    pub rating: i64,
}

/// Mean rating of one criterion across every response for a subject.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Average {
    pub subject: String,
    pub criterion: String,
    pub average: f64,
}

/// One stored rating, as shown in the per-student listing.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Response {
    pub student_id: String,
    pub subject: String,
    pub criterion: String,
    pub rating: i64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StudentResponses {
    pub rows: Vec<Response>,
    /// Number of distinct student identifiers among `rows`.
    pub n_students: usize,
}

/**
Pick the ratings out of a submitted feedback form.

Every rated criterion of every subject is looked up under its
`criteria::field_name()`. Absent or blank fields are skipped. Values are
trimmed and must parse as integers; the first one that doesn't fails the
whole form. Values are not range-checked.
*/
pub fn collect_ratings(
    subjects: &[Subject],
    criteria: &Criteria,
    form: &HashMap<String, String>,
) -> Result<Vec<Rating>, String> {
    log::trace!(
        "collect_ratings( [ {} subjects ], [ criteria v{} ], [ {} fields ] ) called.",
        subjects.len(), &criteria.version(), form.len()
    );

    let mut ratings: Vec<Rating> = Vec::new();

    for subj in subjects.iter() {
        for crit in criteria.rated() {
            let field = field_name(subj.id, &crit.text);
            let value = match form.get(&field) {
                Some(v) => v.trim(),
                None => { continue; },
            };
            if value.is_empty() {
                continue;
            }

            let rating: i64 = value.parse().map_err(|e| format!(
                "Unable to parse rating {:?} for field {:?}: {}",
                value, &field, &e
            ))?;

            ratings.push(Rating {
                subject_id: subj.id,
                criterion: crit.text.clone(),
                rating,
            });
        }
    }

    log::trace!("    ...collect_ratings() found {} ratings.", ratings.len());
    Ok(ratings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::Criterion;

    fn subjects(ids: &[i64]) -> Vec<Subject> {
        ids.iter()
            .map(|&id| Subject { id, name: format!("Subject {}", id), user_id: 1 })
            .collect()
    }

    fn form(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn only_rated_pairs_become_rows() {
        let crits = Criteria::custom(1, vec![
            Criterion::header("Head"),
            Criterion::rated("A"),
            Criterion::rated("B"),
            Criterion::rated("C"),
        ]).unwrap();
        let subjs = subjects(&[4, 9]);

        // 2 subjects x 3 criteria, 4 of the 6 pairs answered, one blank,
        // plus junk fields that match nothing.
        let f = form(&[
            ("student_id", "S1"),
            ("4_A", "5"),
            ("4_C", " 3 "),
            ("9_A", "1"),
            ("9_B", "2"),
            ("9_C", ""),
            ("4_Head", "5"),
            ("7_A", "4"),
        ]);

        let ratings = collect_ratings(&subjs, &crits, &f).unwrap();
        assert_eq!(ratings.len(), 4);
        assert_eq!(ratings[0], Rating { subject_id: 4, criterion: "A".to_owned(), rating: 5 });
        assert_eq!(ratings[1], Rating { subject_id: 4, criterion: "C".to_owned(), rating: 3 });
        assert_eq!(ratings[2].subject_id, 9);
        assert_eq!(ratings[3].criterion, "B");
    }

    #[test]
    fn ratings_are_not_range_checked() {
        let crits = Criteria::custom(1, vec![Criterion::rated("A")]).unwrap();
        let f = form(&[("1_A", "11"), ("2_A", "-2")]);
        let ratings = collect_ratings(&subjects(&[1, 2]), &crits, &f).unwrap();
        let values: Vec<i64> = ratings.iter().map(|r| r.rating).collect();
        assert_eq!(values, vec![11, -2]);
    }

    #[test]
    fn non_integer_fails_whole_form() {
        let crits = Criteria::custom(1, vec![Criterion::rated("A")]).unwrap();
        let f = form(&[("1_A", "5"), ("2_A", "five")]);
        assert!(collect_ratings(&subjects(&[1, 2]), &crits, &f).is_err());
    }

    #[test]
    fn nothing_rated_nothing_collected() {
        let crits = Criteria::builtin(2).unwrap();
        let f = form(&[("student_id", "S1")]);
        assert!(collect_ratings(&subjects(&[1, 2, 3]), &crits, &f).unwrap().is_empty());
        assert!(collect_ratings(&[], &crits, &f).unwrap().is_empty());
    }
}
