/*!
The ordered list of criteria students rate each subject on.

Feedback rows store the criterion text verbatim, so the form and the reports
must agree on it character for character. Both read the same `Criteria`
value out of the global state.

A list mixes rated criteria with header rows; headers only title a section of
the form and never collect a rating.
*/
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

pub const DEFAULT_VERSION: u32 = 2;

static PLANNING: &[&str] = &[
    "Aim/Objectives of the subject made clear",
    "Teaching is well planned and organized",
    "Teacher comes well prepared in the subject",
    "Teacher keeps himself/herself updated",
    "Subject matter organized in logical sequence",
];

static DELIVERY: &[&str] = &[
    "Teacher speaks clearly and audibly",
    "Teacher explains concepts well with examples",
    "Pace and level suited to students",
    "Uses variety of teaching methods",
];

static PUNCTUALITY: &[&str] = &[
    "Comes to class on time regularly",
];

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Criterion {
    pub text: String,
    #[serde(default)]
    pub header: bool,
}

impl Criterion {
    pub fn rated(text: &str) -> Self {
        Self { text: text.to_owned(), header: false }
    }

    pub fn header(text: &str) -> Self {
        Self { text: text.to_owned(), header: true }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Criteria {
    version: u32,
    items: Vec<Criterion>,
}

impl Criteria {
    /// One of the lists that ship with the program.
    pub fn builtin(version: u32) -> Result<Criteria, String> {
        log::trace!("Criteria::builtin( {} ) called.", &version);

        let items: Vec<Criterion> = match version {
            1 => PLANNING.iter()
                .chain(DELIVERY.iter())
                .chain(PUNCTUALITY.iter())
                .map(|t| Criterion::rated(t))
                .collect(),
            2 => {
                let mut v = Vec::with_capacity(
                    3 + PLANNING.len() + DELIVERY.len() + PUNCTUALITY.len()
                );
                v.push(Criterion::header("Planning and Preparation"));
                v.extend(PLANNING.iter().map(|t| Criterion::rated(t)));
                v.push(Criterion::header("Delivery"));
                v.extend(DELIVERY.iter().map(|t| Criterion::rated(t)));
                v.push(Criterion::header("Punctuality"));
                v.extend(PUNCTUALITY.iter().map(|t| Criterion::rated(t)));
                v
            },
            n => { return Err(format!("There is no built-in criteria version {}.", &n)); },
        };

        Ok(Criteria { version, items })
    }

    /**
    A list supplied by configuration.

    There must be at least one rated criterion, and rated texts must be
    non-blank and distinct; otherwise two form fields would collide.
    */
    pub fn custom(version: u32, items: Vec<Criterion>) -> Result<Criteria, String> {
        log::trace!("Criteria::custom( {}, [ {} items ] ) called.", &version, items.len());

        let mut seen: HashSet<&str> = HashSet::with_capacity(items.len());
        for c in items.iter().filter(|c| !c.header) {
            if c.text.trim().is_empty() {
                return Err("Rated criteria must have non-blank text.".to_owned());
            }
            if !seen.insert(c.text.as_str()) {
                return Err(format!("Criterion {:?} appears more than once.", &c.text));
            }
        }
        if seen.is_empty() {
            return Err("Criteria list has nothing to rate.".to_owned());
        }

        Ok(Criteria { version, items })
    }

    pub fn version(&self) -> u32 { self.version }

    /// Every item in order, headers included.
    pub fn all(&self) -> &[Criterion] { &self.items }

    /// Only the items that collect a rating, in order.
    pub fn rated(&self) -> impl Iterator<Item = &Criterion> {
        self.items.iter().filter(|c| !c.header)
    }

    pub fn is_rated(&self, text: &str) -> bool {
        self.rated().any(|c| c.text == text)
    }
}

/// Name of the form field holding the rating of `criterion` for a subject.
pub fn field_name(subject_id: i64, criterion: &str) -> String {
    format!("{}_{}", subject_id, criterion)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_versions_agree_on_rated_text() {
        let v1 = Criteria::builtin(1).unwrap();
        let v2 = Criteria::builtin(2).unwrap();

        assert_eq!(v1.all().len(), 10);
        assert!(v1.all().iter().all(|c| !c.header));
        assert_eq!(v2.all().len(), 13);
        assert_eq!(v2.all().iter().filter(|c| c.header).count(), 3);
        assert!(v2.all()[0].header);

        let r1: Vec<&str> = v1.rated().map(|c| c.text.as_str()).collect();
        let r2: Vec<&str> = v2.rated().map(|c| c.text.as_str()).collect();
        assert_eq!(r1, r2);

        assert!(v2.is_rated("Pace and level suited to students"));
        assert!(!v2.is_rated("Delivery"));
        assert!(Criteria::builtin(3).is_err());
    }

    #[test]
    fn custom_lists_are_checked() {
        let ok = Criteria::custom(9, vec![
            Criterion::header("Section"),
            Criterion::rated("criterion A"),
            Criterion::rated("criterion B"),
        ]).unwrap();
        assert_eq!(ok.version(), 9);
        assert_eq!(ok.rated().count(), 2);

        assert!(Criteria::custom(1, vec![]).is_err());
        assert!(Criteria::custom(1, vec![Criterion::header("only a header")]).is_err());
        assert!(Criteria::custom(1, vec![Criterion::rated("  ")]).is_err());
        assert!(Criteria::custom(1, vec![
            Criterion::rated("twice"),
            Criterion::rated("twice"),
        ]).is_err());

        // Headers may repeat; they never become fields.
        assert!(Criteria::custom(1, vec![
            Criterion::header("Part"),
            Criterion::rated("one"),
            Criterion::header("Part"),
            Criterion::rated("two"),
        ]).is_ok());
    }

    #[test]
    fn field_names() {
        assert_eq!(field_name(3, "criterion A"), "3_criterion A");
    }
}
