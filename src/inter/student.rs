/*!
The public feedback form students fill out.

Students don't log in. The link they're given carries the instructor's user
id, and that's all it takes to see the form and submit ratings.
*/
use std::collections::HashMap;

use axum::extract::{Extension, Form, Query};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    criteria::{Criteria, field_name},
    feedback::{self, Subject},
};
use super::*;

#[derive(Debug, Deserialize)]
pub struct FeedbackLink {
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct RowData<'a> {
    text: &'a str,
    header: bool,
    field: String,
}

#[derive(Debug, Serialize)]
struct SubjectData<'a> {
    id: i64,
    name: &'a str,
    rows: Vec<RowData<'a>>,
}

/// Pair every subject with the full criteria list (headers included) and the
/// form field name each rated row posts under.
fn form_rows<'a>(subjects: &'a [Subject], criteria: &'a Criteria) -> Vec<SubjectData<'a>> {
    subjects.iter()
        .map(|s| SubjectData {
            id: s.id,
            name: &s.name,
            rows: criteria.all().iter()
                .map(|c| RowData {
                    text: &c.text,
                    header: c.header,
                    field: if c.header { String::new() } else { field_name(s.id, &c.text) },
                }).collect(),
        }).collect()
}

pub fn respond_invalid_link() -> Response {
    respond_text(StatusCode::BAD_REQUEST, "Invalid feedback link!")
}

/**
Resolve the owner named by a feedback link.

`Ok(None)` means the link is bad: the id is missing, isn't an integer, or
doesn't belong to anyone.
*/
fn link_owner(glob: &Glob, link: &FeedbackLink) -> Result<Option<i64>, Response> {
    let owner: i64 = match link.user_id.as_deref().map(|s| s.trim().parse::<i64>()) {
        Some(Ok(n)) => n,
        Some(Err(_)) | None => {
            log::debug!("Feedback link with unusable user_id {:?}.", &link.user_id);
            return Ok(None);
        },
    };

    match glob.store.get_user_by_id(owner) {
        Ok(Some(_)) => Ok(Some(owner)),
        Ok(None) => {
            log::debug!("Feedback link names nonexistent user {}.", &owner);
            Ok(None)
        },
        Err(e) => {
            log::error!("Store::get_user_by_id( {} ): {}", &owner, &e);
            Err(html_500())
        },
    }
}

pub async fn form(
    Extension(glob): Extension<Arc<Glob>>,
    Query(link): Query<FeedbackLink>,
) -> Response {
    log::trace!("student::form( {:?} ) called.", &link);

    let owner = match link_owner(&glob, &link) {
        Ok(Some(n)) => n,
        Ok(None) => { return respond_invalid_link(); },
        Err(r) => { return r; },
    };

    let subjects = match glob.store.get_subjects(owner) {
        Ok(s) => s,
        Err(e) => {
            log::error!("Store::get_subjects( {} ): {}", &owner, &e);
            return html_500();
        },
    };

    let data = json!({
        "user_id": owner,
        "subjects": form_rows(&subjects, &glob.criteria),
        "criteria_version": glob.criteria.version(),
    });

    serve_template(StatusCode::OK, "feedback", &data, vec![])
}

pub async fn submit(
    Extension(glob): Extension<Arc<Glob>>,
    Query(link): Query<FeedbackLink>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    log::trace!(
        "student::submit( {:?}, [ {} fields ] ) called.",
        &link, form.len()
    );

    let owner = match link_owner(&glob, &link) {
        Ok(Some(n)) => n,
        Ok(None) => { return respond_invalid_link(); },
        Err(r) => { return r; },
    };

    let student_id = match form.get("student_id") {
        Some(s) => s.as_str(),
        None => {
            return respond_text(StatusCode::BAD_REQUEST, "Missing student ID!");
        },
    };

    let subjects = match glob.store.get_subjects(owner) {
        Ok(s) => s,
        Err(e) => {
            log::error!("Store::get_subjects( {} ): {}", &owner, &e);
            return html_500();
        },
    };

    let ratings = match feedback::collect_ratings(&subjects, &glob.criteria, &form) {
        Ok(r) => r,
        Err(e) => {
            log::debug!("Rejecting feedback from {:?}: {}", student_id, &e);
            return respond_text(StatusCode::BAD_REQUEST, "Invalid rating value!");
        },
    };

    match glob.store.insert_feedback(owner, student_id, &ratings) {
        Ok(n) => {
            log::info!(
                "Recorded {} ratings from {:?} for user {}.",
                &n, student_id, &owner
            );
        },
        Err(e) => {
            log::error!(
                "Store::insert_feedback( {}, {:?}, [ {} ratings ] ): {}",
                &owner, student_id, ratings.len(), &e
            );
            return html_500();
        },
    }

    Redirect::to("/success").into_response()
}

pub async fn success() -> Response {
    serve_template(StatusCode::OK, "success", &json!({}), vec![])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::Criterion;

    #[test]
    fn rows_keep_headers_without_fields() {
        let crits = Criteria::custom(1, vec![
            Criterion::header("Part one"),
            Criterion::rated("criterion A"),
        ]).unwrap();
        let subjects = vec![
            Subject { id: 4, name: "Math".to_owned(), user_id: 1 },
            Subject { id: 6, name: "Art".to_owned(), user_id: 1 },
        ];

        let rows = form_rows(&subjects, &crits);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].name, "Art");
        assert_eq!(rows[0].rows.len(), 2);
        assert!(rows[0].rows[0].header);
        assert_eq!(rows[0].rows[0].field, "");
        assert_eq!(rows[0].rows[1].field, "4_criterion A");
        assert_eq!(rows[1].rows[1].field, "6_criterion A");
    }
}
