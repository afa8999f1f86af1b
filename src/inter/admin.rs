/*!
The instructor's pages: managing subjects and reading back feedback.

Every handler here sits behind `require_auth()` and works only on the data of
the user whose `Session` it was handed.
*/
use axum::{
    extract::{Extension, Form, Path},
    http::HeaderMap,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    auth::Session,
    export,
    feedback::Average,
    user::User,
};
use super::*;

#[derive(Debug, Deserialize)]
pub struct SubjectData {
    pub subject: String,
}

/// An `Average` with its number already formatted for display.
#[derive(Debug, Serialize)]
struct AverageRow<'a> {
    subject: &'a str,
    criterion: &'a str,
    average: String,
}

impl<'a> From<&'a Average> for AverageRow<'a> {
    fn from(a: &'a Average) -> Self {
        AverageRow {
            subject: &a.subject,
            criterion: &a.criterion,
            average: format!("{:.2}", a.average),
        }
    }
}

/// The link students use to reach this instructor's feedback form.
///
/// Absolute if the request said which host it was for.
fn feedback_link(headers: &HeaderMap, user_id: i64) -> String {
    let path = format!("/feedback?user_id={}", user_id);
    match headers.get(header::HOST).and_then(|h| h.to_str().ok()) {
        Some(host) => format!("http://{}{}", host, &path),
        None => path,
    }
}

fn render_admin(glob: &Glob, session: &Session, headers: &HeaderMap) -> Response {
    let subjects = match glob.store.get_subjects(session.user_id) {
        Ok(subjects) => subjects,
        Err(e) => {
            log::error!("Store::get_subjects( {} ): {}", &session.user_id, &e);
            return html_500();
        },
    };

    let data = json!({
        "uname": &session.uname,
        "subjects": &subjects,
        "feedback_link": feedback_link(headers, session.user_id),
    });

    serve_template(StatusCode::OK, "admin", &data, vec![])
}

pub async fn show(
    Extension(glob): Extension<Arc<Glob>>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
) -> Response {
    log::trace!("admin::show() called by {:?}.", &session.uname);

    render_admin(&glob, &session, &headers)
}

pub async fn add_subject(
    Extension(glob): Extension<Arc<Glob>>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
    Form(form): Form<SubjectData>,
) -> Response {
    log::trace!(
        "admin::add_subject( {:?} ) called by {:?}.",
        &form.subject, &session.uname
    );

    if let Err(e) = glob.store.insert_subject(session.user_id, &form.subject) {
        log::error!(
            "Store::insert_subject( {}, {:?} ): {}",
            &session.user_id, &form.subject, &e
        );
        return html_500();
    }

    render_admin(&glob, &session, &headers)
}

pub async fn delete_subject(
    Extension(glob): Extension<Arc<Glob>>,
    Extension(session): Extension<Session>,
    Path(subject_id): Path<i64>,
) -> Response {
    log::trace!(
        "admin::delete_subject( {} ) called by {:?}.",
        &subject_id, &session.uname
    );

    if let Err(e) = glob.store.delete_subject(session.user_id, subject_id) {
        log::error!(
            "Store::delete_subject( {}, {} ): {}",
            &session.user_id, &subject_id, &e
        );
        return html_500();
    }

    Redirect::to("/admin").into_response()
}

pub async fn new_feedback(
    Extension(glob): Extension<Arc<Glob>>,
    Extension(session): Extension<Session>,
) -> Response {
    log::trace!("admin::new_feedback() called by {:?}.", &session.uname);

    if let Err(e) = glob.store.reset_user(session.user_id) {
        log::error!("Store::reset_user( {} ): {}", &session.user_id, &e);
        return html_500();
    }

    Redirect::to("/admin").into_response()
}

pub async fn view_feedback(
    Extension(glob): Extension<Arc<Glob>>,
    Extension(session): Extension<Session>,
) -> Response {
    log::trace!("admin::view_feedback() called by {:?}.", &session.uname);

    let averages = match glob.store.get_averages(session.user_id) {
        Ok(a) => a,
        Err(e) => {
            log::error!("Store::get_averages( {} ): {}", &session.user_id, &e);
            return html_500();
        },
    };
    let rows: Vec<AverageRow> = averages.iter().map(AverageRow::from).collect();

    let data = json!({
        "uname": &session.uname,
        "feedbacks": &rows,
    });

    serve_template(StatusCode::OK, "view_feedback", &data, vec![])
}

pub async fn export_excel(
    Extension(glob): Extension<Arc<Glob>>,
    Extension(session): Extension<Session>,
) -> Response {
    log::trace!("admin::export_excel() called by {:?}.", &session.uname);

    let averages = match glob.store.get_averages(session.user_id) {
        Ok(a) => a,
        Err(e) => {
            log::error!("Store::get_averages( {} ): {}", &session.user_id, &e);
            return html_500();
        },
    };

    let bytes = match export::averages_to_xlsx(&averages) {
        Ok(b) => b,
        Err(e) => {
            log::error!("Exporting averages for {:?}: {}", &session.uname, &e);
            return html_500();
        },
    };

    let filename = format!("feedback_{}.xlsx", User::file_stem(&session.uname));
    respond_download(&filename, export::XLSX_MIME, bytes)
}

pub async fn student_responses(
    Extension(glob): Extension<Arc<Glob>>,
    Extension(session): Extension<Session>,
) -> Response {
    log::trace!("admin::student_responses() called by {:?}.", &session.uname);

    let responses = match glob.store.get_student_responses(session.user_id) {
        Ok(r) => r,
        Err(e) => {
            log::error!("Store::get_student_responses( {} ): {}", &session.user_id, &e);
            return html_500();
        },
    };

    let data = json!({
        "uname": &session.uname,
        "n_students": responses.n_students,
        "responses": &responses.rows,
    });

    serve_template(StatusCode::OK, "student_responses", &data, vec![])
}

pub async fn download_student_responses(
    Extension(glob): Extension<Arc<Glob>>,
    Extension(session): Extension<Session>,
) -> Response {
    log::trace!("admin::download_student_responses() called by {:?}.", &session.uname);

    let responses = match glob.store.get_student_responses(session.user_id) {
        Ok(r) => r,
        Err(e) => {
            log::error!("Store::get_student_responses( {} ): {}", &session.user_id, &e);
            return html_500();
        },
    };

    let bytes = match export::responses_to_xlsx(&responses.rows) {
        Ok(b) => b,
        Err(e) => {
            log::error!("Exporting responses for {:?}: {}", &session.uname, &e);
            return html_500();
        },
    };

    let filename = format!("student_responses_{}.xlsx", User::file_stem(&session.uname));
    respond_download(&filename, export::XLSX_MIME, bytes)
}
