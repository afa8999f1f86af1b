/*!
Interoperation between the client (browser) and server.

(Not the application and the database; that's covered by `store`.)
*/
use std::{
    fmt::Debug,
    path::Path,
    sync::Arc,
};

use axum::{
    extract::Extension,
    http::{header, Request, StatusCode},
    http::header::{HeaderName, HeaderValue},
    middleware::{self, Next},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use axum_extra::extract::cookie::CookieJar;
use handlebars::Handlebars;
use once_cell::sync::OnceCell;
use serde::Serialize;
use tower_http::services::ServeDir;

use crate::auth;
use crate::config::Glob;

pub mod account;
pub mod admin;
pub mod student;

static TEMPLATES: OnceCell<Handlebars> = OnceCell::new();

static HTML_500: &str = r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<title>appraise | Error</title>
<link rel="stylesheet" href="/static/appraise.css">
</head>
<body>
<h1>Internal Server Error</h1>
<p>(Error 500)</p>
<p>Something went wrong on our end. No further or more
helpful information is available about the problem.</p>
</body>
</html>"#;

trait AddHeaders: IntoResponse + Sized {
    fn add_headers(self, mut new_headers: Vec<(HeaderName, HeaderValue)>) -> Response {
        let mut r = self.into_response();
        let r_headers = r.headers_mut();
        for (name, value) in new_headers.drain(..) {
            r_headers.insert(name, value);
        }

        r
    }
}

impl<T: IntoResponse + Sized> AddHeaders for T {}

/**
Initializes the resources used in this module. This function should be called
before any functionality of this module or any of its submodules is used.

Currently the only thing that happens here is loading the templates used by
`serve_template()`, which will respond with a 500 until `init()` has been
called.

The argument is the path to the directory where the templates used by
`serve_template()` can be found. Calling it again after a successful call
does nothing.
*/
pub fn init<P: AsRef<Path>>(template_dir: P) -> Result<(), String> {
    let template_dir = template_dir.as_ref();

    TEMPLATES.get_or_try_init(|| {
        let mut h = Handlebars::new();
        #[cfg(debug_assertions)]
        h.set_dev_mode(true);
        h.register_templates_directory(".html", template_dir)
            .map_err(|e| format!(
                "Error registering templates directory {}: {}",
                template_dir.display(), &e
            ))?;

        let mut names: Vec<&String> = h.get_templates().keys().collect();
        names.sort();
        log::info!("Registered templates: {:?}", &names);
        Ok::<Handlebars, String>(h)
    })?;

    Ok(())
}

/// Assemble the whole application.
pub fn router<P: AsRef<Path>>(glob: Arc<Glob>, static_dir: P) -> Router {
    let admin_routes = Router::new()
        .route("/admin", get(admin::show).post(admin::add_subject))
        .route("/delete_subject/:subject_id", get(admin::delete_subject))
        .route("/new_feedback", get(admin::new_feedback))
        .route("/view_feedback", get(admin::view_feedback))
        .route("/export_excel", get(admin::export_excel))
        .route("/student_responses", get(admin::student_responses))
        .route("/download_student_responses", get(admin::download_student_responses))
        .route_layer(middleware::from_fn(require_auth));

    Router::new()
        .route("/", get(account::signup_page).post(account::signup))
        .route("/signup", get(account::signup_page).post(account::signup))
        .route("/login", get(account::login_page).post(account::login))
        .route("/logout", get(account::logout))
        .route("/feedback", get(student::form).post(student::submit))
        .route("/success", get(student::success))
        .merge(admin_routes)
        .nest_service("/static", ServeDir::new(static_dir.as_ref()))
        .layer(Extension(glob))
}

/**
Return an HTML response in the case of an unrecoverable* error.

(*"Unrecoverable" from the perspective of fielding the current request,
not from the perspective of the program crashing.)
*/
pub fn html_500() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(HTML_500)
    ).into_response()
}

/// An undecorated plain-text response.
pub fn respond_text(code: StatusCode, text: &'static str) -> Response {
    log::trace!("respond_text( {}, {:?} ) called.", &code, text);

    (code, text).into_response()
}

pub fn serve_template<S>(
    code: StatusCode,
    template_name: &str,
    data: &S,
    addl_headers: Vec<(HeaderName, HeaderValue)>
) -> Response
where
    S: Serialize + Debug
{
    log::trace!("serve_template( {}, {:?}, ... ) called.", &code, template_name);

    let templates = match TEMPLATES.get() {
        Some(t) => t,
        None => {
            log::error!("serve_template( {:?} ) called before inter::init().", template_name);
            return html_500();
        },
    };

    match templates.render(template_name, data) {
        Ok(response_body) => (
            code,
            Html(response_body)
        ).add_headers(addl_headers),
        Err(e) => {
            log::error!(
                "Error rendering template {:?} with data {:?}:\n{}",
                template_name, data, &e
            );
            html_500()
        },
    }
}

/// A file download with the given name and content type.
pub fn respond_download(filename: &str, content_type: &'static str, body: Vec<u8>) -> Response {
    log::trace!(
        "respond_download( {:?}, {:?}, [ {} bytes ] ) called.",
        filename, content_type, body.len()
    );

    let disposition = format!("attachment; filename=\"{}\"", filename);
    let disposition = match HeaderValue::from_str(&disposition) {
        Ok(v) => v,
        Err(e) => {
            log::error!("Error converting {:?} into header value: {}", &disposition, &e);
            return html_500();
        },
    };

    (StatusCode::OK, body).add_headers(vec![
        (header::CONTENT_TYPE, HeaderValue::from_static(content_type)),
        (header::CONTENT_DISPOSITION, disposition),
        (header::CACHE_CONTROL, HeaderValue::from_static("no-store")),
    ])
}

/**
Middleware guarding the instructor-only routes.

A request without a live session key gets redirected to the login page.
Otherwise the `auth::Session` is attached to the request's extensions, where
the handlers pick it up.
*/
pub async fn require_auth<B>(
    mut req: Request<B>,
    next: Next<B>,
) -> Response {
    let glob: Arc<Glob> = match req.extensions().get::<Arc<Glob>>() {
        Some(glob) => glob.clone(),
        None => {
            log::error!("require_auth(): global state missing from request extensions.");
            return html_500();
        },
    };

    let key = match auth::session_key(&CookieJar::from_headers(req.headers())) {
        Some(k) => k,
        None => {
            log::trace!("No session key on request for {}.", req.uri());
            return Redirect::to("/login").into_response();
        },
    };

    let session = glob.auth().read().await.check_key(&key);

    match session {
        Some(s) => {
            log::trace!("{} requested by {:?}.", req.uri(), &s.uname);
            req.extensions_mut().insert(s);
            next.run(req).await
        },
        None => {
            log::trace!("Unknown or expired session key for {}.", req.uri());
            Redirect::to("/login").into_response()
        },
    }
}
