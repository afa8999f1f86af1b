/*!
Signing up, logging in, and logging out.
*/
use axum::extract::{Extension, Form};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::{self, AuthResult},
    store::{DbError, Store},
};
use super::*;

/// Form data from the signup and login pages.
#[derive(Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/**
Run `f` against the `Store` on tokio's blocking thread pool.

Signup and login hash a password with tens of thousands of PBKDF2 rounds;
that work stays off the async runtime's thread.
*/
async fn blocking<T, F>(glob: &Arc<Glob>, f: F) -> Result<T, DbError>
where
    T: Send + 'static,
    F: FnOnce(&Store) -> Result<T, DbError> + Send + 'static,
{
    let glob = glob.clone();
    tokio::task::spawn_blocking(move || f(&glob.store))
        .await
        .map_err(|e| DbError::from(format!("Blocking store task failed: {}", &e)))?
}

pub async fn signup_page() -> Response {
    serve_template(StatusCode::OK, "signup", &json!({}), vec![])
}

pub async fn login_page() -> Response {
    serve_template(StatusCode::OK, "login", &json!({}), vec![])
}

pub async fn signup(
    Extension(glob): Extension<Arc<Glob>>,
    Form(form): Form<Credentials>,
) -> Response {
    log::trace!("account::signup( {:?} ) called.", &form.username);

    let uname = form.username.clone();
    let res = blocking(&glob, move |store| {
        store.insert_user(&form.username, &form.password)
    }).await;

    match res {
        Err(e) => {
            log::error!("Store::insert_user( {:?}, ... ): {}", &uname, &e);
            html_500()
        },
        Ok(AuthResult::Ok) => Redirect::to("/login").into_response(),
        Ok(AuthResult::DuplicateUname) => respond_text(
            StatusCode::CONFLICT,
            "Username already exists!"
        ),
        Ok(x) => {
            log::warn!(
                "Store::insert_user( {:?}, ... ) returned {:?}, which shouldn't happen.",
                &uname, &x
            );
            html_500()
        },
    }
}

pub fn respond_bad_password() -> Response {
    respond_text(StatusCode::UNAUTHORIZED, "Invalid username or password!")
}

pub async fn login(
    Extension(glob): Extension<Arc<Glob>>,
    jar: CookieJar,
    Form(form): Form<Credentials>,
) -> Response {
    log::trace!("account::login( {:?} ) called.", &form.username);

    let uname = form.username.clone();
    let res = blocking(&glob, move |store| {
        store.check_password(&form.username, &form.password)
    }).await;

    let u = match res {
        Err(e) => {
            log::error!("Store::check_password( {:?}, ... ): {}", &uname, &e);
            return html_500();
        },
        Ok(Ok(u)) => u,
        // Unknown users and wrong passwords look the same from outside.
        Ok(Err(x)) => {
            log::debug!("Failed login for {:?}: {:?}", &uname, &x);
            return respond_bad_password();
        },
    };

    let key = glob.auth().write().await.issue_key(u.id, &u.uname);
    log::info!("User {:?} logged in.", &u.uname);

    (jar.add(auth::session_cookie(key)), Redirect::to("/admin")).into_response()
}

pub async fn logout(
    Extension(glob): Extension<Arc<Glob>>,
    jar: CookieJar,
) -> Response {
    log::trace!("account::logout() called.");

    if let Some(key) = auth::session_key(&jar) {
        glob.auth().write().await.revoke(&key);
    }

    (jar.remove(auth::expired_cookie()), Redirect::to("/login")).into_response()
}
