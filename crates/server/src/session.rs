//! Session cookies shared with the host application.
//!
//! `ds_csrftoken` carries the session's anti-forgery value in the clear;
//! `ds_actor` carries the signed actor. Both names match what the host sets.

use actix_web::cookie::{Cookie, SameSite};
use actix_web::HttpRequest;
use dbexport_security::{new_csrf_token, read_actor, Actor, Signer};

/// Anti-forgery cookie.
pub const CSRF_COOKIE: &str = "ds_csrftoken";

/// Signed actor cookie.
pub const ACTOR_COOKIE: &str = "ds_actor";

/// The request's anti-forgery value, if it sent a non-empty one.
pub fn csrf_token(req: &HttpRequest) -> Option<String> {
    req.cookie(CSRF_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

/// The request's anti-forgery value, minting one if absent.
///
/// The flag is `true` when the value is new and must be sent back with
/// [`csrf_cookie`].
pub fn csrf_token_or_new(req: &HttpRequest) -> (String, bool) {
    match csrf_token(req) {
        Some(token) => (token, false),
        None => (new_csrf_token(), true),
    }
}

/// Cookie carrying `token`.
pub fn csrf_cookie(token: String) -> Cookie<'static> {
    Cookie::build(CSRF_COOKIE, token)
        .path("/")
        .same_site(SameSite::Lax)
        .finish()
}

/// The signed-in actor, or `None` for anonymous or forged cookies.
pub fn actor(req: &HttpRequest, signer: &Signer) -> Option<Actor> {
    req.cookie(ACTOR_COOKIE)
        .and_then(|c| read_actor(signer, c.value()))
}
