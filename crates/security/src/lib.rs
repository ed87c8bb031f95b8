//! Signed export links and access control for dbexport.
//!
//! This crate provides the [`Signer`] used for every tamper-evident value,
//! the [`LinkAuthorizer`] that mints and checks export tokens, and the
//! [`PermissionPolicy`] consulted before a link is shown.

#![warn(missing_docs)]

pub mod permissions;
pub mod signer;
pub mod token;

pub use permissions::{
    read_actor, sign_actor, Actor, ActorAllowList, DenyAll, PermissionPolicy, ACTOR_PURPOSE,
    EXPORT_ACTION,
};
pub use signer::Signer;
pub use token::{csrf_matches, new_csrf_token, ExportClaims, LinkAuthorizer, EXPORT_PURPOSE};
