//! Actors and the permission check that gates export links.
//!
//! Permissions default to denied. The only action this crate knows about is
//! [`EXPORT_ACTION`], keyed by actor and database name.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::signer::Signer;

/// Action name checked before an export link is rendered.
pub const EXPORT_ACTION: &str = "export-database";

/// Purpose label for signed actor cookies.
pub const ACTOR_PURPOSE: &str = "actor";

/// The authenticated caller, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Actor id, e.g. `"root"`
    pub id: String,
}

impl Actor {
    /// Create an actor with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

#[derive(Serialize, Deserialize)]
struct ActorCookie {
    a: Actor,
}

/// Sign an actor into a cookie value.
pub fn sign_actor(signer: &Signer, actor: &Actor) -> String {
    signer
        .sign(&ActorCookie { a: actor.clone() }, ACTOR_PURPOSE)
        .unwrap_or_default()
}

/// Read an actor from a signed cookie value. Invalid cookies mean anonymous.
pub fn read_actor(signer: &Signer, cookie: &str) -> Option<Actor> {
    signer
        .unsign::<ActorCookie>(cookie, ACTOR_PURPOSE)
        .ok()
        .map(|c| c.a)
}

/// Decides whether an actor may perform an action on a resource.
pub trait PermissionPolicy: Send + Sync {
    /// Return `true` to allow. Implementations must deny what they don't know.
    fn allows(&self, action: &str, actor: Option<&Actor>, resource: &str) -> bool;
}

/// Denies everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

impl PermissionPolicy for DenyAll {
    fn allows(&self, _action: &str, _actor: Option<&Actor>, _resource: &str) -> bool {
        false
    }
}

/// Grants [`EXPORT_ACTION`] on every database to a fixed set of actor ids.
#[derive(Debug, Clone, Default)]
pub struct ActorAllowList {
    actor_ids: BTreeSet<String>,
}

impl ActorAllowList {
    /// Allow exports for the given actor ids.
    pub fn new<I, S>(actor_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            actor_ids: actor_ids.into_iter().map(Into::into).collect(),
        }
    }
}

impl PermissionPolicy for ActorAllowList {
    fn allows(&self, action: &str, actor: Option<&Actor>, _resource: &str) -> bool {
        action == EXPORT_ACTION
            && actor.map_or(false, |actor| self.actor_ids.contains(&actor.id))
    }
}
