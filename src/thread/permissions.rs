use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::models::review::{ReviewRecord, MAX_REPLY_LEVEL};

/// Role carried by the identity token. Unknown role strings degrade to
/// `User` rather than failing the request.
///
/// `Moderator` exists in the identity model but currently grants nothing
/// beyond what a plain user has: delete rights over other people's records
/// stay with `Admin` alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    User,
    Moderator,
    Admin,
}

impl ActorRole {
    pub fn from_claim(role: &str) -> Self {
        match role {
            "admin" => ActorRole::Admin,
            "moderator" => ActorRole::Moderator,
            _ => ActorRole::User,
        }
    }
}

/// The identity on whose behalf an operation runs. Supplied explicitly to
/// every service call; the engine holds no ambient notion of a current user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub role: ActorRole,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == ActorRole::Admin
    }
}

/// What the requesting actor may do with one node of the thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct NodePermissions {
    pub can_edit: bool,
    pub can_delete: bool,
    pub can_reply: bool,
}

/// Pure permission evaluation for a single record. An anonymous viewer
/// (`actor == None`) gets nothing; authors edit and delete their own
/// records; admins may delete anyone's; replying is open to any signed-in
/// actor as long as the target sits above the nesting cap.
pub fn evaluate(actor: Option<&Actor>, record: &ReviewRecord) -> NodePermissions {
    let Some(actor) = actor else {
        return NodePermissions::default();
    };
    NodePermissions {
        can_edit: actor.id == record.author_id,
        can_delete: actor.id == record.author_id || actor.is_admin(),
        can_reply: record.reply_level < MAX_REPLY_LEVEL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(author: Uuid, reply_level: i32) -> ReviewRecord {
        ReviewRecord {
            id: Uuid::from_u128(10),
            product_id: Uuid::from_u128(11),
            author_id: author,
            parent_id: (reply_level > 0).then(|| Uuid::from_u128(12)),
            reply_level,
            rating: (reply_level == 0).then_some(4),
            comment: "fine".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn actor(id: u128, role: ActorRole) -> Actor {
        Actor { id: Uuid::from_u128(id), role }
    }

    #[test]
    fn anonymous_gets_nothing() {
        let perms = evaluate(None, &record(Uuid::from_u128(1), 0));
        assert_eq!(perms, NodePermissions::default());
    }

    #[test]
    fn author_edits_and_deletes_own_record() {
        let author = actor(1, ActorRole::User);
        let perms = evaluate(Some(&author), &record(author.id, 1));
        assert!(perms.can_edit);
        assert!(perms.can_delete);
        assert!(perms.can_reply);
    }

    #[test]
    fn admin_deletes_but_does_not_edit_foreign_records() {
        let admin = actor(1, ActorRole::Admin);
        let perms = evaluate(Some(&admin), &record(Uuid::from_u128(9), 0));
        assert!(!perms.can_edit);
        assert!(perms.can_delete);
    }

    #[test]
    fn moderator_has_plain_user_rights() {
        let moderator = actor(1, ActorRole::Moderator);
        let user = actor(1, ActorRole::User);
        let rec = record(Uuid::from_u128(9), 2);
        assert_eq!(evaluate(Some(&moderator), &rec), evaluate(Some(&user), &rec));
    }

    #[test]
    fn replying_stops_at_the_deepest_level() {
        let viewer = actor(1, ActorRole::User);
        assert!(evaluate(Some(&viewer), &record(Uuid::from_u128(9), 2)).can_reply);
        assert!(!evaluate(Some(&viewer), &record(Uuid::from_u128(9), 3)).can_reply);
    }

    #[test]
    fn unknown_claim_roles_fall_back_to_user() {
        assert_eq!(ActorRole::from_claim("admin"), ActorRole::Admin);
        assert_eq!(ActorRole::from_claim("moderator"), ActorRole::Moderator);
        assert_eq!(ActorRole::from_claim("viewer"), ActorRole::User);
        assert_eq!(ActorRole::from_claim(""), ActorRole::User);
    }
}
