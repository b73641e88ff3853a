//! Orchestration of the review thread lifecycle.
//!
//! [`ThreadService`] is the only surface handlers talk to. Reads go
//! store → tree builder → permission annotation; every mutation validates
//! and permission-checks locally, performs a single store round trip, then
//! re-reads the whole product thread so the caller always gets a fresh,
//! consistent forest. There is no incremental patching and no snapshot
//! caching across the mutation boundary.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::db::models::review::{NewRecord, UpdateFields, MAX_REPLY_LEVEL};
use crate::db::queries::ReviewStore;
use crate::thread::error::ThreadError;
use crate::thread::permissions::{evaluate, Actor};
use crate::thread::tree::{self, ThreadForest, ThreadNode};

#[derive(Clone)]
pub struct ThreadService {
    store: Arc<dyn ReviewStore>,
}

impl ThreadService {
    pub fn new(store: Arc<dyn ReviewStore>) -> Self {
        Self { store }
    }

    /// Fetches one product's flat records and rebuilds the forest, with
    /// every node's permissions evaluated for `actor` (anonymous viewers
    /// get all-false permissions).
    pub async fn fetch_thread(
        &self,
        product_id: Uuid,
        actor: Option<&Actor>,
    ) -> Result<ThreadForest, ThreadError> {
        let records = self.store.fetch_for_product(product_id).await?;
        let mut forest = tree::build(records);
        annotate(&mut forest.roots, actor);
        Ok(forest)
    }

    /// Creates the actor's top-level review of a product. The store's
    /// uniqueness constraint decides whether the author already reviewed it;
    /// a `DuplicateReview` verdict is surfaced, never retried.
    pub async fn add_review(
        &self,
        product_id: Uuid,
        actor: &Actor,
        rating: i32,
        comment: String,
    ) -> Result<ThreadForest, ThreadError> {
        let record = NewRecord {
            product_id,
            author_id: actor.id,
            parent_id: None,
            reply_level: 0,
            rating: Some(rating),
            comment,
        };
        record.validate()?;
        let inserted = self.store.insert(record).await?;
        info!(review = %inserted.id, product = %product_id, "review created");
        self.fetch_thread(product_id, Some(actor)).await
    }

    /// Replies to an existing review or reply. The new record's level is
    /// derived from the parent actually in the store, never from the
    /// caller.
    pub async fn add_reply(
        &self,
        parent_id: Uuid,
        actor: &Actor,
        comment: String,
    ) -> Result<ThreadForest, ThreadError> {
        if comment.trim().is_empty() {
            return Err(ThreadError::Validation("comment must not be empty".into()));
        }
        let parent = self
            .store
            .fetch_by_id(parent_id)
            .await?
            .ok_or(ThreadError::NotFound(parent_id))?;
        let new_level = parent.reply_level + 1;
        if new_level > MAX_REPLY_LEVEL {
            return Err(ThreadError::MaxDepthExceeded);
        }
        let record = NewRecord {
            product_id: parent.product_id,
            author_id: actor.id,
            parent_id: Some(parent.id),
            reply_level: new_level,
            rating: None,
            comment,
        };
        record.validate()?;
        let inserted = self.store.insert(record).await?;
        info!(reply = %inserted.id, parent = %parent_id, "reply created");
        self.fetch_thread(parent.product_id, Some(actor)).await
    }

    /// Edits the actor's own top-level review. `rating: None` keeps the
    /// current stars.
    ///
    /// Contract note: an admin's own review is pinned to a fixed rating by
    /// storefront convention and excluded from rating averages upstream;
    /// that policy lives in the display layer and is deliberately not
    /// enforced here.
    pub async fn update_review(
        &self,
        id: Uuid,
        actor: &Actor,
        rating: Option<i32>,
        comment: String,
    ) -> Result<ThreadForest, ThreadError> {
        let record = self.store.fetch_by_id(id).await?.ok_or(ThreadError::NotFound(id))?;
        if !record.is_top_level() {
            return Err(ThreadError::Validation("record is a reply, not a review".into()));
        }
        if !evaluate(Some(actor), &record).can_edit {
            return Err(ThreadError::PermissionDenied("only the author may edit a review"));
        }
        if let Some(rating) = rating {
            if !(1..=5).contains(&rating) {
                return Err(ThreadError::Validation(format!(
                    "rating must be between 1 and 5, got {rating}"
                )));
            }
        }
        if comment.trim().is_empty() {
            return Err(ThreadError::Validation("comment must not be empty".into()));
        }
        self.store.update(id, UpdateFields { rating, comment: Some(comment) }).await?;
        info!(review = %id, "review updated");
        self.fetch_thread(record.product_id, Some(actor)).await
    }

    /// Edits the actor's own reply. Replies have no rating to change.
    pub async fn update_reply(
        &self,
        id: Uuid,
        actor: &Actor,
        comment: String,
    ) -> Result<ThreadForest, ThreadError> {
        let record = self.store.fetch_by_id(id).await?.ok_or(ThreadError::NotFound(id))?;
        if record.is_top_level() {
            return Err(ThreadError::Validation("record is a review, not a reply".into()));
        }
        if !evaluate(Some(actor), &record).can_edit {
            return Err(ThreadError::PermissionDenied("only the author may edit a reply"));
        }
        if comment.trim().is_empty() {
            return Err(ThreadError::Validation("comment must not be empty".into()));
        }
        self.store.update(id, UpdateFields { rating: None, comment: Some(comment) }).await?;
        info!(reply = %id, "reply updated");
        self.fetch_thread(record.product_id, Some(actor)).await
    }

    /// Permanently removes one record — author or admin only. Descendants
    /// are not cascaded; they show up in `orphans` on the refetch this call
    /// already returns.
    pub async fn delete_record(
        &self,
        id: Uuid,
        actor: &Actor,
    ) -> Result<ThreadForest, ThreadError> {
        let record = self.store.fetch_by_id(id).await?.ok_or(ThreadError::NotFound(id))?;
        if !evaluate(Some(actor), &record).can_delete {
            return Err(ThreadError::PermissionDenied(
                "only the author or an admin may delete a record",
            ));
        }
        self.store.delete(id).await?;
        info!(record = %id, "record deleted");
        self.fetch_thread(record.product_id, Some(actor)).await
    }
}

fn annotate(nodes: &mut [ThreadNode], actor: Option<&Actor>) {
    for node in nodes {
        node.permissions = evaluate(actor, &node.record);
        annotate(&mut node.children, actor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::queries::memory::MemoryReviewStore;
    use crate::thread::error::ErrorKind;
    use crate::thread::permissions::ActorRole;

    const PRODUCT: Uuid = Uuid::from_u128(0x50);

    fn user(id: u128) -> Actor {
        Actor { id: Uuid::from_u128(id), role: ActorRole::User }
    }

    fn admin(id: u128) -> Actor {
        Actor { id: Uuid::from_u128(id), role: ActorRole::Admin }
    }

    fn service() -> (Arc<MemoryReviewStore>, ThreadService) {
        let store = Arc::new(MemoryReviewStore::new());
        let service = ThreadService::new(store.clone());
        (store, service)
    }

    /// The single node id of a one-root forest, or the deepest node of the
    /// first chain.
    fn deepest_id(forest: &ThreadForest) -> Uuid {
        let mut node = &forest.roots[0];
        while let Some(child) = node.children.first() {
            node = child;
        }
        node.record.id
    }

    // ── 1. scenario: four generations, the fifth is rejected ────────────

    #[tokio::test]
    async fn reply_chain_stops_after_four_generations() {
        let (store, svc) = service();
        let alice = user(1);

        let forest = svc.add_review(PRODUCT, &alice, 4, "root".into()).await.unwrap();
        let mut target = deepest_id(&forest);
        for depth in 1..=3 {
            let forest = svc
                .add_reply(target, &alice, format!("reply at level {depth}"))
                .await
                .unwrap();
            target = deepest_id(&forest);
        }
        assert_eq!(store.len(), 4);

        let err = svc.add_reply(target, &alice, "one too deep".into()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MaxDepthExceeded);
        // The failed mutation wrote nothing.
        assert_eq!(store.len(), 4);
    }

    // ── 2. duplicate top-level review is surfaced ───────────────────────

    #[tokio::test]
    async fn second_review_by_same_author_is_a_duplicate() {
        let (store, svc) = service();
        let alice = user(1);
        svc.add_review(PRODUCT, &alice, 5, "first".into()).await.unwrap();
        let err = svc.add_review(PRODUCT, &alice, 3, "second".into()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateReview);
        assert_eq!(store.len(), 1);

        // A different author still gets their own review in.
        svc.add_review(PRODUCT, &user(2), 2, "other voice".into()).await.unwrap();
        assert_eq!(store.len(), 2);
    }

    // ── 3. local validation precedes any store call ─────────────────────

    #[tokio::test]
    async fn invalid_submissions_never_reach_the_store() {
        let (store, svc) = service();
        let alice = user(1);

        let err = svc.add_review(PRODUCT, &alice, 7, "stars".into()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let err = svc.add_review(PRODUCT, &alice, 3, "  ".into()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(store.is_empty());

        let forest = svc.add_review(PRODUCT, &alice, 3, "ok".into()).await.unwrap();
        let root = deepest_id(&forest);
        let err = svc.add_reply(root, &alice, "\t".into()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(store.len(), 1);
    }

    // ── 4. replying to a vanished parent ────────────────────────────────

    #[tokio::test]
    async fn reply_to_missing_parent_fails_not_found() {
        let (_, svc) = service();
        let err = svc
            .add_reply(Uuid::from_u128(0xdead), &user(1), "hello?".into())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    // ── 5. edit rights belong to the author alone ───────────────────────

    #[tokio::test]
    async fn only_the_author_may_edit() {
        let (store, svc) = service();
        let alice = user(1);
        let forest = svc.add_review(PRODUCT, &alice, 4, "mine".into()).await.unwrap();
        let id = deepest_id(&forest);

        let err = svc.update_review(id, &user(2), None, "hijack".into()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
        // Even an admin edits only their own records.
        let err = svc.update_review(id, &admin(3), None, "hijack".into()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);

        let untouched = store.fetch_by_id(id).await.unwrap().unwrap();
        assert_eq!(untouched.comment, "mine");
    }

    // ── 6. the review/reply update variants check record shape ──────────

    #[tokio::test]
    async fn update_variants_reject_the_wrong_record_kind() {
        let (_, svc) = service();
        let alice = user(1);
        let forest = svc.add_review(PRODUCT, &alice, 4, "root".into()).await.unwrap();
        let root = deepest_id(&forest);
        let forest = svc.add_reply(root, &alice, "child".into()).await.unwrap();
        let reply = deepest_id(&forest);

        let err = svc.update_review(reply, &alice, Some(5), "nope".into()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let err = svc.update_reply(root, &alice, "nope".into()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    // ── 7. update rewrites only the mutable fields ──────────────────────

    #[tokio::test]
    async fn update_preserves_identity_fields() {
        let (store, svc) = service();
        let alice = user(1);
        let forest = svc.add_review(PRODUCT, &alice, 4, "before".into()).await.unwrap();
        let id = deepest_id(&forest);
        let before = store.fetch_by_id(id).await.unwrap().unwrap();

        svc.update_review(id, &alice, Some(2), "after".into()).await.unwrap();

        let after = store.fetch_by_id(id).await.unwrap().unwrap();
        assert_eq!(after.comment, "after");
        assert_eq!(after.rating, Some(2));
        assert!(after.updated_at >= before.updated_at);
        assert_eq!(after.id, before.id);
        assert_eq!(after.created_at, before.created_at);
        assert_eq!(after.parent_id, before.parent_id);
        assert_eq!(after.author_id, before.author_id);

        // Omitting the rating keeps the current stars.
        svc.update_review(id, &alice, None, "again".into()).await.unwrap();
        let last = store.fetch_by_id(id).await.unwrap().unwrap();
        assert_eq!(last.rating, Some(2));
    }

    // ── 8. delete rights: author or admin, nobody else ──────────────────

    #[tokio::test]
    async fn delete_requires_author_or_admin() {
        let (store, svc) = service();
        let alice = user(1);
        let forest = svc.add_review(PRODUCT, &alice, 4, "target".into()).await.unwrap();
        let id = deepest_id(&forest);

        let err = svc.delete_record(id, &user(2)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
        // Moderators hold no special delete rights.
        let mod_actor = Actor { id: Uuid::from_u128(3), role: ActorRole::Moderator };
        let err = svc.delete_record(id, &mod_actor).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
        assert!(store.fetch_by_id(id).await.unwrap().is_some());

        svc.delete_record(id, &admin(4)).await.unwrap();
        assert!(store.fetch_by_id(id).await.unwrap().is_none());
    }

    // ── 9. deleting a parent orphans its subtree on the next read ───────

    #[tokio::test]
    async fn deleted_parent_leaves_orphans_visible() {
        let (_, svc) = service();
        let alice = user(1);
        let forest = svc.add_review(PRODUCT, &alice, 4, "root".into()).await.unwrap();
        let root = deepest_id(&forest);
        let forest = svc.add_reply(root, &alice, "child".into()).await.unwrap();
        let child = deepest_id(&forest);
        svc.add_reply(child, &alice, "grandchild".into()).await.unwrap();

        let forest = svc.delete_record(child, &alice).await.unwrap();
        // The root survives with no children; the grandchild is surfaced,
        // not dropped.
        assert_eq!(forest.roots.len(), 1);
        assert!(forest.roots[0].children.is_empty());
        assert_eq!(forest.orphans.len(), 1);
        assert_eq!(forest.orphans[0].comment, "grandchild");
    }

    // ── 10. delete racing an edit resolves as NotFound ──────────────────

    #[tokio::test]
    async fn edit_after_delete_is_a_benign_not_found() {
        let (_, svc) = service();
        let alice = user(1);
        let forest = svc.add_review(PRODUCT, &alice, 4, "gone soon".into()).await.unwrap();
        let id = deepest_id(&forest);
        svc.delete_record(id, &alice).await.unwrap();

        let err = svc.update_review(id, &alice, None, "too late".into()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = svc.delete_record(id, &alice).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    // ── 11. permissions are annotated for the requesting actor ──────────

    #[tokio::test]
    async fn forest_permissions_follow_the_viewer() {
        let (_, svc) = service();
        let alice = user(1);
        svc.add_review(PRODUCT, &alice, 4, "mine".into()).await.unwrap();

        let anonymous = svc.fetch_thread(PRODUCT, None).await.unwrap();
        let perms = anonymous.roots[0].permissions;
        assert!(!perms.can_edit && !perms.can_delete && !perms.can_reply);

        let own_view = svc.fetch_thread(PRODUCT, Some(&alice)).await.unwrap();
        let perms = own_view.roots[0].permissions;
        assert!(perms.can_edit && perms.can_delete && perms.can_reply);

        let admin_view = svc.fetch_thread(PRODUCT, Some(&admin(9))).await.unwrap();
        let perms = admin_view.roots[0].permissions;
        assert!(!perms.can_edit && perms.can_delete);
    }

    // ── 12. mutations answer with the refreshed thread ──────────────────

    #[tokio::test]
    async fn mutation_result_reflects_the_new_state() {
        let (_, svc) = service();
        let alice = user(1);
        let bob = user(2);
        svc.add_review(PRODUCT, &alice, 4, "alice's take".into()).await.unwrap();
        let forest = svc.add_review(PRODUCT, &bob, 2, "bob disagrees".into()).await.unwrap();

        // Both reviews are in the forest the mutation itself returned, and
        // bob's permissions were evaluated on his own behalf.
        assert_eq!(forest.roots.len(), 2);
        let bobs = forest
            .roots
            .iter()
            .find(|n| n.record.author_id == bob.id)
            .expect("bob's review present");
        assert!(bobs.permissions.can_edit);
        let alices = forest.roots.iter().find(|n| n.record.author_id == alice.id).unwrap();
        assert!(!alices.permissions.can_edit);
    }

    // ── 13. reply level is derived from the stored parent ───────────────

    #[tokio::test]
    async fn reply_levels_follow_the_parent_chain() {
        let (store, svc) = service();
        let alice = user(1);
        let forest = svc.add_review(PRODUCT, &alice, 4, "root".into()).await.unwrap();
        let root = deepest_id(&forest);
        let forest = svc.add_reply(root, &user(2), "first".into()).await.unwrap();
        let first = deepest_id(&forest);
        let forest = svc.add_reply(first, &user(3), "second".into()).await.unwrap();
        let second = deepest_id(&forest);

        let rec = store.fetch_by_id(second).await.unwrap().unwrap();
        assert_eq!(rec.reply_level, 2);
        assert!(rec.rating.is_none());
        assert_eq!(rec.product_id, PRODUCT);
    }
}
