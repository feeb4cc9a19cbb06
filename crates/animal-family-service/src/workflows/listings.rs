//! Listing workflows: submission, feeds and moderation.

use animal_family_core::{
    Action, Listing, ListingDraft, ListingFilter, ListingId, ListingStatus, MarketError,
    ModerationDecision, Result, Transition,
};
use animal_family_store::{CasOutcome, Store};

use crate::auth::Caller;

/// Default page size of list endpoints.
pub const DEFAULT_LIMIT: usize = 50;

/// Largest accepted page size.
pub const MAX_LIMIT: usize = 200;

/// Clamp a requested page size.
#[must_use]
pub fn page_size(requested: Option<usize>) -> usize {
    requested.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

/// Submit a new listing. It starts `pending`.
///
/// `service` and `sale` listings need premium at this moment; losing premium
/// later does not affect the listing.
pub async fn submit(store: &dyn Store, caller: &Caller, draft: &ListingDraft) -> Result<Listing> {
    let owner = caller.require_account()?;
    caller.authorize(Action::SubmitListing(draft.category))?;

    let listing = Listing::submit(owner, draft)?;
    store.insert_listing(&listing).await?;

    tracing::info!(
        listing_id = %listing.listing_id,
        account_id = %owner.account_id,
        category = %listing.category,
        "Listing submitted"
    );
    Ok(listing)
}

/// The public feed: approved listings, newest first.
pub async fn feed(store: &dyn Store, filter: ListingFilter) -> Result<Vec<Listing>> {
    let filter = ListingFilter {
        status: Some(ListingStatus::Approved),
        owner: None,
        limit: Some(page_size(filter.limit)),
        ..filter
    };
    Ok(store.list_listings(&filter).await?)
}

/// The caller's own listings in every status, newest first.
pub async fn mine(store: &dyn Store, caller: &Caller, limit: Option<usize>) -> Result<Vec<Listing>> {
    let owner = caller.require_account()?.account_id;
    let filter = ListingFilter {
        limit: Some(page_size(limit)),
        ..ListingFilter::owned_by(owner)
    };
    Ok(store.list_listings(&filter).await?)
}

/// A single listing, if the caller may see it.
///
/// Hidden listings are reported as missing so their existence does not leak.
pub async fn view(store: &dyn Store, caller: &Caller, listing_id: ListingId) -> Result<Listing> {
    store
        .get_listing(listing_id)
        .await?
        .filter(|listing| listing.is_visible_to(&caller.entitlements))
        .ok_or_else(|| not_found(listing_id))
}

/// The moderation queue (admin only). Defaults to `pending`.
pub async fn moderation_queue(
    store: &dyn Store,
    caller: &Caller,
    status: Option<ListingStatus>,
    limit: Option<usize>,
) -> Result<Vec<Listing>> {
    caller.authorize(Action::AdminSurface)?;
    let filter = ListingFilter {
        limit: Some(page_size(limit)),
        ..ListingFilter::with_status(status.unwrap_or(ListingStatus::Pending))
    };
    Ok(store.list_listings(&filter).await?)
}

/// Apply an admin decision to a listing.
///
/// The write is a compare-and-swap on `pending`. Repeating the decision that is
/// already stored returns [`Transition::Unchanged`]; the opposite decision on a
/// decided listing is `AlreadyDecided` and writes nothing.
pub async fn decide(
    store: &dyn Store,
    caller: &Caller,
    listing_id: ListingId,
    decision: ModerationDecision,
) -> Result<(Listing, Transition)> {
    caller.authorize(Action::AdminSurface)?;

    let listing = store
        .get_listing(listing_id)
        .await?
        .ok_or_else(|| not_found(listing_id))?;

    let transition = listing.plan(decision)?;
    let Transition::Advance { from, to } = transition else {
        return Ok((listing, transition));
    };

    match store
        .compare_and_set_listing_status(listing_id, from, to)
        .await?
    {
        CasOutcome::Swapped(updated) => {
            tracing::info!(
                listing_id = %listing_id,
                decision = decision.as_str(),
                admin = ?caller.entitlements.account_id,
                "Listing moderated"
            );
            Ok((*updated, transition))
        }
        CasOutcome::Mismatch(current) => {
            // Someone else decided between our read and the swap.
            let mut latest = listing;
            latest.status = current;
            let transition = latest.plan(decision)?;
            Ok((latest, transition))
        }
    }
}

fn not_found(listing_id: ListingId) -> MarketError {
    MarketError::NotFound {
        entity: "listing",
        id: listing_id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::testing::{admin, member, premium};
    use animal_family_core::{Category, DenyReason};
    use animal_family_store::MemoryStore;

    fn draft(category: Category) -> ListingDraft {
        ListingDraft {
            category,
            title: "Grey cat found near the park".into(),
            description: None,
            city: "Moscow".into(),
            price: None,
            location: None,
            image_ref: None,
        }
    }

    #[tokio::test]
    async fn sale_needs_premium_and_nothing_is_written_on_denial() {
        let store = MemoryStore::new();
        let anna = member(&store, 42, "anna").await;

        let err = submit(&store, &anna, &draft(Category::Sale))
            .await
            .unwrap_err();
        assert_eq!(err.deny_reason(), Some(DenyReason::PremiumRequired));
        assert!(mine(&store, &anna, None).await.unwrap().is_empty());

        let found = submit(&store, &anna, &draft(Category::Found)).await.unwrap();
        assert_eq!(found.status, ListingStatus::Pending);
    }

    #[tokio::test]
    async fn premium_members_may_sell() {
        let store = MemoryStore::new();
        let boris = premium(&store, 7, "boris").await;
        let listing = submit(&store, &boris, &draft(Category::Service))
            .await
            .unwrap();
        assert!(listing.owner_was_premium);
    }

    #[tokio::test]
    async fn pending_listings_are_hidden_from_strangers() {
        let store = MemoryStore::new();
        let anna = member(&store, 42, "anna").await;
        let boris = member(&store, 7, "boris").await;
        let listing = submit(&store, &anna, &draft(Category::Lost)).await.unwrap();

        assert!(view(&store, &anna, listing.listing_id).await.is_ok());
        assert!(matches!(
            view(&store, &boris, listing.listing_id).await,
            Err(MarketError::NotFound { .. })
        ));
        assert!(feed(&store, ListingFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn approve_then_reject_is_already_decided() {
        let store = MemoryStore::new();
        let anna = member(&store, 42, "anna").await;
        let boss = admin(&store).await;
        let listing = submit(&store, &anna, &draft(Category::Lost)).await.unwrap();

        let (approved, transition) =
            decide(&store, &boss, listing.listing_id, ModerationDecision::Approve)
                .await
                .unwrap();
        assert_eq!(approved.status, ListingStatus::Approved);
        assert!(matches!(transition, Transition::Advance { .. }));

        let (_, again) = decide(&store, &boss, listing.listing_id, ModerationDecision::Approve)
            .await
            .unwrap();
        assert_eq!(again, Transition::Unchanged);

        let err = decide(&store, &boss, listing.listing_id, ModerationDecision::Reject)
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::AlreadyDecided { .. }));

        let feed = feed(&store, ListingFilter::default()).await.unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].status, ListingStatus::Approved);
    }

    #[tokio::test]
    async fn moderation_needs_admin() {
        let store = MemoryStore::new();
        let anna = member(&store, 42, "anna").await;
        let listing = submit(&store, &anna, &draft(Category::Lost)).await.unwrap();

        let err = decide(&store, &anna, listing.listing_id, ModerationDecision::Approve)
            .await
            .unwrap_err();
        assert_eq!(err.deny_reason(), Some(DenyReason::AdminRequired));
        assert!(moderation_queue(&store, &anna, None, None).await.is_err());

        let boss = admin(&store).await;
        let queue = moderation_queue(&store, &boss, None, None).await.unwrap();
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_opposite_decisions_leave_one_outcome() {
        let store = MemoryStore::new();
        let anna = member(&store, 42, "anna").await;
        let boss = admin(&store).await;
        let listing = submit(&store, &anna, &draft(Category::Lost)).await.unwrap();

        let (a, b) = tokio::join!(
            decide(&store, &boss, listing.listing_id, ModerationDecision::Approve),
            decide(&store, &boss, listing.listing_id, ModerationDecision::Reject),
        );
        assert_eq!(usize::from(a.is_ok()) + usize::from(b.is_ok()), 1);

        let stored = store.get_listing(listing.listing_id).await.unwrap().unwrap();
        assert!(stored.status.is_terminal());
    }

    #[tokio::test]
    async fn own_listings_and_queue_are_paged() {
        let store = MemoryStore::new();
        let anna = member(&store, 42, "anna").await;
        let boss = admin(&store).await;
        let mut submitted = Vec::new();
        for _ in 0..DEFAULT_LIMIT + 5 {
            let listing = submit(&store, &anna, &draft(Category::Lost)).await.unwrap();
            submitted.push(listing.listing_id);
        }

        let own = mine(&store, &anna, None).await.unwrap();
        assert_eq!(own.len(), DEFAULT_LIMIT);
        assert_eq!(own[0].listing_id, *submitted.last().unwrap());

        let queue = moderation_queue(&store, &boss, None, Some(3)).await.unwrap();
        let ids: Vec<_> = queue.iter().map(|listing| listing.listing_id).collect();
        let newest: Vec<_> = submitted.iter().rev().take(3).copied().collect();
        assert_eq!(ids, newest);
    }

    #[test]
    fn page_size_is_clamped() {
        assert_eq!(page_size(None), DEFAULT_LIMIT);
        assert_eq!(page_size(Some(0)), 1);
        assert_eq!(page_size(Some(10_000)), MAX_LIMIT);
    }
}
