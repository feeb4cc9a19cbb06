//! Behaviour every `Store` backend must share.
//!
//! The in-memory backend always runs. The `RocksDB` backend runs with the
//! `rocksdb-backend` feature. PostgreSQL runs with `--ignored` and a
//! `DATABASE_URL` pointing at a scratch database.

use std::sync::Arc;

use futures::future::join_all;

use animal_family_core::{
    Account, AdBanner, BusinessApplication, BusinessRequest, Category, ChatLink, ExternalId,
    IdentityAssertion, Listing, ListingDraft, ListingFilter, ListingStatus, PassportDraft,
    PetPassport, ProfileUpdate,
};
use animal_family_store::{CasOutcome, MemoryStore, Store, StoreError};

fn assertion(external_id: i64, name: &str) -> IdentityAssertion {
    IdentityAssertion::new(external_id, name, Some("anna"), None).unwrap()
}

fn draft(title: &str) -> ListingDraft {
    ListingDraft {
        category: Category::Lost,
        title: title.into(),
        description: Some("Grey cat with a white collar".into()),
        city: "Moscow".into(),
        price: None,
        location: None,
        image_ref: None,
    }
}

fn application() -> BusinessApplication {
    BusinessApplication {
        company_name: "Happy Tail".into(),
        city: Some("Moscow".into()),
        description: Some("Grooming salon".into()),
        contacts: Some("+7 900 000 00 00".into()),
    }
}

/// A platform id unlikely to collide between runs against a shared database.
fn fresh_external_id() -> i64 {
    i64::from(uuid::Uuid::new_v4().as_u128() as u32) + 1
}

// ============================================================================
// Contract
// ============================================================================

async fn upsert_is_idempotent(store: Arc<dyn Store>) {
    let id = fresh_external_id();
    let first = store.upsert_account(&assertion(id, "Anna")).await.unwrap();
    let second = store.upsert_account(&assertion(id, "Anna")).await.unwrap();

    assert_eq!(first.account_id, second.account_id);
    assert!(!second.is_premium);
    assert!(!second.is_admin());
    assert!(!second.is_business_operator);

    let renamed = store.upsert_account(&assertion(id, "Anna K.")).await.unwrap();
    assert_eq!(renamed.account_id, first.account_id);
    assert_eq!(renamed.display_name, "Anna K.");
}

async fn concurrent_upserts_create_one_account(store: Arc<dyn Store>) {
    let id = fresh_external_id();
    let results = join_all((0..8).map(|_| {
        let store = Arc::clone(&store);
        async move { store.upsert_account(&assertion(id, "Anna")).await }
    }))
    .await;

    let ids: Vec<_> = results.into_iter().map(|r| r.unwrap().account_id).collect();
    assert!(ids.windows(2).all(|w| w[0] == w[1]));
}

async fn upsert_preserves_entitlements(store: Arc<dyn Store>) {
    let id = fresh_external_id();
    store.upsert_account(&assertion(id, "Anna")).await.unwrap();
    store
        .set_premium(ExternalId::new(id).unwrap(), true)
        .await
        .unwrap();

    let again = store.upsert_account(&assertion(id, "Anna")).await.unwrap();
    assert!(again.is_premium);
}

async fn profile_update_round_trips(store: Arc<dyn Store>) {
    let account = store
        .upsert_account(&assertion(fresh_external_id(), "Anna"))
        .await
        .unwrap();
    let update = ProfileUpdate {
        city: Some("Kazan".into()),
        phone: Some("+7 900 000 00 00".into()),
        ..ProfileUpdate::default()
    };
    let updated = store
        .update_profile(account.account_id, &update)
        .await
        .unwrap();
    assert_eq!(updated.city.as_deref(), Some("Kazan"));

    let reloaded = store.get_account(account.account_id).await.unwrap().unwrap();
    assert_eq!(reloaded.phone.as_deref(), Some("+7 900 000 00 00"));
}

async fn listing_status_is_terminal(store: Arc<dyn Store>) {
    let owner = store
        .upsert_account(&assertion(fresh_external_id(), "Anna"))
        .await
        .unwrap();
    let listing = Listing::submit(&owner, &draft("Lost cat")).unwrap();
    store.insert_listing(&listing).await.unwrap();

    let swapped = store
        .compare_and_set_listing_status(
            listing.listing_id,
            ListingStatus::Pending,
            ListingStatus::Approved,
        )
        .await
        .unwrap();
    assert!(matches!(swapped, CasOutcome::Swapped(ref l) if l.status == ListingStatus::Approved));

    let second = store
        .compare_and_set_listing_status(
            listing.listing_id,
            ListingStatus::Pending,
            ListingStatus::Rejected,
        )
        .await
        .unwrap();
    assert_eq!(second, CasOutcome::Mismatch(ListingStatus::Approved));

    let stored = store.get_listing(listing.listing_id).await.unwrap().unwrap();
    assert_eq!(stored.status, ListingStatus::Approved);
}

async fn listing_filters_apply(store: Arc<dyn Store>) {
    let owner = store
        .upsert_account(&assertion(fresh_external_id(), "Anna"))
        .await
        .unwrap();
    let pending = Listing::submit(&owner, &draft("Pending one")).unwrap();
    let approved = Listing::submit(&owner, &draft("Approved one")).unwrap();
    store.insert_listing(&pending).await.unwrap();
    store.insert_listing(&approved).await.unwrap();
    store
        .compare_and_set_listing_status(
            approved.listing_id,
            ListingStatus::Pending,
            ListingStatus::Approved,
        )
        .await
        .unwrap();

    let mine = store
        .list_listings(&ListingFilter::owned_by(owner.account_id))
        .await
        .unwrap();
    assert_eq!(mine.len(), 2);

    let approved_only = store
        .list_listings(&ListingFilter {
            status: Some(ListingStatus::Approved),
            ..ListingFilter::owned_by(owner.account_id)
        })
        .await
        .unwrap();
    assert_eq!(approved_only.len(), 1);
    assert_eq!(approved_only[0].listing_id, approved.listing_id);
}

async fn burst_of_listings_comes_back_newest_first(store: Arc<dyn Store>) {
    let owner = store
        .upsert_account(&assertion(fresh_external_id(), "Anna"))
        .await
        .unwrap();
    let listings: Vec<_> = (0..50)
        .map(|i| Listing::submit(&owner, &draft(&format!("Cat {i}"))).unwrap())
        .collect();
    for listing in &listings {
        store.insert_listing(listing).await.unwrap();
    }

    let mine = store
        .list_listings(&ListingFilter::owned_by(owner.account_id))
        .await
        .unwrap();
    let returned: Vec<_> = mine.iter().map(|l| l.listing_id).collect();
    let expected: Vec<_> = listings.iter().rev().map(|l| l.listing_id).collect();
    assert_eq!(returned, expected);
}

async fn burst_of_business_requests_comes_back_newest_first(store: Arc<dyn Store>) {
    let mut accounts = Vec::new();
    for _ in 0..20 {
        let account = store
            .upsert_account(&assertion(fresh_external_id(), "Anna"))
            .await
            .unwrap();
        accounts.push(account);
    }
    let requests: Vec<_> = accounts
        .iter()
        .map(|account| BusinessRequest::file(account, &application()).unwrap())
        .collect();
    for request in &requests {
        store.insert_business_request(request).await.unwrap();
    }

    let filed: Vec<_> = requests.iter().map(|r| r.request_id).collect();
    let returned: Vec<_> = store
        .list_business_requests()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.request_id)
        .filter(|id| filed.contains(id))
        .collect();
    let expected: Vec<_> = filed.iter().rev().copied().collect();
    assert_eq!(returned, expected);
}

async fn one_pending_business_request_per_account(store: Arc<dyn Store>) {
    let account = store
        .upsert_account(&assertion(fresh_external_id(), "Anna"))
        .await
        .unwrap();
    let first = BusinessRequest::file(&account, &application()).unwrap();
    store.insert_business_request(&first).await.unwrap();

    let second = BusinessRequest::file(&account, &application()).unwrap();
    assert!(matches!(
        store.insert_business_request(&second).await,
        Err(StoreError::Conflict { .. })
    ));
}

async fn first_business_decision_wins(store: Arc<dyn Store>) {
    let account = store
        .upsert_account(&assertion(fresh_external_id(), "Anna"))
        .await
        .unwrap();
    let request = BusinessRequest::file(&account, &application()).unwrap();
    store.insert_business_request(&request).await.unwrap();

    let promoted: Account = store
        .approve_business_request(request.request_id)
        .await
        .unwrap();
    assert!(promoted.is_business_operator);
    assert_eq!(promoted.business.name.as_deref(), Some("Happy Tail"));
    assert_eq!(promoted.city.as_deref(), Some("Moscow"));

    assert!(store
        .get_business_request(request.request_id)
        .await
        .unwrap()
        .is_none());
    assert!(matches!(
        store.reject_business_request(request.request_id).await,
        Err(StoreError::NotFound { .. })
    ));
    assert!(matches!(
        store.approve_business_request(request.request_id).await,
        Err(StoreError::NotFound { .. })
    ));
}

async fn passport_edit_keeps_verification(store: Arc<dyn Store>) {
    let owner = store
        .upsert_account(&assertion(fresh_external_id(), "Anna"))
        .await
        .unwrap();
    let passport = PetPassport::create(
        &owner,
        &PassportDraft {
            name: "Barsik".into(),
            species: Some("cat".into()),
            ..PassportDraft::default()
        },
    )
    .unwrap();
    store.insert_passport(&passport).await.unwrap();
    store
        .set_passport_verified(passport.passport_id, true)
        .await
        .unwrap();

    let mut edited = passport.clone();
    edited
        .apply_edit(&PassportDraft {
            name: "Barsik II".into(),
            ..PassportDraft::default()
        })
        .unwrap();
    let stored = store.update_passport(&edited).await.unwrap();
    assert!(stored.is_verified);
    assert_eq!(stored.name, "Barsik II");

    let mine = store.list_passports(Some(owner.account_id)).await.unwrap();
    assert_eq!(mine.len(), 1);
}

async fn settings_round_trip(store: Arc<dyn Store>) {
    let banner = AdBanner::new("Grooming -20%", "Only this week").unwrap();
    let link = ChatLink::new("https://t.me/animal_family_chat").unwrap();
    store.put_banner(&banner).await.unwrap();
    store.put_chat_link(&link).await.unwrap();

    let settings = store.get_settings().await.unwrap();
    assert_eq!(settings.banner.map(|b| b.title), Some(banner.title));
    assert_eq!(settings.chat_link.map(|l| l.url), Some(link.url));
}

async fn run_contract(make: impl Fn() -> Arc<dyn Store>) {
    upsert_is_idempotent(make()).await;
    concurrent_upserts_create_one_account(make()).await;
    upsert_preserves_entitlements(make()).await;
    profile_update_round_trips(make()).await;
    listing_status_is_terminal(make()).await;
    listing_filters_apply(make()).await;
    burst_of_listings_comes_back_newest_first(make()).await;
    burst_of_business_requests_comes_back_newest_first(make()).await;
    one_pending_business_request_per_account(make()).await;
    first_business_decision_wins(make()).await;
    passport_edit_keeps_verification(make()).await;
    settings_round_trip(make()).await;
}

// ============================================================================
// Backends
// ============================================================================

#[tokio::test]
async fn memory_store_contract() {
    run_contract(|| Arc::new(MemoryStore::new())).await;
}

#[cfg(feature = "rocksdb-backend")]
#[tokio::test]
async fn rocks_store_contract() {
    use animal_family_store::RocksStore;
    use tempfile::TempDir;

    let dir = TempDir::new().unwrap();
    let counter = std::sync::atomic::AtomicUsize::new(0);
    run_contract(|| {
        let n = counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Arc::new(RocksStore::open(dir.path().join(n.to_string())).unwrap())
    })
    .await;
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn postgres_store_contract() {
    use animal_family_store::PgStore;

    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let store = PgStore::connect(&url).await.unwrap();
    store.migrate().await.unwrap();
    let store: Arc<dyn Store> = Arc::new(store);
    run_contract(|| Arc::clone(&store)).await;
}
