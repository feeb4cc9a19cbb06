//! Gate-then-mutate workflows.
//!
//! Each function authorizes the caller with the access gate first and only then
//! performs a single store operation, so a denial never reaches storage. They
//! return core errors and know nothing about HTTP.

pub mod accounts;
pub mod business;
pub mod listings;
pub mod passports;
pub mod settings;

#[cfg(test)]
pub(crate) mod testing {
    use animal_family_core::{Account, ExternalId, IdentityAssertion};
    use animal_family_store::{MemoryStore, Store};

    use crate::auth::Caller;

    pub async fn member(store: &MemoryStore, external_id: i64, name: &str) -> Caller {
        let assertion = IdentityAssertion::new(external_id, name, Some(name), None).unwrap();
        Caller::from_account(store.upsert_account(&assertion).await.unwrap())
    }

    pub async fn premium(store: &MemoryStore, external_id: i64, name: &str) -> Caller {
        member(store, external_id, name).await;
        let account = store
            .set_premium(ExternalId::new(external_id).unwrap(), true)
            .await
            .unwrap();
        Caller::from_account(account)
    }

    pub async fn admin(store: &MemoryStore) -> Caller {
        let account: Account = store
            .seed_admin(ExternalId::new(1_046_439_138).unwrap())
            .await
            .unwrap();
        Caller::from_account(account)
    }
}
