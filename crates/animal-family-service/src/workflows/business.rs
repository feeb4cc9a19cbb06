//! Business-connection request workflows.

use animal_family_core::{
    Action, BusinessApplication, BusinessOutcome, BusinessRequest, BusinessRequestId,
    ModerationDecision, Result,
};
use animal_family_store::{Store, StoreError};

use crate::auth::Caller;

/// File a request to become a business operator.
///
/// Operators cannot file again. An account may have one pending request.
pub async fn file(
    store: &dyn Store,
    caller: &Caller,
    application: &BusinessApplication,
) -> Result<BusinessRequest> {
    let account = caller.require_account()?;
    caller.authorize(Action::SubmitBusinessRequest)?;

    let request = BusinessRequest::file(account, application)?;
    store.insert_business_request(&request).await?;

    tracing::info!(
        request_id = %request.request_id,
        account_id = %account.account_id,
        "Business request filed"
    );
    Ok(request)
}

/// Pending requests, newest first (admin only).
pub async fn pending(store: &dyn Store, caller: &Caller) -> Result<Vec<BusinessRequest>> {
    caller.authorize(Action::AdminSurface)?;
    Ok(store.list_business_requests().await?)
}

/// Decide a pending request (admin only).
///
/// Approval promotes the requester and deletes the request atomically.
/// Whoever decides first wins; a decision on a request that no longer exists
/// is `AlreadyDecided`.
pub async fn decide(
    store: &dyn Store,
    caller: &Caller,
    request_id: BusinessRequestId,
    decision: ModerationDecision,
) -> Result<BusinessOutcome> {
    caller.authorize(Action::AdminSurface)?;

    let outcome = match decision {
        ModerationDecision::Approve => store
            .approve_business_request(request_id)
            .await
            .map(|account| BusinessOutcome::Approved(Box::new(account))),
        ModerationDecision::Reject => store
            .reject_business_request(request_id)
            .await
            .map(|()| BusinessOutcome::Rejected),
    };

    match outcome {
        Ok(outcome) => {
            tracing::info!(
                request_id = %request_id,
                decision = decision.as_str(),
                admin = ?caller.entitlements.account_id,
                "Business request decided"
            );
            Ok(outcome)
        }
        Err(StoreError::NotFound {
            entity: "business_request",
            ..
        }) => Err(BusinessRequest::already_decided(request_id)),
        Err(e) => Err(e.into()),
    }
}
