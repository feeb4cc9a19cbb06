//! Key encoding utilities for `RocksDB`.

use animal_family_core::{AccountId, BusinessRequestId, ExternalId, ListingId, PassportId};

/// Settings key for the ad banner.
pub const BANNER_KEY: &[u8] = b"banner";

/// Settings key for the community chat link.
pub const CHAT_LINK_KEY: &[u8] = b"chat_link";

/// Create an account key from an account ID.
#[must_use]
pub fn account_key(account_id: &AccountId) -> Vec<u8> {
    account_id.as_bytes().to_vec()
}

/// Create an index key from a platform id.
///
/// Big-endian so that keys sort numerically.
#[must_use]
pub fn external_id_key(external_id: ExternalId) -> Vec<u8> {
    external_id.to_be_bytes().to_vec()
}

/// Create a listing key from a listing ID.
#[must_use]
pub fn listing_key(listing_id: &ListingId) -> Vec<u8> {
    listing_id.to_bytes().to_vec()
}

/// Create a business request key from a request ID.
#[must_use]
pub fn business_request_key(request_id: &BusinessRequestId) -> Vec<u8> {
    request_id.to_bytes().to_vec()
}

/// Create a passport key from a passport ID.
#[must_use]
pub fn passport_key(passport_id: &PassportId) -> Vec<u8> {
    passport_id.as_bytes().to_vec()
}

/// Create an owner-passport index key.
///
/// Format: `owner_account_id (16 bytes) || passport_id (16 bytes)`
#[must_use]
pub fn owner_passport_key(owner: &AccountId, passport_id: &PassportId) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(owner.as_bytes());
    key.extend_from_slice(passport_id.as_bytes());
    key
}

/// Create a prefix for iterating all passports of an owner.
#[must_use]
pub fn owner_passports_prefix(owner: &AccountId) -> Vec<u8> {
    owner.as_bytes().to_vec()
}

/// Decode a 16-byte identifier stored as an index value or key suffix.
///
/// Returns `None` if the slice is not exactly 16 bytes.
#[must_use]
pub fn id_bytes(slice: &[u8]) -> Option<[u8; 16]> {
    slice.try_into().ok()
}

/// Extract the passport ID from an owner-passport index key.
///
/// Returns `None` if the key is not 32 bytes.
#[must_use]
pub fn passport_id_from_owner_key(key: &[u8]) -> Option<PassportId> {
    if key.len() != 32 {
        return None;
    }
    id_bytes(&key[16..]).map(PassportId::from_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_id_keys_sort_numerically() {
        let small = external_id_key(ExternalId::new(42).unwrap());
        let large = external_id_key(ExternalId::new(1_046_439_138).unwrap());
        assert_eq!(small.len(), 8);
        assert!(small < large);
    }

    #[test]
    fn owner_passport_key_format() {
        let owner = AccountId::generate();
        let passport = PassportId::generate();
        let key = owner_passport_key(&owner, &passport);

        assert_eq!(key.len(), 32);
        assert_eq!(&key[..16], owner.as_bytes());
        assert_eq!(passport_id_from_owner_key(&key), Some(passport));
    }

    #[test]
    fn malformed_index_key_is_rejected() {
        assert_eq!(passport_id_from_owner_key(&[0u8; 20]), None);
        assert_eq!(id_bytes(&[1, 2, 3]), None);
    }
}
