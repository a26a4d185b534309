//! Typed helpers over a [`State`].
//!
//! Reads hand back owned copies; nothing is visible to other readers until it is written back.

use malachite::Natural;
use nhbchain_types::{Key, Record, Value};

use crate::{Error, State};

fn check_key(key: &Key) -> Result<(), Error> {
    if matches!(key, Key::Custom(path) if path.is_empty()) {
        return Err(Error::InvalidKey);
    }
    Ok(())
}

/// Rejects a value that would not decode once stored.
pub(crate) fn check_value(value: &Value) -> Result<(), Error> {
    value
        .check_encoding()
        .map_err(|_| Error::Oversized(value.kind()))
}

/// Converts a stored value, failing if it holds another record kind.
pub(crate) fn decode<R: Record>(value: Value) -> Result<R, Error> {
    R::from_value(value).map_err(|other| Error::Decode {
        expected: R::KIND,
        found: other.kind(),
    })
}

/// Overwrites `key` with `record`.
pub async fn put<S: State, R: Record>(state: &mut S, key: Key, record: R) -> Result<(), Error> {
    check_key(&key)?;
    let value = record.into_value();
    check_value(&value)?;
    state.insert(key, value).await?;
    Ok(())
}

/// Reads the record at `key`, if any.
pub async fn get<S: State, R: Record>(state: &S, key: &Key) -> Result<Option<R>, Error> {
    check_key(key)?;
    match state.get(key).await? {
        Some(value) => Ok(Some(decode(value)?)),
        None => Ok(None),
    }
}

/// Reads the record at `key`, falling back to its default when absent.
pub async fn get_or_default<S: State, R: Record + Default>(
    state: &S,
    key: &Key,
) -> Result<R, Error> {
    Ok(get(state, key).await?.unwrap_or_default())
}

pub async fn delete<S: State>(state: &mut S, key: &Key) -> Result<(), Error> {
    check_key(key)?;
    state.delete(key).await?;
    Ok(())
}

/// Ordered list stored at `key`; absent lists are empty.
pub async fn get_list<S: State>(state: &S, key: &Key) -> Result<Vec<Vec<u8>>, Error> {
    get_or_default(state, key).await
}

/// Adds `element` to the list at `key` unless a byte-equal entry is already present.
///
/// Returns whether the list changed.
pub async fn append<S: State>(state: &mut S, key: Key, element: Vec<u8>) -> Result<bool, Error> {
    let mut list = get_list(state, &key).await?;
    if list.contains(&element) {
        return Ok(false);
    }
    list.push(element);
    put(state, key, list).await?;
    Ok(true)
}

pub async fn get_amount<S: State>(state: &S, key: &Key) -> Result<Natural, Error> {
    get_or_default(state, key).await
}

pub async fn get_counter<S: State>(state: &S, key: &Key) -> Result<u64, Error> {
    get_or_default(state, key).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Memory;
    use commonware_runtime::deterministic::Runner;
    use commonware_runtime::Runner as _;
    use nhbchain_types::Address;

    #[test]
    fn append_deduplicates_by_bytes() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut state = Memory::default();
            let key = Key::VoteIndex(1);
            assert!(get_list(&state, &key).await.unwrap().is_empty());

            assert!(append(&mut state, key.clone(), b"a".to_vec()).await.unwrap());
            assert!(append(&mut state, key.clone(), b"b".to_vec()).await.unwrap());
            assert!(!append(&mut state, key.clone(), b"a".to_vec()).await.unwrap());
            assert_eq!(
                get_list(&state, &key).await.unwrap(),
                vec![b"a".to_vec(), b"b".to_vec()]
            );
        });
    }

    #[test]
    fn wrong_record_kind_is_a_decode_error() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut state = Memory::default();
            let key = Key::ClaimableNonce(Address::new([1u8; 20]));
            put(&mut state, key.clone(), Natural::from(3u32))
                .await
                .unwrap();
            let err = get_counter(&state, &key).await.unwrap_err();
            assert!(matches!(
                err,
                Error::Decode {
                    expected: "Counter",
                    found: "Amount"
                }
            ));
        });
    }

    #[test]
    fn empty_keys_are_rejected() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut state = Memory::default();
            let err = put(&mut state, Key::Custom(Vec::new()), 1u64)
                .await
                .unwrap_err();
            assert!(matches!(err, Error::InvalidKey));
            assert!(state.is_empty());
        });
    }

    #[test]
    fn custom_keys_do_not_shadow_accounts() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut state = Memory::default();
            let account = Key::CoreAccount(Address::new([9u8; 20]));
            put(&mut state, account.clone(), Natural::from(1u32))
                .await
                .unwrap();
            put(&mut state, Key::Custom(account.path()), Natural::from(2u32))
                .await
                .unwrap();
            assert_eq!(get_amount(&state, &account).await.unwrap(), 1u32);
            assert_eq!(state.len(), 2);
        });
    }

    #[test]
    fn delete_removes_the_record() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut state = Memory::default();
            let key = Key::Custom(b"scratch".to_vec());
            put(&mut state, key.clone(), b"x".to_vec()).await.unwrap();
            delete(&mut state, &key).await.unwrap();
            assert_eq!(get::<_, Vec<u8>>(&state, &key).await.unwrap(), None);
        });
    }
}
