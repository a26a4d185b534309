use super::super::*;
use super::require_address;
use nhbchain_types::Address;
use tracing::debug;

fn role_name(raw: &str) -> Result<&str, Error> {
    let role = raw.trim();
    if role.is_empty() {
        return Err(Error::InvalidArgument("role required"));
    }
    Ok(role)
}

impl<S: State> Manager<S> {
    /// Members of `role`, ordered by address bytes.
    pub async fn role_members(&self, role: &str) -> Result<Vec<Address>, Error> {
        let role = role_name(role)?;
        store::get_list(&self.state, &Key::Role(role.to_string()))
            .await?
            .iter()
            .map(|member| {
                Address::from_slice(member).ok_or(Error::Decode {
                    expected: "Address",
                    found: "List",
                })
            })
            .collect()
    }

    /// Grants `role` to `address`. Granting an existing member changes nothing.
    pub async fn set_role(&mut self, role: &str, address: &Address) -> Result<(), Error> {
        let role = role_name(role)?;
        require_address(address)?;
        let key = Key::Role(role.to_string());
        let mut members = store::get_list(&self.state, &key).await?;
        let member = address.as_ref().to_vec();
        if let Err(slot) = members.binary_search(&member) {
            members.insert(slot, member);
            store::put(&mut self.state, key, members).await?;
            debug!(role, %address, "role granted");
        }
        Ok(())
    }

    /// Revokes `role` from `address`; the role record is deleted with its last member.
    pub async fn remove_role(&mut self, role: &str, address: &Address) -> Result<(), Error> {
        let role = role_name(role)?;
        require_address(address)?;
        let key = Key::Role(role.to_string());
        let mut members = store::get_list(&self.state, &key).await?;
        let Ok(slot) = members.binary_search(&address.as_ref().to_vec()) else {
            return Ok(());
        };
        members.remove(slot);
        if members.is_empty() {
            store::delete(&mut self.state, &key).await?;
        } else {
            store::put(&mut self.state, key, members).await?;
        }
        debug!(role, %address, "role revoked");
        Ok(())
    }

    /// Whether `address` holds `role`. Invalid input and read failures count as not holding it.
    pub async fn has_role(&self, role: &str, address: &Address) -> bool {
        if address.is_zero() || role.trim().is_empty() {
            return false;
        }
        matches!(self.role_members(role).await, Ok(members) if members.contains(address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{address, manager};
    use commonware_runtime::deterministic::Runner;
    use commonware_runtime::Runner as _;

    #[test]
    fn members_stay_sorted_and_unique() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut manager = manager();
            for seed in [3, 1, 2, 1] {
                manager.set_role("minter", &address(seed)).await.unwrap();
            }
            assert_eq!(
                manager.role_members(" minter ").await.unwrap(),
                vec![address(1), address(2), address(3)]
            );
            assert!(manager.has_role("minter", &address(2)).await);
            assert!(!manager.has_role("pauser", &address(2)).await);
            assert!(!manager.has_role("minter", &Address::ZERO).await);
        });
    }

    #[test]
    fn revocation_is_idempotent_and_clears_empty_roles() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut manager = manager();
            manager.set_role("pauser", &address(1)).await.unwrap();
            manager.remove_role("pauser", &address(2)).await.unwrap();
            assert_eq!(
                manager.role_members("pauser").await.unwrap(),
                vec![address(1)]
            );

            manager.remove_role("pauser", &address(1)).await.unwrap();
            manager.remove_role("pauser", &address(1)).await.unwrap();
            assert!(manager.role_members("pauser").await.unwrap().is_empty());
            assert!(manager.state().is_empty());
        });
    }

    #[test]
    fn role_and_member_are_required() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut manager = manager();
            assert!(matches!(
                manager.set_role(" ", &address(1)).await,
                Err(Error::InvalidArgument("role required"))
            ));
            assert!(matches!(
                manager.set_role("minter", &Address::ZERO).await,
                Err(Error::InvalidAddress)
            ));
            assert!(!manager.has_role("", &address(1)).await);
        });
    }
}
