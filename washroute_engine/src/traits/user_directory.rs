use crate::{db_types::DirectoryUser, traits::LedgerError};

/// Lookup of platform users. The ledger does not own user identity; it only needs to know whether someone is an active
/// rider or partner, and where to send their money.
#[allow(async_fn_in_trait)]
pub trait UserDirectory {
    async fn fetch_directory_user(&self, id: &str) -> Result<Option<DirectoryUser>, LedgerError>;

    /// Inserts or replaces a directory entry. Used to keep the local copy in sync with the identity service.
    async fn upsert_directory_user(&self, user: DirectoryUser) -> Result<DirectoryUser, LedgerError>;
}
