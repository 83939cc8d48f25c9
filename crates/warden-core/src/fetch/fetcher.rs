use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::auth::Session;
use crate::command::{interpret, CommandId, Outcome, PrivilegedCommandClient};
use crate::error::PortalError;
use crate::models::{AttemptEntry, Listing, ListingKind, Token, User};

pub struct ReadModelFetcher<C> {
    client: C,
}

impl<C: PrivilegedCommandClient> ReadModelFetcher<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn fetch_users(&self, session: &Session) -> Result<Vec<User>, PortalError> {
        self.fetch(CommandId::ListUsers, session, "users")
    }

    pub fn fetch_failed_attempts(&self, session: &Session) -> Result<Vec<AttemptEntry>, PortalError> {
        self.fetch(CommandId::ListAttempts, session, "failed attempts")
    }

    pub fn fetch_sessions(&self, session: &Session) -> Result<Vec<Token>, PortalError> {
        self.fetch(CommandId::ListSessions, session, "sessions")
    }

    /// Fetch one listing by kind.
    pub fn fetch_listing(&self, session: &Session, kind: ListingKind) -> Result<Listing, PortalError> {
        Ok(match kind {
            ListingKind::Users => Listing::Users(self.fetch_users(session)?),
            ListingKind::Sessions => Listing::Sessions(self.fetch_sessions(session)?),
            ListingKind::Attempts => Listing::Attempts(self.fetch_failed_attempts(session)?),
        })
    }

    fn fetch<T: DeserializeOwned>(
        &self,
        command: CommandId,
        session: &Session,
        what: &'static str,
    ) -> Result<Vec<T>, PortalError> {
        let output = self.client.invoke(command, &[session.id.clone()])?;

        if interpret(command, output.exit_code) != Outcome::Succeeded {
            // Backend diagnostics are not surfaced for fetches.
            warn!(%command, exit_code = output.exit_code, "Fetch failed");
            return Err(PortalError::FetchFailed(what));
        }

        let items: Vec<T> =
            serde_json::from_str(output.stdout.trim()).map_err(|source| PortalError::Parse { what, source })?;
        debug!(%command, count = items.len(), "Fetched {}", what);
        Ok(items)
    }
}
