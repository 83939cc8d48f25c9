use std::fmt;

use super::{AttemptEntry, Token, User};

/// Which read model a listing came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingKind {
    Users,
    Sessions,
    Attempts,
}

impl fmt::Display for ListingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListingKind::Users => write!(f, "users"),
            ListingKind::Sessions => write!(f, "sessions"),
            ListingKind::Attempts => write!(f, "failed attempts"),
        }
    }
}

/// The current contents of one fetched list.
#[derive(Debug, Clone, PartialEq)]
pub enum Listing {
    Users(Vec<User>),
    Sessions(Vec<Token>),
    Attempts(Vec<AttemptEntry>),
}

impl Listing {
    pub fn kind(&self) -> ListingKind {
        match self {
            Listing::Users(_) => ListingKind::Users,
            Listing::Sessions(_) => ListingKind::Sessions,
            Listing::Attempts(_) => ListingKind::Attempts,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Listing::Users(v) => v.len(),
            Listing::Sessions(v) => v.len(),
            Listing::Attempts(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<EntryRef<'_>> {
        match self {
            Listing::Users(v) => v.get(index).map(EntryRef::User),
            Listing::Sessions(v) => v.get(index).map(EntryRef::Token),
            Listing::Attempts(v) => v.get(index).map(EntryRef::Attempt),
        }
    }

    pub fn entries(&self) -> Vec<EntryRef<'_>> {
        (0..self.len()).filter_map(|i| self.get(i)).collect()
    }

    /// Entries matching `query`, with their index in the full listing.
    pub fn search(&self, query: &str) -> Vec<(usize, EntryRef<'_>)> {
        self.entries()
            .into_iter()
            .enumerate()
            .filter(|(_, entry)| entry.matches(query))
            .collect()
    }
}

/// A selected row of any listing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntryRef<'a> {
    User(&'a User),
    Token(&'a Token),
    Attempt(&'a AttemptEntry),
}

impl<'a> EntryRef<'a> {
    /// User id a per-user admin action applies to.
    pub fn action_target(&self) -> Option<&'a str> {
        match self {
            EntryRef::User(user) => Some(user.id.as_str()),
            EntryRef::Token(_) | EntryRef::Attempt(_) => None,
        }
    }

    /// Id passed to `logout` to revoke this row's sessions.
    pub fn logout_target(&self) -> Option<&'a str> {
        match self {
            EntryRef::User(user) => Some(user.id.as_str()),
            EntryRef::Token(token) => token.user_id.as_deref(),
            EntryRef::Attempt(_) => None,
        }
    }

    /// Case-insensitive match against the row's text fields.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        let hit = |field: Option<&str>| field.is_some_and(|f| f.to_lowercase().contains(&query));
        match self {
            EntryRef::User(user) => {
                let name = user.full_name();
                hit(Some(user.id.as_str()))
                    || hit(Some(user.username.as_str()))
                    || hit(Some(name.as_str()))
                    || hit(user.email.as_deref())
            }
            EntryRef::Token(token) => {
                hit(token.username.as_deref())
                    || hit(token.user_id.as_deref())
                    || hit(token.session_id.as_deref())
            }
            EntryRef::Attempt(attempt) => hit(attempt.user.as_deref()) || hit(attempt.time.as_deref()),
        }
    }
}
