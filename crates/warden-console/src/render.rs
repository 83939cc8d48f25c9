//! Plain-text rendering of listings and entries.

use std::fmt::Write;

use warden_core::models::{AttemptEntry, EntryRef, Listing, Token, User};
use warden_core::{Privilege, Session};

use crate::utils::{format_bytes, format_optional, format_phone, format_timestamp, truncate_string, yes_no};

const NAME_WIDTH: usize = 24;
const USERNAME_WIDTH: usize = 20;
const ID_WIDTH: usize = 26;

/// Render a listing as a numbered table. `rows` are indices into `listing`,
/// so filtered views keep the numbering of the full list.
pub fn render_listing(listing: &Listing, rows: &[usize]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", header(listing));

    for &index in rows {
        let Some(entry) = listing.get(index) else {
            continue;
        };
        let line = match entry {
            EntryRef::User(user) => user_row(user),
            EntryRef::Token(token) => token_row(token),
            EntryRef::Attempt(attempt) => attempt_row(attempt),
        };
        let _ = writeln!(out, "{:>4}  {}", index + 1, line);
    }

    let _ = write!(out, "{} of {} {}", rows.len(), listing.len(), listing.kind());
    out
}

fn header(listing: &Listing) -> String {
    let columns = match listing {
        Listing::Users(_) => format!(
            "{:<uw$}  {:<nw$}  {:<5}  {:<5}  {:<4}  {:<6}  {:>8}",
            "Username",
            "Name",
            "Admin",
            "Dev",
            "Root",
            "Frozen",
            "Attempts",
            uw = USERNAME_WIDTH,
            nw = NAME_WIDTH,
        ),
        Listing::Sessions(_) => format!(
            "{:<uw$}  {:<iw$}  {}",
            "Username",
            "User ID",
            "Login time",
            uw = USERNAME_WIDTH,
            iw = ID_WIDTH,
        ),
        Listing::Attempts(_) => format!("{:<uw$}  {}", "Username", "Time", uw = USERNAME_WIDTH),
    };
    format!("{:>4}  {}", "#", columns)
}

fn user_row(user: &User) -> String {
    format!(
        "{:<uw$}  {:<nw$}  {:<5}  {:<5}  {:<4}  {:<6}  {:>8}",
        truncate_string(&user.username, USERNAME_WIDTH),
        truncate_string(&user.full_name(), NAME_WIDTH),
        yes_no(user.app_admin),
        yes_no(user.dev_admin),
        yes_no(user.root_auth()),
        yes_no(user.disabled),
        user.failed_attempts,
        uw = USERNAME_WIDTH,
        nw = NAME_WIDTH,
    )
}

fn token_row(token: &Token) -> String {
    format!(
        "{:<uw$}  {:<iw$}  {}",
        truncate_string(&format_optional(&token.username, "-"), USERNAME_WIDTH),
        truncate_string(&format_optional(&token.user_id, "-"), ID_WIDTH),
        format_timestamp(token.login_time_parsed(), &token.login_time),
        uw = USERNAME_WIDTH,
        iw = ID_WIDTH,
    )
}

fn attempt_row(attempt: &AttemptEntry) -> String {
    if attempt.is_header() {
        return format!("{:<uw$}  (no timestamp)", format_optional(&attempt.user, "-"), uw = USERNAME_WIDTH);
    }
    format!(
        "{:<uw$}  {}",
        truncate_string(&format_optional(&attempt.user, "-"), USERNAME_WIDTH),
        format_timestamp(attempt.time_parsed(), &attempt.time),
        uw = USERNAME_WIDTH,
    )
}

/// Full details of a single entry.
pub fn render_entry(entry: EntryRef<'_>) -> String {
    let fields: Vec<(&str, String)> = match entry {
        EntryRef::User(user) => vec![
            ("Name", user.display_name()),
            ("Username", user.username.clone()),
            ("User ID", user.id.clone()),
            ("Email", format_optional(&user.email, "-")),
            ("Phone", user.phone.as_deref().map(format_phone).unwrap_or_else(|| "-".to_string())),
            ("Preferred contact", format_optional(&user.preferred_contact, "-")),
            ("App admin", yes_no(user.app_admin).to_string()),
            ("Dev admin", yes_no(user.dev_admin).to_string()),
            ("Root access", yes_no(user.root_auth()).to_string()),
            ("Two-factor", yes_no(user.two_fa_enabled()).to_string()),
            ("Frozen", yes_no(user.disabled).to_string()),
            ("Vault size", format_bytes(user.vault_size)),
            ("Failed attempts", user.failed_attempts.to_string()),
        ],
        EntryRef::Token(token) => vec![
            ("Username", format_optional(&token.username, "-")),
            ("User ID", format_optional(&token.user_id, "-")),
            ("Session ID", format_optional(&token.session_id, "-")),
            ("Login time", format_timestamp(token.login_time_parsed(), &token.login_time)),
        ],
        EntryRef::Attempt(attempt) => vec![
            ("Username", format_optional(&attempt.user, "-")),
            ("Time", format_timestamp(attempt.time_parsed(), &attempt.time)),
        ],
    };

    let width = fields.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    fields
        .iter()
        .map(|(label, value)| format!("  {:<width$}  {}", label, value, width = width))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The operator's own session.
pub fn render_session(session: &Session, privilege: Option<Privilege>) -> String {
    let minutes = session.age().num_minutes();
    format!(
        "{}\nPrivilege: {}\nSigned in {} minute(s) ago",
        session,
        privilege.map(|p| p.to_string()).unwrap_or_else(|| "none".to_string()),
        minutes
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> Listing {
        let users: Vec<User> = serde_json::from_value(serde_json::json!([
            { "id": "u1", "username": "alice", "first_name": "Alice", "last_name": "Smith", "admin": true },
            { "id": "u2", "username": "bob", "frozen": true, "failed_attempts": 3 }
        ]))
        .unwrap();
        Listing::Users(users)
    }

    #[test]
    fn test_listing_numbers_follow_full_list() {
        let listing = users();
        let out = render_listing(&listing, &[1]);
        assert!(out.contains("   2  bob"));
        assert!(!out.contains("alice"));
        assert!(out.ends_with("1 of 2 users"));
    }

    #[test]
    fn test_user_row_flags() {
        let listing = users();
        let out = render_listing(&listing, &[0, 1]);
        let alice = out.lines().find(|l| l.contains("alice")).unwrap();
        assert!(alice.contains("Alice Smith"));
        assert!(alice.contains("yes"));
    }

    #[test]
    fn test_attempt_header_row() {
        let listing = Listing::Attempts(vec![AttemptEntry {
            user: Some("carol".to_string()),
            time: None,
        }]);
        let out = render_listing(&listing, &[0]);
        assert!(out.contains("(no timestamp)"));
        assert!(out.ends_with("1 of 1 failed attempts"));
    }

    #[test]
    fn test_render_user_details() {
        let listing = users();
        let out = render_entry(listing.get(1).unwrap());
        assert!(out.contains("User ID"));
        assert!(out.contains("u2"));
        let line = |label: &str| out.lines().find(|l| l.trim_start().starts_with(label)).unwrap().to_string();
        assert!(line("Failed attempts").ends_with(" 3"));
        assert!(line("Vault size").ends_with(" 0 B"));
        assert!(line("Frozen").ends_with(" yes"));
    }

    #[test]
    fn test_render_session() {
        let session = Session::new("tok", "root");
        let out = render_session(&session, Some(Privilege::Root));
        assert!(out.starts_with("User: root, Token Value: tok"));
        assert!(out.contains("Privilege: root"));
    }
}
