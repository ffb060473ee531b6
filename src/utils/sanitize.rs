// Name sanitization for ticket channels and panel ids

/// Maximum length of a sanitized name.
pub const MAX_NAME_LEN: usize = 40;

/// Sanitize a free-form name into a channel-name-safe slug: lower-cased,
/// every run of non-alphanumeric characters collapsed to a single hyphen,
/// no leading/trailing hyphen, truncated to 40 characters.
pub fn sanitize(input: &str) -> String {
    slug(input, '-')
}

/// Derive a panel id from its display name. Same algorithm as `sanitize`
/// but with underscores, so panel ids survive the `:` custom-id separator
/// and read distinctly from channel names.
pub fn panel_id(name: &str) -> String {
    slug(name, '_')
}

/// Channel name for a user's ticket.
pub fn ticket_channel_name(username: &str) -> String {
    format!("ticket-de-{}", sanitize(username))
}

/// True if the channel name belongs to a ticket channel.
pub fn is_ticket_channel(channel_name: &str) -> bool {
    channel_name.starts_with("ticket-")
}

fn slug(input: &str, sep: char) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_was_sep = true; // suppresses a leading separator

    for c in input.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            last_was_sep = false;
        } else if !last_was_sep {
            out.push(sep);
            last_was_sep = true;
        }
    }

    out.truncate(MAX_NAME_LEN);

    // Truncation (or an all-separator tail) can leave a dangling separator
    while out.ends_with(sep) {
        out.pop();
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercase_and_collapse() {
        assert_eq!(sanitize("John Doe"), "john-doe");
        assert_eq!(sanitize("a!!b"), "a-b");
        assert_eq!(sanitize("Foo   Bar__Baz"), "foo-bar-baz");
    }

    #[test]
    fn test_no_leading_or_trailing_hyphen() {
        assert_eq!(sanitize("--hello--"), "hello");
        assert_eq!(sanitize("!user!"), "user");
        assert_eq!(sanitize("!!!"), "");
    }

    #[test]
    fn test_truncates_to_40() {
        let long = "a".repeat(100);
        assert_eq!(sanitize(&long).len(), 40);

        // A separator exposed by truncation is trimmed
        let tricky = format!("{} {}", "a".repeat(39), "b".repeat(10));
        let out = sanitize(&tricky);
        assert_eq!(out, "a".repeat(39));
    }

    #[test]
    fn test_idempotent() {
        for input in ["John Doe", "--x--", "çãé user", &"ab ".repeat(30)] {
            let once = sanitize(input);
            assert_eq!(sanitize(&once), once);
        }
    }

    #[test]
    fn test_output_charset() {
        let out = sanitize("Wéird Nãme #42!");
        assert!(out.len() <= 40);
        assert!(out.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
        assert!(!out.contains("--"));
    }

    #[test]
    fn test_panel_id_uses_underscores() {
        assert_eq!(panel_id("Customer Support"), "customer_support");
        assert_eq!(panel_id("VIP!!area"), "vip_area");
    }

    #[test]
    fn test_ticket_channel_name() {
        assert_eq!(ticket_channel_name("John Doe"), "ticket-de-john-doe");
        assert!(is_ticket_channel("ticket-de-john-doe"));
        assert!(!is_ticket_channel("general"));
    }
}
