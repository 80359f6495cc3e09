//! Default workspace names and login normalisation.

use std::collections::HashSet;

pub const SMS_DOMAIN: &str = "expensify.sms";
pub const GROUP_WORKSPACE_NAME: &str = "My Group Workspace";

pub const DEFAULT_PUBLIC_DOMAINS: &[&str] = &[
    "aol.com",
    "comcast.net",
    "gmail.com",
    "gmx.com",
    "gmx.de",
    "googlemail.com",
    "hotmail.co.uk",
    "hotmail.com",
    "hotmail.fr",
    "icloud.com",
    "live.com",
    "mac.com",
    "mail.com",
    "mail.ru",
    "me.com",
    "msn.com",
    "outlook.com",
    "proton.me",
    "protonmail.com",
    "qq.com",
    "rocketmail.com",
    "yahoo.co.uk",
    "yahoo.com",
    "yahoo.fr",
    "yandex.ru",
    "ymail.com",
];

/// Email domains shared by unrelated people; workspaces for these are named
/// after the person rather than the domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicDomains(HashSet<String>);

impl Default for PublicDomains {
    fn default() -> Self {
        DEFAULT_PUBLIC_DOMAINS.iter().copied().collect()
    }
}

impl PublicDomains {
    pub fn contains(&self, domain: &str) -> bool {
        self.0.contains(&domain.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for PublicDomains {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|domain| domain.as_ref().trim().to_ascii_lowercase())
                .filter(|domain| !domain.is_empty())
                .collect(),
        )
    }
}

fn upper_first(raw: &str) -> String {
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Derives a workspace name from an email address.
///
/// Returns an empty string when `email` is not of the form `local@domain`.
/// When existing workspace names already contain the derived name
/// (case-insensitively), the count of such names is appended as a suffix.
pub fn generate_default_workspace_name<'a>(
    email: &str,
    existing_names: impl IntoIterator<Item = &'a str>,
    public_domains: &PublicDomains,
) -> String {
    let parts: Vec<&str> = email.split('@').collect();
    let [username, domain] = parts.as_slice() else {
        return String::new();
    };

    let domain_lower = domain.to_ascii_lowercase();
    let base_name = if domain_lower == SMS_DOMAIN {
        GROUP_WORKSPACE_NAME.to_string()
    } else if public_domains.contains(&domain_lower) {
        format!("{}'s Workspace", upper_first(username))
    } else {
        let label = domain.split('.').next().unwrap_or_default();
        format!("{}'s Workspace", upper_first(label))
    };

    let needle = base_name.to_lowercase();
    let suffix = existing_names
        .into_iter()
        .filter(|name| name.to_lowercase().contains(&needle))
        .count();

    if suffix > 0 {
        format!("{base_name} {suffix}")
    } else {
        base_name
    }
}

fn is_e164_phone_number(login: &str) -> bool {
    let digits = login.strip_prefix('+').unwrap_or(login);
    let mut chars = digits.chars();
    matches!(chars.next(), Some('1'..='9'))
        && (2..=15).contains(&digits.len())
        && chars.all(|c| c.is_ascii_digit())
}

/// Phone-number logins are addressed through the SMS pseudo-domain.
pub fn add_sms_domain_if_phone_number(login: &str) -> String {
    let login = login.trim();
    if !login.contains('@') && is_e164_phone_number(login) {
        format!("{login}@{SMS_DOMAIN}")
    } else {
        login.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(email: &str, existing: &[&str]) -> String {
        generate_default_workspace_name(
            email,
            existing.iter().copied(),
            &PublicDomains::default(),
        )
    }

    #[test]
    fn public_domains_use_the_local_part() {
        assert_eq!(name("bob@gmail.com", &[]), "Bob's Workspace");
        assert_eq!(name("bob@GMAIL.com", &[]), "Bob's Workspace");
    }

    #[test]
    fn private_domains_use_the_first_domain_label() {
        assert_eq!(name("bob@acme.com", &[]), "Acme's Workspace");
        assert_eq!(name("carol@mail.acme.co.uk", &[]), "Mail's Workspace");
    }

    #[test]
    fn existing_names_add_a_numeric_suffix() {
        assert_eq!(
            name("bob@acme.com", &["Acme's Workspace"]),
            "Acme's Workspace 1"
        );
        assert_eq!(
            name("bob@acme.com", &["acme's workspace", "Acme's Workspace 1", "Other"]),
            "Acme's Workspace 2"
        );
    }

    #[test]
    fn malformed_emails_yield_an_empty_name() {
        assert_eq!(name("not-an-email", &[]), "");
        assert_eq!(name("a@b@c.com", &[]), "");
    }

    #[test]
    fn sms_logins_get_a_group_workspace() {
        assert_eq!(name("+15551234567@expensify.sms", &[]), GROUP_WORKSPACE_NAME);
    }

    #[test]
    fn custom_public_domain_lists_are_respected() {
        let domains: PublicDomains = ["Example.org"].into_iter().collect();
        assert_eq!(
            generate_default_workspace_name("dana@example.org", [], &domains),
            "Dana's Workspace"
        );
        assert_eq!(
            generate_default_workspace_name("dana@gmail.com", [], &domains),
            "Gmail's Workspace"
        );
    }

    #[test]
    fn phone_numbers_get_the_sms_domain() {
        assert_eq!(
            add_sms_domain_if_phone_number("+15551234567"),
            "+15551234567@expensify.sms"
        );
        assert_eq!(add_sms_domain_if_phone_number("bob@acme.com"), "bob@acme.com");
        assert_eq!(add_sms_domain_if_phone_number("+0123"), "+0123");
        assert_eq!(add_sms_domain_if_phone_number("12ab"), "12ab");
    }
}
