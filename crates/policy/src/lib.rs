//! Pure policy evaluation over a store snapshot (§4.E).
//!
//! Kept deliberately synchronous and free of I/O: the caller fetches the
//! booleans that make up [`Snapshot`] from `relay-db` just before calling
//! [`evaluate`], which makes this the easiest part of the relay to unit test
//! exhaustively (Testable Property 8).

/// Well-known relay-implementation software names, expanded from the magic
/// `relays` software-ban token (§3).
pub const WELL_KNOWN_RELAYS: &[&str] = &[
    "activityrelay",
    "aoderelay",
    "selective-relay",
    "relay",
    "gotosocial-relay",
];

/// The outcome of evaluating a subscription request or delivery attempt
/// against bans and the whitelist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    DenyBannedDomain,
    DenyBannedSoftware,
    DenyNotWhitelisted,
}

impl Decision {
    #[must_use]
    pub const fn is_allowed(self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Owned snapshot of the facts `evaluate` needs, fetched by the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct Snapshot {
    pub is_domain_banned: bool,
    pub is_software_banned: bool,
    pub is_whitelisted: bool,
    pub whitelist_enabled: bool,
}

/// Evaluates a `(domain, software)` pair against a snapshot of current bans
/// and whitelist state.
///
/// Precedence (spec.md §9 Open Question, resolved ban-wins-over-whitelist):
/// domain ban, then software ban, then whitelist. A domain that is both
/// banned and whitelisted is denied.
#[must_use]
pub fn evaluate(snapshot: Snapshot) -> Decision {
    if snapshot.is_domain_banned {
        return Decision::DenyBannedDomain;
    }
    if snapshot.is_software_banned {
        return Decision::DenyBannedSoftware;
    }
    if snapshot.whitelist_enabled && !snapshot.is_whitelisted {
        return Decision::DenyNotWhitelisted;
    }
    Decision::Allow
}

/// True if `name` (already lowercased) matches the `relays` magic token's
/// expansion.
#[must_use]
pub fn is_well_known_relay(name: &str) -> bool {
    WELL_KNOWN_RELAYS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_when_nothing_banned_and_whitelist_disabled() {
        let decision = evaluate(Snapshot::default());
        assert_eq!(decision, Decision::Allow);
    }

    #[test]
    fn domain_ban_wins_over_whitelist_membership() {
        let snapshot = Snapshot {
            is_domain_banned: true,
            is_whitelisted: true,
            whitelist_enabled: true,
            ..Snapshot::default()
        };
        assert_eq!(evaluate(snapshot), Decision::DenyBannedDomain);
    }

    #[test]
    fn software_ban_wins_over_whitelist_membership() {
        let snapshot = Snapshot {
            is_software_banned: true,
            is_whitelisted: true,
            whitelist_enabled: true,
            ..Snapshot::default()
        };
        assert_eq!(evaluate(snapshot), Decision::DenyBannedSoftware);
    }

    #[test]
    fn whitelist_enabled_denies_unlisted_domain() {
        let snapshot = Snapshot {
            whitelist_enabled: true,
            is_whitelisted: false,
            ..Snapshot::default()
        };
        assert_eq!(evaluate(snapshot), Decision::DenyNotWhitelisted);
    }

    #[test]
    fn whitelist_enabled_allows_listed_domain() {
        let snapshot = Snapshot {
            whitelist_enabled: true,
            is_whitelisted: true,
            ..Snapshot::default()
        };
        assert_eq!(evaluate(snapshot), Decision::Allow);
    }

    #[test]
    fn well_known_relay_expansion_matches_known_names() {
        assert!(is_well_known_relay("activityrelay"));
        assert!(!is_well_known_relay("mastodon"));
    }
}
