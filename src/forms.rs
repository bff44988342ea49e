//! Single-use form tokens guarding against double submission.
//!
//! A token is minted when a client fetches a form and must be echoed back
//! exactly once on submit. Keys are scoped to the login session, the
//! operation and the resource the form is about.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
    time::{Duration, Instant},
};

use uuid::Uuid;

/// Unredeemed tokens expire with the login that minted them.
pub const TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormAction {
    Checkout,
    Review,
    ReportIssue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FormKey {
    pub session_id: Uuid,
    pub action: FormAction,
    pub resource_id: Uuid,
}

impl FormKey {
    pub fn new(session_id: Uuid, action: FormAction, resource_id: Uuid) -> Self {
        Self {
            session_id,
            action,
            resource_id,
        }
    }
}

#[derive(Debug)]
struct Minted {
    token: String,
    at: Instant,
}

#[derive(Clone)]
pub struct FormTokens {
    inner: Arc<Mutex<HashMap<FormKey, Minted>>>,
    ttl: Duration,
}

impl Default for FormTokens {
    fn default() -> Self {
        Self::with_ttl(TOKEN_TTL)
    }
}

impl FormTokens {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<FormKey, Minted>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn live(&self, minted: &Minted, now: Instant) -> bool {
        now.duration_since(minted.at) < self.ttl
    }

    /// Mint a fresh token for `key`, replacing any previous one. Expired
    /// tokens are dropped on the way.
    pub fn mint(&self, key: FormKey) -> String {
        let token = Uuid::new_v4().simple().to_string();
        let now = Instant::now();
        let mut map = self.entries();
        map.retain(|_, minted| self.live(minted, now));
        map.insert(
            key,
            Minted {
                token: token.clone(),
                at: now,
            },
        );
        token
    }

    /// Whether `presented` is the live token for `key`, without using it up.
    pub fn is_live(&self, key: FormKey, presented: Option<&str>) -> bool {
        let Some(presented) = presented.filter(|t| !t.is_empty()) else {
            return false;
        };
        let now = Instant::now();
        self.entries()
            .get(&key)
            .is_some_and(|minted| minted.token == presented && self.live(minted, now))
    }

    /// Take the token for `key` if `presented` matches it. A mismatch
    /// leaves the stored token in place; an expired one is dropped.
    pub fn redeem(&self, key: FormKey, presented: Option<&str>) -> bool {
        let Some(presented) = presented.filter(|t| !t.is_empty()) else {
            return false;
        };
        let now = Instant::now();
        let mut map = self.entries();
        match map.get(&key) {
            Some(minted) if !self.live(minted, now) => {
                map.remove(&key);
                false
            }
            Some(minted) if minted.token == presented => {
                map.remove(&key);
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(action: FormAction) -> FormKey {
        FormKey::new(Uuid::nil(), action, Uuid::nil())
    }

    #[test]
    fn token_redeems_once() {
        let tokens = FormTokens::new();
        let token = tokens.mint(key(FormAction::Checkout));
        assert!(tokens.redeem(key(FormAction::Checkout), Some(&token)));
        assert!(!tokens.redeem(key(FormAction::Checkout), Some(&token)));
    }

    #[test]
    fn wrong_or_missing_token_keeps_stored_one() {
        let tokens = FormTokens::new();
        let token = tokens.mint(key(FormAction::Review));
        assert!(!tokens.redeem(key(FormAction::Review), Some("nope")));
        assert!(!tokens.redeem(key(FormAction::Review), None));
        assert!(!tokens.redeem(key(FormAction::Review), Some("")));
        assert!(tokens.redeem(key(FormAction::Review), Some(&token)));
    }

    #[test]
    fn tokens_are_scoped_by_action_and_resource() {
        let tokens = FormTokens::new();
        let token = tokens.mint(key(FormAction::Review));
        assert!(!tokens.redeem(key(FormAction::ReportIssue), Some(&token)));

        let other = FormKey::new(Uuid::nil(), FormAction::Review, Uuid::new_v4());
        assert!(!tokens.redeem(other, Some(&token)));
    }

    #[test]
    fn reminting_invalidates_previous_token() {
        let tokens = FormTokens::new();
        let first = tokens.mint(key(FormAction::Checkout));
        let second = tokens.mint(key(FormAction::Checkout));
        assert!(!tokens.redeem(key(FormAction::Checkout), Some(&first)));
        assert!(tokens.redeem(key(FormAction::Checkout), Some(&second)));
    }

    #[test]
    fn checking_does_not_use_the_token_up() {
        let tokens = FormTokens::new();
        let token = tokens.mint(key(FormAction::Checkout));
        assert!(tokens.is_live(key(FormAction::Checkout), Some(&token)));
        assert!(tokens.is_live(key(FormAction::Checkout), Some(&token)));
        assert!(!tokens.is_live(key(FormAction::Checkout), Some("other")));
        assert!(tokens.redeem(key(FormAction::Checkout), Some(&token)));
        assert!(!tokens.is_live(key(FormAction::Checkout), Some(&token)));
    }

    #[test]
    fn expired_tokens_cannot_be_redeemed() {
        let tokens = FormTokens::with_ttl(Duration::ZERO);
        let token = tokens.mint(key(FormAction::Review));
        assert!(!tokens.is_live(key(FormAction::Review), Some(&token)));
        assert!(!tokens.redeem(key(FormAction::Review), Some(&token)));
        assert!(tokens.is_empty());
    }

    #[test]
    fn minting_evicts_expired_entries() {
        let tokens = FormTokens::with_ttl(Duration::ZERO);
        for _ in 0..5 {
            tokens.mint(FormKey::new(Uuid::new_v4(), FormAction::Checkout, Uuid::nil()));
        }
        assert_eq!(tokens.len(), 1);

        let tokens = FormTokens::new();
        for _ in 0..5 {
            tokens.mint(FormKey::new(Uuid::new_v4(), FormAction::Checkout, Uuid::nil()));
        }
        assert_eq!(tokens.len(), 5);
    }
}
