use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::SystemTime;
use tracing::{debug, info, warn};
use once_cell::sync::Lazy;

/// Process-wide revocation list
static TOKEN_BLACKLIST: Lazy<TokenBlacklist> = Lazy::new(TokenBlacklist::new);

/// Default number of entries kept before pruning
const DEFAULT_MAX_SIZE: usize = 10_000;

/// Prefix of account-wide entries; these are never pruned for space
pub const ACCOUNT_KEY_PREFIX: &str = "user:";

/// Revoked token identifiers.
///
/// Keys are either a single token (`jti:{id}`) or a whole account
/// (`user:{id}`). Each entry keeps the time it stops mattering and the time
/// it was added, so expired entries can be dropped and, when the list is
/// full, the oldest single-token entries go first.
pub struct TokenBlacklist {
    revoked_tokens: Mutex<HashMap<String, (SystemTime, SystemTime)>>,
    max_size: usize,
}

impl Default for TokenBlacklist {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenBlacklist {
    pub fn new() -> Self {
        Self::with_max_size(DEFAULT_MAX_SIZE)
    }

    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            revoked_tokens: Mutex::new(HashMap::new()),
            max_size: max_size.max(1),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, (SystemTime, SystemTime)>> {
        // A panic while holding the lock leaves the map itself intact
        self.revoked_tokens.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add an identifier that stays revoked until `expiration`
    pub fn revoke_token(&self, token_id: &str, expiration: SystemTime) {
        let revocation_time = SystemTime::now();
        let mut tokens = self.entries();

        if tokens.len() >= self.max_size && !tokens.contains_key(token_id) {
            warn!("Token blacklist reached max size ({}), pruning", self.max_size);
            Self::cleanup_expired_tokens_internal(&mut tokens);

            if tokens.len() >= self.max_size {
                let excess = tokens.len() + 1 - self.max_size;
                Self::remove_oldest_entries(&mut tokens, excess);
            }
        }

        tokens.insert(token_id.to_string(), (expiration, revocation_time));
        info!("Token revoked: {}", token_id);
    }

    /// Drop an identifier from the list, e.g. when a banned account is restored
    pub fn restore(&self, token_id: &str) -> bool {
        let removed = self.entries().remove(token_id).is_some();
        if removed {
            info!("Token restored: {}", token_id);
        }
        removed
    }

    pub fn is_revoked(&self, token_id: &str) -> bool {
        self.entries().contains_key(token_id)
    }

    pub fn size(&self) -> usize {
        self.entries().len()
    }

    /// Remove entries whose expiration has passed; returns how many went
    pub fn cleanup_expired_tokens(&self) -> usize {
        let mut tokens = self.entries();
        Self::cleanup_expired_tokens_internal(&mut tokens)
    }

    fn cleanup_expired_tokens_internal(tokens: &mut HashMap<String, (SystemTime, SystemTime)>) -> usize {
        let now = SystemTime::now();
        let before_count = tokens.len();
        tokens.retain(|_, (expiration, _)| *expiration > now);

        let removed = before_count - tokens.len();
        if removed > 0 {
            debug!("Removed {} expired tokens from blacklist", removed);
        }
        removed
    }

    fn remove_oldest_entries(tokens: &mut HashMap<String, (SystemTime, SystemTime)>, count: usize) {
        let mut by_age: Vec<(String, SystemTime)> = tokens
            .iter()
            .filter(|(key, _)| !key.starts_with(ACCOUNT_KEY_PREFIX))
            .map(|(key, (_, revoked_at))| (key.clone(), *revoked_at))
            .collect();
        by_age.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

        let mut removed = 0;
        for (key, _) in by_age.into_iter().take(count) {
            tokens.remove(&key);
            removed += 1;
        }
        debug!("Removed {} oldest entries from token blacklist", removed);
    }
}

/// The global revocation list
pub fn blacklist() -> &'static TokenBlacklist {
    &TOKEN_BLACKLIST
}

/// Hourly task that drops expired entries from the global list
pub fn start_cleanup_task() -> tokio::task::JoinHandle<()> {
    use std::time::Duration;

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(3600));
        loop {
            interval.tick().await;
            let removed = blacklist().cleanup_expired_tokens();
            debug!("Token blacklist cleanup removed {}, {} remain", removed, blacklist().size());
        }
    })
}
