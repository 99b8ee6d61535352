use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use base64::Engine;
use parking_lot::RwLock;

use crate::error::{AppError, AppResult};
use crate::tprintln;

pub type SessionToken = String;

#[derive(Debug, Clone)]
pub struct Session {
    pub token: SessionToken,
    pub user: String,
    pub issued_at: Instant,
    pub expires_at: Instant,
}

/// Fills a buffer with unpredictable bytes.
pub type EntropySource = fn(&mut [u8]) -> Result<(), getrandom::Error>;

fn gen_token(entropy: EntropySource) -> AppResult<SessionToken> {
    // 256-bit random token, base64url without padding
    let mut buf = [0u8; 32];
    entropy(&mut buf).map_err(|e| AppError::internal(format!("session token generation failed: {}", e)))?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf))
}

/// In-memory session table. Tokens are opaque; nothing about the credentials is derivable
/// from them. A restart drops every session.
pub struct SessionManager {
    ttl: Duration,
    entropy: EntropySource,
    sessions: RwLock<HashMap<SessionToken, Session>>,
    by_user: RwLock<HashMap<String, HashSet<SessionToken>>>,
}

impl SessionManager {
    pub fn new(ttl: Duration) -> Self {
        Self::with_entropy(ttl, getrandom::getrandom)
    }

    pub fn with_entropy(ttl: Duration, entropy: EntropySource) -> Self {
        Self { ttl, entropy, sessions: RwLock::new(HashMap::new()), by_user: RwLock::new(HashMap::new()) }
    }

    pub fn ttl(&self) -> Duration { self.ttl }

    /// Start a session for `user`. Fails without issuing anything when the entropy source does.
    pub fn issue(&self, user: &str) -> AppResult<Session> {
        let token = gen_token(self.entropy)?;
        let now = Instant::now();
        let sess = Session {
            token,
            user: user.to_string(),
            issued_at: now,
            expires_at: now + self.ttl,
        };
        self.sessions.write().insert(sess.token.clone(), sess.clone());
        self.by_user.write().entry(user.to_string()).or_default().insert(sess.token.clone());
        tprintln!("session.issue user={} ttl_secs={}", user, self.ttl.as_secs());
        Ok(sess)
    }

    /// Return the session's user if the token is known and unexpired. Expired tokens are pruned.
    pub fn validate(&self, token: &str) -> Option<String> {
        let now = Instant::now();
        {
            let map = self.sessions.read();
            match map.get(token) {
                Some(s) if s.expires_at > now => return Some(s.user.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        self.remove(token);
        None
    }

    pub fn logout(&self, token: &str) -> bool {
        self.remove(token).is_some()
    }

    /// Drop every session of `user`. Returns how many were live.
    pub fn revoke_user(&self, user: &str) -> usize {
        let tokens = self.by_user.write().remove(user).unwrap_or_default();
        let mut sessions = self.sessions.write();
        let count = tokens.iter().filter(|t| sessions.remove(*t).is_some()).count();
        tprintln!("session.revoke user={} count={}", user, count);
        count
    }

    /// Remove expired sessions. Returns number removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<SessionToken> = self.sessions.read().values()
            .filter(|s| s.expires_at <= now)
            .map(|s| s.token.clone())
            .collect();
        expired.iter().filter(|t| self.remove(t).is_some()).count()
    }

    pub fn len(&self) -> usize { self.sessions.read().len() }

    pub fn is_empty(&self) -> bool { self.sessions.read().is_empty() }

    fn remove(&self, token: &str) -> Option<Session> {
        let sess = self.sessions.write().remove(token)?;
        let mut idx = self.by_user.write();
        if let Some(set) = idx.get_mut(&sess.user) {
            set.remove(token);
            if set.is_empty() { idx.remove(&sess.user); }
        }
        Some(sess)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_validate_logout() {
        let mgr = SessionManager::new(Duration::from_secs(60));
        let s = mgr.issue("admin").unwrap();
        assert_eq!(s.token.len(), 43);
        assert_eq!(mgr.validate(&s.token).as_deref(), Some("admin"));
        assert!(mgr.validate("forged").is_none());
        assert!(mgr.logout(&s.token));
        assert!(mgr.validate(&s.token).is_none());
        assert!(!mgr.logout(&s.token));
    }

    #[test]
    fn tokens_are_unique() {
        let mgr = SessionManager::new(Duration::from_secs(60));
        assert_ne!(mgr.issue("a").unwrap().token, mgr.issue("a").unwrap().token);
    }

    #[test]
    fn expired_sessions_are_rejected_and_pruned() {
        let mgr = SessionManager::new(Duration::from_millis(10));
        let s = mgr.issue("admin").unwrap();
        mgr.issue("admin").unwrap();
        std::thread::sleep(Duration::from_millis(30));
        assert!(mgr.validate(&s.token).is_none());
        assert_eq!(mgr.len(), 1);
        assert_eq!(mgr.sweep(), 1);
        assert!(mgr.is_empty());
    }

    #[test]
    fn revoke_user_drops_all_tokens() {
        let mgr = SessionManager::new(Duration::from_secs(60));
        let a = mgr.issue("admin").unwrap();
        let b = mgr.issue("admin").unwrap();
        let other = mgr.issue("viewer").unwrap();
        assert_eq!(mgr.revoke_user("admin"), 2);
        assert!(mgr.validate(&a.token).is_none());
        assert!(mgr.validate(&b.token).is_none());
        assert!(mgr.validate(&other.token).is_some());
        assert_eq!(mgr.revoke_user("admin"), 0);
    }

    fn broken_entropy(_: &mut [u8]) -> Result<(), getrandom::Error> {
        Err(getrandom::Error::UNSUPPORTED)
    }

    #[test]
    fn entropy_failure_issues_nothing() {
        let mgr = SessionManager::with_entropy(Duration::from_secs(60), broken_entropy);
        let err = mgr.issue("admin").unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
        assert!(mgr.is_empty());
        assert_eq!(mgr.revoke_user("admin"), 0);
    }
}
