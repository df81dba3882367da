use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Identity of one play session.
///
/// Every continuation carries the token of the session that scheduled it.
/// Pausing, restarting or finishing cancels the token, so a continuation that
/// is already queued runs out as a no-op instead of stepping a stale run.
#[derive(Clone, Debug)]
pub struct SessionToken {
    id: u64,
    alive: Arc<AtomicBool>,
}

impl SessionToken {
    pub(crate) fn issue(id: u64) -> Self {
        Self {
            id,
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    pub fn cancel(&self) {
        self.alive.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let token = SessionToken::issue(7);
        let queued = token.clone();
        assert!(queued.is_alive());

        token.cancel();
        assert!(!queued.is_alive());
        assert_eq!(queued.id(), 7);
    }
}
