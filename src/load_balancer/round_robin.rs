// src/load_balancer/round_robin.rs
use crate::proxy::{Backend, BackendPool};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Round-robin selection over a [`BackendPool`] that skips dead backends and
/// fails closed when none are alive.
///
/// The cursor only moves inside [`next_eligible`](Self::next_eligible), and
/// every call moves it at least once. With all backends alive, N consecutive
/// calls therefore visit N distinct backends no matter how callers
/// interleave.
#[derive(Debug)]
pub struct RoundRobinSelector {
    pool: BackendPool,
    cursor: Mutex<usize>,
}

impl RoundRobinSelector {
    pub fn new(pool: BackendPool) -> Self {
        Self {
            pool,
            cursor: Mutex::new(0),
        }
    }

    pub fn pool(&self) -> &BackendPool {
        &self.pool
    }

    /// Index of the next live backend, or `None` after one full lap finds
    /// nothing alive. On success the cursor ends up just past the chosen
    /// backend; on exhaustion it ends one past where the lap started.
    pub async fn next_eligible(&self) -> Option<usize> {
        let backends = self.pool.all_backends();
        let len = backends.len();
        let mut cursor = self.cursor.lock().await;
        let start = *cursor;

        loop {
            let current = *cursor;
            *cursor = (current + 1) % len;

            if backends[current].is_alive() {
                return Some(current);
            }
            if *cursor == start {
                *cursor = (start + 1) % len;
                return None;
            }
        }
    }

    pub async fn next_backend(&self) -> Option<Arc<Backend>> {
        let index = self.next_eligible().await?;
        self.pool.get(index).cloned()
    }

    /// Where the next scan will start.
    pub async fn cursor(&self) -> usize {
        *self.cursor.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selector(n: u16) -> RoundRobinSelector {
        let addresses: Vec<String> = (0..n)
            .map(|i| format!("http://127.0.0.1:{}", 9000 + i))
            .collect();
        RoundRobinSelector::new(BackendPool::build(&addresses).unwrap())
    }

    async fn set_alive(selector: &RoundRobinSelector, flags: &[bool]) {
        for (backend, alive) in selector.pool().all_backends().iter().zip(flags) {
            backend.set_alive(*alive).await;
        }
    }

    #[tokio::test]
    async fn cycles_in_order_and_wraps() {
        let s = selector(3);
        let mut picks = Vec::new();
        for _ in 0..7 {
            picks.push(s.next_eligible().await.unwrap());
        }
        assert_eq!(picks, [0, 1, 2, 0, 1, 2, 0]);
        assert_eq!(s.cursor().await, 1);
    }

    #[tokio::test]
    async fn skips_dead_and_stops_past_choice() {
        let s = selector(3);
        set_alive(&s, &[false, true, false]).await;

        assert_eq!(s.next_eligible().await, Some(1));
        assert_eq!(s.cursor().await, 2);

        // From C the scan wraps through A back to B.
        assert_eq!(s.next_eligible().await, Some(1));
        assert_eq!(s.cursor().await, 2);
    }

    #[tokio::test]
    async fn all_dead_fails_closed_after_one_lap() {
        let s = selector(4);
        set_alive(&s, &[false, false, false, false]).await;
        s.next_eligible().await;

        let before = s.cursor().await;
        assert_eq!(s.next_eligible().await, None);
        assert_eq!(s.cursor().await, (before + 1) % 4);
        assert!(s.next_backend().await.is_none());
        assert_eq!(s.cursor().await, (before + 2) % 4);
    }

    #[tokio::test]
    async fn single_backend_always_selected_when_alive() {
        let s = selector(1);
        assert_eq!(s.next_eligible().await, Some(0));
        assert_eq!(s.next_eligible().await, Some(0));
        assert_eq!(s.cursor().await, 0);

        set_alive(&s, &[false]).await;
        assert_eq!(s.next_eligible().await, None);
    }
}
