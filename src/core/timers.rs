use std::future::{poll_fn, Future};
use std::pin::Pin;
use std::task::Poll;
use std::time::Duration;

use tokio::time::Sleep;

use crate::core::command::LoopKind;

/// One optional pending sleep per loop kind. Arming a kind replaces whatever was
/// pending for it, so there is never more than one live timer of a kind.
#[derive(Debug, Default)]
pub struct Timers {
    slots: [Option<Pin<Box<Sleep>>>; 3],
}

impl Timers {
    pub fn arm(&mut self, kind: LoopKind, after: Duration) {
        self.slots[kind.index()] = Some(Box::pin(tokio::time::sleep(after)));
    }

    pub fn disarm(&mut self, kind: LoopKind) {
        self.slots[kind.index()] = None;
    }

    pub fn is_armed(&self, kind: LoopKind) -> bool {
        self.slots[kind.index()].is_some()
    }

    pub fn any_armed(&self) -> bool {
        self.slots.iter().any(Option::is_some)
    }

    /// Resolves with the first timer to elapse and clears its slot.
    /// Pending forever while nothing is armed. Cancel-safe.
    pub async fn fired(&mut self) -> LoopKind {
        poll_fn(|cx| {
            for kind in LoopKind::ALL {
                let slot = &mut self.slots[kind.index()];
                if let Some(sleep) = slot.as_mut() {
                    if sleep.as_mut().poll(cx).is_ready() {
                        *slot = None;
                        return Poll::Ready(kind);
                    }
                }
            }
            Poll::Pending
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn rearming_replaces_the_pending_timer() {
        let mut timers = Timers::default();
        timers.arm(LoopKind::Autoplay, Duration::from_millis(50));
        timers.arm(LoopKind::Autoplay, Duration::from_millis(500));
        timers.arm(LoopKind::Training, Duration::from_millis(200));

        let start = tokio::time::Instant::now();
        assert_eq!(timers.fired().await, LoopKind::Training);
        assert_eq!(start.elapsed(), Duration::from_millis(200));
        assert!(!timers.is_armed(LoopKind::Training));

        assert_eq!(timers.fired().await, LoopKind::Autoplay);
        assert_eq!(start.elapsed(), Duration::from_millis(500));
        assert!(!timers.any_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn disarmed_timer_never_fires() {
        let mut timers = Timers::default();
        timers.arm(LoopKind::Evaluation, Duration::from_millis(10));
        timers.disarm(LoopKind::Evaluation);
        let fired = tokio::time::timeout(Duration::from_secs(5), timers.fired()).await;
        assert!(fired.is_err());
    }
}
