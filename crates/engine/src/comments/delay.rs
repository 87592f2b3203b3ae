//! Hover delay for showing and hiding the comment editor.
//!
//! Nothing here owns a timer. The host calls [`DisplayDelay::poll`] with the
//! current time and acts on whatever came due.

use std::time::{Duration, Instant};

use overgrid_core::CellAddress;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayAction {
    Show(CellAddress),
    Hide,
}

#[derive(Debug, Clone)]
pub struct DisplayDelay {
    delay: Duration,
    show: Option<(CellAddress, Instant)>,
    hide: Option<Instant>,
    /// Set when the pointer came back before a pending hide fired.
    hiding_cancelled: bool,
}

impl DisplayDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay, show: None, hide: None, hiding_cancelled: false }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = delay;
    }

    /// Show `cell` once the delay has passed. Replaces any pending show and
    /// drops a pending hide.
    pub fn schedule_show(&mut self, cell: CellAddress, now: Instant) {
        self.show = Some((cell, now + self.delay));
        self.hide = None;
        self.hiding_cancelled = false;
    }

    /// Hide once the delay has passed, unless cancelled first. Drops a
    /// pending show. A hide already pending keeps its deadline, but an
    /// earlier `cancel_hiding` is dropped: a new request means the pointer
    /// left again.
    pub fn schedule_hide(&mut self, now: Instant) {
        self.show = None;
        if self.hide.is_none() {
            self.hide = Some(now + self.delay);
        }
        self.hiding_cancelled = false;
    }

    pub fn cancel_hiding(&mut self) {
        if self.hide.is_some() {
            self.hiding_cancelled = true;
        }
    }

    pub fn cancel_all(&mut self) {
        self.show = None;
        self.hide = None;
        self.hiding_cancelled = false;
    }

    pub fn is_pending(&self) -> bool {
        self.show.is_some() || self.hide.is_some()
    }

    /// Actions that came due at `now`, in the order they were due.
    pub fn poll(&mut self, now: Instant) -> Vec<DelayAction> {
        let mut due = Vec::new();
        if let Some(at) = self.hide {
            if now >= at {
                self.hide = None;
                if !std::mem::replace(&mut self.hiding_cancelled, false) {
                    due.push(DelayAction::Hide);
                }
            }
        }
        if let Some((cell, at)) = self.show {
            if now >= at {
                self.show = None;
                due.push(DelayAction::Show(cell));
            }
        }
        due
    }
}

impl Default for DisplayDelay {
    fn default() -> Self {
        Self::from_millis(250)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_show_fires_after_delay() {
        let t0 = Instant::now();
        let mut delay = DisplayDelay::from_millis(100);
        delay.schedule_show(CellAddress::new(1, 1), t0);

        assert!(delay.poll(t0 + ms(50)).is_empty());
        assert_eq!(delay.poll(t0 + ms(100)), vec![DelayAction::Show(CellAddress::new(1, 1))]);
        assert!(!delay.is_pending());
    }

    #[test]
    fn test_newer_show_replaces_older() {
        let t0 = Instant::now();
        let mut delay = DisplayDelay::from_millis(100);
        delay.schedule_show(CellAddress::new(1, 1), t0);
        delay.schedule_show(CellAddress::new(2, 2), t0 + ms(60));

        assert!(delay.poll(t0 + ms(120)).is_empty());
        assert_eq!(delay.poll(t0 + ms(160)), vec![DelayAction::Show(CellAddress::new(2, 2))]);
    }

    #[test]
    fn test_hide_cancels_show() {
        let t0 = Instant::now();
        let mut delay = DisplayDelay::from_millis(100);
        delay.schedule_show(CellAddress::new(1, 1), t0);
        delay.schedule_hide(t0 + ms(10));

        assert_eq!(delay.poll(t0 + ms(200)), vec![DelayAction::Hide]);
    }

    #[test]
    fn test_cancel_hiding_latch() {
        let t0 = Instant::now();
        let mut delay = DisplayDelay::from_millis(100);
        delay.schedule_hide(t0);
        delay.cancel_hiding();

        assert!(delay.poll(t0 + ms(200)).is_empty());

        // The latch is spent; the next hide goes through.
        delay.schedule_hide(t0 + ms(300));
        assert_eq!(delay.poll(t0 + ms(400)), vec![DelayAction::Hide]);
    }

    #[test]
    fn test_cancel_without_pending_hide_is_ignored() {
        let t0 = Instant::now();
        let mut delay = DisplayDelay::from_millis(100);
        delay.cancel_hiding();
        delay.schedule_hide(t0);
        assert_eq!(delay.poll(t0 + ms(100)), vec![DelayAction::Hide]);
    }

    #[test]
    fn test_leaving_again_rearms_cancelled_hide() {
        let t0 = Instant::now();
        let mut delay = DisplayDelay::from_millis(100);
        delay.schedule_hide(t0);
        delay.cancel_hiding();
        delay.schedule_hide(t0 + ms(20));

        // Deadline is still the first one
        assert_eq!(delay.poll(t0 + ms(100)), vec![DelayAction::Hide]);
    }
}
