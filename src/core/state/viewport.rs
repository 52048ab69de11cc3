//! Scroll/pagination controller for one viewport session.

use serde::{Deserialize, Serialize};

use crate::core::cmd::Cmd;
use crate::core::msg::viewport::ViewportMsg;

/// Distance from the bottom (px) within which the viewport counts as
/// "at bottom". Tight, so the unread separator doesn't jitter.
pub const AT_BOTTOM_TOLERANCE_PX: f64 = 8.0;

/// Looser distance (px) used when deciding whether to follow new content.
/// Double-checks a possibly stale `at_bottom` flag during rapid updates.
pub const AUTO_SCROLL_TOLERANCE_PX: f64 = 100.0;

/// Debounce before an auto-scroll fires; a manual scroll in between wins.
pub const AUTO_SCROLL_DEBOUNCE_MS: u64 = 100;

/// Snapshot of the scrollable surface, as reported by the host view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollMetrics {
    pub scroll_top: f64,
    pub scroll_height: f64,
    pub client_height: f64,
}

impl ScrollMetrics {
    pub fn distance_from_bottom(&self) -> f64 {
        (self.scroll_height - self.scroll_top - self.client_height).max(0.0)
    }

    pub fn is_at_top(&self) -> bool {
        self.scroll_top <= 0.0
    }

    pub fn is_at_bottom(&self) -> bool {
        self.distance_from_bottom() <= AT_BOTTOM_TOLERANCE_PX
    }

    pub fn is_near_bottom(&self) -> bool {
        self.distance_from_bottom() <= AUTO_SCROLL_TOLERANCE_PX
    }
}

/// How a scroll-to-newest should be performed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ScrollBehavior {
    /// Immediate reposition, used for the first layout pass.
    Jump,
    /// Animated scroll, used once the viewport is settled.
    Smooth,
}

/// Lifecycle of one viewport session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewportPhase {
    /// Mounted, no content seen yet.
    #[default]
    Uninitialized,
    /// First layout pass happened but there was nothing to anchor to.
    Initializing,
    /// Anchored; subsequent content changes follow the auto-scroll rules.
    Steady,
}

/// A queued, debounced auto-scroll. The generation ties the eventual timer
/// firing back to this request; any scroll event in between bumps the
/// generation and the firing becomes a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingAutoScroll {
    generation: u64,
    behavior: ScrollBehavior,
}

/// Scroll-position tracking and auto-scroll arbitration for one mounted
/// conversation view. Ephemeral: a fresh instance is created per mount and
/// nothing here is persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportState {
    auto_scroll: bool,
    phase: ViewportPhase,
    at_bottom: bool,
    metrics: Option<ScrollMetrics>,
    generation: u64,
    pending: Option<PendingAutoScroll>,
    message_count: usize,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ViewportState {
    pub fn new(auto_scroll: bool) -> Self {
        Self {
            auto_scroll,
            phase: ViewportPhase::default(),
            at_bottom: false,
            metrics: None,
            generation: 0,
            pending: None,
            message_count: 0,
        }
    }

    pub fn is_at_bottom(&self) -> bool {
        self.at_bottom
    }

    pub fn is_initialized(&self) -> bool {
        self.phase == ViewportPhase::Steady
    }

    pub fn phase(&self) -> ViewportPhase {
        self.phase
    }

    /// Apply one viewport event, returning the side effects to execute.
    pub fn update(&mut self, msg: ViewportMsg) -> Vec<Cmd> {
        match msg {
            ViewportMsg::ScrollMoved {
                metrics,
                can_load_more,
            } => self.on_scroll_moved(metrics, can_load_more),
            ViewportMsg::ContentChanged { message_count } => {
                self.on_content_changed(message_count)
            }
            ViewportMsg::AutoScrollFired { generation } => self.on_auto_scroll_fired(generation),
            ViewportMsg::Detached => self.on_detached(),
        }
    }

    fn on_scroll_moved(&mut self, metrics: ScrollMetrics, can_load_more: bool) -> Vec<Cmd> {
        let mut cmds = Vec::new();

        // A manual scroll always preempts a queued auto-scroll.
        if self.cancel_pending() {
            cmds.push(Cmd::CancelAutoScroll);
        }

        if metrics.is_at_top() && can_load_more {
            cmds.push(Cmd::LoadOlder);
        }

        self.metrics = Some(metrics);
        if let Some(flipped) = self.recompute_at_bottom() {
            cmds.push(Cmd::NotifyAtBottom { at_bottom: flipped });
        }
        cmds
    }

    fn on_content_changed(&mut self, message_count: usize) -> Vec<Cmd> {
        self.message_count = message_count;

        let mut cmds = Vec::new();
        if let Some(flipped) = self.recompute_at_bottom() {
            cmds.push(Cmd::NotifyAtBottom { at_bottom: flipped });
        }

        match self.phase {
            ViewportPhase::Uninitialized | ViewportPhase::Initializing => {
                if message_count == 0 {
                    // Nothing to anchor to yet; stay in the first pass.
                    self.phase = ViewportPhase::Initializing;
                    return cmds;
                }
                self.phase = ViewportPhase::Steady;
                if self.auto_scroll {
                    cmds.push(self.schedule(ScrollBehavior::Jump));
                }
            }
            ViewportPhase::Steady => {
                let near_bottom = self
                    .metrics
                    .is_some_and(|metrics| metrics.is_near_bottom());
                if self.auto_scroll && self.at_bottom && near_bottom && message_count > 0 {
                    cmds.push(self.schedule(ScrollBehavior::Smooth));
                }
            }
        }
        cmds
    }

    fn on_auto_scroll_fired(&mut self, generation: u64) -> Vec<Cmd> {
        match self.pending {
            Some(pending) if pending.generation == generation => {
                self.pending = None;
                // `at_bottom` is revalidated by the next metrics report the
                // surface sends once the scroll completes.
                vec![Cmd::ScrollToNewest {
                    behavior: pending.behavior,
                }]
            }
            _ => Vec::new(),
        }
    }

    fn on_detached(&mut self) -> Vec<Cmd> {
        if self.cancel_pending() {
            vec![Cmd::CancelAutoScroll]
        } else {
            Vec::new()
        }
    }

    /// Edge-triggered: `Some(new_value)` only when the flag actually flips.
    fn recompute_at_bottom(&mut self) -> Option<bool> {
        let metrics = self.metrics?;
        let now_at_bottom = metrics.is_at_bottom();
        if now_at_bottom == self.at_bottom {
            return None;
        }
        self.at_bottom = now_at_bottom;
        Some(now_at_bottom)
    }

    fn schedule(&mut self, behavior: ScrollBehavior) -> Cmd {
        self.generation += 1;
        self.pending = Some(PendingAutoScroll {
            generation: self.generation,
            behavior,
        });
        Cmd::ScheduleAutoScroll {
            generation: self.generation,
            delay_ms: AUTO_SCROLL_DEBOUNCE_MS,
        }
    }

    fn cancel_pending(&mut self) -> bool {
        if self.pending.take().is_some() {
            self.generation += 1;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn at_bottom_metrics() -> ScrollMetrics {
        ScrollMetrics {
            scroll_top: 900.0,
            scroll_height: 1500.0,
            client_height: 600.0,
        }
    }

    fn scrolled_up_metrics() -> ScrollMetrics {
        ScrollMetrics {
            scroll_top: 200.0,
            scroll_height: 1500.0,
            client_height: 600.0,
        }
    }

    fn top_metrics() -> ScrollMetrics {
        ScrollMetrics {
            scroll_top: 0.0,
            scroll_height: 1500.0,
            client_height: 600.0,
        }
    }

    fn scroll(metrics: ScrollMetrics, can_load_more: bool) -> ViewportMsg {
        ViewportMsg::ScrollMoved {
            metrics,
            can_load_more,
        }
    }

    fn pending_generation(state: &ViewportState) -> Option<u64> {
        state.pending.map(|p| p.generation)
    }

    #[test]
    fn test_metrics_tolerances() {
        let exact = ScrollMetrics {
            scroll_top: 900.0,
            scroll_height: 1500.0,
            client_height: 600.0,
        };
        assert_eq!(exact.distance_from_bottom(), 0.0);
        assert!(exact.is_at_bottom());

        let within_tight = ScrollMetrics {
            scroll_top: 893.0,
            ..exact
        };
        assert!(within_tight.is_at_bottom());

        let outside_tight = ScrollMetrics {
            scroll_top: 880.0,
            ..exact
        };
        assert!(!outside_tight.is_at_bottom());
        assert!(outside_tight.is_near_bottom());

        let far = ScrollMetrics {
            scroll_top: 700.0,
            ..exact
        };
        assert!(!far.is_near_bottom());
    }

    #[test]
    fn test_first_content_schedules_initial_jump() {
        let mut state = ViewportState::new(true);
        let cmds = state.update(ViewportMsg::ContentChanged { message_count: 25 });

        assert!(state.is_initialized());
        assert_eq!(
            cmds,
            vec![Cmd::ScheduleAutoScroll {
                generation: 1,
                delay_ms: AUTO_SCROLL_DEBOUNCE_MS,
            }]
        );

        // The queued request is the immediate jump of the first pass.
        let cmds = state.update(ViewportMsg::AutoScrollFired { generation: 1 });
        assert_eq!(
            cmds,
            vec![Cmd::ScrollToNewest {
                behavior: ScrollBehavior::Jump
            }]
        );
    }

    #[test]
    fn test_first_pass_disabled_by_configuration() {
        let mut state = ViewportState::new(false);
        let cmds = state.update(ViewportMsg::ContentChanged { message_count: 25 });

        assert!(state.is_initialized());
        assert!(cmds.is_empty());
    }

    #[test]
    fn test_empty_first_pass_waits_for_content() {
        let mut state = ViewportState::new(true);
        let cmds = state.update(ViewportMsg::ContentChanged { message_count: 0 });

        assert!(cmds.is_empty());
        assert_eq!(state.phase(), ViewportPhase::Initializing);

        // The first real page still gets the initial jump.
        let cmds = state.update(ViewportMsg::ContentChanged { message_count: 50 });
        assert_eq!(cmds.len(), 1);
        assert!(matches!(cmds[0], Cmd::ScheduleAutoScroll { .. }));
        assert!(state.is_initialized());
    }

    #[test]
    fn test_steady_autoscroll_requires_at_bottom() {
        let mut state = ViewportState::new(true);
        state.update(ViewportMsg::ContentChanged { message_count: 10 });
        state.update(ViewportMsg::AutoScrollFired { generation: 1 });

        // Reading scrollback: no follow.
        state.update(scroll(scrolled_up_metrics(), false));
        let cmds = state.update(ViewportMsg::ContentChanged { message_count: 11 });
        assert!(cmds.is_empty());

        // Back at the bottom: follow.
        state.update(scroll(at_bottom_metrics(), false));
        let cmds = state.update(ViewportMsg::ContentChanged { message_count: 12 });
        assert_eq!(cmds.len(), 1);
        assert!(matches!(cmds[0], Cmd::ScheduleAutoScroll { .. }));
    }

    #[test]
    fn test_manual_scroll_preempts_queued_autoscroll() {
        let mut state = ViewportState::new(true);
        state.update(ViewportMsg::ContentChanged { message_count: 10 });
        let generation = pending_generation(&state).expect("queued");

        // User scrolls before the debounce fires.
        let cmds = state.update(scroll(scrolled_up_metrics(), false));
        assert!(cmds.contains(&Cmd::CancelAutoScroll));

        // The stale timer firing later does nothing.
        let cmds = state.update(ViewportMsg::AutoScrollFired { generation });
        assert!(cmds.is_empty());
    }

    #[test]
    fn test_stale_generation_is_ignored() {
        let mut state = ViewportState::new(true);
        state.update(ViewportMsg::ContentChanged { message_count: 10 });

        let cmds = state.update(ViewportMsg::AutoScrollFired { generation: 99 });
        assert!(cmds.is_empty());
        assert!(pending_generation(&state).is_some());
    }

    #[test]
    fn test_top_scroll_triggers_backward_pagination() {
        let mut state = ViewportState::new(true);
        let cmds = state.update(scroll(top_metrics(), true));
        assert!(cmds.contains(&Cmd::LoadOlder));
    }

    #[test]
    fn test_top_scroll_without_more_history_does_not_fetch() {
        let mut state = ViewportState::new(true);
        let cmds = state.update(scroll(top_metrics(), false));
        assert!(!cmds.contains(&Cmd::LoadOlder));
    }

    #[test]
    fn test_fetch_retriggers_after_failure_on_next_qualifying_scroll() {
        let mut state = ViewportState::new(true);
        let cmds = state.update(scroll(top_metrics(), true));
        assert!(cmds.contains(&Cmd::LoadOlder));

        // Fetch failed; the collaborator re-arms `can_load_more` and the
        // controller fires again on the next qualifying event.
        let cmds = state.update(scroll(top_metrics(), true));
        assert!(cmds.contains(&Cmd::LoadOlder));
    }

    #[test]
    fn test_at_bottom_notification_is_edge_triggered() {
        let mut state = ViewportState::new(true);

        let cmds = state.update(scroll(at_bottom_metrics(), false));
        assert_eq!(cmds, vec![Cmd::NotifyAtBottom { at_bottom: true }]);

        // Same value again: no redundant notification.
        let cmds = state.update(scroll(at_bottom_metrics(), false));
        assert!(cmds.is_empty());
        let cmds = state.update(scroll(at_bottom_metrics(), false));
        assert!(cmds.is_empty());

        // Flip: notified exactly once.
        let cmds = state.update(scroll(scrolled_up_metrics(), false));
        assert_eq!(cmds, vec![Cmd::NotifyAtBottom { at_bottom: false }]);
    }

    #[test]
    fn test_stale_at_bottom_flag_is_double_checked() {
        let mut state = ViewportState::new(true);
        state.update(ViewportMsg::ContentChanged { message_count: 10 });
        state.update(ViewportMsg::AutoScrollFired { generation: 1 });
        state.update(scroll(at_bottom_metrics(), false));
        assert!(state.is_at_bottom());

        // Content grew enough that the last metrics are outside the loose
        // tolerance: the flag recomputes to false and no follow happens.
        let grown = ScrollMetrics {
            scroll_height: 2400.0,
            ..at_bottom_metrics()
        };
        state.update(scroll(grown, false));
        let cmds = state.update(ViewportMsg::ContentChanged { message_count: 11 });
        assert!(cmds.is_empty());
    }

    #[test]
    fn test_detach_cancels_pending_autoscroll() {
        let mut state = ViewportState::new(true);
        state.update(ViewportMsg::ContentChanged { message_count: 10 });
        assert!(pending_generation(&state).is_some());

        let cmds = state.update(ViewportMsg::Detached);
        assert_eq!(cmds, vec![Cmd::CancelAutoScroll]);
        assert!(pending_generation(&state).is_none());

        // Idempotent.
        let cmds = state.update(ViewportMsg::Detached);
        assert!(cmds.is_empty());
    }
}
