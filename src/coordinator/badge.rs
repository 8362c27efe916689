//! Per-tab badge state machine. A tab is either absent from the map
//! (idle), blinking, or steady-on after the blink budget ran out. All
//! transitions happen on the coordinator task; the timer tasks spawned
//! here never touch state, they only post ticks back through a channel.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::env::BadgeConfig;
use crate::domain::{BadgeView, TabId};

/// Where badge renders go. Production logs them; tests record them.
pub trait BadgeSurface: Send + Sync {
    fn render(&self, tab: TabId, view: BadgeView);
}

pub struct LogBadgeSurface;

impl BadgeSurface for LogBadgeSurface {
    fn render(&self, tab: TabId, view: BadgeView) {
        tracing::debug!(
            target: "badge",
            tab = %tab,
            text = view.text(),
            color = view.color(),
            "badge render"
        );
    }
}

/// Tick posted by a timer task. Carries no state; the machine decides
/// whether it is still relevant when it arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerFire {
    Blink(TabId),
    AutoStop(TabId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgePhase {
    Blinking,
    SteadyOn,
}

struct TabNotificationState {
    phase: BadgePhase,
    visible: bool,
    blink: Option<JoinHandle<()>>,
    auto_stop: Option<JoinHandle<()>>,
}

impl Drop for TabNotificationState {
    fn drop(&mut self) {
        if let Some(handle) = self.blink.take() {
            handle.abort();
        }
        if let Some(handle) = self.auto_stop.take() {
            handle.abort();
        }
    }
}

pub struct BadgeStateMachine {
    tabs: HashMap<TabId, TabNotificationState>,
    surface: Arc<dyn BadgeSurface>,
    timer_tx: mpsc::UnboundedSender<TimerFire>,
    config: BadgeConfig,
}

impl BadgeStateMachine {
    pub fn new(
        surface: Arc<dyn BadgeSurface>,
        config: BadgeConfig,
    ) -> (Self, mpsc::UnboundedReceiver<TimerFire>) {
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        (
            Self {
                tabs: HashMap::new(),
                surface,
                timer_tx,
                config,
            },
            timer_rx,
        )
    }

    /// Begin blinking. Starting an already-active tab changes nothing, in
    /// particular it does not reset the auto-stop budget.
    pub fn start(&mut self, tab: TabId) {
        if self.tabs.contains_key(&tab) {
            tracing::trace!(target: "badge", tab = %tab, "already active");
            return;
        }

        self.surface.render(tab, BadgeView::Alert);

        let interval = self.config.blink_interval;
        let tick_tx = self.timer_tx.clone();
        let blink = tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                if tick_tx.send(TimerFire::Blink(tab)).is_err() {
                    break;
                }
            }
        });

        let budget = self.config.auto_stop_after;
        let stop_tx = self.timer_tx.clone();
        let auto_stop = tokio::spawn(async move {
            tokio::time::sleep(budget).await;
            let _ = stop_tx.send(TimerFire::AutoStop(tab));
        });

        self.tabs.insert(
            tab,
            TabNotificationState {
                phase: BadgePhase::Blinking,
                visible: true,
                blink: Some(blink),
                auto_stop: Some(auto_stop),
            },
        );
        tracing::debug!(target: "badge", tab = %tab, "blinking started");
    }

    /// Cancel whatever is running for the tab and forget it. Idle tabs are
    /// a no-op; nothing is rendered for them either.
    pub fn stop(&mut self, tab: TabId, keep_visible: bool) {
        // Dropping the state aborts both timer tasks.
        if self.tabs.remove(&tab).is_none() {
            return;
        }
        let view = if keep_visible {
            BadgeView::Alert
        } else {
            BadgeView::Hidden
        };
        self.surface.render(tab, view);
        tracing::debug!(target: "badge", tab = %tab, keep_visible, "blinking stopped");
    }

    /// Apply a timer tick. Stale ticks, for tabs that moved on since the
    /// tick was queued, fall through silently.
    pub fn on_timer(&mut self, fire: TimerFire) {
        match fire {
            TimerFire::Blink(tab) => {
                if let Some(state) = self.tabs.get_mut(&tab) {
                    if state.phase == BadgePhase::Blinking {
                        state.visible = !state.visible;
                        let view = if state.visible {
                            BadgeView::Alert
                        } else {
                            BadgeView::Hidden
                        };
                        self.surface.render(tab, view);
                    }
                }
            }
            TimerFire::AutoStop(tab) => {
                if let Some(state) = self.tabs.get_mut(&tab) {
                    if state.phase == BadgePhase::Blinking {
                        if let Some(handle) = state.blink.take() {
                            handle.abort();
                        }
                        state.auto_stop = None;
                        state.phase = BadgePhase::SteadyOn;
                        state.visible = true;
                        self.surface.render(tab, BadgeView::Alert);
                        tracing::debug!(target: "badge", tab = %tab, "blink budget spent, badge stays on");
                    }
                }
            }
        }
    }

    /// The tab navigated; its badge no longer describes the new page.
    pub fn tab_updated(&mut self, tab: TabId) {
        self.stop(tab, false);
    }

    pub fn tab_removed(&mut self, tab: TabId) {
        self.stop(tab, false);
    }

    #[cfg(test)]
    fn phase(&self, tab: TabId) -> Option<BadgePhase> {
        self.tabs.get(&tab).map(|state| state.phase)
    }

    #[cfg(test)]
    fn is_visible(&self, tab: TabId) -> bool {
        self.tabs.get(&tab).map(|state| state.visible).unwrap_or(false)
    }

    #[cfg(test)]
    fn timer_count(&self, tab: TabId) -> usize {
        self.tabs
            .get(&tab)
            .map(|state| state.blink.iter().count() + state.auto_stop.iter().count())
            .unwrap_or(0)
    }
}

#[cfg(test)]
pub mod testing {
    use parking_lot::Mutex;

    use super::*;

    /// Surface that remembers every render, for asserting on sequences.
    #[derive(Default)]
    pub struct RecordingSurface {
        renders: Mutex<Vec<(TabId, BadgeView)>>,
    }

    impl RecordingSurface {
        pub fn renders(&self) -> Vec<(TabId, BadgeView)> {
            self.renders.lock().clone()
        }

        pub fn last(&self, tab: TabId) -> Option<BadgeView> {
            self.renders
                .lock()
                .iter()
                .rev()
                .find(|(t, _)| *t == tab)
                .map(|(_, view)| *view)
        }
    }

    impl BadgeSurface for RecordingSurface {
        fn render(&self, tab: TabId, view: BadgeView) {
            self.renders.lock().push((tab, view));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::task::yield_now;
    use tokio::time::advance;

    use super::testing::RecordingSurface;
    use super::*;

    const TAB: TabId = TabId(1);

    fn machine(
        surface: Arc<RecordingSurface>,
    ) -> (BadgeStateMachine, mpsc::UnboundedReceiver<TimerFire>) {
        BadgeStateMachine::new(
            surface,
            BadgeConfig {
                blink_interval: Duration::from_millis(500),
                auto_stop_after: Duration::from_secs(10),
            },
        )
    }

    /// Let spawned timer tasks reach their first sleep.
    async fn settle() {
        for _ in 0..4 {
            yield_now().await;
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<TimerFire>) -> Vec<TimerFire> {
        let mut fires = Vec::new();
        while let Ok(fire) = rx.try_recv() {
            fires.push(fire);
        }
        fires
    }

    #[tokio::test(start_paused = true)]
    async fn start_renders_alert_immediately() {
        let surface = Arc::new(RecordingSurface::default());
        let (mut machine, _timers) = machine(surface.clone());

        machine.start(TAB);

        assert_eq!(surface.renders(), vec![(TAB, BadgeView::Alert)]);
        assert_eq!(machine.phase(TAB), Some(BadgePhase::Blinking));
        assert!(machine.is_visible(TAB));
    }

    #[tokio::test(start_paused = true)]
    async fn blink_toggles_visibility_each_interval() {
        let surface = Arc::new(RecordingSurface::default());
        let (mut machine, mut timers) = machine(surface.clone());

        machine.start(TAB);
        settle().await;

        advance(Duration::from_millis(500)).await;
        settle().await;
        for fire in drain(&mut timers) {
            machine.on_timer(fire);
        }
        assert!(!machine.is_visible(TAB));
        assert_eq!(surface.last(TAB), Some(BadgeView::Hidden));

        advance(Duration::from_millis(500)).await;
        settle().await;
        for fire in drain(&mut timers) {
            machine.on_timer(fire);
        }
        assert!(machine.is_visible(TAB));
        assert_eq!(surface.last(TAB), Some(BadgeView::Alert));
    }

    #[tokio::test(start_paused = true)]
    async fn starting_twice_keeps_a_single_timer_pair() {
        let surface = Arc::new(RecordingSurface::default());
        let (mut machine, mut timers) = machine(surface.clone());

        machine.start(TAB);
        machine.start(TAB);
        settle().await;

        assert_eq!(machine.timer_count(TAB), 2);
        // Only the first start rendered.
        assert_eq!(surface.renders().len(), 1);

        advance(Duration::from_millis(500)).await;
        settle().await;
        let fires = drain(&mut timers);
        assert_eq!(fires, vec![TimerFire::Blink(TAB)]);
    }

    #[tokio::test(start_paused = true)]
    async fn auto_stop_leaves_the_badge_steady_on() {
        let surface = Arc::new(RecordingSurface::default());
        let (mut machine, mut timers) = machine(surface.clone());

        machine.start(TAB);
        settle().await;

        // Run out the whole blink budget.
        loop {
            let fire = timers.recv().await.unwrap();
            let done = fire == TimerFire::AutoStop(TAB);
            machine.on_timer(fire);
            if done {
                break;
            }
        }

        assert_eq!(machine.phase(TAB), Some(BadgePhase::SteadyOn));
        assert!(machine.is_visible(TAB));
        assert_eq!(surface.last(TAB), Some(BadgeView::Alert));

        // The blink task is gone; late ticks that were already queued
        // change nothing.
        advance(Duration::from_secs(5)).await;
        settle().await;
        for fire in drain(&mut timers) {
            machine.on_timer(fire);
        }
        assert_eq!(surface.last(TAB), Some(BadgeView::Alert));
        assert_eq!(machine.phase(TAB), Some(BadgePhase::SteadyOn));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_mid_blink_cancels_both_timers() {
        let surface = Arc::new(RecordingSurface::default());
        let (mut machine, mut timers) = machine(surface.clone());

        machine.start(TAB);
        settle().await;

        advance(Duration::from_millis(500)).await;
        settle().await;
        for fire in drain(&mut timers) {
            machine.on_timer(fire);
        }

        machine.stop(TAB, false);
        settle().await;
        drain(&mut timers);

        assert_eq!(machine.phase(TAB), None);
        assert_eq!(surface.last(TAB), Some(BadgeView::Hidden));

        // Well past both the next blink and the auto-stop deadline.
        advance(Duration::from_secs(15)).await;
        settle().await;
        assert!(drain(&mut timers).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_keeping_the_badge_renders_alert() {
        let surface = Arc::new(RecordingSurface::default());
        let (mut machine, _timers) = machine(surface.clone());

        machine.start(TAB);
        machine.stop(TAB, true);

        assert_eq!(machine.phase(TAB), None);
        assert_eq!(surface.last(TAB), Some(BadgeView::Alert));
    }

    #[tokio::test(start_paused = true)]
    async fn stopping_an_idle_tab_renders_nothing() {
        let surface = Arc::new(RecordingSurface::default());
        let (mut machine, _timers) = machine(surface.clone());

        machine.stop(TAB, false);
        machine.stop(TAB, true);

        assert!(surface.renders().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn tab_update_clears_the_badge() {
        let surface = Arc::new(RecordingSurface::default());
        let (mut machine, _timers) = machine(surface.clone());

        machine.start(TAB);
        machine.tab_updated(TAB);

        assert_eq!(machine.phase(TAB), None);
        assert_eq!(surface.last(TAB), Some(BadgeView::Hidden));
    }

    #[tokio::test(start_paused = true)]
    async fn restart_after_steady_on_blinks_again() {
        let surface = Arc::new(RecordingSurface::default());
        let (mut machine, mut timers) = machine(surface.clone());

        machine.start(TAB);
        settle().await;
        loop {
            let fire = timers.recv().await.unwrap();
            let done = fire == TimerFire::AutoStop(TAB);
            machine.on_timer(fire);
            if done {
                break;
            }
        }
        assert_eq!(machine.phase(TAB), Some(BadgePhase::SteadyOn));

        // Steady-on is still active, so another start is a no-op.
        machine.start(TAB);
        assert_eq!(machine.phase(TAB), Some(BadgePhase::SteadyOn));

        // After a stop the tab is idle and can blink again.
        machine.stop(TAB, false);
        machine.start(TAB);
        assert_eq!(machine.phase(TAB), Some(BadgePhase::Blinking));
    }
}
