use tracing::{debug, info};

use super::{CalibrationSuggestion, SessionStatics};
use crate::config::SyncConfig;
use crate::scheduler::Scheduler;
use crate::score::ReferenceScore;
use crate::setting::{AdjustmentGate, Offset};
use crate::store::{BeatmapDatabase, BeatmapId, OffsetStore, Subscription, WriteHandle};

/// Work the controller defers to a later frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledTask {
    /// Write the current offset to the store
    Reconcile,
}

/// A write issued by this controller and the value it carries
#[derive(Debug)]
struct PendingWrite {
    handle: WriteHandle,
    value: Offset,
}

type Listener = Box<dyn FnMut(Offset)>;

/// Keeps the offset of one beatmap in sync with the store.
///
/// All methods are meant to be called from the single loop that owns the
/// controller. [`update`](Self::update) is that loop's frame: it applies
/// store notifications and runs deferred writes. At most one write issued by
/// the controller is in flight at any time, and notifications arriving while
/// it is in flight are treated as feedback from that write.
pub struct OffsetSyncController<S: OffsetStore> {
    store: S,
    beatmap: BeatmapId,
    current: Offset,
    gate: AdjustmentGate,
    session: SessionStatics,
    minimum_basic_hit_events: usize,
    scheduler: Scheduler<ScheduledTask>,
    pending_write: Option<PendingWrite>,
    subscription: Option<Subscription>,
    suggestion: Option<CalibrationSuggestion>,
    listeners: Vec<Listener>,
}

impl<S: OffsetStore> OffsetSyncController<S> {
    /// Create a controller for `beatmap` and subscribe to its offset.
    ///
    /// The committed offset is picked up immediately when the beatmap exists.
    pub fn new(
        store: S,
        beatmap: BeatmapId,
        gate: AdjustmentGate,
        session: SessionStatics,
        config: &SyncConfig,
    ) -> Self {
        let subscription = store.subscribe(beatmap);

        let mut controller = Self {
            store,
            beatmap,
            current: Offset::ZERO,
            gate,
            session,
            minimum_basic_hit_events: config.minimum_basic_hit_events,
            scheduler: Scheduler::new(),
            pending_write: None,
            subscription: Some(subscription),
            suggestion: None,
            listeners: Vec::new(),
        };
        controller.process_notifications();
        controller
    }

    pub fn beatmap(&self) -> BeatmapId {
        self.beatmap
    }

    pub fn current(&self) -> Offset {
        self.current
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn is_disabled(&self) -> bool {
        self.gate.is_disabled()
    }

    /// Whether a write issued by this controller has not completed yet
    pub fn has_outstanding_write(&self) -> bool {
        self.pending_write
            .as_ref()
            .is_some_and(|p| !p.handle.is_completed())
    }

    /// Nothing scheduled and no write in flight
    pub fn is_settled(&self) -> bool {
        self.scheduler.is_empty() && !self.has_outstanding_write()
    }

    /// Register a listener called with every new offset, local or external.
    pub fn on_value_changed<F>(&mut self, listener: F)
    where
        F: FnMut(Offset) + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Change the offset as the user would.
    ///
    /// The value is clamped and rounded. Returns `false` if adjustment is
    /// currently disabled, in which case nothing changes.
    pub fn set_value(&mut self, ms: f64) -> bool {
        if self.is_disabled() {
            debug!("Offset adjustment disabled, ignoring {}ms", ms);
            return false;
        }

        let value = Offset::from_ms(ms);
        if value == self.current {
            return true;
        }

        debug!("Offset for beatmap {} set to {}", self.beatmap, value);
        self.current = value;
        self.notify_listeners();
        self.scheduler.add_once(ScheduledTask::Reconcile);
        true
    }

    /// Run one frame: apply store notifications, then deferred tasks.
    pub fn update(&mut self) {
        self.process_notifications();

        for task in self.scheduler.take_pending() {
            match task {
                ScheduledTask::Reconcile => self.reconcile(),
            }
        }
    }

    /// Handle an offset change reported by the store.
    pub fn on_external_change(&mut self, value: Offset) {
        match self.pending_write.take() {
            None => self.apply_external(value),
            Some(pending) if pending.handle.is_completed() => {
                // Our own write has landed. Its echo, or anything that would
                // clobber a newer local edit, is dropped.
                if value == pending.value {
                    debug!("Ignoring echo of local write ({})", value);
                } else if self.scheduler.is_scheduled(&ScheduledTask::Reconcile) {
                    debug!("Ignoring {} in favour of pending local edit", value);
                } else {
                    self.apply_external(value);
                }
            }
            Some(pending) => {
                debug!("Ignoring {} while local write is in flight", value);
                self.pending_write = Some(pending);
            }
        }
    }

    /// Move the offset by the median error of a reference play.
    ///
    /// Rejected when disabled, when the correction is below half the
    /// setting's precision, or when clamping leaves the offset unchanged.
    pub fn calibrate(&mut self, median_error: f64, offset_at_capture: f64) -> bool {
        if self.is_disabled() {
            return false;
        }

        let target = offset_at_capture - median_error;
        if !self.changes_offset(target) {
            debug!(
                "Calibration to {:.2}ms leaves offset at {}, skipping",
                target, self.current
            );
            return false;
        }

        self.set_value(target)
    }

    /// Use `score` as the calibration reference.
    ///
    /// Scores from other beatmaps, plays without timed input and plays with
    /// too few hits clear the reference instead. Returns whether the score
    /// was accepted.
    pub fn set_reference_score(&mut self, score: Option<&ReferenceScore>) -> bool {
        self.suggestion = None;

        let Some(score) = score else {
            return false;
        };

        if score.beatmap_id != self.beatmap {
            debug!(
                "Reference score {} is for beatmap {}, not {}",
                score.id, score.beatmap_id, self.beatmap
            );
            return false;
        }

        if score.autoplay {
            debug!("Reference score {} has no timed input", score.id);
            return false;
        }

        let count = score.count_basic_hit_events();
        if count < self.minimum_basic_hit_events {
            debug!(
                "Reference score {} has {} basic hit events, need {}",
                score.id, count, self.minimum_basic_hit_events
            );
            return false;
        }

        let Some(median) = score.median_hit_error() else {
            debug!("Reference score {} has no timed hits", score.id);
            return false;
        };

        self.suggestion = Some(CalibrationSuggestion::new(score.id, median, self.current));
        true
    }

    pub fn suggestion(&self) -> Option<&CalibrationSuggestion> {
        self.suggestion.as_ref()
    }

    /// Whether calibrating from the reference score would do anything
    pub fn can_calibrate(&self) -> bool {
        let Some(suggestion) = &self.suggestion else {
            return false;
        };

        !self.is_disabled()
            && self.session.last_applied_offset_score() != Some(suggestion.score_id)
            && self.changes_offset(suggestion.target_ms())
    }

    /// Calibrate from the reference score and remember it as applied.
    pub fn calibrate_from_reference(&mut self) -> bool {
        let Some(suggestion) = self.suggestion.clone() else {
            return false;
        };

        if self.session.last_applied_offset_score() == Some(suggestion.score_id) {
            debug!("Reference score {} already applied", suggestion.score_id);
            return false;
        }

        if !self.calibrate(
            suggestion.median_error,
            suggestion.offset_at_capture.as_ms(),
        ) {
            return false;
        }

        info!(
            "Calibrated beatmap {} to {} from score {}",
            self.beatmap, self.current, suggestion.score_id
        );
        self.session
            .set_last_applied_offset_score(Some(suggestion.score_id));
        true
    }

    /// Stop listening to the store.
    ///
    /// A write already in flight still completes.
    pub fn dispose(mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.dispose();
        }
    }

    fn changes_offset(&self, target_ms: f64) -> bool {
        !self.current.almost_equals(target_ms) && Offset::from_ms(target_ms) != self.current
    }

    fn process_notifications(&mut self) {
        let Some(subscription) = &self.subscription else {
            return;
        };

        for value in subscription.drain() {
            self.on_external_change(value);
        }
    }

    fn reconcile(&mut self) {
        if self.has_outstanding_write() {
            debug!("Write in flight, deferring offset {}", self.current);
            self.scheduler.add_once(ScheduledTask::Reconcile);
            return;
        }

        let beatmap = self.beatmap;
        let value = self.current;
        debug!("Writing offset {} for beatmap {}", value, beatmap);

        let handle = self.store.write(Box::new(move |db: &mut BeatmapDatabase| {
            write_offset(db, beatmap, value)
        }));
        self.pending_write = Some(PendingWrite { handle, value });
    }

    fn apply_external(&mut self, value: Offset) {
        if value == self.current {
            return;
        }

        debug!("Offset for beatmap {} changed externally to {}", self.beatmap, value);
        self.current = value;
        self.notify_listeners();
    }

    fn notify_listeners(&mut self) {
        let value = self.current;
        for listener in &mut self.listeners {
            listener(value);
        }
    }
}

/// Set `offset` on `beatmap` and every beatmap sharing its audio track.
fn write_offset(db: &mut BeatmapDatabase, beatmap: BeatmapId, offset: Offset) {
    let Some(target) = db.find_beatmap(beatmap).cloned() else {
        debug!("Beatmap {} not in store, skipping offset write", beatmap);
        return;
    };

    let Some(set) = db.find_set_mut(target.set_id) else {
        debug!("Set {} not in store, skipping offset write", target.set_id);
        return;
    };

    for sibling in set.beatmaps.iter_mut().filter(|b| b.audio_equals(&target)) {
        sibling.user_settings.offset = offset;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::{HitEvent, HitResult, ScoreId};
    use crate::store::{BeatmapInfo, BeatmapSetInfo, ManualStore, SetId};
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;

    const EASY: BeatmapId = BeatmapId(1);
    const HARD: BeatmapId = BeatmapId(2);
    const ALT_AUDIO: BeatmapId = BeatmapId(3);
    const OTHER_SET: BeatmapId = BeatmapId(4);

    fn store() -> Arc<ManualStore> {
        let store = ManualStore::default();
        store.insert_set(
            BeatmapSetInfo::new(SetId(1), "Song")
                .with_beatmap(BeatmapInfo::new(EASY, SetId(1), "Easy", "a.ogg"))
                .with_beatmap(BeatmapInfo::new(HARD, SetId(1), "Hard", "a.ogg"))
                .with_beatmap(BeatmapInfo::new(ALT_AUDIO, SetId(1), "Cut", "b.ogg")),
        );
        store.insert_set(
            BeatmapSetInfo::new(SetId(2), "Other")
                .with_beatmap(BeatmapInfo::new(OTHER_SET, SetId(2), "Easy", "a.ogg")),
        );
        Arc::new(store)
    }

    fn controller(store: &Arc<ManualStore>) -> OffsetSyncController<Arc<ManualStore>> {
        controller_for(store, EASY, AdjustmentGate::new(), SessionStatics::new())
    }

    fn controller_for(
        store: &Arc<ManualStore>,
        beatmap: BeatmapId,
        gate: AdjustmentGate,
        session: SessionStatics,
    ) -> OffsetSyncController<Arc<ManualStore>> {
        OffsetSyncController::new(
            Arc::clone(store),
            beatmap,
            gate,
            session,
            &SyncConfig::default(),
        )
    }

    fn score(id: u64, beatmap: BeatmapId, offsets: &[f64]) -> ReferenceScore {
        let hit_events = offsets
            .iter()
            .map(|&o| HitEvent::new(o, HitResult::Great))
            .collect();
        ReferenceScore::new(ScoreId(id), beatmap, hit_events)
    }

    #[test]
    fn test_picks_up_committed_offset() {
        let store = store();
        store.external_write(EASY, Offset::from_ms(3.0));

        let controller = controller(&store);
        assert_eq!(controller.current(), Offset::from_ms(3.0));
        assert!(controller.is_settled());
    }

    #[test]
    fn test_set_value_rounds_and_clamps() {
        let store = store();
        let mut controller = controller(&store);

        assert!(controller.set_value(12.34));
        assert_eq!(controller.current().as_ms(), 12.3);

        assert!(controller.set_value(100.0));
        assert_eq!(controller.current().as_ms(), 50.0);

        assert!(controller.set_value(-50.06));
        assert_eq!(controller.current().as_ms(), -50.0);
    }

    #[test]
    fn test_rapid_edits_coalesce_into_one_write() {
        let store = store();
        let mut controller = controller(&store);

        controller.set_value(1.0);
        controller.set_value(2.0);
        assert_eq!(store.writes_submitted(), 0);

        controller.update();
        assert_eq!(store.writes_submitted(), 1);

        store.complete_all();
        assert_eq!(store.offset(EASY), Some(Offset::from_ms(2.0)));
    }

    #[test]
    fn test_edits_within_one_frame_write_last_clamped_value() {
        let store = store();
        let mut controller = controller(&store);
        let inputs = [
            0.04, -3.33, 17.25, 120.0, -0.06, 49.96, -75.5, 8.88, f64::NAN, 33.35, -50.04, 12.345,
        ];

        for (i, &ms) in inputs.iter().enumerate() {
            assert!(controller.set_value(ms));
            assert_eq!(controller.current(), Offset::from_ms(ms), "input {}", i);
        }
        assert_eq!(store.writes_submitted(), 0);

        controller.update();
        controller.update();
        assert_eq!(store.writes_submitted(), 1);

        assert_eq!(store.complete_all(), 1);
        controller.update();
        assert_eq!(store.offset(EASY), Some(Offset::from_ms(12.3)));
        assert_eq!(store.offset(HARD), Some(Offset::from_ms(12.3)));
        assert_eq!(store.writes_submitted(), 1);
        assert!(controller.is_settled());
    }

    #[test]
    fn test_unchanged_value_does_not_write() {
        let store = store();
        let mut controller = controller(&store);

        assert!(controller.set_value(0.0));
        controller.update();
        assert_eq!(store.writes_submitted(), 0);
    }

    #[test]
    fn test_edit_during_write_is_deferred() {
        let store = store();
        let mut controller = controller(&store);

        controller.set_value(1.0);
        controller.update();
        assert_eq!(store.writes_submitted(), 1);

        controller.set_value(2.0);
        controller.update();
        controller.update();
        assert_eq!(store.writes_submitted(), 1);
        assert!(!controller.is_settled());

        // First write lands; its echo must not undo the newer edit
        assert!(store.complete_next());
        controller.update();
        assert_eq!(controller.current(), Offset::from_ms(2.0));
        assert_eq!(store.writes_submitted(), 2);

        store.complete_next();
        controller.update();
        assert_eq!(store.offset(EASY), Some(Offset::from_ms(2.0)));
        assert_eq!(controller.current(), Offset::from_ms(2.0));
        assert!(controller.is_settled());
    }

    #[test]
    fn test_notification_during_write_is_ignored() {
        let store = store();
        let mut controller = controller(&store);

        controller.set_value(5.0);
        controller.update();

        store.notify(EASY, Offset::from_ms(9.0));
        controller.update();
        assert_eq!(controller.current(), Offset::from_ms(5.0));
        assert!(controller.has_outstanding_write());
    }

    #[test]
    fn test_different_value_after_completion_is_applied() {
        let store = store();
        let mut controller = controller(&store);

        controller.set_value(5.0);
        controller.update();
        store.complete_next_silently().unwrap();

        store.notify(EASY, Offset::from_ms(7.0));
        controller.update();
        assert_eq!(controller.current(), Offset::from_ms(7.0));
        assert_eq!(store.writes_submitted(), 1);
    }

    #[test]
    fn test_echo_after_completion_is_ignored_once() {
        let store = store();
        let mut controller = controller(&store);

        controller.set_value(5.0);
        controller.update();
        store.complete_next();
        controller.update();
        assert_eq!(controller.current(), Offset::from_ms(5.0));

        // With the echo consumed, further changes apply unconditionally
        store.external_write(EASY, Offset::from_ms(-1.0));
        controller.update();
        assert_eq!(controller.current(), Offset::from_ms(-1.0));
    }

    #[test]
    fn test_external_change_does_not_write_back() {
        let store = store();
        let mut controller = controller(&store);

        store.external_write(EASY, Offset::from_ms(4.0));
        controller.update();
        controller.update();

        assert_eq!(controller.current(), Offset::from_ms(4.0));
        assert_eq!(store.writes_submitted(), 0);
    }

    #[test]
    fn test_write_broadcasts_to_same_audio() {
        let store = store();
        let mut controller = controller(&store);

        controller.set_value(6.0);
        controller.update();
        store.complete_all();

        assert_eq!(store.offset(EASY), Some(Offset::from_ms(6.0)));
        assert_eq!(store.offset(HARD), Some(Offset::from_ms(6.0)));
        assert_eq!(store.offset(ALT_AUDIO), Some(Offset::ZERO));
        assert_eq!(store.offset(OTHER_SET), Some(Offset::ZERO));
    }

    #[test]
    fn test_sibling_controller_sees_broadcast() {
        let store = store();
        let mut easy = controller(&store);
        let mut hard = controller_for(&store, HARD, AdjustmentGate::new(), SessionStatics::new());

        easy.set_value(-2.5);
        easy.update();
        store.complete_all();
        hard.update();

        assert_eq!(hard.current(), Offset::from_ms(-2.5));
    }

    #[test]
    fn test_missing_beatmap_write_is_noop() {
        let store = store();
        let mut controller = controller_for(
            &store,
            BeatmapId(99),
            AdjustmentGate::new(),
            SessionStatics::new(),
        );
        assert_eq!(controller.current(), Offset::ZERO);

        controller.set_value(3.0);
        controller.update();
        assert_eq!(store.complete_all(), 1);
        controller.update();

        assert_eq!(controller.current(), Offset::from_ms(3.0));
        assert_eq!(store.offset(EASY), Some(Offset::ZERO));
        assert!(controller.is_settled());
    }

    #[test]
    fn test_disabled_rejects_edits_but_follows_store() {
        let store = store();
        let gate = AdjustmentGate::disabled();
        let mut controller = controller_for(&store, EASY, gate.clone(), SessionStatics::new());

        assert!(!controller.set_value(10.0));
        assert_eq!(controller.current(), Offset::ZERO);

        store.external_write(EASY, Offset::from_ms(1.5));
        controller.update();
        assert_eq!(controller.current(), Offset::from_ms(1.5));

        gate.set_disabled(false);
        assert!(controller.set_value(10.0));
        assert_eq!(controller.current(), Offset::from_ms(10.0));
    }

    #[test]
    fn test_calibrate() {
        let store = store();
        let mut controller = controller(&store);

        assert!(controller.calibrate(4.0, 0.0));
        assert_eq!(controller.current(), Offset::from_ms(-4.0));

        // Below half a precision step
        assert!(!controller.calibrate(0.03, -4.0));
        assert_eq!(controller.current(), Offset::from_ms(-4.0));
    }

    #[test]
    fn test_calibrate_disabled() {
        let store = store();
        let mut controller =
            controller_for(&store, EASY, AdjustmentGate::disabled(), SessionStatics::new());

        assert!(!controller.calibrate(4.0, 0.0));
        assert_eq!(controller.current(), Offset::ZERO);
    }

    #[test]
    fn test_reference_score_acceptance() {
        let store = store();
        let mut controller = controller(&store);
        let offsets = [-3.0; 12];

        assert!(!controller.set_reference_score(None));
        assert!(!controller.set_reference_score(Some(&score(1, HARD, &offsets))));
        assert!(!controller.set_reference_score(Some(&score(1, EASY, &offsets[..9]))));

        let mut autoplay = score(1, EASY, &offsets);
        autoplay.autoplay = true;
        assert!(!controller.set_reference_score(Some(&autoplay)));

        let mut misses = score(1, EASY, &offsets);
        for event in &mut misses.hit_events {
            event.result = HitResult::Miss;
        }
        assert!(!controller.set_reference_score(Some(&misses)));
        assert!(controller.suggestion().is_none());

        assert!(controller.set_reference_score(Some(&score(1, EASY, &offsets))));
        let suggestion = controller.suggestion().unwrap();
        assert_eq!(suggestion.median_error, -3.0);
        assert_eq!(suggestion.suggested(), Offset::from_ms(3.0));
    }

    #[test]
    fn test_reference_captures_offset_at_capture_time() {
        let store = store();
        store.external_write(EASY, Offset::from_ms(2.0));
        let mut controller = controller(&store);

        controller.set_reference_score(Some(&score(1, EASY, &[1.0; 10])));
        controller.set_value(-20.0);

        assert_eq!(
            controller.suggestion().unwrap().offset_at_capture,
            Offset::from_ms(2.0)
        );
        assert!(controller.calibrate_from_reference());
        assert_eq!(controller.current(), Offset::from_ms(1.0));
    }

    #[test]
    fn test_calibrate_from_reference_is_applied_once_per_session() {
        let store = store();
        let session = SessionStatics::new();
        let mut controller = controller_for(&store, EASY, AdjustmentGate::new(), session.clone());
        let reference = score(7, EASY, &[-5.0; 10]);

        controller.set_reference_score(Some(&reference));
        assert!(controller.can_calibrate());
        assert!(controller.calibrate_from_reference());
        assert_eq!(controller.current(), Offset::from_ms(5.0));
        assert_eq!(session.last_applied_offset_score(), Some(ScoreId(7)));

        assert!(!controller.can_calibrate());
        assert!(!controller.calibrate_from_reference());

        // A later controller in the same session sees the score as used
        let mut other = controller_for(&store, HARD, AdjustmentGate::new(), session.clone());
        let mut reference_for_hard = reference.clone();
        reference_for_hard.beatmap_id = HARD;
        other.set_reference_score(Some(&reference_for_hard));
        assert!(!other.can_calibrate());
    }

    #[test]
    fn test_cannot_calibrate_when_already_aligned() {
        let store = store();
        let mut controller = controller(&store);

        controller.set_reference_score(Some(&score(1, EASY, &[0.02; 10])));
        assert!(controller.suggestion().is_some());
        assert!(!controller.can_calibrate());
        assert!(!controller.calibrate_from_reference());
    }

    #[test]
    fn test_calibration_past_limit_is_not_applied() {
        let store = store();
        store.external_write(EASY, Offset::from_ms(50.0));
        let session = SessionStatics::new();
        let mut controller = controller_for(&store, EASY, AdjustmentGate::new(), session.clone());

        controller.set_reference_score(Some(&score(9, EASY, &[-80.0; 10])));
        let suggestion = controller.suggestion().unwrap();
        assert_eq!(suggestion.suggested(), Offset::from_ms(50.0));

        assert!(!controller.can_calibrate());
        assert!(!controller.calibrate_from_reference());
        assert!(!controller.calibrate(-80.0, 50.0));
        controller.update();

        assert_eq!(controller.current(), Offset::from_ms(50.0));
        assert_eq!(store.writes_submitted(), 0);
        assert_eq!(session.last_applied_offset_score(), None);
    }

    #[test]
    fn test_calibration_toward_limit_is_clamped() {
        let store = store();
        store.external_write(EASY, Offset::from_ms(45.0));
        let mut controller = controller(&store);

        controller.set_reference_score(Some(&score(9, EASY, &[-80.0; 10])));
        assert!(controller.can_calibrate());
        assert!(controller.calibrate_from_reference());
        assert_eq!(controller.current(), Offset::from_ms(50.0));
    }

    #[test]
    fn test_listeners_see_local_and_external_changes() {
        let store = store();
        let mut controller = controller(&store);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        controller.on_value_changed(move |value| sink.borrow_mut().push(value));

        controller.set_value(1.0);
        controller.update();
        store.complete_all();
        controller.update();
        store.external_write(EASY, Offset::from_ms(-1.0));
        controller.update();

        assert_eq!(
            *seen.borrow(),
            vec![Offset::from_ms(1.0), Offset::from_ms(-1.0)]
        );
    }

    #[test]
    fn test_dispose_releases_subscription() {
        let store = store();
        let controller = controller(&store);
        assert_eq!(store.subscriber_count(), 1);

        controller.dispose();
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn test_drop_releases_subscription() {
        let store = store();
        {
            let _controller = controller(&store);
            assert_eq!(store.subscriber_count(), 1);
        }
        assert_eq!(store.subscriber_count(), 0);
    }
}
