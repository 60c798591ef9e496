//! The presentation sink notified about snap targets and sources.

use super::candidate::SnapCandidatePoint;
use super::results::SnappedPoint;
use std::cell::RefCell;
use std::rc::Rc;

/// Receives the chosen snap so it can be drawn. Purely a notification.
pub trait SnapIndicator {
    fn set_target(&mut self, snapped: &SnappedPoint, pre_snap: bool);
    fn remove_target(&mut self, only_if_pre_snap: bool);
    fn set_source(&mut self, source: &SnapCandidatePoint);
    fn remove_source(&mut self);
}

/// Ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullIndicator;

impl SnapIndicator for NullIndicator {
    fn set_target(&mut self, _snapped: &SnappedPoint, _pre_snap: bool) {}
    fn remove_target(&mut self, _only_if_pre_snap: bool) {}
    fn set_source(&mut self, _source: &SnapCandidatePoint) {}
    fn remove_source(&mut self) {}
}

/// A recorded indicator notification.
#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorEvent {
    SetTarget { snapped: SnappedPoint, pre_snap: bool },
    RemoveTarget { only_if_pre_snap: bool },
    SetSource(SnapCandidatePoint),
    RemoveSource,
}

/// Records notifications; clones share the same event list.
#[derive(Debug, Clone, Default)]
pub struct RecordingIndicator {
    events: Rc<RefCell<Vec<IndicatorEvent>>>,
}

impl RecordingIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<IndicatorEvent> {
        self.events.borrow().clone()
    }

    /// Drain the events recorded so far.
    pub fn take(&self) -> Vec<IndicatorEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    /// The most recent target shown, if it is still displayed.
    pub fn current_target(&self) -> Option<SnappedPoint> {
        self.events.borrow().iter().rev().find_map(|event| match event {
            IndicatorEvent::SetTarget { snapped, .. } => Some(Some(snapped.clone())),
            IndicatorEvent::RemoveTarget { .. } => Some(None),
            _ => None,
        })?
    }
}

impl SnapIndicator for RecordingIndicator {
    fn set_target(&mut self, snapped: &SnappedPoint, pre_snap: bool) {
        self.events.borrow_mut().push(IndicatorEvent::SetTarget {
            snapped: snapped.clone(),
            pre_snap,
        });
    }

    fn remove_target(&mut self, only_if_pre_snap: bool) {
        self.events
            .borrow_mut()
            .push(IndicatorEvent::RemoveTarget { only_if_pre_snap });
    }

    fn set_source(&mut self, source: &SnapCandidatePoint) {
        self.events.borrow_mut().push(IndicatorEvent::SetSource(source.clone()));
    }

    fn remove_source(&mut self) {
        self.events.borrow_mut().push(IndicatorEvent::RemoveSource);
    }
}
