//! Scheduled events that mutate a coupled model during simulation.
//!
//! Each event is `Pending` until simulation time reaches its trigger time,
//! then it is applied once and removed. No event returns to `Pending`.

use crate::error::{ModelError, ModelResult};
use nalgebra::{DMatrix, DVector};
use std::collections::VecDeque;

/// Wholesale replacement of any subset of the model parameters.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParameterReplacement {
    pub inertias: Option<DVector<f64>>,
    pub dampings: Option<DVector<f64>>,
    pub powers: Option<DVector<f64>>,
    pub coupling: Option<DMatrix<f64>>,
}

impl ParameterReplacement {
    pub fn is_empty(&self) -> bool {
        self.inertias.is_none()
            && self.dampings.is_none()
            && self.powers.is_none()
            && self.coupling.is_none()
    }
}

/// Payload of a scheduled event.
#[derive(Clone, Debug, PartialEq)]
pub enum EventKind {
    /// Step change of the power injections: `P += delta`.
    LoadJump { delta: DVector<f64> },
    /// Transmission-line trip: `K[from, to] = K[to, from] = 0`.
    LineDrop { from: usize, to: usize },
    /// Overwrite parameters.
    Replace(ParameterReplacement),
}

impl EventKind {
    /// Short name used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            EventKind::LoadJump { .. } => "load_jump",
            EventKind::LineDrop { .. } => "line_drop",
            EventKind::Replace(_) => "replace",
        }
    }
}

/// An event with its trigger time.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub time: f64,
    pub kind: EventKind,
}

impl Event {
    pub fn new(time: f64, kind: EventKind) -> Self {
        Self { time, kind }
    }

    pub fn load_jump(time: f64, delta: Vec<f64>) -> Self {
        Self::new(
            time,
            EventKind::LoadJump {
                delta: DVector::from_vec(delta),
            },
        )
    }

    pub fn line_drop(time: f64, from: usize, to: usize) -> Self {
        Self::new(time, EventKind::LineDrop { from, to })
    }

    pub fn replace(time: f64, replacement: ParameterReplacement) -> Self {
        Self::new(time, EventKind::Replace(replacement))
    }

    /// An event is due once simulation time reaches or passes its time.
    #[inline]
    pub fn is_due(&self, t: f64) -> bool {
        self.time <= t
    }
}

/// Record of an applied event, kept in the model's event log.
#[derive(Clone, Debug, PartialEq)]
pub struct AppliedEvent {
    pub event: Event,
    /// Simulation time of the evaluation that applied the event.
    pub applied_at: f64,
}

/// Hook notified whenever an event is applied.
pub trait EventObserver: Send {
    fn on_event(&mut self, applied: &AppliedEvent);
}

impl<F> EventObserver for F
where
    F: FnMut(&AppliedEvent) + Send,
{
    fn on_event(&mut self, applied: &AppliedEvent) {
        self(applied)
    }
}

/// Pending events ordered by trigger time.
///
/// Events with equal times keep their insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EventSchedule {
    pending: VecDeque<Event>,
}

impl EventSchedule {
    pub fn new(events: impl IntoIterator<Item = Event>) -> Self {
        let mut events: Vec<Event> = events.into_iter().collect();
        events.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self {
            pending: events.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.pending.iter()
    }

    /// Trigger time of the next pending event.
    pub fn next_time(&self) -> Option<f64> {
        self.pending.front().map(|e| e.time)
    }

    /// Remove and return the earliest event if it is due at `t`.
    pub(crate) fn pop_due(&mut self, t: f64) -> Option<Event> {
        if self.pending.front().is_some_and(|e| e.is_due(t)) {
            self.pending.pop_front()
        } else {
            None
        }
    }

    /// Check every payload against a model with `n` machines.
    pub(crate) fn validate(&self, n: usize) -> ModelResult<()> {
        for (index, event) in self.pending.iter().enumerate() {
            let invalid = |reason: String| ModelError::InvalidEvent {
                index,
                time: event.time,
                reason,
            };
            if !event.time.is_finite() {
                return Err(invalid("trigger time must be finite".to_string()));
            }
            match &event.kind {
                EventKind::LoadJump { delta } => {
                    if delta.len() != n {
                        return Err(invalid(format!(
                            "load jump has {} entries, model has {} machines",
                            delta.len(),
                            n
                        )));
                    }
                    if delta.iter().any(|v| !v.is_finite()) {
                        return Err(invalid("load jump must be finite".to_string()));
                    }
                }
                EventKind::LineDrop { from, to } => {
                    if *from >= n || *to >= n {
                        return Err(invalid(format!(
                            "line ({from}, {to}) references a machine outside 0..{n}"
                        )));
                    }
                    if from == to {
                        return Err(invalid(format!("line ({from}, {to}) is a self-loop")));
                    }
                }
                EventKind::Replace(replacement) => {
                    if replacement.is_empty() {
                        return Err(invalid("replacement sets no parameters".to_string()));
                    }
                    crate::coupled::validate_parameters(
                        n,
                        replacement.inertias.as_ref(),
                        replacement.dampings.as_ref(),
                        replacement.powers.as_ref(),
                        replacement.coupling.as_ref(),
                    )
                    .map_err(|e| invalid(e.to_string()))?;
                }
            }
        }
        Ok(())
    }
}

impl From<Vec<Event>> for EventSchedule {
    fn from(events: Vec<Event>) -> Self {
        Self::new(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_sorted_and_stable() {
        let schedule = EventSchedule::new(vec![
            Event::line_drop(3.0, 0, 1),
            Event::load_jump(1.0, vec![1.0]),
            Event::line_drop(3.0, 1, 0),
        ]);
        let times: Vec<f64> = schedule.iter().map(|e| e.time).collect();
        assert_eq!(times, vec![1.0, 3.0, 3.0]);
        let kinds: Vec<&EventKind> = schedule.iter().map(|e| &e.kind).collect();
        assert_eq!(kinds[1], &EventKind::LineDrop { from: 0, to: 1 });
        assert_eq!(kinds[2], &EventKind::LineDrop { from: 1, to: 0 });
    }

    #[test]
    fn pop_due_respects_trigger_time() {
        let mut schedule = EventSchedule::new(vec![Event::load_jump(5.0, vec![1.0])]);
        assert!(schedule.pop_due(4.999).is_none());
        assert!(schedule.pop_due(5.0).is_some());
        assert!(schedule.pop_due(6.0).is_none());
        assert!(schedule.is_empty());
    }

    #[test]
    fn validate_rejects_wrong_jump_length() {
        let schedule = EventSchedule::new(vec![Event::load_jump(1.0, vec![1.0, 2.0])]);
        let err = schedule.validate(3).unwrap_err();
        assert!(matches!(err, ModelError::InvalidEvent { index: 0, .. }));
    }

    #[test]
    fn validate_rejects_bad_line() {
        let out_of_range = EventSchedule::new(vec![Event::line_drop(1.0, 0, 3)]);
        assert!(out_of_range.validate(3).is_err());

        let self_loop = EventSchedule::new(vec![Event::line_drop(1.0, 1, 1)]);
        assert!(self_loop.validate(3).is_err());
    }

    #[test]
    fn validate_rejects_empty_replacement() {
        let schedule = EventSchedule::new(vec![Event::replace(
            1.0,
            ParameterReplacement::default(),
        )]);
        assert!(schedule.validate(2).is_err());
    }

    #[test]
    fn validate_rejects_zero_inertia_replacement() {
        let schedule = EventSchedule::new(vec![Event::replace(
            1.0,
            ParameterReplacement {
                inertias: Some(DVector::from_vec(vec![1.0, 0.0])),
                ..Default::default()
            },
        )]);
        assert!(schedule.validate(2).is_err());
    }

    #[test]
    fn validate_rejects_nan_time() {
        let schedule = EventSchedule::new(vec![Event::line_drop(f64::NAN, 0, 1)]);
        assert!(schedule.validate(2).is_err());
    }
}
