//! Virtual clock for one-shot timers.
//!
//! Timers only advance when [`Scheduler::advance`] is called, so callers and
//! tests decide how time flows. A paused timer keeps its remaining delay and
//! continues from it once resumed; firings that would have happened during the
//! pause are not replayed.

use std::time::Duration;

/// Handle identifying a scheduled timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TimerState {
    Armed,
    Suspended,
}

#[derive(Debug)]
struct Entry<T> {
    handle: TimerHandle,
    remaining: Duration,
    state: TimerState,
    task: T,
}

/// Collection of pending one-shot timers driven by a virtual clock.
#[derive(Debug)]
pub struct Scheduler<T> {
    entries: Vec<Entry<T>>,
    next_handle: u64,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    /// Creates a scheduler with no pending timers.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_handle: 0,
        }
    }

    /// Arms a timer that yields `task` once `delay` has elapsed.
    pub fn schedule(&mut self, delay: Duration, task: T) -> TimerHandle {
        let handle = TimerHandle(self.next_handle);
        self.next_handle = self.next_handle.wrapping_add(1);
        self.entries.push(Entry {
            handle,
            remaining: delay,
            state: TimerState::Armed,
            task,
        });
        handle
    }

    /// Removes the timer, returning its task if it was still pending.
    pub fn cancel(&mut self, handle: TimerHandle) -> Option<T> {
        let index = self.position(handle)?;
        Some(self.entries.remove(index).task)
    }

    /// Stops the timer from counting down. Returns whether the timer exists.
    pub fn pause(&mut self, handle: TimerHandle) -> bool {
        self.set_state(handle, TimerState::Suspended)
    }

    /// Lets a paused timer continue counting down. Returns whether the timer exists.
    pub fn resume(&mut self, handle: TimerHandle) -> bool {
        self.set_state(handle, TimerState::Armed)
    }

    /// Reports whether the timer is still pending.
    #[must_use]
    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.position(handle).is_some()
    }

    /// Reports whether the timer exists and is paused.
    #[must_use]
    pub fn is_paused(&self, handle: TimerHandle) -> bool {
        self.position(handle)
            .map_or(false, |index| self.entries[index].state == TimerState::Suspended)
    }

    /// Delay left before the timer fires.
    #[must_use]
    pub fn remaining(&self, handle: TimerHandle) -> Option<Duration> {
        self.position(handle)
            .map(|index| self.entries[index].remaining)
    }

    /// Number of pending timers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether no timer is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every pending timer without firing it.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Advances the clock, moving the tasks of expired timers into `out`.
    ///
    /// Expired tasks are appended in firing order: earliest deadline first,
    /// ties broken by scheduling order.
    pub fn advance(&mut self, dt: Duration, out: &mut Vec<T>) {
        let mut fired: Vec<(Duration, TimerHandle, T)> = Vec::new();
        let mut index = 0;
        while index < self.entries.len() {
            let (state, remaining) = {
                let entry = &self.entries[index];
                (entry.state, entry.remaining)
            };

            if state == TimerState::Suspended {
                index += 1;
                continue;
            }

            if remaining <= dt {
                let entry = self.entries.remove(index);
                fired.push((entry.remaining, entry.handle, entry.task));
            } else {
                self.entries[index].remaining = remaining - dt;
                index += 1;
            }
        }

        fired.sort_by_key(|(remaining, handle, _)| (*remaining, *handle));
        out.extend(fired.into_iter().map(|(_, _, task)| task));
    }

    fn position(&self, handle: TimerHandle) -> Option<usize> {
        self.entries.iter().position(|entry| entry.handle == handle)
    }

    fn set_state(&mut self, handle: TimerHandle, state: TimerState) -> bool {
        match self.position(handle) {
            Some(index) => {
                self.entries[index].state = state;
                true
            }
            None => false,
        }
    }
}
