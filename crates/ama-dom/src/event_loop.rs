//! Event loop
//!
//! A deterministic stand-in for the browser task queues. Time is virtual
//! and only moves when the host calls `advance_time`; animation frames
//! only run on `render_frame`.

use std::collections::{BTreeMap, HashMap, VecDeque};

use crate::Document;

/// Deferred callback
pub type Task = Box<dyn FnOnce(&mut Document)>;

/// Handle for `set_timeout`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// Handle for `request_animation_frame`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(u64);

#[derive(Default)]
pub(crate) struct EventLoop {
    now: u64,
    seq: u64,
    microtasks: VecDeque<Task>,
    /// Ordered by (due time, insertion sequence)
    timers: BTreeMap<(u64, u64), (TimerId, Task)>,
    timer_keys: HashMap<TimerId, (u64, u64)>,
    frames: Vec<(FrameId, Task)>,
}

impl EventLoop {
    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn set_now(&mut self, now: u64) {
        self.now = self.now.max(now);
    }

    pub fn queue_microtask(&mut self, task: Task) {
        self.microtasks.push_back(task);
    }

    pub fn take_microtask(&mut self) -> Option<Task> {
        self.microtasks.pop_front()
    }

    pub fn set_timeout(&mut self, delay_ms: u64, task: Task) -> TimerId {
        let seq = self.next_seq();
        let id = TimerId(seq);
        let key = (self.now + delay_ms, seq);
        self.timers.insert(key, (id, task));
        self.timer_keys.insert(id, key);
        id
    }

    pub fn clear_timeout(&mut self, id: TimerId) -> bool {
        match self.timer_keys.remove(&id) {
            Some(key) => self.timers.remove(&key).is_some(),
            None => false,
        }
    }

    /// Pop the earliest timer due at or before `limit`
    pub fn pop_due_timer(&mut self, limit: u64) -> Option<(u64, Task)> {
        let (&key, _) = self.timers.first_key_value()?;
        if key.0 > limit {
            return None;
        }
        let (id, task) = self.timers.remove(&key)?;
        self.timer_keys.remove(&id);
        Some((key.0, task))
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn request_frame(&mut self, task: Task) -> FrameId {
        let id = FrameId(self.next_seq());
        self.frames.push((id, task));
        id
    }

    pub fn cancel_frame(&mut self, id: FrameId) -> bool {
        let before = self.frames.len();
        self.frames.retain(|(f, _)| *f != id);
        before != self.frames.len()
    }

    /// Frames requested so far; ones requested while these run wait for the next frame
    pub fn take_frames(&mut self) -> Vec<Task> {
        std::mem::take(&mut self.frames).into_iter().map(|(_, t)| t).collect()
    }

    pub fn pending_frames(&self) -> usize {
        self.frames.len()
    }
}
