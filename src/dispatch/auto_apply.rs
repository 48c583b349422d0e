//! Debounced reprojection after geometry changes.
//!
//! The host pushes a [`GeometryEvent`] whenever a tagged mesh changes shape and
//! calls [`AutoApply::update`] once per tick. `update` returns the meshes that
//! should be reprojected now.
//!
//! Events for a mesh that is currently being written by the texturing code
//! itself are dropped, so a reprojection never triggers another one.

use bevy::log::debug;
use std::collections::HashSet;
use std::hash::Hash;
use std::time::Duration;

use crate::prefs::Preferences;

/// Debounce intervals shorter than this apply on every event.
pub const IMMEDIATE_THRESHOLD: Duration = Duration::from_millis(40);

/// A mesh changed shape while `operation` was the active user operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryEvent<K> {
    pub mesh: K,
    /// Host identifier of the operation that caused the change.
    pub operation: u64,
}

/// Debouncing dispatcher keyed by mesh handle `K`.
#[derive(Debug, Clone)]
pub struct AutoApply<K> {
    queue: Vec<GeometryEvent<K>>,
    writing: HashSet<K>,
    last_operation: Option<u64>,
    /// Deadline of the one-shot timer, if armed.
    deadline: Option<Duration>,
    /// Every mesh seen since the timer was armed, in arrival order. A mesh that
    /// changed early in a drag is still reprojected when the timer fires.
    pending: Vec<K>,
    tagged_meshes: usize,
}

impl<K> Default for AutoApply<K> {
    fn default() -> Self {
        Self {
            queue: Vec::new(),
            writing: HashSet::new(),
            last_operation: None,
            deadline: None,
            pending: Vec::new(),
            tagged_meshes: 0,
        }
    }
}

fn push_unique<K: PartialEq>(list: &mut Vec<K>, key: K) {
    if !list.contains(&key) {
        list.push(key);
    }
}

impl<K: Copy + Eq + Hash> AutoApply<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while no tagged mesh exists. Events are ignored while idle.
    pub fn is_idle(&self) -> bool {
        self.tagged_meshes == 0
    }

    /// Record how many tagged meshes the scene holds. Zero puts the
    /// dispatcher to sleep.
    pub fn set_tagged_count(&mut self, count: usize) {
        let was_idle = self.is_idle();
        self.tagged_meshes = count;
        if self.is_idle() && !was_idle {
            self.sleep();
        } else if was_idle && !self.is_idle() {
            debug!("Auto-apply awake ({} tagged meshes)", count);
        }
    }

    /// Drop all queued work and go idle.
    pub fn sleep(&mut self) {
        self.tagged_meshes = 0;
        self.queue.clear();
        self.pending.clear();
        self.deadline = None;
        self.last_operation = None;
        debug!("Auto-apply asleep");
    }

    /// Mark `mesh` as being written by the texturing code.
    pub fn begin_write(&mut self, mesh: K) {
        self.writing.insert(mesh);
        self.queue.retain(|event| event.mesh != mesh);
    }

    pub fn end_write(&mut self, mesh: K) {
        self.writing.remove(&mesh);
    }

    /// Clear every write mark.
    pub fn finish_writes(&mut self) {
        self.writing.clear();
    }

    pub fn is_writing(&self, mesh: K) -> bool {
        self.writing.contains(&mesh)
    }

    pub fn is_writing_any(&self) -> bool {
        !self.writing.is_empty()
    }

    /// Queue a geometry change. Returns false if the event was dropped.
    pub fn push(&mut self, event: GeometryEvent<K>) -> bool {
        if self.is_idle() || self.writing.contains(&event.mesh) {
            return false;
        }
        self.queue.push(event);
        true
    }

    /// Whether the one-shot timer is armed.
    pub fn is_scheduled(&self) -> bool {
        self.deadline.is_some()
    }

    /// Process queued events at time `now` and return the meshes to reproject.
    pub fn update(&mut self, now: Duration, prefs: &Preferences) -> Vec<K> {
        if !prefs.auto_apply {
            self.queue.clear();
            self.pending.clear();
            self.deadline = None;
            return Vec::new();
        }

        let interval = prefs.update_interval();
        let mut due = Vec::new();

        for event in std::mem::take(&mut self.queue) {
            let operation_changed = self.last_operation != Some(event.operation);
            self.last_operation = Some(event.operation);

            if interval < IMMEDIATE_THRESHOLD || operation_changed {
                push_unique(&mut due, event.mesh);
                continue;
            }

            push_unique(&mut self.pending, event.mesh);
            // an armed timer is kept, so a steady stream still fires every interval
            if self.deadline.is_none() {
                self.deadline = Some(now + interval);
            }
        }

        if self.deadline.is_some_and(|deadline| now >= deadline) {
            self.deadline = None;
            for mesh in self.pending.drain(..) {
                push_unique(&mut due, mesh);
            }
        }

        if !due.is_empty() {
            debug!("Auto-apply: {} meshes due", due.len());
        }
        due
    }
}
