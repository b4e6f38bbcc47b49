//! Single-frame hand-off slot — a bounded channel of capacity one with
//! overwrite-on-full.
//!
//! The capture thread publishes every frame; a slow consumer only ever
//! sees the most recent one. Late frames are dropped, never queued, so
//! memory stays bounded at one frame regardless of consumer speed.

use crate::frame::Frame;
use std::sync::{Condvar, Mutex};

#[derive(Default)]
struct SlotState {
    frame: Option<Frame>,
    closed: bool,
    /// Frames replaced before delivery (diagnostics only).
    overwritten: u64,
}

/// Capacity-one overwrite slot between the capture thread and the router.
#[derive(Default)]
pub struct FrameSlot {
    state: Mutex<SlotState>,
    cond: Condvar,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a frame, replacing any undelivered one. Dropped silently
    /// when the slot is closed.
    pub fn publish(&self, frame: Frame) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.closed {
            return;
        }
        if state.frame.replace(frame).is_some() {
            state.overwritten += 1;
        }
        self.cond.notify_one();
    }

    /// Block until a frame arrives or the slot closes. `None` means the
    /// slot was closed with nothing pending.
    pub fn recv(&self) -> Option<Frame> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if let Some(frame) = state.frame.take() {
                return Some(frame);
            }
            if state.closed {
                return None;
            }
            state = self.cond.wait(state).unwrap_or_else(|e| e.into_inner());
        }
    }

    /// Take the pending frame without blocking.
    pub fn try_recv(&self) -> Option<Frame> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .frame
            .take()
    }

    /// Close the slot: pending frame is dropped, blocked receivers wake
    /// and get `None`, later publishes are discarded.
    pub fn close(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.closed = true;
        state.frame = None;
        self.cond.notify_all();
    }

    /// Re-arm a closed slot for a new capture run.
    pub fn reopen(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.closed = false;
    }

    /// Number of frames overwritten before delivery since creation.
    pub fn overwritten(&self) -> u64 {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .overwritten
    }
}
