// src/pipeline/event_bus.rs
//
// Discrete events raised while processing frames. The pipeline publishes,
// the caller drains after each frame.

use crate::analysis::{Leg, SpinLabel};
use serde::Serialize;
use std::collections::VecDeque;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    Touch {
        frame_idx: u64,
        leg: Leg,
        count: u32,
    },
    VelocitySampled {
        frame_idx: u64,
        velocity: f32,
    },
    SpinClassified {
        frame_idx: u64,
        label: SpinLabel,
    },
}

impl PipelineEvent {
    pub fn frame_idx(&self) -> u64 {
        match self {
            PipelineEvent::Touch { frame_idx, .. }
            | PipelineEvent::VelocitySampled { frame_idx, .. }
            | PipelineEvent::SpinClassified { frame_idx, .. } => *frame_idx,
        }
    }
}

/// Events waiting for the caller, oldest first; overflow evicts the oldest.
pub struct EventBus {
    queue: VecDeque<PipelineEvent>,
    capacity: usize,
    evicted: u64,
}

impl EventBus {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            evicted: 0,
        }
    }

    /// Queue `event`; returns the evicted event when the queue was full.
    pub fn publish(&mut self, event: PipelineEvent) -> Option<PipelineEvent> {
        let evicted = if self.queue.len() >= self.capacity {
            self.queue.pop_front()
        } else {
            None
        };

        if let Some(old) = &evicted {
            self.evicted += 1;
            if self.evicted == 1 || self.evicted % 100 == 0 {
                warn!(
                    "Event queue at capacity {}: evicted frame {} event ({} evicted so far)",
                    self.capacity,
                    old.frame_idx(),
                    self.evicted
                );
            }
        }

        self.queue.push_back(event);
        evicted
    }

    pub fn drain(&mut self) -> std::collections::vec_deque::Drain<'_, PipelineEvent> {
        self.queue.drain(..)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Events lost to overflow since construction
    pub fn evicted(&self) -> u64 {
        self.evicted
    }
}
