//! Single-slot latest-value hand-off.
//!
//! One producer replaces the held value every iteration; any number of
//! consumers read whatever is current. Values are immutable once
//! published and travel as `Arc<T>`, so the lock only guards a pointer
//! swap or clone and a reader can never see a half-written value.
//!
//! Each publish bumps a generation counter. Consumers that already sent
//! generation `n` use [`FrameSlot::latest_since`] to skip re-sending it.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A published value and the generation it was published under.
pub struct Snapshot<T> {
    pub generation: u64,
    pub value: Arc<T>,
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            generation: self.generation,
            value: Arc::clone(&self.value),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Snapshot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("generation", &self.generation)
            .field("value", &self.value)
            .finish()
    }
}

struct SlotState<T> {
    generation: u64,
    value: Option<Arc<T>>,
}

/// Latest-value slot shared between the detection loop and stream clients.
pub struct FrameSlot<T> {
    state: RwLock<SlotState<T>>,
}

impl<T> Default for FrameSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for FrameSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.read();
        f.debug_struct("FrameSlot")
            .field("generation", &state.generation)
            .field("has_value", &state.value.is_some())
            .finish()
    }
}

impl<T> FrameSlot<T> {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(SlotState {
                generation: 0,
                value: None,
            }),
        }
    }

    // The state is only ever replaced by whole assignments, so a panic in
    // another holder cannot leave it half-updated.
    fn read(&self) -> RwLockReadGuard<'_, SlotState<T>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SlotState<T>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the held value. Returns the new generation.
    pub fn publish(&self, value: T) -> u64 {
        self.publish_arc(Arc::new(value))
    }

    /// Replace the held value with an already shared one.
    pub fn publish_arc(&self, value: Arc<T>) -> u64 {
        // Swap under the lock, drop the previous value after releasing it.
        let previous;
        let generation;
        {
            let mut state = self.write();
            state.generation += 1;
            generation = state.generation;
            previous = state.value.replace(value);
        }
        drop(previous);
        generation
    }

    /// Current value, or `None` while nothing has been published.
    pub fn latest(&self) -> Option<Snapshot<T>> {
        let state = self.read();
        state.value.as_ref().map(|value| Snapshot {
            generation: state.generation,
            value: Arc::clone(value),
        })
    }

    /// Current value if it is newer than `seen`.
    pub fn latest_since(&self, seen: u64) -> Option<Snapshot<T>> {
        let state = self.read();
        if state.generation <= seen {
            return None;
        }
        state.value.as_ref().map(|value| Snapshot {
            generation: state.generation,
            value: Arc::clone(value),
        })
    }

    /// Generation of the most recent publish (0 before the first).
    pub fn generation(&self) -> u64 {
        self.read().generation
    }

    pub fn has_value(&self) -> bool {
        self.read().value.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    #[test]
    fn test_empty_slot() {
        let slot: FrameSlot<u32> = FrameSlot::new();
        assert!(slot.latest().is_none());
        assert!(!slot.has_value());
        assert_eq!(slot.generation(), 0);
    }

    #[test]
    fn test_publish_replaces_value() {
        let slot = FrameSlot::new();
        assert_eq!(slot.publish("first"), 1);
        assert_eq!(slot.publish("second"), 2);

        let snap = slot.latest().unwrap();
        assert_eq!(snap.generation, 2);
        assert_eq!(*snap.value, "second");
    }

    #[test]
    fn test_latest_since_skips_seen_generation() {
        let slot = FrameSlot::new();
        slot.publish(10);
        let snap = slot.latest_since(0).unwrap();
        assert_eq!(snap.generation, 1);

        assert!(slot.latest_since(snap.generation).is_none());

        slot.publish(11);
        let next = slot.latest_since(snap.generation).unwrap();
        assert_eq!(*next.value, 11);
    }

    #[test]
    fn test_reader_keeps_value_after_replacement() {
        let slot = FrameSlot::new();
        slot.publish(vec![1u8; 4]);
        let held = slot.latest().unwrap();

        slot.publish(vec![2u8; 4]);
        assert_eq!(*held.value, vec![1u8; 4]);
        assert_eq!(*slot.latest().unwrap().value, vec![2u8; 4]);
    }

    /// Every published buffer is filled with a single tag value that encodes
    /// its publisher and sequence number. A torn read would mix tags.
    #[test]
    fn test_concurrent_publishers_and_consumers() {
        const PUBLISHERS: u64 = 3;
        const CONSUMERS: usize = 6;
        const PER_PUBLISHER: u64 = 300;
        const LEN: usize = 4096;

        let slot: Arc<FrameSlot<Vec<u64>>> = Arc::new(FrameSlot::new());
        let done = Arc::new(AtomicBool::new(false));

        let consumers: Vec<_> = (0..CONSUMERS)
            .map(|_| {
                let slot = Arc::clone(&slot);
                let done = Arc::clone(&done);
                thread::spawn(move || {
                    let mut seen = HashSet::new();
                    let mut last_generation = 0;
                    while !done.load(Ordering::Acquire) {
                        if let Some(snap) = slot.latest() {
                            assert!(snap.generation >= last_generation);
                            last_generation = snap.generation;

                            let tag = snap.value[0];
                            assert_eq!(snap.value.len(), LEN);
                            assert!(snap.value.iter().all(|&v| v == tag), "torn frame");
                            seen.insert(tag);
                        }
                        thread::yield_now();
                    }
                    seen
                })
            })
            .collect();

        let publishers: Vec<_> = (0..PUBLISHERS)
            .map(|p| {
                let slot = Arc::clone(&slot);
                thread::spawn(move || {
                    for i in 0..PER_PUBLISHER {
                        slot.publish(vec![p * 1_000_000 + i; LEN]);
                    }
                })
            })
            .collect();

        for handle in publishers {
            handle.join().unwrap();
        }
        done.store(true, Ordering::Release);

        for handle in consumers {
            for tag in handle.join().unwrap() {
                let publisher = tag / 1_000_000;
                let seq = tag % 1_000_000;
                assert!(publisher < PUBLISHERS, "never-published tag {tag}");
                assert!(seq < PER_PUBLISHER, "never-published tag {tag}");
            }
        }

        assert_eq!(slot.generation(), PUBLISHERS * PER_PUBLISHER);
    }
}
