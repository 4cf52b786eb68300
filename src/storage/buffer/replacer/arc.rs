//! Adaptive Replacement Cache eviction policy.
//!
//! Resident frames live in one of two LRU lists: T1 holds frames seen once
//! recently, T2 holds frames seen at least twice. Evicted pages leave a
//! ghost entry behind (B1 for T1 victims, B2 for T2 victims); a ghost hit
//! shifts the target size `p` of T1, letting the split between recency and
//! frequency adapt to the workload.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use crate::common::types::{FrameId, PageId};

/// Which resident list an alive entry is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArcList {
    T1,
    T2,
}

/// Which ghost list an evicted page id is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GhostList {
    B1,
    B2,
}

struct AliveEntry {
    page_id: PageId,
    evictable: bool,
    list: ArcList,
}

struct ArcInner {
    /// T1, most-recent first.
    t1: VecDeque<FrameId>,
    /// T2, most-recent first.
    t2: VecDeque<FrameId>,
    /// B1 ghost page ids, most-recent first.
    b1: VecDeque<PageId>,
    /// B2 ghost page ids, most-recent first.
    b2: VecDeque<PageId>,
    alive: HashMap<FrameId, AliveEntry>,
    ghost: HashMap<PageId, GhostList>,
    /// Count of alive entries with evictable == true.
    evictable_count: usize,
    /// Target size of T1 (`p` in the ARC paper), in [0, capacity].
    t1_target: usize,
}

pub struct ArcReplacer {
    capacity: usize,
    inner: Mutex<ArcInner>,
}

impl ArcReplacer {
    pub fn new(num_frames: usize) -> Self {
        Self {
            capacity: num_frames,
            inner: Mutex::new(ArcInner {
                t1: VecDeque::new(),
                t2: VecDeque::new(),
                b1: VecDeque::new(),
                b2: VecDeque::new(),
                alive: HashMap::with_capacity(num_frames),
                ghost: HashMap::new(),
                evictable_count: 0,
                t1_target: 0,
            }),
        }
    }

    /// Record an access to `page_id` now resident in `frame_id`. Called by
    /// the pool after fault-in, outside the pool latch.
    pub fn record_access(&self, frame_id: FrameId, page_id: PageId) {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        if let Some(list) = inner.alive.get(&frame_id).map(|entry| entry.list) {
            match list {
                ArcList::T1 => {
                    // Second access: recency list graduates to frequency list.
                    remove_from_list(&mut inner.t1, frame_id);
                    inner.t2.push_front(frame_id);
                    inner.alive.get_mut(&frame_id).unwrap().list = ArcList::T2;
                }
                ArcList::T2 => {
                    remove_from_list(&mut inner.t2, frame_id);
                    inner.t2.push_front(frame_id);
                }
            }
            return;
        }
        if let Some(&ghost_list) = inner.ghost.get(&page_id) {
            match ghost_list {
                GhostList::B1 => {
                    let delta = (inner.b2.len() / inner.b1.len()).max(1);
                    inner.t1_target = (inner.t1_target + delta).min(self.capacity);
                    remove_from_list(&mut inner.b1, page_id);
                }
                GhostList::B2 => {
                    let delta = (inner.b1.len() / inner.b2.len()).max(1);
                    inner.t1_target = inner.t1_target.saturating_sub(delta);
                    remove_from_list(&mut inner.b2, page_id);
                }
            }
            inner.ghost.remove(&page_id);
            inner.t2.push_front(frame_id);
            inner.alive.insert(
                frame_id,
                AliveEntry {
                    page_id,
                    evictable: false,
                    list: ArcList::T2,
                },
            );
            if inner.alive.len() > self.capacity {
                self.evict_locked(inner);
            }
            return;
        }
        // First sighting: onto the recency list.
        inner.t1.push_front(frame_id);
        inner.alive.insert(
            frame_id,
            AliveEntry {
                page_id,
                evictable: false,
                list: ArcList::T1,
            },
        );
        if inner.alive.len() > self.capacity {
            self.evict_locked(inner);
        }
    }

    /// Toggle whether a frame may be chosen as an eviction victim.
    ///
    /// # Panics
    ///
    /// Panics if the frame has never been recorded; that is a caller
    /// contract violation.
    pub fn set_evictable(&self, frame_id: FrameId, evictable: bool) {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let entry = inner
            .alive
            .get_mut(&frame_id)
            .unwrap_or_else(|| panic!("frame {} not known to the replacer", frame_id));
        if entry.evictable != evictable {
            entry.evictable = evictable;
            if evictable {
                inner.evictable_count += 1;
            } else {
                inner.evictable_count -= 1;
            }
        }
    }

    /// Choose and remove a victim frame, leaving a ghost entry behind.
    /// Returns `None` iff no alive entry is evictable.
    pub fn evict(&self) -> Option<FrameId> {
        let mut inner = self.inner.lock();
        self.evict_locked(&mut inner)
    }

    /// Drop a frame from the replacer entirely, with no ghost entry.
    /// Unknown frames are ignored.
    pub fn remove(&self, frame_id: FrameId) {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        if let Some(entry) = inner.alive.remove(&frame_id) {
            match entry.list {
                ArcList::T1 => remove_from_list(&mut inner.t1, frame_id),
                ArcList::T2 => remove_from_list(&mut inner.t2, frame_id),
            }
            if entry.evictable {
                inner.evictable_count -= 1;
            }
        }
    }

    /// Number of evictable frames.
    pub fn size(&self) -> usize {
        self.inner.lock().evictable_count
    }

    fn evict_locked(&self, inner: &mut ArcInner) -> Option<FrameId> {
        if inner.evictable_count == 0 {
            return None;
        }
        if inner.t1.len() > inner.t1_target {
            if let Some(victim) = self.try_evict(inner, ArcList::T1) {
                return Some(victim);
            }
            return self.try_evict(inner, ArcList::T2);
        }
        if inner.t2.len() >= self.capacity - inner.t1_target {
            if let Some(victim) = self.try_evict(inner, ArcList::T2) {
                return Some(victim);
            }
            return self.try_evict(inner, ArcList::T1);
        }
        if let Some(victim) = self.try_evict(inner, ArcList::T1) {
            return Some(victim);
        }
        self.try_evict(inner, ArcList::T2)
    }

    /// Scan one resident list from its LRU tail and evict the first
    /// evictable entry, moving its page id onto the matching ghost list.
    fn try_evict(&self, inner: &mut ArcInner, list: ArcList) -> Option<FrameId> {
        let pos = {
            let frames = match list {
                ArcList::T1 => &inner.t1,
                ArcList::T2 => &inner.t2,
            };
            frames
                .iter()
                .rposition(|frame_id| inner.alive[frame_id].evictable)?
        };
        let frame_id = match list {
            ArcList::T1 => inner.t1.remove(pos).unwrap(),
            ArcList::T2 => inner.t2.remove(pos).unwrap(),
        };
        let entry = inner.alive.remove(&frame_id).unwrap();
        inner.evictable_count -= 1;
        let (ghost_frames, ghost_tag) = match list {
            ArcList::T1 => (&mut inner.b1, GhostList::B1),
            ArcList::T2 => (&mut inner.b2, GhostList::B2),
        };
        ghost_frames.push_front(entry.page_id);
        inner.ghost.insert(entry.page_id, ghost_tag);
        // Bound the ghost history to one pool's worth per list.
        while ghost_frames.len() > self.capacity {
            if let Some(expired) = ghost_frames.pop_back() {
                inner.ghost.remove(&expired);
            }
        }
        Some(frame_id)
    }
}

fn remove_from_list<T: PartialEq>(list: &mut VecDeque<T>, item: T) {
    if let Some(pos) = list.iter().position(|x| *x == item) {
        list.remove(pos);
    }
}
