//! Mux-wide shared state.
//!
//! A [`MuxSession`] replaces process-wide globals: it hands out track
//! numbers and collision-free unique IDs, and arbitrates which track
//! becomes the default for each track type. One session lives for the
//! duration of one output file; readers and packetizers share it via
//! `Arc`.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use rand::RngExt;

use crate::track::{DefaultTrackFlag, TrackType};

/// Element classes that carry a Matroska UID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueIdCategory {
    Track,
    Chapter,
    Attachment,
}

impl UniqueIdCategory {
    fn index(self) -> usize {
        match self {
            Self::Track => 0,
            Self::Chapter => 1,
            Self::Attachment => 2,
        }
    }
}

/// Default-track priorities. Higher wins; equal keeps the incumbent.
pub const DEFAULT_TRACK_PRIORITY_NONE: u8 = 0;
pub const DEFAULT_TRACK_PRIORITY_FROM_TYPE: u8 = 10;
pub const DEFAULT_TRACK_PRIORITY_FROM_SOURCE: u8 = 50;
pub const DEFAULT_TRACK_PRIORITY_CMDLINE: u8 = 255;

#[derive(Debug, Clone, Copy, Default)]
struct DefaultTrackSlot {
    priority: u8,
    serialno: Option<u64>,
}

/// Shared state for one muxing run.
#[derive(Debug)]
pub struct MuxSession {
    unique_ids: Mutex<[Vec<u32>; 3]>,
    /// Hand out 1, 2, 3… instead of random IDs (reproducible output for
    /// regression testing).
    deterministic: bool,
    /// One slot per track type; buttons share the subtitle slot.
    default_tracks: Mutex<[DefaultTrackSlot; 3]>,
    next_track_number: AtomicU64,
}

impl Default for MuxSession {
    fn default() -> Self {
        Self::new()
    }
}

impl MuxSession {
    /// Session with random unique IDs (normal operation).
    pub fn new() -> Self {
        Self {
            unique_ids: Mutex::new(Default::default()),
            deterministic: false,
            default_tracks: Mutex::new(Default::default()),
            next_track_number: AtomicU64::new(1),
        }
    }

    /// Session with sequential unique IDs, for byte-identical output
    /// across runs.
    pub fn deterministic() -> Self {
        Self {
            deterministic: true,
            ..Self::new()
        }
    }

    /// Next free track number, starting at 1.
    pub fn next_track_number(&self) -> u64 {
        self.next_track_number.fetch_add(1, Ordering::Relaxed)
    }

    /// Create a new unique ID for the category: non-zero, not yet in
    /// use, and registered before being returned.
    pub fn create_unique_u32(&self, category: UniqueIdCategory) -> u32 {
        let mut ids = self.unique_ids.lock();
        let ids = &mut ids[category.index()];
        if self.deterministic {
            let id = ids.len() as u32 + 1;
            ids.push(id);
            return id;
        }
        let mut rng = rand::rng();
        loop {
            let id = rng.random::<u32>();
            if id != 0 && !ids.contains(&id) {
                ids.push(id);
                return id;
            }
        }
    }

    /// Whether the ID is still free in the category. Always true in
    /// deterministic mode, where caller-supplied IDs are ignored anyway.
    pub fn is_unique_u32(&self, id: u32, category: UniqueIdCategory) -> bool {
        if self.deterministic {
            return true;
        }
        !self.unique_ids.lock()[category.index()].contains(&id)
    }

    /// Register an externally supplied ID (from a source file's headers).
    pub fn add_unique_u32(&self, id: u32, category: UniqueIdCategory) {
        if self.deterministic {
            return;
        }
        self.unique_ids.lock()[category.index()].push(id);
    }

    /// Release an ID, e.g. when a track is dropped before muxing starts.
    pub fn remove_unique_u32(&self, id: u32, category: UniqueIdCategory) {
        self.unique_ids.lock()[category.index()].retain(|&known| known != id);
    }

    /// Forget all IDs of one category.
    pub fn clear_unique_ids(&self, category: UniqueIdCategory) {
        self.unique_ids.lock()[category.index()].clear();
    }

    /// Forget every registered ID.
    pub fn clear_all_unique_ids(&self) {
        for ids in self.unique_ids.lock().iter_mut() {
            ids.clear();
        }
    }

    /// Compete for the default-track slot of a type.
    ///
    /// The highest priority seen so far wins; on a tie the incumbent
    /// stays. Returns whether the caller now holds the slot.
    pub fn set_as_default_track(&self, track_type: TrackType, priority: u8, serialno: u64) -> bool {
        let idx = default_slot_index(track_type);
        let mut slots = self.default_tracks.lock();
        let slot = &mut slots[idx];
        if priority > slot.priority {
            slot.priority = priority;
            slot.serialno = Some(serialno);
            true
        } else {
            slot.serialno == Some(serialno)
        }
    }

    /// Whether the track currently holds the default slot for its type.
    pub fn is_default_track(&self, track_type: TrackType, serialno: u64) -> bool {
        let slots = self.default_tracks.lock();
        slots[default_slot_index(track_type)].serialno == Some(serialno)
    }

    /// Map a command-line default-track flag to a competition priority.
    pub fn default_track_priority(flag: DefaultTrackFlag) -> u8 {
        match flag {
            DefaultTrackFlag::Yes => DEFAULT_TRACK_PRIORITY_CMDLINE,
            DefaultTrackFlag::Unspecified => DEFAULT_TRACK_PRIORITY_FROM_TYPE,
            DefaultTrackFlag::No => DEFAULT_TRACK_PRIORITY_NONE,
        }
    }
}

fn default_slot_index(track_type: TrackType) -> usize {
    match track_type {
        TrackType::Video => 0,
        TrackType::Audio => 1,
        // Buttons behave like subtitles for default-track purposes.
        TrackType::Subtitle | TrackType::Buttons => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn created_ids_are_nonzero_and_registered() {
        let session = MuxSession::new();
        let id = session.create_unique_u32(UniqueIdCategory::Track);
        assert_ne!(id, 0);
        assert!(!session.is_unique_u32(id, UniqueIdCategory::Track));
        // Other categories are independent.
        assert!(session.is_unique_u32(id, UniqueIdCategory::Chapter) || id == 0);
    }

    #[test]
    fn deterministic_ids_count_up() {
        let session = MuxSession::deterministic();
        assert_eq!(session.create_unique_u32(UniqueIdCategory::Track), 1);
        assert_eq!(session.create_unique_u32(UniqueIdCategory::Track), 2);
        assert_eq!(session.create_unique_u32(UniqueIdCategory::Chapter), 1);
    }

    #[test]
    fn removed_ids_become_free_again() {
        let session = MuxSession::new();
        session.add_unique_u32(42, UniqueIdCategory::Attachment);
        assert!(!session.is_unique_u32(42, UniqueIdCategory::Attachment));
        session.remove_unique_u32(42, UniqueIdCategory::Attachment);
        assert!(session.is_unique_u32(42, UniqueIdCategory::Attachment));
    }

    #[test]
    fn clear_forgets_one_category() {
        let session = MuxSession::new();
        session.add_unique_u32(7, UniqueIdCategory::Track);
        session.add_unique_u32(7, UniqueIdCategory::Chapter);
        session.clear_unique_ids(UniqueIdCategory::Track);
        assert!(session.is_unique_u32(7, UniqueIdCategory::Track));
        assert!(!session.is_unique_u32(7, UniqueIdCategory::Chapter));
    }

    #[test]
    fn track_numbers_start_at_one() {
        let session = MuxSession::new();
        assert_eq!(session.next_track_number(), 1);
        assert_eq!(session.next_track_number(), 2);
    }

    #[test]
    fn higher_priority_takes_default_slot() {
        let session = MuxSession::new();
        assert!(session.set_as_default_track(
            TrackType::Audio,
            DEFAULT_TRACK_PRIORITY_FROM_TYPE,
            1
        ));
        assert!(session.is_default_track(TrackType::Audio, 1));

        // Command-line choice overrides the type-derived one.
        assert!(session.set_as_default_track(TrackType::Audio, DEFAULT_TRACK_PRIORITY_CMDLINE, 2));
        assert!(!session.is_default_track(TrackType::Audio, 1));
        assert!(session.is_default_track(TrackType::Audio, 2));

        // A later equal-priority bid loses to the incumbent.
        assert!(!session.set_as_default_track(
            TrackType::Audio,
            DEFAULT_TRACK_PRIORITY_CMDLINE,
            3
        ));
        assert!(session.is_default_track(TrackType::Audio, 2));
    }

    #[test]
    fn buttons_share_the_subtitle_slot() {
        let session = MuxSession::new();
        session.set_as_default_track(TrackType::Subtitle, DEFAULT_TRACK_PRIORITY_FROM_TYPE, 5);
        assert!(session.is_default_track(TrackType::Buttons, 5));
    }
}
