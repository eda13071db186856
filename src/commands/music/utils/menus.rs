use std::ops::Range;

use crate::commands::music::audio_sources::Track;

/// Discord caps both embed fields and select options at 25.
pub const MAX_PAGE_SIZE: usize = 25;

/// What a paginated message lists.
#[derive(Debug, Clone, PartialEq)]
pub enum MenuKind {
    Search { query: String },
    /// The queue as it was when the menu was sent, with the current track's remaining time.
    Queue { remaining_secs: u64 },
}

/// Page buttons, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageAction {
    First,
    Prev,
    Middle,
    Next,
    Last,
}

impl PageAction {
    pub const ALL: [PageAction; 5] = [
        PageAction::First,
        PageAction::Prev,
        PageAction::Middle,
        PageAction::Next,
        PageAction::Last,
    ];

    pub fn custom_id(self) -> &'static str {
        match self {
            PageAction::First => "music_page_first",
            PageAction::Prev => "music_page_prev",
            PageAction::Middle => "music_page_middle",
            PageAction::Next => "music_page_next",
            PageAction::Last => "music_page_last",
        }
    }

    pub fn from_custom_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.custom_id() == id)
    }
}

/// A list of tracks shown `page_size` at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct PagedMenu {
    pub kind: MenuKind,
    tracks: Vec<Track>,
    page: usize,
    page_size: usize,
}

impl PagedMenu {
    pub fn new(kind: MenuKind, tracks: Vec<Track>, page_size: usize) -> Self {
        Self {
            kind,
            tracks,
            page: 0,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn page(&self) -> usize {
        self.page
    }

    /// Never less than one, so an empty list still renders a page.
    pub fn page_count(&self) -> usize {
        self.tracks.len().div_ceil(self.page_size).max(1)
    }

    pub fn last_page(&self) -> usize {
        self.page_count() - 1
    }

    pub fn middle_page(&self) -> usize {
        self.page_count() / 2
    }

    /// The middle button only shows with more than two pages.
    pub fn has_middle(&self) -> bool {
        self.page_count() > 2
    }

    /// Whether the button for `action` should be disabled on the current page.
    pub fn is_disabled(&self, action: PageAction) -> bool {
        match action {
            PageAction::First | PageAction::Prev => self.page == 0,
            PageAction::Middle => self.page == self.middle_page(),
            PageAction::Next | PageAction::Last => self.page == self.last_page(),
        }
    }

    pub fn apply(&mut self, action: PageAction) {
        self.page = match action {
            PageAction::First => 0,
            PageAction::Prev => self.page.saturating_sub(1),
            PageAction::Middle => self.middle_page(),
            PageAction::Next => (self.page + 1).min(self.last_page()),
            PageAction::Last => self.last_page(),
        };
    }

    /// Indices of the tracks on the current page.
    pub fn page_range(&self) -> Range<usize> {
        let start = (self.page * self.page_size).min(self.tracks.len());
        let end = (start + self.page_size).min(self.tracks.len());
        start..end
    }

    pub fn page_tracks(&self) -> &[Track] {
        &self.tracks[self.page_range()]
    }

    pub fn track(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    /// Seconds until entry `index` plays, for queue menus.
    pub fn time_until(&self, index: usize) -> Option<u64> {
        match self.kind {
            MenuKind::Queue { remaining_secs } => Some(
                remaining_secs
                    + self
                        .tracks
                        .iter()
                        .take(index)
                        .map(|track| track.duration_secs)
                        .sum::<u64>(),
            ),
            MenuKind::Search { .. } => None,
        }
    }
}
