/// Per-URL lifecycle states tracked by the crawl coordinator
use std::fmt;

/// Represents where a frontier entry is in its lifecycle
///
/// `Pending -> InFlight -> {VisitedMatched, VisitedUnmatched, VisitedError}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryState {
    /// Admitted to the frontier, waiting to be dispatched
    Pending,

    /// A fetch task is running for this URL
    InFlight,

    /// Fetched, extracted, and at least one keyword matched
    VisitedMatched,

    /// Fetched and extracted, but no keyword matched
    VisitedUnmatched,

    /// Fetch or extraction failed
    VisitedError,
}

impl EntryState {
    /// Returns true if no further transition is allowed
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::VisitedMatched | Self::VisitedUnmatched | Self::VisitedError
        )
    }

    /// Checks whether moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: EntryState) -> bool {
        match (self, next) {
            (Self::Pending, Self::InFlight) => true,
            (Self::InFlight, n) => n.is_terminal(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InFlight => "in_flight",
            Self::VisitedMatched => "visited_matched",
            Self::VisitedUnmatched => "visited_unmatched",
            Self::VisitedError => "visited_error",
        }
    }
}

impl fmt::Display for EntryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
