use std::collections::{HashSet, VecDeque};

use crate::api::Listing;

/// FIFO backlog of discovered listings.
///
/// Tracks queued token ids separately from the known set so a listing that
/// is still waiting is not appended again by the next refill.
#[derive(Debug, Default)]
pub struct PendingQueue {
    items: VecDeque<Listing>,
    in_flight: HashSet<String>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends every listing of `snapshot` that is neither known nor already
    /// queued, in snapshot order. Returns how many were added.
    pub fn enqueue_new(&mut self, snapshot: Vec<Listing>, known: &HashSet<String>) -> usize {
        let mut added = 0;

        for listing in snapshot {
            if known.contains(&listing.token_id) || self.in_flight.contains(&listing.token_id) {
                continue;
            }

            self.in_flight.insert(listing.token_id.clone());
            self.items.push_back(listing);
            added += 1;
        }

        added
    }

    /// Removes the oldest listing. It becomes eligible for enqueueing again.
    pub fn pop_front(&mut self) -> Option<Listing> {
        let listing = self.items.pop_front()?;
        self.in_flight.remove(&listing.token_id);
        Some(listing)
    }

    pub fn contains(&self, token_id: &str) -> bool {
        self.in_flight.contains(token_id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
