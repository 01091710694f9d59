//! Listing sources for game search responses.
//!
//! The server does not host lobbies yet, so searches are answered from a
//! static listing. Anything implementing [`ListingSource`] can replace it.

use protocol::{GameCode, GameListing, ListingSource, SearchCriteria};

/// Answers every search with the same listing.
#[derive(Debug, Clone)]
pub struct PlaceholderListing {
    listing: GameListing,
}

impl PlaceholderListing {
    pub fn new(listing: GameListing) -> Self {
        Self { listing }
    }
}

impl Default for PlaceholderListing {
    fn default() -> Self {
        Self::new(GameListing {
            game_id: GameCode::from_bytes([0xf9, 0x51, 0x13, 0x80]),
            name: "Fake Game".to_string(),
            imposters: 3,
            occupancy: [0x01, 0x02, 0x08],
        })
    }
}

impl ListingSource for PlaceholderListing {
    fn find_game(&self, _criteria: &SearchCriteria) -> Option<GameListing> {
        Some(self.listing.clone())
    }
}

/// Never finds a game; searches get an empty response.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoListings;

impl ListingSource for NoListings {
    fn find_game(&self, _criteria: &SearchCriteria) -> Option<GameListing> {
        None
    }
}
