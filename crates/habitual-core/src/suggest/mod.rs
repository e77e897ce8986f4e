//! Time-slot suggestion engine.
//!
//! - [`score`]: scores one slot against preferences and existing events
//! - [`generator`]: builds the day's candidates and ranks them

pub mod generator;
pub mod score;

pub use generator::{
    candidate_slots, rank_slots, slot_start_utc, CandidateSlot, SlotSuggester, SuggestConfig,
};
pub use score::{evaluate, SlotScore, TimeSlot};
