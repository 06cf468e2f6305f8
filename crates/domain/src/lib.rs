//! Domain entities, state machines, and the submit gate for Asset Depot

pub mod entities;
pub mod gate;
pub mod state;
