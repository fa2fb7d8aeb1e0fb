pub mod inventory_sync;
pub mod sequencer;
pub mod settlement;
