mod batching;
mod shuffling;

pub use batching::{Batcher, Batching};
pub use shuffling::{Shuffler, Shuffling};
