mod derangement;

pub use derangement::{draw, DrawError};
