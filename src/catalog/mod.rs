pub mod popularity;
pub mod search;
