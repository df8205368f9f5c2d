pub mod market;
pub mod posting;
