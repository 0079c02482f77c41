pub mod accessors;
pub mod misc;
pub mod predicates;
