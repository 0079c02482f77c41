pub use crate::{block_graph::BlockGraph, error::Error};

mod block_graph;
mod error;
