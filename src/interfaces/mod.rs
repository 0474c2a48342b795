//! Edges of the crate that read and render plain data: the CSV reward
//! catalog and the JSON lines the command-line driver prints.

pub mod csv;
pub mod output;
