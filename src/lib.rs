pub mod batch_plan;
pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod model;
pub mod pipeline;
pub mod render;
pub mod response;
pub mod store;
pub mod util;
pub mod writer;
