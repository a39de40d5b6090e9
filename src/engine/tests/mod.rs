mod common;
mod pipeline;
mod regression;
