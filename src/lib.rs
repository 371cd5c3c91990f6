//! Core library for the depth-monitor project.
//!
//! A feed source streams book events into the reconciler, which keeps the
//! shared [`book::BookStore`] current. The render loop copies the store on a
//! timer, aggregates it into price buckets and draws the depth chart.

pub mod aggregator;
pub mod book;
pub mod config;
pub mod display;
pub mod errors;
pub mod feed;
pub mod models;
pub mod status;
pub mod utils;
