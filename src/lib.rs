pub mod api;
pub mod clients;
pub mod composer;
pub mod config;
pub mod dispatcher;
pub mod emitter;
pub mod error;
pub mod models;
pub mod utils;
pub mod worker;
