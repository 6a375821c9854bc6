pub mod backend;
pub mod cache;
pub mod classify;
pub mod config;
pub mod error;
pub mod events;
pub mod flow;
pub mod gate;
pub mod redirect;
pub mod scheduler;
pub mod trial;
pub mod types;

#[cfg(test)]
pub mod testing;
