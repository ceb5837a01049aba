mod backend;
mod client;
mod stores;

pub(crate) use backend::handlers;
pub use client::{MsGraphClient, MsGraphClientBuilder};
