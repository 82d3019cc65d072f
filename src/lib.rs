pub mod config;
pub mod error;
pub mod db;
pub mod model;
pub mod graph;
pub mod store;
pub mod serialize;

pub use config::Config;
pub use error::{ReviewgraphError, Result};
pub use graph::{EntityGraph, Record, Related};
pub use model::{Customer, Entity, EntityKind, Item, Review};
pub use serialize::Serializer;
