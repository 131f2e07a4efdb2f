//! Domain Layer
//!
//! Entities, value objects, pure services, and the ports (traits) through
//! which the application layer reaches external collaborators.

pub mod entities;
pub mod ports;
pub mod services;
pub mod value_objects;
