//! Dependency injection: wires concrete implementations into services

mod service_container;

pub use service_container::ServiceContainer;
