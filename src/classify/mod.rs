pub mod classifier;
pub mod domain;

pub use classifier::DomainClassifier;
pub use domain::Domain;
