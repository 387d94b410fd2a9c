pub mod collector;
pub mod transactor;

pub use collector::{
    CollectionResult, CollectionStatus, Collector, CollectorOptions, DestinationAccount,
    SourceAccount,
};
pub use transactor::{Transactor, TxParams};
