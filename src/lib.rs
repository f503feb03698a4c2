pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod init;
pub mod logger;
pub mod monitor;
pub mod recovery;
pub mod shield;
pub mod stats;
pub mod store;

pub use crate::error::{ActivityError, DetectionErrorKind, StoreError};
pub use crate::recovery::{RecoveryAction, RecoveryCoordinator};
pub use crate::shield::ContentShield;
