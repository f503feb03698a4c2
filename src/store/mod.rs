pub mod guidance;
pub mod memory;
pub mod sqlite;

pub use self::guidance::StaticGuidance;
pub use self::memory::MemoryStore;
pub use self::sqlite::SqliteStore;
