// External I/O operations module
pub mod control; // Unix socket control channel
pub mod lock; // Single-instance lock file
pub mod signals; // Unix signal handling and the engine message channel
