//! Store Module
//!
//! In-memory key/value map served to clients.
//!
//! ## Responsibilities
//! - Fast reads and writes in memory
//! - Many concurrent readers, one exclusive writer
//! - Last-writer-wins on repeated puts, idempotent deletes
//!
//! The store has no durability of its own. Everything it holds is either
//! rebuilt from the transaction log at startup or recorded there by the
//! service after the mutation lands.

mod table;

pub use table::Store;
