//! # Extendible Hash Index
//!
//! A disk-resident extendible hash table: a persistent map from fixed-size
//! keys to fixed-size values, stored as a tree of three page kinds managed
//! through the buffer pool.
//!
//! ## Structure
//!
//! ```text
//!                 ┌────────────────┐
//!                 │  Header page   │  high hash bits → directory id
//!                 └───────┬────────┘
//!            ┌────────────┼────────────┐
//!     ┌──────┴─────┐            ┌──────┴─────┐
//!     │ Directory  │            │ Directory  │  low bits → bucket id,
//!     └──┬───┬───┬─┘            └────┬───┬───┘  global/local depths
//!        │   │   │                   │   │
//!      ┌─┴─┐┌┴──┐┌┴──┐            ┌──┴┐┌─┴─┐
//!      │ B ││ B ││ B │            │ B ││ B │    compact (K, V) arrays
//!      └───┘└───┘└───┘            └───┘└───┘
//! ```
//!
//! The table grows by bucket splitting with local-depth doubling and
//! shrinks by local merging; unrelated buckets are never rewritten.
//!
//! ## Module Organization
//!
//! - [`keys`]: entry capability set, injected comparator and hasher
//! - `header_page`: top-level fanout page
//! - `directory_page`: depth state machine
//! - `bucket_page`: in-page entry array
//! - `table`: the driver (navigation, split, merge, integrity checks)

pub mod keys;

mod bucket_page;
mod directory_page;
mod header_page;
mod table;

pub use bucket_page::{
    bucket_array_capacity, entry_size, HashTableBucketPage, HashTableBucketPageMut,
    BUCKET_CONTENT_START, BUCKET_HEADER_SIZE,
};
pub use directory_page::HashTableDirectoryPage;
pub use header_page::HashTableHeaderPage;
pub use keys::{
    DefaultComparator, EntryData, IdentityKeyHasher, KeyComparator, KeyHasher, Xxh3KeyHasher,
};
pub use table::ExtendibleHashTable;
