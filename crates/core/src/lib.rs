//! Domain models, shared types, and error definitions.
//!
//! Foundation crate -- no async or I/O dependencies.

pub mod error;
pub mod types;

pub use error::{ScryError, ScryResult};
pub use types::{
    BlockSummary, Cache, ChainBlock, ChainTx, GraphEdge, GraphNode, NetworkGraph, ReceiptInfo,
    ScanOutcome, ScanProgress, ScannedBlock, SyncReport, SyncState, TokenRecord, TxLookup,
    TxSummary,
};
