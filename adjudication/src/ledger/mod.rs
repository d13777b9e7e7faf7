//! Append-only block ledger.
//!
//! Blocks are never updated or deleted through this API. A correction is a
//! new block whose `context_refs` point at the blocks it builds on.

mod block;
mod context;
mod store;

pub use block::{block_id, parse_block_id, Block, BlockDraft, BLOCK_VERSION};
pub use context::{render_context, ContextSelector};
pub use store::{BlockLedger, LedgerError, LedgerResult};
