//! File-backed, append-only block store.
//!
//! One pretty-printed JSON file per block, named by its id. A `.sequence`
//! file records the highest number ever assigned so ids stay unique even
//! when block files are removed by hand.
//!
//! Single writer per directory is assumed. Files are opened with
//! `create_new`, so a racing writer fails over to the next number instead of
//! overwriting.

use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use super::block::{block_id, parse_block_id, Block, BlockDraft};

const SEQUENCE_FILE: &str = ".sequence";
const MAX_CREATE_ATTEMPTS: u32 = 16;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("block file {path} is not valid: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("failed to serialize block: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid block id `{0}`")]
    InvalidId(String),

    #[error("could not claim a free block number after {0} attempts")]
    Contended(u32),
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> LedgerError + '_ {
    move |source| LedgerError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Create `path` exclusively and fill it with `write`. If `write` fails the
/// file is removed, so no partial block is left behind.
fn write_new(path: &Path, write: impl FnOnce(&mut File) -> io::Result<()>) -> io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    let written = write(&mut file);
    drop(file);
    if let Err(e) = written {
        if let Err(cleanup) = fs::remove_file(path) {
            warn!(path = %path.display(), error = %cleanup, "failed to remove partial block");
        }
        return Err(e);
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct BlockLedger {
    dir: PathBuf,
}

impl BlockLedger {
    /// Open (creating if needed) the ledger directory.
    pub fn open(dir: impl Into<PathBuf>) -> LedgerResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(io_err(&dir))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, number: u64) -> PathBuf {
        self.dir.join(format!("{}.json", block_id(number)))
    }

    /// Block numbers present on disk, ascending.
    fn numbers(&self) -> LedgerResult<Vec<u64>> {
        let entries = fs::read_dir(&self.dir).map_err(io_err(&self.dir))?;
        let mut numbers = Vec::new();
        for entry in entries {
            let entry = entry.map_err(io_err(&self.dir))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(stem) = name.strip_suffix(".json") {
                if stem.starts_with("BLK-") {
                    if let Some(n) = parse_block_id(stem) {
                        numbers.push(n);
                    }
                }
            }
        }
        numbers.sort_unstable();
        Ok(numbers)
    }

    fn read_sequence(&self) -> u64 {
        let path = self.dir.join(SEQUENCE_FILE);
        match fs::read_to_string(&path) {
            Ok(text) => text.trim().parse().unwrap_or_else(|_| {
                warn!(path = %path.display(), "ignoring unreadable sequence file");
                0
            }),
            Err(_) => 0,
        }
    }

    fn write_sequence(&self, number: u64) -> LedgerResult<()> {
        let path = self.dir.join(SEQUENCE_FILE);
        fs::write(&path, number.to_string()).map_err(io_err(&path))
    }

    /// Highest block number on disk, 0 when empty.
    pub fn last_number(&self) -> LedgerResult<u64> {
        Ok(self.numbers()?.last().copied().unwrap_or(0))
    }

    /// Assign the next id, persist the block, and return it. The block is
    /// serialized before its file is created, and a file whose write fails
    /// is removed again so its number stays free.
    pub fn save(&self, draft: BlockDraft) -> LedgerResult<Block> {
        let mut number = self.last_number()?.max(self.read_sequence()) + 1;
        let mut block = Block::from_draft(number, draft);

        for _ in 0..MAX_CREATE_ATTEMPTS {
            block.id = block_id(number);
            let json = serde_json::to_string_pretty(&block)?;
            let path = self.path_for(number);

            match write_new(&path, |file| {
                file.write_all(json.as_bytes())?;
                file.sync_all()
            }) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!(number, "block number taken, trying next");
                    number += 1;
                    continue;
                }
                Err(e) => return Err(io_err(&path)(e)),
            }
            self.write_sequence(number)?;

            info!(block_id = %block.id, path = %path.display(), "block saved");
            return Ok(block);
        }
        Err(LedgerError::Contended(MAX_CREATE_ATTEMPTS))
    }

    fn read(&self, path: &Path) -> LedgerResult<Block> {
        let text = fs::read_to_string(path).map_err(io_err(path))?;
        serde_json::from_str(&text).map_err(|e| LedgerError::Corrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Load by number. `Ok(None)` if no such block exists.
    pub fn load_by_number(&self, number: u64) -> LedgerResult<Option<Block>> {
        let path = self.path_for(number);
        if !path.exists() {
            return Ok(None);
        }
        self.read(&path).map(Some)
    }

    /// Load by id (`BLK-0007` or `7`).
    pub fn load_by_id(&self, id: &str) -> LedgerResult<Option<Block>> {
        let number = parse_block_id(id).ok_or_else(|| LedgerError::InvalidId(id.to_string()))?;
        self.load_by_number(number)
    }

    /// All readable blocks in ascending id order. Unparseable files are
    /// skipped.
    pub fn list(&self) -> LedgerResult<Vec<Block>> {
        let mut blocks = Vec::new();
        for number in self.numbers()? {
            match self.read(&self.path_for(number)) {
                Ok(block) => blocks.push(block),
                Err(e) => warn!(number, error = %e, "skipping unreadable block"),
            }
        }
        Ok(blocks)
    }

    /// Best-effort load of several blocks, in the order requested. Missing
    /// or unreadable numbers are skipped.
    pub fn load_many(&self, numbers: &[u64]) -> Vec<Block> {
        numbers
            .iter()
            .filter_map(|&n| match self.load_by_number(n) {
                Ok(block) => block,
                Err(e) => {
                    warn!(number = n, error = %e, "skipping unreadable block");
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::Metrics;
    use crate::types::{Critique, Proposal, Synthesis};

    fn draft(question: &str) -> BlockDraft {
        BlockDraft {
            question: question.to_string(),
            normalized_question: question.trim().to_string(),
            proposals: vec![Proposal::new("grok-3", "answer")],
            critique: Critique::new("claude", "critique"),
            synthesis: Synthesis::new("claude", "synthesis"),
            metadata: Metrics {
                total_tokens: 10,
                total_cost_usd: 0.0,
                duration_seconds: 1.0,
                model_diversity_index: 0.0,
                dissent_score: None,
                dpr: None,
                synthesis_balance: None,
                synthesis_verification: None,
            },
            context_refs: Vec::new(),
        }
    }

    #[test]
    fn test_first_block_is_one() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = BlockLedger::open(dir.path()).unwrap();
        assert_eq!(ledger.last_number().unwrap(), 0);

        let block = ledger.save(draft("q")).unwrap();
        assert_eq!(block.id, "BLK-0001");
        assert!(dir.path().join("BLK-0001.json").exists());
        assert_eq!(ledger.last_number().unwrap(), 1);
    }

    #[test]
    fn test_deleted_newest_id_not_reused() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = BlockLedger::open(dir.path()).unwrap();
        ledger.save(draft("a")).unwrap();
        ledger.save(draft("b")).unwrap();
        fs::remove_file(dir.path().join("BLK-0002.json")).unwrap();

        let block = ledger.save(draft("c")).unwrap();
        assert_eq!(block.id, "BLK-0003");
    }

    #[test]
    fn test_load_by_id_and_number() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = BlockLedger::open(dir.path()).unwrap();
        let saved = ledger.save(draft("what?")).unwrap();

        let by_id = ledger.load_by_id("BLK-0001").unwrap().unwrap();
        let by_num = ledger.load_by_number(1).unwrap().unwrap();
        assert_eq!(by_id, saved);
        assert_eq!(by_num, saved);
        assert!(ledger.load_by_number(2).unwrap().is_none());
        assert!(matches!(
            ledger.load_by_id("../etc"),
            Err(LedgerError::InvalidId(_))
        ));
    }

    #[test]
    fn test_list_skips_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = BlockLedger::open(dir.path()).unwrap();
        ledger.save(draft("a")).unwrap();
        fs::write(dir.path().join("BLK-0002.json"), "{ not json").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();

        let blocks = ledger.list().unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].id, "BLK-0001");
    }

    #[test]
    fn test_context_refs_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = BlockLedger::open(dir.path()).unwrap();
        let mut d = draft("follow-up");
        d.context_refs = vec!["BLK-0001".to_string()];
        let block = ledger.save(d).unwrap();
        let loaded = ledger.load_by_id(&block.id).unwrap().unwrap();
        assert_eq!(loaded.context_refs, Some(vec!["BLK-0001".to_string()]));
    }

    #[test]
    fn test_failed_write_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("BLK-0001.json");

        let err = write_new(&path, |file| {
            file.write_all(b"{ \"id\": ")?;
            Err(io::Error::new(ErrorKind::Other, "no space left on device"))
        })
        .unwrap_err();

        assert_eq!(err.to_string(), "no space left on device");
        assert!(!path.exists());

        let ledger = BlockLedger::open(dir.path()).unwrap();
        assert_eq!(ledger.save(draft("retry")).unwrap().id, "BLK-0001");
    }

    #[test]
    fn test_existing_file_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("BLK-0001.json");
        fs::write(&path, "taken").unwrap();

        let err = write_new(&path, |file| file.write_all(b"new")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(fs::read_to_string(&path).unwrap(), "taken");
    }
}
