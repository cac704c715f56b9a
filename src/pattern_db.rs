use crate::board::{ALL_DIRECTIONS, BLANK, Board, neighbor_cell};
use crate::error::PuzzleError;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::PathBuf;

/// Stand-in for every non-blank label outside the tracked subset.
pub const WILDCARD: u8 = u8::MAX;

/// Default cap on the number of recorded signatures.
pub const DEFAULT_MAX_ENTRIES: usize = 1_000_000;

/// A board reduced to the tracked tiles: untracked labels become
/// [`WILDCARD`], the blank stays 0.
pub type Signature = Box<[u8]>;

/// Settings for building or loading a pattern database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdbConfig {
    pub tiles: Vec<u8>,
    pub max_entries: usize,
    /// Directory for cached databases. `None` disables the cache.
    pub cache_dir: Option<PathBuf>,
}

impl Default for PdbConfig {
    fn default() -> Self {
        PdbConfig {
            tiles: vec![1, 2, 3, 4],
            max_entries: DEFAULT_MAX_ENTRIES,
            cache_dir: None,
        }
    }
}

impl PdbConfig {
    pub fn storage_key(&self, size: usize) -> String {
        storage_key(size, &self.tiles)
    }
}

/// Key under which the database for (size, tiles) is stored.
pub fn storage_key(size: usize, tiles: &[u8]) -> String {
    let tiles: Vec<String> = normalize_tiles(tiles).iter().map(|t| t.to_string()).collect();
    format!("pdb_{}_{}.json", size, tiles.join("_"))
}

fn normalize_tiles(tiles: &[u8]) -> Vec<u8> {
    let mut tiles = tiles.to_vec();
    tiles.sort_unstable();
    tiles.dedup();
    tiles
}

/// Exact move counts for the relaxed puzzle that only tracks a subset of tiles.
///
/// The table is built once by breadth-first expansion from the goal and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternDatabase {
    size: usize,
    tiles: Vec<u8>,
    max_entries: usize,
    capped: bool,
    tracked: Vec<bool>,
    costs: FxHashMap<Signature, u16>,
}

impl PatternDatabase {
    /// Breadth-first expansion from the goal over masked boards.
    ///
    /// Each signature keeps the cost of its first discovery, which is minimal
    /// in breadth-first order. Expansion stops once `max_entries` signatures
    /// are recorded.
    pub fn build(size: usize, tiles: &[u8], max_entries: usize) -> Result<Self, PuzzleError> {
        let goal = Board::goal(size)?;
        let tiles = normalize_tiles(tiles);
        let tracked = tracked_labels(size, &tiles)?;

        let mut costs: FxHashMap<Signature, u16> = FxHashMap::default();
        let mut queue = VecDeque::new();

        let start = mask_cells(goal.cells(), &tracked);
        let start_blank = goal.cells().len() - 1;
        let mut capped = max_entries == 0;
        if !capped {
            costs.insert(start.clone(), 0);
            queue.push_back((start, start_blank, 0u16));
        }

        'expand: while let Some((cells, blank, cost)) = queue.pop_front() {
            let (row, col) = (blank / size, blank % size);
            for dir in ALL_DIRECTIONS {
                let Some((new_row, new_col)) = neighbor_cell(size, row, col, dir) else {
                    continue;
                };
                let new_blank = new_row * size + new_col;
                let mut next = cells.clone();
                next.swap(blank, new_blank);

                if costs.contains_key(&next) {
                    continue;
                }
                if costs.len() >= max_entries {
                    capped = true;
                    break 'expand;
                }
                costs.insert(next.clone(), cost + 1);
                queue.push_back((next, new_blank, cost + 1));
            }
        }

        Ok(PatternDatabase {
            size,
            tiles,
            max_entries,
            capped,
            tracked,
            costs,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Tracked labels, sorted.
    pub fn tiles(&self) -> &[u8] {
        &self.tiles
    }

    pub fn len(&self) -> usize {
        self.costs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.costs.is_empty()
    }

    /// True when expansion stopped at the entry cap with signatures left
    /// unrecorded.
    pub fn is_capped(&self) -> bool {
        self.capped
    }

    pub fn signature(&self, board: &Board) -> Signature {
        mask_cells(board.cells(), &self.tracked)
    }

    /// Recorded cost for a signature, if any.
    pub fn get(&self, signature: &[u8]) -> Option<u16> {
        self.costs.get(signature).copied()
    }

    /// Cost to place the tracked tiles, or 0 if the signature was never recorded.
    pub fn lookup(&self, board: &Board) -> u16 {
        self.get(&self.signature(board)).unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], u16)> {
        self.costs.iter().map(|(sig, &cost)| (&sig[..], cost))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, PuzzleError> {
        let mut entries: Vec<(Vec<u8>, u16)> =
            self.iter().map(|(sig, cost)| (sig.to_vec(), cost)).collect();
        entries.sort_unstable();

        let blob = PatternDatabaseBlob {
            size: self.size,
            tiles: self.tiles.clone(),
            max_entries: self.max_entries,
            capped: self.capped,
            entries,
        };
        Ok(serde_json::to_vec(&blob)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PuzzleError> {
        let blob: PatternDatabaseBlob = serde_json::from_slice(bytes)?;
        // Validates the size range.
        Board::goal(blob.size)?;
        let tiles = normalize_tiles(&blob.tiles);
        let tracked = tracked_labels(blob.size, &tiles)?;

        let cell_count = blob.size * blob.size;
        let mut costs = FxHashMap::default();
        for (sig, cost) in blob.entries {
            if sig.len() != cell_count {
                return Err(PuzzleError::PatternDatabaseMismatch(format!(
                    "signature of length {} in a database for {}x{} boards",
                    sig.len(),
                    blob.size,
                    blob.size
                )));
            }
            costs.insert(sig.into_boxed_slice(), cost);
        }

        Ok(PatternDatabase {
            size: blob.size,
            tiles,
            max_entries: blob.max_entries,
            capped: blob.capped,
            tracked,
            costs,
        })
    }
}

#[derive(Serialize, Deserialize)]
struct PatternDatabaseBlob {
    size: usize,
    tiles: Vec<u8>,
    max_entries: usize,
    #[serde(default)]
    capped: bool,
    entries: Vec<(Vec<u8>, u16)>,
}

fn tracked_labels(size: usize, tiles: &[u8]) -> Result<Vec<bool>, PuzzleError> {
    let count = size * size;
    if tiles.is_empty() {
        return Err(PuzzleError::PatternDatabaseMismatch(
            "no tiles to track".to_string(),
        ));
    }

    let mut tracked = vec![false; count];
    for &tile in tiles {
        if tile == BLANK || tile as usize >= count {
            return Err(PuzzleError::PatternDatabaseMismatch(format!(
                "tile {} is not a tile label of a {}x{} board",
                tile, size, size
            )));
        }
        tracked[tile as usize] = true;
    }
    Ok(tracked)
}

fn mask_cells(cells: &[u8], tracked: &[bool]) -> Signature {
    cells
        .iter()
        .map(|&label| {
            if label == BLANK || tracked[label as usize] {
                label
            } else {
                WILDCARD
            }
        })
        .collect()
}

/// Keyed storage for serialized pattern databases.
pub trait BlobStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, PuzzleError>;

    fn write(&mut self, key: &str, bytes: &[u8]) -> Result<(), PuzzleError>;
}

/// One file per key under a directory.
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirStore { root: root.into() }
    }

    pub fn path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

impl BlobStore for DirStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, PuzzleError> {
        match fs::read(self.path(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&mut self, key: &str, bytes: &[u8]) -> Result<(), PuzzleError> {
        fs::create_dir_all(&self.root)?;
        // Readers only ever see a complete blob.
        let partial = self.root.join(format!("{}.partial", key));
        fs::write(&partial, bytes)?;
        fs::rename(&partial, self.path(key))?;
        Ok(())
    }
}

/// In-process store, used when no cache directory is configured.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: FxHashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.blobs.contains_key(key)
    }
}

impl BlobStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, PuzzleError> {
        Ok(self.blobs.get(key).cloned())
    }

    fn write(&mut self, key: &str, bytes: &[u8]) -> Result<(), PuzzleError> {
        self.blobs.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}

/// Where a database returned by [`build_or_load`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Loaded,
    Built,
}

/// Read the database stored under `key`, or build it and store it there.
///
/// A stored database for a different board size or tile subset is rejected
/// rather than silently rebuilt.
pub fn build_or_load<S: BlobStore>(
    store: &mut S,
    size: usize,
    tiles: &[u8],
    max_entries: usize,
    key: &str,
) -> Result<(PatternDatabase, Origin), PuzzleError> {
    if let Some(bytes) = store.read(key)? {
        let pdb = PatternDatabase::from_bytes(&bytes)?;
        let wanted = normalize_tiles(tiles);
        if pdb.size() != size || pdb.tiles() != wanted.as_slice() {
            return Err(PuzzleError::PatternDatabaseMismatch(format!(
                "'{}' holds tiles {:?} for size {}, requested tiles {:?} for size {}",
                key,
                pdb.tiles(),
                pdb.size(),
                wanted,
                size
            )));
        }
        return Ok((pdb, Origin::Loaded));
    }

    let pdb = PatternDatabase::build(size, tiles, max_entries)?;
    store.write(key, &pdb.to_bytes()?)?;
    Ok((pdb, Origin::Built))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Direction;

    fn exact_distances(size: usize) -> FxHashMap<Board, u16> {
        let goal = Board::goal(size).unwrap();
        let mut dist = FxHashMap::default();
        let mut queue = VecDeque::new();
        dist.insert(goal.clone(), 0);
        queue.push_back(goal);
        while let Some(board) = queue.pop_front() {
            let d = dist[&board];
            for dir in board.legal_moves().unwrap() {
                let next = board.apply_move(dir).unwrap();
                if !dist.contains_key(&next) {
                    dist.insert(next.clone(), d + 1);
                    queue.push_back(next);
                }
            }
        }
        dist
    }

    #[test]
    fn test_goal_costs_zero() {
        let pdb = PatternDatabase::build(4, &[1, 2, 3, 4], 1000).unwrap();
        assert_eq!(pdb.lookup(&Board::goal(4).unwrap()), 0);
    }

    #[test]
    fn test_signature_masks_untracked_tiles() {
        let pdb = PatternDatabase::build(3, &[2, 1], 10).unwrap();
        assert_eq!(pdb.tiles(), &[1, 2]);
        let board = Board::from_text("1 2 3\n4 0 6\n7 5 8").unwrap();
        let w = WILDCARD;
        assert_eq!(&pdb.signature(&board)[..], &[1, 2, w, w, 0, w, w, w, w]);
    }

    #[test]
    fn test_blank_moves_count() {
        // Moving the blank past untracked tiles still costs moves.
        let pdb = PatternDatabase::build(3, &[1, 2], 100_000).unwrap();
        let up = Board::goal(3).unwrap().apply_move(Direction::Up).unwrap();
        assert_eq!(pdb.lookup(&up), 1);
        let up_left = up.apply_move(Direction::Left).unwrap();
        assert_eq!(pdb.lookup(&up_left), 2);
    }

    #[test]
    fn test_all_tiles_tracked_is_exact() {
        let exact = exact_distances(2);
        let pdb = PatternDatabase::build(2, &[1, 2, 3], 1000).unwrap();
        assert_eq!(pdb.len(), exact.len());
        for (board, &d) in &exact {
            assert_eq!(pdb.lookup(board), d, "board:\n{}", board);
        }
    }

    #[test]
    fn test_subset_costs_are_lower_bounds() {
        let exact = exact_distances(3);
        let pdb = PatternDatabase::build(3, &[1, 2, 3, 4], DEFAULT_MAX_ENTRIES).unwrap();
        assert!(!pdb.is_capped());
        // Placements of four tiles and the blank: 9! / 4!.
        assert_eq!(pdb.len(), 15120);
        for (board, &d) in &exact {
            assert!(pdb.lookup(board) <= d);
        }
    }

    #[test]
    fn test_cap_equal_to_state_count_is_not_capped() {
        // The 2x2 puzzle has 12 reachable boards.
        let full = PatternDatabase::build(2, &[1, 2, 3], 12).unwrap();
        assert_eq!(full.len(), 12);
        assert!(!full.is_capped());

        let short = PatternDatabase::build(2, &[1, 2, 3], 11).unwrap();
        assert_eq!(short.len(), 11);
        assert!(short.is_capped());
    }

    #[test]
    fn test_cap_limits_entries() {
        let pdb = PatternDatabase::build(4, &[1, 2, 3, 4], 500).unwrap();
        assert_eq!(pdb.len(), 500);
        assert!(pdb.is_capped());

        let empty = PatternDatabase::build(3, &[1], 0).unwrap();
        assert!(empty.is_empty());
        assert!(empty.is_capped());
        assert_eq!(empty.lookup(&Board::goal(3).unwrap()), 0);
    }

    #[test]
    fn test_absent_signature_is_zero() {
        let pdb = PatternDatabase::build(4, &[1, 2, 3, 4], 50).unwrap();
        let far = Board::from_text("4 3 2 1\n5 6 7 8\n9 10 11 12\n13 14 15 0").unwrap();
        assert_eq!(pdb.get(&pdb.signature(&far)), None);
        assert_eq!(pdb.lookup(&far), 0);
    }

    #[test]
    fn test_invalid_tiles() {
        assert!(matches!(
            PatternDatabase::build(3, &[], 10),
            Err(PuzzleError::PatternDatabaseMismatch(_))
        ));
        assert!(matches!(
            PatternDatabase::build(3, &[0, 1], 10),
            Err(PuzzleError::PatternDatabaseMismatch(_))
        ));
        assert!(matches!(
            PatternDatabase::build(3, &[9], 10),
            Err(PuzzleError::PatternDatabaseMismatch(_))
        ));
    }

    #[test]
    fn test_serialization_round_trip() {
        let pdb = PatternDatabase::build(4, &[1, 2, 3, 4], 5000).unwrap();
        let restored = PatternDatabase::from_bytes(&pdb.to_bytes().unwrap()).unwrap();
        assert_eq!(restored.size(), 4);
        assert_eq!(restored.tiles(), &[1, 2, 3, 4]);
        assert_eq!(restored.len(), pdb.len());
        for (sig, cost) in pdb.iter() {
            assert_eq!(restored.get(sig), Some(cost));
        }
        assert_eq!(restored, pdb);
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        assert!(matches!(
            PatternDatabase::from_bytes(b"not json"),
            Err(PuzzleError::Codec(_))
        ));
        let short = br#"{"size":3,"tiles":[1],"max_entries":1,"entries":[[[1,0],0]]}"#;
        assert!(matches!(
            PatternDatabase::from_bytes(short),
            Err(PuzzleError::PatternDatabaseMismatch(_))
        ));
    }

    #[test]
    fn test_storage_key() {
        assert_eq!(storage_key(4, &[4, 2, 3, 1]), "pdb_4_1_2_3_4.json");
        let config = PdbConfig::default();
        assert_eq!(config.storage_key(4), "pdb_4_1_2_3_4.json");
    }

    #[test]
    fn test_build_or_load_memory() {
        let mut store = MemoryStore::new();
        let key = storage_key(3, &[1, 2]);

        let (built, origin) = build_or_load(&mut store, 3, &[1, 2], 1000, &key).unwrap();
        assert_eq!(origin, Origin::Built);
        assert!(store.contains(&key));

        let (loaded, origin) = build_or_load(&mut store, 3, &[2, 1], 1000, &key).unwrap();
        assert_eq!(origin, Origin::Loaded);
        assert_eq!(loaded, built);

        let result = build_or_load(&mut store, 3, &[1, 2, 3], 1000, &key);
        assert!(matches!(result, Err(PuzzleError::PatternDatabaseMismatch(_))));
    }

    #[test]
    fn test_build_or_load_dir() {
        let dir = std::env::temp_dir().join(format!("npuzzle-pdb-{}", std::process::id()));
        let mut store = DirStore::new(&dir);
        let key = storage_key(3, &[1, 2, 3]);

        let (built, origin) = build_or_load(&mut store, 3, &[1, 2, 3], 2000, &key).unwrap();
        assert_eq!(origin, Origin::Built);
        assert!(store.path(&key).exists());

        let mut fresh = DirStore::new(&dir);
        assert!(fresh.read("missing.json").unwrap().is_none());
        let (loaded, origin) = build_or_load(&mut fresh, 3, &[1, 2, 3], 2000, &key).unwrap();
        assert_eq!(origin, Origin::Loaded);
        assert_eq!(loaded, built);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_dir_store_replaces_blob() {
        let dir = std::env::temp_dir().join(format!("npuzzle-blob-{}", std::process::id()));
        let mut store = DirStore::new(&dir);

        store.write("blob.json", b"first").unwrap();
        store.write("blob.json", b"second").unwrap();
        assert_eq!(store.read("blob.json").unwrap().as_deref(), Some(&b"second"[..]));

        let names: Vec<String> = fs::read_dir(&dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["blob.json"]);

        fs::remove_dir_all(&dir).unwrap();
    }
}
