use clap::{Parser, ValueEnum};
use npuzzle::pattern_db::DEFAULT_MAX_ENTRIES;
use npuzzle::scramble::{scramble, seeded_rng};
use npuzzle::{
    Board, BlobStore, DirStore, Direction, HeuristicKind, MemoryStore, Origin, PatternDatabase,
    PdbConfig, PuzzleError, PuzzleSet, Solution, SolveResult, Solver, SolverConfig, Tracer,
    build_or_load_pattern_database,
};
use rustc_hash::FxHashMap;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum HeuristicType {
    Manhattan,
    LinearConflict,
    Misplaced,
    Euclidean,
    Pdb,
}

impl From<HeuristicType> for HeuristicKind {
    fn from(heuristic: HeuristicType) -> Self {
        match heuristic {
            HeuristicType::Manhattan => HeuristicKind::Manhattan,
            HeuristicType::LinearConflict => HeuristicKind::LinearConflict,
            HeuristicType::Misplaced => HeuristicKind::Misplaced,
            HeuristicType::Euclidean => HeuristicKind::Euclidean,
            HeuristicType::Pdb => HeuristicKind::PatternDatabase,
        }
    }
}

fn print_solution(solution: &Solution) {
    println!("\nStarting position:\n{}", solution.start());
    let total = solution.cost();
    for (count, (direction, board)) in solution.steps().enumerate() {
        println!("Move blank {} ({}/{}):\n{}", direction, count + 1, total, board);
    }
}

struct VerboseTracer {
    trace_start: u64,
    trace_end: u64,
}

impl VerboseTracer {
    fn new(from_node: u64, to_node: u64) -> Self {
        Self {
            trace_start: from_node,
            trace_end: to_node,
        }
    }
}

impl Tracer for VerboseTracer {
    fn trace(
        &self,
        board: &Board,
        nodes_visited: u64,
        threshold: u32,
        f_cost: u32,
        g_cost: u32,
        direction: Option<Direction>,
    ) {
        if self.trace_start <= nodes_visited && nodes_visited <= self.trace_end {
            let direction = direction.map_or("-".to_string(), |dir| dir.to_string());
            println!(
                "move={}, count={}, f_cost={}, g_cost={}, threshold={}:\n{}",
                direction, nodes_visited, f_cost, g_cost, threshold, board
            );
        }
    }
}

struct RunStats {
    solved: bool,
    steps: usize,
    nodes_visited: u64,
    elapsed_ms: u128,
}

struct SolveOpts {
    puzzle_num: usize,
    heuristic: HeuristicKind,
    max_nodes: Option<u64>,
    print_solution: bool,
    trace_range: Option<(u64, u64)>,
}

fn solve_puzzle(
    board: &Board,
    opts: &SolveOpts,
    pdb: Option<&PatternDatabase>,
) -> Result<RunStats, PuzzleError> {
    let config = SolverConfig {
        heuristic: opts.heuristic,
        max_nodes: opts.max_nodes,
    };

    let start = Instant::now();
    let (result, nodes_visited) = match opts.trace_range {
        Some((trace_start, trace_end)) => {
            let tracer = VerboseTracer::new(trace_start, trace_end);
            let mut solver = Solver::with_tracer(config, board.size(), pdb, tracer)?;
            (solver.solve(board)?, solver.nodes_visited())
        }
        None => {
            let mut solver = Solver::new(config, board.size(), pdb)?;
            (solver.solve(board)?, solver.nodes_visited())
        }
    };
    let elapsed_ms = start.elapsed().as_millis();

    let (solved_char, steps, solved) = match &result {
        SolveResult::Solved(solution) => ('Y', solution.cost(), true),
        SolveResult::Cutoff => ('N', 0, false),
        SolveResult::Unsolvable | SolveResult::Exhausted => ('X', 0, false),
    };

    println!(
        "puzzle: {:<3}  heuristic: {:<15}  solved: {}  steps: {:<4}  nodes: {:<12}  elapsed: {} ms",
        opts.puzzle_num, opts.heuristic, solved_char, steps, nodes_visited, elapsed_ms
    );

    if opts.print_solution {
        match &result {
            SolveResult::Solved(solution) => print_solution(solution),
            SolveResult::Unsolvable => println!("No solution exists for this puzzle."),
            _ => {}
        }
    }

    Ok(RunStats {
        solved,
        steps,
        nodes_visited,
        elapsed_ms,
    })
}

/// Pattern databases by board size, read from or written to the cache.
struct PdbCache {
    config: PdbConfig,
    memory: MemoryStore,
    databases: FxHashMap<usize, PatternDatabase>,
}

impl PdbCache {
    fn new(config: PdbConfig) -> Self {
        Self {
            config,
            memory: MemoryStore::new(),
            databases: FxHashMap::default(),
        }
    }

    fn get(&mut self, size: usize) -> Result<&PatternDatabase, PuzzleError> {
        if !self.databases.contains_key(&size) {
            let pdb = self.load(size)?;
            self.databases.insert(size, pdb);
        }
        self.databases
            .get(&size)
            .ok_or_else(|| PuzzleError::InvariantViolation("pattern database missing".to_string()))
    }

    fn load(&mut self, size: usize) -> Result<PatternDatabase, PuzzleError> {
        let key = self.config.storage_key(size);
        let start = Instant::now();
        let (pdb, origin) = match &self.config.cache_dir {
            Some(dir) => load_from(&mut DirStore::new(dir), size, &self.config, &key)?,
            None => load_from(&mut self.memory, size, &self.config, &key)?,
        };

        match origin {
            Origin::Loaded => println!("Loaded PDB from {}, size: {} entries", key, pdb.len()),
            Origin::Built => println!(
                "PDB for tiles {:?} created in {} ms, size: {} entries{}",
                pdb.tiles(),
                start.elapsed().as_millis(),
                pdb.len(),
                if pdb.is_capped() { " (capped)" } else { "" }
            ),
        }
        Ok(pdb)
    }
}

fn load_from<S: BlobStore>(
    store: &mut S,
    size: usize,
    config: &PdbConfig,
    key: &str,
) -> Result<(PatternDatabase, Origin), PuzzleError> {
    build_or_load_pattern_database(store, size, &config.tiles, config.max_entries, key)
}

#[derive(Parser)]
#[command(name = "npuzzle")]
#[command(about = "An optimal N-puzzle solver", long_about = None)]
struct Args {
    /// Path to a puzzles file; without it a scrambled board is generated
    #[arg(value_name = "FILE")]
    puzzles_file: Option<PathBuf>,

    /// Puzzle number to solve (1-indexed), or start of range
    #[arg(value_name = "PUZZLE")]
    puzzle_start: Option<usize>,

    /// Optional end of puzzle range (inclusive, 1-indexed)
    #[arg(value_name = "PUZZLE_END")]
    puzzle_end: Option<usize>,

    /// Board size for a generated puzzle
    #[arg(short, long, default_value = "4")]
    size: usize,

    /// Number of random blank moves used to generate a puzzle
    #[arg(long, default_value = "20")]
    scramble: usize,

    /// Seed for the generated puzzle
    #[arg(long)]
    seed: Option<u64>,

    /// Print the solution step-by-step
    #[arg(short, long)]
    print_solution: bool,

    /// Maximum number of nodes to visit before giving up
    #[arg(short = 'n', long)]
    max_nodes: Option<u64>,

    /// Heuristic to use for solving
    #[arg(short = 'H', long, value_enum, default_value = "linear-conflict")]
    heuristic: HeuristicType,

    /// Solve every puzzle with each heuristic in turn
    #[arg(long)]
    compare: bool,

    /// Tiles tracked by the pattern database
    #[arg(long, value_delimiter = ',', default_value = "1,2,3,4")]
    pdb_tiles: Vec<u8>,

    /// Maximum number of pattern database entries
    #[arg(long, default_value_t = DEFAULT_MAX_ENTRIES)]
    pdb_max_entries: usize,

    /// Directory where pattern databases are cached between runs
    #[arg(long, value_name = "DIR")]
    pdb_dir: Option<PathBuf>,

    /// Range of node counts to trace (start, end)
    #[arg(long, num_args = 2)]
    trace_range: Option<Vec<u64>>,
}

fn load_puzzles(args: &Args) -> Vec<(usize, Board)> {
    let Some(path) = &args.puzzles_file else {
        let seed = args.seed.unwrap_or_else(rand::random);
        let board = match scramble(args.size, args.scramble, &mut seeded_rng(seed)) {
            Ok(board) => board,
            Err(e) => {
                eprintln!("Error generating puzzle: {}", e);
                std::process::exit(1);
            }
        };
        println!("Generated {}x{} puzzle (seed {}):\n{}", args.size, args.size, seed, board);
        return vec![(1, board)];
    };

    let puzzles = match PuzzleSet::from_file(path) {
        Ok(puzzles) => puzzles,
        Err(e) => {
            eprintln!("Error loading puzzles: {}", e);
            std::process::exit(1);
        }
    };

    let puzzle_start = args.puzzle_start.unwrap_or(1);
    let puzzle_end = args
        .puzzle_end
        .or(args.puzzle_start)
        .unwrap_or(puzzles.len());

    if puzzle_start == 0 {
        eprintln!("Error: puzzle numbers must be at least 1");
        std::process::exit(1);
    }

    if puzzle_end < puzzle_start {
        eprintln!("Error: puzzle end must be >= puzzle start");
        std::process::exit(1);
    }

    if puzzle_end > puzzles.len() {
        eprintln!(
            "Error: puzzle {} not found (file contains {} puzzles)",
            puzzle_end,
            puzzles.len()
        );
        std::process::exit(1);
    }

    (puzzle_start..=puzzle_end)
        .filter_map(|num| puzzles.get(num - 1).map(|board| (num, board.clone())))
        .collect()
}

fn main() {
    let args = Args::parse();

    // Validate trace_range
    let trace_range = args.trace_range.as_ref().map(|v| (v[0], v[1]));
    if let Some((start, end)) = trace_range {
        if start > end {
            eprintln!("Error: trace range start must be <= end");
            std::process::exit(1);
        }
    }

    let puzzles = load_puzzles(&args);

    if args.print_solution && puzzles.len() > 1 && !args.compare {
        eprintln!("Error: solution printing only supported when solving a single puzzle");
        std::process::exit(1);
    }

    let heuristics: Vec<HeuristicKind> = if args.compare {
        HeuristicKind::ALL.to_vec()
    } else {
        vec![args.heuristic.into()]
    };

    let mut pdbs = PdbCache::new(PdbConfig {
        tiles: args.pdb_tiles.clone(),
        max_entries: args.pdb_max_entries,
        cache_dir: args.pdb_dir.clone(),
    });

    let mut total_runs = 0;
    let mut total_solved = 0;
    let mut total_steps = 0;
    let mut total_nodes = 0;
    let mut total_time_ms = 0;

    for (puzzle_num, board) in &puzzles {
        for &heuristic in &heuristics {
            let pdb = if heuristic == HeuristicKind::PatternDatabase {
                match pdbs.get(board.size()) {
                    Ok(pdb) => Some(pdb),
                    Err(e) => {
                        eprintln!("Error preparing pattern database: {}", e);
                        std::process::exit(1);
                    }
                }
            } else {
                None
            };

            let opts = SolveOpts {
                puzzle_num: *puzzle_num,
                heuristic,
                max_nodes: args.max_nodes,
                print_solution: args.print_solution,
                trace_range,
            };
            let stats = match solve_puzzle(board, &opts, pdb) {
                Ok(stats) => stats,
                Err(e) => {
                    eprintln!("Error solving puzzle {}: {}", puzzle_num, e);
                    std::process::exit(1);
                }
            };

            total_runs += 1;
            if stats.solved {
                total_solved += 1;
            }
            total_steps += stats.steps;
            total_nodes += stats.nodes_visited;
            total_time_ms += stats.elapsed_ms;
        }
    }

    // Print summary statistics if more than one run was made
    if total_runs > 1 {
        println!("---");
        println!(
            "solved: {:>3}/{:<3}  steps: {:<5}  nodes: {:<12}  elapsed: {} ms",
            total_solved, total_runs, total_steps, total_nodes, total_time_ms
        );
    }
}
