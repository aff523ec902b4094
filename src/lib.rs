use std::{
    error,
    fmt::Display,
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

pub mod dependency;
pub mod maze;
pub mod paths;
pub mod search;

use dependency::DependencySet;
use maze::{KeySet, Maze, Position, Symbol};
use paths::PathTable;
use search::{BestSolution, ReplayError, SearchOutcome};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MazeError {
    InconsistentRow(usize, usize),
    MultipleStartPosition(Position, Position),
    NoStartPosition,
    InvalidCharForMaze(char, Position),
    DuplicateSymbol(Symbol, Position, Position),
    GateWithoutKey(Symbol, Position),
}

impl Display for MazeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MazeError::InconsistentRow(expect_col_n, this_col_n) => write!(
                f,
                "Expect {} column(s) in each row, given {}.",
                expect_col_n, this_col_n
            ),
            MazeError::MultipleStartPosition(last_pos, pos) => write!(
                f,
                "Expect only one start position, given two({}, {}).",
                last_pos, pos
            ),
            MazeError::NoStartPosition => write!(f, "No start position in maze."),
            MazeError::InvalidCharForMaze(c, pos) => {
                write!(f, "Invalid character({}) for maze at {}.", c, pos)
            }
            MazeError::DuplicateSymbol(symbol, last_pos, pos) => write!(
                f,
                "Expect symbol {} only once in maze, given two({}, {}).",
                symbol, last_pos, pos
            ),
            MazeError::GateWithoutKey(gate, pos) => write!(
                f,
                "Gate {} at {} has no matching key in maze.",
                gate, pos
            ),
        }
    }
}

impl error::Error for MazeError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    MalformedMaze(MazeError),
    CyclicDependency(Vec<char>),
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::MalformedMaze(e) => write!(f, "Malformed maze: {}", e),
            Error::CyclicDependency(keys) => write!(
                f,
                "Cyclic dependency between keys {:?}, the maze can't be solved.",
                keys
            ),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::MalformedMaze(e) => Some(e),
            Error::CyclicDependency(_) => None,
        }
    }
}

impl From<MazeError> for Error {
    fn from(value: MazeError) -> Self {
        Error::MalformedMaze(value)
    }
}

#[derive(Debug, Parser)]
pub struct CLIArgs {
    pub input_path: PathBuf,
    /// Search each choice of the first key on its own thread.
    #[arg(long)]
    pub parallel: bool,
    /// Print the winning key order after the step count.
    #[arg(long)]
    pub show_order: bool,
}

/// Everything precomputed for one maze: the path table between all points of
/// interest and the closed key dependencies. Searches reuse both.
#[derive(Debug)]
pub struct Solver {
    maze: Maze,
    paths: PathTable,
    deps: DependencySet,
}

impl Solver {
    pub fn new(maze: Maze) -> Result<Self, Error> {
        let paths = PathTable::build(&maze);
        let deps = dependency::derive_dependencies(&maze, &paths)?;

        Ok(Self { maze, paths, deps })
    }

    pub fn maze(&self) -> &Maze {
        &self.maze
    }

    pub fn paths(&self) -> &PathTable {
        &self.paths
    }

    pub fn dependencies(&self) -> &DependencySet {
        &self.deps
    }

    pub fn solve(&self) -> SearchOutcome {
        self.solve_with_bound(BestSolution::new())
    }

    pub fn solve_with_bound(&self, initial: BestSolution) -> SearchOutcome {
        let outcome = search::search(&self.maze, &self.paths, &self.deps, initial);
        log_outcome(&outcome);
        outcome
    }

    pub fn solve_parallel(&self) -> SearchOutcome {
        let outcome =
            search::search_parallel(&self.maze, &self.paths, &self.deps, BestSolution::new());
        log_outcome(&outcome);
        outcome
    }

    pub fn next_keys(&self, position: usize, collected: KeySet) -> Vec<(usize, char, usize)> {
        search::next_keys(&self.maze, &self.paths, &self.deps, position, collected)
    }

    pub fn replay(&self, order: &[char]) -> Result<usize, ReplayError> {
        search::replay(&self.maze, &self.paths, &self.deps, order)
    }
}

fn log_outcome(outcome: &SearchOutcome) {
    match &outcome.solution {
        Some(solution) => info!(
            cost = solution.cost,
            order = ?solution.order,
            expanded = outcome.stats.expanded,
            pruned = outcome.stats.pruned,
            "search finished"
        ),
        None => info!(
            expanded = outcome.stats.expanded,
            pruned = outcome.stats.pruned,
            "search finished without collecting every key"
        ),
    }
}

pub fn read_maze<P: AsRef<Path>>(path: P) -> Result<Maze> {
    let file = File::open(&path)
        .with_context(|| format!("Failed to open given file({}).", path.as_ref().display()))?;
    let reader = BufReader::new(file);
    let lines = reader
        .lines()
        .enumerate()
        .map(|(ind, line)| {
            line.with_context(|| {
                format!(
                    "Failed to read line {} in given file({}).",
                    ind + 1,
                    path.as_ref().display()
                )
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Maze::try_from_lines(lines.iter().map(|l| l.as_str()))?)
}
