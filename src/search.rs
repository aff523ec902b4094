use std::{
    collections::HashMap,
    error,
    fmt::Display,
    ops::{Add, AddAssign},
    sync::{Mutex, MutexGuard, PoisonError},
};

use rayon::prelude::*;
use tracing::debug;

use crate::{
    dependency::DependencySet,
    maze::{KeySet, Maze, Symbol},
    paths::{Path, PathTable},
};

/// Cheapest complete key order found so far. A missing cost means no bound.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BestSolution {
    min_cost: Option<usize>,
    order: Option<Vec<char>>,
}

impl BestSolution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound without a known order, only orders strictly cheaper than
    /// `min_cost` will be reported.
    pub fn with_bound(min_cost: usize) -> Self {
        Self {
            min_cost: Some(min_cost),
            order: None,
        }
    }

    pub fn min_cost(&self) -> Option<usize> {
        self.min_cost
    }

    pub fn order(&self) -> Option<&[char]> {
        self.order.as_deref()
    }

    pub fn can_improve(&self, cost: usize) -> bool {
        self.min_cost.map_or(true, |min_cost| cost < min_cost)
    }

    /// Replaces the best solution only if given cost is strictly lower.
    pub fn offer(&mut self, cost: usize, order: &[char]) -> bool {
        if self.can_improve(cost) {
            self.min_cost = Some(cost);
            self.order = Some(order.to_vec());
            true
        } else {
            false
        }
    }

    pub fn into_solution(self) -> Option<Solution> {
        match (self.min_cost, self.order) {
            (Some(cost), Some(order)) => Some(Solution { cost, order }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    pub cost: usize,
    pub order: Vec<char>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Search states visited.
    pub expanded: usize,
    /// Transitions dropped by the cost bound or by a cheaper earlier visit.
    pub pruned: usize,
    /// States holding every key.
    pub terminals: usize,
}

impl Add for SearchStats {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self::Output {
        self += rhs;
        self
    }
}

impl AddAssign for SearchStats {
    fn add_assign(&mut self, rhs: Self) {
        self.expanded += rhs.expanded;
        self.pruned += rhs.pruned;
        self.terminals += rhs.terminals;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOutcome {
    pub solution: Option<Solution>,
    pub stats: SearchStats,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayError {
    UnknownKey(char),
    RepeatedKey(char),
    MissingDependency(char, KeySet),
    NoPath(Symbol, char),
    LockedGate(char, char),
    Incomplete(KeySet),
}

impl Display for ReplayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReplayError::UnknownKey(key) => write!(f, "No key {} in maze.", key),
            ReplayError::RepeatedKey(key) => write!(f, "Key {} is collected twice.", key),
            ReplayError::MissingDependency(key, missing) => write!(
                f,
                "Key {} can't be collected before keys {}.",
                key, missing
            ),
            ReplayError::NoPath(from, key) => write!(f, "No path from {} to key {}.", from, key),
            ReplayError::LockedGate(gate, key) => {
                write!(f, "Gate {} is still locked on the way to key {}.", gate, key)
            }
            ReplayError::Incomplete(missing) => {
                write!(f, "Keys {} are never collected.", missing)
            }
        }
    }
}

impl error::Error for ReplayError {}

/// Checks one leg of a key order: `key` (at ordinal `to`) isn't held yet, its
/// requirements are held, and every gate on the path from `from` is opened by
/// a held key or a key passed earlier on the same path.
fn check_leg<'p>(
    maze: &Maze,
    paths: &'p PathTable,
    deps: &DependencySet,
    from: usize,
    key: char,
    to: usize,
    collected: KeySet,
) -> Result<&'p Path, ReplayError> {
    if collected.contains(key) {
        return Err(ReplayError::RepeatedKey(key));
    }

    let required = deps.required(key);
    if !collected.is_superset(&required) {
        return Err(ReplayError::MissingDependency(
            key,
            required.difference(&collected),
        ));
    }

    let path = paths.get(from, to).ok_or_else(|| {
        let from_symbol = maze
            .point_of_interest(from)
            .map(|poi| poi.symbol())
            .unwrap_or(Symbol::Start);
        ReplayError::NoPath(from_symbol, key)
    })?;

    let mut held = collected;
    for symbol in path.via() {
        match symbol {
            Symbol::Key(k) => {
                held.insert(*k);
            }
            Symbol::Gate(g) => {
                if !held.contains(g.to_ascii_lowercase()) {
                    return Err(ReplayError::LockedGate(*g, key));
                }
            }
            Symbol::Start => (),
        }
    }

    Ok(path)
}

/// Walks given key order from the start, checking every leg the way the
/// search does. Returns the total cost if all keys are collected.
pub fn replay(
    maze: &Maze,
    paths: &PathTable,
    deps: &DependencySet,
    order: &[char],
) -> Result<usize, ReplayError> {
    let mut position = Maze::START_ORDINAL;
    let mut collected = KeySet::new();
    let mut cost = 0;
    for &key in order {
        let to = maze
            .ordinal_of(Symbol::Key(key))
            .ok_or(ReplayError::UnknownKey(key))?;
        cost += check_leg(maze, paths, deps, position, key, to, collected)?.cost();
        collected.insert(key);
        position = to;
    }

    if collected != maze.keys() {
        return Err(ReplayError::Incomplete(maze.keys().difference(&collected)));
    }

    Ok(cost)
}

fn lock_best(best: &Mutex<BestSolution>) -> MutexGuard<'_, BestSolution> {
    best.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Legal next keys from the point of interest at `position` holding
/// `collected`, as (leg cost, key, ordinal), nearest first. These are the
/// transitions the search tries.
pub fn next_keys(
    maze: &Maze,
    paths: &PathTable,
    deps: &DependencySet,
    position: usize,
    collected: KeySet,
) -> Vec<(usize, char, usize)> {
    legal_moves(maze, paths, deps, &key_ordinals(maze), position, collected)
}

// (key, ordinal) in letter order.
fn key_ordinals(maze: &Maze) -> Vec<(char, usize)> {
    maze.keys()
        .iter()
        .filter_map(|key| maze.ordinal_of(Symbol::Key(key)).map(|to| (key, to)))
        .collect()
}

fn legal_moves(
    maze: &Maze,
    paths: &PathTable,
    deps: &DependencySet,
    key_ordinals: &[(char, usize)],
    position: usize,
    collected: KeySet,
) -> Vec<(usize, char, usize)> {
    let mut next_keys = key_ordinals
        .iter()
        .filter(|(key, _)| !collected.contains(*key))
        .filter_map(|&(key, to)| {
            check_leg(maze, paths, deps, position, key, to, collected)
                .ok()
                .map(|path| (path.cost(), key, to))
        })
        .collect::<Vec<_>>();
    next_keys.sort_unstable();

    next_keys
}

/// One depth first walk. `seen` holds at most one entry per
/// (position, collected) pair, up to `keys * 2^keys` entries for a maze with
/// many keys.
struct Searcher<'a> {
    maze: &'a Maze,
    paths: &'a PathTable,
    deps: &'a DependencySet,
    // (key, ordinal) in letter order.
    key_ordinals: Vec<(char, usize)>,
    best: &'a Mutex<BestSolution>,
    // Cheapest cost seen for each (position, collected) state.
    seen: HashMap<(usize, KeySet), usize>,
    order: Vec<char>,
    stats: SearchStats,
}

impl<'a> Searcher<'a> {
    fn new(
        maze: &'a Maze,
        paths: &'a PathTable,
        deps: &'a DependencySet,
        best: &'a Mutex<BestSolution>,
    ) -> Self {
        Self {
            maze,
            paths,
            deps,
            key_ordinals: key_ordinals(maze),
            best,
            seen: HashMap::new(),
            order: Vec::new(),
            stats: SearchStats::default(),
        }
    }

    fn candidates(&self, position: usize, collected: KeySet) -> Vec<(usize, char, usize)> {
        legal_moves(
            self.maze,
            self.paths,
            self.deps,
            &self.key_ordinals,
            position,
            collected,
        )
    }

    fn descend(&mut self, position: usize, collected: KeySet, cost: usize) {
        self.stats.expanded += 1;
        if collected == self.maze.keys() {
            self.stats.terminals += 1;
            if lock_best(self.best).offer(cost, &self.order) {
                debug!("New best: {} steps, key order {:?}.", cost, self.order);
            }
            return;
        }

        // A state without candidates is a dead end.
        for (leg_cost, key, to) in self.candidates(position, collected) {
            self.step(collected, cost + leg_cost, key, to);
        }
    }

    fn step(&mut self, collected: KeySet, next_cost: usize, key: char, to: usize) {
        if !lock_best(self.best).can_improve(next_cost) {
            self.stats.pruned += 1;
            return;
        }

        let next_collected = collected.with(key);
        if self
            .seen
            .get(&(to, next_collected))
            .is_some_and(|&seen_cost| seen_cost <= next_cost)
        {
            self.stats.pruned += 1;
            return;
        }
        self.seen.insert((to, next_collected), next_cost);

        self.order.push(key);
        self.descend(to, next_collected, next_cost);
        self.order.pop();
    }
}

/// Depth first branch and bound over key orders, starting from `initial`.
pub fn search(
    maze: &Maze,
    paths: &PathTable,
    deps: &DependencySet,
    initial: BestSolution,
) -> SearchOutcome {
    let best = Mutex::new(initial);
    let mut searcher = Searcher::new(maze, paths, deps, &best);
    searcher.descend(Maze::START_ORDINAL, KeySet::new(), 0);
    let stats = searcher.stats;

    SearchOutcome {
        solution: best
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .into_solution(),
        stats,
    }
}

/// Same as [`search`], but each first key is searched as its own rayon task.
/// The tasks share the best solution, which only ever decreases.
pub fn search_parallel(
    maze: &Maze,
    paths: &PathTable,
    deps: &DependencySet,
    initial: BestSolution,
) -> SearchOutcome {
    if maze.keys().is_empty() {
        return search(maze, paths, deps, initial);
    }

    let best = Mutex::new(initial);
    let first_keys = Searcher::new(maze, paths, deps, &best)
        .candidates(Maze::START_ORDINAL, KeySet::new());
    let root_stats = SearchStats {
        expanded: 1,
        ..SearchStats::default()
    };
    let stats = first_keys
        .into_par_iter()
        .map(|(leg_cost, key, to)| {
            let mut searcher = Searcher::new(maze, paths, deps, &best);
            searcher.step(KeySet::new(), leg_cost, key, to);
            searcher.stats
        })
        .reduce(SearchStats::default, |a, b| a + b)
        + root_stats;

    SearchOutcome {
        solution: best
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .into_solution(),
        stats,
    }
}
