use std::collections::{BTreeMap, LinkedList};

use rayon::prelude::*;
use tracing::{debug, trace};

use crate::maze::{Maze, Position, Symbol};

/// Shortest route between two points of interest, ignoring gate locks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    from: usize,
    to: usize,
    // Excludes the origin and ends at the target.
    steps: Vec<Position>,
    via: Vec<Symbol>,
}

impl Path {
    pub fn from(&self) -> usize {
        self.from
    }

    pub fn to(&self) -> usize {
        self.to
    }

    pub fn steps(&self) -> &[Position] {
        &self.steps
    }

    /// Points of interest strictly between origin and target, in walking order.
    pub fn via(&self) -> &[Symbol] {
        &self.via
    }

    pub fn cost(&self) -> usize {
        self.steps.len()
    }
}

/// Breadth first search from the point of interest with given ordinal. Every
/// other point of interest reachable from it gets its shortest path, keyed by
/// the target's ordinal.
pub fn shortest_paths(maze: &Maze, root: usize) -> BTreeMap<usize, Path> {
    let mut paths = BTreeMap::new();
    let Some(root_poi) = maze.point_of_interest(root) else {
        return paths;
    };

    let root_ind = maze.cell_index(root_poi.pos());
    let mut came_from = vec![None; maze.cell_n()];
    let mut visited = vec![false; maze.cell_n()];
    visited[root_ind] = true;
    let mut positions = LinkedList::from([*root_poi.pos()]);
    while let Some(pos) = positions.pop_front() {
        let cur_ind = maze.cell_index(&pos);
        for next_pos in maze.neighbors(&pos) {
            if !maze.is_walkable(&next_pos) {
                continue;
            }

            let next_ind = maze.cell_index(&next_pos);
            if visited[next_ind] {
                continue;
            }
            visited[next_ind] = true;
            came_from[next_ind] = Some(cur_ind);
            positions.push_back(next_pos);

            // Breadth first order makes the first discovery of a cell final.
            if let Some(to) = maze
                .tile(&next_pos)
                .and_then(|tile| tile.symbol())
                .and_then(|symbol| maze.ordinal_of(symbol))
            {
                paths.insert(to, trace_back(maze, root, to, next_ind, &came_from));
            }
        }
    }

    paths
}

fn trace_back(
    maze: &Maze,
    from: usize,
    to: usize,
    target_ind: usize,
    came_from: &[Option<usize>],
) -> Path {
    let mut steps = Vec::new();
    let mut via = Vec::new();
    let mut cur_ind = target_ind;
    while let Some(prev_ind) = came_from[cur_ind] {
        let cur_pos = maze.position_of(cur_ind);
        if cur_ind != target_ind {
            if let Some(symbol) = maze.tile(&cur_pos).and_then(|tile| tile.symbol()) {
                via.push(symbol);
            }
        }
        steps.push(cur_pos);
        cur_ind = prev_ind;
    }
    steps.reverse();
    via.reverse();

    Path {
        from,
        to,
        steps,
        via,
    }
}

/// Shortest paths between every ordered pair of points of interest, indexed
/// by ordinals. Computed once per maze.
#[derive(Debug, Clone)]
pub struct PathTable {
    paths: Vec<Vec<Option<Path>>>,
}

impl PathTable {
    pub fn build(maze: &Maze) -> Self {
        let poi_n = maze.points_of_interest().len();
        let paths = (0..poi_n)
            .into_par_iter()
            .map(|from| {
                let mut row = vec![None; poi_n];
                for (to, path) in shortest_paths(maze, from) {
                    row[to] = Some(path);
                }
                row
            })
            .collect::<Vec<_>>();
        let table = Self { paths };

        debug!(
            "Computed {} path(s) between {} point(s) of interest.",
            table.len(),
            poi_n
        );
        for path in table.paths.iter().flatten().flatten() {
            trace!(
                from = %maze.points_of_interest()[path.from].symbol(),
                to = %maze.points_of_interest()[path.to].symbol(),
                cost = path.cost(),
                via = ?path.via,
                "shortest path"
            );
        }

        table
    }

    pub fn get(&self, from: usize, to: usize) -> Option<&Path> {
        self.paths.get(from).and_then(|row| row.get(to)).and_then(Option::as_ref)
    }

    pub fn paths_from(&self, from: usize) -> impl Iterator<Item = &Path> {
        self.paths.get(from).into_iter().flatten().flatten()
    }

    /// Number of stored paths.
    pub fn len(&self) -> usize {
        self.paths.iter().flatten().filter(|path| path.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
