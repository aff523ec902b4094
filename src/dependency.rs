use tracing::debug;

use crate::{
    maze::{key_index, KeySet, Maze, Symbol, KEY_N},
    paths::PathTable,
    Error,
};

/// Keys that must be held before each key can be collected.
///
/// Only the shortest path from the start is inspected: a gate on it makes
/// the gate's key a requirement, even if some longer route avoids the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencySet {
    required: [KeySet; KEY_N],
    keys: KeySet,
}

impl DependencySet {
    /// Requirements read directly off the paths from the start, not closed.
    pub fn direct(maze: &Maze, paths: &PathTable) -> Self {
        let mut required = [KeySet::new(); KEY_N];
        for key in maze.keys().iter() {
            let Some(to) = maze.ordinal_of(Symbol::Key(key)) else {
                continue;
            };

            // A key with no path from the start keeps no requirement, the
            // search never reaches it anyway.
            let start_path = paths.get(Maze::START_ORDINAL, to);
            if let (Some(ind), Some(path)) = (key_index(key), start_path) {
                required[ind] = path
                    .via()
                    .iter()
                    .filter_map(Symbol::key_of_gate)
                    .collect();
            }
        }

        Self {
            required,
            keys: maze.keys(),
        }
    }

    /// Empty for letters that aren't keys of this maze.
    pub fn required(&self, key: char) -> KeySet {
        required_of(&self.required, key)
    }

    pub fn keys(&self) -> KeySet {
        self.keys
    }

    /// Transitive closure. Fails if it doesn't settle within `keys - 1`
    /// rounds or if any key ends up requiring itself.
    pub fn close(&self) -> Result<Self, Error> {
        let round_limit = self.keys.len().saturating_sub(1).max(1);
        let mut closed = self.clone();
        for round in 1..=round_limit {
            let last_required = closed.required;
            let mut changed = false;
            for ind in self.keys.iter().filter_map(key_index) {
                let extended = last_required[ind]
                    .iter()
                    .fold(last_required[ind], |acc, dep| {
                        acc.union(&required_of(&last_required, dep))
                    });
                if extended != last_required[ind] {
                    closed.required[ind] = extended;
                    changed = true;
                }
            }

            if !changed {
                debug!("Dependency closure settled after {} round(s).", round);
                return closed.check_acyclic();
            }
        }

        Err(Error::CyclicDependency(closed.cyclic_keys()))
    }

    fn check_acyclic(self) -> Result<Self, Error> {
        let cyclic_keys = self.cyclic_keys();
        if cyclic_keys.is_empty() {
            Ok(self)
        } else {
            Err(Error::CyclicDependency(cyclic_keys))
        }
    }

    fn cyclic_keys(&self) -> Vec<char> {
        self.keys
            .iter()
            .filter(|key| self.required(*key).contains(*key))
            .collect()
    }
}

fn required_of(required: &[KeySet; KEY_N], key: char) -> KeySet {
    key_index(key).map_or_else(KeySet::new, |ind| required[ind])
}

pub fn derive_dependencies(maze: &Maze, paths: &PathTable) -> Result<DependencySet, Error> {
    let deps = DependencySet::direct(maze, paths).close()?;
    for key in deps.keys().iter() {
        debug!("Key {} requires keys {}.", key, deps.required(key));
    }

    Ok(deps)
}
