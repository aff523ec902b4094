use key_vault::{
    maze::{KeySet, Maze, Symbol},
    search::{BestSolution, ReplayError},
    Solver,
};

const CORRIDOR: &str = "\
#########
#b.A.@.a#
#########";

const DETOUR: &str = "\
########################
#...............b.C.D.f#
#.######################
#.....@.a.B.c.d.A.e.F.g#
########################";

const POCKETS: &str = "\
########################
#@..............ac.GI.b#
###d#e#f################
###A#B#C################
###g#h#i################
########################";

const ROOM: &str = "\
#########
#a.....b#
#.#.#.#.#
#...@...#
#.#.#.#.#
#c.....d#
#########";

// c is reached from the start without B, but the corridor from a crosses B.
const SIDE_GATE: &str = "\
#########
#a.B...c#
#.#####.#
#...@...#
####.####
####.####
####b####
#########";

// The shortest way from a to c walks over x and then X.
const PASS_THROUGH: &str = "\
#######
#..x.a#
#.X##.#
#c###.#
#.###.#
#..@..#
#######";

fn solver(text: &str) -> Solver {
    Solver::new(text.parse::<Maze>().unwrap()).unwrap()
}

fn ordinal(solver: &Solver, symbol: Symbol) -> usize {
    solver.maze().ordinal_of(symbol).unwrap()
}

// Cheapest cost over every key order, walking stored paths with no gate checks.
fn brute_force_cost(solver: &Solver) -> Option<usize> {
    fn visit(
        solver: &Solver,
        position: usize,
        remaining: &mut Vec<usize>,
        cost: usize,
        best: &mut Option<usize>,
    ) {
        if remaining.is_empty() {
            if best.map_or(true, |b| cost < b) {
                *best = Some(cost);
            }
            return;
        }

        for ind in 0..remaining.len() {
            let to = remaining.remove(ind);
            if let Some(path) = solver.paths().get(position, to) {
                visit(solver, to, remaining, cost + path.cost(), best);
            }
            remaining.insert(ind, to);
        }
    }

    let maze = solver.maze();
    let mut remaining = maze
        .keys()
        .iter()
        .filter_map(|key| maze.ordinal_of(Symbol::Key(key)))
        .collect::<Vec<_>>();
    let mut best = None;
    visit(solver, Maze::START_ORDINAL, &mut remaining, 0, &mut best);

    best
}

#[test]
fn gated_corridor_needs_key_first() {
    let solver = solver(CORRIDOR);
    let solution = solver.solve().solution.unwrap();

    // a is 2 steps away, then 6 steps back through the opened gate to b.
    assert_eq!(solution.cost, 8);
    assert_eq!(solution.order, vec!['a', 'b']);
}

#[test]
fn cheaper_order_is_selected() {
    let solver = solver("#########\n#a.@...b#\n#########");
    let solution = solver.solve().solution.unwrap();

    assert_eq!(solution.cost, 8);
    assert_eq!(solution.order, vec!['a', 'b']);
    assert_eq!(solver.replay(&['b', 'a']), Ok(10));
}

#[test]
fn gateless_maze_matches_brute_force() {
    for text in [ROOM, "#########\n#a.@...b#\n#########"] {
        let solver = solver(text);
        let solution = solver.solve().solution.unwrap();

        assert_eq!(Some(solution.cost), brute_force_cost(&solver));
    }
}

#[test]
fn gated_mazes_find_known_optimum() {
    assert_eq!(solver(DETOUR).solve().solution.unwrap().cost, 132);
    assert_eq!(solver(POCKETS).solve().solution.unwrap().cost, 81);
}

#[test]
fn winning_order_replays_without_crossing_locked_gates() {
    for text in [CORRIDOR, DETOUR, POCKETS, ROOM] {
        let solver = solver(text);
        let solution = solver.solve().solution.unwrap();

        assert_eq!(solver.replay(&solution.order), Ok(solution.cost));
    }
}

#[test]
fn replay_reports_illegal_orders() {
    let solver = solver(CORRIDOR);

    assert!(matches!(
        solver.replay(&['b', 'a']),
        Err(ReplayError::MissingDependency('b', _))
    ));
    assert_eq!(
        solver.replay(&['a', 'a']),
        Err(ReplayError::RepeatedKey('a'))
    );
    assert_eq!(solver.replay(&['z']), Err(ReplayError::UnknownKey('z')));
    assert!(matches!(
        solver.replay(&['a']),
        Err(ReplayError::Incomplete(missing)) if missing.iter().eq(['b'])
    ));
}

#[test]
fn leg_between_keys_checks_its_own_gates() {
    let solver = solver(SIDE_GATE);
    let a = ordinal(&solver, Symbol::Key('a'));

    assert!(solver.dependencies().required('c').is_empty());
    assert_eq!(
        solver.paths().get(a, ordinal(&solver, Symbol::Key('c'))).unwrap().via(),
        &[Symbol::Gate('B')]
    );
    assert!(solver
        .next_keys(a, KeySet::from_iter(['a']))
        .iter()
        .all(|(_, key, _)| *key != 'c'));
    assert_eq!(
        solver.replay(&['a', 'c', 'b']),
        Err(ReplayError::LockedGate('B', 'c'))
    );

    let solution = solver.solve().solution.unwrap();
    assert_eq!(solution.cost, 17);
    assert_eq!(solver.replay(&solution.order), Ok(17));
}

#[test]
fn key_passed_on_a_leg_opens_later_gates_on_it() {
    let solver = solver(PASS_THROUGH);
    let a = ordinal(&solver, Symbol::Key('a'));
    let c = ordinal(&solver, Symbol::Key('c'));

    assert_eq!(
        solver.paths().get(a, c).unwrap().via(),
        &[Symbol::Key('x'), Symbol::Gate('X')]
    );
    assert!(solver
        .next_keys(a, KeySet::from_iter(['a']))
        .contains(&(6, 'c', c)));
    assert_eq!(solver.replay(&['a', 'c', 'x']), Ok(16));
    // Walking over x doesn't collect it.
    assert!(matches!(
        solver.replay(&['a', 'c']),
        Err(ReplayError::Incomplete(missing)) if missing.iter().eq(['x'])
    ));

    let solution = solver.solve().solution.unwrap();
    let mut order = solution.order.clone();
    order.sort_unstable();
    assert_eq!(solution.cost, 10);
    assert_eq!(order, vec!['a', 'c', 'x']);
}

#[test]
fn replay_reports_missing_paths() {
    let solver = solver("#####\n#@.a#\n#####\n#b..#\n#####");

    assert_eq!(
        solver.replay(&['a', 'b']),
        Err(ReplayError::NoPath(Symbol::Key('a'), 'b'))
    );
    assert_eq!(
        solver.replay(&['b']),
        Err(ReplayError::NoPath(Symbol::Start, 'b'))
    );
}

#[test]
fn lowered_bound_never_hides_optimum() {
    let solver = solver(DETOUR);
    let unbounded = solver.solve();
    let optimum = unbounded.solution.as_ref().unwrap().cost;

    let loose = solver.solve_with_bound(BestSolution::with_bound(optimum + 1));
    assert_eq!(loose.solution.map(|s| s.cost), Some(optimum));

    let tight = solver.solve_with_bound(BestSolution::with_bound(optimum));
    assert!(tight.solution.is_none());
    assert!(tight.stats.terminals <= unbounded.stats.terminals);
    assert!(tight.stats.expanded <= unbounded.stats.expanded);
}

#[test]
fn parallel_search_agrees_on_cost() {
    for text in [CORRIDOR, DETOUR, POCKETS, ROOM] {
        let solver = solver(text);
        let sequential = solver.solve().solution.unwrap();
        let parallel = solver.solve_parallel().solution.unwrap();

        assert_eq!(parallel.cost, sequential.cost);
        assert_eq!(solver.replay(&parallel.order), Ok(parallel.cost));
    }
}

#[test]
fn unreachable_key_leaves_no_solution() {
    let solver = solver("#####\n#@.a#\n#####\n#b..#\n#####");
    let outcome = solver.solve();

    assert!(outcome.solution.is_none());
    assert_eq!(outcome.stats.terminals, 0);
    assert!(solver.solve_parallel().solution.is_none());
}

#[test]
fn maze_without_keys_costs_nothing() {
    let solver = solver("#####\n#@..#\n#####");
    let solution = solver.solve().solution.unwrap();

    assert_eq!(solution.cost, 0);
    assert!(solution.order.is_empty());
    assert_eq!(solver.solve_parallel().solution, Some(solution));
}

#[test]
fn best_solution_only_moves_down() {
    let mut best = BestSolution::new();

    assert!(best.offer(10, &['a', 'b']));
    assert!(!best.offer(10, &['b', 'a']));
    assert!(!best.offer(12, &['b', 'a']));
    assert!(best.offer(7, &['b', 'a']));
    assert_eq!(best.min_cost(), Some(7));
    assert_eq!(best.order(), Some(&['b', 'a'][..]));
}
