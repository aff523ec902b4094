use std::{collections::HashMap, fmt::Display, str::FromStr};

use crate::MazeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    r: usize,
    c: usize,
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.r, self.c)
    }
}

impl Position {
    pub fn new(r: usize, c: usize) -> Self {
        Self { r, c }
    }

    pub fn r(&self) -> usize {
        self.r
    }

    pub fn c(&self) -> usize {
        self.c
    }

    pub fn neighbor(&self, dir: Direction) -> Option<Self> {
        match dir {
            Direction::North if self.r > 0 => Some(Self::new(self.r - 1, self.c)),
            Direction::East => Some(Self::new(self.r, self.c + 1)),
            Direction::South => Some(Self::new(self.r + 1, self.c)),
            Direction::West if self.c > 0 => Some(Self::new(self.r, self.c - 1)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    /// Up, right, down, left. Path ties are broken by this order.
    pub fn all_directions() -> &'static [Direction] {
        static ALL_DIRECTIONS: [Direction; 4] = [
            Direction::North,
            Direction::East,
            Direction::South,
            Direction::West,
        ];

        &ALL_DIRECTIONS
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tile {
    Wall,
    Floor,
    Start,
    Key(char),
    Gate(char),
}

impl Tile {
    pub fn symbol(&self) -> Option<Symbol> {
        match self {
            Tile::Start => Some(Symbol::Start),
            Tile::Key(k) => Some(Symbol::Key(*k)),
            Tile::Gate(g) => Some(Symbol::Gate(*g)),
            Tile::Wall | Tile::Floor => None,
        }
    }
}

/// Identity of a point of interest. The derived order puts the start first,
/// then keys, then gates, each group by letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Symbol {
    Start,
    Key(char),
    Gate(char),
}

impl Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Symbol::Start => write!(f, "@"),
            Symbol::Key(c) | Symbol::Gate(c) => write!(f, "{}", c),
        }
    }
}

impl Symbol {
    pub fn key_of_gate(&self) -> Option<char> {
        if let Self::Gate(c) = self {
            Some(c.to_ascii_lowercase())
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointOfInterest {
    symbol: Symbol,
    pos: Position,
}

impl PointOfInterest {
    pub fn symbol(&self) -> Symbol {
        self.symbol
    }

    pub fn pos(&self) -> &Position {
        &self.pos
    }
}

pub const KEY_N: usize = 26;

/// Bit index of a key letter, `None` for anything but `a` to `z`.
pub fn key_index(key: char) -> Option<usize> {
    key.is_ascii_lowercase().then(|| (key as u8 - b'a') as usize)
}

/// Set of keys as a bitmask, bit 0 is key `a`. Characters that aren't key
/// letters are never members.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct KeySet(u32);

impl KeySet {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn contains(&self, key: char) -> bool {
        key_index(key).is_some_and(|ind| self.0 & (1 << ind) != 0)
    }

    /// Returns false if the key was already in the set or isn't a key letter.
    pub fn insert(&mut self, key: char) -> bool {
        let Some(ind) = key_index(key) else {
            return false;
        };
        let was_absent = self.0 & (1 << ind) == 0;
        self.0 |= 1 << ind;
        was_absent
    }

    pub fn with(mut self, key: char) -> Self {
        self.insert(key);
        self
    }

    pub fn is_superset(&self, other: &KeySet) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn union(&self, other: &KeySet) -> Self {
        Self(self.0 | other.0)
    }

    pub fn difference(&self, other: &KeySet) -> Self {
        Self(self.0 & !other.0)
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = char> {
        let set = *self;
        ('a'..='z').filter(move |k| set.contains(*k))
    }
}

impl FromIterator<char> for KeySet {
    fn from_iter<T: IntoIterator<Item = char>>(iter: T) -> Self {
        let mut set = KeySet::new();
        for key in iter {
            set.insert(key);
        }

        set
    }
}

impl Display for KeySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{{}}}", self.iter().map(String::from).collect::<Vec<_>>().join(", "))
    }
}

#[derive(Debug)]
pub struct Maze {
    tiles: Vec<Tile>,
    row_n: usize,
    col_n: usize,
    pois: Vec<PointOfInterest>,
    keys: KeySet,
}

impl FromStr for Maze {
    type Err = MazeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from_lines(s.lines())
    }
}

impl Maze {
    pub const START_ORDINAL: usize = 0;

    /// Blank lines are skipped, every other line is one row of the maze.
    pub fn try_from_lines<'a, I: IntoIterator<Item = &'a str>>(lines: I) -> Result<Self, MazeError> {
        let mut builder = MazeBuilder::new();
        for line in lines.into_iter().filter(|l| !l.trim().is_empty()) {
            builder.add_row(line)?;
        }

        builder.build()
    }

    pub fn row_n(&self) -> usize {
        self.row_n
    }

    pub fn col_n(&self) -> usize {
        self.col_n
    }

    pub fn tile(&self, pos: &Position) -> Option<&Tile> {
        if pos.r < self.row_n && pos.c < self.col_n {
            self.tiles.get(self.cell_index(pos))
        } else {
            None
        }
    }

    pub fn is_walkable(&self, pos: &Position) -> bool {
        self.tile(pos).is_some_and(|tile| *tile != Tile::Wall)
    }

    /// In-bounds cardinal neighbors, walls included.
    pub fn neighbors(&self, pos: &Position) -> impl Iterator<Item = Position> + '_ {
        let pos = *pos;
        Direction::all_directions()
            .iter()
            .filter_map(move |dir| pos.neighbor(*dir))
            .filter(move |next_pos| self.tile(next_pos).is_some())
    }

    /// Points of interest indexed by ordinal.
    pub fn points_of_interest(&self) -> &[PointOfInterest] {
        &self.pois
    }

    pub fn point_of_interest(&self, ordinal: usize) -> Option<&PointOfInterest> {
        self.pois.get(ordinal)
    }

    pub fn ordinal_of(&self, symbol: Symbol) -> Option<usize> {
        self.pois
            .binary_search_by(|poi| poi.symbol.cmp(&symbol))
            .ok()
    }

    pub fn start(&self) -> &PointOfInterest {
        &self.pois[Self::START_ORDINAL]
    }

    pub fn keys(&self) -> KeySet {
        self.keys
    }

    pub fn cell_n(&self) -> usize {
        self.tiles.len()
    }

    pub fn cell_index(&self, pos: &Position) -> usize {
        debug_assert!(pos.r < self.row_n && pos.c < self.col_n);
        pos.r * self.col_n + pos.c
    }

    pub fn position_of(&self, ind: usize) -> Position {
        debug_assert!(ind < self.tiles.len());
        Position::new(ind / self.col_n, ind % self.col_n)
    }
}

#[derive(Debug)]
struct MazeBuilder {
    tiles: Vec<Tile>,
    row_n: usize,
    col_n: Option<usize>,
    symbol_pos: HashMap<Symbol, Position>,
}

impl MazeBuilder {
    pub fn new() -> Self {
        Self {
            tiles: Vec::new(),
            row_n: 0,
            col_n: None,
            symbol_pos: HashMap::new(),
        }
    }

    pub fn add_row(&mut self, text: &str) -> Result<(), MazeError> {
        let this_col_n = text.chars().count();
        let expect_col_n = *self.col_n.get_or_insert(this_col_n);
        if expect_col_n != this_col_n {
            return Err(MazeError::InconsistentRow(expect_col_n, this_col_n));
        }

        for (ind, c) in text.chars().enumerate() {
            let pos = Position::new(self.row_n, ind);
            let tile = match c {
                '#' => Tile::Wall,
                '.' => Tile::Floor,
                '@' => Tile::Start,
                c if c.is_ascii_lowercase() => Tile::Key(c),
                c if c.is_ascii_uppercase() => Tile::Gate(c),
                other => return Err(MazeError::InvalidCharForMaze(other, pos)),
            };

            if let Some(symbol) = tile.symbol() {
                if let Some(last_pos) = self.symbol_pos.insert(symbol, pos) {
                    return Err(match symbol {
                        Symbol::Start => MazeError::MultipleStartPosition(last_pos, pos),
                        other => MazeError::DuplicateSymbol(other, last_pos, pos),
                    });
                }
            }
            self.tiles.push(tile);
        }
        self.row_n += 1;

        Ok(())
    }

    pub fn build(self) -> Result<Maze, MazeError> {
        let mut pois = self
            .symbol_pos
            .into_iter()
            .map(|(symbol, pos)| PointOfInterest { symbol, pos })
            .collect::<Vec<_>>();
        pois.sort_unstable_by_key(|poi| poi.symbol);
        if pois.first().map(|poi| poi.symbol) != Some(Symbol::Start) {
            return Err(MazeError::NoStartPosition);
        }

        let keys = pois
            .iter()
            .filter_map(|poi| match poi.symbol {
                Symbol::Key(k) => Some(k),
                _ => None,
            })
            .collect::<KeySet>();
        if let Some(poi) = pois
            .iter()
            .find(|poi| poi.symbol.key_of_gate().is_some_and(|k| !keys.contains(k)))
        {
            return Err(MazeError::GateWithoutKey(poi.symbol, poi.pos));
        }

        Ok(Maze {
            tiles: self.tiles,
            row_n: self.row_n,
            col_n: self.col_n.unwrap_or(0),
            pois,
            keys,
        })
    }
}
