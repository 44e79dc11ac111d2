//! Arena Map
//!
//! Static tile grid: every cell is classified once at construction and
//! answers walkability/hookability queries for points and boxes.

use crate::core::vec2::Vec2;
use crate::game::entity::Team;

/// Edge length of one tile in world units.
pub const TILE_SIZE: f32 = 40.0;

/// Standard arena width in tiles.
pub const MAP_WIDTH: usize = 40;

/// Standard arena height in tiles.
pub const MAP_HEIGHT: usize = 24;

/// Avatars count as "near a shop" within this distance of a shop tile center.
pub const SHOP_RANGE: f32 = 120.0;

/// Vertical spacing between same-team spawn slots.
const SPAWN_SPACING: f32 = 50.0;

/// Number of distinct spawn slots per fountain before they wrap around.
const SPAWN_SLOTS: usize = 4;

/// Standard arena layout.
///
/// `#` obstacle, `~` river, `.` ground, `S` shop, `R`/`B` red/blue fountain,
/// `r` rune pad.
const STANDARD_LAYOUT: [&str; MAP_HEIGHT] = [
    "########################################",
    "#..................~~..................#",
    "#.SS...............~~..................#",
    "#.SS...............~~..................#",
    "#.............r....~~....r.............#",
    "#.......##.........~~.........##.......#",
    "#.......##.........~~.........##.......#",
    "#..................~~..................#",
    "#..................~~..................#",
    "#RR................~~................BB#",
    "#RR................~~................BB#",
    "#RR................~~................BB#",
    "#RR................~~................BB#",
    "#RR................~~................BB#",
    "#RR................~~................BB#",
    "#..................~~..................#",
    "#..................~~..................#",
    "#.......##.........~~.........##.......#",
    "#.......##.........~~.........##.......#",
    "#.............r....~~....r.............#",
    "#..................~~...............SS.#",
    "#..................~~...............SS.#",
    "#..................~~..................#",
    "########################################",
];

/// Classification of a single cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tile {
    /// Open floor.
    Ground,
    /// River; hooks fly over it, avatars cannot cross.
    Water,
    /// Wall or pillar.
    Obstacle,
    /// Item shop.
    Shop,
    /// Team fountain: spawn area and healing zone.
    Spawn(Team),
    /// Rune spawn landmark.
    RunePad,
}

impl Tile {
    /// Can an avatar stand on this tile?
    pub fn is_walkable(self) -> bool {
        !matches!(self, Tile::Water | Tile::Obstacle)
    }

    /// Can a hook fly over this tile?
    pub fn is_hookable(self) -> bool {
        !matches!(self, Tile::Obstacle)
    }

    fn from_char(ch: char) -> Option<Self> {
        match ch {
            '.' => Some(Tile::Ground),
            '~' => Some(Tile::Water),
            '#' => Some(Tile::Obstacle),
            'S' => Some(Tile::Shop),
            'R' => Some(Tile::Spawn(Team::Red)),
            'B' => Some(Tile::Spawn(Team::Blue)),
            'r' => Some(Tile::RunePad),
            _ => None,
        }
    }
}

/// Errors from parsing a map layout.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum MapError {
    /// Layout has no rows or empty rows.
    #[error("map layout is empty")]
    Empty,

    /// A row is a different width from the first one.
    #[error("row {row} has width {found}, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// Unrecognised tile character.
    #[error("unknown tile {ch:?} at row {row}, column {col}")]
    UnknownTile { ch: char, row: usize, col: usize },
}

/// Immutable tile grid for one arena.
#[derive(Clone, Debug)]
pub struct ArenaMap {
    width: usize,
    height: usize,
    tiles: Vec<Tile>,
    /// Rune pad centers in row-major order.
    rune_pads: Vec<Vec2>,
    /// Shop tile centers.
    shops: Vec<Vec2>,
}

impl ArenaMap {
    /// Build a map from rows of tile characters.
    pub fn from_ascii(rows: &[&str]) -> Result<Self, MapError> {
        let height = rows.len();
        let width = rows.first().map(|r| r.chars().count()).unwrap_or(0);
        if height == 0 || width == 0 {
            return Err(MapError::Empty);
        }

        let mut tiles = Vec::with_capacity(width * height);
        let mut rune_pads = Vec::new();
        let mut shops = Vec::new();

        for (row, line) in rows.iter().enumerate() {
            let found = line.chars().count();
            if found != width {
                return Err(MapError::RaggedRow { row, expected: width, found });
            }
            for (col, ch) in line.chars().enumerate() {
                let tile = Tile::from_char(ch).ok_or(MapError::UnknownTile { ch, row, col })?;
                match tile {
                    Tile::RunePad => rune_pads.push(tile_center(col, row)),
                    Tile::Shop => shops.push(tile_center(col, row)),
                    _ => {}
                }
                tiles.push(tile);
            }
        }

        Ok(Self { width, height, tiles, rune_pads, shops })
    }

    /// The standard two-fountain arena split by the river.
    pub fn standard() -> Self {
        match Self::from_ascii(&STANDARD_LAYOUT) {
            Ok(map) => map,
            // The layout is a compile-time constant covered by tests.
            Err(e) => unreachable!("standard layout is invalid: {e}"),
        }
    }

    /// Width in tiles.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in tiles.
    pub fn height(&self) -> usize {
        self.height
    }

    /// World-space size of the whole grid.
    pub fn world_size(&self) -> Vec2 {
        Vec2::new(self.width as f32 * TILE_SIZE, self.height as f32 * TILE_SIZE)
    }

    /// Tile by grid coordinates.
    pub fn tile(&self, col: i64, row: i64) -> Option<Tile> {
        if col < 0 || row < 0 || col as usize >= self.width || row as usize >= self.height {
            return None;
        }
        self.tiles.get(row as usize * self.width + col as usize).copied()
    }

    /// Tile containing a world position. `None` outside the grid.
    pub fn tile_at(&self, pos: Vec2) -> Option<Tile> {
        let (col, row) = to_grid(pos);
        self.tile(col, row)
    }

    /// Point walkability. Outside the grid is never walkable.
    pub fn is_walkable(&self, pos: Vec2) -> bool {
        self.tile_at(pos).is_some_and(Tile::is_walkable)
    }

    /// Point hookability. Outside the grid is never hookable.
    pub fn is_hookable(&self, pos: Vec2) -> bool {
        self.tile_at(pos).is_some_and(Tile::is_hookable)
    }

    /// Every tile overlapped by the axis-aligned box is walkable.
    pub fn is_box_walkable(&self, center: Vec2, half_extent: f32) -> bool {
        let (min_col, min_row) = to_grid(Vec2::new(center.x - half_extent, center.y - half_extent));
        let (max_col, max_row) = to_grid(Vec2::new(center.x + half_extent, center.y + half_extent));

        for row in min_row..=max_row {
            for col in min_col..=max_col {
                if !self.tile(col, row).is_some_and(Tile::is_walkable) {
                    return false;
                }
            }
        }
        true
    }

    /// Is this position on the given team's fountain?
    pub fn is_healing(&self, pos: Vec2, team: Team) -> bool {
        self.tile_at(pos) == Some(Tile::Spawn(team))
    }

    /// Is this position within shopping distance of any shop tile?
    pub fn is_near_shop(&self, pos: Vec2) -> bool {
        let range_sq = SHOP_RANGE * SHOP_RANGE;
        self.shops.iter().any(|shop| shop.distance_squared(pos) <= range_sq)
    }

    /// Spawn position for the `index`-th avatar of a team.
    ///
    /// Slots are stacked vertically down the fountain so teammates do not
    /// spawn on top of each other.
    pub fn spawn_point(&self, team: Team, index: usize) -> Vec2 {
        let mut first: Option<(usize, usize)> = None;
        let mut last_col = 0;
        for row in 0..self.height {
            for col in 0..self.width {
                if self.tiles[row * self.width + col] == Tile::Spawn(team) {
                    first.get_or_insert((col, row));
                    last_col = last_col.max(col);
                }
            }
        }

        let Some((first_col, first_row)) = first else {
            // No fountain in this layout: fall back to the grid center.
            return self.world_size().scale(0.5);
        };

        // Center of the fountain column span, one tile below its top edge
        let x = (first_col as f32 + last_col as f32 + 1.0) * 0.5 * TILE_SIZE;
        let y = (first_row as f32 + 1.0) * TILE_SIZE + (index % SPAWN_SLOTS) as f32 * SPAWN_SPACING;
        Vec2::new(x, y)
    }

    /// Rune spawn landmarks.
    pub fn rune_landmarks(&self) -> &[Vec2] {
        &self.rune_pads
    }
}

impl Default for ArenaMap {
    fn default() -> Self {
        Self::standard()
    }
}

fn to_grid(pos: Vec2) -> (i64, i64) {
    ((pos.x / TILE_SIZE).floor() as i64, (pos.y / TILE_SIZE).floor() as i64)
}

fn tile_center(col: usize, row: usize) -> Vec2 {
    Vec2::new((col as f32 + 0.5) * TILE_SIZE, (row as f32 + 0.5) * TILE_SIZE)
}
