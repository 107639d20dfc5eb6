use super::{Cell, Direction, Edge, EdgeKind, LayerRules};
use crate::Cost;
use crate::error::RouterError;
use gcr_common::db::core::DesignDB;
use gcr_common::db::indices::{CellId, EdgeId, NetId};
use gcr_common::geom::coord::GridCoord;

/// Dense 3D grid of gcells with every edge stored in one flat arena.
/// Cells and edges refer to each other by id only.
pub struct GridGraph {
    size_x: u32,
    size_y: u32,
    layers: Vec<LayerRules>,
    cells: Vec<Cell>,
    edges: Vec<Edge>,
}

impl GridGraph {
    pub fn new(size_x: u32, size_y: u32, layers: Vec<LayerRules>) -> Result<Self, RouterError> {
        if size_x == 0 || size_y == 0 || layers.is_empty() {
            return Err(RouterError::InvalidGrid(format!(
                "grid {}x{}x{} has no cells",
                size_x,
                size_y,
                layers.len()
            )));
        }
        if layers.len() > u8::MAX as usize {
            return Err(RouterError::InvalidGrid(format!(
                "{} layers exceed the supported {}",
                layers.len(),
                u8::MAX
            )));
        }
        let size = (size_x as u64) * (size_y as u64) * (layers.len() as u64);
        if size >= u32::MAX as u64 {
            return Err(RouterError::InvalidGrid(format!(
                "{} gcells do not fit 32-bit ids",
                size
            )));
        }
        if size > 50_000_000 {
            log::warn!(
                "Allocating large GridGraph: {} gcells. Ensure sufficient RAM.",
                size
            );
        }

        let mut grid = Self {
            size_x,
            size_y,
            layers,
            cells: Vec::with_capacity(size as usize),
            edges: Vec::new(),
        };

        let num_layers = grid.layers.len() as u8;
        for z in 0..num_layers {
            for y in 0..size_y {
                for x in 0..size_x {
                    grid.cells.push(Cell {
                        coord: GridCoord::new(x, y, z),
                        edges: [None; 6],
                    });
                }
            }
        }

        for z in 0..num_layers {
            let rules = grid.layers[z as usize];
            for y in 0..size_y {
                for x in 0..size_x {
                    let here = grid.cell_id(GridCoord::new(x, y, z));
                    if x + 1 < size_x && rules.horizontal_capacity > 0 {
                        let there = grid.cell_id(GridCoord::new(x + 1, y, z));
                        grid.connect(
                            here,
                            there,
                            Direction::IncX,
                            EdgeKind::Horizontal,
                            rules.horizontal_capacity,
                            z,
                        );
                    }
                    if y + 1 < size_y && rules.vertical_capacity > 0 {
                        let there = grid.cell_id(GridCoord::new(x, y + 1, z));
                        grid.connect(
                            here,
                            there,
                            Direction::IncY,
                            EdgeKind::Vertical,
                            rules.vertical_capacity,
                            z,
                        );
                    }
                    if z + 1 < num_layers {
                        let there = grid.cell_id(GridCoord::new(x, y, z + 1));
                        grid.connect(here, there, Direction::IncZ, EdgeKind::Via, u32::MAX, z);
                    }
                }
            }
        }

        log::debug!(
            "GridGraph: {}x{}x{} gcells, {} edges",
            size_x,
            size_y,
            num_layers,
            grid.edges.len()
        );
        Ok(grid)
    }

    /// Builds the graph for a parsed design. Raw capacities are converted to
    /// tracks by dividing by the layer's wire pitch (min width + min spacing).
    pub fn from_design(design: &DesignDB) -> Result<Self, RouterError> {
        let layers: Vec<LayerRules> = design
            .layers
            .iter()
            .map(|l| LayerRules {
                horizontal_capacity: to_tracks(l.horizontal_capacity, l.wire_pitch()),
                vertical_capacity: to_tracks(l.vertical_capacity, l.wire_pitch()),
                min_width: l.min_width,
                min_spacing: l.min_spacing,
            })
            .collect();
        let mut grid = Self::new(design.grid_x, design.grid_y, layers)?;

        for adj in &design.adjustments {
            let (Some(a), Some(b)) = (grid.try_cell_id(adj.from), grid.try_cell_id(adj.to)) else {
                return Err(RouterError::InvalidGrid(format!(
                    "capacity adjustment {} - {} lies outside the grid",
                    adj.from, adj.to
                )));
            };
            if !grid.are_adjacent(adj.from, adj.to) {
                return Err(RouterError::InvalidGrid(format!(
                    "capacity adjustment {} - {} names non-adjacent gcells",
                    adj.from, adj.to
                )));
            }
            match grid.edge_between(a, b) {
                Ok(edge) => {
                    let pitch = design.layers[adj.from.z as usize].wire_pitch();
                    grid.set_capacity(edge, to_tracks(adj.capacity, pitch));
                }
                Err(_) => log::warn!(
                    "Ignoring capacity adjustment {} - {}: layer has no edge in that direction",
                    adj.from,
                    adj.to
                ),
            }
        }
        Ok(grid)
    }

    fn connect(
        &mut self,
        a: CellId,
        b: CellId,
        dir: Direction,
        kind: EdgeKind,
        capacity: u32,
        layer: u8,
    ) {
        let id = EdgeId::new(self.edges.len());
        self.edges.push(Edge {
            kind,
            capacity,
            usage: 0,
            layer,
            history_cost: 1.0,
            nets: Vec::new(),
            cells: [a, b],
        });
        self.cells[a.index()].edges[dir as usize] = Some(id);
        self.cells[b.index()].edges[dir.opposite() as usize] = Some(id);
    }

    pub fn size_x(&self) -> u32 {
        self.size_x
    }
    pub fn size_y(&self) -> u32 {
        self.size_y
    }
    pub fn num_layers(&self) -> u8 {
        self.layers.len() as u8
    }
    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn layer_rules(&self, z: u8) -> &LayerRules {
        &self.layers[z as usize]
    }

    pub fn contains(&self, c: GridCoord) -> bool {
        c.x < self.size_x && c.y < self.size_y && (c.z as usize) < self.layers.len()
    }

    #[inline(always)]
    pub fn cell_id(&self, c: GridCoord) -> CellId {
        debug_assert!(self.contains(c), "{} outside grid", c);
        CellId::new(
            (c.z as usize) * (self.size_y as usize) * (self.size_x as usize)
                + (c.y as usize) * (self.size_x as usize)
                + (c.x as usize),
        )
    }

    pub fn try_cell_id(&self, c: GridCoord) -> Option<CellId> {
        self.contains(c).then(|| self.cell_id(c))
    }

    #[inline(always)]
    pub fn coord_of(&self, id: CellId) -> GridCoord {
        let i = id.0;
        GridCoord::new(
            i % self.size_x,
            (i / self.size_x) % self.size_y,
            (i / (self.size_x * self.size_y)) as u8,
        )
    }

    pub fn cell(&self, id: CellId) -> &Cell {
        &self.cells[id.index()]
    }

    /// Incident edges in +x, +y, +z, -x, -y, -z order.
    pub fn neighbors(&self, id: CellId) -> impl Iterator<Item = EdgeId> + '_ {
        self.cells[id.index()].edges()
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.index()]
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId> {
        (0..self.edges.len()).map(EdgeId::new)
    }

    fn are_adjacent(&self, a: GridCoord, b: GridCoord) -> bool {
        let dx = a.x.abs_diff(b.x);
        let dy = a.y.abs_diff(b.y);
        let dz = a.z.abs_diff(b.z) as u32;
        dx + dy + dz == 1
    }

    /// The edge joining two grid-adjacent cells.
    pub fn edge_between(&self, a: CellId, b: CellId) -> Result<EdgeId, RouterError> {
        let ca = self.coord_of(a);
        let cb = self.coord_of(b);
        if !self.are_adjacent(ca, cb) {
            return Err(RouterError::NoSuchEdge(a, b));
        }
        let dir = if ca.x != cb.x {
            if ca.x < cb.x { Direction::IncX } else { Direction::DecX }
        } else if ca.y != cb.y {
            if ca.y < cb.y { Direction::IncY } else { Direction::DecY }
        } else if ca.z < cb.z {
            Direction::IncZ
        } else {
            Direction::DecZ
        };
        self.cells[a.index()]
            .edge(dir)
            .ok_or(RouterError::NoSuchEdge(a, b))
    }

    pub fn set_capacity(&mut self, edge: EdgeId, capacity: u32) {
        self.edges[edge.index()].capacity = capacity;
    }

    /// Records one crossing of `edge` by `net`.
    pub(crate) fn attach_net(&mut self, edge: EdgeId, net: NetId) {
        let e = &mut self.edges[edge.index()];
        e.usage += 1;
        e.nets.push(net);
    }

    /// Removes the crossing recorded by `attach_net`.
    pub(crate) fn detach_net(&mut self, edge: EdgeId, net: NetId) {
        let e = &mut self.edges[edge.index()];
        if let Some(pos) = e.nets.iter().position(|&n| n == net) {
            e.nets.remove(pos);
            e.usage -= 1;
        } else {
            debug_assert!(false, "net {:?} not routed through edge {:?}", net, edge);
        }
    }

    pub(crate) fn add_history(&mut self, edge: EdgeId, increment: Cost) {
        self.edges[edge.index()].history_cost += increment;
    }

    pub fn total_overflow(&self) -> u64 {
        self.edges.iter().map(|e| e.overflow() as u64).sum()
    }

    pub fn overfull_edges(&self) -> usize {
        self.edges.iter().filter(|e| e.is_overflowed()).count()
    }

    pub fn max_overflow(&self) -> u32 {
        self.edges.iter().map(|e| e.overflow()).max().unwrap_or(0)
    }

    /// Overflowed edges, worst first, ties by id.
    pub fn overflowed_edges(&self) -> Vec<EdgeId> {
        let mut ids: Vec<EdgeId> = self
            .edge_ids()
            .filter(|&id| self.edge(id).is_overflowed())
            .collect();
        ids.sort_by(|a, b| {
            self.edge(*b)
                .overflow()
                .cmp(&self.edge(*a).overflow())
                .then(a.cmp(b))
        });
        ids
    }

    /// Per (x, y) gcell, the highest usage/capacity ratio over the lateral
    /// edges touching it on any layer. Row major, `size_x * size_y` entries.
    pub fn congestion_map(&self) -> Vec<f32> {
        let mut map = vec![0.0f32; (self.size_x as usize) * (self.size_y as usize)];
        for e in self.edges.iter().filter(|e| !e.is_via()) {
            let ratio = if e.capacity == 0 {
                if e.usage == 0 { 0.0 } else { f32::INFINITY }
            } else {
                e.usage as f32 / e.capacity as f32
            };
            let (a, b) = e.cells();
            for cell in [a, b] {
                let c = self.coord_of(cell);
                let idx = (c.y * self.size_x + c.x) as usize;
                map[idx] = map[idx].max(ratio);
            }
        }
        map
    }
}

/// Raw capacity in tracks. Usage stays in nets, so the DLM projection in
/// `algo::cost` mixes this with the raw pitch.
fn to_tracks(raw: u32, pitch: u32) -> u32 {
    if pitch == 0 { raw } else { raw / pitch }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gcr_common::db::core::CapacityAdjustment;
    use std::collections::HashSet;

    fn grid(x: u32, y: u32, layers: usize) -> GridGraph {
        GridGraph::new(x, y, vec![LayerRules::uniform(2); layers]).unwrap()
    }

    #[test]
    fn id_and_coord_are_inverse() {
        let g = grid(4, 3, 2);
        for i in 0..g.num_cells() {
            let id = CellId::new(i);
            assert_eq!(g.cell_id(g.coord_of(id)), id);
            assert_eq!(g.cell(id).coord, g.coord_of(id));
        }
        assert_eq!(g.cell_id(GridCoord::new(1, 2, 1)), CellId::new(12 + 2 * 4 + 1));
    }

    #[test]
    fn edge_count_has_no_duplicates() {
        let g = grid(3, 3, 2);
        // per layer: 2*3 horizontal + 3*2 vertical; vias: 9
        assert_eq!(g.num_edges(), 2 * 12 + 9);
        let mut seen = HashSet::new();
        for e in g.edges() {
            let (a, b) = e.cells();
            assert_ne!(a, b);
            assert!(seen.insert((a.min(b), a.max(b))));
        }
    }

    #[test]
    fn neighbors_follow_fixed_order() {
        let g = grid(3, 3, 3);
        let center = g.cell_id(GridCoord::new(1, 1, 1));
        let coords: Vec<GridCoord> = g
            .neighbors(center)
            .map(|e| g.coord_of(g.edge(e).other(center)))
            .collect();
        assert_eq!(
            coords,
            vec![
                GridCoord::new(2, 1, 1),
                GridCoord::new(1, 2, 1),
                GridCoord::new(1, 1, 2),
                GridCoord::new(0, 1, 1),
                GridCoord::new(1, 0, 1),
                GridCoord::new(1, 1, 0),
            ]
        );

        let corner = g.cell_id(GridCoord::new(0, 0, 0));
        assert_eq!(g.neighbors(corner).count(), 3);
    }

    #[test]
    fn edge_between_adjacent_and_not() {
        let g = grid(3, 3, 2);
        let a = g.cell_id(GridCoord::new(0, 0, 0));
        let b = g.cell_id(GridCoord::new(1, 0, 0));
        let up = g.cell_id(GridCoord::new(0, 0, 1));
        let far = g.cell_id(GridCoord::new(2, 0, 0));
        let diag = g.cell_id(GridCoord::new(1, 1, 0));

        let e = g.edge_between(a, b).unwrap();
        assert_eq!(g.edge_between(b, a).unwrap(), e);
        assert_eq!(g.edge(e).kind, EdgeKind::Horizontal);
        assert_eq!(g.edge(g.edge_between(up, a).unwrap()).kind, EdgeKind::Via);

        assert_eq!(g.edge_between(a, far), Err(RouterError::NoSuchEdge(a, far)));
        assert_eq!(g.edge_between(a, diag), Err(RouterError::NoSuchEdge(a, diag)));
        assert!(g.edge_between(a, a).is_err());
    }

    #[test]
    fn zero_capacity_direction_has_no_edges() {
        let rules = vec![
            LayerRules {
                horizontal_capacity: 4,
                vertical_capacity: 0,
                ..LayerRules::default()
            },
            LayerRules {
                horizontal_capacity: 0,
                vertical_capacity: 4,
                ..LayerRules::default()
            },
        ];
        let g = GridGraph::new(2, 2, rules).unwrap();
        let a = g.cell_id(GridCoord::new(0, 0, 0));
        let up_y = g.cell_id(GridCoord::new(0, 1, 0));
        assert!(g.edge_between(a, up_y).is_err());
        assert!(
            g.edges()
                .iter()
                .filter(|e| e.layer == 1 && !e.is_via())
                .all(|e| e.kind == EdgeKind::Vertical)
        );
    }

    #[test]
    fn usage_tracks_attached_nets() {
        let mut g = grid(2, 1, 1);
        let e = EdgeId::new(0);
        g.attach_net(e, NetId::new(3));
        g.attach_net(e, NetId::new(5));
        g.attach_net(e, NetId::new(7));
        assert_eq!(g.edge(e).usage, 3);
        assert_eq!(g.total_overflow(), 1);
        assert_eq!(g.overflowed_edges(), vec![e]);

        g.detach_net(e, NetId::new(5));
        assert_eq!(g.edge(e).usage, 2);
        assert_eq!(g.edge(e).nets, vec![NetId::new(3), NetId::new(7)]);
        assert_eq!(g.overfull_edges(), 0);
    }

    #[test]
    fn overflowed_edges_sorted_worst_first() {
        let mut g = grid(3, 1, 1);
        let (e0, e1) = (EdgeId::new(0), EdgeId::new(1));
        for n in 0..3 {
            g.attach_net(e0, NetId::new(n));
        }
        for n in 0..5 {
            g.attach_net(e1, NetId::new(n));
        }
        assert_eq!(g.overflowed_edges(), vec![e1, e0]);
        assert_eq!(g.max_overflow(), 3);
    }

    #[test]
    fn from_design_converts_capacity_and_applies_adjustments() {
        let mut db = DesignDB::new();
        db.grid_x = 3;
        db.grid_y = 1;
        let z = db.add_layer(0, 20) as usize;
        db.layers[z].min_width = 1;
        db.layers[z].min_spacing = 1;
        db.adjustments.push(CapacityAdjustment {
            from: GridCoord::new(1, 0, 0),
            to: GridCoord::new(2, 0, 0),
            capacity: 4,
        });

        let g = GridGraph::from_design(&db).unwrap();
        let a = g.cell_id(GridCoord::new(0, 0, 0));
        let b = g.cell_id(GridCoord::new(1, 0, 0));
        let c = g.cell_id(GridCoord::new(2, 0, 0));
        assert_eq!(g.edge(g.edge_between(a, b).unwrap()).capacity, 10);
        assert_eq!(g.edge(g.edge_between(b, c).unwrap()).capacity, 2);
    }

    #[test]
    fn from_design_rejects_non_adjacent_adjustment() {
        let mut db = DesignDB::new();
        db.grid_x = 3;
        db.grid_y = 1;
        db.add_layer(0, 2);
        db.adjustments.push(CapacityAdjustment {
            from: GridCoord::new(0, 0, 0),
            to: GridCoord::new(2, 0, 0),
            capacity: 1,
        });
        assert!(matches!(
            GridGraph::from_design(&db),
            Err(RouterError::InvalidGrid(_))
        ));
    }

    #[test]
    fn congestion_map_takes_worst_edge() {
        let mut g = grid(2, 2, 1);
        let a = g.cell_id(GridCoord::new(0, 0, 0));
        let b = g.cell_id(GridCoord::new(1, 0, 0));
        let e = g.edge_between(a, b).unwrap();
        g.attach_net(e, NetId::new(0));
        let map = g.congestion_map();
        assert_eq!(map, vec![0.5, 0.5, 0.0, 0.0]);
    }
}
