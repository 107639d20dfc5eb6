use crate::algo::astar::MazeRouter;
use crate::algo::cost::CostModel;
use crate::error::RouterError;
use crate::grid::GridGraph;
use crate::net::Net;
use crate::utils::conversion::GridConverter;
use gcr_common::db::core::{DesignDB, PinData};
use gcr_common::db::indices::{EdgeId, NetId};
use gcr_common::geom::rect::GridRect;
use gcr_common::util::config::GlobalRoutingConfig;
use gcr_common::util::profiler::{Deadline, ScopedTimer};

const PROGRESS_MARKS: [usize; 5] = [10, 30, 50, 70, 90];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RoutingStats {
    pub routed_nets: usize,
    pub unrouted_nets: usize,
    pub total_overflow: u64,
    pub overfull_edges: usize,
    pub max_overflow: u32,
    /// Lateral edges over all committed paths.
    pub total_segments: usize,
    pub total_vias: usize,
}

/// Owns the grid and the nets and drives the routing phases over them.
/// All usage and history changes go through `commit_path`, `rip_up_net`
/// and the end of an RRR round.
pub struct GlobalRouter {
    grid: GridGraph,
    nets: Vec<Net>,
    maze: MazeRouter,
    config: GlobalRoutingConfig,
    deadline: Deadline,
}

impl GlobalRouter {
    /// Net ids are reassigned to match their position in `nets`.
    pub fn new(grid: GridGraph, mut nets: Vec<Net>, config: GlobalRoutingConfig) -> Self {
        for (i, net) in nets.iter_mut().enumerate() {
            net.id = NetId::new(i);
        }
        let maze = MazeRouter::new(&grid);
        let deadline = Deadline::new(config.time_out_secs);
        Self {
            grid,
            nets,
            maze,
            config,
            deadline,
        }
    }

    pub fn from_design(
        design: &DesignDB,
        config: &GlobalRoutingConfig,
    ) -> Result<Self, RouterError> {
        let grid = GridGraph::from_design(design)?;
        let converter = GridConverter::from_design(design);

        let mut nets = Vec::with_capacity(design.nets.len());
        let mut skipped = 0;
        let mut trivial = 0;
        for (index, data) in design.nets.iter().enumerate() {
            if data.pins.len() != 2 {
                log::warn!(
                    "Skipping net '{}': {} pins, only two-pin nets are routed",
                    data.name,
                    data.pins.len()
                );
                skipped += 1;
                continue;
            }

            let terminal = |pin: &PinData| {
                converter
                    .try_to_grid(pin.x, pin.y, pin.layer)
                    .filter(|c| grid.contains(*c))
                    .ok_or_else(|| RouterError::TerminalOutsideGrid {
                        net: data.name.clone(),
                        coord: converter.to_grid(pin.x, pin.y, pin.layer),
                    })
            };
            let source = terminal(&data.pins[0])?;
            let sink = terminal(&data.pins[1])?;

            if source == sink {
                log::debug!("Net '{}' lies inside one gcell", data.name);
                trivial += 1;
                continue;
            }

            let mut net = Net::new(NetId::new(nets.len()), data.name.clone(), source, sink);
            net.design_index = Some(index);
            nets.push(net);
        }

        log::info!(
            "Loaded {} routable nets ({} skipped, {} inside one gcell)",
            nets.len(),
            skipped,
            trivial
        );
        Ok(Self::new(grid, nets, config.clone()))
    }

    pub fn grid(&self) -> &GridGraph {
        &self.grid
    }

    pub fn nets(&self) -> &[Net] {
        &self.nets
    }

    pub fn net(&self, id: NetId) -> &Net {
        &self.nets[id.index()]
    }

    pub fn config(&self) -> &GlobalRoutingConfig {
        &self.config
    }

    pub fn set_deadline(&mut self, deadline: Deadline) {
        self.deadline = deadline;
    }

    /// Initial routing, RRR, then greedy improvement.
    pub fn run(&mut self) -> Result<RoutingStats, RouterError> {
        let _timer = ScopedTimer::new("Global routing");
        self.initial_routing()?;
        self.log_statistics("initial routing");

        self.rip_up_and_reroute()?;
        self.log_statistics("rip-up and reroute");

        self.greedy_improvement()?;
        self.log_statistics("greedy improvement");

        for err in self.unrouted() {
            log::warn!("{}", err);
        }
        Ok(self.statistics())
    }

    /// Routes every unrouted net once, smallest terminal box first.
    pub fn initial_routing(&mut self) -> Result<(), RouterError> {
        let _timer = ScopedTimer::new("Initial routing");
        let cost = CostModel::new(self.config.initial_cost, &self.config.cost);
        let allow_overflow = self.config.initial_allow_overflow;

        let mut order: Vec<usize> = (0..self.nets.len())
            .filter(|&i| !self.nets[i].routed)
            .collect();
        order.sort_by_key(|&i| (self.nets[i].terminal_box().half_perimeter(), i));

        log::info!(
            "Initial routing of {} nets ({:?} cost, overflow {})",
            order.len(),
            cost.kind,
            if allow_overflow { "allowed" } else { "forbidden" }
        );

        let total = order.len();
        let mut next_mark = 0;
        let mut failed = 0;
        for (done, idx) in order.into_iter().enumerate() {
            match self.route_net(idx, &cost, allow_overflow) {
                Ok(()) => {}
                Err(e @ RouterError::RouteNotFound(_)) => {
                    log::debug!("Initial routing: {}", e);
                    failed += 1;
                }
                Err(e) => return Err(e),
            }

            let pct = (done + 1) * 100 / total;
            while next_mark < PROGRESS_MARKS.len() && pct >= PROGRESS_MARKS[next_mark] {
                log::info!(
                    "Initial routing {}% ({}/{}), overflow {}",
                    PROGRESS_MARKS[next_mark],
                    done + 1,
                    total,
                    self.grid.total_overflow()
                );
                next_mark += 1;
            }
        }

        if failed > 0 {
            log::warn!("{} nets left unrouted by initial routing", failed);
        }
        Ok(())
    }

    /// Runs RRR rounds until nothing overflows, the iteration cap is hit or
    /// the deadline passes. Returns the number of rounds run.
    pub fn rip_up_and_reroute(&mut self) -> Result<usize, RouterError> {
        let _timer = ScopedTimer::new("Rip-up and reroute");
        let cost = CostModel::dlm(&self.config.cost);

        let mut rounds = 0;
        for iter in 0..self.config.max_rip_iterations {
            if self.is_converged() {
                log::info!("RRR converged before round {}", iter);
                break;
            }
            if self.deadline.is_expired() {
                log::warn!(
                    "RRR stopped by time-out after {:.1}s, {} edges still overflow",
                    self.deadline.elapsed_secs(),
                    self.grid.overfull_edges()
                );
                break;
            }

            let rerouted = self.rrr_round(&cost)?;
            rounds += 1;
            log::info!(
                "RRR round {}: rerouted {}, overflow {}, overfull edges {}, max overflow {}",
                iter,
                rerouted,
                self.grid.total_overflow(),
                self.grid.overfull_edges(),
                self.grid.max_overflow()
            );

            if self.grid.total_overflow() == 0 {
                log::info!("RRR converged after round {}", iter);
                break;
            }
        }
        Ok(rounds)
    }

    /// One RRR round. Retries unrouted nets, then rips up and reroutes nets
    /// on each overflowed edge (worst first) until that edge fits, then
    /// raises the history cost of every edge still overflowing. Returns the
    /// number of nets routed during the round.
    pub fn rrr_round(&mut self, cost: &CostModel) -> Result<usize, RouterError> {
        let mut rerouted = 0;

        let pending: Vec<usize> = (0..self.nets.len())
            .filter(|&i| !self.nets[i].routed)
            .collect();
        for idx in pending {
            match self.route_net(idx, cost, true) {
                Ok(()) => rerouted += 1,
                Err(RouterError::RouteNotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }

        for edge in self.grid.overflowed_edges() {
            let crossing = self.grid.edge(edge).nets.clone();
            for net in crossing {
                if !self.grid.edge(edge).is_overflowed() {
                    break;
                }
                // Already moved off this edge earlier in the round.
                if !self.grid.edge(edge).nets.contains(&net) {
                    continue;
                }
                self.rip_up_net(net);
                match self.route_net(net.index(), cost, true) {
                    Ok(()) => rerouted += 1,
                    Err(e @ RouterError::RouteNotFound(_)) => {
                        log::warn!("Rip-up of '{}': {}", self.nets[net.index()].name, e);
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        let increment = self.config.history_increment;
        for edge in self.grid.overflowed_edges() {
            self.grid.add_history(edge, increment);
        }
        Ok(rerouted)
    }

    /// Up to `max_greedy_iterations` passes that reroute each net inside its
    /// own bounding box without overflow and keep the result only when it is
    /// strictly cheaper. Returns the number of improved nets.
    pub fn greedy_improvement(&mut self) -> Result<usize, RouterError> {
        let _timer = ScopedTimer::new("Greedy improvement");
        let cost = CostModel::dlm(&self.config.cost);

        let mut total = 0;
        for pass in 0..self.config.max_greedy_iterations {
            if self.deadline.is_expired() {
                log::warn!("Greedy improvement stopped by time-out");
                break;
            }
            let mut improved = 0;
            for idx in 0..self.nets.len() {
                if self.nets[idx].routed && self.improve_net(idx, &cost)? {
                    improved += 1;
                }
            }
            log::info!("Greedy pass {}: improved {} nets", pass, improved);
            total += improved;
            if improved == 0 {
                break;
            }
        }
        Ok(total)
    }

    fn improve_net(&mut self, idx: usize, cost: &CostModel) -> Result<bool, RouterError> {
        let id = self.nets[idx].id;
        let old_path = self.rip_up_net(id);
        let old_cost = cost.path_cost(&self.grid, &old_path, false);
        let bbox = self.path_box(idx, &old_path);

        let result = self
            .maze
            .route(&self.grid, &self.nets[idx], false, &bbox, cost)?;
        if result.is_found() {
            let new_cost = cost.path_cost(&self.grid, &result.path, false);
            if new_cost < old_cost {
                log::debug!(
                    "Net '{}' improved {:.2} -> {:.2}",
                    self.nets[idx].name,
                    old_cost,
                    new_cost
                );
                self.commit_path(id, result.path);
                return Ok(true);
            }
        }
        self.commit_path(id, old_path);
        Ok(false)
    }

    /// Routes net `idx` inside its margin box, then the whole grid, and
    /// commits the first path found. `RouteNotFound` leaves the net unrouted.
    fn route_net(
        &mut self,
        idx: usize,
        cost: &CostModel,
        allow_overflow: bool,
    ) -> Result<(), RouterError> {
        let whole = self.whole_grid();
        let margin_box = self.nets[idx].terminal_box().expand(
            self.config.bbox_margin,
            self.grid.size_x(),
            self.grid.size_y(),
        );

        for bbox in [margin_box, whole] {
            let result = self
                .maze
                .route(&self.grid, &self.nets[idx], allow_overflow, &bbox, cost)?;
            if result.is_found() {
                log::trace!(
                    "Net '{}' routed: {} edges, cost {:.2}, {} cells expanded",
                    self.nets[idx].name,
                    result.path.len(),
                    result.cost,
                    result.expanded
                );
                let id = self.nets[idx].id;
                self.commit_path(id, result.path);
                return Ok(());
            }
            if bbox == whole {
                break;
            }
        }
        Err(RouterError::RouteNotFound(self.nets[idx].id))
    }

    /// Records `path` as the route of `net`, replacing any previous route.
    pub fn commit_path(&mut self, net: NetId, path: Vec<EdgeId>) {
        if self.nets[net.index()].routed {
            self.rip_up_net(net);
        }
        for &edge in &path {
            self.grid.attach_net(edge, net);
        }
        let n = &mut self.nets[net.index()];
        n.path = path;
        n.routed = true;
    }

    /// Removes the route of `net` from the grid and returns it.
    pub fn rip_up_net(&mut self, net: NetId) -> Vec<EdgeId> {
        let n = &mut self.nets[net.index()];
        let path = std::mem::take(&mut n.path);
        n.routed = false;
        for &edge in &path {
            self.grid.detach_net(edge, net);
        }
        path
    }

    fn whole_grid(&self) -> GridRect {
        GridRect::new(0, 0, self.grid.size_x() - 1, self.grid.size_y() - 1)
    }

    /// Box over the terminals of net `idx` and every cell on `path`.
    fn path_box(&self, idx: usize, path: &[EdgeId]) -> GridRect {
        let net = &self.nets[idx];
        let cells = path.iter().flat_map(|&e| {
            let (a, b) = self.grid.edge(e).cells();
            [self.grid.coord_of(a), self.grid.coord_of(b)]
        });
        GridRect::bounding(cells.chain([net.source, net.sink]))
            .unwrap_or_else(|| net.terminal_box())
    }

    fn is_converged(&self) -> bool {
        self.grid.total_overflow() == 0 && self.nets.iter().all(|n| n.routed)
    }

    pub fn statistics(&self) -> RoutingStats {
        let mut stats = RoutingStats {
            total_overflow: self.grid.total_overflow(),
            overfull_edges: self.grid.overfull_edges(),
            max_overflow: self.grid.max_overflow(),
            ..RoutingStats::default()
        };
        for net in &self.nets {
            if !net.routed {
                stats.unrouted_nets += 1;
                continue;
            }
            stats.routed_nets += 1;
            let vias = net
                .path
                .iter()
                .filter(|&&e| self.grid.edge(e).is_via())
                .count();
            stats.total_vias += vias;
            stats.total_segments += net.path.len() - vias;
        }
        stats
    }

    pub fn log_statistics(&self, label: &str) {
        let s = self.statistics();
        log::info!(
            "[{}] routed {}/{}, overflow {} on {} edges (max {}), segments {}, vias {}, {:.1}s",
            label,
            s.routed_nets,
            s.routed_nets + s.unrouted_nets,
            s.total_overflow,
            s.overfull_edges,
            s.max_overflow,
            s.total_segments,
            s.total_vias,
            self.deadline.elapsed_secs()
        );
    }

    /// One `CapacityExceededPermanently` per net still unrouted.
    pub fn unrouted(&self) -> Vec<RouterError> {
        self.nets
            .iter()
            .filter(|n| !n.routed)
            .map(|n| RouterError::CapacityExceededPermanently(n.id))
            .collect()
    }
}
