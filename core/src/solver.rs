//! The recursive search driver: DLX by default, with a bitmask tiling
//! accelerator (MCH / estimated-MCH / de Bruijn) once few enough cells
//! remain, plus filter/backtrack orchestration.

use log::{info, trace};
use smallvec::SmallVec;

use crate::dlx::{ColumnTag, DlxMatrix, PlaceOutcome};
use crate::grid::{Grid, GridPointId};
use crate::heuristic::HeuristicTable;
use crate::image::{Image, ImageId};
use crate::parity::ParityMonitor;
use crate::piece::{Shape, ShapeId};
use crate::rng::SplitMix64;
use crate::stats::{take_print_stats_request, take_print_trace_request, Stats};
use crate::volume::VolumeMonitor;

/// `N` (run while `k >= N`), `-1` (run only on the very first frame), or
/// `0` (never run) — translated at construction into a plain threshold the
/// same way the recursion compares it against `k`.
#[derive(Clone, Copy, Debug)]
pub enum FilterThreshold {
    Off,
    Once,
    At(u32),
}

impl FilterThreshold {
    pub(crate) fn control(self, num_mobile: u32) -> u32 {
        match self {
            FilterThreshold::Off => num_mobile + 1,
            FilterThreshold::Once => num_mobile,
            FilterThreshold::At(n) => n,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SolverConfig {
    pub bruijn: u32,
    pub emch: u32,
    pub mch: u32,
    pub fit_filter: FilterThreshold,
    pub parity_filter: FilterThreshold,
    pub volume_filter: FilterThreshold,
    pub parity_backtrack: bool,
    /// `0` disables; otherwise the minimum remaining-piece count at which a
    /// volume check runs after every placement.
    pub volume_backtrack: u32,
    pub goal: u32,
    pub heuristics: HeuristicTable,
    /// Mirrors `trace=K`. Rendering is left to the embedder via
    /// `log::trace!`; `0` disables.
    pub trace: i32,
    /// `redundancyFilterFirst`: force this shape's column to be picked ahead
    /// of the ordering heuristic whenever it still has live rows.
    pub priority_shape: Option<ShapeId>,
}

impl SolverConfig {
    pub fn new(heuristics: HeuristicTable) -> SolverConfig {
        SolverConfig {
            bruijn: 0,
            emch: 0,
            mch: 0,
            fit_filter: FilterThreshold::Off,
            parity_filter: FilterThreshold::Off,
            volume_filter: FilterThreshold::Off,
            parity_backtrack: false,
            volume_backtrack: 0,
            goal: 0,
            heuristics,
            trace: 0,
            priority_shape: None,
        }
    }
}

/// A completed placement: the images in placement order, ready for
/// `Puzzle::state_vector` to resolve into named pieces.
pub type Placement = Vec<ImageId>;

const WORD_BITS: usize = 64;

/// One legal placement prepared for the bitmask driver: its occupancy mask
/// over the cells still unfilled at the moment of the DLX→tiling morph, plus
/// its anchor (lex-smallest covered cell, for the de Bruijn driver).
struct TilingImage {
    image_id: ImageId,
    shape_id: ShapeId,
    mask: u64,
    anchor_bit: u8,
}

/// Built once at the DLX→tiling transition for the current recursion
/// subtree. Cheap to rebuild per transition since it only covers the
/// (small, by construction) remaining-cell set.
struct TilingContext {
    bit_of: std::collections::HashMap<GridPointId, u8>,
    cell_of_bit: Vec<GridPointId>,
    /// All currently-available images, indexed by the bit of their anchor.
    bruijn_images: Vec<Vec<TilingImage>>,
    /// All currently-available images covering each bit.
    mch_images: Vec<Vec<usize>>,
    /// Flat storage so `mch_images` can hold lightweight indices.
    all_images: Vec<TilingImage>,
    neighbour_bits: Vec<u64>,
}

impl TilingContext {
    fn build(grid: &Grid, shapes: &[Shape], images: &[Image]) -> TilingContext {
        let unfilled: Vec<GridPointId> = grid
            .points
            .iter()
            .filter(|p| p.is_unoccupied())
            .map(|p| p.id)
            .collect();
        debug_assert!(unfilled.len() <= WORD_BITS);

        let mut bit_of = std::collections::HashMap::new();
        let mut cell_of_bit = Vec::with_capacity(unfilled.len());
        for (bit, &id) in unfilled.iter().enumerate() {
            bit_of.insert(id, bit as u8);
            cell_of_bit.push(id);
        }

        let mut neighbour_bits = vec![0u64; unfilled.len()];
        for (bit, &id) in unfilled.iter().enumerate() {
            let mut mask = 0u64;
            for n in &grid.get(id).neighbours {
                if let Some(&nb) = bit_of.get(n) {
                    mask |= 1u64 << nb;
                }
            }
            neighbour_bits[bit] = mask;
        }

        let remaining_shapes: std::collections::HashSet<ShapeId> =
            shapes.iter().filter(|s| s.remaining_copies > 0).map(|s| s.id).collect();

        let mut all_images = Vec::new();
        for image in images {
            if !remaining_shapes.contains(&image.shape_id) {
                continue;
            }
            let mut mask = 0u64;
            let mut ok = true;
            for cell in &image.cells {
                match bit_of.get(cell) {
                    Some(&bit) => mask |= 1u64 << bit,
                    None => {
                        ok = false;
                        break;
                    }
                }
            }
            if !ok {
                continue;
            }
            let anchor_bit = bit_of[&image.anchor()];
            all_images.push(TilingImage {
                image_id: image.id,
                shape_id: image.shape_id,
                mask,
                anchor_bit,
            });
        }

        let mut mch_images = vec![Vec::new(); unfilled.len()];
        let mut bruijn_by_bit: Vec<Vec<usize>> = vec![Vec::new(); unfilled.len()];
        for (idx, img) in all_images.iter().enumerate() {
            for bit in 0..unfilled.len() {
                if img.mask & (1u64 << bit) != 0 {
                    mch_images[bit].push(idx);
                }
            }
            bruijn_by_bit[img.anchor_bit as usize].push(idx);
        }

        let bruijn_images: Vec<Vec<TilingImage>> = bruijn_by_bit
            .into_iter()
            .map(|idxs| {
                idxs.into_iter()
                    .map(|i| TilingImage {
                        image_id: all_images[i].image_id,
                        shape_id: all_images[i].shape_id,
                        mask: all_images[i].mask,
                        anchor_bit: all_images[i].anchor_bit,
                    })
                    .collect()
            })
            .collect();

        TilingContext {
            bit_of,
            cell_of_bit,
            bruijn_images,
            mch_images,
            all_images,
            neighbour_bits,
        }
    }

    fn cell(&self, bit: u8) -> GridPointId {
        self.cell_of_bit[bit as usize]
    }
}

#[derive(Debug)]
pub struct Solver {
    grid: Grid,
    images: Vec<Image>,
    shapes: Vec<Shape>,
    dlx: DlxMatrix,
    config: SolverConfig,
    num_mobile: u32,
    fit_filter_control: u32,
    parity_filter_control: u32,
    volume_filter_control: u32,
    volume_backtrack_control: u32,
    parity: Option<ParityMonitor>,
    volume: Option<VolumeMonitor>,
    parity_target: i32,
    image_stack: Vec<ImageId>,
    pub stats: Stats,
    pub solutions: Vec<Placement>,
    monte_carlo_range: Option<u32>,
    end_trial: bool,
}

impl Solver {
    /// `images` must be indexed by `ImageId.0` (one contiguous arena built
    /// once at puzzle construction and never touched again).
    pub fn new(
        grid: Grid,
        shapes: Vec<Shape>,
        images: Vec<Image>,
        grid_point_ids: Vec<GridPointId>,
        config: SolverConfig,
    ) -> Solver {
        let num_mobile: u32 = shapes.iter().map(|s| s.remaining_copies).sum();
        let shape_counts: Vec<(ShapeId, u32)> =
            shapes.iter().map(|s| (s.id, s.remaining_copies)).collect();
        let dlx = DlxMatrix::build(&grid_point_ids, &shape_counts, &images);

        let fit_filter_control = config.fit_filter.control(num_mobile);
        let parity_filter_control = config.parity_filter.control(num_mobile);
        let volume_filter_control = config.volume_filter.control(num_mobile);
        let volume_backtrack_control = if config.volume_backtrack > 0 {
            config.volume_backtrack
        } else {
            num_mobile + 1
        };

        let parity_place_control = if config.parity_backtrack {
            0
        } else {
            parity_filter_control
        };
        let volume_place_control = volume_backtrack_control.min(volume_filter_control);

        let magnitudes: Vec<i32> = shapes
            .iter()
            .flat_map(|s| {
                std::iter::repeat(s.representative.parity().abs()).take(s.remaining_copies as usize)
            })
            .collect();
        let sizes: Vec<u32> = shapes
            .iter()
            .flat_map(|s| std::iter::repeat(s.representative.size() as u32).take(s.remaining_copies as usize))
            .collect();

        let parity = if parity_place_control <= num_mobile {
            Some(ParityMonitor::new(&magnitudes))
        } else {
            None
        };
        let volume = if volume_place_control <= num_mobile {
            Some(VolumeMonitor::new(&sizes))
        } else {
            None
        };

        let parity_target: i32 = grid.points.iter().map(|gp| gp.point.parity()).sum();

        Solver {
            grid,
            images,
            shapes,
            dlx,
            config,
            num_mobile,
            fit_filter_control,
            parity_filter_control,
            volume_filter_control,
            volume_backtrack_control,
            parity,
            volume,
            parity_target,
            image_stack: Vec::new(),
            stats: Stats::new(num_mobile as usize),
            solutions: Vec::new(),
            monte_carlo_range: None,
            end_trial: false,
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn image(&self, id: ImageId) -> &Image {
        &self.images[id.0 as usize]
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    /// Run the search once (no Monte Carlo sampling).
    pub fn solve(&mut self) {
        self.recurse(self.num_mobile);
    }

    /// Randomize DLX row order, run to the first branch crossing `range`
    /// remaining pieces, unwind fully, repeat `trials` times.
    pub fn solve_monte_carlo(&mut self, trials: u32, range: u32, seed: u64) {
        let mut rng = SplitMix64::new(seed);
        self.monte_carlo_range = Some(range);
        for _ in 0..trials {
            self.dlx.randomize(&mut rng);
            self.end_trial = false;
            self.solve();
            self.stats
                .monte_carlo_trials
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
        self.monte_carlo_range = None;
    }

    fn check_volume(&mut self) -> bool {
        let Some(volume) = &self.volume else { return true };
        let regions = self.grid.flood_fill_regions();
        regions.iter().all(|&size| volume.check(size as u32))
    }

    fn recurse(&mut self, k: u32) {
        if self.end_trial {
            return;
        }
        if take_print_stats_request() {
            self.log_stats();
        }
        if take_print_trace_request() {
            self.log_trace(k);
        }
        if self.config.goal > 0 && k == self.config.goal {
            self.record_solution();
            return;
        }
        if k == 0 {
            self.record_solution();
            return;
        }

        if self.config.parity_backtrack {
            if let Some(parity) = &self.parity {
                if !parity.check(self.parity_target) {
                    self.stats.record_parity_backtrack(k as usize);
                    return;
                }
            }
        }
        if k >= self.volume_backtrack_control && !self.check_volume() {
            self.stats.record_volume_backtrack(k as usize);
            return;
        }

        let filter_depth0 = self.dlx.filter_depth();
        if k >= self.parity_filter_control {
            self.filter_parity(k);
        }
        if k >= self.volume_filter_control {
            self.filter_volume(k);
        }
        if k >= self.fit_filter_control {
            self.filter_fit();
        }

        if self.can_enter_tiling(k) {
            let ctx = TilingContext::build(&self.grid, &self.shapes, &self.images);
            let occ = 0u64;
            self.recurse_tiling(&ctx, occ, k);
        } else {
            self.recurse_dlx(k);
        }

        self.dlx.unfilter_to(filter_depth0);
    }

    fn recurse_dlx(&mut self, k: u32) {
        let priority = self.config.priority_shape.and_then(|shape_id| {
            self.dlx.columns().find(|&h| {
                matches!(self.dlx.column_tag(h), ColumnTag::Shape(s) if s == shape_id)
                    && self.dlx.column_num_row(h) > 0
            })
        });
        let best = match priority {
            Some(h) => h,
            None => {
                let heuristic = self.config.heuristics.active(k);
                match heuristic.select(&self.dlx, &self.grid) {
                    Some(h) => h,
                    None => return,
                }
            }
        };
        if self.dlx.column_num_row(best) == 0 {
            return;
        }

        let rows: Vec<u32> = self.dlx.rows_of(best).collect();
        for row in rows {
            if self.end_trial {
                break;
            }
            self.stats.record_attempt((k - 1) as usize);
            self.stats.record_fit((k - 1) as usize);

            let image_id = self.dlx.row_image(row);
            let outcome: PlaceOutcome = self.dlx.place(row);
            self.do_place(image_id);
            self.maybe_trace(k - 1);

            self.recurse(k - 1);

            self.maybe_trace(k - 1);
            self.do_unplace(image_id);
            self.dlx.unplace(row, outcome);

            if let Some(range) = self.monte_carlo_range {
                if range == k - 1 {
                    self.end_trial = true;
                }
            }
        }
    }

    /// Tiling-mode recursion: selects MCH / estimated-MCH / de Bruijn by
    /// `k` against the configured thresholds and recurses purely over the
    /// bitmask `occ`, never touching the frozen DLX matrix.
    fn recurse_tiling(&mut self, ctx: &TilingContext, occ: u64, k: u32) {
        if self.end_trial {
            return;
        }
        if self.config.goal > 0 && k == self.config.goal {
            self.record_solution();
            return;
        }
        if k == 0 {
            self.record_solution();
            return;
        }

        let unfilled_bits: Vec<u8> = (0..ctx.cell_of_bit.len() as u8)
            .filter(|&b| occ & (1u64 << b) == 0)
            .collect();
        if unfilled_bits.is_empty() {
            return;
        }

        // De Bruijn images live in a separate owned-per-bit list rather than
        // `ctx.all_images` indices (they're partitioned by anchor, not by
        // coverage), so that branch recurses through its own helper instead
        // of joining the `candidates: Vec<usize>` path below.
        if k <= self.config.bruijn {
            let lex_smallest = *unfilled_bits.iter().min().unwrap();
            return self.recurse_tiling_bruijn(ctx, occ, k, lex_smallest);
        }

        let candidates: Vec<usize> = {
            let bit_pool: Vec<u8> = if k <= self.config.emch {
                let min_nbr = unfilled_bits
                    .iter()
                    .map(|&b| (ctx.neighbour_bits[b as usize] & !occ).count_ones())
                    .min()
                    .unwrap();
                unfilled_bits
                    .iter()
                    .copied()
                    .filter(|&b| (ctx.neighbour_bits[b as usize] & !occ).count_ones() == min_nbr)
                    .collect()
            } else {
                unfilled_bits.clone()
            };

            let mut best_bit = bit_pool[0];
            let mut best_count = usize::MAX;
            for &b in &bit_pool {
                let count = ctx.mch_images[b as usize]
                    .iter()
                    .filter(|&&i| ctx.all_images[i].mask & occ == 0)
                    .count();
                if count < best_count {
                    best_count = count;
                    best_bit = b;
                }
            }
            ctx.mch_images[best_bit as usize]
                .iter()
                .copied()
                .filter(|&i| ctx.all_images[i].mask & occ == 0)
                .collect()
        };

        for idx in candidates {
            if self.end_trial {
                break;
            }
            let img = &ctx.all_images[idx];
            let image_id = img.image_id;
            let mask = img.mask;
            self.stats.record_attempt((k - 1) as usize);
            self.stats.record_fit((k - 1) as usize);

            self.do_place(image_id);
            self.maybe_trace(k - 1);
            self.recurse_tiling(ctx, occ | mask, k - 1);
            self.maybe_trace(k - 1);
            self.do_unplace(image_id);

            if let Some(range) = self.monte_carlo_range {
                if range == k - 1 {
                    self.end_trial = true;
                }
            }
        }
    }

    fn recurse_tiling_bruijn(&mut self, ctx: &TilingContext, occ: u64, k: u32, anchor_bit: u8) {
        let images = &ctx.bruijn_images[anchor_bit as usize];
        for img in images {
            if img.mask & occ != 0 {
                continue;
            }
            if self.end_trial {
                break;
            }
            let image_id = img.image_id;
            let mask = img.mask;
            self.stats.record_attempt((k - 1) as usize);
            self.stats.record_fit((k - 1) as usize);

            self.do_place(image_id);
            self.maybe_trace(k - 1);
            self.recurse_tiling(ctx, occ | mask, k - 1);
            self.maybe_trace(k - 1);
            self.do_unplace(image_id);

            if let Some(range) = self.monte_carlo_range {
                if range == k - 1 {
                    self.end_trial = true;
                }
            }
        }
    }

    fn do_place(&mut self, image_id: ImageId) {
        let stamp = self.image_stack.len() as i32;
        let image = &self.images[image_id.0 as usize];
        let cells: SmallVec<[GridPointId; 24]> = image.cells.clone();
        let parity = image.parity;
        let size = image.size() as u32;
        for &c in &cells {
            self.grid.occupy(c, stamp);
        }
        if let Some(p) = &mut self.parity {
            p.place(parity.abs());
        }
        if let Some(v) = &mut self.volume {
            v.place(size);
        }
        self.parity_target -= parity;
        self.image_stack.push(image_id);
    }

    fn do_unplace(&mut self, image_id: ImageId) {
        self.image_stack.pop();
        let image = &self.images[image_id.0 as usize];
        let cells: SmallVec<[GridPointId; 24]> = image.cells.clone();
        let parity = image.parity;
        let size = image.size() as u32;
        self.parity_target += parity;
        if let Some(v) = &mut self.volume {
            v.unplace(size);
        }
        if let Some(p) = &mut self.parity {
            p.unplace(parity.abs());
        }
        for &c in &cells {
            self.grid.vacate(c);
        }
    }

    /// Answer a SIGUSR1 request: dump the per-remaining-piece-count counters
    /// at `log::info!` level so a long-running search can be inspected
    /// without stopping it.
    fn log_stats(&self) {
        info!("-- running statistics --");
        for (remaining, row) in self.stats.rows() {
            use std::sync::atomic::Ordering;
            info!(
                "remaining={remaining} attempts={} fits={} filters={} parity_backtracks={} volume_backtracks={}",
                row.attempts.load(Ordering::Relaxed),
                row.fits.load(Ordering::Relaxed),
                row.filters.load(Ordering::Relaxed),
                row.parity_backtracks.load(Ordering::Relaxed),
                row.volume_backtracks.load(Ordering::Relaxed),
            );
        }
    }

    /// Answer a SIGUSR2 request: dump the current partial placement.
    fn log_trace(&self, remaining: u32) {
        info!(
            "-- partial placement at depth {remaining}: {} images placed --",
            self.image_stack.len()
        );
        for &image_id in &self.image_stack {
            info!("  shape={:?} image={:?}", self.images[image_id.0 as usize].shape_id, image_id);
        }
    }

    fn maybe_trace(&self, remaining: u32) {
        let k_trace = self.config.trace;
        if k_trace == 0 {
            return;
        }
        let show = if k_trace > 0 {
            remaining >= (k_trace - 1) as u32
        } else {
            remaining as i32 == -k_trace - 1
        };
        if show {
            trace!(
                "placement depth {remaining}: {} images on stack",
                self.image_stack.len()
            );
        }
    }

    fn record_solution(&mut self) {
        self.stats.record_solution();
        self.solutions.push(self.image_stack.clone());
    }

    // --- lookahead filters ---------------------------------------------
    //
    // Each filter considers every still-live DLX row exactly once and hides
    // (via `filter_row`) any row whose placement is already known to be
    // unsatisfiable one step ahead, so the recursive step never wastes a
    // branch on it. Volume and parity run before fit because they tend to
    // shrink the row set the fit check then scans.

    fn filter_parity(&mut self, k: u32) {
        let _ = k;
        let Some(parity) = &mut self.parity else { return };
        for row in self.dlx.live_rows() {
            let image = &self.images[self.dlx.row_image(row).0 as usize];
            let magnitude = image.parity.abs();
            let target = self.parity_target - image.parity;
            parity.place(magnitude);
            let reachable = parity.check(target);
            parity.unplace(magnitude);
            if !reachable {
                self.dlx.filter_row(row);
                self.stats.record_filter(k as usize);
            }
        }
    }

    fn filter_volume(&mut self, k: u32) {
        if self.volume.is_none() {
            return;
        }
        for row in self.dlx.live_rows() {
            let image = &self.images[self.dlx.row_image(row).0 as usize];
            let cells: SmallVec<[GridPointId; 24]> = image.cells.clone();
            let size = image.size() as u32;
            let stamp = self.image_stack.len() as i32;
            for &c in &cells {
                self.grid.occupy(c, stamp);
            }
            self.volume.as_mut().unwrap().place(size);
            let regions = self.grid.flood_fill_regions();
            let ok = regions
                .iter()
                .all(|&sz| self.volume.as_ref().unwrap().check(sz as u32));
            self.volume.as_mut().unwrap().unplace(size);
            for &c in &cells {
                self.grid.vacate(c);
            }
            if !ok {
                self.dlx.filter_row(row);
                self.stats.record_filter(k as usize);
            }
        }
    }

    fn filter_fit(&mut self) {
        for row in self.dlx.live_rows() {
            let headers = self.dlx.row_headers(row);
            let cell_headers: Vec<_> = headers
                .iter()
                .copied()
                .filter(|&h| matches!(self.dlx.column_tag(h), ColumnTag::GridPoint(_)))
                .collect();
            for &h in &cell_headers {
                self.dlx.cover(h);
            }
            let dead = self.dlx.columns().any(|h| {
                matches!(self.dlx.column_tag(h), ColumnTag::GridPoint(_))
                    && self.dlx.column_num_row(h) == 0
            });
            for &h in cell_headers.iter().rev() {
                self.dlx.uncover(h);
            }
            if dead {
                self.dlx.filter_row(row);
            }
        }
    }

    /// DLX→tiling transition condition: `k <= mch`, the
    /// remaining unfilled cells fit in a machine word, and the best DLX
    /// column still has at least 2 live rows (otherwise DLX's single-row
    /// step is already cheaper than building the tiling context).
    fn can_enter_tiling(&self, k: u32) -> bool {
        if k > self.config.mch {
            return false;
        }
        let unfilled = self.grid.points.iter().filter(|p| p.is_unoccupied()).count();
        if unfilled > WORD_BITS {
            return false;
        }
        let heuristic = self.config.heuristics.active(k);
        match heuristic.select(&self.dlx, &self.grid) {
            Some(best) => self.dlx.column_num_row(best) >= 2,
            None => false,
        }
    }
}
