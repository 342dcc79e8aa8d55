//! Instance generation: grids, candidate sets, and the acceptance gate.
//!
//! A puzzle is three rows of five panels. The first two columns of every row
//! are sampled independently; the remaining three are derived by applying
//! one rule-group set per column to the row built so far. The hidden answer
//! is the final panel of the final row. An instance is only emitted when the
//! checker re-derives the answer as the unique best-scoring candidate, so
//! every accepted puzzle is solvable and unambiguous by construction.

use std::fmt;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashSet;
use tracing::{debug, warn};

use crate::aot::Panel;
use crate::configs::PanelConfig;
use crate::rules::{ApplyError, Rule, RuleAttr, RuleGroup, RuleKind};
use crate::sampling;
use crate::solver;

pub const ROWS: usize = 3;
pub const COLS: usize = 5;
pub const BASE_COLS: usize = 2;
pub const CANDIDATES: usize = 8;

const PERTURB_RETRIES: usize = 10;

/// Retry budgets for one generation call.
#[derive(Debug, Clone, Copy)]
pub struct GenLimits {
    /// Rule-group proposals per derived column before giving up.
    pub max_rule_proposals: usize,
    /// Whole-instance attempts (grid + candidates + verification).
    pub max_attempts: usize,
    /// Candidate-perturbation draws while filling the answer set.
    pub max_distractor_attempts: usize,
}

impl Default for GenLimits {
    fn default() -> Self {
        Self {
            max_rule_proposals: 64,
            max_attempts: 32,
            max_distractor_attempts: 200,
        }
    }
}

/// Failure to produce an acceptable instance within the limits.
#[derive(Debug)]
pub enum GenError {
    /// No feasible rule-group set exists for the configuration within the
    /// proposal budget.
    Infeasible { config: &'static str },
    /// Every instance attempt was rejected (rule failures or ambiguity).
    LimitExceeded { config: &'static str, attempts: usize },
    /// The candidate pool could not be filled with structurally distinct
    /// panels.
    InsufficientCandidates { have: usize },
}

impl fmt::Display for GenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenError::Infeasible { config } => {
                write!(f, "no feasible rule groups for configuration {config}")
            }
            GenError::LimitExceeded { config, attempts } => write!(
                f,
                "gave up on configuration {config} after {attempts} rejected attempts"
            ),
            GenError::InsufficientCandidates { have } => write!(
                f,
                "candidate pool stuck at {have} of {CANDIDATES} distinct panels"
            ),
        }
    }
}

impl std::error::Error for GenError {}

/// A complete, verified instance.
#[derive(Debug, Clone)]
pub struct Puzzle {
    pub config: &'static str,
    pub seed: u64,
    /// `ROWS x COLS` panels; the last panel of the last row duplicates the
    /// answer candidate.
    pub grid: Vec<Vec<Panel>>,
    /// One rule-group set per derived column, shared by all rows.
    pub column_rules: Vec<Vec<RuleGroup>>,
    pub candidates: Vec<Panel>,
    pub answer_index: usize,
}

impl Puzzle {
    /// The two panels preceding the hidden one in the final row.
    #[inline]
    pub fn context(&self) -> [&Panel; 2] {
        [&self.grid[ROWS - 1][COLS - 3], &self.grid[ROWS - 1][COLS - 2]]
    }

    #[inline]
    pub fn answer(&self) -> &Panel {
        &self.candidates[self.answer_index]
    }

    /// The rule groups governing the hidden column.
    pub fn final_rules(&self) -> &[RuleGroup] {
        self.column_rules.last().map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Generate one verified instance. Deterministic in `(config, seed, limits)`.
pub fn generate(
    config: &PanelConfig,
    seed: u64,
    limits: &GenLimits,
) -> Result<Puzzle, GenError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let component_count = config.template.component_count();

    for attempt in 0..limits.max_attempts {
        // One rule-group set per derived column. `prune` folds its domain
        // narrowing over the columns so the base panels get sampled with
        // headroom for the whole chain.
        let mut column_rules: Vec<Vec<RuleGroup>> = Vec::with_capacity(COLS - BASE_COLS);
        let mut narrowed = config.template.clone();
        for _ in BASE_COLS..COLS {
            let groups =
                propose_groups(&mut rng, &mut narrowed, component_count, limits.max_rule_proposals)
                    .ok_or(GenError::Infeasible {
                        config: config.name,
                    })?;
            column_rules.push(groups);
        }

        let grid = match build_grid(&mut rng, &narrowed, &column_rules) {
            Ok(grid) => grid,
            Err(e) => {
                debug!(config = config.name, attempt, %e, "rule application failed, retrying");
                continue;
            }
        };

        let answer = grid[ROWS - 1][COLS - 1].clone();
        let context = [
            grid[ROWS - 1][COLS - 3].clone(),
            grid[ROWS - 1][COLS - 2].clone(),
        ];
        let final_groups = match column_rules.last() {
            Some(g) => g.clone(),
            None => continue,
        };

        let (candidates, answer_index) =
            match build_candidates(&mut rng, &final_groups, &context, &answer, limits) {
                Ok(out) => out,
                Err(e) => {
                    debug!(config = config.name, attempt, %e, "candidate pool rejected, retrying");
                    continue;
                }
            };

        let scores = solver::score_candidates(&final_groups, &context, &candidates);
        match solver::unique_best(&scores) {
            Some(best) if best == answer_index => {
                return Ok(Puzzle {
                    config: config.name,
                    seed,
                    grid,
                    column_rules,
                    candidates,
                    answer_index,
                });
            }
            other => {
                debug!(
                    config = config.name,
                    attempt,
                    ?scores,
                    ?other,
                    "checker did not uniquely re-derive the answer, retrying"
                );
            }
        }
    }

    warn!(config = config.name, attempts = limits.max_attempts, "generation gave up");
    Err(GenError::LimitExceeded {
        config: config.name,
        attempts: limits.max_attempts,
    })
}

/// Propose a feasible rule-group set, folding its narrowing into `template`.
fn propose_groups(
    rng: &mut StdRng,
    template: &mut Panel,
    component_count: usize,
    budget: usize,
) -> Option<Vec<RuleGroup>> {
    for _ in 0..budget {
        let groups = sampling::sample_rule_groups(rng, component_count);
        if let Some(narrowed) = sampling::prune(template, &groups) {
            *template = narrowed;
            return Some(groups);
        }
    }
    None
}

/// Sample the base columns and derive the rest, row by row.
fn build_grid(
    rng: &mut StdRng,
    template: &Panel,
    column_rules: &[Vec<RuleGroup>],
) -> Result<Vec<Vec<Panel>>, ApplyError> {
    let mut grid = Vec::with_capacity(ROWS);
    for _ in 0..ROWS {
        let mut row: Vec<Panel> = (0..BASE_COLS).map(|_| template.sample(rng)).collect();
        for groups in column_rules {
            let next = apply_column(rng, groups, &row)?;
            row.push(next);
        }
        grid.push(row);
    }
    Ok(grid)
}

/// Derive the next panel of a row from its history under one column's rule
/// groups. Within a component the rules chain: the first starts from the
/// most recent panel, each subsequent one transforms the chained result.
fn apply_column(
    rng: &mut StdRng,
    groups: &[RuleGroup],
    history: &[Panel],
) -> Result<Panel, ApplyError> {
    debug_assert!(!history.is_empty());
    let mut column = history[history.len() - 1].clone();
    for (l, group) in groups.iter().enumerate() {
        let mut chained: Option<Panel> = None;
        for rule in &group.rules {
            chained = Some(rule.apply(rng, history, chained.as_ref())?);
        }
        if let Some(panel) = chained {
            column.merge_component(&panel, l);
        }
    }
    Ok(column)
}

/// Assemble the shuffled candidate pool: the answer, up to three lagged
/// traps, and near-misses made by breaking rules the answer satisfies.
fn build_candidates(
    rng: &mut StdRng,
    groups: &[RuleGroup],
    context: &[Panel; 2],
    answer: &Panel,
    limits: &GenLimits,
) -> Result<(Vec<Panel>, usize), GenError> {
    let satisfied: Vec<Rule> = groups
        .iter()
        .flat_map(|g| &g.rules)
        .filter(|r| solver::rule_satisfied(r, &context[0], &context[1], answer))
        .copied()
        .collect();
    if satisfied.is_empty() {
        // Nothing distinguishes the answer; the instance cannot be scored.
        return Err(GenError::InsufficientCandidates { have: 1 });
    }

    let mut pool: Vec<Panel> = vec![answer.clone()];

    // Lagged traps: copies of the context panels, perturbed when they would
    // duplicate an existing candidate (and otherwise half the time).
    for src in [&context[1], &context[1], &context[0]] {
        let mut cand = (*src).clone();
        let duplicate = pool.iter().any(|p| p.equivalent(&cand));
        if duplicate || rng.gen_bool(0.5) {
            let changed = perturb(rng, &mut cand, &satisfied, context);
            if !changed && duplicate {
                continue;
            }
        }
        if pool.iter().any(|p| p.equivalent(&cand)) {
            continue;
        }
        pool.push(cand);
    }

    // Near-misses: clone the answer and break one to three satisfied rules.
    let mut attempts = 0;
    while pool.len() < CANDIDATES {
        attempts += 1;
        if attempts > limits.max_distractor_attempts {
            return Err(GenError::InsufficientCandidates { have: pool.len() });
        }
        let mut cand = answer.clone();
        let n = rng.gen_range(1..=3usize.min(satisfied.len()));
        let mut changed = false;
        for pick in rand::seq::index::sample(rng, satisfied.len(), n) {
            changed |= break_rule(rng, &mut cand, &satisfied[pick], context);
        }
        if !changed || pool.iter().any(|p| p.equivalent(&cand)) {
            continue;
        }
        pool.push(cand);
    }

    let mut order: Vec<usize> = (0..pool.len()).collect();
    order.shuffle(rng);
    let answer_index = order.iter().position(|&i| i == 0).unwrap_or(0);
    let candidates = order.into_iter().map(|i| pool[i].clone()).collect();
    Ok((candidates, answer_index))
}

/// Break one randomly chosen satisfied rule; retries on no-op breaks.
fn perturb(rng: &mut StdRng, cand: &mut Panel, satisfied: &[Rule], context: &[Panel; 2]) -> bool {
    for _ in 0..PERTURB_RETRIES {
        let rule = satisfied[rng.gen_range(0..satisfied.len())];
        if break_rule(rng, cand, &rule, context) {
            return true;
        }
    }
    false
}

/// Mutate `cand` so it no longer satisfies `rule`. Returns false when the
/// configuration leaves no room to break it.
///
/// Distribute-Three is special-cased: its check only demands pairwise
/// distinctness, so an arbitrary new value would still satisfy it. Breaking
/// it means colliding with one of the lagged values instead.
fn break_rule(rng: &mut StdRng, cand: &mut Panel, rule: &Rule, context: &[Panel; 2]) -> bool {
    let c = rule.component;
    if c >= cand.component_count() {
        return false;
    }
    let lag2 = &context[0];
    let lag1 = &context[1];
    match (rule.kind, rule.attr) {
        (RuleKind::DistributeThree, RuleAttr::Number) => {
            let cur = cand.layout(c).number.level();
            for src in [lag1, lag2] {
                let target = src.layout(c).number.level();
                if target != cur {
                    cand.layout_mut(c).set_count_preserving(rng, target);
                    return cand.layout(c).number.level() != cur;
                }
            }
            false
        }
        (RuleKind::DistributeThree, RuleAttr::Position) => {
            let cur = cand.layout(c).position.active_set();
            for src in [lag1, lag2] {
                let set = src.layout(c).position.active_set();
                if !set.is_empty() && set != cur {
                    let mut active: Vec<usize> = set.into_iter().collect();
                    active.sort_unstable();
                    cand.layout_mut(c).set_positions_preserving(rng, active);
                    return true;
                }
            }
            false
        }
        (RuleKind::DistributeThree, _) => {
            let attr = match rule.attr.entity_attr() {
                Some(a) => a,
                None => return false,
            };
            let cur = cand.layout(c).entity_level(attr);
            for src in [lag1, lag2] {
                if let Some(v) = src.layout(c).entity_level(attr) {
                    if Some(v) != cur {
                        // Lag values live in the original domain; a clipped
                        // write could miss the collision entirely.
                        cand.layout_mut(c).set_entity_levels_derived(attr, v);
                        return true;
                    }
                }
            }
            false
        }
        (_, RuleAttr::Number) => {
            let layout = cand.layout_mut(c);
            let cur = layout.number.level();
            let new = layout.number.sample_new(rng, None, &[]);
            if new == cur {
                return false;
            }
            layout.set_count_preserving(rng, new);
            layout.number.level() != cur
        }
        (_, RuleAttr::Position) => {
            let layout = cand.layout_mut(c);
            let n = layout.position.active().len();
            // n == catalog leaves a single subset of that size.
            if n == 0 || n >= layout.position.catalog_len() {
                return false;
            }
            let active = layout.position.sample_distinct(rng, n, &[]);
            let set: FxHashSet<usize> = active.iter().copied().collect();
            if set == layout.position.active_set() {
                return false;
            }
            layout.position.set_active(active);
            layout.rebox_entities();
            true
        }
        (_, _) => {
            let attr = match rule.attr.entity_attr() {
                Some(a) => a,
                None => return false,
            };
            let new = {
                let layout = cand.layout(c);
                let first = match layout.first() {
                    Some(e) => e,
                    None => return false,
                };
                let exclude: Vec<i32> = [lag1, lag2]
                    .iter()
                    .filter_map(|p| p.layout(c).entity_level(attr))
                    .collect();
                first.attr(attr).sample_new(rng, None, &exclude)
            };
            let layout = cand.layout_mut(c);
            if layout.consistent(attr) && layout.entity_level(attr) == Some(new) {
                return false;
            }
            layout.set_entity_levels(attr, new);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configs;
    use crate::core::attribute::EntityAttr;

    fn first_working_seed(config: &PanelConfig) -> Puzzle {
        let limits = GenLimits::default();
        for seed in 0..200 {
            if let Ok(p) = generate(config, seed, &limits) {
                return p;
            }
        }
        panic!("no seed produced an instance for {}", config.name);
    }

    #[test]
    fn generated_grid_has_the_protocol_shape() {
        let puzzle = first_working_seed(&configs::center_single());
        assert_eq!(puzzle.grid.len(), ROWS);
        assert!(puzzle.grid.iter().all(|row| row.len() == COLS));
        assert_eq!(puzzle.candidates.len(), CANDIDATES);
        assert!(puzzle.answer_index < CANDIDATES);
        assert_eq!(
            puzzle.column_rules.len(),
            COLS - BASE_COLS,
        );
    }

    #[test]
    fn answer_candidate_matches_the_hidden_panel() {
        let puzzle = first_working_seed(&configs::distribute_four());
        assert!(puzzle.answer().equivalent(&puzzle.grid[ROWS - 1][COLS - 1]));
    }

    #[test]
    fn checker_rederives_the_answer_uniquely() {
        let puzzle = first_working_seed(&configs::distribute_nine());
        let context: Vec<Panel> = puzzle.context().into_iter().cloned().collect();
        let scores =
            solver::score_candidates(puzzle.final_rules(), &context, &puzzle.candidates);
        assert_eq!(solver::unique_best(&scores), Some(puzzle.answer_index));
    }

    #[test]
    fn generation_is_deterministic_in_the_seed() {
        let config = configs::center_single();
        let limits = GenLimits::default();
        let seed = (0..200)
            .find(|&s| generate(&config, s, &limits).is_ok())
            .expect("no working seed");
        let a = generate(&config, seed, &limits).unwrap();
        let b = generate(&config, seed, &limits).unwrap();
        assert_eq!(a.answer_index, b.answer_index);
        assert!(a.answer().equivalent(b.answer()));
        for (ra, rb) in a.grid.iter().zip(&b.grid) {
            for (pa, pb) in ra.iter().zip(rb) {
                assert!(pa.equivalent(pb));
            }
        }
    }

    #[test]
    fn candidates_are_pairwise_distinct() {
        let puzzle = first_working_seed(&configs::left_center_single_right_center_single());
        for (i, a) in puzzle.candidates.iter().enumerate() {
            for b in &puzzle.candidates[i + 1..] {
                assert!(!a.equivalent(b));
            }
        }
    }

    #[test]
    fn break_rule_on_entity_attr_changes_the_level() {
        let mut rng = StdRng::seed_from_u64(99);
        let template = configs::center_single().template;
        let lag2 = template.sample(&mut rng);
        let lag1 = template.sample(&mut rng);
        let answer = template.sample(&mut rng);
        let context = [lag2, lag1];
        let rule = Rule::new(RuleKind::Constant, RuleAttr::Color, 0, 0);
        let before = answer.layout(0).entity_level(EntityAttr::Color);
        let mut cand = answer.clone();
        assert!(break_rule(&mut rng, &mut cand, &rule, &context));
        assert_ne!(cand.layout(0).entity_level(EntityAttr::Color), before);
    }
}
