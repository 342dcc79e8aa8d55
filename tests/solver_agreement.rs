//! Generator/checker agreement: every emitted instance must be re-derived
//! uniquely by the rule-only checker, with the answer strictly ahead.

use rand::rngs::StdRng;
use rand::SeedableRng;

use raven_matrices::aot::Panel;
use raven_matrices::configs;
use raven_matrices::generator::{generate, GenLimits};
use raven_matrices::solver;

fn first_instance(name: &str) -> raven_matrices::generator::Puzzle {
    let config = configs::by_name(name).unwrap();
    let limits = GenLimits::default();
    for seed in 0..500 {
        if let Ok(p) = generate(&config, seed, &limits) {
            return p;
        }
    }
    panic!("no seed in 0..500 produced an instance for {name}");
}

#[test]
fn checker_rederives_the_answer_for_every_configuration() {
    for name in configs::available_names() {
        let puzzle = first_instance(name);
        let context: Vec<Panel> = puzzle.context().into_iter().cloned().collect();
        let scores =
            solver::score_candidates(puzzle.final_rules(), &context, &puzzle.candidates);
        assert_eq!(
            solver::unique_best(&scores),
            Some(puzzle.answer_index),
            "ambiguous instance emitted for {name}"
        );
    }
}

#[test]
fn answer_scores_strictly_above_every_distractor() {
    let puzzle = first_instance("distribute_four");
    let context: Vec<Panel> = puzzle.context().into_iter().cloned().collect();
    let scores = solver::score_candidates(puzzle.final_rules(), &context, &puzzle.candidates);
    let best = scores[puzzle.answer_index];
    assert!(best > 0);
    for (i, &s) in scores.iter().enumerate() {
        if i != puzzle.answer_index {
            assert!(s < best, "candidate {i} ties the answer ({s} vs {best})");
        }
    }
}

#[test]
fn solve_agrees_with_unique_best_on_emitted_instances() {
    let puzzle = first_instance("distribute_nine");
    let context: Vec<Panel> = puzzle.context().into_iter().cloned().collect();
    let mut rng = StdRng::seed_from_u64(123);
    // A unique maximum leaves nothing to the random tie-break.
    for _ in 0..10 {
        let picked = solver::solve(&mut rng, puzzle.final_rules(), &context, &puzzle.candidates);
        assert_eq!(picked, puzzle.answer_index);
    }
}

#[test]
fn solve_degrades_to_a_valid_index_without_context() {
    let puzzle = first_instance("center_single");
    let mut rng = StdRng::seed_from_u64(7);
    let short_context: Vec<Panel> = puzzle.context()[1..].iter().map(|p| (*p).clone()).collect();
    for _ in 0..20 {
        let picked =
            solver::solve(&mut rng, puzzle.final_rules(), &short_context, &puzzle.candidates);
        assert!(picked < puzzle.candidates.len());
    }
}
