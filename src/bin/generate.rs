use std::path::Path;

use rand::rngs::StdRng;
use rand::SeedableRng;

use raven_matrices::configs;
use raven_matrices::generator::{generate, GenLimits};
use raven_matrices::manifest::{write_json, PuzzleManifest};
use raven_matrices::solver;

/// Cyclic split over windows of ten instances: the first `10 - val - test`
/// of each window go to train, then `val` to val, the rest to test.
fn split_label(index: usize, val: usize, test: usize) -> &'static str {
    let train = 10 - val - test;
    match index % 10 {
        i if i < train => "train",
        i if i < train + val => "val",
        _ => "test",
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!(
            "Usage: generate <configuration|all> <out_dir> [--count <N>] [--seed <S>] [--val <N>] [--test <N>]\n\nAvailable configurations:\n  - {}",
            configs::available_names().join("\n  - ")
        );
        std::process::exit(2);
    }

    let config_arg = &args[1];
    let out_dir = Path::new(&args[2]);

    let mut count: usize = 10;
    let mut base_seed: u64 = 0;
    let mut val: usize = 2;
    let mut test: usize = 2;

    let mut i = 3;
    while i < args.len() {
        match args[i].as_str() {
            "--count" => {
                let Some(v) = args.get(i + 1) else {
                    eprintln!("--count requires an integer argument");
                    std::process::exit(2);
                };
                count = match v.parse() {
                    Ok(x) => x,
                    Err(e) => {
                        eprintln!("invalid --count {v}: {e}");
                        std::process::exit(2);
                    }
                };
                i += 2;
            }
            "--seed" => {
                let Some(v) = args.get(i + 1) else {
                    eprintln!("--seed requires an integer argument");
                    std::process::exit(2);
                };
                base_seed = match v.parse() {
                    Ok(x) => x,
                    Err(e) => {
                        eprintln!("invalid --seed {v}: {e}");
                        std::process::exit(2);
                    }
                };
                i += 2;
            }
            "--val" => {
                let Some(v) = args.get(i + 1) else {
                    eprintln!("--val requires an integer argument");
                    std::process::exit(2);
                };
                val = match v.parse() {
                    Ok(x) => x,
                    Err(e) => {
                        eprintln!("invalid --val {v}: {e}");
                        std::process::exit(2);
                    }
                };
                i += 2;
            }
            "--test" => {
                let Some(v) = args.get(i + 1) else {
                    eprintln!("--test requires an integer argument");
                    std::process::exit(2);
                };
                test = match v.parse() {
                    Ok(x) => x,
                    Err(e) => {
                        eprintln!("invalid --test {v}: {e}");
                        std::process::exit(2);
                    }
                };
                i += 2;
            }
            x => {
                eprintln!("Unknown option: {x}");
                std::process::exit(2);
            }
        }
    }

    if val + test >= 10 {
        eprintln!("--val plus --test must stay below 10 out of every 10 instances");
        std::process::exit(2);
    }

    let selected: Vec<&'static str> = if config_arg == "all" {
        configs::available_names()
    } else {
        match configs::by_name(config_arg) {
            Some(c) => vec![c.name],
            None => {
                eprintln!(
                    "Unknown configuration: {config_arg}\n\nAvailable configurations:\n  - {}",
                    configs::available_names().join("\n  - ")
                );
                std::process::exit(2);
            }
        }
    };

    if let Err(e) = std::fs::create_dir_all(out_dir) {
        eprintln!("Cannot create {}: {e}", out_dir.display());
        std::process::exit(1);
    }

    let limits = GenLimits::default();
    let mut check_rng = StdRng::seed_from_u64(base_seed ^ 0x5eed_c0de);

    for name in selected {
        let config = match configs::by_name(name) {
            Some(c) => c,
            None => continue,
        };

        let mut produced = 0usize;
        let mut correct = 0usize;
        let mut seed = base_seed;
        let seed_budget = base_seed.saturating_add(count as u64 * 50);

        while produced < count && seed < seed_budget {
            let puzzle = match generate(&config, seed, &limits) {
                Ok(p) => p,
                Err(_) => {
                    seed += 1;
                    continue;
                }
            };
            seed += 1;

            // Re-grade the instance the way a consumer would.
            let context: Vec<_> = puzzle.context().into_iter().cloned().collect();
            let picked = solver::solve(
                &mut check_rng,
                puzzle.final_rules(),
                &context,
                &puzzle.candidates,
            );
            if picked == puzzle.answer_index {
                correct += 1;
            }

            let split = split_label(produced, val, test);
            let path = out_dir.join(format!("{}_{:04}_{split}.json", config.name, produced));
            let manifest = PuzzleManifest::from_puzzle(&puzzle);
            if let Err(e) = write_json(&path, &manifest) {
                eprintln!("Write failed: {e}");
                std::process::exit(1);
            }
            produced += 1;
        }

        if produced < count {
            eprintln!(
                "{}: only {produced} of {count} instances within the seed budget",
                config.name
            );
        }
        println!(
            "{}: {produced} instances, checker accuracy {correct}/{produced}",
            config.name
        );
    }
}

#[cfg(test)]
mod tests {
    use super::split_label;

    #[test]
    fn split_follows_the_requested_ratios() {
        let labels: Vec<_> = (0..10).map(|i| split_label(i, 2, 2)).collect();
        assert_eq!(labels.iter().filter(|&&s| s == "train").count(), 6);
        assert_eq!(labels.iter().filter(|&&s| s == "val").count(), 2);
        assert_eq!(labels.iter().filter(|&&s| s == "test").count(), 2);

        assert_eq!(split_label(7, 3, 1), "val");
        assert_eq!(split_label(9, 3, 1), "test");
        // The window wraps back to train.
        assert_eq!(split_label(10, 3, 1), "train");
    }
}
