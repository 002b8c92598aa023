use policyforge::config::{Config, RunOverrides};
use policyforge::error::PolicyForgeError;
use rstest::rstest;
use std::io::Write;
use std::path::PathBuf;

fn document(extra: &str) -> String {
    format!(
        r#"{{
            "PARAM_BOUNDS": {{ "tax_rate": [0.0, 0.5], "mobility": [1, 10] }},
            "MAX_TICKS": 200,
            "NETLOGO_PATH": "/opt/netlogo/netlogo-headless.sh",
            "MODEL_PATH": "models/economy.nlogo"{}
        }}"#,
        extra
    )
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{}", document(r#", "N_REPLICATES": 5, "FIXED_SEED": true"#)).unwrap();

    let cfg = Config::load_from_file(file.path()).unwrap();
    assert_eq!(cfg.n_replicates, 5);
    assert!(cfg.fixed_seed);
    assert_eq!(cfg.max_ticks, 200);
    assert_eq!(cfg.model_path, PathBuf::from("models/economy.nlogo"));
    assert_eq!(cfg.param_bounds.len(), 2);
}

#[test]
fn test_missing_file_is_config_error() {
    let err = Config::load_from_file("/definitely/not/here.json").unwrap_err();
    assert!(matches!(err, PolicyForgeError::Config(_)));
}

#[rstest]
#[case::missing_ticks(r#"{ "PARAM_BOUNDS": {"a": [0, 1]}, "NETLOGO_PATH": "n", "MODEL_PATH": "m" }"#)]
#[case::missing_bounds(r#"{ "MAX_TICKS": 1, "NETLOGO_PATH": "n", "MODEL_PATH": "m" }"#)]
#[case::bounds_not_pair(r#"{ "PARAM_BOUNDS": {"a": [0, 1, 2]}, "MAX_TICKS": 1, "NETLOGO_PATH": "n", "MODEL_PATH": "m" }"#)]
#[case::not_json("PARAM_BOUNDS = 1")]
fn test_malformed_documents_are_rejected(#[case] json: &str) {
    assert!(Config::from_json(json).is_err());
}

#[rstest]
#[case::empty_space(r#"{ "PARAM_BOUNDS": {}, "MAX_TICKS": 1, "NETLOGO_PATH": "n", "MODEL_PATH": "m" }"#)]
#[case::inverted_bound(r#"{ "PARAM_BOUNDS": {"a": [1, 0]}, "MAX_TICKS": 1, "NETLOGO_PATH": "n", "MODEL_PATH": "m" }"#)]
#[case::zero_ticks(r#"{ "PARAM_BOUNDS": {"a": [0, 1]}, "MAX_TICKS": 0, "NETLOGO_PATH": "n", "MODEL_PATH": "m" }"#)]
#[case::tiny_population(r#"{ "PARAM_BOUNDS": {"a": [0, 1]}, "MAX_TICKS": 1, "NETLOGO_PATH": "n", "MODEL_PATH": "m", "POP_SIZE": 1 }"#)]
#[case::zero_replicates(r#"{ "PARAM_BOUNDS": {"a": [0, 1]}, "MAX_TICKS": 1, "NETLOGO_PATH": "n", "MODEL_PATH": "m", "N_REPLICATES": 0 }"#)]
#[case::bad_probability(r#"{ "PARAM_BOUNDS": {"a": [0, 1]}, "MAX_TICKS": 1, "NETLOGO_PATH": "n", "MODEL_PATH": "m", "CROSSOVER_PROB": 1.5 }"#)]
#[case::negative_eta(r#"{ "PARAM_BOUNDS": {"a": [0, 1]}, "MAX_TICKS": 1, "NETLOGO_PATH": "n", "MODEL_PATH": "m", "MUTATION_ETA": -1 }"#)]
fn test_invalid_values_fail_validation(#[case] json: &str) {
    let err = Config::from_json(json).unwrap_err();
    assert!(
        matches!(err, PolicyForgeError::Config(_)),
        "unexpected error kind: {}",
        err
    );
}

#[rstest]
#[case::fits(2_147_483_645, 3, true)]
#[case::one_past(2_147_483_645, 4, false)]
#[case::near_u64_max(18_446_744_073_709_551_000, 3, false)]
fn test_fixed_seed_must_fit_simulator_range(#[case] seed: u64, #[case] replicates: usize, #[case] ok: bool) {
    let json = document(&format!(
        r#", "FIXED_SEED": true, "SEED": {}, "N_REPLICATES": {}"#,
        seed, replicates
    ));
    match Config::from_json(&json) {
        Ok(_) => assert!(ok),
        Err(err) => {
            assert!(!ok, "unexpected rejection: {}", err);
            assert!(matches!(err, PolicyForgeError::Config(_)));
        }
    }
}

#[test]
fn test_large_seed_is_fine_without_fixed_seed() {
    let cfg = Config::from_json(&document(r#", "SEED": 18446744073709551000"#)).unwrap();
    assert_eq!(cfg.seed, Some(18_446_744_073_709_551_000));
}

#[test]
fn test_null_seed_means_entropy() {
    let cfg = Config::from_json(&document(r#", "SEED": null"#)).unwrap();
    assert_eq!(cfg.seed, None);
}

#[test]
fn test_overrides_layer_on_top() {
    let mut cfg = Config::from_json(&document("")).unwrap();
    let overrides = RunOverrides {
        generations: Some(3),
        pop_size: Some(8),
        threads: Some(2),
        seed: Some(99),
        output: Some(PathBuf::from("out.csv")),
        ..Default::default()
    };
    cfg.merge_overrides(&overrides).unwrap();

    assert_eq!(cfg.n_generations, 3);
    assert_eq!(cfg.pop_size, 8);
    assert_eq!(cfg.worker_threads(), 2);
    assert_eq!(cfg.seed, Some(99));
    assert_eq!(cfg.result_path, PathBuf::from("out.csv"));
    assert_eq!(cfg.checkpoint_path, PathBuf::from("pareto_results_checkpoint.csv"));
}
