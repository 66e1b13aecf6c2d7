//! End-to-end integration tests: dump + leaves + features -> explain -> JSON / text.

use std::fs;
use std::path::{Path, PathBuf};

use sylva_explain::{Ensemble, EnsembleKind, ExplainConfig, FeatureNames, ImportanceType, Top};
use sylva_io::{
    DumpReader, ExperimentName, ExplanationWriter, FeatureNameReader, LeafReader,
    format_as_text,
};
use tempfile::TempDir;

/// Path to the test fixture directory.
fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn load_ensemble(file: &str) -> Ensemble {
    let dumps = DumpReader::new(&fixture_path(file))
        .read()
        .expect("fixture should parse");
    Ensemble::parse(&dumps, EnsembleKind::Binary).unwrap()
}

fn weight_of(value: &serde_json::Value, side: &str, feature: &str) -> Option<f64> {
    value[side]
        .as_array()?
        .iter()
        .find(|fw| fw["feature"] == feature)
        .and_then(|fw| fw["weight"].as_f64())
}

#[test]
fn text_and_json_dumps_agree() {
    let from_text = load_ensemble("model.txt");
    let from_json = load_ensemble("model.json");
    assert_eq!(from_text, from_json);
    assert_eq!(from_text.n_trees(), 2);
    assert_eq!(from_text.positional_feature_count(), 2);
}

#[test]
fn explain_round_trip() {
    // 1. Read inputs
    let ensemble = load_ensemble("model.txt");
    let leaves = LeafReader::new(&fixture_path("leaves.csv")).read().unwrap();
    let names = FeatureNames::new(
        FeatureNameReader::new(&fixture_path("features.txt"))
            .read()
            .unwrap(),
    )
    .unwrap();
    assert_eq!(leaves.n_trees(), ensemble.n_trees());

    // 2. Explain every sample
    let config = ExplainConfig::new().with_target_names(vec!["ham".into(), "spam".into()]);
    let explanations = config.explain_batch(&ensemble, leaves.rows(), &names).unwrap();
    assert_eq!(explanations.len(), 2);

    // s1: tree 0 -> leaf 4 (0.5), tree 1 -> leaf 1 (0.1)
    let s1 = &explanations[0].targets[0];
    assert_eq!(s1.target, "spam");
    assert!((s1.score - 0.6).abs() < 1e-9);

    // 3. Write JSON artifact
    let dir = TempDir::new().unwrap();
    let writer =
        ExplanationWriter::new(dir.path(), ExperimentName::new("spam_rt".into()).unwrap())
            .unwrap();
    let entries: Vec<_> = leaves.sample_ids().iter().zip(&explanations).collect();
    let path = writer.write_explanations(&entries).unwrap();

    // 4. Deserialize back and verify
    let content: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(content["experiment"], "spam_rt");
    assert_eq!(content["n_samples"], 2);

    let s1 = &content["explanations"][0];
    assert_eq!(s1["sample_id"], "s1");
    let fw = &s1["targets"][0]["feature_weights"];
    assert!((weight_of(fw, "pos", "age").unwrap() - 0.3).abs() < 1e-9);
    assert!((weight_of(fw, "pos", "income").unwrap() - 0.3).abs() < 1e-9);

    let s2 = &content["explanations"][1];
    assert_eq!(s2["sample_id"], "s2");
    assert!((s2["targets"][0]["score"].as_f64().unwrap() + 0.5).abs() < 1e-9);
    let fw = &s2["targets"][0]["feature_weights"];
    assert!((weight_of(fw, "neg", "age").unwrap() + 0.3).abs() < 1e-9);
    assert!((weight_of(fw, "neg", "income").unwrap() + 0.2).abs() < 1e-9);
}

#[test]
fn text_report_lists_strongest_features() {
    let ensemble = load_ensemble("model.txt");
    let leaves = LeafReader::new(&fixture_path("leaves.csv")).read().unwrap();
    let names = FeatureNames::positional(ensemble.positional_feature_count());

    let explanation = ExplainConfig::new()
        .with_top(Top::Abs(1))
        .explain(&ensemble, leaves.row("s2").unwrap().1, &names)
        .unwrap();
    let text = format_as_text(&explanation);

    assert!(text.contains("Explained as: decision paths"), "{text}");
    assert!(text.contains("y=1 (score -0.500) top features"), "{text}");
    assert!(text.contains("f0   -0.300"), "{text}");
    assert!(text.contains("more negative features"), "{text}");
    assert!(!text.contains("f1 "), "{text}");
}

#[test]
fn compiled_model_explains_identically() {
    let ensemble = load_ensemble("model.txt");
    let dir = TempDir::new().unwrap();
    let model_path = dir.path().join("model.bin");
    ensemble.save(&model_path).unwrap();
    let loaded = Ensemble::load(&model_path).unwrap();

    let leaves = LeafReader::new(&fixture_path("leaves.csv")).read().unwrap();
    let names = FeatureNames::positional(2);
    for row in leaves.rows() {
        assert_eq!(
            loaded.explain(row, &names).unwrap(),
            ensemble.explain(row, &names).unwrap()
        );
    }
}

#[test]
fn importances_from_dump_statistics() {
    let ensemble = load_ensemble("model.txt");
    let names = FeatureNames::new(
        FeatureNameReader::new(&fixture_path("features.txt"))
            .read()
            .unwrap(),
    )
    .unwrap();
    let config = ExplainConfig::new();

    // age splits once, income twice.
    let by_weight = config
        .explain_weights(&ensemble, &names, ImportanceType::Weight)
        .unwrap();
    let text = format_as_text(&by_weight);
    assert!(text.contains("Explained as: feature importances"), "{text}");
    assert!(text.contains("income 0.6667\n   age 0.3333"), "{text}");

    // Mean gain: age 4.2, income (1.1 + 2) / 2.
    let by_gain = config
        .explain_weights(&ensemble, &names, ImportanceType::Gain)
        .unwrap();
    let fi = by_gain.feature_importances.unwrap();
    assert_eq!(fi.importances[0].feature, "age");
    assert!((fi.importances[0].weight - 4.2 / 5.75).abs() < 1e-9);
    let sum: f64 = fi.importances.iter().map(|fw| fw.weight).sum();
    assert!((sum - 1.0).abs() < 1e-9);
    assert_eq!(fi.remaining, 0);
}
