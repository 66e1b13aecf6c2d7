use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use sylva_explain::{
    Ensemble, EnsembleKind, ExplainConfig, Explanation, FeatureNames, ImportanceType, NodeId, Top,
    group_by_class,
};
use sylva_io::{
    DumpReader, ExperimentName, ExplanationWriter, FeatureNameReader, LeafReader, SampleId,
    format_as_text,
};
use sylva_tree::ParsedTree;

#[derive(Parser)]
#[command(name = "sylva")]
#[command(about = "Decision-path explanations for XGBoost tree ensembles")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Where the ensemble comes from.
#[derive(Args, Debug, Clone)]
struct ModelArgs {
    /// Path to a model dump: `dump_model` text or a JSON array of tree dumps
    #[arg(long, conflicts_with = "model", required_unless_present = "model")]
    dump: Option<PathBuf>,

    /// Path to a compiled ensemble written by `sylva compile`
    #[arg(long)]
    model: Option<PathBuf>,

    /// Learning task of the dump: "regression", "binary" or "multiclass"
    #[arg(long)]
    objective: Option<String>,

    /// Number of classes (multiclass only)
    #[arg(long)]
    n_classes: Option<usize>,

    /// Multiclass trees and leaf columns are in XGBoost's round-by-round
    /// order; regroup them by class
    #[arg(long)]
    round_major: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Explain predictions given the leaf each tree routed every example to
    Explain {
        #[command(flatten)]
        source: ModelArgs,

        /// Path to the leaf-assignment CSV (`sample_id,t0,t1,...`)
        #[arg(long)]
        leaves: PathBuf,

        /// Path to a feature-name list, one per line (defaults to f0, f1, ...)
        #[arg(long)]
        features: Option<PathBuf>,

        /// Number of strongest features to show per target (0 shows all)
        #[arg(long, default_value_t = 20)]
        top: usize,

        /// Comma-separated target names (binary: both class names)
        #[arg(long, value_delimiter = ',')]
        target_names: Option<Vec<String>>,

        /// Explain only this sample
        #[arg(long)]
        sample: Option<String>,

        /// Output format: "text" or "json"
        #[arg(long, default_value = "text")]
        format: String,

        /// Experiment name; writes `{experiment}_explain.json` when set
        #[arg(long)]
        experiment: Option<String>,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Parse a model dump once and save it as a compiled binary ensemble
    Compile {
        /// Path to the model dump
        #[arg(long)]
        dump: PathBuf,

        /// Learning task of the dump: "regression", "binary" or "multiclass"
        #[arg(long, default_value = "binary")]
        objective: String,

        /// Number of classes (multiclass only)
        #[arg(long)]
        n_classes: Option<usize>,

        /// Multiclass trees are in XGBoost's round-by-round order; regroup them by class
        #[arg(long)]
        round_major: bool,

        /// Path of the compiled ensemble to write
        #[arg(long)]
        output: PathBuf,
    },

    /// Print per-tree statistics of an ensemble as JSON
    Inspect {
        #[command(flatten)]
        source: ModelArgs,
    },

    /// Rank features by normalized importance across all splits
    Importances {
        #[command(flatten)]
        source: ModelArgs,

        /// Path to a feature-name list, one per line (defaults to f0, f1, ...)
        #[arg(long)]
        features: Option<PathBuf>,

        /// Importance type: "weight", "gain" or "cover"
        #[arg(long, default_value = "weight")]
        importance_type: String,

        /// Number of most important features to show (0 shows all)
        #[arg(long, default_value_t = 20)]
        top: usize,

        /// Output format: "text" or "json"
        #[arg(long, default_value = "text")]
        format: String,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct ExplainOutput {
    experiment: String,
    n_samples: usize,
    n_trees: usize,
    path: PathBuf,
}

#[derive(Serialize)]
struct SampleOutput<'a> {
    sample_id: &'a str,
    #[serde(flatten)]
    explanation: &'a Explanation,
}

#[derive(Serialize)]
struct CompileOutput {
    kind: String,
    n_trees: usize,
    n_estimators_per_class: usize,
    output: PathBuf,
}

#[derive(Serialize)]
struct InspectOutput {
    kind: String,
    n_trees: usize,
    n_estimators_per_class: usize,
    positional_features: usize,
    trees: Vec<TreeOutput>,
}

#[derive(Serialize)]
struct TreeOutput {
    index: usize,
    n_nodes: usize,
    n_leaves: usize,
    depth: usize,
    root_value: f64,
}

fn parse_objective(objective: &str, n_classes: Option<usize>) -> Result<EnsembleKind> {
    match objective {
        "regression" => Ok(EnsembleKind::Regression),
        "binary" => Ok(EnsembleKind::Binary),
        "multiclass" => {
            let n_classes = n_classes.context("--n-classes is required for multiclass")?;
            Ok(EnsembleKind::multiclass(n_classes)?)
        }
        other => anyhow::bail!(
            "unknown objective: {other} (expected regression, binary, or multiclass)"
        ),
    }
}

fn parse_importance_type(s: &str) -> Result<ImportanceType> {
    match s {
        "weight" => Ok(ImportanceType::Weight),
        "gain" => Ok(ImportanceType::Gain),
        "cover" => Ok(ImportanceType::Cover),
        other => {
            anyhow::bail!("unknown importance type: {other} (expected weight, gain, or cover)")
        }
    }
}

fn parse_format(s: &str) -> Result<()> {
    if s != "text" && s != "json" {
        anyhow::bail!("unknown format: {s} (expected text or json)");
    }
    Ok(())
}

fn parse_top(top: usize) -> Top {
    if top == 0 { Top::All } else { Top::Abs(top) }
}

fn load_ensemble(source: &ModelArgs) -> Result<Ensemble> {
    if let Some(model) = &source.model {
        let ensemble = Ensemble::load(model).context("failed to load compiled ensemble")?;
        if source.objective.is_some() {
            warn!(kind = %ensemble.kind(), "--objective ignored for compiled ensembles");
        }
        return Ok(ensemble);
    }

    let dump = source
        .dump
        .as_ref()
        .context("either --dump or --model is required")?;
    let kind = parse_objective(
        source.objective.as_deref().unwrap_or("binary"),
        source.n_classes,
    )?;
    read_dump(dump, kind, source.round_major)
}

fn read_dump(path: &Path, kind: EnsembleKind, round_major: bool) -> Result<Ensemble> {
    let mut dumps = DumpReader::new(path)
        .read()
        .context("failed to read model dump")?;
    if let EnsembleKind::Multiclass { n_classes } = kind {
        if round_major {
            dumps = group_by_class(&dumps, n_classes).context("failed to regroup trees")?;
        } else {
            warn!(
                n_classes,
                "treating trees as class-grouped blocks; pass --round-major for XGBoost's native order"
            );
        }
    }
    Ensemble::parse(&dumps, kind).context("failed to parse model dump")
}

fn load_feature_names(features: Option<&Path>, ensemble: &Ensemble) -> Result<FeatureNames> {
    match features {
        Some(path) => {
            let list = FeatureNameReader::new(path)
                .read()
                .context("failed to read feature names")?;
            Ok(FeatureNames::new(list)?)
        }
        None => Ok(FeatureNames::positional(ensemble.positional_feature_count())),
    }
}

/// Regroup leaf rows of a round-major multiclass ensemble by class.
///
/// Rows of the wrong length are left as they are for the shape check to report.
fn regroup_rows(rows: Vec<Vec<NodeId>>, ensemble: &Ensemble) -> Result<Vec<Vec<NodeId>>> {
    let EnsembleKind::Multiclass { n_classes } = ensemble.kind() else {
        return Ok(rows);
    };
    rows.into_iter()
        .map(|row| {
            if row.len() == ensemble.n_trees() {
                group_by_class(&row, n_classes).context("failed to regroup leaf columns")
            } else {
                Ok(row)
            }
        })
        .collect()
}

fn tree_summary(index: usize, tree: &ParsedTree) -> TreeOutput {
    TreeOutput {
        index,
        n_nodes: tree.n_nodes(),
        n_leaves: tree.n_leaves(),
        depth: tree.depth(),
        root_value: tree.aggregate_value(tree.root()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Configure Rayon thread pool
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Explain {
            source,
            leaves,
            features,
            top,
            target_names,
            sample,
            format,
            experiment,
            output_dir,
        } => {
            parse_format(&format)?;
            let experiment_name = experiment.clone().map(ExperimentName::new).transpose()?;

            // 1. Load ensemble and inputs
            let ensemble = load_ensemble(&source)?;
            let table = LeafReader::new(&leaves)
                .read()
                .context("failed to read leaf assignments")?;
            let names = load_feature_names(features.as_deref(), &ensemble)?;
            info!(
                n_trees = ensemble.n_trees(),
                n_samples = table.n_samples(),
                n_features = names.len(),
                "inputs loaded"
            );

            // 2. Select samples
            let (sample_ids, rows): (Vec<&SampleId>, Vec<Vec<_>>) = match &sample {
                Some(wanted) => {
                    let (id, row) = table.row(wanted).with_context(|| {
                        format!("sample {wanted} not found in {}", leaves.display())
                    })?;
                    (vec![id], vec![row.to_vec()])
                }
                None => (table.sample_ids().iter().collect(), table.rows().to_vec()),
            };
            let rows = if source.round_major {
                regroup_rows(rows, &ensemble)?
            } else {
                rows
            };

            // 3. Explain
            let mut config = ExplainConfig::new().with_top(parse_top(top));
            if let Some(target_names) = target_names {
                config = config.with_target_names(target_names);
            }
            let explanations = config
                .explain_batch(&ensemble, &rows, &names)
                .context("explanation failed")?;

            // 4. Write artifact or print
            if let Some(experiment_name) = experiment_name {
                let writer = ExplanationWriter::new(&output_dir, experiment_name)?;
                let entries: Vec<_> = sample_ids.iter().copied().zip(&explanations).collect();
                let path = writer.write_explanations(&entries)?;

                let output = ExplainOutput {
                    experiment: experiment.unwrap_or_default(),
                    n_samples: explanations.len(),
                    n_trees: ensemble.n_trees(),
                    path,
                };
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else if format == "json" {
                let output: Vec<SampleOutput<'_>> = sample_ids
                    .iter()
                    .zip(&explanations)
                    .map(|(id, explanation)| SampleOutput {
                        sample_id: id.as_str(),
                        explanation,
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                for (id, explanation) in sample_ids.iter().zip(&explanations) {
                    println!("sample {id}");
                    println!("{}", format_as_text(explanation));
                }
            }
        }

        Command::Compile {
            dump,
            objective,
            n_classes,
            round_major,
            output,
        } => {
            let kind = parse_objective(&objective, n_classes)?;
            let ensemble = read_dump(&dump, kind, round_major)?;
            ensemble
                .save(&output)
                .context("failed to save compiled ensemble")?;

            let output = CompileOutput {
                kind: ensemble.kind().to_string(),
                n_trees: ensemble.n_trees(),
                n_estimators_per_class: ensemble.n_estimators_per_class(),
                output,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Inspect { source } => {
            let ensemble = load_ensemble(&source)?;
            let output = InspectOutput {
                kind: ensemble.kind().to_string(),
                n_trees: ensemble.n_trees(),
                n_estimators_per_class: ensemble.n_estimators_per_class(),
                positional_features: ensemble.positional_feature_count(),
                trees: ensemble
                    .trees()
                    .iter()
                    .enumerate()
                    .map(|(i, tree)| tree_summary(i, tree))
                    .collect(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Importances {
            source,
            features,
            importance_type,
            top,
            format,
        } => {
            parse_format(&format)?;
            let importance_type = parse_importance_type(&importance_type)?;

            let ensemble = load_ensemble(&source)?;
            let names = load_feature_names(features.as_deref(), &ensemble)?;
            let explanation = ExplainConfig::new()
                .with_top(parse_top(top))
                .explain_weights(&ensemble, &names, importance_type)
                .context("failed to compute feature importances")?;

            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&explanation)?);
            } else {
                println!("{}", format_as_text(&explanation));
            }
        }
    }

    Ok(())
}
