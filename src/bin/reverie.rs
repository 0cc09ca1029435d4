//! Thin CLI wrapper: select a paradigm, run it, print the summary.
//!
//! Exit code 0 on normal completion, nonzero on configuration failure
//! (unknown paradigm id, unreadable paradigm file, generation failure).

use clap::Parser;
use reverie::{
    CurriculumSchedule, DriftFamily, ExperimentConfig, HebbianEngine, PatternAssembler,
    PatternLayout, PatternSet, ParadigmTable, RunPlan, Runner, TrialController, TrialLog,
    VectorPool,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "reverie", version, about = "Temporal-context recall simulations")]
struct Args {
    /// Paradigm id to run (must exist in the paradigm file)
    #[arg(long, default_value = "no_drift_control")]
    paradigm: String,

    /// JSON file mapping paradigm ids to drift schedules
    #[arg(long, default_value = "data/paradigms.json")]
    paradigm_file: PathBuf,

    /// Training epochs per run
    #[arg(long, default_value_t = 4)]
    epochs: usize,

    /// Testing epochs per run
    #[arg(long, default_value_t = 1)]
    test_epochs: usize,

    /// Independent runs (fresh engine each)
    #[arg(long, default_value_t = 1)]
    runs: usize,

    /// Cue→target associations per list
    #[arg(long, default_value_t = 2)]
    items: usize,

    /// Global RNG seed
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Per-trial TSV log path
    #[arg(long)]
    log: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("reverie: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> reverie::Result<()> {
    let table = ParadigmTable::from_path(&args.paradigm_file)?;
    let paradigm = table.get(&args.paradigm)?.clone();

    let config = ExperimentConfig {
        seed: args.seed,
        drift_rate: paradigm.decay_rate,
        ..ExperimentConfig::default()
    };

    let layout = Arc::new(PatternLayout::standard(
        config.slot_width,
        config.context_channels,
    ));
    let assembler = PatternAssembler::new(Arc::clone(&layout));

    // Vocabulary: the whole list is generated as one batch so the pairwise
    // minimum-difference floor holds across cues and targets alike.
    let mut pool = VectorPool::with_seed(config.slot_width, config.seed);
    let vocab = pool
        .add_permuted("list", args.items * 2, config.pool_options())?
        .to_vec();
    let cues = vocab[..args.items].to_vec();
    let targets = vocab[args.items..].to_vec();

    // Context chains long enough for every epoch's offset.
    let train_offsets = paradigm.epoch_offsets(args.epochs);
    let last_train = train_offsets.last().copied().unwrap_or(0);
    let test_offsets: Vec<usize> = (0..args.test_epochs)
        .map(|k| paradigm.test_offset(last_train, k))
        .collect();
    let max_offset = train_offsets
        .iter()
        .chain(test_offsets.iter())
        .copied()
        .max()
        .unwrap_or(0);
    let chain_len = max_offset + args.items.max(1);

    let mut family = DriftFamily::new(
        config.seed,
        config.drift_rate,
        config.decay_base,
        config.context_channels,
    );
    let chains = family.chains(config.slot_width, config.active_count(), chain_len);

    // One pattern set per distinct chain offset; each epoch binds to the
    // set of its offset.
    let mut sets_by_offset: BTreeMap<usize, Arc<PatternSet>> = BTreeMap::new();
    let mut bindings = Vec::new();
    for (epoch, &offset) in train_offsets.iter().chain(test_offsets.iter()).enumerate() {
        let set = match sets_by_offset.get(&offset) {
            Some(set) => Arc::clone(set),
            None => {
                let set = Arc::new(assembler.paired_set(
                    format!("list_o{}", offset),
                    &cues,
                    &targets,
                    &chains,
                    offset,
                )?);
                sets_by_offset.insert(offset, Arc::clone(&set));
                set
            }
        };
        bindings.push((epoch..epoch + 1, set));
    }
    let curriculum = CurriculumSchedule::new(bindings);

    let controller = TrialController::from_config(&config);
    let mut runner = Runner::new(controller);
    if let Some(path) = &args.log {
        runner = runner.with_log(TrialLog::create(path)?);
    }

    for run_id in 0..args.runs {
        let mut engine = HebbianEngine::new(&layout, config.seed.wrapping_add(run_id as u64));
        let plan = RunPlan {
            run_id,
            train_epochs: args.epochs,
            test_epochs: args.test_epochs,
        };
        let summary = runner.run(&mut engine, &curriculum, &plan)?;
        print!("{}", summary.to_tsv());
    }

    Ok(())
}
