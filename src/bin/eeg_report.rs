use std::path::PathBuf;

use clap::Parser;

use eegnet_rs::{
    ClassTaxonomy, DirArtifactStore, EegConfig, EegPipelineBuilder, InferOptions, RecordingSource,
};

#[derive(Debug, Parser)]
#[command(name = "eeg_report")]
#[command(about = "Run subject-level EEG inference on a recording and print the result as JSON")]
struct Args {
    /// Tabular recording (timestamp column plus one column per channel).
    file: PathBuf,
    #[arg(long, env = "EEG_REPORT_DEVICE", default_value = "muse")]
    device: String,
    /// Taxonomy size: 2 (CN/AD) or 3 (CN/AD/FTD).
    #[arg(long, env = "EEG_REPORT_CLASSES", default_value_t = 3)]
    classes: usize,
    #[arg(long, env = "EEG_REPORT_VERSION", default_value = "Ver14")]
    version: String,
    #[arg(long, env = "EEG_REPORT_VARIANT")]
    variant: Option<String>,
    /// Root directory of the local artifact store.
    #[arg(long, env = "EEG_REPORT_STORE", default_value = "models")]
    store_root: PathBuf,
    #[arg(long, env = "EEG_REPORT_NAMESPACE", default_value = "eegnet")]
    namespace: String,
    #[arg(long)]
    subject: Option<String>,
    /// Ground-truth label for accuracy reporting (CN/AD/FTD or C/A/F).
    #[arg(long)]
    true_label: Option<String>,
    /// Accept recordings shorter than the mandatory minimum duration.
    #[arg(long, default_value_t = false)]
    allow_short: bool,
    /// Zero-fill unresolvable channels instead of failing.
    #[arg(long, default_value_t = false)]
    lenient_channels: bool,
    /// Comma-separated physical channel order of the source columns.
    #[arg(long, env = "EEG_REPORT_CHANNEL_ORDER")]
    channel_order: Option<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    if let Err(err) = run(args) {
        eprintln!("eeg_report: {err}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let taxonomy = match args.classes {
        2 => ClassTaxonomy::TwoClass,
        3 => ClassTaxonomy::ThreeClass,
        other => return Err(format!("unsupported taxonomy size {other}, expected 2 or 3").into()),
    };

    let mut config = EegConfig::new(args.device, taxonomy);
    config.version = args.version;
    config.variant = args.variant;
    config.repo_namespace = args.namespace;
    config.lenient_channels = args.lenient_channels;
    config.physical_order = args.channel_order.map(|order| {
        order
            .split(',')
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect()
    });

    let pipeline = EegPipelineBuilder::new(config)
        .with_artifact_store(Box::new(DirArtifactStore::new(args.store_root)))
        .build()?;

    let opts = InferOptions {
        subject_hint: args.subject,
        ground_truth: args.true_label,
        enforce_min_duration: !args.allow_short,
    };
    let result = pipeline.infer(&RecordingSource::Csv(args.file), &opts)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
