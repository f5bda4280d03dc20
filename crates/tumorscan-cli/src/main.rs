use anyhow::Result;
use clap::{Arg, ArgMatches, Command, ValueHint};
use log::LevelFilter;
use std::path::PathBuf;

use tumorscan_cli::predict::inference;
use tumorscan_cli::predict::input::PredictConfig;
use tumorscan_cli::train::input::PipelineConfig;
use tumorscan_cli::train::trainer;

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("TUMORSCAN_LOG", "error,tumorscan=info"))
        .init();

    let matches = Command::new("tumorscan")
        .version(clap::crate_version!())
        .about("\u{1F9E0} TumorScan CLI - CNN tumor detection on brain MRI images")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("train")
                .about("Train the classifier on a labeled image corpus (no/ and yes/ directories)")
                .arg(
                    Arg::new("config")
                        .help("Path to the pipeline configuration file. Prints a template when omitted.")
                        .required(false)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("data_dir")
                        .short('d')
                        .long("data_dir")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .help(
                            "Corpus root containing 'no' and 'yes' subdirectories. \
                             Overrides the data directory specified in the configuration file.",
                        )
                        .value_hint(ValueHint::DirPath),
                )
                .arg(
                    Arg::new("output_dir")
                        .short('o')
                        .long("output_dir")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .help(
                            "Directory that the model, the accuracy and loss plots (interactive \
                             plotly HTML) and the report will be written to. \
                             Overrides the directory specified in the configuration file.",
                        )
                        .value_hint(ValueHint::DirPath),
                )
                .arg(
                    Arg::new("epochs")
                        .short('e')
                        .long("epochs")
                        .value_parser(clap::value_parser!(usize))
                        .help("Number of training epochs. Overrides the configuration file."),
                )
                .arg(
                    Arg::new("batch_size")
                        .short('b')
                        .long("batch_size")
                        .value_parser(clap::value_parser!(usize))
                        .help("Training batch size. Overrides the configuration file."),
                ),
        )
        .subcommand(
            Command::new("predict")
                .about("Classify image files with a trained model")
                .arg(
                    Arg::new("config")
                        .short('c')
                        .long("config")
                        .help("Path to the pipeline configuration used for training")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("model_path")
                        .short('m')
                        .long("model")
                        .help("Path to the trained model file (*.safetensors)")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("images")
                        .help("Image files to classify")
                        .required(true)
                        .num_args(1..)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("output_file")
                        .short('o')
                        .long("output_file")
                        .help("Path to the output file for predictions (*.tsv or *.csv)")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                ),
        )
        .help_template(
            "{usage-heading} {usage}\n\n\
             {about-with-newline}\n\
             Version {version}\n\n\
             {all-args}{after-help}",
        )
        .get_matches();

    match matches.subcommand() {
        Some(("train", sub_m)) => handle_train(sub_m),
        Some(("predict", sub_m)) => handle_predict(sub_m),
        _ => unreachable!("Subcommand is required by CLI configuration"),
    }
}

fn handle_train(matches: &ArgMatches) -> Result<()> {
    let Some(config_path) = matches.get_one::<PathBuf>("config") else {
        eprintln!(
            "No config file provided. Printing the default configuration; \
             save it to a file, edit it and pass its path to `tumorscan train`."
        );
        println!("{}", serde_json::to_string_pretty(&PipelineConfig::default())?);
        return Ok(());
    };
    log::info!("[TumorScan] Training from config: {:?}", config_path);

    let params = PipelineConfig::from_arguments(config_path, matches)?;

    match trainer::run_training(&params) {
        Ok(_) => Ok(()),
        Err(e) => {
            log::error!("Training failed: {:#}", e);
            std::process::exit(1)
        }
    }
}

fn handle_predict(matches: &ArgMatches) -> Result<()> {
    let params = PredictConfig::from_arguments(matches)?;
    log::info!(
        "[TumorScan] Classifying {} images with model: {:?}",
        params.images.len(),
        params.model_path
    );

    match inference::run_prediction(&params) {
        Ok(_) => Ok(()),
        Err(e) => {
            log::error!("Prediction failed: {:#}", e);
            std::process::exit(1)
        }
    }
}
