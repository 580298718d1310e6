use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::{Path, PathBuf};
use tracing::{error, info};

use whisper_subtitle::config::{Config, OutputFormat};
use whisper_subtitle::job::validate_media_path;
use whisper_subtitle::{convert_srt_file, error_log, translate_srt_file, SubtitleError, SubtitlePipeline};

fn build_cli() -> Command {
    let path_arg = |help: &'static str| {
        Arg::new("path")
            .value_name("PATH")
            .help(help)
            .required(true)
    };

    Command::new("whisper-subtitle")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Generate, translate and flatten subtitles with the OpenAI Whisper API")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("TOML configuration file")
                .global(true)
        )
        .arg(
            Arg::new("log-spawn")
                .long("log-spawn")
                .help("Show ffmpeg/ffprobe output instead of running them silently")
                .action(ArgAction::SetTrue)
                .global(true)
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(ArgAction::SetTrue)
                .global(true)
        )
        .subcommand(
            Command::new("subtitle")
                .about("Transcribe a video or audio file into subtitles")
                .arg(path_arg("Media file (.mp4 .avi .mov .mp3 .wav .flac)"))
                .arg(
                    Arg::new("format")
                        .short('f')
                        .long("format")
                        .value_name("FORMATS")
                        .help("Comma-separated output formats: srt,txt")
                )
                .arg(
                    Arg::new("language")
                        .short('l')
                        .long("language")
                        .value_name("LANG")
                        .help("Source language hint passed to Whisper")
                )
                .arg(
                    Arg::new("jobs")
                        .short('j')
                        .long("jobs")
                        .value_name("NUM")
                        .value_parser(clap::value_parser!(usize))
                        .help("Number of chunks processed concurrently")
                )
                .arg(
                    Arg::new("strip-period")
                        .long("strip-period")
                        .help("Remove the trailing period from every cue")
                        .action(ArgAction::SetTrue)
                )
                .arg(
                    Arg::new("keep-audio")
                        .long("keep-audio")
                        .help("Keep the extracted _tmp audio after a successful run")
                        .action(ArgAction::SetTrue)
                )
        )
        .subcommand(
            Command::new("translate")
                .about("Translate an .srt file with an OpenAI chat model")
                .arg(path_arg("Subtitle file (.srt)"))
                .arg(
                    Arg::new("from")
                        .long("from")
                        .value_name("LANG")
                        .help("Source language")
                )
                .arg(
                    Arg::new("to")
                        .long("to")
                        .value_name("LANG")
                        .help("Target language")
                )
        )
        .subcommand(
            Command::new("to-text")
                .about("Convert an .srt file into plain text")
                .arg(path_arg("Subtitle file (.srt)"))
        )
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let matches = build_cli().get_matches();

    let filter = if matches.get_flag("verbose") {
        "whisper_subtitle=debug,info"
    } else {
        "whisper_subtitle=info,warn"
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let Some((command, args)) = matches.subcommand() else {
        return;
    };

    let mut error_log_path = Config::default().error_log;
    let result = match load_config(command, args) {
        Ok(config) => {
            error_log_path = config.error_log.clone();
            run(command, args, config).await
        }
        Err(e) => Err(e),
    };

    if let Err(err) = result {
        let code = report_failure(command, &err, &error_log_path).await;
        std::process::exit(code);
    }
}

/// Defaults, then config file and environment, then command-line overrides
fn load_config(command: &str, args: &ArgMatches) -> Result<Config> {
    let config_path = args.get_one::<String>("config").map(PathBuf::from);
    let mut config = Config::load(config_path.as_deref())?;

    if args.get_flag("log-spawn") {
        config.media.log_spawn = true;
    }

    match command {
        "subtitle" => {
            if let Some(formats) = args.get_one::<String>("format") {
                config.transcription.formats = OutputFormat::parse_list(formats)?;
            }
            if let Some(language) = args.get_one::<String>("language") {
                config.transcription.language = Some(language.clone());
            }
            if let Some(jobs) = args.get_one::<usize>("jobs") {
                config.chunking.max_concurrent_chunks = *jobs;
            }
            if args.get_flag("strip-period") {
                config.chunking.strip_trailing_period = true;
            }
            if args.get_flag("keep-audio") {
                config.chunking.keep_intermediate_audio = true;
            }
        }
        "translate" => {
            if let Some(from) = args.get_one::<String>("from") {
                config.translation.from = Some(from.clone());
            }
            if let Some(to) = args.get_one::<String>("to") {
                config.translation.to = Some(to.clone());
            }
        }
        _ => {}
    }

    config.validate()?;
    Ok(config)
}

async fn run(command: &str, args: &ArgMatches, config: Config) -> Result<()> {
    let path = args
        .get_one::<String>("path")
        .map(PathBuf::from)
        .ok_or_else(|| SubtitleError::Argument("missing file path".to_string()))?;

    match command {
        "subtitle" => {
            validate_media_path(&path)?;
            info!("🚀 Whisper Subtitle starting...");
            info!("{}", config.summary());

            let pipeline = SubtitlePipeline::from_config(config)?;
            let result = pipeline
                .run(&path)
                .await
                .with_context(|| format!("generating subtitles for {}", path.display()))?;

            info!("📦 Chunks: {}", result.chunk_count);
            for output in &result.outputs {
                info!("✅ Output: {}", output.display());
            }
        }
        "translate" => {
            let output = translate_srt_file(&config, &path)
                .await
                .with_context(|| format!("translating {}", path.display()))?;
            info!("✅ Output: {}", output.display());
        }
        "to-text" => {
            let output = convert_srt_file(&path)
                .await
                .with_context(|| format!("converting {}", path.display()))?;
            info!("✅ Output: {}", output.display());
        }
        other => {
            return Err(SubtitleError::Argument(format!("unknown command: {}", other)).into());
        }
    }

    Ok(())
}

/// Print the failure; fatal errors are also appended to the error log. Returns the exit code.
async fn report_failure(command: &str, err: &anyhow::Error, error_log_path: &Path) -> i32 {
    let argument_error = error_log::is_argument_error(err.chain());
    let message = format!("{:#}", err);

    if argument_error {
        eprintln!("error: {}", message);
    } else {
        error!("❌ {} failed: {}", command, message);
    }

    match error_log::record_failure(error_log_path, command, argument_error, &message).await {
        Ok(code) => {
            if !argument_error {
                eprintln!("error: {} (see {})", message, error_log_path.display());
            }
            code
        }
        Err(log_err) => {
            eprintln!(
                "error: could not write {}: {}",
                error_log_path.display(),
                log_err
            );
            error_log::EXIT_FATAL_ERROR
        }
    }
}
