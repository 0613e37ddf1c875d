use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use coding_techniques::coding::stats::{
    compression_ratio, format_size, shannon_entropy, space_savings,
};
use coding_techniques::coding::video::{save_frames, Frame};
use coding_techniques::{CodingConfig, Media, Registry, ResultBundle};

// ── CLI definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "coding_lab",
    about = "Encode and decode text, audio and video with classical coding algorithms",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the available algorithms by media kind
    List,
    /// Encode an input file and write a JSON result bundle
    Encode {
        /// Algorithm name as shown by `list`
        algorithm: String,
        /// Text file, JSON array of audio samples, or .y4m video
        input: PathBuf,
        /// Destination bundle
        bundle: PathBuf,
        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Decode a result bundle
    Decode {
        /// Bundle written by `encode`
        bundle: PathBuf,
        /// Destination: text, JSON samples, or .y4m video
        output: PathBuf,
        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Print entropy and size of a text file
    Stats {
        /// Text file
        file: PathBuf,
    },
}

// ── Helpers ────────────────────────────────────────────────────────────────

fn load_registry(config: Option<&Path>) -> anyhow::Result<Registry> {
    let config = match config {
        Some(path) => CodingConfig::load_from_file(path)
            .with_context(|| format!("loading config {:?}", path))?,
        None => CodingConfig::default(),
    };
    Ok(Registry::new(&config))
}

fn read_input(media: Media, input: &Path) -> anyhow::Result<Value> {
    match media {
        Media::Text => {
            let text = fs::read_to_string(input).with_context(|| format!("reading {:?}", input))?;
            Ok(Value::String(text))
        }
        Media::Audio => {
            let content =
                fs::read_to_string(input).with_context(|| format!("reading {:?}", input))?;
            let samples: Vec<f64> = serde_json::from_str(&content)
                .with_context(|| format!("{:?} is not a JSON array of samples", input))?;
            Ok(json!(samples))
        }
        Media::Video => Ok(json!(input)),
        Media::Image => anyhow::bail!("no image coders are available"),
    }
}

fn write_output(media: Media, output: &Path, decoded: Value) -> anyhow::Result<()> {
    match media {
        Media::Text => {
            let text: String = serde_json::from_value(decoded)?;
            fs::write(output, text)?;
        }
        Media::Audio => {
            let samples: Vec<f64> = serde_json::from_value(decoded)?;
            fs::write(output, serde_json::to_string(&samples)?)?;
        }
        Media::Video => {
            let frames: Vec<Frame> = serde_json::from_value(decoded)?;
            save_frames(output, &frames)?;
        }
        Media::Image => anyhow::bail!("no image coders are available"),
    }
    Ok(())
}

fn file_size(path: &Path) -> u64 {
    fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

// ── Subcommand implementations ─────────────────────────────────────────────

fn run_list() -> anyhow::Result<()> {
    let registry = Registry::default();
    for (media, names) in registry.available() {
        println!("{}:", media);
        if names.is_empty() {
            println!("  (none)");
        }
        for name in names {
            println!("  {}", name);
        }
    }
    Ok(())
}

fn run_encode(
    algorithm: &str,
    input: PathBuf,
    bundle_path: PathBuf,
    config: Option<PathBuf>,
) -> anyhow::Result<()> {
    let registry = load_registry(config.as_deref())?;
    let coder = registry.create(algorithm)?;
    let value = read_input(coder.media(), &input)?;

    let start = Instant::now();
    let bundle = coder
        .encode_value(value)
        .with_context(|| format!("encoding {:?} with {}", input, algorithm))?;
    let elapsed = start.elapsed();
    bundle.save(&bundle_path)?;

    let original = file_size(&input);
    let encoded = serde_json::to_string(&bundle.encoded_data)?.len() as u64;
    eprintln!("Encoded {:?} -> {:?}", input, bundle_path);
    eprintln!("  algorithm   : {}", bundle.algorithm);
    eprintln!("  input size  : {}", format_size(original));
    eprintln!("  payload     : {}", format_size(encoded));
    eprintln!("  ratio       : {:.2}x", compression_ratio(original as usize, encoded as usize));
    eprintln!("  elapsed     : {:.3}s", elapsed.as_secs_f64());
    Ok(())
}

fn run_decode(
    bundle_path: PathBuf,
    output: PathBuf,
    config: Option<PathBuf>,
) -> anyhow::Result<()> {
    let registry = load_registry(config.as_deref())?;
    let bundle = ResultBundle::load(&bundle_path)?;
    let coder = registry.create(&bundle.algorithm)?;

    let start = Instant::now();
    let decoded = coder
        .decode_bundle(&bundle)
        .with_context(|| format!("decoding {:?}", bundle_path))?;
    let elapsed = start.elapsed();
    write_output(coder.media(), &output, decoded)?;

    eprintln!("Decoded {:?} -> {:?}", bundle_path, output);
    eprintln!("  algorithm   : {}", bundle.algorithm);
    eprintln!("  output size : {}", format_size(file_size(&output)));
    eprintln!("  elapsed     : {:.3}s", elapsed.as_secs_f64());
    Ok(())
}

fn run_stats(file: PathBuf) -> anyhow::Result<()> {
    let text = fs::read_to_string(&file).with_context(|| format!("reading {:?}", file))?;
    let chars = text.chars().count();
    let entropy = shannon_entropy(&text);
    let bound = (entropy * chars as f64 / 8.0).ceil() as usize;

    println!("=== {:?} ===", file);
    println!("  size            : {}", format_size(text.len() as u64));
    println!("  characters      : {}", chars);
    println!("  entropy         : {:.4} bits/symbol", entropy);
    println!("  entropy bound   : {}", format_size(bound as u64));
    println!(
        "  best savings    : {:.1}%",
        space_savings(text.len(), bound)
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::List => run_list(),
        Commands::Encode {
            algorithm,
            input,
            bundle,
            config,
        } => run_encode(&algorithm, input, bundle, config),
        Commands::Decode {
            bundle,
            output,
            config,
        } => run_decode(bundle, output, config),
        Commands::Stats { file } => run_stats(file),
    }
}
