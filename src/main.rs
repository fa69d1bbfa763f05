use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

use svg2dxf::ConvertError;
use svg2dxf::config::AppConfig;
use svg2dxf::convert::{ConvertOptions, convert_file, default_output_path};
use svg2dxf::interrupt::InterruptFlag;
use svg2dxf::normalize::{InkscapeNormalizer, Normalizer, Passthrough};

/// Exit status after Ctrl-C, once temporary files are gone
const EXIT_INTERRUPTED: i32 = 2;

#[derive(Parser, Debug)]
#[command(
    name = "svg2dxf",
    version,
    about = "Flatten the layers of an SVG drawing into DXF polylines"
)]
struct Cli {
    /// SVG drawing to convert
    #[arg(value_name = "IN_PATH")]
    input: PathBuf,
    /// DXF file to write [default: IN_PATH with a .dxf extension]
    #[arg(value_name = "OUT_PATH")]
    output: Option<PathBuf>,
    /// Maximum distance between a curve and its line segments, in mm
    #[arg(short, long, value_name = "F", allow_negative_numbers = true)]
    flatness: Option<f64>,
    /// Read the drawing as is instead of running it through Inkscape first
    #[arg(long)]
    no_normalize: bool,
    /// Inkscape executable used for normalization
    #[arg(long, value_name = "PATH")]
    inkscape: Option<PathBuf>,
    /// Configuration file [default: $SVG2DXF_CONFIG]
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Log progress at debug level
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let mut config = match AppConfig::discover(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };
    init_logging(&config, cli.verbose);

    if let Some(program) = cli.inkscape {
        config.inkscape.program = program;
    }
    let interrupt = InterruptFlag::new();
    if let Err(e) = interrupt.install() {
        warn!(error = %e, "could not install Ctrl-C handler");
    }
    let options = ConvertOptions {
        flatness: cli.flatness.unwrap_or(config.flatness),
        interrupt: interrupt.clone(),
    };
    let output = cli
        .output
        .unwrap_or_else(|| default_output_path(&cli.input));

    let normalizer: Box<dyn Normalizer> = if cli.no_normalize || !config.inkscape.enabled {
        Box::new(Passthrough)
    } else {
        Box::new(InkscapeNormalizer::new(&config.inkscape).with_interrupt(interrupt))
    };

    match convert_file(&cli.input, &output, &options, normalizer.as_ref()) {
        Ok(conversion) => {
            println!(
                "Successfully converted '{}' to '{}' ({} polylines on {} layers)",
                cli.input.display(),
                conversion.output.display(),
                conversion.polylines,
                conversion.layers
            );
        }
        Err(ConvertError::Interrupted) => {
            eprintln!("Interrupted");
            process::exit(EXIT_INTERRUPTED);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

/// `RUST_LOG` wins, then the configured level; `-v` forces debug
fn init_logging(config: &AppConfig, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&config.logging.level))
            .unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let subscriber = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    let _ = subscriber.try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_arguments() {
        let cli = Cli::try_parse_from(["svg2dxf", "in.svg", "-f", "0.05", "--no-normalize"]).unwrap();
        assert_eq!(cli.input, PathBuf::from("in.svg"));
        assert_eq!(cli.output, None);
        assert_eq!(cli.flatness, Some(0.05));
        assert!(cli.no_normalize);
        assert!(!cli.verbose);
    }

    #[test]
    fn test_logging_can_be_initialized_twice() {
        let config = AppConfig::default();
        init_logging(&config, false);
        init_logging(&config, true);
    }

    #[test]
    fn test_negative_flatness_reaches_validation() {
        let cli = Cli::try_parse_from(["svg2dxf", "in.svg", "out.dxf", "--flatness", "-1"]).unwrap();
        assert_eq!(cli.flatness, Some(-1.0));
        assert_eq!(cli.output, Some(PathBuf::from("out.dxf")));
    }
}
