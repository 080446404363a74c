use tonemark::config::Settings;
use tonemark::pinyin::convert_tagged;
use tonemark::txt_convert;

use clap::Parser;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, bail};
use tracing::Level;

#[derive(Parser)]
#[command(name = "tonemark")]
#[command(version = "0.1.0")]
#[command(about = "Numbered pinyin to tone marks, e.g. lve4 -> lüè", long_about = None)]
struct Cli {
    /// Single syllable to convert, v stands for ü
    #[arg(requires = "tone")]
    syllable: Option<String>,

    /// Tone of the single syllable, 1-4 or 5 for the neutral tone
    #[arg(allow_negative_numbers = true)]
    tone: Option<i32>,

    /// Input text file with numbered syllables, stdin if missing
    #[arg(short, long, conflicts_with = "syllable")]
    input: Option<PathBuf>,

    /// Output file, stdout if missing
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Settings as .json file, flags given on the command line take precedence
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write one JSON object per numbered syllable
    #[arg(long)]
    json: bool,

    /// Keep the tone digit of syllables which could not be marked
    #[arg(long)]
    keep_digit: bool,

    /// Log a warning for every numbered syllable which could not be marked
    #[arg(long)]
    warn_unchanged: bool,

    /// Print statistics as JSON to stderr
    #[arg(long)]
    stats: bool,

    /// More log output, can be repeated
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();
}

fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => Settings::from_json_file(path)?,
        None => Settings::default(),
    };
    settings.json |= cli.json;
    settings.keep_unconverted_digit |= cli.keep_digit;
    settings.warn_on_unchanged |= cli.warn_unchanged;
    Ok(settings)
}

fn open_output(cli: &Cli) -> anyhow::Result<Box<dyn Write>> {
    match &cli.output {
        Some(path_out) => {
            if cli.input.as_ref() == Some(path_out) {
                bail!("Input file and output file must be different");
            }
            let file_out = File::create(path_out).context(format!(
                "Could not create output file {}",
                path_out.display()
            ))?;
            Ok(Box::new(BufWriter::new(file_out)))
        }
        None => Ok(Box::new(BufWriter::new(io::stdout().lock()))),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let settings = load_settings(&cli)?;
    tracing::debug!(?settings, "settings loaded");

    let mut writer_out = open_output(&cli)?;

    if let (Some(syllable), Some(tone)) = (&cli.syllable, cli.tone) {
        let conversion = convert_tagged(syllable, tone);
        if let tonemark::Conversion::Unchanged { reason, .. } = &conversion {
            tracing::info!(syllable = %syllable, tone, ?reason, "no tone mark applied");
        }
        writeln!(writer_out, "{}", conversion.text())?;
        writer_out.flush()?;
        return Ok(());
    }

    let mut reader_in: Box<dyn Read> = match &cli.input {
        Some(path) => Box::new(
            File::open(path).context(format!("Could not open input file {}", path.display()))?,
        ),
        None => Box::new(io::stdin().lock()),
    };

    let stats = txt_convert::txt_convert(&mut reader_in, &mut writer_out, &settings)?;
    if cli.stats {
        eprintln!("{}", serde_json::to_string_pretty(&stats)?);
    }
    Ok(())
}
