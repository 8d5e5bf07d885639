use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use subalign_rs::{
    audio::read_wav_pcm,
    engines::whisper::{WhisperDecoder, WhisperDecoderParams},
    grammar::FsgGrammarWriter,
    output::{self, CueRenderMode},
    subtitle::read_srt,
    CueDriver, CueWordAligner, DecoderConfig, Params, UtteranceSegmenter,
};

#[derive(Parser, Debug)]
#[command(about = "Align subtitle words to audio, or transcribe audio to subtitles", version)]
struct Cli {
    #[command(flatten)]
    decoder: DecoderArgs,

    /// JSON file with alignment, segmenter and output parameters
    #[arg(long, global = true)]
    params: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct DecoderArgs {
    /// Path to the acoustic model (a GGML file for whisper)
    #[arg(long, global = true)]
    model_path: Option<PathBuf>,

    /// Language model used for free recognition
    #[arg(long, global = true)]
    lm_path: Option<PathBuf>,

    /// Pronunciation dictionary
    #[arg(long, global = true)]
    dict_path: Option<PathBuf>,

    /// Decoder log file
    #[arg(long, global = true)]
    log_path: Option<PathBuf>,

    /// Language code passed to the decoder (e.g. "en")
    #[arg(long, global = true, default_value = "en")]
    language: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Correct word timings of an existing subtitle file
    Align {
        /// 16kHz mono 16-bit WAV file
        #[arg(long)]
        audio: PathBuf,

        /// SubRip subtitle file
        #[arg(long)]
        subtitles: PathBuf,

        /// Output file; stdout when omitted
        #[arg(long)]
        output: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = StrategyChoice::Recognition)]
        strategy: StrategyChoice,

        /// Directory for per-cue grammars (forced strategy)
        #[arg(long, default_value = "grammars")]
        grammar_dir: PathBuf,

        #[arg(long, value_enum, default_value_t = FormatChoice::Words)]
        format: FormatChoice,

        /// Color words the recognizer never matched
        #[arg(long)]
        mark_unrecognized: bool,

        /// Overrides the search window size
        #[arg(long)]
        window_size: Option<usize>,
    },
    /// Transcribe audio without reference text
    Transcribe {
        /// 16kHz mono 16-bit WAV file
        #[arg(long)]
        audio: PathBuf,

        /// Output file; stdout when omitted
        #[arg(long)]
        output: Option<PathBuf>,

        /// Emit JSON instead of SubRip
        #[arg(long)]
        json: bool,

        /// Overrides the number of samples fed per chunk
        #[arg(long)]
        chunk_size: Option<usize>,
    },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum StrategyChoice {
    Recognition,
    Forced,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum FormatChoice {
    Dialogue,
    Words,
    Karaoke,
    Json,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let mut params = match &cli.params {
        Some(path) => Params::from_json_file(path)?,
        None => Params::default(),
    };

    let model_path = cli
        .decoder
        .model_path
        .clone()
        .ok_or("--model-path is required")?;
    let config = DecoderConfig {
        acoustic_model_path: model_path,
        language_model_path: cli.decoder.lm_path.clone(),
        dictionary_path: cli.decoder.dict_path.clone(),
        log_path: cli.decoder.log_path.clone(),
    };
    let decoder_params = WhisperDecoderParams {
        language: Some(cli.decoder.language.clone()),
        ..WhisperDecoderParams::default()
    };
    let mut decoder = WhisperDecoder::configure(&config, decoder_params)?;

    match cli.command {
        Command::Align {
            audio,
            subtitles,
            output,
            strategy,
            grammar_dir,
            format,
            mark_unrecognized,
            window_size,
        } => {
            if let Some(window_size) = window_size {
                params.alignment.window_size = window_size;
            }
            let pcm = read_wav_pcm(&audio)?;
            let mut cues = read_srt(&subtitles)?;
            let aligner = CueWordAligner::new(params.alignment.clone());

            let reports = match strategy {
                StrategyChoice::Recognition => {
                    CueDriver::recognition(aligner).align_cues(&mut decoder, &pcm, &mut cues)
                }
                StrategyChoice::Forced => {
                    CueDriver::forced(aligner, FsgGrammarWriter::new(grammar_dir))
                        .align_cues(&mut decoder, &pcm, &mut cues)
                }
            };

            let rendered = match format {
                FormatChoice::Json => output::alignment_json(&cues, &reports)?,
                FormatChoice::Dialogue => {
                    output::render_cues(&cues, CueRenderMode::Dialogue, mark_unrecognized)
                }
                FormatChoice::Words => {
                    output::render_cues(&cues, CueRenderMode::Words, mark_unrecognized)
                }
                FormatChoice::Karaoke => {
                    output::render_cues(&cues, CueRenderMode::Karaoke, mark_unrecognized)
                }
            };
            write_output(output.as_deref(), &rendered)?;
        }
        Command::Transcribe {
            audio,
            output,
            json,
            chunk_size,
        } => {
            if let Some(chunk_size) = chunk_size {
                params.segmenter.chunk_size = chunk_size;
            }
            let pcm = read_wav_pcm(&audio)?;
            let segmenter = UtteranceSegmenter::new(params.segmenter.clone());
            let utterances = segmenter.transcribe(&mut decoder, pcm.samples());

            let rendered = if json {
                output::utterances_json(&utterances)?
            } else {
                output::render_utterances(&utterances, &params.output)
            };
            write_output(output.as_deref(), &rendered)?;
        }
    }

    Ok(())
}

fn write_output(path: Option<&Path>, rendered: &str) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            fs::write(path, rendered)?;
            log::info!("Wrote {}", path.display());
        }
        None => print!("{rendered}"),
    }
    Ok(())
}
