use clap::{Args, CommandFactory, Parser, Subcommand};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use thumbkit::{
    config::load_env_files,
    logger::{self, LoggerConfig},
    prompts,
    validation::{validate_image_path, validate_out_dir, validate_reference_images},
    Config, GenerationOptions, ImageJob, ImageSize, ModelChoice, OutputSurface, Studio,
    ThumbkitError,
};

const USAGE_HINTS: &str = "\
Hints:
  - Repeat --ref for each reference image: --ref /abs/a.png --ref /abs/b.png
  - All image paths must be ABSOLUTE paths
  - Run 'thumbkit docs' for the full reference";

#[derive(Parser, Debug)]
#[command(
    name = "thumbkit",
    version,
    about = "YouTube thumbnail generator using Gemini image models",
    after_help = "Run 'thumbkit docs' for the full reference."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a new image from a prompt and optional reference images
    Generate(ImageArgs),
    /// Edit an existing image, steered by optional reference images
    Edit(EditArgs),
    /// Print the full CLI reference
    Docs,
}

#[derive(Args, Debug)]
struct ImageArgs {
    /// Text prompt (edit instructions for `edit`)
    #[arg(long)]
    prompt: String,

    /// Absolute path of a reference image; repeat for several
    #[arg(long = "ref", value_name = "PATH")]
    refs: Vec<PathBuf>,

    /// Aspect ratio passed to the model
    #[arg(long, default_value = "16:9", value_name = "RATIO")]
    aspect: String,

    #[arg(long, default_value = "pro", value_parser = ["flash", "pro"])]
    model: String,

    /// Output resolution (pro only)
    #[arg(long, default_value = "1K", value_parser = ["1K", "2K", "4K"])]
    size: String,

    /// File whose contents replace the bundled system prompt
    #[arg(long, value_name = "PATH")]
    system_prompt: Option<PathBuf>,

    /// Output directory [default: $THUMBKIT_OUTPUT_DIR or ./youtube/thumbnails]
    #[arg(long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// Print a JSON object instead of "Saved to PATH"
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct EditArgs {
    /// Absolute path of the image to edit
    #[arg(long, value_name = "PATH")]
    base: PathBuf,

    #[command(flatten)]
    image: ImageArgs,
}

async fn run_image_command(args: ImageArgs, base: Option<PathBuf>) -> thumbkit::Result<()> {
    if let Some(base) = &base {
        validate_image_path(base, "--base")?;
    }
    validate_reference_images(&args.refs, "--ref")?;
    if let Some(dir) = &args.out_dir {
        validate_out_dir(dir)?;
    }

    let model = ModelChoice::resolve(&args.model)?;
    let size: ImageSize = args.size.parse()?;
    let system_prompt = prompts::resolve_system_prompt(args.system_prompt.as_deref()).await;

    let options = GenerationOptions::new()
        .with_model(model)
        .with_aspect_ratio(args.aspect)
        .with_image_size(Some(size))
        .with_system_instruction(system_prompt);

    let job = match base {
        Some(base) => ImageJob::edit(args.prompt, base),
        None => ImageJob::generate(args.prompt),
    }
    .with_references(args.refs)
    .with_options(options);

    let mut config = Config::from_env(OutputSurface::Cli);
    if let Some(dir) = args.out_dir {
        config = config.with_output_dir(dir);
    }
    logger::log_config_info(&config);

    let saved = Studio::from_config(&config)?.run(&job).await?;

    if args.json {
        let json = serde_json::to_string(&saved)
            .map_err(|e| ThumbkitError::SerializationError(e.to_string()))?;
        println!("{}", json);
    } else {
        println!("Saved to {}", saved.file_path.display());
    }
    Ok(())
}

fn report(err: &ThumbkitError) {
    match err {
        ThumbkitError::ValidationError(message) => eprintln!("{}", message),
        other => eprintln!("ERROR: {}", other),
    }
    if let Some(hint) = err.hint() {
        eprintln!("\n{}", hint);
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let loaded = load_env_files();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            if err.use_stderr() {
                eprintln!("\n{}", USAGE_HINTS);
            }
            return ExitCode::from(err.exit_code() as u8);
        }
    };

    let log_config = LoggerConfig::cli()
        .with_env_level()
        .with_colors(std::io::stderr().is_terminal());
    if let Err(e) = logger::init_with_config(log_config) {
        eprintln!("Failed to initialize logger: {}", e);
    }
    for path in &loaded {
        log::debug!("Loaded environment from {}", path.display());
    }

    let outcome = match cli.command {
        None => {
            let _ = Cli::command().print_help();
            return ExitCode::SUCCESS;
        }
        Some(Command::Docs) => {
            print!("{}", prompts::CLI_REFERENCE);
            return ExitCode::SUCCESS;
        }
        Some(Command::Generate(args)) => run_image_command(args, None).await,
        Some(Command::Edit(args)) => run_image_command(args.image, Some(args.base)).await,
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::debug!("Command failed: {:?}", e);
            report(&e);
            ExitCode::FAILURE
        }
    }
}
