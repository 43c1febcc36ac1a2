use std::fs;
use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use metaposter::{
    AspectRatio, BackgroundMode, GeneratedImage, GenerationClient, HistoryEntry, Library,
    MetaphorResponse, MetaphorResult, PosterCompositor, PosterSettings, Raster, SettingsPatch,
    parse, parse_hex_color,
};

#[derive(Parser, Debug)]
#[command(name = "metaposter", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse raw model output into a validated metaphor JSON.
    Parse(ParseArgs),
    /// Composite a poster PNG from a metaphor and an artwork image.
    Render(RenderArgs),
    /// Generate a metaphor (and optionally artwork) for a situation.
    Generate(GenerateArgs),
}

#[derive(Parser, Debug)]
struct ParseArgs {
    /// File with raw model output, or `-` for stdin.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Validated metaphor JSON (as produced by `parse`).
    #[arg(long)]
    metaphor: PathBuf,

    /// Subject artwork (PNG or JPEG). Omit for a text-only poster.
    #[arg(long)]
    image: Option<PathBuf>,

    /// TTF/OTF font file for the text layers.
    #[arg(long)]
    font: Option<PathBuf>,

    /// Settings patch JSON (a saved preset payload).
    #[arg(long)]
    preset: Option<PathBuf>,

    /// Canvas aspect ratio.
    #[arg(long, value_enum, default_value = "square")]
    aspect: AspectArg,

    /// Background mode.
    #[arg(long, value_enum, default_value = "original")]
    background: BackgroundArg,

    /// Background color as `#rrggbb` (custom mode).
    #[arg(long)]
    bg_color: Option<String>,

    /// Shape recolor target as `#rrggbb`.
    #[arg(long)]
    shape_color: Option<String>,

    /// Subject scale factor.
    #[arg(long)]
    scale: Option<f32>,

    /// Caption line drawn near the top.
    #[arg(long)]
    caption: Option<String>,

    /// Seed for procedural backgrounds (reproducible output).
    #[arg(long)]
    seed: Option<u64>,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct GenerateArgs {
    /// The situation to turn into a metaphor.
    topic: String,

    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    anthropic_key: String,

    /// Only needed with `--image`.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, default_value = "")]
    openai_key: String,

    /// Also generate artwork from the metaphor's image prompt.
    #[arg(long, default_value_t = false)]
    image: bool,

    /// Library directory to record the run in.
    #[arg(long)]
    library: Option<PathBuf>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum AspectArg {
    Square,
    Portrait45,
    Portrait916,
}

impl From<AspectArg> for AspectRatio {
    fn from(a: AspectArg) -> Self {
        match a {
            AspectArg::Square => AspectRatio::Square,
            AspectArg::Portrait45 => AspectRatio::Portrait45,
            AspectArg::Portrait916 => AspectRatio::Portrait916,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum BackgroundArg {
    Original,
    Custom,
    Shiny,
    Metal,
    Scratched,
}

impl From<BackgroundArg> for BackgroundMode {
    fn from(b: BackgroundArg) -> Self {
        match b {
            BackgroundArg::Original => BackgroundMode::Original,
            BackgroundArg::Custom => BackgroundMode::Custom,
            BackgroundArg::Shiny => BackgroundMode::Shiny,
            BackgroundArg::Metal => BackgroundMode::Metal,
            BackgroundArg::Scratched => BackgroundMode::Scratched,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Parse(args) => cmd_parse(args),
        Command::Render(args) => cmd_render(args),
        Command::Generate(args) => cmd_generate(args),
    }
}

fn cmd_parse(args: ParseArgs) -> anyhow::Result<()> {
    let raw = if args.in_path.as_os_str() == "-" {
        std::io::read_to_string(std::io::stdin()).context("read stdin")?
    } else {
        fs::read_to_string(&args.in_path)
            .with_context(|| format!("read '{}'", args.in_path.display()))?
    };

    match parse(&raw)? {
        MetaphorResponse::Metaphor(m) => {
            println!("{}", serde_json::to_string_pretty(&m)?);
        }
        MetaphorResponse::Rejection(reason) => {
            eprintln!("model declined: {reason}");
            std::process::exit(2);
        }
    }
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let metaphor: MetaphorResult = serde_json::from_str(
        &fs::read_to_string(&args.metaphor)
            .with_context(|| format!("read '{}'", args.metaphor.display()))?,
    )
    .context("decode metaphor JSON")?;

    let subject = match &args.image {
        Some(path) => {
            let bytes =
                fs::read(path).with_context(|| format!("read '{}'", path.display()))?;
            Some(Raster::decode(&bytes)?)
        }
        None => None,
    };

    let font_bytes = match &args.font {
        Some(path) => fs::read(path).with_context(|| format!("read '{}'", path.display()))?,
        None => Vec::new(),
    };

    let mut settings = PosterSettings::default();
    if let Some(path) = &args.preset {
        let patch: SettingsPatch = serde_json::from_str(
            &fs::read_to_string(path).with_context(|| format!("read '{}'", path.display()))?,
        )
        .context("decode preset JSON")?;
        patch.apply(&mut settings);
    }
    settings.aspect = args.aspect.into();
    settings.background = args.background.into();
    if let Some(s) = &args.bg_color {
        settings.bg_color =
            parse_hex_color(s).with_context(|| format!("invalid color '{s}'"))?;
    }
    if let Some(s) = &args.shape_color {
        settings.shape_color =
            parse_hex_color(s).with_context(|| format!("invalid color '{s}'"))?;
    }
    if let Some(v) = args.scale {
        settings.scale = v;
    }
    if let Some(c) = &args.caption {
        settings.caption = c.clone();
        settings.show_caption = true;
    }

    let mut compositor = match args.seed {
        Some(seed) => PosterCompositor::with_seed(seed),
        None => PosterCompositor::new(),
    };
    let png = compositor.export_png(&metaphor, subject.as_ref(), &settings, &font_bytes)?;

    if let Some(parent) = args.out.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    fs::write(&args.out, png).with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_generate(args: GenerateArgs) -> anyhow::Result<()> {
    let have_openai_key = !args.openai_key.is_empty();
    let client = GenerationClient::new(args.anthropic_key, args.openai_key);

    let metaphor = match client.generate_metaphor(&args.topic)? {
        MetaphorResponse::Metaphor(m) => m,
        MetaphorResponse::Rejection(reason) => {
            eprintln!("model declined: {reason}");
            std::process::exit(2);
        }
    };
    println!("{}", serde_json::to_string_pretty(&metaphor)?);

    let mut entry = HistoryEntry::new(new_id(), &args.topic, metaphor.clone());

    if args.image {
        anyhow::ensure!(have_openai_key, "--image requires OPENAI_API_KEY");
        match client.generate_image(&metaphor.step5_dalle_prompt)? {
            GeneratedImage::Url(url) => {
                eprintln!("artwork: {url}");
                entry.generated_image = Some(url);
            }
            GeneratedImage::Png(bytes) => {
                if let Some(dir) = &args.library {
                    let lib = Library::open(dir)?;
                    lib.save_image(&entry.id, &bytes)?;
                    entry.generated_image = Some(format!("images/{}.png", entry.id));
                    eprintln!("artwork: {}", lib.image_path(&entry.id).display());
                } else {
                    let path = PathBuf::from(format!("{}.png", entry.id));
                    fs::write(&path, &bytes)
                        .with_context(|| format!("write '{}'", path.display()))?;
                    eprintln!("artwork: {}", path.display());
                }
            }
        }
    }

    if let Some(dir) = &args.library {
        Library::open(dir)?.push_history(entry)?;
    }
    Ok(())
}

/// Timestamp-based entry id, unique enough for a single-user library.
fn new_id() -> String {
    format!("m{}", chrono::Utc::now().timestamp_millis())
}
