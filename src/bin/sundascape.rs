//! CLI for SundaScape - themed backgrounds and watermarks via Gemini.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use sundascape::{
    compose_request, export_png, reduce, Accessory, AccessorySet, Action, AspectRatio,
    ComposedRequest, Compositor, DataUri, GeminiModel, GeminiProvider, ImageProvider,
    SessionState, Studio, Theme, DEFAULT_MAX_LOGO_WIDTH,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sundascape")]
#[command(about = "Place yourself in Sundanese landscapes and world landmarks via Gemini")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List background themes
    Themes,

    /// List accessories
    Accessories,

    /// Print the request that would be sent, without calling the service
    Prompt(SelectionArgs),

    /// Generate a scene (or edit a photo) and export it as PNG
    Generate(GenerateArgs),

    /// Stamp a logo onto an existing image and export it as PNG
    Watermark(WatermarkArgs),

    /// Check that the API key and model are usable
    Check(CheckArgs),
}

#[derive(Args)]
struct SelectionArgs {
    /// Preset theme (see `sundascape themes`)
    #[arg(short, long, conflicts_with = "prompt")]
    theme: Option<Theme>,

    /// Custom scene description instead of a preset theme
    #[arg(short, long)]
    prompt: Option<String>,

    /// Accessory to add (repeatable, see `sundascape accessories`)
    #[arg(short, long = "accessory")]
    accessories: Vec<Accessory>,

    /// Photo to edit; without it a new scene is generated
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Aspect ratio for generated scenes
    #[arg(long, value_enum, default_value = "1:1")]
    aspect_ratio: AspectRatioArg,
}

#[derive(Args)]
struct GenerateArgs {
    #[command(flatten)]
    selection: SelectionArgs,

    /// Logo to watermark the exported image with
    #[arg(short, long)]
    logo: Option<PathBuf>,

    /// Gemini model
    #[arg(short, long, default_value = "nano-banana")]
    model: GeminiModel,

    /// Directory the PNG is written to
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,
}

#[derive(Args)]
struct WatermarkArgs {
    /// Image to watermark
    #[arg(short, long)]
    input: PathBuf,

    /// Logo to place in the top-left corner
    #[arg(short, long)]
    logo: Option<PathBuf>,

    /// Maximum logo width in pixels
    #[arg(long, default_value_t = DEFAULT_MAX_LOGO_WIDTH)]
    max_logo_width: u32,

    /// Directory the PNG is written to
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,
}

#[derive(Args)]
struct CheckArgs {
    /// Gemini model
    #[arg(short, long, default_value = "nano-banana")]
    model: GeminiModel,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AspectRatioArg {
    #[value(name = "1:1")]
    Square,
    #[value(name = "16:9")]
    Landscape,
    #[value(name = "9:16")]
    Portrait,
}

impl From<AspectRatioArg> for AspectRatio {
    fn from(arg: AspectRatioArg) -> Self {
        match arg {
            AspectRatioArg::Square => AspectRatio::Square,
            AspectRatioArg::Landscape => AspectRatio::Landscape,
            AspectRatioArg::Portrait => AspectRatio::Portrait,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Themes => list_themes(cli.json)?,
        Commands::Accessories => list_accessories(cli.json)?,
        Commands::Prompt(args) => show_prompt(args, cli.json).await?,
        Commands::Generate(args) => generate(args, cli.json).await?,
        Commands::Watermark(args) => watermark(args, cli.json).await?,
        Commands::Check(args) => check(args, cli.json).await?,
    }

    Ok(())
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sundascape=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Selection changes described by the command line, in dispatch order.
fn selection_actions(args: &SelectionArgs) -> Vec<Action> {
    let mut actions = vec![match &args.prompt {
        Some(text) => Action::CustomPromptChanged(text.clone()),
        None => Action::ThemeSelected(args.theme.unwrap_or_default()),
    }];

    // Toggling twice would deselect, so repeated flags collapse first.
    let accessories: AccessorySet = args.accessories.iter().copied().collect();
    actions.extend(accessories.iter().map(Action::AccessoryToggled));

    actions.push(Action::AspectRatioSelected(args.aspect_ratio.into()));
    actions
}

async fn show_prompt(args: SelectionArgs, json_output: bool) -> anyhow::Result<()> {
    let mut state = SessionState::new();
    if let Some(input) = &args.input {
        let photo = DataUri::read_file(input).await?;
        state = reduce(&state, Action::SourceImageLoaded(photo.to_string()));
    }
    for action in selection_actions(&args) {
        state = reduce(&state, action);
    }

    let request = compose_request(&state.selection)?;
    let aspect_ratio = match &request {
        ComposedRequest::Generate { aspect_ratio, .. } => Some(aspect_ratio.as_str()),
        ComposedRequest::Edit { .. } => None,
    };

    if json_output {
        let result = serde_json::json!({
            "mode": request.mode(),
            "scene": state.selection.scene_description()?,
            "text": request.text(),
            "aspect_ratio": aspect_ratio,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("Mode: {}", request.mode());
        if let Some(ratio) = aspect_ratio {
            println!("Aspect ratio: {ratio}");
        }
        println!();
        println!("{}", request.text());
    }

    Ok(())
}

async fn generate(args: GenerateArgs, json_output: bool) -> anyhow::Result<()> {
    let provider = GeminiProvider::builder().model(args.model).build()?;
    let mut studio = Studio::new(provider);

    if let Some(input) = &args.selection.input {
        studio.load_source_image(input).await?;
    }
    if let Some(logo) = &args.logo {
        studio.load_logo(logo).await?;
    }
    for action in selection_actions(&args.selection) {
        studio.dispatch(action);
    }

    let record = studio.generate().await?;

    tokio::fs::create_dir_all(&args.output_dir).await?;
    let output = studio.export(&args.output_dir).await?;

    if json_output {
        let result = serde_json::json!({
            "success": true,
            "id": record.id,
            "mode": record.mode,
            "prompt_used": record.prompt_used,
            "created_at": record.created_at,
            "output": output.display().to_string(),
            "watermarked": record.watermark_logo.is_some(),
            "model": args.model.as_str(),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!(
            "Generated image ({}): {} via {}",
            record.mode,
            output.display(),
            args.model.as_str()
        );
    }

    Ok(())
}

async fn watermark(args: WatermarkArgs, json_output: bool) -> anyhow::Result<()> {
    let image = DataUri::read_file(&args.input).await?.to_string();
    let logo = match &args.logo {
        Some(path) => Some(DataUri::read_file(path).await?.to_string()),
        None => None,
    };

    let compositor = Compositor::new().with_max_logo_width(args.max_logo_width);
    tokio::fs::create_dir_all(&args.output_dir).await?;
    let output = export_png(&compositor, &image, logo.as_deref(), &args.output_dir).await?;

    if json_output {
        let result = serde_json::json!({
            "success": true,
            "input": args.input.display().to_string(),
            "output": output.display().to_string(),
            "watermarked": logo.is_some(),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("Exported: {}", output.display());
    }

    Ok(())
}

async fn check(args: CheckArgs, json_output: bool) -> anyhow::Result<()> {
    let provider = GeminiProvider::builder().model(args.model).build()?;
    let result = provider.health_check().await;

    if json_output {
        let output = serde_json::json!({
            "provider": provider.name(),
            "model": args.model.as_str(),
            "ok": result.is_ok(),
            "error": result.as_ref().err().map(|e| e.to_string()),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if result.is_ok() {
        println!("{} ({}) is reachable", provider.name(), args.model.as_str());
    }

    result?;
    Ok(())
}

fn list_themes(json_output: bool) -> anyhow::Result<()> {
    if json_output {
        let themes: Vec<_> = Theme::presets()
            .iter()
            .map(|preset| {
                serde_json::json!({
                    "slug": preset.slug,
                    "label": preset.label,
                    "description": preset.description,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&themes)?);
    } else {
        println!("Themes:\n");
        for preset in Theme::presets() {
            println!("  {:<18} {}", preset.slug, preset.label);
            println!("  {:<18} {}\n", "", preset.description);
        }
    }
    Ok(())
}

fn list_accessories(json_output: bool) -> anyhow::Result<()> {
    if json_output {
        let accessories: Vec<_> = Accessory::ALL
            .iter()
            .map(|accessory| {
                serde_json::json!({
                    "slug": accessory.slug(),
                    "label": accessory.label(),
                    "icon": accessory.icon(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&accessories)?);
    } else {
        println!("Accessories:\n");
        for accessory in Accessory::ALL {
            println!("  {:<12} {}", accessory.slug(), accessory.label());
        }
    }
    Ok(())
}
