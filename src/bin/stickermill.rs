use std::{
    path::{Path, PathBuf},
    sync::Arc,
    sync::atomic::AtomicBool,
    time::Duration,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use stickermill::{
    AnimationDescriptor, AnimationKind, ExportArtifact, ExportOptions, GifAnimationEncoder,
    PixelBuffer, SplitMix64, Sticker, export_with_fallback,
};

#[derive(Parser, Debug)]
#[command(name = "stickermill", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export an animated sticker GIF (falls back to a still PNG when the
    /// animation is inactive or encoding fails).
    Export(ExportArgs),
    /// Export a still sticker PNG.
    Still(StillArgs),
}

#[derive(Parser, Debug)]
struct ExportArgs {
    /// Input base image (PNG or JPEG).
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output path.
    #[arg(long)]
    out: PathBuf,

    /// Animation style applied to the whole sticker.
    #[arg(long, value_enum, default_value_t = AnimChoice::Swing)]
    anim: AnimChoice,

    /// Animation speed, 1-10.
    #[arg(long, default_value_t = 5)]
    speed: u8,

    /// Animation intensity, 1-10.
    #[arg(long, default_value_t = 5)]
    intensity: u8,

    /// Encoder deadline in seconds.
    #[arg(long, default_value_t = 60)]
    timeout: u64,

    /// Make near-white pixels transparent before compositing.
    #[arg(long)]
    remove_bg: bool,
}

#[derive(Parser, Debug)]
struct StillArgs {
    /// Input base image (PNG or JPEG).
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Make near-white pixels transparent.
    #[arg(long)]
    remove_bg: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum AnimChoice {
    None,
    Swing,
    Bounce,
    Rotate,
    Scale,
    Shake,
    Pulse,
}

impl From<AnimChoice> for AnimationKind {
    fn from(choice: AnimChoice) -> Self {
        match choice {
            AnimChoice::None => Self::None,
            AnimChoice::Swing => Self::Swing,
            AnimChoice::Bounce => Self::Bounce,
            AnimChoice::Rotate => Self::Rotate,
            AnimChoice::Scale => Self::Scale,
            AnimChoice::Shake => Self::Shake,
            AnimChoice::Pulse => Self::Pulse,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stickermill=info".into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Export(args) => cmd_export(args),
        Command::Still(args) => cmd_still(args),
    }
}

fn load_sticker(path: &Path, remove_bg: bool) -> anyhow::Result<Sticker> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read base image '{}'", path.display()))?;
    let mut base = PixelBuffer::decode(&bytes, stickermill::CANONICAL_SIZE)?;
    if remove_bg {
        base.knock_out_light_background(245);
    }
    Ok(Sticker::new(base))
}

fn write_out(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(path, bytes).with_context(|| format!("write '{}'", path.display()))?;
    eprintln!("wrote {}", path.display());
    Ok(())
}

fn cmd_export(args: ExportArgs) -> anyhow::Result<()> {
    let mut sticker = load_sticker(&args.in_path, args.remove_bg)?;
    sticker.animation = AnimationDescriptor::new(args.anim.into(), args.speed, args.intensity);
    sticker.animation.validate()?;

    let opts = ExportOptions {
        encode_timeout: Duration::from_secs(args.timeout),
        ..ExportOptions::default()
    };
    let font = stickermill::text::load_system_font();
    let artifact = export_with_fallback(
        &sticker,
        GifAnimationEncoder,
        font.as_ref(),
        &mut SplitMix64::from_entropy(),
        &opts,
        Arc::new(AtomicBool::new(false)),
    )?;

    if let ExportArtifact::StillPng(_) = &artifact {
        eprintln!("note: exported a still PNG, not an animation");
    }
    write_out(&args.out, artifact.bytes())
}

fn cmd_still(args: StillArgs) -> anyhow::Result<()> {
    let sticker = load_sticker(&args.in_path, args.remove_bg)?;
    let font = stickermill::text::load_system_font();
    let frame = stickermill::compose_still(&sticker, stickermill::EXPORT_SIZE, font.as_ref())?;
    write_out(&args.out, &stickermill::encode_still_png(&frame)?)
}
