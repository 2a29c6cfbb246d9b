use std::path::PathBuf;
use anyhow::{bail, Context, Result};
use clap::Parser;
use console::style;
use image::GenericImageView;

use wallsort::features::{bound_image, by_category, kmeans_colors, render_palette};
use wallsort::terminal::init_logging;

#[derive(Parser)]
#[command(
    name = "palette",
    version,
    about = "Show the color palette of an image",
    long_about = "Extract the dominant colors of a single image and print them grouped into vibrant, dark, light, muted and medium colors."
)]
struct Cli {
    /// Image to analyse
    #[arg(value_name = "IMAGE", help = "Image file to analyse")]
    image: PathBuf,

    /// Number of colors to extract
    #[arg(value_name = "COLORS", default_value = "8", help = "Number of colors to extract")]
    colors: usize,

    /// Save the palette as swatches
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Save a swatch image of the palette (e.g. palette.png)"
    )]
    save: Option<PathBuf>,

    /// Verbose output
    #[arg(
        short,
        long,
        help = "Enable verbose output"
    )]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_logging(args.verbose);

    if args.colors == 0 {
        bail!("Number of colors must be at least 1");
    }

    let image = image::open(&args.image)
        .with_context(|| format!("Could not load image {}", args.image.display()))?;
    let (width, height) = image.dimensions();

    println!("{}", style("Extracting color palette...").cyan());
    let pixels = bound_image(image, 800, 600).to_rgb8();
    let colors = kmeans_colors(&pixels, args.colors, 20);

    let categories = by_category(&colors);

    println!();
    println!("{}", style("🎨 Color Palette Analysis").green().bold());
    println!("{}", style("-".repeat(20)).green());
    println!("Image size: {}x{} pixels", width, height);
    println!();

    for (category, members) in categories {
        println!("{} Colors ({}):", style(category.label()).bold(), members.len());
        for color in members {
            let [r, g, b] = color.rgb;
            println!(
                "  {} RGB({}, {}, {}) - {:.1}% (H:{:.0}° S:{:.0}% B:{:.0}%)",
                style("██").color256(ansi256(color.rgb)),
                r,
                g,
                b,
                color.weight * 100.0,
                color.hue,
                color.saturation * 100.0,
                color.brightness * 100.0
            );
        }
        println!();
    }

    if let Some(path) = &args.save {
        render_palette(&colors, 64)
            .save(path)
            .with_context(|| format!("Failed to save palette to {}", path.display()))?;
        println!("{} {}", style("✅ Palette saved to").green().bold(), path.display());
    }

    Ok(())
}

/// Nearest color in the 6x6x6 cube of the 256-color palette
fn ansi256(rgb: [u8; 3]) -> u8 {
    let level = |v: u8| ((v as u16 * 5 + 127) / 255) as u8;
    16 + 36 * level(rgb[0]) + 6 * level(rgb[1]) + level(rgb[2])
}
