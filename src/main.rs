//! Command-line front-end: load an image, run it through the composite
//! pipeline a few times so the color carrier converges, write the result.

use anyhow::{bail, Context};
use rustycrt::{
    image::{bmp, ppm},
    signal::{CRT_HRES, CRT_VRES},
    Crt, CrtConfig, CrtResult, Image, NtscSettings, PixelFormat,
};
use std::{
    io::{self, Write},
    path::{Path, PathBuf},
};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "rustycrt",
    about = "Integer-only NTSC composite video signal emulation"
)]
struct CliArgs {
    /// Render in monochrome (no color burst)
    #[structopt(short = "m", long = "monochrome")]
    monochrome: bool,
    /// Overwrite the output file without prompting
    #[structopt(short = "o", long = "force")]
    force: bool,
    /// Start on the odd field (only meaningful with --progressive)
    #[structopt(short = "f", long = "field")]
    field: bool,
    /// Progressive scan rather than interlaced
    #[structopt(short = "p", long = "progressive")]
    progressive: bool,
    /// Treat the source as a raw image (needed for images that use artifact colors)
    #[structopt(short = "r", long = "raw")]
    raw: bool,
    /// Save the analog signal as a grayscale image instead of the decoded image
    #[structopt(short = "a", long = "save-analog")]
    save_analog: bool,
    /// Monitor preset to apply (JSON)
    #[structopt(short = "c", long = "config", parse(from_os_str))]
    config: Option<PathBuf>,
    /// Output width
    out_width: i32,
    /// Output height
    out_height: i32,
    /// Amount of noise to add to the signal (0 and up)
    noise: i32,
    /// Artifact hue rotation [0, 359]
    hue: i32,
    /// Input image (PPM or BMP, by extension)
    #[structopt(parse(from_os_str))]
    input: PathBuf,
    /// Output image (PPM or BMP, by extension)
    #[structopt(parse(from_os_str))]
    output: PathBuf,
}

fn is_ppm(path: &Path) -> bool {
    path.extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("ppm"))
}

fn read_image(path: &Path) -> CrtResult<Image> {
    if is_ppm(path) {
        ppm::read24(path)
    } else {
        bmp::read24(path)
    }
}

fn write_image(path: &Path, image: &Image) -> CrtResult<()> {
    if is_ppm(path) {
        ppm::write24(path, image)
    } else {
        bmp::write24(path, image)
    }
}

fn prompt_overwrite(path: &Path) -> CrtResult<bool> {
    loop {
        print!(
            "--- file ({}) already exists, overwrite? (y/n) ",
            path.display()
        );
        io::stdout().flush()?;
        let mut answer = String::new();
        io::stdin().read_line(&mut answer)?;
        match answer.trim() {
            "y" | "Y" => return Ok(true),
            "n" | "N" => return Ok(false),
            _ => continue,
        }
    }
}

fn main() -> CrtResult<()> {
    let args = CliArgs::from_args();
    println!("rustycrt v{}", env!("CARGO_PKG_VERSION"));

    if args.out_width <= 0 || args.out_height <= 0 {
        bail!("output dimensions must be positive");
    }
    let noise = args.noise.max(0);
    let hue = args.hue.rem_euclid(360);

    let img = read_image(&args.input)?;
    println!("loaded {} {}", img.width(), img.height());

    if !args.force && args.output.exists() && !prompt_overwrite(&args.output)? {
        return Ok(());
    }

    let mut crt = Crt::new(args.out_width, args.out_height, PixelFormat::Bgra);
    crt.blend = true;
    crt.scanlines = 1;
    if let Some(path) = &args.config {
        let preset = CrtConfig::from_file(path)?;
        crt.apply_config(&preset);
    }

    let mut settings = NtscSettings::new(
        img.as_bytes(),
        PixelFormat::Bgra,
        img.width() as i32,
        img.height() as i32,
    );
    settings.as_color = !args.monochrome;
    settings.field = i32::from(args.field);
    settings.raw = args.raw;
    settings.hue = hue;

    println!("converting to {}x{}...", args.out_width, args.out_height);

    /* accumulate 4 frames */
    for pass in 0..4 {
        crt.modulate(&mut settings);
        crt.demodulate(noise);
        if !args.progressive {
            settings.field ^= 1;
            crt.modulate(&mut settings);
            crt.demodulate(noise);
            if pass & 1 == 0 {
                /* a frame is two fields */
                settings.frame ^= 1;
            }
        }
    }

    let out_img = if args.save_analog {
        let mut img = Image::new(CRT_HRES as usize, CRT_VRES as usize);
        for (px, &a) in img.pixels_mut().iter_mut().zip(crt.analog()) {
            let norm = (i32::from(a) + 128) as u32;
            *px = norm << 16 | norm << 8 | norm;
        }
        img
    } else {
        // The output raster is BGRA, which is exactly the packed byte view.
        let packed = crt
            .output()
            .chunks_exact(4)
            .map(|p| u32::from_le_bytes([p[0], p[1], p[2], p[3]]))
            .collect();
        Image::from_packed(
            packed,
            args.out_width as usize,
            args.out_height as usize,
        )
    };
    write_image(&args.output, &out_img)
        .with_context(|| format!("unable to write `{}`", args.output.display()))?;
    println!("done");
    Ok(())
}
