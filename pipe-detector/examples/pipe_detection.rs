//Detect pipe cross-sections in one image and print what was found

use clap::{Parser, ValueEnum};
use pipe_detector::{
    loader::load_image,
    pipe_detector::{detect_pipes, PipeDetectionParameter},
    report::PipeReport,
    stage::{NoopObserver, NpyStageDump, StageObserver},
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Profile {
    Strict,
    Loose,
}

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    //path to a grey or colour JPEG/PNG/TIFF image
    #[arg(short, long)]
    image_path: String,

    #[arg(short, long, value_enum, default_value_t = Profile::Strict)]
    profile: Profile,

    //where to write the annotated image, a temporary png if omitted
    #[arg(short, long)]
    output_path: Option<String>,

    //directory receiving the intermediate stages as .npy
    #[arg(short, long)]
    dump_dir: Option<String>,
}

fn main() {
    let args = Args::parse();
    let image = match load_image(&args.image_path) {
        Ok(image) => image,
        Err(err) => {
            eprintln!("{}", err);
            std::process::exit(1);
        }
    };
    let param = match args.profile {
        Profile::Strict => PipeDetectionParameter::new_strict_param(),
        Profile::Loose => PipeDetectionParameter::new_loose_param(),
    };

    let mut observer: Box<dyn StageObserver> = match &args.dump_dir {
        Some(dir) => match NpyStageDump::new(dir) {
            Ok(dump) => Box::new(dump),
            Err(err) => {
                eprintln!("cannot create {}: {}", dir, err);
                std::process::exit(1);
            }
        },
        None => Box::new(NoopObserver),
    };

    let detection = match detect_pipes(&image, &param, observer.as_mut()) {
        Ok(detection) => detection,
        Err(err) => {
            eprintln!("{}", err);
            std::process::exit(1);
        }
    };
    let report = PipeReport::new(&image, detection);

    println!("Pipes detected: {}", report.count());
    report.detections().iter().for_each(|d| {
        println!(
            "center: ({:.1}, {:.1}) axes: ({:.1}, {:.1}) angle: {:.1}",
            d.ellipse.center[0],
            d.ellipse.center[1],
            d.ellipse.axes[0],
            d.ellipse.axes[1],
            d.ellipse.angle
        )
    });

    match report.save_annotated(args.output_path) {
        Ok(path) => println!("annotated image: {}", path),
        Err(err) => {
            eprintln!("{}", err);
            std::process::exit(1);
        }
    }
}
