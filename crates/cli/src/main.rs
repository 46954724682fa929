use std::fs::File;
use std::io::BufReader;
use std::process::ExitCode;

use clap::Parser;
use trackmux::Packet;
use trackmux::timecode_factory::parse_timecode_file;

#[derive(Parser)]
#[command(
    name = "trackmux-timecodes",
    about = "Inspect an external timecode file and preview frame timecodes"
)]
struct Args {
    /// Path to the timecode file
    file: String,

    /// Number of frames to preview
    #[arg(long, short, default_value_t = 10)]
    frames: usize,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let input = match File::open(&args.file) {
        Ok(file) => BufReader::new(file),
        Err(e) => {
            eprintln!("Failed to open '{}': {}", args.file, e);
            return ExitCode::FAILURE;
        }
    };

    let parsed = match parse_timecode_file(input, &args.file, &args.file, 0) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("format version:   v{}", parsed.version);
    let default_duration = parsed.factory.get_default_duration(0);
    if default_duration > 0 {
        println!(
            "default duration: {} ns ({:.3} fps)",
            default_duration,
            1_000_000_000.0 / default_duration as f64
        );
    } else {
        println!("default duration: (none)");
    }
    println!("contains gaps:    {}", parsed.factory.contains_gap());

    let mut factory = parsed.factory;
    println!("first {} frames:", args.frames);
    for frameno in 0..args.frames {
        let probe = Packet::new(Vec::new(), 0, 0);
        let outcome = factory.get_next(&probe);
        let gap = if outcome.gap_following { "  (gap)" } else { "" };
        match outcome.duration {
            Some(duration) => println!(
                "  #{frameno}: {} ns, duration {} ns{gap}",
                outcome.timecode, duration
            ),
            None => println!("  #{frameno}: {} ns{gap}", outcome.timecode),
        }
    }

    ExitCode::SUCCESS
}
