use argh::FromArgs;
use forgezip::{ArchiveBuilder, MEDIA_TYPE};
use indicatif::ProgressBar;
use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::exit;

/// Pack files into a stored (uncompressed) zip archive
#[derive(FromArgs)]
struct Args {
    /// where to write the archive
    #[argh(option, short = 'o')]
    output: PathBuf,
    /// folder to place every file under inside the archive
    #[argh(option, short = 'r')]
    root: Option<String>,
    /// fail instead of writing two entries with the same name
    #[argh(switch, short = 'u')]
    unique: bool,
    /// files to pack, stored under the path given here
    #[argh(positional)]
    files: Vec<PathBuf>,
}

fn archive_name(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn main() {
    tracing_subscriber::fmt::init();
    let args: Args = argh::from_env();

    let mut builder = ArchiveBuilder::new().deny_duplicates(args.unique);
    if let Some(root) = args.root {
        builder.set_root(Some(root));
    }

    let pb = ProgressBar::new(args.files.len() as u64);
    for file in &args.files {
        let content = fs::read(file).unwrap_or_else(|e| {
            println!("Error: {}: {}", file.display(), e);
            exit(1);
        });
        builder.add_file(archive_name(file), content);
        pb.inc(1);
    }
    pb.finish_and_clear();

    let out = fs::File::create(&args.output).unwrap_or_else(|e| {
        println!("Error: {}: {}", args.output.display(), e);
        exit(1);
    });
    let written = builder.write_to(&mut BufWriter::new(out)).unwrap_or_else(|e| {
        println!("Error: ({:0X}):{}", e.error_code(), e);
        exit(1);
    });

    println!(
        "{}: {} entries, {} bytes ({})",
        args.output.display(),
        builder.len(),
        written,
        MEDIA_TYPE
    );
}
