use std::path::Path;
use std::time::Instant;

use clap::{arg, value_parser, ArgMatches, Command};
use lz77_tree::oracle::measure;
use lz77_tree::{compress, decompress, tokenize, Config};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_logging(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    // LZ77_LOG wins over -v so individual modules can be turned up
    let filter = EnvFilter::try_from_env("LZ77_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn config_from(matches: &ArgMatches) -> Result<Config, lz77_tree::Error> {
    let defaults = Config::default();
    let config = Config {
        window_size: matches
            .get_one::<usize>("window")
            .copied()
            .unwrap_or(defaults.window_size),
        max_match_length: matches
            .get_one::<usize>("max_match")
            .copied()
            .unwrap_or(defaults.max_match_length),
        min_match_length: matches
            .get_one::<usize>("min_match")
            .copied()
            .unwrap_or(defaults.min_match_length),
    };
    config.validate()?;
    Ok(config)
}

// run `f` over one file, or over every file in a directory when batching
fn each_file(
    matches: &ArgMatches,
    f: impl Fn(&[u8]) -> Result<Vec<u8>, lz77_tree::Error>,
) -> Result<(), Box<dyn std::error::Error>> {
    let inp = matches.get_one::<String>("in").unwrap();
    let out = matches.get_one::<String>("out").unwrap();
    if matches.get_flag("batch") {
        for entry in std::fs::read_dir(inp)? {
            let entry = entry?;
            let indata = std::fs::read(entry.path())?;
            let outdata = f(&indata)?;
            info!(file = ?entry.file_name(), input = indata.len(), output = outdata.len(), "done");
            let dest = Path::new(out).join(entry.file_name());
            std::fs::write(dest, outdata)?;
        }
    } else {
        let inp_file = std::fs::read(inp)?;
        let outbuf = f(&inp_file)?;
        info!(input = inp_file.len(), output = outbuf.len(), "done");
        std::fs::write(out, outbuf)?;
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = Command::new("lz77-tree")
        .about("LZ77 compressor built on a binary search tree match finder")
        .arg(
            arg!(-w --window <BYTES> "Sliding window size (history + lookahead)")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            arg!(-m --max_match <BYTES> "Lookahead size; matches are at most one byte shorter")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            arg!(-n --min_match <BYTES> "Shortest match worth a back-reference")
                .value_parser(value_parser!(usize)),
        )
        .arg(arg!(-v --verbose ... "More logging (repeat for more)"))
        .subcommand(
            Command::new("decompress")
                .alias("decomp")
                .arg(arg!(<in> "input (compressed) filename"))
                .arg(arg!(<out> "output filename"))
                .arg(arg!(-b --batch "treat inputs as directories, decompress every file in <in> to a file in <out>")),
        )
        .subcommand(
            Command::new("compress")
                .alias("comp")
                .arg(arg!(<in> "input filename"))
                .arg(arg!(<out> "output (compressed) filename"))
                .arg(arg!(-b --batch "treat inputs as directories, compress every file in <in> to a file in <out>")),
        )
        .subcommand(
            Command::new("analyze")
                .about("Compare the tree's matches against an exhaustive search")
                .arg(arg!(<in> "input filename"))
                .arg(arg!(-t --tokens "print every token")),
        )
        .subcommand(
            Command::new("bench-compress")
                .arg(arg!(<dir>))
                .arg(
                    arg!(-i --iters <iters>)
                        .default_value("1")
                        .value_parser(value_parser!(usize)),
                )
                .arg(arg!(-d --check_dir <dir>)),
        )
        .subcommand_required(true)
        .get_matches();

    init_logging(matches.get_count("verbose"));
    let config = config_from(&matches)?;
    info!(?config, "starting");

    let compress_one = |inp: &[u8]| -> Result<Vec<u8>, lz77_tree::Error> {
        let mut out = vec![];
        compress(inp, &config, &mut out)?;
        Ok(out)
    };
    let decompress_one = |inp: &[u8]| -> Result<Vec<u8>, lz77_tree::Error> {
        let mut out = vec![];
        decompress(inp, &mut out)?;
        Ok(out)
    };

    match matches.subcommand() {
        Some(("decompress", matches)) => each_file(matches, decompress_one)?,
        Some(("compress", matches)) => each_file(matches, compress_one)?,
        Some(("analyze", matches)) => {
            let inp = std::fs::read(matches.get_one::<String>("in").unwrap())?;
            let tokens = tokenize(&inp, &config)?;
            if matches.get_flag("tokens") {
                for t in &tokens {
                    println!("{:?}", t);
                }
            }
            let gap = measure(&inp, &tokens, &config);
            let references = tokens.iter().filter(|t| t.length > 0).count();
            println!(
                "{} bytes, {} tokens ({} references, {} literals)",
                inp.len(),
                tokens.len(),
                references,
                tokens.len() - references
            );
            println!(
                "tree found the longest match in {}/{} steps, missed {} bytes total, worst step {} bytes short",
                gap.optimal_steps, gap.steps, gap.missed_bytes, gap.worst_gap
            );
        }
        Some(("bench-compress", matches)) => {
            let iters = *matches.get_one::<usize>("iters").unwrap();
            let dir = matches.get_one::<String>("dir").unwrap();
            let checkd = matches.get_one::<String>("check_dir");
            let mut files = vec![];
            for entry in std::fs::read_dir(dir)? {
                files.push(entry?.path());
            }
            files.sort();
            for iter in 0..iters {
                if iter > 0 {
                    println!("--- iteration {} ---", iter + 1);
                }
                for f in &files {
                    let inp = std::fs::read(f)?;
                    let now = Instant::now();
                    let out = compress_one(&inp)?;
                    let duration = now.elapsed();
                    let fname = f.file_name().unwrap_or_default().to_string_lossy();
                    println!("File {} len = {}, took {:.2?}", fname, out.len(), duration);
                    let decomp = decompress_one(&out)?;
                    assert!(decomp == inp, "Decompression output mismatch!!");
                    if let Some(d) = checkd {
                        let expected = Path::new(d).join(f.file_name().unwrap_or_default());
                        let expected_size = std::fs::metadata(expected)?.len();
                        assert!(out.len() == expected_size as usize,
                            "unexpected compressed file size! expected {}", expected_size);
                    }
                }
            }
        }
        _ => unreachable!(),
    }
    Ok(())
}
