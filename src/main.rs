use std::path::PathBuf;

use clap::{arg, crate_version, Command};
use wordvec::trainer::{train, TrainingConfig};

const RCH: &str = "unreachable was reached";

/// Every flag name this binary recognizes, exactly as spec.md §6 names them
/// (`-train`, `-min-count`, …). The reference implementation's `ArgPos`
/// never distinguishes "short" from "long" flags — every option is a single
/// dash followed by its full name — which clap's short/long split can't
/// express directly (`short()` only takes one character). [`normalize_args`]
/// bridges the two: it rewrites a recognized `-name` token to `--name`
/// before handing argv to clap, so the documented single-dash surface and
/// clap's native `--name` both work identically.
const LONG_FLAG_NAMES: &[&str] = &[
    "train",
    "output",
    "size",
    "window",
    "sample",
    "hs",
    "negative",
    "threads",
    "iter",
    "min-count",
    "alpha",
    "classes",
    "binary",
    "save-vocab",
    "read-vocab",
    "cbow",
    "debug",
];

fn normalize_args(args: impl Iterator<Item = String>) -> Vec<String> {
    args.map(|arg| match arg.strip_prefix('-') {
        Some(rest) if !rest.starts_with('-') && LONG_FLAG_NAMES.contains(&rest) => {
            format!("-{arg}")
        }
        _ => arg,
    })
    .collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let long_help =
"Examples:
---------
CBOW + hierarchical softmax:  `wordvec -train corpus.txt -output vectors.txt -hs 1 -negative 0`
Skip-gram + negative sampling: `wordvec -train corpus.txt -output vectors.bin -cbow 0 -binary 1`";

    let cmd = Command::new("wordvec")
        .about("Train word embeddings with CBOW/skip-gram and hierarchical softmax/negative sampling")
        .after_long_help(long_help)
        .version(crate_version!())
        .arg(arg!(--train <PATH> "training corpus").required(true))
        .arg(arg!(--output <PATH> "output model path").default_value(""))
        .arg(arg!(--size <N> "word vector dimensionality").default_value("100"))
        .arg(arg!(--window <N> "context window radius").default_value("5"))
        .arg(arg!(--sample <F> "subsampling threshold, 0 disables").default_value("1e-3"))
        .arg(arg!(--hs <N> "enable hierarchical softmax (0/1)").default_value("0"))
        .arg(arg!(--negative <N> "number of negative samples, 0 disables").default_value("5"))
        .arg(arg!(--threads <N> "number of training threads").default_value("12"))
        .arg(arg!(--iter <N> "number of training epochs").default_value("5"))
        .arg(arg!(--"min-count" <N> "drop words occurring fewer than N times").default_value("5"))
        .arg(arg!(--alpha <F> "starting learning rate").default_value(""))
        .arg(arg!(--classes <N> "emit N K-means classes instead of vectors").default_value("0"))
        .arg(arg!(--binary <N> "write vectors in binary format (0/1)").default_value("0"))
        .arg(arg!(--"save-vocab" <PATH> "write vocabulary after pass one").default_value(""))
        .arg(arg!(--"read-vocab" <PATH> "skip pass one, load vocabulary from PATH").default_value(""))
        .arg(arg!(--cbow <N> "1=CBOW, 0=skip-gram").default_value("1"))
        .arg(arg!(--debug <N> "verbosity").default_value("2"));

    let matches = cmd.get_matches_from(normalize_args(std::env::args()));

    let non_empty = |key: &str| -> Option<PathBuf> {
        let v = matches.get_one::<String>(key).expect(RCH);
        (!v.is_empty()).then(|| PathBuf::from(v))
    };

    let cbow: bool = matches.get_one::<String>("cbow").expect(RCH) != "0";
    let alpha_flag = matches.get_one::<String>("alpha").expect(RCH);
    let alpha: f32 = if alpha_flag.is_empty() {
        if cbow {
            0.05
        } else {
            0.025
        }
    } else {
        alpha_flag.parse()?
    };

    let config = TrainingConfig {
        train_file: PathBuf::from(matches.get_one::<String>("train").expect(RCH)),
        output_file: non_empty("output"),
        save_vocab_file: non_empty("save-vocab"),
        read_vocab_file: non_empty("read-vocab"),
        size: matches.get_one::<String>("size").expect(RCH).parse()?,
        window: matches.get_one::<String>("window").expect(RCH).parse()?,
        sample: matches.get_one::<String>("sample").expect(RCH).parse()?,
        hs: matches.get_one::<String>("hs").expect(RCH) != "0",
        negative: matches.get_one::<String>("negative").expect(RCH).parse()?,
        threads: matches.get_one::<String>("threads").expect(RCH).parse()?,
        iter: matches.get_one::<String>("iter").expect(RCH).parse()?,
        min_count: matches.get_one::<String>("min-count").expect(RCH).parse()?,
        alpha,
        classes: matches.get_one::<String>("classes").expect(RCH).parse()?,
        binary: matches.get_one::<String>("binary").expect(RCH) != "0",
        cbow,
        debug: matches.get_one::<String>("debug").expect(RCH).parse()?,
    };

    if !config.train_file.exists() {
        eprintln!("training data file not found: {}", config.train_file.display());
        std::process::exit(1);
    }
    if let Some(path) = &config.read_vocab_file {
        if !path.exists() {
            eprintln!("vocabulary file not found: {}", path.display());
            std::process::exit(1);
        }
    }

    train(&config)?;
    Ok(())
}
