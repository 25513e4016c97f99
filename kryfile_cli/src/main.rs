use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args as ClapArgs, Parser, Subcommand};
use rayon::prelude::*;

use kryfile::{AesKey, Error, Header, Keying, KryFile, StaticKey};

#[derive(ClapArgs, Debug)]
struct KeyArgs {
    /// 47-byte patch secret for "8O" containers
    #[arg(short, long, conflicts_with = "dongle_key")]
    secret: Option<String>,

    /// Base64 encoded 24-byte AES key standing in for the dongle, for ":|"
    /// containers on builds without one
    #[arg(short, long)]
    dongle_key: Option<String>,
}

#[derive(Parser, Debug)]
struct ActionInfo {
    /// Input container path
    #[arg(index = 1)]
    input: String,
}

#[derive(Parser, Debug)]
struct ActionDecrypt {
    /// Input container paths
    #[arg(index = 1, required = true)]
    input: Vec<String>,

    /// Output directory. Defaults to next to each input
    #[arg(short, long)]
    output: Option<String>,

    #[command(flatten)]
    keys: KeyArgs,

    /// Verbose
    #[arg(short, long, default_value = "false")]
    verbose: bool,
}

#[derive(Parser, Debug)]
struct ActionGet {
    /// Input container path
    #[arg(index = 1)]
    input: String,

    #[command(flatten)]
    keys: KeyArgs,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// Print container header info
    Info(ActionInfo),
    /// Decrypt containers to plaintext files
    Decrypt(ActionDecrypt),
    /// Read a single container to stdout
    Get(ActionGet),
}

#[derive(Parser, Debug)]
#[command(author, version)]
struct Args {
    #[command(subcommand)]
    action: Action,
}

fn main() -> Result<(), Error> {
    env_logger::init();
    let args = Args::parse();

    match args.action {
        Action::Info(args) => info(args),
        Action::Decrypt(args) => decrypt(args),
        Action::Get(args) => get(args),
    }
}

fn keying(args: &KeyArgs) -> Result<Keying, Error> {
    match (&args.secret, &args.dongle_key) {
        (Some(secret), _) => Keying::secret(secret.as_bytes()),
        (None, Some(key)) => {
            use base64::{engine::general_purpose, Engine as _};
            let bytes = general_purpose::STANDARD
                .decode(key)
                .map_err(|_| Error::Base64)?;
            let key: [u8; 24] = bytes.try_into().map_err(|_| Error::KeyLength)?;
            Ok(Keying::dongle(Arc::new(StaticKey(AesKey(key)))))
        }
        (None, None) => Err(Error::MissingKey),
    }
}

fn info(args: ActionInfo) -> Result<(), Error> {
    let mut reader = File::open(&args.input).map_err(|source| Error::CannotOpen {
        path: args.input.clone(),
        source,
    })?;
    let header = Header::read(&mut reader)?;
    println!("kind: {}", header.kind);
    println!("plaintext length: {}", header.plaintext_len);
    println!("subkey length: {}", header.subkey.len());
    Ok(())
}

const STYLE: &str = "[{elapsed_precise}] [{wide_bar}] {pos}/{len} ({eta})";

fn decrypt(args: ActionDecrypt) -> Result<(), Error> {
    let keying = keying(&args.keys)?;
    let output = args.output.map(PathBuf::from);
    if let Some(dir) = &output {
        fs::create_dir_all(dir)?;
    }

    use indicatif::ParallelProgressIterator;
    let iter = args
        .input
        .par_iter()
        .progress_with_style(indicatif::ProgressStyle::with_template(STYLE).unwrap());
    let progress = iter.progress.clone();
    iter.try_for_each(|input| -> Result<(), Error> {
        let out_path = match &output {
            Some(dir) => dir.join(
                Path::new(input)
                    .with_extension("")
                    .file_name()
                    .expect("will be a file"),
            ),
            None => Path::new(input).with_extension(""),
        };
        if out_path == Path::new(input) {
            return Err(Error::OutputCollision(input.clone()));
        }
        if args.verbose {
            progress.println(format!("decrypting {input}"));
        }
        let mut file = KryFile::open(input, keying.clone())?;
        let mut out = File::create(&out_path)?;
        io::copy(&mut file, &mut out)?;
        Ok(())
    })?;

    println!("Decrypted {} files", args.input.len());

    Ok(())
}

fn get(args: ActionGet) -> Result<(), Error> {
    let keying = keying(&args.keys)?;
    let mut file = KryFile::open(&args.input, keying)?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)?;
    io::stdout().write_all(&buf)?;
    Ok(())
}
