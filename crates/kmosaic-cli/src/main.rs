use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use kmosaic_core::{
    kem, kem_decapsulate, kem_encapsulate, kem_keygen_from_seed, params::get_params, sign, sign_keygen_from_seed,
    verify, Level,
};

#[derive(Parser)]
#[command(name = "kmosaic", about = "Demonstration CLI for the kMOSAIC KEM and signature scheme")]
struct Cli {
    /// Security level
    #[arg(long, value_enum, default_value_t = CliLevel::Mos128)]
    level: CliLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum CliLevel {
    Mos128,
    Mos256,
}

impl From<CliLevel> for Level {
    fn from(l: CliLevel) -> Level {
        match l {
            CliLevel::Mos128 => Level::Mos128,
            CliLevel::Mos256 => Level::Mos256,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Generate a key pair from a hex-encoded 32-byte seed and print both as hex.
    Keygen {
        #[arg(long)]
        seed_hex: String,
    },
    /// Encapsulate a fresh shared secret against a public key.
    Encap {
        #[arg(long)]
        seed_hex: String,
    },
    /// Decapsulate a ciphertext produced by `encap` using the same seed's secret key.
    Decap {
        #[arg(long)]
        seed_hex: String,
        #[arg(long)]
        ciphertext_hex: String,
    },
    /// Sign a UTF-8 message with the multi-witness scheme.
    Sign {
        #[arg(long)]
        seed_hex: String,
        #[arg(long)]
        message: String,
    },
    /// Verify a multi-witness signature.
    Verify {
        #[arg(long)]
        seed_hex: String,
        #[arg(long)]
        message: String,
        #[arg(long)]
        signature_hex: String,
    },
}

fn decode_seed(seed_hex: &str) -> Result<[u8; 32]> {
    let bytes = hex::decode(seed_hex).context("seed must be valid hex")?;
    if bytes.len() != 32 {
        bail!("seed must decode to exactly 32 bytes, got {}", bytes.len());
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    Ok(out)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let params = get_params(cli.level.into());

    match cli.command {
        Command::Keygen { seed_hex } => {
            let seed = decode_seed(&seed_hex)?;
            let (pk, _sk) = kem_keygen_from_seed(params, &seed)?;
            println!("public_key: {}", hex::encode(kem::serialize_pk(&pk)));
        }
        Command::Encap { seed_hex } => {
            let seed = decode_seed(&seed_hex)?;
            let (pk, _sk) = kem_keygen_from_seed(params, &seed)?;
            let (ss, ct) = kem_encapsulate(&pk)?;
            println!("shared_secret: {}", hex::encode(ss));
            println!("ciphertext: {}", hex::encode(kem::serialize_ct(&ct)));
        }
        Command::Decap {
            seed_hex,
            ciphertext_hex,
        } => {
            let seed = decode_seed(&seed_hex)?;
            let (pk, sk) = kem_keygen_from_seed(params, &seed)?;
            let ct_bytes = hex::decode(&ciphertext_hex).context("ciphertext must be valid hex")?;
            let ct = kem::deserialize_ct(&ct_bytes)?;
            let ss = kem_decapsulate(&ct, &sk, &pk)?;
            println!("shared_secret: {}", hex::encode(ss));
        }
        Command::Sign { seed_hex, message } => {
            let seed = decode_seed(&seed_hex)?;
            let (pk, sk) = sign_keygen_from_seed(params, &seed)?;
            let sig = sign(message.as_bytes(), &sk, &pk)?;
            println!("signature: {}", hex::encode(sign::serialize(&sig)));
        }
        Command::Verify {
            seed_hex,
            message,
            signature_hex,
        } => {
            let seed = decode_seed(&seed_hex)?;
            let (pk, _sk) = sign_keygen_from_seed(params, &seed)?;
            let sig_bytes = hex::decode(&signature_hex).context("signature must be valid hex")?;
            let sig = sign::deserialize(&sig_bytes)?;
            let ok = verify(message.as_bytes(), &sig, &pk);
            println!("valid: {ok}");
            if !ok {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
