// src/cli.rs
//! Command-line interface.
//!
//! Four subcommands: `keys`, `aka`, `did` and `rotation`.

use crate::wallet::key_management::KeyFormat;
use clap::{Args, Parser, Subcommand};

/// Inspect and update did:plc / did:web identity documents.
#[derive(Parser, Debug)]
#[command(name = "did-toolkit", version, propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a secp256k1 keypair.
    Keys(KeysArgs),
    /// Link URLs into an account's alsoKnownAs list.
    Aka(AkaArgs),
    /// Print the DID document, or the change history, of a handle or DID.
    Did(DidArgs),
    /// Add a rotation key to an account (generating one if none is given), or remove one.
    Rotation(RotationArgs),
}

#[derive(Args, Debug)]
pub struct KeysArgs {
    /// Output encoding.
    #[arg(long, value_enum, default_value_t = KeyFormat::Json)]
    pub format: KeyFormat,
}

#[derive(Args, Debug)]
pub struct AkaArgs {
    /// Account handle to log in as.
    pub handle: String,

    /// URLs to link.
    #[arg(required = true)]
    pub urls: Vec<String>,

    /// Identity provider URL.
    #[arg(long)]
    pub pds: Option<String>,
}

#[derive(Args, Debug)]
pub struct DidArgs {
    /// Handle (optionally prefixed with @) or DID.
    #[arg(value_name = "HANDLE_OR_DID")]
    pub handle_or_did: String,

    /// Identity provider URL, used for handle resolution.
    #[arg(long)]
    pub pds: Option<String>,

    /// Print the audit log instead of the document (did:plc only).
    #[arg(long)]
    pub log: bool,
}

#[derive(Args, Debug)]
pub struct RotationArgs {
    /// Account handle to log in as.
    pub handle: String,

    /// Private key (64 hex characters) whose public key should be added.
    /// A new key is generated when omitted.
    #[arg(value_name = "PRIVATE_KEY_HEX")]
    pub private_key_hex: Option<String>,

    /// Identity provider URL.
    #[arg(long)]
    pub pds: Option<String>,

    /// Output encoding of a newly generated key.
    #[arg(long, value_enum, default_value_t = KeyFormat::Json)]
    pub format: KeyFormat,

    /// Remove this key (did:key or bare multibase) instead of adding one.
    #[arg(long, value_name = "KEY", conflicts_with = "private_key_hex")]
    pub remove: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_keys_format() {
        let cli = Cli::try_parse_from(["did-toolkit", "keys", "--format", "jwk"]).unwrap();
        assert!(matches!(cli.command, Commands::Keys(KeysArgs { format: KeyFormat::Jwk })));
        let cli = Cli::try_parse_from(["did-toolkit", "keys"]).unwrap();
        assert!(matches!(cli.command, Commands::Keys(KeysArgs { format: KeyFormat::Json })));
        assert!(Cli::try_parse_from(["did-toolkit", "keys", "--format", "pem"]).is_err());
    }

    #[test]
    fn test_aka_requires_a_url() {
        assert!(Cli::try_parse_from(["did-toolkit", "aka", "alice.example"]).is_err());
        let cli = Cli::try_parse_from([
            "did-toolkit",
            "aka",
            "alice.example",
            "https://github.com/alice",
            "https://example.org/alice",
            "--pds",
            "https://pds.alice.example",
        ])
        .unwrap();
        let Commands::Aka(args) = cli.command else {
            panic!("parsed the wrong subcommand");
        };
        assert_eq!(args.urls.len(), 2);
        assert_eq!(args.pds.as_deref(), Some("https://pds.alice.example"));
    }

    #[test]
    fn test_did_log_flag() {
        let cli = Cli::try_parse_from(["did-toolkit", "did", "@alice.example", "--log"]).unwrap();
        let Commands::Did(args) = cli.command else {
            panic!("parsed the wrong subcommand");
        };
        assert!(args.log);
        assert_eq!(args.handle_or_did, "@alice.example");
    }

    #[test]
    fn test_rotation_remove_conflicts_with_key() {
        let cli = Cli::try_parse_from(["did-toolkit", "rotation", "alice.example", "--remove", "zQ3sh"])
            .unwrap();
        let Commands::Rotation(args) = cli.command else {
            panic!("parsed the wrong subcommand");
        };
        assert_eq!(args.remove.as_deref(), Some("zQ3sh"));
        assert!(args.private_key_hex.is_none());

        let key = "1".repeat(64);
        let both = Cli::try_parse_from([
            "did-toolkit",
            "rotation",
            "alice.example",
            key.as_str(),
            "--remove",
            "zQ3sh",
        ]);
        assert!(both.is_err());
    }
}
