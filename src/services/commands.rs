// src/services/commands.rs
//! Command handlers.
//!
//! Each subcommand builds the clients it needs from [`Settings`], runs one
//! service call and renders the result to `out`. Status lines and results go
//! to `out`; prompts and log lines go to stderr.

use crate::cli::{AkaArgs, Commands, DidArgs, KeysArgs, RotationArgs};
use crate::config::Settings;
use crate::directory::DirectoryClient;
use crate::models::credentials::DidCredentials;
use crate::pds::PdsClient;
use crate::services::did_updater::{DidUpdater, Mutation, UpdateOutcome, UpdateRequest};
use crate::services::resolver::Resolver;
use crate::utils::prompt::Prompter;
use crate::utils::serialization::to_pretty_json;
use crate::wallet::key_management::Keypair;
use anyhow::{Context, Result};
use std::io::Write;

/// Runs one parsed command.
///
/// # Arguments
/// * `command` - The parsed subcommand
/// * `settings` - Endpoints and the optional configured password
/// * `prompter` - Source of the password and confirmation code
/// * `out` - Destination of results
///
/// # Errors
/// Any [`crate::errors::DidError`] from the command, with context naming the
/// account or identifier involved.
pub async fn run<P: Prompter, W: Write>(
    command: Commands,
    settings: Settings,
    prompter: &mut P,
    out: &mut W,
) -> Result<()> {
    match command {
        Commands::Keys(args) => keys(args, out),
        Commands::Aka(args) => {
            let settings = settings.with_pds(args.pds.as_deref());
            aka(args, &settings, prompter, out).await
        }
        Commands::Did(args) => {
            let settings = settings.with_pds(args.pds.as_deref());
            did(args, &settings, out).await
        }
        Commands::Rotation(args) => {
            let settings = settings.with_pds(args.pds.as_deref());
            rotation(args, &settings, prompter, out).await
        }
    }
}

fn keys<W: Write>(args: KeysArgs, out: &mut W) -> Result<()> {
    let keypair = Keypair::generate();
    log::debug!("generated {keypair:?}");
    writeln!(out, "{}", keypair.export(args.format)?)?;
    Ok(())
}

async fn aka<P: Prompter, W: Write>(
    args: AkaArgs,
    settings: &Settings,
    prompter: &mut P,
    out: &mut W,
) -> Result<()> {
    let mutation = Mutation::link_urls(&args.urls)?;
    let request = UpdateRequest {
        handle: args.handle,
        password: settings.password.clone(),
        mutation,
    };

    let outcome = update(settings, &request, prompter).await?;
    let credentials = match outcome {
        UpdateOutcome::Submitted(credentials) => {
            writeln!(out, "Updated alternate identifiers of {}", request.handle)?;
            credentials
        }
        UpdateOutcome::AlreadyPresent(credentials) | UpdateOutcome::KeyNotFound(credentials) => {
            writeln!(out, "Every URL is already linked, nothing to do")?;
            credentials
        }
    };
    writeln!(out, "alsoKnownAs: {}", to_pretty_json(&credentials.also_known_as)?)?;
    Ok(())
}

async fn did<W: Write>(args: DidArgs, settings: &Settings, out: &mut W) -> Result<()> {
    let provider = PdsClient::new(&settings.pds_url);
    let directory = DirectoryClient::new(&settings.plc_url);
    let resolver = Resolver::new(&provider, &directory);
    let target = args.handle_or_did.as_str();

    let rendered = if args.log {
        let history = resolver
            .fetch_history(target)
            .await
            .with_context(|| format!("failed to fetch the history of {target}"))?;
        to_pretty_json(&history)?
    } else {
        let document = resolver
            .fetch_document(target)
            .await
            .with_context(|| format!("failed to fetch the document of {target}"))?;
        to_pretty_json(&document)?
    };
    writeln!(out, "{rendered}")?;
    Ok(())
}

async fn rotation<P: Prompter, W: Write>(
    args: RotationArgs,
    settings: &Settings,
    prompter: &mut P,
    out: &mut W,
) -> Result<()> {
    // Only a key generated here is printed; an imported one is already known.
    let (mutation, generated) = match (&args.remove, &args.private_key_hex) {
        (Some(key), _) => (Mutation::remove_rotation_key(key)?, None),
        (None, Some(private_key_hex)) => {
            let keypair = Keypair::import(private_key_hex)?;
            (Mutation::add_rotation_key(&keypair.did_key())?, None)
        }
        (None, None) => {
            let keypair = Keypair::generate();
            (Mutation::add_rotation_key(&keypair.did_key())?, Some(keypair))
        }
    };
    let removing = matches!(mutation, Mutation::RemoveRotationKey(_));
    let request = UpdateRequest {
        handle: args.handle,
        password: settings.password.clone(),
        mutation,
    };

    let outcome = update(settings, &request, prompter).await?;
    let credentials = match &outcome {
        UpdateOutcome::Submitted(credentials) => {
            let verb = if removing { "Removed" } else { "Added" };
            writeln!(out, "{verb} rotation key for {}", request.handle)?;
            credentials
        }
        UpdateOutcome::AlreadyPresent(credentials) => {
            writeln!(out, "Key is already a rotation key, nothing to do")?;
            credentials
        }
        UpdateOutcome::KeyNotFound(credentials) => {
            writeln!(out, "Key is not a rotation key, nothing to do")?;
            credentials
        }
    };
    print_rotation_keys(credentials, out)?;

    if let (Some(keypair), UpdateOutcome::Submitted(_)) = (generated, &outcome) {
        writeln!(out, "New rotation keypair:")?;
        writeln!(out, "{}", keypair.export(args.format)?)?;
    }
    Ok(())
}

/// Runs the update workflow against the configured endpoints.
async fn update<P: Prompter>(
    settings: &Settings,
    request: &UpdateRequest,
    prompter: &mut P,
) -> Result<UpdateOutcome> {
    let provider = PdsClient::new(&settings.pds_url);
    let directory = DirectoryClient::new(&settings.plc_url);
    log::debug!("identity provider: {}", provider.base_url());
    let mut updater = DidUpdater::new(&provider, &directory);

    let result = updater.run(request, prompter).await;
    log::debug!("update of {} ended in {:?}", request.handle, updater.state());
    result.with_context(|| format!("failed to update {}", request.handle))
}

fn print_rotation_keys<W: Write>(credentials: &DidCredentials, out: &mut W) -> Result<()> {
    writeln!(out, "rotationKeys: {}", to_pretty_json(&credentials.rotation_keys)?)?;
    Ok(())
}
