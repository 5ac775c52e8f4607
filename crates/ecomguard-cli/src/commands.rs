//! `verify` and `record` subcommands.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Args;
use ecomguard_ai::{GeminiConfig, VerdictClient};
use ecomguard_core::{CaptureContext, CapturedImage, Submission, UserId};
use ecomguard_store::{EvidenceStore, MemoryStore, RestConfig, RestStore};
use ecomguard_wizard::{StaticIdentity, WizardSession};

use crate::display;

#[derive(Args)]
pub struct RecordArgs {
    /// Shipment tracking number (resi).
    #[arg(long)]
    pub resi: String,

    /// Photo of the packed parcel.
    pub photo: PathBuf,

    /// Authenticated seller id.
    #[arg(long, env = "ECOMGUARD_USER_ID")]
    pub user_id: Option<String>,

    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub capture: CaptureArgs,

    /// Also write the appeal document to this path.
    #[arg(long)]
    pub legal_template: Option<PathBuf>,

    /// Keep records in memory instead of writing to Supabase.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct StoreArgs {
    #[arg(long, env = "SUPABASE_URL")]
    pub supabase_url: Option<String>,

    #[arg(long, env = "SUPABASE_ANON_KEY", hide_env_values = true)]
    pub supabase_anon_key: Option<String>,

    /// Signed-in user's JWT for row-level security.
    #[arg(long, env = "SUPABASE_ACCESS_TOKEN", hide_env_values = true)]
    pub supabase_access_token: Option<String>,
}

#[derive(Args)]
pub struct CaptureArgs {
    /// Device that took the photo.
    #[arg(long, env = "ECOMGUARD_DEVICE")]
    pub device: Option<String>,

    /// Where the parcel was packed.
    #[arg(long, env = "ECOMGUARD_LOCATION")]
    pub location: Option<String>,

    #[arg(long)]
    pub fps: Option<u32>,

    /// Capture quality label, e.g. "1080p".
    #[arg(long)]
    pub quality: Option<String>,
}

impl From<CaptureArgs> for CaptureContext {
    fn from(args: CaptureArgs) -> Self {
        Self {
            device: args.device,
            location: args.location,
            fps: args.fps,
            quality: args.quality,
        }
    }
}

fn open_store(args: StoreArgs, dry_run: bool) -> anyhow::Result<Arc<dyn EvidenceStore>> {
    if dry_run {
        return Ok(Arc::new(MemoryStore::new()));
    }
    let (Some(url), Some(anon_key)) = (args.supabase_url, args.supabase_anon_key) else {
        bail!("SUPABASE_URL and SUPABASE_ANON_KEY are required (or pass --dry-run)");
    };
    Ok(Arc::new(RestStore::new(RestConfig {
        url,
        anon_key,
        access_token: args.supabase_access_token,
    })))
}

async fn read_photo(path: &Path) -> anyhow::Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("reading photo {}", path.display()))
}

pub async fn run_verify(ai: &GeminiConfig, photo: &Path) -> anyhow::Result<()> {
    let verdicts = VerdictClient::from_config(ai).context("configuring AI check")?;
    let image = CapturedImage::from_bytes(read_photo(photo).await?)?;
    let verdict = verdicts.analyze(&image).await;
    print!("{}", display::verdict_card(&verdict));
    Ok(())
}

pub async fn run_record(ai: &GeminiConfig, args: RecordArgs) -> anyhow::Result<()> {
    let submission = record(ai, args).await?;
    print!("{}", display::submission_card(&submission));
    Ok(())
}

/// Drive one wizard session from tracking number to secured evidence.
async fn record(ai: &GeminiConfig, args: RecordArgs) -> anyhow::Result<Submission> {
    let verdicts = VerdictClient::from_config(ai).context("configuring AI check")?;
    let store = open_store(args.store, args.dry_run)?;
    let identity = Arc::new(StaticIdentity(args.user_id.map(UserId::new)));
    let session = WizardSession::new(verdicts, store, identity, args.capture.into());

    session.set_tracking_id(args.resi)?;
    session.advance_to_capture()?;
    eprintln!("{}", display::progress(session.snapshot().step()));

    let bytes = read_photo(&args.photo).await?;
    session
        .capture_image(bytes)?
        .await
        .context("AI check task failed")?;
    if let Some(verdict) = session.snapshot().verdict() {
        print!("{}", display::verdict_card(verdict));
    }

    let submission = session.submit().await?;
    eprintln!("{}", display::progress(session.snapshot().step()));

    if let Some(path) = &args.legal_template {
        let document = session.generate_legal_template()?;
        tokio::fs::write(path, document)
            .await
            .with_context(|| format!("writing appeal to {}", path.display()))?;
        eprintln!("appeal written to {}", path.display());
    }
    Ok(submission)
}
