use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use smtp_courier::{Draft, MailClient, RecipientKind, SendMode, ServerConfig};

/// Sends an HTML email to a list of recipients
#[derive(Parser)]
pub struct Args {
    #[clap(flatten)]
    pub smtp: ServerConfig,

    /// Recipient addresses
    #[clap(long = "to", required = true)]
    pub recipients: Vec<String>,

    /// Put recipients on visible To instead of a blind copy
    #[clap(long)]
    pub visible: bool,

    /// Subject line
    #[clap(long)]
    pub subject: String,

    /// HTML template to use as the body
    #[clap(long)]
    pub template: PathBuf,

    /// Placeholder substitutions, as KEY=VALUE
    #[clap(long = "set", value_parser = parse_placeholder)]
    pub placeholders: Vec<(String, String)>,

    /// Files to attach
    #[clap(long = "attach")]
    pub attachments: Vec<PathBuf>,
}

fn parse_placeholder(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got \"{raw}\""))
}

pub fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let (kind, mode) = if args.visible {
        (RecipientKind::To, SendMode::Individual)
    } else {
        (RecipientKind::Bcc, SendMode::Bcc)
    };

    let draft = Draft::builder()
        .add_recipients(args.recipients, kind)
        .set_subject(args.subject)
        .load_body_from_template(&args.template, args.placeholders)?
        .add_attachments(args.attachments)
        .build();

    let client = MailClient::smtp(args.smtp);
    let report = client.send(&draft, mode)?;

    if report.is_success() {
        println!("Email sent to every recipient");
    } else {
        println!("Failed recipients: {report}");
    }

    Ok(())
}
