#![forbid(unsafe_code)]
//! DocuChain command line: anchor, look up and audit document fingerprints.

use clap::{Parser, Subcommand};
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::Color as TableColor;
use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use docuchain::blockchain::{Block, DocumentRecord, Ledger};
use docuchain::config::{load_config_from, DEFAULT_CONFIG_PATH};
use docuchain::crypto::{derive_cert_id, hash_document, hash_file, is_document_hash};
use docuchain::view::{chain_views, format_date, BlockView, Visibility};
use rand::Rng;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Anchors a document's fingerprint to the ledger
    Anchor {
        /// The document to anchor
        file: PathBuf,
        /// Document classification, e.g. "Academic Certificate"
        #[arg(long = "type")]
        document_type: String,
        /// The issuing party
        #[arg(long)]
        issuer: String,
        /// Name of the document holder
        #[arg(long)]
        holder: Option<String>,
        /// Certificate id; derived from holder and fingerprint when omitted
        #[arg(long)]
        cert_id: Option<String>,
        #[arg(long)]
        validity: Option<String>,
        /// Photo reference stored with the block
        #[arg(long)]
        photo: Option<String>,
        /// Anchor even if the fingerprint is already on the ledger
        #[arg(long)]
        allow_duplicate: bool,
    },
    /// Checks whether a document is anchored
    Check {
        file: PathBuf,
    },
    /// Looks up a block by document fingerprint
    Find {
        hash: String,
    },
    /// Verifies the integrity of the whole chain
    Verify,
    /// Lists every block
    List {
        /// Redact issuers and timestamps as in the public listing
        #[arg(long)]
        public: bool,
    },
    /// Lists documents issued to a holder
    Holder {
        name: String,
    },
    /// Lists documents anchored by an issuer
    Issuer {
        name: String,
    },
    /// Appends backdated demo documents
    Seed {
        #[arg(long, default_value_t = 5)]
        count: usize,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = load_config_from(&cli.config)?;
    let ledger = Ledger::from_config(&config.storage)?;

    match cli.command {
        Commands::Anchor {
            file,
            document_type,
            issuer,
            holder,
            cert_id,
            validity,
            photo,
            allow_duplicate,
        } => {
            let document_hash = hash_file(&file)?;
            if let Some(existing) = ledger.find_by_document_hash(&document_hash) {
                if !allow_duplicate {
                    println!(
                        "{}",
                        "⚠️  This exact document is already anchored on the ledger.".yellow()
                    );
                    print_block(&existing);
                    return Ok(());
                }
            }

            let holder_name = holder.clone().unwrap_or_default();
            let cert_id = cert_id.unwrap_or_else(|| derive_cert_id(&holder_name, &document_hash));
            let mut record = DocumentRecord::new(document_type, issuer, document_hash).with_cert_id(cert_id);
            record.student_name = holder;
            record.validity = validity;
            record.student_image = photo;

            let block = ledger.append(record)?;
            println!("{}", "✅ Document anchored.".bright_green().bold());
            print_block(&block);
        }
        Commands::Check { file } => {
            let document_hash = hash_file(&file)?;
            report_lookup(&ledger, &document_hash);
        }
        Commands::Find { hash } => {
            let hash = hash.trim().to_ascii_lowercase();
            if !is_document_hash(&hash) {
                println!("{}", "⚠️  Not a SHA-256 fingerprint; searching anyway.".yellow());
            }
            report_lookup(&ledger, &hash);
        }
        Commands::Verify => {
            let report = ledger.verify_report();
            match report.failure {
                None => println!(
                    "{} ({} blocks)",
                    "🔒 Chain integrity: VALID".bright_green().bold(),
                    report.blocks_checked
                ),
                Some(failure) => {
                    println!("{}", "❌ Chain integrity: INVALID".red().bold());
                    println!("   Block #{}: {}", failure.index, failure.fault);
                    std::process::exit(1);
                }
            }
        }
        Commands::List { public } => {
            let visibility = if public {
                Visibility::Public
            } else {
                Visibility::Authenticated
            };
            print_table(&chain_views(&ledger.blocks(), visibility));
            let status = if ledger.verify() {
                "VALID".bright_green()
            } else {
                "INVALID".red()
            };
            println!("Chain integrity: {}", status.bold());
        }
        Commands::Holder { name } => {
            print_table(&chain_views(&ledger.blocks_for_holder(&name), Visibility::Authenticated));
        }
        Commands::Issuer { name } => {
            print_table(&chain_views(&ledger.blocks_by_issuer(&name), Visibility::Authenticated));
        }
        Commands::Seed { count } => {
            seed(&ledger, count)?;
        }
    }

    Ok(())
}

fn report_lookup(ledger: &Ledger, document_hash: &str) {
    match ledger.find_by_document_hash(document_hash) {
        Some(block) => {
            println!("{}", "✅ Authentic: document found on the ledger.".bright_green().bold());
            print_block(&block);
        }
        None => {
            println!("{}", "❌ Not found: this document has not been anchored.".red());
            println!("   Fingerprint: {}", document_hash.bright_white());
        }
    }
}

fn print_block(block: &Block) {
    println!("   Block:       #{}", block.index().to_string().bright_white());
    println!("   Type:        {}", block.document_type());
    println!("   Issuer:      {}", block.issuer().bright_yellow());
    println!("   Holder:      {}", block.student_name());
    println!("   Cert ID:     {}", block.cert_id().bright_cyan());
    println!("   Validity:    {}", block.validity());
    println!("   Issued:      {}", format_date(block.timestamp()));
    println!("   Fingerprint: {}", block.document_hash());
    println!("   Block hash:  {}", block.block_hash().bright_magenta());
}

fn print_table(views: &[BlockView]) {
    if views.is_empty() {
        println!("{}", "No matching blocks.".yellow());
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Block").fg(TableColor::Cyan).add_attribute(Attribute::Bold),
            Cell::new("Type").fg(TableColor::Cyan).add_attribute(Attribute::Bold),
            Cell::new("Issuer").fg(TableColor::Cyan).add_attribute(Attribute::Bold),
            Cell::new("Holder").fg(TableColor::Cyan).add_attribute(Attribute::Bold),
            Cell::new("Cert ID").fg(TableColor::Cyan).add_attribute(Attribute::Bold),
            Cell::new("Date").fg(TableColor::Cyan).add_attribute(Attribute::Bold),
            Cell::new("Block hash").fg(TableColor::Cyan).add_attribute(Attribute::Bold),
        ]);

    for view in views {
        table.add_row(vec![
            Cell::new(format!("#{}", view.index)).fg(TableColor::White),
            Cell::new(&view.document_type).fg(TableColor::Yellow),
            Cell::new(&view.issuer).fg(TableColor::White),
            Cell::new(&view.student_name).fg(TableColor::White),
            Cell::new(&view.cert_id).fg(TableColor::Cyan),
            Cell::new(&view.formatted_timestamp).fg(TableColor::Grey),
            Cell::new(short_hash(&view.block_hash)).fg(TableColor::Magenta),
        ]);
    }

    println!("{table}");
}

fn short_hash(hash: &str) -> String {
    if hash.chars().count() > 16 {
        format!("{}...", hash.chars().take(13).collect::<String>())
    } else {
        hash.to_string()
    }
}

const DEMO_DOCUMENTS: &[(&str, &str, &str)] = &[
    ("Academic Certificate", "Springfield State University", "Lisa Simpson"),
    ("Internship Letter", "Globex Corporation", "Milhouse Van Houten"),
    ("Course Completion", "Shelbyville Technical Institute", "Martin Prince"),
    ("Degree Transcript", "Springfield State University", "Sherri Mackleberry"),
    ("Employment Certificate", "Kwik-E-Mart Holdings", "Terri Mackleberry"),
];

/// Appends demo documents dated 1 to 30 days in the past, oldest first.
fn seed(ledger: &Ledger, count: usize) -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = rand::thread_rng();
    let now = chrono::Utc::now().timestamp() as f64;

    let mut timestamps: Vec<f64> = (0..count)
        .map(|_| now - rng.gen_range(1.0..30.0) * 86_400.0)
        .collect();
    timestamps.sort_by(|a, b| a.total_cmp(b));

    for (i, timestamp) in timestamps.into_iter().enumerate() {
        let (document_type, issuer, holder) = DEMO_DOCUMENTS[i % DEMO_DOCUMENTS.len()];
        let nonce: u64 = rng.gen();
        let document_hash = hash_document(format!("{}|{}|{}|{}", document_type, holder, i, nonce).as_bytes());
        let record = DocumentRecord::new(document_type, issuer, document_hash.clone())
            .with_student_name(holder)
            .with_cert_id(derive_cert_id(holder, &document_hash));

        let block = ledger.append_backdated(record, timestamp)?;
        println!(
            "{} #{} {} for {}",
            "•".bright_yellow(),
            block.index(),
            document_type.bright_white(),
            holder.bright_green()
        );
    }

    println!("{}", format!("Seeded {} demo documents.", count).bright_cyan());
    Ok(())
}
