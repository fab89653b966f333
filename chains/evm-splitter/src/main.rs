use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use core_logic::{
    select_wallet, setup_logger, BatchSettings, FeePolicy, LedgerReader, LedgerWriter, RunSummary,
    SequentialSettings, LIMIT_TRANSFER,
};
use dialoguer::{theme::ColorfulTheme, Confirm};
use dotenv::dotenv;
use ethers::core::rand::thread_rng;
use ethers::signers::Signer;
use ethers::types::U256;
use ethers::utils::{format_units, parse_ether};
use evm_splitter::probe::{probe_nodes, render};
use evm_splitter::{
    generate_mnemonic_wallets, generate_wallets, log_summary, parse_address, signer_from_record,
    verify_file, BatchDispatcher, ChainClient, EthersClient, OutputFormat, SequentialDispatcher,
    SplitterConfig, TransferIntent,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Batch and rotation transfers for EVM ledger wallets", long_about = None)]
struct Cli {
    /// Optional TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// RPC endpoint, overrides the configuration
    #[arg(long, global = true)]
    rpc: Option<String>,

    /// Skip the confirmation prompt before moving funds
    #[arg(short, long, global = true)]
    yes: bool,

    /// Write the run summary as JSON to this path
    #[arg(long, global = true)]
    export_summary: Option<String>,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fan one sender out to every ledger wallet through the batch contract
    BatchTransfer(BatchArgs),
    /// Send a fixed amount from every ledger wallet to one target
    SingleTransfer(SingleArgs),
    /// Rank candidate RPC endpoints by latency
    CheckRpc(CheckRpcArgs),
    /// Check that every ledger key derives its ledger address
    Verify(VerifyArgs),
    /// Create a ledger of fresh random wallets
    GenWallet(GenerateArgs),
    /// Create a ledger of fresh wallets, each backed by its own 12-word mnemonic
    GenMnemonic(GenerateArgs),
}

#[derive(Args, Debug)]
struct BatchArgs {
    /// Recipient ledger
    #[arg(long, alias = "csv")]
    ledger: String,

    /// Ledger holding the funded sender
    #[arg(long, alias = "sender-csv", default_value = "wallets/senders/w1.csv")]
    sender_ledger: String,

    /// 0-based row of the sender in its ledger
    #[arg(long, default_value_t = 0)]
    sender_index: usize,

    #[arg(long)]
    contract: Option<String>,

    /// Amount per recipient, in ether
    #[arg(long, default_value = "0.1")]
    amount: String,

    #[arg(long)]
    gas_multiplier: Option<f64>,

    /// Fixed gas limit; 0 estimates every batch
    #[arg(long)]
    gas_limit: Option<u64>,

    #[arg(long)]
    batch_size: Option<usize>,

    /// Only process the first N wallets (0 = all)
    #[arg(long, default_value_t = 0)]
    max_wallets: usize,

    #[arg(long)]
    cool_down_secs: Option<u64>,
}

#[derive(Args, Debug)]
struct SingleArgs {
    /// Ledger of sending wallets
    #[arg(long, alias = "csv")]
    ledger: String,

    /// Receiving address, falls back to `target_address` in the configuration
    #[arg(long)]
    target: Option<String>,

    /// Amount per wallet, in ether
    #[arg(long, default_value = "0.0001")]
    amount: String,

    #[arg(long)]
    gas_multiplier: Option<f64>,

    #[arg(long)]
    gas_limit: Option<u64>,

    #[arg(long, default_value_t = 0)]
    max_wallets: usize,

    /// Seconds to wait between wallets
    #[arg(long)]
    delay: Option<u64>,
}

#[derive(Args, Debug)]
struct CheckRpcArgs {
    /// Per-node timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    #[arg(long)]
    stats: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Args, Debug)]
struct VerifyArgs {
    #[arg(short = 'f', long, alias = "file")]
    ledger: String,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Number of wallets to create
    #[arg(short = 'n', long, default_value_t = 10)]
    number: usize,

    /// Output file name, defaults to secret.csv (gen-wallet) or mnemonic.csv (gen-mnemonic)
    #[arg(short, long)]
    output: Option<String>,

    /// Output directory
    #[arg(short, long, default_value = "./wallets")]
    dir: String,

    /// Replace an existing ledger file
    #[arg(long)]
    force: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    // Keep guard alive for file logging
    let _log_guard = setup_logger(cli.verbose);

    let mut config = SplitterConfig::load(cli.config.as_deref())?;
    if let Some(rpc) = &cli.rpc {
        config.rpc_url = rpc.clone();
    }

    match &cli.command {
        Command::BatchTransfer(args) => run_batch(&cli, &config, args).await,
        Command::SingleTransfer(args) => run_single(&cli, &config, args).await,
        Command::CheckRpc(args) => run_check_rpc(&config, args).await,
        Command::Verify(args) => run_verify(args),
        Command::GenWallet(args) => run_generate(args, false),
        Command::GenMnemonic(args) => run_generate(args, true),
    }
}

async fn run_batch(cli: &Cli, config: &SplitterConfig, args: &BatchArgs) -> Result<()> {
    let mut fee_config = config.fee_config();
    if let Some(multiplier) = args.gas_multiplier {
        fee_config.multiplier = multiplier;
    }
    if let Some(limit) = args.gas_limit {
        fee_config.fixed_gas_limit = limit;
    }
    fee_config.validate()?;

    let settings = BatchSettings {
        chunk_size: args.batch_size.unwrap_or(config.batch_size),
        max_units: cap(args.max_wallets),
        cool_down: Duration::from_secs(args.cool_down_secs.unwrap_or(config.cool_down_secs)),
    };
    settings.validate()?;

    let amount = parse_amount(&args.amount)?;
    let contract = parse_address(args.contract.as_deref().unwrap_or(&config.contract_address))
        .context("Invalid batch contract address")?;

    let recipients = LedgerReader::read(&args.ledger)?;
    let senders = LedgerReader::read(&args.sender_ledger)?;
    let sender_record = select_wallet(&senders, args.sender_index)?;

    let client = Arc::new(EthersClient::connect(&config.rpc_url, config.client_settings()).await?);
    let chain_id = client.chain_id().await?;
    let sender = signer_from_record(&sender_record, chain_id).context("Invalid sender wallet")?;

    info!("Configuration:");
    info!("  RPC URL: {} (chain id {})", config.rpc_url, chain_id);
    info!("  Contract: {:?}", contract);
    info!("  Recipient ledger: {} ({} wallets)", args.ledger, recipients.len());
    info!("  Sender: {:?} (row {} of {})", sender.address(), args.sender_index, args.sender_ledger);
    info!("  Amount per wallet: {} ETH", args.amount);
    info!("  Gas multiplier: {}", fee_config.multiplier);
    info!("  Batch size: {}", settings.chunk_size);
    if fee_config.fixed_gas_limit > 0 {
        info!("  Fixed gas limit: {}", fee_config.fixed_gas_limit);
    }

    let planned = settings
        .max_units
        .map_or(recipients.len(), |c| c.min(recipients.len()));
    if !confirm(cli.yes, &format!("Send {} ETH to each of {} wallets?", args.amount, planned))? {
        warn!("Cancelled");
        return Ok(());
    }

    let intent = TransferIntent::for_batch(amount, FeePolicy::new(&fee_config), &settings);
    let dispatcher = BatchDispatcher::new(client, sender, contract, intent, settings.chunk_size);
    let summary = dispatcher.run(&recipients).await?;

    finish(cli, &summary);
    if let Some(reason) = summary.aborted {
        bail!("Batch transfer stopped: {}", reason);
    }
    Ok(())
}

async fn run_single(cli: &Cli, config: &SplitterConfig, args: &SingleArgs) -> Result<()> {
    let mut fee_config = config.fee_config();
    if let Some(multiplier) = args.gas_multiplier {
        fee_config.multiplier = multiplier;
    }
    if let Some(limit) = args.gas_limit {
        fee_config.fixed_gas_limit = limit;
    }
    fee_config.validate()?;
    if fee_config.fixed_gas_limit > 0 && fee_config.fixed_gas_limit < LIMIT_TRANSFER {
        warn!(
            "Gas limit {} is below the {} a plain transfer needs",
            fee_config.fixed_gas_limit, LIMIT_TRANSFER
        );
    }

    let settings = SequentialSettings {
        max_units: cap(args.max_wallets),
        pace_interval: Duration::from_secs(args.delay.unwrap_or(config.transfer_delay_secs)),
    };
    settings.validate()?;

    let amount = parse_amount(&args.amount)?;
    let target = match args.target.as_deref().or(config.target_address.as_deref()) {
        Some(raw) => parse_address(raw).context("Invalid target address")?,
        None => bail!("No target address: pass --target or set target_address"),
    };

    let senders = LedgerReader::read(&args.ledger)?;
    let client = Arc::new(EthersClient::connect(&config.rpc_url, config.client_settings()).await?);

    info!("Configuration:");
    info!("  RPC URL: {}", config.rpc_url);
    info!("  Ledger: {} ({} wallets)", args.ledger, senders.len());
    info!("  Target: {:?}", target);
    info!("  Amount per wallet: {} ETH", args.amount);
    info!("  Gas multiplier: {}", fee_config.multiplier);
    info!("  Delay: {:?}", settings.pace_interval);
    match client.suggested_gas_price().await {
        Ok(price) => info!(
            "  Network gas price: {} gwei",
            format_units(price, "gwei").unwrap_or_else(|_| price.to_string())
        ),
        Err(e) => warn!("  Network gas price unavailable: {}", e),
    }

    let planned = settings.max_units.map_or(senders.len(), |c| c.min(senders.len()));
    if !confirm(cli.yes, &format!("Send {} ETH from each of {} wallets to {:?}?", args.amount, planned, target))? {
        warn!("Cancelled");
        return Ok(());
    }

    let intent = TransferIntent::for_sequential(amount, FeePolicy::new(&fee_config), &settings);
    let summary = SequentialDispatcher::new(client, target, intent).run(&senders).await?;

    finish(cli, &summary);
    Ok(())
}

async fn run_check_rpc(config: &SplitterConfig, args: &CheckRpcArgs) -> Result<()> {
    let mut settings = config.probe_settings();
    if let Some(secs) = args.timeout {
        settings.timeout = Duration::from_secs(secs);
    }

    info!("Checking {} nodes (timeout {:?})...", settings.endpoints.len(), settings.timeout);
    let results = probe_nodes(&settings.endpoints, settings.timeout).await;
    if results.is_empty() {
        bail!("No node answered within {:?}", settings.timeout);
    }

    println!("{}", render(&results, args.format, args.stats)?);
    Ok(())
}

fn run_verify(args: &VerifyArgs) -> Result<()> {
    let report = verify_file(&args.ledger)?;

    for mismatch in &report.mismatched {
        error!(
            "Line {}: {} | {}",
            mismatch.line, mismatch.address, mismatch.reason
        );
    }
    info!(
        "Verified {} wallets: {} ok, {} mismatched",
        report.total,
        report.matched,
        report.mismatched.len()
    );

    if !report.is_clean() {
        bail!("{} wallet(s) in {} failed verification", report.mismatched.len(), args.ledger);
    }
    Ok(())
}

fn run_generate(args: &GenerateArgs, with_mnemonic: bool) -> Result<()> {
    if args.number == 0 {
        bail!("Number of wallets must be greater than 0");
    }
    let default_name = if with_mnemonic { "mnemonic.csv" } else { "secret.csv" };
    let path = Path::new(&args.dir).join(args.output.as_deref().unwrap_or(default_name));
    if path.exists() && !args.force {
        bail!("{} already exists, pass --force to replace it", path.display());
    }

    let mut rng = thread_rng();
    let records = if with_mnemonic {
        generate_mnemonic_wallets(args.number, &mut rng)?
    } else {
        generate_wallets(args.number, &mut rng)
    };
    LedgerWriter::write(&path, &records)?;

    info!("Generated {} wallets into {}", records.len(), path.display());
    warn!("{} holds plaintext private keys, keep it out of version control", path.display());
    Ok(())
}

fn finish(cli: &Cli, summary: &RunSummary) {
    log_summary(summary);
    if let Some(path) = &cli.export_summary {
        match summary.export_json(path) {
            Ok(_) => info!("Summary exported to {}", path),
            Err(e) => error!("Failed to export summary: {}", e),
        }
    }
}

fn cap(max_wallets: usize) -> Option<usize> {
    (max_wallets > 0).then_some(max_wallets)
}

fn parse_amount(raw: &str) -> Result<U256> {
    let amount = parse_ether(raw).with_context(|| format!("Invalid amount '{}'", raw))?;
    if amount.is_zero() {
        bail!("Amount must be greater than 0");
    }
    Ok(amount)
}

fn confirm(assume_yes: bool, prompt: &str) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact()
        .context("Confirmation prompt failed, pass --yes to run unattended")
}
