//! cyber-claim CLI: participate, sweep, deploy, execute, query, transfer, audit, report.

use clap::{Parser, Subcommand};
use cyber_claim::audit::{ContractRegistry, EventInterpreter, LabelBook};
use cyber_claim::batch::{parse_artifact, Journal, RetryPolicy, Supervisor};
use cyber_claim::chain::{
    ensure_committed, ContractMsg, InstantiateRequest, Ledger, LedgerClient, MultiSendRequest,
    Signer, TransactionRequest, Transfer,
};
use cyber_claim::config::ClaimConfig;
use cyber_claim::report::SweepReport;
use cyber_claim::tools::{generate_proofs, ProofBatch};
use cyber_claim::workflow::{load_records, select_record, ClaimWorkflow, Mode};
use cyber_claim_report::render_report;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tracing::info;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ClaimConfig::load_from_path(path)?,
        None => ClaimConfig::load()?,
    };
    match cli.command {
        Command::Participate(args) => run_participate(&config, args),
        Command::Sweep(args) => run_sweep(&config, args),
        Command::Instantiate(args) => run_instantiate(&config, args),
        Command::Execute(args) => run_execute(&config, args),
        Command::Query(args) => run_query(&config, args),
        Command::MultiSend(args) => run_multi_send(&config, args),
        Command::Proofs(args) => run_proofs(&config, args),
        Command::Audit(args) => run_audit(&config, args),
        Command::Status(args) => run_status(&config, args),
        Command::Report(args) => run_report(&config, args),
    }
}

#[derive(Parser)]
#[command(name = "cyber-claim")]
#[command(about = "Airdrop claim orchestration: passports, address proofs, gift claims and releases")]
struct Cli {
    /// Config file; defaults to CYBER_CLAIM_CONFIG_PATH or ./config/cyber_claim.json.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the claim workflow for one record index.
    Participate(ParticipateArgs),
    /// Run the claim workflow for every index in a range.
    Sweep(SweepArgs),
    /// Instantiate a stored contract code id.
    Instantiate(InstantiateArgs),
    /// Sign and submit one contract message, e.g. an NFT transfer or burn.
    Execute(ExecuteArgs),
    /// Smart-query a contract.
    Query(QueryArgs),
    /// Native multi-send from one key to many addresses.
    MultiSend(MultiSendArgs),
    /// Generate Merkle proofs for a slice of the airdrop file.
    Proofs(ProofsArgs),
    /// Print the audit trail of an artifact or a committed transaction.
    Audit(AuditArgs),
    /// List journal results.
    Status(RangeArgs),
    /// Write an HTML audit report of journal results.
    Report(ReportArgs),
}

#[derive(Parser)]
struct ParticipateArgs {
    #[arg(long)]
    index: u64,
    /// CSV file holding the record shard.
    #[arg(long)]
    records: PathBuf,
    #[arg(long, default_value = "participate")]
    mode: Mode,
}

#[derive(Parser)]
struct SweepArgs {
    #[arg(long)]
    records: PathBuf,
    #[arg(long)]
    start: u64,
    /// Exclusive.
    #[arg(long)]
    end: u64,
    #[arg(long, default_value = "participate")]
    mode: Mode,
    /// Skip indices the journal already marks done.
    #[arg(long)]
    skip_done: bool,
}

#[derive(Parser)]
struct InstantiateArgs {
    #[arg(long)]
    code_id: u64,
    /// Init message JSON, or @path to read it from a file.
    #[arg(long)]
    init_msg: String,
    #[arg(long)]
    label: String,
    #[arg(long)]
    funds: Option<String>,
    #[arg(long)]
    admin: Option<String>,
    /// Keyring key that signs.
    #[arg(long)]
    from: String,
}

#[derive(Parser)]
struct ExecuteArgs {
    /// Contract address or a configured role name.
    #[arg(long)]
    contract: String,
    /// Execute message JSON, or @path.
    #[arg(long)]
    msg: String,
    #[arg(long)]
    funds: Option<String>,
    /// Keyring key that signs.
    #[arg(long)]
    from: String,
}

#[derive(Parser)]
struct QueryArgs {
    /// Contract address or a configured role name.
    #[arg(long)]
    contract: String,
    /// Query message JSON, or @path.
    #[arg(long)]
    msg: String,
}

#[derive(Parser)]
struct MultiSendArgs {
    #[arg(long)]
    from: String,
    /// Address of the `from` key.
    #[arg(long)]
    from_address: String,
    #[arg(long, value_delimiter = ',')]
    to: Vec<String>,
    #[arg(long, value_delimiter = ',')]
    amounts: Vec<u128>,
}

#[derive(Parser)]
struct ProofsArgs {
    #[arg(long)]
    input: PathBuf,
    #[arg(long)]
    output: PathBuf,
    #[arg(long, default_value_t = 1)]
    start_index: u64,
    /// Exclusive; -1 runs to the end.
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    end_index: i64,
}

#[derive(Parser)]
struct AuditArgs {
    /// Outcome artifact written by `participate` or `sweep`.
    #[arg(long, conflicts_with = "tx")]
    artifact: Option<PathBuf>,
    /// Hash of a committed transaction, fetched from the LCD.
    #[arg(long)]
    tx: Option<String>,
    /// Label particles with the values of this record.
    #[arg(long, requires = "index")]
    records: Option<PathBuf>,
    #[arg(long)]
    index: Option<u64>,
}

#[derive(Parser)]
struct RangeArgs {
    #[arg(long, default_value_t = 0)]
    start: u64,
    #[arg(long, default_value_t = u64::MAX)]
    end: u64,
}

#[derive(Parser)]
struct ReportArgs {
    #[command(flatten)]
    range: RangeArgs,
    #[arg(long, default_value = "./reports/sweep.html")]
    out: PathBuf,
}

fn ledger(config: &ClaimConfig) -> Result<LedgerClient, Box<dyn std::error::Error>> {
    Ok(LedgerClient::new(config.ledger.clone())?)
}

fn json_arg(raw: &str) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let text = match raw.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)?,
        None => raw.to_string(),
    };
    Ok(serde_json::from_str(&text)?)
}

fn run_participate(config: &ClaimConfig, args: ParticipateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let records = load_records(&args.records)?;
    let client = ledger(config)?;
    let journal = Journal::open(&config.output.journal_path)?;
    let workflow = ClaimWorkflow::from_config(&client, config)?;
    let supervisor = Supervisor::new(
        workflow,
        ContractRegistry::from_contracts(&config.contracts),
        RetryPolicy::from_config(&config.retry),
        &config.output.artifact_dir,
    )
    .with_journal(&journal);
    let rt = tokio::runtime::Runtime::new()?;
    let report = rt.block_on(supervisor.run_index(
        &records,
        args.index,
        config.output.shard_size,
        args.mode,
    ))?;
    info!(artifact = %report.artifact.display(), attempts = report.attempts, "participate complete");
    println!("{}", report.status_line());
    Ok(())
}

fn run_sweep(config: &ClaimConfig, args: SweepArgs) -> Result<(), Box<dyn std::error::Error>> {
    let records = load_records(&args.records)?;
    let client = ledger(config)?;
    let journal = Journal::open(&config.output.journal_path)?;
    let workflow = ClaimWorkflow::from_config(&client, config)?;
    let supervisor = Supervisor::new(
        workflow,
        ContractRegistry::from_contracts(&config.contracts),
        RetryPolicy::from_config(&config.retry),
        &config.output.artifact_dir,
    )
    .with_journal(&journal);
    let rt = tokio::runtime::Runtime::new()?;
    let summary = rt.block_on(supervisor.sweep(
        &records,
        args.start..args.end,
        config.output.shard_size,
        args.mode,
        args.skip_done,
    ));
    for report in &summary.reports {
        println!("{}", report.status_line());
    }
    info!(
        done = summary.done(),
        unsuccessful = summary.unsuccessful(),
        skipped = summary.skipped.len(),
        failed_to_persist = summary.failed_to_persist.len(),
        "sweep complete"
    );
    Ok(())
}

fn run_instantiate(config: &ClaimConfig, args: InstantiateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let client = ledger(config)?;
    let request = InstantiateRequest {
        code_id: args.code_id,
        init_msg: json_arg(&args.init_msg)?,
        label: args.label,
        funds: args.funds,
        admin: args.admin,
        signer: Signer::keyring(args.from),
        gas: config.workflow.gas.instantiate,
        gas_price: config.ledger.gas_price.clone(),
    };
    let rt = tokio::runtime::Runtime::new()?;
    let address = rt.block_on(client.instantiate(&request))?;
    println!("{}", address);
    Ok(())
}

fn run_execute(config: &ClaimConfig, args: ExecuteArgs) -> Result<(), Box<dyn std::error::Error>> {
    let client = ledger(config)?;
    let registry = ContractRegistry::from_contracts(&config.contracts);
    let msg: ContractMsg = serde_json::from_value(json_arg(&args.msg)?)?;
    let request = TransactionRequest {
        contract: registry
            .address_of(&args.contract)
            .unwrap_or(&args.contract)
            .to_string(),
        gas: msg.gas(&config.workflow.gas),
        msg,
        signer: Signer::keyring(args.from),
        gas_price: config.ledger.gas_price.clone(),
        funds: args.funds,
    };
    let rt = tokio::runtime::Runtime::new()?;
    let receipt = rt.block_on(client.execute(&request))?;
    let labels = LabelBook::new();
    for line in EventInterpreter::new(&registry, &labels).render(&receipt) {
        println!("{}", line);
    }
    ensure_committed(receipt)?;
    Ok(())
}

fn run_query(config: &ClaimConfig, args: QueryArgs) -> Result<(), Box<dyn std::error::Error>> {
    let client = ledger(config)?;
    let registry = ContractRegistry::from_contracts(&config.contracts);
    let contract = registry
        .address_of(&args.contract)
        .unwrap_or(&args.contract)
        .to_string();
    let msg = json_arg(&args.msg)?;
    let rt = tokio::runtime::Runtime::new()?;
    let data = rt.block_on(client.query(&contract, &msg))?;
    println!("{}", serde_json::to_string_pretty(&data)?);
    info!(requests = client.lcd().request_count(), "query complete");
    Ok(())
}

fn run_multi_send(config: &ClaimConfig, args: MultiSendArgs) -> Result<(), Box<dyn std::error::Error>> {
    let client = ledger(config)?;
    let total: u128 = args.amounts.iter().sum();
    let request = MultiSendRequest {
        inputs: vec![Transfer {
            address: args.from_address,
            amount: total,
        }],
        to_addresses: args.to,
        amounts: args.amounts,
        denom: config.ledger.denom.clone(),
        signer: Signer::keyring(args.from),
        gas: config.workflow.gas.multi_send,
        gas_price: config.ledger.gas_price.clone(),
    };
    let rt = tokio::runtime::Runtime::new()?;
    let receipt = rt.block_on(client.multi_send(&request))?;
    let registry = ContractRegistry::from_contracts(&config.contracts);
    let labels = LabelBook::new();
    for line in EventInterpreter::new(&registry, &labels).render(&receipt) {
        println!("{}", line);
    }
    ensure_committed(receipt)?;
    Ok(())
}

fn run_proofs(config: &ClaimConfig, args: ProofsArgs) -> Result<(), Box<dyn std::error::Error>> {
    let batch = ProofBatch {
        input: args.input,
        output: args.output,
        start_index: args.start_index,
        end_index: ProofBatch::end_from_arg(args.end_index)?,
    };
    let rt = tokio::runtime::Runtime::new()?;
    let run = rt.block_on(generate_proofs(&config.proof_tool, &batch))?;
    println!("{}", run.stdout);
    Ok(())
}

fn run_audit(config: &ClaimConfig, args: AuditArgs) -> Result<(), Box<dyn std::error::Error>> {
    let registry = ContractRegistry::from_contracts(&config.contracts);
    let labels = match (&args.records, args.index) {
        (Some(path), Some(index)) => {
            let records = load_records(path)?;
            select_record(&records, index as usize, config.output.shard_size)?.label_book()
        }
        _ => LabelBook::new(),
    };
    let interpreter = EventInterpreter::new(&registry, &labels);
    if let Some(hash) = &args.tx {
        let client = ledger(config)?;
        let rt = tokio::runtime::Runtime::new()?;
        let receipt = rt.block_on(client.lcd().tx_by_hash(hash))?;
        for line in interpreter.render(&receipt) {
            println!("{}", line);
        }
        info!(requests = client.lcd().request_count(), "audit complete");
        return Ok(());
    }
    let path = args.artifact.ok_or("pass --artifact or --tx")?;
    print_artifact_audit(&path, &interpreter)
}

fn print_artifact_audit(
    path: &Path,
    interpreter: &EventInterpreter<'_>,
) -> Result<(), Box<dyn std::error::Error>> {
    let parsed = parse_artifact(&std::fs::read_to_string(path)?)?;
    if let Some(error) = &parsed.error {
        println!("Error: {}", error);
    }
    for (step, result) in &parsed.steps {
        println!("== {} ==", step);
        match result {
            Ok(receipt) => {
                for line in interpreter.render(receipt) {
                    println!("{}", line);
                }
            }
            Err(error) => println!("error: {}", error),
        }
    }
    Ok(())
}

fn run_status(config: &ClaimConfig, args: RangeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let journal = Journal::open(&config.output.journal_path)?;
    for entry in journal.range(args.start, args.end)? {
        println!(
            "{}\t{}\t{}: {}\t{} attempt(s)",
            entry.index,
            entry.mode,
            entry.primary_address,
            entry.status.as_str(),
            entry.attempts
        );
    }
    Ok(())
}

fn run_report(config: &ClaimConfig, args: ReportArgs) -> Result<(), Box<dyn std::error::Error>> {
    let journal = Journal::open(&config.output.journal_path)?;
    let entries = journal.range(args.range.start, args.range.end)?;
    let data = SweepReport::build(entries, OffsetDateTime::now_utc())?;
    render_report(&data, &args.out)?;
    info!(out = %args.out.display(), records = data.rows.len(), "report complete");
    println!("Report written to {}", args.out.display());
    Ok(())
}
