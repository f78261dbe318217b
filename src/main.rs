use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::time::Duration;
use teleinfo_rs::constants::{
    INFLUX_DEFAULT_DATABASE, INFLUX_DEFAULT_HOST, INFLUX_DEFAULT_PORT, INFLUX_DEFAULT_RETRY_SECS,
    INFLUX_DEFAULT_TAG_HOST, INFLUX_DEFAULT_TAG_REGION, SINK_DEFAULT_QUEUE, TELEINFO_DEFAULT_PORT,
    TELEINFO_DEFAULT_TIMEOUT_MS, TELEINFO_HISTORIC_BAUDRATE,
};
use teleinfo_rs::{
    init_logger, log_info, open_serial, InfluxConfig, InfluxSink, JsonLinesSink, ReaderConfig,
    SerialConfig, SinkHandle, TeleinfoReader,
};

#[derive(Parser)]
#[command(name = "teleinfo")]
#[command(about = "Reads Teleinfo frames from a meter and stores them")]
struct Cli {
    /// Serial port the meter is wired to
    #[arg(short, long, default_value = TELEINFO_DEFAULT_PORT)]
    port: String,
    #[arg(short, long, default_value_t = TELEINFO_HISTORIC_BAUDRATE)]
    baudrate: u32,
    /// Serial read timeout in milliseconds
    #[arg(long, default_value_t = TELEINFO_DEFAULT_TIMEOUT_MS)]
    timeout_ms: u64,
    /// Minimum seconds between two stored frames (0 stores every frame)
    #[arg(long, default_value_t = 60)]
    capture_interval: u64,
    /// Frames buffered while the sink is busy
    #[arg(long, default_value_t = SINK_DEFAULT_QUEUE)]
    queue: usize,
    #[command(subcommand)]
    sink: SinkCommand,
}

#[derive(Subcommand)]
enum SinkCommand {
    /// Store frames in InfluxDB
    Influx(InfluxArgs),
    /// Print frames as JSON lines
    Stdout,
}

#[derive(Args)]
struct InfluxArgs {
    #[arg(long, default_value = INFLUX_DEFAULT_HOST)]
    host: String,
    #[arg(long = "influx-port", default_value_t = INFLUX_DEFAULT_PORT)]
    port: u16,
    #[arg(long, default_value = INFLUX_DEFAULT_DATABASE)]
    database: String,
    #[arg(long, default_value = INFLUX_DEFAULT_TAG_HOST)]
    tag_host: String,
    #[arg(long, default_value = INFLUX_DEFAULT_TAG_REGION)]
    tag_region: String,
    #[arg(long, default_value_t = INFLUX_DEFAULT_RETRY_SECS)]
    retry_secs: u64,
    /// Give up connecting after this many attempts (retries forever if unset)
    #[arg(long)]
    max_attempts: Option<u32>,
}

impl From<InfluxArgs> for InfluxConfig {
    fn from(args: InfluxArgs) -> Self {
        InfluxConfig {
            host: args.host,
            port: args.port,
            database: args.database,
            tags: vec![
                ("host".to_string(), args.tag_host),
                ("region".to_string(), args.tag_region),
            ],
            retry_delay: Duration::from_secs(args.retry_secs),
            max_attempts: args.max_attempts,
            ..InfluxConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();
    log_info("Teleinfo starting..");

    let cli = Cli::parse();

    let handle = match cli.sink {
        SinkCommand::Influx(args) => {
            let sink = InfluxSink::connect(args.into())
                .await
                .context("connecting to InfluxDB")?;
            SinkHandle::spawn(sink, cli.queue)
        }
        SinkCommand::Stdout => SinkHandle::spawn(JsonLinesSink::stdout(), cli.queue),
    };

    let serial = SerialConfig {
        port: cli.port,
        baudrate: cli.baudrate,
        timeout: Duration::from_millis(cli.timeout_ms),
    };
    let source = open_serial(&serial).with_context(|| format!("opening {}", serial.port))?;

    let config = ReaderConfig {
        capture_interval: (cli.capture_interval > 0)
            .then(|| Duration::from_secs(cli.capture_interval)),
    };
    let mut reader = TeleinfoReader::new(source, config);

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = stop_tx.send(());
        }
    });

    let stats = reader.run(&handle, stop_rx).await.context("reading frames")?;
    let sink_stats = handle.close().await?;

    log_info(&format!(
        "Stopped: {} frame(s) stored, {} skipped, {} dropped, {} line(s) rejected, {} write failure(s)",
        sink_stats.written,
        stats.frames_skipped,
        stats.frames_dropped,
        stats.assembler.lines_rejected(),
        sink_stats.failed
    ));
    Ok(())
}
