use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use vaultferry_lib::commands::{register, CommandContext};
use vaultferry_lib::config::{AppConfig, HostConfig};
use vaultferry_lib::logging::{init_logging, LogConfig};
use vaultferry_lib::metadata::Project;
use vaultferry_lib::shell::LocalShell;
use vaultferry_lib::{
    Crypto, Job, Resource, ResourceKind, ScpTransport, TransportAction, TransportEngine,
    TransportMetadata,
};

#[derive(Debug, Parser)]
#[command(name = "vaultferry", version, about = "Move and protect backup artifacts")]
struct Cli {
    /// 配置目录（默认为用户配置目录）
    #[arg(long, env = "VAULTFERRY_CONFIG_DIR", global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// 使用公钥加密文本，输出 base64
    Encrypt {
        #[arg(long)]
        key: PathBuf,
        plaintext: String,
    },
    /// 使用私钥解密 base64 密文
    Decrypt {
        #[arg(long)]
        key: PathBuf,
        ciphertext: String,
    },
    /// 导出 MongoDB 数据库到本地工作目录
    Dump {
        database: String,
        #[arg(long, env = "VAULTFERRY_DB_USER")]
        user: Option<String>,
        #[arg(long, env = "VAULTFERRY_DB_PASSWORD")]
        password: Option<String>,
    },
    /// 复制资源到目标主机
    Copy(TransferArgs),
    /// 移动资源到目标主机
    Move(TransferArgs),
    /// 管理配置文件
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// 写出当前配置（缺失的字段使用默认值）
    Init,
    /// 添加或更新远程主机
    AddHost {
        id: String,
        hostname: String,
        #[arg(long)]
        user: Option<String>,
        #[arg(long, default_value_t = 22)]
        port: u16,
        #[arg(long)]
        working_directory: Option<String>,
    },
}

#[derive(Debug, clap::Args)]
struct TransferArgs {
    /// 资源路径，可指定多个
    #[arg(required = true)]
    paths: Vec<String>,
    /// 目标主机 id，"localhost" 表示从 --from 拉取到本地
    #[arg(long)]
    to: String,
    /// 入站传输时的远程主机 id
    #[arg(long)]
    from: Option<String>,
    #[arg(long, value_enum, default_value_t = KindArg::File)]
    kind: KindArg,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    File,
    Directory,
}

impl From<KindArg> for ResourceKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::File => ResourceKind::File,
            KindArg::Directory => ResourceKind::Directory,
        }
    }
}

async fn transfer(config: &AppConfig, args: TransferArgs, action: TransportAction) -> Result<()> {
    let hosts = config.hosts()?;
    let inbound = args.to == vaultferry_lib::metadata::LOCALHOST;
    let remote_id = if inbound {
        args.from
            .clone()
            .context("--from is required when transferring to localhost")?
    } else {
        args.to.clone()
    };
    let remote_host = hosts
        .get(&remote_id)
        .with_context(|| format!("Unknown host: {}", remote_id))?
        .clone();
    let job = Job::new(uuid::Uuid::new_v4().to_string());

    // 每个资源一个引擎，彼此独立并发执行
    let engines = args.paths.iter().map(|path| {
        let resource = Resource::new(path.clone(), args.kind.into(), !inbound).with_path(path.clone());
        let mut engine = TransportEngine::new(
            ScpTransport::new(&remote_host, &job, &config.ssh),
            job.clone(),
            hosts.clone(),
            resource,
            TransportMetadata::new(args.to.clone(), action, "scp"),
        );
        async move { engine.run().await }
    });

    let outputs = futures::future::try_join_all(engines).await?;
    let mut stdout = std::io::stdout().lock();
    for output in outputs {
        writeln!(
            stdout,
            "{}\t{}",
            output.path_or_name(),
            output
                .size
                .map(|size| size.to_string())
                .unwrap_or_else(|| "-".to_string())
        )?;
    }
    Ok(())
}

async fn dump(
    config: &AppConfig,
    database: String,
    user: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let hosts = config.hosts()?;
    let job = Job::new(uuid::Uuid::new_v4().to_string());
    let shell = Arc::new(LocalShell::new(hosts.localhost(), &job));

    let factory = register::command("mongodb_dump").context("mongodb_dump is not registered")?;
    let command = factory(CommandContext {
        shell,
        options: serde_json::json!({ "user": user, "password": password }),
    })?;

    let mut project = Project::new(job.id.clone());
    project.start_with(Resource::database(database));
    command.run(&mut project).await?;

    if let Some(product) = project.last_product() {
        println!("{}", product.path_or_name());
    }
    Ok(())
}

fn configure(config_dir: &std::path::Path, mut config: AppConfig, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Init => {
            LogConfig::load(config_dir).save(config_dir)?;
        }
        ConfigAction::AddHost {
            id,
            hostname,
            user,
            port,
            working_directory,
        } => {
            config.add_host(HostConfig {
                id,
                hostname,
                user,
                ssh_port: port,
                working_directory,
            })?;
        }
    }
    config.save(config_dir)?;
    println!("{}", config_dir.join("config.json").display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_dir = cli
        .config_dir
        .or_else(vaultferry_lib::dirs::config_dir)
        .unwrap_or_else(|| PathBuf::from(".vaultferry"));

    init_logging(&config_dir);
    let config = AppConfig::load(&config_dir);

    match cli.command {
        Commands::Encrypt { key, plaintext } => {
            println!("{}", Crypto::new().encrypt(plaintext.as_bytes(), &key)?);
        }
        Commands::Decrypt { key, ciphertext } => {
            let plaintext = Crypto::new().decrypt(&ciphertext, &key)?;
            std::io::stdout().write_all(&plaintext)?;
        }
        Commands::Dump {
            database,
            user,
            password,
        } => dump(&config, database, user, password).await?,
        Commands::Copy(args) => transfer(&config, args, TransportAction::Copy).await?,
        Commands::Move(args) => transfer(&config, args, TransportAction::Move).await?,
        Commands::Config { action } => configure(&config_dir, config, action)?,
    }

    Ok(())
}
