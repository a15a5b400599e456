//! PartView 命令行程序
//!
//! 查看与转换 IGES/STEP/BREP/STL 文件。导入导出在阻塞线程上运行，
//! 主任务定期打印进度，Ctrl-C 请求中止当前操作。

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use partview_file::options::{StlFormat, StlIoLibrary};
use partview_file::{
    Application, ApplicationItem, Document, DocumentItem, IoResult, Options, PartFormat, Progress,
    TaskProgress,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// 进度打印间隔
const PROGRESS_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Parser)]
#[command(name = "partview")]
#[command(about = "Inspect and convert CAD part files", long_about = None)]
struct Cli {
    /// Print debug messages
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the supported formats
    Formats,
    /// Import files and print their items
    Info {
        /// Files to inspect, the format is detected from contents
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// JSON options file
        #[arg(long)]
        options: Option<PathBuf>,
    },
    /// Convert a file to another format
    Convert {
        input: PathBuf,
        output: PathBuf,
        /// Output format (default: from the output file extension)
        #[arg(short, long, value_enum)]
        format: Option<FormatArg>,
        /// JSON options file
        #[arg(long)]
        options: Option<PathBuf>,
        /// Write ASCII STL instead of binary
        #[arg(long)]
        ascii: bool,
        /// STL implementation
        #[arg(long, value_enum)]
        stl_library: Option<StlLibraryArg>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Iges,
    Step,
    Brep,
    Stl,
}

impl From<FormatArg> for PartFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Iges => PartFormat::Iges,
            FormatArg::Step => PartFormat::Step,
            FormatArg::Brep => PartFormat::OccBrep,
            FormatArg::Stl => PartFormat::Stl,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum StlLibraryArg {
    Kernel,
    Meshio,
}

impl From<StlLibraryArg> for StlIoLibrary {
    fn from(arg: StlLibraryArg) -> Self {
        match arg {
            StlLibraryArg::Kernel => StlIoLibrary::Kernel,
            StlLibraryArg::Meshio => StlIoLibrary::MeshIo,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 初始化日志
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing::subscriber::set_global_default(
        FmtSubscriber::builder().with_max_level(level).finish(),
    )?;

    match cli.command {
        Commands::Formats => list_formats(),
        Commands::Info { files, options } => {
            let app = Application::new(load_options(options.as_deref())?);
            for file in files {
                show_info(&app, file).await?;
            }
        }
        Commands::Convert {
            input,
            output,
            format,
            options,
            ascii,
            stl_library,
        } => {
            let mut options = load_options(options.as_deref())?;
            if ascii {
                options.export.stl_format = StlFormat::Ascii;
            }
            if let Some(library) = stl_library {
                options.stl_io_library = library.into();
            }
            let format = match format {
                Some(format) => format.into(),
                None => format_from_extension(&output)?,
            };
            convert(Application::new(options), input, output, format).await?;
        }
    }

    Ok(())
}

fn load_options(path: Option<&Path>) -> Result<Options> {
    match path {
        Some(path) => Options::load(path)
            .with_context(|| format!("Failed to load options from {}", path.display())),
        None => Ok(Options::default()),
    }
}

fn format_from_extension(path: &Path) -> Result<PartFormat> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    match PartFormat::from_extension(extension) {
        Some(format) => Ok(format),
        None => bail!("Cannot deduce output format from {}", path.display()),
    }
}

fn list_formats() {
    for format in PartFormat::ALL {
        println!(
            "{:<16} {:<40} export options: {}",
            format.name(),
            format.filter(),
            if format.has_export_options() { "yes" } else { "no" }
        );
    }
}

async fn show_info(app: &Application, path: PathBuf) -> Result<()> {
    let app = app.clone();
    let job_path = path.clone();
    let (doc, result) = run_with_progress(move |progress| {
        let mut doc = Document::new();
        let result = app.import_file(&mut doc, &job_path, Some(progress));
        (doc, result)
    })
    .await?;

    println!("{}", path.display());
    match result {
        Ok(format) => println!("  format: {}", format),
        Err(e) => println!("  error: {}", e),
    }
    for item in doc.root_items() {
        let kind = match item {
            DocumentItem::WholeShape(_) => "shape".to_string(),
            DocumentItem::Mesh(mesh) => format!(
                "mesh, {} nodes, {} triangles",
                mesh.nb_nodes(),
                mesh.nb_triangles()
            ),
        };
        println!(
            "  {} ({}): area {:.6}, volume {:.6}",
            item.label(),
            kind,
            item.area(),
            item.volume()
        );
    }
    Ok(())
}

async fn convert(app: Application, input: PathBuf, output: PathBuf, format: PartFormat) -> Result<()> {
    info!("Converting {} to {}", input.display(), output.display());
    let job_input = input.clone();
    let job_output = output.clone();
    let result: IoResult = run_with_progress(move |progress| {
        let mut doc = Document::new();
        app.import_file(&mut doc, &job_input, Some(progress))?;
        let export_options = app.options().export.clone();
        app.export_document_items(
            &[ApplicationItem::from(&doc)],
            format,
            &export_options,
            &job_output,
            Some(progress),
        )
    })
    .await?;

    result.with_context(|| format!("Failed to convert {}", input.display()))?;
    info!("Wrote {}", output.display());
    Ok(())
}

/// 在阻塞线程上运行任务，期间打印进度并把 Ctrl-C 转为中止请求
async fn run_with_progress<T, F>(job: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&Progress) -> T + Send + 'static,
{
    let progress = Arc::new(Progress::new());
    let mut worker = {
        let progress = Arc::clone(&progress);
        tokio::task::spawn_blocking(move || job(&progress))
    };

    let mut ticker = tokio::time::interval(PROGRESS_INTERVAL);
    let mut last = (String::new(), -1);
    loop {
        tokio::select! {
            result = &mut worker => return result.context("Worker thread failed"),
            _ = ticker.tick() => {
                let current = (progress.step(), progress.value());
                if current != last {
                    info!("{}: {}%", current.0, current.1);
                    last = current;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("Abort requested");
                progress.request_abort();
            }
        }
    }
}
