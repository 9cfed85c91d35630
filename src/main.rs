use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use tabv::controller::Controller;
use tabv::data::Table;
use tabv::domain::{TabvConfig, TabvError};
use tabv::export;
use tabv::model::{Model, Status};
use tabv::session::{Action, Session};
use tabv::ui::TableUi;
use tabv::view::{PageSize, SortOrder};

#[derive(Parser, Debug)]
#[command(name = "tabv", version, about = "A tui based tabular data browser.")]
struct Cli {
    /// Data files to open, one tab each (csv, parquet, arrow/ipc)
    #[arg(required = true)]
    files: Vec<String>,

    /// Rows per page, or "all"
    #[arg(long, default_value = "25")]
    page_size: PageSize,

    /// Append logs to this file (level via RUST_LOG, default info)
    #[arg(long, value_name = "PATH")]
    log_file: Option<String>,

    /// Write the view as CSV to PATH ("-" for stdout) and exit, no TUI
    #[arg(long, value_name = "PATH")]
    export: Option<String>,

    /// Search all columns before exporting
    #[arg(long, requires = "export")]
    search: Option<String>,

    /// Substring filter on one column, repeatable
    #[arg(long = "filter", value_name = "COLUMN=VALUE", requires = "export")]
    filters: Vec<String>,

    /// Sort column, "COLUMN" or "COLUMN:desc"
    #[arg(long, requires = "export")]
    sort: Option<String>,
}

fn main() -> ExitCode {
    match run() {
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(()) => ExitCode::SUCCESS,
    }
}

fn run() -> Result<(), TabvError> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref())?;

    if cli.export.is_some() && cli.files.len() != 1 {
        return Err(TabvError::BadArgument(
            "--export takes exactly one file".to_string(),
        ));
    }

    let config = TabvConfig::default().with_page_size(cli.page_size);
    let mut session = Session::new(config.page_size);
    for file in &cli.files {
        let path = shellexpand::full(file)
            .map_err(|e| TabvError::BadArgument(format!("{file}: {e}")))?;
        let table = Table::from_path(Path::new(path.as_ref()))?;
        session.add_tab(table);
    }

    if let Some(target) = &cli.export {
        return export_headless(&cli, session, target);
    }

    let mut terminal = ratatui::init();
    let size = match terminal.size() {
        Ok(size) => size,
        Err(e) => {
            ratatui::restore();
            return Err(e.into());
        }
    };
    let mut model = Model::init(&config, session, size.width as usize, size.height as usize);
    let ui = TableUi::new();
    let controller = Controller::new(&config);

    let result = event_loop(&mut terminal, &mut model, &ui, &controller);
    ratatui::restore();
    result
}

fn event_loop(
    terminal: &mut ratatui::DefaultTerminal,
    model: &mut Model,
    ui: &TableUi,
    controller: &Controller,
) -> Result<(), TabvError> {
    while model.status != Status::Quitting {
        terminal.draw(|frame| ui.draw(model, frame))?;
        if let Some(message) = controller.handle_event(model)? {
            model.update(message);
        }
    }
    Ok(())
}

/// Apply the view flags to the loaded table and write CSV without ever
/// starting the TUI.
fn export_headless(cli: &Cli, mut session: Session, target: &str) -> Result<(), TabvError> {
    if let Some(term) = &cli.search {
        session.apply(Action::SetSearch(term.clone()));
    }
    for raw in &cli.filters {
        let Some((column, value)) = raw.split_once('=') else {
            return Err(TabvError::BadArgument(format!(
                "filter {raw:?} is not COLUMN=VALUE"
            )));
        };
        session.apply(Action::SetColumnFilter {
            column: column.to_string(),
            value: value.to_string(),
        });
    }
    if let Some(sort) = &cli.sort {
        let (column, order) = match sort.rsplit_once(':') {
            Some((column, "desc")) => (column, SortOrder::Descending),
            Some((column, "asc")) => (column, SortOrder::Ascending),
            Some((_, other)) => {
                return Err(TabvError::BadArgument(format!(
                    "unknown sort direction {other:?}"
                )));
            }
            None => (sort.as_str(), SortOrder::Ascending),
        };
        session.apply(Action::SetSort {
            column: column.to_string(),
            order,
        });
    }

    let Some(tab) = session.active_tab() else {
        return Ok(());
    };
    if target == "-" {
        let stdout = std::io::stdout();
        export::write_csv(&tab.table, &tab.state, &mut stdout.lock())?;
    } else {
        let expanded = shellexpand::full(target)
            .map_err(|e| TabvError::BadArgument(format!("{target}: {e}")))?;
        export::export_csv_file(&tab.table, &tab.state, &PathBuf::from(expanded.as_ref()))?;
    }
    Ok(())
}

fn init_logging(log_file: Option<&str>) -> Result<(), TabvError> {
    let Some(path) = log_file else {
        return Ok(());
    };
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Arc::new(file))
                .with_ansi(false),
        )
        .with(ErrorLayer::default())
        .init();
    info!("logging to {path}");
    Ok(())
}
