use callwatch::app::{self, AppCommand, AppError, AppEvent, AppModel};
use callwatch::cli::CliInvocation;
use callwatch::infra::{
    FeedSource, LOG_FILTER_ENV, MonitorConfig, Observer, REFRESH_MS_ENV, SPINNER_MS_ENV,
    init_logging, open_feed, spawn_demo, spawn_feed,
};
use callwatch::ui;
use crossterm::event::{Event, EventStream};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use crossterm::{ExecutableCommand, execute};
use futures_util::StreamExt;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io::{self, Stdout, Write};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Error)]
enum MainError {
    #[error(transparent)]
    App(#[from] AppError),
}

/// Who feeds the observer while the UI runs.
enum Producer {
    Feed(FeedSource),
    Demo { pace: Duration },
}

fn main() {
    if let Err(error) = run_main() {
        let mut err = io::stderr().lock();
        let _ = writeln!(err, "{error}");
        std::process::exit(1);
    }
}

fn run_main() -> Result<(), MainError> {
    let args = std::env::args().collect::<Vec<_>>();
    let invocation = match callwatch::cli::parse_invocation(&args) {
        Ok(invocation) => invocation,
        Err(error) => {
            let mut err = io::stderr().lock();
            let _ = writeln!(err, "{error}");
            let _ = writeln!(err);
            print_help();
            std::process::exit(2);
        }
    };

    match invocation {
        CliInvocation::PrintHelp => {
            print_help();
            Ok(())
        }
        CliInvocation::PrintVersion => {
            let mut out = io::stdout().lock();
            let _ = writeln!(out, "{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        CliInvocation::Watch { source } => Ok(run_monitor(Producer::Feed(source))?),
        CliInvocation::Demo { pace } => Ok(run_monitor(Producer::Demo { pace })?),
    }
}

fn print_help() {
    let text = format!(
        "{name} - live call-tree monitor for durable function calls\n\nUSAGE:\n  {name} [FILE|-]              Watch a newline-delimited JSON event feed (default: stdin)\n  {name} demo [--pace MS]      Watch synthetic call lineages (default pace: 400)\n  {name} --help | --version\n\nFEED EVENTS (one JSON object per line):\n  {{\"event\":\"request\",\"root_id\":..,\"parent_id\":..,\"id\":..,\"function\":..,\"creation_time\":RFC3339,\"expiration_time\":RFC3339}}\n  {{\"event\":\"response\",\"id\":..,\"status_code\":N | \"error\":.. | \"outcome\":{{\"code\":..,\"directive\":\"poll\"|{{\"exit\":{{..}}}}}}}}\n  {{\"event\":\"log\",\"line\":..}}\n\nKEYS:\n  tab  switch tabs    t  tail    arrows/pgup/pgdn/ctrl+u/ctrl+d  scroll    q/esc/ctrl+c  quit\n\nENV:\n  {refresh}  Refresh interval in ms (default: 500)\n  {spinner}  Spinner interval in ms (default: 100)\n  {log}         Log filter for the Logs tab (default: info)\n",
        name = env!("CARGO_PKG_NAME"),
        refresh = REFRESH_MS_ENV,
        spinner = SPINNER_MS_ENV,
        log = LOG_FILTER_ENV,
    );
    let mut out = io::stdout().lock();
    let _ = write!(out, "{text}");
}

fn run_monitor(producer: Producer) -> Result<(), AppError> {
    let config = MonitorConfig::from_env()?;
    let observer = Arc::new(Observer::new());
    init_logging(observer.clone(), &config.log_filter)?;

    // Open the feed before taking over the terminal so failures print normally.
    match producer {
        Producer::Feed(source) => {
            let reader = open_feed(&source)?;
            let _ = spawn_feed(source, reader, observer.clone());
        }
        Producer::Demo { pace } => {
            let _ = spawn_demo(observer.clone(), pace);
        }
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let mut terminal = setup_terminal()?;
    install_panic_hook();
    let result = runtime.block_on(run(&mut terminal, &observer, &config));
    restore_terminal(&mut terminal)?;
    result
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>, AppError> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Ok(Terminal::new(backend)?)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<(), AppError> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Leaves raw mode and the alternate screen before the default panic report.
fn install_panic_hook() {
    chain_panic_hook(|| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    });
}

fn chain_panic_hook(restore: impl Fn() + Send + Sync + 'static) {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        restore();
        previous(info);
    }));
}

async fn run(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    observer: &Observer,
    config: &MonitorConfig,
) -> Result<(), AppError> {
    let mut model = AppModel::new();
    if let Ok(size) = terminal.size() {
        model = apply(model, AppEvent::Resize(size.width, size.height), observer);
    }

    let mut events = EventStream::new();
    let mut refresh = tokio::time::interval(config.refresh_interval);
    refresh.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut spinner = tokio::time::interval(config.spinner_interval);
    spinner.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tracing::info!("monitor started");

    loop {
        terminal.draw(|frame| ui::render(frame, &model))?;

        let event = tokio::select! {
            _ = refresh.tick() => AppEvent::Tick,
            _ = spinner.tick() => AppEvent::SpinnerTick,
            maybe_event = events.next() => match maybe_event {
                Some(Ok(Event::Key(key))) => AppEvent::Key(key),
                Some(Ok(Event::Resize(width, height))) => AppEvent::Resize(width, height),
                Some(Ok(_)) => continue,
                Some(Err(error)) => return Err(error.into()),
                None => return Ok(()),
            },
        };

        let (next, command) = app::update(model, event);
        model = next;
        match command {
            AppCommand::None => {}
            AppCommand::Quit => {
                tracing::info!("monitor stopped");
                return Ok(());
            }
            AppCommand::Refresh => model = refresh_content(model, observer),
        }
    }
}

fn apply(model: AppModel, event: AppEvent, observer: &Observer) -> AppModel {
    let (model, command) = app::update(model, event);
    match command {
        AppCommand::Refresh => refresh_content(model, observer),
        AppCommand::None | AppCommand::Quit => model,
    }
}

fn refresh_content(model: AppModel, observer: &Observer) -> AppModel {
    let content = app::load_content(observer, model.active_tab, SystemTime::now());
    app::update(model, AppEvent::ContentReady(content)).0
}
