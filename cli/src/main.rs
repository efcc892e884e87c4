use clap::Parser;
use miette::{IntoDiagnostic, Result};
use rebl::query::TermKind;
use rebl::transpiler::lexer::KEYWORDS;
use reedline::{
    DefaultCompleter, DefaultPrompt, DefaultPromptSegment, DescriptionMode, EditCommand, Emacs,
    FileBackedHistory, IdeMenu, KeyCode, KeyModifiers, Keybindings, MenuBuilder, Reedline,
    ReedlineEvent, ReedlineMenu, Signal, default_emacs_keybindings,
};
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::ExitCode;

mod config;
mod highlighter;
mod output;
mod session;

use config::{Layer, Options};
use output::Format;
use session::{Accumulator, InputValidator, Shell};

const HISTORY_FILE: &str = ".rebl_history";
const HISTORY_SIZE: usize = 1000;

/// rebl - A read-eval-print loop for document database queries
#[derive(Parser, Debug)]
#[command(name = "rebl")]
#[command(about = "Evaluate scripts that build and run database queries", long_about = None)]
struct Args {
    /// Accept the terse alternate syntax
    #[arg(short, long)]
    terse: bool,

    /// Database used when a query names none
    #[arg(short, long)]
    database: Option<String>,

    /// JSON file to load into the in-memory store
    #[arg(long, value_name = "FILE")]
    data: Option<PathBuf>,

    /// Read options from this file instead of the global and user files
    #[arg(short = 'f', long = "file", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print results as indented JSON
    #[arg(short, long)]
    json: bool,

    /// Print results as compact JSON
    #[arg(short, long)]
    raw: bool,

    /// Print each row of a sequence on its own line
    #[arg(short, long)]
    stream: bool,

    /// Disable colored output
    #[arg(short = 'n', long)]
    no_colors: bool,

    /// Expression to evaluate (if not provided, reads from stdin)
    expression: Vec<String>,
}

impl Args {
    /// Flags only override what was actually given.
    fn layer(&self) -> Layer {
        Layer {
            terse: self.terse.then_some(true),
            database: self.database.clone(),
            data: self.data.clone(),
            colors: self.no_colors.then_some(false),
            json: self.json.then_some(true),
            raw: self.raw.then_some(true),
            stream: self.stream.then_some(true),
        }
    }
}

fn add_menu_keybindings(keybindings: &mut Keybindings) {
    keybindings.add_binding(
        KeyModifiers::NONE,
        KeyCode::Tab,
        ReedlineEvent::UntilFound(vec![
            ReedlineEvent::Menu("completion_menu".to_string()),
            ReedlineEvent::MenuNext,
        ]),
    );
    keybindings.add_binding(
        KeyModifiers::ALT,
        KeyCode::Enter,
        ReedlineEvent::Edit(vec![EditCommand::InsertNewline]),
    );
}

fn setup_reedline(options: &Options) -> Result<(Reedline, DefaultPrompt)> {
    let mut words: Vec<String> = TermKind::all()
        .iter()
        .map(|kind| kind.name().to_string())
        .collect();
    words.extend(KEYWORDS.iter().map(|word| word.to_string()));

    let completer = Box::new({
        let mut completions = DefaultCompleter::with_inclusions(&['_']);
        completions.insert(words);
        completions
    });

    let ide_menu = IdeMenu::default()
        .with_name("completion_menu")
        .with_min_completion_width(0)
        .with_max_completion_width(50)
        .with_max_completion_height(u16::MAX)
        .with_padding(0)
        .with_cursor_offset(0)
        .with_description_mode(DescriptionMode::PreferRight)
        .with_min_description_width(0)
        .with_max_description_width(50)
        .with_description_offset(1)
        .with_correct_cursor_pos(false);

    let completion_menu = Box::new(ide_menu);

    let mut keybindings = default_emacs_keybindings();
    add_menu_keybindings(&mut keybindings);

    let edit_mode = Box::new(Emacs::new(keybindings));

    let mut line_editor = Reedline::create()
        .with_highlighter(Box::new(highlighter::Highlighter::new(options.terse)))
        .with_validator(Box::new(InputValidator::new(options.terse)))
        .with_completer(completer)
        .with_menu(ReedlineMenu::EngineCompleter(completion_menu))
        .with_edit_mode(edit_mode);

    if let Some(home) = dirs::home_dir() {
        let history = FileBackedHistory::with_file(HISTORY_SIZE, home.join(HISTORY_FILE))
            .into_diagnostic()?;
        line_editor = line_editor.with_history(Box::new(history));
    }

    let prompt = DefaultPrompt::new(
        DefaultPromptSegment::Basic(options.database.clone()),
        DefaultPromptSegment::Empty,
    );

    Ok((line_editor, prompt))
}

fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    // REBL_LOG wins over RUST_LOG; default to WARN if neither is set
    let filter = EnvFilter::try_from_env("REBL_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_logging();

    let mut layers = config::file_layers(args.config.as_deref())?;
    layers.push(args.layer());
    let options = config::merge(layers);
    tracing::debug!(?options, "Options resolved");

    let is_interactive = atty::is(atty::Stream::Stdin);
    let format = Format::from_options(&options, atty::is(atty::Stream::Stdout));

    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();

    // One-shot mode: the arguments form a single fragment
    if !args.expression.is_empty() {
        let mut shell = Shell::new(&options, format, "argv")?;
        let ok = shell
            .run(&args.expression.join(" "), &mut stdout, &mut stderr)
            .into_diagnostic()?;
        return Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE });
    }

    if is_interactive {
        let mut shell = Shell::new(&options, format, "repl")?;
        let (mut line_editor, prompt) = setup_reedline(&options)?;

        println!("rebl - connected to in-memory database `{}` (Ctrl+D or Ctrl+C to exit)", options.database);

        loop {
            let sig = match line_editor.read_line(&prompt) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("Reedline error: {e}");
                    return Ok(ExitCode::FAILURE);
                }
            };

            match sig {
                Signal::Success(buffer) => {
                    shell.run(&buffer, &mut stdout, &mut stderr).into_diagnostic()?;
                }
                Signal::CtrlD | Signal::CtrlC => {
                    println!("\nGoodbye!");
                    return Ok(ExitCode::SUCCESS);
                }
            }
        }
    }

    // Pipe mode: lines are grouped into fragments; a failure does not stop
    // the rest of the input but is reflected in the exit code
    let mut shell = Shell::new(&options, format, "stdin")?;
    let mut pending = Accumulator::new(options.terse);
    let mut ok = true;

    let stdin = std::io::stdin();
    let reader = BufReader::new(stdin.lock());
    for line in reader.lines() {
        let line = line.into_diagnostic()?;
        if let Some(fragment) = pending.push(&line) {
            ok &= shell.run(&fragment, &mut stdout, &mut stderr).into_diagnostic()?;
        }
    }
    if let Some(fragment) = pending.finish() {
        ok &= shell.run(&fragment, &mut stdout, &mut stderr).into_diagnostic()?;
    }

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
