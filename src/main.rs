use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, Command};

use padloop::config::{self, Config};
use padloop::editor::Editor;
use padloop::model::song::Song;
use padloop::{console, repl, storage};

fn cli() -> Command {
    Command::new("padloop")
        .about("Pad-loop pattern editor REPL")
        .arg(
            Arg::new("open")
                .short('o')
                .long("open")
                .value_name("FILE")
                .help("Open a YAML or JSON song on start"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .action(ArgAction::SetTrue)
                .help("Reduce startup banner output"),
        )
        .arg(
            Arg::new("pad-steps")
                .long("pad-steps")
                .value_name("N")
                .value_parser(value_parser!(u32).range(1..))
                .help("Pad length for new tracks (overrides PADLOOP_DEFAULT_PAD_STEPS)"),
        )
        .arg(
            Arg::new("exec")
                .short('e')
                .long("exec")
                .value_name("COMMANDS")
                .help("Run `;`-separated commands and exit"),
        )
        .arg(
            Arg::new("script")
                .long("script")
                .value_name("FILE")
                .conflicts_with("exec")
                .help("Run commands from a file, one per line, and exit"),
        )
        .arg(
            Arg::new("watch")
                .short('w')
                .long("watch")
                .action(ArgAction::SetTrue)
                .requires("open")
                .help("Reload the opened song when it changes on disk"),
        )
}

fn main() -> Result<()> {
    let matches = cli().get_matches();

    let mut config = Config::load();
    if let Some(steps) = matches.get_one::<u32>("pad-steps") {
        config.default_pad_steps = *steps;
    }

    let open_path = matches.get_one::<String>("open").map(PathBuf::from);
    let song = match &open_path {
        Some(path) => match storage::song::open(path) {
            Ok(s) => s,
            Err(e) => {
                console::error(format!("failed to open {}: {:#}; starting new song", path.display(), e));
                Song::default()
            }
        },
        None => Song::default(),
    };
    let mut editor = Editor::with_song(song, config);

    if let Some(commands) = matches.get_one::<String>("exec") {
        return repl::run_batch(&mut editor, commands);
    }
    if let Some(path) = matches.get_one::<String>("script") {
        let script = fs::read_to_string(path).with_context(|| format!("read script {}", path))?;
        return repl::run_batch(&mut editor, &script);
    }

    if !matches.get_flag("quiet") {
        println!(
            "PADLOOP REPL — bpm: {} tracks: {} pad steps: {} (type :help)",
            editor.song().bpm,
            editor.song().tracks.len(),
            editor.config().default_pad_steps,
        );
        if editor.config().history_file.is_none() {
            println!("set {} to keep history", config::ENV_HISTORY);
        }
    }

    let reloads = match (&open_path, matches.get_flag("watch")) {
        (Some(path), true) => {
            println!("watching: {}", path.display());
            Some(storage::watch::spawn(path.clone()))
        }
        _ => None,
    };

    repl::run_repl(&mut editor, reloads)
}
