use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use rustyline::{error::ReadlineError, history::DefaultHistory, Editor as LineEditor};

use crate::console::{self, Subscription};
use crate::editor::Editor;
use crate::model::pattern::{ContainerRef, GroupKind, PAD_COUNT};
use crate::pattern::notation::{format_sequence, parse_item, parse_sequence};
use crate::pattern::snap_to_grid;
use crate::storage::song as song_io;
use crate::storage::watch::Reloads;

mod completer;
pub mod style;

use completer::PadloopHelper;

pub fn run_repl(editor: &mut Editor, reloads: Option<Reloads>) -> Result<()> {
    let mut rl = LineEditor::<PadloopHelper, DefaultHistory>::new()?;
    rl.set_helper(Some(PadloopHelper::new()));
    let history = editor.config().history_file.clone();
    if let Some(path) = &history {
        // Missing history on first run is expected
        let _ = rl.load_history(path);
    }
    let log = console::subscribe();

    loop {
        if let Some(rx) = &reloads {
            while let Some(song) = rx.try_recv() {
                editor.replace_song(song);
            }
        }
        print_log(&log);

        let prompt = style::format_prompt(editor.song().bpm, editor.is_dragging());
        match rl.readline(&prompt) {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                rl.add_history_entry(line.as_str())?;
                match handle_line(editor, &line) {
                    Ok(Output::None) => {}
                    Ok(Output::Text(t)) => println!("{}", t),
                    Ok(Output::Quit) => {
                        println!("{}", style::goodbye());
                        break;
                    }
                    Err(e) => eprintln!("error: {:#}", e),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                println!("{}", style::goodbye());
                break;
            }
            Err(err) => {
                eprintln!("repl error: {}", err);
                break;
            }
        }
    }
    print_log(&log);

    if let Some(path) = &history {
        if let Err(e) = rl.save_history(path) {
            console::warn(format!("could not save history to {}: {}", path.display(), e));
        }
    }
    Ok(())
}

/// Run newline-separated commands without a terminal. Stops at the first
/// failing command or `:q`.
pub fn run_batch(editor: &mut Editor, script: &str) -> Result<()> {
    let log = console::subscribe();
    for (n, line) in script.lines().enumerate() {
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }
        let result = handle_line(editor, line);
        print_log(&log);
        match result.with_context(|| format!("line {}: {}", n + 1, line.trim()))? {
            Output::None => {}
            Output::Text(t) => println!("{}", t),
            Output::Quit => break,
        }
    }
    Ok(())
}

fn print_log(log: &Subscription) {
    for msg in log.drain() {
        eprintln!("{}", msg);
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Output {
    None,
    Text(String),
    Quit,
}

pub fn handle_line(editor: &mut Editor, line: &str) -> Result<Output> {
    let commands = split_commands(line);
    if commands.len() == 1 {
        return handle_command(editor, &commands[0]);
    }
    let mut texts = Vec::new();
    for cmd in commands {
        match handle_command(editor, &cmd)? {
            Output::None => {}
            Output::Text(t) => texts.push(t),
            Output::Quit => return Ok(Output::Quit),
        }
    }
    Ok(if texts.is_empty() {
        Output::None
    } else {
        Output::Text(texts.join("\n"))
    })
}

/// Split on `;` outside of quotes. Empty segments are dropped.
fn split_commands(line: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for c in line.chars() {
        match (quote, c) {
            (None, ';') => {
                out.push(std::mem::take(&mut current));
                continue;
            }
            (None, '"') | (None, '\'') => quote = Some(c),
            (Some(q), _) if q == c => quote = None,
            _ => {}
        }
        current.push(c);
    }
    out.push(current);
    out.retain(|s| !s.trim().is_empty());
    if out.is_empty() {
        out.push(String::new());
    }
    out
}

fn handle_command(editor: &mut Editor, line: &str) -> Result<Output> {
    let l = line.trim();
    if let Some(rest) = l.strip_prefix(':') {
        return handle_meta(rest);
    }
    if l.is_empty() {
        return Ok(Output::None);
    }

    let words = shlex::split(l).ok_or_else(|| anyhow!("unbalanced quotes"))?;
    let mut parts = words.into_iter();
    let cmd = parts.next().unwrap_or_default();
    let args: Vec<String> = parts.collect();

    match cmd.as_str() {
        "bpm" => {
            let bpm: u32 = arg(&args, 0, "bpm <number>")?.parse()?;
            if bpm == 0 {
                bail!("bpm must be positive");
            }
            editor.set_bpm(bpm);
            Ok(Output::Text(style::tempo(bpm)))
        }
        "track" => {
            let name = arg(&args, 0, "track \"Name\"")?;
            if name.is_empty() {
                bail!("usage: track \"Name\"");
            }
            let idx = editor.add_track(name);
            Ok(Output::Text(style::success(&format!("added track {} {}", idx + 1, name))))
        }
        "remove" => {
            let t = parse_track_index(editor, arg(&args, 0, "remove <track>")?)?;
            let removed = editor.remove_track(t)?;
            Ok(Output::Text(style::success(&format!("removed track {} {}", t + 1, removed.name))))
        }
        "list" => Ok(Output::Text(editor.song().list().trim_end().to_string())),
        "pad" => {
            let usage = "pad <track> <pad 0-7> [steps|default]";
            let t = parse_track_index(editor, arg(&args, 0, usage)?)?;
            let pad: u8 = arg(&args, 1, usage)?.parse()?;
            if pad as usize >= PAD_COUNT {
                bail!("pad must be 0-7");
            }
            match args.get(2).map(String::as_str) {
                None => {
                    let steps = editor.track(t)?.pad_lengths().pad_steps(pad);
                    Ok(Output::Text(format!("  track {} p{} = {} steps", t + 1, pad, steps)))
                }
                Some("default") => {
                    editor.set_pad_steps(t, pad, None)?;
                    Ok(Output::Text(style::success(&format!("p{} uses the track default", pad))))
                }
                Some(raw) => {
                    let steps: u32 = raw.parse()?;
                    editor.set_pad_steps(t, pad, Some(steps))?;
                    Ok(Output::Text(style::success(&format!("p{} = {} steps", pad, steps))))
                }
            }
        }
        "padsteps" => {
            let usage = "padsteps <track> <steps>";
            let t = parse_track_index(editor, arg(&args, 0, usage)?)?;
            let steps: u32 = arg(&args, 1, usage)?.parse()?;
            editor.set_default_pad_steps(t, steps)?;
            Ok(Output::Text(style::success(&format!("track {} pads default to {} steps", t + 1, steps))))
        }
        "seq" => {
            let (t, c) = parse_address(editor, arg(&args, 0, "seq <addr> \"p0 ~8 [g1]\"")?)?;
            if args.len() == 1 {
                let seq = editor
                    .pattern(t)?
                    .sequence(&c)
                    .ok_or_else(|| anyhow!("track {} has no container {}", t + 1, c))?;
                return Ok(Output::Text(format!("  {}", format_sequence(&seq))));
            }
            let items = parse_sequence(&args[1..].join(" "))?;
            changed(editor.set_sequence(t, &c, items)?, "sequence set")
        }
        "show" => {
            let (t, c) = parse_address(editor, arg(&args, 0, "show <addr>")?)?;
            let timeline = editor.timeline(t, &c, true)?;
            let selected = editor.selection(t, &c);
            let label = format!("{} {}", editor.track(t)?.name, c);
            Ok(Output::Text(style::render_timeline(&label, &timeline, &selected)))
        }
        "insert" => {
            let usage = "insert <addr> <index> <item>";
            let (t, c) = parse_address(editor, arg(&args, 0, usage)?)?;
            let index = parse_index(arg(&args, 1, usage)?)?;
            let item = parse_item(arg(&args, 2, usage)?)?;
            changed(editor.insert(t, &c, index, item)?, "inserted")
        }
        "del" => {
            let (t, c) = parse_address(editor, arg(&args, 0, "del <addr> <index>...")?)?;
            let indices = parse_indices(&args[1..])?;
            if indices.is_empty() {
                bail!("usage: del <addr> <index>...");
            }
            changed(editor.delete(t, &c, &indices)?, "deleted")
        }
        "mv" => {
            let usage = "mv <addr> <from> <to>";
            let (t, c) = parse_address(editor, arg(&args, 0, usage)?)?;
            let from = parse_index(arg(&args, 1, usage)?)?;
            let to = parse_index(arg(&args, 2, usage)?)?;
            changed(editor.move_item(t, &c, from, to)?, "moved")
        }
        "replace" => {
            let usage = "replace <addr> <index> <item>";
            let (t, c) = parse_address(editor, arg(&args, 0, usage)?)?;
            let index = parse_index(arg(&args, 1, usage)?)?;
            let item = parse_item(arg(&args, 2, usage)?)?;
            changed(editor.replace(t, &c, index, item)?, "replaced")
        }
        "select" => {
            let (t, c) = parse_address(editor, arg(&args, 0, "select <addr> <index|a..b>...")?)?;
            if args.len() < 2 {
                bail!("usage: select <addr> <index|a..b>...");
            }
            for raw in &args[1..] {
                let (first, last) = parse_range(raw)?;
                editor.select(t, &c, first, last)?;
            }
            Ok(Output::Text(selection_text(editor, t, &c)))
        }
        "deselect" => {
            let (t, c) = parse_address(editor, arg(&args, 0, "deselect <addr> [index...]")?)?;
            if args.len() == 1 {
                editor.deselect(t, &c);
            } else {
                let current = editor.selection(t, &c);
                for i in parse_indices(&args[1..])? {
                    if current.contains(&i) {
                        editor.toggle(t, &c, i)?;
                    }
                }
            }
            Ok(Output::Text(selection_text(editor, t, &c)))
        }
        "group" | "supergroup" => {
            let kind = if cmd == "group" { GroupKind::Group } else { GroupKind::Super };
            let (t, c) = parse_address(editor, arg(&args, 0, &format!("{} <addr>", cmd))?)?;
            match editor.group(t, &c, kind)? {
                Some(created) => Ok(Output::Text(style::success(&format!(
                    "{} {} created",
                    kind.as_str(),
                    created
                )))),
                None => Ok(Output::Text(style::unchanged("selection is not one contiguous run"))),
            }
        }
        "ungroup" => {
            let (t, c) = parse_address(editor, arg(&args, 0, "ungroup <addr>")?)?;
            changed(editor.ungroup(t, &c)?, "ungrouped")
        }
        "cut" => {
            let (t, c) = parse_address(editor, arg(&args, 0, "cut <addr>")?)?;
            changed(editor.cut(t, &c)?, "cut")
        }
        "drag" => {
            let usage = "drag <addr> [step] | drag to <step>";
            if arg(&args, 0, usage)? == "to" {
                let step: u32 = arg(&args, 1, usage)?.parse()?;
                let proposal = editor.hover(step)?;
                return Ok(Output::Text(style::proposal(&proposal)));
            }
            let (t, c) = parse_address(editor, arg(&args, 0, usage)?)?;
            let (first, last) = editor.begin_drag(t, &c)?;
            let mut text = style::success(&format!("dragging {}..={} of {}", first, last, c));
            if let Some(raw) = args.get(1) {
                let proposal = editor.hover(raw.parse()?)?;
                text.push('\n');
                text.push_str(&style::proposal(&proposal));
            }
            Ok(Output::Text(text))
        }
        "drop" => changed(editor.drop_drag()?, "dropped"),
        "cancel" => {
            if editor.cancel_drag() {
                Ok(Output::Text(style::success("drag cancelled")))
            } else {
                Ok(Output::Text(style::unchanged("no drag in progress")))
            }
        }
        "move" => {
            let usage = "move <addr> <first> <last> <target_step>";
            let (t, c) = parse_address(editor, arg(&args, 0, usage)?)?;
            let first = parse_index(arg(&args, 1, usage)?)?;
            let last = parse_index(arg(&args, 2, usage)?)?;
            let target = snap_to_grid(arg(&args, 3, usage)?.parse()?);
            changed(editor.move_block(t, &c, (first, last), target)?, "moved")
        }
        "events" => match args.first() {
            Some(raw) => {
                let t = parse_track_index(editor, raw)?;
                Ok(Output::Text(style::events(&editor.events(t)?)))
            }
            None => Ok(Output::Text(format!("  arrangement: {} steps", editor.arrangement_steps()))),
        },
        "check" => {
            let t = parse_track_index(editor, arg(&args, 0, "check <track>")?)?;
            Ok(Output::Text(style::diagnostics(&editor.check(t)?)))
        }
        "save" => {
            let path = arg(&args, 0, "save \"file.yaml\"")?;
            song_io::save(editor.song(), path)?;
            Ok(Output::Text(style::saved(path)))
        }
        "open" => {
            let path = arg(&args, 0, "open \"file.yaml\"")?;
            let song = song_io::open(Path::new(path))?;
            editor.replace_song(song);
            Ok(Output::Text(style::opened(path)))
        }
        "" => Ok(Output::None),
        other => bail!("unknown command '{}' (type :help)", other),
    }
}

fn arg<'a>(args: &'a [String], i: usize, usage: &str) -> Result<&'a str> {
    args.get(i).map(String::as_str).ok_or_else(|| anyhow!("usage: {}", usage))
}

fn changed(did_change: bool, what: &str) -> Result<Output> {
    Ok(Output::Text(if did_change {
        style::success(what)
    } else {
        style::unchanged("no change")
    }))
}

fn selection_text(editor: &Editor, track: usize, container: &ContainerRef) -> String {
    let selected = editor.selection(track, container);
    if selected.is_empty() {
        return "  [nothing selected]".to_string();
    }
    let list: Vec<String> = selected.iter().map(|i| i.to_string()).collect();
    format!("  selected {} in {}", list.join(" "), container)
}

fn handle_meta(meta: &str) -> Result<Output> {
    match meta.trim() {
        "help" | "h" => Ok(Output::Text(HELP.to_string())),
        "q" | "quit" | "exit" => Ok(Output::Quit),
        _ => Ok(Output::Text("unknown meta command".into())),
    }
}

const HELP: &str = r#"Commands:
  :help                       Show this help
  :q / :quit                  Exit
  cmd; cmd                    Run several commands in one line

Song:
  bpm <n>                     Set tempo
  save "file.yaml"            Save song (.json saves JSON)
  open "file.yaml"            Load song
  events                      Length of the arrangement in steps

Tracks:
  track "Name"                Add a track
  remove <t>                  Remove a track
  list                        List all tracks
  pad <t> <pad> [n|default]   Show or set one pad's length in steps
  padsteps <t> <n>            Default pad length of a track
  events <t>                  Pad triggers of a track
  check <t>                   Report missing and cyclic references

Containers (<addr> is 1 for track 1's root, 1.g1 or 1.s1 for named ones):
  seq <addr> ["p0 ~8 [g1]"]   Show or replace a container's items
  show <addr>                 Timeline with step ranges
  insert <addr> <i> <item>    Insert an item before index i
  del <addr> <i>...           Delete items
  mv <addr> <from> <to>       Move one item
  replace <addr> <i> <item>   Overwrite one item

Selection:
  select <addr> <i|a..b>...   Add to the selection
  deselect <addr> [i...]      Remove from (or clear) the selection
  group <addr>                Selection -> new group g<n>
  supergroup <addr>           Selection -> new super-group s<n>
  ungroup <addr>              Inline selected group references
  cut <addr>                  Delete the selection

Moving blocks:
  drag <addr> [step]          Start dragging the selected block
  drag to <step>              Preview a drop (snapped to 4 steps)
  drop | cancel               Commit or abandon the drag
  move <addr> <a> <b> <step>  Move items a..=b so they start at step

Items: p0-p7 pad, ~8 pause (~ alone = 4), [g1] group, {s1} super-group
"#;

fn parse_track_index(editor: &Editor, raw: &str) -> Result<usize> {
    let idx: usize = raw.parse().map_err(|_| anyhow!("bad track index '{}'", raw))?;
    if idx == 0 || idx > editor.song().tracks.len() {
        bail!("no such track index");
    }
    Ok(idx - 1)
}

/// `1` is track 1's root, `1.g2` / `1.s1` its named containers.
fn parse_address(editor: &Editor, raw: &str) -> Result<(usize, ContainerRef)> {
    let (track, name) = match raw.split_once('.') {
        Some((t, n)) => (t, Some(n)),
        None => (raw, None),
    };
    let t = parse_track_index(editor, track)?;
    let container = match name {
        None | Some("root") => ContainerRef::Root,
        Some(id) if id.starts_with('g') && id.len() > 1 => ContainerRef::Group { id: id.to_string() },
        Some(id) if id.starts_with('s') && id.len() > 1 => ContainerRef::Super { id: id.to_string() },
        Some(other) => bail!("bad container '{}' (use g<n> or s<n>)", other),
    };
    Ok((t, container))
}

fn parse_index(raw: &str) -> Result<usize> {
    raw.parse().map_err(|_| anyhow!("bad index '{}'", raw))
}

fn parse_indices(raw: &[String]) -> Result<Vec<usize>> {
    raw.iter().map(|r| parse_index(r)).collect()
}

/// `3` or `1..4` (inclusive).
fn parse_range(raw: &str) -> Result<(usize, usize)> {
    match raw.split_once("..") {
        Some((a, b)) => Ok((parse_index(a)?, parse_index(b.trim_start_matches('='))?)),
        None => {
            let i = parse_index(raw)?;
            Ok((i, i))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::model::pattern::Item;

    fn editor() -> Editor {
        Editor::new(Config {
            default_pad_steps: 4,
            history_file: None,
        })
    }

    fn root(ed: &Editor) -> Vec<Item> {
        ed.pattern(0).expect("track").root.to_vec()
    }

    #[test]
    fn chained_commands_build_a_track() {
        let mut ed = editor();
        handle_line(&mut ed, r#"track "Drums"; seq 1 "p0 ~8 p1"; bpm 96"#).expect("chain");
        assert_eq!(ed.song().bpm, 96);
        assert_eq!(root(&ed), vec![Item::pad(0), Item::pause(8), Item::pad(1)]);
    }

    #[test]
    fn semicolon_inside_quotes_is_not_a_separator() {
        assert_eq!(split_commands(r#"track "a;b"; list"#), vec![r#"track "a;b""#, " list"]);
    }

    #[test]
    fn group_and_ungroup_through_addresses() {
        let mut ed = editor();
        handle_line(&mut ed, "track Drums; seq 1 p0 p1 p2 p3").expect("setup");
        handle_line(&mut ed, "select 1 1..2; group 1").expect("group");
        assert_eq!(root(&ed), vec![Item::pad(0), Item::group("g1"), Item::pad(3)]);

        let out = handle_line(&mut ed, "seq 1.g1").expect("show group");
        assert_eq!(out, Output::Text("  p1 p2".into()));

        handle_line(&mut ed, "select 1 1; ungroup 1").expect("ungroup");
        assert_eq!(root(&ed), vec![Item::pad(0), Item::pad(1), Item::pad(2), Item::pad(3)]);
    }

    #[test]
    fn non_contiguous_group_is_reported_not_applied() {
        let mut ed = editor();
        handle_line(&mut ed, "track Drums; seq 1 p0 p1 p2; select 1 0 2").expect("setup");
        let out = handle_line(&mut ed, "group 1").expect("group");
        assert!(matches!(out, Output::Text(t) if t.contains("not one contiguous run")));
        assert_eq!(root(&ed).len(), 3);
    }

    #[test]
    fn drag_drop_moves_block() {
        let mut ed = editor();
        handle_line(&mut ed, "track Drums; seq 1 p0 ~8 p1; select 1 2").expect("setup");
        let out = handle_line(&mut ed, "drag 1 8").expect("drag");
        assert!(matches!(out, Output::Text(t) if t.contains("insert into gap")));
        handle_line(&mut ed, "drop").expect("drop");
        assert_eq!(root(&ed), vec![Item::pad(0), Item::pause(4), Item::pad(1), Item::pause(4)]);
    }

    #[test]
    fn one_shot_move_swaps_neighbours() {
        let mut ed = editor();
        handle_line(&mut ed, "track Drums; seq 1 p0 p1 p2").expect("setup");
        handle_line(&mut ed, "move 1 0 0 4").expect("move");
        assert_eq!(root(&ed), vec![Item::pad(1), Item::pad(0), Item::pad(2)]);
    }

    #[test]
    fn move_target_snaps_to_grid() {
        let mut ed = editor();
        handle_line(&mut ed, "track Drums; seq 1 p0 ~8 p1").expect("setup");
        handle_line(&mut ed, "move 1 2 2 6").expect("move");
        assert_eq!(root(&ed), vec![Item::pad(0), Item::pause(4), Item::pad(1), Item::pause(4)]);
        assert_eq!(ed.timeline(0, &ContainerRef::Root, true).expect("timeline").total_steps, 16);
        assert!(handle_line(&mut ed, "move 1 0 0 4294967292").is_err());
    }

    #[test]
    fn typed_pauses_are_stored_canonically() {
        let mut ed = editor();
        handle_line(&mut ed, "track Drums; seq 1 p0 ~12 p1; insert 1 1 ~3").expect("setup");
        assert_eq!(
            root(&ed),
            vec![Item::pad(0), Item::pause(4), Item::pause(8), Item::pause(4), Item::pad(1)]
        );
        assert!(handle_line(&mut ed, "seq 1 ~99999999").is_err());
    }

    #[test]
    fn bad_addresses_are_errors() {
        let mut ed = editor();
        assert!(handle_line(&mut ed, "show 1").is_err());
        handle_line(&mut ed, "track Drums").expect("track");
        assert!(handle_line(&mut ed, "show 1.x1").is_err());
        assert!(handle_line(&mut ed, "show 1.g1").is_err());
        assert!(handle_line(&mut ed, "show 1").is_ok());
    }

    #[test]
    fn remove_track_by_index() {
        let mut ed = editor();
        handle_line(&mut ed, "track Kick; track Snare").expect("tracks");
        let output = handle_line(&mut ed, "remove 1").expect("remove track");
        assert_eq!(ed.song().tracks.len(), 1);
        assert_eq!(ed.song().tracks[0].name, "Snare");
        assert!(matches!(output, Output::Text(t) if t.contains("Kick")));
    }

    #[test]
    fn pad_lengths_feed_the_layout() {
        let mut ed = editor();
        handle_line(&mut ed, "track Keys; pad 1 3 10; seq 1 p3 p0").expect("setup");
        let tl = ed.timeline(0, &ContainerRef::Root, true).expect("timeline");
        assert_eq!(tl.total_steps, 16);
        handle_line(&mut ed, "pad 1 3 default").expect("reset");
        assert_eq!(ed.timeline(0, &ContainerRef::Root, true).expect("timeline").total_steps, 8);
    }

    #[test]
    fn quit_stops_a_chain() {
        let mut ed = editor();
        let out = handle_line(&mut ed, "track A; :q; track B").expect("chain");
        assert_eq!(out, Output::Quit);
        assert_eq!(ed.song().tracks.len(), 1);
    }
}
