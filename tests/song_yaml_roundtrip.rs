use std::sync::Arc;

use padloop::model::pattern::{Item, Pattern};
use padloop::model::song::Song;
use padloop::model::track::Track;
use padloop::storage::song::{from_str, to_string, Format};

fn nested_song() -> Song {
    let mut s = Song::default();
    let mut t = Track::new("Kick");
    t.pad_steps[2] = Some(32);
    t.pattern = Arc::new(
        Pattern::with_root(vec![Item::pad(0), Item::pause(8), Item::super_group("s1")])
            .with_super("s1", vec![Item::group("g1"), Item::pad(2)])
            .with_group("g1", vec![Item::pad(1), Item::pad(1)]),
    );
    s.tracks.push(t);
    s
}

#[test]
fn roundtrip_song_yaml() {
    let s = nested_song();
    let yaml = serde_yaml::to_string(&s).expect("serialize");
    let out: Song = serde_yaml::from_str(&yaml).expect("deserialize");

    assert_eq!(out.tracks.len(), 1);
    assert_eq!(out.tracks[0].name, "Kick");
    assert_eq!(out.tracks[0].pad_steps[2], Some(32));
    assert_eq!(out.tracks[0].pattern, s.tracks[0].pattern);
}

#[test]
fn items_are_tagged_by_type() {
    let yaml = to_string(&nested_song(), Format::Yaml).expect("serialize");
    assert!(yaml.contains("type: pad"));
    assert!(yaml.contains("type: super"));
}

#[test]
fn missing_fields_take_defaults() {
    let yaml = "bpm: 90\ntracks:\n  - name: Bass\n";
    let song = from_str(yaml, Format::Yaml).expect("deserialize");
    let t = &song.tracks[0];
    assert_eq!(song.bpm, 90);
    assert_eq!(t.default_pad_steps, 16);
    assert!(t.pattern.root.is_empty());
    assert!(!t.mute);
}
