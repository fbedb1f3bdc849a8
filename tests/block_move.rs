use std::sync::Arc;

use padloop::model::pattern::{ContainerRef, Item, Pattern};
use padloop::pattern::pause::{normalize_pauses, TrailingPause};
use padloop::pattern::planner::block_for_selection;
use padloop::pattern::{
    apply_block_move, build_timeline, materialize_block_move, plan_block_move, Drag, MoveMode, PadLengths,
};

fn pads() -> PadLengths {
    PadLengths::new(4)
}

fn root(items: Vec<Item>) -> Arc<Pattern> {
    Arc::new(Pattern::with_root(items))
}

fn total(p: &Pattern) -> u32 {
    build_timeline(p, &ContainerRef::Root, &pads(), true).total_steps
}

// The documented drag example says "target step 4" but its result places
// p1 at step 8. The target here is the block's new start, so the example
// is checked at 8; step 4 is covered by `block_can_close_up_to_its_neighbour`.
#[test]
fn pad_dropped_into_pause_splits_it() {
    let p = root(vec![Item::pad(0), Item::pause(8), Item::pad(1)]);
    assert_eq!(total(&p), 16);
    let tl = build_timeline(&p, &ContainerRef::Root, &pads(), true);

    let plan = plan_block_move(&tl.all_tokens, 2, 2, 8);
    assert_eq!(plan.mode, Some(MoveMode::GapInsert { gap_start: 4, gap_end: 16 }));

    let next = apply_block_move(&p, &ContainerRef::Root, &pads(), (2, 2), 8);
    assert_eq!(
        &next.root[..],
        &[Item::pad(0), Item::pause(4), Item::pad(1), Item::pause(4)]
    );
    assert_eq!(total(&next), 16);
}

#[test]
fn block_can_close_up_to_its_neighbour() {
    let p = root(vec![Item::pad(0), Item::pause(8), Item::pad(1)]);
    let next = apply_block_move(&p, &ContainerRef::Root, &pads(), (2, 2), 4);
    assert_eq!(&next.root[..], &[Item::pad(0), Item::pad(1), Item::pause(8)]);
    assert_eq!(total(&next), 16);
}

#[test]
fn equal_neighbours_swap_without_moving_others() {
    let p = root(vec![Item::pad(0), Item::pad(1), Item::pause(4), Item::pad(2)]);
    let tl = build_timeline(&p, &ContainerRef::Root, &pads(), true);
    let plan = plan_block_move(&tl.all_tokens, 1, 1, 0);
    assert_eq!(plan.mode, Some(MoveMode::Swap { with: 0 }));

    let items = materialize_block_move(&tl.all_tokens, &plan).expect("valid");
    assert_eq!(items, vec![Item::pad(1), Item::pad(0), Item::pause(4), Item::pad(2)]);
}

#[test]
fn append_pads_up_to_target() {
    let p = root(vec![Item::pad(0), Item::pad(1)]);
    let tl = build_timeline(&p, &ContainerRef::Root, &pads(), true);
    let plan = plan_block_move(&tl.all_tokens, 0, 0, 20);
    assert_eq!(plan.mode, Some(MoveMode::Append { gap: 12 }));

    let next = apply_block_move(&p, &ContainerRef::Root, &pads(), (0, 0), 20);
    assert_eq!(
        &next.root[..],
        &[Item::pause(4), Item::pad(1), Item::pause(8), Item::pause(4), Item::pad(0)]
    );
    assert_eq!(total(&next), 20 + plan.block_steps);
}

#[test]
fn trailing_silence_holds_blocks_until_they_overhang() {
    let p = root(vec![Item::pad(0), Item::pad(1), Item::pause(16)]);
    assert_eq!(total(&p), 24);

    let inside = apply_block_move(&p, &ContainerRef::Root, &pads(), (1, 1), 16);
    assert_eq!(
        &inside.root[..],
        &[Item::pad(0), Item::pause(8), Item::pause(4), Item::pad(1), Item::pause(4)]
    );
    assert_eq!(total(&inside), 24);

    // Past the tail: padding starts from the end of p0, old silence is gone
    let past = apply_block_move(&p, &ContainerRef::Root, &pads(), (1, 1), 24);
    assert_eq!(&past.root[..], &[Item::pad(0), Item::pause(16), Item::pause(4), Item::pad(1)]);
    assert_eq!(total(&past), 28);
}

#[test]
fn landing_on_other_content_is_invalid() {
    let p = root(vec![Item::pad(0), Item::pad(1), Item::pad(2), Item::pad(3)]);
    let tl = build_timeline(&p, &ContainerRef::Root, &pads(), true);
    let plan = plan_block_move(&tl.all_tokens, 0, 0, 8);
    assert!(!plan.is_valid());
    assert!(materialize_block_move(&tl.all_tokens, &plan).is_none());
    assert!(Arc::ptr_eq(&p, &apply_block_move(&p, &ContainerRef::Root, &pads(), (0, 0), 8)));
}

#[test]
fn multi_token_block_moves_as_one() {
    let p = root(vec![Item::pad(0), Item::pause(4), Item::pad(1), Item::pause(16), Item::pad(2)]);
    let tl = build_timeline(&p, &ContainerRef::Root, &pads(), true);
    let block = block_for_selection(&tl.all_tokens, &[0, 2]).expect("touching");
    assert_eq!(block, (0, 2));

    let next = apply_block_move(&p, &ContainerRef::Root, &pads(), block, 16);
    assert_eq!(
        &next.root[..],
        &[Item::pause(16), Item::pad(0), Item::pause(4), Item::pad(1), Item::pad(2)]
    );
    assert_eq!(total(&next), total(&p));
}

#[test]
fn moves_work_inside_named_containers() {
    let g1 = ContainerRef::Group { id: "g1".into() };
    let p = Arc::new(
        Pattern::with_root(vec![Item::group("g1")]).with_group("g1", vec![Item::pad(0), Item::pause(8)]),
    );
    let next = apply_block_move(&p, &g1, &pads(), (0, 0), 8);
    assert_eq!(&next.groups["g1"][..], &[Item::pause(8), Item::pad(0)]);
    assert!(Arc::ptr_eq(&p.root, &next.root));
}

#[test]
fn drag_preview_tracks_pointer_until_commit() {
    let p = root(vec![Item::pad(0), Item::pause(8), Item::pad(1)]);
    let tl = build_timeline(&p, &ContainerRef::Root, &pads(), true);
    let mut drag = Drag::begin(&tl, ContainerRef::Root, &[2]).expect("block");

    assert!(!drag.hover(&tl, 1).is_valid());
    assert!(drag.hover(&tl, 9).is_valid());
    assert_eq!(drag.proposal().map(|pr| pr.target_step), Some(8));

    let next = drag.commit(&p, &pads());
    assert_eq!(normalize_pauses(&next.root, TrailingPause::Drop), vec![Item::pad(0), Item::pause(4), Item::pad(1)]);
}

#[test]
fn off_grid_target_changes_nothing() {
    let p = root(vec![Item::pad(0), Item::pause(8), Item::pad(1)]);
    let tl = build_timeline(&p, &ContainerRef::Root, &pads(), true);
    assert!(!plan_block_move(&tl.all_tokens, 2, 2, 6).is_valid());

    let next = apply_block_move(&p, &ContainerRef::Root, &pads(), (2, 2), 6);
    assert!(Arc::ptr_eq(&p, &next));
    assert_eq!(total(&next), 16);
}

#[test]
fn target_at_the_top_of_the_range_is_rejected() {
    let p = root(vec![Item::pad(0), Item::pad(1)]);
    let next = apply_block_move(&p, &ContainerRef::Root, &pads(), (0, 0), u32::MAX - 3);
    assert!(Arc::ptr_eq(&p, &next));
}
