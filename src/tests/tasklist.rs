use super::{parse, text_of};
use crate::nodes::ItemType;
use pretty_assertions::assert_eq;

#[test]
fn checked_and_unchecked_items() {
    let doc = parse("- [ ] open\n- [x] done\n- [X] DONE");
    let list = &doc.items[1];
    assert_eq!(list.children.len(), 3);

    let states: Vec<Option<bool>> = list
        .children
        .iter()
        .map(|i| i.as_list_item().unwrap().task)
        .collect();
    assert_eq!(states, vec![Some(false), Some(true), Some(true)]);

    // The checkbox is syntax, not content.
    let p = &list.children[0].children[0];
    assert_eq!(text_of(&p.children[0]), "open");
    assert_eq!(p.children[0].pos.start.column, 6);
}

#[test]
fn plain_items_carry_no_task_flag() {
    let doc = parse("- just text");
    let li = doc.items[1].children[0].as_list_item().unwrap();
    assert_eq!(li.task, None);
}

#[test]
fn bracket_without_following_space_is_content() {
    let doc = parse("- [x]tight");
    let li = doc.items[1].children[0].as_list_item().unwrap();
    assert_eq!(li.task, None);
    let p = &doc.items[1].children[0].children[0];
    assert!(text_of(&p.children[0]).starts_with("[x]tight"));
}

#[test]
fn nested_task_lists() {
    let doc = parse("- [ ] outer\n  - [x] inner");
    let outer = &doc.items[1].children[0];
    assert_eq!(outer.as_list_item().unwrap().task, Some(false));

    let nested = &outer.children[1];
    assert_eq!(nested.item_type(), ItemType::List);
    let inner = nested.children[0].as_list_item().unwrap();
    assert_eq!(inner.task, Some(true));
}

#[test]
fn ordered_task_items() {
    let doc = parse("1. [x] numbered");
    let li = doc.items[1].children[0].as_list_item().unwrap();
    assert_eq!(li.task, Some(true));
    assert_eq!(li.start_number, 1);
}
