use super::*;

fn key(name: &str) -> Key {
    Key::new(name)
}

fn presence_patches(effects: &[Effect]) -> Vec<&PresencePatch> {
    effects
        .iter()
        .filter_map(|e| match e {
            Effect::Presence(p) => Some(p),
            Effect::PreventDefault => None,
        })
        .collect()
}

fn in_reaction(value: &str) -> Interaction {
    let mut ix = Interaction::new();
    ix.on_key_up(&key("e"));
    ix.select_reaction(value);
    ix
}

// =============================================================
// Keyboard transitions
// =============================================================

#[test]
fn initial_state_is_hidden() {
    let ix = Interaction::new();
    assert_eq!(ix.state(), &CursorState::Hidden);
    assert_eq!(ix.mode(), Mode::Hidden);
}

#[test]
fn chat_ignores_reaction_key_then_escape_hides() {
    let mut ix = Interaction::new();

    ix.on_key_up(&key("/"));
    assert_eq!(ix.state(), &CursorState::Chat { previous_message: None, message: String::new() });

    ix.on_key_up(&key("e"));
    assert_eq!(ix.mode(), Mode::Chat);

    let effects = ix.on_key_up(&key("Escape"));
    assert_eq!(ix.state(), &CursorState::Hidden);
    assert_eq!(presence_patches(&effects), vec![&PresencePatch::message(Some(String::new()))]);
}

#[test]
fn picker_then_reaction() {
    let mut ix = Interaction::new();
    ix.on_key_up(&key("e"));
    assert_eq!(ix.state(), &CursorState::ReactionSelector);

    ix.select_reaction("🔥");
    assert_eq!(ix.state(), &CursorState::Reaction { value: "🔥".into(), is_pressed: false });
    assert_eq!(ix.state().reaction(), Some("🔥"));
}

#[test]
fn slash_in_chat_does_not_reset_draft() {
    let mut ix = Interaction::new();
    ix.on_key_up(&key("/"));
    ix.chat_input("a/b");
    ix.on_key_up(&key("/"));
    assert_eq!(ix.state(), &CursorState::Chat { previous_message: None, message: "a/b".into() });
}

#[test]
fn slash_from_reaction_opens_chat() {
    let mut ix = in_reaction("👀");
    ix.on_key_up(&key("/"));
    assert_eq!(ix.mode(), Mode::Chat);
}

#[test]
fn second_handler_in_same_pass_sees_new_mode() {
    let mut ix = Interaction::new();
    ix.on_key_up(&key("/"));
    // Another listener for the same keypress must not see Hidden any more.
    assert!(ix.on_key_down(&key("/")).is_empty());
}

#[test]
fn key_down_slash_prevents_default_outside_chat() {
    let ix = Interaction::new();
    assert_eq!(ix.on_key_down(&key("/")), vec![Effect::PreventDefault]);
    assert!(ix.on_key_down(&key("x")).is_empty());
}

#[test]
fn unrelated_keys_do_nothing() {
    let mut ix = in_reaction("👍");
    assert!(ix.on_key_up(&key("q")).is_empty());
    assert_eq!(ix.mode(), Mode::Reaction);
}

// =============================================================
// Pointer
// =============================================================

#[test]
fn pointer_move_publishes_cursor() {
    let mut ix = Interaction::new();
    let effects = ix.on_pointer_move(Point::new(3.0, 4.0), false);
    assert_eq!(effects, vec![Effect::Presence(PresencePatch::cursor(Some(Point::new(3.0, 4.0))))]);
}

#[test]
fn pointer_move_frozen_while_picking() {
    let mut ix = Interaction::new();
    ix.on_key_up(&key("e"));
    assert!(ix.on_pointer_move(Point::new(1.0, 1.0), true).is_empty());
    // Without any cursor yet, the picker still needs a position.
    assert_eq!(ix.on_pointer_move(Point::new(1.0, 1.0), false).len(), 1);
}

#[test]
fn pointer_leave_hides_and_clears_presence() {
    let mut ix = Interaction::new();
    ix.on_key_up(&key("/"));
    let effects = ix.on_pointer_leave();
    assert_eq!(ix.state(), &CursorState::Hidden);
    assert_eq!(ix.mode(), Mode::Hidden);
    assert_eq!(effects, vec![Effect::Presence(PresencePatch::cursor(None).with_message(None))]);
}

#[test]
fn press_sets_pressed_in_reaction_mode() {
    let mut ix = in_reaction("😍");
    let effects = ix.on_pointer_down(Point::new(9.0, 9.0));
    assert_eq!(ix.state(), &CursorState::Reaction { value: "😍".into(), is_pressed: true });
    assert_eq!(presence_patches(&effects).len(), 1);
}

#[test]
fn release_also_sets_pressed() {
    let mut ix = in_reaction("😱");
    ix.on_pointer_up();
    assert_eq!(ix.state(), &CursorState::Reaction { value: "😱".into(), is_pressed: true });
    ix.on_pointer_down(Point::new(0.0, 0.0));
    ix.on_pointer_up();
    assert_eq!(ix.state(), &CursorState::Reaction { value: "😱".into(), is_pressed: true });
}

#[test]
fn press_outside_reaction_leaves_state() {
    let mut ix = Interaction::new();
    ix.on_pointer_down(Point::new(0.0, 0.0));
    ix.on_pointer_up();
    assert_eq!(ix.state(), &CursorState::Hidden);
}

// =============================================================
// Picker / chat guards
// =============================================================

#[test]
fn select_reaction_ignored_when_picker_closed() {
    let mut ix = Interaction::new();
    ix.select_reaction("🔥");
    assert_eq!(ix.state(), &CursorState::Hidden);
}

#[test]
fn chat_input_publishes_draft() {
    let mut ix = Interaction::new();
    ix.on_key_up(&key("/"));
    let effects = ix.chat_input("hello");
    assert_eq!(effects, vec![Effect::Presence(PresencePatch::message(Some("hello".into())))]);
}

#[test]
fn chat_input_ignored_outside_chat() {
    let mut ix = Interaction::new();
    assert!(ix.chat_input("nope").is_empty());
    assert_eq!(ix.state(), &CursorState::Hidden);
}

#[test]
fn chat_submit_moves_draft_to_previous() {
    let mut ix = Interaction::new();
    ix.on_key_up(&key("/"));
    ix.chat_input("ship it");
    ix.chat_submit();
    assert_eq!(
        ix.state(),
        &CursorState::Chat { previous_message: Some("ship it".into()), message: String::new() }
    );

    ix.chat_input("n");
    assert_eq!(ix.state(), &CursorState::Chat { previous_message: None, message: "n".into() });
}
