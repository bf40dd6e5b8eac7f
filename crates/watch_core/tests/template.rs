use chrono::Utc;
use watch_core::{Item, MessageTemplate};

fn init_logging() {
    watch_logging::initialize_for_tests();
}

fn item() -> Item {
    Item {
        id: "1".into(),
        text: "nice shot".into(),
        created_at: Utc::now(),
        author_id: "42".into(),
        author_handle: "alice".into(),
        author_avatar_url: String::new(),
    }
}

#[test]
fn default_template_thanks_the_commenter() {
    init_logging();
    assert_eq!(
        MessageTemplate::default().render(&item()),
        "Hi alice, thanks for your comment: \"nice shot\""
    );
}

#[test]
fn custom_template_substitutes_handle_and_text() {
    init_logging();
    assert_eq!(
        MessageTemplate::new("@{handle} said {text}").render(&item()),
        "@alice said nice shot"
    );
}
