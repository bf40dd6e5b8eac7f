use crate::Item;

pub const DEFAULT_TEMPLATE: &str = "Hi {handle}, thanks for your comment: \"{text}\"";

/// Notification text with `{handle}` and `{text}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTemplate(String);

impl MessageTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    pub fn render(&self, item: &Item) -> String {
        self.0
            .replace("{handle}", &item.author_handle)
            .replace("{text}", &item.text)
    }
}

impl Default for MessageTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE)
    }
}
